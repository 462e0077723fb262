pub mod error;
pub mod session;
pub mod traits;
pub mod types;

pub use error::{AnalysisError, FailureKind};
pub use session::{AnalysisSession, AttemptTicket, BeginError, ErrorView, UiState};
pub use traits::{AnalysisRequest, InferenceBackend, InferenceResponse};
pub use types::{
    AnalysisResult, ApiKey, EncodedImage, ImageSource, MeterField, OutputShape, PreviewHandle,
    SelectedImage, UNDETERMINED,
};
