pub mod analyzer;
pub mod encoding;
pub mod prompt;
pub mod providers;
pub mod schema;

pub use analyzer::MeterAnalyzer;
pub use encoding::encode_image;
pub use prompt::Instructions;
pub use providers::{GeminiBackend, MockBackend, OpenAiBackend, build_backend};
pub use schema::{SchemaDialect, parse_result, to_json_schema};
