//! Image intake for MeterLens: MIME filtering, selected images, and previews.

pub mod intake;
pub mod media_server;
pub mod mime_detect;
pub mod preview;

pub use intake::{accept_image, image_from_bytes, image_from_path};
pub use media_server::preview_router;
pub use mime_detect::{ACCEPTED_IMAGE_TYPES, detect_mime_type, is_accepted_image};
pub use preview::{PreviewEntry, PreviewStore};
