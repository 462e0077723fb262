//! MIME type detection and the advisory image-type filter.

use std::path::Path;

/// Image types offered by the file picker.
pub const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png"          => "image/png",
        "webp"         => "image/webp",
        "gif"          => "image/gif",
        "bmp"          => "image/bmp",
        "heic"         => "image/heic",
        "tiff" | "tif" => "image/tiff",
        _              => "application/octet-stream",
    }
}

/// Strip parameters and normalize case (`"Image/JPEG; q=1"` → `"image/jpeg"`).
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// Whether a MIME type passes the picker's filter.
pub fn is_accepted_image(mime: &str) -> bool {
    let mime = normalize_mime(mime);
    ACCEPTED_IMAGE_TYPES.contains(&mime.as_str())
}
