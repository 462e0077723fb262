//! Image intake: turns a picked file or an uploaded body into a `SelectedImage`.
//!
//! The only check is the advisory MIME filter. Contents are never inspected,
//! so a mislabeled file passes through.

use std::path::Path;

use bytes::Bytes;
use meterlens_core::{AnalysisError, ImageSource, SelectedImage};
use tracing::debug;

use crate::mime_detect::{detect_mime_type, is_accepted_image, normalize_mime};

const GENERIC_BINARY: &str = "application/octet-stream";

/// Resolve the effective MIME type and apply the filter.
///
/// A declared type wins unless it is missing or generic, in which case the
/// file name decides.
pub fn accept_image(file_name: &str, declared_mime: Option<&str>) -> Result<String, AnalysisError> {
    let declared = declared_mime
        .map(normalize_mime)
        .filter(|m| !m.is_empty() && m != GENERIC_BINARY);
    let mime = declared.unwrap_or_else(|| detect_mime_type(Path::new(file_name)).to_string());

    if !is_accepted_image(&mime) {
        return Err(AnalysisError::UserInput(format!(
            "Unsupported image type '{mime}'. Please choose a PNG, JPEG, or WEBP file."
        )));
    }
    Ok(mime)
}

/// Select an image on local disk. The file is read later, at encoding time.
pub fn image_from_path(path: &Path) -> Result<SelectedImage, AnalysisError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    let mime_type = accept_image(&file_name, None)?;
    debug!(path = %path.display(), mime = %mime_type, "Accepted image from disk");
    Ok(SelectedImage {
        source: ImageSource::File(path.to_path_buf()),
        mime_type,
        file_name,
    })
}

/// Select an image that arrived in memory (HTTP upload).
pub fn image_from_bytes(
    file_name: &str,
    declared_mime: Option<&str>,
    data: Bytes,
) -> Result<SelectedImage, AnalysisError> {
    let mime_type = accept_image(file_name, declared_mime)?;
    debug!(file = %file_name, mime = %mime_type, bytes = data.len(), "Accepted uploaded image");
    Ok(SelectedImage {
        source: ImageSource::Memory(data),
        mime_type,
        file_name: file_name.to_string(),
    })
}
