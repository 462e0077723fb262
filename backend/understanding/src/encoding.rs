//! Encoding adapter: selected image → base64 payload.
//!
//! Files are read with non-blocking I/O at encoding time. No size or content
//! checks happen here.

use base64::{Engine, engine::general_purpose::STANDARD};
use meterlens_core::{AnalysisError, EncodedImage, ImageSource, SelectedImage};
use tracing::debug;

pub async fn encode_image(image: &SelectedImage) -> Result<EncodedImage, AnalysisError> {
    let data_base64 = match &image.source {
        ImageSource::File(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| AnalysisError::Read(format!("{}: {e}", path.display())))?;
            STANDARD.encode(bytes)
        }
        ImageSource::Memory(bytes) => STANDARD.encode(bytes),
    };

    debug!(
        file = %image.file_name,
        encoded_len = data_base64.len(),
        "Encoded image"
    );

    Ok(EncodedImage {
        mime_type: image.mime_type.clone(),
        data_base64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use meterlens_core::FailureKind;

    fn memory_image(data: &'static [u8]) -> SelectedImage {
        SelectedImage {
            source: ImageSource::Memory(Bytes::from_static(data)),
            mime_type: "image/jpeg".into(),
            file_name: "meter.jpg".into(),
        }
    }

    #[tokio::test]
    async fn encodes_memory_bytes_without_prefix() {
        let encoded = encode_image(&memory_image(b"hello")).await.unwrap();
        assert_eq!(encoded.data_base64, "aGVsbG8=");
        assert_eq!(encoded.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn reads_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meter.png");
        tokio::fs::write(&path, [0x89, b'P', b'N', b'G']).await.unwrap();

        let image = SelectedImage {
            source: ImageSource::File(path),
            mime_type: "image/png".into(),
            file_name: "meter.png".into(),
        };
        let encoded = encode_image(&image).await.unwrap();
        assert_eq!(encoded.data_base64, "iVBORw==");
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let image = SelectedImage {
            source: ImageSource::File(dir.path().join("gone.png")),
            mime_type: "image/png".into(),
            file_name: "gone.png".into(),
        };
        let err = encode_image(&image).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Read);
        assert!(err.to_string().contains("gone.png"));
    }
}
