use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Value the model must use for any field it cannot determine.
pub const UNDETERMINED: &str = "undetermined";

/// Credential for the external inference service.
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for empty or whitespace-only values.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key.trim().to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Where the bytes of a selected image live.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A file on local disk, read lazily at analysis time.
    File(PathBuf),
    /// Bytes already in memory (HTTP upload).
    Memory(Bytes),
}

/// An image the user picked, before encoding.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub source: ImageSource,
    pub mime_type: String,
    pub file_name: String,
}

/// Transport-safe form of an image: standard base64, no data-URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data_base64: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}

/// Handle to a registered preview of the selected image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewHandle {
    pub id: String,
    pub url: String,
}

/// One field of the structured meter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterField {
    MeterSize,
    MeterType,
    SerialNumber,
    Reading,
    MeterCondition,
    Authority,
}

impl MeterField {
    /// Key used in the model's JSON output.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::MeterSize => "meterSize",
            Self::MeterType => "meterType",
            Self::SerialNumber => "serialNumber",
            Self::Reading => "reading",
            Self::MeterCondition => "meterCondition",
            Self::Authority => "authority",
        }
    }

    /// Description attached to the field in the output-shape declaration.
    pub fn description(self) -> &'static str {
        match self {
            Self::MeterSize => "Rated size of the meter, e.g. 5(15)A, 15(45)A, 30(100)A",
            Self::MeterType => "Meter category: rotary-dial or digital",
            Self::SerialNumber => "Serial or reference number printed on the meter body",
            Self::Reading => "Consumption reading shown on the dial register or display",
            Self::MeterCondition => {
                "External condition: normal, damaged, scratched, or fogged-glass"
            }
            Self::Authority => "Utility authority named on the meter or its seal",
        }
    }

    /// Human label used by terminal output.
    pub fn label(self) -> &'static str {
        match self {
            Self::MeterSize => "Meter size",
            Self::MeterType => "Meter type",
            Self::SerialNumber => "Serial number",
            Self::Reading => "Reading",
            Self::MeterCondition => "Condition",
            Self::Authority => "Authority",
        }
    }
}

/// Ordered set of mandatory string fields the model must return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputShape {
    fields: Vec<MeterField>,
}

impl OutputShape {
    /// Size, type, serial number, reading, and condition.
    pub fn standard() -> Self {
        Self {
            fields: vec![
                MeterField::MeterSize,
                MeterField::MeterType,
                MeterField::SerialNumber,
                MeterField::Reading,
                MeterField::MeterCondition,
            ],
        }
    }

    /// The standard fields plus the utility authority.
    pub fn with_authority() -> Self {
        let mut shape = Self::standard();
        shape.fields.push(MeterField::Authority);
        shape
    }

    pub fn fields(&self) -> &[MeterField] {
        &self.fields
    }

    pub fn declares(&self, field: MeterField) -> bool {
        self.fields.contains(&field)
    }
}

impl Default for OutputShape {
    fn default() -> Self {
        Self::standard()
    }
}

/// Structured meter reading produced by one successful analysis.
///
/// Every field is free-form text and may hold [`UNDETERMINED`]. `authority`
/// is present only when the output shape declared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub meter_size: String,
    pub meter_type: String,
    pub serial_number: String,
    pub reading: String,
    pub meter_condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

impl AnalysisResult {
    pub fn get(&self, field: MeterField) -> Option<&str> {
        match field {
            MeterField::MeterSize => Some(&self.meter_size),
            MeterField::MeterType => Some(&self.meter_type),
            MeterField::SerialNumber => Some(&self.serial_number),
            MeterField::Reading => Some(&self.reading),
            MeterField::MeterCondition => Some(&self.meter_condition),
            MeterField::Authority => self.authority.as_deref(),
        }
    }

    pub fn is_undetermined(&self, field: MeterField) -> bool {
        self.get(field) == Some(UNDETERMINED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_rejects_blank() {
        assert!(ApiKey::new("   ").is_none());
        assert_eq!(ApiKey::new(" abc ").unwrap().expose(), "abc");
    }

    #[test]
    fn api_key_debug_is_masked() {
        let key = ApiKey::new("AIzaSySecretValue").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(!format!("{key}").contains("Secret"));
    }

    #[test]
    fn authority_revision_extends_standard_shape() {
        let shape = OutputShape::with_authority();
        assert_eq!(shape.fields().len(), 6);
        assert!(shape.declares(MeterField::Authority));
        assert!(!OutputShape::standard().declares(MeterField::Authority));
    }

    #[test]
    fn result_serializes_with_wire_names() {
        let result = AnalysisResult {
            meter_size: "15(45)A".into(),
            meter_type: "digital".into(),
            serial_number: "020123456".into(),
            reading: "04521".into(),
            meter_condition: "normal".into(),
            authority: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        for field in OutputShape::standard().fields() {
            assert!(json.get(field.wire_name()).is_some(), "missing {}", field.wire_name());
        }
        assert!(json.get("authority").is_none());
    }

    #[test]
    fn data_url_has_mime_prefix() {
        let img = EncodedImage {
            mime_type: "image/png".into(),
            data_base64: "AAAA".into(),
        };
        assert_eq!(img.data_url(), "data:image/png;base64,AAAA");
    }
}
