//! Instruction payload sent alongside the meter image.
//!
//! This is product content, not control logic: the analyzer takes it as a
//! parameter and a deployment can replace it with a file.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use meterlens_core::{MeterField, OutputShape, UNDETERMINED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructions(String);

impl Instructions {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Built-in instructions naming every field the shape declares.
    pub fn default_for(shape: &OutputShape) -> Self {
        let mut text = String::from(
            "You are an expert at reading electric utility meters. Analyze the attached \
             photograph of an electric meter and reply with JSON that matches the provided \
             schema exactly. Do not add markdown formatting or any text outside the JSON.\n\n\
             Required fields:\n",
        );
        for (i, field) in shape.fields().iter().enumerate() {
            let _ = writeln!(text, "{}. {} ({})", i + 1, field_guidance(*field), field.wire_name());
        }
        let _ = write!(
            text,
            "\nIf any value is unclear or cannot be read, use exactly '{UNDETERMINED}' for that \
             field. Never omit a field and never leave one empty.\n\n\
             Reading rules:\n\
             - On a mechanical dial or drum register, the rightmost digit is one decimal \
             place. Include it in the reading as a decimal (e.g. 0452 then 7 → 0452.7).\n\
             - When a pointer or drum rests between two digits, choose the lower digit.\n\
             - On a digital display, report the digits exactly as shown.\n\
             - Report the meter condition as 'normal' when no damage is visible."
        );
        Self(text)
    }

    /// Load a replacement payload from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
        if text.trim().is_empty() {
            bail!("Prompt file is empty: {}", path.display());
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Instructions {
    fn default() -> Self {
        Self::default_for(&OutputShape::standard())
    }
}

fn field_guidance(field: MeterField) -> &'static str {
    match field {
        MeterField::MeterSize => "Meter size, e.g. 5(15)A, 15(45)A, 30(100)A",
        MeterField::MeterType => "Meter type: 'rotary-dial' or 'digital'",
        MeterField::SerialNumber => "Serial number printed on the meter body",
        MeterField::Reading => "Consumption reading (kWh) shown on the register or display",
        MeterField::MeterCondition => {
            "External condition: 'normal', 'damaged', 'scratched', or 'fogged-glass'"
        }
        MeterField::Authority => "Utility authority named on the meter face or seal",
    }
}
