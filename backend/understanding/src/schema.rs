//! Output-shape declaration and response parsing.
//!
//! The declaration is sent to the backend to constrain the model; the parser
//! checks the reply against the same shape. Values are returned as-is.

use meterlens_core::{AnalysisError, AnalysisResult, MeterField, OutputShape};
use serde_json::{Map, Value, json};

/// JSON schema flavour expected by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDialect {
    /// Gemini `responseSchema`: OpenAPI subset, supports `propertyOrdering`.
    Gemini,
    /// OpenAI strict structured outputs: requires `additionalProperties: false`.
    OpenAi,
}

/// Render the output shape as a JSON schema object.
pub fn to_json_schema(shape: &OutputShape, dialect: SchemaDialect) -> Value {
    // Gemini expects OpenAPI-style upper-case type names.
    let (object_type, string_type) = match dialect {
        SchemaDialect::Gemini => ("OBJECT", "STRING"),
        SchemaDialect::OpenAi => ("object", "string"),
    };

    let mut properties = Map::new();
    for field in shape.fields() {
        properties.insert(
            field.wire_name().to_string(),
            json!({ "type": string_type, "description": field.description() }),
        );
    }
    let names: Vec<&str> = shape.fields().iter().map(|f| f.wire_name()).collect();

    let mut schema = json!({
        "type": object_type,
        "properties": properties,
        "required": names.clone(),
    });
    match dialect {
        SchemaDialect::Gemini => {
            schema["propertyOrdering"] = json!(names);
        }
        SchemaDialect::OpenAi => {
            schema["additionalProperties"] = Value::Bool(false);
        }
    }
    schema
}

/// Parse model output as the declared shape.
///
/// Every declared field must be present as a non-blank string; anything else
/// is a `Parse` error carrying the raw text.
pub fn parse_result(text: &str, shape: &OutputShape) -> Result<AnalysisResult, AnalysisError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(AnalysisError::parse("empty response", text));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| AnalysisError::parse(format!("invalid JSON: {e}"), text))?;
    let Value::Object(object) = value else {
        return Err(AnalysisError::parse("response is not a JSON object", text));
    };

    let field = |f: MeterField| -> Result<Option<String>, AnalysisError> {
        if !shape.declares(f) {
            return Ok(None);
        }
        match object.get(f.wire_name()) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.clone())),
            Some(Value::String(_)) => Err(AnalysisError::parse(
                format!("field '{}' is empty", f.wire_name()),
                text,
            )),
            Some(_) => Err(AnalysisError::parse(
                format!("field '{}' is not a string", f.wire_name()),
                text,
            )),
            None => Err(AnalysisError::parse(
                format!("missing field '{}'", f.wire_name()),
                text,
            )),
        }
    };
    let required = |f: MeterField| -> Result<String, AnalysisError> {
        field(f)?.ok_or_else(|| {
            AnalysisError::parse(format!("shape does not declare '{}'", f.wire_name()), text)
        })
    };

    Ok(AnalysisResult {
        meter_size: required(MeterField::MeterSize)?,
        meter_type: required(MeterField::MeterType)?,
        serial_number: required(MeterField::SerialNumber)?,
        reading: required(MeterField::Reading)?,
        meter_condition: required(MeterField::MeterCondition)?,
        authority: field(MeterField::Authority)?,
    })
}

/// Remove a surrounding ```json … ``` fence if the model added one anyway.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
