//! Parse structured model output into records

use crate::error::ExtractorError;
use needle_domain::{Record, RecordSchema};
use serde_json::Value;
use tracing::warn;

/// Parse a structured extraction response
///
/// Accepts `{"items": [...]}` or a bare array, optionally wrapped in a
/// markdown code block. Array entries that are not objects are skipped.
pub fn parse_items(schema: &RecordSchema, response: &str) -> Result<Vec<Record>, ExtractorError> {
    let json_str = extract_json(response)?;
    let json: Value = serde_json::from_str(json_str)?;

    let items = match &json {
        Value::Array(items) => items,
        Value::Object(object) => object
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ExtractorError::InvalidFormat("Expected an \"items\" array".to_string())
            })?,
        _ => {
            return Err(ExtractorError::InvalidFormat(
                "Expected a JSON object or array".to_string(),
            ))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match Record::from_json(schema, item) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping item {}: {}", idx, e),
        }
    }
    Ok(records)
}

/// Extract JSON from response, handling markdown code blocks
fn extract_json(response: &str) -> Result<&str, ExtractorError> {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return Ok(trimmed);
    }

    // Drop the opening fence line (```json or ```) and the closing fence
    let body = trimmed
        .split_once('\n')
        .map(|(_, rest)| rest)
        .ok_or_else(|| ExtractorError::InvalidFormat("Empty code block".to_string()))?;
    let body = body.trim_end();
    Ok(body.strip_suffix("```").unwrap_or(body).trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use needle_domain::{FieldKind, FieldSpec, FieldValue};

    fn schema() -> RecordSchema {
        RecordSchema::new(
            "TechCompany",
            vec![
                FieldSpec::bare("name", FieldKind::String),
                FieldSpec::bare("employee_count", FieldKind::Integer),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_items_object() {
        let response = r#"{"items": [{"name": "Acme Corp", "employee_count": 40}, {"name": "Globex", "employee_count": null}]}"#;
        let records = parse_items(&schema(), response).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("employee_count"), Some(&FieldValue::Integer(40)));
        assert_eq!(records[1].get("employee_count"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_parse_bare_array_in_code_block() {
        let response = "```json\n[{\"name\": \"Acme Corp\"}]\n```";
        let records = parse_items(&schema(), response).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("name"), Some(&FieldValue::from("Acme Corp")));
        assert_eq!(records[0].get("employee_count"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_parse_empty_items() {
        assert!(parse_items(&schema(), r#"{"items": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_skips_non_object_items() {
        let records = parse_items(&schema(), r#"[1, {"name": "X"}, "y"]"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(matches!(
            parse_items(&schema(), "not json"),
            Err(ExtractorError::JsonParse(_))
        ));
        assert!(matches!(
            parse_items(&schema(), r#"{"records": []}"#),
            Err(ExtractorError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_items(&schema(), "42"),
            Err(ExtractorError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_items(&schema(), "```"),
            Err(ExtractorError::InvalidFormat(_))
        ));
    }
}
