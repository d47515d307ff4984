//! Field cleaning and the completeness gate

use needle_domain::{FieldValue, Record};

/// Default share of populated fields a record needs
pub const DEFAULT_POPULATED_THRESHOLD: f64 = 0.5;

/// Normalize one extracted value
///
/// Text is trimmed; empty text and the literal `null` (any case) mean no
/// information. Other values pass through unchanged.
pub fn clean(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                FieldValue::Null
            } else if trimmed.len() == text.len() {
                FieldValue::Text(text)
            } else {
                FieldValue::Text(trimmed.to_string())
            }
        }
        other => other,
    }
}

/// Clean every field of a record in place
pub fn clean_record(record: &mut Record) {
    record.map_values(clean);
}

/// Whether at least one field carries information
pub fn has_any_populated_field(record: &Record) -> bool {
    record.values().any(|v| !clean(v.clone()).is_null())
}

/// Whether `populated / total >= threshold`
///
/// Values are judged after cleaning, so `"  null "` does not count. A record
/// with no fields never passes.
pub fn has_sufficient_populated_fields(record: &Record, threshold: f64) -> bool {
    let total = record.len();
    if total == 0 {
        return false;
    }
    let populated = record
        .values()
        .filter(|v| !clean((*v).clone()).is_null())
        .count();
    populated as f64 / total as f64 >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use needle_domain::{FieldKind, FieldSpec, RecordSchema};
    use proptest::prelude::*;
    use serde_json::json;

    fn schema(n: usize) -> RecordSchema {
        RecordSchema::new(
            "Wide",
            (0..n)
                .map(|i| FieldSpec::bare(format!("f{}", i), FieldKind::String))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_clean_strings() {
        assert_eq!(clean(FieldValue::from("  Acme  ")), FieldValue::from("Acme"));
        assert_eq!(clean(FieldValue::from("NULL")), FieldValue::Null);
        assert_eq!(clean(FieldValue::from(" null ")), FieldValue::Null);
        assert_eq!(clean(FieldValue::from("   ")), FieldValue::Null);
        assert_eq!(clean(FieldValue::from("nullable")), FieldValue::from("nullable"));
    }

    #[test]
    fn test_clean_passes_other_values() {
        assert_eq!(clean(FieldValue::Integer(0)), FieldValue::Integer(0));
        assert_eq!(clean(FieldValue::Boolean(false)), FieldValue::Boolean(false));
        assert_eq!(clean(FieldValue::Null), FieldValue::Null);
    }

    #[test]
    fn test_clean_record() {
        let mut record =
            Record::from_json(&schema(2), &json!({"f0": " X ", "f1": "null"})).unwrap();
        clean_record(&mut record);
        assert_eq!(record.get("f0"), Some(&FieldValue::from("X")));
        assert_eq!(record.get("f1"), Some(&FieldValue::Null));
        assert!(has_any_populated_field(&record));
    }

    #[test]
    fn test_threshold_boundary_passes() {
        let half = Record::from_json(&schema(2), &json!({"f0": "X", "f1": null})).unwrap();
        assert!(has_sufficient_populated_fields(&half, DEFAULT_POPULATED_THRESHOLD));

        let none = Record::from_json(&schema(2), &json!({})).unwrap();
        assert!(!has_sufficient_populated_fields(&none, DEFAULT_POPULATED_THRESHOLD));
        assert!(!has_any_populated_field(&none));
    }

    #[test]
    fn test_null_text_does_not_count() {
        let record = Record::from_json(&schema(2), &json!({"f0": "X", "f1": " Null"})).unwrap();
        assert!(has_sufficient_populated_fields(&record, 0.5));
        assert!(!has_sufficient_populated_fields(&record, 0.6));
    }

    proptest! {
        #[test]
        fn prop_clean_is_idempotent(text in ".{0,20}", null in any::<bool>()) {
            let value = if null { FieldValue::Null } else { FieldValue::Text(text) };
            let once = clean(value);
            prop_assert_eq!(clean(once.clone()), once);
        }

        #[test]
        fn prop_threshold_gate_is_exact(n in 1usize..12, k_seed in 0usize..100, t_seed in 0usize..100) {
            let k = k_seed % (n + 1);
            let t = t_seed % (n + 1);
            let mut record = Record::empty(&schema(n));
            for i in 0..k {
                record.set(&format!("f{}", i), "v").unwrap();
            }
            let threshold = t as f64 / n as f64;
            prop_assert_eq!(has_sufficient_populated_fields(&record, threshold), k >= t);
        }
    }
}
