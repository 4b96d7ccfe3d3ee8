//! JSON envelope format
//!
//! ```json
//! { "class": "App\\Messages\\DummyMessage", "fields": { "content": "Hello world" } }
//! ```
//!
//! Nested objects are envelopes themselves. Any other JSON object is read as a
//! string-keyed array; JSON arrays become integer-keyed arrays.

use serde_json::{Map, Value};

use crate::error::{Result, ZddError};
use crate::snapshot::{ArrayKey, FieldValue, Snapshot};

pub fn decode(blob: &[u8]) -> Result<Snapshot> {
    let value: Value = serde_json::from_slice(blob).map_err(|e| ZddError::Decode {
        offset: byte_offset(blob, e.line(), e.column()),
        message: e.to_string(),
    })?;
    envelope(&value).ok_or_else(|| ZddError::Decode {
        offset: 0,
        message: "expected an object envelope with \"class\" and \"fields\"".to_string(),
    })
}

/// Byte offset of a 1-based line/column position reported by serde_json
fn byte_offset(blob: &[u8], line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let preceding: usize = blob
        .split(|&b| b == b'\n')
        .take(line - 1)
        .map(|l| l.len() + 1)
        .sum();
    (preceding + column.saturating_sub(1)).min(blob.len())
}

pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&to_envelope(snapshot))?)
}

fn envelope(value: &Value) -> Option<Snapshot> {
    let object = value.as_object()?;
    let class = object.get("class")?.as_str()?;
    let fields = match object.get("fields") {
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(name, value)| (name.clone(), field_value(value)))
            .collect(),
        None => Vec::new(),
        Some(_) => return None,
    };
    Some(Snapshot {
        class: class.to_string(),
        fields,
    })
}

fn field_value(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => FieldValue::String(s.clone()),
        Value::Array(items) => FieldValue::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (ArrayKey::Int(i as i64), field_value(item)))
                .collect(),
        ),
        Value::Object(map) => match envelope(value) {
            Some(snapshot) => FieldValue::Object(snapshot),
            None => FieldValue::Array(
                map.iter()
                    .map(|(key, item)| (ArrayKey::String(key.clone()), field_value(item)))
                    .collect(),
            ),
        },
    }
}

fn to_envelope(snapshot: &Snapshot) -> Value {
    let fields: Map<String, Value> = snapshot
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), to_json(value)))
        .collect();
    serde_json::json!({ "class": snapshot.class, "fields": fields })
}

fn to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Int(i) => Value::from(*i),
        // Non-finite floats have no JSON form
        FieldValue::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Array(entries) => {
            let is_list = entries
                .iter()
                .enumerate()
                .all(|(i, (key, _))| *key == ArrayKey::Int(i as i64));
            if is_list {
                Value::Array(entries.iter().map(|(_, v)| to_json(v)).collect())
            } else {
                Value::Object(
                    entries
                        .iter()
                        .map(|(key, v)| (key.to_string(), to_json(v)))
                        .collect(),
                )
            }
        }
        FieldValue::Object(snapshot) => to_envelope(snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_envelope() {
        let snapshot = decode(
            br#"{
                "class": "App\\Messages\\DummyMessage",
                "fields": {
                    "content": "Hello world",
                    "number": 3,
                    "ratio": 0.5,
                    "tags": ["a", "b"],
                    "meta": { "source": "api" },
                    "author": { "class": "App\\Model\\User", "fields": { "id": 7 } }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.class, "App\\Messages\\DummyMessage");
        assert_eq!(snapshot.field("number"), Some(&FieldValue::Int(3)));
        assert_eq!(snapshot.field("ratio"), Some(&FieldValue::Float(0.5)));
        assert_eq!(snapshot.field("tags").map(FieldValue::kind), Some("array"));
        assert_eq!(snapshot.field("meta").map(FieldValue::kind), Some("array"));
        assert_eq!(snapshot.field("author").map(FieldValue::kind), Some("App\\Model\\User"));
    }

    #[test]
    fn test_encode_then_decode() {
        let snapshot = Snapshot::new("App\\Messages\\DummyMessage")
            .with_field("content", FieldValue::String("Hello".to_string()))
            .with_field(
                "tags",
                FieldValue::Array(vec![(ArrayKey::Int(0), FieldValue::String("a".to_string()))]),
            );

        let decoded = decode(&encode(&snapshot).unwrap()).unwrap();
        assert_eq!(decoded.field("content"), snapshot.field("content"));
        assert_eq!(decoded.field("tags"), snapshot.field("tags"));
    }

    #[test]
    fn test_rejects_non_envelope() {
        assert!(matches!(decode(b"[1, 2]"), Err(ZddError::Decode { .. })));
        assert!(matches!(decode(b"not json"), Err(ZddError::Decode { .. })));
    }

    #[test]
    fn test_error_offset_counts_bytes_across_lines() {
        let blob = b"{\n  \"class\": \"A\",\n  \"fields\": x\n}";
        let offset = match decode(blob) {
            Err(ZddError::Decode { offset, .. }) => offset,
            other => panic!("Expected Decode, got {:?}", other),
        };
        // Third line starts after "{\n" and "  \"class\": \"A\",\n"
        assert!(offset >= 18, "offset {} points before the third line", offset);
        assert!(offset < blob.len());
    }

    #[test]
    fn test_byte_offset_from_line_and_column() {
        let blob = b"ab\ncde\nf";
        assert_eq!(byte_offset(blob, 1, 1), 0);
        assert_eq!(byte_offset(blob, 2, 2), 4);
        assert_eq!(byte_offset(blob, 3, 1), 7);
        assert_eq!(byte_offset(blob, 0, 0), 0);
    }
}
