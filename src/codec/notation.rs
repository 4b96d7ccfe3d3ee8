//! Compact object-notation text format
//!
//! ```text
//! O:25:"App\Messages\DummyMessage":1:{s:7:"content";s:11:"Hello world";}
//! ```
//!
//! Scalars are `N;`, `b:1;`, `i:42;`, `d:0.5;` and `s:<bytes>:"...";`. Arrays are
//! `a:<n>:{<key><value>...}` and objects `O:<len>:"<class>":<n>:{<key><value>...}`.
//! Object keys may carry a visibility prefix: `\0<Class>\0name` for private and
//! `\0*\0name` for protected properties.

use crate::error::{Result, ZddError};
use crate::snapshot::{ArrayKey, FieldValue, Snapshot};

/// Deepest array/object nesting accepted, same as serde_json's recursion limit
const MAX_DEPTH: usize = 128;

/// Decode a blob whose root value is an object
pub fn decode(blob: &[u8]) -> Result<Snapshot> {
    let mut parser = Parser {
        input: blob,
        pos: 0,
        depth: 0,
    };
    let root = parser.value()?;
    if blob[parser.pos..].iter().any(|b| !b.is_ascii_whitespace()) {
        return Err(parser.error("unexpected trailing data"));
    }
    match root {
        FieldValue::Object(snapshot) => Ok(snapshot),
        other => Err(ZddError::Decode {
            offset: 0,
            message: format!("expected an object, found {}", other.kind()),
        }),
    }
}

/// Encode a snapshot, writing its own fields as private properties
pub fn encode(snapshot: &Snapshot) -> Vec<u8> {
    let mut out = Vec::new();
    write_object(&mut out, snapshot);
    out
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> ZddError {
        ZddError::Decode {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!("expected '{}', found '{}'", byte as char, b as char))),
            None => Err(self.error(format!("expected '{}', found end of input", byte as char))),
        }
    }

    /// Read bytes up to (not including) `terminator` and consume the terminator
    fn until(&mut self, terminator: u8) -> Result<&'a str> {
        let input = self.input;
        let start = self.pos;
        let len = input[start..]
            .iter()
            .position(|&b| b == terminator)
            .ok_or_else(|| self.error(format!("missing '{}'", terminator as char)))?;
        self.pos = start + len + 1;
        std::str::from_utf8(&input[start..start + len]).map_err(|_| ZddError::Decode {
            offset: start,
            message: "invalid UTF-8".to_string(),
        })
    }

    fn integer(&mut self, terminator: u8) -> Result<i64> {
        let start = self.pos;
        let raw = self.until(terminator)?;
        raw.parse().map_err(|_| ZddError::Decode {
            offset: start,
            message: format!("invalid integer \"{}\"", raw),
        })
    }

    fn length(&mut self, terminator: u8) -> Result<usize> {
        let start = self.pos;
        let n = self.integer(terminator)?;
        usize::try_from(n).map_err(|_| ZddError::Decode {
            offset: start,
            message: format!("negative length {}", n),
        })
    }

    /// `"<len bytes>"` with the length read beforehand
    fn quoted(&mut self, len: usize) -> Result<String> {
        self.expect(b'"')?;
        let start = self.pos;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("string runs past end of input"))?;
        let text = String::from_utf8(self.input[start..end].to_vec()).map_err(|_| ZddError::Decode {
            offset: start,
            message: "invalid UTF-8".to_string(),
        })?;
        self.pos = end;
        self.expect(b'"')?;
        Ok(text)
    }

    fn value(&mut self) -> Result<FieldValue> {
        let tag = self.peek().ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        match tag {
            b'N' => {
                self.expect(b';')?;
                Ok(FieldValue::Null)
            }
            b'b' => {
                self.expect(b':')?;
                match self.integer(b';')? {
                    0 => Ok(FieldValue::Bool(false)),
                    1 => Ok(FieldValue::Bool(true)),
                    other => Err(self.error(format!("invalid boolean {}", other))),
                }
            }
            b'i' => {
                self.expect(b':')?;
                Ok(FieldValue::Int(self.integer(b';')?))
            }
            b'd' => {
                self.expect(b':')?;
                let start = self.pos;
                let raw = self.until(b';')?;
                let value = match raw {
                    "INF" => f64::INFINITY,
                    "-INF" => f64::NEG_INFINITY,
                    "NAN" => f64::NAN,
                    _ => raw.parse().map_err(|_| ZddError::Decode {
                        offset: start,
                        message: format!("invalid float \"{}\"", raw),
                    })?,
                };
                Ok(FieldValue::Float(value))
            }
            b's' => {
                self.expect(b':')?;
                let len = self.length(b':')?;
                let text = self.quoted(len)?;
                self.expect(b';')?;
                Ok(FieldValue::String(text))
            }
            b'a' => {
                self.enter()?;
                self.expect(b':')?;
                let count = self.length(b':')?;
                self.expect(b'{')?;
                let mut entries = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    let key = self.array_key()?;
                    let value = self.value()?;
                    entries.push((key, value));
                }
                self.expect(b'}')?;
                self.depth -= 1;
                Ok(FieldValue::Array(entries))
            }
            b'O' => {
                self.enter()?;
                self.expect(b':')?;
                let len = self.length(b':')?;
                let class = self.quoted(len)?;
                self.expect(b':')?;
                let count = self.length(b':')?;
                self.expect(b'{')?;
                let mut snapshot = Snapshot::new(class);
                for _ in 0..count {
                    let key = self.array_key()?.to_string();
                    let value = self.value()?;
                    snapshot.fields.push((demangle(&key).to_string(), value));
                }
                self.expect(b'}')?;
                self.depth -= 1;
                Ok(FieldValue::Object(snapshot))
            }
            other => {
                self.pos -= 1;
                Err(self.error(format!("unknown value tag '{}'", other as char)))
            }
        }
    }

    fn array_key(&mut self) -> Result<ArrayKey> {
        match self.value()? {
            FieldValue::Int(i) => Ok(ArrayKey::Int(i)),
            FieldValue::String(s) => Ok(ArrayKey::String(s)),
            other => Err(self.error(format!("invalid key type {}", other.kind()))),
        }
    }
}

/// Strip a `\0<scope>\0` visibility prefix
fn demangle(key: &str) -> &str {
    key.strip_prefix('\0')
        .and_then(|rest| rest.split_once('\0'))
        .map(|(_, name)| name)
        .unwrap_or(key)
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(format!("s:{}:\"", s.len()).as_bytes());
    out.extend_from_slice(s.as_bytes());
    out.extend_from_slice(b"\";");
}

fn write_object(out: &mut Vec<u8>, snapshot: &Snapshot) {
    out.extend_from_slice(
        format!("O:{}:\"{}\":{}:{{", snapshot.class.len(), snapshot.class, snapshot.fields.len()).as_bytes(),
    );
    for (name, value) in &snapshot.fields {
        write_str(out, &format!("\0{}\0{}", snapshot.class, name));
        write_value(out, value);
    }
    out.push(b'}');
}

fn write_value(out: &mut Vec<u8>, value: &FieldValue) {
    match value {
        FieldValue::Null => out.extend_from_slice(b"N;"),
        FieldValue::Bool(b) => out.extend_from_slice(if *b { b"b:1;" } else { b"b:0;" }),
        FieldValue::Int(i) => out.extend_from_slice(format!("i:{};", i).as_bytes()),
        FieldValue::Float(f) => {
            let raw = if f.is_nan() {
                "NAN".to_string()
            } else if f.is_infinite() {
                let sign = if *f > 0.0 { "" } else { "-" };
                format!("{}INF", sign)
            } else {
                f.to_string()
            };
            out.extend_from_slice(format!("d:{};", raw).as_bytes());
        }
        FieldValue::String(s) => write_str(out, s),
        FieldValue::Array(entries) => {
            out.extend_from_slice(format!("a:{}:{{", entries.len()).as_bytes());
            for (key, value) in entries {
                match key {
                    ArrayKey::Int(i) => out.extend_from_slice(format!("i:{};", i).as_bytes()),
                    ArrayKey::String(s) => write_str(out, s),
                }
                write_value(out, value);
            }
            out.push(b'}');
        }
        FieldValue::Object(snapshot) => write_object(out, snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_public_properties() {
        let blob = br#"O:25:"App\Messages\DummyMessage":2:{s:7:"content";s:11:"Hello world";s:6:"number";i:42;}"#;
        let snapshot = decode(blob).unwrap();

        assert_eq!(snapshot.class, "App\\Messages\\DummyMessage");
        assert_eq!(snapshot.field("content"), Some(&FieldValue::String("Hello world".to_string())));
        assert_eq!(snapshot.field("number"), Some(&FieldValue::Int(42)));
    }

    #[test]
    fn test_decode_mangled_keys() {
        let blob = "O:25:\"App\\Messages\\DummyMessage\":2:{s:34:\"\0App\\Messages\\DummyMessage\0content\";b:1;s:9:\"\0*\0number\";N;}";
        let snapshot = decode(blob.as_bytes()).unwrap();

        assert_eq!(snapshot.field("content"), Some(&FieldValue::Bool(true)));
        assert_eq!(snapshot.field("number"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_decode_nested_values() {
        let blob = br#"O:8:"stdClass":2:{s:4:"tags";a:2:{i:0;s:1:"a";s:3:"key";d:1.5;}s:5:"inner";O:8:"stdClass":0:{}}"#;
        let snapshot = decode(blob).unwrap();

        let tags = snapshot.field("tags").unwrap();
        assert_eq!(
            tags,
            &FieldValue::Array(vec![
                (ArrayKey::Int(0), FieldValue::String("a".to_string())),
                (ArrayKey::String("key".to_string()), FieldValue::Float(1.5)),
            ])
        );
        assert_eq!(snapshot.field("inner"), Some(&FieldValue::Object(Snapshot::new("stdClass"))));
    }

    #[test]
    fn test_encoded_snapshot_decodes_to_same_fields() {
        let snapshot = Snapshot::new("App\\Messages\\DummyMessage")
            .with_field("content", FieldValue::String("Héllo".to_string()))
            .with_field("ratio", FieldValue::Float(0.25))
            .with_field("number", FieldValue::Null);

        let blob = encode(&snapshot);
        assert_eq!(decode(&blob).unwrap(), snapshot);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(decode(b""), Err(ZddError::Decode { .. })));
        assert!(matches!(decode(b"s:5:\"abc\";"), Err(ZddError::Decode { .. })));
        assert!(matches!(decode(b"i:1;"), Err(ZddError::Decode { .. })));
        assert!(matches!(
            decode(b"O:8:\"stdClass\":0:{}garbage"),
            Err(ZddError::Decode { .. })
        ));
    }

    fn nested_arrays(levels: usize) -> Vec<u8> {
        let mut blob = br#"O:8:"stdClass":1:{s:1:"x";"#.to_vec();
        blob.extend("a:1:{i:0;".repeat(levels).into_bytes());
        blob.extend_from_slice(b"N;");
        blob.extend("}".repeat(levels).into_bytes());
        blob.push(b'}');
        blob
    }

    #[test]
    fn test_moderate_nesting_accepted() {
        let snapshot = decode(&nested_arrays(100)).unwrap();
        assert_eq!(snapshot.field("x").map(FieldValue::kind), Some("array"));
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let result = decode(&nested_arrays(200_000));
        assert!(matches!(
            result,
            Err(ZddError::Decode { ref message, .. }) if message == "nesting too deep"
        ));
    }

    #[test]
    fn test_trailing_newline_accepted() {
        assert!(decode(b"O:8:\"stdClass\":0:{}\n").is_ok());
    }
}
