//! # Document Streams and Generic Values
//!
//! Splits multi-document YAML streams and converts documents to and from
//! the generic `serde_json::Value` tree that schema validation works on.
//!
//! ## Decode modes
//!
//! - [`DecodeMode::Lenient`] decodes straight into a JSON value; repeated
//!   mapping keys keep the last occurrence.
//! - [`DecodeMode::Strict`] decodes through `serde_yaml::Value` first, which
//!   rejects repeated mapping keys, then converts the tree.
//!
//! Encoding always produces compact JSON with sorted keys. JSON is a YAML
//! subset, so encoded documents decode again in either mode and re-encode
//! to the same bytes.

use std::io::Read;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;

/// How strictly to decode a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Accept repeated keys.
    #[default]
    Lenient,
    /// Reject repeated keys.
    Strict,
}

fn separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\s*\n)---\s*").expect("static pattern compiles"))
}

/// Split a YAML stream into its documents.
///
/// The stream is trimmed first; a leading separator therefore produces an
/// empty first document. Callers skip blank documents as they see fit.
pub fn split_documents(stream: &str) -> Vec<String> {
    separator()
        .split(stream.trim())
        .map(str::to_string)
        .collect()
}

/// Read a whole YAML stream from `reader` and split it.
///
/// # Errors
///
/// [`ValidationError::Read`] if the reader fails or the stream is not UTF-8.
pub fn read_documents(mut reader: impl Read) -> Result<Vec<String>, ValidationError> {
    let mut stream = String::new();
    reader.read_to_string(&mut stream)?;
    Ok(split_documents(&stream))
}

/// Decode a document into a generic value.
///
/// Blank documents decode to `Value::Null`.
///
/// # Errors
///
/// [`ValidationError::InvalidEncoding`] if the bytes are not YAML, carry a
/// non-scalar mapping key, or (strict mode) repeat a mapping key.
pub fn decode_value(content: &[u8], mode: DecodeMode) -> Result<Value, ValidationError> {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    match mode {
        DecodeMode::Lenient => serde_yaml::from_slice::<Value>(content)
            .map_err(|e| ValidationError::encoding("document unmarshal failed", e)),
        DecodeMode::Strict => {
            let yaml: serde_yaml::Value = serde_yaml::from_slice(content)
                .map_err(|e| ValidationError::encoding("document strict unmarshal failed", e))?;
            yaml_to_json_value(&yaml)
                .map_err(|e| ValidationError::encoding("document strict unmarshal failed", e))
        }
    }
}

/// Encode a value as compact JSON.
///
/// # Errors
///
/// [`ValidationError::InvalidEncoding`] if serialization fails.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, ValidationError> {
    serde_json::to_vec(value).map_err(|e| ValidationError::encoding("document marshal failed", e))
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// YAML has a richer type system than JSON (tags, non-string keys), but
/// validated documents use only the JSON-compatible subset. Scalar keys are
/// stringified and tags are dropped.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn split_stream() {
        let stream = "
---
apiVersion: v1
kind: A
---
apiVersion: v1
kind: B
---
";
        let docs = split_documents(stream);
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0], "");
        assert_eq!(docs[1], "apiVersion: v1\nkind: A");
        assert_eq!(docs[2], "apiVersion: v1\nkind: B");
        assert_eq!(docs[3], "");
    }

    #[test]
    fn split_single_document() {
        assert_eq!(split_documents("kind: A\n"), vec!["kind: A".to_string()]);
    }

    #[test]
    fn read_stream() {
        let docs = read_documents("a: 1\n---\nb: 2\n".as_bytes()).unwrap();
        assert_eq!(docs, vec!["a: 1".to_string(), "b: 2".to_string()]);
    }

    #[test]
    fn decode_lenient_and_strict() {
        let doc = b"a: 1\nb: [x, y]\n";
        let expected = json!({"a": 1, "b": ["x", "y"]});
        assert_eq!(decode_value(doc, DecodeMode::Lenient).unwrap(), expected);
        assert_eq!(decode_value(doc, DecodeMode::Strict).unwrap(), expected);
    }

    #[test]
    fn strict_rejects_repeated_keys() {
        let doc = b"a: 1\na: 2\n";
        let err = decode_value(doc, DecodeMode::Strict).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
    }

    #[test]
    fn blank_document_is_null() {
        assert_eq!(decode_value(b"  \n", DecodeMode::Lenient).unwrap(), Value::Null);
    }

    #[test]
    fn invalid_yaml_is_encoding_error() {
        let err = decode_value(b"{invalid", DecodeMode::Lenient).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
    }

    #[test]
    fn encoded_json_decodes_to_same_bytes() {
        let value = json!({"kind": "A", "spec": {"port": 22, "tags": ["x"]}});
        let bytes = encode_value(&value).unwrap();
        let again = decode_value(&bytes, DecodeMode::Strict).unwrap();
        assert_eq!(encode_value(&again).unwrap(), bytes);
    }

    #[test]
    fn yaml_to_json_conversion() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: one\ntrue: yes\nn: 4.5\n").unwrap();
        let json = yaml_to_json_value(&yaml).unwrap();
        assert_eq!(json["1"], "one");
        assert_eq!(json["true"], "yes");
        assert_eq!(json["n"], 4.5);
    }
}
