//! Record codec: normalization between typed [`Record`]s and the documents a
//! store accepts, plus the JSON interchange form.
//!
//! Encoding lifts `id` and `meta` into the reserved `_id` / `_ts_meta` keys
//! and narrows values the store cannot represent (unsigned integers become
//! signed, non-finite floats are rejected). Decoding reverses the lift.
//!
//! JSON interchange uses single-key wrapper objects for the value kinds JSON
//! lacks: `{"$binary": "<hex>"}`, `{"$date": "<rfc3339>"}` and
//! `{"$handle": "<uuid>"}`. Document keys starting with `$` are written with
//! one extra leading `$` and unescaped on read, so a user object can never be
//! mistaken for a wrapper.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number};

use crate::error::TypeError;
use crate::handle::BlobHandle;
use crate::keys::{ID_KEY, META_KEY, SESSION_KEY, SYS_TIME_KEY};
use crate::record::{Record, RecordId, RecordMeta};
use crate::value::{Document, Value};

const JSON_BINARY: &str = "$binary";
const JSON_DATE: &str = "$date";
const JSON_HANDLE: &str = "$handle";
const KEY_ESCAPE: char = '$';

// ---------------------------------------------------------------------------
// Record <-> Document
// ---------------------------------------------------------------------------

/// Encode a record into the document form the store accepts.
pub fn encode_record(record: &Record) -> Result<Document, TypeError> {
    if let Some(key) = [ID_KEY, META_KEY]
        .into_iter()
        .find(|k| record.body.contains_key(k))
    {
        return Err(TypeError::ReservedKey(key.to_string()));
    }

    let mut doc = normalize_document(record.body.clone())?;
    doc.insert(ID_KEY, record.id);
    doc.insert(META_KEY, encode_meta(&record.meta));
    Ok(doc)
}

/// Decode a stored document back into a typed record.
pub fn decode_record(mut doc: Document) -> Result<Record, TypeError> {
    let id = match doc.remove(ID_KEY) {
        Some(Value::String(s)) => s.parse::<RecordId>()?,
        Some(other) => {
            return Err(TypeError::Malformed {
                field: ID_KEY.into(),
                reason: format!("expected string, found {}", other.type_name()),
            })
        }
        None => return Err(TypeError::MissingField(ID_KEY.into())),
    };

    let meta = match doc.remove(META_KEY) {
        Some(Value::Document(meta)) => decode_meta(&meta)?,
        Some(Value::Null) | None => RecordMeta::default(),
        Some(other) => {
            return Err(TypeError::Malformed {
                field: META_KEY.into(),
                reason: format!("expected document, found {}", other.type_name()),
            })
        }
    };

    Ok(Record { id, meta, body: doc })
}

/// Normalize every value in a document to a store-representable form.
pub fn normalize_document(doc: Document) -> Result<Document, TypeError> {
    doc.into_iter()
        .map(|(key, value)| {
            let value = normalize_value(&key, value)?;
            Ok::<_, TypeError>((key, value))
        })
        .collect()
}

fn normalize_value(path: &str, value: Value) -> Result<Value, TypeError> {
    match value {
        Value::UInt(u) => i64::try_from(u)
            .map(Value::Int)
            .map_err(|_| TypeError::IntegerOverflow {
                key: path.to_string(),
                value: u,
            }),
        Value::Float(f) if !f.is_finite() => Err(TypeError::NonFiniteFloat {
            key: path.to_string(),
        }),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| normalize_value(&format!("{path}.{i}"), item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Document(doc) => doc
            .into_iter()
            .map(|(key, item)| {
                let item = normalize_value(&format!("{path}.{key}"), item)?;
                Ok::<_, TypeError>((key, item))
            })
            .collect::<Result<Document, TypeError>>()
            .map(Value::Document),
        other => Ok(other),
    }
}

fn encode_meta(meta: &RecordMeta) -> Document {
    let mut doc = Document::new();
    if let Some(session) = &meta.session {
        doc.insert(SESSION_KEY, session.clone());
    }
    if let Some(time) = meta.sys_time {
        doc.insert(SYS_TIME_KEY, time);
    }
    doc
}

fn decode_meta(doc: &Document) -> Result<RecordMeta, TypeError> {
    let session = match doc.get(SESSION_KEY) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(TypeError::Malformed {
                field: format!("{META_KEY}.{SESSION_KEY}"),
                reason: format!("expected string, found {}", other.type_name()),
            })
        }
    };
    let sys_time = match doc.get(SYS_TIME_KEY) {
        Some(Value::Time(t)) => Some(*t),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(TypeError::Malformed {
                field: format!("{META_KEY}.{SYS_TIME_KEY}"),
                reason: format!("expected time, found {}", other.type_name()),
            })
        }
    };
    Ok(RecordMeta { session, sys_time })
}

// ---------------------------------------------------------------------------
// JSON interchange
// ---------------------------------------------------------------------------

/// Convert a document to JSON. Non-finite floats become `null`.
pub fn document_to_json(doc: &Document) -> serde_json::Value {
    serde_json::Value::Object(
        doc.iter()
            .map(|(k, v)| (escape_key(k), value_to_json(v)))
            .collect(),
    )
}

fn escape_key(key: &str) -> String {
    if key.starts_with(KEY_ESCAPE) {
        format!("{KEY_ESCAPE}{key}")
    } else {
        key.to_string()
    }
}

fn unescape_key(mut key: String) -> String {
    if key.starts_with("$$") {
        key.remove(0);
    }
    key
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::UInt(u) => Json::Number((*u).into()),
        Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s.clone()),
        Value::Time(t) => wrapper(
            JSON_DATE,
            t.to_rfc3339_opts(SecondsFormat::Nanos, true),
        ),
        Value::Binary(b) => wrapper(JSON_BINARY, hex::encode(b)),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Document(doc) => document_to_json(doc),
        Value::Handle(h) => wrapper(JSON_HANDLE, h.to_string()),
    }
}

fn wrapper(tag: &str, body: String) -> serde_json::Value {
    let mut map = Map::new();
    map.insert(tag.to_string(), serde_json::Value::String(body));
    serde_json::Value::Object(map)
}

/// Parse a JSON object into a document.
pub fn document_from_json(json: serde_json::Value) -> Result<Document, TypeError> {
    match value_from_json(json)? {
        Value::Document(doc) => Ok(doc),
        other => Err(TypeError::Json(format!(
            "expected a JSON object, found {}",
            other.type_name()
        ))),
    }
}

pub fn value_from_json(json: serde_json::Value) -> Result<Value, TypeError> {
    use serde_json::Value as Json;
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(
            items
                .into_iter()
                .map(value_from_json)
                .collect::<Result<_, _>>()?,
        ),
        Json::Object(map) => {
            if let Some(value) = unwrap_tagged(&map)? {
                return Ok(value);
            }
            Value::Document(
                map.into_iter()
                    .map(|(k, v)| Ok::<_, TypeError>((unescape_key(k), value_from_json(v)?)))
                    .collect::<Result<Document, TypeError>>()?,
            )
        }
    })
}

fn unwrap_tagged(map: &Map<String, serde_json::Value>) -> Result<Option<Value>, TypeError> {
    if map.len() != 1 {
        return Ok(None);
    }
    let Some((tag, serde_json::Value::String(body))) = map.iter().next() else {
        return Ok(None);
    };
    let value = match tag.as_str() {
        JSON_BINARY => {
            let bytes = hex::decode(body).map_err(|e| TypeError::Malformed {
                field: JSON_BINARY.into(),
                reason: e.to_string(),
            })?;
            Value::Binary(Bytes::from(bytes))
        }
        JSON_DATE => {
            let time = DateTime::parse_from_rfc3339(body).map_err(|e| TypeError::Malformed {
                field: JSON_DATE.into(),
                reason: e.to_string(),
            })?;
            Value::Time(time.with_timezone(&Utc))
        }
        JSON_HANDLE => Value::Handle(body.parse::<BlobHandle>()?),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn sample_record() -> Record {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Record::new(
            Document::new()
                .with("a", 1i64)
                .with("b", Document::new().with("c", vec![1u8, 2, 3])),
        )
        .with_session("S1")
        .with_sys_time(time)
    }

    // -----------------------------------------------------------------------
    // Record codec
    // -----------------------------------------------------------------------

    #[test]
    fn encode_lifts_id_and_meta() {
        let record = sample_record();
        let doc = encode_record(&record).unwrap();
        assert_eq!(doc.get(ID_KEY), Some(&Value::String(record.id.to_string())));
        assert_eq!(
            doc.get_path("_ts_meta.session"),
            Some(&Value::String("S1".into()))
        );
        assert!(doc.get_path("_ts_meta.sys_time").is_some());
        assert_eq!(doc.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn decode_reverses_encode() {
        let record = sample_record();
        let decoded = decode_record(encode_record(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn encode_rejects_reserved_body_keys() {
        let mut record = sample_record();
        record.body.insert(ID_KEY, "mine");
        assert_eq!(
            encode_record(&record),
            Err(TypeError::ReservedKey(ID_KEY.into()))
        );
    }

    #[test]
    fn encode_narrows_unsigned_integers() {
        let mut record = sample_record();
        record.body.insert("small", 7u64);
        let doc = encode_record(&record).unwrap();
        assert_eq!(doc.get("small"), Some(&Value::Int(7)));
    }

    #[test]
    fn encode_rejects_oversized_unsigned() {
        let mut record = sample_record();
        record
            .body
            .insert("nested", Document::new().with("big", u64::MAX));
        assert_eq!(
            encode_record(&record),
            Err(TypeError::IntegerOverflow {
                key: "nested.big".into(),
                value: u64::MAX
            })
        );
    }

    #[test]
    fn encode_rejects_nan() {
        let mut record = sample_record();
        record
            .body
            .insert("list", Value::Array(vec![Value::Float(f64::NAN)]));
        assert_eq!(
            encode_record(&record),
            Err(TypeError::NonFiniteFloat {
                key: "list.0".into()
            })
        );
    }

    #[test]
    fn decode_requires_id() {
        let doc = Document::new().with("a", 1i64);
        assert_eq!(
            decode_record(doc),
            Err(TypeError::MissingField(ID_KEY.into()))
        );
    }

    #[test]
    fn decode_tolerates_missing_meta() {
        let id = RecordId::new();
        let record = decode_record(Document::new().with(ID_KEY, id)).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.meta, RecordMeta::default());
    }

    #[test]
    fn decode_rejects_malformed_meta() {
        let doc = Document::new()
            .with(ID_KEY, RecordId::new())
            .with(META_KEY, Document::new().with(SESSION_KEY, 4i64));
        assert!(matches!(
            decode_record(doc),
            Err(TypeError::Malformed { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // JSON interchange
    // -----------------------------------------------------------------------

    #[test]
    fn json_roundtrip_preserves_special_kinds() {
        let doc = encode_record(&sample_record())
            .unwrap()
            .with("h", BlobHandle::new())
            .with("f", 2.5f64)
            .with("list", Value::Array(vec![Value::Null, Value::Bool(true)]));
        let json = document_to_json(&doc);
        assert_eq!(json["b"]["c"]["$binary"], "010203");
        let parsed = document_from_json(json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn json_plain_objects_stay_documents() {
        let json = serde_json::json!({"x": {"$binary": "00", "other": 1}});
        let doc = document_from_json(json).unwrap();
        assert!(doc.get("x").unwrap().as_document().is_some());
    }

    #[test]
    fn json_user_objects_shaped_like_wrappers_stay_documents() {
        let doc = Document::new()
            .with("x", Document::new().with("$binary", "00"))
            .with("y", Document::new().with("$binary", "zz"))
            .with("$$z", 1i64);
        let json = document_to_json(&doc);
        assert_eq!(json["x"]["$$binary"], "00");
        assert_eq!(json["$$$z"], 1);
        assert_eq!(document_from_json(json).unwrap(), doc);
    }

    #[test]
    fn json_rejects_bad_binary() {
        let json = serde_json::json!({"x": {"$binary": "zz"}});
        assert!(matches!(
            document_from_json(json),
            Err(TypeError::Malformed { .. })
        ));
    }

    #[test]
    fn json_top_level_must_be_object() {
        assert!(matches!(
            document_from_json(serde_json::json!([1, 2])),
            Err(TypeError::Json(_))
        ));
    }

    proptest! {
        #[test]
        fn json_roundtrip_binary_payloads(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let doc = Document::new().with("payload", data.clone());
            let parsed = document_from_json(document_to_json(&doc)).unwrap();
            prop_assert_eq!(parsed.get("payload"), Some(&Value::from(data)));
        }
    }
}
