use std::fmt;

use clap::ValueEnum;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Number, Value};

use crate::error::DecodeError;
use crate::event::Record;

/// Key used by the `text` format when none is configured.
pub const DEFAULT_MESSAGE_KEY: &str = "message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
/// Payload formats understood by the decoder
pub enum Format {
    Json,
    Ltsv,
    Msgpack,
    Text,
}

impl Default for Format {
    fn default() -> Self {
        Format::Json
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Format::Json => write!(f, "json"),
            Format::Ltsv => write!(f, "ltsv"),
            Format::Msgpack => write!(f, "msgpack"),
            Format::Text => write!(f, "text"),
        }
    }
}

/// Decodes a raw payload into a record.
///
/// `message_key` is only consulted by [`Format::Text`], which wraps the whole
/// payload under that key and never fails.
pub fn decode(raw: &[u8], format: Format, message_key: &str) -> Result<Record, DecodeError> {
    match format {
        Format::Json => parse_json(raw),
        Format::Ltsv => parse_ltsv(raw),
        Format::Msgpack => parse_msgpack(raw),
        Format::Text => {
            let mut record = Record::new();
            record.insert(
                message_key.to_owned(),
                Value::String(String::from_utf8_lossy(raw).into_owned()),
            );
            Ok(record)
        }
    }
}

fn parse_json(raw: &[u8]) -> Result<Record, DecodeError> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(DecodeError::new(
            Format::Json,
            raw,
            format!("expected an object, got {}", kind(&other)),
        )),
        Err(e) => Err(DecodeError::new(Format::Json, raw, e)),
    }
}

fn parse_msgpack(raw: &[u8]) -> Result<Record, DecodeError> {
    let mut rest = raw;
    let value = match rmp_serde::from_read::<_, MsgpackValue>(&mut rest) {
        Ok(MsgpackValue(value)) => value,
        Err(e) => return Err(DecodeError::new(Format::Msgpack, raw, e)),
    };

    if !rest.is_empty() {
        return Err(DecodeError::new(
            Format::Msgpack,
            raw,
            format!("{} trailing bytes after the map", rest.len()),
        ));
    }

    match value {
        Value::Object(record) => Ok(record),
        other => Err(DecodeError::new(
            Format::Msgpack,
            raw,
            format!("expected a map, got {}", kind(&other)),
        )),
    }
}

/// A msgpack document mapped onto json values. `bin` becomes a string when it
/// holds UTF-8 and base64 otherwise, `ext` becomes `[type, data]` and map keys
/// that are not strings are rendered as json text.
struct MsgpackValue(Value);

impl<'de> Deserialize<'de> for MsgpackValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MsgpackVisitor).map(MsgpackValue)
    }
}

struct MsgpackVisitor;

impl<'de> Visitor<'de> for MsgpackVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a msgpack value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(match std::str::from_utf8(v) {
            Ok(s) => Value::String(s.to_owned()),
            Err(_) => Value::String(base64::encode(v)),
        })
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(MsgpackValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut record = Record::new();
        while let Some((MsgpackValue(key), MsgpackValue(value))) = map.next_entry()? {
            let key = match key {
                Value::String(s) => s,
                other => other.to_string(),
            };
            record.insert(key, value);
        }
        Ok(Value::Object(record))
    }
}

// Labeled Tab-separated Values, see http://ltsv.org
fn parse_ltsv(raw: &[u8]) -> Result<Record, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|e| DecodeError::new(Format::Ltsv, raw, e))?;

    let mut record = Record::new();
    for line in text.lines().filter(|l| !l.is_empty()) {
        for field in line.split('\t').filter(|f| !f.is_empty()) {
            match field.split_once(':') {
                Some((label, value)) if !label.is_empty() => {
                    record.insert(label.to_owned(), Value::String(value.to_owned()));
                }
                _ => {
                    return Err(DecodeError::new(
                        Format::Ltsv,
                        raw,
                        format!("malformed field '{}'", field),
                    ))
                }
            }
        }
    }

    if record.is_empty() {
        return Err(DecodeError::new(Format::Ltsv, raw, "no fields"));
    }
    Ok(record)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
