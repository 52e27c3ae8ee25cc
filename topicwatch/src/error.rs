use std::io::Error as IoError;

use rdkafka::error::KafkaError;
use thiserror::Error;

use crate::decoder::Format;

#[derive(Error, Debug)]
pub enum Error {
    /// The configuration is missing a required parameter or holds an invalid one
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A single payload could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// There was an error talking to the brokers
    #[error("Kafka transport error: {0}")]
    Transport(#[from] KafkaError),

    /// The downstream sink did not accept a batch
    #[error("Sink rejected batch for tag '{tag}': {reason}")]
    Sink { tag: String, reason: String },

    /// There was a error processing io
    #[error("Couldn't process the specified stream: {0}")]
    Io(#[from] IoError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<Error> for String {
    fn from(e: Error) -> String {
        e.to_string()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("'{0}' is a required parameter")]
    Required(&'static str),

    #[error("'{name}' must be greater than zero, got {value}")]
    NotPositive { name: &'static str, value: u64 },

    #[error("'{name}' must be at most {max}, got {value}")]
    TooLarge {
        name: &'static str,
        value: u64,
        max: u64,
    },

    #[error("no watchers to schedule")]
    NoWatchers,
}

/// Longest payload excerpt carried into a decode failure.
pub const PAYLOAD_EXCERPT_LEN: usize = 256;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to decode {format} payload ({reason}): {payload}")]
pub struct DecodeError {
    pub format: Format,
    /// Payload as UTF-8 text, or base64 when the bytes are not valid UTF-8.
    pub payload: String,
    pub reason: String,
}

impl DecodeError {
    pub fn new(format: Format, raw: &[u8], reason: impl ToString) -> Self {
        Self {
            format,
            payload: excerpt(raw),
            reason: reason.to_string(),
        }
    }
}

fn excerpt(raw: &[u8]) -> String {
    let truncated = raw.len() > PAYLOAD_EXCERPT_LEN;
    let head = &raw[..raw.len().min(PAYLOAD_EXCERPT_LEN)];

    let mut text = match std::str::from_utf8(head) {
        Ok(s) => s.to_owned(),
        Err(e) if truncated && e.error_len().is_none() => {
            // cut in the middle of a multi-byte char
            String::from_utf8_lossy(&head[..e.valid_up_to()]).into_owned()
        }
        Err(_) => format!("base64:{}", base64::encode(head)),
    };

    if truncated {
        text.push_str("...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_payload_is_kept_as_text() {
        let e = DecodeError::new(Format::Json, b"{oops", "expected value");
        assert_eq!(e.payload, "{oops");
        assert!(e.to_string().contains("{oops"));
        assert!(e.to_string().contains("json"));
    }

    #[test]
    fn binary_payload_is_base64() {
        let e = DecodeError::new(Format::Msgpack, &[0xc1, 0xff], "invalid marker");
        assert_eq!(e.payload, "base64:wf8=");
    }

    #[test]
    fn sink_errors_name_the_tag() {
        let e = Error::Sink {
            tag: "kafka.a".into(),
            reason: "closed".into(),
        };
        assert_eq!(e.to_string(), "Sink rejected batch for tag 'kafka.a': closed");
    }

    #[test]
    fn long_payload_is_truncated() {
        let raw = vec![b'a'; PAYLOAD_EXCERPT_LEN + 10];
        let e = DecodeError::new(Format::Ltsv, &raw, "bad field");
        assert_eq!(e.payload.len(), PAYLOAD_EXCERPT_LEN + 3);
        assert!(e.payload.ends_with("..."));
    }
}
