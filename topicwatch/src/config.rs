use std::time::Duration;

use crate::decoder::{Format, DEFAULT_MESSAGE_KEY};
use crate::error::ConfigError;

/// Tick period used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Longest accepted tick period.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Fetch tuning passed through to the broker client. Unset options keep the
/// client defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// Maximum number of bytes to fetch.
    pub max_bytes: Option<u32>,
    /// How long the broker may block before answering a fetch.
    pub max_wait_ms: Option<u32>,
    /// Smallest amount of data the broker should send back.
    pub min_bytes: Option<u32>,
    /// Network request timeout, should be higher than `max_wait_ms`.
    pub socket_timeout_ms: Option<u32>,
}

/// Validated settings for a consumer process.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsumerConfig {
    /// broker host:port entries
    pub brokers: Vec<String>,
    pub consumer_group: String,
    /// one watcher is created per topic
    pub topics: Vec<String>,
    pub interval: Duration,
    pub format: Format,
    /// record key for the `text` format
    pub message_key: String,
    pub add_prefix: Option<String>,
    pub add_suffix: Option<String>,
    pub options: SubscriptionOptions,
}

impl ConsumerConfig {
    pub fn new(brokers: Vec<String>, consumer_group: String, topics: Vec<String>) -> Self {
        Self {
            brokers,
            consumer_group,
            topics,
            interval: DEFAULT_INTERVAL,
            format: Format::default(),
            message_key: DEFAULT_MESSAGE_KEY.to_owned(),
            add_prefix: None,
            add_suffix: None,
            options: SubscriptionOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brokers.iter().all(|b| b.trim().is_empty()) {
            return Err(ConfigError::Required("brokers"));
        }
        if self.topics.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::Required("topics"));
        }
        if self.consumer_group.trim().is_empty() {
            return Err(ConfigError::Required("consumer_group"));
        }
        if self.interval.is_zero() {
            return Err(ConfigError::NotPositive {
                name: "interval",
                value: 0,
            });
        }
        if self.interval > MAX_INTERVAL {
            return Err(ConfigError::TooLarge {
                name: "interval",
                value: self.interval.as_secs(),
                max: MAX_INTERVAL.as_secs(),
            });
        }
        if self.message_key.is_empty() {
            return Err(ConfigError::Required("message_key"));
        }
        Ok(())
    }
}

/// Splits a comma-separated parameter into trimmed, non-empty entries.
///
/// Fails when the parameter is unset or yields no entries.
pub fn split_list(name: &'static str, raw: Option<&str>) -> Result<Vec<String>, ConfigError> {
    let entries = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect::<Vec<_>>();

    if entries.is_empty() {
        return Err(ConfigError::Required(name));
    }
    Ok(entries)
}

/// Turns an optional string parameter into `None` when it is blank.
pub fn non_blank(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ConsumerConfig {
        ConsumerConfig::new(
            vec!["localhost:9092".into()],
            "group".into(),
            vec!["a".into(), "b".into()],
        )
    }

    #[test]
    fn split_list_trims_entries() {
        assert_eq!(
            split_list("topics", Some(" a, b ,,c ")).unwrap(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn split_list_rejects_empty_lists() {
        assert_eq!(
            split_list("brokers", None),
            Err(ConfigError::Required("brokers"))
        );
        assert_eq!(
            split_list("topics", Some(" , ,")),
            Err(ConfigError::Required("topics"))
        );
    }

    #[test]
    fn defaults() {
        let c = valid();
        assert_eq!(c.interval, Duration::from_secs(1));
        assert_eq!(c.format, Format::Json);
        assert_eq!(c.message_key, "message");
        assert_eq!(c.options, SubscriptionOptions::default());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn missing_consumer_group_is_rejected() {
        let mut c = valid();
        c.consumer_group = "  ".into();
        assert_eq!(c.validate(), Err(ConfigError::Required("consumer_group")));
    }

    #[test]
    fn empty_lists_are_rejected() {
        let mut c = valid();
        c.topics.clear();
        assert_eq!(c.validate(), Err(ConfigError::Required("topics")));

        let mut c = valid();
        c.brokers = vec!["".into()];
        assert_eq!(c.validate(), Err(ConfigError::Required("brokers")));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut c = valid();
        c.interval = Duration::ZERO;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::NotPositive { name: "interval", .. })
        ));
    }

    #[test]
    fn oversized_interval_is_rejected() {
        let mut c = valid();
        c.interval = MAX_INTERVAL;
        assert!(c.validate().is_ok());

        c.interval = Duration::from_secs(u64::MAX);
        assert_eq!(
            c.validate(),
            Err(ConfigError::TooLarge {
                name: "interval",
                value: u64::MAX,
                max: 86_400,
            })
        );
    }

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(non_blank(Some(" ".into())), None);
        assert_eq!(non_blank(Some("p".into())), Some("p".into()));
        assert_eq!(non_blank(None), None);
    }
}
