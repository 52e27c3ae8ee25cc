use std::time::Duration;

use clap::Args;

use topicwatch::config::{non_blank, split_list, ConsumerConfig, SubscriptionOptions};
use topicwatch::decoder::Format;
use topicwatch::error::ConfigError;
use topicwatch::ingester::Output;
use topicwatch::logger::Level;

#[derive(Args, Debug)]
pub struct IngesterConfig {
    #[clap(
        short,
        long,
        env = "TOPICWATCH_LOG",
        default_value = "info",
        forbid_empty_values = true,
        help = "The logging level",
        value_enum
    )]
    /// The logging level
    pub log: Level,

    #[clap(
        long = "brokers",
        env = "TOPICWATCH_BROKERS",
        help = "List of broker-host:port, separated by commas"
    )]
    pub brokers: Option<String>,

    #[clap(
        long = "consumer-group",
        env = "TOPICWATCH_CONSUMER_GROUP",
        help = "Consumer group name"
    )]
    pub consumer_group: Option<String>,

    #[clap(
        long = "topics",
        env = "TOPICWATCH_TOPICS",
        help = "Topics to watch, separated by commas"
    )]
    pub topics: Option<String>,

    #[clap(
        long = "interval",
        env = "TOPICWATCH_INTERVAL",
        default_value = "1",
        help = "Seconds between two checks of a topic"
    )]
    pub interval: u64,

    #[clap(
        long = "format",
        env = "TOPICWATCH_FORMAT",
        default_value = "json",
        help = "Payload format",
        value_enum
    )]
    pub format: Format,

    #[clap(
        long = "message-key",
        env = "TOPICWATCH_MESSAGE_KEY",
        default_value = "message",
        help = "Record key holding the payload, for the text format only"
    )]
    pub message_key: String,

    #[clap(long = "add-prefix", env = "TOPICWATCH_ADD_PREFIX", help = "Tag prefix")]
    pub add_prefix: Option<String>,

    #[clap(long = "add-suffix", env = "TOPICWATCH_ADD_SUFFIX", help = "Tag suffix")]
    pub add_suffix: Option<String>,

    #[clap(
        long = "max-bytes",
        env = "TOPICWATCH_MAX_BYTES",
        help = "Maximum number of bytes to fetch"
    )]
    pub max_bytes: Option<u32>,

    #[clap(
        long = "max-wait-ms",
        env = "TOPICWATCH_MAX_WAIT_MS",
        help = "How long the broker may block before answering a fetch"
    )]
    pub max_wait_ms: Option<u32>,

    #[clap(
        long = "min-bytes",
        env = "TOPICWATCH_MIN_BYTES",
        help = "Smallest amount of data the broker should send back"
    )]
    pub min_bytes: Option<u32>,

    #[clap(
        long = "socket-timeout-ms",
        env = "TOPICWATCH_SOCKET_TIMEOUT_MS",
        help = "Network request timeout, should be higher than max-wait-ms"
    )]
    pub socket_timeout_ms: Option<u32>,

    #[clap(
        long = "output",
        env = "TOPICWATCH_OUTPUT",
        default_value = "stdout",
        help = "Where emitted events go",
        value_enum
    )]
    pub output: Output,
}

impl TryFrom<IngesterConfig> for topicwatch::ingester::IngesterConfig {
    type Error = ConfigError;

    fn try_from(c: IngesterConfig) -> Result<Self, ConfigError> {
        let consumer_group =
            non_blank(c.consumer_group).ok_or(ConfigError::Required("consumer_group"))?;

        let consumer = ConsumerConfig {
            brokers: split_list("brokers", c.brokers.as_deref())?,
            consumer_group,
            topics: split_list("topics", c.topics.as_deref())?,
            interval: Duration::from_secs(c.interval),
            format: c.format,
            message_key: c.message_key,
            add_prefix: non_blank(c.add_prefix),
            add_suffix: non_blank(c.add_suffix),
            options: SubscriptionOptions {
                max_bytes: c.max_bytes,
                max_wait_ms: c.max_wait_ms,
                min_bytes: c.min_bytes,
                socket_timeout_ms: c.socket_timeout_ms,
            },
        };
        consumer.validate()?;

        Ok(Self {
            output: c.output,
            consumer,
        })
    }
}
