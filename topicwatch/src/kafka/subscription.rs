use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use rdkafka::consumer::stream_consumer::StreamConsumer;
use rdkafka::consumer::Consumer;
use rdkafka::message::BorrowedMessage;
use rdkafka::{ClientConfig, Message};
use tokio::time::{timeout, Instant};

use crate::config::{ConsumerConfig, SubscriptionOptions};
use crate::error::Error;
use crate::kafka::config;

use super::RawMessage;

/// How long a drain waits for the next message when `max_wait_ms` is unset.
/// Matches the librdkafka default for `fetch.wait.max.ms`.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(500);

/// Upper bound on the messages returned by a single drain.
pub const MAX_DRAIN_MESSAGES: usize = 10_000;

/// Bounds on a single drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainLimits {
    /// A drain ends once no message arrives within this wait.
    pub idle_wait: Duration,
    /// Overall time a drain may take, however busy the topic is.
    pub max_duration: Duration,
    pub max_messages: usize,
}

/// Collects messages from `source` in arrival order until it goes quiet for
/// `idle_wait`, the overall deadline passes or `max_messages` were collected.
///
/// An error before any message fails the drain. An error after some messages
/// ends it and keeps what was received.
pub async fn drain<S>(
    topic: &str,
    source: &mut S,
    limits: DrainLimits,
) -> Result<Vec<RawMessage>, Error>
where
    S: Stream<Item = Result<RawMessage, Error>> + Unpin,
{
    let deadline = Instant::now() + limits.max_duration;
    let mut messages = Vec::new();

    while messages.len() < limits.max_messages {
        let wait = limits
            .idle_wait
            .min(deadline.saturating_duration_since(Instant::now()));
        if wait.is_zero() {
            debug!("drain deadline reached on topic {}", topic);
            break;
        }

        match timeout(wait, source.next()).await {
            // nothing more is available right now
            Err(_) | Ok(None) => break,
            Ok(Some(Err(e))) if messages.is_empty() => return Err(e),
            Ok(Some(Err(e))) => {
                warn!(
                    "Kafka error on topic {} after {} messages, ending drain: {}",
                    topic,
                    messages.len(),
                    e
                );
                break;
            }
            Ok(Some(Ok(m))) => messages.push(m),
        }
    }

    Ok(messages)
}

/// One topic subscription under a consumer group.
///
/// A subscription is owned by exactly one watcher and only ever accessed
/// through `&mut self`.
#[async_trait]
pub trait TopicSubscription: Send {
    /// Returns the messages that are available right now, in arrival order.
    /// Waits no longer than the subscription's own wait bounds.
    async fn poll_available(&mut self) -> Result<Vec<RawMessage>, Error>;

    /// Leaves the consumer group for this topic.
    fn close(&mut self);
}

/// Creates subscriptions for topics.
pub trait Subscriber: Send + Sync {
    fn subscribe(&self, topic: &str) -> Result<Box<dyn TopicSubscription>, Error>;
}

/// Subscribes to topics on a Kafka cluster, all under the same group.
#[derive(Clone, Debug)]
pub struct KafkaSubscriber {
    brokers: Vec<String>,
    group_id: String,
    interval: Duration,
    options: SubscriptionOptions,
}

impl KafkaSubscriber {
    pub fn new(config: &ConsumerConfig) -> Self {
        Self {
            brokers: config.brokers.clone(),
            group_id: config.consumer_group.clone(),
            interval: config.interval,
            options: config.options.clone(),
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut cc = ClientConfig::new();
        cc.set(config::BOOTSTRAP_SERVERS, self.brokers.join(","))
            .set(config::GROUP_ID, &self.group_id)
            .set("api.version.request", "true");

        let SubscriptionOptions {
            max_bytes,
            max_wait_ms,
            min_bytes,
            socket_timeout_ms,
        } = self.options;

        if let Some(v) = max_bytes {
            cc.set(config::FETCH_MAX_BYTES, v.to_string());
        }
        if let Some(v) = max_wait_ms {
            cc.set(config::FETCH_WAIT_MAX_MS, v.to_string());
        }
        if let Some(v) = min_bytes {
            cc.set(config::FETCH_MIN_BYTES, v.to_string());
        }
        if let Some(v) = socket_timeout_ms {
            cc.set(config::SOCKET_TIMEOUT_MS, v.to_string());
        }
        cc
    }

    fn idle_wait(&self) -> Duration {
        self.options
            .max_wait_ms
            .map(|ms| Duration::from_millis(ms.into()))
            .unwrap_or(DEFAULT_IDLE_WAIT)
    }

    /// A drain may last one tick interval, or one idle wait when that is longer.
    fn drain_limits(&self) -> DrainLimits {
        let idle_wait = self.idle_wait();
        DrainLimits {
            idle_wait,
            max_duration: self.interval.max(idle_wait),
            max_messages: MAX_DRAIN_MESSAGES,
        }
    }
}

impl Subscriber for KafkaSubscriber {
    fn subscribe(&self, topic: &str) -> Result<Box<dyn TopicSubscription>, Error> {
        debug!(
            "subscribing to topic {} with group '{}' at brokers {:?}",
            topic, self.group_id, self.brokers
        );

        let consumer = self.client_config().create::<StreamConsumer>()?;
        consumer.subscribe(&[topic])?;

        info!("Subscribed to topic {}", topic);
        Ok(Box::new(KafkaSubscription {
            topic: topic.to_owned(),
            inner: consumer,
            limits: self.drain_limits(),
        }))
    }
}

pub struct KafkaSubscription {
    topic: String,
    inner: StreamConsumer,
    limits: DrainLimits,
}

fn raw_message(m: BorrowedMessage<'_>) -> RawMessage {
    trace!(
        "topic: {}, partition: {}, offset: {}, timestamp: {:?}",
        m.topic(),
        m.partition(),
        m.offset(),
        m.timestamp()
    );

    RawMessage {
        payload: Bytes::copy_from_slice(m.payload().unwrap_or_default()),
        partition: m.partition(),
        offset: m.offset(),
    }
}

#[async_trait]
impl TopicSubscription for KafkaSubscription {
    async fn poll_available(&mut self) -> Result<Vec<RawMessage>, Error> {
        let stream = self
            .inner
            .stream()
            .map(|r| r.map(raw_message).map_err(Error::from));
        tokio::pin!(stream);

        drain(&self.topic, &mut stream, self.limits).await
    }

    fn close(&mut self) {
        self.inner.unsubscribe();
        info!("Unsubscribed from topic {}", self.topic);
    }
}
