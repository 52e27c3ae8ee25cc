use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::{ConsumerConfig, DEFAULT_INTERVAL, MAX_INTERVAL};
use crate::decoder::{self, Format, DEFAULT_MESSAGE_KEY};
use crate::error::Error;
use crate::event::{Clock, EventBatch};
use crate::shutdown::Shutdown;
use crate::sink::Sink;

use super::subscription::{Subscriber, TopicSubscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Lifecycle of a topic watcher
pub enum WatcherState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl WatcherState {
    fn can_become(self, next: WatcherState) -> bool {
        use WatcherState::*;
        matches!(
            (self, next),
            (Idle, Running) | (Idle, Stopping) | (Running, Stopping) | (Stopping, Stopped)
        )
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WatcherState::Idle => write!(f, "Idle"),
            WatcherState::Running => write!(f, "Running"),
            WatcherState::Stopping => write!(f, "Stopping"),
            WatcherState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Builds the routing tag `prefix.topic.suffix`, leaving out unset segments.
pub fn compose_tag(prefix: Option<&str>, topic: &str, suffix: Option<&str>) -> String {
    let mut tag = String::new();
    if let Some(p) = prefix {
        tag.push_str(p);
        tag.push('.');
    }
    tag.push_str(topic);
    if let Some(s) = suffix {
        tag.push('.');
        tag.push_str(s);
    }
    tag
}

/// Per-topic watcher settings.
#[derive(Clone, Debug, PartialEq)]
pub struct WatcherConfig {
    pub topic: String,
    pub interval: Duration,
    pub format: Format,
    pub message_key: String,
    pub add_prefix: Option<String>,
    pub add_suffix: Option<String>,
}

impl WatcherConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            interval: DEFAULT_INTERVAL,
            format: Format::default(),
            message_key: DEFAULT_MESSAGE_KEY.to_owned(),
            add_prefix: None,
            add_suffix: None,
        }
    }

    /// One watcher config per configured topic.
    pub fn for_topics(config: &ConsumerConfig) -> Vec<WatcherConfig> {
        config
            .topics
            .iter()
            .map(|topic| WatcherConfig {
                topic: topic.clone(),
                interval: config.interval,
                format: config.format,
                message_key: config.message_key.clone(),
                add_prefix: config.add_prefix.clone(),
                add_suffix: config.add_suffix.clone(),
            })
            .collect()
    }
}

/// Shortest tick period a watcher will schedule.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically drains one topic and forwards the decoded records to the
/// sink as a single batch per tick.
pub struct TopicWatcher {
    topic: String,
    tag: String,
    interval: Duration,
    format: Format,
    message_key: String,
    state: WatcherState,
    subscriber: Arc<dyn Subscriber>,
    subscription: Option<Box<dyn TopicSubscription>>,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
}

impl TopicWatcher {
    pub fn new(
        config: WatcherConfig,
        subscriber: Arc<dyn Subscriber>,
        sink: Arc<dyn Sink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tag = compose_tag(
            config.add_prefix.as_deref(),
            &config.topic,
            config.add_suffix.as_deref(),
        );

        Self {
            topic: config.topic,
            tag,
            interval: config.interval.clamp(MIN_INTERVAL, MAX_INTERVAL),
            format: config.format,
            message_key: config.message_key,
            state: WatcherState::Idle,
            subscriber,
            subscription: None,
            sink,
            clock,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    fn transition(&mut self, next: WatcherState) {
        if !self.state.can_become(next) {
            warn!(
                "Ignoring watcher transition {} -> {} for topic {}",
                self.state, next, self.topic
            );
            return;
        }

        debug!("Watcher for topic {}: {} -> {}", self.topic, self.state, next);
        self.state = next;
    }

    fn subscription(&mut self) -> Result<&mut Box<dyn TopicSubscription>, Error> {
        let s = match self.subscription.take() {
            Some(s) => s,
            None => self.subscriber.subscribe(&self.topic)?,
        };
        Ok(self.subscription.insert(s))
    }

    /// Runs one drain/decode/emit cycle and returns the number of emitted
    /// records.
    ///
    /// Undecodable messages are logged and skipped. Any other failure is
    /// returned, leaving the retry to the next tick.
    pub async fn on_tick(&mut self) -> Result<usize, Error> {
        trace!("Will check messages on topic {}", self.topic);

        let messages = self.subscription()?.poll_available().await?;

        let mut batch = EventBatch::new();
        for message in messages {
            match decoder::decode(&message.payload, self.format, &self.message_key) {
                Ok(record) => batch.push(self.clock.now(), record),
                Err(e) => {
                    warn!(
                        "Skipping message on topic {} (partition {}, offset {}): {}",
                        self.topic, message.partition, message.offset, e
                    );
                }
            }
        }

        if batch.is_empty() {
            return Ok(0);
        }

        let emitted = batch.len();
        self.sink.emit(&self.tag, batch)?;
        debug!("Emitted {} records with tag {}", emitted, self.tag);

        Ok(emitted)
    }

    /// Runs `on_tick` and contains whatever it throws.
    async fn tick(&mut self) {
        match AssertUnwindSafe(self.on_tick()).catch_unwind().await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!("Failed to consume topic {}: {}", self.topic, e),
            Err(panic) => error!(
                "unexpected error while consuming topic {}: {}",
                self.topic,
                panic_message(&*panic)
            ),
        }
    }

    /// Ticks every `interval` until `sd` begins, then releases the
    /// subscription.
    ///
    /// A tick in flight when the signal arrives is completed first. Ticks
    /// never overlap; a tick that outlasts the interval delays the next one.
    pub async fn run(mut self, sd: Arc<Shutdown>) -> WatcherState {
        if let Err(e) = self.subscription() {
            error!(
                "Failed to subscribe to topic {}, retrying on next tick: {}",
                self.topic, e
            );
        }

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.transition(WatcherState::Running);

        loop {
            tokio::select! {
                biased;
                _ = sd.wait_begin() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        self.transition(WatcherState::Stopping);
        if let Some(mut s) = self.subscription.take() {
            s.close();
        }
        self.transition(WatcherState::Stopped);

        self.state
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
