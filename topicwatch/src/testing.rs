//! In-memory collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};

use crate::error::Error;
use crate::event::{Clock, EventBatch, Record};
use crate::kafka::subscription::{Subscriber, TopicSubscription};
use crate::kafka::RawMessage;
use crate::sink::Sink;

pub fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(m) => m,
        other => panic!("not an object: {}", other),
    }
}

/// Starts at a fixed instant and moves one millisecond per reading.
#[derive(Debug, Default)]
pub struct TestClock {
    ticks: AtomicI64,
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_millis_opt(1_600_000_000_000 + n).unwrap()
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<(String, EventBatch)>>,
    reject: AtomicBool,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<(String, EventBatch)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, tag: &str) -> Vec<EventBatch> {
        self.calls()
            .into_iter()
            .filter(|(t, _)| t == tag)
            .map(|(_, b)| b)
            .collect()
    }

    /// Makes the next `emit` fail.
    pub fn reject_next(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }
}

impl Sink for RecordingSink {
    fn emit(&self, tag: &str, batch: EventBatch) -> Result<(), Error> {
        assert!(!batch.is_empty(), "empty batch emitted for {}", tag);

        if self.reject.swap(false, Ordering::SeqCst) {
            return Err(Error::Sink {
                tag: tag.to_owned(),
                reason: "rejected".to_owned(),
            });
        }
        self.calls.lock().unwrap().push((tag.to_owned(), batch));
        Ok(())
    }
}

/// Shared between a scripted subscriber and the subscriptions it hands out.
#[derive(Debug, Default)]
pub struct Script {
    drains: Mutex<HashMap<String, VecDeque<Vec<RawMessage>>>>,
    failures: Mutex<HashMap<String, usize>>,
    panics: Mutex<HashMap<String, usize>>,
    poll_delay: Mutex<Duration>,
    fail_subscribe: AtomicBool,

    pub subscribes: AtomicUsize,
    pub polls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Script {
    fn take(map: &Mutex<HashMap<String, usize>>, topic: &str) -> bool {
        match map.lock().unwrap().get_mut(topic) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

/// Serves pre-recorded drains per topic. A drain with nothing scripted
/// returns no messages.
#[derive(Debug, Default)]
pub struct ScriptedSubscriber {
    script: Arc<Script>,
}

impl Deref for ScriptedSubscriber {
    type Target = Script;

    fn deref(&self) -> &Script {
        &self.script
    }
}

impl ScriptedSubscriber {
    pub fn push(&self, topic: &str, payloads: &[&[u8]]) {
        let mut drains = self.script.drains.lock().unwrap();
        let queue = drains.entry(topic.to_owned()).or_default();
        let base = queue.iter().map(Vec::len).sum::<usize>() as i64;

        queue.push_back(
            payloads
                .iter()
                .enumerate()
                .map(|(i, p)| RawMessage::new(p.to_vec(), 0, base + i as i64))
                .collect(),
        );
    }

    pub fn fail_next_poll(&self, topic: &str) {
        *self.script.failures.lock().unwrap().entry(topic.to_owned()).or_default() += 1;
    }

    pub fn panic_next_poll(&self, topic: &str) {
        *self.script.panics.lock().unwrap().entry(topic.to_owned()).or_default() += 1;
    }

    pub fn fail_next_subscribe(&self) {
        self.script.fail_subscribe.store(true, Ordering::SeqCst);
    }

    pub fn set_poll_delay(&self, delay: Duration) {
        *self.script.poll_delay.lock().unwrap() = delay;
    }
}

impl Subscriber for ScriptedSubscriber {
    fn subscribe(&self, topic: &str) -> Result<Box<dyn TopicSubscription>, Error> {
        self.script.subscribes.fetch_add(1, Ordering::SeqCst);

        if self.script.fail_subscribe.swap(false, Ordering::SeqCst) {
            return Err(KafkaError::ClientCreation("scripted failure".to_owned()).into());
        }
        Ok(Box::new(ScriptedSubscription {
            topic: topic.to_owned(),
            script: self.script.clone(),
        }))
    }
}

struct ScriptedSubscription {
    topic: String,
    script: Arc<Script>,
}

#[async_trait]
impl TopicSubscription for ScriptedSubscription {
    async fn poll_available(&mut self) -> Result<Vec<RawMessage>, Error> {
        if Script::take(&self.script.panics, &self.topic) {
            panic!("scripted panic on {}", self.topic);
        }

        let script = &self.script;
        script.polls.fetch_add(1, Ordering::SeqCst);
        let now = script.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        script.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *script.poll_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = if Script::take(&script.failures, &self.topic) {
            Err(KafkaError::MessageConsumption(RDKafkaErrorCode::BrokerTransportFailure).into())
        } else {
            let mut drains = script.drains.lock().unwrap();
            Ok(drains
                .get_mut(&self.topic)
                .and_then(VecDeque::pop_front)
                .unwrap_or_default())
        };

        script.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn close(&mut self) {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
    }
}
