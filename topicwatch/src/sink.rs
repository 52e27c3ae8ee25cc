use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::SecondsFormat;
use serde::Serialize;

use crate::error::Error;
use crate::event::{Event, EventBatch};

/// Receives the batches produced by the topic watchers.
///
/// A single sink is shared by every watcher, so implementations must accept
/// concurrent calls. `emit` is called once per non-empty tick and must not
/// block waiting on downstream acknowledgement.
pub trait Sink: Send + Sync {
    fn emit(&self, tag: &str, batch: EventBatch) -> Result<(), Error>;
}

/// Writes one line per event to stdout, either `<time> <tag>: <record>` or,
/// in json mode, `{"tag":..,"time":..,"record":..}`.
#[derive(Debug, Default)]
pub struct StdoutSink {
    json: bool,
    emitted: AtomicU64,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json() -> Self {
        Self {
            json: true,
            ..Self::default()
        }
    }

    /// Total number of events written so far.
    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Renders the whole batch before writing it in one call, so a batch that
    /// fails to render leaves nothing behind.
    fn write_batch<W: Write>(
        &self,
        out: &mut W,
        tag: &str,
        batch: &EventBatch,
    ) -> Result<(), Error> {
        let mut buf = String::new();
        for event in batch {
            let line = if self.json {
                format_json(tag, event)?
            } else {
                format_event(tag, event)?
            };
            buf.push_str(&line);
            buf.push('\n');
        }

        out.write_all(buf.as_bytes())?;
        out.flush()?;

        self.emitted.fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

impl Sink for StdoutSink {
    fn emit(&self, tag: &str, batch: EventBatch) -> Result<(), Error> {
        self.write_batch(&mut std::io::stdout().lock(), tag, &batch)
    }
}

pub fn format_event(tag: &str, event: &Event) -> Result<String, Error> {
    let record = serde_json::to_string(&event.record).map_err(|e| Error::Sink {
        tag: tag.to_owned(),
        reason: e.to_string(),
    })?;

    Ok(format!(
        "{} {}: {}",
        event.time.to_rfc3339_opts(SecondsFormat::Nanos, true),
        tag,
        record
    ))
}

#[derive(Serialize)]
struct TaggedEvent<'a> {
    tag: &'a str,
    #[serde(flatten)]
    event: &'a Event,
}

pub fn format_json(tag: &str, event: &Event) -> Result<String, Error> {
    serde_json::to_string(&TaggedEvent { tag, event }).map_err(|e| Error::Sink {
        tag: tag.to_owned(),
        reason: e.to_string(),
    })
}
