use std::sync::Arc;

use clap::ValueEnum;

use crate::config::ConsumerConfig;
use crate::error::Error;
use crate::event::{Clock, SystemClock};
use crate::kafka::scheduler::WatcherScheduler;
use crate::kafka::subscription::{KafkaSubscriber, Subscriber};
use crate::kafka::watcher::{TopicWatcher, WatcherConfig};
use crate::sink::{Sink, StdoutSink};
use crate::BANNER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
/// Where emitted batches go
pub enum Output {
    /// `<time> <tag>: <record>` lines
    Stdout,
    /// one json object per event on stdout
    Json,
}

pub struct IngesterConfig {
    pub output: Output,
    pub consumer: ConsumerConfig,
}

/// One watcher per configured topic, all sharing the same subscriber, sink
/// and clock.
pub fn build_watchers(
    config: &ConsumerConfig,
    subscriber: Arc<dyn Subscriber>,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
) -> Vec<TopicWatcher> {
    WatcherConfig::for_topics(config)
        .into_iter()
        .map(|c| TopicWatcher::new(c, subscriber.clone(), sink.clone(), clock.clone()))
        .collect()
}

pub async fn run(config: IngesterConfig) -> Result<(), Error> {
    // Output banner
    info!("{}", BANNER);
    info!("Starting ingester...");

    let consumer = config.consumer;
    consumer.validate()?;
    info!(
        "Will watch for topics {:?} at brokers {:?} and group '{}'",
        consumer.topics, consumer.brokers, consumer.consumer_group
    );

    let subscriber: Arc<dyn Subscriber> = Arc::new(KafkaSubscriber::new(&consumer));
    let sink: Arc<dyn Sink> = match config.output {
        Output::Stdout => Arc::new(StdoutSink::new()),
        Output::Json => Arc::new(StdoutSink::json()),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let scheduler = WatcherScheduler::start(build_watchers(&consumer, subscriber, sink, clock))?;

    shutdown_signal().await?;
    info!("Shutdown signal received, stopping watchers...");

    scheduler.stop();
    scheduler.wait_stopped().await;

    let reports = tokio::task::spawn_blocking(move || scheduler.join())
        .await
        .map_err(|e| Error::Unexpected(e.to_string()))??;
    for r in reports.iter().filter(|r| r.state.is_none()) {
        warn!("Watcher for topic {} did not stop cleanly", r.topic);
    }

    info!("Ingester stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<(), Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => r?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<(), Error> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testing::{RecordingSink, ScriptedSubscriber, TestClock};

    use super::*;

    #[test]
    fn one_watcher_per_topic_with_shared_tagging() {
        let mut c = ConsumerConfig::new(
            vec!["k:9092".into()],
            "g".into(),
            vec!["a".into(), "b".into(), "c".into()],
        );
        c.add_prefix = Some("kafka".into());

        let watchers = build_watchers(
            &c,
            Arc::new(ScriptedSubscriber::default()),
            Arc::new(RecordingSink::default()),
            Arc::new(TestClock::default()),
        );

        let tags = watchers.iter().map(|w| w.tag()).collect::<Vec<_>>();
        assert_eq!(tags, vec!["kafka.a", "kafka.b", "kafka.c"]);
    }
}
