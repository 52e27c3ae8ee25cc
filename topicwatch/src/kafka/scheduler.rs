use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::runtime::{Builder, Runtime};

use crate::error::{ConfigError, Error};
use crate::shutdown::Shutdown;

use super::watcher::{TopicWatcher, WatcherState};

pub const SCHEDULER_THREAD_NAME: &str = "topicwatch-scheduler";

/// Final state of one watcher, reported by [`WatcherScheduler::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherReport {
    pub topic: String,
    /// `None` when the watcher task died before reaching a final state.
    pub state: Option<WatcherState>,
}

/// Runs a fixed set of topic watchers on a dedicated thread.
///
/// Each watcher gets its own task and its own timer, so a slow or failing
/// topic never delays another. `stop` only raises the shared shutdown signal:
/// watchers finish the tick they are in and then release their
/// subscriptions.
pub struct WatcherScheduler {
    sd: Arc<Shutdown>,
    thread: Option<JoinHandle<Vec<WatcherReport>>>,
}

impl WatcherScheduler {
    pub fn start(watchers: Vec<TopicWatcher>) -> Result<Self, Error> {
        if watchers.is_empty() {
            return Err(ConfigError::NoWatchers.into());
        }

        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("topicwatch-worker")
            .build()?;

        let sd = Arc::new(Shutdown::new());
        let thread = {
            let sd = sd.clone();
            thread::Builder::new()
                .name(SCHEDULER_THREAD_NAME.to_owned())
                .spawn(move || run(runtime, watchers, sd))?
        };

        Ok(Self {
            sd,
            thread: Some(thread),
        })
    }

    /// Asks every watcher to stop after its current tick. Does not wait.
    pub fn stop(&self) {
        if !self.sd.is_shutdown() {
            info!("stopping watcher scheduler");
        }
        self.sd.begin();
    }

    pub fn is_stopped(&self) -> bool {
        self.sd.is_complete()
    }

    /// Waits until every watcher has stopped.
    pub async fn wait_stopped(&self) {
        self.sd.wait_complete().await
    }

    /// Blocks until the scheduler thread exits, which happens once `stop`
    /// was called and every watcher has stopped.
    pub fn join(mut self) -> Result<Vec<WatcherReport>, Error> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::Unexpected("watcher scheduler thread panicked".to_owned())),
            None => Ok(Vec::new()),
        }
    }
}

impl Drop for WatcherScheduler {
    fn drop(&mut self) {
        self.sd.begin();
    }
}

fn run(runtime: Runtime, watchers: Vec<TopicWatcher>, sd: Arc<Shutdown>) -> Vec<WatcherReport> {
    let reports = runtime.block_on(async {
        info!("starting {} topic watchers", watchers.len());

        let handles = watchers
            .into_iter()
            .map(|w| {
                let topic = w.topic().to_owned();
                (topic, tokio::spawn(w.run(sd.clone())))
            })
            .collect::<Vec<_>>();

        let mut reports = Vec::with_capacity(handles.len());
        for (topic, handle) in handles {
            let state = match handle.await {
                Ok(state) => Some(state),
                Err(e) => {
                    error!("unexpected error in watcher for topic {}: {}", topic, e);
                    None
                }
            };
            reports.push(WatcherReport { topic, state });
        }
        reports
    });

    runtime.shutdown_background();
    sd.complete();
    info!("watcher scheduler stopped");

    reports
}
