use std::fmt;
use std::sync::{PoisonError, RwLock};

use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Types of Shutdown states
pub enum ShutdownState {
    NotStarted,
    Started,
    Complete,
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShutdownState::NotStarted => write!(f, "NotStarted"),
            ShutdownState::Started => write!(f, "Started"),
            ShutdownState::Complete => write!(f, "Complete"),
        }
    }
}

/// Cooperative stop signal shared by the scheduler and its watchers.
///
/// The state is a latch: once shutdown has begun it stays begun, so a task
/// that was busy when `begin` was called still sees the signal the next time
/// it waits. Waiters register before checking the state, which closes the
/// window between the check and the wait.
#[derive(Debug)]
pub struct Shutdown {
    /// State of the shutdown signal.
    state: RwLock<ShutdownState>,

    /// The channel used to listen for shutdown begin.
    begin: Notify,

    /// The channel used to signal for shutdown completion.
    complete: Notify,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Shutdown {
        Shutdown {
            state: RwLock::new(ShutdownState::NotStarted),
            begin: Notify::new(),
            complete: Notify::new(),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if the shutdown signal has been received.
    pub fn is_shutdown(&self) -> bool {
        self.state() != ShutdownState::NotStarted
    }

    pub fn is_complete(&self) -> bool {
        self.state() == ShutdownState::Complete
    }

    /// Wait for the begin shutdown notice.
    pub async fn wait_begin(&self) {
        let notified = self.begin.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_shutdown() {
            return;
        }
        notified.await
    }

    /// Begin the shutdown.
    pub fn begin(&self) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if *state != ShutdownState::NotStarted {
                return;
            }
            *state = ShutdownState::Started;
        }

        self.begin.notify_waiters();
    }

    /// Wait for the shutdown to complete.
    pub async fn wait_complete(&self) {
        let notified = self.complete.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_complete() {
            return;
        }
        notified.await
    }

    /// Complete the shutdown.
    pub fn complete(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = ShutdownState::Complete;

        self.complete.notify_waiters();
    }
}
