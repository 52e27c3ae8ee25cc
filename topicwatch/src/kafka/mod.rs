use bytes::Bytes;

pub mod scheduler;
pub mod subscription;
pub mod watcher;

pub mod config {
    pub const BOOTSTRAP_SERVERS: &str = "bootstrap.servers";
    pub const GROUP_ID: &str = "group.id";
    pub const FETCH_MAX_BYTES: &str = "fetch.max.bytes";
    pub const FETCH_WAIT_MAX_MS: &str = "fetch.wait.max.ms";
    pub const FETCH_MIN_BYTES: &str = "fetch.min.bytes";
    pub const SOCKET_TIMEOUT_MS: &str = "socket.timeout.ms";
}

/// A message pulled from a subscription. Partition and offset are only used
/// for log context.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct RawMessage {
    pub payload: Bytes,
    pub partition: i32,
    pub offset: i64,
}

impl RawMessage {
    pub fn new(payload: impl Into<Bytes>, partition: i32, offset: i64) -> Self {
        Self {
            payload: payload.into(),
            partition,
            offset,
        }
    }
}
