use std::time::Duration;

/// Messages a client may have waiting before new ones are dropped for it.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// How long a poll waits for a message before reporting an empty result.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Join/leave/send commands that may wait for the worker before callers
/// start to queue up behind the channel.
pub const DEFAULT_CONTROL_BACKLOG: usize = 256;

/// Settings for a room spawned with [`spawn_room`](crate::room::spawn_room).
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Capacity of each client's delivery queue. A capacity of zero drops
    /// every broadcast.
    pub queue_capacity: usize,
    /// Default wait used by transports that do not pick their own.
    pub poll_timeout: Duration,
    /// Buffer size of the worker's command channel (at least 1).
    pub control_backlog: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            control_backlog: DEFAULT_CONTROL_BACKLOG,
        }
    }
}
