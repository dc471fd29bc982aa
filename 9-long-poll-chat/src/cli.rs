use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::time::Duration;

use clap::Parser;

use crate::config::{DEFAULT_CONTROL_BACKLOG, RoomConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Socket address the HTTP server binds to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Seconds a poll waits for a new message before answering empty.
    #[arg(long, default_value_t = 30)]
    pub poll_timeout_secs: u64,

    /// Messages kept per client before new ones are dropped for it.
    #[arg(long, default_value = "100")]
    pub queue_capacity: NonZeroUsize,
}

impl Cli {
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            queue_capacity: self.queue_capacity.get(),
            poll_timeout: Duration::from_secs(self.poll_timeout_secs),
            control_backlog: DEFAULT_CONTROL_BACKLOG,
        }
    }
}
