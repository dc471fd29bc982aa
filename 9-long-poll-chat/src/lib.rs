//! Long-poll chat relay that keeps a single room in memory.
//!
//! Clients join with an identifier, post short text messages and poll for
//! whatever has been broadcast to the room since their last poll. See
//! `README.md` for the HTTP surface. Each module focuses on a concrete
//! responsibility:
//!
//! - [`room`] owns the client registry. A single worker task applies joins,
//!   leaves and broadcasts one at a time, while polls read each client's
//!   queue directly.
//! - [`queue`] is the per-client bounded delivery queue with drop-newest
//!   overflow and a distinct closed signal.
//! - [`message`] is the immutable chat message copied into every queue.
//! - [`error`] lists the outcomes the room reports back to callers.
//! - [`config`] and [`cli`] hold runtime settings for the room and binary.
//! - [`http`] maps the room operations onto axum routes and JSON bodies.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod queue;
pub mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use message::Message;
pub use room::{Inbox, RoomHandle, spawn_room};
