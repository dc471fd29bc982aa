use thiserror::Error;

/// Outcomes the room reports back to a caller instead of a result.
///
/// A poll that times out is not an error; it comes back as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("client id `{0}` is already joined")]
    DuplicateIdentifier(String),

    #[error("client `{0}` not found")]
    NotFound(String),

    /// The client left while (or before) its queue was being read.
    #[error("delivery queue for client `{0}` is closed")]
    Closed(String),

    #[error("room worker has stopped")]
    Stopped,
}
