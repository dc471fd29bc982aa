use chrono::{DateTime, Utc};

/// A chat message as broadcast to the room.
///
/// Fields are private so a message cannot change after it has been fanned
/// out; every recipient gets its own clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender_id: String,
    content: String,
    sent_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message stamped with the current time.
    pub fn new(sender_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            content: content.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_is_stamped_now() {
        let before = Utc::now();
        let message = Message::new("alice", "hello");
        let after = Utc::now();

        assert_eq!(message.sender_id(), "alice");
        assert_eq!(message.content(), "hello");
        assert!(message.sent_at() >= before && message.sent_at() <= after);
    }
}
