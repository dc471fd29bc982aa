//! Per-client delivery queue.
//!
//! The room worker offers messages without ever waiting for space, and the
//! client's pollers take them out one at a time. Closing the queue discards
//! whatever is still pending and wakes every waiting poller.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};

use crate::message::Message;

/// Result of offering a message to a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    /// The queue was full; the offered (newest) message was dropped.
    Dropped,
    Closed,
}

/// Result of waiting on a queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    Message(Message),
    Empty,
    Closed,
}

struct QueueState {
    messages: VecDeque<Message>,
    closed: bool,
}

/// Bounded FIFO of messages waiting for one client.
pub struct DeliveryQueue {
    state: Mutex<QueueState>,
    ready: Notify,
    capacity: usize,
}

impl DeliveryQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                messages: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            ready: Notify::new(),
            capacity,
        }
    }

    /// Appends a message unless the queue is full or closed. Never waits.
    pub fn offer(&self, message: Message) -> Offer {
        {
            let mut state = self.lock();
            if state.closed {
                return Offer::Closed;
            }
            if state.messages.len() >= self.capacity {
                return Offer::Dropped;
            }
            state.messages.push_back(message);
        }
        self.ready.notify_one();
        Offer::Queued
    }

    /// Marks the queue closed and returns how many pending messages were
    /// discarded. Closing twice is a no-op.
    pub fn close(&self) -> usize {
        let discarded = {
            let mut state = self.lock();
            state.closed = true;
            let discarded = state.messages.len();
            state.messages.clear();
            discarded
        };
        self.ready.notify_waiters();
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the oldest pending message, waiting up to `timeout` for one to
    /// arrive. A closed queue reports [`Delivery::Closed`] even when the
    /// wait has not started yet. A timeout too large to represent as a
    /// deadline waits without one.
    pub async fn poll(&self, timeout: Duration) -> Delivery {
        let deadline = Instant::now().checked_add(timeout);

        loop {
            // Register interest before looking at the state so an offer or
            // close landing in between still wakes us.
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(delivery) = self.try_take() {
                return delivery;
            }

            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, notified).await.is_err() {
                        return Delivery::Empty;
                    }
                }
                None => notified.await,
            }
        }
    }

    fn try_take(&self) -> Option<Delivery> {
        let mut state = self.lock();
        if state.closed {
            return Some(Delivery::Closed);
        }
        state.messages.pop_front().map(Delivery::Message)
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
