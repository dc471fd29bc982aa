//! Room coordinator: registry, control worker and the handle callers use.
//!
//! The worker task owns every mutation of the registry. Joins, leaves and
//! broadcasts reach it through a channel and are applied strictly in the
//! order they were submitted, so a broadcast always fans out to the exact
//! membership left behind by the commands before it.
//!
//! Polls never go through the worker. They look up the client's queue under
//! the registry's read lock, let go of the lock and wait on the queue.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::RoomConfig;
use crate::error::RoomError;
use crate::message::Message;
use crate::queue::{Delivery, DeliveryQueue, Offer};

type ClientId = String;
type Registry = HashMap<ClientId, Arc<DeliveryQueue>>;
type Responder<T> = oneshot::Sender<Result<T, RoomError>>;

/// Commands applied by the worker, each with a channel for its outcome.
enum Command {
    Join {
        client_id: ClientId,
        respond_to: Responder<()>,
    },
    Leave {
        client_id: ClientId,
        respond_to: Responder<()>,
    },
    Send {
        sender_id: ClientId,
        content: String,
        respond_to: Responder<Message>,
    },
}

/// Cloneable handle to a running room.
///
/// The worker keeps running while at least one handle is alive. Once the
/// last handle is dropped it closes every remaining queue and exits.
#[derive(Clone)]
pub struct RoomHandle {
    commands: mpsc::Sender<Command>,
    registry: Arc<RwLock<Registry>>,
    poll_timeout: Duration,
}

impl RoomHandle {
    /// Adds a client with a fresh, empty delivery queue.
    pub async fn join(&self, client_id: impl Into<String>) -> Result<(), RoomError> {
        let client_id = client_id.into();
        self.request(|respond_to| Command::Join {
            client_id,
            respond_to,
        })
        .await
    }

    /// Removes a client and closes its queue. Messages still waiting in it
    /// are discarded.
    pub async fn leave(&self, client_id: impl Into<String>) -> Result<(), RoomError> {
        let client_id = client_id.into();
        self.request(|respond_to| Command::Leave {
            client_id,
            respond_to,
        })
        .await
    }

    /// Broadcasts `content` from a joined client to every joined client,
    /// the sender included. Recipients with a full queue miss the message;
    /// that never fails the send.
    pub async fn send(
        &self,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Message, RoomError> {
        let sender_id = sender_id.into();
        let content = content.into();
        self.request(|respond_to| Command::Send {
            sender_id,
            content,
            respond_to,
        })
        .await
    }

    /// Resolves a joined client's queue so it can be polled repeatedly.
    pub fn inbox(&self, client_id: &str) -> Result<Inbox, RoomError> {
        let queue = read_registry(&self.registry)
            .get(client_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(client_id.to_string()))?;

        Ok(Inbox {
            client_id: client_id.to_string(),
            queue,
        })
    }

    /// Waits up to `timeout` for the next message addressed to `client_id`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time and
    /// [`RoomError::Closed`] when the client left during the wait.
    pub async fn poll(
        &self,
        client_id: &str,
        timeout: Duration,
    ) -> Result<Option<Message>, RoomError> {
        self.inbox(client_id)?.poll(timeout).await
    }

    pub fn contains(&self, client_id: &str) -> bool {
        read_registry(&self.registry).contains_key(client_id)
    }

    /// Currently joined client ids, sorted.
    pub fn members(&self) -> Vec<String> {
        let mut members: Vec<String> = read_registry(&self.registry).keys().cloned().collect();
        members.sort_unstable();
        members
    }

    /// Poll timeout configured for this room.
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Responder<T>) -> Command,
    ) -> Result<T, RoomError> {
        let (respond_to, response) = oneshot::channel();
        self.commands
            .send(command(respond_to))
            .await
            .map_err(|_| RoomError::Stopped)?;
        response.await.map_err(|_| RoomError::Stopped)?
    }
}

/// One client's delivery queue, resolved once.
///
/// Holding an inbox does not keep the client joined: after the client
/// leaves every poll reports [`RoomError::Closed`].
pub struct Inbox {
    client_id: ClientId,
    queue: Arc<DeliveryQueue>,
}

impl Inbox {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Messages waiting to be polled.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub async fn poll(&self, timeout: Duration) -> Result<Option<Message>, RoomError> {
        match self.queue.poll(timeout).await {
            Delivery::Message(message) => Ok(Some(message)),
            Delivery::Empty => Ok(None),
            Delivery::Closed => Err(RoomError::Closed(self.client_id.clone())),
        }
    }
}

/// Spawns the room worker on the current tokio runtime and returns a handle
/// to it.
///
/// # Panics
///
/// Panics when called outside a tokio runtime.
pub fn spawn_room(config: RoomConfig) -> RoomHandle {
    let (commands, command_rx) = mpsc::channel(config.control_backlog.max(1));
    let registry = Arc::new(RwLock::new(Registry::new()));

    let worker = Worker {
        registry: Arc::clone(&registry),
        commands: command_rx,
        queue_capacity: config.queue_capacity,
    };
    tokio::spawn(worker.run());

    RoomHandle {
        commands,
        registry,
        poll_timeout: config.poll_timeout,
    }
}

/// The only writer of the registry.
struct Worker {
    registry: Arc<RwLock<Registry>>,
    commands: mpsc::Receiver<Command>,
    queue_capacity: usize,
}

impl Worker {
    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle_command(command);
        }

        self.close_all();
        debug!("room worker stopped");
    }

    fn handle_command(&self, command: Command) {
        // A dropped receiver means the caller gave up waiting; the command
        // has been applied either way.
        match command {
            Command::Join {
                client_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.join(client_id));
            }
            Command::Leave {
                client_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.leave(client_id));
            }
            Command::Send {
                sender_id,
                content,
                respond_to,
            } => {
                let _ = respond_to.send(self.broadcast(sender_id, content));
            }
        }
    }

    fn join(&self, client_id: ClientId) -> Result<(), RoomError> {
        let mut registry = write_registry(&self.registry);
        match registry.entry(client_id) {
            Entry::Occupied(entry) => {
                debug!(client_id = %entry.key(), "rejected duplicate join");
                Err(RoomError::DuplicateIdentifier(entry.key().clone()))
            }
            Entry::Vacant(entry) => {
                info!(client_id = %entry.key(), "client joined the chat");
                entry.insert(Arc::new(DeliveryQueue::with_capacity(self.queue_capacity)));
                Ok(())
            }
        }
    }

    fn leave(&self, client_id: ClientId) -> Result<(), RoomError> {
        let Some(queue) = write_registry(&self.registry).remove(&client_id) else {
            return Err(RoomError::NotFound(client_id));
        };

        let discarded = queue.close();
        info!(client_id = %client_id, discarded, "client left the chat");
        Ok(())
    }

    fn broadcast(&self, sender_id: ClientId, content: String) -> Result<Message, RoomError> {
        let registry = read_registry(&self.registry);
        if !registry.contains_key(&sender_id) {
            return Err(RoomError::NotFound(sender_id));
        }

        let message = Message::new(sender_id, content);
        let mut delivered = 0usize;
        let mut dropped = 0usize;

        for (client_id, queue) in registry.iter() {
            match queue.offer(message.clone()) {
                Offer::Queued => delivered += 1,
                Offer::Dropped => {
                    dropped += 1;
                    warn!(client_id = %client_id, "client buffer is full, message dropped");
                }
                // Queues are closed only after leaving the registry.
                Offer::Closed => debug!(client_id = %client_id, "skipped closed queue"),
            }
        }

        debug!(sender = %message.sender_id(), delivered, dropped, "message broadcast");
        Ok(message)
    }

    fn close_all(&self) {
        for (client_id, queue) in write_registry(&self.registry).drain() {
            queue.close();
            debug!(client_id = %client_id, "closed queue on shutdown");
        }
    }
}

fn read_registry(registry: &RwLock<Registry>) -> RwLockReadGuard<'_, Registry> {
    registry.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_registry(registry: &RwLock<Registry>) -> RwLockWriteGuard<'_, Registry> {
    registry.write().unwrap_or_else(PoisonError::into_inner)
}
