//! Message bus — point-to-point and broadcast delivery between named agents.
//!
//! Each registered agent owns a FIFO mailbox. Mailboxes are sharded in a
//! `DashMap` and individually locked, so traffic to different agents never
//! contends on a common lock. Nothing is persisted; mailboxes die with the
//! process.

use dashmap::DashMap;
use mangaba_types::context::ContextMap;
use mangaba_types::error::{MangabaError, MangabaResult};
use mangaba_types::message::AgentMessage;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Poll interval for blocking receives.
const RECEIVE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Point-to-point message bus with bounded per-agent mailboxes.
pub struct MessageBus {
    mailboxes: DashMap<String, Mutex<VecDeque<AgentMessage>>>,
    capacity: usize,
}

impl MessageBus {
    /// Create a bus whose mailboxes hold at most `capacity` unread messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            mailboxes: DashMap::new(),
            capacity,
        }
    }

    /// Register an agent, creating its mailbox. Idempotent.
    pub fn register(&self, agent: impl Into<String>) {
        self.mailboxes
            .entry(agent.into())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
    }

    /// Remove an agent's mailbox, discarding unread messages.
    pub fn unregister(&self, agent: &str) -> bool {
        self.mailboxes.remove(agent).is_some()
    }

    /// Whether an agent has a mailbox.
    pub fn is_registered(&self, agent: &str) -> bool {
        self.mailboxes.contains_key(agent)
    }

    /// Enqueue a message into `to`'s mailbox.
    ///
    /// Fails with `UnknownAgent` if either endpoint was never registered and
    /// with `MailboxFull` if the receiver's mailbox is at capacity; queued
    /// messages are never discarded to make room.
    pub fn send(
        &self,
        from: &str,
        to: &str,
        body: impl Into<String>,
        context: Option<ContextMap>,
    ) -> MangabaResult<()> {
        if !self.is_registered(from) {
            return Err(MangabaError::UnknownAgent(from.to_string()));
        }
        let mailbox = self
            .mailboxes
            .get(to)
            .ok_or_else(|| MangabaError::UnknownAgent(to.to_string()))?;

        let mut queue = mailbox.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= self.capacity {
            return Err(MangabaError::MailboxFull {
                agent: to.to_string(),
                capacity: self.capacity,
            });
        }
        queue.push_back(AgentMessage::new(from, to, body, context));
        debug!(from, to, pending = queue.len(), "Message enqueued");
        Ok(())
    }

    /// Deliver a message to every registered mailbox except the sender's.
    ///
    /// Full mailboxes are skipped rather than failing the whole broadcast.
    /// Returns the number of mailboxes reached.
    pub fn broadcast(
        &self,
        from: &str,
        body: &str,
        context: Option<ContextMap>,
    ) -> MangabaResult<usize> {
        if !self.is_registered(from) {
            return Err(MangabaError::UnknownAgent(from.to_string()));
        }

        let mut delivered = 0;
        for entry in self.mailboxes.iter() {
            let to = entry.key();
            if to == from {
                continue;
            }
            let mut queue = entry.value().lock().unwrap_or_else(|e| e.into_inner());
            if queue.len() >= self.capacity {
                warn!(from, to = %to, "Broadcast skipped full mailbox");
                continue;
            }
            queue.push_back(AgentMessage::new(from, to.clone(), body, context.clone()));
            delivered += 1;
        }
        debug!(from, delivered, "Broadcast delivered");
        Ok(delivered)
    }

    /// Dequeue the oldest unread message for `agent`, or `None` if the
    /// mailbox is empty. Delivery is at-most-once.
    pub fn receive(&self, agent: &str) -> MangabaResult<Option<AgentMessage>> {
        let mailbox = self
            .mailboxes
            .get(agent)
            .ok_or_else(|| MangabaError::UnknownAgent(agent.to_string()))?;
        let mut queue = mailbox.lock().unwrap_or_else(|e| e.into_inner());
        Ok(queue.pop_front())
    }

    /// Wait for a message, polling the mailbox until `timeout` elapses.
    ///
    /// Fails with `TimedOut` if nothing arrives in time.
    pub async fn receive_timeout(
        &self,
        agent: &str,
        timeout: Duration,
    ) -> MangabaResult<AgentMessage> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(msg) = self.receive(agent)? {
                return Ok(msg);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(MangabaError::TimedOut(timeout));
            }
            tokio::time::sleep(RECEIVE_POLL_INTERVAL).await;
        }
    }

    /// Number of unread messages waiting for `agent`.
    pub fn pending(&self, agent: &str) -> MangabaResult<usize> {
        let mailbox = self
            .mailboxes
            .get(agent)
            .ok_or_else(|| MangabaError::UnknownAgent(agent.to_string()))?;
        let queue = mailbox.lock().unwrap_or_else(|e| e.into_inner());
        Ok(queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn bus_with(agents: &[&str]) -> MessageBus {
        let bus = MessageBus::new(8);
        for a in agents {
            bus.register(*a);
        }
        bus
    }

    #[test]
    fn fifo_per_sender_receiver_pair() {
        let bus = bus_with(&["x", "y"]);
        bus.send("x", "y", "A", None).unwrap();
        bus.send("x", "y", "B", None).unwrap();
        bus.send("x", "y", "C", None).unwrap();

        for expected in ["A", "B", "C"] {
            let msg = bus.receive("y").unwrap().unwrap();
            assert_eq!(msg.body, expected);
            assert_eq!(msg.from, "x");
        }
        assert!(bus.receive("y").unwrap().is_none());
    }

    #[test]
    fn interleaved_senders_preserve_insertion_order() {
        let bus = bus_with(&["x", "y", "z"]);
        bus.send("x", "z", "first", None).unwrap();
        bus.send("y", "z", "second", None).unwrap();
        bus.send("x", "z", "third", None).unwrap();

        let order: Vec<String> = (0..3)
            .map(|_| bus.receive("z").unwrap().unwrap().body)
            .collect();
        assert_eq!(order, ["first", "second", "third"]);
    }

    #[test]
    fn unknown_sender_rejected() {
        let bus = bus_with(&["y"]);
        let err = bus.send("ghost", "y", "hi", None).unwrap_err();
        assert!(matches!(err, MangabaError::UnknownAgent(a) if a == "ghost"));
    }

    #[test]
    fn unknown_receiver_rejected() {
        let bus = bus_with(&["x"]);
        let err = bus.send("x", "ghost", "hi", None).unwrap_err();
        assert!(matches!(err, MangabaError::UnknownAgent(a) if a == "ghost"));
    }

    #[test]
    fn receive_for_unknown_agent_rejected() {
        let bus = bus_with(&[]);
        assert!(matches!(
            bus.receive("ghost"),
            Err(MangabaError::UnknownAgent(_))
        ));
    }

    #[test]
    fn full_mailbox_rejects_without_discarding() {
        let bus = MessageBus::new(2);
        bus.register("x");
        bus.register("y");
        bus.send("x", "y", "1", None).unwrap();
        bus.send("x", "y", "2", None).unwrap();

        let err = bus.send("x", "y", "3", None).unwrap_err();
        assert!(matches!(
            err,
            MangabaError::MailboxFull { capacity: 2, .. }
        ));

        // The queued messages survive the rejection.
        assert_eq!(bus.pending("y").unwrap(), 2);
        assert_eq!(bus.receive("y").unwrap().unwrap().body, "1");
        assert_eq!(bus.receive("y").unwrap().unwrap().body, "2");
    }

    #[test]
    fn draining_a_full_mailbox_allows_sending_again() {
        let bus = MessageBus::new(1);
        bus.register("x");
        bus.register("y");
        bus.send("x", "y", "1", None).unwrap();
        assert!(bus.send("x", "y", "2", None).is_err());

        bus.receive("y").unwrap().unwrap();
        bus.send("x", "y", "2", None).unwrap();
        assert_eq!(bus.receive("y").unwrap().unwrap().body, "2");
    }

    #[test]
    fn broadcast_reaches_everyone_but_sender() {
        let bus = bus_with(&["x", "y", "z"]);
        let delivered = bus.broadcast("x", "hello all", None).unwrap();
        assert_eq!(delivered, 2);

        assert_eq!(bus.receive("y").unwrap().unwrap().body, "hello all");
        assert_eq!(bus.receive("z").unwrap().unwrap().body, "hello all");
        assert!(bus.receive("x").unwrap().is_none());
    }

    #[test]
    fn broadcast_from_unknown_sender_rejected() {
        let bus = bus_with(&["y"]);
        assert!(matches!(
            bus.broadcast("ghost", "hi", None),
            Err(MangabaError::UnknownAgent(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn receive_timeout_returns_late_message() {
        let bus = Arc::new(MessageBus::new(8));
        bus.register("x");
        bus.register("y");

        let sender = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            sender.send("x", "y", "late", None).unwrap();
        });

        let msg = bus
            .receive_timeout("y", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(msg.body, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn receive_timeout_expires_on_empty_mailbox() {
        let bus = bus_with(&["y"]);
        let err = bus
            .receive_timeout("y", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, MangabaError::TimedOut(_)));
    }

    #[test]
    fn unregister_discards_mailbox() {
        let bus = bus_with(&["x", "y"]);
        bus.send("x", "y", "1", None).unwrap();
        assert!(bus.unregister("y"));
        assert!(!bus.is_registered("y"));
        assert!(matches!(
            bus.receive("y"),
            Err(MangabaError::UnknownAgent(_))
        ));
    }
}
