//! Agent-to-agent message types.
//!
//! Messages are immutable once sent and delivered at-most-once, FIFO per
//! mailbox. The bus itself lives in the kernel; this module only defines the
//! envelope.

use crate::context::ContextMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message exchanged between two named agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Sending agent name.
    pub from: String,
    /// Receiving agent name.
    pub to: String,
    /// Message text.
    pub body: String,
    /// Optional context attached by the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextMap>,
    /// When the message was accepted by the bus.
    pub sent_at: DateTime<Utc>,
}

impl AgentMessage {
    /// Build a message stamped with the current time.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        body: impl Into<String>,
        context: Option<ContextMap>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            body: body.into(),
            context,
            sent_at: Utc::now(),
        }
    }
}
