//! Memory substrate for the Mangaba framework.
//!
//! Two stores with different lifecycles:
//! - [`ContextStore`] — process-shared expiring key/value store, created at
//!   facade init and torn down with it. Passed by reference everywhere,
//!   never a global.
//! - [`AgentMemory`] — per-agent bounded append-only log of task exchanges.

mod log;
mod store;

pub use log::{AgentMemory, MemoryEntry};
pub use store::ContextStore;
