//! Persisted authentication session.
//!
//! A single session record per installation, observable through a watch
//! channel: subscribers see the current value first, then every later save.

mod storage;
mod traits;

pub use storage::{FileSessionStore, MemorySessionStore};
pub use traits::{Session, SessionStore};
