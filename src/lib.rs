//! Session-aware story synchronization with a local cache.
//!
//! The [`repository::StoryRepository`] ties together the remote story API,
//! the persisted session and the story cache, and reports every network-backed
//! use case as a Loading/Success/Error stream. The [`widget`] module renders
//! the cache without touching the network or the session.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod operation;
pub mod repository;
pub mod screen;
pub mod session;
pub mod widget;

pub use error::{Error, StoreError, ValidationError};
pub use operation::{Operation, OperationResult};
pub use repository::StoryRepository;
