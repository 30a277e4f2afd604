//! Remote story API: wire types, domain types and the HTTP client.

pub mod api_types;
pub mod client;
pub mod types;

pub use client::StoryClient;
pub use types::{Ack, LoginAck, NewStory, RegisterAck, RemoteStory, RemoteStoryDetail};
