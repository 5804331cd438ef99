//! In-browser stand-in for the backend, used for UI development when
//! `ClientConfig::backend` is `Mock`.
//!
//! Latency is simulated with the timer port; state lives in memory (users)
//! or in durable storage (conversations).

pub mod responder;
pub mod users;
pub mod auth;
pub mod chat;

pub use auth::{MockAuth, MockProfile};
pub use chat::{Exchange, MockChatService};
pub use responder::{Category, KeywordResponder, Reply};
pub use users::MockUserDirectory;
