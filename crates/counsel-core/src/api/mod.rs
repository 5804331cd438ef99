//! Domain API modules: one typed function per backend operation.
//!
//! Every public operation returns an [`Outcome`](counsel_types::Outcome);
//! errors from the adapter are folded in here and never escape as `Err`.

pub mod auth;
pub mod user;
pub mod conversation;
pub mod message;
pub mod ai;
pub mod system;

pub use auth::{AuthApi, LoginRequest, RegisterRequest, RemoteAuth};
pub use user::{PasswordChange, ProfileApi, UserApi};
pub use conversation::{ConversationApi, ConversationQuery, ConversationUpdate};
pub use message::{MessageApi, MessageQuery};
pub use ai::{AiApi, AiReply, ChatRequest};
pub use system::{HealthStatus, SystemApi};
