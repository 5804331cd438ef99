pub mod user;
pub mod session;
pub mod conversation;
pub mod envelope;
pub mod outcome;
pub mod event;
pub mod config;
pub mod error;


pub use error::{ClientError, ErrorKind};
pub use outcome::Outcome;
pub type Result<T> = std::result::Result<T, ClientError>;
