//! Client core for the counseling app: session state, REST plumbing,
//! the development mock backend and navigation rules.
//!
//! Everything here is platform-free. Browser specifics (fetch, localStorage,
//! timers) arrive through the traits in [`ports`].

pub mod ports;
pub mod event_bus;
pub mod keys;
pub mod persist;
pub mod session;
pub mod http;
pub mod listing;
pub mod api;
pub mod stream;
pub mod mock;
pub mod guard;
pub mod validation;
pub mod context;

#[cfg(test)]
mod tests;

pub use context::AppContext;
