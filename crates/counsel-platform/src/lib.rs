//! Browser implementations of the counsel-core ports.
//!
//! - [`FetchTransport`]: `HttpPort` over `fetch()` via gloo-net
//! - [`storage`]: `StoragePort` over `localStorage`, with an in-memory fallback
//! - [`GlooTimer`]: `TimerPort` over `setTimeout`

pub mod http;
pub mod storage;
pub mod timer;

pub use http::FetchTransport;
pub use storage::{auto_detect_storage, LocalStorage, MemoryStorage};
pub use timer::GlooTimer;
