//! Counsel App: WASM entry point.
//!
//! This crate is the composition root. It assembles the browser adapters
//! into an [`AppContext`](counsel_core::AppContext) and exposes it to the
//! JavaScript UI as [`CounselApp`].

mod app;

use wasm_bindgen::prelude::*;

pub use app::CounselApp;

/// Called once when the module is instantiated.
#[wasm_bindgen(start)]
pub fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Counsel WASM starting...");
}
