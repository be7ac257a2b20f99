//! Storage module for the JSON-file todo document.
//!
//! The backing file is the source of truth; the store keeps an in-memory
//! mirror and rewrites the whole file on every mutation.

mod migrate;
mod retry;
mod store;

pub use migrate::*;
pub use retry::*;
pub use store::*;
