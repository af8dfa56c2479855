//! # georgi-memory
//!
//! In-process conversation context cache. Nothing survives a restart.

pub mod store;

pub use store::{ContextRecord, ContextStore, ConversantKey};
