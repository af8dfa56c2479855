//! # georgi-core
//!
//! Core types, traits, configuration, prompt building, and error handling for georgibot.

pub mod config;
pub mod error;
pub mod inference;
pub mod message;
pub mod prompt;
pub mod sanitize;
pub mod traits;
