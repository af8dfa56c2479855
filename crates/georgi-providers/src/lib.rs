//! # georgi-providers
//!
//! Text-generation backend implementations for georgibot.

pub mod ollama;
