//! # georgi-channels
//!
//! Messaging platform integrations for georgibot.

pub mod discord;
pub mod utils;
