//! CLI command handlers.

pub mod auth;
pub mod clients;
pub mod config;
