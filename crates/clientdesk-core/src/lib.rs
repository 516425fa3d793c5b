//! Core clientdesk library (config, session, API client, flows).

pub mod api;
pub mod config;
pub mod error;
pub mod flows;
pub mod logging;
pub mod session;
pub mod validation;

pub use clientdesk_types as types;
