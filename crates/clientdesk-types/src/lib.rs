//! Shared data model for the clientdesk API.

pub mod auth;
pub mod client;

pub use auth::{Credentials, LoginResponse, RegistrationRequest, UserSummary};
pub use client::{Client, ClientDraft, ClientList};
