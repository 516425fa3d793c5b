//! Orchestration between user input, validation, the API and the session.

pub mod auth;
pub mod registry;

pub use auth::{AuthFlow, AuthState, Navigation};
pub use registry::{ClientRegistry, EditMode};

use url::Url;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const CLIENTS_PATH: &str = "/clients";

/// Path of a single client record; the id is percent-encoded as one segment.
pub fn client_path(id: &str) -> String {
    // Dot segments are dropped by `push`, so they are spelled out encoded.
    match id {
        "." => return format!("{CLIENTS_PATH}/%2E"),
        ".." => return format!("{CLIENTS_PATH}/%2E%2E"),
        _ => {}
    }

    let mut url = Url::parse("http://localhost")
        .unwrap_or_else(|e| panic!("static base URL failed to parse: {e}"));
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(CLIENTS_PATH.trim_start_matches('/')).push(id);
    }
    url.path().to_string()
}
