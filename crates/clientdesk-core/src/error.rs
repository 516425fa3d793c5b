//! Errors surfaced by the auth and client flows.
//!
//! `Display` is always the text shown to the user. Server payloads stay on
//! the wrapped [`ApiError`] and are never part of the message or the
//! `source()` chain.

use std::fmt;

use crate::api::ApiError;
use crate::validation::ValidationErrors;

pub const LOGIN_FAILED: &str = "invalid email or password";
pub const REGISTER_FAILED: &str = "failed to register user";
pub const LIST_FAILED: &str = "failed to load clients";
pub const SAVE_FAILED: &str = "failed to save client";
pub const DELETE_FAILED: &str = "failed to delete client";
pub const STORAGE_FAILED: &str = "failed to save authentication, please try again";
pub const NOT_LOGGED_IN: &str = "you are not logged in";
pub const SAVE_NOT_LOGGED_IN: &str = "you must be logged in to save a client";

#[derive(Debug)]
pub enum FlowError {
    /// Local field checks failed; nothing was sent.
    Validation(ValidationErrors),
    /// The request failed; `message` is the generic text for the operation.
    Api {
        message: &'static str,
        error: ApiError,
    },
    /// The session could not be persisted or read back after login.
    Storage { cause: Option<anyhow::Error> },
    /// No token in the session store; nothing was sent.
    Unauthenticated { message: &'static str },
}

impl FlowError {
    pub(crate) fn api(message: &'static str, error: ApiError) -> Self {
        FlowError::Api { message, error }
    }

    /// The underlying API failure, for logging.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            FlowError::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            FlowError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, FlowError::Unauthenticated { .. })
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::Validation(errors) => write!(f, "{errors}"),
            FlowError::Api { message, .. } | FlowError::Unauthenticated { message } => {
                write!(f, "{message}")
            }
            FlowError::Storage { .. } => write!(f, "{STORAGE_FAILED}"),
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlowError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for FlowError {
    fn from(errors: ValidationErrors) -> Self {
        FlowError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_api_error_message_hides_server_payload() {
        let err = FlowError::api(
            LOGIN_FAILED,
            ApiError::http_status(401, r#"{"message":"user ana@x.io has no password set"}"#),
        );
        assert_eq!(err.to_string(), LOGIN_FAILED);
        assert!(err.source().is_none());
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(!chain.contains("no password set"));
    }

    #[test]
    fn test_api_error_is_reachable_for_logging() {
        let err = FlowError::api(LIST_FAILED, ApiError::http_status(500, "boom"));
        assert_eq!(err.api_error().and_then(|e| e.status), Some(500));
    }

    #[test]
    fn test_storage_message() {
        let err = FlowError::Storage { cause: None };
        assert_eq!(err.to_string(), STORAGE_FAILED);
        assert!(!err.is_unauthenticated());
    }
}
