//! Field format checks run before any request leaves the process.

use std::fmt;
use std::sync::LazyLock;

use clientdesk_types::{ClientDraft, Credentials, RegistrationRequest};
use regex::Regex;

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

// Leading dots and ".." in the address are rejected separately; the regex
// crate has no lookahead.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$")
        .unwrap_or_else(|e| panic!("email pattern must compile: {e}"))
});

pub fn is_valid_email(s: &str) -> bool {
    !s.starts_with('.') && !s.contains("..") && EMAIL_RE.is_match(s)
}

pub fn is_valid_password(s: &str) -> bool {
    s.chars().count() >= MIN_PASSWORD_LEN
}

pub fn is_non_empty(s: &str) -> bool {
    !s.trim().is_empty()
}

/// A single failed field check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// All failed checks for one submission, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn check(&mut self, ok: bool, field: &'static str, message: &'static str) {
        if !ok {
            self.errors.push(FieldError { field, message });
        }
    }

    fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message for a field, if that field failed.
    pub fn for_field(&self, field: &str) -> Option<&'static str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

const INVALID_EMAIL: &str = "invalid email";
const SHORT_PASSWORD: &str = "password must be at least 6 characters";
const REQUIRED: &str = "is required";

/// Checks a login submission.
///
/// # Errors
/// Returns every failed field check.
pub fn validate_credentials(creds: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check(is_valid_email(&creds.email), "email", INVALID_EMAIL);
    errors.check(is_valid_password(&creds.password), "password", SHORT_PASSWORD);
    errors.into_result()
}

/// Checks a registration submission.
///
/// # Errors
/// Returns every failed field check.
pub fn validate_registration(req: &RegistrationRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check(is_non_empty(&req.name), "name", REQUIRED);
    errors.check(is_valid_email(&req.email), "email", INVALID_EMAIL);
    errors.check(is_valid_password(&req.password), "password", SHORT_PASSWORD);
    errors.into_result()
}

/// Checks the client form: every field required, email well-formed.
///
/// # Errors
/// Returns every failed field check.
pub fn validate_client(draft: &ClientDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check(is_non_empty(&draft.name), "name", REQUIRED);
    if is_non_empty(&draft.email) {
        errors.check(is_valid_email(&draft.email), "email", INVALID_EMAIL);
    } else {
        errors.check(false, "email", REQUIRED);
    }
    errors.check(is_non_empty(&draft.phone), "phone", REQUIRED);
    errors.check(is_non_empty(&draft.company), "company", REQUIRED);
    errors.into_result()
}
