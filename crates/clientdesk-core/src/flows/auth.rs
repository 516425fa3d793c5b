//! Login and registration.
//!
//! State machine: `Idle -> Submitting -> Success | Failed`. The view reads
//! the outcome with [`AuthFlow::take_outcome`], which returns the flow to
//! `Idle`.

use clientdesk_types::{Credentials, LoginResponse, RegistrationRequest};

use super::{LOGIN_PATH, REGISTER_PATH};
use crate::api::{ApiClient, ApiError};
use crate::error::{FlowError, LOGIN_FAILED, REGISTER_FAILED};
use crate::session::SessionStore;
use crate::validation::{validate_credentials, validate_registration};

/// Where the view should go after a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Registration done; the user still has to log in.
    Login,
    /// Logged in; show the client registry.
    Clients,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Idle,
    Submitting,
    Success(Navigation),
    Failed(String),
}

pub struct AuthFlow {
    api: ApiClient,
    session: SessionStore,
    state: AuthState,
}

impl AuthFlow {
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        Self {
            api,
            session,
            state: AuthState::Idle,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// True while a request is in flight (drives the loading indicator).
    pub fn is_submitting(&self) -> bool {
        self.state == AuthState::Submitting
    }

    /// Hands the last outcome to the view and returns to `Idle`.
    pub fn take_outcome(&mut self) -> AuthState {
        std::mem::take(&mut self.state)
    }

    /// Logs in and persists the session.
    ///
    /// # Errors
    /// `Validation` before any request, `Api` with a generic message when
    /// the service rejects or cannot be reached, `Storage` when the token
    /// does not read back from the session store.
    pub async fn login(&mut self, creds: &Credentials) -> Result<Navigation, FlowError> {
        let result = self.submit_login(creds).await;
        self.settle("login", &result);
        result
    }

    /// Registers a new account. Does not log in.
    ///
    /// # Errors
    /// `Validation` before any request, `Api` with a generic message otherwise.
    pub async fn register(&mut self, req: &RegistrationRequest) -> Result<Navigation, FlowError> {
        let result = self.submit_register(req).await;
        self.settle("register", &result);
        result
    }

    async fn submit_login(&mut self, creds: &Credentials) -> Result<Navigation, FlowError> {
        validate_credentials(creds)?;

        self.state = AuthState::Submitting;
        tracing::info!(email = %creds.email, "logging in");

        let response = self
            .api
            .post(LOGIN_PATH, creds, None)
            .await
            .map_err(|e| FlowError::api(LOGIN_FAILED, e))?;

        let login: LoginResponse = serde_json::from_value(response.body).map_err(|e| {
            FlowError::api(
                LOGIN_FAILED,
                ApiError::parse(format!("Unexpected login response: {e}")),
            )
        })?;
        if login.token.trim().is_empty() {
            return Err(FlowError::api(
                LOGIN_FAILED,
                ApiError::parse("Login response carried an empty token"),
            ));
        }

        self.session
            .save_session(&login.token, login.user.as_ref())
            .map_err(|e| FlowError::Storage { cause: Some(e) })?;

        // Navigate only once the token is readable again.
        if self.session.get_token().is_none() {
            return Err(FlowError::Storage { cause: None });
        }

        Ok(Navigation::Clients)
    }

    async fn submit_register(&mut self, req: &RegistrationRequest) -> Result<Navigation, FlowError> {
        validate_registration(req)?;

        self.state = AuthState::Submitting;
        tracing::info!(email = %req.email, "registering");

        self.api
            .post(REGISTER_PATH, req, None)
            .await
            .map_err(|e| FlowError::api(REGISTER_FAILED, e))?;

        Ok(Navigation::Login)
    }

    fn settle(&mut self, action: &str, result: &Result<Navigation, FlowError>) {
        self.state = match result {
            Ok(nav) => {
                tracing::info!(action, next = ?nav, "auth succeeded");
                AuthState::Success(*nav)
            }
            Err(err) => {
                match err {
                    FlowError::Api { error, .. } => {
                        tracing::warn!(action, kind = %error.kind, status = ?error.status, "{error}");
                    }
                    FlowError::Storage { cause } => {
                        tracing::error!(action, cause = ?cause, "session did not persist");
                    }
                    _ => tracing::debug!(action, "rejected locally: {err}"),
                }
                AuthState::Failed(err.to_string())
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_outcome_resets_to_idle() {
        let mut flow = AuthFlow::new(ApiClient::new("http://127.0.0.1:9"), SessionStore::in_memory());
        flow.state = AuthState::Failed(LOGIN_FAILED.to_string());

        assert_eq!(flow.take_outcome(), AuthState::Failed(LOGIN_FAILED.to_string()));
        assert_eq!(flow.state(), &AuthState::Idle);
        assert!(!flow.is_submitting());
    }
}
