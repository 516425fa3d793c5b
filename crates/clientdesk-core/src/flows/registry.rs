//! Client registry: list, create, update, delete.
//!
//! The local list is a view cache only. It is replaced wholesale on every
//! successful fetch and every successful mutation is followed by a fetch;
//! it is never patched in place.

use clientdesk_types::{Client, ClientDraft, ClientList};

use super::{CLIENTS_PATH, client_path};
use crate::api::ApiClient;
use crate::error::{
    DELETE_FAILED, FlowError, LIST_FAILED, NOT_LOGGED_IN, SAVE_FAILED, SAVE_NOT_LOGGED_IN,
};
use crate::session::SessionStore;
use crate::validation::validate_client;

/// Whether the form is creating a new record or editing an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditMode {
    #[default]
    Viewing,
    Editing(Client),
}

impl EditMode {
    pub fn record(&self) -> Option<&Client> {
        match self {
            EditMode::Viewing => None,
            EditMode::Editing(record) => Some(record),
        }
    }
}

pub struct ClientRegistry {
    api: ApiClient,
    session: SessionStore,
    clients: Vec<Client>,
    form: ClientDraft,
    mode: EditMode,
    loading: bool,
    authenticated: bool,
    error: Option<String>,
}

impl ClientRegistry {
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        let authenticated = session.is_authenticated();
        Self {
            api,
            session,
            clients: Vec::new(),
            form: ClientDraft::default(),
            mode: EditMode::Viewing,
            loading: false,
            authenticated,
            error: None,
        }
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn find(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id.as_deref() == Some(id))
    }

    pub fn form(&self) -> &ClientDraft {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ClientDraft {
        &mut self.form
    }

    pub fn mode(&self) -> &EditMode {
        &self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Result of the last token check; false means the view should offer login.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Message from the last failed operation, cleared by the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetches the list from the service.
    ///
    /// Without a session nothing is sent and the list is empty.
    ///
    /// # Errors
    /// `Api` when the fetch fails; the list is emptied rather than left stale.
    pub async fn refresh(&mut self) -> Result<&[Client], FlowError> {
        let Some(token) = self.require_token() else {
            self.clients.clear();
            return Ok(&self.clients);
        };

        self.loading = true;
        let result = self.api.get(CLIENTS_PATH, Some(&token)).await;
        self.loading = false;

        match result {
            Ok(response) => {
                self.clients = ClientList::normalize(response.body);
                self.error = None;
                tracing::debug!(count = self.clients.len(), "client list refreshed");
                Ok(&self.clients)
            }
            Err(e) => {
                self.clients.clear();
                Err(self.fail(FlowError::api(LIST_FAILED, e)))
            }
        }
    }

    /// Enters edit mode on `record`, replacing any record already being edited.
    pub fn begin_edit(&mut self, record: &Client) {
        self.form = record.draft();
        self.mode = EditMode::Editing(record.clone());
        self.error = None;
    }

    /// Leaves edit mode and clears the form. Nothing is sent.
    pub fn cancel_edit(&mut self) {
        self.mode = EditMode::Viewing;
        self.form.clear();
    }

    /// Submits the form: update when editing a stored record, create otherwise.
    ///
    /// On success the form is cleared, edit mode ends and the list is
    /// fetched again. On failure the form and mode are left as they were.
    ///
    /// # Errors
    /// `Unauthenticated` or `Validation` before any request, `Api` when the
    /// save or the follow-up fetch fails.
    pub async fn submit(&mut self) -> Result<(), FlowError> {
        let Some(token) = self.require_token() else {
            return Err(self.fail(FlowError::Unauthenticated {
                message: SAVE_NOT_LOGGED_IN,
            }));
        };

        if let Err(errors) = validate_client(&self.form) {
            return Err(self.fail(FlowError::Validation(errors)));
        }

        let target = self.mode.record().and_then(|r| r.id.clone());
        let result = match target.as_deref() {
            Some(id) => {
                tracing::info!(id, "updating client");
                self.api.put(&client_path(id), &self.form, Some(&token)).await
            }
            None => {
                tracing::info!("creating client");
                self.api.post(CLIENTS_PATH, &self.form, Some(&token)).await
            }
        };

        if let Err(e) = result {
            return Err(self.fail(FlowError::api(SAVE_FAILED, e)));
        }

        self.form.clear();
        self.mode = EditMode::Viewing;
        self.error = None;
        self.refresh().await?;
        Ok(())
    }

    /// Creates a record from `draft`, leaving edit mode first.
    ///
    /// # Errors
    /// See [`ClientRegistry::submit`].
    pub async fn create(&mut self, draft: ClientDraft) -> Result<(), FlowError> {
        self.mode = EditMode::Viewing;
        self.form = draft;
        self.submit().await
    }

    /// Replaces the fields of `record` with `draft`.
    ///
    /// # Errors
    /// See [`ClientRegistry::submit`].
    pub async fn update(&mut self, record: &Client, draft: ClientDraft) -> Result<(), FlowError> {
        self.begin_edit(record);
        self.form = draft;
        self.submit().await
    }

    /// Deletes a record and fetches the list again.
    ///
    /// # Errors
    /// `Unauthenticated` before any request; `Api` when the delete fails, in
    /// which case the displayed list is left untouched.
    pub async fn delete(&mut self, id: &str) -> Result<(), FlowError> {
        let Some(token) = self.require_token() else {
            return Err(self.fail(FlowError::Unauthenticated {
                message: NOT_LOGGED_IN,
            }));
        };

        tracing::info!(id, "deleting client");
        if let Err(e) = self.api.delete(&client_path(id), Some(&token)).await {
            return Err(self.fail(FlowError::api(DELETE_FAILED, e)));
        }

        self.error = None;
        self.refresh().await?;
        Ok(())
    }

    fn require_token(&mut self) -> Option<String> {
        let token = self.session.get_token();
        self.authenticated = token.is_some();
        if token.is_none() {
            tracing::debug!("no session token; request not sent");
        }
        token
    }

    fn fail(&mut self, err: FlowError) -> FlowError {
        if let Some(api_error) = err.api_error() {
            tracing::warn!(
                kind = %api_error.kind,
                status = ?api_error.status,
                "{err}: {api_error}"
            );
        }
        self.error = Some(err.to_string());
        err
    }
}
