//! Shared helpers for flow tests.
//!
//! `ClientsApi` is a stateful stand-in for the `/clients` endpoints so a
//! mutation followed by a list can be checked end to end.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use clientdesk_core::api::ApiClient;
use clientdesk_core::session::SessionStore;
use serde_json::{Value, json};
use wiremock::matchers::{header, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TOKEN: &str = "t1";

pub fn client_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "phone": "555-0100",
        "company": "Acme"
    })
}

/// Session store that already holds [`TOKEN`].
pub fn logged_in_session() -> SessionStore {
    let session = SessionStore::in_memory();
    session.save_session(TOKEN, None).unwrap();
    session
}

pub fn api(server: &MockServer) -> ApiClient {
    ApiClient::new(server.uri())
}

#[derive(Default)]
struct StubState {
    clients: Vec<Value>,
    next_id: u32,
}

/// In-memory `/clients` resource. Lists use the wrapped envelope unless
/// built with [`ClientsApi::bare`].
#[derive(Clone, Default)]
pub struct ClientsApi {
    state: Arc<Mutex<StubState>>,
    bare: bool,
}

impl ClientsApi {
    pub fn with_clients(clients: Vec<Value>) -> Self {
        let stub = Self::default();
        stub.state.lock().unwrap().clients = clients;
        stub
    }

    pub fn bare(mut self) -> Self {
        self.bare = true;
        self
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.state.lock().unwrap().clients.clone()
    }

    /// Mounts the stub for requests carrying the bearer [`TOKEN`].
    pub async fn mount(&self, server: &MockServer) {
        Mock::given(path_regex(r"^/clients(/[^/]+)?$"))
            .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }
}

impl Respond for ClientsApi {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        let id = request
            .url
            .path()
            .strip_prefix("/clients/")
            .map(ToString::to_string);

        match (request.method.as_str(), id) {
            ("GET", None) => {
                let body = if self.bare {
                    json!(state.clients)
                } else {
                    json!({"clients": state.clients})
                };
                ResponseTemplate::new(200).set_body_json(body)
            }
            ("POST", None) => {
                let Ok(mut body) = serde_json::from_slice::<Value>(&request.body) else {
                    return ResponseTemplate::new(400);
                };
                state.next_id += 1;
                body["id"] = json!(format!("new-{}", state.next_id));
                state.clients.push(body.clone());
                ResponseTemplate::new(201).set_body_json(body)
            }
            ("PUT", Some(id)) => {
                let Ok(mut body) = serde_json::from_slice::<Value>(&request.body) else {
                    return ResponseTemplate::new(400);
                };
                let Some(slot) = state.clients.iter_mut().find(|c| c["id"] == json!(id)) else {
                    return ResponseTemplate::new(404);
                };
                body["id"] = json!(id);
                *slot = body.clone();
                ResponseTemplate::new(200).set_body_json(body)
            }
            ("DELETE", Some(id)) => {
                let before = state.clients.len();
                state.clients.retain(|c| c["id"] != json!(id));
                if state.clients.len() == before {
                    ResponseTemplate::new(404)
                } else {
                    ResponseTemplate::new(204)
                }
            }
            _ => ResponseTemplate::new(405),
        }
    }
}
