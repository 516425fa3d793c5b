//! Client records and the list envelope returned by `GET /clients`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A client record as owned by the remote service.
///
/// `id` is absent until the service assigns one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub phone: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub company: String,
}

impl Client {
    /// The editable field set, without the id.
    pub fn draft(&self) -> ClientDraft {
        ClientDraft {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
        }
    }
}

/// Form contents for create/update. This is also the request body for
/// `POST /clients` and `PUT /clients/{id}`; the id travels in the path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
}

impl ClientDraft {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.email.is_empty()
            && self.phone.is_empty()
            && self.company.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The two envelopes the list endpoint is known to use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ClientList {
    Bare(Vec<Client>),
    Wrapped { clients: Vec<Client> },
}

impl ClientList {
    /// Normalizes a raw list response into an ordered sequence.
    ///
    /// Anything that matches neither envelope yields an empty list.
    pub fn normalize(body: Value) -> Vec<Client> {
        serde_json::from_value::<ClientList>(body)
            .map(ClientList::into_vec)
            .unwrap_or_default()
    }

    pub fn into_vec(self) -> Vec<Client> {
        match self {
            ClientList::Bare(clients) | ClientList::Wrapped { clients } => clients,
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
