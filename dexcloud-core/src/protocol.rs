//! Wire types for the DexCloud HTTP API
//!
//! All bodies are JSON. Depending on the server build, payloads arrive either
//! at the top level or wrapped in a `data` object; [`Envelope`] selects which.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::session::{parse_expiry, Session};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Response carried no user identifier")]
    MissingIdentity,

    #[error("Response carried an empty token")]
    EmptyToken,
}

/// Where a response payload sits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// `{ "userId": ..., ... }`
    #[default]
    Flat,
    /// `{ "data": { "userId": ..., ... } }`
    Nested,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    data: T,
}

impl Envelope {
    /// Decode a payload out of a raw response body
    pub fn decode<T: DeserializeOwned>(self, body: &[u8]) -> Result<T, ProtocolError> {
        let payload = match self {
            Envelope::Flat => serde_json::from_slice(body)?,
            Envelope::Nested => serde_json::from_slice::<Wrapped<T>>(body)?.data,
        };
        Ok(payload)
    }
}

/// Form fields submitted to login or registration
///
/// Extra fields (registration profile data) are serialized flat next to
/// `login` and `password`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Add an extra form field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Body of a successful login or registration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(
        rename = "userId",
        alias = "userid",
        alias = "user_id",
        default,
        deserialize_with = "opt_string_or_number"
    )]
    pub user_id: Option<String>,

    /// Older servers only echo the login back
    #[serde(default)]
    pub login: Option<String>,

    pub token: String,

    #[serde(alias = "expires", default)]
    pub expiry: Option<String>,
}

impl AuthResponse {
    /// Turn the response into a session, preferring `userId` over `login`
    pub fn into_session(self) -> Result<Session, ProtocolError> {
        let user_id = self
            .user_id
            .filter(|id| !id.is_empty())
            .or(self.login.filter(|login| !login.is_empty()))
            .ok_or(ProtocolError::MissingIdentity)?;

        if self.token.is_empty() {
            return Err(ProtocolError::EmptyToken);
        }

        let expiry = self.expiry.as_deref().and_then(|raw| {
            let parsed = parse_expiry(raw);
            if parsed.is_none() {
                tracing::warn!("Ignoring unparseable session expiry: {}", raw);
            }
            parsed
        });

        Ok(Session {
            user_id,
            token: self.token,
            expiry,
        })
    }
}

/// Files owned by the session's user
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileListing {
    #[serde(
        rename = "userId",
        alias = "userid",
        alias = "user_id",
        default,
        deserialize_with = "string_or_number"
    )]
    pub user_id: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub files: Vec<String>,
}

impl FileListing {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Reject listings whose files cannot be linked to an owner
    pub fn validated(self) -> Result<Self, ProtocolError> {
        if !self.files.is_empty() && self.user_id.is_empty() {
            return Err(ProtocolError::MissingIdentity);
        }
        Ok(self)
    }
}

/// A non-success HTTP status, as surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub status_text: String,
}

impl Rejection {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status_text.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{} {}", self.status, self.status_text)
        }
    }
}

/// Pages of the web app the client can be on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    Home,
    Login,
    Register,
    Profile,
    Other(String),
}

impl Page {
    pub fn path(&self) -> &str {
        match self {
            Page::Home => "/",
            Page::Login => "/login",
            Page::Register => "/register",
            Page::Profile => "/profile",
            Page::Other(path) => path,
        }
    }

    /// Login and registration pages carry no auth control in the header
    pub fn is_auth_form(&self) -> bool {
        matches!(self, Page::Login | Page::Register)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
