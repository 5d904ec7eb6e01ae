//! Login and registration
//!
//! An [`AuthFormHandler`] is bound to one form (login or registration) at
//! construction. Submitting posts the form fields as a single JSON object;
//! on the configured success status the session cookies are written and the
//! caller is told to move to the profile page. Any other outcome leaves the
//! cookie jar untouched.

use reqwest::{header, Method, StatusCode};
use thiserror::Error;

use crate::client::ApiClient;
use crate::protocol::{AuthResponse, Credentials, Page, ProtocolError, Rejection};
use crate::session::Session;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{0}")]
    Rejected(Rejection),

    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] ProtocolError),
}

impl AuthError {
    /// Rejection carried by the error, if the server answered at all
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            AuthError::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

/// Which form is being submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

impl AuthMode {
    /// Page hosting this form
    pub fn page(self) -> Page {
        match self {
            AuthMode::Login => Page::Login,
            AuthMode::Register => Page::Register,
        }
    }
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    pub session: Session,
    pub redirect: Page,
}

/// Handler for one login or registration form
pub struct AuthFormHandler {
    api: ApiClient,
    mode: AuthMode,
    endpoint: String,
    success_status: StatusCode,
}

impl AuthFormHandler {
    /// Bind a handler to `mode`, resolving endpoint and success status from config
    pub fn new(api: ApiClient, mode: AuthMode) -> Self {
        let config = api.config();
        let (endpoint, status, fallback) = match mode {
            AuthMode::Login => (
                config.endpoints.login.clone(),
                config.api.login_status,
                StatusCode::OK,
            ),
            AuthMode::Register => (
                config.endpoints.register.clone(),
                config.api.register_status,
                StatusCode::CREATED,
            ),
        };

        let success_status = match StatusCode::from_u16(status) {
            Ok(status) if status.is_success() => status,
            _ => {
                tracing::warn!("Ignoring invalid {:?} success status {}, using {}", mode, status, fallback);
                fallback
            }
        };

        Self {
            mode,
            endpoint,
            success_status,
            api,
        }
    }

    pub fn login(api: ApiClient) -> Self {
        Self::new(api, AuthMode::Login)
    }

    pub fn register(api: ApiClient) -> Self {
        Self::new(api, AuthMode::Register)
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit the form and establish a session on success
    ///
    /// Every call issues a new request; nothing is deduplicated or retried.
    pub async fn submit(&self, credentials: &Credentials) -> Result<AuthSuccess, AuthError> {
        tracing::debug!("Submitting {:?} form for {}", self.mode, credentials.login);

        let body = serde_json::to_vec(credentials).map_err(ProtocolError::from)?;
        let resp = self
            .api
            .request(Method::POST, &self.endpoint)
            .await
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status != self.success_status {
            tracing::info!("{:?} rejected with {}", self.mode, status);
            return Err(AuthError::Rejected(Rejection::from_status(status)));
        }

        let bytes = resp.bytes().await?;
        let auth: AuthResponse = self.api.config().api.envelope.decode(&bytes)?;
        let session = auth.into_session()?;

        self.api.store_session(&session).await;
        tracing::info!("Session established for user {}", session.user_id);

        Ok(AuthSuccess {
            session,
            redirect: Page::Profile,
        })
    }
}
