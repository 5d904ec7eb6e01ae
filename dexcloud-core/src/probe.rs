//! Session probe and header affordance
//!
//! On every page load the client asks the server whether its session is
//! still good, then decides what the header shows. The header is computed
//! only from a finished probe, so it never shows a guessed state.

use reqwest::{Method, StatusCode};

use crate::client::ApiClient;
use crate::protocol::Page;

/// Outcome of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated,
    Anonymous,
}

/// The single auth control rendered in the header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderAffordance {
    /// Link to the login page
    LoginLink,
    /// Control that clears the session
    LogoutControl,
    /// Nothing; used on the login and register pages
    #[default]
    Hidden,
}

/// Header for a page given a probe outcome
pub fn header_for(status: AuthStatus, page: &Page) -> HeaderAffordance {
    if page.is_auth_form() {
        return HeaderAffordance::Hidden;
    }
    match status {
        AuthStatus::Authenticated => HeaderAffordance::LogoutControl,
        AuthStatus::Anonymous => HeaderAffordance::LoginLink,
    }
}

pub struct SessionProbe {
    api: ApiClient,
}

impl SessionProbe {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Ask the server whether the current session is valid
    ///
    /// Only a 200 counts. Rejections and transport failures both resolve to
    /// [`AuthStatus::Anonymous`].
    pub async fn probe(&self) -> AuthStatus {
        let endpoint = &self.api.config().endpoints.check_auth;

        match self.api.request(Method::GET, endpoint).await.send().await {
            Ok(resp) if resp.status() == StatusCode::OK => AuthStatus::Authenticated,
            Ok(resp) => {
                tracing::debug!("Session probe rejected with {}", resp.status());
                AuthStatus::Anonymous
            }
            Err(e) => {
                tracing::debug!("Session probe failed: {}", e);
                AuthStatus::Anonymous
            }
        }
    }

    /// Probe, then compute the header for `page`
    pub async fn check(&self, page: &Page) -> HeaderAffordance {
        let status = self.probe().await;
        header_for(status, page)
    }

    /// Client-side logout: expire both session cookies and go home
    ///
    /// The server is not contacted; its copy of the token stays valid until
    /// it expires.
    pub async fn logout(&self) -> Page {
        self.api.clear_session().await;
        tracing::info!("Logged out");
        Page::Home
    }
}
