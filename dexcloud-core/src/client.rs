//! Shared HTTP client
//!
//! Wraps a `reqwest::Client` together with the cookie jar. Every request
//! carries the jar's cookies, which is how the server learns about the
//! session. Cloning is cheap; clones share the jar.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Url};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::session::{CookieJar, Session};

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    config: Arc<Config>,
    jar: Arc<RwLock<CookieJar>>,
}

impl ApiClient {
    /// Create a client for the configured server
    pub fn new(config: Config, jar: CookieJar) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if config.server.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.server.timeout_secs));
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            config: Arc::new(config),
            jar: Arc::new(RwLock::new(jar)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a server path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Absolute URL built from raw path segments, each percent-encoded
    pub fn url_from_segments<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.base_url)?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    pub fn jar(&self) -> &Arc<RwLock<CookieJar>> {
        &self.jar
    }

    /// Request builder for a server path with the session cookies attached
    pub async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        self.request_url(method, url).await
    }

    /// Request builder for an absolute URL with the session cookies attached
    pub async fn request_url(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        let mut req = self.http.request(method, url);

        if let Some(cookies) = self.jar.read().await.header_value() {
            req = req.header(header::COOKIE, cookies);
        }

        req
    }

    /// Session currently held in the jar
    pub async fn session(&self) -> Option<Session> {
        self.jar.read().await.session(&self.config.cookies)
    }

    /// Write both session cookies and persist the jar
    pub async fn store_session(&self, session: &Session) {
        let mut jar = self.jar.write().await;
        jar.store_session(session, &self.config.cookies);
        persist(&jar);
    }

    /// Expire both session cookies and persist the jar
    pub async fn clear_session(&self) {
        let mut jar = self.jar.write().await;
        jar.clear_session(&self.config.cookies);
        persist(&jar);
    }
}

fn persist(jar: &CookieJar) {
    if let Err(e) = jar.save() {
        let path = jar.path().map(|p| p.display().to_string()).unwrap_or_default();
        tracing::warn!("Failed to persist cookies to {}: {}", path, e);
    }
}
