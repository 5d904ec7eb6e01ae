//! Client-side session storage
//!
//! A session is two cookie entries: one for the user identifier and one for
//! the token. The jar follows browser semantics for writes: a cookie written
//! with an expiry in the past is removed. Holding a session says nothing about
//! whether the server still accepts it.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CookieConfig;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("Failed to access cookie store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cookie store: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client-held proof of login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub token: String,
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    #[default]
    None,
}

/// A single cookie entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Cookie {
    /// Cookie scoped `SameSite=None; Secure`, as used for session entries
    pub fn session_entry(
        name: impl Into<String>,
        value: impl Into<String>,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires,
            same_site: SameSite::None,
            secure: true,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

/// Parse a session expiry sent by the server (RFC 3339 or HTTP date)
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// The client's cookie store
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie>,
    path: Option<PathBuf>,
}

impl CookieJar {
    /// In-memory jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Jar backed by a JSON file, loaded if it already exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CookieError> {
        let path = path.into();
        let mut jar = Self {
            cookies: BTreeMap::new(),
            path: Some(path.clone()),
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let stored: Vec<Cookie> = serde_json::from_str(&content)?;
            for cookie in stored {
                jar.set(cookie);
            }
            tracing::debug!("Loaded {} cookie(s) from {}", jar.cookies.len(), path.display());
        }

        Ok(jar)
    }

    /// Open the jar described by the cookie config
    pub fn from_config(config: &CookieConfig) -> Result<Self, CookieError> {
        match config.resolved_store_path() {
            Some(path) => Self::open(path),
            None => Ok(Self::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write a cookie; an already-expired cookie deletes the entry instead
    pub fn set(&mut self, cookie: Cookie) {
        if cookie.is_expired_at(Utc::now()) {
            self.cookies.remove(&cookie.name);
        } else {
            self.cookies.insert(cookie.name.clone(), cookie);
        }
    }

    /// Value of an unexpired cookie
    pub fn get(&self, name: &str) -> Option<&str> {
        let now = Utc::now();
        self.cookies
            .get(name)
            .filter(|c| !c.is_expired_at(now))
            .map(|c| c.value.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    /// Value for a `Cookie` request header, `None` when the jar is empty
    pub fn header_value(&self) -> Option<String> {
        let now = Utc::now();
        let pairs: Vec<String> = self
            .cookies
            .values()
            .filter(|c| !c.is_expired_at(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Write both session entries; the token carries the expiry
    pub fn store_session(&mut self, session: &Session, keys: &CookieConfig) {
        self.set(Cookie::session_entry(&keys.identity_key, &session.user_id, None));
        self.set(Cookie::session_entry(&keys.token_key, &session.token, session.expiry));
    }

    /// Session held by the jar, if both entries are present and non-empty
    pub fn session(&self, keys: &CookieConfig) -> Option<Session> {
        let user_id = self.get(&keys.identity_key).filter(|v| !v.is_empty())?;
        let token = self.get(&keys.token_key).filter(|v| !v.is_empty())?;

        Some(Session {
            user_id: user_id.to_string(),
            token: token.to_string(),
            expiry: self.cookies.get(&keys.token_key).and_then(|c| c.expires),
        })
    }

    pub fn has_session(&self, keys: &CookieConfig) -> bool {
        self.session(keys).is_some()
    }

    /// Overwrite both session entries with an already-expired timestamp
    pub fn clear_session(&mut self, keys: &CookieConfig) {
        for name in [&keys.identity_key, &keys.token_key] {
            self.set(Cookie::session_entry(name, "", Some(DateTime::<Utc>::UNIX_EPOCH)));
        }
    }

    /// Persist unexpired cookies; a no-op for in-memory jars
    ///
    /// The store holds the session token, so on unix it is readable by the
    /// owner only.
    pub fn save(&self) -> Result<(), CookieError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let now = Utc::now();
        let live: Vec<&Cookie> = self.cookies.values().filter(|c| !c.is_expired_at(now)).collect();
        let content = serde_json::to_string_pretty(&live)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        // Tighten a store created before permissions were enforced
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(content.as_bytes())?;
        file.flush()?;

        tracing::debug!("Saved {} cookie(s) to {}", live.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn keys() -> CookieConfig {
        CookieConfig::default()
    }

    fn session() -> Session {
        Session {
            user_id: "42".to_string(),
            token: "tok1".to_string(),
            expiry: None,
        }
    }

    #[test]
    fn test_parse_expiry_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(parse_expiry("Wed, 21 Oct 2026 07:28:00 GMT"), Some(expected));
        assert_eq!(parse_expiry("2026-10-21T07:28:00Z"), Some(expected));
        assert_eq!(parse_expiry("next tuesday"), None);
    }

    #[test]
    fn test_store_and_read_session() {
        let mut jar = CookieJar::new();
        assert!(!jar.has_session(&keys()));

        jar.store_session(&session(), &keys());
        assert_eq!(jar.get("userid"), Some("42"));
        assert_eq!(jar.get("token"), Some("tok1"));
        assert_eq!(jar.session(&keys()), Some(session()));

        let cookie = jar.cookie("token").unwrap();
        assert_eq!(cookie.same_site, SameSite::None);
        assert!(cookie.secure);
    }

    #[test]
    fn test_session_requires_both_entries() {
        let mut jar = CookieJar::new();
        jar.set(Cookie::session_entry("token", "tok1", None));
        assert!(!jar.has_session(&keys()));

        jar.set(Cookie::session_entry("userid", "", None));
        assert!(!jar.has_session(&keys()));

        jar.set(Cookie::session_entry("userid", "42", None));
        assert!(jar.has_session(&keys()));
    }

    #[test]
    fn test_clear_session_removes_entries() {
        let mut jar = CookieJar::new();
        jar.store_session(&session(), &keys());
        jar.set(Cookie::session_entry("theme", "dark", None));

        jar.clear_session(&keys());
        assert!(jar.get("userid").is_none());
        assert!(jar.get("token").is_none());
        assert_eq!(jar.header_value().as_deref(), Some("theme=dark"));
    }

    #[test]
    fn test_expired_token_is_not_a_session() {
        let mut jar = CookieJar::new();
        let mut s = session();
        s.expiry = Some(Utc::now() + Duration::milliseconds(50));
        jar.store_session(&s, &keys());
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert!(!jar.has_session(&keys()));
        assert_eq!(jar.header_value().as_deref(), Some("userid=42"));
    }

    #[test]
    fn test_header_value() {
        let mut jar = CookieJar::new();
        assert!(jar.header_value().is_none());
        jar.store_session(&session(), &keys());
        assert_eq!(jar.header_value().as_deref(), Some("token=tok1; userid=42"));
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let mut jar = CookieJar::open(&path).unwrap();
        jar.store_session(&session(), &keys());
        jar.save().unwrap();

        let reopened = CookieJar::open(&path).unwrap();
        assert_eq!(reopened.session(&keys()), Some(session()));

        let mut jar = reopened;
        jar.clear_session(&keys());
        jar.save().unwrap();
        assert!(!CookieJar::open(&path).unwrap().has_session(&keys()));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;

        let mut jar = CookieJar::open(&path).unwrap();
        assert_eq!(jar.path(), Some(path.as_path()));
        jar.store_session(&session(), &keys());
        jar.save().unwrap();
        assert_eq!(mode(&path), 0o600);

        // A store left world-readable by an older write is tightened
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        jar.save().unwrap();
        assert_eq!(mode(&path), 0o600);
        assert_eq!(CookieJar::open(&path).unwrap().session(&keys()), Some(session()));
    }
}
