//! dexcloud-core: Client library for the DexCloud file storage service
//!
//! This crate provides:
//! - Login/registration and session cookie handling
//! - The session probe that decides the header's auth control
//! - File upload, listing and download for the profile page
//! - UI state shared by front ends

pub mod auth;
pub mod client;
pub mod config;
pub mod files;
pub mod probe;
pub mod protocol;
pub mod session;
pub mod state;

pub use auth::{AuthError, AuthFormHandler, AuthMode, AuthSuccess};
pub use client::ApiClient;
pub use config::Config;
pub use files::{FileLink, FileTransferPanel, ListingView, TransferError, UploadBatch};
pub use probe::{AuthStatus, HeaderAffordance, SessionProbe};
pub use protocol::{Credentials, Envelope, FileListing, Page, Rejection};
pub use session::{CookieJar, Session};
pub use state::{ClientState, InputMode, StatusLevel};

/// Default port of the DexCloud server
pub const DEFAULT_PORT: u16 = 8080;
