//! File upload, listing and download for the profile page
//!
//! The panel owns the rendered listing. The listing is only ever rebuilt from
//! a server response: after page load, and after an upload the server
//! accepted. At most one upload per panel is in flight at a time.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::client::ApiClient;
use crate::protocol::{FileListing, ProtocolError, Rejection};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{0}")]
    Rejected(Rejection),

    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("Unexpected response: {0}")]
    InvalidResponse(#[from] ProtocolError),

    #[error("No files selected")]
    EmptyBatch,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Refusing to write file named {0:?}")]
    InvalidName(String),
}

/// One local file inside an upload batch
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Files picked in one interaction, consumed by a single upload
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    parts: Vec<UploadPart>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an in-memory file
    pub fn push(&mut self, file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.parts.push(UploadPart {
            file_name: file_name.into(),
            bytes: bytes.into(),
        });
    }

    /// Read local files into a batch, keeping their base names
    pub async fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, std::io::Error> {
        let mut batch = Self::new();
        for path in paths {
            let path = path.as_ref();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("{} is not a file", path.display()),
                    )
                })?;
            let bytes = tokio::fs::read(path).await?;
            batch.push(file_name, bytes);
        }
        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.file_name.as_str())
    }

    /// Multipart body with one part per file, all under `field`
    fn into_form(self, field: &str) -> Form {
        self.parts.into_iter().fold(Form::new(), |form, part| {
            form.part(
                field.to_string(),
                Part::bytes(part.bytes).file_name(part.file_name),
            )
        })
    }
}

/// Download link for one listed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    pub user_id: String,
    pub file_name: String,
    /// `/uploads/{userId}/{filename}`
    pub href: String,
}

impl FileLink {
    pub fn new(uploads_prefix: &str, user_id: &str, file_name: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            file_name: file_name.to_string(),
            href: format!(
                "{}/{}/{}",
                uploads_prefix.trim_end_matches('/'),
                user_id,
                file_name
            ),
        }
    }
}

/// The rendered file list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingView {
    links: Vec<FileLink>,
}

impl ListingView {
    pub fn clear(&mut self) {
        self.links.clear();
    }

    /// Replace the view with one link per file, in server order
    pub fn render(&mut self, listing: &FileListing, uploads_prefix: &str) {
        self.clear();
        self.links.extend(
            listing
                .files
                .iter()
                .map(|file| FileLink::new(uploads_prefix, &listing.user_id, file)),
        );
    }

    pub fn links(&self) -> &[FileLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Releases the in-flight flag on every exit path
struct UploadGuard<'a>(&'a AtomicBool);

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Upload/list/download panel of the profile page
pub struct FileTransferPanel {
    api: ApiClient,
    view: RwLock<ListingView>,
    uploading: AtomicBool,
}

impl FileTransferPanel {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            view: RwLock::new(ListingView::default()),
            uploading: AtomicBool::new(false),
        }
    }

    /// Whether the upload trigger is currently disabled
    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::Acquire)
    }

    /// Snapshot of the rendered listing
    pub async fn view(&self) -> ListingView {
        self.view.read().await.clone()
    }

    /// Fetch the listing; any failure degrades to an empty listing
    pub async fn fetch_listing(&self) -> FileListing {
        match self.try_fetch_listing().await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!("File listing unavailable: {}", e);
                FileListing::default()
            }
        }
    }

    /// Fetch the listing, reporting why it is unavailable
    pub async fn try_fetch_listing(&self) -> Result<FileListing, TransferError> {
        let config = self.api.config();
        let resp = self
            .api
            .request(Method::GET, &config.endpoints.file_list)
            .await
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            return Err(TransferError::Rejected(Rejection::from_status(resp.status())));
        }

        let bytes = resp.bytes().await?;
        let listing: FileListing = config.api.envelope.decode(&bytes)?;
        Ok(listing.validated()?)
    }

    /// Clear the view, fetch the listing and render it
    pub async fn refresh(&self) -> ListingView {
        self.view.write().await.clear();

        let listing = self.fetch_listing().await;
        tracing::debug!("Listing for user {:?}: {} file(s)", listing.user_id, listing.files.len());

        let mut view = self.view.write().await;
        view.render(&listing, &self.api.config().endpoints.uploads);
        view.clone()
    }

    /// Upload a batch, then re-fetch the listing if the server accepted it
    ///
    /// A call made while another upload is outstanding fails with
    /// [`TransferError::UploadInProgress`] and sends nothing. On rejection the
    /// view is left as it was.
    pub async fn upload(&self, batch: UploadBatch) -> Result<ListingView, TransferError> {
        if batch.is_empty() {
            return Err(TransferError::EmptyBatch);
        }

        let _guard = self.try_begin_upload().ok_or(TransferError::UploadInProgress)?;

        let config = self.api.config();
        let count = batch.len();
        tracing::info!("Uploading {} file(s)", count);

        let resp = self
            .api
            .request(config.api.upload_method.into(), &config.endpoints.upload)
            .await
            .multipart(batch.into_form(&config.api.upload_field))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!("Upload of {} file(s) rejected with {}", count, status);
            return Err(TransferError::Rejected(Rejection::from_status(status)));
        }

        Ok(self.refresh().await)
    }

    /// Download a listed file into `dest_dir`, returning the written path
    pub async fn download(&self, link: &FileLink, dest_dir: &Path) -> Result<PathBuf, TransferError> {
        if !is_plain_file_name(&link.file_name) {
            return Err(TransferError::InvalidName(link.file_name.clone()));
        }

        let prefix = &self.api.config().endpoints.uploads;
        let segments = prefix
            .split('/')
            .filter(|s| !s.is_empty())
            .chain([link.user_id.as_str(), link.file_name.as_str()]);
        let url = self.api.url_from_segments(segments)?;

        let mut resp = self.api.request_url(Method::GET, url).await.send().await?;
        if !resp.status().is_success() {
            return Err(TransferError::Rejected(Rejection::from_status(resp.status())));
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(&link.file_name);
        let mut file = tokio::fs::File::create(&dest).await?;
        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::info!("Downloaded {} to {}", link.href, dest.display());
        Ok(dest)
    }

    fn try_begin_upload(&self) -> Option<UploadGuard<'_>> {
        self.uploading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| UploadGuard(&self.uploading))
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}
