//! Application state and logic

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use dexcloud_core::{
    state::StatusLevel, ApiClient, AuthError, AuthFormHandler, AuthMode, AuthSuccess, ClientState,
    Config, CookieJar, FileTransferPanel, HeaderAffordance, ListingView, Page, SessionProbe,
    TransferError, UploadBatch,
};

/// Application result for main loop
pub enum AppResult {
    Continue,
    Quit,
}

/// Completions delivered by background tasks
///
/// `load` is the page load the task was started under; results from an
/// earlier load are dropped.
enum AppEvent {
    Probed { load: u64, header: HeaderAffordance },
    Listed { load: u64, view: ListingView },
    AuthFinished {
        load: u64,
        mode: AuthMode,
        login: String,
        result: Result<AuthSuccess, AuthError>,
    },
    UploadFinished(Result<ListingView, TransferError>),
    DownloadFinished(Result<PathBuf, TransferError>),
}

/// Main application struct
pub struct App {
    /// Configuration
    pub config: Config,

    /// UI state
    pub state: ClientState,

    api: ApiClient,
    probe: Arc<SessionProbe>,
    panel: Arc<FileTransferPanel>,

    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let jar = CookieJar::from_config(&config.cookies).unwrap_or_else(|e| {
            tracing::warn!("Failed to open cookie store: {}, starting without a session", e);
            CookieJar::new()
        });

        let api = ApiClient::new(config.clone(), jar)?;
        let state = ClientState::new(api.base_url(), config.client.visible_rows);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            probe: Arc::new(SessionProbe::new(api.clone())),
            panel: Arc::new(FileTransferPanel::new(api.clone())),
            api,
            config,
            state,
            events_tx,
            events_rx,
        })
    }

    /// Page to open on startup
    pub async fn landing_page(&self) -> Page {
        if self.api.session().await.is_some() {
            Page::Profile
        } else {
            Page::Home
        }
    }

    /// Load a page: probe the session, and list files on the profile page
    pub fn open(&mut self, page: Page) {
        tracing::debug!("Opening {}", page.path());
        let load = self.state.navigate(page.clone());

        let probe = Arc::clone(&self.probe);
        let tx = self.events_tx.clone();
        let probed = page.clone();
        tokio::spawn(async move {
            let header = probe.check(&probed).await;
            let _ = tx.send(AppEvent::Probed { load, header });
        });

        if page == Page::Profile {
            self.refresh();
        }
    }

    /// Re-fetch the file listing
    pub fn refresh(&mut self) {
        let panel = Arc::clone(&self.panel);
        let tx = self.events_tx.clone();
        let load = self.state.load_id;
        tokio::spawn(async move {
            let view = panel.refresh().await;
            let _ = tx.send(AppEvent::Listed { load, view });
        });
    }

    /// Apply completions from background tasks
    pub async fn tick(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::Probed { load, header } => {
                    self.state.set_header(load, header);
                }
                AppEvent::Listed { load, view } => {
                    if self.state.is_current(load) {
                        self.state.set_listing(&view);
                    }
                }
                AppEvent::AuthFinished { load, mode, login, result } => {
                    self.finish_auth(load, mode, login, result);
                }
                AppEvent::UploadFinished(result) => {
                    self.state.uploading = false;
                    match result {
                        Ok(view) => {
                            if self.state.page == Page::Profile {
                                self.state.set_listing(&view);
                            }
                            self.state.set_status("Upload complete", StatusLevel::Success);
                        }
                        Err(e) => {
                            self.state.clear_status();
                            self.state.alert(e.to_string());
                        }
                    }
                }
                AppEvent::DownloadFinished(result) => {
                    self.state.downloading = false;
                    match result {
                        Ok(path) => self
                            .state
                            .set_status(format!("Saved {}", path.display()), StatusLevel::Success),
                        Err(e) => self
                            .state
                            .set_status(format!("Download failed: {}", e), StatusLevel::Error),
                    }
                }
            }
        }
    }

    /// Submit the login or registration form in the background
    pub fn submit_form(&mut self) {
        let mode = match self.state.page {
            Page::Login => AuthMode::Login,
            Page::Register => AuthMode::Register,
            _ => return,
        };
        if !self.state.begin_submit() {
            return;
        }

        let credentials = self.state.form.credentials();
        let handler = AuthFormHandler::new(self.api.clone(), mode);
        let load = self.state.load_id;
        let tx = self.events_tx.clone();
        self.state.set_status("Submitting...", StatusLevel::Info);

        tokio::spawn(async move {
            let result = handler.submit(&credentials).await;
            let _ = tx.send(AppEvent::AuthFinished {
                load,
                mode,
                login: credentials.login,
                result,
            });
        });
    }

    fn finish_auth(
        &mut self,
        load: u64,
        mode: AuthMode,
        login: String,
        result: Result<AuthSuccess, AuthError>,
    ) {
        if !self.state.finish_submit(load) {
            tracing::debug!("Dropping {:?} result for a form the user left", mode);
            return;
        }
        self.state.clear_status();

        match result {
            Ok(success) => {
                self.open(success.redirect);
                self.state
                    .set_status(format!("Signed in as {}", login), StatusLevel::Success);
            }
            Err(e) => {
                tracing::info!("{:?} failed: {}", mode, e);
                self.state.alert(e.to_string());
            }
        }
    }

    /// Log out if the header offers it
    pub async fn logout(&mut self) {
        if self.state.header != HeaderAffordance::LogoutControl {
            return;
        }
        let page = self.probe.logout().await;
        self.open(page);
        self.state.set_status("Logged out", StatusLevel::Info);
    }

    /// Open the upload prompt unless an upload is outstanding
    pub fn begin_upload(&mut self) {
        if self.state.page != Page::Profile {
            return;
        }
        if self.state.uploading || self.panel.is_uploading() {
            self.state.set_status("Upload already in progress", StatusLevel::Warning);
            return;
        }
        self.state.enter_prompt();
    }

    /// Read the picked files and upload them in the background
    pub async fn upload(&mut self, paths: Vec<String>) {
        if paths.is_empty() {
            return;
        }

        let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
        let batch = match UploadBatch::from_paths(&paths).await {
            Ok(batch) => batch,
            Err(e) => {
                self.state.alert(format!("Cannot read file: {}", e));
                return;
            }
        };

        self.state.uploading = true;
        self.state
            .set_status(format!("Uploading {} file(s)...", batch.len()), StatusLevel::Info);

        let panel = Arc::clone(&self.panel);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = panel.upload(batch).await;
            let _ = tx.send(AppEvent::UploadFinished(result));
        });
    }

    /// Download the file under the cursor in the background
    pub fn download_selected(&mut self) {
        if self.state.downloading {
            self.state.set_status("Download already in progress", StatusLevel::Warning);
            return;
        }
        let Some(link) = self.state.current_entry().cloned() else {
            return;
        };

        self.state.downloading = true;
        self.state
            .set_status(format!("Downloading {}...", link.file_name), StatusLevel::Info);

        let dest_dir = self.config.client.resolved_download_dir();
        let panel = Arc::clone(&self.panel);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = panel.download(&link, &dest_dir).await;
            let _ = tx.send(AppEvent::DownloadFinished(result));
        });
    }
}
