//! UI state for dexcloud front ends
//!
//! Elm-style: the front end feeds outcomes from the core (probe results,
//! listings, errors) into [`ClientState`] and draws from it.

use crate::files::{FileLink, ListingView};
use crate::probe::HeaderAffordance;
use crate::protocol::{Credentials, Page};

/// UI input mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing into the login/register form
    Form,
    /// Typing paths for an upload
    Prompt,
    /// Blocking notification; nothing else is handled until dismissed
    Alert(String),
}

/// Status message severity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One text input of the auth form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub secret: bool,
}

impl FormField {
    fn new(name: &'static str, label: &'static str, secret: bool) -> Self {
        Self {
            name,
            label,
            value: String::new(),
            secret,
        }
    }

    /// Value as it should be drawn
    pub fn display_value(&self) -> String {
        if self.secret {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

/// Login or registration form contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFormState {
    pub fields: Vec<FormField>,
    pub focus: usize,
}

impl Default for AuthFormState {
    fn default() -> Self {
        Self {
            fields: vec![
                FormField::new("login", "Login", false),
                FormField::new("password", "Password", true),
            ],
            focus: 0,
        }
    }
}

impl AuthFormState {
    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    fn value(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
            .unwrap_or_default()
    }

    /// Serialize every field into credentials
    pub fn credentials(&self) -> Credentials {
        self.fields
            .iter()
            .filter(|f| f.name != "login" && f.name != "password")
            .fold(
                Credentials::new(self.value("login"), self.value("password")),
                |creds, f| creds.with_field(f.name, f.value.clone()),
            )
    }
}

/// Application state
#[derive(Debug, Clone)]
pub struct ClientState {
    // Navigation
    pub page: Page,
    pub header: HeaderAffordance,
    /// Bumped on every page load; background results carry the value they
    /// were started under
    pub load_id: u64,

    // Profile page
    pub entries: Vec<FileLink>,
    pub cursor: usize,
    pub scroll_offset: usize,
    pub visible_rows: usize,
    pub uploading: bool,
    pub downloading: bool,

    // Input
    pub input_mode: InputMode,
    pub form: AuthFormState,
    pub submitting: bool,
    pub prompt_input: String,
    pub status_message: Option<(String, StatusLevel)>,

    pub server_url: String,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            page: Page::Home,
            header: HeaderAffordance::Hidden,
            load_id: 0,

            entries: Vec::new(),
            cursor: 0,
            scroll_offset: 0,
            visible_rows: 20,
            uploading: false,
            downloading: false,

            input_mode: InputMode::Normal,
            form: AuthFormState::default(),
            submitting: false,
            prompt_input: String::new(),
            status_message: None,

            server_url: String::new(),
        }
    }
}

impl ClientState {
    pub fn new(server_url: &str, visible_rows: usize) -> Self {
        Self {
            server_url: server_url.to_string(),
            visible_rows: visible_rows.max(1),
            ..Default::default()
        }
    }

    /// Move to another page, dropping page-local state
    ///
    /// The header is reset to hidden until the probe started for this load
    /// completes. Returns the new load id.
    pub fn navigate(&mut self, page: Page) -> u64 {
        self.input_mode = if page.is_auth_form() {
            InputMode::Form
        } else {
            InputMode::Normal
        };
        self.page = page;
        self.header = HeaderAffordance::Hidden;
        self.form = AuthFormState::default();
        self.submitting = false;
        self.prompt_input.clear();
        self.entries.clear();
        self.cursor = 0;
        self.scroll_offset = 0;
        self.load_id += 1;
        self.load_id
    }

    /// Whether a result started under `load` still belongs to the shown page
    pub fn is_current(&self, load: u64) -> bool {
        self.load_id == load
    }

    /// Apply a finished probe; ignored unless it was started by this load
    pub fn set_header(&mut self, load: u64, header: HeaderAffordance) {
        if self.is_current(load) {
            self.header = header;
        }
    }

    /// Mark the auth form as submitted; false if a submission is outstanding
    pub fn begin_submit(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        self.submitting = true;
        true
    }

    /// Clear the in-flight flag for a submission started under `load`
    ///
    /// Returns false when the user has since left the form.
    pub fn finish_submit(&mut self, load: u64) -> bool {
        if !self.is_current(load) {
            return false;
        }
        self.submitting = false;
        true
    }

    /// Replace the file list with a freshly rendered view
    pub fn set_listing(&mut self, view: &ListingView) {
        self.entries = view.links().to_vec();
        if self.cursor >= self.entries.len() {
            self.cursor = self.entries.len().saturating_sub(1);
        }
        self.ensure_cursor_visible();
    }

    /// Move cursor down
    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
            self.ensure_cursor_visible();
        }
    }

    /// Move cursor up
    pub fn cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.ensure_cursor_visible();
        }
    }

    /// Jump to first entry
    pub fn cursor_top(&mut self) {
        self.cursor = 0;
        self.scroll_offset = 0;
    }

    /// Jump to last entry
    pub fn cursor_bottom(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.cursor = self.entries.len() - 1;
        self.ensure_cursor_visible();
    }

    /// Entry at cursor
    pub fn current_entry(&self) -> Option<&FileLink> {
        self.entries.get(self.cursor)
    }

    pub fn enter_prompt(&mut self) {
        self.input_mode = InputMode::Prompt;
        self.prompt_input.clear();
    }

    /// Leave prompt mode and return the typed paths
    pub fn take_prompt(&mut self) -> Vec<String> {
        self.input_mode = InputMode::Normal;
        std::mem::take(&mut self.prompt_input)
            .split_whitespace()
            .map(String::from)
            .collect()
    }

    /// Show a blocking notification
    pub fn alert(&mut self, message: impl Into<String>) {
        self.input_mode = InputMode::Alert(message.into());
    }

    /// Dismiss the notification and return to the page's natural mode
    pub fn dismiss_alert(&mut self) {
        if matches!(self.input_mode, InputMode::Alert(_)) {
            self.input_mode = if self.page.is_auth_form() {
                InputMode::Form
            } else {
                InputMode::Normal
            };
        }
    }

    pub fn is_alerting(&self) -> bool {
        matches!(self.input_mode, InputMode::Alert(_))
    }

    /// Exit prompt mode without acting
    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.prompt_input.clear();
    }

    /// Set status message
    pub fn set_status(&mut self, message: impl Into<String>, level: StatusLevel) {
        self.status_message = Some((message.into(), level));
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    fn ensure_cursor_visible(&mut self) {
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + self.visible_rows {
            self.scroll_offset = self.cursor - self.visible_rows + 1;
        }
    }
}
