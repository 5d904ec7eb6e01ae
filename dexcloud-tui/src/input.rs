//! Keyboard input handling

use crossterm::event::{KeyCode, KeyEvent};
use dexcloud_core::{state::StatusLevel, HeaderAffordance, InputMode, Page};

use crate::app::{App, AppResult};

/// Handle a key event
pub async fn handle_key(app: &mut App, key: KeyEvent) -> AppResult {
    match app.state.input_mode {
        InputMode::Alert(_) => handle_alert_mode(app, key),
        InputMode::Form => handle_form_mode(app, key),
        InputMode::Prompt => handle_prompt_mode(app, key).await,
        InputMode::Normal => handle_normal_mode(app, key).await,
    }
}

/// Only dismissal gets through while an alert is up
fn handle_alert_mode(app: &mut App, key: KeyEvent) -> AppResult {
    if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
        app.state.dismiss_alert();
    }
    AppResult::Continue
}

/// Handle keys on the main pages
async fn handle_normal_mode(app: &mut App, key: KeyEvent) -> AppResult {
    let on_profile = app.state.page == Page::Profile;

    match key.code {
        KeyCode::Char('q') => return AppResult::Quit,

        // Pages
        KeyCode::Char('h') => app.open(Page::Home),
        KeyCode::Char('l') if app.state.header == HeaderAffordance::LoginLink => {
            app.open(Page::Login);
        }
        KeyCode::Char('g') => app.open(Page::Register),
        KeyCode::Char('p') => app.open(Page::Profile),
        KeyCode::Char('o') => app.logout().await,

        // Profile page
        KeyCode::Char('j') | KeyCode::Down if on_profile => app.state.cursor_down(),
        KeyCode::Char('k') | KeyCode::Up if on_profile => app.state.cursor_up(),
        KeyCode::Home if on_profile => app.state.cursor_top(),
        KeyCode::Char('G') | KeyCode::End if on_profile => app.state.cursor_bottom(),
        KeyCode::Char('u') => app.begin_upload(),
        KeyCode::Char('r') if on_profile => app.refresh(),
        KeyCode::Enter if on_profile => app.download_selected(),

        KeyCode::Esc => app.state.clear_status(),

        KeyCode::Char('?') => {
            app.state.set_status(
                "h:home l:login g:register p:profile o:logout │ u:upload r:refresh Enter:download │ q:quit",
                StatusLevel::Info,
            );
        }

        _ => {}
    }

    AppResult::Continue
}

/// Handle keys while filling the login/register form
fn handle_form_mode(app: &mut App, key: KeyEvent) -> AppResult {
    match key.code {
        KeyCode::Esc => app.open(Page::Home),
        KeyCode::Tab | KeyCode::Down => app.state.form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => app.state.form.focus_prev(),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Backspace if !app.state.submitting => app.state.form.pop_char(),
        KeyCode::Char(c) if !app.state.submitting => app.state.form.push_char(c),
        _ => {}
    }

    AppResult::Continue
}

/// Handle keys in the upload prompt
async fn handle_prompt_mode(app: &mut App, key: KeyEvent) -> AppResult {
    match key.code {
        KeyCode::Esc => app.state.exit_input_mode(),
        KeyCode::Enter => {
            let paths = app.state.take_prompt();
            app.upload(paths).await;
        }
        KeyCode::Backspace => {
            app.state.prompt_input.pop();
        }
        KeyCode::Char(c) => app.state.prompt_input.push(c),
        _ => {}
    }

    AppResult::Continue
}
