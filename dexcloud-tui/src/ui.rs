//! Terminal UI rendering with ratatui

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use dexcloud_core::{state::StatusLevel, HeaderAffordance, InputMode, Page};

use crate::app::App;

/// Main draw function
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(1),    // Page body
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Input line (upload prompt)
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    match app.state.page {
        Page::Login | Page::Register => draw_form(f, app, chunks[1]),
        Page::Profile => draw_file_list(f, app, chunks[1]),
        _ => draw_home(f, app, chunks[1]),
    }
    draw_status_bar(f, app, chunks[2]);
    draw_input_line(f, app, chunks[3]);

    if let InputMode::Alert(ref message) = app.state.input_mode {
        draw_alert(f, message);
    }
}

/// Title, current page and the auth control
fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" DexCloud ", Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::styled(app.state.page.path().to_string(), Style::default().fg(Color::Gray)),
    ];

    match app.state.header {
        HeaderAffordance::LoginLink => {
            spans.push(Span::styled("  [l] Log in", Style::default().fg(Color::Yellow)));
        }
        HeaderAffordance::LogoutControl => {
            spans.push(Span::styled("  [o] Log out", Style::default().fg(Color::Green)));
        }
        HeaderAffordance::Hidden => {}
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    f.render_widget(header, area);
}

fn draw_home(f: &mut Frame, app: &App, area: Rect) {
    let text = vec![
        Line::from(format!("Server: {}", app.state.server_url)),
        Line::from(""),
        Line::from("Press p for your files, g to register, ? for help."),
    ];
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), area);
}

/// Draw the login/register form
fn draw_form(f: &mut Frame, app: &App, area: Rect) {
    let title = match (&app.state.page, app.state.submitting) {
        (Page::Register, false) => " Register ",
        (Page::Register, true) => " Register (submitting) ",
        (_, false) => " Log in ",
        (_, true) => " Log in (submitting) ",
    };

    let lines: Vec<Line> = app
        .state
        .form
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = i == app.state.form.focus;
            let style = if focused {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let marker = if focused { "> " } else { "  " };
            Line::from(Span::styled(
                format!("{}{:<10} {}", marker, field.label, field.display_value()),
                style,
            ))
        })
        .collect();

    let form = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(form, area);
}

/// Draw the file list
fn draw_file_list(f: &mut Frame, app: &App, area: Rect) {
    if app.state.entries.is_empty() {
        let empty = Paragraph::new("No files").style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, area);
        return;
    }

    let visible_height = area.height as usize;
    let items: Vec<ListItem> = app
        .state
        .entries
        .iter()
        .enumerate()
        .skip(app.state.scroll_offset)
        .take(visible_height)
        .map(|(i, link)| {
            let line = format!("  {:<40} {}", link.file_name, link.href);
            let style = if i == app.state.cursor {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(line, style)))
        })
        .collect();

    f.render_widget(List::new(items), area);
}

/// Draw the status bar
fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if let Some((ref msg, ref level)) = app.state.status_message {
        let color = match level {
            StatusLevel::Info => Color::Blue,
            StatusLevel::Success => Color::Green,
            StatusLevel::Warning => Color::Yellow,
            StatusLevel::Error => Color::Red,
        };
        (msg.clone(), Style::default().fg(color))
    } else {
        let hints = match (&app.state.input_mode, &app.state.page) {
            (InputMode::Form, _) => "Tab:next field │ Enter:submit │ Esc:cancel",
            (InputMode::Prompt, _) => "Space-separated paths │ Enter:upload │ Esc:cancel",
            (InputMode::Alert(_), _) => "Enter:dismiss",
            (InputMode::Normal, Page::Profile) if app.state.uploading => {
                "Uploading… │ j↓ k↑ │ Enter:download │ q:quit"
            }
            (InputMode::Normal, Page::Profile) => {
                "j↓ k↑ │ u:upload r:refresh Enter:download │ ?:help q:quit"
            }
            (InputMode::Normal, _) => "p:profile g:register │ ?:help q:quit",
        };
        (hints.to_string(), Style::default().fg(Color::DarkGray))
    };

    f.render_widget(Paragraph::new(text).style(style), area);
}

/// Draw the input line (upload prompt)
fn draw_input_line(f: &mut Frame, app: &App, area: Rect) {
    if app.state.input_mode != InputMode::Prompt {
        return;
    }

    let prefix = "Upload: ";
    let content = &app.state.prompt_input;
    let input_line = Paragraph::new(format!("{}{}", prefix, content))
        .style(Style::default().fg(Color::White));
    f.render_widget(input_line, area);

    let x = area.x + prefix.len() as u16 + content.chars().count() as u16;
    f.set_cursor_position((x, area.y));
}

/// Blocking notification popup
fn draw_alert(f: &mut Frame, message: &str) {
    let area = centered(f.area(), 50, 5);
    let popup = Paragraph::new(message.to_string())
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Error "),
        );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
