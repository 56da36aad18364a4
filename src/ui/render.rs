//! Render functions for the TUI.

use crate::app::{AddForm, App, ConfirmAction, FormField, Mode};
use crate::sync::SyncState;
use crate::util::strip_control_chars;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::{bookmarks, help, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Height of the add form panel including borders.
const FORM_HEIGHT: u16 = 6;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    // Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let show_search = app.mode == Mode::Search || !app.search_input.is_empty();
    let form_height = if app.mode == Mode::AddForm { FORM_HEIGHT } else { 0 };
    let search_height = if show_search { 1 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(form_height),
            Constraint::Length(search_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    if app.mode == Mode::AddForm {
        render_add_form(f, &app.add_form, app.vm.is_saving(), chunks[1]);
    }
    if show_search {
        render_search_bar(f, app, chunks[2]);
    }
    bookmarks::render(f, app, chunks[3]);
    status::render(f, app, chunks[4]);

    if app.show_help {
        help::render(f);
    }

    if let Some(ref confirm) = app.pending_confirm {
        render_confirm_overlay(f, confirm);
    }
}

/// App name on the left, identity and sync state on the right.
fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let (sync_label, sync_color) = match app.vm.sync_state() {
        SyncState::Live => ("● live", Color::Green),
        SyncState::Degraded => ("● offline", Color::Yellow),
        SyncState::Idle => ("○ idle", Color::DarkGray),
    };

    let line = Line::from(vec![
        Span::styled(
            " smartmarks ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " {} · {} bookmarks ",
            strip_control_chars(app.session.display_name()),
            app.vm.total()
        )),
        Span::styled(sync_label, Style::default().fg(sync_color)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_add_form(f: &mut Frame, form: &AddForm, saving: bool, area: Rect) {
    let field_line = |label: &'static str, value: &str, active: bool| {
        let cursor = if active { "_" } else { "" };
        let style = if active {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        Line::from(vec![
            Span::styled(label, Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{}{}", value, cursor), style),
        ])
    };

    let mut lines = vec![
        field_line("Title: ", &form.title, form.field == FormField::Title),
        field_line("URL:   ", &form.url, form.field == FormField::Url),
    ];
    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        )));
    } else if saving {
        lines.push(Line::from(Span::styled(
            "Saving...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Add Bookmark "),
    );
    f.render_widget(paragraph, area);
}

fn render_search_bar(f: &mut Frame, app: &App, area: Rect) {
    let cursor = if app.mode == Mode::Search { "_" } else { "" };
    let text = format!("Search: {}{}", strip_control_chars(&app.search_input), cursor);
    f.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Yellow)),
        area,
    );
}

/// Render a confirmation dialog overlay centered on screen.
fn render_confirm_overlay(f: &mut Frame, confirm: &ConfirmAction) {
    let area = f.area();

    let text = match confirm {
        ConfirmAction::DeleteBookmark { title, .. } => format!(
            "Delete \"{}\"?\n\n(y) Confirm  (n/Esc) Cancel",
            strip_control_chars(title)
        ),
    };

    let width = 50u16.min(area.width.saturating_sub(4));
    let height = 6u16.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height);

    if overlay.width < 10 || overlay.height < 5 {
        return;
    }

    f.render_widget(Clear, overlay);

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Confirm "),
        )
        .alignment(Alignment::Center);

    f.render_widget(paragraph, overlay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::session::SessionContext;
    use crate::storage::{Bookmark, Database};
    use crate::sync::BookmarkViewModel;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn test_app() -> App {
        let db = Database::open(":memory:").await.unwrap();
        let (tx, _rx) = mpsc::channel(8);
        let vm = BookmarkViewModel::new(
            db,
            "owner",
            Duration::from_millis(50),
            tx,
            Box::new(MemoryClipboard::new()),
        );
        let session = SessionContext::new("owner", Some("me@example.com")).unwrap();
        App::new(session, vm)
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_render_empty_state() {
        let app = test_app().await;
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("No bookmarks yet"));
        assert!(text.contains("me@example.com"));
    }

    #[tokio::test]
    async fn test_render_no_matches_and_copied_mark() {
        let mut app = test_app().await;
        app.vm.seed(vec![Bookmark {
            id: 1,
            owner_id: "owner".to_string(),
            title: Arc::from("Rust Book"),
            url: Arc::from("https://doc.rust-lang.org/book/"),
            created_at: 1_709_640_000,
        }]);

        app.copy_selected();
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Rust Book"));
        assert!(text.contains("doc.rust-lang.org"));
        assert!(text.contains("copied"));

        app.set_search("zzz".to_string());
        terminal.draw(|f| render(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("No results found for \"zzz\""));
    }

    #[tokio::test]
    async fn test_render_tiny_terminal() {
        let app = test_app().await;
        let mut terminal = Terminal::new(TestBackend::new(10, 2)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("Too small"));
    }
}
