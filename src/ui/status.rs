use crate::app::{App, Mode};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    // Use Cow to avoid allocations for static strings and borrowed status messages
    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else {
        match app.mode {
            Mode::Browse => Cow::Borrowed(
                "[a]dd [/]search [y]copy [o]pen [d]elete [r]efresh [?]help [q]uit",
            ),
            Mode::Search => Cow::Borrowed("Type to search | ESC clear | ENTER keep"),
            Mode::AddForm => Cow::Borrowed("TAB switch field | ENTER save | ESC cancel"),
        }
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);

    let paragraph = Paragraph::new(text).style(style);
    f.render_widget(paragraph, area);
}
