use crate::app::{App, Mode};
use crate::storage::Bookmark;
use crate::sync::Classification;
use crate::util::{bookmark_domain, display_width, strip_control_chars, truncate_to_width};
use chrono::DateTime;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Format a creation timestamp as a short calendar date.
pub fn format_created(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%b %d, %Y").to_string())
        .unwrap_or_default()
}

/// Text shown in place of the list when nothing is visible.
pub fn empty_message(classification: Classification, query: &str) -> Option<String> {
    match classification {
        Classification::EmptyNoBookmarks => {
            Some("No bookmarks yet. Press 'a' to add one.".to_string())
        }
        Classification::EmptyNoMatches => Some(format!(
            "No results found for \"{}\"",
            strip_control_chars(query)
        )),
        Classification::HasResults => None,
    }
}

/// Build the two-line list entry for one bookmark.
fn bookmark_item<'a>(app: &App, bookmark: &'a Bookmark, width: usize) -> ListItem<'a> {
    let copied = app.vm.is_copied(bookmark.id);
    let deleting = app.vm.is_deleting(bookmark.id);

    // Titles and urls can come from other writers; never let them reach the terminal raw
    let title = strip_control_chars(&bookmark.title);
    let url = strip_control_chars(&bookmark.url);

    let date = format_created(bookmark.created_at);
    let marker = if copied {
        "✓ copied"
    } else if deleting {
        "deleting..."
    } else {
        ""
    };
    let reserved = display_width(marker) + 2;
    let title = truncate_to_width(&title, width.saturating_sub(reserved)).into_owned();

    let mut first = vec![Span::styled(
        title,
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if copied {
        first.push(Span::styled(
            format!("  {}", marker),
            Style::default().fg(Color::Green),
        ));
    } else if deleting {
        first.push(Span::styled(
            format!("  {}", marker),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let domain = bookmark_domain(&url).unwrap_or_else(|| url.to_string());
    let detail = format!("{}  {}", domain, date);
    let second = Line::from(Span::styled(
        truncate_to_width(&detail, width).into_owned(),
        Style::default().fg(Color::DarkGray),
    ));

    let item = ListItem::new(vec![Line::from(first), second]);
    if deleting {
        item.style(Style::default().add_modifier(Modifier::DIM))
    } else {
        item
    }
}

/// Render the bookmark list panel
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let is_focused = app.mode == Mode::Browse;
    let border_style = if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let visible = app.vm.visible();
    let title = if app.vm.filter_text().is_empty() {
        format!("Bookmarks ({})", app.vm.total())
    } else {
        format!("Bookmarks ({} of {})", visible.len(), app.vm.total())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);

    if let Some(message) = empty_message(app.vm.classification(), app.vm.filter_text()) {
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(Color::Gray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = visible
        .iter()
        .map(|bookmark| bookmark_item(app, bookmark, inner_width))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(list, area, &mut state);
}
