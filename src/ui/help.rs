//! Help overlay: keybinding table.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Row, Table},
    Frame,
};

/// Key groups shown on the help screen.
const SECTIONS: [(&str, &[(&str, &str)]); 3] = [
    (
        "List",
        &[
            ("j / Down", "Navigate down"),
            ("k / Up", "Navigate up"),
            ("a", "Add bookmark"),
            ("/", "Search by title or url"),
            ("y / c", "Copy url to clipboard"),
            ("o / Enter", "Open in browser"),
            ("d", "Delete bookmark"),
            ("r", "Reload from store"),
            ("Esc", "Clear search"),
            ("?", "Show help"),
            ("S", "Sign out"),
            ("q", "Quit"),
        ],
    ),
    (
        "Add Form",
        &[
            ("Tab", "Switch field"),
            ("Enter", "Save bookmark"),
            ("Esc", "Cancel"),
        ],
    ),
    (
        "Search",
        &[
            ("Enter", "Keep filter and return to list"),
            ("Esc", "Clear filter"),
        ],
    ),
];

/// Render the help overlay on top of the current view.
pub fn render(f: &mut Frame) {
    let overlay = centered_rect(70, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }

    f.render_widget(Clear, overlay);

    let mut rows: Vec<Row> = Vec::new();
    for (label, bindings) in SECTIONS {
        rows.push(Row::new(vec![
            Line::from(Span::styled(
                format!("-- {} --", label),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ]));
        for (key, description) in bindings {
            rows.push(Row::new(vec![format!("  {}", key), description.to_string()]));
        }
        rows.push(Row::new(vec![String::new(), String::new()]));
    }
    rows.pop();

    let widths = [Constraint::Length(14), Constraint::Min(20)];
    let table = Table::new(rows, widths)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help (? to close) "),
        )
        .header(
            Row::new(vec!["Key", "Action"])
                .style(
                    Style::default()
                        .add_modifier(Modifier::BOLD)
                        .add_modifier(Modifier::UNDERLINED),
                )
                .bottom_margin(1),
        );

    f.render_widget(table, overlay);
}

/// Create a centered rectangle with the given percentage of the parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
