//! Input handling for the TUI.
//!
//! Keyboard input is routed by priority: help overlay, confirmation dialog,
//! then the current mode.

use crate::app::{App, Mode};
use crossterm::event::{KeyCode, KeyModifiers};

use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }

    // Help overlay captures all keys when visible
    if app.show_help {
        return handle_help_input(app, code);
    }

    // Confirmation dialog captures all keys when visible
    if app.pending_confirm.is_some() {
        return handle_confirm_input(app, code);
    }

    match app.mode {
        Mode::Browse => handle_browse_input(app, code),
        Mode::Search => handle_search_input(app, code),
        Mode::AddForm => handle_form_input(app, code),
    }
}

/// Handle input while the help overlay is visible.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    if matches!(
        code,
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')
    ) {
        app.show_help = false;
    }
    Action::Continue
}

/// Handle input while the confirmation dialog is visible.
///
/// y/Y confirms the action, n/N/Esc cancels.
fn handle_confirm_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.resolve_confirm(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.resolve_confirm(false),
        _ => {} // Ignore other keys
    }
    Action::Continue
}

/// Handle input while browsing the list.
fn handle_browse_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('S') => {
            app.sign_out();
            return Action::Quit;
        }
        KeyCode::Char('j') | KeyCode::Down => app.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),
        KeyCode::Home | KeyCode::Char('g') => app.selected = 0,
        KeyCode::End | KeyCode::Char('G') => {
            app.selected = app.vm.visible().len().saturating_sub(1);
        }
        KeyCode::Char('/') => app.mode = Mode::Search,
        KeyCode::Char('a') => {
            app.add_form.error = None;
            app.mode = Mode::AddForm;
        }
        KeyCode::Char('y') | KeyCode::Char('c') => app.copy_selected(),
        KeyCode::Char('o') | KeyCode::Enter => app.open_selected(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Esc => {
            if !app.search_input.is_empty() {
                app.set_search(String::new());
            }
        }
        _ => {}
    }
    Action::Continue
}

/// Handle input in search mode. The filter updates on every keystroke.
fn handle_search_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc => {
            app.set_search(String::new());
            app.mode = Mode::Browse;
        }
        KeyCode::Enter | KeyCode::Down | KeyCode::Up => app.mode = Mode::Browse,
        KeyCode::Backspace => app.pop_search_char(),
        KeyCode::Char(c) => app.push_search_char(c),
        _ => {}
    }
    Action::Continue
}

/// Handle input in the add form.
fn handle_form_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc => {
            // An in-flight save still completes; only the form closes
            app.mode = Mode::Browse;
            if app.submitted_title.is_none() {
                app.add_form.clear();
            }
        }
        KeyCode::Tab | KeyCode::BackTab => app.add_form.toggle_field(),
        KeyCode::Enter => app.submit_add_form(),
        KeyCode::Backspace => app.add_form.pop(),
        KeyCode::Char(c) => app.add_form.push(c),
        _ => {}
    }
    Action::Continue
}
