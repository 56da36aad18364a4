use crate::session::SessionContext;
use crate::storage::Bookmark;
use crate::sync::{BookmarkViewModel, Notice, SyncEvent};
use crate::util::{validate_url_for_open, MAX_SEARCH_QUERY_LENGTH, MAX_TITLE_LENGTH};
use std::borrow::Cow;
use std::time::Duration;
use tokio::time::Instant;

/// How long a status message stays visible.
const STATUS_TTL_SECS: u64 = 3;

/// Maximum length of the url field in the add form.
const MAX_URL_INPUT_LENGTH: usize = 2048;

/// First wait between change feed resubscribe attempts; doubles per failure.
const RESUBSCRIBE_BACKOFF_INITIAL: Duration = Duration::from_secs(1);
const RESUBSCRIBE_BACKOFF_MAX: Duration = Duration::from_secs(30);

// ============================================================================
// Modes and Dialog State
// ============================================================================

/// Where keyboard input goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Moving through the list.
    Browse,
    /// Typing into the search bar.
    Search,
    /// Filling in the add form.
    AddForm,
}

/// Field of the add form that has the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Title,
    Url,
}

/// Contents of the add form.
#[derive(Debug, Clone, Default)]
pub struct AddForm {
    pub title: String,
    pub url: String,
    pub field: FormField,
    /// Validation message shown under the form until the next edit.
    pub error: Option<String>,
}

impl AddForm {
    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Url,
            FormField::Url => FormField::Title,
        };
    }

    pub fn push(&mut self, c: char) {
        let (buf, max) = match self.field {
            FormField::Title => (&mut self.title, MAX_TITLE_LENGTH),
            FormField::Url => (&mut self.url, MAX_URL_INPUT_LENGTH),
        };
        if buf.chars().count() < max {
            buf.push(c);
        }
        self.error = None;
    }

    pub fn pop(&mut self) {
        match self.field {
            FormField::Title => self.title.pop(),
            FormField::Url => self.url.pop(),
        };
        self.error = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Pending confirmation for destructive operations.
pub enum ConfirmAction {
    DeleteBookmark { id: i64, title: String },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub session: SessionContext,
    pub vm: BookmarkViewModel,

    // UI State
    pub mode: Mode,
    /// Index into the visible (filtered) list.
    pub selected: usize,
    pub search_input: String,
    pub add_form: AddForm,
    /// Title of the last submitted bookmark; the form is cleared once it is saved.
    pub submitted_title: Option<String>,

    // Status message with expiry; Cow avoids allocation for static literals
    pub status_message: Option<(Cow<'static, str>, Instant)>,

    /// Dirty flag to skip unnecessary frame renders
    pub needs_redraw: bool,

    /// Whether the help overlay is currently displayed.
    pub show_help: bool,

    /// When set, the UI renders a confirmation overlay and input is routed
    /// to the confirmation handler instead of normal dispatch.
    pub pending_confirm: Option<ConfirmAction>,

    /// Earliest time of the next resubscribe attempt; `None` means now.
    next_resubscribe: Option<Instant>,
    resubscribe_backoff: Duration,
}

impl App {
    pub fn new(session: SessionContext, vm: BookmarkViewModel) -> Self {
        Self {
            session,
            vm,
            mode: Mode::Browse,
            selected: 0,
            search_input: String::new(),
            add_form: AddForm::default(),
            submitted_title: None,
            status_message: None,
            needs_redraw: true,
            show_help: false,
            pending_confirm: None,
            next_resubscribe: None,
            resubscribe_backoff: RESUBSCRIBE_BACKOFF_INITIAL,
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn selected_bookmark(&self) -> Option<&Bookmark> {
        self.vm.visible().get(self.selected).copied()
    }

    /// Keep the selection inside the visible list after it changes size.
    pub fn clamp_selection(&mut self) {
        let len = self.vm.visible().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn nav_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn nav_down(&mut self) {
        let len = self.vm.visible().len();
        if len > 0 && self.selected + 1 < len {
            self.selected += 1;
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds)
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    /// Periodic housekeeping. Returns true if anything visible changed.
    pub fn tick(&mut self) -> bool {
        let status_cleared = self.clear_expired_status();
        let mark_cleared = self.vm.tick();
        status_cleared || mark_cleared
    }

    fn show_notice(&mut self, notice: Notice) {
        match &notice {
            Notice::Error(e) => tracing::warn!(error = %e, "Showing error notice"),
            Notice::Info(msg) => tracing::debug!(message = %msg, "Showing notice"),
        }
        self.set_status(notice.to_string());
    }

    // ========================================================================
    // Background Events
    // ========================================================================

    /// Route a background event through the view model and update the UI.
    pub fn handle_sync_event(&mut self, event: SyncEvent) {
        let created = matches!(event, SyncEvent::BookmarkCreated { .. });
        let create_failed = matches!(event, SyncEvent::CreateFailed { .. });

        if let Some(notice) = self.vm.handle_event(event) {
            self.show_notice(notice);
        }

        if created && self.submitted_title.take().is_some() {
            self.add_form.clear();
            if self.mode == Mode::AddForm {
                self.mode = Mode::Browse;
            }
        }
        if create_failed {
            // Fields are kept so the user can retry
            self.submitted_title = None;
        }

        self.clamp_selection();
        self.needs_redraw = true;
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Update the search string from the search bar.
    pub fn set_search(&mut self, text: String) {
        self.search_input = text;
        self.vm.set_filter(&self.search_input);
        self.selected = 0;
    }

    pub fn push_search_char(&mut self, c: char) {
        if self.search_input.len() >= MAX_SEARCH_QUERY_LENGTH {
            self.set_status(format!(
                "Search query at max length ({} chars)",
                MAX_SEARCH_QUERY_LENGTH
            ));
            return;
        }
        let mut text = std::mem::take(&mut self.search_input);
        text.push(c);
        self.set_search(text);
    }

    pub fn pop_search_char(&mut self) {
        let mut text = std::mem::take(&mut self.search_input);
        text.pop();
        self.set_search(text);
    }

    /// Submit the add form. Validation errors stay in the form.
    pub fn submit_add_form(&mut self) {
        if self.vm.is_saving() {
            return;
        }
        match self.vm.add_bookmark(&self.add_form.title, &self.add_form.url) {
            Ok(()) => {
                self.add_form.error = None;
                self.submitted_title = Some(self.add_form.title.trim().to_string());
                self.set_status("Saving...");
            }
            Err(e) => {
                tracing::debug!(error = %e, "Add form rejected");
                self.add_form.error = Some(e.to_string());
            }
        }
    }

    /// Ask to delete the selected bookmark. Nothing is sent until the user
    /// answers yes.
    pub fn request_delete(&mut self) {
        let Some(bookmark) = self.selected_bookmark() else {
            return;
        };
        let id = bookmark.id;
        let title = bookmark.title.to_string();

        if self.vm.is_deleting(id) {
            self.set_status("Already deleting...");
            return;
        }

        self.pending_confirm = Some(ConfirmAction::DeleteBookmark { id, title });
    }

    /// Answer the confirmation dialog.
    pub fn resolve_confirm(&mut self, confirmed: bool) {
        let Some(action) = self.pending_confirm.take() else {
            return;
        };
        match action {
            ConfirmAction::DeleteBookmark { id, title } if confirmed => {
                self.start_delete(id, &title);
            }
            ConfirmAction::DeleteBookmark { .. } => self.set_status("Cancelled"),
        }
    }

    fn start_delete(&mut self, id: i64, title: &str) {
        if self.vm.delete_bookmark(id) {
            self.set_status(format!("Deleting {}...", title));
        }
    }

    pub fn copy_selected(&mut self) {
        let Some((id, url)) = self
            .selected_bookmark()
            .map(|b| (b.id, b.url.to_string()))
        else {
            return;
        };
        match self.vm.copy(&url, id) {
            Ok(()) => self.set_status("Copied URL to clipboard"),
            Err(e) => self.show_notice(Notice::Error(e)),
        }
    }

    pub fn open_selected(&mut self) {
        let Some(url) = self.selected_bookmark().map(|b| b.url.to_string()) else {
            return;
        };
        // Stored rows may come from any writer; re-check before handing to the OS
        match validate_url_for_open(&url) {
            Err(e) => self.set_status(e),
            Ok(_) => {
                if let Err(e) = open::that(&url) {
                    self.set_status(format!("Failed to open browser: {}", e));
                }
            }
        }
    }

    /// Reload from the store. A degraded feed is retried on the next tick
    /// without waiting out the backoff.
    pub fn refresh(&mut self) {
        self.vm.refresh();
        self.next_resubscribe = None;
        self.set_status("Refreshing...");
    }

    /// Retry the change feed handshake if it is down and the backoff has
    /// elapsed. Returns true if the screen should be redrawn.
    pub async fn retry_sync_if_due(&mut self) -> bool {
        if !self.vm.needs_resubscribe() {
            self.next_resubscribe = None;
            self.resubscribe_backoff = RESUBSCRIBE_BACKOFF_INITIAL;
            return false;
        }
        let now = Instant::now();
        if self.next_resubscribe.is_some_and(|at| now < at) {
            return false;
        }

        match self.vm.resubscribe().await {
            Ok(()) => {
                self.next_resubscribe = None;
                self.resubscribe_backoff = RESUBSCRIBE_BACKOFF_INITIAL;
                self.set_status("Live sync restored");
                true
            }
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    retry_in_ms = self.resubscribe_backoff.as_millis() as u64,
                    "Resubscribe failed"
                );
                self.next_resubscribe = Some(now + self.resubscribe_backoff);
                self.resubscribe_backoff = (self.resubscribe_backoff * 2).min(RESUBSCRIBE_BACKOFF_MAX);
                false
            }
        }
    }

    /// End the session: release the change feed and drop the list.
    pub fn sign_out(&mut self) {
        tracing::info!(owner = self.session.owner_id(), "Signing out");
        self.vm.unsubscribe();
        self.vm.seed(Vec::new());
        self.pending_confirm = None;
    }
}
