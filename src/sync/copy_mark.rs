use std::time::Duration;
use tokio::time::Instant;

/// How long a bookmark stays marked as copied.
pub const COPY_MARK_DURATION: Duration = Duration::from_secs(2);

/// Single shared "recently copied" slot.
///
/// Marking a new id replaces the previous mark and restarts the window.
/// The mark is held as a deadline and expires on its own; the event loop
/// calls [`CopyMark::clear_expired`] on each tick to know when to redraw.
#[derive(Debug, Default)]
pub struct CopyMark {
    slot: Option<(i64, Instant)>,
}

impl CopyMark {
    pub fn mark(&mut self, id: i64) {
        self.slot = Some((id, Instant::now() + COPY_MARK_DURATION));
    }

    /// Currently marked id, if its window has not elapsed.
    pub fn marked(&self) -> Option<i64> {
        match self.slot {
            Some((id, deadline)) if Instant::now() < deadline => Some(id),
            _ => None,
        }
    }

    pub fn is_marked(&self, id: i64) -> bool {
        self.marked() == Some(id)
    }

    /// Drop an elapsed mark. Returns true if one was cleared.
    pub fn clear_expired(&mut self) -> bool {
        if let Some((_, deadline)) = self.slot {
            if Instant::now() >= deadline {
                self.slot = None;
                return true;
            }
        }
        false
    }
}
