//! Integration tests for live sync between sessions.
//!
//! Each test opens the same database file twice, once per session, so the
//! sessions only see each other's writes through the change feed.

use smartmarks::clipboard::MemoryClipboard;
use smartmarks::storage::Database;
use smartmarks::sync::{BookmarkViewModel, Classification, SyncEvent, SyncState};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

const POLL: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(10);

/// Temporary database file removed (with its WAL files) on drop.
struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "smartmarks-{}-{}.db",
            name,
            std::process::id()
        ));
        let db = Self { path };
        db.cleanup();
        db
    }

    fn path(&self) -> &str {
        self.path.to_str().unwrap()
    }

    fn cleanup(&self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(p));
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        self.cleanup();
    }
}

struct Session {
    vm: BookmarkViewModel,
    rx: mpsc::Receiver<SyncEvent>,
    db: Database,
}

/// Open a session the way the binary does: subscribe, then load the snapshot.
async fn open_session(path: &str, owner: &str) -> Session {
    let db = Database::open(path).await.unwrap();
    let (tx, rx) = mpsc::channel(64);
    let mut vm = BookmarkViewModel::new(
        db.clone(),
        owner,
        POLL,
        tx,
        Box::new(MemoryClipboard::new()),
    );
    vm.subscribe(owner).await.unwrap();
    let snapshot = db.snapshot_for_owner(owner).await.unwrap();
    vm.load_snapshot(snapshot);
    Session { vm, rx, db }
}

impl Session {
    /// Feed events to the view model until `cond` holds.
    async fn pump_until(&mut self, cond: impl Fn(&BookmarkViewModel) -> bool) {
        let deadline = Instant::now() + WAIT;
        while !cond(&self.vm) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = timeout(remaining, self.rx.recv())
                .await
                .expect("timed out waiting for sync")
                .expect("channel closed");
            self.vm.handle_event(event);
        }
    }

    /// Feed whatever arrives within `window` to the view model.
    async fn pump_for(&mut self, window: Duration) {
        let deadline = Instant::now() + window;
        while let Ok(Some(event)) =
            timeout(deadline.saturating_duration_since(Instant::now()), self.rx.recv()).await
        {
            self.vm.handle_event(event);
        }
    }

    fn titles(&self) -> Vec<String> {
        self.vm.bookmarks().iter().map(|b| b.title.to_string()).collect()
    }
}

#[tokio::test]
async fn test_insert_in_one_session_appears_in_other() {
    let tmp = TempDb::new("insert");
    let mut a = open_session(tmp.path(), "alice").await;
    let mut b = open_session(tmp.path(), "alice").await;
    assert_eq!(b.vm.classification(), Classification::EmptyNoBookmarks);
    assert_eq!(b.vm.sync_state(), SyncState::Live);

    a.vm.add_bookmark("Rust", "https://rust-lang.org").unwrap();

    a.pump_until(|vm| vm.total() == 1).await;
    b.pump_until(|vm| vm.total() == 1).await;
    assert_eq!(b.titles(), vec!["Rust"]);

    a.vm.add_bookmark("Tokio", "https://tokio.rs").unwrap();
    b.pump_until(|vm| vm.total() == 2).await;
    // Newest first
    assert_eq!(b.titles(), vec!["Tokio", "Rust"]);
}

#[tokio::test]
async fn test_delete_in_one_session_removes_everywhere() {
    let tmp = TempDb::new("delete");
    let seed = Database::open(tmp.path()).await.unwrap();
    let doomed = seed
        .insert_bookmark("alice", "Doomed", "https://doomed.example.com")
        .await
        .unwrap();
    seed.insert_bookmark("alice", "Keeper", "https://keeper.example.com")
        .await
        .unwrap();

    let mut a = open_session(tmp.path(), "alice").await;
    let mut b = open_session(tmp.path(), "alice").await;
    assert_eq!(a.vm.total(), 2);

    assert!(a.vm.delete_bookmark(doomed.id));
    a.pump_until(|vm| vm.get(doomed.id).is_none() && !vm.is_deleting(doomed.id))
        .await;
    b.pump_until(|vm| vm.get(doomed.id).is_none()).await;
    assert_eq!(b.titles(), vec!["Keeper"]);
}

#[tokio::test]
async fn test_other_owners_changes_are_invisible() {
    let tmp = TempDb::new("owners");
    let mut alice = open_session(tmp.path(), "alice").await;
    let mut bob = open_session(tmp.path(), "bob").await;

    bob.vm.add_bookmark("Bob's", "https://bob.example.com").unwrap();
    bob.pump_until(|vm| vm.total() == 1).await;

    alice.pump_for(Duration::from_millis(200)).await;
    assert_eq!(alice.vm.total(), 0);
    assert_eq!(alice.db.count_bookmarks("bob").await.unwrap(), 1);
}

#[tokio::test]
async fn test_late_session_sees_history_once() {
    let tmp = TempDb::new("late");
    let mut a = open_session(tmp.path(), "alice").await;
    a.vm.add_bookmark("First", "https://first.example.com").unwrap();
    a.pump_until(|vm| vm.total() == 1).await;

    // Opened after the insert: the row arrives through the snapshot, and the
    // feed does not deliver it a second time
    let mut late = open_session(tmp.path(), "alice").await;
    assert_eq!(late.titles(), vec!["First"]);
    late.pump_for(Duration::from_millis(200)).await;
    assert_eq!(late.titles(), vec!["First"]);
}

#[tokio::test]
async fn test_released_session_stops_receiving() {
    let tmp = TempDb::new("release");
    let mut a = open_session(tmp.path(), "alice").await;
    let mut b = open_session(tmp.path(), "alice").await;

    b.vm.unsubscribe();
    assert_eq!(b.vm.sync_state(), SyncState::Idle);

    a.vm.add_bookmark("After", "https://after.example.com").unwrap();
    a.pump_until(|vm| vm.total() == 1).await;

    b.pump_for(Duration::from_millis(200)).await;
    assert_eq!(b.vm.total(), 0);
}
