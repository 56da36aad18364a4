mod bookmarks;
mod changes;
mod schema;
mod types;

pub use changes::{ChangeKind, RowChange, CHANGE_BATCH_SIZE};
pub use schema::Database;
pub use types::{Bookmark, DatabaseError, Snapshot};
