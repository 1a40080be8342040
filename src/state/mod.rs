//! Cursor state shapes and state migrations
//!
//! State snapshots cross the persistence boundary as plain JSON mappings;
//! the typed shapes here are the three forms cursors emit and re-read:
//! flat datetime state, per-partition state lists, and global substream
//! state. Migrations rewrite historical shapes into the current ones
//! before a cursor interprets them.

mod migration;
mod types;

pub use migration::{apply_migrations, LegacyPartitionedStateMigration, StateMigration};
pub use types::{GlobalState, PartitionCursorState, PartitionedState};
