//! State shape migrations
//!
//! Older deployments persisted per-partition progress as a map keyed by
//! partition id. Migrations rewrite such shapes into the current
//! `{"states": [...]}` list form before a cursor is seeded from them.

use super::types::{PartitionCursorState, PartitionedState};
use crate::types::{JsonObject, JsonValue};
use tracing::debug;

/// Rewrites one historical state shape into the current one
pub trait StateMigration: Send + Sync {
    /// Whether this migration applies to the given state
    fn should_migrate(&self, state: &JsonValue) -> bool;

    /// Rewrite the state. Only called when `should_migrate` returned true.
    fn migrate(&self, state: &JsonValue) -> JsonValue;
}

/// Run migrations in order; the first one that applies rewrites the state.
pub fn apply_migrations(state: &JsonValue, migrations: &[&dyn StateMigration]) -> JsonValue {
    for migration in migrations {
        if migration.should_migrate(state) {
            debug!("migrating persisted state shape");
            return migration.migrate(state);
        }
    }
    state.clone()
}

/// Migrates the legacy partition-keyed map shape
/// `{"<partition id>": {"<cursor field>": <value>}, ...}` into
/// `{"states": [{"partition": {"<partition field>": "<id>"}, "cursor": {...}}]}`.
#[derive(Debug, Clone)]
pub struct LegacyPartitionedStateMigration {
    /// Field name the partition id is stored under in the new shape
    partition_field: String,
    /// Cursor field expected inside each legacy entry
    cursor_field: String,
}

impl LegacyPartitionedStateMigration {
    /// Create a migration for the given partition and cursor field names
    pub fn new(partition_field: impl Into<String>, cursor_field: impl Into<String>) -> Self {
        Self {
            partition_field: partition_field.into(),
            cursor_field: cursor_field.into(),
        }
    }
}

impl StateMigration for LegacyPartitionedStateMigration {
    fn should_migrate(&self, state: &JsonValue) -> bool {
        let Some(map) = state.as_object() else {
            return false;
        };
        if map.is_empty() || map.contains_key("states") || map.contains_key("uses_global_cursor") {
            return false;
        }
        // Every entry must look like {"<cursor field>": <value>}
        map.values().all(|entry| {
            entry
                .as_object()
                .is_some_and(|obj| obj.contains_key(&self.cursor_field))
        })
    }

    fn migrate(&self, state: &JsonValue) -> JsonValue {
        let Some(map) = state.as_object() else {
            return state.clone();
        };

        let states = map
            .iter()
            .map(|(partition_id, cursor)| {
                let mut partition = JsonObject::new();
                partition.insert(
                    self.partition_field.clone(),
                    JsonValue::String(partition_id.clone()),
                );
                let cursor = cursor.as_object().cloned().unwrap_or_default();
                PartitionCursorState::new(partition, cursor)
            })
            .collect();

        PartitionedState { states }.to_value()
    }
}
