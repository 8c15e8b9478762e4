//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`UserId`]: caller identifier (assigned by the upstream identity proxy)
//! - [`ProjectId`]: project identifier
//! - [`SprintId`]: sprint identifier
//! - [`StoryId`]: story identifier
//! - [`EpicId`]: epic identifier
//! - [`UsageLogId`]: usage-log entry identifier

use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type ProjectId = Uuid;
pub type SprintId = Uuid;
pub type StoryId = Uuid;
pub type EpicId = Uuid;
pub type UsageLogId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
