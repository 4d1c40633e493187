use crate::model::{Note, SyncCursor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure surface of the remote note service. The service reports outcomes
/// as numeric status codes with 0 meaning success; any other code becomes
/// `Status`. Failures to reach the service at all become `Transport`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("remote returned status {0}")]
    Status(i64),
    #[error("transport: {0}")]
    Transport(String),
}

/// Full index listing. The service reports its current change cursor along
/// with the notes so a fresh cache can start syncing without a second call.
#[derive(Clone, Debug)]
pub struct NoteListing {
    pub notes: Vec<serde_json::Value>,
    pub cursor: SyncCursor,
}

/// One page of the change feed: everything after the requested cursor, plus
/// the cursor to hand back next time. Tombstones arrive as records with
/// `deleted` set.
#[derive(Clone, Debug)]
pub struct ChangeBatch {
    pub cursor: SyncCursor,
    pub changes: Vec<serde_json::Value>,
}

/// Client interface to the remote note store. Records are dynamically shaped
/// (`serde_json::Value`); callers coerce them at the boundary via
/// [`crate::coerce::note_from_value`].
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn list_notes(&self) -> Result<NoteListing, StoreError>;

    /// Changes strictly after `cursor`; `None` means from the beginning.
    async fn list_changes(
        &self,
        cursor: Option<&SyncCursor>,
        include_tags: bool,
    ) -> Result<ChangeBatch, StoreError>;

    async fn get_note(&self, id: &str) -> Result<serde_json::Value, StoreError>;

    async fn create_note(&self, note: &Note) -> Result<serde_json::Value, StoreError>;

    async fn update_note(&self, note: &Note) -> Result<serde_json::Value, StoreError>;

    async fn trash_note(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Modified,
    Created,
    Title,
    ContentLength,
}

impl SortBy {
    /// The direction this key sorts in when the caller does not override it:
    /// recency and size descending, titles ascending.
    pub fn natural_direction(self) -> SortDirection {
        match self {
            SortBy::Title => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    /// Page size; `None` falls back to the configured default.
    pub limit: Option<usize>,
    pub offset: usize,
    /// Single tag to filter on; the virtual value `"untagged"` selects notes
    /// with no tags at all.
    pub tag_filter: Option<String>,
    pub sort_by: SortBy,
    /// `None` uses the sort key's natural direction.
    pub sort_direction: Option<SortDirection>,
    /// Place pinned notes ahead of unpinned ones, each group sorted on its
    /// own.
    pub pinned_first: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if ts < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if ts > to {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Debug, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub offset: usize,
    /// All listed tags must be present on a matching note. The virtual
    /// `"untagged"` value is accepted here too.
    pub tag_filters: Vec<String>,
    /// Brackets the note's modification time when set.
    pub date_range: Option<DateRange>,
}
