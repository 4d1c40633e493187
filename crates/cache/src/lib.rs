//! In-memory replica of a remote note store.
//!
//! [`cache::NoteCache`] owns the note table, tag index, and sync cursor and
//! exposes initialize/sync/get/list/search plus write-through mutation
//! hooks; [`sync::BackgroundSync`] drives periodic pulls against it. Reads
//! operate on an immutable snapshot and never suspend, so they are safe to
//! call from synchronous contexts.

pub mod cache;
pub mod sync;
pub mod tag_index;

pub use crate::cache::{NoteCache, SearchHit};
pub use crate::sync::BackgroundSync;
pub use crate::tag_index::{IndexStrategy, TagIndex, UNTAGGED};

pub use mcp_notesync_core::pagination_info;
