//! Core domain model, remote-store boundary, and pagination math.
//! No locking and no IO within this crate.

pub mod coerce;
pub mod config;
pub mod errors;
pub mod model;
pub mod page;
pub mod traits;

pub use crate::coerce::note_from_value;
pub use crate::config::Config;
pub use crate::errors::{CoreError, ValidationError};
pub use crate::model::{Note, NoteId, SyncCursor};
pub use crate::page::{pagination_info, Page, PageInfo};
pub use crate::traits::{
    ChangeBatch, DateRange, ListOptions, NoteListing, NoteStore, SearchOptions, SortBy,
    SortDirection, StoreError,
};
