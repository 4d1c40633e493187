//! Test support for the note sync workspace: a scriptable fake of the
//! remote note store plus the cross-crate integration suites.

pub mod store;

pub use crate::store::{
    note_record, note_record_at, pinned_record, sample_note, tombstone, FakeNoteStore, BASE_EPOCH,
};

#[cfg(test)]
pub(crate) fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
}


#[cfg(test)]
mod search_tests;
