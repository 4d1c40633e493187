//! Derived mapping from tag value to the set of note ids carrying it.

use std::collections::{HashMap, HashSet};

use mcp_notesync_core::{Note, NoteId};

/// Virtual tag selecting notes with no tags at all. Computed on demand from
/// the table, never stored in the index.
pub const UNTAGGED: &str = "untagged";

/// Tables at or below this size are always rebuilt outright.
const SMALL_TABLE: usize = 64;

/// Per-sync choice between patching index entries and rebuilding the whole
/// index from the note table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexStrategy {
    Incremental,
    FullRebuild,
}

impl IndexStrategy {
    /// A full rebuild wins once a change set covers a quarter of the table,
    /// or whenever the table is small enough for the rebuild to be free.
    pub fn choose(change_count: usize, table_len: usize) -> Self {
        if table_len <= SMALL_TABLE || change_count * 4 >= table_len {
            IndexStrategy::FullRebuild
        } else {
            IndexStrategy::Incremental
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TagIndex {
    map: HashMap<String, HashSet<NoteId>>,
}

impl TagIndex {
    pub fn build<'a>(notes: impl Iterator<Item = &'a Note>) -> Self {
        let mut index = Self::default();
        for note in notes {
            index.insert(note);
        }
        index
    }

    pub fn insert(&mut self, note: &Note) {
        for tag in &note.tags {
            self.map
                .entry(tag.clone())
                .or_default()
                .insert(note.id.clone());
        }
    }

    pub fn remove(&mut self, note: &Note) {
        for tag in &note.tags {
            if let Some(ids) = self.map.get_mut(tag) {
                ids.remove(&note.id);
                if ids.is_empty() {
                    self.map.remove(tag);
                }
            }
        }
    }

    /// Swap one note's index entries for its replacement's.
    pub fn replace(&mut self, old: Option<&Note>, new: &Note) {
        if let Some(old) = old {
            self.remove(old);
        }
        self.insert(new);
    }

    pub fn ids_for(&self, tag: &str) -> Option<&HashSet<NoteId>> {
        self.map.get(tag)
    }

    /// All note ids minus the union of every indexed tag set.
    pub fn untagged_ids<'a>(&self, all_ids: impl Iterator<Item = &'a NoteId>) -> HashSet<NoteId> {
        all_ids
            .filter(|id| !self.map.values().any(|ids| ids.contains(*id)))
            .cloned()
            .collect()
    }

    /// Sorted list of every tag currently in the index.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.map.keys().cloned().collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
