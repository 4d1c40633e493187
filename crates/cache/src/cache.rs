//! The note cache: a versioned in-memory snapshot of the remote note table.
//!
//! State machine: Empty → Loading → Ready, then Ready → Syncing → Ready on
//! every pull. The snapshot (`notes` + tag index + cursor) lives behind a
//! `RwLock<Option<Arc<_>>>`; readers clone the `Arc` and work lock-free on an
//! immutable view, writers build a replacement and swap the pointer inside a
//! short synchronous critical section. Notes are stored as `Arc<Note>` so
//! copy-on-write stays pointer-shallow. Tokio gates serialize initialization
//! and sync so at most one remote fetch of each kind is ever in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use mcp_notesync_core::{
    note_from_value, Config, CoreError, ListOptions, Note, NoteId, NoteStore, Page, SearchOptions,
    SortBy, SortDirection, StoreError, SyncCursor,
};
use mcp_notesync_query::Query;

use crate::tag_index::{IndexStrategy, TagIndex, UNTAGGED};

/// One search match: the note plus its occurrence-count relevance score.
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub note: Arc<Note>,
    pub score: usize,
}

struct CacheState {
    notes: HashMap<NoteId, Arc<Note>>,
    tags: TagIndex,
    cursor: SyncCursor,
}

pub struct NoteCache<S> {
    store: Arc<S>,
    config: Config,
    state: RwLock<Option<Arc<CacheState>>>,
    init_gate: Mutex<()>,
    sync_gate: Mutex<()>,
}

impl<S: NoteStore> NoteCache<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            config,
            state: RwLock::new(None),
            init_gate: Mutex::new(()),
            sync_gate: Mutex::new(()),
        }
    }

    /// The remote client this cache pulls from. Write-through callers use it
    /// for create/update/trash and then report back via
    /// [`NoteCache::update_cache_after_create`] and friends.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn notes_count(&self) -> usize {
        self.state
            .read()
            .as_ref()
            .map_or(0, |state| state.notes.len())
    }

    /// Sorted list of every tag currently present in the index.
    pub fn get_all_tags(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.ready_state()?.tags.tags())
    }

    /// Load the full note table from the remote store. Idempotent: a Ready
    /// cache returns immediately, and a caller arriving while another load is
    /// in flight suspends on the gate and then observes the installed state,
    /// so exactly one remote listing fetch happens either way. On failure the
    /// cache stays Empty and the call can simply be retried.
    pub async fn initialize(&self) -> Result<usize, CoreError> {
        if let Some(state) = self.state.read().as_ref() {
            return Ok(state.notes.len());
        }
        let _gate = self.init_gate.lock().await;
        if let Some(state) = self.state.read().as_ref() {
            return Ok(state.notes.len());
        }

        let started = Instant::now();
        info!("initializing note cache");
        let listing = self.store.list_notes().await.map_err(network)?;

        let mut notes = HashMap::with_capacity(listing.notes.len());
        let mut skipped = 0usize;
        for record in &listing.notes {
            match note_from_value(record) {
                Ok(note) => {
                    notes.insert(note.id.clone(), Arc::new(note));
                }
                Err(err) => {
                    skipped += 1;
                    warn!(error = %err, "skipping malformed note record");
                }
            }
        }
        let tags = TagIndex::build(notes.values().map(Arc::as_ref));
        let count = notes.len();
        let tag_count = tags.len();
        *self.state.write() = Some(Arc::new(CacheState {
            notes,
            tags,
            cursor: listing.cursor,
        }));
        info!(
            count,
            tag_count,
            skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "note cache initialized"
        );
        Ok(count)
    }

    /// [`NoteCache::initialize`] bounded by the configured timeout. Elapsing
    /// reports a network error and leaves the cache Empty and retriable.
    pub async fn initialize_with_timeout(&self) -> Result<usize, CoreError> {
        let timeout = self.config.init_timeout;
        match tokio::time::timeout(timeout, self.initialize()).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Network(format!(
                "cache initialization timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }

    /// Pull changes since the cursor and fold them into a fresh snapshot.
    /// Returns the number of notes touched. The base snapshot is cloned
    /// *after* the network call returns, inside the same critical section as
    /// the swap, so write-through mutations applied during the await are
    /// never lost. A failure leaves the installed state untouched.
    pub async fn sync(&self) -> Result<usize, CoreError> {
        let _gate = self.sync_gate.lock().await;
        let cursor = self.ready_state()?.cursor.clone();

        debug!(cursor = %cursor, "syncing note cache");
        let started = Instant::now();
        let batch = self
            .store
            .list_changes(Some(&cursor), true)
            .await
            .map_err(network)?;

        let strategy = IndexStrategy::choose(batch.changes.len(), self.notes_count());

        let mut guard = self.state.write();
        let current = guard
            .as_ref()
            .ok_or_else(|| CoreError::Internal("cache not initialized".to_owned()))?;
        let mut notes = current.notes.clone();
        let mut tags = current.tags.clone();
        let mut touched = 0usize;

        // Received order matters: a tombstone followed by a re-creation of
        // the same id must land in that order.
        for record in &batch.changes {
            match note_from_value(record) {
                Ok(note) if note.deleted => {
                    if let Some(prev) = notes.remove(&note.id) {
                        if strategy == IndexStrategy::Incremental {
                            tags.remove(&prev);
                        }
                        touched += 1;
                    }
                }
                Ok(note) => {
                    let note = Arc::new(note);
                    let prev = notes.insert(note.id.clone(), Arc::clone(&note));
                    if strategy == IndexStrategy::Incremental {
                        tags.replace(prev.as_deref(), &note);
                    }
                    touched += 1;
                }
                Err(err) => {
                    warn!(error = %err, "skipping malformed change record");
                }
            }
        }

        if strategy == IndexStrategy::FullRebuild {
            tags = TagIndex::build(notes.values().map(Arc::as_ref));
        }

        *guard = Some(Arc::new(CacheState {
            notes,
            tags,
            cursor: batch.cursor,
        }));
        drop(guard);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if touched > 0 {
            info!(touched, elapsed_ms, "sync applied changes");
        } else {
            debug!(elapsed_ms, "sync found no changes");
        }
        Ok(touched)
    }

    /// Cache hit returns the snapshot's note; a miss fetches directly from
    /// the remote store and opportunistically inserts the result.
    pub async fn get_note(&self, id: &str) -> Result<Arc<Note>, CoreError> {
        if let Some(state) = self.state.read().as_ref() {
            if let Some(note) = state.notes.get(id) {
                return Ok(Arc::clone(note));
            }
        }

        debug!(id, "cache miss, fetching note from remote");
        let value = self.store.get_note(id).await.map_err(|err| match err {
            // A status failure on a direct fetch means the id is absent
            // everywhere, not that the service is down.
            StoreError::Status(_) => CoreError::NotFound(format!("note {id} not found")),
            StoreError::Transport(msg) => CoreError::Network(msg),
        })?;
        let note = Arc::new(note_from_value(&value)?);

        let mut guard = self.state.write();
        if let Some(current) = guard.as_ref() {
            let mut notes = current.notes.clone();
            let mut tags = current.tags.clone();
            let prev = notes.insert(note.id.clone(), Arc::clone(&note));
            tags.replace(prev.as_deref(), &note);
            *guard = Some(Arc::new(CacheState {
                notes,
                tags,
                cursor: current.cursor.clone(),
            }));
        }
        Ok(note)
    }

    /// Filter → sort → paginate over the current snapshot. Deleted notes are
    /// never listed; the virtual `"untagged"` tag selects notes with an empty
    /// tag set. Purely in-memory, never suspends.
    pub fn get_all_notes(&self, options: &ListOptions) -> Result<Page<Arc<Note>>, CoreError> {
        let state = self.ready_state()?;
        let limit = options.limit.unwrap_or(self.config.default_page_size);

        let mut notes: Vec<Arc<Note>> = match options.tag_filter.as_deref() {
            None => state.notes.values().cloned().collect(),
            Some(UNTAGGED) => {
                let ids = state.tags.untagged_ids(state.notes.keys());
                ids.iter()
                    .filter_map(|id| state.notes.get(id))
                    .cloned()
                    .collect()
            }
            Some(tag) => state
                .tags
                .ids_for(tag)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| state.notes.get(id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
        };
        notes.retain(|note| !note.deleted);

        sort_notes(
            &mut notes,
            options.sort_by,
            options.sort_direction,
            options.pinned_first,
        );
        Ok(Page::slice(notes, limit, options.offset)?)
    }

    /// Boolean search over the current snapshot: parse once, evaluate per
    /// note, apply tag/date filters conjunctively, rank by score descending,
    /// paginate. An empty query matches nothing; listing is the way to ask
    /// for "everything with tag X".
    pub fn search_notes(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Page<SearchHit>, CoreError> {
        let state = self.ready_state()?;
        let limit = options.limit.unwrap_or(self.config.default_page_size);

        let parsed = Query::parse(query);
        if parsed.is_empty() {
            debug!("empty search query matches nothing");
            return Ok(Page::slice(Vec::new(), limit, options.offset)?);
        }

        let mut hits: Vec<SearchHit> = Vec::new();
        for note in state.notes.values() {
            if note.deleted {
                continue;
            }
            let tags_ok = options.tag_filters.iter().all(|tag| {
                if tag == UNTAGGED {
                    note.tags.is_empty()
                } else {
                    note.tags.contains(tag)
                }
            });
            if !tags_ok {
                continue;
            }
            if let Some(range) = &options.date_range {
                if !range.contains(note.modified_at) {
                    continue;
                }
            }
            if let Some(score) = parsed.evaluate(&note.content) {
                hits.push(SearchHit {
                    note: Arc::clone(note),
                    score,
                });
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.note.modified_at.cmp(&a.note.modified_at))
                .then_with(|| a.note.id.cmp(&b.note.id))
        });
        debug!(query, matches = hits.len(), "search evaluated");
        Ok(Page::slice(hits, limit, options.offset)?)
    }

    /// Fold an already-written-through creation into the snapshot without
    /// waiting for the next sync. Synchronous; never suspends.
    pub fn update_cache_after_create(&self, note: Note) -> Result<(), CoreError> {
        debug!(id = %note.id, "applying write-through create");
        self.apply_local(move |notes, tags| {
            let note = Arc::new(note);
            let prev = notes.insert(note.id.clone(), Arc::clone(&note));
            tags.replace(prev.as_deref(), &note);
        })
    }

    /// Fold an already-written-through update into the snapshot.
    pub fn update_cache_after_update(&self, note: Note) -> Result<(), CoreError> {
        debug!(id = %note.id, "applying write-through update");
        self.apply_local(move |notes, tags| {
            let note = Arc::new(note);
            let prev = notes.insert(note.id.clone(), Arc::clone(&note));
            tags.replace(prev.as_deref(), &note);
        })
    }

    /// Drop a note the caller already trashed remotely.
    pub fn update_cache_after_delete(&self, id: &str) -> Result<(), CoreError> {
        debug!(id, "applying write-through delete");
        self.apply_local(move |notes, tags| {
            if let Some(prev) = notes.remove(id) {
                tags.remove(&prev);
            }
        })
    }

    fn apply_local<F>(&self, mutate: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut HashMap<NoteId, Arc<Note>>, &mut TagIndex),
    {
        let mut guard = self.state.write();
        let current = guard
            .as_ref()
            .ok_or_else(|| CoreError::Internal("cache not initialized".to_owned()))?;
        let mut notes = current.notes.clone();
        let mut tags = current.tags.clone();
        mutate(&mut notes, &mut tags);
        *guard = Some(Arc::new(CacheState {
            notes,
            tags,
            cursor: current.cursor.clone(),
        }));
        Ok(())
    }

    fn ready_state(&self) -> Result<Arc<CacheState>, CoreError> {
        self.state
            .read()
            .clone()
            .ok_or_else(|| CoreError::Internal("cache not initialized".to_owned()))
    }
}

fn network(err: StoreError) -> CoreError {
    CoreError::Network(err.to_string())
}

fn sort_notes(
    notes: &mut [Arc<Note>],
    sort_by: SortBy,
    direction: Option<SortDirection>,
    pinned_first: bool,
) {
    let direction = direction.unwrap_or_else(|| sort_by.natural_direction());
    notes.sort_by(|a, b| {
        let keyed = match sort_by {
            SortBy::Modified => a.modified_at.cmp(&b.modified_at),
            SortBy::Created => a.created_at.cmp(&b.created_at),
            SortBy::Title => a
                .title()
                .to_lowercase()
                .cmp(&b.title().to_lowercase()),
            SortBy::ContentLength => a.content.len().cmp(&b.content.len()),
        };
        let keyed = match direction {
            SortDirection::Asc => keyed,
            SortDirection::Desc => keyed.reverse(),
        };
        let keyed = keyed.then_with(|| a.id.cmp(&b.id));
        if pinned_first {
            b.pinned.cmp(&a.pinned).then(keyed)
        } else {
            keyed
        }
    });
}
