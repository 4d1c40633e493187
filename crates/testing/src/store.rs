//! A scriptable in-memory stand-in for the remote note service.
//!
//! Keeps a remote-side note table, a queue of pending change records, and
//! per-operation call counters. Failures are injected as the status codes
//! the real service returns, or as transport errors. Every operation yields
//! to the scheduler once before touching state, so cooperative interleavings
//! behave like real network calls.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

use mcp_notesync_core::{ChangeBatch, Note, NoteListing, NoteStore, StoreError, SyncCursor};

/// Fixed base instant for deterministic record timestamps.
pub const BASE_EPOCH: i64 = 1_700_000_000;

#[derive(Clone, Copy, Debug)]
enum Failure {
    Status(i64),
    Transport,
}

#[derive(Default)]
struct FakeState {
    notes: HashMap<String, Value>,
    malformed: Vec<Value>,
    pending: VecDeque<Value>,
    cursor_seq: u64,
    failure: Option<Failure>,
    hang_listing: bool,
    list_notes_calls: u64,
    list_changes_calls: u64,
    get_note_calls: u64,
}

#[derive(Default)]
pub struct FakeNoteStore {
    state: Mutex<FakeState>,
}

impl FakeNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a record into the remote table without emitting a change.
    pub fn seed_note(&self, record: Value) {
        let id = record_id(&record).expect("seeded record needs an id");
        self.state.lock().notes.insert(id, record);
    }

    /// Put a record into the listing that is not keyable by id, to exercise
    /// the skip-and-warn path.
    pub fn seed_malformed(&self, record: Value) {
        self.state.lock().malformed.push(record);
    }

    /// Queue a record for the next `list_changes` batch.
    pub fn queue_change(&self, record: Value) {
        self.state.lock().pending.push_back(record);
    }

    /// Make every subsequent call fail with the given non-zero status.
    pub fn fail_with_status(&self, status: i64) {
        self.state.lock().failure = Some(Failure::Status(status));
    }

    /// Make every subsequent call fail as an unreachable remote.
    pub fn fail_with_transport(&self) {
        self.state.lock().failure = Some(Failure::Transport);
    }

    pub fn clear_failure(&self) {
        self.state.lock().failure = None;
    }

    /// Make `list_notes` block forever (until cleared) to exercise timeouts.
    pub fn hang_listing(&self, hang: bool) {
        self.state.lock().hang_listing = hang;
    }

    pub fn list_notes_calls(&self) -> u64 {
        self.state.lock().list_notes_calls
    }

    pub fn list_changes_calls(&self) -> u64 {
        self.state.lock().list_changes_calls
    }

    pub fn get_note_calls(&self) -> u64 {
        self.state.lock().get_note_calls
    }

    fn check_failure(state: &FakeState) -> Result<(), StoreError> {
        match state.failure {
            Some(Failure::Status(code)) => Err(StoreError::Status(code)),
            Some(Failure::Transport) => {
                Err(StoreError::Transport("remote unreachable".to_owned()))
            }
            None => Ok(()),
        }
    }

    fn next_cursor(state: &mut FakeState) -> SyncCursor {
        state.cursor_seq += 1;
        SyncCursor::new(format!("cursor-{}", state.cursor_seq))
    }
}

#[async_trait]
impl NoteStore for FakeNoteStore {
    async fn list_notes(&self) -> Result<NoteListing, StoreError> {
        tokio::task::yield_now().await;
        let hang = {
            let mut state = self.state.lock();
            state.list_notes_calls += 1;
            state.hang_listing
        };
        if hang {
            return std::future::pending().await;
        }
        let mut state = self.state.lock();
        Self::check_failure(&state)?;
        let mut notes: Vec<Value> = state.notes.values().cloned().collect();
        notes.extend(state.malformed.iter().cloned());
        let cursor = Self::next_cursor(&mut state);
        Ok(NoteListing { notes, cursor })
    }

    async fn list_changes(
        &self,
        _cursor: Option<&SyncCursor>,
        _include_tags: bool,
    ) -> Result<ChangeBatch, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.list_changes_calls += 1;
        Self::check_failure(&state)?;
        let changes: Vec<Value> = state.pending.drain(..).collect();
        let cursor = Self::next_cursor(&mut state);
        Ok(ChangeBatch { cursor, changes })
    }

    async fn get_note(&self, id: &str) -> Result<Value, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        state.get_note_calls += 1;
        Self::check_failure(&state)?;
        state
            .notes
            .get(id)
            .cloned()
            .ok_or(StoreError::Status(404))
    }

    async fn create_note(&self, note: &Note) -> Result<Value, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        Self::check_failure(&state)?;
        let id = format!("note_{}", Uuid::new_v4());
        let record = record_from_note(note, &id, 1);
        state.notes.insert(id, record.clone());
        Ok(record)
    }

    async fn update_note(&self, note: &Note) -> Result<Value, StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        Self::check_failure(&state)?;
        if !state.notes.contains_key(&note.id) {
            return Err(StoreError::Status(404));
        }
        let record = record_from_note(note, &note.id, note.version + 1);
        state.notes.insert(note.id.clone(), record.clone());
        Ok(record)
    }

    async fn trash_note(&self, id: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        Self::check_failure(&state)?;
        match state.notes.get_mut(id) {
            Some(record) => record["deleted"] = json!(true),
            None => return Err(StoreError::Status(404)),
        }
        state.pending.push_back(tombstone(id));
        Ok(())
    }
}

fn record_id(record: &Value) -> Option<String> {
    record
        .get("id")
        .or_else(|| record.get("key"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn record_from_note(note: &Note, id: &str, version: u32) -> Value {
    json!({
        "id": id,
        "content": &note.content,
        "tags": &note.tags,
        "created_at": note.created_at.to_rfc3339(),
        "modified_at": note.modified_at.to_rfc3339(),
        "deleted": note.deleted,
        "pinned": note.pinned,
        "version": version,
    })
}

/// Remote record in the service's current shape, timestamped at the base
/// instant.
pub fn note_record(id: &str, content: &str, tags: &[&str]) -> Value {
    note_record_at(id, content, tags, 0)
}

/// Same, with the modification time offset (in seconds) from the base
/// instant so ordering tests can spread notes out.
pub fn note_record_at(id: &str, content: &str, tags: &[&str], offset_secs: i64) -> Value {
    let created = Utc.timestamp_opt(BASE_EPOCH, 0).unwrap();
    let modified = Utc.timestamp_opt(BASE_EPOCH + offset_secs, 0).unwrap();
    json!({
        "id": id,
        "content": content,
        "tags": tags,
        "created_at": created.to_rfc3339(),
        "modified_at": modified.to_rfc3339(),
        "deleted": false,
        "pinned": false,
        "version": 1,
    })
}

pub fn pinned_record(id: &str, content: &str, tags: &[&str], offset_secs: i64) -> Value {
    let mut record = note_record_at(id, content, tags, offset_secs);
    record["pinned"] = json!(true);
    record
}

pub fn tombstone(id: &str) -> Value {
    json!({ "id": id, "deleted": true })
}

/// A well-formed `Note` for driving the write-through paths.
pub fn sample_note(id: &str, content: &str, tags: &[&str]) -> Note {
    let at = Utc.timestamp_opt(BASE_EPOCH, 0).unwrap();
    Note {
        id: id.to_owned(),
        content: content.to_owned(),
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        created_at: at,
        modified_at: at,
        deleted: false,
        pinned: false,
        version: 1,
    }
}
