//! Boundary coercion of remote records into [`Note`].
//!
//! The remote service ships dynamically-shaped JSON: newer payloads carry
//! `id`/`created_at`/`modified_at`, older ones `key`/`createdate`/
//! `modifydate` with epoch-second timestamps and a `systemTags` array.
//! Everything is normalized here so the cache only ever sees well-formed
//! notes; a record without a usable id is an internal error.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::errors::CoreError;
use crate::model::Note;

pub fn note_from_value(value: &Value) -> Result<Note, CoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CoreError::Internal(format!("remote record is not an object: {value}")))?;

    let id = obj
        .get("id")
        .or_else(|| obj.get("key"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::Internal("remote record has no usable id".to_owned()))?
        .to_owned();

    let content = obj
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let tags: BTreeSet<String> = obj
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    let now = Utc::now();
    let created_at =
        timestamp(obj.get("created_at").or_else(|| obj.get("createdate"))).unwrap_or(now);
    let modified_at =
        timestamp(obj.get("modified_at").or_else(|| obj.get("modifydate"))).unwrap_or(created_at);

    let deleted = flag(obj.get("deleted"));
    let pinned = flag(obj.get("pinned")) || system_tag(obj.get("systemTags"), "pinned");

    let version = obj
        .get("version")
        .or_else(|| obj.get("syncnum"))
        .and_then(Value::as_u64)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or(1);

    Ok(Note {
        id,
        content,
        tags,
        created_at,
        modified_at,
        deleted,
        pinned,
        version,
    })
}

/// RFC 3339 strings, epoch-second numbers, and epoch-second strings are all
/// in circulation.
fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| s.trim().parse::<f64>().ok().and_then(from_epoch)),
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt((secs * 1000.0) as i64).single()
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
        _ => false,
    }
}

fn system_tag(value: Option<&Value>, wanted: &str) -> bool {
    value
        .and_then(Value::as_array)
        .is_some_and(|arr| arr.iter().filter_map(Value::as_str).any(|t| t == wanted))
}
