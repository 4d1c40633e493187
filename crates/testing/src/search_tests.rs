//! Boolean search end-to-end: matching, filtering, ranking, pagination.

use chrono::{TimeZone, Utc};
use mcp_notesync_core::{CoreError, DateRange, SearchOptions};

use crate::support::ready_cache;
use crate::{note_record, note_record_at, runtime, tombstone, BASE_EPOCH};

fn hit_ids(page: &mcp_notesync_core::Page<mcp_notesync_cache::SearchHit>) -> Vec<String> {
    page.items.iter().map(|hit| hit.note.id.clone()).collect()
}

#[test]
fn phrase_matching_is_contiguous_after_case_folding() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record("match", "Hello World, greetings", &[]),
            note_record("spaced", "Hello  World, greetings", &[]),
        ])
        .await;

        let page = cache
            .search_notes("\"hello world\"", &SearchOptions::default())
            .unwrap();
        assert_eq!(hit_ids(&page), ["match"]);
    });
}

#[test]
fn boolean_and_requires_both_substrings() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record("both", "project kickoff meeting notes", &[]),
            note_record("project-only", "project roadmap", &[]),
            note_record("meeting-only", "meeting minutes", &[]),
        ])
        .await;

        let page = cache
            .search_notes("project AND meeting", &SearchOptions::default())
            .unwrap();
        assert_eq!(hit_ids(&page), ["both"]);
    });
}

#[test]
fn boolean_not_excludes() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record("wanted", "project roadmap", &[]),
            note_record("excluded", "project meeting notes", &[]),
        ])
        .await;

        let page = cache
            .search_notes("project NOT meeting", &SearchOptions::default())
            .unwrap();
        assert_eq!(hit_ids(&page), ["wanted"]);
    });
}

#[test]
fn empty_query_matches_nothing() {
    runtime().block_on(async {
        let cache = ready_cache(vec![note_record("a", "anything", &["work"])]).await;

        let page = cache.search_notes("", &SearchOptions::default()).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.info.total, 0);

        let page = cache.search_notes("   ", &SearchOptions::default()).unwrap();
        assert!(page.items.is_empty());
    });
}

#[test]
fn results_rank_by_occurrence_count() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record_at("once", "ant", &[], 100),
            note_record_at("thrice", "ant ant ant", &[], 10),
            note_record_at("twice", "ant and another ant", &[], 50),
        ])
        .await;

        let page = cache.search_notes("ant", &SearchOptions::default()).unwrap();
        assert_eq!(hit_ids(&page), ["thrice", "twice", "once"]);
        assert_eq!(page.items[0].score, 3);
        assert_eq!(page.items[2].score, 1);
    });
}

#[test]
fn equal_scores_tie_break_on_recency() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record_at("older", "ant", &[], 10),
            note_record_at("newer", "ant", &[], 99),
        ])
        .await;

        let page = cache.search_notes("ant", &SearchOptions::default()).unwrap();
        assert_eq!(hit_ids(&page), ["newer", "older"]);
    });
}

#[test]
fn tag_filters_are_conjunctive() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record("both", "ant colony", &["work", "urgent"]),
            note_record("one", "ant trail", &["work"]),
            note_record("untagged", "ant hill", &[]),
        ])
        .await;

        let options = SearchOptions {
            tag_filters: vec!["work".to_owned(), "urgent".to_owned()],
            ..SearchOptions::default()
        };
        let page = cache.search_notes("ant", &options).unwrap();
        assert_eq!(hit_ids(&page), ["both"]);

        let options = SearchOptions {
            tag_filters: vec!["untagged".to_owned()],
            ..SearchOptions::default()
        };
        let page = cache.search_notes("ant", &options).unwrap();
        assert_eq!(hit_ids(&page), ["untagged"]);
    });
}

#[test]
fn date_range_brackets_modification_time() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record_at("early", "ant", &[], 0),
            note_record_at("inside", "ant", &[], 500),
            note_record_at("late", "ant", &[], 1000),
        ])
        .await;

        let options = SearchOptions {
            date_range: Some(DateRange {
                from: Some(Utc.timestamp_opt(BASE_EPOCH + 100, 0).unwrap()),
                to: Some(Utc.timestamp_opt(BASE_EPOCH + 900, 0).unwrap()),
            }),
            ..SearchOptions::default()
        };
        let page = cache.search_notes("ant", &options).unwrap();
        assert_eq!(hit_ids(&page), ["inside"]);
    });
}

#[test]
fn deleted_notes_never_match() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record("keep", "ant trail", &[]),
            note_record("trash-me", "ant nest", &[]),
        ])
        .await;

        cache.store().queue_change(tombstone("trash-me"));
        cache.sync().await.unwrap();

        let page = cache.search_notes("ant", &SearchOptions::default()).unwrap();
        assert_eq!(hit_ids(&page), ["keep"]);

        // Write-through delete is just as invisible, without waiting on sync.
        cache.update_cache_after_delete("keep").unwrap();
        let page = cache.search_notes("ant", &SearchOptions::default()).unwrap();
        assert!(page.items.is_empty());
    });
}

#[test]
fn search_pagination_windows_do_not_overlap() {
    runtime().block_on(async {
        let records = (0..12i64)
            .map(|i| note_record_at(&format!("n{i:02}"), "ant farm", &[], i))
            .collect();
        let cache = ready_cache(records).await;

        let first = cache
            .search_notes(
                "ant",
                &SearchOptions {
                    limit: Some(5),
                    offset: 0,
                    ..SearchOptions::default()
                },
            )
            .unwrap();
        let second = cache
            .search_notes(
                "ant",
                &SearchOptions {
                    limit: Some(5),
                    offset: 5,
                    ..SearchOptions::default()
                },
            )
            .unwrap();

        assert_eq!(first.items.len(), 5);
        assert_eq!(second.items.len(), 5);
        assert_eq!(first.info.total, 12);
        assert_eq!(first.info.total_pages, 3);
        assert!(first.info.has_more);
        assert_eq!(first.info.next_offset, Some(5));

        let first_ids = hit_ids(&first);
        assert!(hit_ids(&second).iter().all(|id| !first_ids.contains(id)));
    });
}

#[test]
fn search_before_initialize_is_an_error() {
    runtime().block_on(async {
        let cache = crate::support::empty_cache();
        assert!(matches!(
            cache
                .search_notes("ant", &SearchOptions::default())
                .unwrap_err(),
            CoreError::Internal(_)
        ));
    });
}

#[test]
fn malformed_boolean_syntax_degrades_to_terms() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record("both", "project meeting", &[]),
            note_record("one", "project only", &[]),
        ])
        .await;

        // Dangling operators are dropped; remaining terms AND together.
        let page = cache
            .search_notes("AND project AND AND meeting OR", &SearchOptions::default())
            .unwrap();
        assert_eq!(hit_ids(&page), ["both"]);
    });
}

#[test]
fn unbalanced_quote_matches_literal_quote() {
    runtime().block_on(async {
        let cache = ready_cache(vec![
            note_record("quoted", "she said \"cheese and smiled", &[]),
            note_record("plain", "cheese platter", &[]),
        ])
        .await;

        let page = cache
            .search_notes("\"cheese", &SearchOptions::default())
            .unwrap();
        assert_eq!(hit_ids(&page), ["quoted"]);
    });
}
