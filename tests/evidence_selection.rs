//! Integration tests for the evidence selection cascade and time ordering.

mod common;

use mnemos::services::{
    build_id_index, build_timeline_text, render_raw_source, select_relevant, sort_by_time,
    SelectionOptions, SelectionStrategy, TimelineOptions,
};
use pretty_assertions::assert_eq;

use common::builders::{diary, EvidenceBuilder};

fn ids(records: &[mnemos::models::EvidenceRecord]) -> Vec<i64> {
    records.iter().map(|r| r.id).collect()
}

// ============================================================================
// CASCADE
// ============================================================================

#[test]
fn test_explicit_ids_win_over_dates_and_keywords() {
    let records = diary();
    let index = build_id_index(&records);

    // The query has both a date and matching keywords; ids must still win.
    let selection = select_relevant(
        "What did the family say about the harvest on August 15, 1969?",
        &records,
        &[6, 1],
        &index,
        &SelectionOptions::default(),
    );

    assert_eq!(selection.strategy, SelectionStrategy::ExplicitIds);
    assert_eq!(ids(&selection.records), vec![6, 1]);
}

#[test]
fn test_unresolvable_ids_fall_through_to_dates() {
    let records = diary();
    let index = build_id_index(&records);

    let selection = select_relevant(
        "What happened on August 15, 1969?",
        &records,
        &[99],
        &index,
        &SelectionOptions::default(),
    );

    assert_eq!(selection.strategy, SelectionStrategy::DateWindow);
    assert_eq!(ids(&selection.records), vec![2, 3]);
}

#[test]
fn test_day_margin_is_configurable() {
    let records = diary();
    let index = build_id_index(&records);
    let options = SelectionOptions {
        margin_days: 0,
        ..SelectionOptions::default()
    };

    let selection = select_relevant("August 17, 1969", &records, &[], &index, &options);
    assert_eq!(ids(&selection.records), vec![3]);
}

#[test]
fn test_month_token_selects_whole_month() {
    let records = diary();
    let index = build_id_index(&records);

    let selection = select_relevant(
        "How did the first weeks of January 1976 feel?",
        &records,
        &[],
        &index,
        &SelectionOptions::default(),
    );
    assert_eq!(selection.strategy, SelectionStrategy::DateWindow);
    assert_eq!(ids(&selection.records), vec![4]);
}

#[test]
fn test_month_span_covers_every_month() {
    let records = diary();
    let index = build_id_index(&records);

    let selection = select_relevant(
        "What changed from November 1975 to January 1976?",
        &records,
        &[],
        &index,
        &SelectionOptions::default(),
    );
    assert_eq!(ids(&selection.records), vec![1, 4]);
}

#[test]
fn test_keywords_need_two_distinct_hits() {
    let records = diary();
    let index = build_id_index(&records);

    let selection = select_relevant(
        "Tell me about the harvest on the farm",
        &records,
        &[],
        &index,
        &SelectionOptions::default(),
    );
    assert_eq!(selection.strategy, SelectionStrategy::Keywords);
    assert_eq!(ids(&selection.records), vec![5]);
}

#[test]
fn test_dates_without_matches_fall_through_to_keywords() {
    let records = diary();
    let index = build_id_index(&records);

    let selection = select_relevant(
        "Was the harvest on the farm late in 1950?",
        &records,
        &[],
        &index,
        &SelectionOptions::default(),
    );
    assert_eq!(selection.strategy, SelectionStrategy::Keywords);
    assert_eq!(ids(&selection.records), vec![3, 5]);
}

#[test]
fn test_fallback_is_bounded_prefix() {
    let records = diary();
    let index = build_id_index(&records);
    let options = SelectionOptions {
        fallback_max: 4,
        ..SelectionOptions::default()
    };

    let selection = select_relevant("the 1960s", &records, &[], &index, &options);
    assert_eq!(selection.strategy, SelectionStrategy::Fallback);
    assert_eq!(ids(&selection.records), vec![1, 2, 3, 4]);
}

// ============================================================================
// TIME ORDERING AND RENDERING
// ============================================================================

#[test]
fn test_sort_by_time_appends_undated_records() {
    let sorted = sort_by_time(&diary());
    assert_eq!(ids(&sorted), vec![2, 3, 6, 1, 4, 5]);
}

#[test]
fn test_timeline_text_is_chronological() {
    let text = build_timeline_text(
        &diary(),
        TimelineOptions {
            max_records: 2,
            ..TimelineOptions::default()
        },
    );

    insta::assert_snapshot!(text, @r"
    [Event 1] [1969-08-15 14:00:30]
      action: The family walked along the gravel road to the farm

    [Event 2] [1969-08-17]
      dialogue: Father said the harvest would be late this year
    ");
}

#[test]
fn test_raw_source_keeps_full_text() {
    let long = "word ".repeat(400);
    let records = vec![
        EvidenceBuilder::new(1, "1970-01-01").action(long.trim()).build(),
        EvidenceBuilder::new(2, "").build(),
    ];

    let text = render_raw_source(&records, 10, None);
    assert!(text.contains(long.trim()));
    assert!(!text.contains("---"));
}
