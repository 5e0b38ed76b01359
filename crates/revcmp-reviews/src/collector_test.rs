use std::collections::HashSet;

use revcmp_core::{PacingPolicy, RetryPolicy};
use revcmp_search::SearchError;

use super::*;
use crate::test_support::{item, items, RecordingNotifier, ScriptedSearch};

const AMAZON: &str = "headphones BrandX reviews site:amazon.in";
const FLIPKART: &str = "headphones BrandX reviews site:flipkart.com";
const GENERIC: &str = "headphones BrandX reviews";

fn collector<'a>(
    search: &'a ScriptedSearch,
    cancel: &'a CancelFlag,
    notifier: &'a RecordingNotifier,
) -> SnippetCollector<'a> {
    SnippetCollector::new(search, cancel, notifier)
        .with_retry(RetryPolicy::new(3, 0.0, 0.0))
        .with_pacing(PacingPolicy::none())
}

#[test]
fn queries_follow_template_order() {
    assert_eq!(
        build_queries("headphones", "BrandX"),
        vec![AMAZON.to_string(), FLIPKART.to_string(), GENERIC.to_string()]
    );
}

#[tokio::test]
async fn quota_met_from_first_two_queries() {
    let search = ScriptedSearch::default()
        .respond(AMAZON, Ok(items("amz", &["a1", "a2", "a3"])))
        .respond(FLIPKART, Ok(items("fk", &["a2", "f1", "a3", "f2"])));
    let cancel = CancelFlag::new();
    let notifier = RecordingNotifier::default();

    let records = collector(&search, &cancel, &notifier)
        .collect("headphones", "BrandX", 5)
        .await;

    let links: Vec<&str> = records.iter().map(|r| r.link.as_str()).collect();
    assert_eq!(links, vec!["a1", "a2", "a3", "f1", "f2"]);
    assert_eq!(search.issued(), vec![AMAZON.to_string(), FLIPKART.to_string()]);
    assert!(records.iter().all(|r| r.brand == "BrandX"
        && r.product == "headphones"
        && r.source == "snippet"));
}

#[tokio::test]
async fn no_two_records_share_a_link() {
    let search = ScriptedSearch::default()
        .respond(AMAZON, Ok(items("amz", &["x", "y", "x"])))
        .respond(FLIPKART, Ok(items("fk", &["y", "z"])))
        .respond(GENERIC, Ok(items("web", &["z", "x", "w"])));
    let cancel = CancelFlag::new();
    let notifier = RecordingNotifier::default();

    let records = collector(&search, &cancel, &notifier)
        .collect("headphones", "BrandX", 50)
        .await;

    let unique: HashSet<&str> = records.iter().map(|r| r.link.as_str()).collect();
    assert_eq!(unique.len(), records.len());
    assert_eq!(records.len(), 4);
    assert_eq!(search.issued().len(), 3);
}

#[tokio::test]
async fn results_without_links_are_skipped() {
    let mut hits = items("amz", &["a1"]);
    hits.push(revcmp_core::SearchResult {
        title: Some("no link".to_string()),
        snippet: "orphan".to_string(),
        link: None,
    });
    hits.push(item("blank", "blank link", "   "));
    let search = ScriptedSearch::default().respond(AMAZON, Ok(hits));
    let cancel = CancelFlag::new();
    let notifier = RecordingNotifier::default();

    let records = collector(&search, &cancel, &notifier)
        .collect("headphones", "BrandX", 10)
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].link, "a1");
}

#[tokio::test]
async fn quota_caps_results_within_one_query() {
    let search = ScriptedSearch::default()
        .respond(AMAZON, Ok(items("amz", &["1", "2", "3", "4", "5", "6"])));
    let cancel = CancelFlag::new();
    let notifier = RecordingNotifier::default();

    let records = collector(&search, &cancel, &notifier)
        .collect("headphones", "BrandX", 4)
        .await;

    assert_eq!(records.len(), 4);
    assert_eq!(search.issued(), vec![AMAZON.to_string()]);
}

#[tokio::test]
async fn zero_quota_issues_no_query() {
    let search = ScriptedSearch::default();
    let cancel = CancelFlag::new();
    let notifier = RecordingNotifier::default();

    let records = collector(&search, &cancel, &notifier)
        .collect("headphones", "BrandX", 0)
        .await;

    assert!(records.is_empty());
    assert!(search.issued().is_empty());
}

#[tokio::test]
async fn fatal_query_is_skipped_and_collection_continues() {
    let search = ScriptedSearch::default()
        .respond(
            AMAZON,
            Err(SearchError::Status {
                status: 401,
                body: "Invalid API key".to_string(),
            }),
        )
        .respond(FLIPKART, Ok(items("fk", &["f1", "f2"])));
    let cancel = CancelFlag::new();
    let notifier = RecordingNotifier::default();

    let records = collector(&search, &cancel, &notifier)
        .collect("headphones", "BrandX", 10)
        .await;

    assert_eq!(records.len(), 2);
    assert_eq!(search.issued().len(), 3);
    assert_eq!(
        notifier
            .messages(revcmp_core::NoticeLevel::Error)
            .len(),
        1
    );
}

#[tokio::test]
async fn exhausted_query_moves_to_next_template() {
    let search = ScriptedSearch::default()
        .respond(AMAZON, Err(SearchError::RateLimited))
        .respond(AMAZON, Err(SearchError::RateLimited))
        .respond(AMAZON, Err(SearchError::RateLimited))
        .respond(FLIPKART, Ok(items("fk", &["f1"])));
    let cancel = CancelFlag::new();
    let notifier = RecordingNotifier::default();

    let records = collector(&search, &cancel, &notifier)
        .collect("headphones", "BrandX", 1)
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(
        search.issued(),
        vec![
            AMAZON.to_string(),
            AMAZON.to_string(),
            AMAZON.to_string(),
            FLIPKART.to_string()
        ]
    );
}

#[tokio::test]
async fn cancelled_flag_stops_before_next_query() {
    let search = ScriptedSearch::default()
        .respond(AMAZON, Ok(items("amz", &["a1"])));
    let cancel = CancelFlag::new();
    cancel.cancel();
    let notifier = RecordingNotifier::default();

    let records = collector(&search, &cancel, &notifier)
        .collect("headphones", "BrandX", 10)
        .await;

    assert!(records.is_empty());
    assert!(search.issued().is_empty());
}

#[tokio::test]
async fn pacing_pauses_between_queries_only() {
    let pause = std::time::Duration::from_millis(50);
    let search = ScriptedSearch::default();
    let cancel = CancelFlag::new();
    let notifier = RecordingNotifier::default();

    let started = std::time::Instant::now();
    let records = collector(&search, &cancel, &notifier)
        .with_pacing(PacingPolicy::new(50, 50))
        .collect("headphones", "BrandX", 10)
        .await;
    let elapsed = started.elapsed();

    assert!(records.is_empty());
    assert_eq!(search.issued().len(), 3);
    // Two gaps for three queries; a pause after the last would make it three.
    assert!(elapsed >= pause * 2, "elapsed {elapsed:?}");
    assert!(elapsed < pause * 3, "elapsed {elapsed:?}");
}

#[tokio::test]
async fn quota_met_by_first_query_never_pauses() {
    let search = ScriptedSearch::default().respond(AMAZON, Ok(items("amz", &["a1", "a2"])));
    let cancel = CancelFlag::new();
    let notifier = RecordingNotifier::default();

    let started = std::time::Instant::now();
    let records = collector(&search, &cancel, &notifier)
        .with_pacing(PacingPolicy::new(200, 200))
        .collect("headphones", "BrandX", 2)
        .await;

    assert_eq!(records.len(), 2);
    assert_eq!(search.issued(), vec![AMAZON.to_string()]);
    assert!(started.elapsed() < std::time::Duration::from_millis(200));
}
