use std::sync::Arc;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::api::BackendHttp;
use crate::cache::QueryCache;
use crate::session::{SessionStore, SessionToken};

// ── page arithmetic ─────────────────────────────────────────────────────────

#[test]
fn page_count_rounds_up() {
    assert_eq!(page_count(0, 10), 1);
    assert_eq!(page_count(10, 10), 1);
    assert_eq!(page_count(11, 10), 2);
    assert_eq!(page_count(50, 5), 10);
}

#[test]
fn releasing_last_item_steps_back() {
    assert_eq!(page_after_release(3, 1, None, 10), 2);
    assert_eq!(page_after_release(3, 4, None, 10), 3);
    // Page 1 never goes lower
    assert_eq!(page_after_release(1, 1, None, 10), 1);
}

#[test]
fn reported_total_clamps_page() {
    // 20 left at 5 per page: page 6 no longer exists
    assert_eq!(page_after_release(6, 3, Some(20), 5), 4);
    assert_eq!(page_after_release(2, 1, Some(0), 10), 1);
    assert_eq!(page_after_release(2, 5, Some(15), 10), 2);
}

// ── browser state ───────────────────────────────────────────────────────────

#[test]
fn filter_and_sort_changes_reset_page() {
    let mut browser = CollectionBrowser::new();
    browser.set_page(4).unwrap();
    browser.set_search("char");
    assert_eq!(browser.page(), 1);
    assert_eq!(browser.query().search.as_deref(), Some("char"));

    browser.set_page(3).unwrap();
    browser.set_sort(SortBy::Name, SortDir::Asc);
    assert_eq!(browser.page(), 1);

    browser.set_page(2).unwrap();
    browser.set_page_size(20).unwrap();
    assert_eq!(browser.page(), 1);
    assert_eq!(browser.query().page_size, 20);

    browser.set_search("   ");
    assert_eq!(browser.query().search, None);
}

#[test]
fn invalid_values_are_rejected() {
    let mut browser = CollectionBrowser::new();
    browser.set_page(2).unwrap();
    assert!(browser.set_page(0).is_err());
    assert!(browser.set_page_size(25).is_err());
    // Unchanged after a rejected update
    assert_eq!(browser.page(), 2);
    assert_eq!(browser.query().page_size, 10);
}

// ── release from the last page ──────────────────────────────────────────────

#[tokio::test]
async fn releasing_sole_item_requests_previous_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{ "id": 150, "name": "mewtwo", "caughtAt": "2024-01-01T00:00:00Z" }],
            "total": 11
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [],
            "total": 10
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/pokemon/150"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "released": true, "id": 150 })),
        )
        .mount(&mock_server)
        .await;

    let session = Arc::new(SessionStore::in_memory());
    session.set(SessionToken::new("t")).unwrap();
    let client = CollectionClient::new(
        BackendHttp::new(reqwest::Client::new(), mock_server.uri(), session),
        QueryCache::default(),
    );

    let mut browser = CollectionBrowser::new();
    browser.set_page(2).unwrap();
    let mut list = browser.subscribe(&client).unwrap();
    let shown = list.data().await.unwrap().len();
    assert_eq!(shown, 1);

    browser.release(&client, 150, shown).await.unwrap();
    assert_eq!(browser.page(), 1);

    let mut previous = browser.subscribe(&client).unwrap();
    assert_eq!(previous.data().await.unwrap().total, 10);
}
