//! Tests for the personal collection client.

use std::sync::Arc;

use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{item_tag, list_tag, CollectionClient};
use crate::api::backend::BackendHttp;
use crate::cache::{FetchStatus, QueryCache};
use crate::error::ApiError;
use crate::models::{CollectionQuery, PokemonDetail, SortBy, SortDir};
use crate::session::{SessionStore, SessionToken};

struct Fixture {
    client: CollectionClient,
    cache: QueryCache,
    session: Arc<SessionStore>,
}

fn fixture(mock_uri: &str, token: Option<&str>) -> Fixture {
    let session = Arc::new(SessionStore::in_memory());
    if let Some(token) = token {
        session.set(SessionToken::new(token)).unwrap();
    }
    let cache = QueryCache::default();
    let backend = BackendHttp::new(reqwest::Client::new(), mock_uri, session.clone());
    Fixture {
        client: CollectionClient::new(backend, cache.clone()),
        cache,
        session,
    }
}

fn caught_json(id: u32, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "sprite_front_default": null,
        "caughtAt": "2024-05-01T10:00:00Z",
        "height_dm": 4,
        "weight_hg": 60
    })
}

fn page_json(items: Vec<serde_json::Value>, total: u64) -> serde_json::Value {
    serde_json::json!({ "items": items, "total": total })
}

fn snapshot(id: u32, name: &str) -> PokemonDetail {
    PokemonDetail {
        id,
        name: name.to_string(),
        sprite_url: Some(format!("https://img.example.com/{id}.png")),
        height_decimeters: Some(4),
        weight_hectograms: Some(60),
        abilities: vec!["static".to_string()],
        types: vec!["electric".to_string()],
        caught_at: None,
    }
}

// ── list_mine ────────────────────────────────────────────────────────

#[tokio::test]
async fn list_mine_sends_query_and_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "5"))
        .and(query_param("search", "pi"))
        .and(query_param("sortBy", "name"))
        .and(query_param("sortDir", "asc"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![caught_json(25, "pikachu"), caught_json(172, "pichu")],
            7,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), Some("tok-1"));
    let query = CollectionQuery::default()
        .page(2)
        .page_size(5)
        .search(Some("pi"))
        .sort(SortBy::Name, SortDir::Asc);

    let mut list = fx.client.list_mine(&query).unwrap();
    let page = list.data().await.unwrap();

    assert_eq!(page.total, 7);
    // Server order is kept as received
    assert_eq!(page.items[0].name, "pikachu");
    assert_eq!(page.items[1].name, "pichu");
}

#[tokio::test]
async fn list_mine_without_token_sends_no_auth_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![], 0)))
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), None);
    let mut list = fx.client.list_mine(&CollectionQuery::default()).unwrap();
    list.data().await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn reordered_query_hits_same_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![], 0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), Some("t"));
    let a = CollectionQuery::default()
        .sort(SortBy::Name, SortDir::Asc)
        .page_size(10)
        .page(1);
    let b = CollectionQuery::default()
        .page(1)
        .page_size(10)
        .sort(SortBy::Name, SortDir::Asc);

    let mut first = fx.client.list_mine(&a).unwrap();
    first.data().await.unwrap();
    let mut second = fx.client.list_mine(&b).unwrap();
    second.data().await.unwrap();

    assert_eq!(first.key(), second.key());
    assert_eq!(fx.cache.len(), 1);
}

#[tokio::test]
async fn invalid_page_size_is_rejected_before_dispatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), Some("t"));
    let result = fx.client.list_mine(&CollectionQuery::default().page_size(13));
    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert!(fx.cache.is_empty());
}

#[tokio::test]
async fn unauthorized_list_clears_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .respond_with(ResponseTemplate::new(401).set_body_string("jwt expired"))
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), Some("expired"));
    let mut list = fx.client.list_mine(&CollectionQuery::default()).unwrap();
    let err = list.data().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!fx.session.is_authenticated());
}

// ── catch / release ──────────────────────────────────────────────────

#[tokio::test]
async fn catch_puts_snapshot_and_invalidates_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![], 0)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(vec![caught_json(25, "pikachu")], 1)),
        )
        .mount(&mock_server)
        .await;

    let pikachu = snapshot(25, "pikachu");
    Mock::given(method("PUT"))
        .and(path("/pokemon/25"))
        .and(header("Authorization", "Bearer t"))
        .and(body_json(serde_json::to_value(&pikachu).unwrap()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "caught": true, "pokemonId": 25 })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), Some("t"));
    let mut list = fx.client.list_mine(&CollectionQuery::default()).unwrap();
    assert!(list.data().await.unwrap().is_empty());

    let receipt = fx.client.catch(25, &pikachu).await.unwrap();
    assert!(receipt.caught);
    assert_eq!(receipt.id, 25);

    // Revalidating in the background, previous payload still visible
    let state = list.state();
    assert_eq!(state.status, FetchStatus::Loading);
    assert!(state.data.is_some());

    let page = list.data().await.unwrap();
    assert!(page.contains(25));
}

#[tokio::test]
async fn catch_with_mismatched_snapshot_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), Some("t"));
    let err = fx.client.catch(25, &snapshot(26, "raichu")).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn failed_release_leaves_cache_untouched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(vec![caught_json(25, "pikachu")], 1)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/pokemon/25"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), Some("t"));
    let mut list = fx.client.list_mine(&CollectionQuery::default()).unwrap();
    list.data().await.unwrap();

    let err = fx.client.release(25).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fx.cache.is_stale(list.key()), Some(false));
    assert!(list.state().is_success());
}

#[tokio::test]
async fn release_reports_total_and_marks_item_stale() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon/25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(caught_json(25, "pikachu")))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/pokemon/25"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "released": true, "id": 25, "total": 4 })),
        )
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), Some("t"));
    let mut detail = fx.client.get_detail(25).unwrap();
    detail.data().await.unwrap();
    let key = detail.key().clone();
    drop(detail);

    let receipt = fx.client.release(25).await.unwrap();
    assert!(receipt.released);
    assert_eq!(receipt.total, Some(4));
    assert_eq!(fx.cache.is_stale(&key), Some(true));
}

// ── get_detail ───────────────────────────────────────────────────────

#[tokio::test]
async fn detail_of_uncaught_pokemon_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon/4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fx = fixture(&mock_server.uri(), Some("t"));
    let mut detail = fx.client.get_detail(4).unwrap();
    assert!(detail.data().await.unwrap_err().is_not_found());
}

#[test]
fn tags_display() {
    assert_eq!(list_tag().to_string(), "collection-list");
    assert_eq!(item_tag(25).to_string(), "collection-item:25");
}
