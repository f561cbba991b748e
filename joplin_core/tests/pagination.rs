mod support;

use serde_json::{json, Value};

use joplin_core::client::ApiClient;
use support::{StubResponse, StubServer};

fn items(count: usize, offset: usize) -> Vec<Value> {
    (0..count).map(|i| json!({"id": format!("item-{}", offset + i)})).collect()
}

fn client_for(server: &StubServer) -> ApiClient {
    ApiClient::new(server.config())
}

#[tokio::test]
async fn envelope_pages_concatenate_until_has_more_clears() {
    let server = support::spawn(|request| {
        let page: usize = request.query_param("page").unwrap_or("1").parse().unwrap();
        match page {
            1 => StubResponse::json(json!({"items": items(100, 0), "has_more": true})),
            2 => StubResponse::json(json!({"items": items(100, 100), "has_more": true})),
            3 => StubResponse::json(json!({"items": items(37, 200), "has_more": false})),
            _ => StubResponse::json(json!({"items": [], "has_more": false})),
        }
    })
    .await;

    let client = client_for(&server);
    let all: Vec<Value> = client.fetch_all("notes", &[], 0).await.unwrap();

    assert_eq!(all.len(), 237);
    assert_eq!(server.requests().len(), 3);
    assert_eq!(all[0]["id"], "item-0");
    assert_eq!(all[236]["id"], "item-236");
}

#[tokio::test]
async fn bare_array_short_page_terminates() {
    let server = support::spawn(|request| {
        let page: usize = request.query_param("page").unwrap_or("1").parse().unwrap();
        if page == 1 {
            StubResponse::json(Value::Array(items(100, 0)))
        } else {
            StubResponse::json(Value::Array(items(3, 100)))
        }
    })
    .await;

    let client = client_for(&server);
    let all: Vec<Value> = client.fetch_all("folders", &[], 0).await.unwrap();

    assert_eq!(all.len(), 103);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn endless_has_more_stops_at_page_ceiling() {
    let server = support::spawn(|_request| {
        StubResponse::json(json!({"items": items(100, 0), "has_more": true}))
    })
    .await;

    let client = client_for(&server);
    let all: Vec<Value> = client.fetch_all("notes", &[], 0).await.unwrap();

    // 50 pages, not an infinite loop.
    assert_eq!(server.requests().len(), 50);
    assert_eq!(all.len(), 5000);
}

#[tokio::test]
async fn result_cap_bounds_items_and_page_size() {
    let server = support::spawn(|_request| {
        StubResponse::json(json!({"items": items(10, 0), "has_more": false}))
    })
    .await;

    let client = client_for(&server);
    let all: Vec<Value> = client.fetch_all("notes", &[], 10).await.unwrap();

    assert_eq!(all.len(), 10);
    let first = &server.requests()[0];
    assert_eq!(first.query_param("limit"), Some("10"));
    assert_eq!(first.query_param("page"), Some("1"));
}

#[tokio::test]
async fn oversized_cap_is_clamped_to_server_page_max() {
    let server = support::spawn(|request| {
        let page: usize = request.query_param("page").unwrap_or("1").parse().unwrap();
        if page == 1 {
            StubResponse::json(json!({"items": items(100, 0), "has_more": true}))
        } else {
            StubResponse::json(json!({"items": items(100, 100), "has_more": false}))
        }
    })
    .await;

    let client = client_for(&server);
    let all: Vec<Value> = client.fetch_all("notes", &[], 150).await.unwrap();

    // Pages are requested at the server max, the cap lands on the result.
    assert_eq!(server.requests()[0].query_param("limit"), Some("100"));
    assert_eq!(all.len(), 150);
}

#[tokio::test]
async fn unrecognized_page_shape_stops_pagination() {
    let server = support::spawn(|_request| StubResponse::json(json!({"status": "ok"}))).await;

    let client = client_for(&server);
    let all: Vec<Value> = client.fetch_all("notes", &[], 0).await.unwrap();

    assert!(all.is_empty());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn every_page_request_carries_the_token() {
    let server = support::spawn(|request| {
        assert_eq!(request.query_param("token"), Some("test-token"));
        StubResponse::json(json!({"items": [], "has_more": false}))
    })
    .await;

    let client = client_for(&server);
    let _: Vec<Value> = client.fetch_all("tags", &[], 0).await.unwrap();

    assert_eq!(server.requests().len(), 1);
}
