//! Catalog search tests
//!
//! Tests the search fan-out: merge order, provider tagging and partial failure.

use mockito::{Matcher, Server};
use std::time::Duration;
use zanime::api::catalog::SearchProvider;
use zanime::api::CatalogSearch;

fn provider(name: &str, url: String, param: &str) -> SearchProvider {
    SearchProvider {
        name: name.to_string(),
        url,
        query_param: param.to_string(),
    }
}

#[tokio::test]
async fn test_search_merges_in_provider_order() {
    let mut server = Server::new_async().await;

    let first = server
        .mock("GET", "/a/search")
        .match_query(Matcher::UrlEncoded("query".into(), "one piece".into()))
        .with_status(200)
        .with_body(r#"[{"id": "op", "title": "One Piece"}, {"id": "op-film", "title": "One Piece Film: Red"}]"#)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/b/search")
        .match_query(Matcher::UrlEncoded("q".into(), "one piece".into()))
        .with_status(200)
        .with_body(r#"{"data": [{"slug": "one-piece", "name": "One Piece", "source": "upstream-tag"}]}"#)
        .create_async()
        .await;

    let search = CatalogSearch::new(
        vec![
            provider("animeworld", format!("{}/a/search", server.url()), "query"),
            provider("tanime", format!("{}/b/search", server.url()), "q"),
        ],
        Duration::from_secs(5),
    );
    let response = search.search("one piece").await;

    first.assert_async().await;
    second.assert_async().await;

    assert_eq!(response.query, "one piece");
    assert_eq!(response.combined.len(), 3);
    assert_eq!(response.combined[0].source, "animeworld");
    assert_eq!(response.combined[1].title(), Some("One Piece Film: Red"));
    assert_eq!(response.combined[2].source, "tanime");
    assert_eq!(response.combined[2].title(), Some("One Piece"));
    assert!(response.providers.iter().all(|p| p.ok));
    assert_eq!(response.providers[1].count, 1);
}

#[tokio::test]
async fn test_failed_provider_is_omitted() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/a/search")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    server
        .mock("GET", "/b/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"results": [{"title": "Naruto"}]}"#)
        .create_async()
        .await;

    let search = CatalogSearch::new(
        vec![
            provider("animeworld", format!("{}/a/search", server.url()), "query"),
            provider("tanime", format!("{}/b/search", server.url()), "q"),
            provider("offline", "http://127.0.0.1:1/search".to_string(), "q"),
        ],
        Duration::from_secs(5),
    );
    let response = search.search("naruto").await;

    assert_eq!(response.combined.len(), 1);
    assert_eq!(response.combined[0].source, "tanime");

    assert!(!response.providers[0].ok);
    assert!(response.providers[0].error.as_deref().unwrap().contains("503"));
    assert!(response.providers[1].ok);
    assert!(!response.providers[2].ok);
}
