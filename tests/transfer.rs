use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yt_data_client::YouTubeClient;
use yt_like_transfer::{TransferError, transfer_likes};
use yt_oauth::{AuthorizedClient, OAuthConfig, OAuthToken};

fn account(access_token: &str) -> AuthorizedClient {
    AuthorizedClient::new(
        reqwest::Client::new(),
        OAuthConfig::new("client-id".into(), "client-secret".into()),
        OAuthToken {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "Bearer".into(),
            expires_at: None,
        },
        None,
    )
}

async fn mount_rate(server: &MockServer, video_id: &str, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/youtube/v3/videos/rate"))
        .and(header("authorization", "Bearer target-token"))
        .and(query_param("id", video_id))
        .and(query_param("rating", "like"))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn transfers_likes_across_pages() {
    let source_api = MockServer::start().await;
    let target_api = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(header("authorization", "Bearer source-token"))
        .and(query_param("myRating", "like"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "v1" }],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&source_api)
        .await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(query_param("myRating", "like"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "v2" }]
        })))
        .expect(1)
        .mount(&source_api)
        .await;
    mount_rate(&target_api, "v1", 204, 1).await;
    mount_rate(&target_api, "v2", 204, 1).await;

    let source = YouTubeClient::new(&source_api.uri(), account("source-token")).unwrap();
    let target = YouTubeClient::new(&target_api.uri(), account("target-token")).unwrap();

    let summary = transfer_likes(&source, &target).await.unwrap();

    assert_eq!(summary.found, 2);
    assert_eq!(summary.liked, 2);
    assert!(summary.failed.is_empty());
}

#[tokio::test]
async fn rejected_rating_is_skipped() {
    let source_api = MockServer::start().await;
    let target_api = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "A" }, { "id": "B" }, { "id": "C" }]
        })))
        .expect(1)
        .mount(&source_api)
        .await;
    mount_rate(&target_api, "A", 204, 1).await;
    mount_rate(&target_api, "B", 404, 1).await;
    mount_rate(&target_api, "C", 204, 1).await;

    let source = YouTubeClient::new(&source_api.uri(), account("source-token")).unwrap();
    let target = YouTubeClient::new(&target_api.uri(), account("target-token")).unwrap();

    let summary = transfer_likes(&source, &target).await.unwrap();

    assert_eq!(summary.liked, 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "B");
}

#[tokio::test]
async fn unreachable_source_aborts_without_rating() {
    // Reserve a port, then release it so nothing is listening there.
    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_addr = unused.local_addr().unwrap();
    drop(unused);

    let target_api = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&target_api)
        .await;

    let source =
        YouTubeClient::new(&format!("http://{dead_addr}"), account("source-token")).unwrap();
    let target = YouTubeClient::new(&target_api.uri(), account("target-token")).unwrap();

    let err = transfer_likes(&source, &target).await.unwrap_err();
    assert!(matches!(err, TransferError::Listing(_)));
}
