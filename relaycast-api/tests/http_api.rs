//! HTTP surface tests against an in-memory service stack.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use relaycast_api::create_router;
use relaycast_core::{
    db::connect_in_memory,
    service::{CleanupCoordinator, EndpointService, ProfileService, UploadSession},
    AssetStore, ContentDigest,
};

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

struct TestApp {
    router: Router,
    storage_dir: tempfile::TempDir,
}

async fn test_app() -> TestApp {
    let pool = connect_in_memory().await.expect("pool");
    let storage_dir = tempfile::tempdir().expect("tempdir");
    let store = AssetStore::new(pool.clone(), storage_dir.path());
    let cleanup = CleanupCoordinator::new(pool.clone(), store.clone());

    let router = create_router(
        Arc::new(ProfileService::new(
            pool.clone(),
            store.clone(),
            cleanup.clone(),
        )),
        Arc::new(EndpointService::new(
            pool.clone(),
            store.clone(),
            cleanup.clone(),
        )),
        Arc::new(UploadSession::new(store.clone())),
        Arc::new(cleanup),
        Arc::new(store),
        MAX_UPLOAD_BYTES,
    );

    TestApp {
        router,
        storage_dir,
    }
}

fn count_files(dir: &std::path::Path) -> usize {
    let mut count = 0;
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_files(&path);
            } else {
                count += 1;
            }
        }
    }
    count
}

async fn send_json(router: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(router, request).await
}

async fn send_empty(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

fn multipart_upload(uri: &str, digest: Option<&str>, payload: &[u8]) -> Request<Body> {
    let boundary = "----relaycast-test-boundary";
    let mut body = Vec::new();

    if let Some(digest) = digest {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"digest\"\r\n\r\n");
        body.extend_from_slice(digest.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"clip.mp4\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: video/mp4\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app().await;
    let (status, body) = send_empty(&app.router, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_profile_crud() {
    let app = test_app().await;

    let (status, profile) =
        send_json(&app.router, "POST", "/api/profiles", json!({"name": "alice"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "alice");
    let id = profile["id"].as_i64().expect("id");

    let (status, fetched) = send_empty(&app.router, "GET", &format!("/api/profiles/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "alice");

    let (status, renamed) = send_json(
        &app.router,
        "PUT",
        &format!("/api/profiles/{id}"),
        json!({"name": "bob"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "bob");

    let (status, _) = send_empty(&app.router, "DELETE", &format!("/api/profiles/{id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_empty(&app.router, "GET", &format!("/api/profiles/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_profile_name_conflicts() {
    let app = test_app().await;

    send_json(&app.router, "POST", "/api/profiles", json!({"name": "alice"})).await;
    let (status, body) =
        send_json(&app.router, "POST", "/api/profiles", json!({"name": "alice"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().expect("error").contains("name"));
}

#[tokio::test]
async fn test_upload_check_and_dedup() {
    let app = test_app().await;

    let (_, profile) =
        send_json(&app.router, "POST", "/api/profiles", json!({"name": "alice"})).await;
    let profile_id = profile["id"].as_i64().expect("id");

    let payload = b"mpeg frames";
    let digest = ContentDigest::compute(payload);

    // Unknown digest probes as missing
    let (status, check) = send_json(
        &app.router,
        "POST",
        "/api/media/check",
        json!({"digest": digest.as_str(), "kind": "video"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["exists"], false);

    // First upload stores, second dedups
    let request = multipart_upload(
        &format!("/api/media/upload/{profile_id}"),
        Some(digest.as_str()),
        payload,
    );
    let (status, first) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["deduplicated"], false);

    let request = multipart_upload(
        &format!("/api/media/upload/{profile_id}"),
        Some(digest.as_str()),
        payload,
    );
    let (status, second) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["deduplicated"], true);
    assert_eq!(second["asset"]["id"], first["asset"]["id"]);

    // And the probe now hits
    let (_, check) = send_json(
        &app.router,
        "POST",
        "/api/media/check",
        json!({"digest": digest.as_str(), "kind": "video"}),
    )
    .await;
    assert_eq!(check["exists"], true);

    let (status, listed) = send_empty(
        &app.router,
        "GET",
        &format!("/api/media/profile/{profile_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn test_upload_with_wrong_digest_is_rejected() {
    let app = test_app().await;

    let (_, profile) =
        send_json(&app.router, "POST", "/api/profiles", json!({"name": "alice"})).await;
    let profile_id = profile["id"].as_i64().expect("id");

    let wrong = ContentDigest::compute(b"other bytes");
    let request = multipart_upload(
        &format!("/api/media/upload/{profile_id}"),
        Some(wrong.as_str()),
        b"mpeg frames",
    );
    let (status, _) = send(&app.router, request).await;
    // The declared digest misses the dedup probe, then fails verification
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_interrupted_upload_leaves_no_asset() {
    let app = test_app().await;

    let (_, profile) =
        send_json(&app.router, "POST", "/api/profiles", json!({"name": "alice"})).await;
    let profile_id = profile["id"].as_i64().expect("id");

    // A body that dies mid-file: headers plus some payload bytes, then a
    // transport error before the closing boundary.
    let boundary = "----relaycast-test-boundary";
    let mut head = Vec::new();
    head.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    head.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"clip.mp4\"\r\n",
    );
    head.extend_from_slice(b"Content-Type: video/mp4\r\n\r\n");
    head.extend_from_slice(&[0u8; 32]);

    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from(head)),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )),
    ];
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/media/upload/{profile_id}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .expect("request");

    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The partial bytes must not have been committed as an asset
    let (_, listed) = send_empty(
        &app.router,
        "GET",
        &format!("/api/media/profile/{profile_id}"),
    )
    .await;
    assert_eq!(listed.as_array().expect("array").len(), 0);
    assert_eq!(count_files(app.storage_dir.path()), 0);
}

#[tokio::test]
async fn test_upload_to_missing_profile() {
    let app = test_app().await;
    let request = multipart_upload("/api/media/upload/99", None, b"mpeg frames");
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_endpoint_binding_rules_over_http() {
    let app = test_app().await;

    let (_, profile) =
        send_json(&app.router, "POST", "/api/profiles", json!({"name": "alice"})).await;
    let profile_id = profile["id"].as_i64().expect("id");

    let request = multipart_upload(&format!("/api/media/upload/{profile_id}"), None, b"frames");
    let (_, upload) = send(&app.router, request).await;
    let asset_id = upload["asset"]["id"].as_i64().expect("asset id");

    // Binding a video asset into the audio slot is a validation error
    let (status, _) = send_json(
        &app.router,
        "POST",
        "/api/endpoints",
        json!({
            "profile_id": profile_id,
            "name": "main",
            "url": "rtmp://live.example.com/app",
            "service_tag": "custom",
            "audio_asset_id": asset_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, endpoint) = send_json(
        &app.router,
        "POST",
        "/api/endpoints",
        json!({
            "profile_id": profile_id,
            "name": "main",
            "url": "rtmp://live.example.com/app",
            "service_tag": "custom",
            "video_asset_id": asset_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let endpoint_id = endpoint["id"].as_i64().expect("endpoint id");

    // A referenced asset cannot be deleted directly
    let (status, _) = send_empty(&app.router, "DELETE", &format!("/api/media/{asset_id}")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Deleting the endpoint reclaims it
    let (status, deletion) = send_empty(
        &app.router,
        "DELETE",
        &format!("/api/endpoints/{endpoint_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deletion["reclaimed_assets"][0], asset_id);
}

#[tokio::test]
async fn test_unbind_via_update_reclaims_asset() {
    let app = test_app().await;

    let (_, profile) =
        send_json(&app.router, "POST", "/api/profiles", json!({"name": "alice"})).await;
    let profile_id = profile["id"].as_i64().expect("id");

    let request = multipart_upload(&format!("/api/media/upload/{profile_id}"), None, b"frames");
    let (_, upload) = send(&app.router, request).await;
    let asset_id = upload["asset"]["id"].as_i64().expect("asset id");

    let (_, endpoint) = send_json(
        &app.router,
        "POST",
        "/api/endpoints",
        json!({
            "profile_id": profile_id,
            "name": "main",
            "url": "rtmp://live.example.com/app",
            "service_tag": "custom",
            "video_asset_id": asset_id,
        }),
    )
    .await;
    let endpoint_id = endpoint["id"].as_i64().expect("endpoint id");

    // Explicit null clears the binding; an absent field would leave it
    let (status, change) = send_json(
        &app.router,
        "PUT",
        &format!("/api/endpoints/{endpoint_id}"),
        json!({"video_asset_id": null}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["endpoint"]["video_asset_id"], Value::Null);
    assert_eq!(change["reclaimed_assets"][0], asset_id);

    let (_, listed) = send_empty(
        &app.router,
        "GET",
        &format!("/api/media/profile/{profile_id}"),
    )
    .await;
    assert_eq!(listed.as_array().expect("array").len(), 0);
}

#[tokio::test]
async fn test_invalid_stream_url_rejected() {
    let app = test_app().await;

    let (_, profile) =
        send_json(&app.router, "POST", "/api/profiles", json!({"name": "alice"})).await;
    let profile_id = profile["id"].as_i64().expect("id");

    let (status, body) = send_json(
        &app.router,
        "POST",
        "/api/endpoints",
        json!({
            "profile_id": profile_id,
            "name": "main",
            "url": "ftp://example.com/file",
            "service_tag": "custom",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error").contains("scheme"));
}
