//! Chat API Tests

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

use crate::common::{TestApp, ALICE, BOB, CAROL, DAVE, ERIN};

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/chat-app/chats", None, None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = TestApp::new().await;
    let request = axum::http::Request::builder()
        .uri("/api/v1/chat-app/chats")
        .header("Authorization", "Bearer not-a-jwt")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_token_is_accepted() {
    let app = TestApp::new().await;
    let request = axum::http::Request::builder()
        .uri("/api/v1/chat-app/chats")
        .header(
            "Cookie",
            format!("accessToken={}", crate::common::token_for(ALICE)),
        )
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"], json!([]));
}

#[tokio::test]
async fn test_direct_chat_is_shared_by_both_directions() {
    let app = TestApp::new().await;

    let first = app.direct_chat(ALICE, BOB).await;
    let second = app.direct_chat(BOB, ALICE).await;

    assert_eq!(first, second);
    let chats = app.get("/api/v1/chat-app/chats", ALICE).await;
    assert_eq!(chats.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(chats.body["data"][0]["isGroupChat"], false);
}

#[test_case(ALICE, StatusCode::BAD_REQUEST ; "with self")]
#[test_case(999, StatusCode::NOT_FOUND ; "with unknown user")]
#[tokio::test]
async fn test_direct_chat_rejections(peer: i64, expected: StatusCode) {
    let app = TestApp::new().await;

    let response = app
        .post(&format!("/api/v1/chat-app/chats/c/{peer}"), ALICE, None)
        .await;

    assert_eq!(response.status, expected);
}

#[tokio::test]
async fn test_malformed_path_id_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/v1/chat-app/chats/c/not-a-number", ALICE, None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_group_chat_envelope() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/v1/chat-app/chats/group",
            ALICE,
            Some(json!({ "name": "  weekend  ", "participants": [BOB.to_string(), CAROL.to_string()] })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["statusCode"], 201);
    assert_eq!(response.body["success"], true);
    let chat = &response.body["data"];
    assert_eq!(chat["name"], "weekend");
    assert_eq!(chat["isGroupChat"], true);
    assert_eq!(chat["admin"], ALICE.to_string());
    assert_eq!(chat["participants"].as_array().unwrap().len(), 3);
}

#[test_case(json!({ "name": "duo", "participants": [BOB.to_string()] }) ; "single peer")]
#[test_case(json!({ "name": " ", "participants": [BOB.to_string(), CAROL.to_string()] }) ; "blank name")]
#[test_case(json!({ "name": "dup", "participants": [BOB.to_string(), BOB.to_string()] }) ; "duplicate peer")]
#[test_case(json!({ "name": "me", "participants": [ALICE.to_string(), BOB.to_string()] }) ; "creator listed")]
#[test_case(json!({ "name": "bad", "participants": [BOB.to_string(), "x"] }) ; "malformed id")]
#[tokio::test]
async fn test_invalid_group_requests(body: serde_json::Value) {
    let app = TestApp::new().await;

    let response = app
        .post("/api/v1/chat-app/chats/group", ALICE, Some(body))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST, "{:?}", response.body);
}

#[tokio::test]
async fn test_group_details_require_membership() {
    let app = TestApp::new().await;
    let chat_id = app.create_group(ALICE, "crew", &[BOB, CAROL]).await;
    let uri = format!("/api/v1/chat-app/chats/group/{chat_id}");

    assert_eq!(app.get(&uri, BOB).await.status, StatusCode::OK);
    assert_eq!(app.get(&uri, DAVE).await.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.get("/api/v1/chat-app/chats/group/424242", BOB).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_rename_is_admin_only() {
    let app = TestApp::new().await;
    let chat_id = app.create_group(ALICE, "crew", &[BOB, CAROL]).await;
    let uri = format!("/api/v1/chat-app/chats/group/{chat_id}");

    let denied = app.patch(&uri, BOB, json!({ "name": "mine" })).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let renamed = app.patch(&uri, ALICE, json!({ "name": "renamed" })).await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["data"]["name"], "renamed");
}

#[tokio::test]
async fn test_membership_management() {
    let app = TestApp::new().await;
    let chat_id = app.create_group(ALICE, "crew", &[BOB, CAROL]).await;
    let member_uri = |user: i64| format!("/api/v1/chat-app/chats/group/{chat_id}/{user}");

    // Only the admin may add
    assert_eq!(app.post(&member_uri(DAVE), BOB, None).await.status, StatusCode::FORBIDDEN);

    let added = app.post(&member_uri(DAVE), ALICE, None).await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.body["data"]["participants"].as_array().unwrap().len(), 4);

    // Already a member
    assert_eq!(app.post(&member_uri(DAVE), ALICE, None).await.status, StatusCode::BAD_REQUEST);

    // Removing someone who is not there
    assert_eq!(app.delete(&member_uri(ERIN), ALICE).await.status, StatusCode::BAD_REQUEST);

    // Non-admin remove
    assert_eq!(app.delete(&member_uri(DAVE), BOB).await.status, StatusCode::FORBIDDEN);

    let removed = app.delete(&member_uri(DAVE), ALICE).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["data"]["participants"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_leave_group() {
    let app = TestApp::new().await;
    let chat_id = app.create_group(ALICE, "crew", &[BOB, CAROL]).await;
    let uri = format!("/api/v1/chat-app/chats/leave/group/{chat_id}");

    let left = app.delete(&uri, BOB).await;
    assert_eq!(left.status, StatusCode::OK);

    // No longer a member
    assert_eq!(app.delete(&uri, BOB).await.status, StatusCode::FORBIDDEN);
    // Admin cannot leave
    assert_eq!(app.delete(&uri, ALICE).await.status, StatusCode::BAD_REQUEST);

    let chats = app.get("/api/v1/chat-app/chats", BOB).await;
    assert_eq!(chats.body["data"], json!([]));
}

#[tokio::test]
async fn test_delete_group_chat() {
    let app = TestApp::new().await;
    let chat_id = app.create_group(ALICE, "crew", &[BOB, CAROL]).await;
    let uri = format!("/api/v1/chat-app/chats/group/{chat_id}");

    assert_eq!(app.delete(&uri, BOB).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&uri, ALICE).await.status, StatusCode::OK);
    assert_eq!(app.get(&uri, ALICE).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_direct_chat() {
    let app = TestApp::new().await;
    let chat_id = app.direct_chat(ALICE, BOB).await;
    let uri = format!("/api/v1/chat-app/chats/remove/{chat_id}");

    assert_eq!(app.delete(&uri, CAROL).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&uri, BOB).await.status, StatusCode::OK);
    assert_eq!(app.delete(&uri, ALICE).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_available_users_excludes_caller() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/chat-app/chats/users", ALICE).await;

    assert_eq!(response.status, StatusCode::OK);
    let ids: Vec<&str> = response.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 4);
    assert!(!ids.contains(&ALICE.to_string().as_str()));
}
