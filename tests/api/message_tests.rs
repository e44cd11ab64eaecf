//! Message API Tests

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;

use crate::common::{TestApp, ALICE, BOB, CAROL};

#[tokio::test]
async fn test_send_text_message_moves_last_message() {
    let app = TestApp::new().await;
    let chat_id = app.direct_chat(ALICE, BOB).await;

    let sent = app.send_message(&chat_id, ALICE, Some("hi"), &[]).await;

    assert_eq!(sent.status, StatusCode::CREATED, "{:?}", sent.body);
    let message = &sent.body["data"];
    assert_eq!(message["content"], "hi");
    assert_eq!(message["chat"], chat_id.as_str());
    assert_eq!(message["sender"]["username"], "alice");

    let chats = app.get("/api/v1/chat-app/chats", BOB).await;
    assert_eq!(chats.body["data"][0]["lastMessage"]["id"], message["id"]);
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let app = TestApp::new().await;
    let chat_id = app.direct_chat(ALICE, BOB).await;

    let response = app.send_message(&chat_id, ALICE, Some(""), &[]).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_message_to_unknown_chat() {
    let app = TestApp::new().await;

    let response = app.send_message("987654321", ALICE, Some("hi"), &[]).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_outsider_cannot_send_or_read() {
    let app = TestApp::new().await;
    let chat_id = app.direct_chat(ALICE, BOB).await;

    let sent = app.send_message(&chat_id, CAROL, Some("let me in"), &[]).await;
    assert_eq!(sent.status, StatusCode::FORBIDDEN);

    let listed = app
        .get(&format!("/api/v1/chat-app/messages/{chat_id}"), CAROL)
        .await;
    assert_eq!(listed.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_messages_listed_newest_first() {
    let app = TestApp::new().await;
    let chat_id = app.direct_chat(ALICE, BOB).await;
    for text in ["one", "two", "three"] {
        app.send_message(&chat_id, ALICE, Some(text), &[]).await;
    }

    let listed = app
        .request(
            Method::GET,
            &format!("/api/v1/chat-app/messages/{chat_id}"),
            Some(BOB),
            None,
        )
        .await;

    assert_eq!(listed.status, StatusCode::OK);
    let contents: Vec<&str> = listed.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["three", "two", "one"]);
}

#[tokio::test]
async fn test_attachment_only_message_is_stored_and_served() {
    let app = TestApp::new().await;
    let chat_id = app.direct_chat(ALICE, BOB).await;

    let sent = app
        .send_message(&chat_id, ALICE, None, &[("cat.png", b"not really a png")])
        .await;

    assert_eq!(sent.status, StatusCode::CREATED, "{:?}", sent.body);
    let attachment = &sent.body["data"]["attachments"][0];
    let url = attachment["url"].as_str().unwrap();
    assert!(url.starts_with("http://localhost:8080/images/cat-"));
    let local_path = attachment["localPath"].as_str().unwrap();
    assert!(std::path::Path::new(local_path).exists());

    let file_name = url.rsplit('/').next().unwrap();
    let served = app
        .request(Method::GET, &format!("/images/{file_name}"), None, None)
        .await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.body, "not really a png");
}

#[tokio::test]
async fn test_too_many_attachments_rejected() {
    let app = TestApp::new().await;
    let chat_id = app.direct_chat(ALICE, BOB).await;
    let files: Vec<(&str, &[u8])> = (0..6).map(|_| ("f.txt", b"x".as_slice())).collect();

    let response = app.send_message(&chat_id, ALICE, Some("bulk"), &files).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_attachment_rejected() {
    let app = TestApp::new().await;
    let chat_id = app.direct_chat(ALICE, BOB).await;
    let big = vec![0u8; 2048];

    let response = app
        .send_message(&chat_id, ALICE, None, &[("big.bin", big.as_slice())])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rejected_send_leaves_no_files_behind() {
    let app = TestApp::new().await;
    let chat_id = app.direct_chat(ALICE, BOB).await;

    let response = app
        .send_message(&chat_id, CAROL, None, &[("doc.txt", b"secret")])
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    let leftovers = std::fs::read_dir(&app.upload_dir).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_deleting_chat_removes_messages_and_files() {
    let app = TestApp::new().await;
    let chat_id = app.create_group(ALICE, "crew", &[BOB, CAROL]).await;
    for name in ["a.txt", "b.txt", "c.txt"] {
        let sent = app
            .send_message(&chat_id, BOB, None, &[(name, b"data")])
            .await;
        assert_eq!(sent.status, StatusCode::CREATED);
    }
    assert_eq!(std::fs::read_dir(&app.upload_dir).unwrap().count(), 3);

    let deleted = app
        .delete(&format!("/api/v1/chat-app/chats/group/{chat_id}"), ALICE)
        .await;

    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(std::fs::read_dir(&app.upload_dir).unwrap().count(), 0);
    let listed = app
        .get(&format!("/api/v1/chat-app/messages/{chat_id}"), ALICE)
        .await;
    assert_eq!(listed.status, StatusCode::NOT_FOUND);
}
