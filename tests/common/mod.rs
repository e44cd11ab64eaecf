//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use chat_app_server::application::services::Claims;
use chat_app_server::config::{
    CorsSettings, DatabaseSettings, JwtSettings, ServerSettings, Settings, SnowflakeSettings,
    StoreBackend, UploadSettings, WebSocketSettings,
};
use chat_app_server::domain::User;
use chat_app_server::infrastructure::memory::InMemoryStore;
use chat_app_server::startup::{build_router, AppState};

pub const JWT_SECRET: &str = "integration-test-secret-with-32-plus-chars";
pub const MULTIPART_BOUNDARY: &str = "chat-app-test-boundary";

/// Seeded users: ids 1 through 5
pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;
pub const CAROL: i64 = 3;
pub const DAVE: i64 = 4;
pub const ERIN: i64 = 5;

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Test application over the in-memory store
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub upload_dir: std::path::PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        let upload_dir = std::env::temp_dir().join(format!("chat-app-it-{}", uuid::Uuid::new_v4()));
        let settings = test_settings(&upload_dir);

        let store = Arc::new(InMemoryStore::new());
        for (id, name) in [(ALICE, "alice"), (BOB, "bob"), (CAROL, "carol"), (DAVE, "dave"), (ERIN, "erin")] {
            store.insert_user(User {
                id,
                username: name.to_string(),
                email: format!("{name}@example.com"),
                ..Default::default()
            });
        }

        let state = AppState::with_memory(settings, store.clone())
            .await
            .expect("test state");

        Self {
            router: build_router(state),
            store,
            upload_dir,
        }
    }

    /// Send a request, optionally authenticated as `user_id`
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<i64>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = user_id {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(id)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, user_id: i64) -> TestResponse {
        self.request(Method::GET, uri, Some(user_id), None).await
    }

    pub async fn post(&self, uri: &str, user_id: i64, body: Option<Value>) -> TestResponse {
        self.request(Method::POST, uri, Some(user_id), body).await
    }

    pub async fn patch(&self, uri: &str, user_id: i64, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(user_id), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user_id: i64) -> TestResponse {
        self.request(Method::DELETE, uri, Some(user_id), None).await
    }

    /// POST a multipart message with text content and `(filename, bytes)` files
    pub async fn send_message(
        &self,
        chat_id: &str,
        user_id: i64,
        content: Option<&str>,
        files: &[(&str, &[u8])],
    ) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/chat-app/messages/{chat_id}"))
            .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(Body::from(multipart_body(content, files)))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse { status, body }
    }

    /// Create a group chat through the API and return its id
    pub async fn create_group(&self, admin: i64, name: &str, others: &[i64]) -> String {
        let participants: Vec<String> = others.iter().map(|id| id.to_string()).collect();
        let response = self
            .post(
                "/api/v1/chat-app/chats/group",
                admin,
                Some(serde_json::json!({ "name": name, "participants": participants })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Get or create a direct chat through the API and return its id
    pub async fn direct_chat(&self, actor: i64, peer: i64) -> String {
        let response = self
            .post(&format!("/api/v1/chat-app/chats/c/{peer}"), actor, None)
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["data"]["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.upload_dir).ok();
    }
}

pub fn test_settings(upload_dir: &std::path::Path) -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            backend: StoreBackend::Memory,
            url: String::new(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: 1,
            run_migrations: false,
        },
        jwt: JwtSettings {
            secret: JWT_SECRET.into(),
        },
        snowflake: SnowflakeSettings { machine_id: 1 },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        uploads: UploadSettings {
            local_dir: upload_dir.to_string_lossy().into_owned(),
            public_base_url: "http://localhost:8080".into(),
            max_file_size: 1024,
            max_files_per_message: 5,
        },
        websocket: WebSocketSettings {
            max_message_size: 65536,
            max_frame_size: 16384,
        },
        environment: "test".into(),
    }
}

/// Signed access token for a user, valid for an hour
pub fn token_for(user_id: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn multipart_body(content: Option<&str>, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(text) = content {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"content\"\r\n\r\n{text}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, data) in files {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"attachments\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}
