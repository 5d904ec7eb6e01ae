//! In-process fake DexCloud server for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use dexcloud_core::{ApiClient, Config, CookieJar};

/// A part received by the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Request seen by the auth endpoints
#[derive(Debug, Clone)]
pub struct ReceivedAuth {
    pub content_type: Option<String>,
    pub body: Value,
}

pub struct FakeState {
    pub login: (StatusCode, Value),
    pub register: (StatusCode, Value),
    /// Token the check endpoint accepts
    pub valid_token: String,
    pub upload_status: StatusCode,
    pub upload_delay: Duration,
    pub file_list: (StatusCode, Value),
    pub downloads: HashMap<String, Vec<u8>>,

    /// Endpoint hits in arrival/completion order
    pub events: Vec<String>,
    pub auth_requests: Vec<ReceivedAuth>,
    pub uploads: Vec<Vec<ReceivedPart>>,
    pub cookies: Vec<Option<String>>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            login: (StatusCode::OK, json!({"userId": "42", "token": "tok1"})),
            register: (StatusCode::CREATED, json!({"userId": "43", "token": "tok2"})),
            valid_token: "tok1".to_string(),
            upload_status: StatusCode::OK,
            upload_delay: Duration::ZERO,
            file_list: (StatusCode::OK, json!({"userId": "42", "files": []})),
            downloads: HashMap::new(),
            events: Vec::new(),
            auth_requests: Vec::new(),
            uploads: Vec::new(),
            cookies: Vec::new(),
        }
    }
}

pub type Shared = Arc<Mutex<FakeState>>;

pub struct FakeServer {
    pub base_url: String,
    pub state: Shared,
}

impl FakeServer {
    pub async fn start(state: FakeState) -> Self {
        let state = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/api/login", post(login))
            .route("/api/register", post(register))
            .route("/api/checkauth", get(check_auth))
            .route("/api/upload", post(upload).put(upload))
            .route("/api/filelist", get(file_list))
            .route("/uploads/{user_id}/{file}", get(download))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake server");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn config(&self) -> Config {
        Config::for_server(&self.base_url)
    }

    pub fn client(&self) -> ApiClient {
        self.client_with(self.config())
    }

    pub fn client_with(&self, config: Config) -> ApiClient {
        ApiClient::new(config, CookieJar::new()).expect("client")
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

fn record(state: &Shared, event: &str, headers: &HeaderMap) {
    let mut s = state.lock().unwrap();
    s.events.push(event.to_string());
    s.cookies.push(
        headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    );
}

fn record_auth(state: &Shared, headers: &HeaderMap, body: &Bytes) {
    let mut s = state.lock().unwrap();
    s.auth_requests.push(ReceivedAuth {
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_slice(body).unwrap_or(Value::Null),
    });
}

async fn login(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    record(&state, "login", &headers);
    record_auth(&state, &headers, &body);
    let (status, body) = state.lock().unwrap().login.clone();
    (status, Json(body))
}

async fn register(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    record(&state, "register", &headers);
    record_auth(&state, &headers, &body);
    let (status, body) = state.lock().unwrap().register.clone();
    (status, Json(body))
}

async fn check_auth(State(state): State<Shared>, headers: HeaderMap) -> StatusCode {
    record(&state, "checkauth", &headers);
    let expected = format!("token={}", state.lock().unwrap().valid_token);
    let authorized = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|cookies| cookies.split("; ").any(|c| c == expected));

    if authorized {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn upload(State(state): State<Shared>, headers: HeaderMap, mut multipart: Multipart) -> impl IntoResponse {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(ReceivedPart {
            field: name,
            file_name,
            bytes,
        });
    }

    let delay = state.lock().unwrap().upload_delay;
    tokio::time::sleep(delay).await;

    record(&state, "upload", &headers);
    let status = {
        let mut s = state.lock().unwrap();
        s.uploads.push(parts);
        s.upload_status
    };
    (status, "OK")
}

async fn file_list(State(state): State<Shared>, headers: HeaderMap) -> impl IntoResponse {
    record(&state, "filelist", &headers);
    let (status, body) = state.lock().unwrap().file_list.clone();
    (status, Json(body))
}

async fn download(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((user_id, file)): Path<(String, String)>,
) -> impl IntoResponse {
    record(&state, "download", &headers);
    let key = format!("{}/{}", user_id, file);
    let found = state.lock().unwrap().downloads.get(&key).cloned();
    match found {
        Some(bytes) => (StatusCode::OK, bytes),
        None => (StatusCode::NOT_FOUND, Vec::new()),
    }
}
