#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::Router;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use scheduler_client::{ClientConfig, MemoryTokenStorage, SchedulerClient, TokenStorage, User};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone)]
pub struct MultipartEntry {
    pub name: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

impl MultipartEntry {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub multipart: Vec<MultipartEntry>,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body should be json")
    }

    pub fn field(&self, name: &str) -> Option<&MultipartEntry> {
        self.multipart.iter().find(|entry| entry.name == name)
    }

    pub fn fields(&self, name: &str) -> Vec<String> {
        self.multipart
            .iter()
            .filter(|entry| entry.name == name)
            .map(MultipartEntry::text)
            .collect()
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("multipart/form-data"))
    }
}

/// In-process stand-in for the scheduler API: canned responses per route,
/// every request recorded.
#[derive(Clone, Default)]
pub struct MockApi {
    routes: Arc<Mutex<HashMap<String, (u16, Value)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockApi {
    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) -> &Self {
        self.routes
            .lock()
            .expect("routes lock")
            .insert(format!("{method} {path}"), (status, body));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn last(&self, method: &str, path: &str) -> RecordedRequest {
        self.requests()
            .into_iter()
            .rev()
            .find(|request| request.method == method && request.path == path)
            .unwrap_or_else(|| panic!("no {method} {path} request recorded"))
    }

    pub async fn spawn(&self) -> String {
        let app = Router::new().fallback(record).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock api server");
        });
        format!("http://{addr}")
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn record(State(mock): State<MockApi>, request: Request) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let (authorization, content_type) = {
        let headers = request.headers();
        (
            header_value(headers, AUTHORIZATION),
            header_value(headers, CONTENT_TYPE),
        )
    };

    let mut body = Vec::new();
    let mut multipart_entries = Vec::new();
    if content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
    {
        let mut multipart = Multipart::from_request(request, &mock)
            .await
            .expect("multipart body");
        while let Some(field) = multipart.next_field().await.expect("multipart field") {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let data = field.bytes().await.expect("field bytes").to_vec();
            multipart_entries.push(MultipartEntry {
                name,
                file_name,
                data,
            });
        }
    } else {
        body = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .expect("request body")
            .to_vec();
    }

    let key = format!("{method} {path}");
    mock.requests.lock().expect("requests lock").push(RecordedRequest {
        method,
        path,
        query,
        authorization,
        content_type,
        body,
        multipart: multipart_entries,
    });

    let canned = mock.routes.lock().expect("routes lock").get(&key).cloned();
    let (status, body) = canned.unwrap_or((404, json!({"message": "Not Found"})));
    let status = StatusCode::from_u16(status).expect("valid status");
    (status, Json(body)).into_response()
}

pub fn user(id: i64) -> User {
    User {
        id,
        name: Some("Ann".to_string()),
        email: Some("ann@example.com".to_string()),
        profile: Map::new(),
    }
}

pub fn client_with(base_url: &str, storage: impl TokenStorage + 'static) -> SchedulerClient {
    SchedulerClient::connect(ClientConfig::with_base_url(base_url), storage)
        .expect("client should build")
}

pub fn anonymous_client(base_url: &str) -> SchedulerClient {
    client_with(base_url, MemoryTokenStorage::new())
}

/// Client whose session already holds a token and a user.
pub fn signed_in_client(base_url: &str) -> SchedulerClient {
    let client = anonymous_client(base_url);
    client
        .session()
        .establish("tok-signed", user(1))
        .expect("establish session");
    client
}
