//! In-memory fakes and request helpers for router tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};

use crate::error::{GenRelayError, Result};
use crate::image::{GenerationRequest, GenerationResult, ImageProvider, ImageProviderKind};
use crate::server::config::Config;
use crate::server::state::AppState;
use crate::storage::BlobStore;

/// Smallest byte string recognized as PNG.
pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

const BOUNDARY: &str = "genrelay-test-boundary";

/// Provider that records requests and answers from a script.
#[derive(Clone)]
pub struct FakeProvider {
    outcome: Arc<std::result::Result<Vec<String>, (u16, Value)>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl FakeProvider {
    pub fn returning(urls: &[&str]) -> Self {
        Self {
            outcome: Arc::new(Ok(urls.iter().map(|u| u.to_string()).collect())),
            requests: Arc::default(),
        }
    }

    pub fn failing(status: u16, body: Value) -> Self {
        Self {
            outcome: Arc::new(Err((status, body))),
            requests: Arc::default(),
        }
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ImageProvider for FakeProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        request.validate()?;
        self.requests.lock().unwrap().push(request.clone());
        match self.outcome.as_ref() {
            Ok(urls) => Ok(GenerationResult {
                images: urls.clone(),
                raw: json!({ "data": urls.iter().map(|u| json!({ "url": u })).collect::<Vec<_>>() }),
            }),
            Err((status, body)) => Err(GenRelayError::Provider {
                status: *status,
                body: body.clone(),
            }),
        }
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Ark
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Blob store keeping object names and content types in memory.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn objects(&self) -> Vec<(String, String)> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, name: &str, _data: Vec<u8>, content_type: &str) -> Result<String> {
        if self.fail {
            return Err(GenRelayError::Api {
                status: 403,
                message: "store rejected token".into(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .push((name.to_string(), content_type.to_string()));
        Ok(format!("https://blob.test/{name}"))
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

pub fn test_app(provider: FakeProvider, store: Option<MemoryBlobStore>) -> Router {
    let store: Option<Arc<dyn BlobStore>> = store.map(|s| Arc::new(s) as Arc<dyn BlobStore>);
    let state = AppState::new(Config::default(), Arc::new(provider), store);
    crate::server::build(Arc::new(state))
}

pub fn json_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// One multipart part.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self::Text(name, value)
    }

    pub fn file(name: &'a str, file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self::File {
            name,
            file_name,
            content_type,
            data,
        }
    }
}

pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
