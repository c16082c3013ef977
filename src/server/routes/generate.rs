//! Generation relay route.
//!
//! Accepts a `multipart/form-data` or JSON submission, persists uploaded files
//! to blob storage, normalizes everything into a [`GenerationRequest`] and
//! forwards it to the provider.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::GenRelayError;
use crate::image::{
    is_image_content_type, GenerationRequest, GenerationResult, ImageFormat, Mode, Resolution,
};
use crate::server::error::ServerError;
use crate::server::state::AppState;
use crate::storage::{object_name, BlobStore};

/// Register the generation route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/generate", post(generate))
}

/// Image generation (`POST /api/generate`).
///
/// Responds with `{ images, raw }` on success and `{ error }` otherwise.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<GenerationResult>, ServerError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("multipart/form-data"));

    let submission = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        Submission::from_multipart(multipart).await?
    } else {
        let Json(body) = Json::<GenerateBody>::from_request(request, &state)
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        Submission::from(body)
    };

    submission.check()?;
    let request = submission.resolve(state.blob_store.as_deref()).await?;

    debug!(
        mode = %request.mode,
        model = %request.model,
        size = %request.size,
        images = request.image_urls.len(),
        "relaying generation request"
    );

    let result = state.provider.generate(&request).await?;
    info!(images = result.images.len(), "generation relayed");
    Ok(Json(result))
}

/// JSON submission body.
///
/// Members are read loosely: a member of the wrong JSON type falls back to its
/// default rather than failing the request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateBody {
    mode: Option<Value>,
    prompt: Option<Value>,
    model: Option<Value>,
    size: Option<Value>,
    watermark: Option<Value>,
    image_urls: Option<Value>,
}

fn as_text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

/// `watermark` counts only as the bool `true` or the string "true".
fn is_flag_set(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim() == "true",
        _ => false,
    }
}

/// `imageUrls` may be one string or a list; entries that are not strings are skipped.
fn url_list(value: Option<Value>) -> Vec<String> {
    let items = match value {
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

/// An uploaded file awaiting persistence.
#[derive(Debug)]
struct Upload {
    file_name: String,
    content_type: String,
    data: Bytes,
}

/// Image sources in the order they were submitted.
#[derive(Debug)]
enum PendingSource {
    Url(String),
    File(Upload),
}

/// A parsed but not yet resolved submission.
#[derive(Debug, Default)]
struct Submission {
    mode: Mode,
    prompt: String,
    model: Option<String>,
    size: Resolution,
    watermark: bool,
    sources: Vec<PendingSource>,
}

impl From<GenerateBody> for Submission {
    fn from(body: GenerateBody) -> Self {
        Self {
            mode: as_text(body.mode.as_ref())
                .map(Mode::parse_lenient)
                .unwrap_or_default(),
            prompt: as_text(body.prompt.as_ref()).unwrap_or_default().to_string(),
            model: as_text(body.model.as_ref()).map(str::to_string),
            size: as_text(body.size.as_ref())
                .map(Resolution::parse_lenient)
                .unwrap_or_default(),
            watermark: is_flag_set(body.watermark.as_ref()),
            sources: url_list(body.image_urls)
                .into_iter()
                .map(PendingSource::Url)
                .collect(),
        }
    }
}

fn read_error(e: axum::extract::multipart::MultipartError) -> ServerError {
    ServerError::BadRequest(format!("invalid multipart body: {}", e.body_text()))
}

impl Submission {
    /// Reads multipart fields in arrival order, so URL and file parts keep
    /// their relative position.
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(read_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "mode" => submission.mode = Mode::parse_lenient(&field.text().await.map_err(read_error)?),
                "prompt" => submission.prompt = field.text().await.map_err(read_error)?,
                "model" => submission.model = Some(field.text().await.map_err(read_error)?),
                "size" => {
                    let size = field.text().await.map_err(read_error)?;
                    if !size.is_empty() {
                        submission.size = Resolution::parse_lenient(&size);
                    }
                }
                "watermark" => {
                    submission.watermark = field.text().await.map_err(read_error)?.trim() == "true"
                }
                "imageUrls" => {
                    let url = field.text().await.map_err(read_error)?;
                    let url = url.trim();
                    if !url.is_empty() {
                        submission.sources.push(PendingSource::Url(url.to_string()));
                    }
                }
                "files" => {
                    let Some(file_name) = field.file_name().map(str::to_string) else {
                        debug!("ignoring 'files' part without a file name");
                        continue;
                    };
                    let declared = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(read_error)?;
                    if data.is_empty() {
                        debug!(file_name = %file_name, "ignoring empty upload");
                        continue;
                    }
                    let content_type = upload_content_type(declared.as_deref(), &data)
                        .ok_or_else(|| {
                            ServerError::BadRequest(format!("'{file_name}' is not an image"))
                        })?;
                    submission.sources.push(PendingSource::File(Upload {
                        file_name,
                        content_type,
                        data,
                    }));
                }
                other => debug!(field = other, "ignoring unknown multipart field"),
            }
        }

        Ok(submission)
    }

    /// Rejects submissions that cannot succeed, before any upload happens.
    fn check(&self) -> crate::Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(GenRelayError::InvalidRequest("missing prompt".into()));
        }
        if self.mode.requires_images() && self.sources.is_empty() {
            return Err(GenRelayError::InvalidRequest(format!(
                "mode '{}' requires at least one image",
                self.mode
            )));
        }
        Ok(())
    }

    /// Uploads files and produces the normalized provider request.
    async fn resolve(self, store: Option<&dyn BlobStore>) -> Result<GenerationRequest, ServerError> {
        let mut urls = Vec::with_capacity(self.sources.len());
        let mut last_stamp = 0i64;

        for source in self.sources {
            match source {
                PendingSource::Url(url) => urls.push(url),
                PendingSource::File(upload) => {
                    let store = store.ok_or_else(|| {
                        ServerError::StorageNotConfigured("no blob store configured".into())
                    })?;
                    // Strictly increasing so same-named files never collide.
                    let stamp = chrono::Utc::now().timestamp_millis().max(last_stamp + 1);
                    last_stamp = stamp;

                    let name = object_name(&upload.file_name, stamp);
                    let url = store
                        .put(&name, upload.data.to_vec(), &upload.content_type)
                        .await
                        .map_err(|e| ServerError::StorageNotConfigured(e.to_string()))?;
                    debug!(store = store.kind(), url = %url, "upload stored");
                    urls.push(url);
                }
            }
        }

        let request = GenerationRequest::new(self.prompt)
            .with_mode(self.mode)
            .with_model(self.model.unwrap_or_default())
            .with_size(self.size)
            .with_watermark(self.watermark)
            .with_image_urls(urls);
        request.validate()?;
        Ok(request)
    }
}

/// Picks the content type for an upload, or `None` if it is not an image.
fn upload_content_type(declared: Option<&str>, data: &[u8]) -> Option<String> {
    match declared {
        Some(ct) if is_image_content_type(ct) => Some(ct.to_string()),
        _ => ImageFormat::from_magic_bytes(data).map(|f| f.mime_type().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing::{
        json_request, multipart_request, read_json, test_app, FakeProvider, MemoryBlobStore,
        Part, PNG,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn text_mode_builds_payload_without_images() {
        let provider = FakeProvider::returning(&["https://cdn/1.jpeg"]);
        let app = test_app(provider.clone(), None);

        let response = app
            .oneshot(json_request(json!({"mode": "text", "prompt": "a red cup", "size": "2K"})))
            .await
            .unwrap();
        let (status, body) = read_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["images"], json!(["https://cdn/1.jpeg"]));
        assert!(body.get("raw").is_some());

        let seen = provider.last_request().unwrap();
        assert_eq!(seen.mode, Mode::Text);
        assert!(seen.image_source().is_none());
        assert_eq!(seen.model, crate::image::DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn missing_prompt_is_400() {
        let provider = FakeProvider::returning(&[]);
        let app = test_app(provider.clone(), None);

        let response = app.oneshot(json_request(json!({"mode": "text"}))).await.unwrap();
        let (status, body) = read_json(response).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing prompt");
        assert!(provider.last_request().is_none());
    }

    #[tokio::test]
    async fn image_mode_without_sources_is_400() {
        let app = test_app(FakeProvider::returning(&[]), None);
        let response = app
            .oneshot(json_request(json!({"mode": "imgs", "prompt": "merge", "imageUrls": ["  "]})))
            .await
            .unwrap();
        let (status, _) = read_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_size_normalized_and_scalar_url_accepted() {
        let provider = FakeProvider::returning(&["https://cdn/1.jpeg"]);
        let app = test_app(provider.clone(), None);

        let response = app
            .oneshot(json_request(json!({
                "mode": "img",
                "prompt": "restyle",
                "size": "8K",
                "watermark": "true",
                "imageUrls": "https://example.com/a.png"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = provider.last_request().unwrap();
        assert_eq!(seen.size, Resolution::TwoK);
        assert!(seen.watermark);
        assert_eq!(seen.image_urls, vec!["https://example.com/a.png"]);
    }

    #[tokio::test]
    async fn mistyped_json_members_fall_back_to_defaults() {
        let provider = FakeProvider::returning(&["https://cdn/1.jpeg"]);
        let app = test_app(provider.clone(), None);

        let response = app
            .oneshot(json_request(json!({
                "mode": "imgs",
                "prompt": "merge",
                "size": 4,
                "watermark": 1,
                "model": false,
                "imageUrls": ["https://example.com/a.png", null, 7, " https://example.com/b.png "]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = provider.last_request().unwrap();
        assert_eq!(seen.mode, Mode::Multi);
        assert_eq!(seen.size, Resolution::TwoK);
        assert!(!seen.watermark);
        assert_eq!(seen.model, crate::DEFAULT_MODEL);
        assert_eq!(
            seen.image_urls,
            vec!["https://example.com/a.png", "https://example.com/b.png"]
        );
    }

    #[tokio::test]
    async fn null_image_url_entry_is_skipped() {
        let provider = FakeProvider::returning(&["https://cdn/1.jpeg"]);
        let app = test_app(provider.clone(), None);

        let response = app
            .oneshot(json_request(json!({
                "mode": "img",
                "prompt": "restyle",
                "imageUrls": ["https://example.com/a.png", null]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            provider.last_request().unwrap().image_urls,
            vec!["https://example.com/a.png"]
        );
    }

    #[tokio::test]
    async fn non_string_prompt_is_400() {
        let app = test_app(FakeProvider::returning(&[]), None);
        let response = app
            .oneshot(json_request(json!({"mode": "text", "prompt": 12})))
            .await
            .unwrap();
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn multipart_url_only_single_mode() {
        let provider = FakeProvider::returning(&["https://cdn/out.jpeg"]);
        let app = test_app(provider.clone(), None);

        let request = multipart_request(&[
            Part::text("mode", "img"),
            Part::text("prompt", "a red cup"),
            Part::text("size", "4K"),
            Part::text("imageUrls", "https://example.com/cup.png"),
        ]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = provider.last_request().unwrap();
        assert_eq!(seen.mode, Mode::Single);
        assert_eq!(seen.size, Resolution::FourK);
        assert!(!seen.watermark);
        assert_eq!(
            seen.image_source(),
            crate::image::ImageSource::Single("https://example.com/cup.png".into())
        );
    }

    #[tokio::test]
    async fn multipart_files_uploaded_in_submission_order() {
        let provider = FakeProvider::returning(&["https://cdn/out.jpeg"]);
        let store = MemoryBlobStore::new();
        let app = test_app(provider.clone(), Some(store.clone()));

        let request = multipart_request(&[
            Part::text("mode", "imgs"),
            Part::text("prompt", "merge them"),
            Part::file("files", "b.png", "image/png", PNG),
            Part::text("imageUrls", "https://example.com/a.png"),
            Part::file("files", "c.png", "application/octet-stream", PNG),
        ]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = provider.last_request().unwrap();
        assert_eq!(seen.image_urls.len(), 3);
        assert!(seen.image_urls[0].ends_with("-b.png"));
        assert_eq!(seen.image_urls[1], "https://example.com/a.png");
        assert!(seen.image_urls[2].ends_with("-c.png"));

        let stored = store.objects();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|(name, ct)| name.starts_with("uploads/") && ct == "image/png"));
    }

    #[tokio::test]
    async fn files_without_storage_is_501() {
        let provider = FakeProvider::returning(&[]);
        let app = test_app(provider.clone(), None);

        let request = multipart_request(&[
            Part::text("mode", "img"),
            Part::text("prompt", "restyle"),
            Part::file("files", "a.png", "image/png", PNG),
        ]);
        let response = app.oneshot(request).await.unwrap();
        let (status, body) = read_json(response).await;

        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert!(body["error"].as_str().unwrap().contains("imageUrls"));
        assert!(provider.last_request().is_none());
    }

    #[tokio::test]
    async fn failing_storage_is_501() {
        let app = test_app(
            FakeProvider::returning(&[]),
            Some(MemoryBlobStore::failing()),
        );
        let request = multipart_request(&[
            Part::text("mode", "img"),
            Part::text("prompt", "restyle"),
            Part::file("files", "a.png", "image/png", PNG),
        ]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn non_image_upload_is_400() {
        let app = test_app(FakeProvider::returning(&[]), Some(MemoryBlobStore::new()));
        let request = multipart_request(&[
            Part::text("mode", "img"),
            Part::text("prompt", "restyle"),
            Part::file("files", "notes.txt", "text/plain", b"just some plain text"),
        ]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn provider_failure_relayed_verbatim() {
        let provider = FakeProvider::failing(
            403,
            json!({"code": "InputTextSensitiveContentDetected", "message": "blocked"}),
        );
        let app = test_app(provider, None);

        let response = app
            .oneshot(json_request(json!({"prompt": "something"})))
            .await
            .unwrap();
        let (status, body) = read_json(response).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "InputTextSensitiveContentDetected");
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let app = test_app(FakeProvider::returning(&[]), None);
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let (status, body) = read_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[test]
    fn upload_content_type_prefers_declared_image_type() {
        assert_eq!(
            upload_content_type(Some("image/webp"), b"x").as_deref(),
            Some("image/webp")
        );
        assert_eq!(
            upload_content_type(Some("application/octet-stream"), PNG).as_deref(),
            Some("image/png")
        );
        assert!(upload_content_type(None, b"plain text body").is_none());
    }
}
