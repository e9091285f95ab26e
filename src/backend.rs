use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::BackendConfig;

/// Body of every backend reply. Exactly one field is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotesResponse {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
    style: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoRequest<'a> {
    video_url: &'a str,
    style: &'a str,
}

/// Transport-level failures. The `Display` text is what gets classified.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0}")]
    Transport(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Image payload for the multipart contract.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// The three request contracts of the note-generation service.
#[async_trait]
pub trait NotesBackend: Send + Sync {
    async fn generate_from_text(&self, text: &str, style: &str) -> Result<NotesResponse, BackendError>;

    async fn generate_from_image(&self, image: ImagePayload, style: &str) -> Result<NotesResponse, BackendError>;

    async fn generate_from_video(&self, video_url: &str, style: &str) -> Result<NotesResponse, BackendError>;
}

pub struct HttpBackend {
    client: Client,
    text_url: String,
    image_url: String,
    video_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let mut builder = ClientBuilder::new().connect_timeout(Duration::from_secs(10));
        // No overall deadline unless configured; the transport default applies.
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(cookie) = &config.session_cookie {
            let mut headers = HeaderMap::new();
            let value = HeaderValue::from_str(cookie).context("Session cookie is not a valid header value")?;
            headers.insert(COOKIE, value);
            builder = builder.default_headers(headers);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            text_url: format!("{}{}", base, config.text_path),
            image_url: format!("{}{}", base, config.image_path),
            video_url: format!("{}{}", base, config.video_path),
        })
    }

    async fn exchange(&self, request: RequestBuilder) -> Result<NotesResponse, BackendError> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                BackendError::Transport(format!("Failed to connect to notes service: {}", e))
            } else if e.is_timeout() {
                BackendError::Transport(format!("Request to notes service timed out: {}", e))
            } else {
                BackendError::Transport(format!("Failed to send request: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "notes service returned an error status");
            return Err(BackendError::Status(status.as_u16()));
        }

        response
            .json::<NotesResponse>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl NotesBackend for HttpBackend {
    async fn generate_from_text(&self, text: &str, style: &str) -> Result<NotesResponse, BackendError> {
        debug!(url = %self.text_url, style, chars = text.len(), "requesting notes from text");
        let body = TextRequest {
            text,
            style,
            kind: "text",
        };
        self.exchange(self.client.post(&self.text_url).json(&body)).await
    }

    async fn generate_from_image(&self, image: ImagePayload, style: &str) -> Result<NotesResponse, BackendError> {
        debug!(url = %self.image_url, style, bytes = image.bytes.len(), "requesting notes from image");
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.mime)
            .map_err(|e| BackendError::Transport(format!("Invalid image type: {}", e)))?;
        let form = Form::new().part("image", part).text("style", style.to_string());
        self.exchange(self.client.post(&self.image_url).multipart(form)).await
    }

    async fn generate_from_video(&self, video_url: &str, style: &str) -> Result<NotesResponse, BackendError> {
        debug!(url = %self.video_url, style, video_url, "requesting notes from video");
        let body = VideoRequest { video_url, style };
        self.exchange(self.client.post(&self.video_url).json(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Multipart;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn text_route(headers: AxumHeaders, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let cookie = headers
            .get("cookie")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        match body["text"].as_str() {
            Some("fail") => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"}))),
            Some("refuse") => (StatusCode::OK, Json(json!({"error": "No text provided"}))),
            _ => (
                StatusCode::OK,
                Json(json!({
                    "notes": format!(
                        "{}|{}|{}|{}",
                        body["text"].as_str().unwrap_or(""),
                        body["style"].as_str().unwrap_or(""),
                        body["type"].as_str().unwrap_or(""),
                        cookie
                    )
                })),
            ),
        }
    }

    async fn image_route(mut multipart: Multipart) -> Json<Value> {
        let mut summary = Vec::new();
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.unwrap_or_default();
            match name.as_str() {
                "image" => summary.push(format!(
                    "image:{}:{}:{}",
                    file_name.unwrap_or_default(),
                    content_type.unwrap_or_default(),
                    data.len()
                )),
                other => summary.push(format!("{}:{}", other, String::from_utf8_lossy(&data))),
            }
        }
        Json(json!({ "notes": summary.join(",") }))
    }

    async fn video_route(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({
            "notes": format!(
                "{}|{}",
                body["videoUrl"].as_str().unwrap_or("missing"),
                body["style"].as_str().unwrap_or("")
            )
        }))
    }

    async fn garbage_route() -> &'static str {
        "<html>not json</html>"
    }

    async fn serve() -> String {
        let app = Router::new()
            .route("/generate-notes", post(text_route))
            .route("/generate-notes-from-image", post(image_route))
            .route("/generate-notes-from-video", post(video_route))
            .route("/garbage/generate-notes", post(garbage_route));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn backend(base_url: &str) -> HttpBackend {
        let config = BackendConfig {
            base_url: base_url.to_string(),
            ..BackendConfig::default()
        };
        HttpBackend::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_text_contract() {
        let base = serve().await;
        let response = backend(&base)
            .generate_from_text("explain TCP", "concise")
            .await
            .unwrap();
        assert_eq!(response.notes.as_deref(), Some("explain TCP|concise|text|"));
        assert_eq!(response.error, None);
    }

    #[tokio::test]
    async fn test_session_cookie_is_sent() {
        let base = serve().await;
        let config = BackendConfig {
            base_url: base,
            session_cookie: Some("session=abc".to_string()),
            ..BackendConfig::default()
        };
        let response = HttpBackend::new(&config)
            .unwrap()
            .generate_from_text("hi", "visual")
            .await
            .unwrap();
        assert_eq!(response.notes.as_deref(), Some("hi|visual|text|session=abc"));
    }

    #[tokio::test]
    async fn test_structural_error_field() {
        let base = serve().await;
        let response = backend(&base).generate_from_text("refuse", "concise").await.unwrap();
        assert_eq!(response.error.as_deref(), Some("No text provided"));
        assert_eq!(response.notes, None);
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_failure() {
        let base = serve().await;
        let err = backend(&base).generate_from_text("fail", "concise").await.unwrap_err();
        assert!(matches!(err, BackendError::Status(500)));
        assert_eq!(err.to_string(), "HTTP error! status: 500");
    }

    #[tokio::test]
    async fn test_image_contract() {
        let base = serve().await;
        let image = ImagePayload {
            file_name: "board.png".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![1, 2, 3, 4, 5],
        };
        let response = backend(&base).generate_from_image(image, "detailed").await.unwrap();
        assert_eq!(
            response.notes.as_deref(),
            Some("image:board.png:image/png:5,style:detailed")
        );
    }

    #[tokio::test]
    async fn test_video_contract() {
        let base = serve().await;
        let response = backend(&base)
            .generate_from_video("https://youtu.be/dQw4w9WgXcQ", "concise")
            .await
            .unwrap();
        assert_eq!(
            response.notes.as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ|concise")
        );
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let base = serve().await;
        let err = backend(&format!("{}/garbage", base))
            .generate_from_text("x", "concise")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = backend(&format!("http://{}", addr))
            .generate_from_text("x", "concise")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
