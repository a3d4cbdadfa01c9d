use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::filename::disposition_filename;
use crate::{BackendError, ChatListEntry, DownloadedBody, FailureKind};

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_download_bytes: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5001".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_download_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Request/response side of the backend.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Persisted events of a thread, oldest first, as raw JSON records.
    async fn message_list(&self, thread_id: &str) -> Result<Vec<serde_json::Value>, BackendError>;

    async fn chat_list(&self, user_id: &str) -> Result<Vec<ChatListEntry>, BackendError>;

    /// Returns the id the server assigned to the file.
    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<String, BackendError>;

    async fn download_file(&self, file_id: &str) -> Result<DownloadedBody, BackendError>;
}

#[derive(Debug, Default, Deserialize)]
struct UploadReply {
    #[serde(default)]
    file_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: BackendSettings,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| BackendError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    /// `{base_url}/agent-space/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.settings.base_url)
            .map_err(|err| BackendError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| BackendError::new(FailureKind::InvalidUrl, "base url cannot carry a path"))?
            .pop_if_empty()
            .push("agent-space")
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, BackendError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| BackendError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    async fn message_list(&self, thread_id: &str) -> Result<Vec<serde_json::Value>, BackendError> {
        let url = self.endpoint(&["get_message_list", thread_id])?;
        self.get_json(url).await
    }

    async fn chat_list(&self, user_id: &str) -> Result<Vec<ChatListEntry>, BackendError> {
        let url = self.endpoint(&["get_chat_list", user_id])?;
        self.get_json(url).await
    }

    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<String, BackendError> {
        let url = self.endpoint(&["upload_file"])?;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let reply: UploadReply = serde_json::from_slice(&body).unwrap_or_default();

        if let Some(error) = reply.error.filter(|error| !error.is_empty()) {
            let kind = if status.is_success() {
                FailureKind::Rejected
            } else {
                FailureKind::HttpStatus(status.as_u16())
            };
            return Err(BackendError::new(kind, error));
        }
        if !status.is_success() {
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        reply
            .file_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BackendError::new(FailureKind::Decode, "reply carries no file_id"))
    }

    async fn download_file(&self, file_id: &str) -> Result<DownloadedBody, BackendError> {
        let url = self.endpoint(&["download_file", file_id])?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_download_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(BackendError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "download too large",
                ));
            }
        }

        let headers = response.headers();
        let content_type = header_text(headers, CONTENT_TYPE);
        let filename = header_text(headers, CONTENT_DISPOSITION)
            .as_deref()
            .and_then(disposition_filename);

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(BackendError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "download too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(DownloadedBody {
            bytes,
            content_type,
            filename,
        })
    }
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        return BackendError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return BackendError::new(FailureKind::Decode, err.to_string());
    }
    BackendError::new(FailureKind::Network, err.to_string())
}
