use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type ConnectionId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Socket is up and the submission frame went out.
    StreamOpened { connection_id: ConnectionId },
    StreamFrame {
        connection_id: ConnectionId,
        payload: String,
    },
    /// Emitted exactly once per opened stream. `error` is set on transport failure.
    StreamClosed {
        connection_id: ConnectionId,
        error: Option<String>,
    },
    StopFailed {
        connection_id: ConnectionId,
        error: String,
    },
    HistoryFetched {
        thread_id: String,
        result: Result<Vec<serde_json::Value>, BackendError>,
    },
    ChatListFetched {
        user_id: String,
        result: Result<Vec<ChatListEntry>, BackendError>,
    },
    UploadFinished {
        name: String,
        result: Result<String, BackendError>,
    },
    DownloadFinished {
        file_id: String,
        result: Result<DownloadedFile, BackendError>,
    },
}

/// Opening frame of a stream connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub thread_id: String,
    pub request_id: String,
    pub user_id: String,
    pub text_input: String,
    pub file_id_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_org: Option<String>,
}

impl SubmitRequest {
    /// Builds a request with a freshly minted `request_id`.
    pub fn new(
        thread_id: impl Into<String>,
        user_id: impl Into<String>,
        text_input: impl Into<String>,
        file_id_list: Vec<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            request_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            text_input: text_input.into(),
            file_id_list,
            agent_name: None,
            agent_org: None,
        }
    }

    pub fn with_agent(mut self, name: Option<String>, organization: Option<String>) -> Self {
        self.agent_name = name;
        self.agent_org = organization;
        self
    }
}

/// Client to server directive asking the server to cancel the active run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopDirective {
    pub action: String,
}

impl StopDirective {
    pub fn stop() -> Self {
        Self {
            action: "stop".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatListEntry {
    pub thread_id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// Name announced by `Content-Disposition`, undecorated.
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub byte_len: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
    /// Body did not have the expected shape.
    Decode,
    /// Server answered with an explicit `error` field.
    Rejected,
    /// Local file could not be read or written.
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response body"),
            FailureKind::Rejected => write!(f, "rejected by server"),
            FailureKind::Io => write!(f, "file error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("could not encode frame: {0}")]
    Encode(String),
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
}
