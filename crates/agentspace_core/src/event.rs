use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Role, Source};

/// Event kinds the client acts on. Anything else on the wire is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TextMessageChunk,
    FileIdString,
    RunStarted,
    RunFinished,
    RunError,
    RunCancel,
    ChatListUpdated,
}

impl EventKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "TEXT_MESSAGE_CHUNK" => Some(Self::TextMessageChunk),
            "FILE_ID_STRING" => Some(Self::FileIdString),
            "RUN_STARTED" => Some(Self::RunStarted),
            "RUN_FINISHED" => Some(Self::RunFinished),
            "RUN_ERROR" => Some(Self::RunError),
            "RUN_CANCEL" => Some(Self::RunCancel),
            "CHAT_LIST_UPDATED" => Some(Self::ChatListUpdated),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextMessageChunk => "TEXT_MESSAGE_CHUNK",
            Self::FileIdString => "FILE_ID_STRING",
            Self::RunStarted => "RUN_STARTED",
            Self::RunFinished => "RUN_FINISHED",
            Self::RunError => "RUN_ERROR",
            Self::RunCancel => "RUN_CANCEL",
            Self::ChatListUpdated => "CHAT_LIST_UPDATED",
        }
    }
}

#[derive(Debug, Error)]
#[error("malformed event payload: {0}")]
pub struct EventParseError(#[from] serde_json::Error);

/// One server-pushed event (or one persisted history record).
///
/// Every field is optional on the wire; extra fields are tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl StreamEvent {
    pub fn parse(raw: &str) -> Result<Self, EventParseError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, EventParseError> {
        Ok(serde_json::from_value(value)?)
    }

    /// A missing role means the event came from the assistant side.
    pub fn role(&self) -> Role {
        match self.role.as_deref() {
            Some("user") => Role::User,
            _ => Role::Assistant,
        }
    }

    pub fn kind(&self) -> Option<EventKind> {
        self.event.as_deref().and_then(EventKind::parse)
    }

    pub fn source(&self) -> Option<Source> {
        self.source.as_deref().and_then(Source::from_tag)
    }

    pub fn is_from_agent(&self) -> bool {
        self.source() == Some(Source::Agent)
    }
}
