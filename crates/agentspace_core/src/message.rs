use crate::{EventKind, StreamEvent};

/// Content type that allows agent chunks to coalesce.
pub const TEXT_CONTENT: &str = "text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Emitter of an assistant message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A delegated agent; messages also carry `agent_id`.
    Agent,
    /// The platform itself.
    Platform,
    /// Any other tag, kept verbatim for replay fidelity.
    Other(String),
}

impl Source {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "" => None,
            "agent" => Some(Self::Agent),
            "platform" => Some(Self::Platform),
            other => Some(Self::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Agent => "agent",
            Self::Platform => "platform",
            Self::Other(tag) => tag,
        }
    }
}

/// One displayable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub source: Option<Source>,
    pub agent_id: Option<String>,
    pub provider_url: Option<String>,
    pub content_type: Option<String>,
    pub content: Option<String>,
    pub file_id: Option<String>,
}

impl Message {
    /// Local echo of a submission.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            source: None,
            agent_id: None,
            provider_url: None,
            content_type: Some(TEXT_CONTENT.to_string()),
            content: Some(text.into()),
            file_id: None,
        }
    }

    /// Synthetic assistant-visible notice. Carries no source so nothing coalesces into it.
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            source: None,
            agent_id: None,
            provider_url: None,
            content_type: Some(TEXT_CONTENT.to_string()),
            content: Some(text.into()),
            file_id: None,
        }
    }

    /// A user record; an attachment reference arrives as `FILE_ID_STRING`.
    pub(crate) fn user_from_event(event: &StreamEvent) -> Self {
        let is_file = event.kind() == Some(EventKind::FileIdString);
        Self {
            role: Role::User,
            source: None,
            agent_id: None,
            provider_url: None,
            content_type: event.content_type.clone(),
            content: if is_file { None } else { event.content.clone() },
            file_id: if is_file { event.content.clone() } else { None },
        }
    }

    pub(crate) fn text_from_event(event: &StreamEvent) -> Self {
        Self {
            role: event.role(),
            source: event.source(),
            agent_id: event.agent_id.clone(),
            provider_url: event.provider_url.clone(),
            content_type: event.content_type.clone(),
            content: event.content.clone(),
            file_id: None,
        }
    }

    /// The file reference travels in the event's `content` field.
    pub(crate) fn file_from_event(event: &StreamEvent) -> Self {
        Self {
            role: event.role(),
            source: event.source(),
            agent_id: event.agent_id.clone(),
            provider_url: event.provider_url.clone(),
            content_type: event.content_type.clone(),
            content: None,
            file_id: event.content.clone(),
        }
    }

    pub fn is_assistant_from(&self, source: &Source) -> bool {
        self.role == Role::Assistant && self.source.as_ref() == Some(source)
    }

    pub fn has_text_content(&self) -> bool {
        self.content_type.as_deref() == Some(TEXT_CONTENT)
    }

    pub(crate) fn append_content(&mut self, fragment: Option<&str>) {
        let Some(fragment) = fragment else {
            return;
        };
        self.content
            .get_or_insert_with(String::new)
            .push_str(fragment);
    }
}
