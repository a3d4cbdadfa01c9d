use crate::{
    AgentTarget, Attachment, ChatSummary, Message, Role, RunState, Source, TransferStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub thread_id: String,
    pub address: String,
    pub run: RunState,
    pub running: bool,
    pub cancelling: bool,
    pub can_submit: bool,
    pub can_cancel: bool,
    pub loading: bool,
    pub signed_in: bool,
    pub login_pending: bool,
    pub message_count: usize,
    pub blocks: Vec<MessageBlock>,
    pub chats: Vec<ChatSummary>,
    pub attachments: Vec<Attachment>,
    pub upload_error: Option<String>,
    pub last_transfer: Option<TransferStatus>,
    pub agent: Option<AgentTarget>,
    pub dirty: bool,
}

/// One rendered bubble. Built at read time; the stored transcript keeps
/// every entry separate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBlock {
    User {
        text: String,
        /// Attachment the user sent, as stored in history.
        file_id: Option<String>,
    },
    /// Consecutive entries of one delegated agent under a single header.
    AgentGroup {
        agent_id: String,
        provider_url: Option<String>,
        parts: Vec<ContentPart>,
    },
    Assistant {
        source: Option<Source>,
        text: Option<String>,
        file_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    File(String),
}

/// Folds consecutive assistant entries of the same agent into one block,
/// keeping text and file parts in arrival order.
pub fn group_messages(messages: &[Message]) -> Vec<MessageBlock> {
    let mut blocks = Vec::new();
    let mut index = 0;

    while index < messages.len() {
        let current = &messages[index];

        if current.role == Role::User {
            blocks.push(MessageBlock::User {
                text: current.content.clone().unwrap_or_default(),
                file_id: current.file_id.clone(),
            });
            index += 1;
            continue;
        }

        let agent_id = current
            .agent_id
            .as_deref()
            .filter(|id| !id.is_empty() && current.source == Some(Source::Agent));
        let Some(agent_id) = agent_id else {
            blocks.push(MessageBlock::Assistant {
                source: current.source.clone(),
                text: current.content.clone(),
                file_id: current.file_id.clone(),
            });
            index += 1;
            continue;
        };

        let mut parts = Vec::new();
        let mut end = index;
        while let Some(next) = messages.get(end) {
            if !(next.is_assistant_from(&Source::Agent) && next.agent_id.as_deref() == Some(agent_id))
            {
                break;
            }
            if let Some(text) = next.content.as_deref().filter(|text| !text.is_empty()) {
                parts.push(ContentPart::Text(text.to_string()));
            }
            if let Some(file_id) = next.file_id.as_deref().filter(|id| !id.is_empty()) {
                parts.push(ContentPart::File(file_id.to_string()));
            }
            end += 1;
        }

        blocks.push(MessageBlock::AgentGroup {
            agent_id: agent_id.to_string(),
            provider_url: current.provider_url.clone(),
            parts,
        });
        index = end;
    }

    blocks
}
