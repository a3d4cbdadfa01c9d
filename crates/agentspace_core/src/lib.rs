//! Agentspace core: pure conversation state machine and view-model helpers.
mod effect;
mod event;
mod message;
mod msg;
mod state;
mod transcript;
mod update;
mod view_model;

pub use effect::{Effect, Submission};
pub use event::{EventKind, EventParseError, StreamEvent};
pub use message::{Message, Role, Source, TEXT_CONTENT};
pub use msg::Msg;
pub use state::{
    conversation_path, AgentTarget, AppState, Attachment, ChatSummary, ConnectionId,
    ConnectionSlot, PendingSubmission, RunState, TransferStatus, FAILURE_NOTICE,
};
pub use transcript::{Applied, Transcript};
pub use update::update;
pub use view_model::{group_messages, AppViewModel, ContentPart, MessageBlock};
