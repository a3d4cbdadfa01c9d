use crate::{AgentTarget, ChatSummary, ConnectionId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Conversation view mounted: a fresh thread, or a resumed one whose history must load.
    ConversationOpened {
        thread_id: String,
        resumed: bool,
        agent: Option<AgentTarget>,
    },
    /// User picked (or cleared) the agent the next submissions are addressed to.
    AgentSelected(Option<AgentTarget>),
    /// User submitted the input box.
    SubmitClicked { text: String },
    /// User asked to stop the active run.
    CancelClicked,
    /// Transport: socket is open and the submission frame went out.
    StreamOpened { connection_id: ConnectionId },
    /// Transport: one raw frame arrived.
    StreamFrame {
        connection_id: ConnectionId,
        payload: String,
    },
    /// Transport: the connection is gone. `error` is set for transport failures.
    StreamClosed {
        connection_id: ConnectionId,
        error: Option<String>,
    },
    /// Transport: the stop directive could not be sent.
    StopFailed {
        connection_id: ConnectionId,
        error: String,
    },
    /// Persisted history for a thread, oldest first.
    HistoryLoaded {
        thread_id: String,
        records: Vec<serde_json::Value>,
    },
    HistoryFailed { thread_id: String, error: String },
    ChatListLoaded(Vec<ChatSummary>),
    ChatListFailed(String),
    /// Identity provider signed the user in.
    LoggedIn { user_id: String },
    /// User dismissed the login prompt.
    LoginCancelled,
    LoggedOut,
    UploadRequested { path: String },
    FileUploaded { file_id: String, name: String },
    UploadFailed { name: String, error: String },
    AttachmentRemoved { file_id: String },
    DownloadRequested { file_id: String },
    FileDownloaded { file_id: String, path: String },
    DownloadFailed { file_id: String, error: String },
    /// Fallback for placeholder wiring.
    NoOp,
}
