use crate::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a duplex connection and send the submission once it is up.
    OpenStream {
        connection_id: ConnectionId,
        submission: Submission,
    },
    /// Send the stop directive on an open connection.
    SendStop { connection_id: ConnectionId },
    /// Tear down a connection; nothing further is sent on it.
    CloseStream { connection_id: ConnectionId },
    LoadHistory { thread_id: String },
    RefreshChatList { user_id: String },
    /// Rewrite the visible address without navigating.
    ReplaceAddress { path: String },
    RequestLogin,
    /// Hand an abandoned draft back to the input.
    RestoreDraft { text: String, file_ids: Vec<String> },
    /// Remember who is signed in across restarts.
    PersistIdentity { user_id: Option<String> },
    UploadFile { path: String },
    DownloadFile { file_id: String },
}

/// Everything the transport needs to build the opening frame, minus the
/// per-request token, which is minted where the frame is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub thread_id: String,
    pub user_id: String,
    pub text_input: String,
    pub file_id_list: Vec<String>,
    pub agent_name: Option<String>,
    pub agent_org: Option<String>,
}
