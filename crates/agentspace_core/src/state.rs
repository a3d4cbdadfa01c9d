use crate::view_model::{group_messages, AppViewModel};
use crate::Transcript;

/// Identifies one duplex connection opened for one submission.
pub type ConnectionId = u64;

/// Inline notice appended when the transport fails mid-run.
pub const FAILURE_NOTICE: &str = "Request failed, please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Finished,
    Errored,
    Cancelling,
    Cancelled,
}

impl RunState {
    /// Running or waiting for the server to confirm a cancellation.
    pub fn is_active(self) -> bool {
        matches!(self, RunState::Running | RunState::Cancelling)
    }
}

/// The live connection handle as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSlot {
    pub id: ConnectionId,
    /// The transport reported the socket open and the submission sent.
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTarget {
    pub name: String,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub thread_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_id: String,
    pub name: String,
}

/// A submission parked while the user signs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub agent: Option<AgentTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Uploading { name: String },
    Downloaded { file_id: String, path: String },
    DownloadFailed { file_id: String, error: String },
}

/// Address of a conversation that the backend knows about.
pub fn conversation_path(thread_id: &str) -> String {
    format!("/c/{thread_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    thread_id: String,
    address: String,
    agent: Option<AgentTarget>,
    loading: bool,
    transcript: Transcript,
    run: RunState,
    connection: Option<ConnectionSlot>,
    next_connection_id: ConnectionId,
    identity: Option<String>,
    chats: Vec<ChatSummary>,
    attachments: Vec<Attachment>,
    upload_error: Option<String>,
    pending: Option<PendingSubmission>,
    last_transfer: Option<TransferStatus>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            thread_id: String::new(),
            address: "/".to_string(),
            agent: None,
            loading: false,
            transcript: Transcript::new(),
            run: RunState::Idle,
            connection: None,
            next_connection_id: 1,
            identity: None,
            chats: Vec::new(),
            attachments: Vec::new(),
            upload_error: None,
            pending: None,
            last_transfer: None,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the identity restored from a previous session.
    pub fn with_identity(mut self, user_id: Option<String>) -> Self {
        self.identity = user_id.filter(|id| !id.is_empty());
        self
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            thread_id: self.thread_id.clone(),
            address: self.address.clone(),
            run: self.run,
            running: self.is_running(),
            cancelling: self.is_cancelling(),
            can_submit: self.can_submit(),
            can_cancel: self.can_cancel(),
            loading: self.loading,
            signed_in: self.identity.is_some(),
            login_pending: self.pending.is_some(),
            message_count: self.transcript.len(),
            blocks: group_messages(self.transcript.messages()),
            chats: self.chats.clone(),
            attachments: self.attachments.clone(),
            upload_error: self.upload_error.clone(),
            last_transfer: self.last_transfer.clone(),
            agent: self.agent.clone(),
            dirty: self.dirty,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn agent(&self) -> Option<&AgentTarget> {
        self.agent.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn run_state(&self) -> RunState {
        self.run
    }

    pub fn is_running(&self) -> bool {
        self.run.is_active()
    }

    pub fn is_cancelling(&self) -> bool {
        self.run == RunState::Cancelling
    }

    pub fn connection(&self) -> Option<ConnectionSlot> {
        self.connection
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn pending(&self) -> Option<&PendingSubmission> {
        self.pending.as_ref()
    }

    /// At most one run per connection: no new submission while a run is
    /// active, a connection is still open, or history is still loading.
    pub fn can_submit(&self) -> bool {
        !self.run.is_active() && self.connection.is_none() && !self.loading
    }

    /// Repeated cancel requests are disabled until the server resolves the first.
    pub fn can_cancel(&self) -> bool {
        self.run == RunState::Running
            || (self.connection.is_some() && self.run != RunState::Cancelling)
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub(crate) fn set_run(&mut self, run: RunState) {
        if self.run != run {
            self.run = run;
            self.dirty = true;
        }
    }

    /// Claims a fresh connection id for a new submission.
    pub(crate) fn open_connection(&mut self) -> ConnectionId {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        self.connection = Some(ConnectionSlot { id, ready: false });
        self.run = RunState::Idle;
        self.dirty = true;
        id
    }

    pub(crate) fn mark_connection_ready(&mut self, id: ConnectionId) -> bool {
        match self.connection.as_mut() {
            Some(slot) if slot.id == id => {
                slot.ready = true;
                true
            }
            _ => false,
        }
    }

    /// Whether `id` still names the live connection. Anything else is stale.
    pub(crate) fn is_current(&self, id: ConnectionId) -> bool {
        self.connection.is_some_and(|slot| slot.id == id)
    }

    pub(crate) fn take_connection(&mut self) -> Option<ConnectionSlot> {
        let slot = self.connection.take();
        if slot.is_some() {
            self.dirty = true;
        }
        slot
    }

    pub(crate) fn reset_conversation(
        &mut self,
        thread_id: String,
        address: String,
        agent: Option<AgentTarget>,
        loading: bool,
    ) {
        self.thread_id = thread_id;
        self.address = address;
        self.agent = agent;
        self.loading = loading;
        self.transcript.clear();
        self.run = RunState::Idle;
        self.attachments.clear();
        self.upload_error = None;
        self.pending = None;
        self.dirty = true;
    }

    pub(crate) fn finish_loading(&mut self) {
        self.loading = false;
        self.dirty = true;
    }

    pub(crate) fn set_address(&mut self, address: String) {
        self.address = address;
        self.dirty = true;
    }

    pub(crate) fn set_agent(&mut self, agent: Option<AgentTarget>) {
        self.agent = agent;
        self.dirty = true;
    }

    pub(crate) fn set_identity(&mut self, user_id: Option<String>) {
        self.identity = user_id;
        self.dirty = true;
    }

    pub(crate) fn set_chats(&mut self, chats: Vec<ChatSummary>) {
        self.chats = chats;
        self.dirty = true;
    }

    pub(crate) fn take_attachments(&mut self) -> Vec<Attachment> {
        if !self.attachments.is_empty() {
            self.dirty = true;
        }
        std::mem::take(&mut self.attachments)
    }

    pub(crate) fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
        self.upload_error = None;
        self.dirty = true;
    }

    pub(crate) fn remove_attachment(&mut self, file_id: &str) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.file_id != file_id);
        let removed = self.attachments.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub(crate) fn set_upload_error(&mut self, error: Option<String>) {
        self.upload_error = error;
        self.dirty = true;
    }

    pub(crate) fn set_pending(&mut self, pending: Option<PendingSubmission>) {
        self.pending = pending;
        self.dirty = true;
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingSubmission> {
        let pending = self.pending.take();
        if pending.is_some() {
            self.dirty = true;
        }
        pending
    }

    pub(crate) fn set_transfer(&mut self, status: Option<TransferStatus>) {
        self.last_transfer = status;
        self.dirty = true;
    }
}
