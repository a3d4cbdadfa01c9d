//! Agentspace engine: backend client, stream transport and file persistence.
mod backend;
mod engine;
mod filename;
mod persist;
mod stream;
mod types;

pub use backend::{Backend, BackendSettings, ReqwestBackend};
pub use engine::{EngineHandle, EngineSettings};
pub use filename::{disposition_filename, download_filename};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use stream::{run_stream, ChannelEventSink, EventSink, StreamControl, StreamSettings};
pub use types::{
    BackendError, ChatListEntry, ConnectionId, DownloadedBody, DownloadedFile, EngineEvent,
    FailureKind, StopDirective, StreamError, SubmitRequest,
};
