use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::{engine_debug, engine_error, engine_info};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::backend::{Backend, BackendSettings, ReqwestBackend};
use crate::filename::download_filename;
use crate::persist::AtomicFileWriter;
use crate::stream::{run_stream, EventSink, StreamControl, StreamSettings};
use crate::{
    BackendError, ConnectionId, DownloadedBody, DownloadedFile, EngineEvent, FailureKind,
    SubmitRequest,
};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub backend: BackendSettings,
    pub stream: StreamSettings,
    pub download_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            stream: StreamSettings::default(),
            download_dir: PathBuf::from("downloads"),
        }
    }
}

enum EngineCommand {
    Stream(StreamCommand),
    Request(BackendRequest),
}

enum StreamCommand {
    Open {
        connection_id: ConnectionId,
        request: SubmitRequest,
    },
    Stop { connection_id: ConnectionId },
    Close { connection_id: ConnectionId },
}

enum BackendRequest {
    History { thread_id: String },
    ChatList { user_id: String },
    Upload { path: PathBuf },
    Download { file_id: String },
}

/// Front door of the IO side. Commands run on a tokio runtime owned by a
/// background thread; results come back through the [`EventSink`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, sink: Arc<dyn EventSink>) -> Result<Self, BackendError> {
        let backend = Arc::new(ReqwestBackend::new(settings.backend.clone())?);
        Ok(Self::with_backend(backend, settings, sink))
    }

    pub fn with_backend(
        backend: Arc<dyn Backend>,
        settings: EngineSettings,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("Engine runtime failed to start: {}", err);
                    return;
                }
            };
            let writer = AtomicFileWriter::new(settings.download_dir.clone());
            let mut streams: HashMap<ConnectionId, UnboundedSender<StreamControl>> =
                HashMap::new();

            while let Ok(command) = cmd_rx.recv() {
                streams.retain(|_, control| !control.is_closed());
                match command {
                    EngineCommand::Stream(command) => {
                        handle_stream_command(&runtime, &settings.stream, &mut streams, command, &sink)
                    }
                    EngineCommand::Request(request) => {
                        let backend = backend.clone();
                        let writer = writer.clone();
                        let sink = sink.clone();
                        runtime.spawn(async move {
                            let event = handle_request(backend.as_ref(), &writer, request).await;
                            sink.emit(event);
                        });
                    }
                }
            }
            engine_info!("Engine command channel closed, shutting down");
        });

        Self { cmd_tx }
    }

    pub fn open_stream(&self, connection_id: ConnectionId, request: SubmitRequest) {
        self.send(EngineCommand::Stream(StreamCommand::Open {
            connection_id,
            request,
        }));
    }

    pub fn stop_stream(&self, connection_id: ConnectionId) {
        self.send(EngineCommand::Stream(StreamCommand::Stop { connection_id }));
    }

    pub fn close_stream(&self, connection_id: ConnectionId) {
        self.send(EngineCommand::Stream(StreamCommand::Close { connection_id }));
    }

    pub fn load_history(&self, thread_id: impl Into<String>) {
        self.send(EngineCommand::Request(BackendRequest::History {
            thread_id: thread_id.into(),
        }));
    }

    pub fn load_chat_list(&self, user_id: impl Into<String>) {
        self.send(EngineCommand::Request(BackendRequest::ChatList {
            user_id: user_id.into(),
        }));
    }

    pub fn upload(&self, path: impl Into<PathBuf>) {
        self.send(EngineCommand::Request(BackendRequest::Upload { path: path.into() }));
    }

    pub fn download(&self, file_id: impl Into<String>) {
        self.send(EngineCommand::Request(BackendRequest::Download {
            file_id: file_id.into(),
        }));
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_error!("Engine thread is gone; command dropped");
        }
    }
}

fn handle_stream_command(
    runtime: &tokio::runtime::Runtime,
    settings: &StreamSettings,
    streams: &mut HashMap<ConnectionId, UnboundedSender<StreamControl>>,
    command: StreamCommand,
    sink: &Arc<dyn EventSink>,
) {
    match command {
        StreamCommand::Open {
            connection_id,
            request,
        } => {
            let (control_tx, control_rx) = unbounded_channel();
            streams.insert(connection_id, control_tx);
            let settings = settings.clone();
            let sink = sink.clone();
            runtime.spawn(async move {
                run_stream(&settings, connection_id, request, control_rx, sink.as_ref()).await;
            });
        }
        StreamCommand::Stop { connection_id } => {
            let delivered = streams
                .get(&connection_id)
                .is_some_and(|control| control.send(StreamControl::Stop).is_ok());
            if !delivered {
                sink.emit(EngineEvent::StopFailed {
                    connection_id,
                    error: "connection is not open".to_string(),
                });
            }
        }
        StreamCommand::Close { connection_id } => match streams.remove(&connection_id) {
            Some(control) => {
                let _ = control.send(StreamControl::Close);
            }
            None => engine_debug!("Close of unknown stream {}", connection_id),
        },
    }
}

async fn handle_request(
    backend: &dyn Backend,
    writer: &AtomicFileWriter,
    request: BackendRequest,
) -> EngineEvent {
    match request {
        BackendRequest::History { thread_id } => {
            let result = backend.message_list(&thread_id).await;
            EngineEvent::HistoryFetched { thread_id, result }
        }
        BackendRequest::ChatList { user_id } => {
            let result = backend.chat_list(&user_id).await;
            EngineEvent::ChatListFetched { user_id, result }
        }
        BackendRequest::Upload { path } => {
            let name = display_name(&path);
            let result = upload(backend, &path, &name).await;
            EngineEvent::UploadFinished { name, result }
        }
        BackendRequest::Download { file_id } => {
            let result = download(backend, writer, &file_id).await;
            EngineEvent::DownloadFinished { file_id, result }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

async fn upload(backend: &dyn Backend, path: &Path, name: &str) -> Result<String, BackendError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| BackendError::new(FailureKind::Io, format!("{}: {err}", path.display())))?;
    engine_info!("Uploading {} ({} bytes)", name, bytes.len());
    backend.upload_file(name, bytes).await
}

async fn download(
    backend: &dyn Backend,
    writer: &AtomicFileWriter,
    file_id: &str,
) -> Result<DownloadedFile, BackendError> {
    let DownloadedBody {
        bytes,
        content_type,
        filename: announced,
    } = backend.download_file(file_id).await?;
    let filename = download_filename(announced.as_deref(), file_id);
    let byte_len = bytes.len() as u64;

    let writer = writer.clone();
    let path = tokio::task::spawn_blocking(move || writer.write(&filename, &bytes))
        .await
        .map_err(|err| BackendError::new(FailureKind::Io, err.to_string()))?
        .map_err(|err| BackendError::new(FailureKind::Io, err.to_string()))?;
    engine_info!("Downloaded {} to {}", file_id, path.display());

    Ok(DownloadedFile {
        path,
        byte_len,
        content_type,
    })
}
