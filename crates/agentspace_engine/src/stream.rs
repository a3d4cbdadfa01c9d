use std::sync::mpsc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn, preview, PREVIEW_CHARS};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::Message;

use crate::{ConnectionId, EngineEvent, StopDirective, StreamError, SubmitRequest};

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub url: String,
    pub connect_timeout: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5001/agent-space/agent_space_chat_stream".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Receives everything the engine reports.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Instructions for a live stream, delivered by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    /// Send the stop directive and keep reading until the server closes.
    Stop,
    /// Close the socket now; nothing else is sent.
    Close,
}

/// Drives one connection from connect to close.
///
/// Sends `request` as the first frame, then forwards every text frame in
/// arrival order. `StreamClosed` is emitted exactly once, whatever happens.
/// Dropping every sender of `control` counts as [`StreamControl::Close`].
pub async fn run_stream(
    settings: &StreamSettings,
    connection_id: ConnectionId,
    request: SubmitRequest,
    control: UnboundedReceiver<StreamControl>,
    sink: &dyn EventSink,
) {
    let error = drive(settings, connection_id, request, control, sink)
        .await
        .err();
    match &error {
        Some(err) => engine_warn!("Stream {} ended with error: {}", connection_id, err),
        None => engine_info!("Stream {} closed", connection_id),
    }
    sink.emit(EngineEvent::StreamClosed {
        connection_id,
        error: error.map(|err| err.to_string()),
    });
}

async fn drive(
    settings: &StreamSettings,
    connection_id: ConnectionId,
    request: SubmitRequest,
    mut control: UnboundedReceiver<StreamControl>,
    sink: &dyn EventSink,
) -> Result<(), StreamError> {
    let opening = serde_json::to_string(&request).map_err(|e| StreamError::Encode(e.to_string()))?;

    engine_debug!("Stream {} connecting to {}", connection_id, settings.url);
    let connect = tokio_tungstenite::connect_async(settings.url.as_str());
    let (socket, _response) = tokio::time::timeout(settings.connect_timeout, connect)
        .await
        .map_err(|_| StreamError::ConnectTimeout(settings.connect_timeout))?
        .map_err(|e| StreamError::Connect(e.to_string()))?;
    let (mut writer, mut reader) = socket.split();

    writer
        .send(Message::Text(opening.into()))
        .await
        .map_err(|e| StreamError::Send(e.to_string()))?;
    engine_info!(
        "Stream {} open, request {} submitted",
        connection_id,
        request.request_id
    );
    sink.emit(EngineEvent::StreamOpened { connection_id });

    loop {
        tokio::select! {
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let payload = text.to_string();
                    engine_trace!("Stream {} <- {}", connection_id, preview(&payload, PREVIEW_CHARS));
                    sink.emit(EngineEvent::StreamFrame { connection_id, payload });
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(payload) => sink.emit(EngineEvent::StreamFrame { connection_id, payload }),
                    Err(_) => engine_warn!("Stream {}: dropping non-UTF-8 binary frame", connection_id),
                },
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(StreamError::Receive(err.to_string())),
            },
            command = control.recv() => match command {
                Some(StreamControl::Stop) => {
                    if let Err(err) = send_stop(&mut writer).await {
                        engine_warn!("Stream {}: {}", connection_id, err);
                        sink.emit(EngineEvent::StopFailed {
                            connection_id,
                            error: err.to_string(),
                        });
                    }
                }
                Some(StreamControl::Close) | None => {
                    if let Err(err) = writer.close().await {
                        engine_debug!("Stream {}: close handshake failed: {}", connection_id, err);
                    }
                    return Ok(());
                }
            },
        }
    }
}

async fn send_stop<S>(writer: &mut S) -> Result<(), StreamError>
where
    S: futures_util::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let directive = serde_json::to_string(&StopDirective::stop())
        .map_err(|e| StreamError::Encode(e.to_string()))?;
    writer
        .send(Message::Text(directive.into()))
        .await
        .map_err(|e| StreamError::Send(e.to_string()))
}
