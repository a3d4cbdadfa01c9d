use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};

use crate::{
    conversation_path, AgentTarget, AppState, Attachment, ConnectionId, Effect, EventKind, Msg,
    PendingSubmission, RunState, StreamEvent, Submission, TransferStatus, FAILURE_NOTICE,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ConversationOpened {
            thread_id,
            resumed,
            agent,
        } => open_conversation(&mut state, thread_id, resumed, agent),
        Msg::AgentSelected(agent) => {
            state.set_agent(agent);
            Vec::new()
        }
        Msg::SubmitClicked { text } => submit_clicked(&mut state, &text),
        Msg::CancelClicked => cancel_clicked(&mut state),
        Msg::StreamOpened { connection_id } => {
            if !state.mark_connection_ready(connection_id) {
                engine_debug!("Ignoring open of stale connection {}", connection_id);
            }
            Vec::new()
        }
        Msg::StreamFrame {
            connection_id,
            payload,
        } => stream_frame(&mut state, connection_id, &payload),
        Msg::StreamClosed {
            connection_id,
            error,
        } => stream_closed(&mut state, connection_id, error),
        Msg::StopFailed {
            connection_id,
            error,
        } => {
            if !state.is_current(connection_id) {
                return (state, Vec::new());
            }
            engine_warn!(
                "Stop directive failed on connection {}: {}",
                connection_id,
                error
            );
            state.take_connection();
            state.set_run(RunState::Idle);
            vec![Effect::CloseStream { connection_id }]
        }
        Msg::HistoryLoaded { thread_id, records } => {
            history_loaded(&mut state, &thread_id, records);
            Vec::new()
        }
        Msg::HistoryFailed { thread_id, error } => {
            if thread_id == state.thread_id() {
                engine_error!("Failed to load history for thread {}: {}", thread_id, error);
                state.transcript_mut().clear();
                state.finish_loading();
            }
            Vec::new()
        }
        Msg::ChatListLoaded(chats) => {
            state.set_chats(chats);
            Vec::new()
        }
        Msg::ChatListFailed(error) => {
            engine_warn!("Failed to refresh chat list: {}", error);
            Vec::new()
        }
        Msg::LoggedIn { user_id } => logged_in(&mut state, user_id),
        Msg::LoginCancelled => login_cancelled(&mut state),
        Msg::LoggedOut => {
            state.set_identity(None);
            state.set_chats(Vec::new());
            state.set_pending(None);
            vec![Effect::PersistIdentity { user_id: None }]
        }
        Msg::UploadRequested { path } => {
            state.set_transfer(Some(TransferStatus::Uploading { name: path.clone() }));
            vec![Effect::UploadFile { path }]
        }
        Msg::FileUploaded { file_id, name } => {
            state.add_attachment(Attachment { file_id, name });
            state.set_transfer(None);
            Vec::new()
        }
        Msg::UploadFailed { name, error } => {
            engine_warn!("Upload of {} failed: {}", name, error);
            state.set_upload_error(Some(format!("{name}: {error}")));
            state.set_transfer(None);
            Vec::new()
        }
        Msg::AttachmentRemoved { file_id } => {
            state.remove_attachment(&file_id);
            Vec::new()
        }
        Msg::DownloadRequested { file_id } => vec![Effect::DownloadFile { file_id }],
        Msg::FileDownloaded { file_id, path } => {
            state.set_transfer(Some(TransferStatus::Downloaded { file_id, path }));
            Vec::new()
        }
        Msg::DownloadFailed { file_id, error } => {
            state.set_transfer(Some(TransferStatus::DownloadFailed { file_id, error }));
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn open_conversation(
    state: &mut AppState,
    thread_id: String,
    resumed: bool,
    agent: Option<AgentTarget>,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    if let Some(slot) = state.take_connection() {
        effects.push(Effect::CloseStream {
            connection_id: slot.id,
        });
    }

    let address = if resumed {
        conversation_path(&thread_id)
    } else {
        "/".to_string()
    };
    state.reset_conversation(thread_id.clone(), address, agent, resumed);

    if resumed {
        effects.push(Effect::LoadHistory { thread_id });
    }
    if let Some(user_id) = state.identity() {
        effects.push(Effect::RefreshChatList {
            user_id: user_id.to_string(),
        });
    }
    effects
}

fn submit_clicked(state: &mut AppState, text: &str) -> Vec<Effect> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if state.thread_id().is_empty() {
        engine_warn!("Submission ignored: no conversation is open");
        return Vec::new();
    }
    if !state.can_submit() {
        engine_debug!("Submission ignored while a run is in flight");
        return Vec::new();
    }

    let pending = PendingSubmission {
        text: text.to_string(),
        attachments: state.take_attachments(),
        agent: state.agent().cloned(),
    };

    match state.identity() {
        Some(user_id) => {
            let user_id = user_id.to_string();
            submit(state, user_id, pending)
        }
        None => {
            let mut pending = pending;
            // A newer draft replaces the parked text but keeps its files.
            if let Some(earlier) = state.take_pending() {
                engine_info!("Parked draft replaced, keeping its attachments");
                let mut attachments = earlier.attachments;
                for attachment in pending.attachments {
                    if !attachments.iter().any(|a| a.file_id == attachment.file_id) {
                        attachments.push(attachment);
                    }
                }
                pending.attachments = attachments;
            }
            engine_info!("Submission parked until sign-in");
            state.set_pending(Some(pending));
            vec![Effect::RequestLogin]
        }
    }
}

fn submit(state: &mut AppState, user_id: String, pending: PendingSubmission) -> Vec<Effect> {
    state.transcript_mut().push_user(pending.text.clone());
    let connection_id = state.open_connection();

    let (agent_name, agent_org) = match pending.agent {
        Some(agent) => (Some(agent.name), agent.organization),
        None => (None, None),
    };
    let submission = Submission {
        thread_id: state.thread_id().to_string(),
        user_id,
        text_input: pending.text,
        file_id_list: pending
            .attachments
            .into_iter()
            .map(|attachment| attachment.file_id)
            .collect(),
        agent_name,
        agent_org,
    };

    vec![Effect::OpenStream {
        connection_id,
        submission,
    }]
}

fn cancel_clicked(state: &mut AppState) -> Vec<Effect> {
    if state.is_cancelling() {
        return Vec::new();
    }

    match state.connection() {
        Some(slot) if slot.ready => {
            state.set_run(RunState::Cancelling);
            vec![Effect::SendStop {
                connection_id: slot.id,
            }]
        }
        slot => {
            engine_info!("No open connection to stop; resetting run state");
            state.take_connection();
            state.set_run(RunState::Idle);
            slot.map(|slot| Effect::CloseStream {
                connection_id: slot.id,
            })
            .into_iter()
            .collect()
        }
    }
}

fn stream_frame(state: &mut AppState, connection_id: ConnectionId, payload: &str) -> Vec<Effect> {
    if !state.is_current(connection_id) {
        engine_debug!("Dropping frame from stale connection {}", connection_id);
        return Vec::new();
    }

    let event = match StreamEvent::parse(payload) {
        Ok(event) => event,
        Err(err) => {
            engine_warn!("Connection {}: {}", connection_id, err);
            return Vec::new();
        }
    };
    let Some(kind) = event.kind() else {
        engine_debug!("Ignoring unrecognized event {:?}", event.event);
        return Vec::new();
    };

    match kind {
        EventKind::RunCancel => finish_run(state, connection_id, RunState::Cancelled),
        EventKind::RunFinished => finish_run(state, connection_id, RunState::Finished),
        EventKind::RunError => finish_run(state, connection_id, RunState::Errored),
        EventKind::ChatListUpdated => chat_list_updated(state),
        EventKind::RunStarted => {
            // A stop sent before the server started still wins.
            if !state.is_cancelling() {
                state.set_run(RunState::Running);
            }
            apply_event(state, &event);
            Vec::new()
        }
        EventKind::TextMessageChunk | EventKind::FileIdString => {
            apply_event(state, &event);
            Vec::new()
        }
    }
}

fn apply_event(state: &mut AppState, event: &StreamEvent) {
    if state.transcript_mut().apply(event).changed() {
        state.mark_dirty();
    }
}

fn finish_run(state: &mut AppState, connection_id: ConnectionId, outcome: RunState) -> Vec<Effect> {
    engine_info!("Connection {} finished with {:?}", connection_id, outcome);
    state.take_connection();
    state.set_run(outcome);
    vec![Effect::CloseStream { connection_id }]
}

fn chat_list_updated(state: &mut AppState) -> Vec<Effect> {
    let mut effects = Vec::new();
    if let Some(user_id) = state.identity() {
        effects.push(Effect::RefreshChatList {
            user_id: user_id.to_string(),
        });
    }

    let expected = conversation_path(state.thread_id());
    if state.address() != expected {
        state.set_address(expected.clone());
        effects.push(Effect::ReplaceAddress { path: expected });
    }
    effects
}

fn stream_closed(
    state: &mut AppState,
    connection_id: ConnectionId,
    error: Option<String>,
) -> Vec<Effect> {
    if !state.is_current(connection_id) {
        return Vec::new();
    }
    state.take_connection();

    if state.is_cancelling() {
        engine_info!("Connection {} closed while cancelling", connection_id);
        state.set_run(RunState::Cancelled);
        return Vec::new();
    }

    match error {
        Some(err) => engine_warn!("Connection {} failed: {}", connection_id, err),
        None => engine_warn!("Connection {} closed before the run finished", connection_id),
    }
    state.set_run(RunState::Errored);
    state.transcript_mut().push_notice(FAILURE_NOTICE);
    Vec::new()
}

fn history_loaded(state: &mut AppState, thread_id: &str, records: Vec<serde_json::Value>) {
    if thread_id != state.thread_id() {
        engine_debug!("Dropping history of thread {} (no longer open)", thread_id);
        return;
    }

    let total = records.len();
    let mut skipped = 0usize;
    for record in records {
        match StreamEvent::from_value(record) {
            Ok(event) => {
                state.transcript_mut().apply(&event);
            }
            Err(err) => {
                skipped += 1;
                engine_warn!("Thread {}: skipping history record: {}", thread_id, err);
            }
        }
    }
    state.finish_loading();
    engine_info!(
        "Replayed {} history records ({} skipped) into {} messages",
        total,
        skipped,
        state.transcript().len()
    );
}

fn logged_in(state: &mut AppState, user_id: String) -> Vec<Effect> {
    if user_id.is_empty() {
        engine_warn!("Ignoring sign-in with an empty user id");
        return Vec::new();
    }
    state.set_identity(Some(user_id.clone()));

    let mut effects = vec![
        Effect::PersistIdentity {
            user_id: Some(user_id.clone()),
        },
        Effect::RefreshChatList {
            user_id: user_id.clone(),
        },
    ];

    if let Some(pending) = state.take_pending() {
        if state.can_submit() {
            effects.extend(submit(state, user_id, pending));
        } else {
            effects.extend(restore_draft(state, pending));
        }
    }
    effects
}

fn login_cancelled(state: &mut AppState) -> Vec<Effect> {
    match state.take_pending() {
        Some(pending) => restore_draft(state, pending),
        None => Vec::new(),
    }
}

fn restore_draft(state: &mut AppState, pending: PendingSubmission) -> Vec<Effect> {
    let file_ids = pending
        .attachments
        .iter()
        .map(|attachment| attachment.file_id.clone())
        .collect();
    for attachment in pending.attachments {
        state.add_attachment(attachment);
    }
    vec![Effect::RestoreDraft {
        text: pending.text,
        file_ids,
    }]
}
