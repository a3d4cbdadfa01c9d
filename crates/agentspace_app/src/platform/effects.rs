use std::path::PathBuf;

use agentspace_core::{ChatSummary, Effect, Msg};
use agentspace_engine::{EngineEvent, EngineHandle, SubmitRequest};
use engine_logging::{engine_debug, engine_info, engine_warn};

use super::persistence::{save_session, Session};

/// Effects the terminal has to show rather than the engine to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiPrompt {
    AddressChanged(String),
    LoginRequired,
    DraftRestored { text: String, file_ids: Vec<String> },
}

pub(crate) struct EffectRunner {
    engine: EngineHandle,
    state_dir: PathBuf,
    session: Session,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, state_dir: PathBuf, session: Session) -> Self {
        Self {
            engine,
            state_dir,
            session,
        }
    }

    pub fn run(&mut self, effects: Vec<Effect>) -> Vec<UiPrompt> {
        let mut prompts = Vec::new();
        for effect in effects {
            match effect {
                Effect::OpenStream {
                    connection_id,
                    submission,
                } => {
                    self.remember(
                        Some(submission.user_id.clone()),
                        Some(submission.thread_id.clone()),
                    );
                    let request = SubmitRequest::new(
                        submission.thread_id,
                        submission.user_id,
                        submission.text_input,
                        submission.file_id_list,
                    )
                    .with_agent(submission.agent_name, submission.agent_org);
                    engine_info!(
                        "OpenStream connection={} request={} files={}",
                        connection_id,
                        request.request_id,
                        request.file_id_list.len()
                    );
                    self.engine.open_stream(connection_id, request);
                }
                Effect::SendStop { connection_id } => self.engine.stop_stream(connection_id),
                Effect::CloseStream { connection_id } => self.engine.close_stream(connection_id),
                Effect::LoadHistory { thread_id } => self.engine.load_history(thread_id),
                Effect::RefreshChatList { user_id } => self.engine.load_chat_list(user_id),
                Effect::ReplaceAddress { path } => prompts.push(UiPrompt::AddressChanged(path)),
                Effect::RequestLogin => prompts.push(UiPrompt::LoginRequired),
                Effect::RestoreDraft { text, file_ids } => {
                    prompts.push(UiPrompt::DraftRestored { text, file_ids })
                }
                Effect::PersistIdentity { user_id } => {
                    // Only threads that saw a submission are worth resuming.
                    let thread_id = self.session.thread_id.clone();
                    self.remember(user_id, thread_id)
                }
                Effect::UploadFile { path } => self.engine.upload(path),
                Effect::DownloadFile { file_id } => self.engine.download(file_id),
            }
        }
        prompts
    }

    fn remember(&mut self, user_id: Option<String>, thread_id: Option<String>) {
        let next = Session {
            user_id,
            thread_id: thread_id.filter(|id| !id.is_empty()),
            saved_at: None,
        };
        if next.same_as(&self.session) {
            return;
        }
        engine_debug!("Persisting session for thread {:?}", next.thread_id);
        save_session(&self.state_dir, &next);
        self.session = next;
    }
}

/// Translates an engine report into the message the state machine understands.
pub(crate) fn map_engine_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::StreamOpened { connection_id } => Msg::StreamOpened { connection_id },
        EngineEvent::StreamFrame {
            connection_id,
            payload,
        } => Msg::StreamFrame {
            connection_id,
            payload,
        },
        EngineEvent::StreamClosed {
            connection_id,
            error,
        } => Msg::StreamClosed {
            connection_id,
            error,
        },
        EngineEvent::StopFailed {
            connection_id,
            error,
        } => Msg::StopFailed {
            connection_id,
            error,
        },
        EngineEvent::HistoryFetched { thread_id, result } => match result {
            Ok(records) => Msg::HistoryLoaded { thread_id, records },
            Err(err) => Msg::HistoryFailed {
                thread_id,
                error: err.to_string(),
            },
        },
        EngineEvent::ChatListFetched { user_id, result } => match result {
            Ok(entries) => Msg::ChatListLoaded(
                entries
                    .into_iter()
                    .map(|entry| ChatSummary {
                        thread_id: entry.thread_id,
                        title: entry.title,
                    })
                    .collect(),
            ),
            Err(err) => {
                engine_warn!("Chat list for {} failed: {}", user_id, err);
                Msg::ChatListFailed(err.to_string())
            }
        },
        EngineEvent::UploadFinished { name, result } => match result {
            Ok(file_id) => Msg::FileUploaded { file_id, name },
            Err(err) => Msg::UploadFailed {
                name,
                error: err.to_string(),
            },
        },
        EngineEvent::DownloadFinished { file_id, result } => match result {
            Ok(file) => Msg::FileDownloaded {
                file_id,
                path: file.path.display().to_string(),
            },
            Err(err) => Msg::DownloadFailed {
                file_id,
                error: err.to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspace_engine::{BackendError, ChatListEntry, DownloadedFile, FailureKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn stream_events_map_one_to_one() {
        assert_eq!(
            map_engine_event(EngineEvent::StreamFrame {
                connection_id: 2,
                payload: "{}".to_string(),
            }),
            Msg::StreamFrame {
                connection_id: 2,
                payload: "{}".to_string(),
            }
        );
        assert_eq!(
            map_engine_event(EngineEvent::StreamClosed {
                connection_id: 2,
                error: Some("reset".to_string()),
            }),
            Msg::StreamClosed {
                connection_id: 2,
                error: Some("reset".to_string()),
            }
        );
    }

    #[test]
    fn chat_entries_become_summaries() {
        let msg = map_engine_event(EngineEvent::ChatListFetched {
            user_id: "u-1".to_string(),
            result: Ok(vec![ChatListEntry {
                thread_id: "t-1".to_string(),
                title: "hello".to_string(),
            }]),
        });
        assert_eq!(
            msg,
            Msg::ChatListLoaded(vec![ChatSummary {
                thread_id: "t-1".to_string(),
                title: "hello".to_string(),
            }])
        );
    }

    #[test]
    fn download_result_carries_the_written_path() {
        let msg = map_engine_event(EngineEvent::DownloadFinished {
            file_id: "f-1".to_string(),
            result: Ok(DownloadedFile {
                path: PathBuf::from("downloads/cat--abcd1234.png"),
                byte_len: 3,
                content_type: None,
            }),
        });
        assert_eq!(
            msg,
            Msg::FileDownloaded {
                file_id: "f-1".to_string(),
                path: PathBuf::from("downloads/cat--abcd1234.png")
                    .display()
                    .to_string(),
            }
        );
    }

    #[test]
    fn history_error_is_stringified() {
        let msg = map_engine_event(EngineEvent::HistoryFetched {
            thread_id: "t-1".to_string(),
            result: Err(BackendError {
                kind: FailureKind::HttpStatus(500),
                message: "500 Internal Server Error".to_string(),
            }),
        });
        assert_eq!(
            msg,
            Msg::HistoryFailed {
                thread_id: "t-1".to_string(),
                error: "http status 500: 500 Internal Server Error".to_string(),
            }
        );
    }

    #[test]
    fn upload_result_becomes_an_attachment() {
        let msg = map_engine_event(EngineEvent::UploadFinished {
            name: "a.txt".to_string(),
            result: Ok("f-9".to_string()),
        });
        assert_eq!(
            msg,
            Msg::FileUploaded {
                file_id: "f-9".to_string(),
                name: "a.txt".to_string(),
            }
        );
    }
}
