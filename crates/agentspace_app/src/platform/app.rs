use std::io::{self, BufRead, Stdout};
use std::sync::{mpsc, Arc};
use std::thread;

use agentspace_core::{update, AgentTarget, AppState, Msg, TransferStatus};
use agentspace_engine::{EngineEvent, EngineHandle, EventSink};
use anyhow::Context;
use engine_logging::{engine_debug, engine_info, engine_warn};
use uuid::Uuid;

use super::config::{AppConfig, Cli};
use super::effects::{map_engine_event, EffectRunner, UiPrompt};
use super::input::{parse_line, Command, HELP};
use super::logging;
use super::persistence::load_session;
use super::ui::render::Renderer;

/// Everything the main loop waits on.
enum AppEvent {
    Input(String),
    Engine(EngineEvent),
    InputClosed,
}

/// Forwards engine reports into the main loop.
struct AppEventSink {
    tx: mpsc::Sender<AppEvent>,
}

impl EventSink for AppEventSink {
    fn emit(&self, event: EngineEvent) {
        if self.tx.send(AppEvent::Engine(event)).is_err() {
            engine_debug!("Main loop is gone, dropping engine event");
        }
    }
}

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(&cli)?;
    agentspace_engine::ensure_dir(&config.state_dir)
        .with_context(|| format!("state directory {:?}", config.state_dir))?;
    logging::initialize(config.log_destination, config.log_level()?, &config.state_dir);
    engine_info!("Starting agentspace against {}", config.backend_url);

    let session = load_session(&config.state_dir);
    let (tx, rx) = mpsc::channel::<AppEvent>();

    let sink = Arc::new(AppEventSink { tx: tx.clone() });
    let engine = EngineHandle::new(config.engine_settings()?, sink)?;
    let runner = EffectRunner::new(engine, config.state_dir.clone(), session.clone());

    thread::spawn(move || read_stdin(tx));

    let user_id = cli.user.clone().or_else(|| session.user_id.clone());
    let agent = cli.agent.clone().map(|name| AgentTarget {
        name,
        organization: cli.org.clone(),
    });
    let (thread_id, resumed) = match (&cli.thread, cli.resume) {
        (Some(thread_id), _) => (thread_id.clone(), true),
        (None, true) => match &session.thread_id {
            Some(thread_id) => (thread_id.clone(), true),
            None => {
                engine_warn!("No previous conversation to resume, starting a new one");
                (fresh_thread(), false)
            }
        },
        (None, false) => (fresh_thread(), false),
    };

    let mut app = App {
        state: AppState::new().with_identity(user_id),
        runner,
        renderer: Renderer::new(io::stdout()),
    };
    app.renderer.notice("agentspace ready, /help lists commands")?;
    app.dispatch(Msg::ConversationOpened {
        thread_id,
        resumed,
        agent,
    })?;
    // A flag identity is a fresh sign-in: persist it and fetch the chat list.
    if let Some(user) = cli.user.filter(|user| session.user_id.as_ref() != Some(user)) {
        app.dispatch(Msg::LoggedIn { user_id: user })?;
    }

    let mut input_closed = false;
    while let Ok(event) = rx.recv() {
        match event {
            AppEvent::Engine(event) => {
                app.dispatch(map_engine_event(event))?;
                if input_closed && is_settled(&app.state) {
                    break;
                }
            }
            AppEvent::Input(line) => {
                let Some(command) = parse_line(&line) else {
                    continue;
                };
                if !app.handle_command(command)? {
                    break;
                }
            }
            AppEvent::InputClosed => {
                if is_settled(&app.state) {
                    break;
                }
                engine_info!("Input closed, waiting for the current run to finish");
                input_closed = true;
            }
        }
    }

    engine_info!("Shutting down");
    Ok(())
}

/// Nothing in flight that a piped session would still want to see.
fn is_settled(state: &AppState) -> bool {
    state.connection().is_none()
        && !state.is_loading()
        && !matches!(state.view().last_transfer, Some(TransferStatus::Uploading { .. }))
}

fn fresh_thread() -> String {
    Uuid::new_v4().to_string()
}

fn read_stdin(tx: mpsc::Sender<AppEvent>) {
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        if tx.send(AppEvent::Input(line)).is_err() {
            return;
        }
    }
    let _ = tx.send(AppEvent::InputClosed);
}

struct App {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer<Stdout>,
}

impl App {
    fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;

        let prompts = self.runner.run(effects);
        if dirty {
            self.renderer.render(&view)?;
        }
        for prompt in prompts {
            self.show_prompt(prompt)?;
        }
        Ok(())
    }

    fn show_prompt(&mut self, prompt: UiPrompt) -> io::Result<()> {
        match prompt {
            UiPrompt::AddressChanged(path) => {
                engine_debug!("Address is now {}", path);
                Ok(())
            }
            UiPrompt::LoginRequired => self
                .renderer
                .notice("sign in with /login <user_id> to send, or /cancel-login"),
            UiPrompt::DraftRestored { text, file_ids } => {
                self.renderer.notice(&format!("draft kept: {text}"))?;
                if !file_ids.is_empty() {
                    self.renderer
                        .notice(&format!("still attached: {}", file_ids.join(", ")))?;
                }
                Ok(())
            }
        }
    }

    /// Returns `false` when the user asked to leave.
    fn handle_command(&mut self, command: Command) -> io::Result<bool> {
        match command {
            Command::Submit(text) => self.dispatch(Msg::SubmitClicked { text })?,
            Command::Stop => self.dispatch(Msg::CancelClicked)?,
            Command::Chats => self.show_chats()?,
            Command::Open(thread_id) => {
                let agent = self.state.agent().cloned();
                self.dispatch(Msg::ConversationOpened {
                    thread_id,
                    resumed: true,
                    agent,
                })?
            }
            Command::New => {
                let agent = self.state.agent().cloned();
                self.dispatch(Msg::ConversationOpened {
                    thread_id: fresh_thread(),
                    resumed: false,
                    agent,
                })?
            }
            Command::Agent { name, organization } => {
                let agent = name.map(|name| AgentTarget { name, organization });
                self.dispatch(Msg::AgentSelected(agent))?
            }
            Command::Upload(path) => self.dispatch(Msg::UploadRequested { path })?,
            Command::Detach(file_id) => self.dispatch(Msg::AttachmentRemoved { file_id })?,
            Command::Download(file_id) => self.dispatch(Msg::DownloadRequested { file_id })?,
            Command::Login(user_id) => self.dispatch(Msg::LoggedIn { user_id })?,
            Command::CancelLogin => self.dispatch(Msg::LoginCancelled)?,
            Command::Logout => self.dispatch(Msg::LoggedOut)?,
            Command::Help => {
                for line in HELP.lines() {
                    self.renderer.notice(line)?;
                }
            }
            Command::Invalid(reason) => self.renderer.notice(&reason)?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn show_chats(&mut self) -> io::Result<()> {
        if self.state.identity().is_none() {
            return self.renderer.notice("sign in to see your conversations");
        }
        let chats = self.state.chats().to_vec();
        if chats.is_empty() {
            return self.renderer.notice("no conversations yet");
        }
        for chat in chats {
            let title = if chat.title.is_empty() {
                "(untitled)"
            } else {
                chat.title.as_str()
            };
            self.renderer
                .notice(&format!("{}  {}  (/open {})", chat.thread_id, title, chat.thread_id))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted() -> (AppState, u64) {
        let state = AppState::new().with_identity(Some("u-1".to_string()));
        let (state, _) = update(
            state,
            Msg::ConversationOpened {
                thread_id: "t-1".to_string(),
                resumed: false,
                agent: None,
            },
        );
        let (state, _) = update(
            state,
            Msg::SubmitClicked {
                text: "hi".to_string(),
            },
        );
        let id = state.connection().map(|slot| slot.id).unwrap();
        (state, id)
    }

    #[test]
    fn idle_conversation_is_settled() {
        let (state, _) = update(
            AppState::new(),
            Msg::ConversationOpened {
                thread_id: "t-1".to_string(),
                resumed: false,
                agent: None,
            },
        );
        assert!(is_settled(&state));
    }

    #[test]
    fn streaming_run_keeps_the_session_open_until_it_ends() {
        let (state, id) = submitted();
        let (state, _) = update(state, Msg::StreamOpened { connection_id: id });
        assert!(!is_settled(&state));

        let (state, _) = update(
            state,
            Msg::StreamFrame {
                connection_id: id,
                payload: r#"{"event":"RUN_FINISHED"}"#.to_string(),
            },
        );
        assert!(is_settled(&state));
    }

    #[test]
    fn history_load_and_upload_are_waited_for() {
        let (state, _) = update(
            AppState::new(),
            Msg::ConversationOpened {
                thread_id: "t-2".to_string(),
                resumed: true,
                agent: None,
            },
        );
        assert!(!is_settled(&state));

        let (state, _) = update(
            state,
            Msg::HistoryLoaded {
                thread_id: "t-2".to_string(),
                records: Vec::new(),
            },
        );
        let (state, _) = update(
            state,
            Msg::UploadRequested {
                path: "notes.txt".to_string(),
            },
        );
        assert!(!is_settled(&state));
    }
}
