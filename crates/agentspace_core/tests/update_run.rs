use std::sync::Once;

use agentspace_core::{
    update, AppState, ConnectionId, Effect, Msg, RunState, Submission, FAILURE_NOTICE,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn opened() -> AppState {
    let state = AppState::new().with_identity(Some("u-1".to_string()));
    let (state, _) = update(
        state,
        Msg::ConversationOpened {
            thread_id: "t-1".to_string(),
            resumed: false,
            agent: None,
        },
    );
    state
}

fn submit(state: AppState, text: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::SubmitClicked {
            text: text.to_string(),
        },
    )
}

fn connection_of(effects: &[Effect]) -> ConnectionId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::OpenStream { connection_id, .. } => Some(*connection_id),
            _ => None,
        })
        .expect("open stream effect")
}

fn event(state: AppState, connection_id: ConnectionId, kind: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::StreamFrame {
            connection_id,
            payload: json!({ "event": kind }).to_string(),
        },
    )
}

/// Submitted, socket open, server has started the run.
fn started() -> (AppState, ConnectionId) {
    let (state, effects) = submit(opened(), "hello");
    let id = connection_of(&effects);
    let (state, _) = update(state, Msg::StreamOpened { connection_id: id });
    let (state, _) = event(state, id, "RUN_STARTED");
    (state, id)
}

#[test]
fn submission_opens_a_stream_but_does_not_start_the_run() {
    init_logging();
    let (state, effects) = submit(opened(), "hello");

    assert_eq!(
        effects,
        vec![Effect::OpenStream {
            connection_id: 1,
            submission: Submission {
                thread_id: "t-1".to_string(),
                user_id: "u-1".to_string(),
                text_input: "hello".to_string(),
                file_id_list: Vec::new(),
                agent_name: None,
                agent_org: None,
            },
        }]
    );
    assert_eq!(state.run_state(), RunState::Idle);
    assert!(!state.is_running());
    assert!(state.connection().is_some());
    assert!(!state.view().can_submit);
}

#[test]
fn run_started_marks_running() {
    init_logging();
    let (state, _) = started();

    assert_eq!(state.run_state(), RunState::Running);
    assert!(state.is_running());
    assert!(!state.is_cancelling());
    assert!(state.view().can_cancel);
}

#[test]
fn run_finished_and_run_error_clear_the_connection() {
    init_logging();
    for (kind, outcome) in [
        ("RUN_FINISHED", RunState::Finished),
        ("RUN_ERROR", RunState::Errored),
    ] {
        let (state, id) = started();
        let (state, effects) = event(state, id, kind);

        assert_eq!(state.run_state(), outcome);
        assert!(!state.is_running());
        assert_eq!(state.connection(), None);
        assert_eq!(effects, vec![Effect::CloseStream { connection_id: id }]);
    }
}

#[test]
fn cancel_sends_stop_and_waits_for_confirmation() {
    init_logging();
    let (state, id) = started();

    let (state, effects) = update(state, Msg::CancelClicked);
    assert_eq!(effects, vec![Effect::SendStop { connection_id: id }]);
    assert!(state.is_cancelling());
    assert!(state.is_running());
    assert!(state.connection().is_some());
    assert!(!state.view().can_cancel);

    // Repeated requests are disabled until the server answers.
    let (state, effects) = update(state, Msg::CancelClicked);
    assert!(effects.is_empty());

    // Chunks already in flight still land.
    let (state, _) = update(
        state,
        Msg::StreamFrame {
            connection_id: id,
            payload: json!({
                "event": "TEXT_MESSAGE_CHUNK",
                "source": "platform",
                "content": "partial",
            })
            .to_string(),
        },
    );
    assert_eq!(state.transcript().len(), 2);

    let (state, effects) = event(state, id, "RUN_CANCEL");
    assert_eq!(state.run_state(), RunState::Cancelled);
    assert!(!state.is_running());
    assert!(!state.is_cancelling());
    assert_eq!(state.connection(), None);
    assert_eq!(effects, vec![Effect::CloseStream { connection_id: id }]);
}

#[test]
fn cancel_without_connection_is_a_silent_reset() {
    init_logging();
    let state = opened();
    let before = state.transcript().clone();

    let (state, effects) = update(state, Msg::CancelClicked);

    assert!(effects.is_empty());
    assert_eq!(state.transcript(), &before);
    assert!(!state.is_running());
    assert!(!state.is_cancelling());
}

#[test]
fn cancel_before_socket_is_ready_drops_it_without_stop_directive() {
    init_logging();
    let (state, effects) = submit(opened(), "hello");
    let id = connection_of(&effects);

    let (state, effects) = update(state, Msg::CancelClicked);

    assert_eq!(effects, vec![Effect::CloseStream { connection_id: id }]);
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::SendStop { .. })));
    assert_eq!(state.run_state(), RunState::Idle);
    assert_eq!(state.connection(), None);
    assert_eq!(state.transcript().len(), 1);
}

#[test]
fn stop_failure_resets_to_idle() {
    init_logging();
    let (state, id) = started();
    let (state, _) = update(state, Msg::CancelClicked);

    let (state, effects) = update(
        state,
        Msg::StopFailed {
            connection_id: id,
            error: "broken pipe".to_string(),
        },
    );

    assert_eq!(state.run_state(), RunState::Idle);
    assert_eq!(state.connection(), None);
    assert_eq!(effects, vec![Effect::CloseStream { connection_id: id }]);
}

#[test]
fn transport_failure_while_running_appends_one_notice() {
    init_logging();
    let (state, id) = started();

    let (state, effects) = update(
        state,
        Msg::StreamClosed {
            connection_id: id,
            error: Some("connection reset".to_string()),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.run_state(), RunState::Errored);
    assert_eq!(state.connection(), None);
    let last = state.transcript().last().expect("notice");
    assert_eq!(last.content.as_deref(), Some(FAILURE_NOTICE));
    assert_eq!(last.source, None);

    // The close that follows the error belongs to a cleared handle.
    let len = state.transcript().len();
    let (state, _) = update(
        state,
        Msg::StreamClosed {
            connection_id: id,
            error: None,
        },
    );
    assert_eq!(state.transcript().len(), len);
}

#[test]
fn close_while_cancelling_finalizes_without_notice() {
    init_logging();
    let (state, id) = started();
    let (state, _) = update(state, Msg::CancelClicked);

    let (state, _) = update(
        state,
        Msg::StreamClosed {
            connection_id: id,
            error: None,
        },
    );

    assert_eq!(state.run_state(), RunState::Cancelled);
    assert_eq!(state.transcript().len(), 1);
}

#[test]
fn close_after_terminal_event_is_ignored() {
    init_logging();
    let (state, id) = started();
    let (state, _) = event(state, id, "RUN_FINISHED");
    let (state, _) = update(
        state,
        Msg::StreamClosed {
            connection_id: id,
            error: None,
        },
    );

    assert_eq!(state.run_state(), RunState::Finished);
    assert_eq!(state.transcript().len(), 1);
}

#[test]
fn frames_from_a_stale_connection_are_ignored() {
    init_logging();
    let (state, first) = started();
    let (state, _) = event(state, first, "RUN_FINISHED");
    let (state, effects) = submit(state, "again");
    let second = connection_of(&effects);
    assert_ne!(first, second);

    let (state, _) = update(
        state,
        Msg::StreamFrame {
            connection_id: first,
            payload: json!({
                "event": "TEXT_MESSAGE_CHUNK",
                "source": "platform",
                "content": "late",
            })
            .to_string(),
        },
    );
    let (state, _) = event(state, first, "RUN_STARTED");

    assert_eq!(state.transcript().len(), 2);
    assert_eq!(state.run_state(), RunState::Idle);
}

#[test]
fn submission_is_rejected_while_a_run_is_active() {
    init_logging();
    let (state, _id) = started();
    let before = state.transcript().len();

    let (state, effects) = submit(state, "second");
    assert!(effects.is_empty());
    assert_eq!(state.transcript().len(), before);

    let (state, _) = update(state, Msg::CancelClicked);
    let (state, effects) = submit(state, "third");
    assert!(effects.is_empty());
    assert_eq!(state.transcript().len(), before);
}

#[test]
fn submission_is_allowed_again_after_the_run_ends() {
    init_logging();
    let (state, id) = started();
    let (state, _) = event(state, id, "RUN_FINISHED");

    let (state, effects) = submit(state, "next");
    assert_eq!(connection_of(&effects), id + 1);
    assert_eq!(state.run_state(), RunState::Idle);
}

#[test]
fn run_started_after_stop_keeps_cancelling() {
    init_logging();
    let (state, effects) = submit(opened(), "hello");
    let id = connection_of(&effects);
    let (state, _) = update(state, Msg::StreamOpened { connection_id: id });
    let (state, effects) = update(state, Msg::CancelClicked);
    assert_eq!(effects, vec![Effect::SendStop { connection_id: id }]);

    let (state, _) = event(state, id, "RUN_STARTED");
    assert_eq!(state.run_state(), RunState::Cancelling);
}
