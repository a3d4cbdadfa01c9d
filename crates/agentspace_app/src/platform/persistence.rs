use std::fs;
use std::path::Path;

use agentspace_engine::AtomicFileWriter;
use chrono::Utc;
use engine_logging::{engine_error, engine_info, engine_warn};
use serde::{Deserialize, Serialize};

pub(crate) const STATE_FILENAME: &str = ".agentspace_state.ron";

/// What survives a restart: who is signed in and where they were talking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Session {
    pub user_id: Option<String>,
    pub thread_id: Option<String>,
    pub saved_at: Option<String>,
}

impl Session {
    /// Same identity and thread, ignoring when it was saved.
    pub fn same_as(&self, other: &Session) -> bool {
        self.user_id == other.user_id && self.thread_id == other.thread_id
    }
}

pub(crate) fn load_session(state_dir: &Path) -> Session {
    let path = state_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Session::default();
        }
        Err(err) => {
            engine_warn!("Failed to read persisted session from {:?}: {}", path, err);
            return Session::default();
        }
    };

    match ron::from_str::<Session>(&content) {
        Ok(session) => {
            engine_info!("Loaded persisted session from {:?}", path);
            Session {
                user_id: session.user_id.filter(|id| !id.is_empty()),
                thread_id: session.thread_id.filter(|id| !id.is_empty()),
                saved_at: session.saved_at,
            }
        }
        Err(err) => {
            engine_warn!("Failed to parse persisted session from {:?}: {}", path, err);
            Session::default()
        }
    }
}

pub(crate) fn save_session(state_dir: &Path, session: &Session) {
    let stamped = Session {
        saved_at: Some(Utc::now().to_rfc3339()),
        ..session.clone()
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&stamped, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize session: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(state_dir);
    if let Err(err) = writer.write(STATE_FILENAME, &content) {
        engine_error!("Failed to write session to {:?}: {}", state_dir, err);
    }
}
