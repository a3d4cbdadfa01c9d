//! Parsing of stdin lines into user commands.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Plain text: submit it.
    Submit(String),
    Stop,
    Chats,
    Open(String),
    New,
    /// `None` clears the selection.
    Agent {
        name: Option<String>,
        organization: Option<String>,
    },
    Upload(String),
    Detach(String),
    Download(String),
    Login(String),
    CancelLogin,
    Logout,
    Help,
    Quit,
    /// Slash command that could not be understood; carries the reason.
    Invalid(String),
}

pub(crate) const HELP: &str = "\
Commands:
  <text>               send a message
  /stop                stop the running reply
  /chats               list your conversations
  /open <thread>       switch to a conversation
  /new                 start a new conversation
  /agent [name [org]]  address an agent (no name clears it)
  /upload <path>       attach a file to the next message
  /detach <file_id>    drop an attachment
  /download <file_id>  save a file from the conversation
  /login <user_id>     sign in
  /cancel-login        abandon a sign-in prompt
  /logout              sign out
  /help                show this text
  /quit                exit";

/// Returns `None` for blank lines.
pub(crate) fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Submit(line.to_string()));
    };
    // "//text" sends text that starts with a slash.
    if rest.starts_with('/') {
        return Some(Command::Submit(rest.to_string()));
    }

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "stop" => Command::Stop,
        "chats" => Command::Chats,
        "new" => Command::New,
        "cancel-login" => Command::CancelLogin,
        "logout" => Command::Logout,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "open" => required(arg, "/open <thread>", Command::Open),
        "upload" => required(arg, "/upload <path>", Command::Upload),
        "detach" => required(arg, "/detach <file_id>", Command::Detach),
        "download" => required(arg, "/download <file_id>", Command::Download),
        "login" => required(arg, "/login <user_id>", Command::Login),
        "agent" => {
            let mut words = arg.split_whitespace();
            Command::Agent {
                name: words.next().map(str::to_string),
                organization: words.next().map(str::to_string),
            }
        }
        other => Command::Invalid(format!("unknown command /{other}, try /help")),
    };
    Some(command)
}

fn required(arg: &str, usage: &str, build: fn(String) -> Command) -> Command {
    if arg.is_empty() {
        Command::Invalid(format!("usage: {usage}"))
    } else {
        build(arg.to_string())
    }
}
