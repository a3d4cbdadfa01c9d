use std::io::{self, Write};

use agentspace_core::{AppViewModel, ContentPart, MessageBlock, RunState, Source, TransferStatus};

/// Prints view changes to a line-oriented terminal.
///
/// Blocks already on screen are not repeated; a block that only grew (a
/// streaming reply) gets just its new tail.
pub(crate) struct Renderer<W: Write> {
    out: W,
    shown: Vec<String>,
    status: String,
    /// The cursor sits right after the last block's text.
    tail_open: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: Vec::new(),
            status: String::new(),
            tail_open: false,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        let blocks: Vec<String> = view.blocks.iter().map(format_block).collect();
        let common = self
            .shown
            .iter()
            .zip(&blocks)
            .take_while(|(shown, next)| shown == next)
            .count();

        let mut start = common;
        if common < self.shown.len() {
            let last = self.shown.len() - 1;
            let grew = common == last
                && blocks
                    .get(last)
                    .is_some_and(|next| next.starts_with(self.shown[last].as_str()));
            if grew {
                let tail = &blocks[last][self.shown[last].len()..];
                if !self.tail_open {
                    self.out.write_all(b"  ")?;
                }
                self.out.write_all(tail.as_bytes())?;
                self.tail_open = true;
                start = last + 1;
            } else {
                self.end_line()?;
                writeln!(self.out, "---")?;
            }
        }

        for block in &blocks[start..] {
            self.end_line()?;
            self.out.write_all(block.as_bytes())?;
            self.tail_open = true;
        }
        self.shown = blocks;

        let status = format_status(view);
        if status != self.status {
            self.end_line()?;
            writeln!(self.out, "{status}")?;
            self.status = status;
        }
        self.out.flush()
    }

    /// Prints a line of its own, outside the transcript.
    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        self.end_line()?;
        writeln!(self.out, "* {text}")?;
        self.out.flush()
    }

    fn end_line(&mut self) -> io::Result<()> {
        if self.tail_open {
            writeln!(self.out)?;
            self.tail_open = false;
        }
        Ok(())
    }
}

pub(crate) fn format_block(block: &MessageBlock) -> String {
    match block {
        MessageBlock::User { text, file_id } => match file_id {
            Some(file_id) if text.is_empty() => format!("you> {}", file_marker(file_id)),
            Some(file_id) => format!("you> {text} {}", file_marker(file_id)),
            None => format!("you> {text}"),
        },
        MessageBlock::AgentGroup {
            agent_id,
            provider_url,
            parts,
        } => {
            let header = match provider_url.as_deref().filter(|url| !url.is_empty()) {
                Some(url) => format!("[{agent_id} @ {url}]"),
                None => format!("[{agent_id}]"),
            };
            let body: Vec<String> = parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text(text) => text.clone(),
                    ContentPart::File(file_id) => file_marker(file_id),
                })
                .collect();
            format!("{header} {}", body.join("\n"))
        }
        MessageBlock::Assistant {
            source,
            text,
            file_id,
        } => {
            let label = match source {
                Some(Source::Platform) => "assistant",
                Some(Source::Agent) => "agent",
                Some(Source::Other(tag)) => tag.as_str(),
                None => "!",
            };
            let mut body = text.clone().unwrap_or_default();
            if let Some(file_id) = file_id {
                if !body.is_empty() {
                    body.push(' ');
                }
                body.push_str(&file_marker(file_id));
            }
            format!("{label}> {body}")
        }
    }
}

fn file_marker(file_id: &str) -> String {
    format!("<file {file_id}, /download {file_id}>")
}

pub(crate) fn format_status(view: &AppViewModel) -> String {
    let run = match view.run {
        RunState::Idle if view.loading => "loading history",
        RunState::Idle => "ready",
        RunState::Running => "running, /stop to cancel",
        RunState::Finished => "done",
        RunState::Errored => "failed",
        RunState::Cancelling => "stopping",
        RunState::Cancelled => "stopped",
    };
    let mut parts = vec![format!("[{}] {run}", view.address)];
    if let Some(agent) = &view.agent {
        match &agent.organization {
            Some(org) => parts.push(format!("agent {}/{}", org, agent.name)),
            None => parts.push(format!("agent {}", agent.name)),
        }
    }
    if !view.attachments.is_empty() {
        let names: Vec<&str> = view.attachments.iter().map(|a| a.name.as_str()).collect();
        parts.push(format!("attached: {}", names.join(", ")));
    }
    if let Some(error) = &view.upload_error {
        parts.push(format!("upload failed: {error}"));
    }
    match &view.last_transfer {
        Some(TransferStatus::Uploading { name }) => parts.push(format!("uploading {name}")),
        Some(TransferStatus::Downloaded { path, .. }) => parts.push(format!("saved {path}")),
        Some(TransferStatus::DownloadFailed { file_id, error }) => {
            parts.push(format!("download of {file_id} failed: {error}"))
        }
        None => {}
    }
    if !view.signed_in {
        parts.push("signed out".to_string());
    }
    format!("-- {} --", parts.join(" | "))
}
