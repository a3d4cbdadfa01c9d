use crate::{EventKind, Message, Role, Source, StreamEvent};

/// What a single event did to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Appended,
    Coalesced,
    Ignored,
}

impl Applied {
    pub fn changed(self) -> bool {
        self != Applied::Ignored
    }
}

/// Ordered display messages of one conversation.
///
/// Append-only, except that the last entry may grow while a chunked
/// assistant message is being assembled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.messages.push(Message::notice(text));
    }

    /// Folds one event into the transcript.
    ///
    /// User records always append. Of the assistant events only text chunks
    /// and file references touch the transcript; every other kind is ignored.
    pub fn apply(&mut self, event: &StreamEvent) -> Applied {
        if event.role() == Role::User {
            self.messages.push(Message::user_from_event(event));
            return Applied::Appended;
        }

        match event.kind() {
            Some(EventKind::TextMessageChunk) => self.apply_chunk(event),
            Some(EventKind::FileIdString) => {
                self.messages.push(Message::file_from_event(event));
                Applied::Appended
            }
            _ => Applied::Ignored,
        }
    }

    fn apply_chunk(&mut self, event: &StreamEvent) -> Applied {
        let fragment = event.content.as_deref();
        let target = self
            .messages
            .last_mut()
            .filter(|last| accepts_chunk(last, event));

        match target {
            Some(last) => {
                last.append_content(fragment);
                Applied::Coalesced
            }
            None => {
                self.messages.push(Message::text_from_event(event));
                Applied::Appended
            }
        }
    }
}

/// Same emitter, same bubble. Agent chunks also require the same agent id and
/// a text message; platform chunks merge regardless of content type. A file
/// reference is never a merge target.
fn accepts_chunk(last: &Message, event: &StreamEvent) -> bool {
    if last.file_id.is_some() {
        return false;
    }
    if event.is_from_agent() {
        last.is_assistant_from(&Source::Agent)
            && last.agent_id == event.agent_id
            && last.has_text_content()
    } else {
        last.is_assistant_from(&Source::Platform)
    }
}
