//! Append-only conversation transcript.
//!
//! At most one model message may be streaming at a time. Only that
//! placeholder can change after it is appended; every other entry is frozen.

use chrono::Local;

use crate::core::message::{Message, MessageId, Role};

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
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

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|msg| msg.id == id)
    }

    /// The in-flight model reply, if any.
    pub fn streaming(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|msg| msg.is_streaming)
    }

    pub fn has_streaming(&self) -> bool {
        self.streaming().is_some()
    }

    fn push(&mut self, role: Role, text: String, is_streaming: bool) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        self.messages.push(Message {
            id,
            role,
            text,
            timestamp: Local::now(),
            is_streaming,
        });
        id
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Role::User, text.into(), false)
    }

    /// Append a finished model message (greetings, connection errors).
    pub fn push_model(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Role::Model, text.into(), false)
    }

    /// Append an empty streaming model message.
    ///
    /// Returns `None` while another placeholder is still open.
    pub fn open_placeholder(&mut self) -> Option<MessageId> {
        if self.has_streaming() {
            return None;
        }
        Some(self.push(Role::Model, String::new(), true))
    }

    fn streaming_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .rev()
            .find(|msg| msg.id == id)
            .filter(|msg| msg.is_streaming)
    }

    /// Replace the placeholder's text with a cumulative snapshot.
    ///
    /// Returns false when `id` does not name an open placeholder.
    pub fn update_placeholder(&mut self, id: MessageId, text: &str) -> bool {
        match self.streaming_mut(id) {
            Some(msg) => {
                msg.text.clear();
                msg.text.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Freeze the placeholder, keeping whatever text it holds.
    pub fn finish_placeholder(&mut self, id: MessageId) -> bool {
        match self.streaming_mut(id) {
            Some(msg) => {
                msg.is_streaming = false;
                true
            }
            None => false,
        }
    }

    /// Freeze the placeholder after overwriting its text.
    pub fn fail_placeholder(&mut self, id: MessageId, text: &str) -> bool {
        match self.streaming_mut(id) {
            Some(msg) => {
                msg.text = text.to_string();
                msg.is_streaming = false;
                true
            }
            None => false,
        }
    }
}
