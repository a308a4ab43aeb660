//! Session controller.
//!
//! [`App`] owns the two-screen state machine: an anonymous contact form,
//! then a chat screen bound to one customer and one chat session. Sending a
//! message is split into [`App::begin_send`], which opens the reply
//! placeholder, and [`App::apply_reply_event`], which folds the streamed
//! reply back into the transcript. [`App::send_message`] runs both in
//! sequence for callers that can simply await the reply.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::core::chat_stream::{create_session, BackendProvider, ReplyStream, StreamError};
use crate::core::customer::{ContactError, CustomerDetails};
use crate::core::message::MessageId;
use crate::core::pricing::{greeting, SESSION_INIT_FAILURE_TEXT, STREAM_FAILURE_TEXT};
use crate::core::transcript::Transcript;
use crate::utils::logging::TranscriptLog;

mod screens;

pub use screens::{ChatScreen, ContactForm, Screen};

#[cfg(test)]
mod tests;

/// Progress of one streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    /// Full reply text so far.
    Snapshot(String),
    Completed,
    Failed(StreamError),
}

/// A send that has been accepted and now needs its reply streamed.
///
/// `generation` and `message_id` address the placeholder when events are
/// fed back through [`App::apply_reply_event`].
pub struct PendingReply {
    pub generation: u64,
    pub message_id: MessageId,
    pub stream: ReplyStream,
}

/// Consume `stream`, reporting each snapshot and exactly one terminal event.
pub async fn pump_reply(mut stream: ReplyStream, mut sink: impl FnMut(ReplyEvent)) {
    while let Some(item) = stream.next().await {
        match item {
            Ok(snapshot) => sink(ReplyEvent::Snapshot(snapshot)),
            Err(err) => {
                sink(ReplyEvent::Failed(err));
                return;
            }
        }
    }
    sink(ReplyEvent::Completed);
}

pub struct App {
    screen: Screen,
    provider: Arc<dyn BackendProvider>,
    generations: u64,
    transcript_log: TranscriptLog,
}

impl App {
    pub fn new(provider: Arc<dyn BackendProvider>) -> Self {
        Self {
            screen: Screen::default(),
            provider,
            generations: 0,
            transcript_log: TranscriptLog::disabled(),
        }
    }

    pub fn with_transcript_log(mut self, log: TranscriptLog) -> Self {
        self.transcript_log = log;
        self
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn is_identified(&self) -> bool {
        matches!(self.screen, Screen::Identified(_))
    }

    pub fn form(&self) -> Option<&ContactForm> {
        match &self.screen {
            Screen::Anonymous(form) => Some(form),
            Screen::Identified(_) => None,
        }
    }

    pub fn chat(&self) -> Option<&ChatScreen> {
        match &self.screen {
            Screen::Identified(chat) => Some(&**chat),
            Screen::Anonymous(_) => None,
        }
    }

    fn chat_mut(&mut self) -> Option<&mut ChatScreen> {
        match &mut self.screen {
            Screen::Identified(chat) => Some(&mut **chat),
            Screen::Anonymous(_) => None,
        }
    }

    /// Validate the contact form and, on success, open the chat screen.
    ///
    /// A failed validation leaves the form in place with `error` set and
    /// does not touch the provider. Ignored once a customer is identified.
    pub fn submit_contact(&mut self, name: &str, phone: &str) -> Result<(), ContactError> {
        let Screen::Anonymous(form) = &mut self.screen else {
            debug!("contact submitted while already identified; ignoring");
            return Ok(());
        };

        let customer = match CustomerDetails::from_form(name, phone) {
            Ok(customer) => customer,
            Err(err) => {
                form.error = Some(err.to_string());
                return Err(err);
            }
        };

        info!(customer = %customer.name, "customer identified");
        self.generations += 1;
        let mut transcript = Transcript::new();
        let session = match create_session(self.provider.as_ref(), &customer.name) {
            Ok(session) => {
                transcript.push_model(greeting(&customer.name));
                Some(session)
            }
            Err(_) => {
                transcript.push_model(SESSION_INIT_FAILURE_TEXT);
                None
            }
        };

        self.transcript_log.log_note(&format!(
            "Session started for {} ({})",
            customer.name, customer.phone
        ));
        if let Some(first) = transcript.last() {
            self.transcript_log.log_model(&first.text);
        }

        self.screen = Screen::Identified(Box::new(ChatScreen {
            customer,
            session,
            transcript,
            typing: false,
            generation: self.generations,
        }));
        Ok(())
    }

    /// Open a turn: append the user message and an empty streaming reply.
    ///
    /// Returns `None` without changing anything when there is no usable
    /// session, the input is blank, or a reply is already streaming.
    pub fn begin_send(&mut self, input: &str) -> Option<PendingReply> {
        let text = input.trim();
        let chat = self.chat_mut()?;
        if text.is_empty() || chat.typing || chat.transcript.has_streaming() {
            return None;
        }
        let session = chat.session.as_ref()?;

        let stream = session.send_message_stream(text);
        chat.transcript.push_user(text);
        let message_id = chat.transcript.open_placeholder()?;
        chat.typing = true;
        let generation = chat.generation;
        let customer_name = chat.customer.name.clone();

        debug!(%message_id, generation, "reply placeholder opened");
        self.transcript_log.log_user(&customer_name, text);

        Some(PendingReply {
            generation,
            message_id,
            stream,
        })
    }

    /// Fold one reply event into the transcript.
    ///
    /// Events for another generation (the customer logged out meanwhile) or
    /// for a message that is no longer streaming are dropped. Returns whether
    /// the event was applied.
    pub fn apply_reply_event(
        &mut self,
        generation: u64,
        message_id: MessageId,
        event: ReplyEvent,
    ) -> bool {
        let Some(chat) = self.chat_mut().filter(|chat| chat.generation == generation) else {
            debug!(generation, "dropping reply event from a closed session");
            return false;
        };

        match event {
            ReplyEvent::Snapshot(text) => chat.transcript.update_placeholder(message_id, &text),
            ReplyEvent::Completed => {
                if !chat.transcript.finish_placeholder(message_id) {
                    return false;
                }
                chat.typing = false;
                let final_text = chat
                    .transcript
                    .get(message_id)
                    .map(|msg| msg.text.clone())
                    .unwrap_or_default();
                self.transcript_log.log_model(&final_text);
                true
            }
            ReplyEvent::Failed(err) => {
                if !chat
                    .transcript
                    .fail_placeholder(message_id, STREAM_FAILURE_TEXT)
                {
                    return false;
                }
                chat.typing = false;
                warn!(error = %err, %message_id, "reply stream failed");
                self.transcript_log.log_note(&format!("Reply failed: {err}"));
                true
            }
        }
    }

    /// Run a whole turn, awaiting the reply to completion or failure.
    ///
    /// Returns false when the send was rejected by the gate in
    /// [`App::begin_send`].
    pub async fn send_message(&mut self, input: &str) -> bool {
        let Some(PendingReply {
            generation,
            message_id,
            stream,
        }) = self.begin_send(input)
        else {
            return false;
        };

        pump_reply(stream, |event| {
            self.apply_reply_event(generation, message_id, event);
        })
        .await;
        true
    }

    /// Forget the customer, session and transcript; show a fresh form.
    pub fn logout(&mut self) {
        if let Screen::Identified(chat) = &self.screen {
            info!(customer = %chat.customer.name, typing = chat.typing, "session ended");
            self.transcript_log.log_note("Session ended");
        }
        self.screen = Screen::default();
    }
}
