//! TUI-less "say" command

use std::io::{self, Write};

use thiserror::Error;

use crate::core::app::{pump_reply, App, ReplyEvent};
use crate::core::chat_stream::StreamError;
use crate::core::customer::ContactError;

#[derive(Debug, Error)]
pub enum SayError {
    #[error("{0}")]
    Contact(#[from] ContactError),
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("Could not start a chat session (set GEMINI_API_KEY or run `stitchperfect auth`)")]
    SessionUnavailable,
    #[error("Reply failed: {0}")]
    Reply(StreamError),
    #[error("Failed to write reply: {0}")]
    Io(#[from] io::Error),
}

/// Identify the customer, send `prompt`, and write the reply to `out` as
/// it streams in.
pub async fn run_say<W: Write>(
    app: &mut App,
    name: &str,
    phone: &str,
    prompt: &str,
    out: &mut W,
) -> Result<(), SayError> {
    if prompt.trim().is_empty() {
        return Err(SayError::EmptyMessage);
    }
    app.submit_contact(name, phone)?;
    if !app.chat().is_some_and(|chat| chat.session_ready()) {
        return Err(SayError::SessionUnavailable);
    }
    let pending = app.begin_send(prompt).ok_or(SayError::SessionUnavailable)?;
    let (generation, message_id) = (pending.generation, pending.message_id);

    let mut printed = 0;
    let mut failure = None;
    let mut write_error = None;
    pump_reply(pending.stream, |event| {
        match &event {
            ReplyEvent::Snapshot(text) => {
                if let Some(suffix) = text.get(printed..) {
                    if let Err(err) = out.write_all(suffix.as_bytes()).and_then(|()| out.flush())
                    {
                        write_error.get_or_insert(err);
                    }
                    printed = text.len();
                }
            }
            ReplyEvent::Failed(err) => failure = Some(err.clone()),
            ReplyEvent::Completed => {}
        }
        app.apply_reply_event(generation, message_id, event);
    })
    .await;

    if let Some(err) = write_error {
        return Err(err.into());
    }
    if printed > 0 {
        writeln!(out)?;
    }
    match failure {
        Some(err) => Err(SayError::Reply(err)),
        None => Ok(()),
    }
}
