//! Conversational session adapter.
//!
//! A [`ChatSession`] is bound to one system instruction and keeps the
//! committed turn history. Each call to [`ChatSession::send_message_stream`]
//! yields a [`ReplyStream`] of cumulative text snapshots for one model reply.
//! Providers plug in behind [`BackendProvider`] and [`ChatBackend`].

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::message::Role;
use crate::core::pricing::today_system_instruction;

/// The chat session could not be created.
#[derive(Debug, Error)]
pub enum SessionInitError {
    #[error("no API key configured (set GEMINI_API_KEY or run `stitchperfect auth`)")]
    MissingCredential,
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// A single reply failed after zero or more snapshots were delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("malformed stream payload: {0}")]
    Malformed(String),
}

/// One committed exchange entry in the provider-side history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Everything a backend needs to generate the next reply.
///
/// `contents` ends with the new user turn.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub system_instruction: Arc<str>,
    pub contents: Vec<Turn>,
}

/// Raw text increments as produced by a backend.
pub type RawReplyStream = BoxStream<'static, Result<String, StreamError>>;

pub trait ChatBackend: Send + Sync {
    fn stream_reply(&self, request: ReplyRequest) -> RawReplyStream;
}

pub trait BackendProvider: Send + Sync {
    /// Resolve credentials and build a backend handle.
    fn connect(&self) -> Result<Arc<dyn ChatBackend>, SessionInitError>;
}

pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    system_instruction: Arc<str>,
    history: Arc<Mutex<Vec<Turn>>>,
}

fn lock_history(history: &Mutex<Vec<Turn>>) -> MutexGuard<'_, Vec<Turn>> {
    history.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>, system_instruction: impl Into<String>) -> Self {
        Self {
            backend,
            system_instruction: Arc::from(system_instruction.into()),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Snapshot of the committed history.
    pub fn history(&self) -> Vec<Turn> {
        lock_history(&self.history).clone()
    }

    /// Submit `user_text` as the next user turn and stream the reply.
    ///
    /// Nothing is sent until the returned stream is first polled. Each item
    /// is the full reply text so far. The stream stops after the first
    /// error. The exchange is committed to the history only when the reply
    /// completes with some text.
    pub fn send_message_stream(&self, user_text: &str) -> ReplyStream {
        let mut contents = self.history();
        contents.push(Turn::user(user_text));
        debug!(turns = contents.len(), "opening reply stream");

        let raw = self.backend.stream_reply(ReplyRequest {
            system_instruction: Arc::clone(&self.system_instruction),
            contents,
        });

        ReplyStream::new(ReplyState {
            raw,
            text: String::new(),
            history: Arc::clone(&self.history),
            user_text: user_text.to_string(),
            finished: false,
        })
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("turns", &lock_history(&self.history).len())
            .finish_non_exhaustive()
    }
}

/// Create a session for `customer_name` using today's system instruction.
pub fn create_session(
    provider: &dyn BackendProvider,
    customer_name: &str,
) -> Result<ChatSession, SessionInitError> {
    let backend = provider.connect().inspect_err(|err| {
        warn!(error = %err, "chat session could not be created");
    })?;
    Ok(ChatSession::new(
        backend,
        today_system_instruction(customer_name),
    ))
}

struct ReplyState {
    raw: RawReplyStream,
    text: String,
    history: Arc<Mutex<Vec<Turn>>>,
    user_text: String,
    finished: bool,
}

impl ReplyState {
    fn commit(&mut self) {
        if self.text.is_empty() {
            debug!("reply completed without text; history unchanged");
            return;
        }
        let mut history = lock_history(&self.history);
        history.push(Turn::user(std::mem::take(&mut self.user_text)));
        history.push(Turn::model(self.text.clone()));
    }
}

/// Cumulative snapshots of one model reply. Finite and single-use.
pub struct ReplyStream {
    inner: BoxStream<'static, Result<String, StreamError>>,
}

impl ReplyStream {
    fn new(state: ReplyState) -> Self {
        let inner = stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }
            loop {
                match state.raw.next().await {
                    Some(Ok(chunk)) if chunk.is_empty() => continue,
                    Some(Ok(chunk)) => {
                        state.text.push_str(&chunk);
                        let snapshot = state.text.clone();
                        return Some((Ok(snapshot), state));
                    }
                    Some(Err(err)) => {
                        state.finished = true;
                        return Some((Err(err), state));
                    }
                    None => {
                        state.finished = true;
                        state.commit();
                        return None;
                    }
                }
            }
        })
        .boxed();
        Self { inner }
    }
}

impl Stream for ReplyStream {
    type Item = Result<String, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{ScriptedBackend, ScriptedProvider, ScriptedReply};

    async fn collect(stream: ReplyStream) -> Vec<Result<String, StreamError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn snapshots_are_cumulative() {
        let backend = ScriptedBackend::new(vec![ScriptedReply::chunks(["H", "e", "", "l"])]);
        let session = ChatSession::new(backend.clone(), "be nice");

        let items = collect(session.send_message_stream("hi")).await;
        let snapshots: Vec<String> = items.into_iter().map(|item| item.expect("ok")).collect();
        assert_eq!(snapshots, vec!["H", "He", "Hel"]);
        assert!(snapshots
            .windows(2)
            .all(|pair| pair[1].starts_with(pair[0].as_str())));
    }

    #[tokio::test]
    async fn completed_reply_is_committed_and_sent_next_time() {
        let backend = ScriptedBackend::new(vec![
            ScriptedReply::chunks(["Blouses start ", "at ₹250."]),
            ScriptedReply::chunks(["Sure."]),
        ]);
        let session = ChatSession::new(backend.clone(), "instruction");

        collect(session.send_message_stream("blouse price?")).await;
        assert_eq!(
            session.history(),
            vec![
                Turn::user("blouse price?"),
                Turn::model("Blouses start at ₹250.")
            ]
        );

        collect(session.send_message_stream("thanks")).await;
        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(&*requests[1].system_instruction, "instruction");
        assert_eq!(
            requests[1].contents,
            vec![
                Turn::user("blouse price?"),
                Turn::model("Blouses start at ₹250."),
                Turn::user("thanks"),
            ]
        );
    }

    #[tokio::test]
    async fn failure_ends_the_stream_and_commits_nothing() {
        let backend = ScriptedBackend::new(vec![ScriptedReply::fails_after(
            ["H"],
            StreamError::Transport("reset".into()),
        )]);
        let session = ChatSession::new(backend, "instruction");

        let items = collect(session.send_message_stream("hi")).await;
        assert_eq!(
            items,
            vec![
                Ok("H".to_string()),
                Err(StreamError::Transport("reset".into()))
            ]
        );
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn stream_is_lazy() {
        let backend = ScriptedBackend::new(vec![ScriptedReply::chunks(["x"])]);
        let session = ChatSession::new(backend.clone(), "instruction");
        let stream = session.send_message_stream("hi");
        assert_eq!(backend.polled_replies(), 0);
        drop(stream);
        assert!(session.history().is_empty());
    }

    #[test]
    fn create_session_surfaces_missing_credentials() {
        let provider = ScriptedProvider::unavailable();
        let err = create_session(&provider, "Meera").expect_err("should fail");
        assert!(matches!(err, SessionInitError::MissingCredential));
    }

    #[test]
    fn create_session_scopes_instruction_to_customer() {
        let provider = ScriptedProvider::with_replies(Vec::new());
        let session = create_session(&provider, "Meera").expect("session");
        assert!(session
            .system_instruction()
            .contains("customer named \"Meera\""));
        assert!(session.history().is_empty());
    }
}
