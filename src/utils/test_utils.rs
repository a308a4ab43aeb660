use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::stream::{self, StreamExt};

use crate::core::app::App;
use crate::core::chat_stream::{
    BackendProvider, ChatBackend, RawReplyStream, ReplyRequest, SessionInitError, StreamError,
};

/// Canned backend reply: some text increments, optionally followed by an error.
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    chunks: Vec<String>,
    error: Option<StreamError>,
}

impl ScriptedReply {
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            error: None,
        }
    }

    pub fn fails_after<I, S>(chunks: I, error: StreamError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            error: Some(error),
            ..Self::chunks(chunks)
        }
    }

    fn into_items(self) -> Vec<Result<String, StreamError>> {
        let mut items: Vec<_> = self.chunks.into_iter().map(Ok).collect();
        items.extend(self.error.map(Err));
        items
    }
}

/// Backend that plays back [`ScriptedReply`]s in order and records requests.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ReplyRequest>>,
    polled: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<ScriptedReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    pub fn requests(&self) -> Vec<ReplyRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// How many reply streams have actually been polled.
    pub fn polled_replies(&self) -> usize {
        self.polled.load(Ordering::SeqCst)
    }
}

impl ChatBackend for ScriptedBackend {
    fn stream_reply(&self, request: ReplyRequest) -> RawReplyStream {
        self.requests.lock().expect("requests lock").push(request);
        let items = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .map(ScriptedReply::into_items)
            .unwrap_or_default();
        let polled = Arc::clone(&self.polled);
        stream::once(async move {
            polled.fetch_add(1, Ordering::SeqCst);
        })
        .flat_map(move |()| stream::iter(items.clone()))
        .boxed()
    }
}

/// Provider handing out one shared [`ScriptedBackend`], or failing like a
/// missing credential.
#[derive(Debug)]
pub struct ScriptedProvider {
    backend: Option<Arc<ScriptedBackend>>,
    connects: AtomicUsize,
}

impl ScriptedProvider {
    pub fn with_replies(replies: Vec<ScriptedReply>) -> Self {
        Self {
            backend: Some(ScriptedBackend::new(replies)),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            backend: None,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn backend(&self) -> Arc<ScriptedBackend> {
        Arc::clone(self.backend.as_ref().expect("scripted backend"))
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl BackendProvider for ScriptedProvider {
    fn connect(&self) -> Result<Arc<dyn ChatBackend>, SessionInitError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match &self.backend {
            Some(backend) => Ok(Arc::clone(backend) as Arc<dyn ChatBackend>),
            None => Err(SessionInitError::MissingCredential),
        }
    }
}

pub fn create_test_app(replies: Vec<ScriptedReply>) -> (App, Arc<ScriptedProvider>) {
    let provider = Arc::new(ScriptedProvider::with_replies(replies));
    let app = App::new(Arc::clone(&provider) as Arc<dyn BackendProvider>);
    (app, provider)
}

/// App already past the contact form as "Meera".
pub fn create_identified_app(replies: Vec<ScriptedReply>) -> (App, Arc<ScriptedProvider>) {
    let (mut app, provider) = create_test_app(replies);
    app.submit_contact("Meera", "+91 98765 43210")
        .expect("valid contact details");
    (app, provider)
}
