use crate::core::chat_stream::ChatSession;
use crate::core::customer::CustomerDetails;
use crate::core::transcript::Transcript;

/// State of the welcome screen before the customer has introduced themselves.
#[derive(Debug, Clone, Default)]
pub struct ContactForm {
    pub error: Option<String>,
}

/// State of the chat screen for one identified customer.
///
/// Owns the chat session; dropping the screen releases it.
#[derive(Debug)]
pub struct ChatScreen {
    pub(super) customer: CustomerDetails,
    pub(super) session: Option<ChatSession>,
    pub(super) transcript: Transcript,
    pub(super) typing: bool,
    pub(super) generation: u64,
}

impl ChatScreen {
    pub fn customer(&self) -> &CustomerDetails {
        &self.customer
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// True while a reply is streaming; further sends are ignored.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// False when the session failed to initialize and sending is disabled.
    pub fn session_ready(&self) -> bool {
        self.session.is_some()
    }

    pub fn can_send(&self) -> bool {
        self.session_ready() && !self.typing
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub enum Screen {
    Anonymous(ContactForm),
    Identified(Box<ChatScreen>),
}

impl Default for Screen {
    fn default() -> Self {
        Screen::Anonymous(ContactForm::default())
    }
}
