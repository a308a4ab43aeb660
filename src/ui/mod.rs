//! Terminal UI layer.
//!
//! [`chat_loop`] owns the terminal and the event loop, [`renderer`] draws one
//! frame from the [`App`](crate::core::app::App) plus the widget state kept
//! here. Domain state lives in [`crate::core`].

pub mod chat_loop;
pub mod input;
pub mod renderer;
pub mod scroll;

use self::input::{ComposeBox, ContactFields};
use self::scroll::ScrollState;

/// Widget state that only matters to the terminal front end.
#[derive(Default)]
pub struct UiState {
    pub contact: ContactFields,
    pub compose: ComposeBox,
    pub scroll: ScrollState,
}

impl UiState {
    /// Fresh inputs for a new visitor after a session ends.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
