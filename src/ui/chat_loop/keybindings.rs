//! Key-to-action mapping for the two screens.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Logout,
    Submit,
    InsertNewline,
    SwitchField,
    PageUp,
    PageDown,
    /// Forward the key to the focused text input.
    Edit,
}

fn is_quit(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

pub fn contact_action(key: &KeyEvent) -> KeyAction {
    if is_quit(key) {
        return KeyAction::Quit;
    }
    match key.code {
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => KeyAction::SwitchField,
        _ => KeyAction::Edit,
    }
}

pub fn chat_action(key: &KeyEvent) -> KeyAction {
    if is_quit(key) {
        return KeyAction::Quit;
    }
    match key.code {
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Logout,
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            KeyAction::InsertNewline
        }
        KeyCode::Enter => KeyAction::Submit,
        KeyCode::PageUp => KeyAction::PageUp,
        KeyCode::PageDown => KeyAction::PageDown,
        _ => KeyAction::Edit,
    }
}
