//! Editable input state for both screens.

use ratatui::crossterm::event::KeyEvent;
use ratatui::style::{Color, Modifier, Style};
use tui_textarea::{Input as TAInput, TextArea};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Phone,
}

/// The two single-line fields of the contact form.
pub struct ContactFields {
    name: TextArea<'static>,
    phone: TextArea<'static>,
    focus: FormField,
}

impl Default for ContactFields {
    fn default() -> Self {
        Self {
            name: single_line("e.g. Sarah Jones"),
            phone: single_line("e.g. +1 555 0123"),
            focus: FormField::Name,
        }
    }
}

impl ContactFields {
    pub fn focus(&self) -> FormField {
        self.focus
    }

    /// Tab, Shift-Tab, Up and Down all land here; with two fields every
    /// move is a toggle.
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FormField::Name => FormField::Phone,
            FormField::Phone => FormField::Name,
        };
    }

    pub fn field(&self, field: FormField) -> &TextArea<'static> {
        match field {
            FormField::Name => &self.name,
            FormField::Phone => &self.phone,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut TextArea<'static> {
        match field {
            FormField::Name => &mut self.name,
            FormField::Phone => &mut self.phone,
        }
    }

    /// Feed a key to the focused field. Returns whether its text changed.
    pub fn input(&mut self, key: KeyEvent) -> bool {
        let focus = self.focus;
        self.field_mut(focus).input(TAInput::from(key))
    }

    /// Paste into the focused field, flattening line breaks.
    pub fn paste(&mut self, text: &str) {
        let focus = self.focus;
        let flat = text.replace(['\r', '\n'], " ");
        self.field_mut(focus).insert_str(flat);
    }

    pub fn name(&self) -> String {
        text_of(&self.name)
    }

    pub fn phone(&self) -> String {
        text_of(&self.phone)
    }
}

/// Multi-line compose box on the chat screen.
pub struct ComposeBox {
    textarea: TextArea<'static>,
}

impl Default for ComposeBox {
    fn default() -> Self {
        let mut textarea = TextArea::default();
        textarea.set_cursor_line_style(Style::default());
        textarea.set_placeholder_text("Ask about prices, fabrics, or delivery...");
        textarea.set_placeholder_style(Style::default().fg(Color::DarkGray));
        Self { textarea }
    }
}

impl ComposeBox {
    pub fn textarea_mut(&mut self) -> &mut TextArea<'static> {
        &mut self.textarea
    }

    pub fn input(&mut self, key: KeyEvent) -> bool {
        self.textarea.input(TAInput::from(key))
    }

    pub fn paste(&mut self, text: &str) {
        self.textarea.insert_str(text.replace("\r\n", "\n"));
    }

    pub fn insert_newline(&mut self) {
        self.textarea.insert_newline();
    }

    pub fn text(&self) -> String {
        text_of(&self.textarea)
    }

    pub fn line_count(&self) -> usize {
        self.textarea.lines().len()
    }

    /// Take the current text and leave the box empty.
    pub fn take_text(&mut self) -> String {
        let text = self.text();
        *self = Self::default();
        text
    }
}

fn single_line(placeholder: &str) -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_cursor_line_style(Style::default());
    textarea.set_placeholder_text(placeholder);
    textarea.set_placeholder_style(Style::default().fg(Color::DarkGray));
    textarea.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
    textarea
}

fn text_of(textarea: &TextArea<'_>) -> String {
    textarea.lines().join("\n")
}
