//! Main chat event loop.
//!
//! Terminal input is read on a blocking task and forwarded over a channel.
//! Each accepted send spawns a stream task that forwards
//! `(ReplyEvent, generation, message_id)` back into the loop, which is the
//! only place the [`App`] is mutated.

mod keybindings;
mod lifecycle;

use std::{error::Error, time::Duration};

use ratatui::crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use self::keybindings::{chat_action, contact_action, KeyAction};
use self::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};
use crate::core::app::{pump_reply, App, PendingReply, ReplyEvent};
use crate::core::message::MessageId;
use crate::ui::renderer::ui;
use crate::ui::UiState;

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

type ReplyEnvelope = (ReplyEvent, u64, MessageId);

#[derive(Debug)]
enum UiEvent {
    Crossterm(Event),
}

/// What the loop should do after a key press.
enum KeyOutcome {
    Redraw,
    Quit,
    Send(PendingReply),
    LoggedOut,
}

pub async fn run_chat(app: App) -> Result<(), Box<dyn Error>> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, app).await;
    if let Err(err) = restore_terminal(&mut terminal) {
        warn!(error = %err, "failed to restore terminal");
    }
    result
}

fn spawn_input_reader() -> UnboundedReceiver<UiEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        while !tx.is_closed() {
            match event::poll(INPUT_POLL_INTERVAL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(error = %err, "failed to read terminal event"),
                },
                Ok(false) => {}
                Err(err) => {
                    warn!(error = %err, "terminal event poll failed");
                    break;
                }
            }
        }
    });
    rx
}

/// Run the reply stream on its own task until it ends or `cancel` fires.
fn spawn_reply(pending: PendingReply, tx: UnboundedSender<ReplyEnvelope>) -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    let PendingReply {
        generation,
        message_id,
        stream,
    } = pending;

    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(generation, %message_id, "reply stream cancelled");
            }
            _ = pump_reply(stream, |event| {
                let _ = tx.send((event, generation, message_id));
            }) => {}
        }
    });
    token
}

async fn event_loop(terminal: &mut ChatTerminal, mut app: App) -> Result<(), Box<dyn Error>> {
    let mut input_rx = spawn_input_reader();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ReplyEnvelope>();
    let mut state = UiState::default();
    let mut active_reply: Option<CancellationToken> = None;
    let mut needs_redraw = true;

    loop {
        if needs_redraw {
            terminal.draw(|f| ui(f, &app, &mut state))?;
            needs_redraw = false;
        }

        tokio::select! {
            ev = input_rx.recv() => {
                let Some(UiEvent::Crossterm(ev)) = ev else {
                    break;
                };
                match handle_terminal_event(&mut app, &mut state, ev) {
                    None => {}
                    Some(KeyOutcome::Quit) => break,
                    Some(KeyOutcome::Redraw) => needs_redraw = true,
                    Some(KeyOutcome::Send(pending)) => {
                        active_reply = Some(spawn_reply(pending, reply_tx.clone()));
                        needs_redraw = true;
                    }
                    Some(KeyOutcome::LoggedOut) => {
                        if let Some(token) = active_reply.take() {
                            token.cancel();
                        }
                        needs_redraw = true;
                    }
                }
            }
            Some(first) = reply_rx.recv() => {
                let mut applied = apply_envelope(&mut app, &mut state, first);
                while let Ok(next) = reply_rx.try_recv() {
                    applied |= apply_envelope(&mut app, &mut state, next);
                }
                if applied && !app.chat().is_some_and(|chat| chat.is_typing()) {
                    active_reply = None;
                }
                needs_redraw |= applied;
            }
        }
    }

    if let Some(token) = active_reply.take() {
        token.cancel();
    }
    Ok(())
}

fn apply_envelope(app: &mut App, state: &mut UiState, envelope: ReplyEnvelope) -> bool {
    let (event, generation, message_id) = envelope;
    let applied = app.apply_reply_event(generation, message_id, event);
    if applied {
        state.scroll.to_bottom();
    }
    applied
}

fn handle_terminal_event(app: &mut App, state: &mut UiState, ev: Event) -> Option<KeyOutcome> {
    match ev {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(handle_key(app, state, key)),
        Event::Paste(text) => {
            if app.is_identified() {
                if app.chat().is_some_and(|chat| chat.can_send()) {
                    state.compose.paste(&text);
                }
            } else {
                state.contact.paste(&text);
            }
            Some(KeyOutcome::Redraw)
        }
        Event::Resize(..) => Some(KeyOutcome::Redraw),
        _ => None,
    }
}

fn handle_key(app: &mut App, state: &mut UiState, key: KeyEvent) -> KeyOutcome {
    if !app.is_identified() {
        return match contact_action(&key) {
            KeyAction::Quit => KeyOutcome::Quit,
            KeyAction::SwitchField => {
                state.contact.toggle_focus();
                KeyOutcome::Redraw
            }
            KeyAction::Submit => {
                let (name, phone) = (state.contact.name(), state.contact.phone());
                if app.submit_contact(&name, &phone).is_ok() {
                    state.compose = Default::default();
                    state.scroll.to_bottom();
                }
                KeyOutcome::Redraw
            }
            _ => {
                state.contact.input(key);
                KeyOutcome::Redraw
            }
        };
    }

    let can_send = app.chat().is_some_and(|chat| chat.can_send());
    match chat_action(&key) {
        KeyAction::Quit => KeyOutcome::Quit,
        KeyAction::Logout => {
            app.logout();
            state.reset();
            KeyOutcome::LoggedOut
        }
        KeyAction::PageUp => {
            state.scroll.page_up();
            KeyOutcome::Redraw
        }
        KeyAction::PageDown => {
            state.scroll.page_down();
            KeyOutcome::Redraw
        }
        KeyAction::Submit => match app.begin_send(&state.compose.text()) {
            Some(pending) => {
                state.compose.take_text();
                state.scroll.to_bottom();
                KeyOutcome::Send(pending)
            }
            None => KeyOutcome::Redraw,
        },
        KeyAction::InsertNewline if can_send => {
            state.compose.insert_newline();
            KeyOutcome::Redraw
        }
        KeyAction::Edit if can_send => {
            state.compose.input(key);
            KeyOutcome::Redraw
        }
        _ => KeyOutcome::Redraw,
    }
}
