use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::core::app::{App, ChatScreen, ContactForm, Screen};
use crate::core::message::Message;
use crate::core::pricing::{ASSISTANT_NAME, DISCLAIMER_TEXT, SHOP_NAME, SHOP_TAGLINE};
use crate::core::transcript::Transcript;
use crate::ui::input::FormField;
use crate::ui::scroll::prewrap_lines;
use crate::ui::UiState;

const ACCENT: Color = Color::Magenta;
const STREAMING_GLYPH: &str = "▍";
const MAX_COMPOSE_ROWS: u16 = 5;

pub fn ui(f: &mut Frame, app: &App, state: &mut UiState) {
    match app.screen() {
        Screen::Anonymous(form) => render_contact(f, form, state),
        Screen::Identified(chat) => render_chat(f, chat, state),
    }
}

fn render_contact(f: &mut Frame, form: &ContactForm, state: &mut UiState) {
    let area = centered(f.area(), 64, 22);
    f.render_widget(Clear, area);

    let outer = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT))
        .title(
            Line::styled(
                format!(" {SHOP_NAME} "),
                Style::default().add_modifier(Modifier::BOLD),
            )
            .centered(),
        );
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // tagline
            Constraint::Length(1),
            Constraint::Length(3), // intro
            Constraint::Length(1), // name label
            Constraint::Length(3), // name field
            Constraint::Length(1), // phone label
            Constraint::Length(3), // phone field
            Constraint::Length(1), // error
            Constraint::Length(1), // button
            Constraint::Length(1),
            Constraint::Length(1), // footnote
            Constraint::Min(0),
        ])
        .split(inner);

    f.render_widget(
        Paragraph::new(SHOP_TAGLINE)
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::ITALIC)),
        rows[0],
    );
    let intro = format!(
        "Welcome! I am {ASSISTANT_NAME}, your personal styling assistant. Please introduce \
yourself so I can better assist you with quotes and measurements."
    );
    f.render_widget(
        Paragraph::new(intro)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rows[2],
    );

    let focus = state.contact.focus();
    for (field, label, label_row, field_row) in [
        (FormField::Name, "Your Name", rows[3], rows[4]),
        (FormField::Phone, "Phone Number", rows[5], rows[6]),
    ] {
        f.render_widget(
            Paragraph::new(label).style(Style::default().add_modifier(Modifier::BOLD)),
            label_row,
        );
        let focused = focus == field;
        let textarea = state.contact.field_mut(field);
        textarea.set_block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if focused {
                    Style::default().fg(ACCENT)
                } else {
                    Style::default().fg(Color::DarkGray)
                }),
        );
        textarea.set_cursor_style(if focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        });
        f.render_widget(&*textarea, field_row);
    }

    if let Some(error) = &form.error {
        f.render_widget(
            Paragraph::new(error.as_str())
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC)),
            rows[7],
        );
    }

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                " Start Consultation ",
                Style::default()
                    .fg(Color::White)
                    .bg(ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  Enter", Style::default().fg(Color::DarkGray)),
        ]))
        .alignment(Alignment::Center),
        rows[8],
    );
    f.render_widget(
        Paragraph::new("Your contact details are saved for appointment reference only.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray)),
        rows[10],
    );
}

fn render_chat(f: &mut Frame, chat: &ChatScreen, state: &mut UiState) {
    let compose_rows = (state.compose.line_count() as u16).clamp(1, MAX_COMPOSE_ROWS);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(compose_rows + 2),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, chunks[0]);

    let transcript_area = chunks[1];
    let lines = build_display_lines(chat.transcript());
    let wrapped = prewrap_lines(&lines, transcript_area.width);
    let top = state
        .scroll
        .layout(wrapped.len(), usize::from(transcript_area.height));
    let top = u16::try_from(top).unwrap_or(u16::MAX);
    f.render_widget(Paragraph::new(wrapped).scroll((top, 0)), transcript_area);

    let (title, border) = if !chat.session_ready() {
        (
            "Chat unavailable".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else if chat.is_typing() {
        (
            format!("{ASSISTANT_NAME} is typing…"),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            "Message (Enter to send, Alt+Enter for new line)".to_string(),
            Style::default().fg(ACCENT),
        )
    };
    let textarea = state.compose.textarea_mut();
    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border)
            .title(title),
    );
    textarea.set_cursor_style(if chat.can_send() {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    });
    f.render_widget(&*textarea, chunks[2]);

    f.render_widget(
        Paragraph::new(DISCLAIMER_TEXT)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );
}

fn render_header(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(24)])
        .split(inner);

    let title = vec![
        Line::from(Span::styled(
            SHOP_NAME,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("● ", Style::default().fg(Color::Green)),
            Span::styled(
                format!("{ASSISTANT_NAME} is Online"),
                Style::default().fg(Color::Gray),
            ),
        ]),
    ];
    f.render_widget(Paragraph::new(title), halves[0]);
    f.render_widget(
        Paragraph::new("Ctrl+L End Session")
            .alignment(Alignment::Right)
            .style(Style::default().fg(Color::DarkGray)),
        halves[1],
    );
}

/// Transcript lines before wrapping: a label line per message, its text,
/// then a blank separator.
pub fn build_display_lines(transcript: &Transcript) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in transcript.messages() {
        lines.push(label_line(message));
        let mut body: Vec<Line<'static>> =
            message.text.lines().map(|l| Line::from(l.to_string())).collect();
        if message.is_streaming {
            let glyph = Span::styled(STREAMING_GLYPH, Style::default().fg(ACCENT));
            match body.last_mut() {
                Some(last) => last.spans.push(glyph),
                None => body.push(Line::from(glyph)),
            }
        }
        lines.extend(body);
        lines.push(Line::from(""));
    }
    lines
}

fn label_line(message: &Message) -> Line<'static> {
    let (label, style) = if message.is_user() {
        ("You", Style::default().fg(Color::Cyan))
    } else {
        (ASSISTANT_NAME, Style::default().fg(ACCENT))
    };
    Line::from(vec![
        Span::styled(label, style.add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  {}", message.time_label()),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::ReplyEvent;
    use crate::utils::test_utils::{create_identified_app, create_test_app};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App, state: &mut UiState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal
            .draw(|f| ui(f, app, state))
            .expect("draw succeeds");
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn contact_screen_shows_fields_and_error() {
        let (mut app, _provider) = create_test_app(Vec::new());
        let _ = app.submit_contact("", "");
        let screen = render(&app, &mut UiState::default(), 80, 26);

        assert!(screen.contains(SHOP_NAME));
        assert!(screen.contains("Your Name"));
        assert!(screen.contains("Phone Number"));
        assert!(screen.contains("Start Consultation"));
        assert!(screen.contains("Please provide both your name and contact number."));
    }

    #[test]
    fn chat_screen_shows_header_transcript_and_disclaimer() {
        let (app, _provider) = create_identified_app(Vec::new());
        let screen = render(&app, &mut UiState::default(), 100, 30);

        assert!(screen.contains("Anka is Online"));
        assert!(screen.contains("End Session"));
        assert!(screen.contains("Hello Meera!"));
        assert!(screen.contains(DISCLAIMER_TEXT));
    }

    #[test]
    fn streaming_reply_shows_cursor_glyph() {
        let (mut app, _provider) = create_identified_app(Vec::new());
        let pending = app.begin_send("Price of a saree fall?").expect("accepted");
        app.apply_reply_event(
            pending.generation,
            pending.message_id,
            ReplyEvent::Snapshot("About".into()),
        );

        let lines = build_display_lines(app.chat().expect("chat").transcript());
        let text: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
        assert!(text.contains(&"About▍".to_string()));
        assert!(text.iter().any(|line| line.starts_with("You  ")));

        let screen = render(&app, &mut UiState::default(), 100, 30);
        assert!(screen.contains("Anka is typing"));
    }

    #[test]
    fn empty_placeholder_renders_just_the_glyph() {
        let (mut app, _provider) = create_identified_app(Vec::new());
        app.begin_send("hello").expect("accepted");
        let lines = build_display_lines(app.chat().expect("chat").transcript());
        let text: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
        assert!(text.contains(&STREAMING_GLYPH.to_string()));
    }

    #[test]
    fn long_transcripts_stay_pinned_to_the_newest_message() {
        let (mut app, _provider) = create_identified_app(Vec::new());
        let pending = app.begin_send("hello").expect("accepted");
        let long_reply: String = (1..=40).map(|n| format!("line {n}\n")).collect();
        app.apply_reply_event(
            pending.generation,
            pending.message_id,
            ReplyEvent::Snapshot(long_reply),
        );
        app.apply_reply_event(pending.generation, pending.message_id, ReplyEvent::Completed);

        let mut state = UiState::default();
        let screen = render(&app, &mut state, 80, 24);
        assert!(screen.contains("line 40"));
        assert!(!screen.contains("Hello Meera!"));

        state.scroll.page_up();
        state.scroll.page_up();
        state.scroll.page_up();
        state.scroll.page_up();
        let screen = render(&app, &mut state, 80, 24);
        assert!(screen.contains("Hello Meera!"));
    }
}
