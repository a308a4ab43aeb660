use std::sync::Arc;

use super::*;
use crate::core::chat_stream::{BackendProvider, StreamError, Turn};
use crate::core::message::Role;
use crate::core::pricing::{SESSION_INIT_FAILURE_TEXT, STREAM_FAILURE_TEXT};
use crate::utils::test_utils::{
    create_identified_app, create_test_app, ScriptedProvider, ScriptedReply,
};

fn chat(app: &App) -> &ChatScreen {
    app.chat().expect("identified")
}

#[test]
fn valid_contact_opens_chat_with_one_greeting() {
    let (mut app, provider) = create_test_app(Vec::new());
    assert!(!app.is_identified());

    app.submit_contact("  Sarah Jones ", " +1 555 0123 ")
        .expect("valid details");

    let screen = chat(&app);
    assert_eq!(screen.customer().name, "Sarah Jones");
    assert_eq!(screen.customer().phone, "+1 555 0123");
    assert_eq!(screen.transcript().len(), 1);
    let greeting = screen.transcript().last().expect("greeting");
    assert_eq!(greeting.role, Role::Model);
    assert!(greeting.text.contains("Sarah Jones"));
    assert!(!greeting.is_streaming);
    assert!(screen.session_ready());
    assert!(!screen.is_typing());
    assert_eq!(provider.connects(), 1);
}

#[test]
fn invalid_contact_stays_anonymous_without_a_session() {
    let cases = [
        ("", "12345"),
        ("Meera", "   "),
        ("Meera", "555-CALL"),
    ];
    for (name, phone) in cases {
        let (mut app, provider) = create_test_app(Vec::new());
        assert!(app.submit_contact(name, phone).is_err());
        assert!(!app.is_identified());
        let error = app.form().and_then(|form| form.error.clone());
        assert!(error.is_some_and(|text| !text.is_empty()), "{name:?}/{phone:?}");
        assert_eq!(provider.connects(), 0);
    }
}

#[test]
fn second_submit_while_identified_is_ignored() {
    let (mut app, provider) = create_identified_app(Vec::new());
    app.submit_contact("Someone Else", "999").expect("ignored");
    assert_eq!(chat(&app).customer().name, "Meera");
    assert_eq!(chat(&app).transcript().len(), 1);
    assert_eq!(provider.connects(), 1);
}

#[test]
fn session_init_failure_seeds_error_and_disables_sending() {
    let provider = Arc::new(ScriptedProvider::unavailable());
    let mut app = App::new(Arc::clone(&provider) as Arc<dyn BackendProvider>);
    app.submit_contact("Meera", "12345").expect("valid details");

    let screen = chat(&app);
    assert_eq!(screen.transcript().len(), 1);
    assert_eq!(
        screen.transcript().last().map(|m| m.text.as_str()),
        Some(SESSION_INIT_FAILURE_TEXT)
    );
    assert!(!screen.session_ready());

    assert!(app.begin_send("hello?").is_none());
    assert_eq!(chat(&app).transcript().len(), 1);
    assert!(!chat(&app).is_typing());
}

#[tokio::test]
async fn streamed_reply_keeps_last_snapshot() {
    let (mut app, provider) =
        create_identified_app(vec![ScriptedReply::chunks(["H", "e", "l"])]);

    assert!(app.send_message("  Hi there  ").await);

    let transcript = chat(&app).transcript();
    assert_eq!(transcript.len(), 3);
    let user = &transcript.messages()[1];
    assert_eq!(user.role, Role::User);
    assert_eq!(user.text, "Hi there");
    let reply = &transcript.messages()[2];
    assert_eq!(reply.role, Role::Model);
    assert_eq!(reply.text, "Hel");
    assert!(!reply.is_streaming);
    assert!(!chat(&app).is_typing());

    assert_eq!(
        provider.backend().requests()[0].contents,
        vec![Turn::user("Hi there")]
    );
}

#[tokio::test]
async fn failed_reply_is_replaced_with_apology() {
    let (mut app, _provider) = create_identified_app(vec![
        ScriptedReply::fails_after(["H"], StreamError::Transport("reset".into())),
        ScriptedReply::chunks(["Back online."]),
    ]);

    assert!(app.send_message("Hi").await);
    let reply = chat(&app).transcript().last().expect("reply").clone();
    assert_eq!(reply.text, STREAM_FAILURE_TEXT);
    assert!(!reply.is_streaming);
    assert!(!chat(&app).is_typing());

    assert!(app.send_message("Hi again").await);
    let transcript = chat(&app).transcript();
    assert_eq!(transcript.len(), 5);
    assert_eq!(transcript.last().map(|m| m.text.as_str()), Some("Back online."));
}

#[test]
fn blank_input_is_rejected_silently() {
    let (mut app, _provider) = create_identified_app(Vec::new());
    for input in ["", "   ", "\n\t"] {
        assert!(app.begin_send(input).is_none());
    }
    assert_eq!(chat(&app).transcript().len(), 1);
    assert!(!chat(&app).is_typing());
}

#[test]
fn send_while_streaming_is_a_no_op() {
    let (mut app, _provider) = create_identified_app(vec![ScriptedReply::chunks(["ok"])]);

    let pending = app.begin_send("first").expect("accepted");
    assert!(chat(&app).is_typing());
    let placeholder = chat(&app).transcript().last().expect("placeholder");
    assert!(placeholder.is_streaming);
    assert!(placeholder.text.is_empty());
    assert_eq!(placeholder.id, pending.message_id);
    let len_before = chat(&app).transcript().len();

    assert!(app.begin_send("second").is_none());
    assert_eq!(chat(&app).transcript().len(), len_before);
    assert!(chat(&app).is_typing());
}

#[test]
fn snapshots_touch_only_the_placeholder() {
    let (mut app, _provider) = create_identified_app(Vec::new());
    let pending = app.begin_send("price of a blouse?").expect("accepted");
    let (generation, id) = (pending.generation, pending.message_id);

    for snapshot in ["Basic", "Basic blouses", "Basic blouses are ₹250"] {
        assert!(app.apply_reply_event(generation, id, ReplyEvent::Snapshot(snapshot.into())));
    }
    let transcript = chat(&app).transcript();
    assert_eq!(transcript.messages()[1].text, "price of a blouse?");
    assert_eq!(
        transcript.streaming().map(|m| m.text.as_str()),
        Some("Basic blouses are ₹250")
    );

    assert!(app.apply_reply_event(generation, id, ReplyEvent::Completed));
    assert!(!app.apply_reply_event(generation, id, ReplyEvent::Snapshot("late".into())));
    assert!(!app.apply_reply_event(
        generation,
        id,
        ReplyEvent::Failed(StreamError::Api("late".into()))
    ));
    let reply = chat(&app).transcript().last().expect("reply");
    assert_eq!(reply.text, "Basic blouses are ₹250");
    assert!(!reply.is_streaming);
}

#[test]
fn logout_resets_and_relogin_greets_again() {
    let (mut app, provider) = create_identified_app(Vec::new());
    let pending = app.begin_send("hello").expect("accepted");

    app.logout();
    assert!(!app.is_identified());
    assert!(app.form().is_some_and(|form| form.error.is_none()));

    app.submit_contact("Priya", "0044 20 7946").expect("valid details");
    let screen = chat(&app);
    assert_eq!(screen.transcript().len(), 1);
    assert!(screen.transcript().messages()[0].text.contains("Priya"));
    assert!(!screen.is_typing());
    assert_ne!(screen.generation(), pending.generation);
    assert_eq!(provider.connects(), 2);
}

#[test]
fn stale_events_after_logout_are_dropped() {
    let (mut app, _provider) = create_identified_app(Vec::new());
    let pending = app.begin_send("hello").expect("accepted");
    app.logout();
    app.submit_contact("Priya", "12345").expect("valid details");

    assert!(!app.apply_reply_event(
        pending.generation,
        pending.message_id,
        ReplyEvent::Snapshot("ghost".into())
    ));
    assert!(!app.apply_reply_event(
        pending.generation,
        pending.message_id,
        ReplyEvent::Completed
    ));
    let transcript = chat(&app).transcript();
    assert_eq!(transcript.len(), 1);
    assert!(transcript.messages().iter().all(|m| !m.text.contains("ghost")));
}

#[test]
fn events_on_the_contact_screen_are_dropped() {
    let (mut app, _provider) = create_identified_app(Vec::new());
    let pending = app.begin_send("hello").expect("accepted");
    app.logout();
    assert!(!app.apply_reply_event(
        pending.generation,
        pending.message_id,
        ReplyEvent::Completed
    ));
    assert!(!app.is_identified());
}

#[tokio::test]
async fn conversation_history_accumulates_across_turns() {
    let (mut app, provider) = create_identified_app(vec![
        ScriptedReply::chunks(["Kurtis take ", "4-5 days."]),
        ScriptedReply::chunks(["You're welcome, Meera!"]),
    ]);

    app.send_message("How long for a kurti?").await;
    app.send_message("Thanks").await;

    let requests = provider.backend().requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].system_instruction.contains("\"Meera\""));
    assert_eq!(
        requests[1].contents,
        vec![
            Turn::user("How long for a kurti?"),
            Turn::model("Kurtis take 4-5 days."),
            Turn::user("Thanks"),
        ]
    );
}
