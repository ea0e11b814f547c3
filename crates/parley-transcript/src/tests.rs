//! Unit tests for turn reconciliation and the voice session.

use parley_types::{ConnectionStatus, Role, TurnIndicator, VadState};
use serde_json::json;

use crate::error::TransportError;
use crate::reconciler::TurnReconciler;
use crate::session::{VoiceSession, VoiceTransport};

/// Returns `(role, turn_id, text)` for every entry, for compact assertions.
fn snapshot(reconciler: &TurnReconciler) -> Vec<(Role, Option<String>, String)> {
    reconciler
        .entries()
        .iter()
        .map(|e| (e.role, e.turn_id.clone(), e.text.clone()))
        .collect()
}

// ── TurnReconciler ───────────────────────────────────────────────────

#[test]
fn out_of_order_deltas_rebuild_in_counter_order() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(3), "lo");
    r.apply_delta(Role::User, Some("T"), Some(1), "He");
    r.apply_delta(Role::User, Some("T"), Some(2), "l");

    assert_eq!(r.entries().len(), 1);
    let entry = &r.entries()[0];
    assert_eq!(entry.text, "Hello");
    let counters: Vec<u64> = entry.chunks.iter().map(|c| c.counter).collect();
    assert_eq!(counters, vec![1, 2, 3]);
}

#[test]
fn intermediate_text_reflects_chunks_seen_so_far() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(3), "lo");
    assert_eq!(r.entries()[0].text, "lo");
    r.apply_delta(Role::User, Some("T"), Some(1), "Hel");
    assert_eq!(r.entries()[0].text, "Hello");
}

#[test]
fn repeated_counter_overwrites_fragment() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(0), "Hel");
    r.apply_delta(Role::User, Some("T"), Some(0), "Hello");
    assert_eq!(r.entries()[0].text, "Hello");
    assert_eq!(r.entries()[0].chunks.len(), 1);
}

#[test]
fn whole_replacement_discards_partial_chunks() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(0), "Hel");
    r.apply_delta(Role::User, Some("T"), Some(1), "lo");
    assert!(r.is_accumulating("T"));

    r.apply_delta(Role::User, Some("T"), None, "Hi");
    assert!(!r.is_accumulating("T"));
    assert_eq!(r.entries().len(), 1);
    assert_eq!(r.entries()[0].text, "Hi");
    assert!(r.entries()[0].chunks.is_empty());

    // A later delta starts from an empty chunk map.
    r.apply_delta(Role::User, Some("T"), Some(5), "!");
    assert_eq!(r.entries()[0].text, "!");
}

#[test]
fn same_turn_keeps_single_entry_at_original_position() {
    let mut r = TurnReconciler::new();
    r.push_status("Connected");
    r.apply_delta(Role::User, Some("A"), Some(0), "a");
    r.apply_delta(Role::User, Some("B"), Some(0), "b");
    for i in 1..10u64 {
        r.apply_delta(Role::User, Some("A"), Some(i), "a");
    }

    let rows = snapshot(&r);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], (Role::User, Some("A".into()), "a".repeat(10)));
    assert_eq!(rows[2].1.as_deref(), Some("B"));
}

#[test]
fn entry_timestamp_survives_updates() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(0), "a");
    let first = r.entries()[0].timestamp;
    std::thread::sleep(std::time::Duration::from_millis(2));
    r.apply_delta(Role::User, Some("T"), Some(1), "b");
    assert_eq!(r.entries()[0].timestamp, first);
}

#[test]
fn missing_turn_id_always_appends() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, None, Some(0), "same");
    r.apply_delta(Role::User, None, Some(0), "same");
    r.append_whole(Role::Assistant, None, "same");
    r.append_whole(Role::Assistant, None, "same");

    assert_eq!(r.entries().len(), 4);
    assert_eq!(r.active_turns(), 0);
    assert!(r.entries().iter().all(|e| e.text == "same"));
}

#[test]
fn roles_do_not_share_entries() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(0), "question");
    r.append_whole(Role::Assistant, Some("T"), "answer");

    assert_eq!(
        snapshot(&r),
        vec![
            (Role::User, Some("T".into()), "question".into()),
            (Role::Assistant, Some("T".into()), "answer".into()),
        ]
    );
}

#[test]
fn append_whole_concatenates_onto_existing_entry() {
    let mut r = TurnReconciler::new();
    r.append_whole(Role::Assistant, Some("R"), "Hello");
    r.append_whole(Role::Assistant, Some("R"), ", world");
    assert_eq!(r.entries().len(), 1);
    assert_eq!(r.entries()[0].text, "Hello, world");
}

#[test]
fn appending_merge_takes_incoming_chunks() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(0), "Hi");
    r.append_whole(Role::User, Some("T"), " there");
    assert_eq!(r.entries()[0].text, "Hi there");
    assert!(r.entries()[0].chunks.is_empty());
    // The chunk map itself is untouched.
    assert!(r.is_accumulating("T"));
}

#[test]
fn upsert_reports_affected_index() {
    let mut r = TurnReconciler::new();
    let first = r.upsert(
        parley_types::ConversationEntry::new(Role::User, Some("A".into()), "x"),
        true,
    );
    let second = r.upsert(
        parley_types::ConversationEntry::new(Role::User, Some("B".into()), "y"),
        true,
    );
    let merged = r.upsert(
        parley_types::ConversationEntry::new(Role::User, Some("A".into()), "z"),
        false,
    );
    assert_eq!((first, second, merged), (0, 1, 0));
    assert_eq!(r.entries()[0].text, "xz");
}

#[test]
fn clear_turn_starts_fresh_chunk_map_without_touching_text() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(0), "Hel");
    r.apply_delta(Role::User, Some("T"), Some(1), "lo");

    r.clear_turn("T");
    assert!(!r.is_accumulating("T"));
    assert_eq!(r.entries()[0].text, "Hello");

    r.apply_delta(Role::User, Some("T"), Some(0), "Bye");
    assert_eq!(r.entries().len(), 1);
    assert_eq!(r.entries()[0].text, "Bye");
    assert_eq!(r.entries()[0].chunks.len(), 1);
}

#[test]
fn clear_unknown_turn_is_a_no_op() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(0), "x");
    r.clear_turn("nope");
    assert!(r.is_accumulating("T"));
}

#[test]
fn reset_session_forgets_everything() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("T"), Some(0), "Hel");
    r.append_whole(Role::Assistant, Some("R"), "Hi");
    r.reset_session();

    assert!(r.entries().is_empty());
    assert_eq!(r.active_turns(), 0);

    r.apply_delta(Role::User, Some("T"), Some(1), "lo");
    assert_eq!(snapshot(&r), vec![(Role::User, Some("T".into()), "lo".into())]);
}

#[test]
fn end_to_end_interleaved_turns() {
    let mut r = TurnReconciler::new();
    r.apply_delta(Role::User, Some("A"), Some(0), "He");
    r.apply_delta(Role::User, Some("B"), Some(0), "Hi");
    r.apply_delta(Role::User, Some("A"), Some(1), "llo");
    r.clear_turn("A");

    assert_eq!(
        snapshot(&r),
        vec![
            (Role::User, Some("A".into()), "Hello".into()),
            (Role::User, Some("B".into()), "Hi".into()),
        ]
    );
    assert!(!r.is_accumulating("A"));
    assert!(r.is_accumulating("B"));
}

// ── VoiceSession ─────────────────────────────────────────────────────

/// Scripted transport: records calls, fails the operations it is told to.
#[derive(Debug, Default)]
struct MockTransport {
    calls: Vec<&'static str>,
    fail_connect: bool,
    fail_disconnect: bool,
    fail_mute: bool,
}

impl MockTransport {
    fn result(fail: bool) -> Result<(), TransportError> {
        if fail {
            Err(TransportError::Other("boom".to_string()))
        } else {
            Ok(())
        }
    }
}

impl VoiceTransport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.calls.push("connect");
        if self.fail_connect {
            return Err(TransportError::Connect("authorize rejected".to_string()));
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.calls.push("disconnect");
        Self::result(self.fail_disconnect)
    }

    async fn mute(&mut self) -> Result<(), TransportError> {
        self.calls.push("mute");
        Self::result(self.fail_mute)
    }

    async fn unmute(&mut self) -> Result<(), TransportError> {
        self.calls.push("unmute");
        Self::result(self.fail_mute)
    }
}

async fn connected_session() -> VoiceSession<MockTransport> {
    let mut session = VoiceSession::new(MockTransport::default());
    assert!(session.connect().await);
    session
}

fn texts(session: &VoiceSession<MockTransport>) -> Vec<&str> {
    session.entries().iter().map(|e| e.text.as_str()).collect()
}

#[tokio::test]
async fn connect_resets_transcript_and_announces() {
    let mut session = connected_session().await;
    session.handle_json(&json!({
        "type": "user.transcript.delta", "turn_id": "t", "delta_counter": 0, "content": "hi"
    }));
    session.disconnect().await;
    assert_eq!(texts(&session), vec!["Connected", "hi", "Disconnected"]);

    assert!(session.connect().await);
    assert_eq!(texts(&session), vec!["Connected"]);
    assert_eq!(session.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn connect_is_refused_while_active() {
    let mut session = connected_session().await;
    assert!(!session.connect().await);
    assert_eq!(session.transport().calls, vec!["connect"]);
}

#[tokio::test]
async fn failed_connect_leaves_single_status_entry() {
    let mut session = VoiceSession::new(MockTransport {
        fail_connect: true,
        ..Default::default()
    });
    assert!(!session.connect().await);
    assert_eq!(session.status(), ConnectionStatus::Error);
    assert_eq!(texts(&session), vec!["Failed to connect"]);
    assert_eq!(session.entries()[0].role, Role::System);
}

#[tokio::test]
async fn control_failures_become_status_entries() {
    let mut session = VoiceSession::new(MockTransport {
        fail_disconnect: true,
        fail_mute: true,
        ..Default::default()
    });
    session.connect().await;
    session.mute().await;
    session.disconnect().await;

    assert!(!session.is_muted());
    assert!(session.is_active());
    assert_eq!(
        texts(&session),
        vec![
            "Connected",
            "Failed to mute: transport error: boom",
            "Failed to disconnect: transport error: boom",
        ]
    );
}

#[tokio::test]
async fn controls_are_ignored_when_inactive() {
    let mut session = VoiceSession::new(MockTransport::default());
    session.mute().await;
    session.disconnect().await;
    assert!(session.transport().calls.is_empty());
    assert!(session.entries().is_empty());
}

#[tokio::test]
async fn toggle_mute_flips_state() {
    let mut session = connected_session().await;
    session.toggle_mute().await;
    assert!(session.is_muted());
    session.toggle_mute().await;
    assert!(!session.is_muted());
    assert_eq!(
        session.transport().calls,
        vec!["connect", "mute", "unmute"]
    );
}

#[tokio::test]
async fn disconnect_discards_partial_turns_but_keeps_entries() {
    let mut session = connected_session().await;
    session.handle_json(&json!({
        "type": "user.transcript.delta", "turn_id": "t", "delta_counter": 1, "content": "lo"
    }));
    session.on_disconnected();

    assert_eq!(session.reconciler().active_turns(), 0);
    assert_eq!(texts(&session), vec!["Connected", "lo", "Disconnected"]);

    // A late counter-0 delta for the old turn cannot resurrect "lo".
    session.handle_json(&json!({
        "type": "user.transcript.delta", "turn_id": "t", "delta_counter": 0, "content": "Hel"
    }));
    assert_eq!(texts(&session)[1], "Hel");
}

#[tokio::test]
async fn shutdown_discards_everything() {
    let mut session = connected_session().await;
    session.handle_json(&json!({
        "type": "user.transcript.delta", "turn_id": "t", "delta_counter": 0, "content": "x"
    }));
    session.shutdown().await;
    assert!(session.entries().is_empty());
    assert_eq!(session.reconciler().active_turns(), 0);
    assert_eq!(session.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn dispatches_end_to_end_event_stream() {
    let mut session = connected_session().await;
    for event in [
        json!({ "type": "turn.start", "role": "user", "turn_id": "A" }),
        json!({ "type": "user.transcript.delta", "turn_id": "A", "delta_counter": 0, "content": "He" }),
        json!({ "type": "user.transcript.delta", "turn_id": "B", "delta_counter": 0, "content": "Hi" }),
        json!({ "type": "user.transcript.delta", "turn_id": "A", "delta_counter": "1", "content": "llo" }),
        json!({ "type": "turn.end", "role": "user", "turn_id": "A" }),
    ] {
        session.handle_json(&event);
    }

    let rows = snapshot(session.reconciler());
    assert_eq!(
        rows[1..],
        [
            (Role::User, Some("A".into()), "Hello".into()),
            (Role::User, Some("B".into()), "Hi".into()),
        ]
    );
    assert_eq!(session.turn(), TurnIndicator::Idle);
    assert!(!session.reconciler().is_accumulating("A"));
}

#[tokio::test]
async fn malformed_counter_degrades_to_replacement() {
    let mut session = connected_session().await;
    session.handle_json(&json!({
        "type": "user.transcript.delta", "turn_id": 7, "delta_counter": 0, "content": "Hel"
    }));
    session.handle_json(&json!({
        "type": "user.transcript.delta", "turn_id": 7, "delta_counter": "oops", "content": "Hi"
    }));

    let entry = session.reconciler().entry_for(Role::User, "7").unwrap();
    assert_eq!(entry.text, "Hi");
    assert!(!session.reconciler().is_accumulating("7"));
}

#[tokio::test]
async fn final_transcript_replaces_turn_text() {
    let mut session = connected_session().await;
    session.handle_json(&json!({
        "type": "user.transcript.delta", "turn_id": "t", "delta_counter": 0, "content": "helo"
    }));
    session.handle_json(&json!({
        "type": "user.transcript", "turn_id": "t", "content": "Hello."
    }));
    assert_eq!(texts(&session), vec!["Connected", "Hello."]);
}

#[tokio::test]
async fn response_text_accumulates_per_turn() {
    let mut session = connected_session().await;
    session.handle_json(&json!({ "type": "turn.start", "role": "assistant", "turn_id": "r" }));
    assert_eq!(session.turn(), TurnIndicator::Assistant);
    session.handle_json(&json!({ "type": "response.text", "turn_id": "r", "content": "Sure, " }));
    session.handle_json(&json!({ "type": "response.text", "turn_id": "r", "content": "done." }));

    let entry = session.reconciler().entry_for(Role::Assistant, "r").unwrap();
    assert_eq!(entry.text, "Sure, done.");
}

#[tokio::test]
async fn tracks_vad_and_mute_notifications() {
    let mut session = connected_session().await;
    session.handle_json(&json!({ "type": "vad_events", "event": "vad_start" }));
    assert_eq!(session.vad(), VadState::Speech);
    session.handle_json(&json!({ "type": "vad_events", "event": "vad_end" }));
    assert_eq!(session.vad(), VadState::Silence);
    session.handle_json(&json!({ "type": "mute" }));
    assert!(session.is_muted());
}

#[tokio::test]
async fn unknown_notifications_are_ignored_by_default() {
    let mut session = connected_session().await;
    session.handle_json(&json!({ "type": "response.audio", "content": "AAAA" }));
    session.handle_json(&json!({ "no_type": true }));
    assert_eq!(texts(&session), vec!["Connected"]);
}

#[tokio::test]
async fn unknown_notifications_surface_as_data_when_enabled() {
    let mut session = VoiceSession::new(MockTransport::default()).with_diagnostics(true);
    session.connect().await;
    session.handle_json(&json!({ "type": "response.data", "content": { "k": 1 } }));

    let last = session.entries().last().unwrap();
    assert_eq!(last.role, Role::Data);
    assert!(last.turn_id.is_none());
    let raw: serde_json::Value = serde_json::from_str(&last.text).unwrap();
    assert_eq!(raw["type"], "response.data");
}
