//! Full pipeline: stdio requests through the registry, outbox and file sink.

use std::time::Duration;
use tictactoe_engine::{EventEnvelope, RetryPolicy, SessionRegistry, outbox};
use tictactoe_service::{JsonLinesSink, serve};

#[tokio::test]
async fn test_game_over_stdio_lands_in_event_file() {
    let file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let sink = JsonLinesSink::append_to("games", file.path()).expect("open");
    let (publisher, dispatcher) = outbox(
        sink,
        16,
        RetryPolicy {
            max_attempts: 1,
            backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        },
    );
    let dispatcher = tokio::spawn(dispatcher.run());
    let registry = SessionRegistry::new(publisher);

    let mut output = Vec::new();
    serve(
        &registry,
        &br#"{"op":"create_session","player_ids":["alice","bob"]}"#[..],
        &mut output,
    )
    .await
    .expect("serve");
    let created: serde_json::Value =
        serde_json::from_slice(&output).expect("created reply");
    let session_id = created["session_id"].as_str().expect("session id").to_string();

    let moves = [("alice", 0, 0), ("bob", 1, 1), ("alice", 0, 1), ("bob", 2, 2), ("alice", 0, 2)];
    let input: String = moves
        .iter()
        .enumerate()
        .map(|(i, (player, x, y))| {
            format!(
                "{{\"op\":\"apply_turn\",\"session_id\":\"{}\",\"player_id\":\"{}\",\"move_id\":{},\"x\":{},\"y\":{}}}\n",
                session_id, player, i, x, y
            )
        })
        .collect();
    let mut output = Vec::new();
    let handled = serve(&registry, input.as_bytes(), &mut output)
        .await
        .expect("serve");
    assert_eq!(handled, 5);

    let replies: Vec<serde_json::Value> = String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json"))
        .collect();
    assert!(replies[..4].iter().all(|r| r["status"] == "accepted"));
    assert_eq!(replies[4]["status"], "finished");
    assert_eq!(replies[4]["outcome"]["player"], "alice");

    drop(registry);
    let delivered = dispatcher.await.expect("dispatcher");
    assert_eq!(delivered, 6);

    let content = std::fs::read_to_string(file.path()).expect("read");
    let envelopes: Vec<EventEnvelope> = content
        .lines()
        .map(|l| serde_json::from_str(l).expect("envelope"))
        .collect();
    assert_eq!(envelopes.len(), 6);
    assert!(envelopes.iter().all(|e| e.topic == "games" && e.key == session_id));
    let last = envelopes.last().expect("event");
    let record = last.event.outcome.as_ref().expect("outcome");
    assert_eq!(record.winning_player_id, "alice");
}
