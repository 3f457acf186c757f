//! End-to-end behavior of a conversation over scripted and HTTP transports.

use std::sync::Arc;
use std::time::Duration;

use chatstream::prelude::*;
use chatstream_session::test_utils::{Script, ScriptedTransport, delta_line};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const HI: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n";
const DONE: &str = "data: [DONE]\n";

fn finished(submission: Submission) -> SessionReport {
    match submission {
        Submission::Finished(report) => report,
        other => panic!("expected Finished, got {other:?}"),
    }
}

fn assistant_turns(transcript: &Transcript) -> Vec<String> {
    transcript
        .turns()
        .iter()
        .filter(|t| t.role == Role::Assistant)
        .map(|t| t.content.clone())
        .collect()
}

async fn run(chunks: &[&[u8]]) -> (SessionReport, Transcript) {
    let script = chunks
        .iter()
        .fold(Script::ok(), |script, chunk| script.chunk(*chunk));
    let conversation = Conversation::new(ScriptedTransport::new().script(script));
    let report = finished(conversation.submit("Hello").await);
    (report, conversation.transcript())
}

#[tokio::test]
async fn single_delta_then_done() {
    let (report, transcript) = run(&[HI.as_bytes(), DONE.as_bytes()]).await;
    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(assistant_turns(&transcript), vec!["Hi"]);
}

#[tokio::test]
async fn heartbeat_adds_nothing() {
    let (report, transcript) = run(&[b":heartbeat\n\n".as_slice(), DONE.as_bytes()]).await;
    assert!(report.is_completed());
    assert_eq!(report.deltas, 0);
    assert_eq!(transcript.turns(), &[ChatTurn::user("Hello")]);
}

#[tokio::test]
async fn json_split_across_chunks() {
    let (first, second) = HI.as_bytes().split_at(24);
    let (report, transcript) = run(&[first, second, DONE.as_bytes()]).await;
    assert_eq!(report.deltas, 1);
    assert_eq!(assistant_turns(&transcript), vec!["Hi"]);
}

#[tokio::test]
async fn multibyte_character_split_across_chunks() {
    let line = delta_line("Grüße 🦀");
    let bytes = line.as_bytes();
    let crab = line.find('🦀').unwrap();
    let (report, transcript) = run(&[&bytes[..crab + 2], &bytes[crab + 2..]]).await;
    assert!(report.is_completed());
    assert_eq!(assistant_turns(&transcript), vec!["Grüße 🦀"]);
}

#[tokio::test]
async fn payload_cut_by_stray_newline_is_recovered() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"He\n\
                llo\"}}]}\n\
                data: [DONE]\n";
    let (report, transcript) = run(&[body.as_bytes()]).await;
    assert_eq!(report.recovered, 1);
    assert_eq!(report.malformed, 0);
    assert_eq!(assistant_turns(&transcript), vec!["Hello"]);
}

#[tokio::test]
async fn stream_ending_mid_line_reports_truncation() {
    let (report, transcript) = run(&[HI.as_bytes(), b"data: {\"choices\":[{\"del".as_slice()]).await;
    assert!(report.is_completed());
    assert!(report.truncation.is_some());
    assert_eq!(assistant_turns(&transcript), vec!["Hi"]);
}

#[tokio::test]
async fn same_input_same_transcript() {
    let body = format!(
        "{}: ping\n\n{}data: oops\n{}{DONE}",
        delta_line("a"),
        delta_line("b"),
        delta_line("c")
    );
    let chunks: Vec<&[u8]> = body.as_bytes().chunks(7).collect();

    let (first_report, first) = run(&chunks).await;
    let (second_report, second) = run(&chunks).await;
    assert_eq!(first, second);
    assert_eq!(first_report.malformed, second_report.malformed);
    assert_eq!(assistant_turns(&first), vec!["abc"]);
}

#[tokio::test]
async fn submission_while_streaming_is_ignored() {
    let transport = ScriptedTransport::new().script(Script::ok().chunk(HI).stall());
    let conversation = Arc::new(Conversation::new(transport));

    let streaming = {
        let conversation = Arc::clone(&conversation);
        tokio::spawn(async move { conversation.submit("first").await })
    };
    for _ in 0..400 {
        if conversation.transcript().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(conversation.state(), SessionState::Streaming);

    let before = conversation.transcript();
    assert!(matches!(conversation.submit("second").await, Submission::Busy));
    assert_eq!(conversation.transcript(), before);

    conversation.close();
    assert!(matches!(streaming.await.unwrap(), Submission::Cancelled));
    assert_eq!(conversation.transcript(), before);
}

#[tokio::test]
async fn http_500_becomes_one_synthetic_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "rate limited"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let snapshots = SnapshotObserver::new();
    let state = snapshots.subscribe_state();
    let conversation = Conversation::new(HttpTransport::new(server.uri())).observer(snapshots);

    let report = finished(conversation.submit("Hello").await);
    assert_eq!(report.state, SessionState::Failed);
    assert_eq!(*state.borrow(), SessionState::Failed);

    let replies = assistant_turns(&conversation.transcript());
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("rate limited"));
}

#[tokio::test]
async fn http_stream_accumulates_deltas() {
    let server = MockServer::start().await;
    let body = format!("{}{}{DONE}", delta_line("Hello, "), delta_line("world"));
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let conversation = Conversation::new(HttpTransport::new(server.uri()));
    let report = finished(conversation.submit("Hello").await);
    assert!(report.is_completed());
    assert_eq!(report.deltas, 2);
    assert_eq!(assistant_turns(&conversation.transcript()), vec!["Hello, world"]);
}
