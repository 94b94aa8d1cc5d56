//! Turn pipeline integration tests
//!
//! Exercise the full transcribe → generate → synthesize sequence over
//! scripted capabilities, without any network or audio hardware.

mod common;

use common::{ChatScript, MockChat, MockStt, MockTts, orchestrator_with};
use pitch_gateway::orchestrator::TurnRequest;
use pitch_gateway::session::Role;
use pitch_gateway::{Error, TurnStage};

fn turn_request(session_id: &str, case_study: &str) -> TurnRequest {
    TurnRequest {
        session_id: session_id.to_string(),
        case_study: case_study.to_string(),
        audio: b"fake-webm-bytes".to_vec(),
        content_type: "audio/webm".to_string(),
    }
}

#[tokio::test]
async fn successful_turn_returns_transcript_reply_and_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::with_transcript("Tell me about your funding ask");
    let chat = MockChat::with_usage("What measurable impact would my gift have?", 90);
    let tts = MockTts::with_audio(b"mp3-reply-bytes");
    let (orchestrator, sessions) =
        orchestrator_with(stt, chat.clone(), tts, dir.path());

    let result = orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap();

    assert_eq!(result.transcript, "Tell me about your funding ask");
    assert_eq!(result.reply, "What measurable impact would my gift have?");
    assert_eq!(result.tokens_used, 90);

    // the artifact resolves and is non-empty
    let path = orchestrator.artifacts().get(&result.audio_id).unwrap();
    let audio = std::fs::read(path).unwrap();
    assert_eq!(audio, b"mp3-reply-bytes");

    // history gained the user and assistant turns after the system turn
    let session = sessions.get_or_create("s1", pitch_gateway::CaseStudy::Template1);
    let session = session.lock().await;
    let history = session.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].role, Role::System);
    assert_eq!(history[1].role, Role::User);
    assert_eq!(history[1].content, "Tell me about your funding ask");
    assert_eq!(history[2].role, Role::Assistant);

    // the capability saw the system turn first
    let seen = chat.seen_messages.lock().unwrap();
    assert_eq!(seen[0][0].role, Role::System);
}

#[tokio::test]
async fn missing_audio_fails_validation_without_touching_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::with_transcript("unused");
    let chat = MockChat::with_reply("unused");
    let tts = MockTts::with_audio(b"unused");
    let (orchestrator, _) =
        orchestrator_with(stt.clone(), chat.clone(), tts.clone(), dir.path());

    let mut request = turn_request("s1", "template1");
    request.audio.clear();
    let err = orchestrator.run_turn(request).await.unwrap_err();

    assert_eq!(err.stage(), Some(TurnStage::Validation));
    assert_eq!(stt.call_count(), 0);
    assert_eq!(chat.call_count(), 0);
    assert_eq!(tts.call_count(), 0);
}

#[tokio::test]
async fn empty_transcript_fails_the_turn_and_leaves_history_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::empty();
    let chat = MockChat::with_reply("unused");
    let tts = MockTts::with_audio(b"unused");
    let (orchestrator, sessions) =
        orchestrator_with(stt, chat.clone(), tts.clone(), dir.path());

    let err = orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transcription(_)));
    assert_eq!(err.stage(), Some(TurnStage::Transcription));

    // no downstream capability was reached
    assert_eq!(chat.call_count(), 0);
    assert_eq!(tts.call_count(), 0);

    // only the system turn remains
    let session = sessions.get_or_create("s1", pitch_gateway::CaseStudy::Template1);
    let session = session.lock().await;
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].role, Role::System);
}

#[tokio::test]
async fn stt_outage_reports_a_transcription_failure() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::failing();
    let chat = MockChat::with_reply("unused");
    let tts = MockTts::with_audio(b"unused");
    let (orchestrator, _) = orchestrator_with(stt, chat.clone(), tts, dir.path());

    let err = orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(TurnStage::Transcription));
    assert_eq!(chat.call_count(), 0);
}

#[tokio::test]
async fn generation_failure_keeps_the_user_turn() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::with_transcript("Here is our pitch");
    let chat = MockChat::failing();
    let tts = MockTts::with_audio(b"unused");
    let (orchestrator, sessions) =
        orchestrator_with(stt, chat, tts.clone(), dir.path());

    let err = orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(TurnStage::Generation));
    assert_eq!(tts.call_count(), 0);

    // the failed turn still consumed an utterance slot
    let session = sessions.get_or_create("s1", pitch_gateway::CaseStudy::Template1);
    let session = session.lock().await;
    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, Role::User);
    assert_eq!(history[1].content, "Here is our pitch");
}

#[tokio::test]
async fn empty_reply_is_a_generation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::with_transcript("Here is our pitch");
    let chat = MockChat::with_reply("   ");
    let tts = MockTts::with_audio(b"unused");
    let (orchestrator, _) = orchestrator_with(stt, chat, tts.clone(), dir.path());

    let err = orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(TurnStage::Generation));
    assert_eq!(tts.call_count(), 0);
}

#[tokio::test]
async fn synthesis_failure_keeps_both_new_turns() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::with_transcript("Our ask is fifty thousand dollars");
    let chat = MockChat::with_reply("What outcomes does that buy?");
    let tts = MockTts::failing();
    let (orchestrator, sessions) = orchestrator_with(stt, chat, tts, dir.path());

    let err = orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(TurnStage::Synthesis));

    let session = sessions.get_or_create("s1", pitch_gateway::CaseStudy::Template1);
    let session = session.lock().await;
    let history = session.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].role, Role::User);
    assert_eq!(history[2].role, Role::Assistant);
}

#[tokio::test]
async fn zero_byte_synthesis_never_publishes_an_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::with_transcript("hello");
    let chat = MockChat::with_reply("hi there");
    let tts = MockTts::silent();
    let (orchestrator, _) = orchestrator_with(stt, chat, tts, dir.path());

    let err = orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(TurnStage::Synthesis));

    // nothing was published
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "no artifact files expected");
}

#[tokio::test]
async fn unknown_case_study_falls_back_to_the_default_persona() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::with_transcript("hello");
    let chat = MockChat::with_reply("hi");
    let tts = MockTts::with_audio(b"mp3");
    let (orchestrator, sessions) = orchestrator_with(stt, chat, tts, dir.path());

    orchestrator
        .run_turn(turn_request("s1", "nonsense-id"))
        .await
        .unwrap();

    let session = sessions.get_or_create("s1", pitch_gateway::CaseStudy::DEFAULT);
    let session = session.lock().await;
    assert_eq!(session.case_study(), pitch_gateway::CaseStudy::DEFAULT);
    assert_eq!(
        session.history()[0].content,
        pitch_gateway::CaseStudy::DEFAULT.persona().system_prompt
    );
}

#[tokio::test]
async fn concurrent_turns_for_different_sessions_stay_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::sequence(vec![
        common::SttScript::Text("from session one".to_string()),
        common::SttScript::Text("from session two".to_string()),
    ]);
    let chat = MockChat::sequence(vec![ChatScript::Reply {
        text: "noted".to_string(),
        usage: None,
    }]);
    let tts = MockTts::with_audio(b"mp3");
    let (orchestrator, sessions) = orchestrator_with(stt, chat, tts, dir.path());

    let (a, b) = tokio::join!(
        orchestrator.run_turn(turn_request("s1", "template1")),
        orchestrator.run_turn(turn_request("s2", "template2")),
    );
    a.unwrap();
    b.unwrap();

    let s1 = sessions.get_or_create("s1", pitch_gateway::CaseStudy::Template1);
    let s1 = s1.lock().await;
    let s2 = sessions.get_or_create("s2", pitch_gateway::CaseStudy::Template2);
    let s2 = s2.lock().await;

    // each history holds exactly its own user turn
    assert_eq!(s1.history().len(), 3);
    assert_eq!(s2.history().len(), 3);
    let user_turns: Vec<&str> = s1
        .history()
        .iter()
        .chain(s2.history())
        .filter(|t| t.role == Role::User)
        .map(|t| t.content.as_str())
        .collect();
    assert_eq!(user_turns.len(), 2);
    assert!(user_turns.contains(&"from session one"));
    assert!(user_turns.contains(&"from session two"));
    assert_ne!(s1.history()[1].content, s2.history()[1].content);

    // the personas did not bleed across sessions
    assert_eq!(s1.case_study(), pitch_gateway::CaseStudy::Template1);
    assert_eq!(s2.case_study(), pitch_gateway::CaseStudy::Template2);
}

#[tokio::test]
async fn sequential_turns_for_one_session_share_history() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::sequence(vec![
        common::SttScript::Text("first question".to_string()),
        common::SttScript::Text("second question".to_string()),
    ]);
    let chat = MockChat::with_reply("answer");
    let tts = MockTts::with_audio(b"mp3");
    let (orchestrator, sessions) = orchestrator_with(stt, chat, tts, dir.path());

    orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap();
    orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap();

    let session = sessions.get_or_create("s1", pitch_gateway::CaseStudy::Template1);
    let session = session.lock().await;
    let history = session.history();
    assert_eq!(history.len(), 5);
    assert_eq!(history[1].content, "first question");
    assert_eq!(history[3].content, "second question");
}

#[tokio::test]
async fn reset_then_turn_starts_from_a_fresh_history() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::with_transcript("hello again");
    let chat = MockChat::with_reply("fresh start");
    let tts = MockTts::with_audio(b"mp3");
    let (orchestrator, sessions) = orchestrator_with(stt, chat, tts, dir.path());

    orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap();
    sessions.reset("s1");
    orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap();

    let session = sessions.get_or_create("s1", pitch_gateway::CaseStudy::Template1);
    let session = session.lock().await;
    let history = session.history();
    // system + exactly one user/assistant pair; no residue from before reset
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].role, Role::System);
    assert_eq!(history[1].content, "hello again");
}

#[tokio::test]
async fn artifact_ids_resolve_for_any_consumer_knowing_the_id() {
    let dir = tempfile::tempdir().unwrap();
    let stt = MockStt::with_transcript("hello");
    let chat = MockChat::with_reply("hi");
    let tts = MockTts::with_audio(b"the-voice-reply");
    let (orchestrator, _) = orchestrator_with(stt, chat, tts, dir.path());

    let result = orchestrator
        .run_turn(turn_request("s1", "template1"))
        .await
        .unwrap();

    // a separate store over the same directory re-derives the path
    let other = pitch_gateway::ArtifactStore::open(dir.path()).unwrap();
    let path = other.get(&result.audio_id).unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"the-voice-reply");
}
