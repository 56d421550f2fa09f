use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fishcoach::chat::{
    Author, ChatController, FALLBACK_REPLY, GREETING_MESSAGES, ReplyKind, SessionEvent,
    SessionStatus,
};
use fishcoach_llm::{AssistantService, ProviderError, ProviderResult};
use futures::future::BoxFuture;
use tokio::sync::oneshot;

enum Scripted {
    Reply(&'static str),
    Fail,
    Gate(oneshot::Receiver<ProviderResult<String>>),
}

#[derive(Default)]
struct ScriptedAssistant {
    script: Mutex<VecDeque<Scripted>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAssistant {
    fn with(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log").clone()
    }
}

impl AssistantService for ScriptedAssistant {
    fn id(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    fn ask(&self, prompt: String) -> BoxFuture<'_, ProviderResult<String>> {
        self.prompts.lock().expect("prompt log").push(prompt);
        let next = self.script.lock().expect("script").pop_front();
        Box::pin(async move {
            match next {
                Some(Scripted::Reply(text)) => Ok(text.to_string()),
                Some(Scripted::Fail) | None => Err(ProviderError::EmptyResponse {
                    stage: "scripted",
                }),
                Some(Scripted::Gate(gate)) => match gate.await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::EmptyResponse { stage: "gate" }),
                },
            }
        })
    }
}

fn texts(controller: &ChatController) -> Vec<(Author, String)> {
    controller
        .transcript()
        .iter()
        .map(|message| (message.author, message.text.clone()))
        .collect()
}

#[tokio::test]
async fn bass_question_gets_answer_appended_in_order() {
    let assistant = ScriptedAssistant::with([Scripted::Reply("Try soft plastics.")]);
    let mut controller = ChatController::new(assistant.clone());

    assert!(controller.submit("What bait works for bass?"));
    let event = controller.next_event().await.expect("reply");

    assert!(matches!(
        event,
        SessionEvent::ReplyAppended {
            kind: ReplyKind::Answered,
            ..
        }
    ));
    assert_eq!(
        texts(&controller),
        vec![
            (Author::Assistant, GREETING_MESSAGES[0].to_string()),
            (Author::Assistant, GREETING_MESSAGES[1].to_string()),
            (Author::User, "What bait works for bass?".to_string()),
            (Author::Assistant, "Try soft plastics.".to_string()),
        ]
    );
    assert_eq!(controller.status(), SessionStatus::Idle);
    assert_eq!(assistant.prompts(), vec!["What bait works for bass?"]);
}

#[tokio::test]
async fn failed_call_appends_fallback_verbatim() {
    let mut controller = ChatController::new(ScriptedAssistant::with([Scripted::Fail]));

    assert!(controller.submit("Best tide?"));
    controller.next_event().await.expect("reply");

    let last = controller.transcript().last().expect("fallback");
    assert_eq!(last.author, Author::Assistant);
    assert_eq!(last.text, FALLBACK_REPLY);
    assert_eq!(controller.status(), SessionStatus::Idle);
    assert!(!controller.is_loading_indicator_running());
}

#[tokio::test]
async fn transcript_grows_by_two_per_resolved_submission() {
    let script = [
        Scripted::Reply("Dawn."),
        Scripted::Fail,
        Scripted::Reply("Spinnerbait."),
        Scripted::Fail,
    ];
    let mut controller = ChatController::new(ScriptedAssistant::with(script));

    for (round, question) in ["When?", "Where?", "What lure?", "How deep?"]
        .into_iter()
        .enumerate()
    {
        assert!(controller.submit(question));
        controller.next_event().await.expect("reply");

        let transcript = controller.transcript();
        assert_eq!(transcript.len(), 2 + 2 * (round + 1));
        let user = &transcript[transcript.len() - 2];
        let reply = &transcript[transcript.len() - 1];
        assert_eq!(user.author, Author::User);
        assert_eq!(reply.author, Author::Assistant);
        assert!(reply.created_at >= user.created_at);
        assert!(controller.status().is_idle());
    }
}

#[tokio::test]
async fn submissions_while_awaiting_are_ignored() {
    let (release, gate) = oneshot::channel();
    let assistant = ScriptedAssistant::with([Scripted::Gate(gate)]);
    let mut controller = ChatController::new(assistant.clone());

    assert!(controller.submit("Best tide?"));
    let status = controller.status();
    let len = controller.transcript().len();

    for attempt in ["again?", "hello?", "   "] {
        assert!(!controller.submit(attempt));
        assert_eq!(controller.transcript().len(), len);
        assert_eq!(controller.status(), status);
    }

    // The user may keep typing a new draft meanwhile.
    controller.set_draft("What about the moon?");
    assert!(!controller.can_submit());
    assert!(!controller.submit_draft());
    assert_eq!(controller.draft(), "What about the moon?");

    release
        .send(Ok("Incoming, two hours after low.".to_string()))
        .expect("worker waiting");
    controller.next_event().await.expect("reply");

    assert!(controller.can_submit());
    assert!(controller.submit_draft());
    assert_eq!(controller.draft(), "");
    assert_eq!(assistant.prompts(), vec!["Best tide?", "What about the moon?"]);
}

#[tokio::test]
async fn empty_drafts_never_reach_the_assistant() {
    let assistant = ScriptedAssistant::empty();
    let mut controller = ChatController::new(assistant.clone());

    assert!(!controller.submit(""));
    assert!(!controller.submit(" \n\t "));

    assert_eq!(controller.transcript().len(), 2);
    assert!(controller.status().is_idle());
    assert!(assistant.prompts().is_empty());
}

#[tokio::test]
async fn viewport_threshold_matches_reference_geometry() {
    let mut controller = ChatController::new(ScriptedAssistant::empty());

    assert!(controller.observe_viewport_position(900.0, 1000.0, 100.0));
    assert!(!controller.shows_jump_to_latest());
    assert!(!controller.observe_viewport_position(800.0, 1000.0, 100.0));
    assert!(controller.shows_jump_to_latest());
}

#[tokio::test(start_paused = true)]
async fn loading_pulse_tracks_awaiting_state_on_every_exit() {
    let (release, gate) = oneshot::channel();
    let script = [Scripted::Gate(gate), Scripted::Fail];
    let mut controller = ChatController::new(ScriptedAssistant::with(script))
        .with_reply_timeout(Duration::from_secs(30));
    let mut opacity = controller.loading_opacity();

    assert!(!controller.is_loading_indicator_running());
    assert!(controller.submit("first"));
    assert!(controller.is_loading_indicator_running());

    tokio::time::sleep(Duration::from_millis(400)).await;
    opacity.changed().await.expect("pulse frames");
    assert!(*opacity.borrow() > 0.3);

    release.send(Ok("ok".to_string())).expect("worker waiting");
    controller.next_event().await.expect("success path");
    assert!(!controller.is_loading_indicator_running());

    assert!(controller.submit("second"));
    assert!(controller.is_loading_indicator_running());
    controller.next_event().await.expect("failure path");
    assert!(!controller.is_loading_indicator_running());
    assert!((*opacity.borrow() - 0.3).abs() < 1e-4);
}

#[tokio::test]
async fn teardown_with_outstanding_call_leaves_no_timer_and_no_late_update() {
    let (release, gate) = oneshot::channel();
    let mut controller = ChatController::new(ScriptedAssistant::with([Scripted::Gate(gate)]));

    assert!(controller.submit("Where are the walleye?"));
    controller.dispose();

    assert!(!controller.is_loading_indicator_running());
    // Worker was aborted, so nobody is listening on the gate anymore.
    tokio::task::yield_now().await;
    let _ = release.send(Ok("Deep weed edges.".to_string()));

    assert_eq!(controller.next_event().await, None);
    assert_eq!(controller.try_next_event(), None);
    assert_eq!(controller.transcript().len(), 3);
    assert_eq!(
        controller.transcript().last().map(|message| message.author),
        Some(Author::User)
    );
}
