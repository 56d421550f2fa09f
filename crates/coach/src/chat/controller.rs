use std::sync::Arc;
use std::time::Duration;

use fishcoach_llm::AssistantService;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::chat::events::{ReplyReady, SessionEvent};
use crate::chat::message::{DegradedCause, Message, ReplyOutcome, RequestId, SessionStatus};
use crate::chat::pulse::LoadingPulse;
use crate::chat::scroll_manager::{ScrollCommand, ScrollManager};
use crate::chat::session::{ChatSession, PendingRequest, SubmitRejection};

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Bookkeeping for the single outstanding assistant call.
struct InFlightReply {
    request_id: RequestId,
    receiver: oneshot::Receiver<ReplyReady>,
    worker: JoinHandle<()>,
}

/// Owns one coach screen's session and drives the assistant call for it.
///
/// All methods take `&mut self` and are expected to run on the loop that
/// owns the screen. The only work that leaves that loop is the assistant
/// call itself, which runs on a spawned tokio task and reports back through
/// a one-shot channel consumed by [`ChatController::next_event`].
pub struct ChatController {
    session: ChatSession,
    scroll: ScrollManager,
    pulse: LoadingPulse,
    assistant: Arc<dyn AssistantService>,
    reply_timeout: Duration,
    in_flight: Option<InFlightReply>,
}

impl ChatController {
    pub fn new(assistant: Arc<dyn AssistantService>) -> Self {
        let session = ChatSession::new();
        let scroll = ScrollManager::new(session.transcript().len());
        Self {
            session,
            scroll,
            pulse: LoadingPulse::new(),
            assistant,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            in_flight: None,
        }
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    pub fn assistant_id(&self) -> &str {
        self.assistant.id()
    }

    pub fn transcript(&self) -> &[Message] {
        self.session.transcript()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.session.is_awaiting_response()
    }

    pub fn is_disposed(&self) -> bool {
        self.session.is_disposed()
    }

    pub fn draft(&self) -> &str {
        self.session.draft()
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.session.set_draft(draft);
    }

    pub fn can_submit(&self) -> bool {
        self.session.can_submit()
    }

    /// Opacity feed for the loading dots.
    pub fn loading_opacity(&self) -> watch::Receiver<f32> {
        self.pulse.subscribe()
    }

    pub fn is_loading_indicator_running(&self) -> bool {
        self.pulse.is_running()
    }

    /// Submits `text`. Returns false when submission is currently unavailable.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, text: impl Into<String>) -> bool {
        let result = self.session.submit(text);
        self.start_request(result)
    }

    /// Submits the held draft. Returns false when submission is currently unavailable.
    pub fn submit_draft(&mut self) -> bool {
        let result = self.session.submit_draft();
        self.start_request(result)
    }

    /// Waits for the outstanding reply and applies it.
    ///
    /// Returns `None` immediately when nothing is outstanding. Cancel safe:
    /// dropping the future before it completes leaves the reply pending.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let in_flight = self.in_flight.as_mut()?;
        let ready = match (&mut in_flight.receiver).await {
            Ok(ready) => ready,
            Err(_) => Self::worker_closed(in_flight.request_id),
        };
        self.in_flight = None;
        self.apply_reply(ready)
    }

    /// Applies the outstanding reply if it has already arrived.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        let in_flight = self.in_flight.as_mut()?;
        let ready = match in_flight.receiver.try_recv() {
            Ok(ready) => ready,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Self::worker_closed(in_flight.request_id),
        };
        self.in_flight = None;
        self.apply_reply(ready)
    }

    pub fn observe_viewport_position(
        &mut self,
        offset: f32,
        content_height: f32,
        viewport_height: f32,
    ) -> bool {
        self.scroll
            .observe_viewport_position(offset, content_height, viewport_height)
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll.request_scroll_to_end();
    }

    pub fn take_scroll_command(&mut self) -> Option<ScrollCommand> {
        self.scroll.take_scroll_command()
    }

    pub fn shows_jump_to_latest(&self) -> bool {
        self.scroll.shows_jump_to_latest()
    }

    /// Tears the screen down: the reply worker is aborted, the pulse is
    /// stopped, and the session stops accepting changes.
    pub fn dispose(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.worker.abort();
            tracing::debug!(
                request_id = %in_flight.request_id,
                "disposed with a reply outstanding; result will be dropped"
            );
        }
        self.pulse.stop();
        self.session.dispose();
    }

    fn start_request(&mut self, result: Result<PendingRequest, SubmitRejection>) -> bool {
        let request = match result {
            Ok(request) => request,
            Err(rejection) => {
                tracing::debug!(?rejection, "submission unavailable");
                return false;
            }
        };

        self.scroll.on_transcript_len(self.session.transcript().len());
        self.pulse.start();

        let request_id = request.request_id;
        let (reply_tx, receiver) = oneshot::channel();
        let worker = tokio::spawn(run_reply_worker(
            Arc::clone(&self.assistant),
            request,
            self.reply_timeout,
            reply_tx,
        ));

        self.in_flight = Some(InFlightReply {
            request_id,
            receiver,
            worker,
        });
        true
    }

    fn apply_reply(&mut self, ready: ReplyReady) -> Option<SessionEvent> {
        let request_id = ready.request_id;
        let applied = self
            .session
            .resolve(request_id, ready.outcome)
            .map(|(message, kind)| (message.id, kind));

        if !self.session.is_awaiting_response() {
            self.pulse.stop();
        }

        match applied {
            Ok((message_id, kind)) => {
                self.scroll.on_transcript_len(self.session.transcript().len());
                Some(SessionEvent::ReplyAppended {
                    request_id,
                    message_id,
                    kind,
                })
            }
            Err(rejection) => {
                tracing::warn!(request_id = %request_id, ?rejection, "dropping reply");
                None
            }
        }
    }

    fn worker_closed(request_id: RequestId) -> ReplyReady {
        tracing::warn!(request_id = %request_id, "reply worker ended without a result");
        ReplyReady::new(
            request_id,
            ReplyOutcome::Degraded {
                cause: DegradedCause::WorkerClosed,
            },
        )
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn run_reply_worker(
    assistant: Arc<dyn AssistantService>,
    request: PendingRequest,
    reply_timeout: Duration,
    reply_tx: oneshot::Sender<ReplyReady>,
) {
    let request_id = request.request_id;
    let outcome = match tokio::time::timeout(reply_timeout, assistant.ask(request.prompt)).await {
        Ok(Ok(text)) => ReplyOutcome::Answered(text),
        Ok(Err(error)) => {
            tracing::warn!(
                request_id = %request_id,
                provider_id = %assistant.id(),
                error = %error,
                "assistant call failed"
            );
            ReplyOutcome::Degraded {
                cause: DegradedCause::Provider,
            }
        }
        Err(_) => {
            tracing::warn!(
                request_id = %request_id,
                provider_id = %assistant.id(),
                ?reply_timeout,
                "assistant call timed out"
            );
            ReplyOutcome::Degraded {
                cause: DegradedCause::Timeout,
            }
        }
    };

    if reply_tx.send(ReplyReady::new(request_id, outcome)).is_err() {
        tracing::debug!(request_id = %request_id, "controller gone before reply was delivered");
    }
}
