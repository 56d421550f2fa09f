use chrono::{DateTime, Utc};

use crate::chat::message::{
    Author, DegradedCause, FALLBACK_REPLY, GREETING_MESSAGES, Message, MessageId, ReplyKind,
    ReplyOutcome, RequestId, SessionStatus,
};

/// Work handed to the caller after a submission is accepted.
///
/// By the time this exists the user message is in the transcript and the
/// session is already `AwaitingResponse(request_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub user_message_id: MessageId,
    pub prompt: String,
}

/// Reason a submission was not accepted. Nothing changes when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyDraft,
    AwaitingResponse(RequestId),
    Disposed,
}

/// Reason a reply could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveRejection {
    NoPendingRequest,
    RequestMismatch {
        active: RequestId,
        attempted: RequestId,
    },
    Disposed,
}

/// Transcript plus request gate for one coach screen.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
    status: SessionStatus,
    draft: String,
    next_message_id: u64,
    next_request_id: u64,
    disposed: bool,
}

impl ChatSession {
    /// Creates a session seeded with the greeting messages.
    pub fn new() -> Self {
        let mut session = Self {
            messages: Vec::with_capacity(GREETING_MESSAGES.len()),
            status: SessionStatus::Idle,
            draft: String::new(),
            next_message_id: 1,
            next_request_id: 1,
            disposed: false,
        };

        for greeting in GREETING_MESSAGES {
            session.push_message(Author::Assistant, greeting);
        }

        session
    }

    pub fn transcript(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_awaiting_response(&self) -> bool {
        !self.status.is_idle()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replaces the draft. Allowed while a reply is outstanding.
    pub fn set_draft(&mut self, draft: impl Into<String>) {
        if self.disposed {
            return;
        }
        self.draft = draft.into();
    }

    /// Whether the send affordance should be enabled for the current draft.
    pub fn can_submit(&self) -> bool {
        self.check_submit(&self.draft).is_ok()
    }

    /// Submits the current draft.
    pub fn submit_draft(&mut self) -> Result<PendingRequest, SubmitRejection> {
        let draft = self.draft.clone();
        self.submit(draft)
    }

    /// Accepts `text` as the next user turn.
    ///
    /// On success the user message is appended, the draft is cleared and the
    /// status is moved to `AwaitingResponse` before returning, so a second
    /// submission observes the gate even if the caller has not yet started
    /// the assistant call.
    pub fn submit(&mut self, text: impl Into<String>) -> Result<PendingRequest, SubmitRejection> {
        let text = text.into();
        self.check_submit(&text)?;

        let request_id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;

        let user_message_id = self.push_message(Author::User, text.clone());
        self.draft.clear();
        self.status = SessionStatus::AwaitingResponse(request_id);

        tracing::debug!(
            request_id = %request_id,
            message_id = user_message_id.0,
            transcript_len = self.messages.len(),
            "submission accepted"
        );

        Ok(PendingRequest {
            request_id,
            user_message_id,
            prompt: text,
        })
    }

    /// Appends the reply for `request_id` and returns the session to idle.
    ///
    /// Blank answers are treated as malformed and replaced by the fallback.
    pub fn resolve(
        &mut self,
        request_id: RequestId,
        outcome: ReplyOutcome,
    ) -> Result<(&Message, ReplyKind), ResolveRejection> {
        if self.disposed {
            return Err(ResolveRejection::Disposed);
        }

        match self.status {
            SessionStatus::AwaitingResponse(active) if active == request_id => {}
            SessionStatus::AwaitingResponse(active) => {
                return Err(ResolveRejection::RequestMismatch {
                    active,
                    attempted: request_id,
                });
            }
            SessionStatus::Idle => return Err(ResolveRejection::NoPendingRequest),
        }

        let outcome = match outcome {
            ReplyOutcome::Answered(text) if text.trim().is_empty() => ReplyOutcome::Degraded {
                cause: DegradedCause::EmptyResponse,
            },
            other => other,
        };

        let (text, kind) = match outcome {
            ReplyOutcome::Answered(text) => (text, ReplyKind::Answered),
            ReplyOutcome::Degraded { cause } => {
                tracing::info!(
                    request_id = %request_id,
                    cause = cause.as_str(),
                    "replying with fallback text"
                );
                (FALLBACK_REPLY.to_string(), ReplyKind::Degraded)
            }
        };

        self.push_message(Author::Assistant, text);
        self.status = SessionStatus::Idle;

        let message = self
            .messages
            .last()
            .ok_or(ResolveRejection::NoPendingRequest)?;
        Ok((message, kind))
    }

    /// Tears the session down. Every later mutation is ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.status = SessionStatus::Idle;
        self.draft.clear();
    }

    fn check_submit(&self, text: &str) -> Result<(), SubmitRejection> {
        if self.disposed {
            return Err(SubmitRejection::Disposed);
        }
        if let SessionStatus::AwaitingResponse(active) = self.status {
            return Err(SubmitRejection::AwaitingResponse(active));
        }
        if text.trim().is_empty() {
            return Err(SubmitRejection::EmptyDraft);
        }
        Ok(())
    }

    fn push_message(&mut self, author: Author, text: impl Into<String>) -> MessageId {
        let id = MessageId::new(self.next_message_id);
        self.next_message_id += 1;
        let created_at = self.next_timestamp(Utc::now());
        self.messages.push(Message::new(id, author, text, created_at));
        id
    }

    // Wall clock may step backwards; the transcript must not.
    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.messages.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
