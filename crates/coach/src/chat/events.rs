use crate::chat::message::{MessageId, ReplyKind, ReplyOutcome, RequestId};

/// Emitted to the presentation layer after the transcript changes because of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ReplyAppended {
        request_id: RequestId,
        message_id: MessageId,
        kind: ReplyKind,
    },
}

/// Delivered by the reply worker back to the owning controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyReady {
    pub request_id: RequestId,
    pub outcome: ReplyOutcome,
}

impl ReplyReady {
    pub fn new(request_id: RequestId, outcome: ReplyOutcome) -> Self {
        Self {
            request_id,
            outcome,
        }
    }
}
