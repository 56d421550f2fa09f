/// Async driver tying the session to the assistant backend.
pub mod controller;
/// Event contracts between the controller and the presentation layer.
pub mod events;
/// Domain entities and fixed copy.
pub mod message;
pub mod pulse;
pub mod scroll_manager;
pub mod session;

pub use controller::{ChatController, DEFAULT_REPLY_TIMEOUT};
pub use events::{ReplyReady, SessionEvent};
pub use message::{
    Author, DEFAULT_PERSONA, DegradedCause, FALLBACK_REPLY, GREETING_MESSAGES, Message, MessageId,
    ReplyKind, ReplyOutcome, RequestId, SessionStatus,
};
pub use pulse::{LoadingPulse, pulse_opacity};
pub use scroll_manager::{ScrollCommand, ScrollManager, VIEWING_HISTORY_THRESHOLD, is_at_bottom};
pub use session::{ChatSession, PendingRequest, ResolveRejection, SubmitRejection};
