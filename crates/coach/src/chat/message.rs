use chrono::{DateTime, Utc};

/// Opening lines shown before the user has said anything.
pub const GREETING_MESSAGES: [&str; 2] = [
    "👋 Hey there! I'm Fish Coach. Here to provide expert advice on fishing techniques and fish behavior to help you improve your angling skills. 🎣",
    "Ask me anything about fishing, and I'll do my best to help!",
];

/// Reply shown whenever the assistant call does not produce usable text.
pub const FALLBACK_REPLY: &str =
    "Sorry, I'm experiencing high demand right now. Please try again in a moment.";

/// Default system instruction for the assistant backend.
pub const DEFAULT_PERSONA: &str = "You are Fish Coach, an expert fishing advisor. Provide helpful advice about fishing techniques, fish behavior, equipment, and locations. Keep responses conversational and encouraging.";

/// Stable identifier for one transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Creates a typed message identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identifier for one outstanding assistant call.
///
/// Changes on every accepted submission so a late reply can never land on
/// a newer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "req-{}", self.0)
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Author {
    User,
    Assistant,
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        id: MessageId,
        author: Author,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            author,
            text: text.into(),
            created_at,
        }
    }
}

/// Request lifecycle gate. At most one call is ever outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    AwaitingResponse(RequestId),
}

impl SessionStatus {
    /// Returns the outstanding request if and only if one exists.
    pub fn pending_request(&self) -> Option<RequestId> {
        match self {
            Self::AwaitingResponse(request_id) => Some(*request_id),
            Self::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Why an assistant call produced no usable text. Logged, never shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DegradedCause {
    Timeout,
    Provider,
    EmptyResponse,
    WorkerClosed,
}

impl DegradedCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Provider => "provider",
            Self::EmptyResponse => "empty-response",
            Self::WorkerClosed => "worker-closed",
        }
    }
}

/// Result of one assistant call as the session consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Answered(String),
    Degraded { cause: DegradedCause },
}

/// The two outcomes the presentation layer can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    Answered,
    Degraded,
}
