// src/models.rs

/// One `/like` invocation as delivered by the chat platform
#[derive(Debug, Clone)]
pub struct LikeInvocation {
    pub user_id: u64,
    /// `None` when invoked from a direct message
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub raw_uid: String,
}

/// Player stats reported by the likes API after a successful send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeSuccess {
    pub uid: String,
    pub nickname: String,
    pub region: String,
    pub level: String,
    pub exp: String,
    pub likes_before: String,
    pub likes_after: String,
    /// Raw `sent` value, e.g. "100 likes"
    pub sent_count: String,
}

/// Outcome of a `/like` invocation. Every variant is an expected result;
/// the command layer renders each one into a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeLookupResult {
    Success(LikeSuccess),
    AlreadyMaxedToday { nickname: String },
    PlayerNotFound { uid: String },
    RateLimited,
    /// `status_code` is `None` for transport or decode failures
    UpstreamError { status_code: Option<u16> },
    Timeout,
    InvalidInput { reason: InvalidUidReason },
    Forbidden,
    CooldownActive { remaining_seconds: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidUidReason {
    NonDigit,
    TooShort,
}

impl std::fmt::Display for InvalidUidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidUidReason::NonDigit => write!(f, "uid must contain only digits"),
            InvalidUidReason::TooShort => write!(f, "uid must be at least 6 digits long"),
        }
    }
}
