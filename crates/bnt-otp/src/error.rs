use bnt_core::Attempts;
use bnt_core::Seconds;

/// Errors surfaced by challenge validation and issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// No active challenge for the (email, purpose) pair: never issued,
    /// already consumed, or superseded.
    NotFound,
    /// The stored expiry has passed. Terminal.
    Expired,
    /// The wrong-guess budget is spent. Terminal, even for a correct code.
    Exhausted,
    /// Wrong code; carries the attempts left before lockout.
    Mismatch(Attempts),
    /// Resend requested inside the cooldown window; carries the wait.
    Throttled(Seconds),
    /// Persistence-layer failure passthrough.
    Storage(String),
}

impl std::fmt::Display for ChallengeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "no active challenge"),
            Self::Expired => write!(f, "challenge expired"),
            Self::Exhausted => write!(f, "attempt budget exhausted"),
            Self::Mismatch(left) => write!(f, "wrong code, {} attempts left", left),
            Self::Throttled(wait) => write!(f, "resend throttled, retry in {}s", wait),
            Self::Storage(s) => write!(f, "storage failure: {}", s),
        }
    }
}

impl std::error::Error for ChallengeError {}
