use bnt_core::Attempts;
use bnt_core::CODE_ATTEMPTS;
use bnt_core::CODE_DIGITS;
use bnt_core::CODE_TTL;
use bnt_core::RESEND_COOLDOWN;
use std::time::Duration;
use std::time::SystemTime;

/// What an issued code is allowed to unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    RegisterVerify,
    PasswordReset,
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegisterVerify => write!(f, "register"),
            Self::PasswordReset => write!(f, "reset"),
        }
    }
}

impl TryFrom<&str> for Purpose {
    type Error = ();
    fn try_from(s: &str) -> Result<Self, ()> {
        match s {
            "register" => Ok(Self::RegisterVerify),
            "reset" => Ok(Self::PasswordReset),
            _ => Err(()),
        }
    }
}

/// An ephemeral one-time-code record bound to an (email, purpose) pair.
///
/// States: active until consumed, expired, or out of attempts; all three
/// are terminal. A fresh issue supersedes whatever row exists.
#[derive(Debug, Clone)]
pub struct Challenge {
    email: String,
    code: String,
    purpose: Purpose,
    issued: SystemTime,
    expires: SystemTime,
    attempts: Attempts,
    consumed: bool,
}

impl Challenge {
    /// Full constructor, used when hydrating from storage.
    pub fn new(
        email: String,
        code: String,
        purpose: Purpose,
        issued: SystemTime,
        expires: SystemTime,
        attempts: Attempts,
        consumed: bool,
    ) -> Self {
        Self {
            email,
            code,
            purpose,
            issued,
            expires,
            attempts,
            consumed,
        }
    }
    /// A fresh active challenge with a random fixed-width numeric code.
    pub fn issue(email: &str, purpose: Purpose) -> Self {
        let issued = SystemTime::now();
        Self {
            email: email.to_string(),
            code: generate(),
            purpose,
            issued,
            expires: issued + CODE_TTL,
            attempts: CODE_ATTEMPTS,
            consumed: false,
        }
    }
    pub fn email(&self) -> &str {
        &self.email
    }
    pub fn code(&self) -> &str {
        &self.code
    }
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }
    pub fn issued(&self) -> SystemTime {
        self.issued
    }
    pub fn expires(&self) -> SystemTime {
        self.expires
    }
    pub fn attempts(&self) -> Attempts {
        self.attempts
    }
    pub fn consumed(&self) -> bool {
        self.consumed
    }
    pub fn expired(&self, now: SystemTime) -> bool {
        now > self.expires
    }
    pub fn exhausted(&self) -> bool {
        self.attempts <= 0
    }
    /// Compares digests rather than the raw strings.
    pub fn matches(&self, submitted: &str) -> bool {
        use sha2::Digest;
        let ours = sha2::Sha256::digest(self.code.as_bytes());
        let theirs = sha2::Sha256::digest(submitted.as_bytes());
        ours == theirs
    }
    /// Time left in the resend cooldown window, if it is still open.
    pub fn cooldown(&self, now: SystemTime) -> Option<Duration> {
        let reopens = self.issued + RESEND_COOLDOWN;
        match now < reopens {
            true => reopens.duration_since(now).ok(),
            false => None,
        }
    }
    /// Burn one attempt, never dropping below zero. Returns the remainder.
    pub fn burn(&mut self) -> Attempts {
        self.attempts = (self.attempts - 1).max(0);
        self.attempts
    }
    /// Mark terminal.
    pub fn retire(&mut self) {
        self.consumed = true;
    }
}

/// A uniformly random zero-padded code of [`CODE_DIGITS`] digits.
fn generate() -> String {
    use rand::Rng;
    let ceiling = 10u32.pow(CODE_DIGITS as u32);
    let draw = rand::rng().random_range(0..ceiling);
    format!("{:0>width$}", draw, width = CODE_DIGITS)
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use bnt_pg::*;

    impl Schema for Challenge {
        fn name() -> &'static str {
            CHALLENGES
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                CHALLENGES,
                " (
                    email       VARCHAR(255) NOT NULL,
                    purpose     VARCHAR(16) NOT NULL,
                    code        VARCHAR(16) NOT NULL,
                    issued      TIMESTAMPTZ NOT NULL,
                    expires     TIMESTAMPTZ NOT NULL,
                    attempts    SMALLINT NOT NULL,
                    consumed    BOOLEAN NOT NULL DEFAULT FALSE,
                    PRIMARY KEY (email, purpose)
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_challenges_expires ON ",
                CHALLENGES,
                " (expires) WHERE NOT consumed;"
            )
        }
    }
}
