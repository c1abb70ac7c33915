use super::*;
use bnt_core::ID;
use bnt_core::Unique;

/// Persisted session for token management.
///
/// The bearer token handed to the client is a JWT whose `sid` claim points
/// at this row, so logout can revoke server-side.
#[derive(Debug, Clone)]
pub struct Session {
    id: ID<Self>,
    account: ID<Account>,
    hash: Vec<u8>,
    expires: std::time::SystemTime,
}

impl Unique for Session {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl Session {
    pub fn new(id: ID<Self>, account: ID<Account>, hash: Vec<u8>) -> Self {
        Self {
            id,
            account,
            hash,
            expires: std::time::SystemTime::now() + Crypto::duration(),
        }
    }
    pub fn account(&self) -> ID<Account> {
        self.account
    }
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }
    pub fn expires_at(&self) -> std::time::SystemTime {
        self.expires
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use bnt_pg::*;

    impl Schema for Session {
        fn name() -> &'static str {
            SESSIONS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                SESSIONS,
                " (
                    id          UUID PRIMARY KEY,
                    account_id  UUID NOT NULL REFERENCES ",
                ACCOUNTS,
                "(id) ON DELETE CASCADE,
                    token_hash  BYTEA NOT NULL,
                    expires_at  TIMESTAMPTZ NOT NULL,
                    revoked     BOOLEAN DEFAULT FALSE
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_sessions_account ON ",
                SESSIONS,
                " (account_id);
                 CREATE INDEX IF NOT EXISTS idx_sessions_expires ON ",
                SESSIONS,
                " (expires_at) WHERE NOT revoked;"
            )
        }
    }
}
