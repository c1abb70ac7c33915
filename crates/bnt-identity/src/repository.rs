use super::*;
use bnt_core::ID;
use bnt_core::Unique;
use bnt_pg::*;
use crate::handle::HandleProbe;
use std::sync::Arc;
use tokio_postgres::Client;
use tokio_postgres::Row;
use tokio_postgres::error::SqlState;

const COLUMNS: &str = "id, email, handle, provider, verified, avatar, role, online, created";

fn hydrate(row: &Row) -> Account {
    Account::new(
        ID::from(row.get::<_, uuid::Uuid>(0)),
        row.get::<_, String>(1),
        row.get::<_, String>(2),
        row.get::<_, Option<String>>(3),
        row.get::<_, bool>(4),
        row.get::<_, Option<String>>(5),
        Role::from(row.get::<_, String>(6).as_str()),
        row.get::<_, bool>(7),
        row.get::<_, std::time::SystemTime>(8),
    )
}

fn stored(e: PgErr) -> IdentityError {
    match e.code() {
        Some(&SqlState::UNIQUE_VIOLATION) => IdentityError::Conflict,
        _ => IdentityError::Storage(e.to_string()),
    }
}

impl HandleProbe for Arc<Client> {
    type Err = IdentityError;
    async fn taken(&self, handle: &str) -> Result<bool, IdentityError> {
        self.query_opt(
            const_format::concatcp!("SELECT 1 FROM ", ACCOUNTS, " WHERE handle = $1"),
            &[&handle],
        )
        .await
        .map(|opt| opt.is_some())
        .map_err(stored)
    }
}

impl AccountRepository for Arc<Client> {
    async fn by_id(&self, id: ID<Account>) -> Result<Option<Account>, IdentityError> {
        self.query_opt(
            const_format::concatcp!("SELECT ", COLUMNS, " FROM ", ACCOUNTS, " WHERE id = $1"),
            &[&id.inner()],
        )
        .await
        .map(|opt| opt.as_ref().map(hydrate))
        .map_err(stored)
    }

    async fn by_provider(&self, provider: &str) -> Result<Option<Account>, IdentityError> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ",
                COLUMNS,
                " FROM ",
                ACCOUNTS,
                " WHERE provider = $1"
            ),
            &[&provider],
        )
        .await
        .map(|opt| opt.as_ref().map(hydrate))
        .map_err(stored)
    }

    async fn by_email(&self, email: &str) -> Result<Option<Account>, IdentityError> {
        self.query_opt(
            const_format::concatcp!("SELECT ", COLUMNS, " FROM ", ACCOUNTS, " WHERE email = $1"),
            &[&email],
        )
        .await
        .map(|opt| opt.as_ref().map(hydrate))
        .map_err(stored)
    }

    async fn insert(&self, account: &Account, hashword: Option<&str>) -> Result<(), IdentityError> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                ACCOUNTS,
                " (id, email, handle, provider, verified, avatar, role, online, hashword, created)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
            ),
            &[
                &account.id().inner(),
                &account.email(),
                &account.handle(),
                &account.provider(),
                &account.verified(),
                &account.avatar(),
                &account.role().to_string(),
                &account.online(),
                &hashword,
                &account.created(),
            ],
        )
        .await
        .map(|_| ())
        .map_err(stored)
    }

    async fn link(&self, account: &Account) -> Result<(), IdentityError> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                ACCOUNTS,
                " SET provider = $2, verified = $3, avatar = $4 WHERE id = $1"
            ),
            &[
                &account.id().inner(),
                &account.provider(),
                &account.verified(),
                &account.avatar(),
            ],
        )
        .await
        .map(|_| ())
        .map_err(stored)
    }

    async fn confirm(&self, email: &str) -> Result<Option<Account>, IdentityError> {
        self.query_opt(
            const_format::concatcp!(
                "UPDATE ",
                ACCOUNTS,
                " SET verified = TRUE WHERE email = $1 RETURNING ",
                COLUMNS
            ),
            &[&email],
        )
        .await
        .map(|opt| opt.as_ref().map(hydrate))
        .map_err(stored)
    }

    async fn rotate(&self, email: &str, hashword: &str) -> Result<Option<Account>, IdentityError> {
        self.query_opt(
            const_format::concatcp!(
                "UPDATE ",
                ACCOUNTS,
                " SET hashword = $2 WHERE email = $1 RETURNING ",
                COLUMNS
            ),
            &[&email, &hashword],
        )
        .await
        .map(|opt| opt.as_ref().map(hydrate))
        .map_err(stored)
    }

    async fn lookup(&self, email: &str) -> Result<Option<(Account, String)>, IdentityError> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT ",
                COLUMNS,
                ", hashword FROM ",
                ACCOUNTS,
                " WHERE email = $1 AND hashword IS NOT NULL"
            ),
            &[&email],
        )
        .await
        .map(|opt| opt.map(|row| (hydrate(&row), row.get::<_, String>(9))))
        .map_err(stored)
    }

    async fn presence(&self, account: ID<Account>, online: bool) -> Result<(), IdentityError> {
        self.execute(
            const_format::concatcp!("UPDATE ", ACCOUNTS, " SET online = $2 WHERE id = $1"),
            &[&account.inner(), &online],
        )
        .await
        .map(|_| ())
        .map_err(stored)
    }
}

/// Repository trait for session persistence.
/// Abstracts SQL from the login and logout flows.
#[allow(async_fn_in_trait)]
pub trait SessionRepository {
    async fn signin(&self, session: &Session) -> Result<(), PgErr>;
    async fn revoke(&self, session: ID<Session>) -> Result<(), PgErr>;
}

impl SessionRepository for Arc<Client> {
    async fn signin(&self, session: &Session) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                SESSIONS,
                " (id, account_id, token_hash, expires_at) VALUES ($1, $2, $3, $4)"
            ),
            &[
                &session.id().inner(),
                &session.account().inner(),
                &session.hash(),
                &session.expires_at(),
            ],
        )
        .await
        .map(|_| ())
    }

    async fn revoke(&self, session: ID<Session>) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!("UPDATE ", SESSIONS, " SET revoked = TRUE WHERE id = $1"),
            &[&session.inner()],
        )
        .await
        .map(|_| ())
    }
}
