use super::*;
use bnt_core::Attempts;
use bnt_pg::*;
use std::sync::Arc;
use tokio_postgres::Client;
use tokio_postgres::Row;

fn hydrate(row: &Row) -> Challenge {
    Challenge::new(
        row.get::<_, String>(0),
        row.get::<_, String>(1),
        Purpose::try_from(row.get::<_, String>(2).as_str()).unwrap_or(Purpose::RegisterVerify),
        row.get::<_, std::time::SystemTime>(3),
        row.get::<_, std::time::SystemTime>(4),
        row.get::<_, Attempts>(5),
        row.get::<_, bool>(6),
    )
}

fn stored(e: PgErr) -> ChallengeError {
    ChallengeError::Storage(e.to_string())
}

impl ChallengeStore for Arc<Client> {
    async fn put(&self, challenge: &Challenge) -> Result<(), ChallengeError> {
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                CHALLENGES,
                " (email, purpose, code, issued, expires, attempts, consumed)
                  VALUES ($1, $2, $3, $4, $5, $6, FALSE)
                  ON CONFLICT (email, purpose) DO UPDATE SET
                    code = EXCLUDED.code,
                    issued = EXCLUDED.issued,
                    expires = EXCLUDED.expires,
                    attempts = EXCLUDED.attempts,
                    consumed = FALSE"
            ),
            &[
                &challenge.email(),
                &challenge.purpose().to_string(),
                &challenge.code(),
                &challenge.issued(),
                &challenge.expires(),
                &challenge.attempts(),
            ],
        )
        .await
        .map(|_| ())
        .map_err(stored)
    }

    async fn latest(
        &self,
        email: &str,
        purpose: Purpose,
    ) -> Result<Option<Challenge>, ChallengeError> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT email, code, purpose, issued, expires, attempts, consumed FROM ",
                CHALLENGES,
                " WHERE email = $1 AND purpose = $2"
            ),
            &[&email, &purpose.to_string()],
        )
        .await
        .map(|opt| opt.as_ref().map(hydrate))
        .map_err(stored)
    }

    async fn burn(
        &self,
        email: &str,
        purpose: Purpose,
    ) -> Result<Option<Attempts>, ChallengeError> {
        self.query_opt(
            const_format::concatcp!(
                "UPDATE ",
                CHALLENGES,
                " SET attempts = GREATEST(attempts - 1, 0)
                  WHERE email = $1 AND purpose = $2 AND NOT consumed
                  RETURNING attempts"
            ),
            &[&email, &purpose.to_string()],
        )
        .await
        .map(|opt| opt.map(|row| row.get::<_, Attempts>(0)))
        .map_err(stored)
    }

    async fn retire(&self, email: &str, purpose: Purpose) -> Result<(), ChallengeError> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                CHALLENGES,
                " SET consumed = TRUE WHERE email = $1 AND purpose = $2"
            ),
            &[&email, &purpose.to_string()],
        )
        .await
        .map(|_| ())
        .map_err(stored)
    }
}
