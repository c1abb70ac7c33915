use super::*;
use bnt_core::Attempts;
use std::time::SystemTime;

/// Challenge persistence operations.
///
/// One row per (email, purpose); [`ChallengeStore::put`] supersedes
/// whatever is there. [`ChallengeStore::burn`] must decrement and report
/// the remaining attempts in a single atomic step so two parallel wrong
/// submissions cannot both be told one attempt is left.
#[allow(async_fn_in_trait)]
pub trait ChallengeStore {
    async fn put(&self, challenge: &Challenge) -> Result<(), ChallengeError>;
    /// The current row for the pair, in whatever state it is in.
    async fn latest(
        &self,
        email: &str,
        purpose: Purpose,
    ) -> Result<Option<Challenge>, ChallengeError>;
    /// Atomic decrement-and-read of the remaining attempts, floored at
    /// zero. `None` when no unconsumed row exists.
    async fn burn(&self, email: &str, purpose: Purpose)
    -> Result<Option<Attempts>, ChallengeError>;
    /// Mark the row terminal.
    async fn retire(&self, email: &str, purpose: Purpose) -> Result<(), ChallengeError>;
}

/// Out-of-band code delivery. Fire-and-forget: implementations log
/// failures and never propagate them into the issue path.
#[allow(async_fn_in_trait)]
pub trait Mailer {
    async fn send_code(&self, email: &str, code: &str, purpose: Purpose);
}

/// Issues a fresh challenge, superseding any prior one for the pair,
/// and dispatches the code out of band.
pub async fn issue<S, M>(
    store: &S,
    mailer: &M,
    email: &str,
    purpose: Purpose,
) -> Result<(), ChallengeError>
where
    S: ChallengeStore,
    M: Mailer,
{
    let email = email.trim().to_lowercase();
    let challenge = Challenge::issue(&email, purpose);
    store.put(&challenge).await?;
    mailer.send_code(&email, challenge.code(), purpose).await;
    log::info!("[otp] issued {} challenge for {}", purpose, email);
    Ok(())
}

/// Like [`issue`], but refused inside the cooldown window of the previous
/// issue for the same pair.
pub async fn resend<S, M>(
    store: &S,
    mailer: &M,
    email: &str,
    purpose: Purpose,
) -> Result<(), ChallengeError>
where
    S: ChallengeStore,
    M: Mailer,
{
    let email = email.trim().to_lowercase();
    if let Some(prior) = store.latest(&email, purpose).await? {
        if let Some(wait) = prior.cooldown(SystemTime::now()) {
            log::debug!("[otp] resend throttled for {}", email);
            return Err(ChallengeError::Throttled(wait.as_secs().max(1)));
        }
    }
    issue(store, mailer, &email, purpose).await
}

/// Validates a submitted code against the active challenge for the pair.
///
/// Expiry is checked lazily and retires the row as a side effect. A wrong
/// code burns an attempt; the last burn turns the failure terminal. A
/// match retires the row so the code can never be replayed.
pub async fn validate<S>(
    store: &S,
    email: &str,
    purpose: Purpose,
    submitted: &str,
) -> Result<(), ChallengeError>
where
    S: ChallengeStore,
{
    let email = email.trim().to_lowercase();
    let challenge = store
        .latest(&email, purpose)
        .await?
        .ok_or(ChallengeError::NotFound)?;
    if challenge.consumed() {
        return Err(ChallengeError::NotFound);
    }
    if challenge.expired(SystemTime::now()) {
        store.retire(&email, purpose).await?;
        log::debug!("[otp] {} challenge for {} expired", purpose, email);
        return Err(ChallengeError::Expired);
    }
    if challenge.exhausted() {
        return Err(ChallengeError::Exhausted);
    }
    if !challenge.matches(submitted) {
        let remaining = store.burn(&email, purpose).await?.unwrap_or(0);
        if remaining == 0 {
            log::info!("[otp] {} challenge for {} exhausted", purpose, email);
            return Err(ChallengeError::Exhausted);
        }
        return Err(ChallengeError::Mismatch(remaining));
    }
    store.retire(&email, purpose).await?;
    log::info!("[otp] {} challenge for {} consumed", purpose, email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnt_core::CODE_ATTEMPTS;
    use bnt_core::CODE_TTL;
    use bnt_core::RESEND_COOLDOWN;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory stand-in for the challenges table.
    #[derive(Default)]
    struct Vault(Mutex<HashMap<(String, Purpose), Challenge>>);

    impl Vault {
        fn code(&self, email: &str, purpose: Purpose) -> String {
            self.0
                .lock()
                .unwrap()
                .get(&(email.to_string(), purpose))
                .map(|c| c.code().to_string())
                .expect("challenge present")
        }
        fn backdate(&self, email: &str, purpose: Purpose, by: Duration) {
            let mut rows = self.0.lock().unwrap();
            let row = rows
                .get_mut(&(email.to_string(), purpose))
                .expect("challenge present");
            *row = Challenge::new(
                row.email().to_string(),
                row.code().to_string(),
                row.purpose(),
                row.issued() - by,
                row.expires() - by,
                row.attempts(),
                row.consumed(),
            );
        }
    }

    impl ChallengeStore for Vault {
        async fn put(&self, challenge: &Challenge) -> Result<(), ChallengeError> {
            self.0.lock().unwrap().insert(
                (challenge.email().to_string(), challenge.purpose()),
                challenge.clone(),
            );
            Ok(())
        }
        async fn latest(
            &self,
            email: &str,
            purpose: Purpose,
        ) -> Result<Option<Challenge>, ChallengeError> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .get(&(email.to_string(), purpose))
                .cloned())
        }
        async fn burn(
            &self,
            email: &str,
            purpose: Purpose,
        ) -> Result<Option<Attempts>, ChallengeError> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .get_mut(&(email.to_string(), purpose))
                .filter(|c| !c.consumed())
                .map(|c| c.burn()))
        }
        async fn retire(&self, email: &str, purpose: Purpose) -> Result<(), ChallengeError> {
            if let Some(c) = self
                .0
                .lock()
                .unwrap()
                .get_mut(&(email.to_string(), purpose))
            {
                c.retire();
            }
            Ok(())
        }
    }

    /// Mailer that remembers the last dispatch instead of sending.
    #[derive(Default)]
    struct Outbox(Mutex<Vec<(String, String)>>);

    impl Mailer for Outbox {
        async fn send_code(&self, email: &str, code: &str, _: Purpose) {
            self.0
                .lock()
                .unwrap()
                .push((email.to_string(), code.to_string()));
        }
    }

    const EMAIL: &str = "a@x.com";
    const VERIFY: Purpose = Purpose::RegisterVerify;

    #[tokio::test]
    async fn issue_then_validate_succeeds_exactly_once() {
        let (vault, outbox) = (Vault::default(), Outbox::default());
        issue(&vault, &outbox, EMAIL, VERIFY).await.unwrap();
        let code = vault.code(EMAIL, VERIFY);
        assert!(validate(&vault, EMAIL, VERIFY, &code).await.is_ok());
        assert_eq!(
            validate(&vault, EMAIL, VERIFY, &code).await.unwrap_err(),
            ChallengeError::NotFound
        );
    }
    #[tokio::test]
    async fn validate_without_issue_is_not_found() {
        let vault = Vault::default();
        assert_eq!(
            validate(&vault, EMAIL, VERIFY, "000000").await.unwrap_err(),
            ChallengeError::NotFound
        );
    }
    #[tokio::test]
    async fn wrong_codes_count_down_then_lock_out() {
        let (vault, outbox) = (Vault::default(), Outbox::default());
        issue(&vault, &outbox, EMAIL, VERIFY).await.unwrap();
        let code = vault.code(EMAIL, VERIFY);
        let wrong = match code.as_str() {
            "999999" => "000000".to_string(),
            _ => "999999".to_string(),
        };
        for expected in (1..CODE_ATTEMPTS).rev() {
            assert_eq!(
                validate(&vault, EMAIL, VERIFY, &wrong).await.unwrap_err(),
                ChallengeError::Mismatch(expected)
            );
        }
        assert_eq!(
            validate(&vault, EMAIL, VERIFY, &wrong).await.unwrap_err(),
            ChallengeError::Exhausted
        );
        assert_eq!(
            validate(&vault, EMAIL, VERIFY, &code).await.unwrap_err(),
            ChallengeError::Exhausted
        );
    }
    #[tokio::test]
    async fn expired_challenge_rejects_correct_code() {
        let (vault, outbox) = (Vault::default(), Outbox::default());
        issue(&vault, &outbox, EMAIL, VERIFY).await.unwrap();
        let code = vault.code(EMAIL, VERIFY);
        vault.backdate(EMAIL, VERIFY, CODE_TTL + Duration::from_secs(1));
        assert_eq!(
            validate(&vault, EMAIL, VERIFY, &code).await.unwrap_err(),
            ChallengeError::Expired
        );
    }
    #[tokio::test]
    async fn resend_inside_cooldown_is_throttled() {
        let (vault, outbox) = (Vault::default(), Outbox::default());
        issue(&vault, &outbox, EMAIL, VERIFY).await.unwrap();
        match resend(&vault, &outbox, EMAIL, VERIFY).await.unwrap_err() {
            ChallengeError::Throttled(wait) => assert!(wait > 0),
            other => panic!("expected throttle, got {:?}", other),
        }
    }
    #[tokio::test]
    async fn resend_after_cooldown_supersedes_old_code() {
        let (vault, outbox) = (Vault::default(), Outbox::default());
        issue(&vault, &outbox, EMAIL, VERIFY).await.unwrap();
        let old = vault.code(EMAIL, VERIFY);
        vault.backdate(EMAIL, VERIFY, RESEND_COOLDOWN + Duration::from_secs(1));
        resend(&vault, &outbox, EMAIL, VERIFY).await.unwrap();
        let new = vault.code(EMAIL, VERIFY);
        match old == new {
            // 1-in-a-million collision: the old code is still the live one
            true => assert!(validate(&vault, EMAIL, VERIFY, &new).await.is_ok()),
            false => {
                assert_eq!(
                    validate(&vault, EMAIL, VERIFY, &old).await.unwrap_err(),
                    ChallengeError::Mismatch(CODE_ATTEMPTS - 1)
                );
                assert!(validate(&vault, EMAIL, VERIFY, &new).await.is_ok());
            }
        }
    }
    #[tokio::test]
    async fn new_issue_supersedes_prior_challenge() {
        let (vault, outbox) = (Vault::default(), Outbox::default());
        issue(&vault, &outbox, EMAIL, VERIFY).await.unwrap();
        vault.backdate(EMAIL, VERIFY, CODE_TTL + Duration::from_secs(1));
        issue(&vault, &outbox, EMAIL, VERIFY).await.unwrap();
        let code = vault.code(EMAIL, VERIFY);
        assert!(validate(&vault, EMAIL, VERIFY, &code).await.is_ok());
    }
    #[tokio::test]
    async fn purposes_are_independent() {
        let (vault, outbox) = (Vault::default(), Outbox::default());
        issue(&vault, &outbox, EMAIL, Purpose::RegisterVerify)
            .await
            .unwrap();
        issue(&vault, &outbox, EMAIL, Purpose::PasswordReset)
            .await
            .unwrap();
        let verify = vault.code(EMAIL, Purpose::RegisterVerify);
        assert!(
            validate(&vault, EMAIL, Purpose::RegisterVerify, &verify)
                .await
                .is_ok()
        );
        let reset = vault.code(EMAIL, Purpose::PasswordReset);
        assert!(
            validate(&vault, EMAIL, Purpose::PasswordReset, &reset)
                .await
                .is_ok()
        );
    }
    #[tokio::test]
    async fn issue_dispatches_the_stored_code() {
        let (vault, outbox) = (Vault::default(), Outbox::default());
        issue(&vault, &outbox, "  A@X.com ", VERIFY).await.unwrap();
        let sent = outbox.0.lock().unwrap();
        let (to, code) = sent.last().expect("dispatched");
        assert_eq!(to, EMAIL);
        assert_eq!(code, &vault.code(EMAIL, VERIFY));
    }
}
