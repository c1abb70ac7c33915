use super::*;
use bnt_core::HANDLE_FALLBACK;
use bnt_core::ID;
use crate::handle;
use crate::handle::HandleProbe;

/// A verified claim from an external identity provider.
///
/// The provider id and email have already been authenticated upstream;
/// resolution trusts them as given.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub provider: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// Account persistence operations the resolver and login flows need.
///
/// Implementations must enforce unique-index semantics on email, handle,
/// and provider id, reporting races as [`IdentityError::Conflict`].
#[allow(async_fn_in_trait)]
pub trait AccountRepository: HandleProbe<Err = IdentityError> {
    async fn by_id(&self, id: ID<Account>) -> Result<Option<Account>, IdentityError>;
    async fn by_provider(&self, provider: &str) -> Result<Option<Account>, IdentityError>;
    async fn by_email(&self, email: &str) -> Result<Option<Account>, IdentityError>;
    /// Insert a fresh account; `hashword` is present only on the password
    /// registration path and never leaves the storage layer.
    async fn insert(&self, account: &Account, hashword: Option<&str>) -> Result<(), IdentityError>;
    /// Persist the provider id, verified flag, and avatar of a linked account.
    async fn link(&self, account: &Account) -> Result<(), IdentityError>;
    /// Flip the verified flag, returning the updated account.
    async fn confirm(&self, email: &str) -> Result<Option<Account>, IdentityError>;
    /// Replace the password hash, returning the updated account.
    async fn rotate(&self, email: &str, hashword: &str) -> Result<Option<Account>, IdentityError>;
    /// Fetch an account together with its password hash for login.
    async fn lookup(&self, email: &str) -> Result<Option<(Account, String)>, IdentityError>;
    async fn presence(&self, account: ID<Account>, online: bool) -> Result<(), IdentityError>;
}

/// Maps a provider assertion onto the single local account it belongs to.
///
/// Strict short-circuit order: known provider id wins untouched, then a
/// known email is linked in place, then a fresh account is created. At most
/// one write per call; the pure-match path writes nothing.
///
/// Linking by email is deliberately permissive: any assertion for a known
/// address takes that account over, on the strength of the upstream
/// provider's own email verification. That trust boundary is a design
/// choice, not an accident.
///
/// A uniqueness race on the write is retried once internally; the retry
/// lands on the winner's row through the provider or email lookup.
pub async fn resolve<R>(repo: &R, assertion: &Assertion) -> Result<Account, IdentityError>
where
    R: AccountRepository,
{
    match attempt(repo, assertion).await {
        Err(IdentityError::Conflict) => {
            log::warn!("[resolver] lost a uniqueness race, retrying once");
            attempt(repo, assertion).await
        }
        outcome => outcome,
    }
}

async fn attempt<R>(repo: &R, assertion: &Assertion) -> Result<Account, IdentityError>
where
    R: AccountRepository,
{
    let email = assertion
        .email
        .as_deref()
        .map(Account::normalize)
        .filter(|e| !e.is_empty())
        .ok_or(IdentityError::Ambiguous)?;
    if let Some(account) = repo.by_provider(&assertion.provider).await? {
        log::debug!("[resolver] repeat sign-in for {}", account.handle());
        return Ok(account);
    }
    if let Some(mut account) = repo.by_email(&email).await? {
        account.link(&assertion.provider, assertion.avatar.as_deref());
        repo.link(&account).await?;
        log::info!("[resolver] linked provider to {}", account.handle());
        return Ok(account);
    }
    let seed = match assertion.name.as_deref() {
        Some(name) => name,
        None => email.split('@').next().unwrap_or(HANDLE_FALLBACK),
    };
    let handle = handle::allocate(repo, seed).await?;
    let account = Account::external(
        email,
        handle,
        assertion.provider.clone(),
        assertion.avatar.clone(),
    );
    repo.insert(&account, None).await?;
    log::info!("[resolver] created account {}", account.handle());
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnt_core::Arbitrary;
    use bnt_core::Unique;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    impl Arbitrary for Assertion {
        fn random() -> Self {
            let tag = uuid::Uuid::now_v7().simple().to_string();
            Self {
                provider: format!("prov-{}", tag),
                email: Some(format!("{}@x.com", &tag[..8])),
                name: None,
                avatar: None,
            }
        }
    }

    /// In-memory ledger standing in for the accounts table.
    #[derive(Default)]
    struct Ledger {
        rows: Mutex<HashMap<uuid::Uuid, (Account, Option<String>)>>,
        writes: AtomicUsize,
    }

    impl Ledger {
        fn find<F>(&self, pick: F) -> Option<Account>
        where
            F: Fn(&Account) -> bool,
        {
            self.rows
                .lock()
                .unwrap()
                .values()
                .map(|(a, _)| a)
                .find(|a| pick(a))
                .cloned()
        }
        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl HandleProbe for Ledger {
        type Err = IdentityError;
        async fn taken(&self, handle: &str) -> Result<bool, IdentityError> {
            Ok(self.find(|a| a.handle() == handle).is_some())
        }
    }

    impl AccountRepository for Ledger {
        async fn by_id(&self, id: ID<Account>) -> Result<Option<Account>, IdentityError> {
            Ok(self.find(|a| a.id() == id))
        }
        async fn by_provider(&self, provider: &str) -> Result<Option<Account>, IdentityError> {
            Ok(self.find(|a| a.provider() == Some(provider)))
        }
        async fn by_email(&self, email: &str) -> Result<Option<Account>, IdentityError> {
            Ok(self.find(|a| a.email() == email))
        }
        async fn insert(
            &self,
            account: &Account,
            hashword: Option<&str>,
        ) -> Result<(), IdentityError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            let clash = rows.values().any(|(a, _)| {
                a.email() == account.email()
                    || a.handle() == account.handle()
                    || (a.provider().is_some() && a.provider() == account.provider())
            });
            if clash {
                return Err(IdentityError::Conflict);
            }
            rows.insert(
                account.id().inner(),
                (account.clone(), hashword.map(str::to_string)),
            );
            Ok(())
        }
        async fn link(&self, account: &Account) -> Result<(), IdentityError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(&account.id().inner()) {
                Some((row, _)) => {
                    *row = account.clone();
                    Ok(())
                }
                None => Err(IdentityError::Storage("no such account".to_string())),
            }
        }
        async fn confirm(&self, email: &str) -> Result<Option<Account>, IdentityError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.values_mut().find(|(a, _)| a.email() == email);
            Ok(row.map(|(a, _)| {
                a.confirm();
                a.clone()
            }))
        }
        async fn rotate(
            &self,
            email: &str,
            hashword: &str,
        ) -> Result<Option<Account>, IdentityError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.values_mut().find(|(a, _)| a.email() == email);
            Ok(row.map(|(a, h)| {
                *h = Some(hashword.to_string());
                a.clone()
            }))
        }
        async fn lookup(&self, email: &str) -> Result<Option<(Account, String)>, IdentityError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .values()
                .find(|(a, _)| a.email() == email)
                .and_then(|(a, h)| h.clone().map(|h| (a.clone(), h))))
        }
        async fn presence(&self, _: ID<Account>, _: bool) -> Result<(), IdentityError> {
            Ok(())
        }
    }

    fn assertion(provider: &str, email: &str, name: &str) -> Assertion {
        Assertion {
            provider: provider.to_string(),
            email: Some(email.to_string()),
            name: Some(name.to_string()),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn repeat_sign_in_is_idempotent() {
        let ledger = Ledger::default();
        let assertion = Assertion::random();
        let first = resolve(&ledger, &assertion).await.unwrap();
        let writes = ledger.writes();
        let second = resolve(&ledger, &assertion).await.unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(ledger.writes(), writes);
    }
    #[tokio::test]
    async fn email_match_links_and_preserves_handle() {
        let ledger = Ledger::default();
        let registered = Account::registered("a@x.com".to_string(), "jane".to_string());
        ledger.insert(&registered, Some("hash")).await.unwrap();
        let resolved = resolve(&ledger, &assertion("p-1", "a@x.com", "Other Name"))
            .await
            .unwrap();
        assert_eq!(resolved.id(), registered.id());
        assert_eq!(resolved.handle(), "jane");
        assert!(resolved.verified());
        assert_eq!(resolved.provider(), Some("p-1"));
    }
    #[tokio::test]
    async fn email_match_is_case_insensitive() {
        let ledger = Ledger::default();
        let registered = Account::registered("a@x.com".to_string(), "jane".to_string());
        ledger.insert(&registered, Some("hash")).await.unwrap();
        let resolved = resolve(&ledger, &assertion("p-1", "  A@X.Com ", "Jane"))
            .await
            .unwrap();
        assert_eq!(resolved.id(), registered.id());
    }
    #[tokio::test]
    async fn fresh_assertion_creates_verified_account() {
        let ledger = Ledger::default();
        let resolved = resolve(&ledger, &assertion("p-1", "jane@x.com", "Jane Doe"))
            .await
            .unwrap();
        assert!(resolved.verified());
        assert!(resolved.online());
        assert_eq!(resolved.handle(), "janedoe");
        assert_eq!(resolved.email(), "jane@x.com");
    }
    #[tokio::test]
    async fn handle_collision_gets_suffix() {
        let ledger = Ledger::default();
        let holder = Account::registered("other@x.com".to_string(), "janedoe".to_string());
        ledger.insert(&holder, Some("hash")).await.unwrap();
        let resolved = resolve(&ledger, &assertion("p-1", "jane@x.com", "Jane Doe"))
            .await
            .unwrap();
        assert_eq!(resolved.handle(), "janedoe1");
    }
    #[tokio::test]
    async fn missing_email_is_ambiguous() {
        let ledger = Ledger::default();
        let bare = Assertion {
            provider: "p-1".to_string(),
            email: None,
            name: None,
            avatar: None,
        };
        assert_eq!(
            resolve(&ledger, &bare).await.unwrap_err(),
            IdentityError::Ambiguous
        );
        let blank = Assertion {
            email: Some("   ".to_string()),
            ..bare
        };
        assert_eq!(
            resolve(&ledger, &blank).await.unwrap_err(),
            IdentityError::Ambiguous
        );
    }
    #[tokio::test]
    async fn name_hint_falls_back_to_email_local_part() {
        let ledger = Ledger::default();
        let hintless = Assertion {
            provider: "p-1".to_string(),
            email: Some("jane.doe@x.com".to_string()),
            name: None,
            avatar: None,
        };
        let resolved = resolve(&ledger, &hintless).await.unwrap();
        assert_eq!(resolved.handle(), "janedoe");
    }
}
