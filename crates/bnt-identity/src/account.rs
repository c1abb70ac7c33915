use bnt_core::ID;
use bnt_core::Unique;
use std::time::SystemTime;

/// Account privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Member,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Member => write!(f, "member"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }
}

/// Durable identity record.
///
/// Uniqueness of email, handle, and provider id is enforced by the database
/// unique indices; this type only upholds the in-memory invariants (verified
/// is monotonic, provider id is never overwritten once set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: ID<Self>,
    email: String,
    handle: String,
    provider: Option<String>,
    verified: bool,
    avatar: Option<String>,
    role: Role,
    online: bool,
    created: SystemTime,
}

impl Account {
    /// Full constructor, used when hydrating from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ID<Self>,
        email: String,
        handle: String,
        provider: Option<String>,
        verified: bool,
        avatar: Option<String>,
        role: Role,
        online: bool,
        created: SystemTime,
    ) -> Self {
        Self {
            id,
            email,
            handle,
            provider,
            verified,
            avatar,
            role,
            online,
            created,
        }
    }
    /// A password-registered account, pending email verification.
    pub fn registered(email: String, handle: String) -> Self {
        Self {
            id: ID::default(),
            email,
            handle,
            provider: None,
            verified: false,
            avatar: None,
            role: Role::Member,
            online: false,
            created: SystemTime::now(),
        }
    }
    /// An account created from an external provider assertion.
    /// The provider vouches for the email, so it starts out verified.
    pub fn external(
        email: String,
        handle: String,
        provider: String,
        avatar: Option<String>,
    ) -> Self {
        Self {
            id: ID::default(),
            email,
            handle,
            provider: Some(provider),
            verified: true,
            avatar,
            role: Role::Member,
            online: true,
            created: SystemTime::now(),
        }
    }
    /// Canonical form of an email address for lookup and storage.
    pub fn normalize(email: &str) -> String {
        email.trim().to_lowercase()
    }
    pub fn email(&self) -> &str {
        &self.email
    }
    pub fn handle(&self) -> &str {
        &self.handle
    }
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
    pub fn verified(&self) -> bool {
        self.verified
    }
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }
    pub fn role(&self) -> Role {
        self.role
    }
    pub fn online(&self) -> bool {
        self.online
    }
    pub fn created(&self) -> SystemTime {
        self.created
    }
    /// Attach a provider id to an existing account (account-linking event).
    /// Forces the verified flag and fills the avatar only if unset; an
    /// already-linked account keeps its original provider id.
    pub fn link(&mut self, provider: &str, avatar: Option<&str>) {
        if self.provider.is_none() {
            self.provider = Some(provider.to_string());
        }
        self.verified = true;
        if self.avatar.is_none() {
            self.avatar = avatar.map(str::to_string);
        }
    }
    /// Mark the email as verified. Monotonic within this subsystem.
    pub fn confirm(&mut self) {
        self.verified = true;
    }
}

impl Unique for Account {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl From<&Account> for bnt_dto::Profile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id().to_string(),
            email: account.email().to_string(),
            handle: account.handle().to_string(),
            verified: account.verified(),
            avatar: account.avatar().map(str::to_string),
        }
    }
}

#[cfg(feature = "database")]
mod schema {
    use super::*;
    use bnt_pg::*;

    impl Schema for Account {
        fn name() -> &'static str {
            ACCOUNTS
        }
        fn creates() -> &'static str {
            const_format::concatcp!(
                "CREATE TABLE IF NOT EXISTS ",
                ACCOUNTS,
                " (
                    id          UUID PRIMARY KEY,
                    email       VARCHAR(255) UNIQUE NOT NULL,
                    handle      VARCHAR(32) UNIQUE NOT NULL,
                    provider    VARCHAR(255) UNIQUE,
                    verified    BOOLEAN NOT NULL DEFAULT FALSE,
                    avatar      TEXT,
                    role        VARCHAR(16) NOT NULL DEFAULT 'member',
                    online      BOOLEAN NOT NULL DEFAULT FALSE,
                    hashword    TEXT,
                    created     TIMESTAMPTZ NOT NULL
                );"
            )
        }
        fn indices() -> &'static str {
            const_format::concatcp!(
                "CREATE INDEX IF NOT EXISTS idx_accounts_email ON ",
                ACCOUNTS,
                " (email);
                 CREATE INDEX IF NOT EXISTS idx_accounts_handle ON ",
                ACCOUNTS,
                " (handle);
                 CREATE INDEX IF NOT EXISTS idx_accounts_provider ON ",
                ACCOUNTS,
                " (provider) WHERE provider IS NOT NULL;"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(Account::normalize("  Jane@X.COM "), "jane@x.com");
    }
    #[test]
    fn registered_starts_unverified() {
        let account = Account::registered("a@x.com".into(), "a".into());
        assert!(!account.verified());
        assert!(account.provider().is_none());
    }
    #[test]
    fn external_starts_verified() {
        let account = Account::external("a@x.com".into(), "a".into(), "p-1".into(), None);
        assert!(account.verified());
        assert_eq!(account.provider(), Some("p-1"));
    }
    #[test]
    fn link_preserves_existing_provider() {
        let mut account = Account::external("a@x.com".into(), "a".into(), "p-1".into(), None);
        account.link("p-2", None);
        assert_eq!(account.provider(), Some("p-1"));
    }
    #[test]
    fn link_forces_verified_and_fills_avatar_once() {
        let mut account = Account::registered("a@x.com".into(), "a".into());
        account.link("p-1", Some("pic.png"));
        assert!(account.verified());
        assert_eq!(account.avatar(), Some("pic.png"));
        account.link("p-1", Some("other.png"));
        assert_eq!(account.avatar(), Some("pic.png"));
    }
    #[test]
    fn role_round_trip() {
        assert_eq!(Role::from("admin"), Role::Admin);
        assert_eq!(Role::from(Role::Member.to_string().as_str()), Role::Member);
    }
}
