/// Errors surfaced by identity resolution and account storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The provider assertion carries no usable email, so there is nothing
    /// to key the account on.
    Ambiguous,
    /// A unique index rejected the write (handle, email, or provider id
    /// race). Retryable: re-resolving lands on the winning row.
    Conflict,
    /// Persistence-layer failure passthrough.
    Storage(String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ambiguous => write!(f, "assertion carries no usable email"),
            Self::Conflict => write!(f, "uniqueness conflict"),
            Self::Storage(s) => write!(f, "storage failure: {}", s),
        }
    }
}

impl std::error::Error for IdentityError {}
