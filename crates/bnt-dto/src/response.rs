use serde::Deserialize;
use serde::Serialize;

/// The account snapshot a client caches next to its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub handle: String,
    pub verified: bool,
    pub avatar: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub profile: Profile,
}
