use serde::Deserialize;
use serde::Serialize;

#[derive(Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub handle: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A provider assertion relayed by the upstream sign-in handshake.
/// The provider id and email are trusted as already authenticated.
#[derive(Serialize, Deserialize)]
pub struct ExternalRequest {
    pub provider: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize, Deserialize)]
pub struct ResendRequest {
    pub email: String,
    pub purpose: String,
}

#[derive(Serialize, Deserialize)]
pub struct ForgotRequest {
    pub email: String,
}

#[derive(Serialize, Deserialize)]
pub struct ResetRequest {
    pub email: String,
    pub code: String,
    pub password: String,
}
