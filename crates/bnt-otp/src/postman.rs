use super::*;

/// HTTP transactional-mail client.
///
/// Posts codes to an external delivery API. Unconfigured or failing
/// delivery is logged and swallowed: the challenge already exists and the
/// user can ask for a resend.
pub struct Postman {
    http: reqwest::Client,
    url: Option<String>,
    key: Option<String>,
    sender: String,
}

#[derive(serde::Serialize)]
struct Letter<'a> {
    sender: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

impl Postman {
    /// Reads `MAIL_API_URL`, `MAIL_API_KEY`, and `MAIL_SENDER`.
    /// Missing configuration degrades to log-only dispatch.
    pub fn from_env() -> Self {
        Self {
            http: reqwest::Client::new(),
            url: std::env::var("MAIL_API_URL").ok(),
            key: std::env::var("MAIL_API_KEY").ok(),
            sender: std::env::var("MAIL_SENDER")
                .unwrap_or_else(|_| "noreply@banter.chat".to_string()),
        }
    }

    fn subject(purpose: Purpose) -> &'static str {
        match purpose {
            Purpose::RegisterVerify => "Verify your banter email",
            Purpose::PasswordReset => "Reset your banter password",
        }
    }

    fn body(code: &str, purpose: Purpose) -> String {
        let ttl = bnt_core::CODE_TTL.as_secs() / 60;
        match purpose {
            Purpose::RegisterVerify => format!(
                "Your banter verification code is {}. It expires in {} minutes.",
                code, ttl
            ),
            Purpose::PasswordReset => format!(
                "Your banter password reset code is {}. It expires in {} minutes.",
                code, ttl
            ),
        }
    }
}

impl Mailer for Postman {
    async fn send_code(&self, email: &str, code: &str, purpose: Purpose) {
        let (Some(url), Some(key)) = (self.url.as_deref(), self.key.as_deref()) else {
            log::warn!("[postman] mail API not configured, dropping {} code", purpose);
            return;
        };
        let letter = Letter {
            sender: &self.sender,
            to: email,
            subject: Self::subject(purpose),
            text: Self::body(code, purpose),
        };
        match self
            .http
            .post(url)
            .header("api-key", key)
            .json(&letter)
            .send()
            .await
        {
            Ok(reply) if reply.status().is_success() => {
                log::debug!("[postman] dispatched {} code to {}", purpose, email)
            }
            Ok(reply) => log::error!(
                "[postman] mail API rejected {} code for {}: {}",
                purpose,
                email,
                reply.status()
            ),
            Err(e) => log::error!(
                "[postman] mail API unreachable for {} code to {}: {}",
                purpose,
                email,
                e
            ),
        }
    }
}
