use super::grant;
use bnt_dto::ForgotRequest;
use bnt_dto::ResendRequest;
use bnt_dto::ResetRequest;
use bnt_dto::VerifyRequest;
use bnt_identity::Account;
use bnt_identity::AccountRepository;
use bnt_identity::Crypto;
use bnt_identity::password;
use bnt_otp::ChallengeError;
use bnt_otp::Postman;
use bnt_otp::Purpose;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use std::sync::Arc;
use tokio_postgres::Client;

/// Maps a challenge failure onto the response the UI keys off.
fn refusal(e: ChallengeError) -> HttpResponse {
    match e {
        ChallengeError::NotFound => HttpResponse::NotFound().body("no active challenge"),
        ChallengeError::Expired => HttpResponse::Gone().body("challenge expired"),
        ChallengeError::Exhausted => {
            HttpResponse::TooManyRequests().body("attempt budget exhausted")
        }
        ChallengeError::Mismatch(remaining) => {
            HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "wrong code",
                "remaining": remaining,
            }))
        }
        ChallengeError::Throttled(wait) => HttpResponse::TooManyRequests().json(
            serde_json::json!({
                "error": "throttled",
                "retry_after": wait,
            }),
        ),
        ChallengeError::Storage(s) => HttpResponse::InternalServerError().body(s),
    }
}

/// Registration verification: a correct code flips the account verified
/// and signs the user in.
pub async fn verify(
    db: web::Data<Arc<Client>>,
    tokens: web::Data<Crypto>,
    req: web::Json<VerifyRequest>,
) -> impl Responder {
    let email = Account::normalize(&req.email);
    if let Err(e) = bnt_otp::validate(db.get_ref(), &email, Purpose::RegisterVerify, &req.code).await
    {
        return refusal(e);
    }
    let account = match db.confirm(&email).await {
        Ok(Some(account)) => account,
        Ok(None) => return HttpResponse::NotFound().body("account not found"),
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    match grant(db.get_ref(), tokens.get_ref(), &account).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(refused) => refused,
    }
}

pub async fn resend(
    db: web::Data<Arc<Client>>,
    postman: web::Data<Postman>,
    req: web::Json<ResendRequest>,
) -> impl Responder {
    let purpose = match Purpose::try_from(req.purpose.as_str()) {
        Ok(purpose) => purpose,
        Err(()) => return HttpResponse::BadRequest().body("unknown purpose"),
    };
    match bnt_otp::resend(db.get_ref(), postman.get_ref(), &req.email, purpose).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"status": "sent"})),
        Err(e) => refusal(e),
    }
}

/// Password reset entry point. Replies success whether or not the email
/// exists, so the endpoint cannot enumerate accounts.
pub async fn forgot(
    db: web::Data<Arc<Client>>,
    postman: web::Data<Postman>,
    req: web::Json<ForgotRequest>,
) -> impl Responder {
    let email = Account::normalize(&req.email);
    match db.by_email(&email).await {
        Ok(Some(_)) => {
            if let Err(e) =
                bnt_otp::issue(db.get_ref(), postman.get_ref(), &email, Purpose::PasswordReset)
                    .await
            {
                return refusal(e);
            }
        }
        Ok(None) => log::debug!("[auth] reset requested for unknown email"),
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    }
    HttpResponse::Ok().json(serde_json::json!({"status": "sent"}))
}

/// Completes a password reset: a correct code permits the rotation.
pub async fn reset(db: web::Data<Arc<Client>>, req: web::Json<ResetRequest>) -> impl Responder {
    if req.password.len() < 8 {
        return HttpResponse::BadRequest().body("password must be at least 8 characters");
    }
    let email = Account::normalize(&req.email);
    if let Err(e) = bnt_otp::validate(db.get_ref(), &email, Purpose::PasswordReset, &req.code).await
    {
        return refusal(e);
    }
    let hashword = match password::hash(&req.password) {
        Ok(h) => h,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    match db.rotate(&email, &hashword).await {
        Ok(Some(_)) => HttpResponse::Ok().json(serde_json::json!({"status": "reset"})),
        Ok(None) => HttpResponse::NotFound().body("account not found"),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
