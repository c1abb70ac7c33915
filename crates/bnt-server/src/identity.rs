use super::grant;
use bnt_core::HANDLE_LIMIT;
use bnt_core::Unique;
use bnt_dto::ExternalRequest;
use bnt_dto::LoginRequest;
use bnt_dto::Profile;
use bnt_dto::RegisterRequest;
use bnt_identity::Account;
use bnt_identity::AccountRepository;
use bnt_identity::Assertion;
use bnt_identity::Auth;
use bnt_identity::Crypto;
use bnt_identity::IdentityError;
use bnt_identity::SessionRepository;
use bnt_identity::handle;
use bnt_identity::password;
use bnt_identity::resolve;
use bnt_otp::Postman;
use bnt_otp::Purpose;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use std::sync::Arc;
use tokio_postgres::Client;

pub async fn register(
    db: web::Data<Arc<Client>>,
    postman: web::Data<Postman>,
    req: web::Json<RegisterRequest>,
) -> impl Responder {
    let email = Account::normalize(&req.email);
    if !email.contains('@') {
        return HttpResponse::BadRequest().body("invalid email");
    }
    if req.handle.len() < 3 || req.handle.len() > HANDLE_LIMIT {
        return HttpResponse::BadRequest().body("handle must be 3-20 characters");
    }
    if handle::normalize(&req.handle) != req.handle {
        return HttpResponse::BadRequest().body("handle must be lowercase alphanumeric");
    }
    if req.password.len() < 8 {
        return HttpResponse::BadRequest().body("password must be at least 8 characters");
    }
    match db.by_email(&email).await {
        Ok(None) => {}
        Ok(Some(_)) => return HttpResponse::Conflict().body("email already registered"),
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    }
    let hashword = match password::hash(&req.password) {
        Ok(h) => h,
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    let account = Account::registered(email.clone(), req.handle.clone());
    match db.insert(&account, Some(&hashword)).await {
        Ok(()) => {}
        Err(IdentityError::Conflict) => {
            return HttpResponse::Conflict().body("email or handle already exists");
        }
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    }
    match bnt_otp::issue(db.get_ref(), postman.get_ref(), &email, Purpose::RegisterVerify).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "pending",
            "email": email,
        })),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

pub async fn login(
    db: web::Data<Arc<Client>>,
    tokens: web::Data<Crypto>,
    req: web::Json<LoginRequest>,
) -> impl Responder {
    let email = Account::normalize(&req.email);
    let (account, hashword) = match db.lookup(&email).await {
        Ok(Some(row)) => row,
        Ok(None) => return HttpResponse::Unauthorized().body("invalid credentials"),
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    if !password::verify(&req.password, &hashword) {
        return HttpResponse::Unauthorized().body("invalid credentials");
    }
    if !account.verified() {
        return HttpResponse::Forbidden().json(serde_json::json!({
            "status": "unverified",
            "email": email,
        }));
    }
    if let Err(e) = db.presence(account.id(), true).await {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    match grant(db.get_ref(), tokens.get_ref(), &account).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(refused) => refused,
    }
}

/// Provider sign-in. The assertion arrives pre-authenticated from the
/// upstream handshake; resolution maps it onto the local account.
pub async fn external(
    db: web::Data<Arc<Client>>,
    tokens: web::Data<Crypto>,
    req: web::Json<ExternalRequest>,
) -> impl Responder {
    let assertion = Assertion {
        provider: req.provider.clone(),
        email: req.email.clone(),
        name: req.name.clone(),
        avatar: req.avatar.clone(),
    };
    let account = match resolve(db.get_ref(), &assertion).await {
        Ok(account) => account,
        Err(IdentityError::Ambiguous) => {
            return HttpResponse::BadRequest().body("assertion carries no usable email");
        }
        Err(IdentityError::Conflict) => {
            return HttpResponse::Conflict().body("identity write conflict");
        }
        Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
    };
    if let Err(e) = db.presence(account.id(), true).await {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    match grant(db.get_ref(), tokens.get_ref(), &account).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(refused) => refused,
    }
}

pub async fn logout(db: web::Data<Arc<Client>>, auth: Auth) -> impl Responder {
    if let Err(e) = db.revoke(auth.claims().session()).await {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    if let Err(e) = db.presence(auth.account(), false).await {
        return HttpResponse::InternalServerError().body(e.to_string());
    }
    HttpResponse::Ok().json(serde_json::json!({"status": "logged_out"}))
}

pub async fn me(db: web::Data<Arc<Client>>, auth: Auth) -> impl Responder {
    match db.by_id(auth.account()).await {
        Ok(Some(account)) => HttpResponse::Ok().json(Profile::from(&account)),
        Ok(None) => HttpResponse::NotFound().body("account not found"),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
