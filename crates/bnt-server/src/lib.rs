//! Unified auth backend.
//!
//! Composes the identity and challenge crates into one actix-web server.
//! The flows live here: registration issues a verification challenge,
//! verification flips the account and mints a session, password reset
//! validates its challenge before rotating the hash.
//!
//! ## Submodules
//!
//! - [`identity`] — register / login / external sign-in / logout / me
//! - [`challenge`] — verify / resend / forgot / reset

pub mod challenge;
pub mod identity;

use bnt_core::ID;
use bnt_core::Unique;
use bnt_dto::AuthResponse;
use bnt_dto::Profile;
use bnt_identity::Account;
use bnt_identity::Claims;
use bnt_identity::Crypto;
use bnt_identity::Session;
use bnt_identity::SessionRepository;
use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::middleware::Logger;
use actix_web::web;
use std::sync::Arc;
use tokio_postgres::Client;

async fn health(client: web::Data<Arc<Client>>) -> impl Responder {
    match client
        .execute("SELECT 1", &[])
        .await
        .inspect_err(|e| log::error!("health check failed: {}", e))
    {
        Ok(_) => HttpResponse::Ok().body("ok"),
        Err(_) => HttpResponse::ServiceUnavailable().body("database unavailable"),
    }
}

/// Mints a session row and bearer token for an account.
/// Shared by the login, external sign-in, and verification flows.
pub(crate) async fn grant(
    db: &Arc<Client>,
    tokens: &Crypto,
    account: &Account,
) -> Result<AuthResponse, HttpResponse> {
    let hash = Crypto::hash(&format!("{}", account.id()));
    let session = Session::new(ID::default(), account.id(), hash);
    if let Err(e) = db.signin(&session).await {
        return Err(HttpResponse::InternalServerError().body(e.to_string()));
    }
    let claims = Claims::new(account.id(), session.id(), account.handle().to_string());
    match tokens.encode(&claims) {
        Ok(token) => Ok(AuthResponse {
            token,
            profile: Profile::from(account),
        }),
        Err(e) => Err(HttpResponse::InternalServerError().body(e.to_string())),
    }
}

async fn migrate(client: &Arc<Client>) {
    bnt_pg::prepare::<Account>(client).await.expect("accounts schema");
    bnt_pg::prepare::<Session>(client).await.expect("sessions schema");
    bnt_pg::prepare::<bnt_otp::Challenge>(client)
        .await
        .expect("challenges schema");
}

#[rustfmt::skip]
pub async fn run() -> Result<(), std::io::Error> {
    let client = bnt_pg::db().await;
    migrate(&client).await;
    let crypto = web::Data::new(Crypto::from_env());
    let postman = web::Data::new(bnt_otp::Postman::from_env());
    let client = web::Data::new(client);
    log::info!("starting auth server");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(crypto.clone())
            .app_data(postman.clone())
            .app_data(client.clone())
            .route("/health", web::get().to(health))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(identity::register))
                    .route("/login", web::post().to(identity::login))
                    .route("/external", web::post().to(identity::external))
                    .route("/logout", web::post().to(identity::logout))
                    .route("/me", web::get().to(identity::me))
                    .route("/verify", web::post().to(challenge::verify))
                    .route("/resend", web::post().to(challenge::resend))
                    .route("/forgot", web::post().to(challenge::forgot))
                    .route("/reset", web::post().to(challenge::reset)),
            )
    })
    .workers(6)
    .bind(std::env::var("BIND_ADDR").expect("BIND_ADDR must be set"))?
    .run()
    .await
}
