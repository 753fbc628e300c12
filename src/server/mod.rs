//! # Authentication Stub Server
//!
//! A stand-in for the backend's login endpoints, used while the frontend is
//! developed without Django running. It accepts one configured account, hands
//! out fixed tokens and answers every preflight request with permissive CORS
//! headers.

use actix_web::body::MessageBody;
use actix_web::dev::ServiceFactory;
use actix_web::dev::ServiceRequest;
use actix_web::dev::Server;
use actix_web::dev::ServiceResponse;
use actix_web::http::KeepAlive;
use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::web;
use actix_web::App;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tracing::info;
use tracing::warn;

use crate::error::FiscaError;

pub const LOGIN_PATH: &str = "/api/v1/auth/login/";
pub const AUTO_LOGIN_PATH: &str = "/api/v1/auth/auto-login/";

/// Settings of the stub: listening address, accepted account and the tokens
/// handed out on login.
#[derive(Clone, Debug)]
pub struct StubConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
            username: "admin".to_owned(),
            password: "admin123".to_owned(),
            email: "admin@fiscasync.com".to_owned(),
            access_token: "fake-access-token-for-development".to_owned(),
            refresh_token: "fake-refresh-token-for-development".to_owned(),
        }
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// The stub application; every response carries permissive CORS headers.
pub fn build_app(
    config: StubConfig,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(config))
        .wrap(
            DefaultHeaders::new()
                .add(("Access-Control-Allow-Origin", "*"))
                .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
                .add(("Access-Control-Allow-Headers", "Content-Type, Authorization")),
        )
        .service(
            web::resource(LOGIN_PATH)
                .route(web::post().to(login))
                .default_service(web::route().to(fallback)),
        )
        .service(
            web::resource(AUTO_LOGIN_PATH)
                .route(web::post().to(auto_login))
                .default_service(web::route().to(fallback)),
        )
        .default_service(web::route().to(fallback))
}

/// Binds the stub, one request per connection. The server starts serving
/// once awaited; the bound addresses are returned alongside.
pub fn bind(config: StubConfig) -> Result<(Server, Vec<SocketAddr>), FiscaError> {
    let address = (config.host.to_owned(), config.port);
    let server = HttpServer::new(move || build_app(config.clone()))
        .workers(1)
        .keep_alive(KeepAlive::Disabled)
        .bind(address)?;
    let addresses = server.addrs();
    Ok((server.run(), addresses))
}

/// Serves the stub until the process is stopped.
pub async fn run(config: StubConfig) -> Result<(), FiscaError> {
    info!(
        host = %config.host,
        port = config.port,
        username = %config.username,
        "Authentication stub listening"
    );
    let (server, _) = bind(config)?;
    server.await?;
    Ok(())
}

async fn login(body: web::Bytes, config: web::Data<StubConfig>) -> HttpResponse {
    let request = match serde_json::from_slice::<LoginRequest>(&body) {
        Ok(request) => request,
        Err(error) => {
            warn!(path = LOGIN_PATH, %error, "Rejected login body");
            return HttpResponse::BadRequest().json(json!({ "error": format!("Invalid request body: {error}") }));
        }
    };
    if request.username == config.username && request.password == config.password {
        info!(path = LOGIN_PATH, username = %request.username, "Login accepted");
        HttpResponse::Ok().json(success_body(&config))
    } else {
        info!(path = LOGIN_PATH, username = %request.username, "Login refused");
        HttpResponse::Unauthorized().json(json!({ "error": "Invalid credentials" }))
    }
}

async fn auto_login(config: web::Data<StubConfig>) -> HttpResponse {
    info!(path = AUTO_LOGIN_PATH, username = %config.username, "Auto-login");
    HttpResponse::Ok().json(success_body(&config))
}

async fn fallback(request: HttpRequest) -> HttpResponse {
    if request.method() == Method::OPTIONS {
        return HttpResponse::Ok().finish();
    }
    info!(method = %request.method(), path = request.path(), "No route");
    HttpResponse::NotFound().json(json!({ "error": "Not found" }))
}

fn success_body(config: &StubConfig) -> serde_json::Value {
    json!({
        "access": config.access_token,
        "refresh": config.refresh_token,
        "tokens": {
            "access": config.access_token,
            "refresh": config.refresh_token,
        },
        "user": {
            "id": 1,
            "username": config.username,
            "email": config.email,
        },
    })
}
