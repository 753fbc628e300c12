use clap::Parser;
use fiscasync_tools::logging;
use fiscasync_tools::server;
use fiscasync_tools::server::StubConfig;
use std::process::ExitCode;
use tracing::error;

/// Development login server: accepts one account and hands out fixed tokens.
#[derive(Parser, Debug)]
#[command(name = "auth-stub", version)]
struct Args {
    #[arg(long, env = "FISCASYNC_STUB_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "FISCASYNC_STUB_PORT", default_value_t = 8000)]
    port: u16,

    /// Accepted username
    #[arg(long, env = "FISCASYNC_STUB_USERNAME", default_value = "admin")]
    username: String,

    /// Accepted password
    #[arg(long, env = "FISCASYNC_STUB_PASSWORD", default_value = "admin123")]
    password: String,
}

#[actix_web::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init();
    let args = Args::parse();

    let config = StubConfig {
        host: args.host,
        port: args.port,
        username: args.username,
        password: args.password,
        ..StubConfig::default()
    };
    println!("🚀 Serveur d'authentification sur http://{}:{}", config.host, config.port);
    println!("   Identifiants: {} / {}", config.username, config.password);

    match server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Authentication stub stopped: {e}");
            ExitCode::FAILURE
        }
    }
}
