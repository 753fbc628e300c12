use clap::Parser;
use fiscasync_tools::client;
use fiscasync_tools::client::AuthMode;
use fiscasync_tools::client::ClientConfig;
use fiscasync_tools::logging;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

/// Logs in to a running backend and exercises the TAX and ACCOUNTING
/// endpoints.
#[derive(Parser, Debug)]
#[command(name = "api-check", version)]
struct Args {
    #[arg(long, env = "FISCASYNC_BASE_URL", default_value = client::DEFAULT_BASE_URL)]
    base_url: String,

    /// Log in with this account instead of the auto-login endpoint
    #[arg(long, env = "FISCASYNC_USERNAME", requires = "password")]
    username: Option<String>,

    #[arg(long, env = "FISCASYNC_PASSWORD", requires = "username")]
    password: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "FISCASYNC_TIMEOUT")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let auth = match (args.username, args.password) {
        (Some(username), Some(password)) => AuthMode::Credentials { username, password },
        _ => AuthMode::AutoLogin,
    };
    let mut config = ClientConfig::new(&args.base_url, auth)?;
    config.timeout = args.timeout.map(Duration::from_secs);

    let mut out = std::io::stdout().lock();
    client::run_checks(&config, &mut out).await?;
    Ok(())
}
