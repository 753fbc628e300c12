use clap::Parser;
use fiscasync_tools::launcher;
use fiscasync_tools::launcher::LaunchConfig;
use fiscasync_tools::logging;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Migrates the database, ensures the admin account exists and runs the
/// Django development server.
#[derive(Parser, Debug)]
#[command(name = "start-backend", version)]
struct Args {
    /// Python interpreter
    #[arg(long, env = "FISCASYNC_PYTHON", default_value = "python")]
    python: String,

    /// Directory holding manage.py
    #[arg(long, env = "FISCASYNC_PROJECT_DIR", default_value = ".")]
    project_dir: PathBuf,

    /// Value of DJANGO_SETTINGS_MODULE
    #[arg(long, env = "FISCASYNC_SETTINGS", default_value = "config.settings")]
    settings: String,

    /// Address given to runserver
    #[arg(long, env = "FISCASYNC_BIND", default_value = "127.0.0.1:8000")]
    bind: String,

    #[arg(long, env = "FISCASYNC_ADMIN_USERNAME", default_value = "admin")]
    admin_username: String,

    #[arg(long, env = "FISCASYNC_ADMIN_EMAIL", default_value = "admin@fiscasync.com")]
    admin_email: String,

    #[arg(long, env = "FISCASYNC_ADMIN_PASSWORD", default_value = "admin123")]
    admin_password: String,

    /// Do not run migrations
    #[arg(long, env = "FISCASYNC_SKIP_MIGRATE")]
    skip_migrate: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init();
    let args = Args::parse();

    let config = LaunchConfig {
        python: args.python,
        project_dir: args.project_dir,
        settings_module: args.settings,
        bind: args.bind,
        admin_username: args.admin_username,
        admin_email: args.admin_email,
        admin_password: args.admin_password,
        skip_migrate: args.skip_migrate,
    };

    let mut out = std::io::stdout().lock();
    match launcher::launch(&config, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            println!("❌ Erreur: {e}");
            ExitCode::FAILURE
        }
    }
}
