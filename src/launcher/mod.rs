//! # Backend Launcher
//!
//! Brings up the Django backend for local development: selects the settings
//! module, applies migrations, makes sure the admin account exists and hands
//! the terminal over to `runserver`.

use crate::error::FiscaError;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitStatus;
use thiserror::Error;
use tracing::debug;
use tracing::info;

const SETTINGS_VARIABLE: &str = "DJANGO_SETTINGS_MODULE";
const MANAGE_PY: &str = "manage.py";

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("No manage.py in '{}'", .0.display())]
    MissingManagePy(PathBuf),

    #[error("Cannot start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step '{step}' failed ({status})")]
    StepFailed { step: &'static str, status: ExitStatus },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LaunchConfig {
    /// Interpreter used to run `manage.py`
    pub python: String,
    /// Directory holding `manage.py`
    pub project_dir: PathBuf,
    pub settings_module: String,
    /// `host:port` given to `runserver`
    pub bind: String,
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
    pub skip_migrate: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            python: "python".to_owned(),
            project_dir: PathBuf::from("."),
            settings_module: "config.settings".to_owned(),
            bind: "127.0.0.1:8000".to_owned(),
            admin_username: "admin".to_owned(),
            admin_email: "admin@fiscasync.com".to_owned(),
            admin_password: "admin123".to_owned(),
            skip_migrate: false,
        }
    }
}

impl LaunchConfig {
    /// `python manage.py <args>` run from the project directory with the
    /// settings module selected.
    pub fn manage<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(&self.python);
        command
            .arg(MANAGE_PY)
            .args(args)
            .current_dir(&self.project_dir)
            .env(SETTINGS_VARIABLE, &self.settings_module);
        command
    }

    pub fn migrate_command(&self) -> Command {
        self.manage(["migrate", "--noinput"])
    }

    pub fn admin_command(&self) -> Command {
        let script = admin_script(&self.admin_username, &self.admin_email, &self.admin_password);
        self.manage(["shell", "-c", script.as_str()])
    }

    pub fn runserver_command(&self) -> Command {
        self.manage(["runserver", self.bind.as_str()])
    }
}

/// Python snippet creating the superuser unless an account with that
/// username already exists.
pub fn admin_script(username: &str, email: &str, password: &str) -> String {
    let username = Value::from(username).to_string();
    let email = Value::from(email).to_string();
    let password = Value::from(password).to_string();
    format!(
        "from django.contrib.auth import get_user_model\n\
         User = get_user_model()\n\
         if not User.objects.filter(username={username}).exists():\n    \
         User.objects.create_superuser({username}, {email}, {password})\n    \
         print('✅ Superutilisateur créé: ' + {username})\n\
         else:\n    \
         print('ℹ️  Superutilisateur déjà existant: ' + {username})\n"
    )
}

/// Runs every step in order, writing status lines to `out`. Returns once the
/// development server exits.
pub fn launch<W: Write>(config: &LaunchConfig, out: &mut W) -> Result<(), FiscaError> {
    if !is_project_dir(&config.project_dir) {
        return Err(LaunchError::MissingManagePy(config.project_dir.to_owned()).into());
    }

    writeln!(out, "🚀 Démarrage du backend FiscaSync")?;
    writeln!(out, "⚙️  Configuration: {SETTINGS_VARIABLE}={}", config.settings_module)?;

    if config.skip_migrate {
        writeln!(out, "⏭️  Migrations ignorées")?;
    } else {
        writeln!(out, "📦 Application des migrations...")?;
        out.flush()?;
        run_step("migrate", config.migrate_command())?;
        writeln!(out, "✅ Migrations appliquées")?;
    }

    writeln!(out, "👤 Vérification du superutilisateur '{}'...", config.admin_username)?;
    out.flush()?;
    run_step("create admin", config.admin_command())?;

    writeln!(out, "🌐 Serveur de développement sur http://{}/", config.bind)?;
    writeln!(out, "   Connexion: {} / {}", config.admin_username, config.admin_password)?;
    out.flush()?;
    run_step("runserver", config.runserver_command())?;
    writeln!(out, "🛑 Serveur arrêté")?;
    Ok(())
}

/// Runs a child process in the foreground, sharing the terminal.
fn run_step(step: &'static str, mut command: Command) -> Result<(), FiscaError> {
    let program = command.get_program().to_string_lossy().to_string();
    info!(step, %program, "Running step");
    debug!(args = ?command.get_args().collect::<Vec<_>>(), "Step arguments");
    let status = command
        .status()
        .map_err(|source| LaunchError::Spawn { program, source })?;
    if !status.success() {
        return Err(LaunchError::StepFailed { step, status }.into());
    }
    Ok(())
}

/// Whether `dir` looks like the Django project root.
pub fn is_project_dir(dir: &Path) -> bool {
    dir.join(MANAGE_PY).is_file()
}
