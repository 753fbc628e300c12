//! # API Integration Checks
//!
//! Authenticates against a running backend and walks fixed lists of
//! read-only endpoints of the TAX and ACCOUNTING modules, printing a French
//! pass/fail line per endpoint.

mod suites;

pub use suites::accounting_suite;
pub use suites::tax_suite;

use crate::error::FiscaError;
use reqwest::StatusCode;
use serde_json::json;
use serde_json::Value;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const BANNER_WIDTH: usize = 60;
/// Characters of the access token echoed after login
const TOKEN_PREVIEW: usize = 50;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Authentication refused with status {0}: {1}")]
    AuthenticationRefused(u16, String),

    #[error("Authentication response carries no access token")]
    MissingToken,

    #[error("Invalid JSON from {0}: {1}")]
    InvalidBody(String, String),
}

/// How the client obtains its token
#[derive(Clone, Debug, PartialEq)]
pub enum AuthMode {
    /// `POST /api/v1/auth/auto-login/` with an empty body
    AutoLogin,
    /// `POST /api/v1/auth/login/` with a username and password
    Credentials { username: String, password: String },
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    pub auth: AuthMode,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str, auth: AuthMode) -> Result<Self, FiscaError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            auth,
            timeout: None,
        })
    }
}

/// An authenticated session
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub token: String,
    pub username: String,
}

/// Renders the body of a successful response as report lines, the first
/// one being the pass line.
pub type Render = fn(&Value) -> Vec<String>;

/// One endpoint to exercise
pub struct Check {
    pub title: &'static str,
    /// Path and query, relative to the base URL
    pub path: &'static str,
    pub render: Render,
    /// Whether a failure line echoes the response body
    pub show_error_body: bool,
}

/// A named list of checks run in order
pub struct Suite {
    pub name: &'static str,
    pub checks: Vec<Check>,
}

/// Result of running a suite
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SuiteOutcome {
    pub name: String,
    pub passed: usize,
    pub failed: usize,
    /// Error that stopped the suite before its last check
    pub aborted: Option<String>,
}

pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, FiscaError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.to_owned(),
        })
    }

    /// Logs in and returns the session token.
    pub async fn authenticate(&self, auth: &AuthMode) -> Result<Session, FiscaError> {
        let (path, body) = match auth {
            AuthMode::AutoLogin => ("/api/v1/auth/auto-login/", json!({})),
            AuthMode::Credentials { username, password } => (
                "/api/v1/auth/login/",
                json!({ "username": username, "password": password }),
            ),
        };
        let url = self.base_url.join(path)?;
        debug!(%url, "Authenticating");
        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            return Err(ClientError::AuthenticationRefused(status.as_u16(), text).into());
        }

        let data = serde_json::from_str::<Value>(&text)
            .map_err(|error| ClientError::InvalidBody(path.to_owned(), error.to_string()))?;
        let token = data["tokens"]["access"]
            .as_str()
            .or_else(|| data["access"].as_str())
            .ok_or(ClientError::MissingToken)?;
        let username = match (data["user"]["username"].as_str(), auth) {
            (Some(username), _) => username.to_owned(),
            (None, AuthMode::Credentials { username, .. }) => username.to_owned(),
            (None, AuthMode::AutoLogin) => "N/A".to_owned(),
        };
        info!(%username, "Authenticated");
        Ok(Session {
            token: token.to_owned(),
            username,
        })
    }

    /// Runs every check of a suite, writing the report to `out`. A transport
    /// failure or an unreadable body stops the suite; the error is recorded in
    /// the outcome.
    pub async fn run_suite<W: Write>(
        &self,
        session: &Session,
        suite: &Suite,
        out: &mut W,
    ) -> Result<SuiteOutcome, FiscaError> {
        let mut outcome = SuiteOutcome {
            name: suite.name.to_owned(),
            ..SuiteOutcome::default()
        };
        writeln!(out)?;
        writeln!(out, "{}", "=".repeat(BANNER_WIDTH))?;
        writeln!(out, "MODULE {} - TESTS", suite.name)?;
        writeln!(out, "{}", "=".repeat(BANNER_WIDTH))?;

        for (index, check) in suite.checks.iter().enumerate() {
            writeln!(out)?;
            writeln!(out, "📋 TEST {}: {}", index + 1, check.title)?;
            match self.run_check(session, check).await {
                Ok(Ok(lines)) => {
                    outcome.passed += 1;
                    for line in lines {
                        writeln!(out, "{line}")?;
                    }
                }
                Ok(Err(line)) => {
                    outcome.failed += 1;
                    writeln!(out, "{line}")?;
                }
                Err(error) => {
                    warn!(suite = suite.name, check = check.title, %error, "Suite aborted");
                    writeln!(out, "❌ Erreur lors des tests {}: {}", suite.name, error)?;
                    outcome.aborted = Some(error.to_string());
                    break;
                }
            }
        }
        Ok(outcome)
    }

    /// Report lines of a check: `Ok` on HTTP 200, `Err` with the failure line
    /// otherwise. The outer error is a transport or decoding failure.
    async fn run_check(&self, session: &Session, check: &Check) -> Result<Result<Vec<String>, String>, FiscaError> {
        let url = self.base_url.join(check.path)?;
        let response = self.client.get(url).bearer_auth(&session.token).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(path = check.path, status = status.as_u16(), "Checked endpoint");
        if status != StatusCode::OK {
            let line = if check.show_error_body {
                format!("❌ Erreur {}: {}", status.as_u16(), text)
            } else {
                format!("❌ Erreur {}", status.as_u16())
            };
            return Ok(Err(line));
        }
        let body = serde_json::from_str::<Value>(&text)
            .map_err(|error| ClientError::InvalidBody(check.path.to_owned(), error.to_string()))?;
        Ok(Ok((check.render)(&body)))
    }
}

/// The whole run: login, both suites, summary. Returns the suite outcomes,
/// empty when authentication failed.
pub async fn run_checks<W: Write>(config: &ClientConfig, out: &mut W) -> Result<Vec<SuiteOutcome>, FiscaError> {
    writeln!(out, "{}", "=".repeat(BANNER_WIDTH))?;
    writeln!(out, "TEST D'INTÉGRATION FISCASYNC - APIs TAX & ACCOUNTING")?;
    writeln!(out, "{}", "=".repeat(BANNER_WIDTH))?;

    let client = ApiClient::new(config)?;
    let session = match client.authenticate(&config.auth).await {
        Ok(session) => session,
        Err(error) => {
            warn!(%error, "Authentication failed");
            writeln!(out, "❌ Échec authentification: {error}")?;
            writeln!(out, "❌ Impossible de continuer sans authentification")?;
            return Ok(Vec::new());
        }
    };
    writeln!(out, "✅ Authentification réussie")?;
    writeln!(out, "   User: {}", session.username)?;
    writeln!(out, "   Token: {}...", session.token.chars().take(TOKEN_PREVIEW).collect::<String>())?;

    let mut outcomes = Vec::new();
    for suite in [tax_suite(), accounting_suite()] {
        outcomes.push(client.run_suite(&session, &suite, out).await?);
    }

    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(BANNER_WIDTH))?;
    writeln!(out, "TESTS TERMINÉS")?;
    for outcome in &outcomes {
        let status = if outcome.aborted.is_some() { " (interrompu)" } else { "" };
        writeln!(
            out,
            "{}: {} réussi(s), {} échoué(s){}",
            outcome.name, outcome.passed, outcome.failed, status
        )?;
    }
    writeln!(out, "{}", "=".repeat(BANNER_WIDTH))?;
    Ok(outcomes)
}
