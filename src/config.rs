//! Process configuration sourced from the environment, with CLI overrides
//! applied by the server binary.

use std::fmt::{self, Debug, Formatter};

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DB_URI: &str = "memory://";
pub const DEFAULT_DB_NAME: &str = "todo-web";
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "https://aircnc-a740e.web.app"];

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// HS256 signing secret for bearer tokens.
    pub access_token_secret: String,
    pub db_uri: String,
    pub db_name: String,
    pub allowed_origins: Vec<String>,
    /// Payment collaborator credential; loaded and reported only.
    pub stripe_secret_key: Option<String>,
    /// Mail collaborator credentials; loaded and reported only.
    pub mail_user: Option<String>,
    pub mail_pass: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("access_token_secret", &"<redacted>")
            .field("db_uri", &self.db_uri)
            .field("db_name", &self.db_name)
            .field("allowed_origins", &self.allowed_origins)
            .field("stripe_configured", &self.stripe_secret_key.is_some())
            .field("mail_configured", &(self.mail_user.is_some() && self.mail_pass.is_some()))
            .finish()
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Build from any key lookup; used by `from_env` and tests.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Result<Self> {
        let port = match non_empty(get("PORT")) {
            Some(p) => p.parse::<u16>().with_context(|| format!("PORT is not a valid port: {}", p))?,
            None => DEFAULT_PORT,
        };
        let access_token_secret = non_empty(get("ACCESS_TOKEN_SECRET")).ok_or_else(|| anyhow!("ACCESS_TOKEN_SECRET must be set"))?;
        let allowed_origins = match non_empty(get("ALLOWED_ORIGINS")) {
            Some(list) => list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };
        Ok(Self {
            port,
            access_token_secret,
            db_uri: non_empty(get("DB_URI")).unwrap_or_else(|| DEFAULT_DB_URI.to_string()),
            db_name: non_empty(get("DB_NAME")).unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            allowed_origins,
            stripe_secret_key: non_empty(get("STRIPE_SECRET_KEY")),
            mail_user: non_empty(get("MAIL_USER")),
            mail_pass: non_empty(get("MAIL_PASS")),
        })
    }

    /// Apply `--port N` and `--db-uri URI` overrides.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--port" => {
                    let v = args.get(i + 1).ok_or_else(|| anyhow!("--port needs a value"))?;
                    self.port = v.parse().with_context(|| format!("--port is not a valid port: {}", v))?;
                    i += 1;
                }
                "--db-uri" => {
                    let v = args.get(i + 1).ok_or_else(|| anyhow!("--db-uri needs a value"))?;
                    self.db_uri = v.clone();
                    i += 1;
                }
                _ => {}
            }
            i += 1;
        }
        Ok(())
    }
}
