//! # wh-config
//!
//! Layered runtime settings: built-in defaults, then an optional
//! `whistly.toml`, then `WHISTLY__SECTION__KEY` environment variables
//! (a `.env` file is loaded into the environment first).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Shipped default; refused when cookies are marked secure.
pub const DEV_SESSION_SECRET: &str = "change-me-in-production";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("session.secret must be changed when session.secure_cookie is enabled")]
    InsecureSecret,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// e.g. "sqlite:whistly.db"
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Root directory for all uploads
    pub root: PathBuf,
    /// Public URL prefix the root is served under
    pub url_prefix: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub secret: SecretString,
    pub secure_cookie: bool,
    /// Lifetime of a login, in seconds.
    pub max_age_secs: i64,
}

impl Settings {
    /// Loads `.env`, then `whistly.toml` from the working directory, then the environment.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::load_from(Path::new("whistly"))
    }

    /// `file` is passed to the config crate without extension, e.g. `whistly`.
    pub fn load_from(file: &Path) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000_i64)?
            .set_default("database.url", "sqlite:whistly.db")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("media.root", "./media")?
            .set_default("media.url_prefix", "/media")?
            .set_default("media.max_upload_bytes", 2_i64 * 1024 * 1024)?
            .set_default("session.secret", DEV_SESSION_SECRET)?
            .set_default("session.secure_cookie", false)?
            .set_default("session.max_age_secs", 14_i64 * 24 * 60 * 60)?
            .add_source(File::with_name(&file.to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("WHISTLY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<(), SettingsError> {
        if self.session.secret.expose_secret() == DEV_SESSION_SECRET {
            if self.session.secure_cookie {
                return Err(SettingsError::InsecureSecret);
            }
            log::warn!("using the development session secret; set WHISTLY__SESSION__SECRET");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
