use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    /// Empty means permissive CORS.
    pub cors_allowed_origins: Vec<String>,
    pub staging: StagingConfig,
    pub engine: EngineConfig,
}

/// Where uploaded documents are placed before analysis.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub dir: PathBuf,
    /// Keep staged files after the request finishes instead of deleting them.
    pub retain_uploads: bool,
}

/// How the external classification engine is launched.
///
/// The child is invoked as `program [args...] <staged path>`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("Required environment variable 'DATABASE_URL' is not set")?;

        let engine_args = lookup("ENGINE_ARGS")
            .unwrap_or_else(|| "predict/app.py".to_string())
            .split_whitespace()
            .map(String::from)
            .collect();

        let timeout_secs: u64 = parse_or(&lookup, "ENGINE_TIMEOUT_SECS", 60)?;
        if timeout_secs == 0 {
            anyhow::bail!("ENGINE_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Config {
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            staging: StagingConfig {
                dir: lookup("STAGING_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("uploads")),
                retain_uploads: parse_bool(&lookup, "RETAIN_STAGED_UPLOADS")?,
            },
            engine: EngineConfig {
                program: lookup("ENGINE_PROGRAM").unwrap_or_else(|| "python3".to_string()),
                args: engine_args,
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        _ => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("yes") => {
            Ok(true)
        }
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" || v.eq_ignore_ascii_case("no") => {
            Ok(false)
        }
        Some(v) => anyhow::bail!("{key} must be a boolean, got '{v}'"),
    }
}
