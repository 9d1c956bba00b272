use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub photo_dir: String,
    pub database_url: String,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Personal lost-item tracker")]
pub struct Args {
    /// Host to bind to (overrides THING_FINDER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides THING_FINDER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where photos are stored (overrides THING_FINDER_PHOTO_DIR)
    #[arg(long)]
    pub photo_dir: Option<String>,

    /// Database URL (overrides THING_FINDER_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Largest accepted request body in bytes (overrides THING_FINDER_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::merge(args)?, migrate))
    }

    /// CLI values win; environment fills the gaps; then built-in defaults.
    fn merge(args: Args) -> Result<Self> {
        let env_host = env::var("THING_FINDER_HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let env_port = env_number("THING_FINDER_PORT", 3000u16)?;
        let env_photos =
            env::var("THING_FINDER_PHOTO_DIR").unwrap_or_else(|_| "./data/photos".into());
        let env_db = env::var("THING_FINDER_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/thing_finder.db".into());
        let env_upload = env_number("THING_FINDER_MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            photo_dir: args.photo_dir.unwrap_or(env_photos),
            database_url: args.database_url.unwrap_or(env_db),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_number<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
