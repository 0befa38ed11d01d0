//! Configuration module
//!
//! Settings are read once at startup from the process environment (and an
//! optional `.env` file) into an explicit [`Config`] value that is passed to the
//! pipeline and services. Nothing reads the environment while serving requests.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::scan_types::ScanBackendKind;
use crate::validation::AllowList;

const DEFAULT_PORT: u16 = 8080;
const MAX_UPLOAD_SIZE_MB: usize = 100;
const CLAMAV_PORT: u16 = 3310;
const SCAN_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const MIN_API_KEY_LEN: usize = 16;

/// Log output format for the tracing subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" | "text" | "pretty" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub request_timeout_secs: u64,
    pub log_format: LogFormat,
}

/// File API configuration
#[derive(Clone, Debug)]
pub struct FileApiConfig {
    pub base: BaseConfig,
    /// Shared secret expected in the `X-API-KEY` header
    pub api_key: String,
    // Storage layout
    pub storage_root: PathBuf,
    pub staging_root: PathBuf,
    pub public_base_url: String,
    pub max_upload_size_bytes: usize,
    pub allowed_extensions: AllowList,
    // Virus scanning
    pub scan_backend: ScanBackendKind,
    pub clamav_host: String,
    pub clamav_port: u16,
    pub clamscan_path: String,
    pub clamscan_args: Vec<String>,
    pub scan_timeout_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<FileApiConfig>);

impl Config {
    fn inner(&self) -> &FileApiConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = FileApiConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.inner().base.request_timeout_secs
    }

    pub fn log_format(&self) -> LogFormat {
        self.inner().base.log_format
    }

    pub fn api_key(&self) -> &str {
        &self.inner().api_key
    }

    pub fn storage_root(&self) -> &Path {
        &self.inner().storage_root
    }

    pub fn staging_root(&self) -> &Path {
        &self.inner().staging_root
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn allowed_extensions(&self) -> &AllowList {
        &self.inner().allowed_extensions
    }

    pub fn scan_backend(&self) -> ScanBackendKind {
        self.inner().scan_backend
    }

    pub fn clamav_host(&self) -> &str {
        &self.inner().clamav_host
    }

    pub fn clamav_port(&self) -> u16 {
        self.inner().clamav_port
    }

    pub fn clamscan_path(&self) -> &str {
        &self.inner().clamscan_path
    }

    pub fn clamscan_args(&self) -> &[String] {
        &self.inner().clamscan_args
    }

    pub fn scan_timeout_secs(&self) -> u64 {
        self.inner().scan_timeout_secs
    }
}

fn is_production_env(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

impl FileApiConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let base = BaseConfig {
            server_port,
            cors_origins,
            environment,
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "compact".to_string())
                .parse()?,
        };

        let scan_backend = env::var("SCAN_BACKEND")
            .unwrap_or_else(|_| "clamd".to_string())
            .parse()?;

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let config = FileApiConfig {
            base,
            api_key: env::var("API_KEY")
                .map_err(|_| anyhow::anyhow!("API_KEY must be set for authentication"))?,
            storage_root: env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            staging_root: env::var("STAGING_ROOT")
                .unwrap_or_else(|_| "staging".to_string())
                .into(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("http://localhost:{}/api/v1/files", server_port)),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            allowed_extensions: AllowList::default(),
            scan_backend,
            clamav_host: env::var("CLAMAV_HOST").unwrap_or_else(|_| "localhost".to_string()),
            clamav_port: env::var("CLAMAV_PORT")
                .unwrap_or_else(|_| CLAMAV_PORT.to_string())
                .parse()
                .unwrap_or(CLAMAV_PORT),
            clamscan_path: env::var("CLAMSCAN_PATH").unwrap_or_else(|_| "clamscan".to_string()),
            clamscan_args: env::var("CLAMSCAN_ARGS")
                .unwrap_or_else(|_| "--no-summary".to_string())
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            scan_timeout_secs: env::var("SCAN_TIMEOUT_SECS")
                .unwrap_or_else(|_| SCAN_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(SCAN_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.api_key.len() < MIN_API_KEY_LEN {
            return Err(anyhow::anyhow!(
                "API_KEY must be at least {} characters long",
                MIN_API_KEY_LEN
            ));
        }

        if is_production_env(&self.base.environment)
            && self.base.cors_origins.iter().any(|o| o == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.scan_timeout_secs == 0 {
            return Err(anyhow::anyhow!("SCAN_TIMEOUT_SECS must be greater than 0"));
        }

        if self.scan_backend == ScanBackendKind::Clamscan && self.clamscan_path.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "CLAMSCAN_PATH must be set when using the clamscan backend"
            ));
        }

        // Staged files must never be reachable by the retrieval walk.
        let storage = std::path::absolute(&self.storage_root)?;
        let staging = std::path::absolute(&self.staging_root)?;
        if staging.starts_with(&storage) || storage.starts_with(&staging) {
            return Err(anyhow::anyhow!(
                "STAGING_ROOT ({}) and STORAGE_ROOT ({}) must not overlap",
                self.staging_root.display(),
                self.storage_root.display()
            ));
        }

        Ok(())
    }
}
