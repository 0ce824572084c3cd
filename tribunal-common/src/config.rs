//! Configuration resolution for the grading service
//!
//! Each knob resolves with ENV → TOML → compiled default priority. The
//! resulting `Config` is built once at startup and passed explicitly to the
//! driver and HTTP surface; no stage reads configuration on its own.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::{Error, Result};

/// Process-wide configuration, resolved once at init
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP surface
    pub bind: String,
    /// Frontend origin admitted by the CORS layer
    pub frontend_origin: String,
    /// Filesystem root for the artifact store
    pub upload_dir: PathBuf,
    /// Per-file upload cap in MiB
    pub max_upload_mib: u64,
    /// Budget for transcribing all audio files of one submission
    pub transcription_timeout: Duration,
    /// End-to-end budget for the agent pipeline
    pub pipeline_timeout: Duration,
    /// Event-log poll interval for the progress stream
    pub stream_poll_interval: Duration,
    /// Soft cap on a single stream connection
    pub stream_max_duration: Duration,
    /// Provider API key; absent means live grading is unavailable
    pub api_key: Option<String>,
    /// Provider model identifier
    pub model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            frontend_origin: "http://localhost:5173".to_string(),
            upload_dir: PathBuf::from("./storage"),
            max_upload_mib: 10,
            transcription_timeout: Duration::from_secs(120),
            pipeline_timeout: Duration::from_secs(300),
            stream_poll_interval: Duration::from_millis(500),
            stream_max_duration: Duration::from_secs(600),
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

impl Config {
    /// Per-file upload cap in bytes
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mib * 1024 * 1024
    }

    /// Resolve configuration from environment variables and the optional
    /// TOML file, falling back to compiled defaults.
    pub fn load() -> Result<Self> {
        let file = load_config_file()?;
        let mut config = Config::default();

        if let Some(v) = resolve_string("TRIBUNAL_BIND", file.bind.as_deref()) {
            config.bind = v;
        }
        if let Some(v) = resolve_string("TRIBUNAL_FRONTEND_ORIGIN", file.frontend_origin.as_deref())
        {
            config.frontend_origin = v;
        }
        if let Some(v) = resolve_string("TRIBUNAL_UPLOAD_DIR", file.upload_dir.as_deref()) {
            config.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = resolve_u64("TRIBUNAL_MAX_UPLOAD_MIB", file.max_upload_mib)? {
            config.max_upload_mib = v;
        }
        if let Some(v) =
            resolve_u64("TRIBUNAL_TRANSCRIPTION_TIMEOUT_SECS", file.transcription_timeout_secs)?
        {
            config.transcription_timeout = Duration::from_secs(v);
        }
        if let Some(v) = resolve_u64("TRIBUNAL_PIPELINE_TIMEOUT_SECS", file.pipeline_timeout_secs)?
        {
            config.pipeline_timeout = Duration::from_secs(v);
        }
        if let Some(v) =
            resolve_f64("TRIBUNAL_STREAM_POLL_INTERVAL_SECS", file.stream_poll_interval_secs)?
        {
            config.stream_poll_interval = Duration::from_secs_f64(v);
        }
        if let Some(v) =
            resolve_u64("TRIBUNAL_STREAM_MAX_DURATION_SECS", file.stream_max_duration_secs)?
        {
            config.stream_max_duration = Duration::from_secs(v);
        }
        if let Some(v) = resolve_string("TRIBUNAL_API_KEY", file.api_key.as_deref()) {
            if !v.trim().is_empty() {
                config.api_key = Some(v);
            }
        }
        if let Some(v) = resolve_string("TRIBUNAL_MODEL", file.model.as_deref()) {
            config.model = v;
        }

        if config.api_key.is_none() {
            warn!("No provider API key configured; live grading will fail until TRIBUNAL_API_KEY is set");
        }

        Ok(config)
    }
}

/// TOML file shape; every field optional so partial files work
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<String>,
    frontend_origin: Option<String>,
    upload_dir: Option<String>,
    max_upload_mib: Option<u64>,
    transcription_timeout_secs: Option<u64>,
    pipeline_timeout_secs: Option<u64>,
    stream_poll_interval_secs: Option<f64>,
    stream_max_duration_secs: Option<u64>,
    api_key: Option<String>,
    model: Option<String>,
}

/// Locate and parse the TOML config file.
///
/// `TRIBUNAL_CONFIG` overrides the default location
/// (`<config dir>/tribunal/config.toml`). A missing file is not an error;
/// a present but unparseable file is.
fn load_config_file() -> Result<FileConfig> {
    let path = match std::env::var("TRIBUNAL_CONFIG") {
        Ok(p) => PathBuf::from(p),
        Err(_) => match dirs::config_dir() {
            Some(dir) => dir.join("tribunal").join("config.toml"),
            None => return Ok(FileConfig::default()),
        },
    };

    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("read {} failed: {e}", path.display())))?;
    let parsed = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("parse {} failed: {e}", path.display())))?;

    info!("Loaded configuration from {}", path.display());
    Ok(parsed)
}

fn resolve_string(env_name: &str, file_value: Option<&str>) -> Option<String> {
    if let Ok(v) = std::env::var(env_name) {
        return Some(v);
    }
    file_value.map(|s| s.to_string())
}

fn resolve_u64(env_name: &str, file_value: Option<u64>) -> Result<Option<u64>> {
    if let Ok(raw) = std::env::var(env_name) {
        let parsed = raw
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("{env_name} must be an integer, got '{raw}'")))?;
        return Ok(Some(parsed));
    }
    Ok(file_value)
}

fn resolve_f64(env_name: &str, file_value: Option<f64>) -> Result<Option<f64>> {
    if let Ok(raw) = std::env::var(env_name) {
        let parsed = raw
            .parse::<f64>()
            .map_err(|_| Error::Config(format!("{env_name} must be a number, got '{raw}'")))?;
        return Ok(Some(parsed));
    }
    Ok(file_value)
}
