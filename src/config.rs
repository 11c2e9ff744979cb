use crate::defaults;
use crate::error::{Result, ScribedError};
use crate::recognition::RecognitionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub recognition: RecognitionSettings,
    pub storage: StorageSettings,
    pub gateway: GatewaySettings,
}

/// Recognition backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionSettings {
    /// host:port of the recognition backend.
    pub endpoint: String,
    /// Forwarded to the backend untouched.
    pub region: String,
    pub language_code: String,
    pub sample_rate_hz: u32,
    pub encoding: String,
    /// Bytes per audio frame sent to the backend.
    pub frame_bytes: usize,
    /// How long a session waits for the next backend event.
    pub idle_timeout_ms: u64,
    /// Cap on concurrent backend streams.
    pub max_streams: usize,
}

/// Transcript storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub table: String,
    pub database_url: String,
}

/// Listen address configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewaySettings {
    pub listen_host: String,
    pub listen_port: u16,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            endpoint: defaults::ENDPOINT.to_string(),
            region: defaults::REGION.to_string(),
            language_code: defaults::LANGUAGE_CODE.to_string(),
            sample_rate_hz: defaults::SAMPLE_RATE,
            encoding: defaults::MEDIA_ENCODING.to_string(),
            frame_bytes: defaults::FRAME_BYTES,
            idle_timeout_ms: defaults::IDLE_TIMEOUT_MS,
            max_streams: defaults::MAX_STREAMS,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            table: defaults::TABLE.to_string(),
            database_url: defaults::DATABASE_URL.to_string(),
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            listen_host: defaults::LISTEN_HOST.to_string(),
            listen_port: defaults::LISTEN_PORT,
        }
    }
}

impl RecognitionSettings {
    /// Parameters announced to the backend when a stream opens.
    pub fn recognition_config(&self) -> RecognitionConfig {
        RecognitionConfig {
            language_code: self.language_code.clone(),
            encoding: self.encoding.clone(),
            sample_rate_hz: self.sample_rate_hz,
            region: self.region.clone(),
        }
    }
}

impl GatewaySettings {
    /// The address the gateway binds, as host:port.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScribedError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ScribedError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Panics on invalid TOML so a broken file is never silently ignored.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(ScribedError::ConfigFileNotFound { .. }) => Self::default(),
            Err(e) => {
                panic!("Failed to load config from {}: {}", path.display(), e);
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SCRIBED_ENDPOINT → recognition.endpoint
    /// - SCRIBED_REGION → recognition.region
    /// - SCRIBED_LANGUAGE → recognition.language_code
    /// - SCRIBED_SAMPLE_RATE → recognition.sample_rate_hz
    /// - SCRIBED_ENCODING → recognition.encoding
    /// - SCRIBED_TABLE → storage.table
    /// - SCRIBED_DATABASE_URL → storage.database_url
    /// - SCRIBED_LISTEN_PORT → gateway.listen_port
    ///
    /// Unparsable numeric values are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("SCRIBED_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.recognition.endpoint = endpoint;
        }

        if let Ok(region) = std::env::var("SCRIBED_REGION")
            && !region.is_empty()
        {
            self.recognition.region = region;
        }

        if let Ok(language) = std::env::var("SCRIBED_LANGUAGE")
            && !language.is_empty()
        {
            self.recognition.language_code = language;
        }

        if let Ok(rate) = std::env::var("SCRIBED_SAMPLE_RATE")
            && !rate.is_empty()
        {
            match rate.parse() {
                Ok(parsed) => self.recognition.sample_rate_hz = parsed,
                Err(_) => warn!(value = %rate, "ignoring unparsable SCRIBED_SAMPLE_RATE"),
            }
        }

        if let Ok(encoding) = std::env::var("SCRIBED_ENCODING")
            && !encoding.is_empty()
        {
            self.recognition.encoding = encoding;
        }

        if let Ok(table) = std::env::var("SCRIBED_TABLE")
            && !table.is_empty()
        {
            self.storage.table = table;
        }

        if let Ok(url) = std::env::var("SCRIBED_DATABASE_URL")
            && !url.is_empty()
        {
            self.storage.database_url = url;
        }

        if let Ok(port) = std::env::var("SCRIBED_LISTEN_PORT")
            && !port.is_empty()
        {
            match port.parse() {
                Ok(parsed) => self.gateway.listen_port = parsed,
                Err(_) => warn!(value = %port, "ignoring unparsable SCRIBED_LISTEN_PORT"),
            }
        }

        self
    }

    /// Rejects values no gateway can run with.
    pub fn validate(&self) -> Result<()> {
        if self.recognition.frame_bytes == 0 {
            return Err(ScribedError::ConfigInvalidValue {
                key: "recognition.frame_bytes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.recognition.sample_rate_hz == 0 {
            return Err(ScribedError::ConfigInvalidValue {
                key: "recognition.sample_rate_hz".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.recognition.max_streams == 0 {
            return Err(ScribedError::ConfigInvalidValue {
                key: "recognition.max_streams".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/scribed/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("scribed")
            .join("config.toml")
    }
}
