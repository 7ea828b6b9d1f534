//! Command-line configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via OCPPMSG_CONFIG or --config)
//! 3. Environment variables

use ocppmsg_protocol::{SerializationFormat, SignKey};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tool configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Envelope defaults.
    pub envelope: EnvelopeConfig,
    /// Message signing.
    pub signing: SigningConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads the configuration file named by `path`, or by `OCPPMSG_CONFIG`
    /// when no path is given, then applies environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("OCPPMSG_CONFIG").ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(&|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        self.envelope.apply_overrides(lookup);
        self.signing.apply_overrides(lookup);
        self.logging.apply_overrides(lookup);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.envelope.validate()
    }
}

/// Defaults applied to envelopes built or parsed by the tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// `json` or `json_utf8_binary`.
    pub serialization_format: String,
    /// Emit the JSON-LD `@context` when printing messages.
    pub include_context: bool,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            serialization_format: "json".to_string(),
            include_context: false,
        }
    }
}

impl EnvelopeConfig {
    fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(timeout) = lookup("OCPPMSG_REQUEST_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.request_timeout_secs = secs;
            }
        }

        if let Some(format) = lookup("OCPPMSG_FORMAT") {
            self.serialization_format = format;
        }

        if let Some(include) = lookup("OCPPMSG_INCLUDE_CONTEXT") {
            self.include_context = include == "true" || include == "1";
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn serialization_format(&self) -> Result<SerializationFormat, ConfigError> {
        self.serialization_format
            .parse()
            .map_err(ConfigError::ValidationError)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "envelope.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.serialization_format().map(|_| ())
    }
}

/// Ed25519 signing key settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// File holding the hex encoded 32 byte key seed.
    pub key_file: Option<PathBuf>,
    /// Signer name written into produced signatures.
    pub name: Option<String>,
}

impl SigningConfig {
    fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("OCPPMSG_SIGNING_KEY_FILE") {
            self.key_file = Some(PathBuf::from(path));
        }
        if let Some(name) = lookup("OCPPMSG_SIGNER_NAME") {
            self.name = Some(name);
        }
    }

    /// Loads the signing key, preferring `override_path` over the configured file.
    pub fn load_key(&self, override_path: Option<&Path>) -> Result<SignKey, ConfigError> {
        let path = override_path
            .or(self.key_file.as_deref())
            .ok_or_else(|| {
                ConfigError::ValidationError(
                    "no signing key configured (signing.key_file or --key-file)".to_string(),
                )
            })?;
        let seed = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let key = SignKey::from_hex(&seed)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(match &self.name {
            Some(name) => key.with_name(name),
            None => key,
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(filter) = lookup("OCPPMSG_LOG") {
            self.filter = filter;
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.envelope.request_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.envelope.serialization_format().unwrap(),
            SerializationFormat::Json
        );
        assert!(!config.envelope.include_context);
        assert_eq!(config.logging.filter, "warn");
        assert!(config.signing.key_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "envelope:\n  request_timeout_secs: 5\n  include_context: true\nlogging:\n  filter: debug"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.envelope.request_timeout_secs, 5);
        assert!(config.envelope.include_context);
        assert_eq!(config.envelope.serialization_format, "json");
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(..)));
    }

    #[test]
    fn test_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "envelope: [not, a, map]").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(&lookup(&[
            ("OCPPMSG_REQUEST_TIMEOUT", "90"),
            ("OCPPMSG_FORMAT", "json_utf8_binary"),
            ("OCPPMSG_INCLUDE_CONTEXT", "1"),
            ("OCPPMSG_SIGNER_NAME", "station-7"),
            ("OCPPMSG_LOG", "ocppmsg=trace"),
        ]));
        assert_eq!(config.envelope.request_timeout_secs, 90);
        assert_eq!(
            config.envelope.serialization_format().unwrap(),
            SerializationFormat::JsonUtf8Binary
        );
        assert!(config.envelope.include_context);
        assert_eq!(config.signing.name.as_deref(), Some("station-7"));
        assert_eq!(config.logging.filter, "ocppmsg=trace");
    }

    #[test]
    fn test_unparsable_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(&lookup(&[("OCPPMSG_REQUEST_TIMEOUT", "soon")]));
        assert_eq!(config.envelope.request_timeout_secs, 30);
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.envelope.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.envelope.serialization_format = "xml".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_load_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", "11".repeat(32)).unwrap();

        let signing = SigningConfig {
            key_file: Some(file.path().to_path_buf()),
            name: Some("cs-1".to_string()),
        };
        let key = signing.load_key(None).unwrap();
        assert_eq!(key.key_id(), SignKey::from_seed([0x11; 32]).key_id());

        assert!(SigningConfig::default().load_key(None).is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
