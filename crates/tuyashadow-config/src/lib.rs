//! Configuration for tuyashadow.
//!
//! TOML file layered with `TUYA_SHADOW_*` environment variables, client
//! secret resolution (env var, keyring, plaintext), validation, and
//! translation to `tuyashadow_core::PollerConfig`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use tuyashadow_core::{Credentials, DataPointConfig, DeviceConfig, PollerConfig, TlsMode};

/// Keyring service under which client secrets are stored, keyed by client id.
pub const KEYRING_SERVICE: &str = "tuya-shadow";

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "TUYA_SHADOW_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no client secret configured for client id '{client_id}'")]
    NoCredentials { client_id: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
///
/// ```toml
/// client_id = "abcd1234"
/// client_secret_env = "TUYA_SECRET"
/// region = "eu"
/// scan_interval = 60
///
/// [[devices]]
/// id = "bf0123456789abcdef"
/// name = "Boiler"
///
/// [[devices.dps]]
/// code = "temp_current"
/// name = "Temperature"
/// unit = "°C"
/// factor = 0.1
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub client_id: String,

    /// Client secret (plaintext, prefer keyring or env var).
    pub client_secret: Option<String>,

    /// Environment variable name containing the client secret.
    pub client_secret_env: Option<String>,

    /// Data centre region, e.g. "eu", "us", "cn", "in".
    #[serde(default = "default_region")]
    pub region: String,

    /// Endpoint override (e.g. "https://openapi-ueaz.tuyaus.com").
    pub base_url: Option<String>,

    /// Path to an additional CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Seconds between poll cycles.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            client_secret_env: None,
            region: default_region(),
            base_url: None,
            ca_cert: None,
            scan_interval: default_scan_interval(),
            timeout: default_timeout(),
            devices: Vec::new(),
        }
    }
}

fn default_region() -> String {
    "eu".into()
}
fn default_scan_interval() -> u64 {
    tuyashadow_core::DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_timeout() -> u64 {
    10
}
fn default_factor() -> f64 {
    1.0
}

/// A `[[devices]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub id: String,
    /// Display name; defaults to the id.
    pub name: Option<String>,
    #[serde(default)]
    pub dps: Vec<DataPointEntry>,
}

/// A `[[devices.dps]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataPointEntry {
    pub code: String,
    /// Display name; defaults to the code.
    pub name: Option<String>,
    pub unit: Option<String>,
    #[serde(default = "default_factor")]
    pub factor: f64,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tuyashadow", "tuyashadow").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tuyashadow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config at the platform default path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load `path`, layered over defaults and under `TUYA_SHADOW_*` env vars.
///
/// The file must exist: the device list cannot come from the environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).only(&[
            "client_id",
            "client_secret",
            "client_secret_env",
            "region",
            "base_url",
            "ca_cert",
            "scan_interval",
            "timeout",
        ]));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Validation ──────────────────────────────────────────────────────

impl Config {
    /// Check everything that can be checked without touching the network
    /// or the credential stores.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(invalid("client_id", "must not be empty"));
        }
        if self.region.trim().is_empty() && self.base_url.is_none() {
            return Err(invalid("region", "must not be empty"));
        }
        if self.scan_interval == 0 {
            return Err(invalid("scan_interval", "must be at least 1 second"));
        }
        if self.timeout == 0 {
            return Err(invalid("timeout", "must be at least 1 second"));
        }
        self.endpoint()?;

        if self.devices.is_empty() {
            return Err(invalid("devices", "at least one device is required"));
        }
        let mut seen = HashSet::new();
        for (i, device) in self.devices.iter().enumerate() {
            if device.id.trim().is_empty() {
                return Err(invalid(format!("devices[{i}].id"), "must not be empty"));
            }
            // Ids are placed verbatim in the signed request path.
            if !device
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(invalid(
                    format!("devices[{i}].id"),
                    format!(
                        "'{}' may only contain letters, digits, '_' and '-'",
                        device.id
                    ),
                ));
            }
            if !seen.insert(device.id.as_str()) {
                return Err(invalid(
                    format!("devices[{i}].id"),
                    format!("duplicate device id '{}'", device.id),
                ));
            }
            for (j, dp) in device.dps.iter().enumerate() {
                if dp.code.trim().is_empty() {
                    return Err(invalid(
                        format!("devices[{i}].dps[{j}].code"),
                        "must not be empty",
                    ));
                }
                if !dp.factor.is_finite() {
                    return Err(invalid(
                        format!("devices[{i}].dps[{j}].factor"),
                        format!("must be a finite number, got {}", dp.factor),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Parsed `base_url`, if set.
    pub fn endpoint(&self) -> Result<Option<Url>, ConfigError> {
        self.base_url
            .as_deref()
            .map(|raw| {
                let url: Url = raw
                    .parse()
                    .map_err(|e| invalid("base_url", format!("'{raw}': {e}")))?;
                if url.scheme() != "https" && url.scheme() != "http" {
                    return Err(invalid("base_url", format!("'{raw}' is not an HTTP URL")));
                }
                Ok(url)
            })
            .transpose()
    }

    /// The configured devices with display-name defaults applied.
    pub fn device_configs(&self) -> Vec<DeviceConfig> {
        self.devices
            .iter()
            .map(|entry| DeviceConfig {
                id: entry.id.clone(),
                name: entry.name.clone().unwrap_or_else(|| entry.id.clone()),
                data_points: entry
                    .dps
                    .iter()
                    .map(|dp| DataPointConfig {
                        code: dp.code.clone(),
                        name: dp.name.clone().unwrap_or_else(|| dp.code.clone()),
                        unit: dp.unit.clone(),
                        factor: dp.factor,
                    })
                    .collect(),
            })
            .collect()
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the client secret: `client_secret_env` variable, then the
/// system keyring, then plaintext in the config.
pub fn resolve_client_secret(config: &Config) -> Result<SecretString, ConfigError> {
    resolve_client_secret_with(
        config,
        |name| std::env::var(name).ok(),
        |client_id| {
            keyring::Entry::new(KEYRING_SERVICE, client_id)
                .and_then(|entry| entry.get_password())
                .ok()
        },
    )
}

fn resolve_client_secret_with(
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(secret) = config.client_secret_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(secret));
    }

    // 2. System keyring
    if let Some(secret) = keyring(&config.client_id) {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref secret) = config.client_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        client_id: config.client_id.clone(),
    })
}

/// Validate `config`, resolve its secret, and build a `PollerConfig`.
pub fn to_poller_config(config: &Config) -> Result<PollerConfig, ConfigError> {
    config.validate()?;
    let client_secret = resolve_client_secret(config)?;
    build_poller_config(config, client_secret)
}

fn build_poller_config(
    config: &Config,
    client_secret: SecretString,
) -> Result<PollerConfig, ConfigError> {
    let credentials = Credentials {
        client_id: config.client_id.clone(),
        client_secret,
        region: config.region.clone(),
    };

    let mut poller = PollerConfig::new(credentials, config.device_configs());
    poller.base_url = config.endpoint()?;
    if let Some(ref ca) = config.ca_cert {
        poller.tls = TlsMode::CustomCa(ca.clone());
    }
    poller.timeout = Duration::from_secs(config.timeout);
    poller.poll_interval = Duration::from_secs(config.scan_interval);
    Ok(poller)
}
