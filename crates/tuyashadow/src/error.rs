//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use tuyashadow_config::ConfigError;
use tuyashadow_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Tuya cloud at {url}")]
    #[diagnostic(
        code(tuyashadow::connection_failed),
        help(
            "Check network access and the configured region.\n\
             Set base_url in the config for regional data centres."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(tuyashadow::timeout),
        help("Increase `timeout` in the config or check connectivity.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(tuyashadow::auth_failed),
        help(
            "Verify client_id and the client secret of your cloud project\n\
             (Tuya IoT Platform > Cloud > Project > Authorization Key)."
        )
    )]
    AuthFailed { message: String },

    #[error("No client secret configured for client id '{client_id}'")]
    #[diagnostic(
        code(tuyashadow::no_credentials),
        help(
            "Set client_secret_env to the name of an environment variable,\n\
             store it in the keyring (service 'tuya-shadow', user '{client_id}'),\n\
             or set client_secret in the config file."
        )
    )]
    NoCredentials { client_id: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("Device '{device_id}' is not configured")]
    #[diagnostic(
        code(tuyashadow::not_found),
        help("Run: tuyashadow sensors to see configured devices")
    )]
    DeviceNotFound { device_id: String },

    #[error("No device could be read ({failed} failed)")]
    #[diagnostic(code(tuyashadow::no_data), help("First failure: {first}"))]
    NoData { failed: usize, first: String },

    #[error("API error: {message}")]
    #[diagnostic(code(tuyashadow::api_error))]
    ApiError { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found")]
    #[diagnostic(
        code(tuyashadow::no_config),
        help(
            "Create one or pass --config.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tuyashadow::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(tuyashadow::config))]
    Config(ConfigError),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { path } => CliError::NoConfig {
                path: path.display().to_string(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { client_id } => CliError::NoCredentials { client_id },
            other @ ConfigError::Figment(_) => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::DeviceNotFound { device_id } => CliError::DeviceNotFound { device_id },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Fetch { device_id, reason } => CliError::ApiError {
                message: format!("{device_id}: {reason}"),
            },
            CoreError::Api { message, .. } => CliError::ApiError { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn exit_codes() {
        let missing: CliError = ConfigError::NotFound {
            path: PathBuf::from("/nope/config.toml"),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::GENERAL);

        let invalid: CliError = ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        }
        .into();
        assert_eq!(invalid.exit_code(), exit_code::USAGE);

        let auth: CliError = CoreError::AuthenticationFailed {
            message: "sign invalid".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let unknown: CliError = CoreError::DeviceNotFound {
            device_id: "dev9".into(),
        }
        .into();
        assert_eq!(unknown.exit_code(), exit_code::NOT_FOUND);
    }
}
