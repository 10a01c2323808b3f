//! API connection configuration.
//!
//! Resolves the connection parameters for a cluster, including the
//! `PROXMOX_PASSWORD` fallback used when no password flag is given.

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

/// Environment variable consulted when no password is passed explicitly.
pub const PASSWORD_ENV: &str = "PROXMOX_PASSWORD";

/// Default port of the Proxmox VE API.
pub const DEFAULT_PORT: u16 = 8006;

/// Resolved connection configuration for one cluster.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Hostname, IP address, or a full base URL.
    pub host: String,
    /// API port, ignored when `host` is a full URL.
    pub port: u16,
    /// API user, e.g. `root@pam`.
    pub user: String,
    /// Resolved password. Never read from the environment after construction.
    pub password: String,
    /// Whether to verify the cluster's TLS certificate.
    pub validate_certs: bool,
}

impl ConnectionConfig {
    /// Builds a configuration from caller-supplied parameters, resolving the
    /// password from [`PASSWORD_ENV`] when none is given.
    ///
    /// # Errors
    ///
    /// Returns an error if no password is supplied and the fallback variable
    /// is unset.
    pub fn resolve(
        host: String,
        port: u16,
        user: String,
        password: Option<String>,
        validate_certs: bool,
    ) -> Result<Self> {
        let password = resolve_password(password, std::env::var(PASSWORD_ENV).ok())?;

        Ok(Self {
            host,
            port,
            user,
            password,
            validate_certs,
        })
    }

    /// Returns the base URL up to and including `/api2/json`.
    ///
    /// A host carrying a scheme is taken as-is, which also lets tests point
    /// the client at a plain-HTTP mock server.
    #[must_use]
    pub fn api_url(&self) -> String {
        if self.host.contains("://") {
            format!("{}/api2/json", self.host.trim_end_matches('/'))
        } else {
            format!("https://{}:{}/api2/json", self.host, self.port)
        }
    }
}

/// Picks the effective password: explicit flag first, then the env fallback.
fn resolve_password(explicit: Option<String>, fallback: Option<String>) -> Result<String> {
    match explicit.filter(|p| !p.is_empty()).or(fallback) {
        Some(password) => Ok(password),
        None => Err(ConfigError::MissingCredential {
            env_var: PASSWORD_ENV,
        }
        .into()),
    }
}

/// Loads a `.env` file from the working directory if one exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment from: {}", path.display()),
        Err(_) => debug!(".env file not found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PveHaError;

    #[test]
    fn test_explicit_password_wins() {
        let password = resolve_password(
            Some(String::from("flag-secret")),
            Some(String::from("env-secret")),
        )
        .unwrap();
        assert_eq!(password, "flag-secret");
    }

    #[test]
    fn test_env_fallback_used_when_flag_missing() {
        let password = resolve_password(None, Some(String::from("env-secret"))).unwrap();
        assert_eq!(password, "env-secret");
    }

    #[test]
    fn test_empty_flag_falls_back() {
        let password =
            resolve_password(Some(String::new()), Some(String::from("env-secret"))).unwrap();
        assert_eq!(password, "env-secret");
    }

    #[test]
    fn test_missing_credential_is_an_error() {
        let result = resolve_password(None, None);
        assert!(matches!(
            result,
            Err(PveHaError::Config(ConfigError::MissingCredential { .. }))
        ));
    }

    #[test]
    fn test_api_url_from_hostname() {
        let config = ConnectionConfig {
            host: String::from("pve1.example.com"),
            port: 8006,
            user: String::from("root@pam"),
            password: String::from("x"),
            validate_certs: false,
        };
        assert_eq!(config.api_url(), "https://pve1.example.com:8006/api2/json");
    }

    #[test]
    fn test_api_url_passes_through_full_url() {
        let config = ConnectionConfig {
            host: String::from("http://127.0.0.1:9000/"),
            port: 8006,
            user: String::from("root@pam"),
            password: String::from("x"),
            validate_certs: false,
        };
        assert_eq!(config.api_url(), "http://127.0.0.1:9000/api2/json");
    }
}
