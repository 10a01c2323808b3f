//! Error types for the pveha reconciler.
//!
//! This module provides the error hierarchy for all operations in a
//! reconciliation run: configuration, Proxmox API transport, identity
//! resolution, and reconciliation itself.
//!
//! Every error is terminal for the run. Nothing is retried and at most one
//! mutating API call is ever attempted, so a failed run implies no mutation
//! was performed.

use thiserror::Error;

/// The main error type for pveha.
#[derive(Debug, Error)]
pub enum PveHaError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Proxmox API transport errors.
    #[error("Proxmox API error: {0}")]
    Api(#[from] ApiError),

    /// Guest identity resolution errors.
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No credential was supplied and no fallback is available.
    #[error(
        "Neither --api-password nor the {env_var} environment variable are set. \
         Please specify a password for connecting to the PVE cluster"
    )]
    MissingCredential {
        /// Name of the fallback environment variable.
        env_var: &'static str,
    },

    /// Neither a guest name nor a VMID was supplied.
    #[error("Either --name or --vmid must be specified to identify the guest")]
    MissingIdentity,
}

/// Proxmox API transport errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication against the cluster failed.
    #[error("Proxmox authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// The API returned a non-success status.
    #[error("Proxmox API request failed: {status} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the API.
        message: String,
    },

    /// Network-level failure.
    #[error("Network error communicating with the PVE cluster: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// The API returned a body we could not interpret.
    #[error("Invalid response from the Proxmox API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Guest identity resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No guest with the given name exists in the cluster resource catalog.
    #[error("Could not find VMID for name '{name}' in cluster resources")]
    NameNotFound {
        /// The unresolvable guest name.
        name: String,
    },

    /// More than one guest carries the given name.
    #[error("Guest name '{name}' is ambiguous: {matches} guests match")]
    AmbiguousName {
        /// The ambiguous guest name.
        name: String,
        /// Number of matching guests.
        matches: usize,
    },

    /// The resource catalog itself could not be read.
    #[error("Could not get PVE resource information: {message}")]
    LookupFailed {
        /// Underlying cause.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The HA resource snapshot could not be fetched.
    #[error(
        "Could not get HA resource list from the PVE cluster. Is your cluster healthy? {message}"
    )]
    FetchFailed {
        /// Underlying cause.
        message: String,
    },

    /// The single mutating call of the run failed.
    #[error("Could not {action} HA resource {vmid}: {message}")]
    MutationFailed {
        /// The mutation that was attempted (add/change/remove).
        action: String,
        /// Identity of the resource.
        vmid: u32,
        /// Underlying cause.
        message: String,
    },

    /// The remote cluster predates the current HA stack.
    #[error(
        "PVE version {version} is not supported: this tool only supports the \
         HA stack introduced in Proxmox PVE {minimum}.0"
    )]
    UnsupportedVersion {
        /// Reported major version.
        version: u32,
        /// Minimum supported major version.
        minimum: u32,
    },
}

/// Result type alias for pveha operations.
pub type Result<T> = std::result::Result<T, PveHaError>;

impl ApiError {
    /// Creates a request error from a status code and body.
    #[must_use]
    pub fn request(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl ReconcileError {
    /// Creates a fetch error from an underlying cause.
    #[must_use]
    pub fn fetch(cause: impl std::fmt::Display) -> Self {
        Self::FetchFailed {
            message: cause.to_string(),
        }
    }

    /// Creates a mutation error for a specific resource and action.
    #[must_use]
    pub fn mutation(action: impl Into<String>, vmid: u32, cause: impl std::fmt::Display) -> Self {
        Self::MutationFailed {
            action: action.into(),
            vmid,
            message: cause.to_string(),
        }
    }
}
