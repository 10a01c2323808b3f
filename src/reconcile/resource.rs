//! Domain model for HA resources.
//!
//! Two instances matter per run: the desired resource built from caller
//! parameters and the current snapshot fetched from the cluster. Both are
//! constructed fresh each run and live only for the diff computation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::api::types::{HaPayload, HaResourceRecord, decode_sid};

/// Server-side default for `max_restart` and `max_relocate`.
///
/// The API omits these fields when they hold the default, so the snapshot
/// must fill them back in or repeated runs would never converge.
pub const POLICY_LIMIT_DEFAULT: u32 = 1;

/// Bare guest identifier (VMID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vmid(pub u32);

impl std::fmt::Display for Vmid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HA lifecycle states a resource can be configured into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaState {
    /// The cluster keeps the guest running.
    #[default]
    Started,
    /// The cluster keeps the guest stopped.
    Stopped,
    /// The resource is disabled; no HA actions are taken.
    Disabled,
    /// The resource is ignored entirely by the HA manager.
    Ignored,
}

impl HaState {
    /// Returns the wire representation of this state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Disabled => "disabled",
            Self::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for HaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HaState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "stopped" => Ok(Self::Stopped),
            "disabled" => Ok(Self::Disabled),
            "ignored" => Ok(Self::Ignored),
            other => Err(format!("unknown HA state '{other}'")),
        }
    }
}

/// The requested target of a run, with the `present` alias already resolved
/// to `started` before reconciliation begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The HA resource must not exist.
    Absent,
    /// The HA resource must exist with the given desired configuration.
    Configure(DesiredHa),
}

/// Desired HA resource, built from caller-supplied parameters.
///
/// A `None` field means "not managed", never "set to empty/zero". Zero is a
/// legitimate managed value for the policy limits, so unset-ness is carried
/// by the `Option` and not by falsiness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredHa {
    /// Requested lifecycle state. Always set; defaults to started.
    pub state: HaState,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Expected configuration digest for optimistic-concurrency checks.
    pub digest: Option<String>,
    /// HA group the guest should be a member of.
    pub group: Option<String>,
    /// Maximum restart attempts before the service counts as failed.
    pub max_restart: Option<u32>,
    /// Maximum relocate attempts before the service counts as failed.
    pub max_relocate: Option<u32>,
}

impl DesiredHa {
    /// Builds the managed field set, with unset fields elided.
    ///
    /// Passing a `vmid` includes the identity, as create calls require.
    #[must_use]
    pub fn to_payload(&self, vmid: Option<Vmid>) -> HaPayload {
        HaPayload {
            sid: vmid.map(|v| v.to_string()),
            state: Some(self.state.to_string()),
            comment: self.comment.clone(),
            digest: self.digest.clone(),
            group: self.group.clone(),
            max_restart: self.max_restart,
            max_relocate: self.max_relocate,
        }
    }
}

/// Normalized snapshot of a live HA resource.
///
/// Server-side defaults are filled in and the transport-only `type` tag is
/// dropped, so two snapshots of the same configuration always compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaResource {
    /// Bare guest identifier.
    pub vmid: Vmid,
    /// Configured lifecycle state.
    pub state: HaState,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Configuration digest.
    pub digest: Option<String>,
    /// HA group membership.
    pub group: Option<String>,
    /// Maximum restart attempts.
    pub max_restart: u32,
    /// Maximum relocate attempts.
    pub max_relocate: u32,
}

impl HaResource {
    /// Normalizes a wire record into a snapshot.
    ///
    /// Returns `None` for records whose sid cannot be decoded; those cannot
    /// belong to the guest being reconciled.
    #[must_use]
    pub fn from_record(record: &HaResourceRecord) -> Option<Self> {
        let vmid = decode_sid(&record.sid)?;

        let state = record
            .state
            .as_deref()
            .and_then(|s| {
                s.parse()
                    .inspect_err(|e| debug!("Treating {} as started: {e}", record.sid))
                    .ok()
            })
            .unwrap_or_default();

        Some(Self {
            vmid,
            state,
            comment: record.comment.clone(),
            digest: record.digest.clone(),
            group: record.group.clone(),
            max_restart: record.max_restart.unwrap_or(POLICY_LIMIT_DEFAULT),
            max_relocate: record.max_relocate.unwrap_or(POLICY_LIMIT_DEFAULT),
        })
    }

    /// Projects this snapshot onto the fields managed by `desired`.
    ///
    /// Elision is symmetric: a field unset in the desired resource is
    /// removed here as well, so unmanaged fields never cause spurious diffs
    /// even when the server reports a value for them.
    #[must_use]
    pub fn elide_against(&self, desired: &DesiredHa) -> HaPayload {
        HaPayload {
            sid: None,
            state: Some(self.state.to_string()),
            comment: desired
                .comment
                .as_ref()
                .and_then(|_| self.comment.clone()),
            digest: desired.digest.as_ref().and_then(|_| self.digest.clone()),
            group: desired.group.as_ref().and_then(|_| self.group.clone()),
            max_restart: desired.max_restart.map(|_| self.max_restart),
            max_relocate: desired.max_relocate.map(|_| self.max_relocate),
        }
    }

    /// Returns the complete field set of this snapshot, identity excluded.
    #[must_use]
    pub fn full_payload(&self) -> HaPayload {
        HaPayload {
            sid: None,
            state: Some(self.state.to_string()),
            comment: self.comment.clone(),
            digest: self.digest.clone(),
            group: self.group.clone(),
            max_restart: Some(self.max_restart),
            max_relocate: Some(self.max_relocate),
        }
    }
}
