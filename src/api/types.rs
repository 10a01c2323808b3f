//! Wire types for the Proxmox VE API.
//!
//! These structures mirror the JSON bodies returned by the `/api2/json`
//! endpoints we touch. The API wraps every response in a `{"data": ...}`
//! envelope; unwrapping happens in the client.

use serde::{Deserialize, Serialize};

use crate::reconcile::Vmid;

/// Response body of `GET /version`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    /// Full version string, e.g. `"8.2.4"`.
    pub version: String,
    /// Release name, if reported.
    #[serde(default)]
    pub release: Option<String>,
    /// Repository id, if reported.
    #[serde(default)]
    pub repoid: Option<String>,
}

impl VersionInfo {
    /// Parses the major version component out of the version string.
    #[must_use]
    pub fn major(&self) -> Option<u32> {
        self.version.split('.').next()?.parse().ok()
    }
}

/// A guest entry from `GET /cluster/resources?type=vm`.
///
/// The endpoint returns both QEMU VMs and LXC containers when filtered by
/// `type=vm`; the concrete guest kind is carried in the `type` field.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterGuest {
    /// The guest's numeric identifier, unique per cluster.
    pub vmid: u32,
    /// Human-readable guest name (may be absent).
    #[serde(default)]
    pub name: Option<String>,
    /// Guest kind, `qemu` or `lxc`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Node the guest resides on.
    #[serde(default)]
    pub node: Option<String>,
    /// Current guest status, e.g. `running`.
    #[serde(default)]
    pub status: Option<String>,
}

/// An HA resource entry from `GET /cluster/ha/resources`.
///
/// `state`, `max_restart` and `max_relocate` are omitted by the server when
/// they hold their defaults; normalization into [`crate::reconcile::HaResource`]
/// fills them back in.
#[derive(Debug, Clone, Deserialize)]
pub struct HaResourceRecord {
    /// Service id with a `vm:`/`ct:` type prefix, e.g. `"vm:100"`.
    pub sid: String,
    /// Requested HA state, if set.
    #[serde(default)]
    pub state: Option<String>,
    /// Free-text comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Configuration digest for optimistic-concurrency checks.
    #[serde(default)]
    pub digest: Option<String>,
    /// HA group membership.
    #[serde(default)]
    pub group: Option<String>,
    /// Maximum restart attempts before the service counts as failed.
    #[serde(default)]
    pub max_restart: Option<u32>,
    /// Maximum relocate attempts before the service counts as failed.
    #[serde(default)]
    pub max_relocate: Option<u32>,
    /// Resource type tag (`vm`/`ct`). Not user-managed, dropped on normalization.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Mutation body for HA resource create and update calls.
///
/// Doubles as the audit before/after view in reports: unset fields are
/// skipped on serialization, so the payload is exactly the managed field set.
/// Equality over two payloads is the reconciliation comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HaPayload {
    /// Bare guest identifier; only present on create (updates carry it in the URL).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Requested HA state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Free-text comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Configuration digest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// HA group membership.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Maximum restart attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_restart: Option<u32>,
    /// Maximum relocate attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_relocate: Option<u32>,
}

/// Decodes an API `sid` into the bare guest identifier.
///
/// The API tags service ids with a type prefix (`vm:100`, `ct:200`); the
/// prefix is a transport detail and the rest of the tool only ever sees the
/// bare [`Vmid`]. Bare numeric sids are accepted as well.
#[must_use]
pub fn decode_sid(sid: &str) -> Option<Vmid> {
    let bare = match sid.split_once(':') {
        Some((prefix, rest)) => {
            if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_lowercase()) {
                return None;
            }
            rest
        }
        None => sid,
    };
    bare.parse().ok().map(Vmid)
}

/// Encodes a guest identifier into the sid form used in requests.
///
/// The API accepts the bare VMID in request paths and bodies; no type prefix
/// is needed on the way out.
#[must_use]
pub fn encode_sid(vmid: Vmid) -> String {
    vmid.0.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sid_with_prefix() {
        assert_eq!(decode_sid("vm:100"), Some(Vmid(100)));
        assert_eq!(decode_sid("ct:204"), Some(Vmid(204)));
    }

    #[test]
    fn test_decode_sid_bare() {
        assert_eq!(decode_sid("100"), Some(Vmid(100)));
    }

    #[test]
    fn test_decode_sid_rejects_garbage() {
        assert_eq!(decode_sid("vm:abc"), None);
        assert_eq!(decode_sid(":100"), None);
        assert_eq!(decode_sid("VM:100"), None);
        assert_eq!(decode_sid(""), None);
    }

    #[test]
    fn test_encode_sid_is_bare() {
        assert_eq!(encode_sid(Vmid(100)), "100");
        assert_eq!(decode_sid(&encode_sid(Vmid(42))), Some(Vmid(42)));
    }

    #[test]
    fn test_version_major() {
        let version = VersionInfo {
            version: String::from("8.2.4"),
            release: None,
            repoid: None,
        };
        assert_eq!(version.major(), Some(8));

        let odd = VersionInfo {
            version: String::from("beta"),
            release: None,
            repoid: None,
        };
        assert_eq!(odd.major(), None);
    }

    #[test]
    fn test_payload_serializes_only_set_fields() {
        let payload = HaPayload {
            sid: Some(String::from("100")),
            state: Some(String::from("stopped")),
            group: Some(String::from("g1")),
            ..HaPayload::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"sid": "100", "state": "stopped", "group": "g1"})
        );
    }

    #[test]
    fn test_record_deserializes_sparse_entry() {
        let json = serde_json::json!({"sid": "vm:100", "type": "vm", "digest": "abc"});
        let record: HaResourceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.sid, "vm:100");
        assert!(record.state.is_none());
        assert!(record.max_restart.is_none());
        assert_eq!(record.kind.as_deref(), Some("vm"));
    }
}
