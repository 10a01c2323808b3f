//! Proxmox VE API integration.
//!
//! Everything that knows about HTTP, the `data` envelope and the `vm:`/`ct:`
//! sid prefix lives here; the reconciliation core only ever sees bare
//! identifiers and normalized resources.

pub mod client;
pub mod types;

pub use client::PveClient;
pub use types::{
    ClusterGuest, HaPayload, HaResourceRecord, VersionInfo, decode_sid, encode_sid,
};
