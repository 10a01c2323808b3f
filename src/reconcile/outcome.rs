//! Outcome planning and the run report.
//!
//! [`plan`] is the pure decision tree at the heart of the tool: given the
//! resolved target and the (possibly absent) normalized snapshot, it decides
//! which single action the run requires. Applying the action is the
//! orchestrator's job; nothing here performs IO.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::types::HaPayload;

use super::resource::{HaResource, Target, Vmid};

/// The single action a run requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Desired and current state already agree.
    NoOp {
        /// Resource identity.
        vmid: Vmid,
        /// Human-readable explanation.
        message: String,
    },
    /// No resource exists; one must be created.
    Create {
        /// Resource identity.
        vmid: Vmid,
        /// Full desired field set, identity included.
        payload: HaPayload,
    },
    /// The resource exists but differs in at least one managed field.
    Update {
        /// Resource identity, conveyed by the endpoint path.
        vmid: Vmid,
        /// Desired field set, identity excluded.
        payload: HaPayload,
        /// The elided current view, for audit display.
        old: HaPayload,
    },
    /// The resource exists and the target is absent.
    Delete {
        /// Resource identity.
        vmid: Vmid,
        /// The full current view, for audit display.
        old: HaPayload,
    },
}

/// Kind tag for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Nothing to do.
    None,
    /// A resource would be (or was) created.
    Create,
    /// A resource would be (or was) updated.
    Update,
    /// A resource would be (or was) deleted.
    Delete,
}

/// Decides the required action for one reconciliation run.
///
/// `current` is `None` when no HA resource exists for the guest. The
/// decision is a linear tree: absent targets yield delete or no-op; configure
/// targets yield create when nothing exists, and otherwise compare the
/// desired field set against the symmetrically elided current view.
#[must_use]
pub fn plan(vmid: Vmid, target: &Target, current: Option<&HaResource>) -> Outcome {
    match target {
        Target::Absent => current.map_or_else(
            || Outcome::NoOp {
                vmid,
                message: format!("Resource {vmid} does not exist"),
            },
            |existing| Outcome::Delete {
                vmid,
                old: existing.full_payload(),
            },
        ),
        Target::Configure(desired) => {
            let Some(existing) = current else {
                return Outcome::Create {
                    vmid,
                    payload: desired.to_payload(Some(vmid)),
                };
            };

            let new = desired.to_payload(None);
            let old = existing.elide_against(desired);

            if new == old {
                Outcome::NoOp {
                    vmid,
                    message: format!("Resource {vmid} is up to date"),
                }
            } else {
                Outcome::Update {
                    vmid,
                    payload: new,
                    old,
                }
            }
        }
    }
}

impl Outcome {
    /// Returns true if this outcome mutates the cluster when applied.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp { .. })
    }

    /// Returns the identity this outcome concerns.
    #[must_use]
    pub const fn vmid(&self) -> Vmid {
        match self {
            Self::NoOp { vmid, .. }
            | Self::Create { vmid, .. }
            | Self::Update { vmid, .. }
            | Self::Delete { vmid, .. } => *vmid,
        }
    }

    /// Returns the report kind tag for this outcome.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::NoOp { .. } => ActionKind::None,
            Self::Create { .. } => ActionKind::Create,
            Self::Update { .. } => ActionKind::Update,
            Self::Delete { .. } => ActionKind::Delete,
        }
    }
}

/// Result of a reconciliation run, as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    /// Whether the run changed (or, in check mode, would change) anything.
    pub changed: bool,
    /// The action taken or planned.
    pub action: ActionKind,
    /// Human-readable message.
    pub message: String,
    /// Field set before the change, for update and delete outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<HaPayload>,
    /// Field set after the change, for create and update outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<HaPayload>,
    /// True when the run only computed the outcome without applying it.
    pub check_mode: bool,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
}

impl ReconcileReport {
    /// Builds the report for an outcome.
    #[must_use]
    pub fn from_outcome(outcome: &Outcome, check_mode: bool) -> Self {
        let (message, old, new) = match outcome {
            Outcome::NoOp { message, .. } => (message.clone(), None, None),
            Outcome::Create { vmid, payload } => (
                format!("Added resource {vmid}"),
                None,
                Some(payload.clone()),
            ),
            Outcome::Update { vmid, payload, old } => (
                format!("Changed resource {vmid}"),
                Some(old.clone()),
                Some(payload.clone()),
            ),
            Outcome::Delete { vmid, old } => {
                (format!("Resource {vmid} removed"), Some(old.clone()), None)
            }
        };

        Self {
            changed: outcome.is_change(),
            action: outcome.kind(),
            message,
            old,
            new,
            check_mode,
            completed_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.changed { "changed" } else { "unchanged" };
        write!(f, "{status}: {}", self.message)?;
        if self.check_mode && self.changed {
            write!(f, " (check mode, nothing applied)")?;
        }
        Ok(())
    }
}
