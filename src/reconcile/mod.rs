//! Desired/current state model and outcome planning.

mod diff;
mod outcome;
mod resource;

pub use diff::{FieldDiff, field_diffs};
pub use outcome::{ActionKind, Outcome, ReconcileReport, plan};
pub use resource::{DesiredHa, HaResource, HaState, POLICY_LIMIT_DEFAULT, Target, Vmid};
