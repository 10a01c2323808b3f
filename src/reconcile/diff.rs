//! Field-wise diff between two managed field sets.
//!
//! The reconciliation decision itself is plain payload equality; this module
//! only produces the per-field details shown to the user for update outcomes.

use crate::api::types::HaPayload;

/// A single differing field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldDiff {
    /// Field name.
    pub field: &'static str,
    /// Value before the change, if any.
    pub old_value: Option<String>,
    /// Value after the change, if any.
    pub new_value: Option<String>,
}

/// Computes the per-field differences between two payloads.
///
/// The identity field is skipped; it can never differ between the elided
/// views of the same resource.
#[must_use]
pub fn field_diffs(old: &HaPayload, new: &HaPayload) -> Vec<FieldDiff> {
    let mut diffs = Vec::new();

    push_diff(&mut diffs, "state", old.state.as_ref(), new.state.as_ref());
    push_diff(
        &mut diffs,
        "comment",
        old.comment.as_ref(),
        new.comment.as_ref(),
    );
    push_diff(
        &mut diffs,
        "digest",
        old.digest.as_ref(),
        new.digest.as_ref(),
    );
    push_diff(&mut diffs, "group", old.group.as_ref(), new.group.as_ref());
    push_diff(
        &mut diffs,
        "max_restart",
        old.max_restart.as_ref(),
        new.max_restart.as_ref(),
    );
    push_diff(
        &mut diffs,
        "max_relocate",
        old.max_relocate.as_ref(),
        new.max_relocate.as_ref(),
    );

    diffs
}

/// Records a diff entry when the two values differ.
fn push_diff<T: PartialEq + ToString>(
    diffs: &mut Vec<FieldDiff>,
    field: &'static str,
    old: Option<&T>,
    new: Option<&T>,
) {
    if old != new {
        diffs.push(FieldDiff {
            field,
            old_value: old.map(ToString::to_string),
            new_value: new.map(ToString::to_string),
        });
    }
}

impl std::fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.field,
            self.old_value.as_deref().unwrap_or("(unset)"),
            self.new_value.as_deref().unwrap_or("(unset)")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_payloads_have_no_diffs() {
        let payload = HaPayload {
            state: Some(String::from("started")),
            group: Some(String::from("g1")),
            ..HaPayload::default()
        };
        assert!(field_diffs(&payload, &payload.clone()).is_empty());
    }

    #[test]
    fn test_changed_and_newly_set_fields_are_reported() {
        let old = HaPayload {
            state: Some(String::from("started")),
            ..HaPayload::default()
        };
        let new = HaPayload {
            state: Some(String::from("disabled")),
            max_restart: Some(0),
            ..HaPayload::default()
        };

        let diffs = field_diffs(&old, &new);
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].field, "state");
        assert_eq!(diffs[0].new_value.as_deref(), Some("disabled"));
        assert_eq!(diffs[1].field, "max_restart");
        assert_eq!(diffs[1].old_value, None);
        assert_eq!(diffs[1].new_value.as_deref(), Some("0"));
    }
}
