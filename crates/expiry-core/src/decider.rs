//! Change detection for recalculation.
//!
//! Only a genuine change of the secret or the policy token asks for a new
//! expiry date. A record seen for the first time, or one whose expiry date the
//! user edited by hand, is left alone.

use serde::Serialize;

use crate::tree::RecordVersion;

/// Outcome of comparing a record with its previous version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecalcDecision {
    /// Secret or policy changed; compute a new expiry.
    Required,
    /// No previous version: a new record, not a password change.
    NoHistory,
    /// Expiry date differs from the previous version: a manual edit wins.
    ManualOverride,
    /// Secret and policy token are both unchanged.
    Unchanged,
}

impl RecalcDecision {
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::NoHistory => "no_history",
            Self::ManualOverride => "manual_override",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Compare `current` with the latest history snapshot.
#[must_use]
pub fn decide(current: &RecordVersion, previous: Option<&RecordVersion>) -> RecalcDecision {
    let Some(previous) = previous else {
        return RecalcDecision::NoHistory;
    };
    if current.expiry != previous.expiry {
        return RecalcDecision::ManualOverride;
    }
    let token_changed = current.policy_token.as_deref().unwrap_or_default()
        != previous.policy_token.as_deref().unwrap_or_default();
    if !token_changed && current.secret.ct_eq(&previous.secret) {
        return RecalcDecision::Unchanged;
    }
    RecalcDecision::Required
}

/// Shorthand for `decide(..).is_required()`.
#[must_use]
pub fn is_recalculation_required(current: &RecordVersion, previous: Option<&RecordVersion>) -> bool {
    let decision = decide(current, previous);
    tracing::debug!(decision = decision.as_str(), "Recalculation decision");
    decision.is_required()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn version(secret: &str) -> RecordVersion {
        RecordVersion::new(secret)
            .with_expiry(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn new_record_is_not_a_change() {
        assert_eq!(decide(&version("a"), None), RecalcDecision::NoHistory);
    }

    #[test]
    fn identical_versions_never_require() {
        let current = version("same");
        let previous = version("same");
        for _ in 0..3 {
            assert!(!is_recalculation_required(&current, Some(&previous)));
        }
        assert_eq!(decide(&current, Some(&previous)), RecalcDecision::Unchanged);
    }

    #[test]
    fn manual_expiry_edit_wins() {
        let previous = version("old");
        let mut current = version("new");
        current.expiry = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            decide(&current, Some(&previous)),
            RecalcDecision::ManualOverride
        );
    }

    #[test]
    fn secret_change_requires() {
        let decision = decide(&version("new"), Some(&version("old")));
        assert_eq!(decision, RecalcDecision::Required);
        assert!(decision.is_required());
    }

    #[test]
    fn token_change_requires() {
        let previous = version("pw");
        let current = version("pw").with_policy_token("10 Days");
        assert!(is_recalculation_required(&current, Some(&previous)));
    }

    #[test]
    fn missing_and_empty_tokens_match() {
        let previous = version("pw");
        let current = version("pw").with_policy_token("");
        assert_eq!(decide(&current, Some(&previous)), RecalcDecision::Unchanged);
    }
}
