//! Expiry policy values.
//!
//! A [`PolicyValue`] is a unit plus a magnitude ("30 Days", "3 Months") or one
//! of the two sentinels `Inherit` and `Off`. Values travel as a single text
//! token; parsing is lenient and never fails, so a corrupted or unknown token
//! degrades to `Inherit` instead of blocking resolution.
//!
//! # Target dates
//!
//! Day-based units expire at the last second of day `today + N` in the local
//! zone of "now", which keeps the whole final day inside the validity window.
//! `Hours` adds the hours directly without snapping to a day boundary.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDate, Offset, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Expiry timestamp meaning "no specific date".
pub const EXPIRY_SENTINEL: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Magnitude a value receives when it switches from a sentinel to a unit.
pub const DEFAULT_MAGNITUDE: i32 = 30;

const INHERIT_MAGNITUDE: i32 = -1;
const OFF_MAGNITUDE: i32 = 0;

/// Unit of an expiry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyUnit {
    /// Take the policy of the parent container.
    Inherit,
    /// Never recalculate.
    Off,
    Days,
    Weeks,
    Months,
    Years,
    Hours,
    /// Command: expire now. Never stored.
    SetExpired,
    /// Command: disable expiry. Never stored.
    SetNeverExpires,
}

impl PolicyUnit {
    /// Every unit, in token order.
    pub const ALL: [Self; 9] = [
        Self::Inherit,
        Self::Off,
        Self::Days,
        Self::Weeks,
        Self::Months,
        Self::Years,
        Self::Hours,
        Self::SetExpired,
        Self::SetNeverExpires,
    ];

    /// Name used in tokens.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inherit => "Inherit",
            Self::Off => "Off",
            Self::Days => "Days",
            Self::Weeks => "Weeks",
            Self::Months => "Months",
            Self::Years => "Years",
            Self::Hours => "Hours",
            Self::SetExpired => "SetExpired",
            Self::SetNeverExpires => "SetNeverExpires",
        }
    }

    /// Case-insensitive lookup by token name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.name().eq_ignore_ascii_case(name))
    }

    /// True for the transient user commands.
    #[must_use]
    pub const fn is_command(self) -> bool {
        matches!(self, Self::SetExpired | Self::SetNeverExpires)
    }

    /// True for units that carry a duration.
    #[must_use]
    pub const fn is_duration(self) -> bool {
        matches!(
            self,
            Self::Days | Self::Weeks | Self::Months | Self::Years | Self::Hours
        )
    }

    /// Lookup restricted to names that may appear in a stored token.
    fn from_stored_name(name: &str) -> Option<Self> {
        Self::from_name(name).filter(|unit| !unit.is_command())
    }
}

impl fmt::Display for PolicyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display labels for rendering policies to people.
///
/// Translation lives in the host; the engine only receives the strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitLabels {
    pub days: String,
    pub weeks: String,
    pub months: String,
    pub years: String,
    pub hours: String,
    /// Label for `Off`.
    pub off: String,
    /// Label for `Inherit`.
    pub inherit: String,
    /// Appended to display strings whose value came from an ancestor.
    pub inherit_marker: String,
}

impl Default for UnitLabels {
    fn default() -> Self {
        Self {
            days: "days".to_string(),
            weeks: "weeks".to_string(),
            months: "months".to_string(),
            years: "years".to_string(),
            hours: "hours".to_string(),
            off: "Inactive".to_string(),
            inherit: "inherit".to_string(),
            inherit_marker: "*".to_string(),
        }
    }
}

impl UnitLabels {
    /// Label for a unit; commands fall back to their token name.
    #[must_use]
    pub fn label(&self, unit: PolicyUnit) -> &str {
        match unit {
            PolicyUnit::Inherit => &self.inherit,
            PolicyUnit::Off => &self.off,
            PolicyUnit::Days => &self.days,
            PolicyUnit::Weeks => &self.weeks,
            PolicyUnit::Months => &self.months,
            PolicyUnit::Years => &self.years,
            PolicyUnit::Hours => &self.hours,
            PolicyUnit::SetExpired | PolicyUnit::SetNeverExpires => unit.name(),
        }
    }
}

/// An expiry policy: unit plus magnitude.
///
/// Invariant: `magnitude == -1` exactly when the unit is `Inherit`, and
/// `magnitude == 0` exactly when the unit is `Off`. Every constructor
/// normalizes towards it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct PolicyValue {
    unit: PolicyUnit,
    magnitude: i32,
}

impl PolicyValue {
    /// The `Inherit` sentinel.
    #[must_use]
    pub const fn inherit() -> Self {
        Self {
            unit: PolicyUnit::Inherit,
            magnitude: INHERIT_MAGNITUDE,
        }
    }

    /// The `Off` sentinel.
    #[must_use]
    pub const fn off() -> Self {
        Self {
            unit: PolicyUnit::Off,
            magnitude: OFF_MAGNITUDE,
        }
    }

    /// Build a value, normalizing the magnitude invariant.
    ///
    /// The unit decides first (`Inherit` forces -1, `Off` forces 0), then the
    /// magnitude (-1 forces `Inherit`, 0 forces `Off`).
    #[must_use]
    pub const fn new(unit: PolicyUnit, magnitude: i32) -> Self {
        let magnitude = match unit {
            PolicyUnit::Inherit => INHERIT_MAGNITUDE,
            PolicyUnit::Off => OFF_MAGNITUDE,
            _ => magnitude,
        };
        let unit = match magnitude {
            INHERIT_MAGNITUDE => PolicyUnit::Inherit,
            OFF_MAGNITUDE => PolicyUnit::Off,
            _ => unit,
        };
        Self { unit, magnitude }
    }

    /// A unit with the default magnitude (`Days` becomes "30 Days").
    #[must_use]
    pub const fn from_unit(unit: PolicyUnit) -> Self {
        Self::new(unit, DEFAULT_MAGNITUDE)
    }

    /// Parse an optional raw token; a missing token is `Inherit`.
    #[must_use]
    pub fn from_token(token: Option<&str>) -> Self {
        token.map_or_else(Self::inherit, Self::parse)
    }

    /// Parse a raw token. Never fails.
    ///
    /// `"<magnitude> <Unit>"` takes the magnitude, then the unit when it is a
    /// known storable name (otherwise `Days`). A first word that is not an
    /// integer is tried as a bare unit name. Anything else is `Inherit`.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        if token.is_empty() {
            return Self::inherit();
        }
        let mut words = token.split(' ');
        let first = words.next().unwrap_or_default();
        match first.parse::<i32>() {
            Ok(magnitude) => {
                let unit = words
                    .next()
                    .and_then(PolicyUnit::from_stored_name)
                    .unwrap_or(PolicyUnit::Days);
                Self::new(unit, magnitude)
            }
            Err(_) => match PolicyUnit::from_stored_name(first) {
                Some(PolicyUnit::Inherit) | None => Self::inherit(),
                Some(PolicyUnit::Off) => Self::off(),
                Some(unit) => Self::from_unit(unit),
            },
        }
    }

    #[must_use]
    pub const fn unit(&self) -> PolicyUnit {
        self.unit
    }

    #[must_use]
    pub const fn magnitude(&self) -> i32 {
        self.magnitude
    }

    #[must_use]
    pub const fn is_inherit(&self) -> bool {
        matches!(self.unit, PolicyUnit::Inherit)
    }

    #[must_use]
    pub const fn is_off(&self) -> bool {
        matches!(self.unit, PolicyUnit::Off)
    }

    /// Neither `Inherit` nor `Off`.
    #[must_use]
    pub const fn is_specific(&self) -> bool {
        !self.is_inherit() && !self.is_off()
    }

    #[must_use]
    pub const fn is_command(&self) -> bool {
        self.unit.is_command()
    }

    /// Replace the magnitude.
    ///
    /// 0 and -1 switch to `Off` and `Inherit`; any other magnitude on a
    /// non-specific value switches the unit to `Days`.
    #[must_use]
    pub const fn with_magnitude(self, magnitude: i32) -> Self {
        let unit = if self.is_specific() {
            self.unit
        } else {
            PolicyUnit::Days
        };
        Self::new(unit, magnitude)
    }

    /// Replace the unit, keeping the magnitude when there is one.
    #[must_use]
    pub const fn with_unit(self, unit: PolicyUnit) -> Self {
        let magnitude = if self.is_specific() {
            self.magnitude
        } else {
            DEFAULT_MAGNITUDE
        };
        Self::new(unit, magnitude)
    }

    /// Canonical stored token.
    #[must_use]
    pub fn to_token(&self) -> String {
        self.to_string()
    }

    /// Human-readable rendering; only the unit label changes.
    #[must_use]
    pub fn to_display(&self, labels: &UnitLabels) -> String {
        let label = labels.label(self.unit);
        if self.has_magnitude() {
            format!("{} {}", self.magnitude, label)
        } else {
            label.to_string()
        }
    }

    /// Expiry timestamp this policy yields when applied at `now`.
    ///
    /// Sentinels and commands yield [`EXPIRY_SENTINEL`]. Results that leave
    /// the representable range saturate at the chrono bounds.
    #[must_use]
    pub fn target_date<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Utc> {
        if !self.unit.is_duration() {
            return EXPIRY_SENTINEL;
        }
        let computed = if self.unit == PolicyUnit::Hours {
            TimeDelta::try_hours(i64::from(self.magnitude))
                .and_then(|delta| now.clone().checked_add_signed(delta))
                .map(|dt| dt.with_timezone(&Utc))
        } else {
            self.day_count(now.date_naive())
                .and_then(|days| last_second_of_day(now, days))
        };
        computed.unwrap_or_else(|| {
            tracing::warn!(policy = %self, "Target date out of range; saturating");
            if self.magnitude > 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            }
        })
    }

    /// Whole days the policy spans from `today`.
    fn day_count(&self, today: NaiveDate) -> Option<i64> {
        let magnitude = i64::from(self.magnitude);
        match self.unit {
            PolicyUnit::Days => Some(magnitude),
            PolicyUnit::Weeks => magnitude.checked_mul(7),
            PolicyUnit::Months => calendar_days(today, magnitude),
            PolicyUnit::Years => calendar_days(today, magnitude.checked_mul(12)?),
            _ => Some(0),
        }
    }

    const fn has_magnitude(&self) -> bool {
        self.is_specific() && !self.is_command()
    }

    const fn canonical(&self) -> (PolicyUnit, i32) {
        if self.has_magnitude() {
            (self.unit, self.magnitude)
        } else {
            (self.unit, 0)
        }
    }
}

/// Days between `today` and `today` shifted by `months` calendar months,
/// clamping to the end of shorter months.
fn calendar_days(today: NaiveDate, months: i64) -> Option<i64> {
    let span = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    let shifted = if months >= 0 {
        today.checked_add_months(span)?
    } else {
        today.checked_sub_months(span)?
    };
    Some(shifted.signed_duration_since(today).num_days())
}

/// Last second of local day `now + days`, in UTC.
fn last_second_of_day<Tz: TimeZone>(now: &DateTime<Tz>, days: i64) -> Option<DateTime<Utc>> {
    let next_day = now
        .date_naive()
        .checked_add_signed(TimeDelta::try_days(days.checked_add(1)?)?)?;
    let local = next_day
        .and_hms_opt(0, 0, 0)?
        .checked_sub_signed(TimeDelta::seconds(1))?;
    let tz = now.timezone();
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            // Local time falls into a DST gap; keep the current offset.
            now.offset()
                .fix()
                .from_local_datetime(&local)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

impl Default for PolicyValue {
    fn default() -> Self {
        Self::inherit()
    }
}

impl fmt::Display for PolicyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_magnitude() {
            write!(f, "{} {}", self.magnitude, self.unit)
        } else {
            f.write_str(self.unit.name())
        }
    }
}

impl PartialEq for PolicyValue {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for PolicyValue {}

impl Hash for PolicyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl FromStr for PolicyValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for PolicyValue {
    fn from(token: String) -> Self {
        Self::parse(&token)
    }
}

impl From<PolicyValue> for String {
    fn from(value: PolicyValue) -> Self {
        value.to_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    // ── Parsing ───────────────────────────────────────────────────────

    #[test]
    fn parse_magnitude_and_unit() {
        let v = PolicyValue::parse("30 Days");
        assert_eq!(v.unit(), PolicyUnit::Days);
        assert_eq!(v.magnitude(), 30);

        let v = PolicyValue::parse("3 months");
        assert_eq!(v.unit(), PolicyUnit::Months);
        assert_eq!(v.magnitude(), 3);
    }

    #[test]
    fn parse_degrades_to_inherit() {
        assert_eq!(PolicyValue::parse(""), PolicyValue::inherit());
        assert_eq!(PolicyValue::from_token(None), PolicyValue::inherit());
        assert_eq!(PolicyValue::parse("garbage"), PolicyValue::inherit());
        assert_eq!(PolicyValue::parse(" 30 Days"), PolicyValue::inherit());
    }

    #[test]
    fn parse_bare_unit_names() {
        assert_eq!(PolicyValue::parse("Off"), PolicyValue::off());
        assert_eq!(PolicyValue::parse("inherit"), PolicyValue::inherit());
        assert_eq!(PolicyValue::parse("Weeks").to_token(), "30 Weeks");
    }

    #[test]
    fn parse_magnitude_without_unit_defaults_to_days() {
        assert_eq!(PolicyValue::parse("45").to_token(), "45 Days");
        assert_eq!(PolicyValue::parse("45 Fortnights").to_token(), "45 Days");
        assert_eq!(PolicyValue::parse("45  Weeks").to_token(), "45 Days");
    }

    #[test]
    fn parse_sentinel_magnitudes_override_unit() {
        assert_eq!(PolicyValue::parse("0 Days"), PolicyValue::off());
        assert_eq!(PolicyValue::parse("-1 Years"), PolicyValue::inherit());
        assert_eq!(PolicyValue::parse("5 Off"), PolicyValue::off());
        assert_eq!(PolicyValue::parse("5 Inherit"), PolicyValue::inherit());
    }

    #[test]
    fn parse_rejects_command_tokens() {
        assert_eq!(PolicyValue::parse("SetExpired"), PolicyValue::inherit());
        assert_eq!(
            PolicyValue::parse("7 SetNeverExpires").to_token(),
            "7 Days"
        );
    }

    #[test]
    fn negative_magnitudes_stay_specific() {
        let v = PolicyValue::parse("-5 Days");
        assert!(v.is_specific());
        assert_eq!(v.magnitude(), -5);
    }

    // ── Invariant and setters ─────────────────────────────────────────

    #[test]
    fn new_normalizes_sentinels() {
        assert_eq!(PolicyValue::new(PolicyUnit::Inherit, 12).magnitude(), -1);
        assert_eq!(PolicyValue::new(PolicyUnit::Off, 12).magnitude(), 0);
        assert!(PolicyValue::new(PolicyUnit::Weeks, 0).is_off());
        assert!(PolicyValue::new(PolicyUnit::Weeks, -1).is_inherit());
    }

    #[test]
    fn with_magnitude_forces_days_on_sentinels() {
        let v = PolicyValue::inherit().with_magnitude(10);
        assert_eq!(v.unit(), PolicyUnit::Days);
        let v = PolicyValue::off().with_magnitude(3);
        assert_eq!(v.unit(), PolicyUnit::Days);
        let v = PolicyValue::new(PolicyUnit::Months, 2).with_magnitude(6);
        assert_eq!(v.to_token(), "6 Months");
        assert!(PolicyValue::new(PolicyUnit::Months, 2).with_magnitude(0).is_off());
    }

    #[test]
    fn with_unit_keeps_or_defaults_magnitude() {
        let v = PolicyValue::new(PolicyUnit::Days, 14).with_unit(PolicyUnit::Weeks);
        assert_eq!(v.to_token(), "14 Weeks");
        let v = PolicyValue::inherit().with_unit(PolicyUnit::Years);
        assert_eq!(v.to_token(), "30 Years");
    }

    // ── Rendering and equality ────────────────────────────────────────

    #[test]
    fn tokens_render_canonically() {
        assert_eq!(PolicyValue::inherit().to_token(), "Inherit");
        assert_eq!(PolicyValue::off().to_token(), "Off");
        assert_eq!(PolicyValue::new(PolicyUnit::Hours, 8).to_token(), "8 Hours");
        assert_eq!(PolicyValue::from_unit(PolicyUnit::SetExpired).to_token(), "SetExpired");
    }

    #[test]
    fn display_uses_labels() {
        let labels = UnitLabels::default();
        assert_eq!(
            PolicyValue::new(PolicyUnit::Days, 90).to_display(&labels),
            "90 days"
        );
        assert_eq!(PolicyValue::off().to_display(&labels), "Inactive");
        assert_eq!(PolicyValue::inherit().to_display(&labels), "inherit");

        let german = UnitLabels {
            months: "Monate".to_string(),
            ..UnitLabels::default()
        };
        let v = PolicyValue::new(PolicyUnit::Months, 3);
        assert_eq!(v.to_display(&german), "3 Monate");
        assert_eq!(v.to_token(), "3 Months");
    }

    #[test]
    fn equality_follows_token() {
        assert_eq!(PolicyValue::parse("30 days"), PolicyValue::parse("30 Days"));
        assert_ne!(PolicyValue::parse("30 Days"), PolicyValue::parse("30 Weeks"));
        assert_eq!(
            PolicyValue::new(PolicyUnit::SetExpired, 4),
            PolicyValue::new(PolicyUnit::SetExpired, 9)
        );
    }

    #[test]
    fn serde_uses_token() {
        let v = PolicyValue::new(PolicyUnit::Weeks, 2);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"2 Weeks\"");
        let back: PolicyValue = serde_json::from_str("\"nonsense\"").unwrap();
        assert_eq!(back, PolicyValue::inherit());
    }

    // ── Target dates ──────────────────────────────────────────────────

    #[test]
    fn one_day_ends_at_last_second_of_tomorrow() {
        let now = local(2024, 3, 10, 10, 0);
        let target = PolicyValue::new(PolicyUnit::Days, 1).target_date(&now);
        // 2024-03-11 23:59:59 at +01:00
        assert_eq!(target, utc(2024, 3, 11, 22, 59, 59));
    }

    #[test]
    fn hours_do_not_snap_to_day_end() {
        let now = local(2024, 3, 10, 10, 0);
        let target = PolicyValue::new(PolicyUnit::Hours, 5).target_date(&now);
        assert_eq!(target, utc(2024, 3, 10, 14, 0, 0));
    }

    #[test]
    fn weeks_are_seven_days() {
        let now = local(2024, 3, 10, 10, 0);
        let target = PolicyValue::new(PolicyUnit::Weeks, 2).target_date(&now);
        assert_eq!(target, utc(2024, 3, 24, 22, 59, 59));
    }

    #[test]
    fn months_use_calendar_arithmetic() {
        let now = local(2024, 1, 31, 9, 30);
        let target = PolicyValue::new(PolicyUnit::Months, 1).target_date(&now);
        // Jan 31 + 1 month clamps to Feb 29 in a leap year.
        assert_eq!(target, utc(2024, 2, 29, 22, 59, 59));
    }

    #[test]
    fn years_from_leap_day_clamp() {
        let now = local(2024, 2, 29, 12, 0);
        let target = PolicyValue::new(PolicyUnit::Years, 1).target_date(&now);
        assert_eq!(target, utc(2025, 2, 28, 22, 59, 59));
    }

    #[test]
    fn negative_days_land_in_the_past() {
        let now = local(2024, 3, 10, 10, 0);
        let target = PolicyValue::new(PolicyUnit::Days, -2).target_date(&now);
        assert_eq!(target, utc(2024, 3, 8, 22, 59, 59));
    }

    #[test]
    fn sentinels_and_commands_yield_epoch() {
        let now = local(2024, 3, 10, 10, 0);
        assert_eq!(PolicyValue::inherit().target_date(&now), EXPIRY_SENTINEL);
        assert_eq!(PolicyValue::off().target_date(&now), EXPIRY_SENTINEL);
        assert_eq!(
            PolicyValue::from_unit(PolicyUnit::SetExpired).target_date(&now),
            EXPIRY_SENTINEL
        );
    }

    /// Central European zone for 2026: +02:00 until the switch back to
    /// +01:00 at 2026-10-25 01:00 UTC.
    #[derive(Debug, Clone, Copy)]
    struct Cet2026;

    impl Cet2026 {
        fn switch() -> chrono::NaiveDateTime {
            NaiveDate::from_ymd_opt(2026, 10, 25)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(2 * 3600).unwrap()
        }

        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }
    }

    impl TimeZone for Cet2026 {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            Self
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> chrono::MappedLocalTime<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(12, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(
            &self,
            local: &chrono::NaiveDateTime,
        ) -> chrono::MappedLocalTime<FixedOffset> {
            let fits = |offset: FixedOffset| {
                let utc = *local - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
                self.offset_from_utc_datetime(&utc) == offset
            };
            match (fits(Self::summer()), fits(Self::winter())) {
                (true, true) => chrono::MappedLocalTime::Ambiguous(Self::summer(), Self::winter()),
                (true, false) => chrono::MappedLocalTime::Single(Self::summer()),
                (false, true) => chrono::MappedLocalTime::Single(Self::winter()),
                (false, false) => chrono::MappedLocalTime::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &chrono::NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch() {
                Self::summer()
            } else {
                Self::winter()
            }
        }
    }

    #[test]
    fn day_end_uses_offset_of_target_day() {
        let now = Cet2026.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let target = PolicyValue::new(PolicyUnit::Days, 30).target_date(&now);
        // 2026-11-18 23:59:59 at +01:00, not at the +02:00 in force today.
        assert_eq!(target, utc(2026, 11, 18, 22, 59, 59));

        let fixed = now.fixed_offset();
        assert_eq!(
            PolicyValue::new(PolicyUnit::Days, 30).target_date(&fixed),
            utc(2026, 11, 18, 21, 59, 59)
        );
    }

    #[test]
    fn huge_magnitudes_saturate() {
        let now = local(2024, 3, 10, 10, 0);
        let target = PolicyValue::new(PolicyUnit::Years, i32::MAX).target_date(&now);
        assert_eq!(target, DateTime::<Utc>::MAX_UTC);
    }
}
