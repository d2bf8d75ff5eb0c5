//! User actions: applying a chosen policy to a selection.
//!
//! These mirror what a host's quick-action menu offers. A concrete value is
//! stored and optionally recalculated, `SetExpired` expires the selection,
//! and `SetNeverExpires` turns expiry off. Questions for the user go through
//! a [`Prompter`].

use serde::Serialize;

use crate::clock::Clock;
use crate::engine::{ExpireOutcome, ExpiryEngine, RecalcOutcome};
use crate::error::Result;
use crate::policy::{PolicyUnit, PolicyValue};
use crate::tree::{ContainerId, ExpiryHost, RecordId, RecordSource};

/// Yes/no questions an action may need answered.
pub trait Prompter {
    /// Recalculate the expiry of `affected` records now?
    fn confirm_recalculation(&mut self, affected: usize) -> bool;

    /// `never_expiring` of `total` records have expiry disabled. Leave those
    /// alone when expiring the rest?
    fn skip_never_expiring(&mut self, total: usize, never_expiring: usize) -> bool;
}

/// Prompter with canned answers that records how often it was asked.
#[derive(Debug, Clone, Default)]
pub struct FixedAnswers {
    pub recalculate: bool,
    pub skip_never_expiring: bool,
    pub questions_asked: usize,
}

impl FixedAnswers {
    #[must_use]
    pub const fn new(recalculate: bool, skip_never_expiring: bool) -> Self {
        Self {
            recalculate,
            skip_never_expiring,
            questions_asked: 0,
        }
    }
}

impl Prompter for FixedAnswers {
    fn confirm_recalculation(&mut self, _affected: usize) -> bool {
        self.questions_asked += 1;
        self.recalculate
    }

    fn skip_never_expiring(&mut self, _total: usize, _never_expiring: usize) -> bool {
        self.questions_asked += 1;
        self.skip_never_expiring
    }
}

/// What an action did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    /// Policy token written (or removed) on the selection.
    pub stored: bool,
    pub expired: Vec<(RecordId, ExpireOutcome)>,
    pub recalculated: Vec<(RecordId, RecalcOutcome)>,
    /// Records touched behind the skip guard.
    pub touched: usize,
}

/// Whether expiring `records` should include those that never expire.
///
/// A single record, or a selection where every record never expires, is
/// expired without asking. A selection with no never-expiring record has
/// nothing to include. Mixed selections ask the prompter.
pub fn check_expire_all<S, P>(host: &S, prompter: &mut P, records: &[RecordId]) -> bool
where
    S: RecordSource + ?Sized,
    P: Prompter + ?Sized,
{
    if records.len() < 2 {
        return true;
    }
    let never_expiring = records
        .iter()
        .filter(|record| host.current(**record).is_some_and(|v| !v.expires))
        .count();
    if never_expiring == 0 {
        return false;
    }
    if never_expiring == records.len() {
        return true;
    }
    !prompter.skip_never_expiring(records.len(), never_expiring)
}

/// Apply `value` to a container.
pub fn apply_to_container<C, H, P>(
    engine: &mut ExpiryEngine<C>,
    host: &mut H,
    prompter: &mut P,
    container: ContainerId,
    value: PolicyValue,
) -> Result<ActionReport>
where
    C: Clock,
    H: ExpiryHost + ?Sized,
    P: Prompter + ?Sized,
{
    let value = if value.unit() == PolicyUnit::SetNeverExpires {
        PolicyValue::off()
    } else {
        value
    };
    let mut report = ActionReport::default();

    if value.unit() == PolicyUnit::SetExpired {
        let records = host.descendant_records(container);
        let expire_all = check_expire_all(&*host, prompter, &records);
        report.expired = engine.expire_container(host, container, expire_all)?;
    } else {
        report.stored = engine.set_policy(host, container.into(), value);
        if engine.is_active() && !value.is_off() {
            let affected = host.descendant_records(container).len();
            if prompter.confirm_recalculation(affected) {
                report.recalculated = engine.recalculate_container(host, container);
            }
        }
        host.touch_container(container);
    }

    host.request_refresh();
    engine.process_pending(host)?;
    tracing::info!(
        %container,
        policy = %value,
        expired = report.expired.len(),
        recalculated = report.recalculated.len(),
        "Applied policy to container"
    );
    Ok(report)
}

/// Apply `value` to a selection of records.
pub fn apply_to_records<C, H, P>(
    engine: &mut ExpiryEngine<C>,
    host: &mut H,
    prompter: &mut P,
    records: &[RecordId],
    value: PolicyValue,
) -> Result<ActionReport>
where
    C: Clock,
    H: ExpiryHost + ?Sized,
    P: Prompter + ?Sized,
{
    let mut report = ActionReport::default();

    if value.unit() == PolicyUnit::SetExpired {
        let expire_all = check_expire_all(&*host, prompter, records);
        for &record in records {
            let outcome = engine.expire_record(host, record, expire_all)?;
            report.expired.push((record, outcome));
        }
    } else {
        let never_expires = value.unit() == PolicyUnit::SetNeverExpires;
        if !never_expires {
            for &record in records {
                report.stored |= engine.set_policy(host, record.into(), value);
            }
            if engine.is_active() && !value.is_off() && prompter.confirm_recalculation(records.len()) {
                for &record in records {
                    host.set_expires(record, true);
                    let outcome = engine.recalculate(host, record, true);
                    report.recalculated.push((record, outcome));
                }
            }
        }
        for &record in records {
            if never_expires {
                host.set_expires(record, false);
            }
            engine.touch_guarded(host, record)?;
            report.touched += 1;
        }
    }

    host.request_refresh();
    engine.process_pending(host)?;
    tracing::info!(
        records = records.len(),
        policy = %value,
        expired = report.expired.len(),
        recalculated = report.recalculated.len(),
        "Applied policy to records"
    );
    Ok(report)
}
