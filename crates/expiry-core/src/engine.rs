//! The expiry engine facade.
//!
//! [`ExpiryEngine`] owns the policy cache, the enable switch and the
//! one-shot skip guard. Hosts feed it mutation notifications through
//! [`ExpiryEngine::process_pending`] (or one at a time via
//! [`ExpiryEngine::handle_event`]) and call the action entry points for
//! explicit user requests.
//!
//! # Feedback loops
//!
//! A write-back touches the record, which queues another notification. That
//! second pass stops on its own: the new expiry differs from the history
//! snapshot, so the decider reports a manual override. Explicit expiry
//! writes instead arm the skip guard and drain the queue right away, so the
//! guard is consumed by the notification their own touch produced.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheStats, PolicyCache};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::decider::{RecalcDecision, decide};
use crate::error::{Error, Result};
use crate::policy::{EXPIRY_SENTINEL, PolicyValue};
use crate::resolver::InheritanceResolver;
use crate::tree::{ContainerId, ExpiryHost, NodeRef, PolicyTree, RecordId, TreeEvent};

/// Why a notification or recalculation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Engine is not subscribed to the document.
    NotSubscribed,
    /// The notification was about a container.
    NotARecord,
    /// The skip guard was armed and is now cleared.
    Guarded,
    /// Engine disabled by configuration.
    Inactive,
    /// Touch without content modification.
    NotModified,
    /// Record not present in the tree.
    UnknownRecord,
    /// Record's expiry-enabled flag is off.
    ExpiryDisabled,
    /// Change detection said no.
    NotRequired(RecalcDecision),
    /// Effective policy is `Off`.
    PolicyNotSpecific,
}

/// Result of one recalculation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecalcOutcome {
    /// New expiry written and the record touched.
    Applied { expiry: DateTime<Utc> },
    /// Target equals the current expiry; nothing written.
    Unchanged,
    Skipped { reason: SkipReason },
}

impl RecalcOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    const fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }
}

/// Result of expiring one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpireOutcome {
    /// Expiry set to the sentinel and the record touched.
    Expired,
    /// Expiry already lies in the past.
    AlreadyExpired,
    /// Record never expires and the caller chose to leave those alone.
    NeverExpires,
    UnknownRecord,
}

/// Policy resolution, caching and expiry write-back for one document.
#[derive(Debug)]
pub struct ExpiryEngine<C: Clock = SystemClock> {
    config: EngineConfig,
    cache: PolicyCache,
    clock: C,
    skip_next: bool,
    subscribed: bool,
}

impl ExpiryEngine<SystemClock> {
    /// Engine on the local wall clock.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ExpiryEngine<C> {
    #[must_use]
    pub fn with_clock(config: EngineConfig, clock: C) -> Self {
        Self {
            config,
            cache: PolicyCache::new(),
            clock,
            skip_next: false,
            subscribed: false,
        }
    }

    // ── Lifecycle and flags ───────────────────────────────────────────

    /// Start handling notifications for an opened document.
    pub fn subscribe(&mut self) {
        self.subscribed = true;
        tracing::debug!("Expiry engine subscribed");
    }

    /// Stop handling notifications; `clear` also drops the cache.
    pub fn unsubscribe(&mut self, clear: bool) {
        self.subscribed = false;
        self.skip_next = false;
        if clear {
            self.cache.clear();
        }
        tracing::debug!(clear, "Expiry engine unsubscribed");
    }

    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.config.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.config.active = active;
    }

    /// Swallow the next record notification.
    pub fn skip_next_recalculation(&mut self) {
        self.skip_next = true;
    }

    #[must_use]
    pub const fn is_skip_pending(&self) -> bool {
        self.skip_next
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// Effective policy of a record, cached.
    pub fn effective_policy<T: PolicyTree + ?Sized>(
        &mut self,
        tree: &T,
        record: RecordId,
        recursive: bool,
    ) -> PolicyValue {
        self.cache.effective_policy(tree, record, recursive)
    }

    /// Policy a record would inherit from its container chain.
    pub fn inherited_policy<T: PolicyTree + ?Sized>(&mut self, tree: &T, record: RecordId) -> PolicyValue {
        self.cache.inherited(tree, record)
    }

    /// Display string for a record's policy column.
    pub fn display_string<T: PolicyTree + ?Sized>(&mut self, tree: &T, record: RecordId) -> String {
        self.cache.display_string(tree, record, &self.config.labels)
    }

    /// A container's policy. Not cached.
    pub fn container_policy<T: PolicyTree + ?Sized>(
        &self,
        tree: &T,
        container: ContainerId,
        recursive: bool,
    ) -> PolicyValue {
        InheritanceResolver::new(tree).resolve(NodeRef::Container(container), recursive)
    }

    /// Expiry date a node's effective policy would assign now; `None` when
    /// the policy is off.
    ///
    /// For a container this is the date a new record created inside it would
    /// receive.
    pub fn suggested_expiry<T: PolicyTree + ?Sized>(
        &mut self,
        tree: &T,
        node: NodeRef,
    ) -> Option<DateTime<Utc>> {
        let policy = match node {
            NodeRef::Record(record) => self.cache.effective_policy(tree, record, true),
            NodeRef::Container(container) => self.container_policy(tree, container, true),
        };
        self.preview_expiry(policy)
    }

    /// Expiry date `policy` would assign now; `None` unless it has a unit.
    #[must_use]
    pub fn preview_expiry(&self, policy: PolicyValue) -> Option<DateTime<Utc>> {
        (policy.is_specific() && !policy.is_command()).then(|| policy.target_date(&self.clock.now()))
    }

    // ── Invalidation hooks ────────────────────────────────────────────

    pub fn invalidate_record(&mut self, record: RecordId) {
        self.cache.invalidate_record(record);
    }

    pub fn invalidate_container<T: PolicyTree + ?Sized>(&mut self, tree: &T, container: ContainerId) {
        self.cache.invalidate_container(tree, container);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // ── Notifications ─────────────────────────────────────────────────

    /// Handle one mutation notification.
    pub fn handle_event<H: ExpiryHost + ?Sized>(&mut self, host: &mut H, event: &TreeEvent) -> RecalcOutcome {
        if !self.subscribed {
            return RecalcOutcome::skipped(SkipReason::NotSubscribed);
        }
        self.cache.on_mutation(&*host, event);

        let NodeRef::Record(record) = event.target else {
            return RecalcOutcome::skipped(SkipReason::NotARecord);
        };
        if self.skip_next {
            self.skip_next = false;
            tracing::debug!(%record, "Skip guard consumed");
            return RecalcOutcome::skipped(SkipReason::Guarded);
        }
        if !self.config.active {
            return RecalcOutcome::skipped(SkipReason::Inactive);
        }
        if !event.modified {
            return RecalcOutcome::skipped(SkipReason::NotModified);
        }
        self.recalculate(host, record, false)
    }

    /// Drain and handle queued notifications until the queue stays empty.
    ///
    /// Fails with [`Error::EventLoopLimit`] when notifications are still
    /// pending after `max_event_rounds` drains.
    pub fn process_pending<H: ExpiryHost + ?Sized>(&mut self, host: &mut H) -> Result<Vec<RecalcOutcome>> {
        let mut outcomes = Vec::new();
        let rounds = self.config.max_event_rounds;
        for _ in 0..rounds {
            let events = host.drain_events();
            if events.is_empty() {
                return Ok(outcomes);
            }
            for event in &events {
                outcomes.push(self.handle_event(host, event));
            }
        }
        if host.has_pending() {
            tracing::warn!(rounds, "Event processing did not settle");
            return Err(Error::EventLoopLimit { rounds });
        }
        Ok(outcomes)
    }

    // ── Actions ───────────────────────────────────────────────────────

    /// Recalculate one record's expiry. `force` bypasses change detection.
    pub fn recalculate<H: ExpiryHost + ?Sized>(
        &mut self,
        host: &mut H,
        record: RecordId,
        force: bool,
    ) -> RecalcOutcome {
        let Some(current) = host.current(record) else {
            return RecalcOutcome::skipped(SkipReason::UnknownRecord);
        };
        if !current.expires {
            return RecalcOutcome::skipped(SkipReason::ExpiryDisabled);
        }
        let current_expiry = current.expiry;
        if !force {
            let decision = decide(current, host.previous(record));
            tracing::debug!(%record, decision = decision.as_str(), "Recalculation decision");
            if !decision.is_required() {
                return RecalcOutcome::skipped(SkipReason::NotRequired(decision));
            }
        }

        let policy = self.cache.effective_policy(&*host, record, true);
        if !policy.is_specific() {
            return RecalcOutcome::skipped(SkipReason::PolicyNotSpecific);
        }
        let target = policy.target_date(&self.clock.now());
        if target == current_expiry {
            return RecalcOutcome::Unchanged;
        }

        host.set_expiry(record, target);
        host.touch(record);
        host.request_refresh();
        tracing::info!(%record, %policy, force, old = %current_expiry, new = %target, "Recalculated expiry");
        RecalcOutcome::Applied { expiry: target }
    }

    /// Force-recalculate every inheriting record below `container`,
    /// descending only into inheriting child containers.
    pub fn recalculate_container<H: ExpiryHost + ?Sized>(
        &mut self,
        host: &mut H,
        container: ContainerId,
    ) -> Vec<(RecordId, RecalcOutcome)> {
        let mut outcomes = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![container];
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            for record in host.child_records(next) {
                if self.cache.effective_policy(&*host, record, false).is_inherit() {
                    outcomes.push((record, self.recalculate(host, record, true)));
                }
            }
            let resolver = InheritanceResolver::new(&*host);
            let children: Vec<ContainerId> = host
                .child_containers(next)
                .into_iter()
                .filter(|child| resolver.own_policy(NodeRef::Container(*child)).is_inherit())
                .collect();
            stack.extend(children.into_iter().rev());
        }
        tracing::debug!(%container, records = outcomes.len(), "Bulk recalculation finished");
        outcomes
    }

    /// Expire one record now.
    ///
    /// Records that never expire are skipped unless `include_never_expiring`
    /// is set. Records already past their expiry are left alone.
    pub fn expire_record<H: ExpiryHost + ?Sized>(
        &mut self,
        host: &mut H,
        record: RecordId,
        include_never_expiring: bool,
    ) -> Result<ExpireOutcome> {
        let Some(current) = host.current(record) else {
            return Ok(ExpireOutcome::UnknownRecord);
        };
        if !current.expires && !include_never_expiring {
            return Ok(ExpireOutcome::NeverExpires);
        }
        if current.expires && current.expiry < self.clock.now().with_timezone(&Utc) {
            return Ok(ExpireOutcome::AlreadyExpired);
        }

        self.process_pending(host)?;
        self.skip_next = true;
        host.create_backup(record);
        host.set_expiry(record, EXPIRY_SENTINEL);
        host.set_expires(record, true);
        host.touch(record);
        self.settle_guarded(host)?;
        tracing::info!(%record, "Expired record");
        Ok(ExpireOutcome::Expired)
    }

    /// Expire every record below `container`, at any depth.
    pub fn expire_container<H: ExpiryHost + ?Sized>(
        &mut self,
        host: &mut H,
        container: ContainerId,
        include_never_expiring: bool,
    ) -> Result<Vec<(RecordId, ExpireOutcome)>> {
        let records = host.descendant_records(container);
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push((record, self.expire_record(host, record, include_never_expiring)?));
        }
        Ok(outcomes)
    }

    /// Touch a record without letting the touch trigger recalculation.
    pub fn touch_guarded<H: ExpiryHost + ?Sized>(&mut self, host: &mut H, record: RecordId) -> Result<()> {
        self.process_pending(host)?;
        self.skip_next = true;
        host.touch(record);
        self.settle_guarded(host)
    }

    /// Store a policy on a node (`Inherit` removes the token) and drop the
    /// cache entries it affects. Commands are not storable and are ignored.
    pub fn set_policy<H: ExpiryHost + ?Sized>(&mut self, host: &mut H, node: NodeRef, policy: PolicyValue) -> bool {
        if policy.is_command() {
            tracing::warn!(%node, %policy, "Refusing to store a command as policy");
            return false;
        }
        let token = (!policy.is_inherit()).then(|| policy.to_token());
        host.set_policy_token(node, token);
        match node {
            NodeRef::Record(record) => {
                self.cache.invalidate_record(record);
            }
            NodeRef::Container(container) => {
                self.cache.invalidate_container(&*host, container);
            }
        }
        tracing::debug!(%node, %policy, "Stored policy");
        true
    }

    /// Drain the notification a guarded write produced. A guard no
    /// notification consumed is cleared so it cannot swallow a later one.
    fn settle_guarded<H: ExpiryHost + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        let settled = self.process_pending(host);
        self.skip_next = false;
        settled.map(|_| ())
    }
}
