//! Batch recompute of inspection dates and tags.
//!
//! Each customer is a separate read-modify-write transaction. A customer
//! that fails is logged, counted and skipped; the rest of the run goes on.
//! A dry run does the same work in transactions that are always rolled back.

use crate::{
    clock::Clock,
    config::CrmConfig,
    engine::TagEngine,
    error::CrmResult,
    event::{CrmEvent, EventLogEntry},
    store::CrmStore,
    types::CustomerId,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const EVENT_SOURCE: &str = "recompute";
const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeOptions {
    /// When set, `actual_inspection_date` is re-derived for every customer
    /// with an expiry date.
    pub extract_date:   Option<NaiveDate>,
    pub reference_date: NaiveDate,
    pub dry_run:        bool,
    pub customer_id:    Option<CustomerId>,
    pub limit:          Option<usize>,
}

impl RecomputeOptions {
    pub fn on(reference_date: NaiveDate) -> Self {
        Self {
            extract_date: None,
            reference_date,
            dry_run: false,
            customer_id: None,
            limit: None,
        }
    }
}

/// How many customers saw each kind of change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeChanges {
    pub inspection_dates:   usize,
    pub priorities:         usize,
    pub overdue_tags:       usize,
    pub happy_calls:        usize,
    pub status_transitions: usize,
    pub reactivations:      usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeReport {
    pub total:     usize,
    pub succeeded: usize,
    pub failed:    usize,
    pub changes:   RecomputeChanges,
    pub dry_run:   bool,
}

pub struct RecomputeJob<'a> {
    store:  &'a CrmStore,
    engine: TagEngine,
    clock:  &'a dyn Clock,
}

impl<'a> RecomputeJob<'a> {
    pub fn new(store: &'a CrmStore, config: &CrmConfig, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            engine: TagEngine::new(config.rules.clone()),
            clock,
        }
    }

    pub fn run(&self, options: &RecomputeOptions) -> CrmResult<RecomputeReport> {
        let ids = match options.customer_id {
            Some(id) => {
                self.store.get_customer(id)?;
                vec![id]
            }
            None => self.store.customer_ids(options.limit)?,
        };
        let now = self.clock.now();
        let mut report = RecomputeReport {
            total: ids.len(),
            dry_run: options.dry_run,
            ..RecomputeReport::default()
        };

        log::info!(
            "recompute: {} customers (reference {}, extract {:?}, dry_run={})",
            ids.len(),
            options.reference_date,
            options.extract_date,
            options.dry_run
        );

        for (i, &id) in ids.iter().enumerate() {
            let result = self.store.within_transaction(options.dry_run, |store| {
                self.recompute_one(store, id, options, now)
            });
            match result {
                Ok(changes) => {
                    report.succeeded += 1;
                    report.changes.inspection_dates += changes.inspection_dates;
                    report.changes.priorities += changes.priorities;
                    report.changes.overdue_tags += changes.overdue_tags;
                    report.changes.happy_calls += changes.happy_calls;
                    report.changes.status_transitions += changes.status_transitions;
                    report.changes.reactivations += changes.reactivations;
                }
                Err(e) => {
                    report.failed += 1;
                    log::error!("recompute: customer {id} failed: {e}");
                    if !options.dry_run {
                        let event = CrmEvent::RecomputeFailed {
                            customer_id: id,
                            reason:      e.to_string(),
                        };
                        self.store.within_transaction(false, |store| log_event(store, now, &event))?;
                    }
                }
            }

            let done = i + 1;
            if done % PROGRESS_EVERY == 0 {
                log::info!("recompute: {done}/{} customers", report.total);
            }
        }

        log::info!(
            "recompute: {} ok, {} failed; {} inspection dates, {} priorities, {} overdue tags, \
             {} happy calls, {} status transitions{}",
            report.succeeded,
            report.failed,
            report.changes.inspection_dates,
            report.changes.priorities,
            report.changes.overdue_tags,
            report.changes.happy_calls,
            report.changes.status_transitions,
            if options.dry_run { " (dry run)" } else { "" }
        );
        Ok(report)
    }

    /// Recompute one customer. Returns a 0/1 change vector.
    fn recompute_one(
        &self,
        store: &CrmStore,
        id: CustomerId,
        options: &RecomputeOptions,
        now: NaiveDateTime,
    ) -> CrmResult<RecomputeChanges> {
        let mut customer = store.get_customer(id)?;
        let mut changes = RecomputeChanges::default();

        if let Some(extract_date) = options.extract_date {
            let before = customer.actual_inspection_date;
            if self.engine.calculate_inspection_date(&mut customer, extract_date).is_some()
                && customer.actual_inspection_date != before
            {
                changes.inspection_dates = 1;
            }
        }

        let outcome = self.engine.update_priority_tags(&mut customer, options.reference_date);
        let delta = outcome.changes;
        changes.priorities = delta.priority_changed as usize;
        changes.overdue_tags = delta.overdue_changed as usize;
        changes.happy_calls = delta.happy_call_changed as usize;

        if let Some(transition) = delta.status_transition {
            changes.status_transitions = 1;
            changes.reactivations = transition.is_reactivation() as usize;
            log::debug!("recompute: customer {id} {} -> {}", transition.from, transition.to);
            log_event(store, now, &CrmEvent::StatusChanged {
                customer_id: id,
                from:        transition.from,
                to:          transition.to,
            })?;
        }

        if !options.dry_run {
            store.save_derived_fields(id, &customer, now)?;
        }
        if delta.any() || changes.inspection_dates > 0 {
            log_event(store, now, &CrmEvent::TagsRecomputed {
                customer_id: id,
                priority:    outcome.tags.priority,
                status:      outcome.tags.customer_status,
                happy_call:  outcome.tags.happy_call,
            })?;
        }
        Ok(changes)
    }
}

fn log_event(store: &CrmStore, now: NaiveDateTime, event: &CrmEvent) -> CrmResult<()> {
    store.append_event(&EventLogEntry::new(EVENT_SOURCE, event, now)?)
}
