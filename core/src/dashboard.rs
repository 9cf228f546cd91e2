//! Read-only dashboard aggregates.
//!
//! Everything here is a count over fields the engine already derived. No
//! classification happens in this module.

use crate::{
    config::LifecycleRules,
    customer::{ContactStatus, CustomerStatus, HappyCallWindow, Priority},
    error::CrmResult,
    store::{CrmStore, CustomerFilter},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Today's progress on one outreach target group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetProgress {
    pub total:     i64,
    /// Not yet called today.
    pub remaining: i64,
    pub completed: i64,
    /// Percent, rounded to a whole number.
    pub progress:  f64,
}

impl TargetProgress {
    pub fn new(total: i64, remaining: i64) -> Self {
        let completed = total - remaining;
        let progress = if total > 0 {
            (completed as f64 / total as f64 * 100.0).round()
        } else {
            0.0
        };
        Self { total, remaining, completed, progress }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub date:            NaiveDate,
    pub total_customers: i64,
    pub by_status:       Vec<(CustomerStatus, i64)>,
    pub by_priority:     Vec<(Priority, i64)>,
    pub by_contact:      Vec<(ContactStatus, i64)>,

    pub vip:                 i64,
    pub due_soon:            i64,
    pub overdue:             i64,
    pub frequent_visitors:   i64,
    pub first_time_lost:     i64,
    pub long_term_absent:    i64,
    pub active:              i64,

    pub happy_calls: Vec<(HappyCallWindow, TargetProgress)>,
    pub overdue_targets:   TargetProgress,
    pub returning_targets: TargetProgress,
    pub vip_targets:       TargetProgress,

    pub calls_today:            i64,
    pub connected_today:        i64,
    pub customers_called_today: i64,
    /// Customers called today over the targets still open, whole percent.
    pub today_target_completion_rate: f64,

    pub open_follow_ups:       i64,
    pub follow_ups_due_today:  i64,
    pub overdue_follow_ups:    i64,
    pub follow_up_calls_today: i64,

    pub open_assignments:    i64,
    pub overdue_assignments: i64,
}

impl DashboardSummary {
    /// `rules` supplies the due-soon window.
    pub fn compute(store: &CrmStore, today: NaiveDate, rules: &LifecycleRules) -> CrmResult<Self> {
        let count = |filter| store.count_customers(filter, today, false);
        let target = |filter| -> CrmResult<TargetProgress> {
            Ok(TargetProgress::new(
                store.count_customers(filter, today, false)?,
                store.count_customers(filter, today, true)?,
            ))
        };

        let by_status = CustomerStatus::ALL
            .into_iter()
            .map(|s| Ok((s, count(CustomerFilter::Status(s))?)))
            .collect::<CrmResult<Vec<_>>>()?;
        let by_priority = Priority::ALL
            .into_iter()
            .map(|p| Ok((p, count(CustomerFilter::Priority(p))?)))
            .collect::<CrmResult<Vec<_>>>()?;
        let by_contact = ContactStatus::ALL
            .into_iter()
            .map(|c| Ok((c, count(CustomerFilter::Contact(c))?)))
            .collect::<CrmResult<Vec<_>>>()?;
        let happy_calls = HappyCallWindow::ALL
            .into_iter()
            .map(|w| Ok((w, target(CustomerFilter::HappyCall(w))?)))
            .collect::<CrmResult<Vec<_>>>()?;

        let mut summary = Self {
            date: today,
            total_customers: count(CustomerFilter::All)?,
            by_status,
            by_priority,
            by_contact,
            vip:               count(CustomerFilter::Vip)?,
            due_soon:          count(CustomerFilter::DueSoon { days: rules.due_soon_days })?,
            overdue:           count(CustomerFilter::InspectionOverdue)?,
            frequent_visitors: count(CustomerFilter::FrequentVisitor)?,
            first_time_lost:   count(CustomerFilter::FirstTimeNoReturn)?,
            long_term_absent:  count(CustomerFilter::LongTermAbsent)?,
            active:            count(CustomerFilter::ActiveCustomer)?,
            happy_calls,
            overdue_targets:   target(CustomerFilter::InspectionOverdue)?,
            returning_targets: target(CustomerFilter::Returning)?,
            vip_targets:       target(CustomerFilter::Vip)?,
            calls_today:            store.call_count_on(today, false)?,
            connected_today:        store.call_count_on(today, true)?,
            customers_called_today: store.customers_called_on(today)?,
            today_target_completion_rate: 0.0,
            open_follow_ups:       store.pending_follow_up_count()?,
            follow_ups_due_today:  store.follow_ups_due_on(today)?,
            overdue_follow_ups:    store.overdue_follow_ups(today)?,
            follow_up_calls_today: store.follow_up_calls_on(today)?,
            open_assignments:    store.open_assignment_count()?,
            overdue_assignments: store.overdue_assignments(today)?.len() as i64,
        };
        let targets = summary.targets_remaining();
        if targets > 0 {
            summary.today_target_completion_rate =
                (summary.customers_called_today as f64 / targets as f64 * 100.0).round();
        }
        Ok(summary)
    }

    /// Customers still to call today across happy-call windows plus the
    /// overdue and returning groups. A customer in two groups counts twice.
    pub fn targets_remaining(&self) -> i64 {
        let happy: i64 = self.happy_calls.iter().map(|(_, t)| t.remaining).sum();
        happy + self.overdue_targets.remaining + self.returning_targets.remaining
    }

    pub fn status_count(&self, status: CustomerStatus) -> i64 {
        lookup(&self.by_status, &status)
    }

    pub fn priority_count(&self, priority: Priority) -> i64 {
        lookup(&self.by_priority, &priority)
    }

    pub fn happy_call(&self, window: HappyCallWindow) -> TargetProgress {
        self.happy_calls
            .iter()
            .find(|(w, _)| *w == window)
            .map(|(_, t)| *t)
            .unwrap_or_default()
    }
}

fn lookup<K: PartialEq>(pairs: &[(K, i64)], key: &K) -> i64 {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, n)| *n)
        .unwrap_or(0)
}
