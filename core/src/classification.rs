//! Customer status classification.
//!
//! Decision order (first match wins, never reordered):
//!   1. more than `scrapped_after_days` past expiry     → possibly_scrapped
//!   2. more than `lost_after_days` past expiry, 1 visit → first_time_lost
//!   3. more than `lost_after_days` past expiry          → long_term_lost
//!   4. otherwise                                        → active
//!
//! Both comparisons are strict: exactly 1460 days past expiry is not yet
//! scrapped.

use crate::{
    config::LifecycleRules,
    customer::{CustomerStatus, CustomerTags},
    inspection::days_between,
    types::Days,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The status group written by one classification pass. Flags not implied
/// by the matched branch are false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub status:                  CustomerStatus,
    pub is_active_customer:      bool,
    pub is_first_time_no_return: bool,
    pub is_long_term_absent:     bool,
    pub days_overdue:            Days,
}

impl Classification {
    fn from_status(status: CustomerStatus, days_overdue: Days) -> Self {
        Self {
            status,
            is_active_customer:      status.is_active(),
            is_first_time_no_return: status == CustomerStatus::FirstTimeLost,
            is_long_term_absent:     matches!(
                status,
                CustomerStatus::LongTermLost | CustomerStatus::PossiblyScrapped
            ),
            days_overdue,
        }
    }
}

/// Classify against `reference`. Returns `None` when the expiry date is
/// unknown; the caller then keeps whatever classification it already had.
pub fn classify(
    inspection_expiry_date: Option<NaiveDate>,
    visit_count: i64,
    reference: NaiveDate,
    rules: &LifecycleRules,
) -> Option<Classification> {
    let expiry = inspection_expiry_date?;
    let days_overdue = days_between(expiry, reference);

    let status = if days_overdue > rules.scrapped_after_days {
        CustomerStatus::PossiblyScrapped
    } else if days_overdue > rules.lost_after_days && visit_count == 1 {
        CustomerStatus::FirstTimeLost
    } else if days_overdue > rules.lost_after_days {
        CustomerStatus::LongTermLost
    } else {
        CustomerStatus::Active
    };

    Some(Classification::from_status(status, days_overdue))
}

/// Write `status` and the flags it implies, clearing the others.
pub fn apply_status(tags: &mut CustomerTags, status: CustomerStatus) {
    let derived = Classification::from_status(status, 0);
    tags.customer_status         = derived.status;
    tags.is_active_customer      = derived.is_active_customer;
    tags.is_first_time_no_return = derived.is_first_time_no_return;
    tags.is_long_term_absent     = derived.is_long_term_absent;
}

/// A status change observed between two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: CustomerStatus,
    pub to:   CustomerStatus,
}

impl StatusTransition {
    pub fn between(from: CustomerStatus, to: CustomerStatus) -> Option<Self> {
        (from != to).then_some(Self { from, to })
    }

    /// True when a lost or scrapped customer came back to active.
    pub fn is_reactivation(&self) -> bool {
        !self.from.is_active() && self.to.is_active()
    }
}
