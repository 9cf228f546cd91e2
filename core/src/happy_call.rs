//! Happy-call windowing.
//!
//! Windows are counted from `last_inspection_completed`, not from the derived
//! `actual_inspection_date`. Reporting screens that window around the derived
//! date with a tolerance are a separate query and must not call this.

use crate::{
    config::HappyCallRule,
    customer::HappyCallWindow,
    inspection::days_between,
};
use chrono::NaiveDate;

/// At most one window, and only for active customers with a known last
/// inspection. A future-dated last inspection yields a negative day count
/// and therefore no window.
pub fn compute_happy_call_need(
    last_inspection_completed: Option<NaiveDate>,
    is_active: bool,
    reference: NaiveDate,
    windows: &[HappyCallRule],
) -> Option<HappyCallWindow> {
    if !is_active {
        return None;
    }
    let days_since = days_between(last_inspection_completed?, reference);
    windows
        .iter()
        .find(|rule| rule.contains(days_since))
        .map(|rule| rule.window)
}
