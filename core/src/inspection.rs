//! Inspection-date derivation.
//!
//! Source documents only carry the inspection *expiry* date. The last
//! completed inspection is estimated as one statutory interval before it,
//! whether the expiry lies in the past or the future.

use crate::{
    customer::{Customer, InspectionStatus},
    types::Days,
};
use chrono::{Duration, NaiveDate};

/// `expiry − interval_days` in plain calendar days. `None` in, `None` out.
pub fn derive_actual_inspection_date(
    inspection_expiry_date: Option<NaiveDate>,
    interval_days: Days,
) -> Option<NaiveDate> {
    inspection_expiry_date?.checked_sub_signed(Duration::days(interval_days))
}

/// Writes the derived date and the extraction date onto the customer.
/// A customer without an expiry date is left untouched.
pub fn apply_inspection_date(
    customer: &mut Customer,
    extract_date: NaiveDate,
    interval_days: Days,
) -> Option<NaiveDate> {
    let derived = derive_actual_inspection_date(customer.inspection_expiry_date, interval_days)?;
    customer.actual_inspection_date = Some(derived);
    customer.data_extracted_date = Some(extract_date);
    Some(derived)
}

/// Signed days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> Days {
    to.signed_duration_since(from).num_days()
}

pub fn inspection_status(
    inspection_expiry_date: Option<NaiveDate>,
    reference: NaiveDate,
    due_soon_days: Days,
) -> InspectionStatus {
    let Some(expiry) = inspection_expiry_date else {
        return InspectionStatus::Unknown;
    };
    let days_left = days_between(reference, expiry);
    if days_left < 0 {
        InspectionStatus::Overdue
    } else if days_left <= due_soon_days {
        InspectionStatus::DueSoon
    } else {
        InspectionStatus::Valid
    }
}
