//! The tag engine: everything the CRM derives from a customer's dates and visits.
//!
//! EXECUTION ORDER of one `update_priority_tags` pass (fixed, never reordered):
//!   1. Overdue tag and initial priority
//!   2. Frequent-visitor tag
//!   3. Premium-vehicle tag
//!   4. Status classification
//!   5. Happy-call windowing (active customers only)
//!   6. Priority finalization
//!
//! RULES:
//!   - The reference date is always passed in. Nothing here reads a clock.
//!   - Every pass builds a fresh `CustomerTags`; the only prior values that
//!     survive are the starting priority and, when the expiry date is
//!     unknown, the previous status group.
//!   - `calculate_inspection_date` is a separate call made by collaborators
//!     before tagging whenever the expiry or extraction date changes.

use crate::{
    classification::{self, Classification, StatusTransition},
    config::LifecycleRules,
    customer::{Customer, CustomerGrade, CustomerTags, Priority},
    happy_call, inspection,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Result of one tagging pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOutcome {
    pub tags:           CustomerTags,
    /// `None` when the expiry date was unknown and the status group was
    /// carried over unchanged.
    pub classification: Option<Classification>,
    pub changes:        TagChanges,
}

/// What differs between the tags before and after a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagChanges {
    pub priority_changed:   bool,
    pub overdue_changed:    bool,
    pub happy_call_changed: bool,
    pub status_transition:  Option<StatusTransition>,
}

impl TagChanges {
    pub fn between(before: &CustomerTags, after: &CustomerTags) -> Self {
        Self {
            priority_changed:   before.priority != after.priority,
            overdue_changed:    before.is_inspection_overdue != after.is_inspection_overdue,
            happy_call_changed: before.happy_call != after.happy_call,
            status_transition:  StatusTransition::between(
                before.customer_status,
                after.customer_status,
            ),
        }
    }

    pub fn any(&self) -> bool {
        self.priority_changed
            || self.overdue_changed
            || self.happy_call_changed
            || self.status_transition.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagEngine {
    rules: LifecycleRules,
}

impl TagEngine {
    pub fn new(rules: LifecycleRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &LifecycleRules {
        &self.rules
    }

    /// Derive `actual_inspection_date` from the expiry date and record the
    /// extraction date. No-op without an expiry date.
    pub fn calculate_inspection_date(
        &self,
        customer: &mut Customer,
        extract_date: NaiveDate,
    ) -> Option<NaiveDate> {
        inspection::apply_inspection_date(customer, extract_date, self.rules.inspection_interval_days)
    }

    /// Compute the tags a customer should carry on `reference` without
    /// touching the customer.
    pub fn derive_tags(&self, customer: &Customer, reference: NaiveDate) -> TagOutcome {
        let rules = &self.rules;
        let prior = &customer.tags;
        let mut tags = CustomerTags::default();

        // 1. Overdue tag and initial priority. Due-soon leaves priority alone.
        tags.is_inspection_overdue = customer
            .inspection_expiry_date
            .is_some_and(|expiry| expiry < reference);
        tags.priority = if tags.is_inspection_overdue {
            Priority::High
        } else {
            prior.priority
        };

        // 2. Frequent visitor
        tags.is_frequent_visitor = customer.visit_count >= rules.frequent_visitor_min_visits;

        // 3. Premium vehicle
        tags.has_premium_vehicle = customer.customer_grade == CustomerGrade::Vip;

        // 4. Classification
        let classification = classification::classify(
            customer.inspection_expiry_date,
            customer.visit_count,
            reference,
            rules,
        );
        let status = classification
            .map(|c| c.status)
            .unwrap_or(prior.customer_status);
        classification::apply_status(&mut tags, status);

        // 5. Happy-call windowing
        tags.happy_call = happy_call::compute_happy_call_need(
            customer.last_inspection_completed,
            tags.is_active_customer,
            reference,
            &rules.happy_call_windows,
        );

        // 6. Priority finalization
        if tags.is_inspection_overdue && tags.is_active_customer {
            tags.priority = Priority::High;
        } else if tags.is_frequent_visitor && tags.priority == Priority::Low {
            tags.priority = Priority::Medium;
        } else if !tags.is_active_customer {
            tags.priority = Priority::Low;
        }

        let changes = TagChanges::between(prior, &tags);
        TagOutcome { tags, classification, changes }
    }

    /// Recompute every derived field of `customer` against `reference`.
    pub fn update_priority_tags(&self, customer: &mut Customer, reference: NaiveDate) -> TagOutcome {
        let outcome = self.derive_tags(customer, reference);
        customer.tags = outcome.tags.clone();
        outcome
    }
}

/// `TagEngine::calculate_inspection_date` with the default rules.
pub fn calculate_inspection_date(customer: &mut Customer, extract_date: NaiveDate) -> Option<NaiveDate> {
    TagEngine::default().calculate_inspection_date(customer, extract_date)
}

/// `TagEngine::update_priority_tags` with the default rules.
pub fn update_priority_tags(customer: &mut Customer, reference: NaiveDate) -> TagOutcome {
    TagEngine::default().update_priority_tags(customer, reference)
}
