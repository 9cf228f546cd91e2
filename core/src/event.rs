//! The CRM event log.
//!
//! RULE: every collaborator mutation (imports, recompute jobs, call
//! recording, assignments) appends one event per affected row.
//! Variants are added over time, never removed or reordered.

use crate::{
    assignment::{AssignmentPriority, AssignmentStatus},
    call_outcome::{CallResult, FollowUpActionType},
    customer::{ContactStatus, CustomerStatus, HappyCallWindow, Priority},
    types::{CallAssignmentId, CallRecordId, CustomerId, FollowUpActionId, Username},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrmEvent {
    // ── Import events ──────────────────────────────
    CustomerImported {
        customer_id: CustomerId,
        created:     bool,
        status:      CustomerStatus,
        priority:    Priority,
    },
    ImportRowRejected {
        row:    usize,
        reason: String,
    },
    ImportCompleted {
        upload_id:       String,
        new_records:     usize,
        updated_records: usize,
        error_count:     usize,
    },

    // ── Recompute events ───────────────────────────
    TagsRecomputed {
        customer_id: CustomerId,
        priority:    Priority,
        status:      CustomerStatus,
        happy_call:  Option<HappyCallWindow>,
    },
    StatusChanged {
        customer_id: CustomerId,
        from:        CustomerStatus,
        to:          CustomerStatus,
    },
    RecomputeFailed {
        customer_id: CustomerId,
        reason:      String,
    },

    // ── Call events ────────────────────────────────
    CallRecorded {
        call_id:     CallRecordId,
        customer_id: CustomerId,
        call_result: CallResult,
    },
    FollowUpCompleted {
        call_id:     CallRecordId,
        customer_id: CustomerId,
    },
    ContactStatusChanged {
        customer_id: CustomerId,
        from:        ContactStatus,
        to:          ContactStatus,
    },
    FollowUpActionLogged {
        action_id:   FollowUpActionId,
        call_id:     CallRecordId,
        action_type: Option<FollowUpActionType>,
    },

    // ── Assignment events ──────────────────────────
    AssignmentCreated {
        assignment_id: CallAssignmentId,
        customer_id:   CustomerId,
        assigned_to:   Username,
        priority:      AssignmentPriority,
    },
    AssignmentStatusChanged {
        assignment_id: CallAssignmentId,
        from:          AssignmentStatus,
        to:            AssignmentStatus,
    },
}

impl CrmEvent {
    /// Stable name stored in the `event_type` column.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CustomerImported { .. }     => "customer_imported",
            Self::ImportRowRejected { .. }    => "import_row_rejected",
            Self::ImportCompleted { .. }      => "import_completed",
            Self::TagsRecomputed { .. }       => "tags_recomputed",
            Self::StatusChanged { .. }        => "status_changed",
            Self::RecomputeFailed { .. }      => "recompute_failed",
            Self::CallRecorded { .. }         => "call_recorded",
            Self::FollowUpCompleted { .. }    => "follow_up_completed",
            Self::ContactStatusChanged { .. } => "contact_status_changed",
            Self::FollowUpActionLogged { .. } => "follow_up_action_logged",
            Self::AssignmentCreated { .. }    => "assignment_created",
            Self::AssignmentStatusChanged { .. } => "assignment_status_changed",
        }
    }
}

/// A persisted event row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub source:     String, // "import" | "recompute" | "calls" | "assignments"
    pub event_type: String,
    pub payload:    String, // JSON-serialized CrmEvent
    pub created_at: NaiveDateTime,
}

impl EventLogEntry {
    pub fn new(source: &str, event: &CrmEvent, created_at: NaiveDateTime) -> serde_json::Result<Self> {
        Ok(Self {
            id:         None,
            source:     source.to_string(),
            event_type: event.event_type().to_string(),
            payload:    serde_json::to_string(event)?,
            created_at,
        })
    }

    pub fn event(&self) -> serde_json::Result<CrmEvent> {
        serde_json::from_str(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn payload_is_tagged_with_event_type() {
        let event = CrmEvent::StatusChanged {
            customer_id: 7,
            from: CustomerStatus::Active,
            to:   CustomerStatus::LongTermLost,
        };
        let at = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let entry = EventLogEntry::new("recompute", &event, at).unwrap();

        assert_eq!(entry.event_type, "status_changed");
        assert!(entry.payload.contains(r#""type":"status_changed""#));
        assert_eq!(entry.event().unwrap(), event);
    }
}
