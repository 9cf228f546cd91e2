//! Call outcome recording.
//!
//! Recording a call does three things inside one transaction:
//!   1. stores the call,
//!   2. closes follow-ups it answers (the named parent call, or, for a
//!      connected call without a parent, every open follow-up of that
//!      customer),
//!   3. moves the customer's contact status.
//!
//! A call naming a parent that is missing or deleted is rejected whole.
//!
//! Follow-up actions (`add_follow_up`) are a separate log against an
//! earlier call; a typed action also stores the answering call.
//!
//! Contact status is independent of the engine's lifecycle status; nothing
//! here touches `CustomerTags`.

use crate::{
    clock::Clock,
    customer::ContactStatus,
    error::{CrmError, CrmResult},
    event::{CrmEvent, EventLogEntry},
    store::CrmStore,
    types::{CallRecordId, CustomerId, FollowUpActionId, Username},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const EVENT_SOURCE: &str = "calls";

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallResult {
    Connected,
    NoAnswer,
    Busy,
    WrongNumber,
    CallbackRequested,
}

impl CallResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected         => "connected",
            Self::NoAnswer          => "no_answer",
            Self::Busy              => "busy",
            Self::WrongNumber       => "wrong_number",
            Self::CallbackRequested => "callback_requested",
        }
    }
}

impl FromStr for CallResult {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected"          => Ok(Self::Connected),
            "no_answer"          => Ok(Self::NoAnswer),
            "busy"               => Ok(Self::Busy),
            "wrong_number"       => Ok(Self::WrongNumber),
            "callback_requested" => Ok(Self::CallbackRequested),
            other => Err(CrmError::UnknownVariant { kind: "call_result", value: other.into() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestType {
    Insurance,
    Maintenance,
    Financing,
    Multiple,
    None,
}

impl InterestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insurance   => "insurance",
            Self::Maintenance => "maintenance",
            Self::Financing   => "financing",
            Self::Multiple    => "multiple",
            Self::None        => "none",
        }
    }
}

impl FromStr for InterestType {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insurance"   => Ok(Self::Insurance),
            "maintenance" => Ok(Self::Maintenance),
            "financing"   => Ok(Self::Financing),
            "multiple"    => Ok(Self::Multiple),
            "none"        => Ok(Self::None),
            other => Err(CrmError::UnknownVariant { kind: "interest_type", value: other.into() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerAttitude {
    Positive,
    Neutral,
    Negative,
}

impl CustomerAttitude {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral  => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl FromStr for CustomerAttitude {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "neutral"  => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(CrmError::UnknownVariant { kind: "customer_attitude", value: other.into() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpActionType {
    CallbackScheduled,
    VisitScheduled,
    QuoteSent,
    Converted,
    Closed,
}

impl FollowUpActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallbackScheduled => "callback_scheduled",
            Self::VisitScheduled    => "visit_scheduled",
            Self::QuoteSent         => "quote_sent",
            Self::Converted         => "converted",
            Self::Closed            => "closed",
        }
    }
}

impl FromStr for FollowUpActionType {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "callback_scheduled" => Ok(Self::CallbackScheduled),
            "visit_scheduled"    => Ok(Self::VisitScheduled),
            "quote_sent"         => Ok(Self::QuoteSent),
            "converted"          => Ok(Self::Converted),
            "closed"             => Ok(Self::Closed),
            other => Err(CrmError::UnknownVariant { kind: "follow_up_action", value: other.into() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Agent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin   => "admin",
            Self::Manager => "manager",
            Self::Agent   => "agent",
        }
    }
}

impl FromStr for UserRole {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin"   => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "agent"   => Ok(Self::Agent),
            other => Err(CrmError::UnknownVariant { kind: "user_role", value: other.into() }),
        }
    }
}

/// Whoever is acting on a call record. Identity is established elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: Username,
    pub role:     UserRole,
}

impl Actor {
    pub fn new(username: impl Into<Username>, role: UserRole) -> Self {
        Self { username: username.into(), role }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Manager)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id:                  CallRecordId,
    pub customer_id:         CustomerId,
    pub caller:              Username,
    pub call_date:           NaiveDateTime,
    pub call_result:         CallResult,
    pub interest_type:       Option<InterestType>,
    pub customer_attitude:   Option<CustomerAttitude>,
    pub notes:               String,
    pub follow_up_date:      Option<NaiveDate>,
    pub requires_follow_up:  bool,
    pub follow_up_completed: bool,
    pub follow_up_notes:     String,
    pub parent_call_id:      Option<CallRecordId>,
    pub is_converted:        bool,
    pub is_deleted:          bool,
    pub deleted_at:          Option<NaiveDateTime>,
    pub deleted_by:          Option<Username>,
}

impl CallRecord {
    /// Staff may delete any record; agents only their own.
    pub fn can_delete(&self, actor: &Actor) -> bool {
        actor.is_staff() || self.caller == actor.username
    }
}

/// A call as submitted by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCallRecord {
    pub customer_id:        CustomerId,
    pub call_result:        CallResult,
    pub interest_type:      Option<InterestType>,
    pub customer_attitude:  Option<CustomerAttitude>,
    pub notes:              String,
    pub requires_follow_up: bool,
    pub follow_up_date:     Option<NaiveDate>,
    pub follow_up_notes:    String,
    pub parent_call_id:     Option<CallRecordId>,
    pub is_converted:       bool,
}

impl NewCallRecord {
    pub fn new(customer_id: CustomerId, call_result: CallResult, notes: impl Into<String>) -> Self {
        Self {
            customer_id,
            call_result,
            interest_type:      None,
            customer_attitude:  None,
            notes:              notes.into(),
            requires_follow_up: false,
            follow_up_date:     None,
            follow_up_notes:    String::new(),
            parent_call_id:     None,
            is_converted:       false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub call_id:              CallRecordId,
    pub completed_follow_ups: Vec<CallRecordId>,
    pub contact_status:       ContactStatus,
}

/// A follow-up action as submitted against an earlier call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpAction {
    pub action_type:    Option<FollowUpActionType>,
    pub notes:          String,
    pub scheduled_date: Option<NaiveDate>,
}

impl FollowUpAction {
    pub fn new(action_type: Option<FollowUpActionType>, notes: impl Into<String>) -> Self {
        Self { action_type, notes: notes.into(), scheduled_date: None }
    }
}

/// A logged follow-up action row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFollowUp {
    pub id:             FollowUpActionId,
    pub call_id:        CallRecordId,
    pub created_by:     Username,
    pub created_at:     NaiveDateTime,
    pub action_type:    Option<FollowUpActionType>,
    pub notes:          String,
    pub scheduled_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpActionOutcome {
    pub action_id:        FollowUpActionId,
    /// The connected call stored for a typed action.
    pub child_call_id:    Option<CallRecordId>,
    pub parent_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpIntegrityReport {
    pub fixed:           usize,
    pub total_required:  i64,
    pub completed:       i64,
    pub pending:         i64,
    /// Percent, one decimal. Zero when nothing requires follow-up.
    pub completion_rate: f64,
}

// ── Rules ────────────────────────────────────────────────────────────────────

/// Contact status after a call. No-answer, busy and wrong-number calls leave
/// it unchanged.
pub fn next_contact_status(
    current: ContactStatus,
    result: CallResult,
    interest: Option<InterestType>,
    is_converted: bool,
) -> ContactStatus {
    match result {
        CallResult::Connected if is_converted => ContactStatus::Converted,
        CallResult::Connected => match interest {
            Some(InterestType::None) => ContactStatus::NotInterested,
            Some(_) => ContactStatus::Interested,
            None => ContactStatus::Contacted,
        },
        CallResult::CallbackRequested if current == ContactStatus::Pending => {
            ContactStatus::Contacted
        }
        _ => current,
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

pub fn record_call(
    store: &CrmStore,
    call: &NewCallRecord,
    caller: &Actor,
    clock: &dyn Clock,
) -> CrmResult<CallOutcome> {
    if call.notes.trim().is_empty() {
        return Err(CrmError::InvalidInput("call notes must not be empty".into()));
    }
    let now = clock.now();

    store.within_transaction(false, |store| {
        let customer = store.get_customer(call.customer_id)?;
        // The parent must exist before the child row references it.
        let parent = match call.parent_call_id {
            Some(parent_id) => {
                let parent = store.get_call_record(parent_id)?;
                if parent.is_deleted {
                    return Err(CrmError::CallRecordNotFound { id: parent_id });
                }
                Some(parent)
            }
            None => None,
        };
        let call_id = store.insert_call_record(call, &caller.username, now)?;
        log_event(store, now, &CrmEvent::CallRecorded {
            call_id,
            customer_id: call.customer_id,
            call_result: call.call_result,
        })?;

        let mut completed_follow_ups = Vec::new();
        if let Some(parent) = parent {
            store.mark_follow_up_completed(parent.id)?;
            completed_follow_ups.push(parent.id);
        } else if call.call_result == CallResult::Connected {
            for open_id in store.open_follow_ups(call.customer_id, call_id)? {
                store.mark_follow_up_completed(open_id)?;
                completed_follow_ups.push(open_id);
            }
        }
        for &id in &completed_follow_ups {
            log_event(store, now, &CrmEvent::FollowUpCompleted {
                call_id:     id,
                customer_id: call.customer_id,
            })?;
        }

        let next = next_contact_status(
            customer.contact_status,
            call.call_result,
            call.interest_type,
            call.is_converted,
        );
        if next != customer.contact_status {
            store.update_contact_status(call.customer_id, next, now)?;
            log_event(store, now, &CrmEvent::ContactStatusChanged {
                customer_id: call.customer_id,
                from:        customer.contact_status,
                to:          next,
            })?;
            log::debug!(
                "calls: customer {} {} -> {}",
                call.customer_id,
                customer.contact_status.as_str(),
                next.as_str()
            );
        }

        Ok(CallOutcome { call_id, completed_follow_ups, contact_status: next })
    })
}

/// Log a follow-up action against a live call. A typed action also stores a
/// connected child call and closes the parent's follow-up; an untyped one is
/// only a note. Contact status is left alone.
pub fn add_follow_up(
    store: &CrmStore,
    call_id: CallRecordId,
    action: &FollowUpAction,
    actor: &Actor,
    clock: &dyn Clock,
) -> CrmResult<FollowUpActionOutcome> {
    if action.notes.trim().is_empty() {
        return Err(CrmError::InvalidInput("follow-up notes must not be empty".into()));
    }
    let now = clock.now();

    store.within_transaction(false, |store| {
        let parent = store.get_call_record(call_id)?;
        if parent.is_deleted {
            return Err(CrmError::CallRecordNotFound { id: call_id });
        }
        let action_id = store.insert_follow_up_action(call_id, action, &actor.username, now)?;
        log_event(store, now, &CrmEvent::FollowUpActionLogged {
            action_id,
            call_id,
            action_type: action.action_type,
        })?;

        let Some(action_type) = action.action_type else {
            return Ok(FollowUpActionOutcome { action_id, child_call_id: None, parent_completed: false });
        };

        let child = NewCallRecord {
            parent_call_id: Some(call_id),
            ..NewCallRecord::new(
                parent.customer_id,
                CallResult::Connected,
                format!("[follow-up] {}", action.notes.trim()),
            )
        };
        let child_call_id = store.insert_call_record(&child, &actor.username, now)?;
        log_event(store, now, &CrmEvent::CallRecorded {
            call_id:     child_call_id,
            customer_id: parent.customer_id,
            call_result: CallResult::Connected,
        })?;

        let parent_completed = !parent.follow_up_completed;
        if parent_completed {
            store.mark_follow_up_completed(call_id)?;
            log_event(store, now, &CrmEvent::FollowUpCompleted {
                call_id,
                customer_id: parent.customer_id,
            })?;
        }
        log::debug!("calls: follow-up {} on call {call_id} by {}", action_type.as_str(), actor.username);

        Ok(FollowUpActionOutcome { action_id, child_call_id: Some(child_call_id), parent_completed })
    })
}

/// Soft-delete a call record on behalf of `actor`. A record that is already
/// deleted is treated as missing.
pub fn delete_call(
    store: &CrmStore,
    call_id: CallRecordId,
    actor: &Actor,
    clock: &dyn Clock,
) -> CrmResult<()> {
    let record = store.get_call_record(call_id)?;
    if record.is_deleted {
        return Err(CrmError::CallRecordNotFound { id: call_id });
    }
    if !record.can_delete(actor) {
        return Err(CrmError::InvalidInput(format!(
            "{} may not delete call {call_id}",
            actor.username
        )));
    }
    store.soft_delete_call_record(call_id, &actor.username, clock.now())
}

/// Close parent follow-ups that already have a child call, then report the
/// overall completion rate.
pub fn check_follow_up_integrity(store: &CrmStore) -> CrmResult<FollowUpIntegrityReport> {
    let fixed = store.within_transaction(false, |store| {
        let stale = store.parents_with_open_follow_up_and_child()?;
        for &parent_id in &stale {
            store.mark_follow_up_completed(parent_id)?;
            log::info!("calls: follow-up integrity fixed parent call {parent_id}");
        }
        Ok(stale.len())
    })?;

    let (total_required, completed) = store.follow_up_totals()?;
    let completion_rate = if total_required > 0 {
        (completed as f64 / total_required as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    Ok(FollowUpIntegrityReport {
        fixed,
        total_required,
        completed,
        pending: total_required - completed,
        completion_rate,
    })
}

fn log_event(store: &CrmStore, now: NaiveDateTime, event: &CrmEvent) -> CrmResult<()> {
    store.append_event(&EventLogEntry::new(EVENT_SOURCE, event, now)?)
}
