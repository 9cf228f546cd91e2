//! Call assignments and per-agent daily call targets.
//!
//! Managers and admins hand customers to agents; agents work through their
//! queue. Status moves forward only:
//!
//!   pending ──► in_progress ──► completed
//!      │             │
//!      └─────────────┴────────► cancelled

use crate::{
    call_outcome::{Actor, UserRole},
    clock::Clock,
    error::{CrmError, CrmResult},
    event::{CrmEvent, EventLogEntry},
    store::CrmStore,
    types::{CallAssignmentId, CustomerId, Username},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const EVENT_SOURCE: &str = "assignments";

/// Target used for users without a stored profile.
pub const DEFAULT_DAILY_CALL_TARGET: i64 = 100;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPriority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

impl AssignmentPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High   => "high",
            Self::Normal => "normal",
            Self::Low    => "low",
        }
    }
}

impl FromStr for AssignmentPriority {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "urgent" => Ok(Self::Urgent),
            "high"   => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low"    => Ok(Self::Low),
            other => Err(CrmError::UnknownVariant { kind: "assignment_priority", value: other.into() }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending    => "pending",
            Self::InProgress => "in_progress",
            Self::Completed  => "completed",
            Self::Cancelled  => "cancelled",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Whether `self → next` is a legal move.
    pub fn can_move_to(&self, next: AssignmentStatus) -> bool {
        match next {
            Self::InProgress => *self == Self::Pending,
            Self::Completed | Self::Cancelled => self.is_open(),
            Self::Pending => false,
        }
    }
}

impl FromStr for AssignmentStatus {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending"     => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed"   => Ok(Self::Completed),
            "cancelled"   => Ok(Self::Cancelled),
            other => Err(CrmError::UnknownVariant { kind: "assignment_status", value: other.into() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAssignment {
    pub id:           CallAssignmentId,
    pub customer_id:  CustomerId,
    pub assigned_to:  Username,
    pub assigned_by:  Username,
    pub assigned_at:  NaiveDateTime,
    pub priority:     AssignmentPriority,
    pub status:       AssignmentStatus,
    pub due_date:     Option<NaiveDate>,
    pub notes:        String,
    pub completed_at: Option<NaiveDateTime>,
}

impl CallAssignment {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date.is_some_and(|due| due < today)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub customer_id: CustomerId,
    pub assigned_to: Username,
    pub priority:    AssignmentPriority,
    pub due_date:    Option<NaiveDate>,
    pub notes:       String,
}

impl NewAssignment {
    pub fn new(customer_id: CustomerId, assigned_to: impl Into<Username>) -> Self {
        Self {
            customer_id,
            assigned_to: assigned_to.into(),
            priority:    AssignmentPriority::Normal,
            due_date:    None,
            notes:       String::new(),
        }
    }

    pub fn with_priority(mut self, priority: AssignmentPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username:          Username,
    pub role:              UserRole,
    pub daily_call_target: i64,
}

impl UserProfile {
    pub fn new(username: impl Into<Username>, role: UserRole) -> Self {
        Self {
            username: username.into(),
            role,
            daily_call_target: DEFAULT_DAILY_CALL_TARGET,
        }
    }

    pub fn with_daily_call_target(mut self, target: i64) -> Self {
        self.daily_call_target = target;
        self
    }
}

/// One agent's calls today against their target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCallProgress {
    pub username:  Username,
    pub date:      NaiveDate,
    pub target:    i64,
    pub calls:     i64,
    /// Never negative, even past the target.
    pub remaining: i64,
    /// Whole percent; may exceed 100. Zero for a zero target.
    pub rate:      f64,
}

// ── Operations ───────────────────────────────────────────────────────────────

pub fn assign_customer(
    store: &CrmStore,
    assignment: &NewAssignment,
    assigner: &Actor,
    clock: &dyn Clock,
) -> CrmResult<CallAssignmentId> {
    if !assigner.is_staff() {
        return Err(CrmError::InvalidInput(format!(
            "{} may not assign calls",
            assigner.username
        )));
    }
    if assignment.assigned_to.trim().is_empty() {
        return Err(CrmError::InvalidInput("assignee must not be empty".into()));
    }
    let now = clock.now();

    store.within_transaction(false, |store| {
        store.get_customer(assignment.customer_id)?;
        let id = store.insert_call_assignment(assignment, &assigner.username, now)?;
        log_event(store, now, &CrmEvent::AssignmentCreated {
            assignment_id: id,
            customer_id:   assignment.customer_id,
            assigned_to:   assignment.assigned_to.clone(),
            priority:      assignment.priority,
        })?;
        log::info!(
            "assignments: customer {} -> {} ({})",
            assignment.customer_id,
            assignment.assigned_to,
            assignment.priority.as_str()
        );
        Ok(id)
    })
}

pub fn start_assignment(
    store: &CrmStore,
    id: CallAssignmentId,
    actor: &Actor,
    clock: &dyn Clock,
) -> CrmResult<CallAssignment> {
    transition(store, id, AssignmentStatus::InProgress, actor, clock)
}

pub fn complete_assignment(
    store: &CrmStore,
    id: CallAssignmentId,
    actor: &Actor,
    clock: &dyn Clock,
) -> CrmResult<CallAssignment> {
    transition(store, id, AssignmentStatus::Completed, actor, clock)
}

/// Staff only.
pub fn cancel_assignment(
    store: &CrmStore,
    id: CallAssignmentId,
    actor: &Actor,
    clock: &dyn Clock,
) -> CrmResult<CallAssignment> {
    transition(store, id, AssignmentStatus::Cancelled, actor, clock)
}

pub fn daily_call_progress(
    store: &CrmStore,
    username: &str,
    today: NaiveDate,
) -> CrmResult<DailyCallProgress> {
    let target = store
        .get_user_profile(username)?
        .map_or(DEFAULT_DAILY_CALL_TARGET, |p| p.daily_call_target);
    let calls = store.call_count_by_caller_on(username, today)?;
    let rate = if target > 0 {
        (calls as f64 / target as f64 * 100.0).round()
    } else {
        0.0
    };
    Ok(DailyCallProgress {
        username: username.to_string(),
        date: today,
        target,
        calls,
        remaining: (target - calls).max(0),
        rate,
    })
}

fn transition(
    store: &CrmStore,
    id: CallAssignmentId,
    next: AssignmentStatus,
    actor: &Actor,
    clock: &dyn Clock,
) -> CrmResult<CallAssignment> {
    let now = clock.now();
    store.within_transaction(false, |store| {
        let current = store.get_call_assignment(id)?;
        let allowed = match next {
            AssignmentStatus::Cancelled => actor.is_staff(),
            _ => actor.is_staff() || current.assigned_to == actor.username,
        };
        if !allowed {
            return Err(CrmError::InvalidInput(format!(
                "{} may not move assignment {id} to {}",
                actor.username,
                next.as_str()
            )));
        }
        if !current.status.can_move_to(next) {
            return Err(CrmError::InvalidInput(format!(
                "assignment {id} cannot move from {} to {}",
                current.status.as_str(),
                next.as_str()
            )));
        }

        store.set_assignment_status(id, next, now)?;
        log_event(store, now, &CrmEvent::AssignmentStatusChanged {
            assignment_id: id,
            from:          current.status,
            to:            next,
        })?;
        log::debug!("assignments: {id} {} -> {}", current.status.as_str(), next.as_str());
        store.get_call_assignment(id)
    })
}

fn log_event(store: &CrmStore, now: NaiveDateTime, event: &CrmEvent) -> CrmResult<()> {
    store.append_event(&EventLogEntry::new(EVENT_SOURCE, event, now)?)
}
