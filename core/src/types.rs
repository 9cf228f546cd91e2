//! Shared primitive types used across the CRM.

/// Store row id of a customer.
pub type CustomerId = i64;

/// Store row id of a call record.
pub type CallRecordId = i64;

/// Store row id of a call assignment.
pub type CallAssignmentId = i64;

/// Store row id of a logged follow-up action.
pub type FollowUpActionId = i64;

/// Login name of an agent, manager or admin. Authentication lives elsewhere.
pub type Username = String;

/// Number of calendar days between two dates (may be negative).
pub type Days = i64;
