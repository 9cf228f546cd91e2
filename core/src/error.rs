use thiserror::Error;

use crate::types::{CallAssignmentId, CallRecordId, CustomerId};

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Customer {id} not found")]
    CustomerNotFound { id: CustomerId },

    #[error("Call record {id} not found")]
    CallRecordNotFound { id: CallRecordId },

    #[error("Call assignment {id} not found")]
    AssignmentNotFound { id: CallAssignmentId },

    #[error("Customer with phone '{phone}' and vehicle '{vehicle_number}' already exists")]
    DuplicateCustomer { phone: String, vehicle_number: String },

    #[error("Row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown {kind} value '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CrmResult<T> = Result<T, CrmError>;
