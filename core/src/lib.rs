//! autocare-core: customer lifecycle engine and CRM store for an auto-care
//! call center.
//!
//! The engine (`inspection`, `classification`, `happy_call`, `engine`) is
//! pure and takes its reference date as a parameter. Everything else is a
//! collaborator that loads customers from the store, calls the engine and
//! saves the result.

pub mod assignment;
pub mod call_outcome;
pub mod classification;
pub mod clock;
pub mod config;
pub mod customer;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod event;
pub mod happy_call;
pub mod import_pipeline;
pub mod inspection;
pub mod name_generator;
pub mod normalize;
pub mod recompute_job;
pub mod rng;
pub mod sample_data;
pub mod store;
pub mod types;
