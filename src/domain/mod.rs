//! Domain layer for the testshift migration engine
//!
//! This module contains the workflow state model, error taxonomy and the
//! port traits adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, Gate, MigrationError, Stage};
