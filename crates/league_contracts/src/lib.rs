#![forbid(unsafe_code)]

pub mod audit;
pub mod common;
pub mod lead;
pub mod registration;
pub mod tier;

pub use common::{
    ContractViolation, CorrelationId, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate,
};
