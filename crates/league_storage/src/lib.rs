#![forbid(unsafe_code)]

pub mod lead_store;
pub mod repo;

pub use lead_store::{email_hash_hex, LeadRowInput, LeadStore, StorageError};
