#![forbid(unsafe_code)]

pub mod admin;
pub mod notify;
pub mod registration;
pub mod tier_policy;
pub mod welcome;
