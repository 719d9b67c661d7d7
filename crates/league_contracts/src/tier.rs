#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, SchemaVersion, Validate};

pub const TIER_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Named reward unlocked at a tier threshold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RewardId(String);

impl RewardId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for RewardId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "reward_id",
                reason: "must not be empty",
            });
        }
        if self.0.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "reward_id",
                reason: "must be <= 32 chars",
            });
        }
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ContractViolation::InvalidValue {
                field: "reward_id",
                reason: "must be lowercase snake_case ASCII",
            });
        }
        Ok(())
    }
}

/// One configured reward tier. Thresholds are referral counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSpec {
    pub threshold: u64,
    pub reward_id: RewardId,
}

impl Validate for TierSpec {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.threshold == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "threshold",
                reason: "must be >= 1",
            });
        }
        self.reward_id.validate()
    }
}

/// Computed unlock state for one tier at a given referral count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStatus {
    pub reward_id: RewardId,
    pub threshold: u64,
    pub unlocked: bool,
    pub progress_pct: u8,
}

/// Full tier evaluation for one lead. Total over all counts; every
/// percentage lies in [0, 100].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierEvaluation {
    pub referral_count: u64,
    pub tiers: Vec<TierStatus>,
    pub overall_progress_pct: u8,
}
