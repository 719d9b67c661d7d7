#![forbid(unsafe_code)]

use league_contracts::tier::{RewardId, TierEvaluation, TierSpec, TierStatus};
use league_contracts::{ContractViolation, Validate};

/// Ordered reward ladder. Pure function of `referral_count`; total over all
/// counts and monotonic: a higher count never locks a tier or lowers a
/// percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPolicy {
    tiers: Vec<TierSpec>,
}

impl TierPolicy {
    pub fn new(tiers: Vec<TierSpec>) -> Result<Self, ContractViolation> {
        if tiers.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "tiers",
                reason: "must configure at least one tier",
            });
        }
        let mut prev = 0u64;
        for spec in &tiers {
            spec.validate()?;
            if spec.threshold <= prev {
                return Err(ContractViolation::InvalidValue {
                    field: "tiers",
                    reason: "thresholds must be strictly ascending",
                });
            }
            prev = spec.threshold;
        }
        Ok(Self { tiers })
    }

    /// Observed product configuration: 5 referrals unlock VIP priority,
    /// 10 unlock the trading eBook.
    pub fn mvp_v1() -> Result<Self, ContractViolation> {
        Self::new(vec![
            TierSpec {
                threshold: 5,
                reward_id: RewardId::new("vip_priority")?,
            },
            TierSpec {
                threshold: 10,
                reward_id: RewardId::new("trading_ebook")?,
            },
        ])
    }

    pub fn tiers(&self) -> &[TierSpec] {
        &self.tiers
    }

    /// Highest unlocked tier, if any. States only ever move up the ladder.
    pub fn highest_unlocked(&self, referral_count: u64) -> Option<&TierSpec> {
        self.tiers
            .iter()
            .rev()
            .find(|spec| referral_count >= spec.threshold)
    }

    pub fn evaluate(&self, referral_count: u64) -> TierEvaluation {
        let mut tiers = Vec::with_capacity(self.tiers.len());
        let mut first_locked_seen = false;
        let mut prev_threshold = 0u64;

        for spec in &self.tiers {
            let unlocked = referral_count >= spec.threshold;
            let progress_pct = if unlocked {
                100
            } else if first_locked_seen {
                // Only the first locked tier shows partial progress.
                0
            } else {
                first_locked_seen = true;
                let span = spec.threshold - prev_threshold;
                let gained = referral_count.saturating_sub(prev_threshold);
                (gained.saturating_mul(100) / span).min(100) as u8
            };
            tiers.push(TierStatus {
                reward_id: spec.reward_id.clone(),
                threshold: spec.threshold,
                unlocked,
                progress_pct,
            });
            prev_threshold = spec.threshold;
        }

        // `new` guarantees at least one tier.
        let highest = prev_threshold;
        let overall_progress_pct =
            (referral_count.saturating_mul(100) / highest).min(100) as u8;

        TierEvaluation {
            referral_count,
            tiers,
            overall_progress_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TierPolicy {
        TierPolicy::mvp_v1().unwrap()
    }

    #[test]
    fn at_tier_01_count_five_unlocks_tier_one_only() {
        let eval = policy().evaluate(5);
        assert!(eval.tiers[0].unlocked);
        assert_eq!(eval.tiers[0].progress_pct, 100);
        assert!(!eval.tiers[1].unlocked);
        assert_eq!(eval.tiers[1].progress_pct, 0);
        assert_eq!(eval.overall_progress_pct, 50);
    }

    #[test]
    fn at_tier_02_count_ten_unlocks_both_tiers() {
        let eval = policy().evaluate(10);
        assert!(eval.tiers[0].unlocked);
        assert!(eval.tiers[1].unlocked);
        assert_eq!(eval.tiers[1].progress_pct, 100);
        assert_eq!(eval.overall_progress_pct, 100);
    }

    #[test]
    fn at_tier_03_partial_progress_interpolates_between_thresholds() {
        let eval = policy().evaluate(7);
        assert!(eval.tiers[0].unlocked);
        assert!(!eval.tiers[1].unlocked);
        assert_eq!(eval.tiers[1].progress_pct, 40);
        assert_eq!(eval.overall_progress_pct, 70);
    }

    #[test]
    fn at_tier_04_zero_count_locks_everything() {
        let eval = policy().evaluate(0);
        assert!(eval.tiers.iter().all(|t| !t.unlocked));
        assert_eq!(eval.tiers[0].progress_pct, 0);
        assert_eq!(eval.tiers[1].progress_pct, 0);
        assert_eq!(eval.overall_progress_pct, 0);
    }

    #[test]
    fn at_tier_05_counts_beyond_highest_threshold_clamp_to_100() {
        let eval = policy().evaluate(1_000);
        assert!(eval.tiers.iter().all(|t| t.unlocked));
        assert_eq!(eval.overall_progress_pct, 100);
    }

    #[test]
    fn at_tier_06_evaluation_is_monotonic_and_bounded() {
        let p = policy();
        let mut prev = p.evaluate(0);
        for count in 1..=25u64 {
            let next = p.evaluate(count);
            for (a, b) in prev.tiers.iter().zip(next.tiers.iter()) {
                // Unlocked never regresses.
                assert!(!a.unlocked || b.unlocked);
                assert!(b.progress_pct >= a.progress_pct || !a.unlocked && b.unlocked);
                assert!(b.progress_pct <= 100);
            }
            assert!(next.overall_progress_pct >= prev.overall_progress_pct);
            assert!(next.overall_progress_pct <= 100);
            prev = next;
        }
    }

    #[test]
    fn at_tier_07_highest_unlocked_walks_the_ladder_upward() {
        let p = policy();
        assert!(p.highest_unlocked(0).is_none());
        assert!(p.highest_unlocked(4).is_none());
        assert_eq!(p.highest_unlocked(5).unwrap().threshold, 5);
        assert_eq!(p.highest_unlocked(9).unwrap().threshold, 5);
        assert_eq!(p.highest_unlocked(10).unwrap().threshold, 10);
        assert_eq!(p.highest_unlocked(11).unwrap().threshold, 10);
    }

    #[test]
    fn at_tier_08_config_rejects_non_ascending_thresholds() {
        let bad = TierPolicy::new(vec![
            TierSpec {
                threshold: 10,
                reward_id: RewardId::new("a_reward").unwrap(),
            },
            TierSpec {
                threshold: 5,
                reward_id: RewardId::new("b_reward").unwrap(),
            },
        ]);
        assert!(bad.is_err());
        assert!(TierPolicy::new(vec![]).is_err());
    }
}
