#![forbid(unsafe_code)]

use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const LEAD_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Fixed referral-code shape: 3-char prefix + 6-char random suffix.
pub const REFERRAL_CODE_PREFIX: &str = "REF";
pub const REFERRAL_CODE_SUFFIX_LEN: usize = 6;
pub const REFERRAL_CODE_LEN: usize = 9;

pub const EMAIL_MAX_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeadId(pub u64);

/// Registered email, normalized to lowercase at construction. Lookups are
/// case-insensitive because every `EmailAddress` carries the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(raw: impl Into<String>) -> Result<Self, ContractViolation> {
        let normalized = raw.into().trim().to_ascii_lowercase();
        let v = Self(normalized);
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for EmailAddress {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "email",
                reason: "must not be empty",
            });
        }
        if self.0.len() > EMAIL_MAX_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "email",
                reason: "must be <= 255 chars",
            });
        }
        if !self.0.is_ascii() {
            return Err(ContractViolation::InvalidValue {
                field: "email",
                reason: "must be ASCII",
            });
        }
        if self.0.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(ContractViolation::InvalidValue {
                field: "email",
                reason: "must not contain whitespace",
            });
        }
        let Some((local, domain)) = self.0.split_once('@') else {
            return Err(ContractViolation::InvalidValue {
                field: "email",
                reason: "must contain '@'",
            });
        };
        if local.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "email",
                reason: "local part must not be empty",
            });
        }
        if domain.contains('@') {
            return Err(ContractViolation::InvalidValue {
                field: "email",
                reason: "must contain exactly one '@'",
            });
        }
        // Domain must carry at least one dot-separated segment pair.
        if domain.len() < 3
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
        {
            return Err(ContractViolation::InvalidValue {
                field: "email",
                reason: "domain segment is invalid",
            });
        }
        Ok(())
    }
}

/// Server-assigned referrer token. Immutable once assigned to a lead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferralCode(String);

impl ReferralCode {
    pub fn new(raw: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(raw.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for ReferralCode {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.len() != REFERRAL_CODE_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "referral_code",
                reason: "must be exactly 9 chars",
            });
        }
        if !self.0.starts_with(REFERRAL_CODE_PREFIX) {
            return Err(ContractViolation::InvalidValue {
                field: "referral_code",
                reason: "must start with the REF prefix",
            });
        }
        let suffix = &self.0[REFERRAL_CODE_PREFIX.len()..];
        if !suffix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(ContractViolation::InvalidValue {
                field: "referral_code",
                reason: "suffix must be uppercase alphanumeric",
            });
        }
        Ok(())
    }
}

/// One row per registered participant. `referral_count` is mutated only by
/// the registration procedure crediting this lead as a referrer; every other
/// field is immutable after insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadRecord {
    pub schema_version: SchemaVersion,
    pub lead_id: LeadId,
    pub email: EmailAddress,
    pub referral_code: ReferralCode,
    pub referred_by: Option<ReferralCode>,
    pub referral_count: u64,
    pub created_at: MonotonicTimeNs,
}

impl LeadRecord {
    pub fn v1(
        lead_id: LeadId,
        email: EmailAddress,
        referral_code: ReferralCode,
        referred_by: Option<ReferralCode>,
        created_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: LEAD_CONTRACT_VERSION,
            lead_id,
            email,
            referral_code,
            referred_by,
            referral_count: 0,
            created_at,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for LeadRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.email.validate()?;
        self.referral_code.validate()?;
        if let Some(referred_by) = &self.referred_by {
            referred_by.validate()?;
            if referred_by == &self.referral_code {
                return Err(ContractViolation::InvalidValue {
                    field: "referred_by",
                    reason: "lead must not reference its own code",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalizes_to_lowercase() {
        let e = EmailAddress::new("  Alice@X.Com ").unwrap();
        assert_eq!(e.as_str(), "alice@x.com");
    }

    #[test]
    fn email_rejects_missing_domain_segment() {
        assert!(EmailAddress::new("alice@localhost").is_err());
        assert!(EmailAddress::new("alice@.com").is_err());
        assert!(EmailAddress::new("alice@x.").is_err());
        assert!(EmailAddress::new("@x.com").is_err());
        assert!(EmailAddress::new("a b@x.com").is_err());
        assert!(EmailAddress::new("a@b@x.com").is_err());
    }

    #[test]
    fn email_rejects_overlong_input() {
        let local = "a".repeat(250);
        assert!(EmailAddress::new(format!("{local}@x.com")).is_err());
    }

    #[test]
    fn referral_code_shape_is_enforced() {
        assert!(ReferralCode::new("REFABC123").is_ok());
        assert!(ReferralCode::new("refabc123").is_err());
        assert!(ReferralCode::new("REFABC12").is_err());
        assert!(ReferralCode::new("ABCDEF123").is_err());
        assert!(ReferralCode::new("REFabc123").is_err());
    }

    #[test]
    fn lead_record_rejects_self_reference() {
        let code = ReferralCode::new("REFABC123").unwrap();
        let err = LeadRecord::v1(
            LeadId(1),
            EmailAddress::new("alice@x.com").unwrap(),
            code.clone(),
            Some(code),
            MonotonicTimeNs(1),
        );
        assert!(err.is_err());
    }
}
