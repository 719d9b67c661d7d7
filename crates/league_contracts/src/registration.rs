#![forbid(unsafe_code)]

use crate::lead::{EmailAddress, LeadId, ReferralCode};
use crate::{ContractViolation, CorrelationId, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};

pub const REGISTRATION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// One waitlist registration attempt. The email is already normalized and
/// syntactically valid by construction; an inbound referral code that failed
/// to parse is dropped before this contract is built (unknown codes are the
/// runtime's concern, malformed ones never reach it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub schema_version: SchemaVersion,
    pub correlation_id: CorrelationId,
    pub now: MonotonicTimeNs,
    pub email: EmailAddress,
    pub referred_by_code: Option<ReferralCode>,
}

impl RegistrationRequest {
    pub fn v1(
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
        email: EmailAddress,
        referred_by_code: Option<ReferralCode>,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: REGISTRATION_CONTRACT_VERSION,
            correlation_id,
            now,
            email,
            referred_by_code,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for RegistrationRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.email.validate()?;
        if let Some(code) = &self.referred_by_code {
            code.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOk {
    pub lead_id: LeadId,
    pub referral_code: ReferralCode,
    pub referral_link: String,
    pub referral_count: u64,
    pub reason_code: ReasonCodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyRegisteredOk {
    pub referral_code: ReferralCode,
    pub referral_count: u64,
    pub reason_code: ReasonCodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRefuse {
    pub reason_code: ReasonCodeId,
    pub detail: String,
}

/// Exactly one variant is ever active: a fresh registration, the idempotent
/// "welcome back" replay for a known email, or a refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationResponse {
    Registered(RegistrationOk),
    AlreadyRegistered(AlreadyRegisteredOk),
    Refuse(RegistrationRefuse),
}

impl Validate for RegistrationResponse {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            RegistrationResponse::Registered(ok) => {
                ok.referral_code.validate()?;
                if !ok.referral_link.contains("?ref=") {
                    return Err(ContractViolation::InvalidValue {
                        field: "referral_link",
                        reason: "must carry the ?ref= query parameter",
                    });
                }
                Ok(())
            }
            RegistrationResponse::AlreadyRegistered(ok) => ok.referral_code.validate(),
            RegistrationResponse::Refuse(refuse) => {
                if refuse.detail.is_empty() {
                    return Err(ContractViolation::InvalidValue {
                        field: "detail",
                        reason: "must not be empty",
                    });
                }
                Ok(())
            }
        }
    }
}
