#![forbid(unsafe_code)]

use rand::rngs::OsRng;
use rand::RngCore;

use league_contracts::audit::{AuditEventInput, AuditEventType, AuditSeverity};
use league_contracts::lead::{ReferralCode, REFERRAL_CODE_PREFIX, REFERRAL_CODE_SUFFIX_LEN};
use league_contracts::registration::{
    AlreadyRegisteredOk, RegistrationOk, RegistrationRefuse, RegistrationRequest,
    RegistrationResponse,
};
use league_contracts::{ContractViolation, Validate};
use league_storage::lead_store::{email_hash_hex, LeadStore, StorageError};

pub mod reason_codes {
    use league_contracts::ReasonCodeId;

    pub const REG_OK_REGISTERED: ReasonCodeId = ReasonCodeId(0x5247_0001);
    pub const REG_OK_ALREADY_REGISTERED: ReasonCodeId = ReasonCodeId(0x5247_0002);
    pub const REG_REFUSE_INVALID_EMAIL: ReasonCodeId = ReasonCodeId(0x5247_00F1);
    pub const REG_REFUSE_CODE_SPACE_EXHAUSTED: ReasonCodeId = ReasonCodeId(0x5247_00F2);
}

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produces candidate referral codes. Generation is server-side only; a
/// client never proposes its own code.
pub trait ReferralCodeGenerator {
    fn next_code(&mut self) -> Result<ReferralCode, ContractViolation>;
}

/// Production generator: OS-seeded randomness over the uppercase
/// alphanumeric alphabet.
#[derive(Debug, Clone, Default)]
pub struct RandomCodeGenerator;

impl ReferralCodeGenerator for RandomCodeGenerator {
    fn next_code(&mut self) -> Result<ReferralCode, ContractViolation> {
        let mut code = String::with_capacity(REFERRAL_CODE_PREFIX.len() + REFERRAL_CODE_SUFFIX_LEN);
        code.push_str(REFERRAL_CODE_PREFIX);
        for _ in 0..REFERRAL_CODE_SUFFIX_LEN {
            let idx = (OsRng.next_u32() as usize) % CODE_ALPHABET.len();
            code.push(CODE_ALPHABET[idx] as char);
        }
        ReferralCode::new(code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub max_code_attempts: u8,
    pub site_origin: String,
}

impl RegistrationConfig {
    pub fn mvp_v1(site_origin: impl Into<String>) -> Self {
        Self {
            max_code_attempts: 8,
            site_origin: site_origin.into(),
        }
    }
}

/// Shareable link format: `<site-origin>?ref=<referral_code>`.
pub fn referral_link(site_origin: &str, code: &ReferralCode) -> String {
    format!("{site_origin}?ref={}", code.as_str())
}

#[derive(Debug, Clone)]
pub struct RegistrationRuntime {
    config: RegistrationConfig,
}

impl RegistrationRuntime {
    pub fn new(config: RegistrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// The registration procedure. Exactly one lead row per distinct email;
    /// at most one referrer credited per new registration. Unknown referral
    /// codes are dropped silently. A known email replays as the idempotent
    /// "welcome back" path with no store mutation beyond the audit row.
    pub fn run(
        &self,
        store: &mut LeadStore,
        codegen: &mut dyn ReferralCodeGenerator,
        req: &RegistrationRequest,
    ) -> Result<RegistrationResponse, StorageError> {
        // Fail closed on any contract mismatch before touching the store.
        req.validate().map_err(StorageError::ContractViolation)?;

        if let Some(existing) = store.find_by_email(&req.email) {
            let replay = AlreadyRegisteredOk {
                referral_code: existing.referral_code.clone(),
                referral_count: existing.referral_count,
                reason_code: reason_codes::REG_OK_ALREADY_REGISTERED,
            };
            store.append_audit_row(AuditEventInput::v1(
                AuditEventType::DuplicateEmailReplayed,
                AuditSeverity::Info,
                req.correlation_id,
                Some(email_hash_hex(&req.email)),
                None,
                req.now,
            )?)?;
            return Ok(RegistrationResponse::AlreadyRegistered(replay));
        }

        // Resolve the inbound referral code; unknown codes are ignored, not
        // refused. Self-referral cannot resolve here: the registrant's own
        // code does not exist yet, and the store rejects a row whose
        // referred_by equals its own code.
        let referrer_code = req
            .referred_by_code
            .as_ref()
            .filter(|code| store.find_by_code(code).is_some())
            .cloned();

        for _ in 0..self.config.max_code_attempts {
            let code = codegen
                .next_code()
                .map_err(StorageError::ContractViolation)?;
            match store.register_lead_txn(
                req.now,
                req.email.clone(),
                code.clone(),
                referrer_code.clone(),
            ) {
                Ok(lead) => {
                    store.append_audit_row(AuditEventInput::v1(
                        AuditEventType::LeadRegistered,
                        AuditSeverity::Info,
                        req.correlation_id,
                        Some(email_hash_hex(&lead.email)),
                        Some(format!("code:{}", lead.referral_code.as_str())),
                        req.now,
                    )?)?;
                    if let Some(referrer) = &referrer_code {
                        store.append_audit_row(AuditEventInput::v1(
                            AuditEventType::ReferralCredited,
                            AuditSeverity::Info,
                            req.correlation_id,
                            None,
                            Some(format!("referrer_code:{}", referrer.as_str())),
                            req.now,
                        )?)?;
                    }
                    let referral_link = referral_link(&self.config.site_origin, &lead.referral_code);
                    return Ok(RegistrationResponse::Registered(RegistrationOk {
                        lead_id: lead.lead_id,
                        referral_code: lead.referral_code,
                        referral_link,
                        referral_count: lead.referral_count,
                        reason_code: reason_codes::REG_OK_REGISTERED,
                    }));
                }
                // Code collision: regenerate and retry.
                Err(StorageError::DuplicateKey { key, .. }) if key == code.as_str() => continue,
                // Lost a same-email race inside the store: replay welcome-back.
                Err(StorageError::DuplicateKey { key, .. }) if key == req.email.as_str() => {
                    let existing = store.find_by_email(&req.email).ok_or(
                        StorageError::ForeignKeyViolation {
                            table: "leads",
                            key,
                        },
                    )?;
                    return Ok(RegistrationResponse::AlreadyRegistered(AlreadyRegisteredOk {
                        referral_code: existing.referral_code.clone(),
                        referral_count: existing.referral_count,
                        reason_code: reason_codes::REG_OK_ALREADY_REGISTERED,
                    }));
                }
                Err(other) => return Err(other),
            }
        }

        // Alphabet/length too small for the load. Configuration fault, not
        // a user error; logged at Fatal so it pages distinctly.
        store.append_audit_row(AuditEventInput::v1(
            AuditEventType::CodeSpaceExhausted,
            AuditSeverity::Fatal,
            req.correlation_id,
            Some(email_hash_hex(&req.email)),
            Some(format!(
                "no unique code after {} attempts",
                self.config.max_code_attempts
            )),
            req.now,
        )?)?;
        Ok(RegistrationResponse::Refuse(RegistrationRefuse {
            reason_code: reason_codes::REG_REFUSE_CODE_SPACE_EXHAUSTED,
            detail: "referral code space exhausted".to_string(),
        }))
    }
}
