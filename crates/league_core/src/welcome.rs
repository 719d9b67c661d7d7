#![forbid(unsafe_code)]

use league_contracts::audit::{AuditEventInput, AuditEventType, AuditSeverity};
use league_contracts::lead::{EmailAddress, ReferralCode};
use league_contracts::{CorrelationId, MonotonicTimeNs, ReasonCodeId};
use league_engines::welcome_email::WelcomeEmailEngine;
use league_engines::ProviderCallError;
use league_storage::lead_store::{email_hash_hex, LeadStore, StorageError};

use crate::registration::referral_link;

pub mod reason_codes {
    use league_contracts::ReasonCodeId;

    pub const WELCOME_OK_DISPATCHED: ReasonCodeId = ReasonCodeId(0x5745_0001);
    pub const WELCOME_REFUSE_PAIR_NOT_FOUND: ReasonCodeId = ReasonCodeId(0x5745_00F1);
    pub const WELCOME_WARN_PROVIDER_FAILED: ReasonCodeId = ReasonCodeId(0x5745_00F2);
}

/// Dispatch seam so tests substitute recording fakes for the live engine.
pub trait WelcomeMailer {
    fn send(
        &self,
        email: &EmailAddress,
        referral_code: &ReferralCode,
        referral_link: &str,
    ) -> Result<(), ProviderCallError>;
}

impl WelcomeMailer for WelcomeEmailEngine {
    fn send(
        &self,
        email: &EmailAddress,
        referral_code: &ReferralCode,
        referral_link: &str,
    ) -> Result<(), ProviderCallError> {
        WelcomeEmailEngine::send(self, email, referral_code, referral_link)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WelcomeDispatchOutcome {
    Dispatched { reason_code: ReasonCodeId },
    PairNotFound { reason_code: ReasonCodeId },
    ProviderFailed { reason_code: ReasonCodeId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeNotificationConfig {
    pub site_origin: String,
}

/// Verified welcome-email side channel. The (email, referral_code) pair must
/// exist in the lead store before anything is dispatched, so the endpoint
/// cannot be used to mail arbitrary addresses. Provider failures are logged
/// and never escalate into the registration flow.
#[derive(Debug, Clone)]
pub struct WelcomeNotificationRuntime {
    config: WelcomeNotificationConfig,
}

impl WelcomeNotificationRuntime {
    pub fn new(config: WelcomeNotificationConfig) -> Self {
        Self { config }
    }

    /// Store-side pair check. A mismatch is audited and refused here; a hit
    /// hands back the referral link so the dispatch itself can run without
    /// holding the store.
    pub fn verify_pair(
        &self,
        store: &mut LeadStore,
        email: &EmailAddress,
        referral_code: &ReferralCode,
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
    ) -> Result<Option<String>, StorageError> {
        let pair_exists = store
            .find_by_email(email)
            .map(|lead| &lead.referral_code == referral_code)
            .unwrap_or(false);
        if !pair_exists {
            store.append_audit_row(AuditEventInput::v1(
                AuditEventType::WelcomeEmailRefused,
                AuditSeverity::Warn,
                correlation_id,
                Some(email_hash_hex(email)),
                Some("pair not found".to_string()),
                now,
            )?)?;
            return Ok(None);
        }
        Ok(Some(referral_link(&self.config.site_origin, referral_code)))
    }

    /// Append the dispatch outcome to the audit ledger. Store-only, paired
    /// with `verify_pair` when the provider call ran elsewhere.
    pub fn record_dispatch(
        &self,
        store: &mut LeadStore,
        email: &EmailAddress,
        outcome: &Result<(), ProviderCallError>,
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
    ) -> Result<WelcomeDispatchOutcome, StorageError> {
        match outcome {
            Ok(()) => {
                store.append_audit_row(AuditEventInput::v1(
                    AuditEventType::WelcomeEmailSent,
                    AuditSeverity::Info,
                    correlation_id,
                    Some(email_hash_hex(email)),
                    None,
                    now,
                )?)?;
                Ok(WelcomeDispatchOutcome::Dispatched {
                    reason_code: reason_codes::WELCOME_OK_DISPATCHED,
                })
            }
            Err(err) => {
                store.append_audit_row(AuditEventInput::v1(
                    AuditEventType::WelcomeEmailFailed,
                    AuditSeverity::Warn,
                    correlation_id,
                    Some(email_hash_hex(email)),
                    Some(err.to_string()),
                    now,
                )?)?;
                Ok(WelcomeDispatchOutcome::ProviderFailed {
                    reason_code: reason_codes::WELCOME_WARN_PROVIDER_FAILED,
                })
            }
        }
    }

    pub fn run(
        &self,
        store: &mut LeadStore,
        mailer: &dyn WelcomeMailer,
        email: &EmailAddress,
        referral_code: &ReferralCode,
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
    ) -> Result<WelcomeDispatchOutcome, StorageError> {
        let Some(link) = self.verify_pair(store, email, referral_code, correlation_id, now)?
        else {
            return Ok(WelcomeDispatchOutcome::PairNotFound {
                reason_code: reason_codes::WELCOME_REFUSE_PAIR_NOT_FOUND,
            });
        };
        let outcome = mailer.send(email, referral_code, &link);
        self.record_dispatch(store, email, &outcome, correlation_id, now)
    }
}
