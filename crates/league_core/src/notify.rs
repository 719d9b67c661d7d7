#![forbid(unsafe_code)]

use league_contracts::audit::{AuditEventInput, AuditEventType, AuditSeverity};
use league_contracts::lead::LeadRecord;
use league_contracts::{CorrelationId, MonotonicTimeNs};
use league_engines::webhook::{RegistrationNotice, RegistrationWebhookEngine};
use league_engines::ProviderCallError;
use league_storage::lead_store::{LeadStore, StorageError};

/// Dispatch seam for the outbound registration collector.
pub trait RegistrationCollector {
    fn deliver(&self, notice: &RegistrationNotice) -> Result<(), ProviderCallError>;
}

impl RegistrationCollector for RegistrationWebhookEngine {
    fn deliver(&self, notice: &RegistrationNotice) -> Result<(), ProviderCallError> {
        RegistrationWebhookEngine::deliver(self, notice)
    }
}

/// Wire payload for one freshly registered lead.
pub fn registration_notice(
    lead: &LeadRecord,
    referral_link: &str,
    now: MonotonicTimeNs,
) -> RegistrationNotice {
    RegistrationNotice {
        email: lead.email.as_str().to_string(),
        referred_by: lead
            .referred_by
            .as_ref()
            .map(|code| code.as_str().to_string()),
        generated_ref_code: lead.referral_code.as_str().to_string(),
        referral_link: referral_link.to_string(),
        timestamp: now.0,
    }
}

/// Append the delivery outcome to the audit ledger. Store-only, so the
/// caller can run the collector call elsewhere and report back under a
/// short lock.
pub fn record_registration_notice(
    store: &mut LeadStore,
    outcome: &Result<(), ProviderCallError>,
    correlation_id: CorrelationId,
    now: MonotonicTimeNs,
) -> Result<(), StorageError> {
    match outcome {
        Ok(()) => {
            store.append_audit_row(AuditEventInput::v1(
                AuditEventType::WebhookDelivered,
                AuditSeverity::Info,
                correlation_id,
                None,
                None,
                now,
            )?)?;
        }
        Err(err) => {
            store.append_audit_row(AuditEventInput::v1(
                AuditEventType::WebhookFailed,
                AuditSeverity::Warn,
                correlation_id,
                None,
                Some(err.to_string()),
                now,
            )?)?;
        }
    }
    Ok(())
}

/// Fire the best-effort registration webhook inline. The delivery outcome
/// is recorded in the audit ledger and swallowed: a collector failure never
/// reaches the registrant.
pub fn notify_registration(
    store: &mut LeadStore,
    collector: &dyn RegistrationCollector,
    lead: &LeadRecord,
    referral_link: &str,
    correlation_id: CorrelationId,
    now: MonotonicTimeNs,
) -> Result<(), StorageError> {
    let notice = registration_notice(lead, referral_link, now);
    let outcome = collector.deliver(&notice);
    record_registration_notice(store, &outcome, correlation_id, now)
}
