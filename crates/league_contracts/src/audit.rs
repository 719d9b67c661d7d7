#![forbid(unsafe_code)]

use crate::{ContractViolation, CorrelationId, MonotonicTimeNs, SchemaVersion, Validate};

pub const AUDIT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuditEventId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuditEventType {
    LeadRegistered,
    ReferralCredited,
    DuplicateEmailReplayed,
    CodeSpaceExhausted,
    WelcomeEmailSent,
    WelcomeEmailRefused,
    WelcomeEmailFailed,
    WebhookDelivered,
    WebhookFailed,
    AdminLeadsRead,
    AdminReadRefused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuditSeverity {
    Info,
    Warn,
    Fatal,
}

/// Caller-supplied audit payload. Contact info arrives pre-hashed; the
/// ledger never stores a raw email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEventInput {
    pub schema_version: SchemaVersion,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub correlation_id: CorrelationId,
    pub email_hash: Option<String>,
    pub detail: Option<String>,
    pub at: MonotonicTimeNs,
}

impl AuditEventInput {
    pub fn v1(
        event_type: AuditEventType,
        severity: AuditSeverity,
        correlation_id: CorrelationId,
        email_hash: Option<String>,
        detail: Option<String>,
        at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: AUDIT_CONTRACT_VERSION,
            event_type,
            severity,
            correlation_id,
            email_hash,
            detail,
            at,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for AuditEventInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let Some(hash) = &self.email_hash {
            if hash.is_empty() || hash.len() > 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ContractViolation::InvalidValue {
                    field: "email_hash",
                    reason: "must be a hex digest of <= 64 chars",
                });
            }
        }
        if let Some(detail) = &self.detail {
            if detail.len() > 512 {
                return Err(ContractViolation::InvalidValue {
                    field: "detail",
                    reason: "must be <= 512 chars",
                });
            }
        }
        Ok(())
    }
}

/// Persisted append-only audit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub audit_id: AuditEventId,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub correlation_id: CorrelationId,
    pub email_hash: Option<String>,
    pub detail: Option<String>,
    pub at: MonotonicTimeNs,
}
