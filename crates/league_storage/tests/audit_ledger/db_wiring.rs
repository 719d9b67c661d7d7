#![forbid(unsafe_code)]

use league_contracts::audit::{AuditEventInput, AuditEventType, AuditSeverity};
use league_contracts::lead::EmailAddress;
use league_contracts::{CorrelationId, MonotonicTimeNs};
use league_storage::lead_store::{email_hash_hex, LeadStore, StorageError};
use league_storage::repo::AuditLedgerRepo;

// Repo-trait dispatch, so the wiring itself is under test.
fn correlated_rows<R: AuditLedgerRepo>(repo: &R, correlation: CorrelationId) -> usize {
    repo.audit_rows_by_correlation(correlation).len()
}

fn input(
    event_type: AuditEventType,
    correlation: u64,
    email_hash: Option<String>,
    at: u64,
) -> AuditEventInput {
    AuditEventInput::v1(
        event_type,
        AuditSeverity::Info,
        CorrelationId(correlation),
        email_hash,
        None,
        MonotonicTimeNs(at),
    )
    .unwrap()
}

#[test]
fn at_audit_db_01_rows_append_with_monotonic_ids() {
    let mut s = LeadStore::new_in_memory();
    let a = s
        .append_audit_row(input(AuditEventType::LeadRegistered, 1, None, 10))
        .unwrap();
    let b = s
        .append_audit_row(input(AuditEventType::ReferralCredited, 1, None, 11))
        .unwrap();

    assert!(b > a);
    assert_eq!(s.audit_rows().len(), 2);
    assert_eq!(s.audit_rows()[0].audit_id, a);
    assert_eq!(s.audit_rows()[1].audit_id, b);
}

#[test]
fn at_audit_db_02_rows_filter_by_correlation() {
    let mut s = LeadStore::new_in_memory();
    s.append_audit_row(input(AuditEventType::LeadRegistered, 7, None, 10))
        .unwrap();
    s.append_audit_row(input(AuditEventType::WebhookFailed, 8, None, 11))
        .unwrap();
    s.append_audit_row(input(AuditEventType::ReferralCredited, 7, None, 12))
        .unwrap();

    let rows = s.audit_rows_by_correlation(CorrelationId(7));
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|row| row.correlation_id == CorrelationId(7)));
    assert_eq!(correlated_rows(&s, CorrelationId(7)), 2);
    assert_eq!(correlated_rows(&s, CorrelationId(9)), 0);
}

#[test]
fn at_audit_db_03_contact_info_is_stored_as_hash_only() {
    let mut s = LeadStore::new_in_memory();
    let email = EmailAddress::new("alice@x.com").unwrap();
    let hash = email_hash_hex(&email);
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    // Same normalized address, same digest.
    assert_eq!(hash, email_hash_hex(&EmailAddress::new("ALICE@X.COM").unwrap()));

    s.append_audit_row(input(
        AuditEventType::LeadRegistered,
        1,
        Some(hash.clone()),
        10,
    ))
    .unwrap();
    assert_eq!(s.audit_rows()[0].email_hash.as_deref(), Some(hash.as_str()));

    // A raw address is not a hex digest and must be refused.
    let raw = AuditEventInput {
        schema_version: league_contracts::audit::AUDIT_CONTRACT_VERSION,
        event_type: AuditEventType::LeadRegistered,
        severity: AuditSeverity::Info,
        correlation_id: CorrelationId(2),
        email_hash: Some("alice@x.com".to_string()),
        detail: None,
        at: MonotonicTimeNs(11),
    };
    let err = s.append_audit_row(raw).unwrap_err();
    assert!(matches!(err, StorageError::ContractViolation(_)));
    assert_eq!(s.audit_rows().len(), 1);
}
