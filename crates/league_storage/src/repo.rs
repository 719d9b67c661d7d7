#![forbid(unsafe_code)]

use league_contracts::audit::{AuditEvent, AuditEventId, AuditEventInput};
use league_contracts::lead::{EmailAddress, LeadRecord, ReferralCode};
use league_contracts::{CorrelationId, MonotonicTimeNs};

use crate::lead_store::{LeadRowInput, LeadStore, StorageError};

/// Typed repository interface for the `leads` table and its unique indexes.
pub trait LeadTablesRepo {
    fn insert_lead_row(&mut self, input: LeadRowInput) -> Result<LeadRecord, StorageError>;
    fn register_lead_txn(
        &mut self,
        now: MonotonicTimeNs,
        email: EmailAddress,
        referral_code: ReferralCode,
        referred_by: Option<ReferralCode>,
    ) -> Result<LeadRecord, StorageError>;
    fn find_by_email(&self, email: &EmailAddress) -> Option<&LeadRecord>;
    fn find_by_code(&self, code: &ReferralCode) -> Option<&LeadRecord>;
    fn increment_referral_count(&mut self, code: &ReferralCode) -> Result<u64, StorageError>;
    fn leads_ordered_by_created_desc(&self) -> Vec<&LeadRecord>;
}

/// Typed repository interface for the append-only audit ledger.
pub trait AuditLedgerRepo {
    fn append_audit_row(&mut self, input: AuditEventInput) -> Result<AuditEventId, StorageError>;
    fn audit_rows(&self) -> &[AuditEvent];
    fn audit_rows_by_correlation(&self, correlation_id: CorrelationId) -> Vec<&AuditEvent>;
}

/// Typed repository interface for the admin capability side table.
pub trait AdminRolesRepo {
    fn admin_role_grant(&mut self, user_id: String);
    fn admin_role_revoke(&mut self, user_id: &str);
    fn has_admin_role(&self, user_id: &str) -> bool;
}

impl LeadTablesRepo for LeadStore {
    fn insert_lead_row(&mut self, input: LeadRowInput) -> Result<LeadRecord, StorageError> {
        LeadStore::insert_lead_row(self, input)
    }

    fn register_lead_txn(
        &mut self,
        now: MonotonicTimeNs,
        email: EmailAddress,
        referral_code: ReferralCode,
        referred_by: Option<ReferralCode>,
    ) -> Result<LeadRecord, StorageError> {
        LeadStore::register_lead_txn(self, now, email, referral_code, referred_by)
    }

    fn find_by_email(&self, email: &EmailAddress) -> Option<&LeadRecord> {
        LeadStore::find_by_email(self, email)
    }

    fn find_by_code(&self, code: &ReferralCode) -> Option<&LeadRecord> {
        LeadStore::find_by_code(self, code)
    }

    fn increment_referral_count(&mut self, code: &ReferralCode) -> Result<u64, StorageError> {
        LeadStore::increment_referral_count(self, code)
    }

    fn leads_ordered_by_created_desc(&self) -> Vec<&LeadRecord> {
        LeadStore::leads_ordered_by_created_desc(self)
    }
}

impl AuditLedgerRepo for LeadStore {
    fn append_audit_row(&mut self, input: AuditEventInput) -> Result<AuditEventId, StorageError> {
        LeadStore::append_audit_row(self, input)
    }

    fn audit_rows(&self) -> &[AuditEvent] {
        LeadStore::audit_rows(self)
    }

    fn audit_rows_by_correlation(&self, correlation_id: CorrelationId) -> Vec<&AuditEvent> {
        LeadStore::audit_rows_by_correlation(self, correlation_id)
    }
}

impl AdminRolesRepo for LeadStore {
    fn admin_role_grant(&mut self, user_id: String) {
        LeadStore::admin_role_grant(self, user_id)
    }

    fn admin_role_revoke(&mut self, user_id: &str) {
        LeadStore::admin_role_revoke(self, user_id)
    }

    fn has_admin_role(&self, user_id: &str) -> bool {
        LeadStore::has_admin_role(self, user_id)
    }
}
