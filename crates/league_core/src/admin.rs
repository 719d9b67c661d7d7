#![forbid(unsafe_code)]

use league_contracts::audit::{AuditEventInput, AuditEventType, AuditSeverity};
use league_contracts::{CorrelationId, MonotonicTimeNs, ReasonCodeId};
use league_storage::lead_store::{LeadStore, StorageError};

pub mod reason_codes {
    use league_contracts::ReasonCodeId;

    pub const ADMIN_OK_LEADS_READ: ReasonCodeId = ReasonCodeId(0x4144_0001);
    pub const ADMIN_REFUSE_NOT_AUTHORIZED: ReasonCodeId = ReasonCodeId(0x4144_00F1);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminLeadRow {
    pub email: String,
    pub referral_code: String,
    pub referral_count: u64,
    pub referred_by: Option<String>,
    pub created_at: MonotonicTimeNs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminLeadsPage {
    pub total_leads: u64,
    pub total_referrals: u64,
    pub rows: Vec<AdminLeadRow>,
    pub reason_code: ReasonCodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminLeadsAccess {
    Granted(AdminLeadsPage),
    Refused { reason_code: ReasonCodeId },
}

/// Privileged reads over the lead table. The capability check is a role
/// side-table lookup performed here on every call; client-held state never
/// grants access.
#[derive(Debug, Clone, Default)]
pub struct AdminReadRuntime;

impl AdminReadRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn list_leads(
        &self,
        store: &mut LeadStore,
        admin_user_id: &str,
        correlation_id: CorrelationId,
        now: MonotonicTimeNs,
    ) -> Result<AdminLeadsAccess, StorageError> {
        if !store.has_admin_role(admin_user_id) {
            store.append_audit_row(AuditEventInput::v1(
                AuditEventType::AdminReadRefused,
                AuditSeverity::Warn,
                correlation_id,
                None,
                Some(format!("user:{admin_user_id}")),
                now,
            )?)?;
            return Ok(AdminLeadsAccess::Refused {
                reason_code: reason_codes::ADMIN_REFUSE_NOT_AUTHORIZED,
            });
        }

        let mut total_referrals = 0u64;
        let rows: Vec<AdminLeadRow> = store
            .leads_ordered_by_created_desc()
            .into_iter()
            .map(|lead| {
                total_referrals += lead.referral_count;
                AdminLeadRow {
                    email: lead.email.as_str().to_string(),
                    referral_code: lead.referral_code.as_str().to_string(),
                    referral_count: lead.referral_count,
                    referred_by: lead
                        .referred_by
                        .as_ref()
                        .map(|code| code.as_str().to_string()),
                    created_at: lead.created_at,
                }
            })
            .collect();
        let total_leads = store.lead_count();

        store.append_audit_row(AuditEventInput::v1(
            AuditEventType::AdminLeadsRead,
            AuditSeverity::Info,
            correlation_id,
            None,
            Some(format!("user:{admin_user_id} rows:{total_leads}")),
            now,
        )?)?;

        Ok(AdminLeadsAccess::Granted(AdminLeadsPage {
            total_leads,
            total_referrals,
            rows,
            reason_code: reason_codes::ADMIN_OK_LEADS_READ,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_contracts::lead::{EmailAddress, ReferralCode};
    use league_storage::lead_store::LeadRowInput;

    fn seed(store: &mut LeadStore, email: &str, code: &str, count: u64, at: u64) {
        store
            .insert_lead_row(LeadRowInput {
                email: EmailAddress::new(email).unwrap(),
                referral_code: ReferralCode::new(code).unwrap(),
                referred_by: None,
                created_at: MonotonicTimeNs(at),
            })
            .unwrap();
        for _ in 0..count {
            store
                .increment_referral_count(&ReferralCode::new(code).unwrap())
                .unwrap();
        }
    }

    #[test]
    fn at_admin_01_missing_role_is_refused_and_audited() {
        let mut store = LeadStore::new_in_memory();
        seed(&mut store, "alice@x.com", "REFAAA111", 2, 1);

        let out = AdminReadRuntime::new()
            .list_leads(&mut store, "nobody", CorrelationId(1), MonotonicTimeNs(5))
            .unwrap();

        assert!(matches!(
            out,
            AdminLeadsAccess::Refused {
                reason_code: reason_codes::ADMIN_REFUSE_NOT_AUTHORIZED
            }
        ));
        assert!(store
            .audit_rows()
            .iter()
            .any(|row| row.event_type == AuditEventType::AdminReadRefused));
    }

    #[test]
    fn at_admin_02_granted_read_returns_rows_and_totals() {
        let mut store = LeadStore::new_in_memory();
        seed(&mut store, "alice@x.com", "REFAAA111", 5, 10);
        seed(&mut store, "bob@x.com", "REFBBB222", 1, 20);
        store.admin_role_grant("ops_1".to_string());

        let out = AdminReadRuntime::new()
            .list_leads(&mut store, "ops_1", CorrelationId(2), MonotonicTimeNs(30))
            .unwrap();

        match out {
            AdminLeadsAccess::Granted(page) => {
                assert_eq!(page.total_leads, 2);
                assert_eq!(page.total_referrals, 6);
                assert_eq!(page.rows[0].email, "bob@x.com");
                assert_eq!(page.rows[1].email, "alice@x.com");
            }
            other => panic!("expected Granted, got {other:?}"),
        }
    }
}
