#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use league_contracts::audit::{AuditEvent, AuditEventId, AuditEventInput};
use league_contracts::lead::{EmailAddress, LeadId, LeadRecord, ReferralCode};
use league_contracts::{ContractViolation, MonotonicTimeNs, Validate};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    DuplicateKey { table: &'static str, key: String },
    ForeignKeyViolation { table: &'static str, key: String },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

/// SHA-256 hex digest of a normalized email. The audit ledger stores this
/// instead of the raw address.
pub fn email_hash_hex(email: &EmailAddress) -> String {
    let digest = Sha256::digest(email.as_str().as_bytes());
    format!("{digest:x}")
}

/// Insert input for one lead row. `referral_count` always starts at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadRowInput {
    pub email: EmailAddress,
    pub referral_code: ReferralCode,
    pub referred_by: Option<ReferralCode>,
    pub created_at: MonotonicTimeNs,
}

/// Authoritative lead store. One row per email, one row per referral code;
/// both uniqueness constraints are enforced here, not by callers. The audit
/// ledger is append-only.
#[derive(Debug, Clone, Default)]
pub struct LeadStore {
    leads: BTreeMap<LeadId, LeadRecord>,
    // Unique indexes. Email keys are normalized lowercase strings.
    lead_id_by_email: BTreeMap<String, LeadId>,
    lead_id_by_code: BTreeMap<ReferralCode, LeadId>,
    next_lead_seq: u64,

    audit_ledger: Vec<AuditEvent>,
    next_audit_seq: u64,

    // Capability side table: user ids holding the admin role.
    admin_roles: BTreeSet<String>,
}

impl LeadStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    // ------------------------
    // leads table
    // ------------------------

    /// Insert one lead row without touching any referrer. Validation happens
    /// before any index write, so a rejected insert leaves the store
    /// untouched.
    pub fn insert_lead_row(&mut self, input: LeadRowInput) -> Result<LeadRecord, StorageError> {
        self.check_lead_insert(&input)?;
        Ok(self.apply_lead_insert(input))
    }

    /// The atomic registration transaction: validate the referrer (when
    /// given), insert the new lead, credit the referrer. All checks run
    /// before the first mutation; insert and increment are applied together
    /// or not at all.
    pub fn register_lead_txn(
        &mut self,
        now: MonotonicTimeNs,
        email: EmailAddress,
        referral_code: ReferralCode,
        referred_by: Option<ReferralCode>,
    ) -> Result<LeadRecord, StorageError> {
        let input = LeadRowInput {
            email,
            referral_code,
            referred_by,
            created_at: now,
        };
        self.check_lead_insert(&input)?;
        let referrer_id = match &input.referred_by {
            Some(code) => match self.lead_id_by_code.get(code) {
                Some(id) => Some(*id),
                None => {
                    return Err(StorageError::ForeignKeyViolation {
                        table: "leads",
                        key: code.as_str().to_string(),
                    })
                }
            },
            None => None,
        };

        let record = self.apply_lead_insert(input);
        if let Some(referrer_id) = referrer_id {
            if let Some(referrer) = self.leads.get_mut(&referrer_id) {
                referrer.referral_count = referrer.referral_count.saturating_add(1);
            }
        }
        Ok(record)
    }

    pub fn find_by_email(&self, email: &EmailAddress) -> Option<&LeadRecord> {
        let id = self.lead_id_by_email.get(email.as_str())?;
        self.leads.get(id)
    }

    pub fn find_by_code(&self, code: &ReferralCode) -> Option<&LeadRecord> {
        let id = self.lead_id_by_code.get(code)?;
        self.leads.get(id)
    }

    /// Store-side atomic increment. Callers never read-modify-write the
    /// count. Returns the new count.
    pub fn increment_referral_count(&mut self, code: &ReferralCode) -> Result<u64, StorageError> {
        let id = self
            .lead_id_by_code
            .get(code)
            .copied()
            .ok_or_else(|| StorageError::ForeignKeyViolation {
                table: "leads",
                key: code.as_str().to_string(),
            })?;
        let lead = self
            .leads
            .get_mut(&id)
            .ok_or_else(|| StorageError::ForeignKeyViolation {
                table: "leads",
                key: code.as_str().to_string(),
            })?;
        lead.referral_count = lead.referral_count.saturating_add(1);
        Ok(lead.referral_count)
    }

    pub fn lead_count(&self) -> u64 {
        self.leads.len() as u64
    }

    /// Admin read path: newest first, insertion order breaking ties.
    pub fn leads_ordered_by_created_desc(&self) -> Vec<&LeadRecord> {
        let mut rows: Vec<&LeadRecord> = self.leads.values().collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.lead_id.cmp(&a.lead_id))
        });
        rows
    }

    fn check_lead_insert(&self, input: &LeadRowInput) -> Result<(), StorageError> {
        if self.lead_id_by_email.contains_key(input.email.as_str()) {
            return Err(StorageError::DuplicateKey {
                table: "leads",
                key: input.email.as_str().to_string(),
            });
        }
        if self.lead_id_by_code.contains_key(&input.referral_code) {
            return Err(StorageError::DuplicateKey {
                table: "leads",
                key: input.referral_code.as_str().to_string(),
            });
        }
        if let Some(referred_by) = &input.referred_by {
            if referred_by == &input.referral_code {
                return Err(StorageError::ContractViolation(
                    ContractViolation::InvalidValue {
                        field: "referred_by",
                        reason: "lead must not reference its own code",
                    },
                ));
            }
        }
        Ok(())
    }

    fn apply_lead_insert(&mut self, input: LeadRowInput) -> LeadRecord {
        self.next_lead_seq += 1;
        let lead_id = LeadId(self.next_lead_seq);
        let record = LeadRecord {
            schema_version: league_contracts::lead::LEAD_CONTRACT_VERSION,
            lead_id,
            email: input.email,
            referral_code: input.referral_code,
            referred_by: input.referred_by,
            referral_count: 0,
            created_at: input.created_at,
        };
        self.lead_id_by_email
            .insert(record.email.as_str().to_string(), lead_id);
        self.lead_id_by_code
            .insert(record.referral_code.clone(), lead_id);
        self.leads.insert(lead_id, record.clone());
        record
    }

    // ------------------------
    // audit ledger (append-only)
    // ------------------------

    pub fn append_audit_row(
        &mut self,
        input: AuditEventInput,
    ) -> Result<AuditEventId, StorageError> {
        input.validate().map_err(StorageError::ContractViolation)?;
        self.next_audit_seq += 1;
        let audit_id = AuditEventId(self.next_audit_seq);
        self.audit_ledger.push(AuditEvent {
            audit_id,
            event_type: input.event_type,
            severity: input.severity,
            correlation_id: input.correlation_id,
            email_hash: input.email_hash,
            detail: input.detail,
            at: input.at,
        });
        Ok(audit_id)
    }

    pub fn audit_rows(&self) -> &[AuditEvent] {
        &self.audit_ledger
    }

    pub fn audit_rows_by_correlation(
        &self,
        correlation_id: league_contracts::CorrelationId,
    ) -> Vec<&AuditEvent> {
        self.audit_ledger
            .iter()
            .filter(|row| row.correlation_id == correlation_id)
            .collect()
    }

    // ------------------------
    // admin_roles side table
    // ------------------------

    pub fn admin_role_grant(&mut self, user_id: impl Into<String>) {
        self.admin_roles.insert(user_id.into());
    }

    pub fn admin_role_revoke(&mut self, user_id: &str) {
        self.admin_roles.remove(user_id);
    }

    pub fn has_admin_role(&self, user_id: &str) -> bool {
        self.admin_roles.contains(user_id)
    }
}
