#![forbid(unsafe_code)]

use league_contracts::lead::{EmailAddress, ReferralCode};
use league_contracts::MonotonicTimeNs;
use league_storage::lead_store::{LeadRowInput, LeadStore, StorageError};
use league_storage::repo::LeadTablesRepo;

fn email(raw: &str) -> EmailAddress {
    EmailAddress::new(raw).unwrap()
}

fn code(raw: &str) -> ReferralCode {
    ReferralCode::new(raw).unwrap()
}

// Goes through the repo trait so the tests catch wiring drift, not just
// the inherent methods.
fn ordered_emails<R: LeadTablesRepo>(repo: &R) -> Vec<String> {
    repo.leads_ordered_by_created_desc()
        .into_iter()
        .map(|lead| lead.email.as_str().to_string())
        .collect()
}

fn row(email_raw: &str, code_raw: &str, at: u64) -> LeadRowInput {
    LeadRowInput {
        email: email(email_raw),
        referral_code: code(code_raw),
        referred_by: None,
        created_at: MonotonicTimeNs(at),
    }
}

#[test]
fn at_leads_db_01_email_uniqueness_is_case_insensitive() {
    let mut s = LeadStore::new_in_memory();
    s.insert_lead_row(row("alice@x.com", "REFAAA111", 1)).unwrap();

    let err = s
        .insert_lead_row(LeadRowInput {
            email: email("Alice@X.Com"),
            referral_code: code("REFBBB222"),
            referred_by: None,
            created_at: MonotonicTimeNs(2),
        })
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::DuplicateKey { table: "leads", ref key } if key == "alice@x.com"
    ));
    assert_eq!(s.lead_count(), 1);
}

#[test]
fn at_leads_db_02_referral_code_uniqueness_enforced() {
    let mut s = LeadStore::new_in_memory();
    s.insert_lead_row(row("alice@x.com", "REFAAA111", 1)).unwrap();

    let err = s
        .insert_lead_row(row("bob@x.com", "REFAAA111", 2))
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::DuplicateKey { table: "leads", ref key } if key == "REFAAA111"
    ));
    assert_eq!(s.lead_count(), 1);
    assert!(s.find_by_email(&email("bob@x.com")).is_none());
}

#[test]
fn at_leads_db_03_txn_rejects_unknown_referrer_without_partial_apply() {
    let mut s = LeadStore::new_in_memory();

    let err = s
        .register_lead_txn(
            MonotonicTimeNs(1),
            email("bob@x.com"),
            code("REFBBB222"),
            Some(code("REFZZZ999")),
        )
        .unwrap_err();

    assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
    assert_eq!(s.lead_count(), 0);
    assert!(s.find_by_email(&email("bob@x.com")).is_none());
    assert!(s.find_by_code(&code("REFBBB222")).is_none());
}

#[test]
fn at_leads_db_04_txn_inserts_and_credits_atomically() {
    let mut s = LeadStore::new_in_memory();
    let alice = s
        .register_lead_txn(MonotonicTimeNs(1), email("alice@x.com"), code("REFAAA111"), None)
        .unwrap();
    assert_eq!(alice.referral_count, 0);

    let bob = s
        .register_lead_txn(
            MonotonicTimeNs(2),
            email("bob@x.com"),
            code("REFBBB222"),
            Some(code("REFAAA111")),
        )
        .unwrap();

    assert_eq!(bob.referral_count, 0);
    assert_eq!(bob.referred_by, Some(code("REFAAA111")));
    assert_ne!(bob.referral_code, alice.referral_code);
    assert_eq!(
        s.find_by_email(&email("alice@x.com")).unwrap().referral_count,
        1
    );
}

#[test]
fn at_leads_db_05_increment_is_store_side_and_conserved() {
    let mut s = LeadStore::new_in_memory();
    s.insert_lead_row(row("alice@x.com", "REFAAA111", 1)).unwrap();

    let before = s.find_by_code(&code("REFAAA111")).unwrap().referral_count;
    for i in 0..5u64 {
        let new_count = s.increment_referral_count(&code("REFAAA111")).unwrap();
        assert_eq!(new_count, before + i + 1);
    }
    assert_eq!(
        s.find_by_code(&code("REFAAA111")).unwrap().referral_count,
        before + 5
    );
}

#[test]
fn at_leads_db_06_increment_unknown_code_is_foreign_key_violation() {
    let mut s = LeadStore::new_in_memory();
    let err = s.increment_referral_count(&code("REFZZZ999")).unwrap_err();
    assert!(matches!(
        err,
        StorageError::ForeignKeyViolation { table: "leads", .. }
    ));
}

#[test]
fn at_leads_db_07_self_reference_rejected_at_insert() {
    let mut s = LeadStore::new_in_memory();
    let err = s
        .insert_lead_row(LeadRowInput {
            email: email("alice@x.com"),
            referral_code: code("REFAAA111"),
            referred_by: Some(code("REFAAA111")),
            created_at: MonotonicTimeNs(1),
        })
        .unwrap_err();

    assert!(matches!(err, StorageError::ContractViolation(_)));
    assert_eq!(s.lead_count(), 0);
}

#[test]
fn at_leads_db_08_duplicate_email_txn_does_not_double_credit() {
    let mut s = LeadStore::new_in_memory();
    s.register_lead_txn(MonotonicTimeNs(1), email("alice@x.com"), code("REFAAA111"), None)
        .unwrap();
    s.register_lead_txn(
        MonotonicTimeNs(2),
        email("bob@x.com"),
        code("REFBBB222"),
        Some(code("REFAAA111")),
    )
    .unwrap();

    let err = s
        .register_lead_txn(
            MonotonicTimeNs(3),
            email("bob@x.com"),
            code("REFCCC333"),
            Some(code("REFAAA111")),
        )
        .unwrap_err();

    assert!(matches!(err, StorageError::DuplicateKey { .. }));
    assert_eq!(s.lead_count(), 2);
    assert_eq!(
        s.find_by_email(&email("alice@x.com")).unwrap().referral_count,
        1
    );
}

#[test]
fn at_leads_db_09_ordered_read_is_newest_first() {
    let mut s = LeadStore::new_in_memory();
    s.insert_lead_row(row("a@x.com", "REFAAA111", 10)).unwrap();
    s.insert_lead_row(row("b@x.com", "REFBBB222", 30)).unwrap();
    s.insert_lead_row(row("c@x.com", "REFCCC333", 20)).unwrap();

    assert_eq!(ordered_emails(&s), vec!["b@x.com", "c@x.com", "a@x.com"]);
}
