#![forbid(unsafe_code)]

use league_storage::lead_store::LeadStore;
use league_storage::repo::AdminRolesRepo;

// Repo-trait dispatch, so the wiring itself is under test.
fn grant_via_repo<R: AdminRolesRepo>(repo: &mut R, user: &str) {
    repo.admin_role_grant(user.to_string());
}

#[test]
fn at_admin_db_01_role_grant_and_revoke() {
    let mut s = LeadStore::new_in_memory();
    assert!(!s.has_admin_role("ops_1"));

    grant_via_repo(&mut s, "ops_1");
    assert!(s.has_admin_role("ops_1"));
    assert!(!s.has_admin_role("ops_2"));

    s.admin_role_revoke("ops_1");
    assert!(!s.has_admin_role("ops_1"));
}

#[test]
fn at_admin_db_02_grant_is_idempotent() {
    let mut s = LeadStore::new_in_memory();
    s.admin_role_grant("ops_1".to_string());
    s.admin_role_grant("ops_1".to_string());
    assert!(s.has_admin_role("ops_1"));
    s.admin_role_revoke("ops_1");
    assert!(!s.has_admin_role("ops_1"));
}
