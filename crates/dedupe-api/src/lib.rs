use std::path::PathBuf;

use anyhow::Result;
use dedupe_core::{
    AccountId, AccountIdentity, AccountRecord, CheckError, CheckOptions, CheckService, ContactId,
    ContactIdentity, ContactRecord, ProjectId, RecordLabel, StoreError,
};
use dedupe_store_sqlite::{SchemaStatus, SqliteStore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const API_CONTRACT_VERSION: &str = "api.v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrateResult {
    pub dry_run: bool,
    pub current_version: i64,
    pub target_version: i64,
    pub would_apply_versions: Vec<i64>,
    pub after_version: Option<i64>,
    pub up_to_date: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddAccountRequest {
    pub project_id: ProjectId,
    pub company_name: String,
    pub website_domain: Option<String>,
    pub scrubbed_company_name: Option<String>,
    pub alias_company_name: Option<String>,
    pub company_name_tokens: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddContactRequest {
    pub project_id: ProjectId,
    pub full_name: String,
    pub email: Option<String>,
    pub email_dedupe_key: Option<String>,
    pub phone_dedupe_key: Option<String>,
    pub company_dedupe_key: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckAccountRequest {
    pub account_id: Option<AccountId>,
    pub check_duplicate: bool,
    pub check_suppression: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckContactRequest {
    pub contact_id: Option<ContactId>,
    pub check_duplicate: bool,
    pub check_suppression: bool,
}

/// Flattened check result at the compatibility boundary. Both check legs are
/// always present; a skipped or unmatched leg reports `false` with match
/// case `NONE` and no counterpart record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckAccountResult {
    pub account_id: AccountId,
    pub label: Option<RecordLabel>,
    pub duplicate_of: Option<AccountId>,
    pub is_duplicate: bool,
    pub duplicate_match_case: String,
    pub duplicate_with: Option<AccountRecord>,
    pub is_suppressed: bool,
    pub suppression_match_case: String,
    pub suppressed_with: Option<AccountRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckContactResult {
    pub contact_id: ContactId,
    pub label: RecordLabel,
    pub duplicate_of: Option<ContactId>,
    pub is_duplicate: bool,
    pub duplicate_match_case: String,
    pub duplicate_with: Option<ContactRecord>,
    pub is_suppressed: bool,
    pub suppression_match_case: String,
    pub suppressed_with: Option<ContactRecord>,
}

#[derive(Debug, Clone)]
pub struct DedupeApi {
    db_path: PathBuf,
}

impl DedupeApi {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.db_path)
    }

    fn open_migrated_store(&self) -> Result<SqliteStore, CheckError> {
        let mut store = self.open_store().map_err(into_check_store_error)?;
        store.migrate().map_err(into_check_store_error)?;
        Ok(store)
    }

    /// Inspect schema status without mutating data.
    ///
    /// # Errors
    /// Returns an error when the `SQLite` database cannot be opened or queried.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        let store = self.open_store()?;
        store.schema_status()
    }

    /// Apply pending migrations, or return planned versions for dry-run mode.
    ///
    /// # Errors
    /// Returns an error when migration planning or execution fails.
    pub fn migrate(&self, dry_run: bool) -> Result<MigrateResult> {
        let mut store = self.open_store()?;
        let before = store.schema_status()?;
        if dry_run {
            return Ok(MigrateResult {
                dry_run: true,
                current_version: before.current_version,
                target_version: before.target_version,
                would_apply_versions: before.pending_versions,
                after_version: None,
                up_to_date: None,
            });
        }

        let planned_versions = before.pending_versions;
        store.migrate()?;
        let after = store.schema_status()?;
        Ok(MigrateResult {
            dry_run: false,
            current_version: before.current_version,
            target_version: before.target_version,
            would_apply_versions: planned_versions,
            after_version: Some(after.current_version),
            up_to_date: Some(after.pending_versions.is_empty()),
        })
    }

    /// Add one active account record.
    ///
    /// # Errors
    /// Returns an error when record validation or persistence fails.
    pub fn add_account(&self, input: AddAccountRequest) -> Result<AccountRecord> {
        let mut store = self.open_store()?;
        store.migrate()?;
        let record = build_account_record(input);
        store.write_account(&record)?;
        Ok(record)
    }

    /// Add one active contact record.
    ///
    /// # Errors
    /// Returns an error when record validation or persistence fails.
    pub fn add_contact(&self, input: AddContactRequest) -> Result<ContactRecord> {
        let mut store = self.open_store()?;
        store.migrate()?;
        let record = build_contact_record(input);
        store.write_contact(&record)?;
        Ok(record)
    }

    /// Add one account suppression-list entry.
    ///
    /// # Errors
    /// Returns an error when entry validation or persistence fails.
    pub fn suppress_account(&self, input: AddAccountRequest) -> Result<AccountRecord> {
        let mut store = self.open_store()?;
        store.migrate()?;
        let record = build_account_record(input);
        store.write_suppressed_account(&record)?;
        Ok(record)
    }

    /// Add one contact suppression-list entry.
    ///
    /// # Errors
    /// Returns an error when entry validation or persistence fails.
    pub fn suppress_contact(&self, input: AddContactRequest) -> Result<ContactRecord> {
        let mut store = self.open_store()?;
        store.migrate()?;
        let record = build_contact_record(input);
        store.write_suppressed_contact(&record)?;
        Ok(record)
    }

    /// List all active account records, newest first.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read.
    pub fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        let mut store = self.open_store()?;
        store.migrate()?;
        store.list_accounts()
    }

    /// List all active contact records, newest first.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read.
    pub fn list_contacts(&self) -> Result<Vec<ContactRecord>> {
        let mut store = self.open_store()?;
        store.migrate()?;
        store.list_contacts()
    }

    /// Run the account check pipeline and persist the computed label.
    ///
    /// # Errors
    /// Returns [`CheckError`] with its stable code: `BAD_ID` for a missing
    /// id, `BAD_ACCOUNT_ID` for an unknown one, and the check-stage codes
    /// when a lookup leg fails.
    pub fn check_account(&self, input: CheckAccountRequest) -> Result<CheckAccountResult, CheckError> {
        let mut store = self.open_migrated_store()?;
        let options = CheckOptions {
            check_duplicate: input.check_duplicate,
            check_suppression: input.check_suppression,
        };
        let outcome = CheckService::new(&store).check_account(input.account_id, options)?;
        store
            .apply_account_label(
                outcome.labeled_account.account_id,
                outcome.labeled_account.label,
                outcome.labeled_account.duplicate_of,
            )
            .map_err(into_check_store_error)?;

        Ok(CheckAccountResult {
            account_id: outcome.labeled_account.account_id,
            label: outcome.labeled_account.label,
            duplicate_of: outcome.labeled_account.duplicate_of,
            is_duplicate: outcome.duplicate.matched,
            duplicate_match_case: outcome.duplicate.match_case(),
            duplicate_with: outcome.duplicate.matched_with,
            is_suppressed: outcome.suppression.matched,
            suppression_match_case: outcome.suppression.match_case(),
            suppressed_with: outcome.suppression.matched_with,
        })
    }

    /// Run the contact check pipeline and persist the computed label.
    ///
    /// # Errors
    /// Mirrors [`Self::check_account`] with the contact error variants.
    pub fn check_contact(&self, input: CheckContactRequest) -> Result<CheckContactResult, CheckError> {
        let mut store = self.open_migrated_store()?;
        let options = CheckOptions {
            check_duplicate: input.check_duplicate,
            check_suppression: input.check_suppression,
        };
        let outcome = CheckService::new(&store).check_contact(input.contact_id, options)?;
        store
            .apply_contact_label(
                outcome.labeled_contact.contact_id,
                outcome.labeled_contact.label,
                outcome.labeled_contact.duplicate_of,
            )
            .map_err(into_check_store_error)?;

        Ok(CheckContactResult {
            contact_id: outcome.labeled_contact.contact_id,
            label: outcome.labeled_contact.label,
            duplicate_of: outcome.labeled_contact.duplicate_of,
            is_duplicate: outcome.duplicate.matched,
            duplicate_match_case: outcome.duplicate.match_case(),
            duplicate_with: outcome.duplicate.matched_with,
            is_suppressed: outcome.suppression.matched,
            suppression_match_case: outcome.suppression.match_case(),
            suppressed_with: outcome.suppression.matched_with,
        })
    }
}

fn into_check_store_error(err: anyhow::Error) -> CheckError {
    CheckError::Store(StoreError(format!("{err:#}")))
}

fn build_account_record(input: AddAccountRequest) -> AccountRecord {
    AccountRecord {
        account_id: AccountId::new(),
        project_id: input.project_id,
        company_name: input.company_name,
        identity: AccountIdentity {
            website_domain: input.website_domain,
            scrubbed_company_name: input.scrubbed_company_name,
            alias_company_name: input.alias_company_name,
            company_name_tokens: input.company_name_tokens,
        },
        duplicate_of: None,
        label: None,
        created_at: input.created_at.unwrap_or_else(OffsetDateTime::now_utc),
    }
}

fn build_contact_record(input: AddContactRequest) -> ContactRecord {
    ContactRecord {
        contact_id: ContactId::new(),
        project_id: input.project_id,
        full_name: input.full_name,
        identity: ContactIdentity {
            email: input.email,
            email_dedupe_key: input.email_dedupe_key,
            phone_dedupe_key: input.phone_dedupe_key,
            company_dedupe_key: input.company_dedupe_key,
        },
        duplicate_of: None,
        label: None,
        created_at: input.created_at.unwrap_or_else(OffsetDateTime::now_utc),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ulid::Ulid;

    use super::*;

    fn unique_temp_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("dedupekernel-api-{}.sqlite3", Ulid::new()))
    }

    fn mk_account_request(project_id: ProjectId, domain: &str) -> AddAccountRequest {
        AddAccountRequest {
            project_id,
            company_name: "Facade Fixture Corp".to_string(),
            website_domain: Some(domain.to_string()),
            scrubbed_company_name: None,
            alias_company_name: None,
            company_name_tokens: None,
            created_at: None,
        }
    }

    fn mk_contact_request(project_id: ProjectId, email: &str) -> AddContactRequest {
        AddContactRequest {
            project_id,
            full_name: "Facade Fixture Person".to_string(),
            email: Some(email.to_string()),
            email_dedupe_key: None,
            phone_dedupe_key: None,
            company_dedupe_key: None,
            created_at: None,
        }
    }

    fn check_request(account_id: Option<AccountId>) -> CheckAccountRequest {
        CheckAccountRequest { account_id, check_duplicate: true, check_suppression: true }
    }

    // Test IDs: TAP-001
    #[test]
    fn migrate_then_dry_run_reports_up_to_date() {
        let db_path = unique_temp_db_path();
        let api = DedupeApi::new(db_path.clone());

        let applied = match api.migrate(false) {
            Ok(result) => result,
            Err(err) => panic!("migrate failed: {err}"),
        };
        assert!(!applied.dry_run);
        assert_eq!(applied.up_to_date, Some(true));

        let planned = match api.migrate(true) {
            Ok(result) => result,
            Err(err) => panic!("dry-run migrate failed: {err}"),
        };
        assert!(planned.dry_run);
        assert!(planned.would_apply_versions.is_empty());

        let _ = std::fs::remove_file(&db_path);
    }

    // Test IDs: TAP-002
    #[test]
    fn duplicate_check_labels_and_persists() {
        let db_path = unique_temp_db_path();
        let api = DedupeApi::new(db_path.clone());
        let project_id = ProjectId::new();

        let canonical = match api.add_account(mk_account_request(project_id, "facade.example.com")) {
            Ok(record) => record,
            Err(err) => panic!("add_account failed: {err}"),
        };
        let incoming = match api.add_account(mk_account_request(project_id, "facade.example.com")) {
            Ok(record) => record,
            Err(err) => panic!("add_account failed: {err}"),
        };

        let result = match api.check_account(check_request(Some(incoming.account_id))) {
            Ok(result) => result,
            Err(err) => panic!("check_account failed: {err}"),
        };
        assert!(result.is_duplicate);
        assert_eq!(result.duplicate_match_case, "WEBSITE_DOMAIN");
        assert_eq!(result.label, Some(RecordLabel::Duplicate));
        assert_eq!(result.duplicate_of, Some(canonical.account_id));
        assert!(!result.is_suppressed);
        assert_eq!(result.suppression_match_case, "NONE");

        // The label decision must survive a reload.
        let accounts = match api.list_accounts() {
            Ok(accounts) => accounts,
            Err(err) => panic!("list_accounts failed: {err}"),
        };
        let reloaded = match accounts.iter().find(|a| a.account_id == incoming.account_id) {
            Some(reloaded) => reloaded,
            None => panic!("labeled account missing from listing"),
        };
        assert_eq!(reloaded.label, Some(RecordLabel::Duplicate));
        assert_eq!(reloaded.duplicate_of, Some(canonical.account_id));

        let _ = std::fs::remove_file(&db_path);
    }

    // Test IDs: TAP-003
    #[test]
    fn suppression_outranks_duplicate_end_to_end() {
        let db_path = unique_temp_db_path();
        let api = DedupeApi::new(db_path.clone());
        let project_id = ProjectId::new();

        if let Err(err) = api.add_account(mk_account_request(project_id, "both.example.com")) {
            panic!("add_account failed: {err}");
        }
        let incoming = match api.add_account(mk_account_request(project_id, "both.example.com")) {
            Ok(record) => record,
            Err(err) => panic!("add_account failed: {err}"),
        };
        if let Err(err) = api.suppress_account(mk_account_request(project_id, "both.example.com")) {
            panic!("suppress_account failed: {err}");
        }

        let result = match api.check_account(check_request(Some(incoming.account_id))) {
            Ok(result) => result,
            Err(err) => panic!("check_account failed: {err}"),
        };
        assert!(result.is_duplicate);
        assert!(result.is_suppressed);
        assert_eq!(result.label, Some(RecordLabel::Suppressed));
        assert_eq!(result.duplicate_of, None);

        let _ = std::fs::remove_file(&db_path);
    }

    // Test IDs: TAP-004
    #[test]
    fn account_error_codes_surface_at_the_facade() {
        let db_path = unique_temp_db_path();
        let api = DedupeApi::new(db_path.clone());

        let missing = match api.check_account(check_request(None)) {
            Err(err) => err,
            Ok(result) => panic!("expected BAD_ID, got {result:?}"),
        };
        assert_eq!(missing.code(), "BAD_ID");
        assert_eq!(missing.to_string(), "account_id is required");

        let unknown_id = AccountId::new();
        let unknown = match api.check_account(check_request(Some(unknown_id))) {
            Err(err) => err,
            Ok(result) => panic!("expected BAD_ACCOUNT_ID, got {result:?}"),
        };
        assert_eq!(unknown.code(), "BAD_ACCOUNT_ID");
        assert_eq!(
            unknown.to_string(),
            format!("Could Not Find Account with ID: {unknown_id}, Account Reference Dose Not Exist")
        );

        let _ = std::fs::remove_file(&db_path);
    }

    // Test IDs: TAP-005
    #[test]
    fn contact_without_matches_is_an_inclusion() {
        let db_path = unique_temp_db_path();
        let api = DedupeApi::new(db_path.clone());
        let project_id = ProjectId::new();

        let contact = match api.add_contact(mk_contact_request(project_id, "solo@facade.example.com"))
        {
            Ok(record) => record,
            Err(err) => panic!("add_contact failed: {err}"),
        };

        let result = match api.check_contact(CheckContactRequest {
            contact_id: Some(contact.contact_id),
            check_duplicate: true,
            check_suppression: true,
        }) {
            Ok(result) => result,
            Err(err) => panic!("check_contact failed: {err}"),
        };
        assert_eq!(result.label, RecordLabel::Inclusion);
        assert!(!result.is_duplicate);
        assert!(!result.is_suppressed);
        assert_eq!(result.duplicate_match_case, "NONE");
        assert_eq!(result.suppression_match_case, "NONE");

        let contacts = match api.list_contacts() {
            Ok(contacts) => contacts,
            Err(err) => panic!("list_contacts failed: {err}"),
        };
        let reloaded = match contacts.iter().find(|c| c.contact_id == contact.contact_id) {
            Some(reloaded) => reloaded,
            None => panic!("labeled contact missing from listing"),
        };
        assert_eq!(reloaded.label, Some(RecordLabel::Inclusion));

        let _ = std::fs::remove_file(&db_path);
    }

    // Test IDs: TAP-006
    #[test]
    fn skipped_checks_report_defaults() {
        let db_path = unique_temp_db_path();
        let api = DedupeApi::new(db_path.clone());
        let project_id = ProjectId::new();

        if let Err(err) = api.add_account(mk_account_request(project_id, "skip.example.com")) {
            panic!("add_account failed: {err}");
        }
        let incoming = match api.add_account(mk_account_request(project_id, "skip.example.com")) {
            Ok(record) => record,
            Err(err) => panic!("add_account failed: {err}"),
        };

        let result = match api.check_account(CheckAccountRequest {
            account_id: Some(incoming.account_id),
            check_duplicate: false,
            check_suppression: false,
        }) {
            Ok(result) => result,
            Err(err) => panic!("check_account failed: {err}"),
        };
        assert!(!result.is_duplicate);
        assert!(!result.is_suppressed);
        assert_eq!(result.label, None);
        assert_eq!(result.duplicate_match_case, "NONE");
        assert_eq!(result.suppression_match_case, "NONE");

        let _ = std::fs::remove_file(&db_path);
    }
}
