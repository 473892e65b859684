use std::path::Path;

use anyhow::{anyhow, Context, Result};
use dedupe_core::{
    AccountCandidateQuery, AccountId, AccountIdentity, AccountMatchKey, AccountRecord,
    ContactCandidateQuery, ContactId, ContactIdentity, ContactMatchKey, ContactRecord, ProjectId,
    RecordLabel, RecordStore, StoreError,
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use ulid::Ulid;

const LATEST_SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA_MIGRATIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);
";

const MIGRATION_001_SQL: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
  account_id TEXT PRIMARY KEY,
  project_id TEXT NOT NULL,
  company_name TEXT NOT NULL,
  website_domain TEXT,
  scrubbed_company_name TEXT,
  alias_company_name TEXT,
  company_name_tokens TEXT,
  duplicate_of TEXT,
  label TEXT CHECK (label IN ('duplicate','suppressed','inclusion')),
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contacts (
  contact_id TEXT PRIMARY KEY,
  project_id TEXT NOT NULL,
  full_name TEXT NOT NULL,
  email TEXT,
  email_dedupe_key TEXT,
  phone_dedupe_key TEXT,
  company_dedupe_key TEXT,
  duplicate_of TEXT,
  label TEXT CHECK (label IN ('duplicate','suppressed','inclusion')),
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS suppressed_accounts (
  account_id TEXT PRIMARY KEY,
  project_id TEXT NOT NULL,
  company_name TEXT NOT NULL,
  website_domain TEXT,
  scrubbed_company_name TEXT,
  alias_company_name TEXT,
  company_name_tokens TEXT,
  duplicate_of TEXT,
  label TEXT,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS suppressed_contacts (
  contact_id TEXT PRIMARY KEY,
  project_id TEXT NOT NULL,
  full_name TEXT NOT NULL,
  email TEXT,
  email_dedupe_key TEXT,
  phone_dedupe_key TEXT,
  company_dedupe_key TEXT,
  duplicate_of TEXT,
  label TEXT,
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_accounts_project ON accounts(project_id);
CREATE INDEX IF NOT EXISTS idx_accounts_website_domain ON accounts(website_domain);
CREATE INDEX IF NOT EXISTS idx_accounts_scrubbed_name ON accounts(scrubbed_company_name);
CREATE INDEX IF NOT EXISTS idx_accounts_alias_name ON accounts(alias_company_name);
CREATE INDEX IF NOT EXISTS idx_accounts_name_tokens ON accounts(company_name_tokens);
CREATE INDEX IF NOT EXISTS idx_contacts_project ON contacts(project_id);
CREATE INDEX IF NOT EXISTS idx_contacts_email ON contacts(email);
CREATE INDEX IF NOT EXISTS idx_contacts_email_key ON contacts(email_dedupe_key);
CREATE INDEX IF NOT EXISTS idx_contacts_phone_key ON contacts(phone_dedupe_key);
CREATE INDEX IF NOT EXISTS idx_contacts_company_key ON contacts(company_dedupe_key);
CREATE INDEX IF NOT EXISTS idx_suppressed_accounts_project ON suppressed_accounts(project_id);
CREATE INDEX IF NOT EXISTS idx_suppressed_contacts_project ON suppressed_contacts(project_id);
";

pub struct SqliteStore {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaStatus {
    pub current_version: i64,
    pub target_version: i64,
    pub pending_versions: Vec<i64>,
}

impl SqliteStore {
    /// Open a SQLite-backed record store and configure required runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    /// Report current and target schema versions plus pending migrations.
    ///
    /// # Errors
    /// Returns an error when schema metadata cannot be read or initialized.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;
        let current_version = current_schema_version(&self.conn)?;
        let pending_versions = if current_version < LATEST_SCHEMA_VERSION {
            ((current_version + 1)..=LATEST_SCHEMA_VERSION).collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        Ok(SchemaStatus {
            current_version,
            target_version: LATEST_SCHEMA_VERSION,
            pending_versions,
        })
    }

    /// Apply all forward migrations up to the latest supported schema version.
    ///
    /// # Errors
    /// Returns an error when migration bootstrapping or any migration step fails.
    pub fn migrate(&mut self) -> Result<()> {
        self.conn
            .execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)
            .context("failed to apply schema_migrations table")?;

        let mut version = current_schema_version(&self.conn)?;

        if version < 1 {
            self.conn.execute_batch(MIGRATION_001_SQL).context("failed to apply migration v1")?;
            record_schema_version(&self.conn, 1)?;
            version = 1;
        }

        if version != LATEST_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported schema version {version}; expected {LATEST_SCHEMA_VERSION}"
            ));
        }

        Ok(())
    }

    /// Persist one account record.
    ///
    /// # Errors
    /// Returns an error when the record is invalid or the insert fails.
    pub fn write_account(&mut self, record: &AccountRecord) -> Result<()> {
        if record.company_name.trim().is_empty() {
            return Err(anyhow!("company_name MUST be provided for every account"));
        }

        self.conn
            .execute(
                "INSERT INTO accounts(
                    account_id, project_id, company_name, website_domain, scrubbed_company_name,
                    alias_company_name, company_name_tokens, duplicate_of, label, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.account_id.to_string(),
                    record.project_id.to_string(),
                    record.company_name,
                    record.identity.website_domain,
                    record.identity.scrubbed_company_name,
                    record.identity.alias_company_name,
                    record.identity.company_name_tokens,
                    record.duplicate_of.map(|id| id.to_string()),
                    record.label.map(RecordLabel::as_str),
                    rfc3339(record.created_at)?,
                ],
            )
            .context("failed to insert account record")?;
        Ok(())
    }

    /// Persist one contact record.
    ///
    /// # Errors
    /// Returns an error when the record is invalid or the insert fails.
    pub fn write_contact(&mut self, record: &ContactRecord) -> Result<()> {
        if record.full_name.trim().is_empty() {
            return Err(anyhow!("full_name MUST be provided for every contact"));
        }

        self.conn
            .execute(
                "INSERT INTO contacts(
                    contact_id, project_id, full_name, email, email_dedupe_key,
                    phone_dedupe_key, company_dedupe_key, duplicate_of, label, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.contact_id.to_string(),
                    record.project_id.to_string(),
                    record.full_name,
                    record.identity.email,
                    record.identity.email_dedupe_key,
                    record.identity.phone_dedupe_key,
                    record.identity.company_dedupe_key,
                    record.duplicate_of.map(|id| id.to_string()),
                    record.label.map(RecordLabel::as_str),
                    rfc3339(record.created_at)?,
                ],
            )
            .context("failed to insert contact record")?;
        Ok(())
    }

    /// Persist one account suppression-list entry.
    ///
    /// # Errors
    /// Returns an error when the entry is invalid or the insert fails.
    pub fn write_suppressed_account(&mut self, record: &AccountRecord) -> Result<()> {
        if record.company_name.trim().is_empty() {
            return Err(anyhow!("company_name MUST be provided for every suppression entry"));
        }

        self.conn
            .execute(
                "INSERT INTO suppressed_accounts(
                    account_id, project_id, company_name, website_domain, scrubbed_company_name,
                    alias_company_name, company_name_tokens, duplicate_of, label, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, ?8)",
                params![
                    record.account_id.to_string(),
                    record.project_id.to_string(),
                    record.company_name,
                    record.identity.website_domain,
                    record.identity.scrubbed_company_name,
                    record.identity.alias_company_name,
                    record.identity.company_name_tokens,
                    rfc3339(record.created_at)?,
                ],
            )
            .context("failed to insert account suppression entry")?;
        Ok(())
    }

    /// Persist one contact suppression-list entry.
    ///
    /// # Errors
    /// Returns an error when the entry is invalid or the insert fails.
    pub fn write_suppressed_contact(&mut self, record: &ContactRecord) -> Result<()> {
        if record.full_name.trim().is_empty() {
            return Err(anyhow!("full_name MUST be provided for every suppression entry"));
        }

        self.conn
            .execute(
                "INSERT INTO suppressed_contacts(
                    contact_id, project_id, full_name, email, email_dedupe_key,
                    phone_dedupe_key, company_dedupe_key, duplicate_of, label, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, ?8)",
                params![
                    record.contact_id.to_string(),
                    record.project_id.to_string(),
                    record.full_name,
                    record.identity.email,
                    record.identity.email_dedupe_key,
                    record.identity.phone_dedupe_key,
                    record.identity.company_dedupe_key,
                    rfc3339(record.created_at)?,
                ],
            )
            .context("failed to insert contact suppression entry")?;
        Ok(())
    }

    /// Load all account records, newest first.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at DESC, account_id ASC"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(raw_account_row(row)?.into_record()?);
        }
        Ok(records)
    }

    /// Load all contact records, newest first.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn list_contacts(&self) -> Result<Vec<ContactRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC, contact_id ASC"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(raw_contact_row(row)?.into_record()?);
        }
        Ok(records)
    }

    /// Persist a computed label decision on an account.
    ///
    /// # Errors
    /// Returns an error when the account does not exist or the update fails.
    pub fn apply_account_label(
        &mut self,
        account_id: AccountId,
        label: Option<RecordLabel>,
        duplicate_of: Option<AccountId>,
    ) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE accounts SET label = ?1, duplicate_of = ?2 WHERE account_id = ?3",
                params![
                    label.map(RecordLabel::as_str),
                    duplicate_of.map(|id| id.to_string()),
                    account_id.to_string(),
                ],
            )
            .context("failed to update account label")?;
        if updated == 0 {
            return Err(anyhow!("no account row for id {account_id}"));
        }
        Ok(())
    }

    /// Persist a computed label decision on a contact.
    ///
    /// # Errors
    /// Returns an error when the contact does not exist or the update fails.
    pub fn apply_contact_label(
        &mut self,
        contact_id: ContactId,
        label: RecordLabel,
        duplicate_of: Option<ContactId>,
    ) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE contacts SET label = ?1, duplicate_of = ?2 WHERE contact_id = ?3",
                params![
                    label.as_str(),
                    duplicate_of.map(|id| id.to_string()),
                    contact_id.to_string(),
                ],
            )
            .context("failed to update contact label")?;
        if updated == 0 {
            return Err(anyhow!("no contact row for id {contact_id}"));
        }
        Ok(())
    }

    /// Resolve one account by primary key.
    ///
    /// # Errors
    /// Returns an error when the lookup fails or the row cannot be decoded.
    pub fn get_account(&self, account_id: AccountId) -> Result<Option<AccountRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"
        ))?;
        let row = stmt
            .query_row(params![account_id.to_string()], raw_account_row)
            .optional()
            .context("failed to look up account by id")?;
        row.map(RawAccountRow::into_record).transpose()
    }

    /// Resolve one contact by primary key.
    ///
    /// # Errors
    /// Returns an error when the lookup fails or the row cannot be decoded.
    pub fn get_contact(&self, contact_id: ContactId) -> Result<Option<ContactRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE contact_id = ?1"
        ))?;
        let row = stmt
            .query_row(params![contact_id.to_string()], raw_contact_row)
            .optional()
            .context("failed to look up contact by id")?;
        row.map(RawContactRow::into_record).transpose()
    }

    fn query_account_candidate(
        &self,
        table: &str,
        query: &AccountCandidateQuery,
        canonical_only: bool,
    ) -> Result<Option<AccountRecord>> {
        if query.clauses.is_empty() {
            return Ok(None);
        }

        let mut sql =
            format!("SELECT {ACCOUNT_COLUMNS} FROM {table} WHERE project_id = ?");
        let mut values: Vec<String> = vec![query.project_id.to_string()];

        if canonical_only {
            sql.push_str(" AND duplicate_of IS NULL");
        }
        if let Some(exclude_id) = query.exclude_id {
            sql.push_str(" AND account_id != ?");
            values.push(exclude_id.to_string());
        }

        let clauses: Vec<String> = query
            .clauses
            .iter()
            .map(|clause| {
                values.push(clause.value.clone());
                format!("{} = ?", account_column(clause.key))
            })
            .collect();
        sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        sql.push_str(" ORDER BY created_at ASC, account_id ASC LIMIT 1");

        let mut stmt = self.conn.prepare(&sql)?;
        let row = stmt
            .query_row(params_from_iter(values), raw_account_row)
            .optional()
            .with_context(|| format!("failed to query {table} candidates"))?;
        row.map(RawAccountRow::into_record).transpose()
    }

    fn query_contact_candidate(
        &self,
        table: &str,
        query: &ContactCandidateQuery,
        canonical_only: bool,
    ) -> Result<Option<ContactRecord>> {
        if query.clauses.is_empty() {
            return Ok(None);
        }

        let mut sql =
            format!("SELECT {CONTACT_COLUMNS} FROM {table} WHERE project_id = ?");
        let mut values: Vec<String> = vec![query.project_id.to_string()];

        if canonical_only {
            sql.push_str(" AND duplicate_of IS NULL");
        }
        if let Some(exclude_id) = query.exclude_id {
            sql.push_str(" AND contact_id != ?");
            values.push(exclude_id.to_string());
        }

        let clauses: Vec<String> = query
            .clauses
            .iter()
            .map(|clause| {
                values.push(clause.value.clone());
                format!("{} = ?", contact_column(clause.key))
            })
            .collect();
        sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        sql.push_str(" ORDER BY created_at ASC, contact_id ASC LIMIT 1");

        let mut stmt = self.conn.prepare(&sql)?;
        let row = stmt
            .query_row(params_from_iter(values), raw_contact_row)
            .optional()
            .with_context(|| format!("failed to query {table} candidates"))?;
        row.map(RawContactRow::into_record).transpose()
    }
}

impl RecordStore for SqliteStore {
    fn find_account(&self, account_id: AccountId) -> Result<Option<AccountRecord>, StoreError> {
        self.get_account(account_id).map_err(into_store_error)
    }

    fn find_contact(&self, contact_id: ContactId) -> Result<Option<ContactRecord>, StoreError> {
        self.get_contact(contact_id).map_err(into_store_error)
    }

    fn find_account_duplicate(
        &self,
        query: &AccountCandidateQuery,
    ) -> Result<Option<AccountRecord>, StoreError> {
        self.query_account_candidate("accounts", query, true).map_err(into_store_error)
    }

    fn find_contact_duplicate(
        &self,
        query: &ContactCandidateQuery,
    ) -> Result<Option<ContactRecord>, StoreError> {
        self.query_contact_candidate("contacts", query, true).map_err(into_store_error)
    }

    fn find_account_suppression(
        &self,
        query: &AccountCandidateQuery,
    ) -> Result<Option<AccountRecord>, StoreError> {
        self.query_account_candidate("suppressed_accounts", query, false).map_err(into_store_error)
    }

    fn find_contact_suppression(
        &self,
        query: &ContactCandidateQuery,
    ) -> Result<Option<ContactRecord>, StoreError> {
        self.query_contact_candidate("suppressed_contacts", query, false).map_err(into_store_error)
    }
}

const ACCOUNT_COLUMNS: &str = "account_id, project_id, company_name, website_domain, \
    scrubbed_company_name, alias_company_name, company_name_tokens, duplicate_of, label, created_at";

const CONTACT_COLUMNS: &str = "contact_id, project_id, full_name, email, email_dedupe_key, \
    phone_dedupe_key, company_dedupe_key, duplicate_of, label, created_at";

fn account_column(key: AccountMatchKey) -> &'static str {
    match key {
        AccountMatchKey::WebsiteDomain => "website_domain",
        AccountMatchKey::ScrubbedCompanyName => "scrubbed_company_name",
        AccountMatchKey::AliasCompanyName => "alias_company_name",
        AccountMatchKey::CompanyNameTokens => "company_name_tokens",
    }
}

fn contact_column(key: ContactMatchKey) -> &'static str {
    match key {
        ContactMatchKey::Email => "email",
        ContactMatchKey::EmailDedupeKey => "email_dedupe_key",
        ContactMatchKey::PhoneDedupeKey => "phone_dedupe_key",
        ContactMatchKey::CompanyDedupeKey => "company_dedupe_key",
    }
}

struct RawAccountRow {
    account_id: String,
    project_id: String,
    company_name: String,
    website_domain: Option<String>,
    scrubbed_company_name: Option<String>,
    alias_company_name: Option<String>,
    company_name_tokens: Option<String>,
    duplicate_of: Option<String>,
    label: Option<String>,
    created_at: String,
}

impl RawAccountRow {
    fn into_record(self) -> Result<AccountRecord> {
        Ok(AccountRecord {
            account_id: AccountId(parse_ulid(&self.account_id)?),
            project_id: ProjectId(parse_ulid(&self.project_id)?),
            company_name: self.company_name,
            identity: AccountIdentity {
                website_domain: self.website_domain,
                scrubbed_company_name: self.scrubbed_company_name,
                alias_company_name: self.alias_company_name,
                company_name_tokens: self.company_name_tokens,
            },
            duplicate_of: self
                .duplicate_of
                .as_deref()
                .map(|raw| parse_ulid(raw).map(AccountId))
                .transpose()?,
            label: parse_label(self.label.as_deref())?,
            created_at: parse_rfc3339(&self.created_at)?,
        })
    }
}

struct RawContactRow {
    contact_id: String,
    project_id: String,
    full_name: String,
    email: Option<String>,
    email_dedupe_key: Option<String>,
    phone_dedupe_key: Option<String>,
    company_dedupe_key: Option<String>,
    duplicate_of: Option<String>,
    label: Option<String>,
    created_at: String,
}

impl RawContactRow {
    fn into_record(self) -> Result<ContactRecord> {
        Ok(ContactRecord {
            contact_id: ContactId(parse_ulid(&self.contact_id)?),
            project_id: ProjectId(parse_ulid(&self.project_id)?),
            full_name: self.full_name,
            identity: ContactIdentity {
                email: self.email,
                email_dedupe_key: self.email_dedupe_key,
                phone_dedupe_key: self.phone_dedupe_key,
                company_dedupe_key: self.company_dedupe_key,
            },
            duplicate_of: self
                .duplicate_of
                .as_deref()
                .map(|raw| parse_ulid(raw).map(ContactId))
                .transpose()?,
            label: parse_label(self.label.as_deref())?,
            created_at: parse_rfc3339(&self.created_at)?,
        })
    }
}

fn raw_account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAccountRow> {
    Ok(RawAccountRow {
        account_id: row.get(0)?,
        project_id: row.get(1)?,
        company_name: row.get(2)?,
        website_domain: row.get(3)?,
        scrubbed_company_name: row.get(4)?,
        alias_company_name: row.get(5)?,
        company_name_tokens: row.get(6)?,
        duplicate_of: row.get(7)?,
        label: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn raw_contact_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawContactRow> {
    Ok(RawContactRow {
        contact_id: row.get(0)?,
        project_id: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        email_dedupe_key: row.get(4)?,
        phone_dedupe_key: row.get(5)?,
        company_dedupe_key: row.get(6)?,
        duplicate_of: row.get(7)?,
        label: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn into_store_error(err: anyhow::Error) -> StoreError {
    StoreError(format!("{err:#}"))
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    let version: Option<i64> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
        .context("failed to read schema version")?;
    Ok(version.unwrap_or(0))
}

fn record_schema_version(conn: &Connection, version: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
        params![version, now_rfc3339()?],
    )
    .with_context(|| format!("failed to record migration version {version}"))?;
    Ok(())
}

fn parse_ulid(raw: &str) -> Result<Ulid> {
    Ulid::from_string(raw).with_context(|| format!("invalid ULID in store: {raw}"))
}

fn parse_label(raw: Option<&str>) -> Result<Option<RecordLabel>> {
    raw.map(|value| {
        RecordLabel::parse(value).ok_or_else(|| anyhow!("unknown label in store: {value}"))
    })
    .transpose()
}

fn rfc3339(value: OffsetDateTime) -> Result<String> {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .context("failed to format timestamp as RFC 3339")
}

fn parse_rfc3339(raw: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339)
        .with_context(|| format!("invalid RFC 3339 timestamp in store: {raw}"))
}

fn now_rfc3339() -> Result<String> {
    rfc3339(OffsetDateTime::now_utc())
}
