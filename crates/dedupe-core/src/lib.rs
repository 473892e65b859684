use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use ulid::Ulid;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
#[error("{0}")]
pub struct StoreError(pub String);

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum CheckError {
    #[error("{0} is required")]
    MissingId(&'static str),
    // Message text is frozen for compatibility with existing consumers,
    // including the "Dose" typo.
    #[error("Could Not Find Account with ID: {0}, Account Reference Dose Not Exist")]
    AccountNotFound(AccountId),
    #[error("Could Not Find Contact with ID: {0}, Contact Reference Dose Not Exist")]
    ContactNotFound(ContactId),
    #[error("Could Not Check Account, Something Went wrong while Dedupe Check")]
    AccountDedupeCheck,
    #[error("Could Not Check Contact, Something Went wrong while Dedupe Check")]
    ContactDedupeCheck,
    #[error("Could Not Check Account, Something Went wrong while Suppression Check")]
    AccountSuppressionCheck,
    #[error("Could Not Check Contact, Something Went wrong while Suppression Check")]
    ContactSuppressionCheck,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckError {
    /// Stable machine-readable code for API and service envelopes.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingId(_) => "BAD_ID",
            Self::AccountNotFound(_) => "BAD_ACCOUNT_ID",
            Self::ContactNotFound(_) => "BAD_CONTACT_ID",
            Self::AccountDedupeCheck | Self::ContactDedupeCheck => "DEDUPE_CHECK_ERROR",
            Self::AccountSuppressionCheck | Self::ContactSuppressionCheck => {
                "SUPPRESSION_CHECK_ERROR"
            }
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AccountId(pub Ulid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ContactId(pub Ulid);

impl ContactId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ContactId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ContactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ProjectId(pub Ulid);

impl ProjectId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identity attribute used for candidate matching. `as_str` renders the
/// legacy match-case token consumed by downstream import pipelines.
pub trait MatchKey: Copy + Eq {
    fn as_str(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccountMatchKey {
    WebsiteDomain,
    ScrubbedCompanyName,
    AliasCompanyName,
    CompanyNameTokens,
}

impl AccountMatchKey {
    /// Fixed priority order; earlier keys outrank later ones.
    pub const ALL: [Self; 4] =
        [Self::WebsiteDomain, Self::ScrubbedCompanyName, Self::AliasCompanyName, Self::CompanyNameTokens];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebsiteDomain => "WEBSITE_DOMAIN",
            Self::ScrubbedCompanyName => "SCRUBBED_COMPANY_NAME",
            Self::AliasCompanyName => "ALIAS_COMPANY_NAME",
            Self::CompanyNameTokens => "COMPANY_NAME_TOKENS",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "WEBSITE_DOMAIN" => Some(Self::WebsiteDomain),
            "SCRUBBED_COMPANY_NAME" => Some(Self::ScrubbedCompanyName),
            "ALIAS_COMPANY_NAME" => Some(Self::AliasCompanyName),
            "COMPANY_NAME_TOKENS" => Some(Self::CompanyNameTokens),
            _ => None,
        }
    }
}

impl MatchKey for AccountMatchKey {
    fn as_str(self) -> &'static str {
        Self::as_str(self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContactMatchKey {
    Email,
    EmailDedupeKey,
    PhoneDedupeKey,
    CompanyDedupeKey,
}

impl ContactMatchKey {
    /// Fixed priority order; earlier keys outrank later ones.
    pub const ALL: [Self; 4] =
        [Self::Email, Self::EmailDedupeKey, Self::PhoneDedupeKey, Self::CompanyDedupeKey];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::EmailDedupeKey => "FN+LN+EMAIL_DOMAIN",
            Self::PhoneDedupeKey => "FN+LN+PHONE",
            Self::CompanyDedupeKey => "FN+LN+COMPANY",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "EMAIL" => Some(Self::Email),
            "FN+LN+EMAIL_DOMAIN" => Some(Self::EmailDedupeKey),
            "FN+LN+PHONE" => Some(Self::PhoneDedupeKey),
            "FN+LN+COMPANY" => Some(Self::CompanyDedupeKey),
            _ => None,
        }
    }
}

impl MatchKey for ContactMatchKey {
    fn as_str(self) -> &'static str {
        Self::as_str(self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordLabel {
    Duplicate,
    Suppressed,
    Inclusion,
}

impl RecordLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Suppressed => "suppressed",
            Self::Inclusion => "inclusion",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "duplicate" => Some(Self::Duplicate),
            "suppressed" => Some(Self::Suppressed),
            "inclusion" => Some(Self::Inclusion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct AccountIdentity {
    pub website_domain: Option<String>,
    pub scrubbed_company_name: Option<String>,
    pub alias_company_name: Option<String>,
    pub company_name_tokens: Option<String>,
}

impl AccountIdentity {
    #[must_use]
    pub fn value(&self, key: AccountMatchKey) -> Option<&str> {
        match key {
            AccountMatchKey::WebsiteDomain => self.website_domain.as_deref(),
            AccountMatchKey::ScrubbedCompanyName => self.scrubbed_company_name.as_deref(),
            AccountMatchKey::AliasCompanyName => self.alias_company_name.as_deref(),
            AccountMatchKey::CompanyNameTokens => self.company_name_tokens.as_deref(),
        }
    }

    /// Populated identity clauses in priority order. Empty and
    /// whitespace-only values never contribute a clause.
    #[must_use]
    pub fn clauses(&self) -> Vec<IdentityClause<AccountMatchKey>> {
        AccountMatchKey::ALL
            .into_iter()
            .filter_map(|key| {
                let value = self.value(key)?.trim();
                if value.is_empty() {
                    return None;
                }
                Some(IdentityClause { key, value: value.to_string() })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ContactIdentity {
    pub email: Option<String>,
    pub email_dedupe_key: Option<String>,
    pub phone_dedupe_key: Option<String>,
    pub company_dedupe_key: Option<String>,
}

impl ContactIdentity {
    #[must_use]
    pub fn value(&self, key: ContactMatchKey) -> Option<&str> {
        match key {
            ContactMatchKey::Email => self.email.as_deref(),
            ContactMatchKey::EmailDedupeKey => self.email_dedupe_key.as_deref(),
            ContactMatchKey::PhoneDedupeKey => self.phone_dedupe_key.as_deref(),
            ContactMatchKey::CompanyDedupeKey => self.company_dedupe_key.as_deref(),
        }
    }

    /// Populated identity clauses in priority order. Empty and
    /// whitespace-only values never contribute a clause.
    #[must_use]
    pub fn clauses(&self) -> Vec<IdentityClause<ContactMatchKey>> {
        ContactMatchKey::ALL
            .into_iter()
            .filter_map(|key| {
                let value = self.value(key)?.trim();
                if value.is_empty() {
                    return None;
                }
                Some(IdentityClause { key, value: value.to_string() })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountRecord {
    pub account_id: AccountId,
    pub project_id: ProjectId,
    pub company_name: String,
    pub identity: AccountIdentity,
    pub duplicate_of: Option<AccountId>,
    pub label: Option<RecordLabel>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactRecord {
    pub contact_id: ContactId,
    pub project_id: ProjectId,
    pub full_name: String,
    pub identity: ContactIdentity,
    pub duplicate_of: Option<ContactId>,
    pub label: Option<RecordLabel>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct IdentityClause<K> {
    pub key: K,
    pub value: String,
}

/// One OR-combined equality search over identity keys, scoped to a tenant.
///
/// Duplicate lookups also exclude the record's own id and any candidate
/// already flagged as a duplicate of something else (`duplicate_of` set);
/// suppression lookups carry no exclusion because the suppression list is a
/// separate data set.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CandidateQuery<K, Id> {
    pub project_id: ProjectId,
    pub exclude_id: Option<Id>,
    pub clauses: Vec<IdentityClause<K>>,
}

pub type AccountCandidateQuery = CandidateQuery<AccountMatchKey, AccountId>;
pub type ContactCandidateQuery = CandidateQuery<ContactMatchKey, ContactId>;

/// Outcome of one candidate search. `match_keys` records which identity
/// keys contributed clauses to the query, in priority order; the single
/// issued query ORs all populated keys, so the list describes the search,
/// not the specific column that hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchVerdict<K, R> {
    pub matched: bool,
    pub match_keys: Vec<K>,
    pub matched_with: Option<R>,
}

impl<K: MatchKey, R> MatchVerdict<K, R> {
    #[must_use]
    pub fn none() -> Self {
        Self { matched: false, match_keys: Vec::new(), matched_with: None }
    }

    /// Legacy concatenated match-case string: the contributing key tokens
    /// joined in priority order, or `NONE` when no candidate matched.
    #[must_use]
    pub fn match_case(&self) -> String {
        if !self.matched || self.match_keys.is_empty() {
            return "NONE".to_string();
        }
        self.match_keys.iter().map(|key| key.as_str()).collect()
    }
}

pub type AccountMatch = MatchVerdict<AccountMatchKey, AccountRecord>;
pub type ContactMatch = MatchVerdict<ContactMatchKey, ContactRecord>;

/// Read-only record store seam. Candidate lookups return at most one
/// record, first by the store's own ordering.
pub trait RecordStore {
    /// Resolve an account by primary key.
    ///
    /// # Errors
    /// Returns [`StoreError`] carrying the backend failure unchanged.
    fn find_account(&self, account_id: AccountId) -> Result<Option<AccountRecord>, StoreError>;

    /// Resolve a contact by primary key.
    ///
    /// # Errors
    /// Returns [`StoreError`] carrying the backend failure unchanged.
    fn find_contact(&self, contact_id: ContactId) -> Result<Option<ContactRecord>, StoreError>;

    /// Find one canonical account matching any clause of the query.
    ///
    /// # Errors
    /// Returns [`StoreError`] carrying the backend failure unchanged.
    fn find_account_duplicate(
        &self,
        query: &AccountCandidateQuery,
    ) -> Result<Option<AccountRecord>, StoreError>;

    /// Find one canonical contact matching any clause of the query.
    ///
    /// # Errors
    /// Returns [`StoreError`] carrying the backend failure unchanged.
    fn find_contact_duplicate(
        &self,
        query: &ContactCandidateQuery,
    ) -> Result<Option<ContactRecord>, StoreError>;

    /// Find one suppression-list account matching any clause of the query.
    ///
    /// # Errors
    /// Returns [`StoreError`] carrying the backend failure unchanged.
    fn find_account_suppression(
        &self,
        query: &AccountCandidateQuery,
    ) -> Result<Option<AccountRecord>, StoreError>;

    /// Find one suppression-list contact matching any clause of the query.
    ///
    /// # Errors
    /// Returns [`StoreError`] carrying the backend failure unchanged.
    fn find_contact_suppression(
        &self,
        query: &ContactCandidateQuery,
    ) -> Result<Option<ContactRecord>, StoreError>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn find_account(&self, account_id: AccountId) -> Result<Option<AccountRecord>, StoreError> {
        (**self).find_account(account_id)
    }

    fn find_contact(&self, contact_id: ContactId) -> Result<Option<ContactRecord>, StoreError> {
        (**self).find_contact(contact_id)
    }

    fn find_account_duplicate(
        &self,
        query: &AccountCandidateQuery,
    ) -> Result<Option<AccountRecord>, StoreError> {
        (**self).find_account_duplicate(query)
    }

    fn find_contact_duplicate(
        &self,
        query: &ContactCandidateQuery,
    ) -> Result<Option<ContactRecord>, StoreError> {
        (**self).find_contact_duplicate(query)
    }

    fn find_account_suppression(
        &self,
        query: &AccountCandidateQuery,
    ) -> Result<Option<AccountRecord>, StoreError> {
        (**self).find_account_suppression(query)
    }

    fn find_contact_suppression(
        &self,
        query: &ContactCandidateQuery,
    ) -> Result<Option<ContactRecord>, StoreError> {
        (**self).find_contact_suppression(query)
    }
}

/// Resolves an account by id; missing ids are a precondition violation,
/// not a store failure.
#[derive(Debug, Clone)]
pub struct AccountFinder<S> {
    store: S,
}

impl<S: RecordStore> AccountFinder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// # Errors
    /// Returns [`CheckError::MissingId`] when no id is supplied; store
    /// failures propagate unchanged. An unknown id is `Ok(None)`.
    pub fn find(&self, account_id: Option<AccountId>) -> Result<Option<AccountRecord>, CheckError> {
        let account_id = account_id.ok_or(CheckError::MissingId("account_id"))?;
        Ok(self.store.find_account(account_id)?)
    }
}

#[derive(Debug, Clone)]
pub struct ContactFinder<S> {
    store: S,
}

impl<S: RecordStore> ContactFinder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// # Errors
    /// Returns [`CheckError::MissingId`] when no id is supplied; store
    /// failures propagate unchanged. An unknown id is `Ok(None)`.
    pub fn find(&self, contact_id: Option<ContactId>) -> Result<Option<ContactRecord>, CheckError> {
        let contact_id = contact_id.ok_or(CheckError::MissingId("contact_id"))?;
        Ok(self.store.find_contact(contact_id)?)
    }
}

/// Searches active records for an existing canonical duplicate of the
/// input record.
#[derive(Debug, Clone)]
pub struct DuplicateChecker<S> {
    store: S,
}

impl<S: RecordStore> DuplicateChecker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// `Ok(None)` means no check was performed (no input record). With an
    /// input, one OR query is issued over all populated identity keys,
    /// scoped to the record's project, excluding the record itself and any
    /// candidate already flagged as a duplicate.
    ///
    /// # Errors
    /// Store failures propagate unchanged; there is no retry.
    pub fn find_account_duplicate(
        &self,
        account: Option<&AccountRecord>,
    ) -> Result<Option<AccountMatch>, StoreError> {
        let Some(account) = account else {
            return Ok(None);
        };

        let clauses = account.identity.clauses();
        if clauses.is_empty() {
            return Ok(Some(AccountMatch::none()));
        }

        let match_keys = clauses.iter().map(|clause| clause.key).collect();
        let query = CandidateQuery {
            project_id: account.project_id,
            exclude_id: Some(account.account_id),
            clauses,
        };
        let candidate = self.store.find_account_duplicate(&query)?;

        Ok(Some(MatchVerdict { matched: candidate.is_some(), match_keys, matched_with: candidate }))
    }

    /// Contact analog of [`Self::find_account_duplicate`].
    ///
    /// # Errors
    /// Store failures propagate unchanged; there is no retry.
    pub fn find_contact_duplicate(
        &self,
        contact: Option<&ContactRecord>,
    ) -> Result<Option<ContactMatch>, StoreError> {
        let Some(contact) = contact else {
            return Ok(None);
        };

        let clauses = contact.identity.clauses();
        if clauses.is_empty() {
            return Ok(Some(ContactMatch::none()));
        }

        let match_keys = clauses.iter().map(|clause| clause.key).collect();
        let query = CandidateQuery {
            project_id: contact.project_id,
            exclude_id: Some(contact.contact_id),
            clauses,
        };
        let candidate = self.store.find_contact_duplicate(&query)?;

        Ok(Some(MatchVerdict { matched: candidate.is_some(), match_keys, matched_with: candidate }))
    }
}

/// Searches the suppression list with the same identity keys as the
/// duplicate checker. Suppression entries are a separate data set, so no
/// self-exclusion applies.
#[derive(Debug, Clone)]
pub struct SuppressionChecker<S> {
    store: S,
}

impl<S: RecordStore> SuppressionChecker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// # Errors
    /// Store failures propagate unchanged; there is no retry.
    pub fn find_account_suppression(
        &self,
        account: Option<&AccountRecord>,
    ) -> Result<Option<AccountMatch>, StoreError> {
        let Some(account) = account else {
            return Ok(None);
        };

        let clauses = account.identity.clauses();
        if clauses.is_empty() {
            return Ok(Some(AccountMatch::none()));
        }

        let match_keys = clauses.iter().map(|clause| clause.key).collect();
        let query =
            CandidateQuery { project_id: account.project_id, exclude_id: None, clauses };
        let candidate = self.store.find_account_suppression(&query)?;

        Ok(Some(MatchVerdict { matched: candidate.is_some(), match_keys, matched_with: candidate }))
    }

    /// # Errors
    /// Store failures propagate unchanged; there is no retry.
    pub fn find_contact_suppression(
        &self,
        contact: Option<&ContactRecord>,
    ) -> Result<Option<ContactMatch>, StoreError> {
        let Some(contact) = contact else {
            return Ok(None);
        };

        let clauses = contact.identity.clauses();
        if clauses.is_empty() {
            return Ok(Some(ContactMatch::none()));
        }

        let match_keys = clauses.iter().map(|clause| clause.key).collect();
        let query =
            CandidateQuery { project_id: contact.project_id, exclude_id: None, clauses };
        let candidate = self.store.find_contact_suppression(&query)?;

        Ok(Some(MatchVerdict { matched: candidate.is_some(), match_keys, matched_with: candidate }))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct CheckOptions {
    pub check_duplicate: bool,
    pub check_suppression: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct LabeledAccount {
    pub account_id: AccountId,
    pub label: Option<RecordLabel>,
    pub duplicate_of: Option<AccountId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct LabeledContact {
    pub contact_id: ContactId,
    pub label: RecordLabel,
    pub duplicate_of: Option<ContactId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountCheckOutcome {
    pub labeled_account: LabeledAccount,
    pub duplicate: AccountMatch,
    pub suppression: AccountMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactCheckOutcome {
    pub labeled_contact: LabeledContact,
    pub duplicate: ContactMatch,
    pub suppression: ContactMatch,
}

/// One-shot check pipeline: LOAD -> (DEDUPE | skip) -> (SUPPRESSION | skip)
/// -> LABEL. No state is retained between calls; each call is an
/// independent read-only snapshot of the store.
#[derive(Debug, Clone)]
pub struct CheckService<S> {
    store: S,
}

impl<S: RecordStore> CheckService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load the account, run the requested checks, and compute the label.
    /// Skipped checks contribute the defaulted NONE verdict. Suppression
    /// takes precedence over duplicate; accounts matched by neither carry
    /// no label.
    ///
    /// # Errors
    /// - [`CheckError::MissingId`] when no id is supplied.
    /// - [`CheckError::AccountNotFound`] when the finder resolves nothing.
    /// - [`CheckError::AccountDedupeCheck`] / [`CheckError::AccountSuppressionCheck`]
    ///   replacing any checker failure; no partial result is returned.
    pub fn check_account(
        &self,
        account_id: Option<AccountId>,
        options: CheckOptions,
    ) -> Result<AccountCheckOutcome, CheckError> {
        let account_id = account_id.ok_or(CheckError::MissingId("account_id"))?;
        let account = AccountFinder::new(&self.store)
            .find(Some(account_id))?
            .ok_or(CheckError::AccountNotFound(account_id))?;

        let duplicate = if options.check_duplicate {
            DuplicateChecker::new(&self.store)
                .find_account_duplicate(Some(&account))
                .map_err(|_| CheckError::AccountDedupeCheck)?
                .unwrap_or_else(AccountMatch::none)
        } else {
            AccountMatch::none()
        };

        let suppression = if options.check_suppression {
            SuppressionChecker::new(&self.store)
                .find_account_suppression(Some(&account))
                .map_err(|_| CheckError::AccountSuppressionCheck)?
                .unwrap_or_else(AccountMatch::none)
        } else {
            AccountMatch::none()
        };

        let label = if suppression.matched {
            Some(RecordLabel::Suppressed)
        } else if duplicate.matched {
            Some(RecordLabel::Duplicate)
        } else {
            None
        };
        let duplicate_of = if label == Some(RecordLabel::Duplicate) {
            duplicate.matched_with.as_ref().map(|candidate| candidate.account_id)
        } else {
            None
        };

        Ok(AccountCheckOutcome {
            labeled_account: LabeledAccount { account_id: account.account_id, label, duplicate_of },
            duplicate,
            suppression,
        })
    }

    /// Contact analog of [`Self::check_account`]. Contacts matched by
    /// neither check default to the `inclusion` label.
    ///
    /// # Errors
    /// Mirrors [`Self::check_account`] with the contact error variants.
    pub fn check_contact(
        &self,
        contact_id: Option<ContactId>,
        options: CheckOptions,
    ) -> Result<ContactCheckOutcome, CheckError> {
        let contact_id = contact_id.ok_or(CheckError::MissingId("contact_id"))?;
        let contact = ContactFinder::new(&self.store)
            .find(Some(contact_id))?
            .ok_or(CheckError::ContactNotFound(contact_id))?;

        let duplicate = if options.check_duplicate {
            DuplicateChecker::new(&self.store)
                .find_contact_duplicate(Some(&contact))
                .map_err(|_| CheckError::ContactDedupeCheck)?
                .unwrap_or_else(ContactMatch::none)
        } else {
            ContactMatch::none()
        };

        let suppression = if options.check_suppression {
            SuppressionChecker::new(&self.store)
                .find_contact_suppression(Some(&contact))
                .map_err(|_| CheckError::ContactSuppressionCheck)?
                .unwrap_or_else(ContactMatch::none)
        } else {
            ContactMatch::none()
        };

        let label = if suppression.matched {
            RecordLabel::Suppressed
        } else if duplicate.matched {
            RecordLabel::Duplicate
        } else {
            RecordLabel::Inclusion
        };
        let duplicate_of = if label == RecordLabel::Duplicate {
            duplicate.matched_with.as_ref().map(|candidate| candidate.contact_id)
        } else {
            None
        };

        Ok(ContactCheckOutcome {
            labeled_contact: LabeledContact { contact_id: contact.contact_id, label, duplicate_of },
            duplicate,
            suppression,
        })
    }
}
