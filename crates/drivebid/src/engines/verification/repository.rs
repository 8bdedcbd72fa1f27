use chrono::{DateTime, Utc};

use crate::directory::UserId;

use super::domain::{
    ApplicationId, ApplicationStatus, VerificationAppeal, VerificationApplication,
    VerificationChecklist, VerificationDocument,
};

/// The status write applied by a compare-and-set transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub to: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Storage abstraction over the verification tables.
///
/// Status writes go through `transition_status`, a compare-and-set keyed on
/// the allowed source states, so one-time transitions hold under concurrent
/// admin actions.
pub trait VerificationStore: Send + Sync {
    /// Inserts the row iff the user holds no application in
    /// {submitted, under_review, approved}. The check and the insert are one
    /// atomic unit; a second insert racing the first fails with
    /// `ActiveApplicationExists`.
    fn insert_application(
        &self,
        application: VerificationApplication,
    ) -> Result<VerificationApplication, VerificationStoreError>;

    /// Existence and ownership are checked together: a row owned by someone
    /// else reads the same as a missing row.
    fn fetch_owned_application(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
    ) -> Result<Option<VerificationApplication>, VerificationStoreError>;

    fn fetch_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<VerificationApplication>, VerificationStoreError>;

    /// All applications awaiting a first admin look (status == submitted).
    fn pending_applications(
        &self,
    ) -> Result<Vec<VerificationApplication>, VerificationStoreError>;

    /// Applies `change` iff the current status is in `allowed_from`, returning
    /// the updated row. Fails with `InvalidTransition` otherwise, leaving the
    /// row untouched.
    fn transition_status(
        &self,
        application_id: &ApplicationId,
        allowed_from: &[ApplicationStatus],
        change: StatusChange,
    ) -> Result<VerificationApplication, VerificationStoreError>;

    /// At most one live checklist per application; a later submission
    /// overwrites the earlier one.
    fn upsert_checklist(
        &self,
        checklist: VerificationChecklist,
    ) -> Result<VerificationChecklist, VerificationStoreError>;

    fn fetch_checklist(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<VerificationChecklist>, VerificationStoreError>;

    fn insert_document(
        &self,
        document: VerificationDocument,
    ) -> Result<VerificationDocument, VerificationStoreError>;

    fn insert_appeal(
        &self,
        appeal: VerificationAppeal,
    ) -> Result<VerificationAppeal, VerificationStoreError>;

    /// Appeals still awaiting external resolution (status == submitted).
    fn pending_appeals(&self) -> Result<Vec<VerificationAppeal>, VerificationStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VerificationStoreError {
    #[error("record already exists")]
    Conflict,
    #[error("user already has an active application")]
    ActiveApplicationExists,
    #[error("record not found")]
    NotFound,
    #[error("invalid status transition from {from}", from = .from.label())]
    InvalidTransition { from: ApplicationStatus },
    #[error("verification store unavailable: {0}")]
    Unavailable(String),
}

/// Capability that persists uploaded document binaries.
pub trait DocumentVault: Send + Sync {
    fn store(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), VaultError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("document vault unavailable: {0}")]
    Unavailable(String),
}
