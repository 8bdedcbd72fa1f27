use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::directory::{DirectoryError, ProfileDirectory, UserId, VerificationStatus};

use super::domain::{
    AccessLevel, AppealId, AppealStatus, ApplicationId, ApplicationStatus, ApplicationType,
    ChecklistSubmission, DocumentId, DocumentUpload, VerificationAppeal, VerificationApplication,
    VerificationChecklist, VerificationDocument,
};
use super::repository::{
    DocumentVault, StatusChange, VaultError, VerificationStore, VerificationStoreError,
};

/// Bucket holding uploaded verification documents.
const DOCUMENT_BUCKET: &str = "verification-documents";

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static APPEAL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("vapp-{id:06}"))
}

fn next_document_id() -> DocumentId {
    let id = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentId(format!("doc-{id:06}"))
}

fn next_appeal_id() -> AppealId {
    let id = APPEAL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AppealId(format!("apl-{id:06}"))
}

/// Service owning the verification application lifecycle: submission,
/// document intake, admin review, the approve/reject decision, and appeals.
pub struct VerificationEngine<S, V, P> {
    store: Arc<S>,
    vault: Arc<V>,
    directory: Arc<P>,
}

impl<S, V, P> VerificationEngine<S, V, P>
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
{
    pub fn new(store: Arc<S>, vault: Arc<V>, directory: Arc<P>) -> Self {
        Self {
            store,
            vault,
            directory,
        }
    }

    /// Opens a new application unless the user already holds an active or
    /// approved one.
    pub fn submit_application(
        &self,
        user_id: &UserId,
        application_type: ApplicationType,
    ) -> Result<VerificationApplication, VerificationError> {
        let application = VerificationApplication {
            id: next_application_id(),
            user_id: user_id.clone(),
            application_type,
            status: ApplicationStatus::Submitted,
            rejection_reason: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        };

        // The active-application check lives inside the store's insert so two
        // racing submissions cannot both pass it.
        let stored = match self.store.insert_application(application) {
            Ok(stored) => stored,
            Err(VerificationStoreError::ActiveApplicationExists) => {
                return Err(VerificationError::ActiveApplicationExists {
                    user_id: user_id.clone(),
                })
            }
            Err(other) => return Err(other.into()),
        };
        info!(
            application = %stored.id.0,
            user = %stored.user_id.0,
            kind = stored.application_type.label(),
            "verification application submitted"
        );
        Ok(stored)
    }

    /// Owner-scoped read. A row that exists but belongs to someone else is
    /// reported exactly like a missing row.
    pub fn get_application(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
    ) -> Result<VerificationApplication, VerificationError> {
        self.store
            .fetch_owned_application(user_id, application_id)?
            .ok_or(VerificationError::NotFoundOrAccessDenied)
    }

    /// Stores the binary in the vault under a user/application namespaced
    /// path, then records the document row.
    pub fn upload_document(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
        upload: DocumentUpload,
    ) -> Result<VerificationDocument, VerificationError> {
        let application = self.get_application(user_id, application_id)?;

        let file_path = format!(
            "{}/{}/{}/{}",
            DOCUMENT_BUCKET, user_id.0, application.id.0, upload.file_name
        );

        let mime_type = upload.content_type.unwrap_or_else(|| {
            mime_guess::from_path(&upload.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });

        self.vault.store(&file_path, &upload.bytes, &mime_type)?;

        let document = VerificationDocument {
            id: next_document_id(),
            application_id: application.id.clone(),
            document_type: upload.document_type,
            file_path,
            file_name: upload.file_name,
            mime_type,
            file_size: upload.bytes.len(),
            uploaded_at: Utc::now(),
        };

        let stored = self.store.insert_document(document)?;
        info!(
            application = %application.id.0,
            document = %stored.id.0,
            size = stored.file_size,
            "verification document uploaded"
        );
        Ok(stored)
    }

    /// Moves a rejected application to `appealing` and records the appeal.
    /// Any other current status is a business-rule violation.
    pub fn submit_appeal(
        &self,
        user_id: &UserId,
        application_id: &ApplicationId,
        appeal_reason: String,
    ) -> Result<VerificationAppeal, VerificationError> {
        let application = self.get_application(user_id, application_id)?;

        if application.status != ApplicationStatus::Rejected {
            return Err(VerificationError::NotRejected);
        }

        self.store.transition_status(
            &application.id,
            &[ApplicationStatus::Rejected],
            StatusChange {
                to: ApplicationStatus::Appealing,
                rejection_reason: application.rejection_reason.clone(),
                reviewed_at: application.reviewed_at,
            },
        )?;

        let appeal = VerificationAppeal {
            id: next_appeal_id(),
            application_id: application.id.clone(),
            user_id: user_id.clone(),
            appeal_reason,
            status: AppealStatus::Submitted,
            submitted_at: Utc::now(),
        };

        let stored = self.store.insert_appeal(appeal)?;
        info!(
            application = %application.id.0,
            appeal = %stored.id.0,
            "verification appeal submitted"
        );
        Ok(stored)
    }

    /// Admin queue: applications awaiting a first look.
    pub fn pending_applications(
        &self,
    ) -> Result<Vec<VerificationApplication>, VerificationError> {
        Ok(self.store.pending_applications()?)
    }

    /// Admin queue: appeals awaiting external resolution.
    pub fn pending_appeals(&self) -> Result<Vec<VerificationAppeal>, VerificationError> {
        Ok(self.store.pending_appeals()?)
    }

    /// Records (or overwrites) the review checklist for an application.
    /// Does not change application status; that happens at approve/reject.
    pub fn review_application(
        &self,
        admin_id: &UserId,
        application_id: &ApplicationId,
        submission: ChecklistSubmission,
    ) -> Result<VerificationChecklist, VerificationError> {
        let application = self
            .store
            .fetch_application(application_id)?
            .ok_or(VerificationError::ApplicationNotFound)?;

        let checklist = VerificationChecklist {
            application_id: application.id.clone(),
            reviewed_by: admin_id.clone(),
            identity_verified: submission.identity_verified,
            income_verified: submission.income_verified,
            address_verified: submission.address_verified,
            banking_verified: submission.banking_verified,
            background_check_passed: submission.background_check_passed,
            notes: submission.notes,
            completed_at: Utc::now(),
        };

        let stored = self.store.upsert_checklist(checklist)?;
        info!(
            application = %application.id.0,
            admin = %admin_id.0,
            "verification checklist recorded"
        );
        Ok(stored)
    }

    /// Approves an application: requires a completed checklist, moves the
    /// status, then grants the tier on the owning profile.
    pub fn approve_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<VerificationApplication, VerificationError> {
        let application = self
            .store
            .fetch_application(application_id)?
            .ok_or(VerificationError::ApplicationNotFound)?;

        if self.store.fetch_checklist(&application.id)?.is_none() {
            return Err(VerificationError::ChecklistMissing);
        }

        let approved = self.store.transition_status(
            &application.id,
            &[ApplicationStatus::Submitted, ApplicationStatus::UnderReview, ApplicationStatus::Appealing],
            StatusChange {
                to: ApplicationStatus::Approved,
                rejection_reason: None,
                reviewed_at: Some(Utc::now()),
            },
        )?;

        self.directory.set_verification(
            &approved.user_id,
            approved.application_type.granted_tier(),
            VerificationStatus::Verified,
        )?;

        info!(
            application = %approved.id.0,
            user = %approved.user_id.0,
            tier = approved.application_type.granted_tier().label(),
            "verification application approved"
        );
        Ok(approved)
    }

    /// Rejects an application still open for review. Approved or already
    /// rejected applications cannot be rejected again.
    pub fn reject_application(
        &self,
        application_id: &ApplicationId,
        rejection_reason: String,
    ) -> Result<VerificationApplication, VerificationError> {
        let application = self
            .store
            .fetch_application(application_id)?
            .ok_or(VerificationError::ApplicationNotFound)?;

        let rejected = self.store.transition_status(
            &application.id,
            &[ApplicationStatus::Submitted, ApplicationStatus::UnderReview, ApplicationStatus::Appealing],
            StatusChange {
                to: ApplicationStatus::Rejected,
                rejection_reason: Some(rejection_reason),
                reviewed_at: Some(Utc::now()),
            },
        )?;

        info!(
            application = %rejected.id.0,
            user = %rejected.user_id.0,
            "verification application rejected"
        );
        Ok(rejected)
    }

    /// Tier-derived read model for the marketplace surface.
    pub fn access_level(&self, user_id: &UserId) -> Result<AccessLevel, VerificationError> {
        let profile = self
            .directory
            .fetch(user_id)?
            .ok_or(VerificationError::ProfileMissing)?;

        let tier = profile.verification_tier;
        Ok(AccessLevel {
            user_id: user_id.clone(),
            verification_tier: tier,
            can_sell: tier >= crate::directory::VerificationTier::Basic,
            bidding_ceiling: tier,
        })
    }
}

/// Error raised by the verification engine.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error(
        "User {user_id} already has an active or approved verification application.",
        user_id = .user_id.0
    )]
    ActiveApplicationExists { user_id: UserId },
    #[error("Application not found or access denied.")]
    NotFoundOrAccessDenied,
    #[error("Application not found.")]
    ApplicationNotFound,
    #[error("Only rejected applications can be appealed.")]
    NotRejected,
    #[error("Application cannot be approved without a completed review checklist.")]
    ChecklistMissing,
    #[error("Application status does not allow this transition (current status: {from}).", from = .from.label())]
    InvalidTransition { from: ApplicationStatus },
    #[error("User profile not found.")]
    ProfileMissing,
    #[error(transparent)]
    Store(VerificationStoreError),
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<VerificationStoreError> for VerificationError {
    fn from(value: VerificationStoreError) -> Self {
        match value {
            VerificationStoreError::NotFound => VerificationError::ApplicationNotFound,
            VerificationStoreError::InvalidTransition { from } => {
                VerificationError::InvalidTransition { from }
            }
            other => VerificationError::Store(other),
        }
    }
}
