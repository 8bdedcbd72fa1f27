use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::{UserId, VerificationTier};

/// Identifier wrapper for verification applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for uploaded verification documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// Identifier wrapper for appeals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppealId(pub String);

/// Which eligibility tier the applicant is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationType {
    Basic,
    Premium,
}

impl ApplicationType {
    /// The label accepted on submission; anything else is a validation error.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(Self::Basic),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationType::Basic => "basic",
            ApplicationType::Premium => "premium",
        }
    }

    /// Tier granted to the profile when an application of this type is approved.
    pub const fn granted_tier(self) -> VerificationTier {
        match self {
            ApplicationType::Basic => VerificationTier::Basic,
            ApplicationType::Premium => VerificationTier::Premium,
        }
    }
}

/// Lifecycle of a verification application.
///
/// `Submitted` and `UnderReview` count as active alongside `Approved`; a user
/// may hold at most one application across those three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Appealing,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Appealing => "appealing",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Active states block a new submission for the same user.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Submitted
                | ApplicationStatus::UnderReview
                | ApplicationStatus::Approved
        )
    }

    /// States an admin decision (approve or reject) may move away from.
    pub const fn is_open_for_review(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Submitted
                | ApplicationStatus::UnderReview
                | ApplicationStatus::Appealing
        )
    }
}

/// A verification application row. `rejection_reason` is present iff rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationApplication {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub application_type: ApplicationType,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Record of one uploaded document. Immutable; never deleted by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDocument {
    pub id: DocumentId,
    pub application_id: ApplicationId,
    pub document_type: String,
    pub file_path: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// The binary and metadata handed to `upload_document`.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub document_type: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Admin sub-checks required before an application can be approved. Upserted,
/// so a second review submission overwrites the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChecklist {
    pub application_id: ApplicationId,
    pub reviewed_by: UserId,
    pub identity_verified: bool,
    pub income_verified: bool,
    pub address_verified: bool,
    pub banking_verified: bool,
    pub background_check_passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// The five sub-checks and notes as submitted by the reviewing admin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecklistSubmission {
    #[serde(default)]
    pub identity_verified: bool,
    #[serde(default)]
    pub income_verified: bool,
    #[serde(default)]
    pub address_verified: bool,
    #[serde(default)]
    pub banking_verified: bool,
    #[serde(default)]
    pub background_check_passed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Lifecycle of an appeal. Only `Submitted` is written by this core;
/// resolution happens in an external workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppealStatus {
    Submitted,
    Resolved,
}

/// An appeal raised against a rejected application. The row is created with
/// status `submitted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationAppeal {
    pub id: AppealId,
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub appeal_reason: String,
    pub status: AppealStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Tier-derived read model describing what a user can do on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessLevel {
    pub user_id: UserId,
    pub verification_tier: VerificationTier,
    pub can_sell: bool,
    pub bidding_ceiling: VerificationTier,
}
