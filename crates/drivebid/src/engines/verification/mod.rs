//! Verification engine: the KYC-style application lifecycle gating bidding
//! and selling privileges.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{
    AccessLevel, AppealId, AppealStatus, ApplicationId, ApplicationStatus, ApplicationType,
    ChecklistSubmission, DocumentId, DocumentUpload, VerificationAppeal, VerificationApplication,
    VerificationChecklist, VerificationDocument,
};
pub use repository::{
    DocumentVault, StatusChange, VaultError, VerificationStore, VerificationStoreError,
};
pub use router::{verification_router, VerificationRouterState};
pub use service::{VerificationEngine, VerificationError};
