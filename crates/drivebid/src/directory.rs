//! Profile directory capability.
//!
//! Profiles live in an externally managed table; the engines read them for
//! authorization and tier gating, and write the verification fields only as a
//! side effect of an approved application.

use serde::{Deserialize, Serialize};

/// Identifier wrapper for marketplace users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Role recorded on a profile. Everything above `Customer` clears the staff gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
    Manager,
    Staff,
}

impl Role {
    pub const fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Manager | Role::Staff)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
        }
    }
}

/// Ordered eligibility scale gating bidding and selling privileges.
///
/// The derived `Ord` follows declaration order, so `None < Basic < Premium`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VerificationTier {
    #[default]
    None,
    Basic,
    Premium,
}

impl VerificationTier {
    /// Auction eligibility gate: does this tier clear `required`?
    pub fn allows(self, required: VerificationTier) -> bool {
        self >= required
    }

    pub const fn label(self) -> &'static str {
        match self {
            VerificationTier::None => "none",
            VerificationTier::Basic => "basic",
            VerificationTier::Premium => "premium",
        }
    }
}

/// Label written next to the tier when an application is approved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Verified,
}

/// The slice of the externally owned profile row the engines care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub role: Role,
    pub verification_tier: VerificationTier,
    pub verification_status: VerificationStatus,
}

/// Read/write access to the profile table, kept narrow on purpose.
pub trait ProfileDirectory: Send + Sync {
    fn fetch(&self, user_id: &UserId) -> Result<Option<Profile>, DirectoryError>;

    /// Applied only when a verification application is approved.
    fn set_verification(
        &self,
        user_id: &UserId,
        tier: VerificationTier,
        status: VerificationStatus,
    ) -> Result<(), DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("profile not found")]
    NotFound,
    #[error("profile directory unavailable: {0}")]
    Unavailable(String),
}
