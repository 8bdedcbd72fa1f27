//! Identity capability: resolves a bearer credential to a user and, for the
//! admin surface, checks the profile role against the staff gate.
//!
//! Engine operations take the resolved identity as an explicit argument; there
//! is no ambient request context to read it from.

use std::sync::Arc;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::directory::{DirectoryError, ProfileDirectory, Role, UserId};

/// The authenticated caller attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: UserId,
}

/// Capability that validates a raw bearer token with the auth provider.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, TokenError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid or expired token")]
    Invalid,
    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while resolving or authorizing a caller.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Authorization header is missing")]
    MissingHeader,
    #[error("Invalid Authorization header format. Expected 'Bearer <token>'")]
    MalformedHeader,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("User profile not found, cannot verify role")]
    ProfileMissing,
    #[error("Administrator or staff access required")]
    InsufficientRole,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let status = match self {
            IdentityError::MissingHeader
            | IdentityError::MalformedHeader
            | IdentityError::InvalidToken => StatusCode::UNAUTHORIZED,
            IdentityError::InsufficientRole => StatusCode::FORBIDDEN,
            IdentityError::ProfileMissing => StatusCode::NOT_FOUND,
            IdentityError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            IdentityError::Unavailable(detail) => json!({
                "message": "An unexpected error occurred",
                "error": detail,
            }),
            other => json!({ "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, IdentityError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .ok_or(IdentityError::MissingHeader)?
        .to_str()
        .map_err(|_| IdentityError::MalformedHeader)?;

    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(IdentityError::MalformedHeader),
    }
}

/// Composes a token verifier with the profile directory so routers can run
/// both capability checks from the request headers.
pub struct Authenticator<T, P> {
    verifier: Arc<T>,
    directory: Arc<P>,
}

impl<T, P> Authenticator<T, P>
where
    T: TokenVerifier,
    P: ProfileDirectory,
{
    pub fn new(verifier: Arc<T>, directory: Arc<P>) -> Self {
        Self {
            verifier,
            directory,
        }
    }

    /// Resolves the bearer credential to a user identity.
    pub fn identify(&self, headers: &HeaderMap) -> Result<Identity, IdentityError> {
        let token = bearer_token(headers)?;
        self.verifier.verify(token).map_err(|err| match err {
            TokenError::Invalid => IdentityError::InvalidToken,
            TokenError::Unavailable(detail) => IdentityError::Unavailable(detail),
        })
    }

    /// `identify` plus the admin/manager/staff role requirement.
    pub fn require_staff(&self, headers: &HeaderMap) -> Result<Identity, IdentityError> {
        let identity = self.identify(headers)?;

        let profile = self
            .directory
            .fetch(&identity.user_id)
            .map_err(|err| match err {
                DirectoryError::NotFound => IdentityError::ProfileMissing,
                DirectoryError::Unavailable(detail) => IdentityError::Unavailable(detail),
            })?
            .ok_or(IdentityError::ProfileMissing)?;

        if !profile.role.is_staff() {
            return Err(IdentityError::InsufficientRole);
        }

        Ok(identity)
    }
}
