use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::directory::ProfileDirectory;
use crate::identity::{Authenticator, TokenVerifier};

use super::domain::{ApplicationId, ApplicationType, ChecklistSubmission, DocumentUpload};
use super::repository::{DocumentVault, VerificationStore};
use super::service::{VerificationEngine, VerificationError};

/// Shared state for the verification endpoints.
pub struct VerificationRouterState<S, V, P, T> {
    pub engine: Arc<VerificationEngine<S, V, P>>,
    pub auth: Arc<Authenticator<T, P>>,
}

impl<S, V, P, T> Clone for VerificationRouterState<S, V, P, T> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            auth: Arc::clone(&self.auth),
        }
    }
}

/// Router builder for the user-facing and admin verification surface.
pub fn verification_router<S, V, P, T>(state: VerificationRouterState<S, V, P, T>) -> Router
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    Router::new()
        .route(
            "/verification/applications",
            post(submit_application_handler::<S, V, P, T>),
        )
        .route(
            "/verification/applications/:id",
            get(get_application_handler::<S, V, P, T>),
        )
        .route(
            "/verification/documents/:app_id",
            post(upload_document_handler::<S, V, P, T>),
        )
        .route(
            "/verification/appeals/:app_id",
            post(submit_appeal_handler::<S, V, P, T>),
        )
        .route(
            "/admin/verification/pending",
            get(pending_applications_handler::<S, V, P, T>),
        )
        .route(
            "/admin/verification/appeals",
            get(pending_appeals_handler::<S, V, P, T>),
        )
        .route(
            "/admin/verification/:id/review",
            post(review_application_handler::<S, V, P, T>),
        )
        .route(
            "/admin/verification/:id/approve",
            post(approve_application_handler::<S, V, P, T>),
        )
        .route(
            "/admin/verification/:id/reject",
            post(reject_application_handler::<S, V, P, T>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitApplicationRequest {
    pub(crate) application_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitAppealRequest {
    pub(crate) appeal_reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectApplicationRequest {
    pub(crate) rejection_reason: String,
}

pub(crate) async fn submit_application_handler<S, V, P, T>(
    State(state): State<VerificationRouterState<S, V, P, T>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<SubmitApplicationRequest>,
) -> Response
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    let caller = match state.auth.identify(&headers) {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    let Some(application_type) = ApplicationType::parse(&payload.application_type) else {
        let payload = json!({ "message": "Invalid application_type" });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    match state
        .engine
        .submit_application(&caller.user_id, application_type)
    {
        Ok(application) => (StatusCode::CREATED, axum::Json(application)).into_response(),
        Err(err @ VerificationError::ActiveApplicationExists { .. }) => {
            let payload = json!({ "message": err.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => verification_error_response(other),
    }
}

pub(crate) async fn get_application_handler<S, V, P, T>(
    State(state): State<VerificationRouterState<S, V, P, T>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    let caller = match state.auth.identify(&headers) {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    match state
        .engine
        .get_application(&caller.user_id, &ApplicationId(application_id))
    {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => verification_error_response(err),
    }
}

pub(crate) async fn upload_document_handler<S, V, P, T>(
    State(state): State<VerificationRouterState<S, V, P, T>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    mut multipart: Multipart,
) -> Response
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    let caller = match state.auth.identify(&headers) {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut document_type: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let payload = json!({ "message": format!("Malformed multipart body: {err}") });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        };

        match field.name() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string).unwrap_or_default();
                let content_type = field.content_type().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => file = Some((file_name, content_type, bytes.to_vec())),
                    Err(err) => {
                        let payload =
                            json!({ "message": format!("Failed to read file part: {err}") });
                        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
                    }
                }
            }
            Some("document_type") => match field.text().await {
                Ok(text) => document_type = Some(text),
                Err(err) => {
                    let payload =
                        json!({ "message": format!("Failed to read document_type: {err}") });
                    return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
                }
            },
            _ => {}
        }
    }

    let Some((file_name, content_type, bytes)) = file else {
        let payload = json!({ "message": "No file part in the request" });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };
    if file_name.is_empty() {
        let payload = json!({ "message": "No selected file" });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    }
    let Some(document_type) = document_type else {
        let payload = json!({ "message": "document_type is required" });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    let upload = DocumentUpload {
        file_name,
        document_type,
        content_type,
        bytes,
    };

    match state
        .engine
        .upload_document(&caller.user_id, &ApplicationId(application_id), upload)
    {
        Ok(document) => (StatusCode::CREATED, axum::Json(document)).into_response(),
        Err(err) => verification_error_response(err),
    }
}

pub(crate) async fn submit_appeal_handler<S, V, P, T>(
    State(state): State<VerificationRouterState<S, V, P, T>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<SubmitAppealRequest>,
) -> Response
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    let caller = match state.auth.identify(&headers) {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    match state.engine.submit_appeal(
        &caller.user_id,
        &ApplicationId(application_id),
        payload.appeal_reason,
    ) {
        Ok(appeal) => (StatusCode::CREATED, axum::Json(appeal)).into_response(),
        // The appeal endpoint reports ownership failures as a bad request
        // alongside the not-rejected rule.
        Err(err @ (VerificationError::NotFoundOrAccessDenied | VerificationError::NotRejected)) => {
            let payload = json!({ "message": err.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(other) => verification_error_response(other),
    }
}

pub(crate) async fn pending_applications_handler<S, V, P, T>(
    State(state): State<VerificationRouterState<S, V, P, T>>,
    headers: HeaderMap,
) -> Response
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    if let Err(err) = state.auth.require_staff(&headers) {
        return err.into_response();
    }

    match state.engine.pending_applications() {
        Ok(applications) => (StatusCode::OK, axum::Json(applications)).into_response(),
        Err(err) => verification_error_response(err),
    }
}

pub(crate) async fn pending_appeals_handler<S, V, P, T>(
    State(state): State<VerificationRouterState<S, V, P, T>>,
    headers: HeaderMap,
) -> Response
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    if let Err(err) = state.auth.require_staff(&headers) {
        return err.into_response();
    }

    match state.engine.pending_appeals() {
        Ok(appeals) => (StatusCode::OK, axum::Json(appeals)).into_response(),
        Err(err) => verification_error_response(err),
    }
}

pub(crate) async fn review_application_handler<S, V, P, T>(
    State(state): State<VerificationRouterState<S, V, P, T>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(submission): axum::Json<ChecklistSubmission>,
) -> Response
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    let admin = match state.auth.require_staff(&headers) {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    match state.engine.review_application(
        &admin.user_id,
        &ApplicationId(application_id),
        submission,
    ) {
        Ok(checklist) => (StatusCode::OK, axum::Json(checklist)).into_response(),
        Err(err) => verification_error_response(err),
    }
}

pub(crate) async fn approve_application_handler<S, V, P, T>(
    State(state): State<VerificationRouterState<S, V, P, T>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    if let Err(err) = state.auth.require_staff(&headers) {
        return err.into_response();
    }

    match state
        .engine
        .approve_application(&ApplicationId(application_id))
    {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => verification_error_response(err),
    }
}

pub(crate) async fn reject_application_handler<S, V, P, T>(
    State(state): State<VerificationRouterState<S, V, P, T>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<RejectApplicationRequest>,
) -> Response
where
    S: VerificationStore + 'static,
    V: DocumentVault + 'static,
    P: ProfileDirectory + 'static,
    T: TokenVerifier + 'static,
{
    if let Err(err) = state.auth.require_staff(&headers) {
        return err.into_response();
    }

    match state
        .engine
        .reject_application(&ApplicationId(application_id), payload.rejection_reason)
    {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => verification_error_response(err),
    }
}

fn verification_error_response(err: VerificationError) -> Response {
    match err {
        VerificationError::ActiveApplicationExists { .. } => {
            let payload = json!({ "message": err.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        VerificationError::NotFoundOrAccessDenied
        | VerificationError::ApplicationNotFound
        | VerificationError::ProfileMissing => {
            let payload = json!({ "message": err.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        VerificationError::NotRejected
        | VerificationError::ChecklistMissing
        | VerificationError::InvalidTransition { .. } => {
            let payload = json!({ "message": err.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({
                "message": "An unexpected error occurred",
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
