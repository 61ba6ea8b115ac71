use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use cambo_application::AuthOutcome;
use cambo_core::{AppError, UserIdentity};
use cambo_domain::PrincipalId;
use tower_sessions::Session;

use crate::dto::{LoginRequest, UserIdentityResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub const SESSION_USER_KEY: &str = "user_identity";

/// POST /auth/login - Authenticate with email+password.
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<UserIdentityResponse>> {
    let outcome = state
        .principal_service
        .login(&payload.email, &payload.password)
        .await?;

    let principal = match outcome {
        AuthOutcome::Authenticated(principal) => principal,
        AuthOutcome::Failed => {
            return Err(AppError::Unauthorized("invalid email or password".to_owned()).into());
        }
    };

    let identity = UserIdentity::new(
        principal.id.as_uuid(),
        principal.display_name,
        principal.email,
    );

    // A fresh session id prevents fixation across the login boundary.
    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to cycle session id: {error}")))?;
    session
        .insert(SESSION_USER_KEY, identity.clone())
        .await
        .map_err(|error| AppError::Internal(format!("failed to store session identity: {error}")))?;

    let permissions = state
        .authorization_service
        .effective_permissions(PrincipalId::from_uuid(identity.subject()))
        .await?;

    Ok(Json(UserIdentityResponse::from_identity_with_permissions(
        identity,
        permissions,
    )))
}

pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me_handler(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<UserIdentityResponse>> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let permissions = state
        .authorization_service
        .effective_permissions(PrincipalId::from_uuid(identity.subject()))
        .await?;

    Ok(Json(UserIdentityResponse::from_identity_with_permissions(
        identity,
        permissions,
    )))
}
