use super::*;

pub async fn list_principals_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<PrincipalResponse>>> {
    let principals = state
        .principal_service
        .list_principals(&user)
        .await?
        .into_iter()
        .map(PrincipalResponse::from)
        .collect();

    Ok(Json(principals))
}

pub async fn create_principal_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreatePrincipalRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let principal_id = state
        .principal_service
        .create_principal(
            &user,
            cambo_application::CreatePrincipalInput {
                display_name: payload.display_name,
                email: payload.email,
                password: payload.password,
                roles: payload.roles,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: principal_id.to_string(),
        }),
    ))
}

pub async fn list_role_assignments_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let assignments = state
        .role_admin_service
        .list_role_assignments(&user)
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn assign_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<RoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .assign_roles(
            &user,
            PrincipalId::from_uuid(payload.principal_id),
            &payload.roles,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unassign_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<RoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .unassign_roles(
            &user,
            PrincipalId::from_uuid(payload.principal_id),
            &payload.roles,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn sync_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<RoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .sync_roles(
            &user,
            PrincipalId::from_uuid(payload.principal_id),
            &payload.roles,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
