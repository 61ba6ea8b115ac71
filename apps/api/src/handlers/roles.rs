use super::*;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_admin_service
        .list_roles(&user)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_admin_service
        .create_role(
            &user,
            cambo_application::CreateRoleInput {
                slug: payload.slug,
                name: payload.name,
                description: payload.description,
                permissions: payload.permissions,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleSummaryResponse>> {
    let role = state
        .role_admin_service
        .update_role(
            &user,
            slug.as_str(),
            cambo_application::UpdateRoleInput {
                name: payload.name,
                description: payload.description,
                permissions: payload.permissions,
            },
        )
        .await?;

    Ok(Json(RoleSummaryResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .delete_role(&user, slug.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn default_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Option<RoleSummaryResponse>>> {
    let role = state
        .role_admin_service
        .default_role(&user)
        .await?
        .map(RoleSummaryResponse::from);

    Ok(Json(role))
}

pub async fn set_default_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<SetDefaultRoleRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .set_default_role(&user, payload.slug.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_role_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(slug): Path<String>,
    Json(payload): Json<PermissionSlugsRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .grant_permissions(&user, slug.as_str(), &payload.permissions)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_role_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(slug): Path<String>,
    Json(payload): Json<PermissionSlugsRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .revoke_permissions(&user, slug.as_str(), &payload.permissions)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn sync_role_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(slug): Path<String>,
    Json(payload): Json<PermissionSlugsRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .sync_permissions(&user, slug.as_str(), &payload.permissions)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
