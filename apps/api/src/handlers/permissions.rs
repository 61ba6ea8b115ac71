use super::*;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<BTreeMap<String, Vec<PermissionResponse>>>> {
    let permissions = state.role_admin_service.list_permissions(&user).await?;

    let grouped = group_permissions(permissions)
        .into_iter()
        .map(|(group, entries)| {
            (
                group,
                entries.into_iter().map(PermissionResponse::from).collect(),
            )
        })
        .collect();

    Ok(Json(grouped))
}

pub async fn create_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreatePermissionRequest>,
) -> ApiResult<(StatusCode, Json<PermissionResponse>)> {
    let permission = state
        .role_admin_service
        .create_permission(
            &user,
            cambo_application::CreatePermissionInput {
                slug: payload.slug,
                name: payload.name,
                group: payload.group,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}
