use super::*;

pub async fn list_settings_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<BTreeMap<String, Vec<SettingResponse>>>> {
    let grouped = state
        .settings_service
        .list_grouped(&user)
        .await?
        .into_iter()
        .map(|(group, entries)| {
            (
                group,
                entries.into_iter().map(SettingResponse::from).collect(),
            )
        })
        .collect();

    Ok(Json(grouped))
}

pub async fn public_settings_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<BTreeMap<String, Value>>> {
    let values = state.settings_service.public_settings().await?;
    Ok(Json(values))
}

pub async fn update_setting_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSettingRequest>,
) -> ApiResult<StatusCode> {
    state
        .settings_service
        .set(&user, key.as_str(), payload.value)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_settings_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> ApiResult<StatusCode> {
    let values = payload
        .values
        .into_iter()
        .map(|entry| (entry.key, entry.value))
        .collect();
    state.settings_service.set_many(&user, values).await?;

    Ok(StatusCode::NO_CONTENT)
}
