use cambo_application::{AuthorizationService, PrincipalService, RoleAdminService, SettingsService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authorization_service: AuthorizationService,
    pub role_admin_service: RoleAdminService,
    pub principal_service: PrincipalService,
    pub settings_service: SettingsService,
}
