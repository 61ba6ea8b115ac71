use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;

use cambo_core::UserIdentity;
use cambo_domain::{PrincipalId, group_permissions};
use serde_json::{Value, json};

use crate::dto::{
    CreatePermissionRequest, CreatePrincipalRequest, CreateRoleRequest, CreatedResponse,
    PermissionResponse, PermissionSlugsRequest, PrincipalResponse, RoleAssignmentRequest,
    RoleAssignmentResponse, RoleResponse, RoleSummaryResponse, SetDefaultRoleRequest,
    SettingResponse, UpdateRoleRequest, UpdateSettingRequest, UpdateSettingsRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod health;
mod permissions;
mod principals;
mod roles;
mod settings;

pub use health::health_handler;
pub use permissions::{create_permission_handler, list_permissions_handler};
pub use principals::{
    assign_roles_handler, create_principal_handler, list_principals_handler,
    list_role_assignments_handler, sync_roles_handler, unassign_roles_handler,
};
pub use roles::{
    create_role_handler, default_role_handler, delete_role_handler,
    grant_role_permissions_handler, list_roles_handler, revoke_role_permissions_handler,
    set_default_role_handler, sync_role_permissions_handler, update_role_handler,
};
pub use settings::{
    list_settings_handler, public_settings_handler, update_setting_handler,
    update_settings_handler,
};
