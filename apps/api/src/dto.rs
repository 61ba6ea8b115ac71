use std::collections::BTreeSet;

use cambo_core::UserIdentity;
use cambo_domain::{Permission, Role, Setting, Slug};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Incoming payload for password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Incoming payload for role creation.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Incoming payload for role updates. The slug is immutable.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// Incoming payload for default role selection.
#[derive(Debug, Deserialize)]
pub struct SetDefaultRoleRequest {
    pub slug: String,
}

/// Incoming payload carrying permission slugs for grant/revoke/sync.
#[derive(Debug, Deserialize)]
pub struct PermissionSlugsRequest {
    pub permissions: Vec<String>,
}

/// Incoming payload for permission catalogue entries.
#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub slug: String,
    pub name: String,
    pub group: String,
}

/// Incoming payload for role assignment operations.
#[derive(Debug, Deserialize)]
pub struct RoleAssignmentRequest {
    pub principal_id: Uuid,
    pub roles: Vec<String>,
}

/// Incoming payload for principal account creation.
#[derive(Debug, Deserialize)]
pub struct CreatePrincipalRequest {
    pub display_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Incoming payload for a single setting update.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: Option<String>,
}

/// One key/value pair within a bulk settings update.
#[derive(Debug, Deserialize)]
pub struct SettingValueInput {
    pub key: String,
    pub value: Option<String>,
}

/// Incoming payload for bulk settings updates.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub values: Vec<SettingValueInput>,
}

/// API representation of the authenticated principal.
#[derive(Debug, Serialize)]
pub struct UserIdentityResponse {
    pub subject: String,
    pub display_name: String,
    pub email: String,
    pub permissions: Vec<String>,
}

impl UserIdentityResponse {
    pub fn from_identity_with_permissions(
        identity: UserIdentity,
        permissions: BTreeSet<Slug>,
    ) -> Self {
        Self {
            subject: identity.subject().to_string(),
            display_name: identity.display_name().to_owned(),
            email: identity.email().to_owned(),
            permissions: permissions
                .into_iter()
                .map(|slug| slug.as_str().to_owned())
                .collect(),
        }
    }
}

/// API representation of a role with its grants and member count.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub is_super_admin: bool,
    pub permissions: Vec<String>,
    pub assigned_principals: u64,
}

impl From<cambo_application::RoleDefinition> for RoleResponse {
    fn from(value: cambo_application::RoleDefinition) -> Self {
        Self {
            slug: value.role.slug().as_str().to_owned(),
            name: value.role.name().to_owned(),
            description: value.role.description().map(str::to_owned),
            is_default: value.role.is_default(),
            is_super_admin: value.role.is_super_admin(),
            permissions: value
                .permissions
                .into_iter()
                .map(|slug| slug.as_str().to_owned())
                .collect(),
            assigned_principals: value.assigned_principals,
        }
    }
}

/// Slim role projection without grants or member counts.
#[derive(Debug, Serialize)]
pub struct RoleSummaryResponse {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
}

impl From<Role> for RoleSummaryResponse {
    fn from(value: Role) -> Self {
        Self {
            slug: value.slug().as_str().to_owned(),
            name: value.name().to_owned(),
            description: value.description().map(str::to_owned),
            is_default: value.is_default(),
        }
    }
}

/// API representation of a permission catalogue entry.
#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub slug: String,
    pub name: String,
    pub group: String,
}

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            slug: value.slug().as_str().to_owned(),
            name: value.name().to_owned(),
            group: value.group().to_owned(),
        }
    }
}

/// API representation of a role assignment.
#[derive(Debug, Serialize)]
pub struct RoleAssignmentResponse {
    pub principal_id: String,
    pub role_slug: String,
    pub role_name: String,
    pub assigned_at: String,
}

impl From<cambo_application::RoleAssignment> for RoleAssignmentResponse {
    fn from(value: cambo_application::RoleAssignment) -> Self {
        Self {
            principal_id: value.principal_id.to_string(),
            role_slug: value.role_slug.as_str().to_owned(),
            role_name: value.role_name,
            assigned_at: value.assigned_at,
        }
    }
}

/// API representation of a principal account.
#[derive(Debug, Serialize)]
pub struct PrincipalResponse {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl From<cambo_application::PrincipalOverview> for PrincipalResponse {
    fn from(value: cambo_application::PrincipalOverview) -> Self {
        Self {
            id: value.id.to_string(),
            display_name: value.display_name,
            email: value.email,
            roles: value
                .roles
                .into_iter()
                .map(|slug| slug.as_str().to_owned())
                .collect(),
        }
    }
}

/// API representation of a setting entry.
///
/// Encrypted values are never serialized; `has_value` signals presence.
#[derive(Debug, Serialize)]
pub struct SettingResponse {
    pub key: String,
    pub group: String,
    pub label: String,
    pub description: Option<String>,
    pub setting_type: String,
    pub value: Option<String>,
    pub default_value: Option<String>,
    pub options: Option<Value>,
    pub is_public: bool,
    pub is_encrypted: bool,
    pub order: i32,
    pub has_value: bool,
}

impl From<Setting> for SettingResponse {
    fn from(value: Setting) -> Self {
        let has_value = value.raw_value().is_some();
        let visible_value = if value.is_encrypted() {
            None
        } else {
            value.raw_value().map(str::to_owned)
        };

        Self {
            key: value.key().as_str().to_owned(),
            group: value.group().to_owned(),
            label: value.label().to_owned(),
            description: value.description().map(str::to_owned),
            setting_type: value.setting_type().as_str().to_owned(),
            value: visible_value,
            default_value: value.default_value().map(str::to_owned),
            options: value.options().cloned(),
            is_public: value.is_public(),
            is_encrypted: value.is_encrypted(),
            order: value.order(),
            has_value,
        }
    }
}

/// Response carrying the identifier of a newly created resource.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}
