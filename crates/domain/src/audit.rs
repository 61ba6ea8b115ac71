use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is created.
    RoleCreated,
    /// Emitted when a role's attributes are updated.
    RoleUpdated,
    /// Emitted when a role is deleted.
    RoleDeleted,
    /// Emitted when the default role changes.
    RoleDefaultChanged,
    /// Emitted when roles are assigned to a principal.
    RoleAssigned,
    /// Emitted when roles are removed from a principal.
    RoleUnassigned,
    /// Emitted when a principal's role set is replaced.
    RolesSynced,
    /// Emitted when permissions are granted to a role.
    RolePermissionsGranted,
    /// Emitted when permissions are revoked from a role.
    RolePermissionsRevoked,
    /// Emitted when a role's permission set is replaced.
    RolePermissionsSynced,
    /// Emitted when a permission is created.
    PermissionCreated,
    /// Emitted when a principal account is created.
    PrincipalCreated,
    /// Emitted when a setting value is updated.
    SettingUpdated,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "role.created",
            Self::RoleUpdated => "role.updated",
            Self::RoleDeleted => "role.deleted",
            Self::RoleDefaultChanged => "role.default_changed",
            Self::RoleAssigned => "role.assigned",
            Self::RoleUnassigned => "role.unassigned",
            Self::RolesSynced => "role.synced",
            Self::RolePermissionsGranted => "role.permissions_granted",
            Self::RolePermissionsRevoked => "role.permissions_revoked",
            Self::RolePermissionsSynced => "role.permissions_synced",
            Self::PermissionCreated => "permission.created",
            Self::PrincipalCreated => "principal.created",
            Self::SettingUpdated => "setting.updated",
        }
    }
}
