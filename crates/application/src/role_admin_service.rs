//! Administrative workflows for roles, permissions, and assignments.
//!
//! Slug lists received from callers are resolved against the catalogue
//! first; slugs that do not resolve are dropped silently, so assignment
//! operations never fail on stale input. Every mutation emits an audit
//! event.

use std::sync::Arc;

use async_trait::async_trait;
use cambo_core::{AppError, AppResult, UserIdentity};
use cambo_domain::{
    AuditAction, Permission, PermissionId, PrincipalId, Role, RoleId, SUPER_ADMIN_SLUG, Slug,
};

use crate::{AuditEvent, AuditRepository, AuthorizationService, gates};

/// Role projection returned to administrative callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    /// The role record.
    pub role: Role,
    /// Permission slugs attached to the role.
    pub permissions: Vec<Slug>,
    /// Number of principals currently holding the role.
    pub assigned_principals: u64,
}

/// Assignment projection mapping a principal to a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Principal holding the role.
    pub principal_id: PrincipalId,
    /// Role slug.
    pub role_slug: Slug,
    /// Role display name.
    pub role_name: String,
    /// Assignment timestamp in RFC3339.
    pub assigned_at: String,
}

/// Input payload for creating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Permission slugs to attach; unknown slugs are dropped.
    pub permissions: Vec<String>,
}

/// Input payload for updating a role. The slug itself is immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// New display name.
    pub name: String,
    /// New description.
    pub description: Option<String>,
    /// When present, replaces the role's permission set.
    pub permissions: Option<Vec<String>>,
}

/// Input payload for creating a permission catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePermissionInput {
    /// Unique permission slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Display group.
    pub group: String,
}

/// Repository port for role and assignment administration.
#[async_trait]
pub trait RoleAdminRepository: Send + Sync {
    /// Lists all roles with their permission slugs and member counts.
    async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>>;

    /// Finds a role by slug.
    async fn find_role_by_slug(&self, slug: &Slug) -> AppResult<Option<Role>>;

    /// Persists a new role together with its permission grants in one
    /// transaction. Duplicate slugs surface as a conflict and nothing is
    /// written.
    async fn insert_role_with_permissions(
        &self,
        role: &Role,
        permission_ids: &[PermissionId],
    ) -> AppResult<()>;

    /// Updates a role's mutable attributes and, when a grant set is given,
    /// replaces the role's permissions in the same transaction.
    async fn update_role_with_permissions(
        &self,
        role: &Role,
        permission_ids: Option<&[PermissionId]>,
    ) -> AppResult<()>;

    /// Deletes a role unless principals still hold it, checking membership
    /// and deleting in one transaction. Returns the member count observed;
    /// zero means the role is gone.
    async fn delete_role_if_unassigned(&self, role_id: RoleId) -> AppResult<u64>;

    /// Marks the role as the single default, clearing any previous one
    /// in the same transaction.
    async fn set_default_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Returns the current default role, if one is configured.
    async fn find_default_role(&self) -> AppResult<Option<Role>>;

    /// Resolves slugs to role records, skipping slugs with no match.
    async fn resolve_roles_by_slugs(&self, slugs: &[Slug]) -> AppResult<Vec<Role>>;

    /// Attaches roles to a principal. Already-attached roles are kept
    /// without error.
    async fn attach_roles_to_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()>;

    /// Detaches roles from a principal. Missing attachments are ignored.
    async fn detach_roles_from_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()>;

    /// Replaces a principal's role set in one transaction, touching only
    /// the rows that differ.
    async fn replace_principal_roles(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()>;

    /// Lists current role assignments.
    async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>>;

    /// Lists the permission catalogue.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Persists a new permission catalogue entry.
    async fn insert_permission(&self, permission: &Permission) -> AppResult<()>;

    /// Resolves slugs to permission identifiers, skipping slugs with no
    /// match.
    async fn resolve_permission_ids_by_slugs(&self, slugs: &[Slug])
    -> AppResult<Vec<PermissionId>>;

    /// Attaches permissions to a role. Already-attached permissions are
    /// kept without error.
    async fn attach_permissions_to_role(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()>;

    /// Detaches permissions from a role. Missing attachments are ignored.
    async fn detach_permissions_from_role(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()>;

    /// Replaces a role's permission set in one transaction, touching only
    /// the rows that differ.
    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()>;
}

/// Application service for role and permission administration.
#[derive(Clone)]
pub struct RoleAdminService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn RoleAdminRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn RoleAdminRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
            audit_repository,
        }
    }

    /// Returns all roles with their permissions and member counts.
    pub async fn list_roles(&self, actor: &UserIdentity) -> AppResult<Vec<RoleDefinition>> {
        self.require(actor, gates::ROLES_VIEW).await?;
        self.repository.list_roles().await
    }

    /// Returns the currently configured default role, if any.
    pub async fn default_role(&self, actor: &UserIdentity) -> AppResult<Option<Role>> {
        self.require(actor, gates::ROLES_VIEW).await?;
        self.repository.find_default_role().await
    }

    /// Creates a role and attaches the resolvable permission slugs.
    pub async fn create_role(
        &self,
        actor: &UserIdentity,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition> {
        self.require(actor, gates::ROLES_CREATE).await?;

        if input.slug.trim() == SUPER_ADMIN_SLUG {
            return Err(AppError::Validation(format!(
                "the role slug '{SUPER_ADMIN_SLUG}' is reserved"
            )));
        }

        let permission_ids = self
            .repository
            .resolve_permission_ids_by_slugs(&parse_slugs(&input.permissions))
            .await?;
        let role = Role::new(RoleId::new(), input.slug, input.name, input.description, false)?;
        self.repository
            .insert_role_with_permissions(&role, &permission_ids)
            .await?;

        self.append_audit(
            actor,
            AuditAction::RoleCreated,
            "role",
            role.slug().as_str(),
            Some(format!("created role '{}'", role.slug())),
        )
        .await?;

        let permissions = self
            .repository
            .list_roles()
            .await?
            .into_iter()
            .find(|definition| definition.role.id() == role.id())
            .map(|definition| definition.permissions)
            .unwrap_or_default();

        Ok(RoleDefinition {
            role,
            permissions,
            assigned_principals: 0,
        })
    }

    /// Updates a role's attributes and, when requested, its permission set.
    pub async fn update_role(
        &self,
        actor: &UserIdentity,
        slug: &str,
        input: UpdateRoleInput,
    ) -> AppResult<Role> {
        self.require(actor, gates::ROLES_EDIT).await?;

        let existing = self.find_role(slug).await?;
        if existing.is_super_admin() {
            return Err(AppError::Validation(
                "the super administrator role cannot be modified".to_owned(),
            ));
        }

        let updated = Role::new(
            existing.id(),
            existing.slug().as_str(),
            input.name,
            input.description,
            existing.is_default(),
        )?;
        let permission_ids = match input.permissions {
            Some(permissions) => Some(
                self.repository
                    .resolve_permission_ids_by_slugs(&parse_slugs(&permissions))
                    .await?,
            ),
            None => None,
        };
        self.repository
            .update_role_with_permissions(&updated, permission_ids.as_deref())
            .await?;

        self.append_audit(
            actor,
            AuditAction::RoleUpdated,
            "role",
            updated.slug().as_str(),
            Some(format!("updated role '{}'", updated.slug())),
        )
        .await?;

        Ok(updated)
    }

    /// Deletes a role.
    ///
    /// The super administrator role and roles with assigned principals are
    /// refused.
    pub async fn delete_role(&self, actor: &UserIdentity, slug: &str) -> AppResult<()> {
        self.require(actor, gates::ROLES_DELETE).await?;

        let role = self.find_role(slug).await?;
        if role.is_super_admin() {
            return Err(AppError::Validation(
                "the super administrator role cannot be deleted".to_owned(),
            ));
        }

        let members = self.repository.delete_role_if_unassigned(role.id()).await?;
        if members > 0 {
            return Err(AppError::Validation(format!(
                "role '{}' still has {members} assigned principal(s)",
                role.slug()
            )));
        }

        self.append_audit(
            actor,
            AuditAction::RoleDeleted,
            "role",
            role.slug().as_str(),
            Some(format!("deleted role '{}'", role.slug())),
        )
        .await
    }

    /// Marks a role as the default assigned to newly created principals.
    pub async fn set_default_role(&self, actor: &UserIdentity, slug: &str) -> AppResult<()> {
        self.require(actor, gates::ROLES_EDIT).await?;

        let role = self.find_role(slug).await?;
        self.repository.set_default_role(role.id()).await?;

        self.append_audit(
            actor,
            AuditAction::RoleDefaultChanged,
            "role",
            role.slug().as_str(),
            Some(format!("set '{}' as the default role", role.slug())),
        )
        .await
    }

    /// Assigns roles to a principal; unknown slugs are dropped silently
    /// and already-held roles are kept.
    pub async fn assign_roles(
        &self,
        actor: &UserIdentity,
        principal_id: PrincipalId,
        slugs: &[String],
    ) -> AppResult<()> {
        self.require(actor, gates::USERS_EDIT).await?;

        let roles = self
            .repository
            .resolve_roles_by_slugs(&parse_slugs(slugs))
            .await?;
        let role_ids: Vec<RoleId> = roles.iter().map(Role::id).collect();
        self.repository
            .attach_roles_to_principal(principal_id, &role_ids)
            .await?;

        self.append_audit(
            actor,
            AuditAction::RoleAssigned,
            "principal_role",
            &principal_id.to_string(),
            Some(format!("assigned {} role(s)", role_ids.len())),
        )
        .await
    }

    /// Removes roles from a principal; unknown slugs and missing
    /// assignments are ignored.
    pub async fn unassign_roles(
        &self,
        actor: &UserIdentity,
        principal_id: PrincipalId,
        slugs: &[String],
    ) -> AppResult<()> {
        self.require(actor, gates::USERS_EDIT).await?;

        let roles = self
            .repository
            .resolve_roles_by_slugs(&parse_slugs(slugs))
            .await?;
        let role_ids: Vec<RoleId> = roles.iter().map(Role::id).collect();
        self.repository
            .detach_roles_from_principal(principal_id, &role_ids)
            .await?;

        self.append_audit(
            actor,
            AuditAction::RoleUnassigned,
            "principal_role",
            &principal_id.to_string(),
            Some(format!("removed {} role(s)", role_ids.len())),
        )
        .await
    }

    /// Replaces a principal's role set with exactly the resolvable slugs.
    pub async fn sync_roles(
        &self,
        actor: &UserIdentity,
        principal_id: PrincipalId,
        slugs: &[String],
    ) -> AppResult<()> {
        self.require(actor, gates::USERS_EDIT).await?;

        let roles = self
            .repository
            .resolve_roles_by_slugs(&parse_slugs(slugs))
            .await?;
        let role_ids: Vec<RoleId> = roles.iter().map(Role::id).collect();
        self.repository
            .replace_principal_roles(principal_id, &role_ids)
            .await?;

        self.append_audit(
            actor,
            AuditAction::RolesSynced,
            "principal_role",
            &principal_id.to_string(),
            Some(format!("synced role set to {} role(s)", role_ids.len())),
        )
        .await
    }

    /// Returns current role assignments.
    pub async fn list_role_assignments(
        &self,
        actor: &UserIdentity,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.require(actor, gates::USERS_VIEW).await?;
        self.repository.list_role_assignments().await
    }

    /// Grants permissions to a role; unknown slugs are dropped silently.
    pub async fn grant_permissions(
        &self,
        actor: &UserIdentity,
        role_slug: &str,
        slugs: &[String],
    ) -> AppResult<()> {
        self.require(actor, gates::ROLES_EDIT).await?;

        let role = self.find_role(role_slug).await?;
        let permission_ids = self
            .repository
            .resolve_permission_ids_by_slugs(&parse_slugs(slugs))
            .await?;
        self.repository
            .attach_permissions_to_role(role.id(), &permission_ids)
            .await?;

        self.append_audit(
            actor,
            AuditAction::RolePermissionsGranted,
            "role_permission",
            role.slug().as_str(),
            Some(format!("granted {} permission(s)", permission_ids.len())),
        )
        .await
    }

    /// Revokes permissions from a role; unknown slugs and missing grants
    /// are ignored.
    pub async fn revoke_permissions(
        &self,
        actor: &UserIdentity,
        role_slug: &str,
        slugs: &[String],
    ) -> AppResult<()> {
        self.require(actor, gates::ROLES_EDIT).await?;

        let role = self.find_role(role_slug).await?;
        let permission_ids = self
            .repository
            .resolve_permission_ids_by_slugs(&parse_slugs(slugs))
            .await?;
        self.repository
            .detach_permissions_from_role(role.id(), &permission_ids)
            .await?;

        self.append_audit(
            actor,
            AuditAction::RolePermissionsRevoked,
            "role_permission",
            role.slug().as_str(),
            Some(format!("revoked {} permission(s)", permission_ids.len())),
        )
        .await
    }

    /// Replaces a role's permission set with exactly the resolvable slugs.
    pub async fn sync_permissions(
        &self,
        actor: &UserIdentity,
        role_slug: &str,
        slugs: &[String],
    ) -> AppResult<()> {
        self.require(actor, gates::ROLES_EDIT).await?;

        let role = self.find_role(role_slug).await?;
        let permission_ids = self
            .repository
            .resolve_permission_ids_by_slugs(&parse_slugs(slugs))
            .await?;
        self.repository
            .replace_role_permissions(role.id(), &permission_ids)
            .await?;

        self.append_audit(
            actor,
            AuditAction::RolePermissionsSynced,
            "role_permission",
            role.slug().as_str(),
            Some(format!(
                "synced permission set to {} permission(s)",
                permission_ids.len()
            )),
        )
        .await
    }

    /// Returns the permission catalogue.
    pub async fn list_permissions(&self, actor: &UserIdentity) -> AppResult<Vec<Permission>> {
        self.require(actor, gates::ROLES_VIEW).await?;
        self.repository.list_permissions().await
    }

    /// Creates a permission catalogue entry.
    pub async fn create_permission(
        &self,
        actor: &UserIdentity,
        input: CreatePermissionInput,
    ) -> AppResult<Permission> {
        self.require(actor, gates::ROLES_CREATE).await?;

        let permission = Permission::new(PermissionId::new(), input.slug, input.name, input.group)?;
        self.repository.insert_permission(&permission).await?;

        self.append_audit(
            actor,
            AuditAction::PermissionCreated,
            "permission",
            permission.slug().as_str(),
            Some(format!("created permission '{}'", permission.slug())),
        )
        .await?;

        Ok(permission)
    }

    async fn require(&self, actor: &UserIdentity, gate: &str) -> AppResult<()> {
        self.authorization_service
            .require_permission(PrincipalId::from_uuid(actor.subject()), gate)
            .await
    }

    async fn find_role(&self, slug: &str) -> AppResult<Role> {
        let slug = Slug::new(slug)?;
        self.repository
            .find_role_by_slug(&slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{slug}' does not exist")))
    }

    async fn append_audit(
        &self,
        actor: &UserIdentity,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        detail: Option<String>,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                subject: PrincipalId::from_uuid(actor.subject()),
                action,
                resource_type: resource_type.to_owned(),
                resource_id: resource_id.to_owned(),
                detail,
            })
            .await
    }
}

// Malformed slugs cannot match any catalogue entry, so they are dropped
// together with unknown ones.
fn parse_slugs(values: &[String]) -> Vec<Slug> {
    values
        .iter()
        .filter_map(|value| Slug::new(value.as_str()).ok())
        .collect()
}
