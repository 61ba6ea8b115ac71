//! PostgreSQL adapter for role and permission administration.

use async_trait::async_trait;
use uuid::Uuid;

use cambo_application::{RoleAdminRepository, RoleAssignment, RoleDefinition};
use cambo_core::{AppError, AppResult};
use cambo_domain::{Permission, PermissionId, PrincipalId, Role, RoleId, Slug};

use sqlx::{FromRow, PgPool};

mod assignments;
mod permissions;
mod roles;

/// PostgreSQL-backed repository for role administration.
#[derive(Clone)]
pub struct PostgresRoleAdminRepository {
    pool: PgPool,
}

impl PostgresRoleAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    slug: String,
    name: String,
    description: Option<String>,
    is_default: bool,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        Role::new(
            RoleId::from_uuid(self.id),
            self.slug,
            self.name,
            self.description,
            self.is_default,
        )
        .map_err(|error| AppError::Internal(format!("failed to decode role row: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    slug: String,
    name: String,
    group_name: String,
}

impl PermissionRow {
    fn into_permission(self) -> AppResult<Permission> {
        Permission::new(
            PermissionId::from_uuid(self.id),
            self.slug,
            self.name,
            self.group_name,
        )
        .map_err(|error| AppError::Internal(format!("failed to decode permission row: {error}")))
    }
}

fn slug_conflict_or_internal(error: sqlx::Error, kind: &str, slug: &Slug) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("{kind} '{slug}' already exists"));
    }

    AppError::Internal(format!("failed to create {kind} '{slug}': {error}"))
}

#[async_trait]
impl RoleAdminRepository for PostgresRoleAdminRepository {
    async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>> {
        self.list_roles_impl().await
    }

    async fn find_role_by_slug(&self, slug: &Slug) -> AppResult<Option<Role>> {
        self.find_role_by_slug_impl(slug).await
    }

    async fn insert_role_with_permissions(
        &self,
        role: &Role,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        self.insert_role_with_permissions_impl(role, permission_ids)
            .await
    }

    async fn update_role_with_permissions(
        &self,
        role: &Role,
        permission_ids: Option<&[PermissionId]>,
    ) -> AppResult<()> {
        self.update_role_with_permissions_impl(role, permission_ids)
            .await
    }

    async fn delete_role_if_unassigned(&self, role_id: RoleId) -> AppResult<u64> {
        self.delete_role_if_unassigned_impl(role_id).await
    }

    async fn set_default_role(&self, role_id: RoleId) -> AppResult<()> {
        self.set_default_role_impl(role_id).await
    }

    async fn find_default_role(&self) -> AppResult<Option<Role>> {
        self.find_default_role_impl().await
    }

    async fn resolve_roles_by_slugs(&self, slugs: &[Slug]) -> AppResult<Vec<Role>> {
        self.resolve_roles_by_slugs_impl(slugs).await
    }

    async fn attach_roles_to_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        self.attach_roles_to_principal_impl(principal_id, role_ids)
            .await
    }

    async fn detach_roles_from_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        self.detach_roles_from_principal_impl(principal_id, role_ids)
            .await
    }

    async fn replace_principal_roles(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        self.replace_principal_roles_impl(principal_id, role_ids)
            .await
    }

    async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        self.list_role_assignments_impl().await
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.list_permissions_impl().await
    }

    async fn insert_permission(&self, permission: &Permission) -> AppResult<()> {
        self.insert_permission_impl(permission).await
    }

    async fn resolve_permission_ids_by_slugs(
        &self,
        slugs: &[Slug],
    ) -> AppResult<Vec<PermissionId>> {
        self.resolve_permission_ids_by_slugs_impl(slugs).await
    }

    async fn attach_permissions_to_role(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        self.attach_permissions_to_role_impl(role_id, permission_ids)
            .await
    }

    async fn detach_permissions_from_role(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        self.detach_permissions_from_role_impl(role_id, permission_ids)
            .await
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        self.replace_role_permissions_impl(role_id, permission_ids)
            .await
    }
}
