//! In-memory role administration repository.
//!
//! Mirrors the PostgreSQL adapter's semantics, including the single
//! default role invariant, for tests and local experimentation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use cambo_application::{RoleAdminRepository, RoleAssignment, RoleDefinition};
use cambo_core::{AppError, AppResult};
use cambo_domain::{Permission, PermissionId, PrincipalId, Role, RoleId, Slug};

/// In-memory role administration repository.
#[derive(Debug, Default)]
pub struct InMemoryRoleAdminRepository {
    roles: RwLock<Vec<Role>>,
    permissions: RwLock<Vec<Permission>>,
    role_permissions: RwLock<HashMap<RoleId, Vec<PermissionId>>>,
    principal_roles: RwLock<HashMap<PrincipalId, Vec<RoleId>>>,
}

impl InMemoryRoleAdminRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleAdminRepository for InMemoryRoleAdminRepository {
    async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>> {
        let roles = self.roles.read().await;
        let role_permissions = self.role_permissions.read().await;
        let permissions = self.permissions.read().await;
        let principal_roles = self.principal_roles.read().await;

        let mut definitions: Vec<RoleDefinition> = roles
            .iter()
            .map(|role| {
                let mut slugs: Vec<Slug> = role_permissions
                    .get(&role.id())
                    .map(|ids| {
                        permissions
                            .iter()
                            .filter(|permission| ids.contains(&permission.id()))
                            .map(|permission| permission.slug().clone())
                            .collect()
                    })
                    .unwrap_or_default();
                slugs.sort_by(|left, right| left.as_str().cmp(right.as_str()));

                let assigned_principals = principal_roles
                    .values()
                    .filter(|held| held.contains(&role.id()))
                    .count() as u64;

                RoleDefinition {
                    role: role.clone(),
                    permissions: slugs,
                    assigned_principals,
                }
            })
            .collect();
        definitions.sort_by(|left, right| {
            left.role
                .slug()
                .as_str()
                .cmp(right.role.slug().as_str())
        });

        Ok(definitions)
    }

    async fn find_role_by_slug(&self, slug: &Slug) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .iter()
            .find(|role| role.slug() == slug)
            .cloned())
    }

    async fn insert_role_with_permissions(
        &self,
        role: &Role,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        // Both write locks are held across the slug check and the grant
        // write, so a conflict leaves no grants behind.
        let mut roles = self.roles.write().await;
        let mut grants = self.role_permissions.write().await;

        if roles.iter().any(|existing| existing.slug() == role.slug()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.slug()
            )));
        }

        roles.push(role.clone());
        grants.insert(role.id(), permission_ids.to_vec());
        Ok(())
    }

    async fn update_role_with_permissions(
        &self,
        role: &Role,
        permission_ids: Option<&[PermissionId]>,
    ) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        let mut grants = self.role_permissions.write().await;

        let Some(existing) = roles.iter_mut().find(|existing| existing.id() == role.id())
        else {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.slug()
            )));
        };
        *existing = role.clone();

        if let Some(ids) = permission_ids {
            let held = grants.entry(role.id()).or_default();
            held.retain(|id| ids.contains(id));
            for id in ids {
                if !held.contains(id) {
                    held.push(*id);
                }
            }
        }
        Ok(())
    }

    async fn delete_role_if_unassigned(&self, role_id: RoleId) -> AppResult<u64> {
        // The assignments write lock keeps the member check and the delete
        // from interleaving with a concurrent attach.
        let mut roles = self.roles.write().await;
        let mut grants = self.role_permissions.write().await;
        let assignments = self.principal_roles.write().await;

        if !roles.iter().any(|role| role.id() == role_id) {
            return Err(AppError::NotFound("role was not found".to_owned()));
        }

        let members = assignments
            .values()
            .filter(|held| held.contains(&role_id))
            .count() as u64;
        if members > 0 {
            return Ok(members);
        }

        roles.retain(|role| role.id() != role_id);
        grants.remove(&role_id);
        Ok(0)
    }

    async fn set_default_role(&self, role_id: RoleId) -> AppResult<()> {
        // The write lock makes clear-then-set atomic, so at most one role
        // carries the flag no matter how the callers interleave.
        let mut roles = self.roles.write().await;

        if !roles.iter().any(|role| role.id() == role_id) {
            return Err(AppError::NotFound("role was not found".to_owned()));
        }

        let updated: AppResult<Vec<Role>> = roles
            .iter()
            .map(|role| {
                Role::new(
                    role.id(),
                    role.slug().as_str(),
                    role.name(),
                    role.description().map(str::to_owned),
                    role.id() == role_id,
                )
            })
            .collect();
        *roles = updated?;
        Ok(())
    }

    async fn find_default_role(&self) -> AppResult<Option<Role>> {
        // Slug order keeps the answer deterministic even if several rows
        // ever carry the flag, matching the PostgreSQL adapter.
        Ok(self
            .roles
            .read()
            .await
            .iter()
            .filter(|role| role.is_default())
            .min_by(|left, right| left.slug().as_str().cmp(right.slug().as_str()))
            .cloned())
    }

    async fn resolve_roles_by_slugs(&self, slugs: &[Slug]) -> AppResult<Vec<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .iter()
            .filter(|role| slugs.contains(role.slug()))
            .cloned()
            .collect())
    }

    async fn attach_roles_to_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        let mut assignments = self.principal_roles.write().await;
        let held = assignments.entry(principal_id).or_default();
        for role_id in role_ids {
            if !held.contains(role_id) {
                held.push(*role_id);
            }
        }
        Ok(())
    }

    async fn detach_roles_from_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        if let Some(held) = self.principal_roles.write().await.get_mut(&principal_id) {
            held.retain(|id| !role_ids.contains(id));
        }
        Ok(())
    }

    async fn replace_principal_roles(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        let mut assignments = self.principal_roles.write().await;
        let held = assignments.entry(principal_id).or_default();
        held.retain(|id| role_ids.contains(id));
        for role_id in role_ids {
            if !held.contains(role_id) {
                held.push(*role_id);
            }
        }
        Ok(())
    }

    async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        let assignments = self.principal_roles.read().await;
        let roles = self.roles.read().await;

        let mut entries = Vec::new();
        for (principal_id, held) in assignments.iter() {
            for role_id in held {
                if let Some(role) = roles.iter().find(|role| role.id() == *role_id) {
                    entries.push(RoleAssignment {
                        principal_id: *principal_id,
                        role_slug: role.slug().clone(),
                        role_name: role.name().to_owned(),
                        assigned_at: String::new(),
                    });
                }
            }
        }
        entries.sort_by(|left, right| {
            (left.principal_id.as_uuid(), left.role_slug.as_str())
                .cmp(&(right.principal_id.as_uuid(), right.role_slug.as_str()))
        });

        Ok(entries)
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let mut permissions = self.permissions.read().await.clone();
        permissions.sort_by(|left, right| {
            (left.group(), left.slug().as_str()).cmp(&(right.group(), right.slug().as_str()))
        });
        Ok(permissions)
    }

    async fn insert_permission(&self, permission: &Permission) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;

        if permissions
            .iter()
            .any(|existing| existing.slug() == permission.slug())
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.slug()
            )));
        }

        permissions.push(permission.clone());
        Ok(())
    }

    async fn resolve_permission_ids_by_slugs(
        &self,
        slugs: &[Slug],
    ) -> AppResult<Vec<PermissionId>> {
        Ok(self
            .permissions
            .read()
            .await
            .iter()
            .filter(|permission| slugs.contains(permission.slug()))
            .map(Permission::id)
            .collect())
    }

    async fn attach_permissions_to_role(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut grants = self.role_permissions.write().await;
        let held = grants.entry(role_id).or_default();
        for permission_id in permission_ids {
            if !held.contains(permission_id) {
                held.push(*permission_id);
            }
        }
        Ok(())
    }

    async fn detach_permissions_from_role(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        if let Some(held) = self.role_permissions.write().await.get_mut(&role_id) {
            held.retain(|id| !permission_ids.contains(id));
        }
        Ok(())
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut grants = self.role_permissions.write().await;
        let held = grants.entry(role_id).or_default();
        held.retain(|id| permission_ids.contains(id));
        for permission_id in permission_ids {
            if !held.contains(permission_id) {
                held.push(*permission_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cambo_application::RoleAdminRepository;
    use cambo_core::AppResult;
    use cambo_domain::{Permission, PermissionId, PrincipalId, Role, RoleId, Slug};

    use super::InMemoryRoleAdminRepository;

    async fn seed_roles(
        repository: &InMemoryRoleAdminRepository,
        slugs: &[&str],
    ) -> AppResult<Vec<Role>> {
        let mut roles = Vec::new();
        for slug in slugs {
            let role = Role::new(RoleId::new(), *slug, slug.to_uppercase(), None, false)?;
            repository.insert_role_with_permissions(&role, &[]).await?;
            roles.push(role);
        }
        Ok(roles)
    }

    async fn assigned_count(
        repository: &InMemoryRoleAdminRepository,
        slug: &str,
    ) -> AppResult<u64> {
        Ok(repository
            .list_roles()
            .await?
            .into_iter()
            .find(|definition| definition.role.slug().as_str() == slug)
            .map(|definition| definition.assigned_principals)
            .unwrap_or(0))
    }

    #[tokio::test]
    async fn concurrent_default_changes_leave_exactly_one_default() -> AppResult<()> {
        let repository = Arc::new(InMemoryRoleAdminRepository::new());
        let roles = seed_roles(
            &repository,
            &["alpha", "beta", "gamma", "delta", "epsilon"],
        )
        .await?;

        let mut handles = Vec::new();
        for round in 0..64 {
            let repository = Arc::clone(&repository);
            let role_id = roles[round % roles.len()].id();
            handles.push(tokio::spawn(async move {
                repository.set_default_role(role_id).await
            }));
        }
        for handle in handles {
            handle
                .await
                .map_err(|error| {
                    cambo_core::AppError::Internal(format!("task panicked: {error}"))
                })??;
        }

        let defaults = repository
            .list_roles()
            .await?
            .into_iter()
            .filter(|definition| definition.role.is_default())
            .count();
        assert_eq!(defaults, 1);
        Ok(())
    }

    #[tokio::test]
    async fn attach_is_idempotent() -> AppResult<()> {
        let repository = InMemoryRoleAdminRepository::new();
        let roles = seed_roles(&repository, &["editor"]).await?;
        let principal_id = PrincipalId::new();

        repository
            .attach_roles_to_principal(principal_id, &[roles[0].id()])
            .await?;
        repository
            .attach_roles_to_principal(principal_id, &[roles[0].id()])
            .await?;

        assert_eq!(assigned_count(&repository, "editor").await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn replace_keeps_the_overlap_and_prunes_the_rest() -> AppResult<()> {
        let repository = InMemoryRoleAdminRepository::new();
        let roles = seed_roles(&repository, &["editor", "reviewer", "viewer"]).await?;
        let principal_id = PrincipalId::new();

        repository
            .attach_roles_to_principal(principal_id, &[roles[0].id(), roles[1].id()])
            .await?;
        repository
            .replace_principal_roles(principal_id, &[roles[1].id(), roles[2].id()])
            .await?;

        assert_eq!(assigned_count(&repository, "editor").await?, 0);
        assert_eq!(assigned_count(&repository, "reviewer").await?, 1);
        assert_eq!(assigned_count(&repository, "viewer").await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn conflicting_insert_writes_no_grants() -> AppResult<()> {
        let repository = InMemoryRoleAdminRepository::new();
        let permission =
            Permission::new(PermissionId::new(), "posts.edit", "Edit posts", "posts")?;
        repository.insert_permission(&permission).await?;
        seed_roles(&repository, &["editor"]).await?;

        let duplicate = Role::new(RoleId::new(), "editor", "EDITOR", None, false)?;
        let result = repository
            .insert_role_with_permissions(&duplicate, &[permission.id()])
            .await;

        assert!(result.is_err());
        let definitions = repository.list_roles().await?;
        assert_eq!(definitions.len(), 1);
        assert!(definitions[0].permissions.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn delete_keeps_the_role_while_principals_hold_it() -> AppResult<()> {
        let repository = InMemoryRoleAdminRepository::new();
        let roles = seed_roles(&repository, &["editor"]).await?;
        let principal_id = PrincipalId::new();
        repository
            .attach_roles_to_principal(principal_id, &[roles[0].id()])
            .await?;

        assert_eq!(repository.delete_role_if_unassigned(roles[0].id()).await?, 1);
        assert_eq!(repository.list_roles().await?.len(), 1);

        repository
            .detach_roles_from_principal(principal_id, &[roles[0].id()])
            .await?;
        assert_eq!(repository.delete_role_if_unassigned(roles[0].id()).await?, 0);
        assert!(repository.list_roles().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn default_lookup_prefers_the_first_slug_when_rows_disagree() -> AppResult<()> {
        let repository = InMemoryRoleAdminRepository::new();
        {
            let mut roles = repository.roles.write().await;
            roles.push(Role::new(RoleId::new(), "zeta", "ZETA", None, true)?);
            roles.push(Role::new(RoleId::new(), "alpha", "ALPHA", None, true)?);
        }

        let default = repository.find_default_role().await?;
        assert!(default.is_some_and(|role| role.slug().as_str() == "alpha"));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_permission_slugs_conflict() -> AppResult<()> {
        let repository = InMemoryRoleAdminRepository::new();
        let permission = Permission::new(PermissionId::new(), "posts.edit", "Edit posts", "posts")?;
        repository.insert_permission(&permission).await?;

        let duplicate =
            Permission::new(PermissionId::new(), "posts.edit", "Edit posts", "posts")?;
        assert!(repository.insert_permission(&duplicate).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn resolve_drops_unknown_slugs() -> AppResult<()> {
        let repository = InMemoryRoleAdminRepository::new();
        seed_roles(&repository, &["editor"]).await?;

        let requested = [Slug::new("editor")?, Slug::new("ghost")?];
        let resolved = repository.resolve_roles_by_slugs(&requested).await?;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].slug().as_str(), "editor");
        Ok(())
    }
}
