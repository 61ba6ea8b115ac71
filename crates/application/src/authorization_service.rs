//! Role and permission evaluation for principals.
//!
//! Every predicate re-reads current assignments from the repository at
//! call time; nothing is cached across requests. Authorization failure is
//! a `false` return, never an error — only storage faults propagate.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use cambo_core::{AppError, AppResult};
use cambo_domain::{PrincipalId, SUPER_ADMIN_SLUG, Slug};

/// Repository port for role and permission lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists the slugs of all roles assigned to a principal.
    async fn list_role_slugs_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<Slug>>;

    /// Lists the deduplicated permission slugs a principal holds through
    /// its roles.
    async fn list_permission_slugs_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<Slug>>;
}

/// Application service answering "who may do what".
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self { repository }
    }

    /// Returns whether the principal holds the role with the given slug.
    ///
    /// Role checks ask about identity, not capability, so the reserved
    /// super-admin role does not shortcut them.
    pub async fn has_role(&self, principal_id: PrincipalId, slug: &str) -> AppResult<bool> {
        let roles = self
            .repository
            .list_role_slugs_for_principal(principal_id)
            .await?;

        Ok(roles.iter().any(|role| role.as_str() == slug))
    }

    /// Returns whether the principal holds at least one of the roles.
    ///
    /// An empty input is vacuously false.
    pub async fn has_any_role(&self, principal_id: PrincipalId, slugs: &[&str]) -> AppResult<bool> {
        if slugs.is_empty() {
            return Ok(false);
        }

        let roles = self
            .repository
            .list_role_slugs_for_principal(principal_id)
            .await?;

        Ok(slugs
            .iter()
            .any(|slug| roles.iter().any(|role| role.as_str() == *slug)))
    }

    /// Returns whether the principal holds every one of the roles.
    ///
    /// An empty input is vacuously true.
    pub async fn has_all_roles(
        &self,
        principal_id: PrincipalId,
        slugs: &[&str],
    ) -> AppResult<bool> {
        if slugs.is_empty() {
            return Ok(true);
        }

        let roles = self
            .repository
            .list_role_slugs_for_principal(principal_id)
            .await?;

        Ok(slugs
            .iter()
            .all(|slug| roles.iter().any(|role| role.as_str() == *slug)))
    }

    /// Returns whether the principal holds the permission with the given
    /// slug, through any assigned role.
    pub async fn has_permission(&self, principal_id: PrincipalId, slug: &str) -> AppResult<bool> {
        if self.is_super_admin(principal_id).await? {
            return Ok(true);
        }

        let permissions = self
            .repository
            .list_permission_slugs_for_principal(principal_id)
            .await?;

        Ok(permissions.iter().any(|held| held.as_str() == slug))
    }

    /// Returns whether the principal holds at least one of the permissions.
    ///
    /// An empty input is vacuously false.
    pub async fn has_any_permission(
        &self,
        principal_id: PrincipalId,
        slugs: &[&str],
    ) -> AppResult<bool> {
        if self.is_super_admin(principal_id).await? {
            return Ok(true);
        }

        if slugs.is_empty() {
            return Ok(false);
        }

        let permissions = self
            .repository
            .list_permission_slugs_for_principal(principal_id)
            .await?;

        Ok(slugs
            .iter()
            .any(|slug| permissions.iter().any(|held| held.as_str() == *slug)))
    }

    /// Returns whether the principal holds every one of the permissions.
    ///
    /// An empty input is vacuously true.
    pub async fn has_all_permissions(
        &self,
        principal_id: PrincipalId,
        slugs: &[&str],
    ) -> AppResult<bool> {
        if self.is_super_admin(principal_id).await? {
            return Ok(true);
        }

        if slugs.is_empty() {
            return Ok(true);
        }

        let permissions = self
            .repository
            .list_permission_slugs_for_principal(principal_id)
            .await?;

        Ok(slugs
            .iter()
            .all(|slug| permissions.iter().any(|held| held.as_str() == *slug)))
    }

    /// Returns the principal's effective permission set: the deduplicated
    /// union of the permission sets of all assigned roles.
    pub async fn effective_permissions(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<BTreeSet<Slug>> {
        let permissions = self
            .repository
            .list_permission_slugs_for_principal(principal_id)
            .await?;

        Ok(permissions.into_iter().collect())
    }

    /// Ensures the principal holds the permission.
    pub async fn require_permission(
        &self,
        principal_id: PrincipalId,
        slug: &str,
    ) -> AppResult<()> {
        if self.has_permission(principal_id, slug).await? {
            return Ok(());
        }

        Err(forbidden())
    }

    /// Ensures the principal holds at least one of the permissions.
    pub async fn require_any_permission(
        &self,
        principal_id: PrincipalId,
        slugs: &[&str],
    ) -> AppResult<()> {
        if self.has_any_permission(principal_id, slugs).await? {
            return Ok(());
        }

        Err(forbidden())
    }

    /// Ensures the principal holds the role.
    pub async fn require_role(&self, principal_id: PrincipalId, slug: &str) -> AppResult<()> {
        if self.has_role(principal_id, slug).await? {
            return Ok(());
        }

        Err(forbidden())
    }

    /// Ensures the principal holds at least one of the roles.
    pub async fn require_any_role(
        &self,
        principal_id: PrincipalId,
        slugs: &[&str],
    ) -> AppResult<()> {
        if self.has_any_role(principal_id, slugs).await? {
            return Ok(());
        }

        Err(forbidden())
    }

    async fn is_super_admin(&self, principal_id: PrincipalId) -> AppResult<bool> {
        self.has_role(principal_id, SUPER_ADMIN_SLUG).await
    }
}

// Authorization failures stay generic so callers cannot enumerate the
// permission catalogue from error messages.
fn forbidden() -> AppError {
    AppError::Forbidden("you do not have the required permission".to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use cambo_core::{AppError, AppResult};
    use cambo_domain::{PrincipalId, SUPER_ADMIN_SLUG, Slug};

    use super::{AuthorizationRepository, AuthorizationService};

    #[derive(Default)]
    struct FakeAuthorizationRepository {
        roles: HashMap<PrincipalId, Vec<Slug>>,
        permissions: HashMap<PrincipalId, Vec<Slug>>,
    }

    #[async_trait]
    impl AuthorizationRepository for FakeAuthorizationRepository {
        async fn list_role_slugs_for_principal(
            &self,
            principal_id: PrincipalId,
        ) -> AppResult<Vec<Slug>> {
            Ok(self.roles.get(&principal_id).cloned().unwrap_or_default())
        }

        async fn list_permission_slugs_for_principal(
            &self,
            principal_id: PrincipalId,
        ) -> AppResult<Vec<Slug>> {
            Ok(self
                .permissions
                .get(&principal_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn slugs(values: &[&str]) -> Vec<Slug> {
        values
            .iter()
            .map(|value| Slug::new(*value).unwrap_or_else(|_| unreachable!()))
            .collect()
    }

    fn service_for(
        principal_id: PrincipalId,
        roles: &[&str],
        permissions: &[&str],
    ) -> AuthorizationService {
        AuthorizationService::new(Arc::new(FakeAuthorizationRepository {
            roles: HashMap::from([(principal_id, slugs(roles))]),
            permissions: HashMap::from([(principal_id, slugs(permissions))]),
        }))
    }

    #[tokio::test]
    async fn has_permission_checks_effective_set() {
        let principal_id = PrincipalId::new();
        let service = service_for(principal_id, &["editor"], &["posts.edit"]);

        assert!(matches!(
            service.has_permission(principal_id, "posts.edit").await,
            Ok(true)
        ));
        assert!(matches!(
            service.has_permission(principal_id, "posts.delete").await,
            Ok(false)
        ));
    }

    #[tokio::test]
    async fn super_admin_holds_every_permission() {
        let principal_id = PrincipalId::new();
        let service = service_for(principal_id, &[SUPER_ADMIN_SLUG], &[]);

        assert!(matches!(
            service.has_permission(principal_id, "anything.at.all").await,
            Ok(true)
        ));
        assert!(matches!(
            service
                .has_all_permissions(principal_id, &["users.edit", "reports.export"])
                .await,
            Ok(true)
        ));
    }

    #[tokio::test]
    async fn super_admin_does_not_shortcut_role_identity() {
        let principal_id = PrincipalId::new();
        let service = service_for(principal_id, &[SUPER_ADMIN_SLUG], &[]);

        assert!(matches!(
            service.has_role(principal_id, "editor").await,
            Ok(false)
        ));
    }

    #[tokio::test]
    async fn empty_inputs_follow_vacuous_truth() {
        let principal_id = PrincipalId::new();
        let service = service_for(principal_id, &[], &[]);

        assert!(matches!(
            service.has_all_permissions(principal_id, &[]).await,
            Ok(true)
        ));
        assert!(matches!(
            service.has_any_permission(principal_id, &[]).await,
            Ok(false)
        ));
        assert!(matches!(
            service.has_all_roles(principal_id, &[]).await,
            Ok(true)
        ));
        assert!(matches!(
            service.has_any_role(principal_id, &[]).await,
            Ok(false)
        ));
    }

    #[tokio::test]
    async fn effective_permissions_deduplicate_across_roles() {
        let principal_id = PrincipalId::new();
        // The raw repository union may carry duplicates from overlapping roles.
        let service = service_for(
            principal_id,
            &["writer", "reviewer"],
            &["posts.edit", "posts.view", "posts.edit"],
        );

        let result = service.effective_permissions(principal_id).await;
        assert!(result.is_ok_and(|permissions| {
            permissions.len() == 2
                && permissions.iter().any(|slug| slug.as_str() == "posts.edit")
                && permissions.iter().any(|slug| slug.as_str() == "posts.view")
        }));
    }

    #[tokio::test]
    async fn require_permission_hides_the_missing_slug() {
        let principal_id = PrincipalId::new();
        let service = service_for(principal_id, &[], &[]);

        let result = service
            .require_permission(principal_id, "users.delete")
            .await;
        match result {
            Err(AppError::Forbidden(message)) => assert!(!message.contains("users.delete")),
            _ => panic!("expected a forbidden error"),
        }
    }

    #[tokio::test]
    async fn unknown_principal_has_no_roles() {
        let service = service_for(PrincipalId::new(), &["editor"], &[]);
        let stranger = PrincipalId::new();

        assert!(matches!(
            service.has_role(stranger, "editor").await,
            Ok(false)
        ));
        assert!(matches!(
            service.has_permission(stranger, "posts.edit").await,
            Ok(false)
        ));
    }
}
