//! Principal account lifecycle and authentication.
//!
//! Login failures stay generic (unknown email, wrong password, missing
//! hash all look the same) and the hasher always runs so response timing
//! does not reveal whether an account exists.

use std::sync::Arc;

use async_trait::async_trait;
use cambo_core::{AppError, AppResult, UserIdentity};
use cambo_domain::{AuditAction, EmailAddress, PrincipalId, Role, Slug, validate_password};

use crate::{AuditEvent, AuditRepository, AuthorizationService, RoleAdminRepository, gates};

/// Principal record returned by repository queries.
#[derive(Debug, Clone)]
pub struct PrincipalRecord {
    /// Unique principal identifier.
    pub id: PrincipalId,
    /// Display name.
    pub display_name: String,
    /// Canonical email address.
    pub email: String,
    /// Argon2id password hash.
    pub password_hash: String,
}

/// Listing projection including the principal's assigned role slugs.
#[derive(Debug, Clone)]
pub struct PrincipalOverview {
    /// Unique principal identifier.
    pub id: PrincipalId,
    /// Display name.
    pub display_name: String,
    /// Canonical email address.
    pub email: String,
    /// Slugs of the assigned roles.
    pub roles: Vec<Slug>,
}

/// Input payload for creating a principal account.
#[derive(Debug, Clone)]
pub struct CreatePrincipalInput {
    /// Display name.
    pub display_name: String,
    /// Email address.
    pub email: String,
    /// Plaintext password, validated against the length policy.
    pub password: String,
    /// Role slugs to assign; unknown slugs are dropped. When nothing
    /// resolves, the configured default role is assigned instead.
    pub roles: Vec<String>,
}

/// Repository port for principal persistence.
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Finds a principal by canonical email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<PrincipalRecord>>;

    /// Finds a principal by identifier.
    async fn find_by_id(&self, principal_id: PrincipalId) -> AppResult<Option<PrincipalRecord>>;

    /// Creates a principal record. Returns the assigned identifier.
    async fn create(
        &self,
        display_name: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<PrincipalId>;

    /// Lists all principals with their assigned role slugs.
    async fn list_with_roles(&self) -> AppResult<Vec<PrincipalOverview>>;
}

/// Port for password hashing. Keeps the application layer free of direct
/// cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Result of a login attempt.
#[derive(Debug)]
pub enum AuthOutcome {
    /// Authentication succeeded; a session can be established.
    Authenticated(PrincipalRecord),
    /// Authentication failed. The reason is deliberately not surfaced.
    Failed,
}

/// Application service for principal accounts.
#[derive(Clone)]
pub struct PrincipalService {
    authorization_service: AuthorizationService,
    principal_repository: Arc<dyn PrincipalRepository>,
    role_admin_repository: Arc<dyn RoleAdminRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl PrincipalService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        principal_repository: Arc<dyn PrincipalRepository>,
        role_admin_repository: Arc<dyn RoleAdminRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            authorization_service,
            principal_repository,
            role_admin_repository,
            audit_repository,
            password_hasher,
        }
    }

    /// Creates a principal account and assigns its initial roles.
    pub async fn create_principal(
        &self,
        actor: &UserIdentity,
        input: CreatePrincipalInput,
    ) -> AppResult<PrincipalId> {
        self.authorization_service
            .require_permission(PrincipalId::from_uuid(actor.subject()), gates::USERS_CREATE)
            .await?;

        let email = EmailAddress::new(&input.email)?;
        validate_password(&input.password)?;

        let existing = self.principal_repository.find_by_email(email.as_str()).await?;
        if existing.is_some() {
            // Hash anyway so the duplicate path takes as long as the
            // happy path.
            let _ = self.password_hasher.hash_password(&input.password);
            return Err(AppError::Conflict(
                "an account with this email address already exists".to_owned(),
            ));
        }

        let password_hash = self.password_hasher.hash_password(&input.password)?;
        let principal_id = self
            .principal_repository
            .create(&input.display_name, email.as_str(), &password_hash)
            .await?;

        let requested: Vec<Slug> = input
            .roles
            .iter()
            .filter_map(|slug| Slug::new(slug.as_str()).ok())
            .collect();
        let mut roles = self
            .role_admin_repository
            .resolve_roles_by_slugs(&requested)
            .await?;
        if roles.is_empty()
            && let Some(default_role) = self.role_admin_repository.find_default_role().await?
        {
            roles.push(default_role);
        }
        let role_ids: Vec<_> = roles.iter().map(Role::id).collect();
        self.role_admin_repository
            .attach_roles_to_principal(principal_id, &role_ids)
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                subject: PrincipalId::from_uuid(actor.subject()),
                action: AuditAction::PrincipalCreated,
                resource_type: "principal".to_owned(),
                resource_id: principal_id.to_string(),
                detail: Some(format!("created account for '{}'", email.as_str())),
            })
            .await?;

        Ok(principal_id)
    }

    /// Authenticates a principal with email and password.
    ///
    /// Returns [`AuthOutcome::Failed`] for any failure so callers cannot
    /// distinguish unknown accounts from wrong passwords.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthOutcome> {
        let normalized = match EmailAddress::new(email) {
            Ok(address) => address,
            Err(_) => {
                let _ = self.password_hasher.hash_password(password);
                return Ok(AuthOutcome::Failed);
            }
        };

        let Some(principal) = self
            .principal_repository
            .find_by_email(normalized.as_str())
            .await?
        else {
            let _ = self.password_hasher.hash_password(password);
            return Ok(AuthOutcome::Failed);
        };

        let valid = self
            .password_hasher
            .verify_password(password, &principal.password_hash)?;
        if !valid {
            return Ok(AuthOutcome::Failed);
        }

        Ok(AuthOutcome::Authenticated(principal))
    }

    /// Returns all principals with their role slugs.
    pub async fn list_principals(
        &self,
        actor: &UserIdentity,
    ) -> AppResult<Vec<PrincipalOverview>> {
        self.authorization_service
            .require_permission(PrincipalId::from_uuid(actor.subject()), gates::USERS_VIEW)
            .await?;

        self.principal_repository.list_with_roles().await
    }

    /// Returns a principal record by identifier, if it exists.
    pub async fn find_by_id(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Option<PrincipalRecord>> {
        self.principal_repository.find_by_id(principal_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use cambo_core::{AppError, AppResult, UserIdentity};
    use cambo_domain::{
        Permission, PermissionId, PrincipalId, Role, RoleId, Slug,
    };

    use crate::role_admin_service::{RoleAssignment, RoleDefinition};
    use crate::{
        AuditEvent, AuditRepository, AuthorizationRepository, AuthorizationService,
        RoleAdminRepository, gates,
    };

    use super::{
        AuthOutcome, CreatePrincipalInput, PasswordHasher, PrincipalOverview, PrincipalRecord,
        PrincipalRepository, PrincipalService,
    };

    struct FakeAuthorizationRepository {
        permissions: Vec<Slug>,
    }

    #[async_trait]
    impl AuthorizationRepository for FakeAuthorizationRepository {
        async fn list_role_slugs_for_principal(
            &self,
            _principal_id: PrincipalId,
        ) -> AppResult<Vec<Slug>> {
            Ok(Vec::new())
        }

        async fn list_permission_slugs_for_principal(
            &self,
            _principal_id: PrincipalId,
        ) -> AppResult<Vec<Slug>> {
            Ok(self.permissions.clone())
        }
    }

    #[derive(Default)]
    struct FakePrincipalRepository {
        records: Mutex<Vec<PrincipalRecord>>,
    }

    #[async_trait]
    impl PrincipalRepository for FakePrincipalRepository {
        async fn find_by_email(&self, email: &str) -> AppResult<Option<PrincipalRecord>> {
            Ok(self
                .records
                .lock()
                .await
                .iter()
                .find(|record| record.email == email)
                .cloned())
        }

        async fn find_by_id(
            &self,
            principal_id: PrincipalId,
        ) -> AppResult<Option<PrincipalRecord>> {
            Ok(self
                .records
                .lock()
                .await
                .iter()
                .find(|record| record.id == principal_id)
                .cloned())
        }

        async fn create(
            &self,
            display_name: &str,
            email: &str,
            password_hash: &str,
        ) -> AppResult<PrincipalId> {
            let id = PrincipalId::new();
            self.records.lock().await.push(PrincipalRecord {
                id,
                display_name: display_name.to_owned(),
                email: email.to_owned(),
                password_hash: password_hash.to_owned(),
            });
            Ok(id)
        }

        async fn list_with_roles(&self) -> AppResult<Vec<PrincipalOverview>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeRoleAdminRepository {
        roles: Mutex<Vec<Role>>,
        assignments: Mutex<HashMap<PrincipalId, Vec<RoleId>>>,
    }

    #[async_trait]
    impl RoleAdminRepository for FakeRoleAdminRepository {
        async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>> {
            Ok(Vec::new())
        }

        async fn find_role_by_slug(&self, slug: &Slug) -> AppResult<Option<Role>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .find(|role| role.slug() == slug)
                .cloned())
        }

        async fn insert_role_with_permissions(
            &self,
            role: &Role,
            _permission_ids: &[PermissionId],
        ) -> AppResult<()> {
            self.roles.lock().await.push(role.clone());
            Ok(())
        }

        async fn update_role_with_permissions(
            &self,
            _role: &Role,
            _permission_ids: Option<&[PermissionId]>,
        ) -> AppResult<()> {
            Ok(())
        }

        async fn delete_role_if_unassigned(&self, _role_id: RoleId) -> AppResult<u64> {
            Ok(0)
        }

        async fn set_default_role(&self, _role_id: RoleId) -> AppResult<()> {
            Ok(())
        }

        async fn find_default_role(&self) -> AppResult<Option<Role>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .find(|role| role.is_default())
                .cloned())
        }

        async fn resolve_roles_by_slugs(&self, slugs: &[Slug]) -> AppResult<Vec<Role>> {
            Ok(self
                .roles
                .lock()
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
            self.assignments
                .lock()
                .await
                .entry(principal_id)
                .or_default()
                .extend_from_slice(role_ids);
            Ok(())
        }

        async fn detach_roles_from_principal(
            &self,
            _principal_id: PrincipalId,
            _role_ids: &[RoleId],
        ) -> AppResult<()> {
            Ok(())
        }

        async fn replace_principal_roles(
            &self,
            _principal_id: PrincipalId,
            _role_ids: &[RoleId],
        ) -> AppResult<()> {
            Ok(())
        }

        async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
            Ok(Vec::new())
        }

        async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
            Ok(Vec::new())
        }

        async fn insert_permission(&self, _permission: &Permission) -> AppResult<()> {
            Ok(())
        }

        async fn resolve_permission_ids_by_slugs(
            &self,
            _slugs: &[Slug],
        ) -> AppResult<Vec<PermissionId>> {
            Ok(Vec::new())
        }

        async fn attach_permissions_to_role(
            &self,
            _role_id: RoleId,
            _permission_ids: &[PermissionId],
        ) -> AppResult<()> {
            Ok(())
        }

        async fn detach_permissions_from_role(
            &self,
            _role_id: RoleId,
            _permission_ids: &[PermissionId],
        ) -> AppResult<()> {
            Ok(())
        }

        async fn replace_role_permissions(
            &self,
            _role_id: RoleId,
            _permission_ids: &[PermissionId],
        ) -> AppResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct NullAuditRepository;

    #[async_trait]
    impl AuditRepository for NullAuditRepository {
        async fn append_event(&self, _event: AuditEvent) -> AppResult<()> {
            Ok(())
        }
    }

    struct FakePasswordHasher;

    impl PasswordHasher for FakePasswordHasher {
        fn hash_password(&self, password: &str) -> AppResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    fn actor() -> UserIdentity {
        UserIdentity::new(uuid::Uuid::new_v4(), "Admin", "admin@example.com")
    }

    fn service_with(
        principals: Arc<FakePrincipalRepository>,
        roles: Arc<FakeRoleAdminRepository>,
        actor_permissions: &[&str],
    ) -> PrincipalService {
        let authorization = AuthorizationService::new(Arc::new(FakeAuthorizationRepository {
            permissions: actor_permissions
                .iter()
                .map(|slug| Slug::new(*slug).unwrap_or_else(|_| unreachable!()))
                .collect(),
        }));
        PrincipalService::new(
            authorization,
            principals,
            roles,
            Arc::new(NullAuditRepository),
            Arc::new(FakePasswordHasher),
        )
    }

    fn input(roles: &[&str]) -> CreatePrincipalInput {
        CreatePrincipalInput {
            display_name: "Sok Dara".to_owned(),
            email: "dara@example.com".to_owned(),
            password: "a-long-enough-password".to_owned(),
            roles: roles.iter().map(|slug| (*slug).to_owned()).collect(),
        }
    }

    #[tokio::test]
    async fn create_assigns_the_default_role_when_none_requested() -> AppResult<()> {
        let principals = Arc::new(FakePrincipalRepository::default());
        let roles = Arc::new(FakeRoleAdminRepository::default());
        let default_role = Role::new(RoleId::new(), "member", "Member", None, true)?;
        roles.insert_role_with_permissions(&default_role, &[]).await?;
        let service = service_with(
            Arc::clone(&principals),
            Arc::clone(&roles),
            &[gates::USERS_CREATE],
        );

        let principal_id = service.create_principal(&actor(), input(&[])).await?;

        let assignments = roles.assignments.lock().await;
        assert_eq!(assignments.get(&principal_id), Some(&vec![default_role.id()]));
        Ok(())
    }

    #[tokio::test]
    async fn create_prefers_explicitly_requested_roles() -> AppResult<()> {
        let principals = Arc::new(FakePrincipalRepository::default());
        let roles = Arc::new(FakeRoleAdminRepository::default());
        let default_role = Role::new(RoleId::new(), "member", "Member", None, true)?;
        let editor = Role::new(RoleId::new(), "editor", "Editor", None, false)?;
        roles.insert_role_with_permissions(&default_role, &[]).await?;
        roles.insert_role_with_permissions(&editor, &[]).await?;
        let service = service_with(
            Arc::clone(&principals),
            Arc::clone(&roles),
            &[gates::USERS_CREATE],
        );

        let principal_id = service.create_principal(&actor(), input(&["editor"])).await?;

        let assignments = roles.assignments.lock().await;
        assert_eq!(assignments.get(&principal_id), Some(&vec![editor.id()]));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() -> AppResult<()> {
        let principals = Arc::new(FakePrincipalRepository::default());
        let roles = Arc::new(FakeRoleAdminRepository::default());
        let service = service_with(
            Arc::clone(&principals),
            Arc::clone(&roles),
            &[gates::USERS_CREATE],
        );

        service.create_principal(&actor(), input(&[])).await?;
        let result = service.create_principal(&actor(), input(&[])).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn login_fails_generically_for_unknown_and_wrong_password() -> AppResult<()> {
        let principals = Arc::new(FakePrincipalRepository::default());
        let roles = Arc::new(FakeRoleAdminRepository::default());
        let service = service_with(
            Arc::clone(&principals),
            Arc::clone(&roles),
            &[gates::USERS_CREATE],
        );
        service.create_principal(&actor(), input(&[])).await?;

        let unknown = service.login("nobody@example.com", "whatever-pass").await?;
        assert!(matches!(unknown, AuthOutcome::Failed));

        let wrong = service.login("dara@example.com", "wrong-password").await?;
        assert!(matches!(wrong, AuthOutcome::Failed));

        let right = service
            .login("dara@example.com", "a-long-enough-password")
            .await?;
        assert!(matches!(right, AuthOutcome::Authenticated(_)));
        Ok(())
    }

    #[tokio::test]
    async fn listing_requires_the_view_gate() {
        let principals = Arc::new(FakePrincipalRepository::default());
        let roles = Arc::new(FakeRoleAdminRepository::default());
        let service = service_with(principals, roles, &[]);

        let result = service.list_principals(&actor()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
