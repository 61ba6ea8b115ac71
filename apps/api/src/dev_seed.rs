//! Development seed: permission catalogue, stock roles, settings, and a
//! bootstrap administrator account.
//!
//! Every step is idempotent, so the seed can run on every startup of a
//! development environment without clobbering local changes.

use std::env;
use std::sync::Arc;

use cambo_application::{
    PasswordHasher, RoleAdminRepository, SettingsRepository,
};
use cambo_core::{AppError, AppResult};
use cambo_domain::{
    Permission, PermissionId, Role, RoleId, SUPER_ADMIN_SLUG, Setting, SettingType, Slug,
};
use cambo_infrastructure::{
    Argon2PasswordHasher, PostgresRoleAdminRepository, PostgresSettingsRepository,
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

const SEED_ADMIN_EMAIL: &str = "admin@camboadmin.local";
const SEED_ADMIN_DISPLAY_NAME: &str = "Administrator";
const SEED_ADMIN_PASSWORD: &str = "change-this-password";

const PERMISSION_CATALOGUE: &[(&str, &str, &str)] = &[
    ("roles.view", "View roles", "Roles"),
    ("roles.create", "Create roles", "Roles"),
    ("roles.edit", "Edit roles", "Roles"),
    ("roles.delete", "Delete roles", "Roles"),
    ("users.view", "View users", "Users"),
    ("users.create", "Create users", "Users"),
    ("users.edit", "Edit users", "Users"),
    ("settings.view", "View settings", "Settings"),
    ("settings.edit", "Edit settings", "Settings"),
    ("reports.view", "View reports", "Reports"),
    ("dashboard.view", "View dashboard", "Dashboard"),
];

pub async fn run(pool: PgPool) -> AppResult<()> {
    let role_admin_repository = Arc::new(PostgresRoleAdminRepository::new(pool.clone()));
    let settings_repository = Arc::new(PostgresSettingsRepository::new(pool.clone()));

    ensure_permissions(role_admin_repository.as_ref()).await?;

    let super_admin = ensure_role(
        role_admin_repository.as_ref(),
        SUPER_ADMIN_SLUG,
        "Super Administrator",
        Some("Holds every permission implicitly.".to_owned()),
        &[],
    )
    .await?;
    ensure_role(
        role_admin_repository.as_ref(),
        "admin",
        "Administrator",
        Some("Full access through explicit grants.".to_owned()),
        &[
            "roles.view",
            "roles.create",
            "roles.edit",
            "roles.delete",
            "users.view",
            "users.create",
            "users.edit",
            "settings.view",
            "settings.edit",
            "reports.view",
            "dashboard.view",
        ],
    )
    .await?;
    ensure_role(
        role_admin_repository.as_ref(),
        "editor",
        "Editor",
        Some("Read access plus user management.".to_owned()),
        &[
            "roles.view",
            "users.view",
            "users.edit",
            "settings.view",
            "reports.view",
            "dashboard.view",
        ],
    )
    .await?;
    let user_role = ensure_role(
        role_admin_repository.as_ref(),
        "user",
        "User",
        None,
        &["dashboard.view"],
    )
    .await?;

    if role_admin_repository.find_default_role().await?.is_none() {
        role_admin_repository
            .set_default_role(user_role.id())
            .await?;
    }

    ensure_settings(settings_repository.as_ref()).await?;
    ensure_admin_account(&pool, role_admin_repository.as_ref(), &super_admin).await?;

    info!("development seed completed");
    Ok(())
}

async fn ensure_permissions(repository: &dyn RoleAdminRepository) -> AppResult<()> {
    for (slug, name, group) in PERMISSION_CATALOGUE {
        let permission = Permission::new(PermissionId::new(), *slug, *name, *group)?;
        match repository.insert_permission(&permission).await {
            Ok(()) | Err(AppError::Conflict(_)) => {}
            Err(error) => return Err(error),
        }
    }
    Ok(())
}

async fn ensure_role(
    repository: &dyn RoleAdminRepository,
    slug: &str,
    name: &str,
    description: Option<String>,
    permissions: &[&str],
) -> AppResult<Role> {
    let key = Slug::new(slug)?;
    if let Some(existing) = repository.find_role_by_slug(&key).await? {
        return Ok(existing);
    }

    let slugs = permissions
        .iter()
        .map(|slug| Slug::new(*slug))
        .collect::<AppResult<Vec<_>>>()?;
    let permission_ids = repository.resolve_permission_ids_by_slugs(&slugs).await?;

    let role = Role::new(RoleId::new(), slug, name, description, false)?;
    repository
        .insert_role_with_permissions(&role, &permission_ids)
        .await?;

    Ok(role)
}

async fn ensure_settings(repository: &dyn SettingsRepository) -> AppResult<()> {
    let entries = vec![
        Setting::new(
            "app_name",
            "General",
            "Application name",
            None,
            SettingType::Text,
            None,
            Some("CamboAdmin".to_owned()),
            None,
            true,
            false,
            0,
        )?,
        Setting::new(
            "brand_color",
            "General",
            "Brand color",
            None,
            SettingType::Color,
            None,
            Some("#0ea5e9".to_owned()),
            None,
            true,
            false,
            1,
        )?,
        Setting::new(
            "items_per_page",
            "General",
            "Items per page",
            Some("Default page size for administrative listings.".to_owned()),
            SettingType::Number,
            None,
            Some("25".to_owned()),
            None,
            false,
            false,
            2,
        )?,
        Setting::new(
            "maintenance_mode",
            "General",
            "Maintenance mode",
            None,
            SettingType::Boolean,
            None,
            Some("0".to_owned()),
            None,
            true,
            false,
            3,
        )?,
        Setting::new(
            "smtp_password",
            "Mail",
            "SMTP password",
            None,
            SettingType::Text,
            None,
            None,
            None,
            false,
            true,
            0,
        )?,
    ];

    for setting in &entries {
        repository.register_setting(setting).await?;
    }
    Ok(())
}

async fn ensure_admin_account(
    pool: &PgPool,
    repository: &dyn RoleAdminRepository,
    super_admin: &Role,
) -> AppResult<()> {
    let password =
        env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| SEED_ADMIN_PASSWORD.to_owned());
    let password_hash = Argon2PasswordHasher::new().hash_password(&password)?;

    sqlx::query(
        r#"
        INSERT INTO principals (display_name, email, password_hash)
        VALUES ($1, LOWER($2), $3)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(SEED_ADMIN_DISPLAY_NAME)
    .bind(SEED_ADMIN_EMAIL)
    .bind(password_hash)
    .execute(pool)
    .await
    .map_err(|error| AppError::Internal(format!("failed to ensure seed admin exists: {error}")))?;

    let admin_id: Uuid = sqlx::query_scalar("SELECT id FROM principals WHERE email = LOWER($1)")
        .bind(SEED_ADMIN_EMAIL)
        .fetch_one(pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load seed admin id: {error}")))?;

    repository
        .attach_roles_to_principal(
            cambo_domain::PrincipalId::from_uuid(admin_id),
            &[super_admin.id()],
        )
        .await
}
