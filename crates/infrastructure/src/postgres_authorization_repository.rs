use async_trait::async_trait;

use cambo_application::AuthorizationRepository;
use cambo_core::{AppError, AppResult};
use cambo_domain::{PrincipalId, Slug};

use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed repository for role and permission lookups.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SlugRow {
    slug: String,
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn list_role_slugs_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<Slug>> {
        let rows = sqlx::query_as::<_, SlugRow>(
            r#"
            SELECT roles.slug
            FROM principal_roles
            INNER JOIN roles
                ON roles.id = principal_roles.role_id
            WHERE principal_roles.principal_id = $1
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role slugs: {error}")))?;

        decode_slugs(rows, "role")
    }

    async fn list_permission_slugs_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Vec<Slug>> {
        let rows = sqlx::query_as::<_, SlugRow>(
            r#"
            SELECT DISTINCT permissions.slug
            FROM principal_roles
            INNER JOIN role_permissions
                ON role_permissions.role_id = principal_roles.role_id
            INNER JOIN permissions
                ON permissions.id = role_permissions.permission_id
            WHERE principal_roles.principal_id = $1
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load permission slugs: {error}"))
        })?;

        decode_slugs(rows, "permission")
    }
}

fn decode_slugs(rows: Vec<SlugRow>, kind: &str) -> AppResult<Vec<Slug>> {
    rows.into_iter()
        .map(|row| {
            Slug::new(row.slug.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode {kind} slug '{}': {error}",
                    row.slug
                ))
            })
        })
        .collect()
}
