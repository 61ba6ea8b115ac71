use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use cambo_application::{PrincipalOverview, PrincipalRecord, PrincipalRepository};
use cambo_core::{AppError, AppResult};
use cambo_domain::{PrincipalId, Slug};

use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed repository for principal accounts.
#[derive(Clone)]
pub struct PostgresPrincipalRepository {
    pool: PgPool,
}

impl PostgresPrincipalRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PrincipalRow {
    id: Uuid,
    display_name: String,
    email: String,
    password_hash: String,
}

impl From<PrincipalRow> for PrincipalRecord {
    fn from(row: PrincipalRow) -> Self {
        Self {
            id: PrincipalId::from_uuid(row.id),
            display_name: row.display_name,
            email: row.email,
            password_hash: row.password_hash,
        }
    }
}

#[async_trait]
impl PrincipalRepository for PostgresPrincipalRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<PrincipalRecord>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, display_name, email, password_hash
            FROM principals
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find principal: {error}")))?;

        Ok(row.map(PrincipalRecord::from))
    }

    async fn find_by_id(&self, principal_id: PrincipalId) -> AppResult<Option<PrincipalRecord>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, display_name, email, password_hash
            FROM principals
            WHERE id = $1
            "#,
        )
        .bind(principal_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find principal: {error}")))?;

        Ok(row.map(PrincipalRecord::from))
    }

    async fn create(
        &self,
        display_name: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<PrincipalId> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO principals (display_name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(display_name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(email_conflict_or_internal)?;

        Ok(PrincipalId::from_uuid(id))
    }

    async fn list_with_roles(&self) -> AppResult<Vec<PrincipalOverview>> {
        let principals = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, display_name, email, password_hash
            FROM principals
            ORDER BY email
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list principals: {error}")))?;

        #[derive(FromRow)]
        struct AssignmentRow {
            principal_id: Uuid,
            slug: String,
        }

        let assignments = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT principal_roles.principal_id, roles.slug
            FROM principal_roles
            INNER JOIN roles
                ON roles.id = principal_roles.role_id
            ORDER BY roles.slug
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?;

        let mut roles: HashMap<Uuid, Vec<Slug>> = HashMap::new();
        for row in assignments {
            let slug = Slug::new(row.slug.as_str()).map_err(|error| {
                AppError::Internal(format!("failed to decode role slug '{}': {error}", row.slug))
            })?;
            roles.entry(row.principal_id).or_default().push(slug);
        }

        Ok(principals
            .into_iter()
            .map(|row| PrincipalOverview {
                id: PrincipalId::from_uuid(row.id),
                roles: roles.remove(&row.id).unwrap_or_default(),
                display_name: row.display_name,
                email: row.email,
            })
            .collect())
    }
}

fn email_conflict_or_internal(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref database_error) = error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict("an account with this email already exists".to_owned());
    }

    AppError::Internal(format!("failed to create principal: {error}"))
}
