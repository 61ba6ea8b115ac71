use std::collections::HashMap;

use super::*;

impl PostgresRoleAdminRepository {
    pub(super) async fn list_roles_impl(&self) -> AppResult<Vec<RoleDefinition>> {
        let role_rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, slug, name, description, is_default
            FROM roles
            ORDER BY slug
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        #[derive(FromRow)]
        struct GrantRow {
            role_id: Uuid,
            slug: String,
        }

        let grant_rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT role_permissions.role_id, permissions.slug
            FROM role_permissions
            INNER JOIN permissions
                ON permissions.id = role_permissions.permission_id
            ORDER BY permissions.slug
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role grants: {error}")))?;

        #[derive(FromRow)]
        struct CountRow {
            role_id: Uuid,
            members: i64,
        }

        let count_rows = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT role_id, COUNT(*) AS members
            FROM principal_roles
            GROUP BY role_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count role members: {error}")))?;

        let mut grants: HashMap<Uuid, Vec<Slug>> = HashMap::new();
        for row in grant_rows {
            let slug = Slug::new(row.slug.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode permission slug '{}': {error}",
                    row.slug
                ))
            })?;
            grants.entry(row.role_id).or_default().push(slug);
        }

        let counts: HashMap<Uuid, u64> = count_rows
            .into_iter()
            .map(|row| (row.role_id, row.members.max(0) as u64))
            .collect();

        role_rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                Ok(RoleDefinition {
                    role: row.into_role()?,
                    permissions: grants.get(&id).cloned().unwrap_or_default(),
                    assigned_principals: counts.get(&id).copied().unwrap_or(0),
                })
            })
            .collect()
    }

    pub(super) async fn find_role_by_slug_impl(&self, slug: &Slug) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, slug, name, description, is_default
            FROM roles
            WHERE slug = $1
            "#,
        )
        .bind(slug.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

        row.map(RoleRow::into_role).transpose()
    }

    pub(super) async fn insert_role_with_permissions_impl(
        &self,
        role: &Role,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        // Role row and grant rows land in one transaction; a failure while
        // writing grants rolls the role back too.
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO roles (id, slug, name, description, is_default)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.slug().as_str())
        .bind(role.name())
        .bind(role.description())
        .bind(role.is_default())
        .execute(&mut *transaction)
        .await
        .map_err(|error| slug_conflict_or_internal(error, "role", role.slug()))?;

        super::permissions::replace_grants(&mut transaction, role.id(), permission_ids).await?;

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    pub(super) async fn update_role_with_permissions_impl(
        &self,
        role: &Role,
        permission_ids: Option<&[PermissionId]>,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3
            WHERE id = $1
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.name())
        .bind(role.description())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update role: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role '{}' was not found",
                role.slug()
            )));
        }

        if let Some(permission_ids) = permission_ids {
            super::permissions::replace_grants(&mut transaction, role.id(), permission_ids)
                .await?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    pub(super) async fn delete_role_if_unassigned_impl(&self, role_id: RoleId) -> AppResult<u64> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        // FOR UPDATE blocks concurrent assignment inserts until commit:
        // their foreign key check takes a key-share lock on this row.
        let locked = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM roles
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock role: {error}")))?;

        if locked.is_none() {
            return Err(AppError::NotFound("role was not found".to_owned()));
        }

        let members = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM principal_roles
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count role members: {error}")))?;

        if members > 0 {
            // Nothing was written; dropping the transaction releases the lock.
            return Ok(members.max(0) as u64);
        }

        // Permission links go with the role via ON DELETE CASCADE.
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;

        transaction
            .commit()
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to commit transaction: {error}"))
            })?;

        Ok(0)
    }

    pub(super) async fn set_default_role_impl(&self, role_id: RoleId) -> AppResult<()> {
        // Clear-then-set in one transaction; the partial unique index on
        // roles keeps concurrent writers from leaving two defaults behind.
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query("UPDATE roles SET is_default = false WHERE is_default")
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear the default role: {error}"))
            })?;

        let rows_affected = sqlx::query("UPDATE roles SET is_default = true WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to set the default role: {error}"))
            })?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound("role was not found".to_owned()));
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    pub(super) async fn find_default_role_impl(&self) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, slug, name, description, is_default
            FROM roles
            WHERE is_default
            ORDER BY slug
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load the default role: {error}")))?;

        row.map(RoleRow::into_role).transpose()
    }

    pub(super) async fn resolve_roles_by_slugs_impl(&self, slugs: &[Slug]) -> AppResult<Vec<Role>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<String> = slugs.iter().map(|slug| slug.as_str().to_owned()).collect();
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, slug, name, description, is_default
            FROM roles
            WHERE slug = ANY($1)
            ORDER BY slug
            "#,
        )
        .bind(&values)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve roles: {error}")))?;

        rows.into_iter().map(RoleRow::into_role).collect()
    }
}
