use sqlx::{Postgres, Transaction};

use super::*;

// Set difference against the target grant set: remove grants that left,
// insert the ones that joined, leave the rest untouched. Runs on the
// caller's transaction so role writes and grant writes commit together.
pub(super) async fn replace_grants(
    transaction: &mut Transaction<'_, Postgres>,
    role_id: RoleId,
    permission_ids: &[PermissionId],
) -> AppResult<()> {
    let keep: Vec<Uuid> = permission_ids.iter().map(PermissionId::as_uuid).collect();
    sqlx::query(
        r#"
        DELETE FROM role_permissions
        WHERE role_id = $1
            AND permission_id <> ALL($2)
        "#,
    )
    .bind(role_id.as_uuid())
    .bind(&keep)
    .execute(&mut **transaction)
    .await
    .map_err(|error| AppError::Internal(format!("failed to prune role grants: {error}")))?;

    for permission_id in &keep {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id)
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role grant: {error}")))?;
    }

    Ok(())
}

impl PostgresRoleAdminRepository {
    pub(super) async fn list_permissions_impl(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, slug, name, group_name
            FROM permissions
            ORDER BY group_name, slug
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    pub(super) async fn insert_permission_impl(&self, permission: &Permission) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions (id, slug, name, group_name)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(permission.id().as_uuid())
        .bind(permission.slug().as_str())
        .bind(permission.name())
        .bind(permission.group())
        .execute(&self.pool)
        .await
        .map_err(|error| slug_conflict_or_internal(error, "permission", permission.slug()))?;

        Ok(())
    }

    pub(super) async fn resolve_permission_ids_by_slugs_impl(
        &self,
        slugs: &[Slug],
    ) -> AppResult<Vec<PermissionId>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<String> = slugs.iter().map(|slug| slug.as_str().to_owned()).collect();
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM permissions
            WHERE slug = ANY($1)
            ORDER BY slug
            "#,
        )
        .bind(values)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve permissions: {error}")))?;

        Ok(ids.into_iter().map(PermissionId::from_uuid).collect())
    }

    pub(super) async fn attach_permissions_to_role_impl(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        for permission_id in permission_ids {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                VALUES ($1, $2)
                ON CONFLICT (role_id, permission_id) DO NOTHING
                "#,
            )
            .bind(role_id.as_uuid())
            .bind(permission_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist role grant: {error}"))
            })?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    pub(super) async fn detach_permissions_from_role_impl(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        if permission_ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = permission_ids.iter().map(PermissionId::as_uuid).collect();
        sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id = $1
                AND permission_id = ANY($2)
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke role grants: {error}")))?;

        Ok(())
    }

    pub(super) async fn replace_role_permissions_impl(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        replace_grants(&mut transaction, role_id, permission_ids).await?;

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }
}
