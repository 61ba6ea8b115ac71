use super::*;

#[derive(Debug, FromRow)]
struct AssignmentRow {
    principal_id: Uuid,
    role_slug: String,
    role_name: String,
    assigned_at: String,
}

impl PostgresRoleAdminRepository {
    pub(super) async fn attach_roles_to_principal_impl(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        for role_id in role_ids {
            sqlx::query(
                r#"
                INSERT INTO principal_roles (principal_id, role_id)
                VALUES ($1, $2)
                ON CONFLICT (principal_id, role_id) DO NOTHING
                "#,
            )
            .bind(principal_id.as_uuid())
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to assign role: {error}"))
            })?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    pub(super) async fn detach_roles_from_principal_impl(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        if role_ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
        sqlx::query(
            r#"
            DELETE FROM principal_roles
            WHERE principal_id = $1
                AND role_id = ANY($2)
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove role assignments: {error}")))?;

        Ok(())
    }

    pub(super) async fn replace_principal_roles_impl(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<()> {
        // Set difference inside one transaction: assignments outside the
        // new set go, missing ones are added, the overlap keeps its
        // original timestamps.
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        let keep: Vec<Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
        sqlx::query(
            r#"
            DELETE FROM principal_roles
            WHERE principal_id = $1
                AND role_id <> ALL($2)
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(&keep)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to prune role assignments: {error}"))
        })?;

        for role_id in &keep {
            sqlx::query(
                r#"
                INSERT INTO principal_roles (principal_id, role_id)
                VALUES ($1, $2)
                ON CONFLICT (principal_id, role_id) DO NOTHING
                "#,
            )
            .bind(principal_id.as_uuid())
            .bind(role_id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to assign role: {error}"))
            })?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    pub(super) async fn list_role_assignments_impl(&self) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                principal_roles.principal_id,
                roles.slug AS role_slug,
                roles.name AS role_name,
                to_char(principal_roles.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS assigned_at
            FROM principal_roles
            INNER JOIN roles
                ON roles.id = principal_roles.role_id
            ORDER BY principal_roles.principal_id, roles.slug
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role assignments: {error}")))?;

        rows.into_iter()
            .map(|row| {
                let role_slug = Slug::new(row.role_slug.as_str()).map_err(|error| {
                    AppError::Internal(format!(
                        "failed to decode role slug '{}': {error}",
                        row.role_slug
                    ))
                })?;
                Ok(RoleAssignment {
                    principal_id: PrincipalId::from_uuid(row.principal_id),
                    role_slug,
                    role_name: row.role_name,
                    assigned_at: row.assigned_at,
                })
            })
            .collect()
    }
}
