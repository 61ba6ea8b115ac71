use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;

use cambo_application::SettingsRepository;
use cambo_core::{AppError, AppResult};
use cambo_domain::{Setting, SettingType, Slug};

use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed repository for the settings store.
#[derive(Clone)]
pub struct PostgresSettingsRepository {
    pool: PgPool,
}

impl PostgresSettingsRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SettingRow {
    key: String,
    group_name: String,
    label: String,
    description: Option<String>,
    setting_type: String,
    value: Option<String>,
    default_value: Option<String>,
    options: Option<Value>,
    is_public: bool,
    is_encrypted: bool,
    sort_order: i32,
}

impl SettingRow {
    fn into_setting(self) -> AppResult<Setting> {
        let setting_type = SettingType::from_str(self.setting_type.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode setting '{}': {error}",
                self.key
            ))
        })?;

        Setting::new(
            self.key,
            self.group_name,
            self.label,
            self.description,
            setting_type,
            self.value,
            self.default_value,
            self.options,
            self.is_public,
            self.is_encrypted,
            self.sort_order,
        )
        .map_err(|error| AppError::Internal(format!("failed to decode setting row: {error}")))
    }
}

const SETTING_COLUMNS: &str = r#"
    key, group_name, label, description, setting_type,
    value, default_value, options, is_public, is_encrypted, sort_order
"#;

#[async_trait]
impl SettingsRepository for PostgresSettingsRepository {
    async fn list_settings(&self) -> AppResult<Vec<Setting>> {
        let rows = sqlx::query_as::<_, SettingRow>(&format!(
            "SELECT {SETTING_COLUMNS} FROM settings ORDER BY group_name, sort_order, key"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list settings: {error}")))?;

        rows.into_iter().map(SettingRow::into_setting).collect()
    }

    async fn find_by_key(&self, key: &Slug) -> AppResult<Option<Setting>> {
        let row = sqlx::query_as::<_, SettingRow>(&format!(
            "SELECT {SETTING_COLUMNS} FROM settings WHERE key = $1"
        ))
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find setting: {error}")))?;

        row.map(SettingRow::into_setting).transpose()
    }

    async fn register_setting(&self, setting: &Setting) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (
                key, group_name, label, description, setting_type,
                value, default_value, options, is_public, is_encrypted, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(setting.key().as_str())
        .bind(setting.group())
        .bind(setting.label())
        .bind(setting.description())
        .bind(setting.setting_type().as_str())
        .bind(setting.raw_value())
        .bind(setting.default_value())
        .bind(setting.options())
        .bind(setting.is_public())
        .bind(setting.is_encrypted())
        .bind(setting.order())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to register setting: {error}")))?;

        Ok(())
    }

    async fn update_value(&self, key: &Slug, value: Option<String>) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE settings
            SET value = $2, updated_at = now()
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update setting: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "setting '{key}' does not exist"
            )));
        }

        Ok(())
    }
}
