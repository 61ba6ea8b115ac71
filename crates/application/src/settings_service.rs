//! Typed settings store with optional encryption at rest.
//!
//! Values are persisted as strings and coerced on read according to the
//! entry's declared type. Encrypted entries hold ciphertext in storage;
//! the service decrypts before coercion and encrypts before writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use cambo_core::{AppError, AppResult, UserIdentity};
use cambo_domain::{AuditAction, PrincipalId, Setting, Slug};
use serde_json::Value;

use crate::{AuditEvent, AuditRepository, AuthorizationService, gates};

/// Repository port for settings persistence.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Lists every setting entry.
    async fn list_settings(&self) -> AppResult<Vec<Setting>>;

    /// Finds a setting by key.
    async fn find_by_key(&self, key: &Slug) -> AppResult<Option<Setting>>;

    /// Inserts a setting definition; existing keys are left untouched.
    async fn register_setting(&self, setting: &Setting) -> AppResult<()>;

    /// Replaces the stored raw value for a key.
    async fn update_value(&self, key: &Slug, value: Option<String>) -> AppResult<()>;
}

/// Port for symmetric encryption of sensitive setting values.
pub trait SecretEncryptor: Send + Sync {
    /// Encrypts a plaintext value into an opaque storage string.
    fn encrypt(&self, plaintext: &str) -> AppResult<String>;

    /// Decrypts a storage string back to plaintext.
    fn decrypt(&self, ciphertext: &str) -> AppResult<String>;
}

/// Application service for reading and writing settings.
#[derive(Clone)]
pub struct SettingsService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn SettingsRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    encryptor: Arc<dyn SecretEncryptor>,
}

impl SettingsService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn SettingsRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        encryptor: Arc<dyn SecretEncryptor>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
            audit_repository,
            encryptor,
        }
    }

    /// Returns the typed value for a key, decrypting when necessary.
    ///
    /// This is the internal read path used by the application itself and
    /// carries no permission gate.
    pub async fn value(&self, key: &str) -> AppResult<Value> {
        let setting = self.find_setting(key).await?;
        self.typed_value(&setting)
    }

    /// Returns a boolean setting, treating anything but `true` as `false`.
    pub async fn flag(&self, key: &str) -> AppResult<bool> {
        Ok(self.value(key).await? == Value::Bool(true))
    }

    /// Returns all settings grouped for administrative display, ordered by
    /// their configured position within each group.
    pub async fn list_grouped(
        &self,
        actor: &UserIdentity,
    ) -> AppResult<BTreeMap<String, Vec<Setting>>> {
        self.require(actor, gates::SETTINGS_VIEW).await?;

        let mut settings = self.repository.list_settings().await?;
        settings.sort_by_key(Setting::order);

        let mut grouped: BTreeMap<String, Vec<Setting>> = BTreeMap::new();
        for setting in settings {
            grouped
                .entry(setting.group().to_owned())
                .or_default()
                .push(setting);
        }
        Ok(grouped)
    }

    /// Returns the typed values of public settings, keyed by setting key.
    ///
    /// Requires no authentication. Encrypted entries are never exposed
    /// here regardless of their public flag.
    pub async fn public_settings(&self) -> AppResult<BTreeMap<String, Value>> {
        let settings = self.repository.list_settings().await?;

        let mut values = BTreeMap::new();
        for setting in settings {
            if !setting.is_public() || setting.is_encrypted() {
                continue;
            }
            let value = setting.typed_value(None)?;
            values.insert(setting.key().as_str().to_owned(), value);
        }
        Ok(values)
    }

    /// Updates a setting value, encrypting it first when the entry is
    /// marked encrypted.
    pub async fn set(
        &self,
        actor: &UserIdentity,
        key: &str,
        value: Option<String>,
    ) -> AppResult<()> {
        self.require(actor, gates::SETTINGS_EDIT).await?;
        self.write_value(actor, key, value).await
    }

    /// Updates several settings. Each value is validated and written
    /// individually; the first failure aborts the remainder.
    pub async fn set_many(
        &self,
        actor: &UserIdentity,
        values: Vec<(String, Option<String>)>,
    ) -> AppResult<()> {
        self.require(actor, gates::SETTINGS_EDIT).await?;

        for (key, value) in values {
            self.write_value(actor, &key, value).await?;
        }
        Ok(())
    }

    /// Registers a setting definition if its key is not present yet.
    /// Used by the seed routine; existing entries keep their values.
    pub async fn register(&self, setting: &Setting) -> AppResult<()> {
        self.repository.register_setting(setting).await
    }

    async fn write_value(
        &self,
        actor: &UserIdentity,
        key: &str,
        value: Option<String>,
    ) -> AppResult<()> {
        let setting = self.find_setting(key).await?;

        // Coercion failures surface before anything is stored.
        if let Some(ref plaintext) = value {
            setting.typed_value(Some(plaintext))?;
        }

        let stored = match value {
            Some(plaintext) if setting.is_encrypted() => Some(self.encryptor.encrypt(&plaintext)?),
            other => other,
        };
        self.repository.update_value(setting.key(), stored).await?;

        self.audit_repository
            .append_event(AuditEvent {
                subject: PrincipalId::from_uuid(actor.subject()),
                action: AuditAction::SettingUpdated,
                resource_type: "setting".to_owned(),
                resource_id: setting.key().as_str().to_owned(),
                detail: None,
            })
            .await
    }

    fn typed_value(&self, setting: &Setting) -> AppResult<Value> {
        if setting.is_encrypted()
            && let Some(ciphertext) = setting.raw_value()
        {
            let plaintext = self.encryptor.decrypt(ciphertext)?;
            return setting.typed_value(Some(&plaintext));
        }

        setting.typed_value(None)
    }

    async fn require(&self, actor: &UserIdentity, gate: &str) -> AppResult<()> {
        self.authorization_service
            .require_permission(PrincipalId::from_uuid(actor.subject()), gate)
            .await
    }

    async fn find_setting(&self, key: &str) -> AppResult<Setting> {
        let key = Slug::new(key)?;
        self.repository
            .find_by_key(&key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("setting '{key}' does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    use cambo_core::{AppError, AppResult, UserIdentity};
    use cambo_domain::{PrincipalId, Setting, SettingType, Slug};

    use crate::{
        AuditEvent, AuditRepository, AuthorizationRepository, AuthorizationService, gates,
    };

    use super::{SecretEncryptor, SettingsRepository, SettingsService};

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
    struct FakeSettingsRepository {
        settings: Mutex<Vec<Setting>>,
    }

    #[async_trait]
    impl SettingsRepository for FakeSettingsRepository {
        async fn list_settings(&self) -> AppResult<Vec<Setting>> {
            Ok(self.settings.lock().await.clone())
        }

        async fn find_by_key(&self, key: &Slug) -> AppResult<Option<Setting>> {
            Ok(self
                .settings
                .lock()
                .await
                .iter()
                .find(|setting| setting.key() == key)
                .cloned())
        }

        async fn register_setting(&self, setting: &Setting) -> AppResult<()> {
            let mut settings = self.settings.lock().await;
            if !settings.iter().any(|existing| existing.key() == setting.key()) {
                settings.push(setting.clone());
            }
            Ok(())
        }

        async fn update_value(&self, key: &Slug, value: Option<String>) -> AppResult<()> {
            let mut settings = self.settings.lock().await;
            if let Some(setting) = settings.iter_mut().find(|setting| setting.key() == key) {
                setting.set_raw_value(value);
            }
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

    struct FakeSecretEncryptor;

    impl SecretEncryptor for FakeSecretEncryptor {
        fn encrypt(&self, plaintext: &str) -> AppResult<String> {
            Ok(format!("enc:{plaintext}"))
        }

        fn decrypt(&self, ciphertext: &str) -> AppResult<String> {
            ciphertext
                .strip_prefix("enc:")
                .map(str::to_owned)
                .ok_or_else(|| AppError::Internal("not ciphertext".to_owned()))
        }
    }

    fn actor() -> UserIdentity {
        UserIdentity::new(uuid::Uuid::new_v4(), "Admin", "admin@example.com")
    }

    fn entry(
        key: &str,
        setting_type: SettingType,
        value: Option<&str>,
        is_public: bool,
        is_encrypted: bool,
    ) -> Setting {
        Setting::new(
            key,
            "general",
            key,
            None,
            setting_type,
            value.map(str::to_owned),
            None,
            None,
            is_public,
            is_encrypted,
            0,
        )
        .unwrap_or_else(|_| unreachable!())
    }

    fn service_with(
        repository: Arc<FakeSettingsRepository>,
        actor_permissions: &[&str],
    ) -> SettingsService {
        let authorization = AuthorizationService::new(Arc::new(FakeAuthorizationRepository {
            permissions: actor_permissions
                .iter()
                .map(|slug| Slug::new(*slug).unwrap_or_else(|_| unreachable!()))
                .collect(),
        }));
        SettingsService::new(
            authorization,
            repository,
            Arc::new(NullAuditRepository),
            Arc::new(FakeSecretEncryptor),
        )
    }

    #[tokio::test]
    async fn set_encrypts_values_for_encrypted_entries() -> AppResult<()> {
        let repository = Arc::new(FakeSettingsRepository::default());
        let setting = entry("smtp_password", SettingType::Text, None, false, true);
        repository.register_setting(&setting).await?;
        let service = service_with(Arc::clone(&repository), &[gates::SETTINGS_EDIT]);

        service
            .set(&actor(), "smtp_password", Some("s3cret".to_owned()))
            .await?;

        let key = Slug::new("smtp_password")?;
        let stored = repository.find_by_key(&key).await?;
        assert!(
            stored.is_some_and(|setting| setting.raw_value() == Some("enc:s3cret"))
        );

        // The read path decrypts transparently.
        let value = service.value("smtp_password").await?;
        assert_eq!(value, json!("s3cret"));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_values_are_rejected_before_storage() -> AppResult<()> {
        let repository = Arc::new(FakeSettingsRepository::default());
        let setting = entry("items_per_page", SettingType::Number, Some("25"), false, false);
        repository.register_setting(&setting).await?;
        let service = service_with(Arc::clone(&repository), &[gates::SETTINGS_EDIT]);

        let result = service
            .set(&actor(), "items_per_page", Some("lots".to_owned()))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert_eq!(service.value("items_per_page").await?, json!(25));
        Ok(())
    }

    #[tokio::test]
    async fn public_settings_exclude_private_and_encrypted_entries() -> AppResult<()> {
        let repository = Arc::new(FakeSettingsRepository::default());
        repository
            .register_setting(&entry("app_name", SettingType::Text, Some("Cambo"), true, false))
            .await?;
        repository
            .register_setting(&entry("api_key", SettingType::Text, Some("x"), true, true))
            .await?;
        repository
            .register_setting(&entry("internal_flag", SettingType::Boolean, Some("1"), false, false))
            .await?;
        let service = service_with(repository, &[]);

        let values = service.public_settings().await?;
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("app_name"), Some(&json!("Cambo")));
        Ok(())
    }

    #[tokio::test]
    async fn flag_reads_boolean_settings() -> AppResult<()> {
        let repository = Arc::new(FakeSettingsRepository::default());
        repository
            .register_setting(&entry(
                "maintenance_mode",
                SettingType::Boolean,
                Some("on"),
                true,
                false,
            ))
            .await?;
        let service = service_with(repository, &[]);

        assert!(service.flag("maintenance_mode").await?);
        Ok(())
    }

    #[tokio::test]
    async fn editing_requires_the_edit_gate() -> AppResult<()> {
        let repository = Arc::new(FakeSettingsRepository::default());
        repository
            .register_setting(&entry("app_name", SettingType::Text, None, true, false))
            .await?;
        let service = service_with(repository, &[gates::SETTINGS_VIEW]);

        let result = service
            .set(&actor(), "app_name", Some("New".to_owned()))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_keys_are_not_found() {
        let repository = Arc::new(FakeSettingsRepository::default());
        let service = service_with(repository, &[]);

        let result = service.value("missing_key").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn value_equality_check_uses_missing_default() -> AppResult<()> {
        let repository = Arc::new(FakeSettingsRepository::default());
        repository
            .register_setting(&entry("optional_note", SettingType::Text, None, false, false))
            .await?;
        let service = service_with(repository, &[]);

        assert_eq!(service.value("optional_note").await?, Value::Null);
        Ok(())
    }
}
