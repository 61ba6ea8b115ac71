//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod aes_secret_encryptor;
mod argon2_password_hasher;
mod in_memory_role_admin_repository;
mod postgres_audit_repository;
mod postgres_authorization_repository;
mod postgres_principal_repository;
mod postgres_role_admin_repository;
mod postgres_settings_repository;

pub use aes_secret_encryptor::AesSecretEncryptor;
pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_role_admin_repository::InMemoryRoleAdminRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_principal_repository::PostgresPrincipalRepository;
pub use postgres_role_admin_repository::PostgresRoleAdminRepository;
pub use postgres_settings_repository::PostgresSettingsRepository;
