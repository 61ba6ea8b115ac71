//! Application services and their repository ports.
//!
//! Services depend on traits only; Postgres and in-memory adapters live in
//! the infrastructure crate.

#![forbid(unsafe_code)]

mod audit;
mod authorization_service;
pub mod gates;
mod principal_service;
mod role_admin_service;
mod settings_service;

pub use audit::{AuditEvent, AuditRepository};
pub use authorization_service::{AuthorizationRepository, AuthorizationService};
pub use principal_service::{
    AuthOutcome, CreatePrincipalInput, PasswordHasher, PrincipalOverview, PrincipalRecord,
    PrincipalRepository, PrincipalService,
};
pub use role_admin_service::{
    CreatePermissionInput, CreateRoleInput, RoleAdminRepository, RoleAdminService, RoleAssignment,
    RoleDefinition, UpdateRoleInput,
};
pub use settings_service::{SecretEncryptor, SettingsRepository, SettingsService};
