//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod permission;
mod principal;
mod role;
mod setting;

pub use audit::AuditAction;
pub use permission::{Permission, PermissionId, Slug, group_permissions};
pub use principal::{EmailAddress, PrincipalId, validate_password};
pub use role::{Role, RoleId, SUPER_ADMIN_SLUG};
pub use setting::{Setting, SettingType};
