//! Permission slugs gating the administrative use-cases.
//!
//! These are the slugs seeded into the permission catalogue; handlers and
//! services reference them by constant rather than by repeated literals.

/// View roles and the permission catalogue.
pub const ROLES_VIEW: &str = "roles.view";
/// Create roles.
pub const ROLES_CREATE: &str = "roles.create";
/// Edit roles, their permissions, and the default role.
pub const ROLES_EDIT: &str = "roles.edit";
/// Delete roles.
pub const ROLES_DELETE: &str = "roles.delete";
/// View principal accounts and their assignments.
pub const USERS_VIEW: &str = "users.view";
/// Create principal accounts.
pub const USERS_CREATE: &str = "users.create";
/// Edit principal accounts and their role assignments.
pub const USERS_EDIT: &str = "users.edit";
/// View settings.
pub const SETTINGS_VIEW: &str = "settings.view";
/// Edit settings.
pub const SETTINGS_EDIT: &str = "settings.edit";
