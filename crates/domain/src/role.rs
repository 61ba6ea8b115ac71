//! Role entity and its invariants.

use std::fmt::{Display, Formatter};

use cambo_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permission::Slug;

/// Reserved role slug granting every permission unconditionally.
///
/// Recognized by the evaluation logic itself; the role carries no explicit
/// permission list and can never be deleted.
pub const SUPER_ADMIN_SLUG: &str = "super-admin";

/// Unique identifier for a role record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named, administratively managed bundle of permissions.
///
/// At most one role carries `is_default = true` at any time; the
/// repository enforces the invariant transactionally on writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    slug: Slug,
    name: NonEmptyString,
    description: Option<String>,
    is_default: bool,
}

impl Role {
    /// Creates a role with validated attributes.
    pub fn new(
        id: RoleId,
        slug: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        is_default: bool,
    ) -> AppResult<Self> {
        let description = description.filter(|value| !value.trim().is_empty());
        if let Some(ref value) = description
            && value.len() > 1000
        {
            return Err(AppError::Validation(
                "role description must not exceed 1000 characters".to_owned(),
            ));
        }

        Ok(Self {
            id,
            slug: Slug::new(slug)?,
            name: NonEmptyString::new(name)?,
            description,
            is_default,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the stable slug key.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns whether this role is auto-assigned to new principals.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Returns whether this role is the reserved all-permissions role.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.slug.as_str() == SUPER_ADMIN_SLUG
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, RoleId, SUPER_ADMIN_SLUG};

    #[test]
    fn role_requires_valid_slug() {
        let result = Role::new(RoleId::new(), "Not A Slug", "Editors", None, false);
        assert!(result.is_err());
    }

    #[test]
    fn blank_description_is_dropped() {
        let result = Role::new(
            RoleId::new(),
            "editor",
            "Editor",
            Some("   ".to_owned()),
            false,
        );
        assert!(result.is_ok_and(|role| role.description().is_none()));
    }

    #[test]
    fn reserved_slug_is_recognized() {
        let role = Role::new(
            RoleId::new(),
            SUPER_ADMIN_SLUG,
            "Super Administrator",
            None,
            false,
        );
        assert!(role.is_ok_and(|role| role.is_super_admin()));
    }
}
