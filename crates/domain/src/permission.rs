//! Permission entities and the slug contract used by authorization checks.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use cambo_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
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

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Maximum accepted slug length.
pub const SLUG_MAX_LENGTH: usize = 100;

/// Validated, stable string key identifying a permission or role.
///
/// Slugs are the external contract for authorization checks and are
/// immutable after creation: lowercase ASCII letters and digits, grouped
/// into segments separated by `.` or `-` (e.g. `users.edit`, `super-admin`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    /// Creates a validated slug.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation("slug must not be empty".to_owned()));
        }

        if trimmed.len() > SLUG_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "slug must not exceed {SLUG_MAX_LENGTH} characters"
            )));
        }

        let mut previous_was_separator = true;
        for character in trimmed.chars() {
            match character {
                'a'..='z' | '0'..='9' => previous_was_separator = false,
                '.' | '-' | '_' => {
                    if previous_was_separator {
                        return Err(AppError::Validation(format!(
                            "slug '{trimmed}' must not contain empty segments"
                        )));
                    }
                    previous_was_separator = true;
                }
                _ => {
                    return Err(AppError::Validation(format!(
                        "slug '{trimmed}' may only contain lowercase letters, digits, '.', '-' and '_'"
                    )));
                }
            }
        }

        if previous_was_separator {
            return Err(AppError::Validation(format!(
                "slug '{trimmed}' must not end with a separator"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the validated slug string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Slug {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl Display for Slug {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}

/// An atomic, slug-identified capability.
///
/// Permissions are created administratively and grouped for display only;
/// evaluation never interprets the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    slug: Slug,
    name: NonEmptyString,
    group: NonEmptyString,
}

impl Permission {
    /// Creates a permission with validated attributes.
    pub fn new(
        id: PermissionId,
        slug: impl Into<String>,
        name: impl Into<String>,
        group: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            slug: Slug::new(slug)?,
            name: NonEmptyString::new(name)?,
            group: NonEmptyString::new(group)?,
        })
    }

    /// Returns the permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the stable slug key.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    /// Returns the display label.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the display category.
    #[must_use]
    pub fn group(&self) -> &str {
        self.group.as_str()
    }
}

/// Groups permissions by their display category, ordered by group and slug.
#[must_use]
pub fn group_permissions(permissions: Vec<Permission>) -> BTreeMap<String, Vec<Permission>> {
    let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();

    for permission in permissions {
        grouped
            .entry(permission.group().to_owned())
            .or_default()
            .push(permission);
    }

    for members in grouped.values_mut() {
        members.sort_by(|left, right| left.slug().cmp(right.slug()));
    }

    grouped
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{Permission, PermissionId, Slug, group_permissions};

    #[test]
    fn slug_accepts_dotted_keys() {
        let slug = Slug::new("users.edit");
        assert!(slug.is_ok_and(|value| value.as_str() == "users.edit"));
    }

    #[test]
    fn slug_rejects_uppercase() {
        assert!(Slug::new("Users.Edit").is_err());
    }

    #[test]
    fn slug_rejects_empty_segments() {
        assert!(Slug::new("users..edit").is_err());
        assert!(Slug::new(".users").is_err());
        assert!(Slug::new("users-").is_err());
    }

    #[test]
    fn permissions_group_by_category() {
        let view = Permission::new(PermissionId::new(), "users.view", "View users", "Users")
            .unwrap_or_else(|_| unreachable!());
        let edit = Permission::new(PermissionId::new(), "users.edit", "Edit users", "Users")
            .unwrap_or_else(|_| unreachable!());
        let reports = Permission::new(PermissionId::new(), "reports.view", "View reports", "Reports")
            .unwrap_or_else(|_| unreachable!());

        let grouped = group_permissions(vec![edit, reports, view]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.get("Users").map(Vec::len), Some(2));
    }

    proptest! {
        #[test]
        fn valid_slugs_roundtrip(segments in proptest::collection::vec("[a-z0-9]{1,8}", 1..4)) {
            let candidate = segments.join(".");
            let slug = Slug::new(candidate.as_str());
            prop_assert!(slug.is_ok_and(|value| value.as_str() == candidate));
        }

        #[test]
        fn slugs_never_accept_whitespace_inside(left in "[a-z]{1,8}", right in "[a-z]{1,8}") {
            let candidate = format!("{left} {right}");
            prop_assert!(Slug::new(candidate).is_err());
        }
    }
}
