use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Principal information persisted in the authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: Uuid,
    display_name: String,
    email: String,
}

impl UserIdentity {
    /// Creates a principal identity from authentication data.
    #[must_use]
    pub fn new(subject: Uuid, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject,
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    /// Returns the stable principal identifier.
    #[must_use]
    pub fn subject(&self) -> Uuid {
        self.subject
    }

    /// Returns the display name for the current principal.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the principal's email address.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }
}
