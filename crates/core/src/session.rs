//! The caller an operation runs on behalf of.

use punch_common::{AppError, AppResult};

/// Explicit authentication context, passed into every operation that acts
/// for a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    /// A session with no signed-in user.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// A session for a signed-in user.
    #[must_use]
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// The signed-in user, or [`AppError::Unauthorized`].
    pub fn require_user(&self) -> AppResult<&str> {
        self.user_id().ok_or(AppError::Unauthorized)
    }
}
