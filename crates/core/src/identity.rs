//! Identity collaborator.

use std::sync::{PoisonError, RwLock};

use crate::model::CurrentUser;

/// Source of the signed-in user.
///
/// Session plumbing lives outside the core; services only ask who is signed in.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `None` when signed out.
    fn current_user(&self) -> Option<CurrentUser>;
}

/// Identity holder for a single app session.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    user: RwLock<Option<CurrentUser>>,
}

impl SessionIdentity {
    /// A session with no user signed in.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// A session with `user` signed in.
    #[must_use]
    pub fn signed_in(user: CurrentUser) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    /// Replace the signed-in user.
    pub fn set(&self, user: Option<CurrentUser>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserRole;

    #[test]
    fn test_sign_in_and_out() {
        let identity = SessionIdentity::signed_out();
        assert!(identity.current_user().is_none());

        identity.set(Some(CurrentUser {
            id: "user1".to_string(),
            name: "Alex".to_string(),
            role: UserRole::Trainee,
        }));
        assert_eq!(identity.current_user().map(|u| u.id), Some("user1".to_string()));

        identity.set(None);
        assert!(identity.current_user().is_none());
    }
}
