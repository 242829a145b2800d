//! Composable capability checks run by handlers before the core logic.

use crate::error::{AppError, Result};
use crate::models::Identity;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Any logged-in user.
    Authenticated,
    /// A logged-in user who is one of the listed owners.
    OwnerOf(Vec<Uuid>),
}

impl Capability {
    /// Returns the identity when the capability holds.
    pub fn check<'a>(&self, who: Option<&'a Identity>) -> Result<&'a Identity> {
        let who = who.ok_or(AppError::Unauthenticated)?;
        match self {
            Self::Authenticated => Ok(who),
            Self::OwnerOf(owners) if owners.contains(&who.user_id) => Ok(who),
            Self::OwnerOf(_) => Err(AppError::Unauthorized(format!(
                "{} may not act on this resource",
                who.username
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn someone() -> Identity {
        Identity {
            user_id: Uuid::now_v7(),
            username: "kestrel".into(),
        }
    }

    #[test]
    fn anonymous_callers_are_unauthenticated() {
        assert!(matches!(
            Capability::Authenticated.check(None),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            Capability::OwnerOf(vec![Uuid::now_v7()]).check(None),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn ownership_accepts_any_listed_owner() {
        let me = someone();
        let other = Uuid::now_v7();
        assert!(Capability::OwnerOf(vec![other, me.user_id]).check(Some(&me)).is_ok());
        assert!(matches!(
            Capability::OwnerOf(vec![other]).check(Some(&me)),
            Err(AppError::Unauthorized(_))
        ));
    }
}
