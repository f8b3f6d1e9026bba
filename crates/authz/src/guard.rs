use uuid::Uuid;

use crate::error::AuthError;

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_admin: bool,
}

pub fn require_admin(principal: &Principal) -> Result<(), AuthError> {
    if principal.is_admin {
        Ok(())
    } else {
        Err(AuthError::Forbidden("not authorized as an admin"))
    }
}

/// Only the owner of a resource may proceed.
pub fn require_owner(principal: &Principal, owner: Uuid) -> Result<(), AuthError> {
    if principal.user_id == owner {
        Ok(())
    } else {
        Err(AuthError::Forbidden("not the owner of this resource"))
    }
}

/// The owner, or any admin, may proceed.
pub fn require_owner_or_admin(principal: &Principal, owner: Uuid) -> Result<(), AuthError> {
    if principal.is_admin {
        return Ok(());
    }
    require_owner(principal, owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(is_admin: bool) -> Principal {
        Principal {
            user_id: Uuid::now_v7(),
            is_admin,
        }
    }

    #[test]
    fn admin_guard() {
        assert!(require_admin(&principal(true)).is_ok());
        assert!(matches!(
            require_admin(&principal(false)),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn owner_guard_ignores_admin_flag() {
        let admin = principal(true);
        assert!(require_owner(&admin, Uuid::now_v7()).is_err());
        assert!(require_owner(&admin, admin.user_id).is_ok());
    }

    #[test]
    fn owner_or_admin_guard() {
        let reader = principal(false);
        let owner = Uuid::now_v7();
        assert!(require_owner_or_admin(&reader, owner).is_err());
        assert!(require_owner_or_admin(&reader, reader.user_id).is_ok());
        assert!(require_owner_or_admin(&principal(true), owner).is_ok());
    }
}
