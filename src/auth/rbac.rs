//! Role-based access control
//!
//! Membership is exact: holding `Admin` does not imply `BusinessOwner`.

use crate::auth::errors::AuthError;
use crate::auth::models::{Claims, User, UserRole};

/// Anything that carries a role set
pub trait RoleHolder {
    fn roles(&self) -> &[UserRole];

    fn has_role(&self, role: UserRole) -> bool {
        self.roles().contains(&role)
    }

    fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }
}

impl RoleHolder for Claims {
    fn roles(&self) -> &[UserRole] {
        &self.roles
    }
}

impl RoleHolder for User {
    fn roles(&self) -> &[UserRole] {
        &self.roles
    }
}

/// `Err(AuthError::Forbidden)` unless `holder` has `role`
pub fn require_role<R: RoleHolder + ?Sized>(holder: &R, role: UserRole) -> Result<(), AuthError> {
    if holder.has_role(role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// `Err(AuthError::Forbidden)` unless `holder` has at least one of `roles`
pub fn require_any_role<R: RoleHolder + ?Sized>(
    holder: &R,
    roles: &[UserRole],
) -> Result<(), AuthError> {
    if holder.has_any_role(roles) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
