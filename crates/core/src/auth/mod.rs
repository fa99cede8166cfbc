//! Authentication and authorization.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - Password verification
//! - User roles and the request [`Actor`] used for access checks

mod password;

pub use password::{PasswordError, hash_password, verify_password};

use corebank_shared::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Bank customer. Sees and moves only their own money.
    #[default]
    Customer,
    /// Back-office staff. Reads everything, approves loans, freezes and reverses.
    Admin,
}

impl UserRole {
    /// Returns the role as stored and serialized.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::Validation(format!("Unknown role: {other}"))),
        }
    }
}

/// The authenticated user performing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User ID.
    pub user_id: Uuid,
    /// Current role, as read from the user record.
    pub role: UserRole,
}

impl Actor {
    /// Creates a new actor.
    #[must_use]
    pub const fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Returns true for admins.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    /// Read access: the owner or any admin.
    #[must_use]
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }

    /// Read access check.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless the actor owns the resource or is an admin.
    pub fn ensure_can_access(&self, owner_id: Uuid) -> AppResult<()> {
        if self.can_access(owner_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }

    /// Money movement check: only the owner, admins included.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the actor is not the owner.
    pub fn ensure_owner(&self, owner_id: Uuid) -> AppResult<()> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }

    /// Admin-only check.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admins.
    pub fn ensure_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Insufficient permissions: admin role required".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::Customer.to_string(), "customer");
        assert!(UserRole::from_str("owner").is_err());
    }

    #[test]
    fn test_customer_access() {
        let me = Uuid::new_v4();
        let actor = Actor::new(me, UserRole::Customer);

        assert!(actor.can_access(me));
        assert!(!actor.can_access(Uuid::new_v4()));
        assert!(actor.ensure_owner(me).is_ok());
        assert!(actor.ensure_admin().is_err());
    }

    #[test]
    fn test_admin_reads_but_does_not_move_customer_money() {
        let customer = Uuid::new_v4();
        let admin = Actor::new(Uuid::new_v4(), UserRole::Admin);

        assert!(admin.can_access(customer));
        assert!(admin.ensure_can_access(customer).is_ok());
        assert!(matches!(
            admin.ensure_owner(customer),
            Err(AppError::Forbidden(_))
        ));
        assert!(admin.ensure_admin().is_ok());
    }
}
