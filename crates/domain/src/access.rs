//! Role-based access gate.
//!
//! Pure predicates with no side effects, consulted before every mutating
//! operation in the order flow. Roles are an enumerated type so every
//! check is an exhaustive match rather than a string comparison.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Role held by an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
    Rider,
}

impl Role {
    /// Returns the role name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::Rider => "rider",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authenticated caller, as resolved by the user directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Checks that the actor holds exactly the required role.
pub fn authorize(actor: Role, required: Role) -> Result<(), DomainError> {
    if actor == required {
        Ok(())
    } else {
        Err(DomainError::Forbidden(match required {
            Role::Admin => "admin privileges required",
            Role::Rider => "rider privileges required",
            Role::Customer => "customer privileges required",
        }))
    }
}

/// Passes when the actor owns the resource or holds the admin role.
pub fn authorize_owner_or_admin(actor: &Actor, owner: UserId) -> Result<(), DomainError> {
    if actor.role == Role::Admin || actor.id == owner {
        Ok(())
    } else {
        Err(DomainError::Forbidden("access denied"))
    }
}
