use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use depot_core::{DomainError, DomainResult};

/// Role identifier used for RBAC.
///
/// Stored and transported as a plain string; only the three built-in roles
/// can be assigned to users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const STOCK_MANAGER: Role = Role(Cow::Borrowed("stock_manager"));
    pub const WAREHOUSE_STAFF: Role = Role(Cow::Borrowed("warehouse_staff"));

    pub const ASSIGNABLE: [Role; 3] = [Role::ADMIN, Role::STOCK_MANAGER, Role::WAREHOUSE_STAFF];

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Parse a role name, accepting only the built-in roles.
    pub fn parse_assignable(name: &str) -> DomainResult<Self> {
        let name = name.trim();
        Role::ASSIGNABLE
            .into_iter()
            .find(|r| r.as_str() == name)
            .ok_or_else(|| DomainError::validation(format!("unknown role '{name}'")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_builtin_roles_are_assignable() {
        assert_eq!(Role::parse_assignable(" stock_manager ").unwrap(), Role::STOCK_MANAGER);
        assert!(Role::parse_assignable("superuser").is_err());
    }
}
