use std::collections::HashSet;

use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use depot_core::UserId;

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(1), role)
    }

    #[test]
    fn admin_wildcard_grants_everything() {
        let admin = principal(Role::ADMIN);
        assert!(authorize(&admin, &Permission::USERS_MANAGE).is_ok());
        assert!(authorize(&admin, &Permission::new("anything.else")).is_ok());
    }

    #[test]
    fn stock_manager_can_adjust_but_not_manage_users() {
        let manager = principal(Role::STOCK_MANAGER);
        assert!(authorize(&manager, &Permission::STOCK_ADJUST).is_ok());
        assert!(authorize(&manager, &Permission::LEDGER_READ).is_ok());
        assert_eq!(
            authorize(&manager, &Permission::USERS_MANAGE),
            Err(AuthzError::Forbidden("users.manage".to_string()))
        );
    }

    #[test]
    fn warehouse_staff_records_movements_only() {
        let staff = principal(Role::WAREHOUSE_STAFF);
        assert!(authorize(&staff, &Permission::OPERATIONS_WRITE).is_ok());
        assert!(authorize(&staff, &Permission::STOCK_ADJUST).is_err());
        assert!(authorize(&staff, &Permission::DASHBOARD_READ).is_err());
    }

    #[test]
    fn unknown_role_has_no_permissions() {
        let nobody = principal(Role::new("visitor"));
        assert!(authorize(&nobody, &Permission::CATALOG_READ).is_err());
    }
}
