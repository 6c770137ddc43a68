use serde::Serialize;

use depot_core::UserId;

use crate::{JwtClaims, Permission, Role};

/// A fully resolved principal for authorization decisions.
///
/// Built by the API layer from verified token claims; the services below it
/// receive only the acting `UserId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        let permissions = role_permissions(&role);
        Self {
            user_id,
            role,
            permissions,
        }
    }

    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.role.clone())
    }
}

/// Static role→permission policy.
///
/// `admin` holds the wildcard. Unknown roles get nothing.
pub fn role_permissions(role: &Role) -> Vec<Permission> {
    match role.as_str() {
        "admin" => vec![Permission::WILDCARD],
        "stock_manager" => vec![
            Permission::CATALOG_READ,
            Permission::CATALOG_WRITE,
            Permission::OPERATIONS_READ,
            Permission::OPERATIONS_WRITE,
            Permission::STOCK_ADJUST,
            Permission::LEDGER_READ,
            Permission::DASHBOARD_READ,
        ],
        "warehouse_staff" => vec![
            Permission::CATALOG_READ,
            Permission::CATALOG_WRITE,
            Permission::OPERATIONS_READ,
            Permission::OPERATIONS_WRITE,
        ],
        _ => Vec::new(),
    }
}
