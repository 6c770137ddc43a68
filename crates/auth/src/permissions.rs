use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "ledger.read").
/// The wildcard permission `"*"` grants everything and is reserved for admins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub const CATALOG_READ: Permission = Permission(Cow::Borrowed("catalog.read"));
    pub const CATALOG_WRITE: Permission = Permission(Cow::Borrowed("catalog.write"));
    pub const OPERATIONS_READ: Permission = Permission(Cow::Borrowed("operations.read"));
    pub const OPERATIONS_WRITE: Permission = Permission(Cow::Borrowed("operations.write"));
    pub const STOCK_ADJUST: Permission = Permission(Cow::Borrowed("stock.adjust"));
    pub const LEDGER_READ: Permission = Permission(Cow::Borrowed("ledger.read"));
    pub const DASHBOARD_READ: Permission = Permission(Cow::Borrowed("dashboard.read"));
    pub const USERS_MANAGE: Permission = Permission(Cow::Borrowed("users.manage"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
