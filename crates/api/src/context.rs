use depot_auth::{Permission, Principal, Role, User};
use depot_core::UserId;

/// Principal context for a request (authenticated identity + role).
///
/// Built by the auth middleware from the token subject and the user's
/// current record, so a role change takes effect on the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
    name: String,
    email: String,
}

impl PrincipalContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            principal: Principal::new(user.id, user.role.clone()),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn role(&self) -> &Role {
        &self.principal.role
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.principal.permissions
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
