//! `depot-auth`: authentication and authorization building blocks.
//!
//! No HTTP or storage code lives here: the crate knows how to hash passwords,
//! sign tokens and decide OTP outcomes, but never where users or challenges
//! are kept.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, JwtValidator, TokenError, TokenIssuer};
pub use otp::{NewOtpChallenge, OtpChallenge, OtpError, OtpPolicy};
pub use password::{PasswordError, PasswordHasher, validate_new_password};
pub use permissions::Permission;
pub use principal::{Principal, role_permissions};
pub use roles::Role;
pub use user::{NewUser, User, UserSummary, normalize_email, validate_name};
