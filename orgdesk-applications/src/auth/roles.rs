//! Role Model
//!
//! Global roles and organization-local roles as closed sets. Membership tests
//! are explicit set containment: no role implies another.

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Global account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
}

/// Roles with cross-organization access. Call sites requiring elevation pass
/// this set so both roles are always listed.
pub const ELEVATED_ROLES: &[Role] = &[Role::SuperAdmin, Role::Admin];

/// Roles allowed to assign or revoke `superadmin`
pub const SUPERADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "superadmin",
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Whether this role has access to every organization
    pub fn is_elevated(&self) -> bool {
        match self {
            Role::SuperAdmin | Role::Admin => true,
            Role::User => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "superadmin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// True for `SUPERADMIN` and `ADMIN`
pub fn is_elevated(role: Role) -> bool {
    role.is_elevated()
}

/// True iff `role` is listed in `allowed`
pub fn is_allowed_role(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

/// String form of [`is_allowed_role`]; an unrecognized role is never allowed
pub fn is_allowed_role_str(role: &str, allowed: &[Role]) -> bool {
    role.parse::<Role>()
        .map(|role| is_allowed_role(role, allowed))
        .unwrap_or(false)
}

/// Role of a user inside one organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Owner,
    Admin,
    Member,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Owner => "owner",
            OrgRole::Admin => "admin",
            OrgRole::Member => "member",
        }
    }

    /// Owners and organization admins may add, change and remove members
    pub fn can_manage(&self) -> bool {
        match self {
            OrgRole::Owner | OrgRole::Admin => true,
            OrgRole::Member => false,
        }
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(OrgRole::Owner),
            "admin" => Ok(OrgRole::Admin),
            "member" => Ok(OrgRole::Member),
            _ => Err(format!("Unknown organization role: {}", s)),
        }
    }
}
