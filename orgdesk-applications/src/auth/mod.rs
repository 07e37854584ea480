//! Authentication and Authorization Module
//!
//! The access-control core every protected entry point passes through:
//! - Role model: closed global and organization role sets
//! - Identity: the caller, produced per request by a session resolver
//! - Membership: organization membership records and their stores
//! - Decision: the pure allow/deny engine
//! - Context: proof of organization access handed to downstream code

pub mod context;
pub mod decision;
pub mod identity;
pub mod membership;
pub mod roles;

pub use context::OrganizationContext;
pub use decision::{
    authorize, check_management, check_member_removal, check_organization_deletion,
    AccessDecision, AccessDecisionEngine, DenialReason,
};
pub use identity::{Credentials, Identity, SessionResolver, StaticSessionResolver};
pub use membership::{
    InMemoryStore, Membership, MembershipStore, NewOrganization, Organization, OrganizationStore,
};
pub use roles::{
    is_allowed_role, is_allowed_role_str, is_elevated, OrgRole, Role, ELEVATED_ROLES,
    SUPERADMIN_ONLY,
};
