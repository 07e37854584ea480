//! Access Decision Engine
//!
//! Pure allow/deny decisions. The engine never redirects or builds responses;
//! route guards enact the [`AccessDecision`] it returns.

use super::identity::Identity;
use super::membership::{Membership, MembershipStore};
use super::roles::{is_allowed_role, OrgRole, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    Unauthenticated,
    Forbidden,
    NotAMember,
    CannotRemoveOwner,
    LookupFailed,
}

impl DenialReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DenialReason::Unauthenticated => "UNAUTHENTICATED",
            DenialReason::Forbidden => "FORBIDDEN",
            DenialReason::NotAMember => "NOT_A_MEMBER",
            DenialReason::CannotRemoveOwner => "CANNOT_REMOVE_OWNER",
            DenialReason::LookupFailed => "LOOKUP_FAILED",
        }
    }

    /// User-facing message; never carries lookup details
    pub fn message(&self) -> &'static str {
        match self {
            DenialReason::Unauthenticated => "Authentication is required",
            DenialReason::Forbidden => "You do not have permission to perform this action",
            DenialReason::NotAMember => "You are not a member of this organization",
            DenialReason::CannotRemoveOwner => "The organization owner cannot be removed",
            DenialReason::LookupFailed => "Access could not be verified",
        }
    }

    /// Only a failed lookup is an infrastructure fault
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, DenialReason::LookupFailed)
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of one access evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<DenialReason>,
    pub effective_org_role: Option<OrgRole>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            effective_org_role: None,
        }
    }

    pub fn allow_as(role: OrgRole) -> Self {
        Self {
            allowed: true,
            reason: None,
            effective_org_role: Some(role),
        }
    }

    pub fn deny(reason: DenialReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            effective_org_role: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// `Ok(effective_org_role)` when allowed, `Err(reason)` otherwise
    pub fn into_result(self) -> Result<Option<OrgRole>, DenialReason> {
        if self.allowed {
            Ok(self.effective_org_role)
        } else {
            // A denial built by hand without a reason still fails closed
            Err(self.reason.unwrap_or(DenialReason::Forbidden))
        }
    }
}

/// Global-role gate
///
/// `required_roles == None` admits any authenticated identity.
pub fn authorize(identity: Option<&Identity>, required_roles: Option<&[Role]>) -> AccessDecision {
    let Some(identity) = identity else {
        return AccessDecision::deny(DenialReason::Unauthenticated);
    };

    match required_roles {
        Some(allowed) if !is_allowed_role(identity.global_role, allowed) => {
            debug!(
                user = %identity.summary(),
                "Global role not in the required set"
            );
            AccessDecision::deny(DenialReason::Forbidden)
        }
        _ => AccessDecision::allow(),
    }
}

/// Owners can never be removed, whoever asks
pub fn check_member_removal(target: &Membership) -> AccessDecision {
    if target.is_owner() {
        AccessDecision::deny(DenialReason::CannotRemoveOwner)
    } else {
        AccessDecision::allow()
    }
}

/// Narrow an organization decision to callers who may manage members
pub fn check_management(decision: AccessDecision) -> AccessDecision {
    match decision.effective_org_role {
        _ if !decision.allowed => decision,
        Some(role) if role.can_manage() => decision,
        _ => AccessDecision::deny(DenialReason::Forbidden),
    }
}

/// Organizations are deleted by elevated users or their owner
pub fn check_organization_deletion(identity: &Identity, decision: AccessDecision) -> AccessDecision {
    if !decision.allowed || identity.is_elevated() {
        return decision;
    }
    match decision.effective_org_role {
        Some(OrgRole::Owner) => decision,
        _ => AccessDecision::deny(DenialReason::Forbidden),
    }
}

/// Combines the role model with membership lookups
///
/// Holds no per-request state; every call evaluates afresh.
#[derive(Clone)]
pub struct AccessDecisionEngine {
    memberships: Arc<dyn MembershipStore>,
}

impl AccessDecisionEngine {
    pub fn new(memberships: Arc<dyn MembershipStore>) -> Self {
        Self { memberships }
    }

    /// See [`authorize`]
    pub fn authorize(
        &self,
        identity: Option<&Identity>,
        required_roles: Option<&[Role]>,
    ) -> AccessDecision {
        authorize(identity, required_roles)
    }

    /// Organization-access gate
    ///
    /// Elevated identities are admitted as `admin` without a lookup. Everyone
    /// else needs a membership row with a recognized role; exactly one lookup
    /// is made.
    pub async fn authorize_organization(
        &self,
        identity: Option<&Identity>,
        organization_id: &str,
    ) -> AccessDecision {
        let Some(identity) = identity else {
            return AccessDecision::deny(DenialReason::Unauthenticated);
        };

        if identity.is_elevated() {
            return AccessDecision::allow_as(OrgRole::Admin);
        }

        match self
            .memberships
            .find_membership(&identity.user_id, organization_id)
            .await
        {
            Ok(Some(membership)) => match membership.org_role() {
                Some(role) => AccessDecision::allow_as(role),
                None => {
                    warn!(
                        member_id = %membership.id,
                        stored_role = %membership.role,
                        organization_id,
                        "Membership has an unrecognized role, denying"
                    );
                    AccessDecision::deny(DenialReason::NotAMember)
                }
            },
            Ok(None) => {
                debug!(
                    user = %identity.summary(),
                    organization_id,
                    "No membership for organization"
                );
                AccessDecision::deny(DenialReason::NotAMember)
            }
            Err(err) => {
                err.log();
                AccessDecision::deny(DenialReason::LookupFailed)
            }
        }
    }
}

impl std::fmt::Debug for AccessDecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessDecisionEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::ELEVATED_ROLES;

    #[test]
    fn missing_identity_is_unauthenticated() {
        let decision = authorize(None, None);
        assert_eq!(decision.reason, Some(DenialReason::Unauthenticated));
        assert_eq!(
            authorize(None, Some(ELEVATED_ROLES)).reason,
            Some(DenialReason::Unauthenticated)
        );
    }

    #[test]
    fn any_identity_passes_without_required_roles() {
        let user = Identity::new("u1", Role::User);
        assert!(authorize(Some(&user), None).is_allowed());
    }

    #[test]
    fn required_roles_are_enforced() {
        let user = Identity::new("u1", Role::User);
        let admin = Identity::new("u2", Role::Admin);
        let root = Identity::new("u3", Role::SuperAdmin);

        assert_eq!(
            authorize(Some(&user), Some(ELEVATED_ROLES)).reason,
            Some(DenialReason::Forbidden)
        );
        assert!(authorize(Some(&admin), Some(ELEVATED_ROLES)).is_allowed());
        assert!(authorize(Some(&root), Some(ELEVATED_ROLES)).is_allowed());
        assert!(!authorize(Some(&root), Some(&[Role::Admin])).is_allowed());
    }

    #[test]
    fn management_requires_owner_or_admin() {
        assert!(check_management(AccessDecision::allow_as(OrgRole::Owner)).is_allowed());
        assert!(check_management(AccessDecision::allow_as(OrgRole::Admin)).is_allowed());
        assert_eq!(
            check_management(AccessDecision::allow_as(OrgRole::Member)).reason,
            Some(DenialReason::Forbidden)
        );
        assert_eq!(
            check_management(AccessDecision::deny(DenialReason::NotAMember)).reason,
            Some(DenialReason::NotAMember)
        );
    }

    #[test]
    fn deletion_requires_owner_or_elevation() {
        let user = Identity::new("u1", Role::User);
        let admin = Identity::new("u2", Role::Admin);

        assert!(check_organization_deletion(&user, AccessDecision::allow_as(OrgRole::Owner))
            .is_allowed());
        assert!(!check_organization_deletion(&user, AccessDecision::allow_as(OrgRole::Admin))
            .is_allowed());
        assert!(check_organization_deletion(&admin, AccessDecision::allow_as(OrgRole::Admin))
            .is_allowed());
    }

    #[test]
    fn owner_removal_is_refused() {
        let owner = Membership::new("u1", "org1", OrgRole::Owner);
        let member = Membership::new("u2", "org1", OrgRole::Member);

        assert_eq!(
            check_member_removal(&owner).reason,
            Some(DenialReason::CannotRemoveOwner)
        );
        assert!(check_member_removal(&member).is_allowed());
    }

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(DenialReason::NotAMember.code(), "NOT_A_MEMBER");
        assert_eq!(
            serde_json::to_string(&DenialReason::CannotRemoveOwner).unwrap(),
            "\"CANNOT_REMOVE_OWNER\""
        );
        assert!(DenialReason::LookupFailed.is_infrastructure());
        assert!(!DenialReason::Forbidden.is_infrastructure());
    }

    #[test]
    fn decision_into_result() {
        assert_eq!(
            AccessDecision::allow_as(OrgRole::Member).into_result(),
            Ok(Some(OrgRole::Member))
        );
        let handmade = AccessDecision {
            allowed: false,
            reason: None,
            effective_org_role: None,
        };
        assert_eq!(handmade.into_result(), Err(DenialReason::Forbidden));
    }
}
