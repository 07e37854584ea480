//! Organization Context
//!
//! Proof that a caller passed the organization-access gate, carrying the
//! effective organization role for downstream queries and rendering.

use super::decision::{AccessDecision, DenialReason};
use super::identity::Identity;
use super::roles::OrgRole;

/// A caller admitted to one organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationContext {
    identity: Identity,
    organization_id: String,
    effective_role: OrgRole,
}

impl OrganizationContext {
    /// Build from an organization decision; a denial yields its reason
    pub fn from_decision(
        identity: Identity,
        organization_id: impl Into<String>,
        decision: AccessDecision,
    ) -> Result<Self, DenialReason> {
        // An organization gate that allows always names a role
        let effective_role = decision
            .into_result()?
            .ok_or(DenialReason::Forbidden)?;

        Ok(Self {
            identity,
            organization_id: organization_id.into(),
            effective_role,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn effective_role(&self) -> OrgRole {
        self.effective_role
    }

    /// The decision this context was built from
    pub fn decision(&self) -> AccessDecision {
        AccessDecision::allow_as(self.effective_role)
    }

    /// Elevated callers see cross-organization management screens
    pub fn is_elevated(&self) -> bool {
        self.identity.is_elevated()
    }

    pub fn can_manage_members(&self) -> bool {
        self.effective_role.can_manage()
    }

    /// Create a summary string for logging
    pub fn summary(&self) -> String {
        format!(
            "OrganizationContext[user={}, org={}, role={}]",
            self.identity.summary(),
            self.organization_id,
            self.effective_role
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::Role;

    #[test]
    fn allowed_decision_builds_context() {
        let ctx = OrganizationContext::from_decision(
            Identity::new("u3", Role::User),
            "org3",
            AccessDecision::allow_as(OrgRole::Member),
        )
        .unwrap();

        assert_eq!(ctx.organization_id(), "org3");
        assert_eq!(ctx.effective_role(), OrgRole::Member);
        assert!(!ctx.can_manage_members());
        assert!(!ctx.is_elevated());
    }

    #[test]
    fn denial_passes_reason_through() {
        let err = OrganizationContext::from_decision(
            Identity::new("u1", Role::User),
            "org1",
            AccessDecision::deny(DenialReason::NotAMember),
        )
        .unwrap_err();
        assert_eq!(err, DenialReason::NotAMember);
    }

    #[test]
    fn allow_without_role_is_not_an_organization_grant() {
        let err = OrganizationContext::from_decision(
            Identity::new("u1", Role::User),
            "org1",
            AccessDecision::allow(),
        )
        .unwrap_err();
        assert_eq!(err, DenialReason::Forbidden);
    }
}
