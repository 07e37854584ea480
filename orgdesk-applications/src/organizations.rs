//! Organization and member management
//!
//! Every operation passes the access decision engine before touching a store.
//! Organization-scoped operations take an [`OrganizationContext`], which only
//! exists for callers the gate admitted.

use crate::auth::{
    check_management, check_member_removal, check_organization_deletion, AccessDecisionEngine,
    DenialReason, Identity, Membership, MembershipStore, NewOrganization, OrgRole, Organization,
    OrganizationContext, OrganizationStore,
};
use crate::{ApplicationError, ApplicationResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::info;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

const MAX_NAME_LEN: usize = 128;
const MAX_SLUG_LEN: usize = 64;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("slug pattern is valid"));

/// Which organizations a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ListingScope {
    /// Every organization (elevated callers)
    All,
    /// Only the caller's own organizations
    Mine,
}

/// Organizations visible to one caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct OrganizationListing {
    pub scope: ListingScope,
    pub organizations: Vec<Organization>,
}

/// Check an organization name and slug before it reaches a store
pub fn validate_new_organization(organization: &NewOrganization) -> ApplicationResult<()> {
    let name = organization.name.trim();
    if name.is_empty() {
        return Err(ApplicationError::validation("name", "Name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApplicationError::validation(
            "name",
            format!("Name must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    validate_slug(&organization.slug)
}

/// Slugs are non-empty lowercase letters, digits and hyphens
pub fn validate_slug(slug: &str) -> ApplicationResult<()> {
    if slug.len() > MAX_SLUG_LEN {
        return Err(ApplicationError::validation(
            "slug",
            format!("Slug must be at most {} characters", MAX_SLUG_LEN),
        ));
    }
    if !SLUG_PATTERN.is_match(slug) {
        return Err(ApplicationError::validation(
            "slug",
            "Slug may only contain lowercase letters, digits and hyphens",
        ));
    }
    Ok(())
}

/// Organization service
#[derive(Clone)]
pub struct OrganizationService {
    organizations: Arc<dyn OrganizationStore>,
    memberships: Arc<dyn MembershipStore>,
    engine: AccessDecisionEngine,
}

impl OrganizationService {
    pub fn new(
        organizations: Arc<dyn OrganizationStore>,
        memberships: Arc<dyn MembershipStore>,
    ) -> Self {
        let engine = AccessDecisionEngine::new(memberships.clone());
        Self {
            organizations,
            memberships,
            engine,
        }
    }

    pub fn engine(&self) -> &AccessDecisionEngine {
        &self.engine
    }

    /// Run the organization gate and wrap an admission in a context
    pub async fn authorize(
        &self,
        identity: Option<&Identity>,
        organization_id: &str,
    ) -> ApplicationResult<OrganizationContext> {
        let decision = self
            .engine
            .authorize_organization(identity, organization_id)
            .await;
        let identity = identity.ok_or(ApplicationError::Denied(DenialReason::Unauthenticated))?;

        OrganizationContext::from_decision(identity.clone(), organization_id, decision)
            .map_err(ApplicationError::Denied)
    }

    /// Create an organization owned by the caller
    pub async fn create_organization(
        &self,
        identity: Option<&Identity>,
        mut request: NewOrganization,
    ) -> ApplicationResult<Organization> {
        self.engine.authorize(identity, None).into_result()?;
        let identity = identity.ok_or(ApplicationError::Denied(DenialReason::Unauthenticated))?;

        request.name = request.name.trim().to_string();
        validate_new_organization(&request)?;

        let (organization, _owner) = self
            .organizations
            .create_organization(request, &identity.user_id)
            .await?;

        info!(
            organization_id = %organization.id,
            slug = %organization.slug,
            owner = %identity.user_id,
            "Organization created"
        );
        Ok(organization)
    }

    /// Elevated callers get every organization, everyone else their own
    pub async fn list_visible_organizations(
        &self,
        identity: Option<&Identity>,
    ) -> ApplicationResult<OrganizationListing> {
        self.engine.authorize(identity, None).into_result()?;
        let identity = identity.ok_or(ApplicationError::Denied(DenialReason::Unauthenticated))?;

        if identity.is_elevated() {
            Ok(OrganizationListing {
                scope: ListingScope::All,
                organizations: self.organizations.list_organizations().await?,
            })
        } else {
            Ok(OrganizationListing {
                scope: ListingScope::Mine,
                organizations: self
                    .organizations
                    .list_organizations_for_user(&identity.user_id)
                    .await?,
            })
        }
    }

    pub async fn get_organization(&self, ctx: &OrganizationContext) -> ApplicationResult<Organization> {
        self.organizations
            .get_organization(ctx.organization_id())
            .await?
            .ok_or_else(|| {
                ApplicationError::not_found(format!("Organization {}", ctx.organization_id()))
            })
    }

    /// Delete an organization; elevated callers or its owner only
    pub async fn delete_organization(&self, ctx: &OrganizationContext) -> ApplicationResult<()> {
        check_organization_deletion(ctx.identity(), ctx.decision()).into_result()?;

        if !self
            .organizations
            .delete_organization(ctx.organization_id())
            .await?
        {
            return Err(ApplicationError::not_found(format!(
                "Organization {}",
                ctx.organization_id()
            )));
        }

        info!(
            organization_id = %ctx.organization_id(),
            by = %ctx.identity().summary(),
            "Organization deleted"
        );
        Ok(())
    }

    pub async fn list_members(&self, ctx: &OrganizationContext) -> ApplicationResult<Vec<Membership>> {
        Ok(self.memberships.list_members(ctx.organization_id()).await?)
    }

    /// Add a member; ownership is never granted this way
    pub async fn add_member(
        &self,
        ctx: &OrganizationContext,
        user_id: &str,
        role: OrgRole,
    ) -> ApplicationResult<Membership> {
        check_management(ctx.decision()).into_result()?;
        if role == OrgRole::Owner {
            return Err(ApplicationError::validation(
                "role",
                "Ownership cannot be granted to a new member",
            ));
        }
        if user_id.trim().is_empty() {
            return Err(ApplicationError::validation("user_id", "User id must not be empty"));
        }

        let membership = self
            .memberships
            .add_membership(user_id, ctx.organization_id(), role)
            .await?;

        info!(
            organization_id = %ctx.organization_id(),
            member_id = %membership.id,
            role = %role,
            "Member added"
        );
        Ok(membership)
    }

    /// Change a member's role; the owner's role is fixed
    pub async fn update_member_role(
        &self,
        ctx: &OrganizationContext,
        member_id: &str,
        role: OrgRole,
    ) -> ApplicationResult<Membership> {
        check_management(ctx.decision()).into_result()?;
        if role == OrgRole::Owner {
            return Err(ApplicationError::validation(
                "role",
                "Ownership cannot be granted by a role change",
            ));
        }

        let target = self.find_member_in(ctx, member_id).await?;
        if target.is_owner() {
            return Err(ApplicationError::Denied(DenialReason::Forbidden));
        }

        Ok(self.memberships.update_membership_role(&target.id, role).await?)
    }

    /// Remove a member; owners are refused whoever asks
    pub async fn remove_member(
        &self,
        ctx: &OrganizationContext,
        member_id: &str,
    ) -> ApplicationResult<Membership> {
        let target = self.find_member_in(ctx, member_id).await?;
        check_member_removal(&target).into_result()?;
        check_management(ctx.decision()).into_result()?;

        if !self.memberships.delete_membership(&target.id).await? {
            return Err(ApplicationError::not_found(format!("Member {}", member_id)));
        }

        info!(
            organization_id = %ctx.organization_id(),
            member_id = %target.id,
            by = %ctx.identity().summary(),
            "Member removed"
        );
        Ok(target)
    }

    /// A member row that belongs to the context's organization
    async fn find_member_in(
        &self,
        ctx: &OrganizationContext,
        member_id: &str,
    ) -> ApplicationResult<Membership> {
        self.memberships
            .find_member(member_id)
            .await?
            .filter(|m| m.organization_id == ctx.organization_id())
            .ok_or_else(|| ApplicationError::not_found(format!("Member {}", member_id)))
    }
}

impl std::fmt::Debug for OrganizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrganizationService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(name: &str, slug: &str) -> NewOrganization {
        NewOrganization {
            name: name.to_string(),
            slug: slug.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn slug_rules() {
        assert!(validate_slug("acme-01").is_ok());
        assert!(validate_slug("a").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Acme").is_err());
        assert!(validate_slug("a_b").is_err());
        assert!(validate_slug("a b").is_err());
        assert!(validate_slug(&"a".repeat(65)).is_err());
    }

    #[test]
    fn name_rules() {
        assert!(validate_new_organization(&org("Acme", "acme")).is_ok());
        assert!(validate_new_organization(&org("   ", "acme")).is_err());
        assert!(validate_new_organization(&org(&"n".repeat(129), "acme")).is_err());

        match validate_new_organization(&org("Acme", "ACME")) {
            Err(ApplicationError::Validation { field, .. }) => assert_eq!(field, "slug"),
            other => panic!("expected slug validation error, got {:?}", other),
        }
    }
}
