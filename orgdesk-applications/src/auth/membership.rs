//! Organizations, memberships and the stores that own them
//!
//! The access decision engine only reads through [`MembershipStore`]; the
//! organization service is the only writer.

use super::roles::OrgRole;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgdesk_core::{conflict_error, not_found_error, OrgdeskResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Organization record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Organization {
    pub id: String,
    pub name: String,
    /// Unique, lowercase letters, digits and hyphens
    pub slug: String,
    pub logo: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating an organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
}

/// A user's membership in one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Membership {
    pub id: String,
    pub user_id: String,
    pub organization_id: String,
    /// Role as stored; see [`Membership::org_role`]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: &str, organization_id: &str, role: OrgRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            organization_id: organization_id.to_string(),
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Parsed role, `None` if the stored value is not a known role
    pub fn org_role(&self) -> Option<OrgRole> {
        self.role.parse().ok()
    }

    pub fn is_owner(&self) -> bool {
        self.org_role() == Some(OrgRole::Owner)
    }
}

/// Membership lookups and mutations
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// The membership of `user_id` in `organization_id`, if any
    async fn find_membership(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> OrgdeskResult<Option<Membership>>;

    /// A membership by its own id
    async fn find_member(&self, member_id: &str) -> OrgdeskResult<Option<Membership>>;

    async fn list_members(&self, organization_id: &str) -> OrgdeskResult<Vec<Membership>>;

    /// Fails with a conflict when the user is already a member
    async fn add_membership(
        &self,
        user_id: &str,
        organization_id: &str,
        role: OrgRole,
    ) -> OrgdeskResult<Membership>;

    async fn update_membership_role(
        &self,
        member_id: &str,
        role: OrgRole,
    ) -> OrgdeskResult<Membership>;

    /// Returns whether a row was deleted
    async fn delete_membership(&self, member_id: &str) -> OrgdeskResult<bool>;
}

/// Organization persistence
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Insert the organization and its owner membership together
    async fn create_organization(
        &self,
        organization: NewOrganization,
        owner_user_id: &str,
    ) -> OrgdeskResult<(Organization, Membership)>;

    async fn get_organization(&self, organization_id: &str) -> OrgdeskResult<Option<Organization>>;

    async fn list_organizations(&self) -> OrgdeskResult<Vec<Organization>>;

    async fn list_organizations_for_user(&self, user_id: &str) -> OrgdeskResult<Vec<Organization>>;

    /// Deletes the organization and all of its memberships
    async fn delete_organization(&self, organization_id: &str) -> OrgdeskResult<bool>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    organizations: HashMap<String, Organization>,
    memberships: HashMap<String, Membership>,
}

/// In-memory store for tests and database-less development
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a membership row verbatim, bypassing role parsing
    pub async fn insert_raw_membership(&self, membership: Membership) {
        let mut state = self.state.write().await;
        state
            .memberships
            .insert(membership.id.clone(), membership);
    }
}

fn sorted_members(mut members: Vec<Membership>) -> Vec<Membership> {
    members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    members
}

fn sorted_organizations(mut organizations: Vec<Organization>) -> Vec<Organization> {
    organizations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    organizations
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn find_membership(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> OrgdeskResult<Option<Membership>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .values()
            .find(|m| m.user_id == user_id && m.organization_id == organization_id)
            .cloned())
    }

    async fn find_member(&self, member_id: &str) -> OrgdeskResult<Option<Membership>> {
        let state = self.state.read().await;
        Ok(state.memberships.get(member_id).cloned())
    }

    async fn list_members(&self, organization_id: &str) -> OrgdeskResult<Vec<Membership>> {
        let state = self.state.read().await;
        Ok(sorted_members(
            state
                .memberships
                .values()
                .filter(|m| m.organization_id == organization_id)
                .cloned()
                .collect(),
        ))
    }

    async fn add_membership(
        &self,
        user_id: &str,
        organization_id: &str,
        role: OrgRole,
    ) -> OrgdeskResult<Membership> {
        let mut state = self.state.write().await;

        if !state.organizations.contains_key(organization_id) {
            return Err(not_found_error!(
                format!("organization {}", organization_id),
                "membership_store"
            ));
        }

        let exists = state
            .memberships
            .values()
            .any(|m| m.user_id == user_id && m.organization_id == organization_id);
        if exists {
            return Err(conflict_error!(
                format!("user {} is already a member", user_id),
                "membership_store"
            ));
        }

        let membership = Membership::new(user_id, organization_id, role);
        state
            .memberships
            .insert(membership.id.clone(), membership.clone());
        debug!(member_id = %membership.id, organization_id, "Membership added");
        Ok(membership)
    }

    async fn update_membership_role(
        &self,
        member_id: &str,
        role: OrgRole,
    ) -> OrgdeskResult<Membership> {
        let mut state = self.state.write().await;
        let membership = state
            .memberships
            .get_mut(member_id)
            .ok_or_else(|| not_found_error!(format!("member {}", member_id), "membership_store"))?;
        membership.role = role.as_str().to_string();
        Ok(membership.clone())
    }

    async fn delete_membership(&self, member_id: &str) -> OrgdeskResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.memberships.remove(member_id).is_some())
    }
}

#[async_trait]
impl OrganizationStore for InMemoryStore {
    async fn create_organization(
        &self,
        organization: NewOrganization,
        owner_user_id: &str,
    ) -> OrgdeskResult<(Organization, Membership)> {
        let mut state = self.state.write().await;

        if state
            .organizations
            .values()
            .any(|o| o.slug == organization.slug)
        {
            return Err(conflict_error!(
                format!("slug '{}' is already taken", organization.slug),
                "organization_store"
            ));
        }

        let organization = Organization {
            id: Uuid::new_v4().to_string(),
            name: organization.name,
            slug: organization.slug,
            logo: organization.logo,
            metadata: organization.metadata,
            created_at: Utc::now(),
        };
        let owner = Membership::new(owner_user_id, &organization.id, OrgRole::Owner);

        state
            .organizations
            .insert(organization.id.clone(), organization.clone());
        state.memberships.insert(owner.id.clone(), owner.clone());

        Ok((organization, owner))
    }

    async fn get_organization(&self, organization_id: &str) -> OrgdeskResult<Option<Organization>> {
        let state = self.state.read().await;
        Ok(state.organizations.get(organization_id).cloned())
    }

    async fn list_organizations(&self) -> OrgdeskResult<Vec<Organization>> {
        let state = self.state.read().await;
        Ok(sorted_organizations(
            state.organizations.values().cloned().collect(),
        ))
    }

    async fn list_organizations_for_user(&self, user_id: &str) -> OrgdeskResult<Vec<Organization>> {
        let state = self.state.read().await;
        Ok(sorted_organizations(
            state
                .memberships
                .values()
                .filter(|m| m.user_id == user_id)
                .filter_map(|m| state.organizations.get(&m.organization_id))
                .cloned()
                .collect(),
        ))
    }

    async fn delete_organization(&self, organization_id: &str) -> OrgdeskResult<bool> {
        let mut state = self.state.write().await;
        let removed = state.organizations.remove(organization_id).is_some();
        if removed {
            state
                .memberships
                .retain(|_, m| m.organization_id != organization_id);
        }
        Ok(removed)
    }
}
