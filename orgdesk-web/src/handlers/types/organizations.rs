//! Organization and member request types

use orgdesk_applications::{NewOrganization, OrgRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Create organization request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrganizationRequest {
    #[schema(example = "Acme Corp")]
    pub name: String,
    /// Lowercase letters, digits and hyphens; unique across organizations
    #[schema(example = "acme")]
    pub slug: String,
    pub logo: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
}

impl From<CreateOrganizationRequest> for NewOrganization {
    fn from(request: CreateOrganizationRequest) -> Self {
        Self {
            name: request.name,
            slug: request.slug,
            logo: request.logo,
            metadata: request.metadata,
        }
    }
}

/// Add member request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: String,
    /// `admin` or `member`; ownership cannot be granted
    #[serde(default = "default_member_role")]
    pub role: OrgRole,
}

fn default_member_role() -> OrgRole {
    OrgRole::Member
}

/// Update member role request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateMemberRequest {
    pub role: OrgRole,
}
