//! orgdesk Applications - access control and organization management
//!
//! This crate holds the decision logic of orgdesk, independent of any web
//! framework:
//!
//! - Role model and identities
//! - Membership and organization stores (traits plus an in-memory backend)
//! - The access decision engine
//! - Organization and member operations gated by that engine
//!
//! ## Architecture
//!
//! - **Infrastructure** (orgdesk-core): errors, logging, configuration
//! - **Decisions** (this crate): who may do what
//! - **Enactment** (orgdesk-web): redirects, status codes, persistence

pub mod auth;
pub mod organizations;

pub use auth::{
    AccessDecision, AccessDecisionEngine, Credentials, DenialReason, Identity, InMemoryStore,
    Membership, MembershipStore, NewOrganization, OrgRole, Organization, OrganizationContext,
    OrganizationStore, Role, SessionResolver, StaticSessionResolver, ELEVATED_ROLES,
};
pub use organizations::{ListingScope, OrganizationListing, OrganizationService};

use orgdesk_core::OrgdeskError;

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("Access denied: {0}")]
    Denied(DenialReason),

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Core error: {0}")]
    Core(OrgdeskError),
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

impl ApplicationError {
    /// Create a validation error
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// The denial reason, if this error is a policy denial
    pub fn denial(&self) -> Option<DenialReason> {
        match self {
            Self::Denied(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<DenialReason> for ApplicationError {
    fn from(reason: DenialReason) -> Self {
        Self::Denied(reason)
    }
}

/// Store errors that describe the request rather than the infrastructure
/// surface as their application-level counterparts
impl From<OrgdeskError> for ApplicationError {
    fn from(error: OrgdeskError) -> Self {
        match error {
            OrgdeskError::NotFound { resource, .. } => Self::NotFound { message: resource },
            OrgdeskError::Conflict { message, .. } => Self::Conflict { message },
            OrgdeskError::Validation { message, field, .. } => Self::Validation {
                field: field.unwrap_or_default(),
                message,
            },
            other => Self::Core(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgdesk_core::{conflict_error, storage_error};

    #[test]
    fn store_errors_map_to_application_errors() {
        let conflict: ApplicationError = conflict_error!("slug taken", "store").into();
        assert!(matches!(conflict, ApplicationError::Conflict { .. }));

        let storage: ApplicationError = storage_error!("disk full", "store").into();
        assert!(matches!(storage, ApplicationError::Core(_)));
        assert_eq!(storage.denial(), None);

        let denied: ApplicationError = DenialReason::NotAMember.into();
        assert_eq!(denied.denial(), Some(DenialReason::NotAMember));
    }
}
