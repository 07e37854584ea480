//! SQLite persistence for users, organizations and memberships

use crate::auth::users::UserData;
use crate::WebResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgdesk_applications::{
    Membership, MembershipStore, NewOrganization, OrgRole, Organization, OrganizationStore, Role,
};
use orgdesk_core::{conflict_error, not_found_error, ErrorContext, OrgdeskError, OrgdeskResult};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// URL used when no database is configured
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

const COMPONENT: &str = "sqlite_store";

#[derive(Debug, sqlx::FromRow)]
struct UserRecord {
    id: String,
    username: String,
    email: String,
    display_name: Option<String>,
    password_hash: String,
    role: String,
    created_at: String,
}

impl UserRecord {
    fn into_user_data(self) -> OrgdeskResult<UserData> {
        Ok(UserData {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            username: self.username,
            email: self.email,
            display_name: self.display_name,
            password_hash: self.password_hash,
            role: self.role,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRecord {
    id: String,
    name: String,
    slug: String,
    logo: Option<String>,
    metadata: Option<String>,
    created_at: String,
}

impl OrganizationRecord {
    fn into_organization(self) -> OrgdeskResult<Organization> {
        let metadata = self
            .metadata
            .as_deref()
            .map(serde_json::from_str::<BTreeMap<String, String>>)
            .transpose()?;

        Ok(Organization {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            name: self.name,
            slug: self.slug,
            logo: self.logo,
            metadata,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRecord {
    id: String,
    user_id: String,
    organization_id: String,
    role: String,
    created_at: String,
}

impl MemberRecord {
    fn into_membership(self) -> OrgdeskResult<Membership> {
        Ok(Membership {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            user_id: self.user_id,
            organization_id: self.organization_id,
            role: self.role,
        })
    }
}

fn parse_timestamp(value: &str) -> OrgdeskResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| OrgdeskError::Storage {
            message: format!("Invalid timestamp '{}'", value),
            source: Some(Box::new(e)),
            context: ErrorContext::new(COMPONENT).with_operation("parse_timestamp"),
        })
}

/// Wrap a driver error with the failing operation
fn storage(operation: &'static str) -> impl FnOnce(sqlx::Error) -> OrgdeskError {
    move |e| OrgdeskError::Storage {
        message: format!("{} failed", operation),
        source: Some(Box::new(e)),
        context: ErrorContext::new(COMPONENT).with_operation(operation),
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|e| e.is_foreign_key_violation())
        .unwrap_or(false)
}

/// SQLite-backed store for every orgdesk record
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and create tables
    pub async fn connect(database_url: &str) -> WebResult<Self> {
        info!("Connecting to database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database, so keep exactly
        // one open for the life of the pool
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.create_tables().await?;
        info!("Database ready");
        Ok(store)
    }

    /// A fresh private in-memory database
    pub async fn in_memory() -> WebResult<Self> {
        Self::connect(IN_MEMORY_URL).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create_tables(&self) -> WebResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                display_name TEXT,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS organizations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT UNIQUE NOT NULL,
                logo TEXT,
                metadata TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS members (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, organization_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_members_user ON members(user_id)")
            .execute(&self.pool)
            .await?;

        debug!("Database tables created");
        Ok(())
    }

    // Users

    pub async fn insert_user(&self, user: &UserData) -> OrgdeskResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, display_name, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict_error!("Username or email already registered", COMPONENT)
            } else {
                storage("insert_user")(e)
            }
        })?;

        debug!("User inserted: {}", user.username);
        Ok(())
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> OrgdeskResult<Option<UserData>> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("get_user_by_id"))?
            .map(UserRecord::into_user_data)
            .transpose()
    }

    pub async fn get_user_by_username(&self, username: &str) -> OrgdeskResult<Option<UserData>> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("get_user_by_username"))?
            .map(UserRecord::into_user_data)
            .transpose()
    }

    pub async fn list_users(&self) -> OrgdeskResult<Vec<UserData>> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users ORDER BY created_at, username")
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list_users"))?
            .into_iter()
            .map(UserRecord::into_user_data)
            .collect()
    }

    pub async fn count_users(&self) -> OrgdeskResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(storage("count_users"))
    }

    pub async fn update_user_role(&self, user_id: &str, role: Role) -> OrgdeskResult<bool> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage("update_user_role"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite a stored role verbatim, bypassing parsing
    pub async fn set_raw_user_role(&self, user_id: &str, role: &str) -> OrgdeskResult<()> {
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage("set_raw_user_role"))?;
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for SqliteStore {
    async fn find_membership(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> OrgdeskResult<Option<Membership>> {
        sqlx::query_as::<_, MemberRecord>(
            "SELECT * FROM members WHERE user_id = ? AND organization_id = ?",
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("find_membership"))?
        .map(MemberRecord::into_membership)
        .transpose()
    }

    async fn find_member(&self, member_id: &str) -> OrgdeskResult<Option<Membership>> {
        sqlx::query_as::<_, MemberRecord>("SELECT * FROM members WHERE id = ?")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("find_member"))?
            .map(MemberRecord::into_membership)
            .transpose()
    }

    async fn list_members(&self, organization_id: &str) -> OrgdeskResult<Vec<Membership>> {
        sqlx::query_as::<_, MemberRecord>(
            "SELECT * FROM members WHERE organization_id = ? ORDER BY created_at, id",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("list_members"))?
        .into_iter()
        .map(MemberRecord::into_membership)
        .collect()
    }

    async fn add_membership(
        &self,
        user_id: &str,
        organization_id: &str,
        role: OrgRole,
    ) -> OrgdeskResult<Membership> {
        let membership = Membership::new(user_id, organization_id, role);

        sqlx::query(
            r#"
            INSERT INTO members (id, user_id, organization_id, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&membership.id)
        .bind(&membership.user_id)
        .bind(&membership.organization_id)
        .bind(&membership.role)
        .bind(membership.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict_error!(
                    format!("User {} is already a member", user_id),
                    COMPONENT
                )
            } else if is_foreign_key_violation(&e) {
                not_found_error!(format!("Organization {}", organization_id), COMPONENT)
            } else {
                storage("add_membership")(e)
            }
        })?;

        Ok(membership)
    }

    async fn update_membership_role(
        &self,
        member_id: &str,
        role: OrgRole,
    ) -> OrgdeskResult<Membership> {
        let result = sqlx::query("UPDATE members SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(storage("update_membership_role"))?;

        if result.rows_affected() == 0 {
            return Err(not_found_error!(format!("Member {}", member_id), COMPONENT));
        }

        self.find_member(member_id)
            .await?
            .ok_or_else(|| not_found_error!(format!("Member {}", member_id), COMPONENT))
    }

    async fn delete_membership(&self, member_id: &str) -> OrgdeskResult<bool> {
        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(storage("delete_membership"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrganizationStore for SqliteStore {
    async fn create_organization(
        &self,
        organization: NewOrganization,
        owner_user_id: &str,
    ) -> OrgdeskResult<(Organization, Membership)> {
        let created = Organization {
            id: Uuid::new_v4().to_string(),
            name: organization.name,
            slug: organization.slug,
            logo: organization.logo,
            metadata: organization.metadata,
            created_at: Utc::now(),
        };
        let owner = Membership::new(owner_user_id, &created.id, OrgRole::Owner);
        let metadata = created
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("create_organization"))?;

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, slug, logo, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&created.id)
        .bind(&created.name)
        .bind(&created.slug)
        .bind(&created.logo)
        .bind(&metadata)
        .bind(created.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict_error!(
                    format!("Slug '{}' is already taken", created.slug),
                    COMPONENT
                )
            } else {
                storage("create_organization")(e)
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO members (id, user_id, organization_id, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&owner.id)
        .bind(&owner.user_id)
        .bind(&owner.organization_id)
        .bind(&owner.role)
        .bind(owner.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(storage("create_owner_membership"))?;

        tx.commit().await.map_err(storage("create_organization"))?;

        Ok((created, owner))
    }

    async fn get_organization(&self, organization_id: &str) -> OrgdeskResult<Option<Organization>> {
        sqlx::query_as::<_, OrganizationRecord>("SELECT * FROM organizations WHERE id = ?")
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("get_organization"))?
            .map(OrganizationRecord::into_organization)
            .transpose()
    }

    async fn list_organizations(&self) -> OrgdeskResult<Vec<Organization>> {
        sqlx::query_as::<_, OrganizationRecord>("SELECT * FROM organizations ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list_organizations"))?
            .into_iter()
            .map(OrganizationRecord::into_organization)
            .collect()
    }

    async fn list_organizations_for_user(&self, user_id: &str) -> OrgdeskResult<Vec<Organization>> {
        sqlx::query_as::<_, OrganizationRecord>(
            r#"
            SELECT o.* FROM organizations o
            JOIN members m ON m.organization_id = o.id
            WHERE m.user_id = ?
            ORDER BY o.name, o.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("list_organizations_for_user"))?
        .into_iter()
        .map(OrganizationRecord::into_organization)
        .collect()
    }

    async fn delete_organization(&self, organization_id: &str) -> OrgdeskResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage("delete_organization"))?;

        sqlx::query("DELETE FROM members WHERE organization_id = ?")
            .bind(organization_id)
            .execute(&mut *tx)
            .await
            .map_err(storage("delete_organization_members"))?;

        let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
            .bind(organization_id)
            .execute(&mut *tx)
            .await
            .map_err(storage("delete_organization"))?;

        tx.commit().await.map_err(storage("delete_organization"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(slug: &str) -> NewOrganization {
        NewOrganization {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            metadata: Some(BTreeMap::from([("plan".to_string(), "free".to_string())])),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn organizations_are_created_with_their_owner() {
        let store = SqliteStore::in_memory().await.unwrap();
        let (created, owner) = store.create_organization(org("acme"), "alice").await.unwrap();

        assert!(owner.is_owner());
        let loaded = store.get_organization(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.slug, "acme");
        assert_eq!(
            loaded.metadata.unwrap().get("plan").map(String::as_str),
            Some("free")
        );

        let membership = store
            .find_membership("alice", &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.org_role(), Some(OrgRole::Owner));
    }

    #[tokio::test]
    async fn duplicate_slug_leaves_no_owner_row() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_organization(org("acme"), "alice").await.unwrap();

        let err = store
            .create_organization(org("acme"), "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, OrgdeskError::Conflict { .. }));
        assert!(store
            .list_organizations_for_user("bob")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn membership_pairs_are_unique_and_need_an_organization() {
        let store = SqliteStore::in_memory().await.unwrap();
        let (created, _) = store.create_organization(org("acme"), "alice").await.unwrap();

        store
            .add_membership("bob", &created.id, OrgRole::Member)
            .await
            .unwrap();
        let duplicate = store
            .add_membership("bob", &created.id, OrgRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(duplicate, OrgdeskError::Conflict { .. }));

        let orphan = store
            .add_membership("bob", "missing-org", OrgRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(orphan, OrgdeskError::NotFound { .. }));
    }

    #[tokio::test]
    async fn deleting_an_organization_removes_memberships() {
        let store = SqliteStore::in_memory().await.unwrap();
        let (created, owner) = store.create_organization(org("acme"), "alice").await.unwrap();
        let member = store
            .add_membership("bob", &created.id, OrgRole::Member)
            .await
            .unwrap();

        assert!(store.delete_organization(&created.id).await.unwrap());
        assert!(store.find_member(&owner.id).await.unwrap().is_none());
        assert!(store.find_member(&member.id).await.unwrap().is_none());
        assert!(!store.delete_organization(&created.id).await.unwrap());
    }

    #[tokio::test]
    async fn member_roles_update_in_place() {
        let store = SqliteStore::in_memory().await.unwrap();
        let (created, _) = store.create_organization(org("acme"), "alice").await.unwrap();
        let member = store
            .add_membership("bob", &created.id, OrgRole::Member)
            .await
            .unwrap();

        let updated = store
            .update_membership_role(&member.id, OrgRole::Admin)
            .await
            .unwrap();
        assert_eq!(updated.org_role(), Some(OrgRole::Admin));

        let missing = store
            .update_membership_role("nope", OrgRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(missing, OrgdeskError::NotFound { .. }));
    }

    #[tokio::test]
    async fn users_round_trip_and_stay_unique() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = UserData::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "password123",
            None,
            Role::User,
        )
        .unwrap();
        store.insert_user(&user).await.unwrap();
        assert_eq!(store.count_users().await.unwrap(), 1);

        let loaded = store.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(loaded.id, user.id);
        assert!(loaded.verify_password("password123"));

        let err = store.insert_user(&user).await.unwrap_err();
        assert!(matches!(err, OrgdeskError::Conflict { .. }));

        assert!(store.update_user_role(&user.id, Role::Admin).await.unwrap());
        let loaded = store.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.global_role(), Some(Role::Admin));
    }

    #[tokio::test]
    async fn file_databases_survive_reconnecting() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("orgdesk.db").display());

        let organization_id = {
            let store = SqliteStore::connect(&url).await.unwrap();
            let (created, _) = store.create_organization(org("acme"), "alice").await.unwrap();
            store.pool().close().await;
            created.id
        };

        let store = SqliteStore::connect(&url).await.unwrap();
        let membership = store
            .find_membership("alice", &organization_id)
            .await
            .unwrap()
            .unwrap();
        assert!(membership.is_owner());
    }
}
