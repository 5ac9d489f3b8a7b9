//! Postgres-backed directory.
//!
//! Tables (created by [`PostgresDirectory::ensure_schema`]):
//!
//! - `user_roles(user_id, role)`: one row per granted role
//! - `crm_agents(user_id, full_name, email, is_active)`
//! - `portal_users(user_id, full_name, email, role, is_active)`
//!
//! Every lookup is a single indexed read by `user_id`. Nothing is cached.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use gatehouse_auth::{AgentProfile, DirectoryAdmin, DirectoryStore, PortalProfile, PortalRole, Role, StoreError};
use gatehouse_core::SubjectId;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS user_roles (
        user_id UUID NOT NULL,
        role    TEXT NOT NULL,
        PRIMARY KEY (user_id, role)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS crm_agents (
        user_id   UUID PRIMARY KEY,
        full_name TEXT NOT NULL,
        email     TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS portal_users (
        user_id   UUID PRIMARY KEY,
        full_name TEXT NOT NULL,
        email     TEXT,
        role      TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
];

/// Directory backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    tracing::debug!(operation, error = %err, "directory query failed");
    match err {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_) => {
            StoreError::Malformed(format!("{operation}: {err}"))
        }
        other => StoreError::Unavailable(format!("{operation}: {other}")),
    }
}

fn agent_from_row(row: &PgRow) -> Result<AgentProfile, sqlx::Error> {
    let user_id: Uuid = row.try_get("user_id")?;
    Ok(AgentProfile {
        subject_id: SubjectId::from_uuid(user_id),
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        is_active: row.try_get("is_active")?,
    })
}

fn portal_from_row(row: &PgRow) -> Result<PortalProfile, sqlx::Error> {
    let user_id: Uuid = row.try_get("user_id")?;
    let role: String = row.try_get("role")?;
    Ok(PortalProfile {
        subject_id: SubjectId::from_uuid(user_id),
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        role: PortalRole::new(role),
        is_active: row.try_get("is_active")?,
    })
}

#[async_trait]
impl DirectoryStore for PostgresDirectory {
    async fn roles_matching(&self, subject: SubjectId, any_of: &[Role]) -> Result<Vec<Role>, StoreError> {
        let wanted: Vec<String> = any_of.iter().map(|r| r.as_str().to_string()).collect();

        let rows = sqlx::query(
            r#"
            SELECT role
            FROM user_roles
            WHERE user_id = $1
                AND role = ANY($2)
            ORDER BY role
            "#,
        )
        .bind(subject.as_uuid())
        .bind(&wanted)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("roles_matching", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("role")
                    .map(Role::new)
                    .map_err(|e| map_sqlx_error("roles_matching", e))
            })
            .collect()
    }

    async fn agent_profile(&self, subject: SubjectId) -> Result<Option<AgentProfile>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, full_name, email, is_active
            FROM crm_agents
            WHERE user_id = $1
            "#,
        )
        .bind(subject.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("agent_profile", e))?;

        row.as_ref()
            .map(agent_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("agent_profile", e))
    }

    async fn portal_profile(&self, subject: SubjectId) -> Result<Option<PortalProfile>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, full_name, email, role, is_active
            FROM portal_users
            WHERE user_id = $1
            "#,
        )
        .bind(subject.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("portal_profile", e))?;

        row.as_ref()
            .map(portal_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("portal_profile", e))
    }
}

#[async_trait]
impl DirectoryAdmin for PostgresDirectory {
    async fn assign_role(&self, subject: SubjectId, role: Role) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            "#,
        )
        .bind(subject.as_uuid())
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_role", e))?;
        Ok(())
    }

    async fn revoke_role(&self, subject: SubjectId, role: &Role) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
            .bind(subject.as_uuid())
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke_role", e))?;
        Ok(())
    }

    async fn upsert_agent_profile(&self, profile: AgentProfile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO crm_agents (user_id, full_name, email, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
                SET full_name = EXCLUDED.full_name,
                    email = EXCLUDED.email,
                    is_active = EXCLUDED.is_active
            "#,
        )
        .bind(profile.subject_id.as_uuid())
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(profile.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_agent_profile", e))?;
        Ok(())
    }

    async fn set_agent_active(&self, subject: SubjectId, active: bool) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE crm_agents SET is_active = $2 WHERE user_id = $1")
            .bind(subject.as_uuid())
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_agent_active", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_portal_profile(&self, profile: PortalProfile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO portal_users (user_id, full_name, email, role, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
                SET full_name = EXCLUDED.full_name,
                    email = EXCLUDED.email,
                    role = EXCLUDED.role,
                    is_active = EXCLUDED.is_active
            "#,
        )
        .bind(profile.subject_id.as_uuid())
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(profile.role.as_str())
        .bind(profile.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_portal_profile", e))?;
        Ok(())
    }

    async fn set_portal_active(&self, subject: SubjectId, active: bool) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE portal_users SET is_active = $2 WHERE user_id = $1")
            .bind(subject.as_uuid())
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_portal_active", e))?;
        Ok(result.rows_affected() > 0)
    }
}
