//! Watch-group repository implementation.
//!
//! Group definitions and membership are administered outside the
//! engine; the engine itself only evaluates matching. Matching is a
//! fresh query on every call so definition changes take effect on the
//! next change event.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use propwatch_core::{
    new_v7, CreateGroupRequest, DocumentRef, Error, GroupCriteria, Result, WatchGroup,
    WatchGroupRepository,
};

const GROUP_COLUMNS: &str = "id, name, namespaces, categories, created_at, updated_at";

/// PostgreSQL implementation of [`WatchGroupRepository`].
pub struct PgWatchGroupRepository {
    pool: Pool<Postgres>,
}

impl PgWatchGroupRepository {
    /// Create a new PgWatchGroupRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_group(r: &sqlx::postgres::PgRow, members: Vec<Uuid>) -> WatchGroup {
        WatchGroup {
            id: r.get("id"),
            name: r.get("name"),
            criteria: GroupCriteria {
                namespaces: r.get("namespaces"),
                categories: r.get("categories"),
            },
            members,
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

#[async_trait]
impl WatchGroupRepository for PgWatchGroupRepository {
    async fn matching_groups(&self, document: &DocumentRef) -> Result<Vec<WatchGroup>> {
        let rows = sqlx::query(&format!(
            "SELECT {GROUP_COLUMNS}
             FROM watch_group
             WHERE (cardinality(namespaces) = 0 OR $1 = ANY(namespaces))
               AND (cardinality(categories) = 0 OR categories && $2)
             ORDER BY id"
        ))
        .bind(document.namespace)
        .bind(&document.categories)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: Uuid = row.get("id");
            let members = self.members(id).await?;
            groups.push(Self::parse_group(row, members));
        }

        debug!(
            subsystem = "db",
            component = "groups",
            op = "match",
            page_id = document.page_id,
            group_count = groups.len(),
            "Matched watch groups for document"
        );

        Ok(groups)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WatchGroup>> {
        let row = sqlx::query(&format!(
            "SELECT {GROUP_COLUMNS} FROM watch_group WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => {
                let members = self.members(id).await?;
                Ok(Some(Self::parse_group(&row, members)))
            }
            None => Ok(None),
        }
    }

    async fn members(&self, group_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT user_id FROM watch_group_member WHERE group_id = $1 ORDER BY user_id",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(|r| r.get("user_id")).collect())
    }

    async fn create(&self, req: CreateGroupRequest) -> Result<Uuid> {
        if req.name.is_empty() {
            return Err(Error::InvalidInput("watch group name is empty".into()));
        }

        let id = new_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO watch_group (id, name, namespaces, categories, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)",
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.criteria.namespaces)
        .bind(&req.criteria.categories)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM watch_group WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO watch_group_member (group_id, user_id)
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(Error::GroupNotFound(group_id))
            }
            Err(e) => Err(Error::Database(e)),
        }
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM watch_group_member WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
