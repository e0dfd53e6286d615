//! Change-set repository implementation.
//!
//! One persisted change set is a parent `changeset` row plus one
//! `change_record` row per normalized record, written in a single
//! transaction so a crash mid-write never leaves partial records
//! visible.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use propwatch_core::{
    new_v7, ChangeRecord, ChangeSet, ChangeSetRepository, ChangeSetSummary, DocumentRef, Error,
    PersistOutcome, Result, WatchGroup,
};

/// PostgreSQL implementation of [`ChangeSetRepository`].
pub struct PgChangeSetRepository {
    pool: Pool<Postgres>,
}

impl PgChangeSetRepository {
    /// Create a new PgChangeSetRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Permanently delete a change set and its records (administration
    /// and test cleanup; the engine itself never deletes).
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM changeset WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    fn parse_summary(r: &sqlx::postgres::PgRow) -> ChangeSetSummary {
        ChangeSetSummary {
            id: r.get("id"),
            page_id: r.get("page_id"),
            title: r.get("title"),
            actor: r.get("actor"),
            occurred_at: r.get("occurred_at"),
            record_count: r.get("record_count"),
        }
    }
}

#[async_trait]
impl ChangeSetRepository for PgChangeSetRepository {
    async fn persist(&self, set: &mut ChangeSet, groups: &[WatchGroup]) -> Result<PersistOutcome> {
        if set.id().is_some() {
            return Err(Error::InvalidInput(
                "change set has already been persisted".into(),
            ));
        }
        let actor = set
            .actor()
            .ok_or_else(|| Error::InvalidInput("change set has no actor".into()))?;
        let occurred_at = set.occurred_at().unwrap_or_else(Utc::now);

        let id = new_v7();
        let doc = set.document();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO changeset (id, actor, page_id, namespace, title, occurred_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(actor)
        .bind(doc.page_id)
        .bind(doc.namespace)
        .bind(&doc.title)
        .bind(occurred_at)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let mut inserted_count: i64 = 0;
        for (position, record) in set.records().iter().enumerate() {
            sqlx::query(
                "INSERT INTO change_record (id, changeset_id, position, property, old_value, new_value)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(new_v7())
            .bind(id)
            .bind(position as i32)
            .bind(&record.property)
            .bind(&record.old_value)
            .bind(&record.new_value)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            inserted_count += 1;
        }

        // Per-group bookkeeping rows are only meaningful for change
        // sets that actually carry records.
        if inserted_count > 0 {
            for group in groups {
                sqlx::query(
                    "INSERT INTO watch_group_changeset (group_id, changeset_id)
                     VALUES ($1, $2) ON CONFLICT DO NOTHING",
                )
                .bind(group.id)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            }
        }

        tx.commit().await.map_err(Error::Database)?;

        let page_id = doc.page_id;
        set.assign_id(id)?;

        info!(
            subsystem = "db",
            component = "changesets",
            op = "persist",
            changeset_id = %id,
            page_id,
            record_count = inserted_count,
            group_count = groups.len(),
            "Change set persisted"
        );

        Ok(PersistOutcome {
            id,
            inserted_count,
        })
    }

    async fn load(&self, id: Uuid) -> Result<ChangeSet> {
        let row = sqlx::query(
            "SELECT id, actor, page_id, namespace, title, occurred_at
             FROM changeset WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Err(Error::ChangeSetNotFound(id));
        };

        let records = sqlx::query(
            "SELECT property, old_value, new_value
             FROM change_record
             WHERE changeset_id = $1
             ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let records = records
            .into_iter()
            .map(|r| ChangeRecord {
                property: r.get("property"),
                old_value: r.get("old_value"),
                new_value: r.get("new_value"),
            })
            .collect();

        // Categories are a matching-time concern and are not persisted
        // with the change set.
        let document = DocumentRef::new(
            row.get::<i64, _>("page_id"),
            row.get::<i32, _>("namespace"),
            row.get::<String, _>("title"),
        );

        Ok(ChangeSet::restored(
            row.get("id"),
            document,
            row.get("actor"),
            row.get("occurred_at"),
            records,
        ))
    }

    async fn list_for_document(&self, page_id: i64, limit: i64) -> Result<Vec<ChangeSetSummary>> {
        let rows = sqlx::query(
            "SELECT c.id, c.page_id, c.title, c.actor, c.occurred_at,
                    (SELECT COUNT(*) FROM change_record r WHERE r.changeset_id = c.id) AS record_count
             FROM changeset c
             WHERE c.page_id = $1
             ORDER BY c.occurred_at DESC
             LIMIT $2",
        )
        .bind(page_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_summary).collect())
    }

    async fn list_for_group(&self, group_id: Uuid, limit: i64) -> Result<Vec<ChangeSetSummary>> {
        let rows = sqlx::query(
            "SELECT c.id, c.page_id, c.title, c.actor, c.occurred_at,
                    (SELECT COUNT(*) FROM change_record r WHERE r.changeset_id = c.id) AS record_count
             FROM changeset c
             JOIN watch_group_changeset gc ON gc.changeset_id = c.id
             WHERE gc.group_id = $1
             ORDER BY c.occurred_at DESC
             LIMIT $2",
        )
        .bind(group_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_summary).collect())
    }
}
