use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::Collection;
use crate::error::AppError;

/// Largest number of deletes committed as one atomic group.
pub const MAX_GROUP_SIZE: usize = 450;

#[derive(Debug, Error)]
#[error("group {group} of {collection} failed after {deleted} deletions: {source}")]
pub struct DeletionInterrupted {
    pub collection: Collection,
    pub group: usize,
    /// Rows removed by groups committed before the failure, across the whole plan.
    pub deleted: u64,
    #[source]
    pub source: sqlx::Error,
}

impl From<DeletionInterrupted> for AppError {
    fn from(err: DeletionInterrupted) -> Self {
        AppError::PartialDeletion {
            deleted: err.deleted,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionDeletion {
    pub collection: Collection,
    pub requested: usize,
    pub deleted: u64,
    pub groups: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub collections: Vec<CollectionDeletion>,
    pub total_deleted: u64,
}

/// Chunked deletes. Each group is its own transaction and groups run in
/// order; a failed group leaves earlier groups deleted. Ids that no longer
/// exist delete nothing, so rerunning the same plan is always safe.
#[derive(Debug, Clone)]
pub struct BatchDeleter {
    db: SqlitePool,
    group_size: usize,
}

impl BatchDeleter {
    pub fn new(db: SqlitePool, group_size: usize) -> Self {
        Self {
            db,
            group_size: group_size.clamp(1, MAX_GROUP_SIZE),
        }
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Runs each step of `plan` in order, children before parents.
    pub async fn delete_plan(
        &self,
        plan: Vec<(Collection, Vec<String>)>,
    ) -> Result<DeletionSummary, DeletionInterrupted> {
        let mut summary = DeletionSummary::default();

        for (collection, ids) in plan {
            let step = self
                .delete_ids(collection, &ids)
                .await
                .map_err(|mut err| {
                    err.deleted += summary.total_deleted;
                    err
                })?;
            summary.total_deleted += step.deleted;
            summary.collections.push(step);
        }

        Ok(summary)
    }

    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn delete_ids(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<CollectionDeletion, DeletionInterrupted> {
        let total_groups = ids.len().div_ceil(self.group_size);
        let mut deleted = 0u64;

        for (group_idx, chunk) in ids.chunks(self.group_size).enumerate() {
            let removed = self
                .commit_group(collection, chunk)
                .await
                .map_err(|source| DeletionInterrupted {
                    collection,
                    group: group_idx + 1,
                    deleted,
                    source,
                })?;
            deleted += removed;

            info!(
                "Deleted {} group {} / {} ({} of {} ids removed)",
                collection,
                group_idx + 1,
                total_groups,
                removed,
                chunk.len()
            );
        }

        Ok(CollectionDeletion {
            collection,
            requested: ids.len(),
            deleted,
            groups: total_groups,
        })
    }

    async fn commit_group(&self, collection: Collection, ids: &[String]) -> Result<u64, sqlx::Error> {
        let mut tx = self.db.begin().await?;

        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("DELETE FROM {} WHERE id IN (", collection.table()));
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let removed = query_builder.build().execute(&mut *tx).await?.rows_affected();
        tx.commit().await?;

        Ok(removed)
    }
}
