use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{Condition, Document, Filter, Result, StoreError, Version, store::VersionedStore};

const PRIMARY_KEY: &str = "documents_pkey";
const UNIQUE_KEY_INDEX: &str = "unique_document_key";

/// PostgreSQL-backed document store.
///
/// All collections share the `documents` table; each store instance only
/// sees rows of its own `D::COLLECTION`.
pub struct PostgresStore<D: Document> {
    pool: PgPool,
    _marker: PhantomData<fn() -> D>,
}

impl<D: Document> Clone for PostgresStore<D> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<D: Document> PostgresStore<D> {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_doc(row: PgRow) -> Result<D> {
        let body: serde_json::Value = row.try_get("body")?;
        Ok(serde_json::from_value(body)?)
    }

    /// Maps constraint violations to store errors.
    fn map_write_error(err: sqlx::Error, doc: &D) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.constraint() {
                Some(PRIMARY_KEY) => {
                    return StoreError::AlreadyExists {
                        collection: D::COLLECTION,
                        id: doc.id().to_string(),
                    };
                }
                Some(UNIQUE_KEY_INDEX) => {
                    return StoreError::UniqueViolation {
                        collection: D::COLLECTION,
                        key: doc.unique_key().unwrap_or_default(),
                    };
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }

    /// Explains why a conditional write touched no rows.
    async fn missed_write(&self, id: D::Id, expected: Version) -> StoreError {
        let current: std::result::Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT version FROM documents WHERE collection = $1 AND id = $2")
                .bind(D::COLLECTION)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await;

        match current {
            Ok(Some(actual)) => StoreError::VersionConflict {
                collection: D::COLLECTION,
                id: id.to_string(),
                expected,
                actual: Version::new(actual),
            },
            Ok(None) => StoreError::NotFound {
                collection: D::COLLECTION,
                id: id.to_string(),
            },
            Err(e) => StoreError::Database(e),
        }
    }
}

/// Runs the bundled database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

#[async_trait]
impl<D: Document> VersionedStore<D> for PostgresStore<D> {
    async fn get(&self, id: D::Id) -> Result<Option<D>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
                .bind(D::COLLECTION)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_doc).transpose()
    }

    async fn insert(&self, doc: &D) -> Result<()> {
        let body = serde_json::to_value(doc)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, version, unique_key, body)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(D::COLLECTION)
        .bind(doc.id().to_string())
        .bind(doc.version().as_i64())
        .bind(doc.unique_key())
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, doc))?;

        Ok(())
    }

    async fn put_if_version(&self, doc: &D, expected: Version) -> Result<()> {
        let body = serde_json::to_value(doc)?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET version = $3, unique_key = $4, body = $5, updated_at = now()
            WHERE collection = $1 AND id = $2 AND version = $6
            "#,
        )
        .bind(D::COLLECTION)
        .bind(doc.id().to_string())
        .bind(doc.version().as_i64())
        .bind(doc.unique_key())
        .bind(body)
        .bind(expected.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, doc))?;

        if result.rows_affected() == 0 {
            let err = self.missed_write(doc.id(), expected).await;
            tracing::debug!(collection = D::COLLECTION, id = %doc.id(), %expected, error = %err, "conditional update missed");
            return Err(err);
        }
        Ok(())
    }

    async fn delete_if_version(&self, id: D::Id, expected: Version) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM documents WHERE collection = $1 AND id = $2 AND version = $3",
        )
        .bind(D::COLLECTION)
        .bind(id.to_string())
        .bind(expected.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missed_write(id, expected).await);
        }
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<D>> {
        let mut sql = String::from("SELECT body FROM documents WHERE collection = $1");
        let mut param_count = 1;

        // Build dynamic query
        for condition in filter.conditions() {
            param_count += 1;
            let field = param_count;
            match condition {
                Condition::Eq { .. } => {
                    param_count += 1;
                    sql.push_str(&format!(" AND body->>${field} = ${param_count}"));
                }
                Condition::In { .. } => {
                    param_count += 1;
                    sql.push_str(&format!(" AND body->>${field} = ANY(${param_count})"));
                }
                Condition::IsNull { .. } => {
                    sql.push_str(&format!(" AND body->>${field} IS NULL"));
                }
            }
        }

        sql.push_str(" ORDER BY id ASC");

        // Build and execute query with parameters
        let mut query = sqlx::query(&sql).bind(D::COLLECTION);
        for condition in filter.conditions() {
            query = query.bind(condition.field().to_string());
            match condition {
                Condition::Eq { value, .. } => query = query.bind(value.clone()),
                Condition::In { values, .. } => query = query.bind(values.clone()),
                Condition::IsNull { .. } => {}
            }
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_doc).collect()
    }
}
