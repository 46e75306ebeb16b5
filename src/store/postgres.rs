use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, Row, Transaction};
use tracing::info;

use super::{apply_updates, CollectionPath, DocPath, Document, DocumentStore, FieldUpdate, StoreError, Write, WriteBatch};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    path TEXT PRIMARY KEY,
    parent TEXT NOT NULL,
    data JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const PARENT_INDEX: &str = "CREATE INDEX IF NOT EXISTS documents_parent_idx ON documents (parent)";

/// Postgres-backed document store: one JSONB row per document, keyed by
/// its full path and indexed by its parent collection.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects, then creates the documents table if it is missing
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        validate_database_url(database_url)?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;
        sqlx::query(PARENT_INDEX).execute(&pool).await?;

        info!("Connected Postgres document store (max_connections={})", max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed Postgres document store");
    }

    async fn upsert(tx: &mut Transaction<'_, Postgres>, path: &DocPath, doc: &Document) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO documents (path, parent, data, updated_at) VALUES ($1, $2, $3, now()) \
             ON CONFLICT (path) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
        )
        .bind(path.to_string())
        .bind(path.parent().to_string())
        .bind(Json(doc))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn update_locked(
        tx: &mut Transaction<'_, Postgres>,
        path: &DocPath,
        updates: &[FieldUpdate],
    ) -> Result<(), StoreError> {
        let row = sqlx::query("SELECT data FROM documents WHERE path = $1 FOR UPDATE")
            .bind(path.to_string())
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        let Json(mut doc): Json<Document> = row.try_get("data")?;
        apply_updates(&mut doc, updates)?;
        Self::upsert(tx, path, &doc).await
    }
}

fn validate_database_url(database_url: &str) -> Result<(), StoreError> {
    let url = url::Url::parse(database_url).map_err(|_| StoreError::InvalidDatabaseUrl)?;
    match url.scheme() {
        "postgres" | "postgresql" => Ok(()),
        _ => Err(StoreError::InvalidDatabaseUrl),
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT data FROM documents WHERE path = $1")
            .bind(path.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(doc): Json<Document> = row.try_get("data")?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, path: &DocPath, doc: Document) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::upsert(&mut tx, path, &doc).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, path: &DocPath, updates: Vec<FieldUpdate>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::update_locked(&mut tx, path, &updates).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE path = $1")
            .bind(path.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<(DocPath, Document)>, StoreError> {
        let rows = sqlx::query("SELECT path, data FROM documents WHERE parent = $1 ORDER BY path")
            .bind(collection.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<(DocPath, Document), StoreError> {
                let raw: String = row.try_get("path")?;
                let Json(doc): Json<Document> = row.try_get("data")?;
                let path = DocPath::parse(&raw).map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
                Ok((path, doc))
            })
            .collect()
    }

    async fn delete_collection(&self, collection: &CollectionPath) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE parent = $1")
            .bind(collection.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for write in batch.into_writes() {
            match write {
                Write::Set(path, doc) => Self::upsert(&mut tx, &path, &doc).await?,
                Write::Update(path, updates) => Self::update_locked(&mut tx, &path, &updates).await?,
                Write::Delete(path) => {
                    sqlx::query("DELETE FROM documents WHERE path = $1")
                        .bind(path.to_string())
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        // Dropping an uncommitted transaction rolls it back
        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
