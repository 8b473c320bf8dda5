// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use ticketsync_remote::Document;

use crate::error::SyncError;
use crate::local::{EntityKey, EntityKind};
use crate::record::SyncRecord;

/// Persistence of sync records, keyed by local entity.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Loads the record of an entity.
    async fn load(&self, key: EntityKey) -> Result<Option<SyncRecord>, SyncError>;

    /// Inserts or replaces the record of `record.key`.
    async fn save(&self, record: &SyncRecord) -> Result<(), SyncError>;

    /// Loads every record.
    async fn load_all(&self) -> Result<Vec<SyncRecord>, SyncError>;

    /// Deletes a record, returning whether it existed.
    async fn delete(&self, key: EntityKey) -> Result<bool, SyncError>;

    /// Records of a remote event and its sub-events, series first.
    async fn find_by_remote_event(
        &self,
        organizer: &str,
        slug: &str,
    ) -> Result<Vec<SyncRecord>, SyncError>;

    /// Record of the instance mirrored as the given sub-event.
    async fn find_by_sub_event(
        &self,
        slug: &str,
        sub_event_id: i64,
    ) -> Result<Option<SyncRecord>, SyncError>;

    /// Clears the remote identifiers of a record and stops mirroring it.
    async fn detach(&self, key: EntityKey) -> Result<bool, SyncError> {
        let Some(mut record) = self.load(key).await? else {
            return Ok(false);
        };
        record.detach();
        self.save(&record).await?;
        Ok(true)
    }
}

/// SQLite backed [`RecordStore`].
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Opens a sqlite database and runs migrations.
    /// If `filename` is `None`, it opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting or migrating fails.
    pub async fn open(filename: Option<&Path>) -> Result<Self, SyncError> {
        let (options, pool_options) = if let Some(filename) = filename {
            tracing::info!(path = %filename.display(), "connecting to SQLite database");
            let options = SqliteConnectOptions::new()
                .filename(filename)
                .create_if_missing(true);
            (options, SqlitePoolOptions::new())
        } else {
            tracing::info!("connecting to in-memory SQLite database");
            // every connection of an in-memory database sees its own database
            let pool_options = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
            (SqliteConnectOptions::new().in_memory(true), pool_options)
        };

        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("src/store/migrations") // relative path from the crate root
            .run(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Closes the database connection.
    pub async fn close(self) {
        tracing::debug!("closing database connection");
        self.pool.close().await;
    }
}

const COLUMNS: &str = "\
entity_kind, entity_id, maintain_copy, template_reference, accounting_code, custom_fields,
remote_service_url, remote_organizer, remote_event_slug, remote_sub_event_id,
event_snapshot, sub_event_snapshot, product_snapshot, quota_snapshot,
availability_snapshot, available";

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn load(&self, key: EntityKey) -> Result<Option<SyncRecord>, SyncError> {
        let sql = format!("SELECT {COLUMNS} FROM sync_records WHERE entity_kind = ? AND entity_id = ?;");
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(key.kind.as_str())
            .bind(key.id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(RecordRow::into_record).transpose()
    }

    #[tracing::instrument(skip(self, record), fields(key = %record.key))]
    async fn save(&self, record: &SyncRecord) -> Result<(), SyncError> {
        let sql = format!(
            "\
INSERT INTO sync_records ({COLUMNS})
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(entity_kind, entity_id) DO UPDATE SET
    maintain_copy         = excluded.maintain_copy,
    template_reference    = excluded.template_reference,
    accounting_code       = excluded.accounting_code,
    custom_fields         = excluded.custom_fields,
    remote_service_url    = excluded.remote_service_url,
    remote_organizer      = excluded.remote_organizer,
    remote_event_slug     = excluded.remote_event_slug,
    remote_sub_event_id   = excluded.remote_sub_event_id,
    event_snapshot        = excluded.event_snapshot,
    sub_event_snapshot    = excluded.sub_event_snapshot,
    product_snapshot      = excluded.product_snapshot,
    quota_snapshot        = excluded.quota_snapshot,
    availability_snapshot = excluded.availability_snapshot,
    available             = excluded.available;
"
        );

        sqlx::query(&sql)
            .bind(record.key.kind.as_str())
            .bind(record.key.id)
            .bind(record.maintain_copy)
            .bind(&record.template_reference)
            .bind(&record.accounting_code)
            .bind(record.custom_fields.to_value().to_string())
            .bind(&record.remote_service_url)
            .bind(&record.remote_organizer)
            .bind(&record.remote_event_slug)
            .bind(record.remote_sub_event_id)
            .bind(record.event_snapshot.as_ref().map(|d| d.to_value().to_string()))
            .bind(record.sub_event_snapshot.as_ref().map(|d| d.to_value().to_string()))
            .bind(record.product_snapshot.as_ref().map(Value::to_string))
            .bind(record.quota_snapshot.as_ref().map(Value::to_string))
            .bind(record.availability_snapshot.as_ref().map(Value::to_string))
            .bind(record.available)
            .execute(&self.pool)
            .await?;

        tracing::debug!("record saved");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<SyncRecord>, SyncError> {
        let sql = format!("SELECT {COLUMNS} FROM sync_records ORDER BY entity_kind DESC, entity_id ASC;");
        let rows: Vec<RecordRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }

    async fn delete(&self, key: EntityKey) -> Result<bool, SyncError> {
        const SQL: &str = "DELETE FROM sync_records WHERE entity_kind = ? AND entity_id = ?;";
        let result = sqlx::query(SQL)
            .bind(key.kind.as_str())
            .bind(key.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_remote_event(
        &self,
        organizer: &str,
        slug: &str,
    ) -> Result<Vec<SyncRecord>, SyncError> {
        // "series" sorts after "instance", so DESC puts the series record first
        let sql = format!(
            "\
SELECT {COLUMNS} FROM sync_records
WHERE remote_organizer = ? AND remote_event_slug = ?
ORDER BY entity_kind DESC, entity_id ASC;"
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql)
            .bind(organizer)
            .bind(slug)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }

    async fn find_by_sub_event(
        &self,
        slug: &str,
        sub_event_id: i64,
    ) -> Result<Option<SyncRecord>, SyncError> {
        let sql = format!(
            "\
SELECT {COLUMNS} FROM sync_records
WHERE entity_kind = ? AND remote_event_slug = ? AND remote_sub_event_id = ?;"
        );
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(EntityKind::Instance.as_str())
            .bind(slug)
            .bind(sub_event_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(RecordRow::into_record).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    entity_kind: String,
    entity_id: i64,
    maintain_copy: bool,
    template_reference: Option<String>,
    accounting_code: Option<String>,
    custom_fields: String,
    remote_service_url: Option<String>,
    remote_organizer: Option<String>,
    remote_event_slug: Option<String>,
    remote_sub_event_id: Option<i64>,
    event_snapshot: Option<String>,
    sub_event_snapshot: Option<String>,
    product_snapshot: Option<String>,
    quota_snapshot: Option<String>,
    availability_snapshot: Option<String>,
    available: Option<bool>,
}

impl RecordRow {
    fn into_record(self) -> Result<SyncRecord, SyncError> {
        let kind = EntityKind::parse(&self.entity_kind)
            .ok_or_else(|| corrupt(format!("unknown entity kind {:?}", self.entity_kind)))?;

        Ok(SyncRecord {
            key: EntityKey {
                kind,
                id: self.entity_id,
            },
            maintain_copy: self.maintain_copy,
            template_reference: self.template_reference,
            accounting_code: self.accounting_code,
            custom_fields: parse_document(&self.custom_fields)?,
            remote_service_url: self.remote_service_url,
            remote_organizer: self.remote_organizer,
            remote_event_slug: self.remote_event_slug,
            remote_sub_event_id: self.remote_sub_event_id,
            event_snapshot: self.event_snapshot.as_deref().map(parse_document).transpose()?,
            sub_event_snapshot: self
                .sub_event_snapshot
                .as_deref()
                .map(parse_document)
                .transpose()?,
            product_snapshot: self.product_snapshot.as_deref().map(parse_json).transpose()?,
            quota_snapshot: self.quota_snapshot.as_deref().map(parse_json).transpose()?,
            availability_snapshot: self
                .availability_snapshot
                .as_deref()
                .map(parse_json)
                .transpose()?,
            available: self.available,
        })
    }
}

fn parse_json(text: &str) -> Result<Value, SyncError> {
    serde_json::from_str(text).map_err(|e| corrupt(format!("invalid snapshot: {e}")))
}

fn parse_document(text: &str) -> Result<Document, SyncError> {
    match parse_json(text)? {
        Value::Object(map) => Ok(Document::from(map)),
        other => Err(corrupt(format!("snapshot is not an object: {other}"))),
    }
}

fn corrupt(message: String) -> SyncError {
    SyncError::Store(sqlx::Error::Decode(message.into()))
}
