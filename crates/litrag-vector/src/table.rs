//! LanceDB connection and housekeeping helpers.
//!
//! Besides opening the database, this keeps a small key/value `meta` table
//! holding pointers such as the active generation table of a backend.

use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::sync::Arc;

use litrag_core::Result;

use crate::unavailable;

pub const META_TABLE: &str = "meta";

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(unavailable)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(unavailable)?;
    Ok(names.iter().any(|n| n == name))
}

fn build_meta_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
        Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]))
}

pub async fn ensure_meta_table(conn: &Connection) -> Result<()> {
    if table_exists(conn, META_TABLE).await? { return Ok(()); }
    let schema = build_meta_schema();
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(META_TABLE, Box::new(iter)).execute().await.map_err(unavailable)?;
    Ok(())
}

/// Upsert `key = value`; keys are unique.
pub async fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    ensure_meta_table(conn).await?;
    let t = conn.open_table(META_TABLE).execute().await.map_err(unavailable)?;
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(vec![key.to_string()])),
            Arc::new(StringArray::from(vec![value.to_string()])),
            Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
        ],
    )
    .map_err(unavailable)?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
    let mut mi = t.merge_insert(&["key"]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    let _ = mi.execute(reader).await.map_err(unavailable)?;
    Ok(())
}

pub async fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    if !table_exists(conn, META_TABLE).await? { return Ok(None); }
    let t = conn.open_table(META_TABLE).execute().await.map_err(unavailable)?;
    let mut stream = t.query().only_if(format!("key = '{}'", key.replace('\'', "''"))).execute().await.map_err(unavailable)?;
    while let Some(batch) = stream.try_next().await.map_err(unavailable)? {
        if batch.num_rows() == 0 { continue; }
        let Some(val) = batch.column_by_name("value").and_then(|c| c.as_any().downcast_ref::<StringArray>()) else {
            return Ok(None);
        };
        return Ok(Some(val.value(0).to_string()));
    }
    Ok(None)
}
