use arrow_array::RecordBatchIterator;
use lancedb::Connection;

use litrag_core::types::Chunk;
use litrag_core::{Error, Result};

use crate::schema::{build_arrow_schema, chunks_to_record_batch};

const BATCH_SIZE: usize = 1000;

/// Create `table` holding `chunks` and their embeddings. Fails if the table
/// already exists, so a generation table is only ever written once.
pub async fn write_generation(conn: &Connection, table: &str, chunks: &[Chunk], dim: usize) -> Result<()> {
    let dim = i32::try_from(dim).map_err(|_| Error::InvalidConfig(format!("embedding dim {dim} too large")))?;
    let batches: Vec<_> = chunks.chunks(BATCH_SIZE).map(|batch| chunks_to_record_batch(batch, dim)).collect();
    let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), build_arrow_schema(dim)));
    conn.create_table(table, reader)
        .execute()
        .await
        .map_err(|e| Error::BackendUnavailable(format!("create table {table}: {e}")))?;
    tracing::info!(table, rows = chunks.len(), "wrote vector generation");
    Ok(())
}
