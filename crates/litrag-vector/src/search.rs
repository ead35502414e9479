use arrow_array::{Float32Array, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};

use litrag_core::types::ChunkId;
use litrag_core::Result;

use crate::unavailable;

/// Flat cosine search over `table`; returns `(id, cosine distance)` nearest first.
pub async fn nearest_by_distance(conn: &Connection, table: &str, vector: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>> {
    let tbl = conn.open_table(table).execute().await.map_err(unavailable)?;
    let mut stream = tbl
        .vector_search(vector.to_vec())
        .map_err(unavailable)?
        .distance_type(DistanceType::Cosine)
        .limit(k)
        .execute()
        .await
        .map_err(unavailable)?;
    let mut hits = Vec::new();
    while let Some(batch) = stream.try_next().await.map_err(unavailable)? {
        let ids = batch
            .column_by_name("id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| unavailable("result batch has no id column"))?;
        let distances = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            .ok_or_else(|| unavailable("result batch has no _distance column"))?;
        for i in 0..batch.num_rows() {
            hits.push((ids.value(i).to_string(), distances.value(i)));
        }
    }
    Ok(hits)
}
