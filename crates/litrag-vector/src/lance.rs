use futures::future::BoxFuture;
use lancedb::Connection;
use parking_lot::RwLock;

use litrag_core::traits::{ScoreKind, SimilarityBackend};
use litrag_core::types::{Chunk, ChunkId};
use litrag_core::{Error, Result};

use crate::search::nearest_by_distance;
use crate::table::{get_meta, open_db, set_meta};
use crate::unavailable;
use crate::writer::write_generation;

/// LanceDB-backed similarity search.
///
/// Each `populate` writes a fresh `<base>_g<n>` table and then flips the
/// active pointer (in memory and in the `meta` table), so searches never see
/// a partially written generation. Reopening a database resumes at the
/// generation the pointer names.
///
/// After a flip only the new table and the one it replaced are kept; the
/// replaced one may still be serving a search that started before the flip.
pub struct LanceBackend {
    conn: Connection,
    base: String,
    active: RwLock<Option<String>>,
}

impl LanceBackend {
    pub async fn open(uri: &str, base_table: &str) -> Result<Self> {
        let conn = open_db(uri).await?;
        let active = get_meta(&conn, &Self::pointer_key(base_table)).await?;
        if let Some(table) = &active {
            tracing::info!(uri, table = table.as_str(), "resuming vector generation");
        }
        Ok(Self { conn, base: base_table.to_string(), active: RwLock::new(active) })
    }

    fn pointer_key(base: &str) -> String { format!("active_table:{base}") }

    pub fn active_table(&self) -> Option<String> { self.active.read().clone() }

    fn generation_of(&self, table: &str) -> Option<u64> {
        table.strip_prefix(&self.base)?.strip_prefix("_g")?.parse().ok()
    }

    async fn next_generation(&self) -> Result<u64> {
        let names = self.conn.table_names().execute().await.map_err(unavailable)?;
        Ok(names.iter().filter_map(|n| self.generation_of(n)).max().unwrap_or(0) + 1)
    }

    /// Drop generation tables older than the one `current` replaced.
    /// Failures are logged; the new generation is already live.
    async fn drop_superseded(&self, current: u64) {
        let names = match self.conn.table_names().execute().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not list vector tables for cleanup");
                return;
            }
        };
        for name in names {
            let Some(generation) = self.generation_of(&name) else { continue };
            if generation + 1 >= current { continue; }
            match self.conn.drop_table(&name, &[]).await {
                Ok(()) => tracing::debug!(table = name.as_str(), "dropped superseded vector table"),
                Err(e) => tracing::warn!(table = name.as_str(), error = %e, "could not drop superseded vector table"),
            }
        }
    }

    async fn write(&self, chunks: &[Chunk]) -> Result<()> {
        let Some(first) = chunks.first() else { return Err(Error::EmptyCorpus) };
        let dim = first.embedding.len();
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dim) {
            return Err(Error::malformed(&bad.id, format!("embedding has {} components, expected {dim}", bad.embedding.len())));
        }
        let generation = self.next_generation().await?;
        let table = format!("{}_g{generation}", self.base);
        write_generation(&self.conn, &table, chunks, dim).await?;
        set_meta(&self.conn, &Self::pointer_key(&self.base), &table).await?;
        *self.active.write() = Some(table);
        self.drop_superseded(generation).await;
        Ok(())
    }
}

impl SimilarityBackend for LanceBackend {
    fn score_kind(&self) -> ScoreKind { ScoreKind::CosineDistance }

    fn nearest<'a>(&'a self, vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<(ChunkId, f32)>>> {
        Box::pin(async move {
            let Some(table) = self.active_table() else {
                return Err(Error::BackendUnavailable(format!("no vector table populated for {}", self.base)));
            };
            nearest_by_distance(&self.conn, &table, vector, k).await
        })
    }

    fn populate<'a>(&'a self, chunks: &'a [Chunk]) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.write(chunks))
    }
}
