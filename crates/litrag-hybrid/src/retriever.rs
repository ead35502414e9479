use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use litrag_core::config::RetrievalConfig;
use litrag_core::traits::ChunkSource;
use litrag_core::types::{Candidate, Chunk, Query};
use litrag_core::{Error, Result};
use litrag_text::{Analyzer, LexicalIndex};
use litrag_vector::SimilarityIndex;

use crate::fusion::FusionEngine;
use crate::response::{Degradation, Passage, Retrieval, RetrievalMode, RetrieverStats};
use crate::snapshot::IndexSnapshot;

/// Result of one per-source search, before fusion.
#[derive(Debug)]
pub enum SearchOutcome {
    Hits(Vec<Candidate>),
    /// The source failed in a way the query survives; fuse as if it were empty.
    Degraded(Degradation),
    Fatal(Error),
}

impl SearchOutcome {
    fn from_result(result: Result<Vec<Candidate>>) -> Self {
        match result {
            Ok(hits) => SearchOutcome::Hits(hits),
            Err(e) => match Degradation::from_error(&e) {
                Some(d) => SearchOutcome::Degraded(d),
                None => SearchOutcome::Fatal(e),
            },
        }
    }
}

/// Reject the corpus if any chunk lacks a usable id, text or embedding.
pub fn validate_chunks(chunks: &[Chunk], dim: usize) -> Result<()> {
    let mut seen = HashSet::with_capacity(chunks.len());
    for c in chunks {
        if c.id.trim().is_empty() { return Err(Error::malformed(&c.id, "empty chunk id")); }
        if c.text.trim().is_empty() { return Err(Error::malformed(&c.id, "blank text")); }
        if c.embedding.is_empty() { return Err(Error::malformed(&c.id, "missing embedding")); }
        if c.embedding.len() != dim {
            return Err(Error::malformed(&c.id, format!("embedding has {} components, expected {dim}", c.embedding.len())));
        }
        if c.embedding.iter().any(|x| !x.is_finite()) { return Err(Error::malformed(&c.id, "non-finite embedding component")); }
        if !seen.insert(c.id.as_str()) { return Err(Error::malformed(&c.id, "duplicate chunk id")); }
    }
    Ok(())
}

/// Hybrid Retriever: BM25 and vector similarity searched concurrently, then fused.
///
/// Queries read the current `IndexSnapshot` through a short read lock and
/// keep their own `Arc` to it, so a rebuild never blocks or disturbs them.
/// Builds are serialized by `build_lock`.
pub struct HybridRetriever {
    config: RetrievalConfig,
    similarity: SimilarityIndex,
    fusion: FusionEngine,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    build_lock: Mutex<()>,
    generation: AtomicU64,
}

impl HybridRetriever {
    pub fn new(config: RetrievalConfig, similarity: SimilarityIndex) -> Result<Self> {
        config.validate()?;
        let fusion = FusionEngine::new(config.fusion);
        Ok(Self {
            config,
            similarity,
            fusion,
            current: RwLock::new(None),
            build_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &RetrievalConfig { &self.config }

    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> { self.current.read().clone() }

    /// Rebuild both indexes from `source` and publish a new generation.
    ///
    /// The similarity backend is repopulated first, then the lexical
    /// snapshot is swapped in. On any failure the previous generation stays
    /// live and the error is returned.
    pub async fn build_indexes(&self, source: &dyn ChunkSource) -> Result<u64> {
        let _guard = self.build_lock.lock().await;
        let started = Instant::now();
        let chunks = source.list_chunks()?;
        if chunks.is_empty() { return Err(Error::EmptyCorpus); }
        validate_chunks(&chunks, self.similarity.dim())?;

        let chunks = Arc::new(chunks);
        let analyzer = Analyzer::new(self.config.analyzer.clone());
        let params = self.config.bm25;
        let lexical = {
            let chunks = Arc::clone(&chunks);
            tokio::task::spawn_blocking(move || LexicalIndex::build(&chunks, analyzer, params))
                .await
                .map_err(|e| Error::Operation(format!("lexical build task failed: {e}")))??
        };
        self.similarity.populate(&chunks).await?;

        let chunks = Arc::try_unwrap(chunks).unwrap_or_else(|shared| shared.as_ref().clone());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(IndexSnapshot::new(generation, lexical, chunks));
        let (chunk_count, document_count) = (snapshot.chunk_count(), snapshot.document_count());
        *self.current.write() = Some(snapshot);
        info!(generation, chunk_count, document_count, ms = started.elapsed().as_millis() as u64, "published index generation");
        Ok(generation)
    }

    pub async fn retrieve_default(&self, text: &str) -> Result<Retrieval> {
        self.retrieve(text, self.config.default_k).await
    }

    /// Top `k` passages for `text`. Fails only with `IndexNotReady` (no
    /// build yet) or `Cancelled`; similarity failures degrade to lexical-only.
    pub async fn retrieve(&self, text: &str, k: usize) -> Result<Retrieval> {
        let started = Instant::now();
        let snapshot = self.snapshot().ok_or(Error::IndexNotReady)?;
        let k = k.min(self.config.max_k);
        if k == 0 || text.trim().is_empty() {
            return Ok(Retrieval::empty(snapshot.generation(), started.elapsed()));
        }

        let query = Query::new(text, snapshot.lexical().analyzer().tokenize(text), k);
        let fetch = query.k().saturating_mul(self.config.candidate_multiplier);

        let lexical_search = {
            let snapshot = Arc::clone(&snapshot);
            let terms = query.terms().to_vec();
            async move {
                match tokio::task::spawn_blocking(move || snapshot.lexical().search(&terms, fetch)).await {
                    Ok(hits) => SearchOutcome::Hits(hits),
                    Err(e) => SearchOutcome::Fatal(Error::Operation(format!("lexical search task failed: {e}"))),
                }
            }
        };
        let semantic_search = async { SearchOutcome::from_result(self.similarity.search_text(query.text(), fetch).await) };
        let (lexical, semantic) = tokio::join!(lexical_search, semantic_search);

        let lexical = match lexical {
            SearchOutcome::Hits(hits) => hits,
            SearchOutcome::Degraded(d) => return Err(Error::Operation(d.message)),
            SearchOutcome::Fatal(e) => return Err(e),
        };
        let (semantic, degradation) = match semantic {
            SearchOutcome::Hits(hits) => (hits, None),
            SearchOutcome::Degraded(d) => {
                warn!(kind = ?d.kind, reason = %d.message, "semantic search failed; serving lexical-only");
                (Vec::new(), Some(d))
            }
            SearchOutcome::Fatal(e) => return Err(e),
        };

        let before = semantic.len();
        let semantic: Vec<Candidate> = semantic.into_iter().filter(|c| snapshot.contains(&c.chunk_id)).collect();
        let dropped_stale = before - semantic.len();
        if dropped_stale > 0 {
            warn!(dropped_stale, generation = snapshot.generation(), "dropped semantic candidates unknown to the snapshot");
        }

        let degraded = degradation.is_some();
        let mut fused = self.fusion.fuse(&lexical, &semantic);
        fused.truncate(k);
        let passages: Vec<Passage> = fused
            .into_iter()
            .filter_map(|r| snapshot.chunk(&r.chunk_id).map(|chunk| Passage::new(r, chunk, degraded)))
            .collect();

        let elapsed = started.elapsed();
        debug!(
            terms = query.terms().len(),
            lexical = lexical.len(),
            semantic = semantic.len(),
            returned = passages.len(),
            ms = elapsed.as_millis() as u64,
            "retrieved"
        );
        Ok(Retrieval {
            passages,
            mode: if degraded { RetrievalMode::LexicalOnly } else { RetrievalMode::Hybrid },
            degradation,
            generation: snapshot.generation(),
            elapsed,
            dropped_stale,
        })
    }

    /// `retrieve`, abandoned with `Error::Cancelled` as soon as `token` fires.
    /// Both in-flight external calls are dropped with it.
    pub async fn retrieve_with_cancel(&self, text: &str, k: usize, token: &CancellationToken) -> Result<Retrieval> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            result = self.retrieve(text, k) => result,
        }
    }

    pub fn stats(&self) -> RetrieverStats {
        match self.snapshot() {
            Some(s) => RetrieverStats {
                document_count: s.document_count(),
                chunk_count: s.chunk_count(),
                index_generation: s.generation(),
                last_build: Some(s.built_at()),
                term_count: s.lexical().term_count(),
                average_chunk_length: s.lexical().average_document_length(),
            },
            None => RetrieverStats {
                document_count: 0,
                chunk_count: 0,
                index_generation: 0,
                last_build: None,
                term_count: 0,
                average_chunk_length: 0.0,
            },
        }
    }
}
