use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use litrag_core::data_processor::{DataProcessor, DocumentChunk};
use litrag_core::traits::EmbeddingProvider;
use litrag_core::types::Chunk;
use litrag_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Attempts per chunk before the whole ingest fails.
    pub attempts: usize,
    pub retry_delay: Duration,
    /// Embedding input is cut to this many characters.
    pub max_embed_chars: usize,
}

impl Default for IngestOptions {
    fn default() -> Self { Self { attempts: 3, retry_delay: Duration::from_secs(2), max_embed_chars: 6_000 } }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

async fn embed_with_retry(provider: &dyn EmbeddingProvider, chunk: &DocumentChunk, opts: &IngestOptions) -> Result<Vec<f32>> {
    let text = truncate_chars(&chunk.content, opts.max_embed_chars);
    let attempts = opts.attempts.max(1);
    let mut attempt = 1;
    loop {
        match provider.embed(text).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts => {
                warn!(chunk = chunk.id.as_str(), attempt, error = %e, "embedding attempt failed");
                tokio::time::sleep(opts.retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(Error::EmbeddingUnavailable(format!("chunk {} failed after {attempts} attempts: {e}", chunk.id)));
            }
        }
    }
}

/// Embed processed document chunks into indexable `Chunk`s, in order.
/// `on_embedded` is called with the number of chunks done so far.
pub async fn embed_document_chunks<F>(
    docs: Vec<DocumentChunk>,
    provider: &dyn EmbeddingProvider,
    opts: &IngestOptions,
    mut on_embedded: F,
) -> Result<Vec<Chunk>>
where
    F: FnMut(usize),
{
    let mut chunks = Vec::with_capacity(docs.len());
    for doc in docs {
        let embedding = embed_with_retry(provider, &doc, opts).await?;
        chunks.push(Chunk {
            id: doc.id,
            doc_id: doc.doc_id,
            title: doc.title,
            authors: doc.authors,
            journal: doc.journal,
            year: doc.year,
            doc_path: doc.doc_path,
            text: doc.content,
            chunk_index: doc.chunk_index,
            embedding,
        });
        on_embedded(chunks.len());
    }
    Ok(chunks)
}

/// Chunk every `.txt` file under `dir` and embed the chunks.
pub async fn ingest_directory(dir: &Path, processor: &DataProcessor, provider: &dyn EmbeddingProvider) -> Result<Vec<Chunk>> {
    let docs = processor.process_directory(dir)?;
    info!(dir = %dir.display(), chunks = docs.len(), "embedding corpus");
    embed_document_chunks(docs, provider, &IngestOptions::default(), |_| {}).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
