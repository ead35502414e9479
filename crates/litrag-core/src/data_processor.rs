use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::metadata::{extract_metadata, DocumentMetadata};

/// A piece of a source document before it has been embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    pub doc_id: String,
    pub doc_path: String,
    pub title: String,
    pub authors: Option<String>,
    pub journal: Option<String>,
    pub year: Option<u16>,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Preferred chunk size in characters (~300 tokens at 4 chars/token).
    pub target_chars: usize,
    /// Trailing sentences carried into the next chunk, in characters.
    pub overlap_chars: usize,
    /// Hard limit for a single sentence or a final chunk.
    pub max_chunk_chars: usize,
    /// A trailing chunk shorter than this is discarded.
    pub min_final_chars: usize,
    /// Sentence fragments this short are discarded.
    pub min_sentence_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { target_chars: 1200, overlap_chars: 120, max_chunk_chars: 6000, min_final_chars: 50, min_sentence_chars: 10 }
    }
}

const ABBREVIATIONS: &[&str] = &["Dr", "Mr", "Mrs", "Ms", "Prof", "al", "vs", "Fig", "fig", "i.e", "e.g"];

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentChunk>> {
        self.process_files(data_dir, self.list_txt_files(data_dir))
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<DocumentChunk>> {
        let mut files = self.list_txt_files(data_dir);
        if files.len() > limit { files.truncate(limit); tracing::info!(limit, "limited to first files"); }
        self.process_files(data_dir, files)
    }

    fn process_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<DocumentChunk>> {
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::debug!(file = %file_path.display(), "processing file {}/{}", file_index + 1, files.len());
            let content = self.read_file_content(file_path)?;
            let doc_id = self.extract_doc_id(file_path);
            let metadata = extract_metadata(file_path, &content);
            all_chunks.extend(self.chunk_document(&content, &doc_id, &file_path.to_string_lossy(), &metadata));
        }
        tracing::info!(files = files.len(), chunks = all_chunks.len(), "processed documents");
        Ok(all_chunks)
    }

    /// Split one document into overlapping sentence-aligned chunks.
    pub fn chunk_document(&self, content: &str, doc_id: &str, doc_path: &str, metadata: &DocumentMetadata) -> Vec<DocumentChunk> {
        let texts = self.chunk_text(content);
        let total_chunks = texts.len();
        texts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| DocumentChunk {
                id: format!("{}:{}", doc_id, chunk_index),
                doc_id: doc_id.to_string(),
                doc_path: doc_path.to_string(),
                title: metadata.title.clone(),
                authors: metadata.authors.clone(),
                journal: metadata.journal.clone(),
                year: metadata.year,
                content,
                chunk_index,
                total_chunks,
            })
            .collect()
    }

    pub fn chunk_text(&self, content: &str) -> Vec<String> {
        let cfg = &self.chunking_config;
        let sentences = split_into_sentences(content, cfg.min_sentence_chars);
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0usize;
        for sentence in sentences {
            let mut sentence_len = sentence.chars().count();
            if current_len + sentence_len > cfg.target_chars && !current.is_empty() {
                chunks.push(current.join(" "));
                let overlap = overlap_tail(&current, cfg.overlap_chars);
                current_len = overlap.chars().count();
                current = if overlap.is_empty() { vec![] } else { vec![overlap] };
            }
            let sentence = if sentence_len > cfg.max_chunk_chars {
                sentence_len = cfg.max_chunk_chars;
                truncate_chars(&sentence, cfg.max_chunk_chars)
            } else {
                sentence
            };
            current.push(sentence);
            current_len += sentence_len;
        }
        if !current.is_empty() {
            let last = truncate_chars(&current.join(" "), cfg.max_chunk_chars);
            if last.trim().chars().count() > cfg.min_final_chars { chunks.push(last); }
        }
        chunks
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn extract_doc_id(&self, file_path: &Path) -> String {
        file_path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| file_path.to_string_lossy().to_string())
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path(); if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
        }
        txt_files.sort(); txt_files
    }
}

fn split_into_sentences(text: &str, min_chars: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        current.push(ch);
        let at_boundary = matches!(ch, '.' | '!' | '?') && chars.peek().is_some_and(|c| c.is_whitespace());
        if !at_boundary || (ch == '.' && ends_with_abbreviation(&current)) { continue; }
        while chars.peek().is_some_and(|c| c.is_whitespace()) { chars.next(); }
        push_sentence(&mut sentences, &current, min_chars);
        current.clear();
    }
    push_sentence(&mut sentences, &current, min_chars);
    sentences
}

fn push_sentence(out: &mut Vec<String>, raw: &str, min_chars: usize) {
    let s = raw.trim();
    if s.chars().count() > min_chars { out.push(s.to_string()); }
}

fn ends_with_abbreviation(sentence_with_dot: &str) -> bool {
    let body = &sentence_with_dot[..sentence_with_dot.len() - 1];
    let word = body.rsplit(|c: char| c.is_whitespace() || c == '(').next().unwrap_or("");
    ABBREVIATIONS.contains(&word)
}

/// Whole trailing sentences whose combined length first reaches `target_chars`.
fn overlap_tail(parts: &[String], target_chars: usize) -> String {
    let mut taken = Vec::new();
    let mut total = 0usize;
    for part in parts.iter().rev() {
        taken.push(part.as_str());
        total += part.chars().count();
        if total >= target_chars { break; }
    }
    taken.reverse();
    taken.join(" ")
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
