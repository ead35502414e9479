//! File-backed `ChunkSource`: one serialized `Chunk` per line.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::traits::ChunkSource;
use crate::types::Chunk;

pub struct JsonlChunkSource {
    path: PathBuf,
}

impl JsonlChunkSource {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    /// Write `chunks` to `path`, replacing any previous file.
    pub fn write(path: &Path, chunks: &[Chunk]) -> Result<()> {
        let mut out = std::io::BufWriter::new(fs::File::create(path)?);
        for chunk in chunks {
            serde_json::to_writer(&mut out, chunk)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl ChunkSource for JsonlChunkSource {
    fn list_chunks(&self) -> Result<Vec<Chunk>> {
        let file = fs::File::open(&self.path)
            .map_err(|e| Error::NotFound(format!("{}: {}", self.path.display(), e)))?;
        let mut chunks = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            let chunk: Chunk = serde_json::from_str(&line)
                .map_err(|e| Error::malformed(format!("{}:{}", self.path.display(), line_no + 1), e.to_string()))?;
            chunks.push(chunk);
        }
        Ok(chunks)
    }
}
