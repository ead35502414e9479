use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use litrag_core::config::{expand_path, Config};
use litrag_core::data_processor::DataProcessor;
use litrag_core::source::JsonlChunkSource;
use litrag_core::traits::{ChunkSource, EmbeddingProvider, SimilarityBackend};
use litrag_core::types::Chunk;
use litrag_hybrid::{embed_document_chunks, HybridRetriever, IngestOptions, Retrieval, RetrieverStats};
use litrag_vector::{LanceBackend, LocalProvider, MemoryBackend, SimilarityIndex};

const USAGE: &str = "Usage: litrag <search|repl|stats|ingest> [query..] [-k N] [--data DIR] [--limit FILES] [--chunks FILE] [--out FILE] [--json]";

#[derive(Debug, Default)]
struct Options {
    cmd: String,
    words: Vec<String>,
    k: Option<usize>,
    limit: Option<usize>,
    data: Option<PathBuf>,
    chunks: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
    help: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Options> {
    let mut args = args.into_iter();
    let mut opts = Options::default();
    match args.next() {
        Some(flag) if flag == "-h" || flag == "--help" => opts.help = true,
        Some(cmd) => opts.cmd = cmd,
        None => {}
    }
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-k" => {
                let value = args.next().context("-k needs a value")?;
                opts.k = Some(value.parse().with_context(|| format!("invalid -k '{value}'"))?);
            }
            "--limit" => {
                let value = args.next().context("--limit needs a number of files")?;
                opts.limit = Some(value.parse().with_context(|| format!("invalid --limit '{value}'"))?);
            }
            "--data" => opts.data = Some(PathBuf::from(args.next().context("--data needs a directory")?)),
            "--chunks" => opts.chunks = Some(PathBuf::from(args.next().context("--chunks needs a file")?)),
            "--out" => opts.out = Some(PathBuf::from(args.next().context("--out needs a file")?)),
            "--json" => opts.json = true,
            "-h" | "--help" => opts.help = true,
            _ => opts.words.push(arg),
        }
    }
    Ok(opts)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn data_dir(config: &Config, opts: &Options) -> PathBuf {
    opts.data.clone().unwrap_or_else(|| {
        let dir: String = config.get_or("data.raw_txt_dir", "../dev_data/txt".to_string());
        expand_path(dir)
    })
}

fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let dim: usize = config.get_or("embedding.dim", 768);
    let model_dir = config.get::<String>("embedding.model_dir").ok().map(expand_path);
    let provider = LocalProvider::from_env(dim, model_dir.as_deref())?;
    info!(embedder = provider.embedder_id(), "embedding provider ready");
    Ok(Arc::new(provider))
}

async fn open_backend(config: &Config) -> anyhow::Result<Arc<dyn SimilarityBackend>> {
    let kind: String = config.get_or("vector.backend", "memory".to_string());
    match kind.as_str() {
        "memory" => Ok(Arc::new(MemoryBackend::new())),
        "lancedb" => {
            let dir = expand_path(config.get_or("vector.lancedb_dir", "../dev_data/indexes/lancedb".to_string()));
            let table: String = config.get_or("vector.table", "chunks".to_string());
            std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
            Ok(Arc::new(LanceBackend::open(&dir.to_string_lossy(), &table).await?))
        }
        other => bail!("unknown vector.backend '{other}' (expected memory or lancedb)"),
    }
}

/// Chunks from `--chunks`, or the data directory chunked and embedded.
async fn load_chunks(config: &Config, opts: &Options, provider: &dyn EmbeddingProvider) -> anyhow::Result<Vec<Chunk>> {
    if let Some(path) = &opts.chunks {
        return Ok(JsonlChunkSource::new(path).list_chunks()?);
    }
    let dir = data_dir(config, opts);
    let processor = DataProcessor::new();
    let docs = match opts.limit {
        Some(limit) => processor.process_directory_limited(&dir, limit)?,
        None => processor.process_directory(&dir)?,
    };
    println!("Embedding {} chunks from {}", docs.len(), dir.display());

    let bar = ProgressBar::new(docs.len() as u64);
    bar.set_style(ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?.progress_chars("#>-"));
    let chunks = embed_document_chunks(docs, provider, &IngestOptions::default(), |done| bar.set_position(done as u64)).await?;
    bar.finish_and_clear();
    Ok(chunks)
}

fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max) {
        Some((byte, _)) => format!("{}…", &flat[..byte]),
        None => flat,
    }
}

fn print_retrieval(retrieval: &Retrieval, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(retrieval)?);
        return Ok(());
    }
    if let Some(d) = &retrieval.degradation {
        println!("⚠️  lexical-only results: {}", d.message);
    }
    if retrieval.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for p in &retrieval.passages {
        let lexical = p.result.lexical.map_or("-".to_string(), |s| format!("{:.3}", s.normalized));
        let semantic = p.result.semantic.map_or("-".to_string(), |s| format!("{:.3}", s.normalized));
        let year = p.year.map_or_else(|| "n.d.".to_string(), |y| y.to_string());
        println!("{:>2}. [{:.4}] {}, {year} ({}#{})", p.rank(), p.score(), p.title, p.doc_path, p.chunk_index);
        if let Some(authors) = &p.authors {
            println!("    {authors}{}", p.journal.as_deref().map(|j| format!(" | {j}")).unwrap_or_default());
        }
        println!("    bm25 {lexical} | vector {semantic}");
        println!("    {}", preview(&p.text, 200));
    }
    println!("{} results, {:?} mode, generation {}, {} ms", retrieval.len(), retrieval.mode, retrieval.generation, retrieval.elapsed.as_millis());
    Ok(())
}

fn print_stats(stats: &RetrieverStats, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }
    println!("documents:        {}", stats.document_count);
    println!("chunks:           {}", stats.chunk_count);
    println!("terms:            {}", stats.term_count);
    println!("avg chunk length: {:.1}", stats.average_chunk_length);
    println!("generation:       {}", stats.index_generation);
    match stats.last_build {
        Some(at) => println!("last build:       {}", at.to_rfc3339()),
        None => println!("last build:       never"),
    }
    Ok(())
}

async fn build_retriever(config: &Config, opts: &Options) -> anyhow::Result<(HybridRetriever, Arc<dyn EmbeddingProvider>)> {
    let retrieval = config.retrieval()?;
    let provider = build_provider(config)?;
    let backend = open_backend(config).await?;
    let similarity = SimilarityIndex::new(Arc::clone(&provider), backend, &retrieval);
    let retriever = HybridRetriever::new(retrieval, similarity)?;

    let chunks = load_chunks(config, opts, provider.as_ref()).await?;
    let generation = retriever.build_indexes(&chunks).await?;
    println!("Indexed {} chunks (generation {generation})", chunks.len());
    Ok((retriever, provider))
}

async fn search(retriever: &HybridRetriever, opts: &Options) -> anyhow::Result<()> {
    let query = opts.words.join(" ");
    if query.trim().is_empty() {
        eprintln!("Usage: litrag search \"<query>\" [-k N]");
        std::process::exit(1);
    }
    let k = opts.k.unwrap_or(retriever.config().default_k);

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    let retrieval = retriever.retrieve_with_cancel(&query, k, &token).await?;
    print_retrieval(&retrieval, opts.json)
}

async fn repl(config: &Config, opts: &Options, retriever: &HybridRetriever, provider: &dyn EmbeddingProvider) -> anyhow::Result<()> {
    let k = opts.k.unwrap_or(retriever.config().default_k);
    println!("Type a query, `stats`, `reindex`, or `quit`.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else { break };
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "stats" => print_stats(&retriever.stats(), opts.json)?,
            "reindex" => {
                let chunks = load_chunks(config, opts, provider).await?;
                match retriever.build_indexes(&chunks).await {
                    Ok(generation) => println!("Indexed {} chunks (generation {generation})", chunks.len()),
                    Err(e) => eprintln!("Rebuild failed, keeping the current index: {e}"),
                }
            }
            query => match retriever.retrieve(query, k).await {
                Ok(retrieval) => print_retrieval(&retrieval, opts.json)?,
                Err(e) => eprintln!("Query failed: {e}"),
            },
        }
    }
    Ok(())
}

async fn ingest(config: &Config, opts: &Options) -> anyhow::Result<()> {
    let Some(out) = &opts.out else {
        eprintln!("Usage: litrag ingest --out chunks.jsonl [--data DIR]");
        std::process::exit(1);
    };
    let provider = build_provider(config)?;
    let chunks = load_chunks(config, opts, provider.as_ref()).await?;
    JsonlChunkSource::write(out, &chunks)?;
    println!("✅ Wrote {} chunks to {}", chunks.len(), out.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let opts = parse_args(env::args().skip(1))?;
    if opts.help {
        println!("{USAGE}");
        return Ok(());
    }
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;

    match opts.cmd.as_str() {
        "search" => {
            let (retriever, _) = build_retriever(&config, &opts).await?;
            search(&retriever, &opts).await?;
        }
        "repl" => {
            let (retriever, provider) = build_retriever(&config, &opts).await?;
            repl(&config, &opts, &retriever, provider.as_ref()).await?;
        }
        "stats" => {
            let (retriever, _) = build_retriever(&config, &opts).await?;
            print_stats(&retriever.stats(), opts.json)?;
        }
        "ingest" => ingest(&config, &opts).await?,
        "" => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
        other => {
            eprintln!("Unknown command: {other}\n{USAGE}");
            std::process::exit(1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Options {
        parse_args(args.iter().map(|a| a.to_string())).unwrap()
    }

    #[test]
    fn help_is_recognized_without_a_command() {
        assert!(parse(&["--help"]).help);
        assert!(parse(&["search", "-h"]).help);
        assert!(!parse(&["stats"]).help);
    }

    #[test]
    fn options_and_query_words() {
        let opts = parse(&["search", "lactate", "-k", "3", "--limit", "2", "clearance", "--json"]);
        assert_eq!(opts.cmd, "search");
        assert_eq!(opts.words, vec!["lactate", "clearance"]);
        assert_eq!((opts.k, opts.limit, opts.json), (Some(3), Some(2), true));
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(parse_args(["search", "-k", "many"].map(String::from)).is_err());
        assert!(parse_args(["search", "--limit"].map(String::from)).is_err());
    }
}
