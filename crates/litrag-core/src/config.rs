//! Configuration loader, retrieval tuning knobs and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_RETRIEVAL__DEFAULT_K=8`). Provides helpers to expand `~` and `${VAR}`
//! and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::default("retrieval", RetrievalConfig::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn get_or<T>(&self, key: &str, fallback: T) -> T
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment.extract_inner(key).unwrap_or(fallback)
    }

    /// `use_fake_embeddings` from any layer. The env layer parses
    /// `APP_USE_FAKE_EMBEDDINGS=1` as a number, so `1` counts as set.
    pub fn use_fake_embeddings(&self) -> bool {
        match self.figment.extract_inner::<Flag>("use_fake_embeddings") {
            Ok(Flag::Bool(b)) => b,
            Ok(Flag::Int(n)) => n == 1,
            Ok(Flag::Text(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
            Err(_) => false,
        }
    }

    /// The validated `retrieval` section.
    pub fn retrieval(&self) -> Result<RetrievalConfig> {
        let cfg: RetrievalConfig = self
            .figment
            .extract_inner("retrieval")
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        self.retrieval()?;
        match env {
            "prod" | "production" => {
                if self.use_fake_embeddings() {
                    anyhow::bail!("Hash embeddings are not allowed in production");
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.2, b: 0.75 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    MinMax,
    ZScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    pub normalization: Normalization,
}

impl Default for FusionConfig {
    fn default() -> Self { Self { lexical_weight: 0.3, semantic_weight: 0.7, normalization: Normalization::MinMax } }
}

pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to",
    "for", "of", "with", "by", "from", "is", "are", "was", "were",
    "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "must",
    "this", "that", "these", "those", "it", "its",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Tokens shorter than this many characters are dropped.
    pub min_token_len: usize,
    pub stop_words: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { min_token_len: 3, stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub max_k: usize,
    /// Each source is asked for `k * candidate_multiplier` candidates.
    pub candidate_multiplier: usize,
    pub embed_timeout_ms: u64,
    pub backend_timeout_ms: u64,
    pub bm25: Bm25Params,
    pub fusion: FusionConfig,
    pub analyzer: AnalyzerConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            max_k: 100,
            candidate_multiplier: 2,
            embed_timeout_ms: 3_000,
            backend_timeout_ms: 3_000,
            bm25: Bm25Params::default(),
            fusion: FusionConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn embed_timeout(&self) -> Duration { Duration::from_millis(self.embed_timeout_ms) }
    pub fn backend_timeout(&self) -> Duration { Duration::from_millis(self.backend_timeout_ms) }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };
        if self.default_k == 0 { return invalid("retrieval.default_k must be positive".into()); }
        if self.default_k > self.max_k {
            return invalid(format!("retrieval.default_k ({}) exceeds retrieval.max_k ({})", self.default_k, self.max_k));
        }
        if self.candidate_multiplier == 0 { return invalid("retrieval.candidate_multiplier must be positive".into()); }
        if self.embed_timeout_ms == 0 || self.backend_timeout_ms == 0 {
            return invalid("retrieval timeouts must be positive".into());
        }
        let Bm25Params { k1, b } = self.bm25;
        if !k1.is_finite() || k1 < 0.0 { return invalid(format!("bm25.k1 must be >= 0, got {k1}")); }
        if !(0.0..=1.0).contains(&b) { return invalid(format!("bm25.b must be within [0, 1], got {b}")); }
        let FusionConfig { lexical_weight, semantic_weight, .. } = self.fusion;
        for (name, w) in [("lexical_weight", lexical_weight), ("semantic_weight", semantic_weight)] {
            if !w.is_finite() || w < 0.0 { return invalid(format!("fusion.{name} must be a non-negative number, got {w}")); }
        }
        let sum = lexical_weight + semantic_weight;
        if sum <= 0.0 { return invalid("fusion weights must not both be zero".into()); }
        if (sum - 1.0).abs() > 1e-4 {
            tracing::warn!(lexical_weight, semantic_weight, "fusion weights do not sum to 1; fused scores may leave [0, 1]");
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RetrievalConfig::default();
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.fusion.lexical_weight, 0.3);
        assert_eq!(cfg.fusion.semantic_weight, 0.7);
        assert_eq!(cfg.bm25, Bm25Params { k1: 1.2, b: 0.75 });
        assert_eq!(cfg.default_k, 5);
    }

    #[test]
    fn rejects_negative_weight() {
        let mut cfg = RetrievalConfig::default();
        cfg.fusion.lexical_weight = -0.1;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_b_out_of_range() {
        let mut cfg = RetrievalConfig::default();
        cfg.bm25.b = 1.5;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_default_k_above_max() {
        let cfg = RetrievalConfig { default_k: 10, max_k: 5, ..RetrievalConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let base = Path::new("/srv/litrag");
        assert_eq!(resolve_with_base(base, "data/txt"), PathBuf::from("/srv/litrag/data/txt"));
        assert_eq!(resolve_with_base(base, "/abs/dir"), PathBuf::from("/abs/dir"));
    }
}
