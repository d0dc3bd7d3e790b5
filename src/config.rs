use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where index data is stored
    pub data_dir: PathBuf,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Reranker signal weights
    pub rerank: RerankWeights,
    /// Maximum concurrent embedding calls during indexing
    pub embed_concurrency: usize,
    /// Maximum concurrent (task, category) review invocations
    pub worker_pool_size: usize,
    /// Attempts per (task, category) invocation before it is recorded failed
    pub worker_attempts: usize,
    /// Base backoff between attempts, milliseconds (doubles per retry)
    pub worker_backoff_ms: u64,
    /// Global review deadline in seconds; unfinished invocations past it
    /// are abandoned and recorded as failed pairs
    pub review_timeout_secs: u64,
    /// Nearest-neighbor candidates fetched per retrieval call
    pub retrieve_k: usize,
    /// Total character budget for the context attached to one task
    pub context_budget_chars: usize,
    /// Maximum non-whitespace characters per chunk
    pub chunk_char_budget: usize,
    /// Window size (lines) for the last-resort chunking fallback
    pub chunk_window_lines: usize,
}

/// Weights combining the three reranking signals. Similarity is the
/// primary signal; the directory and symbol boosts are equal minority
/// signals. All three are tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankWeights {
    /// Weight on raw cosine similarity.
    pub similarity: f32,
    /// Weight on the same-directory boost (0 or 1 per candidate).
    pub same_dir: f32,
    /// Weight on symbol-name overlap with the target (0.0–1.0).
    pub symbols: f32,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            similarity: 0.6,
            same_dir: 0.2,
            symbols: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for review inference
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            llm: LlmConfig::default(),
            rerank: RerankWeights::default(),
            embed_concurrency: 4,
            worker_pool_size: 4,
            worker_attempts: 3,
            worker_backoff_ms: 500,
            review_timeout_secs: 900,
            retrieve_k: 10,
            context_budget_chars: 6_000,
            chunk_char_budget: 1_500,
            chunk_window_lines: 100,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "qwen2.5-coder:7b-instruct-q8_0".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            embedding_dim: 768,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("REPO_REVIEW_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }
        if let Ok(val) = std::env::var("REPO_REVIEW_EMBED_CONCURRENCY") {
            if let Ok(v) = val.parse() {
                config.embed_concurrency = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_REVIEW_WORKER_POOL_SIZE") {
            if let Ok(v) = val.parse() {
                config.worker_pool_size = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_REVIEW_WORKER_ATTEMPTS") {
            if let Ok(v) = val.parse() {
                config.worker_attempts = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_REVIEW_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.review_timeout_secs = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_REVIEW_RETRIEVE_K") {
            if let Ok(v) = val.parse() {
                config.retrieve_k = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_REVIEW_CONTEXT_BUDGET") {
            if let Ok(v) = val.parse() {
                config.context_budget_chars = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_REVIEW_RERANK_SIMILARITY") {
            if let Ok(v) = val.parse() {
                config.rerank.similarity = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_REVIEW_RERANK_SAME_DIR") {
            if let Ok(v) = val.parse() {
                config.rerank.same_dir = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_REVIEW_RERANK_SYMBOLS") {
            if let Ok(v) = val.parse() {
                config.rerank.symbols = v;
            }
        }

        config
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = Config::default();
        assert!(config.worker_pool_size > 0);
        assert!(config.worker_attempts > 0);
        assert!(config.chunk_char_budget > 0);
        let w = &config.rerank;
        assert!((w.similarity + w.same_dir + w.symbols - 1.0).abs() < 1e-6);
    }
}
