//! # repo-review
//!
//! RAG-enhanced multi-agent code review: index a repository into
//! boundary-aware chunks, retrieve the chunks most relevant to the code
//! under review, fan the review out across nine independent specialist
//! categories running concurrently, and merge their findings into one
//! prioritized report.
//!
//! ## Pipeline
//!
//! ```text
//!  build time                       review time
//!
//!  repo files                       target (files / diff hunks)
//!      │                                │
//!      ▼                                ▼
//!  ┌────────┐                      ┌───────────┐
//!  │ Filter │ ignore rules         │ Retriever │ kNN + rerank
//!  └───┬────┘                      │ +Reranker │ (similarity, directory,
//!      ▼                           └─────┬─────┘  symbol overlap)
//!  ┌─────────┐                           │ context snippets
//!  │ Chunker │ AST → heuristic           ▼
//!  └───┬─────┘  → line window      ┌──────────────┐
//!      ▼                           │ Orchestrator │ tasks × 9 categories
//!  ┌─────────────┐                 └──────┬───────┘  bounded pool, shared
//!  │ Index Store │ single-flight          │          deadline, retries
//!  └─────────────┘ embeddings, GC         ▼
//!                                  ┌────────────┐
//!                                  │ Aggregator │ dedupe + severity sort
//!                                  └────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Run configuration: provider settings, rerank weights, pool bounds
//! - [`models`] - Shared data types: chunks, index records, findings, the report
//! - [`filter`] - Glob/extension ignore rules deciding what participates
//! - [`repo`] - Repository walking, language detection, content hashing
//! - [`chunking`] - Boundary-aware chunking: tree-sitter, regex heuristics, line windows
//! - [`index`] - The vector index: incremental upserts, single-flight embedding, GC
//! - [`retrieve`] - Context retrieval and multi-signal reranking under a size budget
//! - [`diff`] - Minimal unified-diff parsing for incremental review
//! - [`review`] - Concurrent specialist orchestration and finding aggregation
//! - [`llm`] - Ollama / OpenAI-compatible embedding and inference clients
//! - [`state`] - The run-scoped context threaded through one `index` or `review` call
//!
//! Nothing past startup is fatal: malformed configuration aborts a run
//! before indexing, and every later failure degrades. Chunking falls
//! back, unembeddable chunks are counted and skipped, empty retrieval
//! means reviewing without context, and failed worker invocations become
//! explicit coverage gaps in the report.

pub mod chunking;
pub mod config;
pub mod diff;
pub mod filter;
pub mod index;
pub mod llm;
pub mod models;
pub mod repo;
pub mod retrieve;
pub mod review;
pub mod state;

pub use config::{Config, LlmConfig, RerankWeights};
pub use filter::{IgnoreFilter, IgnoreKind, IgnoreRule};
pub use index::{index, index_with};
pub use models::{
    CodeChunk, ContextSnippet, FailedPair, IndexRecord, IndexStats, ReviewFinding, ReviewReport,
    ReviewTask, Severity, TargetUnit,
};
pub use retrieve::{retrieve_context, retrieve_context_with};
pub use review::categories::{by_name as category_by_name, CategorySpec, CATEGORIES};
pub use review::{review, review_with, ReviewTarget};
pub use state::RunContext;
