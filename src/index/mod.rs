//! Repository indexing: walk the filtered tree, chunk every file, embed
//! each unique chunk once, persist the records, and garbage-collect what
//! no longer exists.
//!
//! Chunks are embedded concurrently under a bounded semaphore. A per-run
//! hash → cell map gives single-flight per unique chunk content: however
//! many files share a chunk, the embedding service is called at most once
//! for it. An embedding failure degrades that one chunk (stored
//! unembedded, excluded from retrieval, retried next run) and never stops
//! the pass.

pub mod store;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::{OnceCell, Semaphore};

use crate::chunking::{chunk_file, ChunkOptions};
use crate::filter::{IgnoreFilter, IgnoreRule};
use crate::models::{IndexRecord, IndexStats};
use crate::repo::scan_repo_files;
use crate::state::RunContext;

enum Outcome {
    Indexed,
    Skipped,
    Failed,
}

/// Index the run's repository using the configured embedding provider.
pub async fn index(ctx: &RunContext, rules: &[IgnoreRule], reindex: bool) -> Result<IndexStats> {
    let client = ctx.http_client.clone();
    let llm = ctx.config.llm.clone();
    index_with(ctx, rules, reindex, move |text: String| {
        let client = client.clone();
        let llm = llm.clone();
        async move { crate::llm::embeddings::embed_single(&client, &llm, &text).await }
    })
    .await
}

/// The indexing pipeline with the embedding call injected. `embed` is
/// treated as an opaque `text -> vector` function.
pub async fn index_with<F, Fut>(
    ctx: &RunContext,
    rules: &[IgnoreRule],
    reindex: bool,
    embed: F,
) -> Result<IndexStats>
where
    F: Fn(String) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<f32>>> + Send + 'static,
{
    let filter = IgnoreFilter::new(rules)?;

    let root = ctx.repo_root.clone();
    let files =
        tokio::task::spawn_blocking(move || scan_repo_files(&root, &filter)).await?;

    tracing::info!(
        run = %ctx.run_id,
        "Indexing {}: {} files after filtering",
        ctx.repo_root.display(),
        files.len()
    );

    if reindex {
        ctx.store.wipe();
    }

    let opts = ChunkOptions {
        char_budget: ctx.config.chunk_char_budget,
        window_lines: ctx.config.chunk_window_lines,
    };

    let mut stats = IndexStats {
        files_scanned: files.len(),
        ..Default::default()
    };

    // path → current chunk hashes, for garbage collection
    let mut known: HashMap<String, HashSet<String>> = HashMap::new();
    let mut all_chunks = Vec::new();
    for file in &files {
        let chunks = chunk_file(&file.relative_path, &file.content, &file.language, opts);
        known
            .entry(file.relative_path.clone())
            .or_default()
            .extend(chunks.iter().map(|c| c.content_hash.clone()));
        all_chunks.extend(chunks);
    }

    let semaphore = Arc::new(Semaphore::new(ctx.config.embed_concurrency.max(1)));
    let inflight: Arc<Mutex<HashMap<String, Arc<OnceCell<Option<Vec<f32>>>>>>> =
        Arc::new(Mutex::new(HashMap::new()));

    let mut handles = Vec::with_capacity(all_chunks.len());
    for chunk in all_chunks {
        let store = ctx.store.clone();
        let embed = embed.clone();
        let semaphore = semaphore.clone();
        let inflight = inflight.clone();

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire().await {
                Ok(p) => p,
                Err(_) => return Outcome::Failed,
            };

            if !reindex {
                if let Some(existing) = store.get(&chunk.file_path, &chunk.content_hash) {
                    if existing.embedding.is_some() {
                        return Outcome::Skipped;
                    }
                }
            }

            let cell = inflight
                .lock()
                .entry(chunk.content_hash.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone();

            let text = chunk.content.clone();
            let file_path = chunk.file_path.clone();
            let embedding = cell
                .get_or_init(|| async move {
                    match embed(text).await {
                        Ok(vector) => Some(vector),
                        Err(e) => {
                            tracing::warn!(
                                "Embedding failed for a chunk of {file_path}: {e:#}; \
                                 indexing continues degraded"
                            );
                            None
                        }
                    }
                })
                .await
                .clone();

            let embedded = embedding.is_some();
            store.upsert(IndexRecord::from_chunk(&chunk, embedding));

            if embedded {
                Outcome::Indexed
            } else {
                Outcome::Failed
            }
        }));
    }

    for handle in handles {
        match handle.await {
            Ok(Outcome::Indexed) => stats.chunks_indexed += 1,
            Ok(Outcome::Skipped) => stats.chunks_skipped += 1,
            Ok(Outcome::Failed) | Err(_) => stats.chunks_failed += 1,
        }
    }

    let removed = ctx.store.garbage_collect(&known);
    if removed > 0 {
        tracing::info!("Garbage-collected {removed} stale index records");
    }

    ctx.store.persist()?;

    tracing::info!(
        run = %ctx.run_id,
        "Index pass done: {} indexed, {} skipped, {} failed across {} files",
        stats.chunks_indexed,
        stats.chunks_skipped,
        stats.chunks_failed,
        stats.files_scanned
    );

    Ok(stats)
}
