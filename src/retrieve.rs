//! Context retrieval and reranking: nearest-neighbor chunks reordered
//! under a multi-signal score and trimmed to a size budget with per-file
//! diversity.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;

use anyhow::Result;

use crate::config::RerankWeights;
use crate::models::{ContextSnippet, IndexRecord};
use crate::state::RunContext;

/// Retrieve context for a review target using the configured embedding
/// provider.
pub async fn retrieve_context(
    ctx: &RunContext,
    file_path: &str,
    content: &str,
    k: usize,
    budget_chars: usize,
) -> Result<Vec<ContextSnippet>> {
    let client = ctx.http_client.clone();
    let llm = ctx.config.llm.clone();
    retrieve_context_with(ctx, file_path, content, k, budget_chars, move |text: String| {
        let client = client.clone();
        let llm = llm.clone();
        async move { crate::llm::embeddings::embed_single(&client, &llm, &text).await }
    })
    .await
}

/// Retrieval with the embedding call injected. Returns an empty sequence
/// (never an error) when the index has no eligible records or the query
/// embedding fails.
pub async fn retrieve_context_with<F, Fut>(
    ctx: &RunContext,
    file_path: &str,
    content: &str,
    k: usize,
    budget_chars: usize,
    embed: F,
) -> Result<Vec<ContextSnippet>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<f32>>>,
{
    let query = match embed(content.to_string()).await {
        Ok(vector) => vector,
        Err(e) => {
            tracing::warn!("Query embedding failed for {file_path}: {e:#}; reviewing without context");
            return Ok(Vec::new());
        }
    };

    let hits = ctx.store.query(&query, k);
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    let identifiers = extract_identifiers(content);
    let snippets = rerank(hits, file_path, &identifiers, &ctx.config.rerank);
    Ok(enforce_budget(snippets, budget_chars))
}

/// Identifier-like tokens referenced in the target text.
fn extract_identifiers(text: &str) -> HashSet<String> {
    let mut identifiers = HashSet::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else if !current.is_empty() {
            if !current.chars().next().unwrap().is_numeric() {
                identifiers.insert(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    if !current.is_empty() && !current.chars().next().unwrap().is_numeric() {
        identifiers.insert(current);
    }

    identifiers
}

/// Score each hit as `w_sim * similarity + w_dir * same_dir +
/// w_sym * symbol_overlap` and sort descending. Ties: higher raw
/// similarity, then shorter chunk.
fn rerank(
    hits: Vec<(IndexRecord, f32)>,
    target_path: &str,
    target_identifiers: &HashSet<String>,
    weights: &RerankWeights,
) -> Vec<ContextSnippet> {
    let target_dir = Path::new(target_path).parent();

    let mut snippets: Vec<ContextSnippet> = hits
        .into_iter()
        .map(|(record, distance)| {
            let similarity = 1.0 - distance;

            let same_dir = if Path::new(&record.file_path).parent() == target_dir {
                1.0
            } else {
                0.0
            };

            let symbol_overlap = if record.symbols.is_empty() {
                0.0
            } else {
                let matched = record
                    .symbols
                    .iter()
                    .filter(|s| target_identifiers.contains(s.as_str()))
                    .count();
                matched as f32 / record.symbols.len() as f32
            };

            let score = weights.similarity * similarity
                + weights.same_dir * same_dir
                + weights.symbols * symbol_overlap;

            ContextSnippet {
                file_path: record.file_path,
                start_line: record.start_line,
                end_line: record.end_line,
                symbols: record.symbols,
                content: record.content,
                similarity,
                distance,
                score,
            }
        })
        .collect();

    snippets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.similarity
                    .partial_cmp(&a.similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.content.len().cmp(&b.content.len()))
    });

    snippets
}

/// Trim lowest-scoring snippets to fit the character budget, but admit one
/// snippet per distinct file before any file gets a second.
fn enforce_budget(snippets: Vec<ContextSnippet>, budget_chars: usize) -> Vec<ContextSnippet> {
    let mut admitted = vec![false; snippets.len()];
    let mut used = 0usize;
    let mut seen_files: HashSet<&str> = HashSet::new();

    for (i, snippet) in snippets.iter().enumerate() {
        if seen_files.contains(snippet.file_path.as_str()) {
            continue;
        }
        if used + snippet.content.len() <= budget_chars {
            admitted[i] = true;
            used += snippet.content.len();
            seen_files.insert(&snippet.file_path);
        }
    }

    for (i, snippet) in snippets.iter().enumerate() {
        if !admitted[i] && used + snippet.content.len() <= budget_chars {
            admitted[i] = true;
            used += snippet.content.len();
        }
    }

    snippets
        .into_iter()
        .zip(admitted)
        .filter_map(|(snippet, keep)| keep.then_some(snippet))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn record(path: &str, symbols: &[&str], content: &str, embedding: Vec<f32>) -> IndexRecord {
        IndexRecord {
            file_path: path.to_string(),
            start_line: 1,
            end_line: 5,
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            content: content.to_string(),
            content_hash: crate::models::content_hash(content),
            embedding: Some(embedding),
        }
    }

    fn test_ctx(data: &std::path::Path) -> (RunContext, tempfile::TempDir) {
        let repo = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: data.to_path_buf(),
            ..Default::default()
        };
        let ctx = RunContext::new(repo.path(), config).unwrap();
        (ctx, repo)
    }

    fn fixed_embedder(
        vector: Vec<f32>,
    ) -> impl Fn(String) -> std::pin::Pin<Box<dyn Future<Output = Result<Vec<f32>>> + Send>> {
        move |_text: String| {
            let v = vector.clone();
            Box::pin(async move { Ok(v) })
        }
    }

    #[tokio::test]
    async fn test_empty_index_yields_empty_context() {
        let data = tempfile::tempdir().unwrap();
        let (ctx, _repo) = test_ctx(data.path());
        let out = retrieve_context_with(&ctx, "a.py", "def f(): pass", 5, 4_000, fixed_embedder(vec![1.0, 0.0]))
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_failed_query_embedding_yields_empty_context() {
        let data = tempfile::tempdir().unwrap();
        let (ctx, _repo) = test_ctx(data.path());
        ctx.store.upsert(record("x.py", &[], "body", vec![1.0, 0.0]));

        let out = retrieve_context_with(&ctx, "a.py", "code", 5, 4_000, |_t: String| async {
            anyhow::bail!("embedding service down")
        })
        .await
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_same_directory_boost_reorders_equal_similarity() {
        let weights = RerankWeights::default();
        let hits = vec![
            (record("other/util.py", &[], "aaaa", vec![]), 0.2),
            (record("pkg/helper.py", &[], "bbbb", vec![]), 0.2),
        ];
        let snippets = rerank(hits, "pkg/target.py", &HashSet::new(), &weights);
        assert_eq!(snippets[0].file_path, "pkg/helper.py");
        assert!(snippets[0].score > snippets[1].score);
    }

    #[test]
    fn test_symbol_overlap_boost() {
        let weights = RerankWeights::default();
        let identifiers = extract_identifiers("result = compute_total(orders)");
        let hits = vec![
            (record("a/x.py", &["unrelated_fn"], "aaaa", vec![]), 0.3),
            (record("b/y.py", &["compute_total"], "bbbb", vec![]), 0.3),
        ];
        let snippets = rerank(hits, "c/target.py", &identifiers, &weights);
        assert_eq!(snippets[0].file_path, "b/y.py");
    }

    #[test]
    fn test_tie_breaks_on_similarity_then_length() {
        let weights = RerankWeights {
            similarity: 0.0,
            same_dir: 0.0,
            symbols: 0.0,
        };
        // All scores are 0.0: similarity then length decide
        let hits = vec![
            (record("a.py", &[], "long chunk content", vec![]), 0.4),
            (record("b.py", &[], "short", vec![]), 0.1),
            (record("c.py", &[], "xx", vec![]), 0.4),
        ];
        let snippets = rerank(hits, "t.py", &HashSet::new(), &weights);
        assert_eq!(snippets[0].file_path, "b.py"); // highest similarity
        assert_eq!(snippets[1].file_path, "c.py"); // tie: shorter wins
        assert_eq!(snippets[2].file_path, "a.py");
    }

    #[test]
    fn test_budget_keeps_one_snippet_per_file_first() {
        let weights = RerankWeights::default();
        let hits = vec![
            (record("a.py", &[], "0123456789", vec![]), 0.0),
            (record("a.py", &[], "0123456789", vec![]), 0.1),
            (record("b.py", &[], "0123456789", vec![]), 0.2),
        ];
        let snippets = rerank(hits, "t.py", &HashSet::new(), &weights);
        // Budget fits two snippets; diversity admits a.py and b.py, not
        // a.py twice
        let kept = enforce_budget(snippets, 20);
        assert_eq!(kept.len(), 2);
        let files: Vec<&str> = kept.iter().map(|s| s.file_path.as_str()).collect();
        assert!(files.contains(&"a.py"));
        assert!(files.contains(&"b.py"));
    }

    #[test]
    fn test_budget_admits_second_snippet_when_room_remains() {
        let weights = RerankWeights::default();
        let hits = vec![
            (record("a.py", &[], "0123456789", vec![]), 0.0),
            (record("a.py", &[], "0123456789", vec![]), 0.1),
            (record("b.py", &[], "0123456789", vec![]), 0.2),
        ];
        let snippets = rerank(hits, "t.py", &HashSet::new(), &weights);
        let kept = enforce_budget(snippets, 30);
        assert_eq!(kept.len(), 3);
    }

    #[tokio::test]
    async fn test_end_to_end_retrieval_orders_by_similarity() {
        let data = tempfile::tempdir().unwrap();
        let (ctx, _repo) = test_ctx(data.path());
        ctx.store.upsert(record("db.py", &[], "database pool", vec![0.9, 0.1]));
        ctx.store.upsert(record("http.py", &[], "request handler", vec![0.1, 0.9]));

        let out = retrieve_context_with(
            &ctx,
            "elsewhere/new.py",
            "connect()",
            10,
            10_000,
            fixed_embedder(vec![1.0, 0.0]),
        )
        .await
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].file_path, "db.py");
        assert!(out[0].similarity > out[1].similarity);
        assert!((out[0].distance - (1.0 - out[0].similarity)).abs() < 1e-6);
    }

    #[test]
    fn test_extract_identifiers_skips_numbers() {
        let ids = extract_identifiers("let total_2 = add(x, 42);");
        assert!(ids.contains("total_2"));
        assert!(ids.contains("add"));
        assert!(ids.contains("x"));
        assert!(!ids.contains("42"));
    }
}
