//! Review orchestration: partition the target into tasks, attach retrieved
//! context, fan each task out across the specialist categories on a
//! bounded worker pool, and aggregate whatever comes back.
//!
//! A run moves through Planning → Dispatching → Collecting → Aggregating →
//! Done. Nothing past planning is fatal: an invocation that exhausts its
//! retries or runs into the shared deadline becomes a failed (task,
//! category) pair in the report, and partial results are always
//! aggregated.

pub mod aggregate;
pub mod categories;
pub mod worker;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::diff;
use crate::filter::{IgnoreFilter, IgnoreRule};
use crate::models::{FailedPair, ReviewFinding, ReviewReport, ReviewTask, TargetUnit};
use crate::repo::scan_repo_files;
use crate::retrieve::retrieve_context_with;
use crate::state::RunContext;
use categories::CategorySpec;

/// What one review run covers.
pub enum ReviewTarget {
    /// Every file in the run's repository surviving the ignore rules.
    Repository { ignore: Vec<IgnoreRule> },
    /// Specific repo-relative files.
    Files(Vec<String>),
    /// A unified diff, reviewed hunk by hunk (incremental mode).
    Diff(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Planning,
    Dispatching,
    Collecting,
    Aggregating,
    Done,
}

fn enter(ctx: &RunContext, phase: Phase) {
    tracing::info!(run = %ctx.run_id, "Review phase: {phase:?}");
}

/// Review `target` with the configured embedding and inference providers.
pub async fn review(
    ctx: &RunContext,
    target: ReviewTarget,
    categories: &[CategorySpec],
) -> Result<ReviewReport> {
    let embed_client = ctx.http_client.clone();
    let embed_llm = ctx.config.llm.clone();
    let embed = move |text: String| {
        let client = embed_client.clone();
        let llm = embed_llm.clone();
        async move { crate::llm::embeddings::embed_single(&client, &llm, &text).await }
    };

    let infer_client = ctx.http_client.clone();
    let infer_llm = ctx.config.llm.clone();
    let infer = move |task: Arc<ReviewTask>, category: CategorySpec| {
        let client = infer_client.clone();
        let llm = infer_llm.clone();
        async move {
            let system = worker::system_prompt(&category);
            let user = worker::user_prompt(&task);
            let raw = crate::llm::infer::chat_completion(&client, &llm, &system, &user).await?;
            worker::parse_findings(&raw, &category, &task.file_path)
        }
    };

    review_with(ctx, target, categories, embed, infer).await
}

/// The orchestration pipeline with the embedding and inference calls
/// injected. Both are treated as opaque, side-effect-free functions.
pub async fn review_with<E, EFut, I, IFut>(
    ctx: &RunContext,
    target: ReviewTarget,
    categories: &[CategorySpec],
    embed: E,
    infer: I,
) -> Result<ReviewReport>
where
    E: Fn(String) -> EFut,
    EFut: Future<Output = Result<Vec<f32>>>,
    I: Fn(Arc<ReviewTask>, CategorySpec) -> IFut + Clone + Send + Sync + 'static,
    IFut: Future<Output = Result<Vec<ReviewFinding>>> + Send + 'static,
{
    enter(ctx, Phase::Planning);
    let tasks = plan_tasks(ctx, target, &embed).await?;
    tracing::info!(
        "Planned {} review tasks × {} categories",
        tasks.len(),
        categories.len()
    );

    enter(ctx, Phase::Dispatching);
    let deadline = Instant::now() + Duration::from_secs(ctx.config.review_timeout_secs);
    let semaphore = Arc::new(Semaphore::new(ctx.config.worker_pool_size.max(1)));
    let attempts = ctx.config.worker_attempts.max(1);
    let backoff = Duration::from_millis(ctx.config.worker_backoff_ms);

    let mut handles = Vec::with_capacity(tasks.len() * categories.len());
    for task in &tasks {
        for category in categories.iter().copied() {
            let task = task.clone();
            let invoke = infer.clone();
            let semaphore = semaphore.clone();
            let file = task.file_path.clone();

            let handle = tokio::spawn(async move {
                run_invocation(task, category, invoke, semaphore, deadline, attempts, backoff)
                    .await
            });
            handles.push((file, category.name, handle));
        }
    }

    enter(ctx, Phase::Collecting);
    let mut findings = Vec::new();
    let mut failed = Vec::new();
    for (file, category, handle) in handles {
        match handle.await {
            Ok(Ok(list)) => findings.extend(list),
            Ok(Err(reason)) => {
                tracing::error!("{category} review of {file} recorded as failed: {reason}");
                failed.push(FailedPair {
                    file,
                    category: category.to_string(),
                    reason,
                });
            }
            Err(e) => {
                failed.push(FailedPair {
                    file,
                    category: category.to_string(),
                    reason: format!("worker task aborted: {e}"),
                });
            }
        }
    }

    enter(ctx, Phase::Aggregating);
    let report = aggregate::aggregate(findings, failed);

    enter(ctx, Phase::Done);
    tracing::info!(
        run = %ctx.run_id,
        "Review done: {} findings across {} files, {} failed pairs",
        report.findings.len(),
        report.by_file.len(),
        report.failed.len()
    );
    Ok(report)
}

/// One (task, category) invocation: bounded by the pool, retried with
/// exponential backoff, and cut off at the shared deadline. The Err side
/// carries the failed-pair reason.
async fn run_invocation<I, IFut>(
    task: Arc<ReviewTask>,
    category: CategorySpec,
    invoke: I,
    semaphore: Arc<Semaphore>,
    deadline: Instant,
    attempts: usize,
    backoff: Duration,
) -> Result<Vec<ReviewFinding>, String>
where
    I: Fn(Arc<ReviewTask>, CategorySpec) -> IFut,
    IFut: Future<Output = Result<Vec<ReviewFinding>>>,
{
    let _permit = match tokio::time::timeout_at(deadline, semaphore.acquire()).await {
        Ok(Ok(permit)) => permit,
        Ok(Err(_)) => return Err("worker pool closed".to_string()),
        Err(_) => return Err("global review deadline reached while queued".to_string()),
    };

    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match tokio::time::timeout_at(deadline, invoke(task.clone(), category)).await {
            Ok(Ok(findings)) => return Ok(findings),
            Ok(Err(e)) => {
                last_error = format!("{e:#}");
                tracing::warn!(
                    "{} review of {} failed (attempt {attempt}/{attempts}): {last_error}",
                    category.name,
                    task.file_path
                );
            }
            Err(_) => {
                return Err(format!(
                    "global review deadline reached during attempt {attempt}"
                ))
            }
        }

        if attempt < attempts {
            let pause = backoff * 2u32.saturating_pow(attempt as u32 - 1);
            if tokio::time::timeout_at(deadline, tokio::time::sleep(pause))
                .await
                .is_err()
            {
                return Err("global review deadline reached during backoff".to_string());
            }
        }
    }

    Err(format!("failed after {attempts} attempts: {last_error}"))
}

/// Partition the target into tasks and attach retrieved context to each.
/// Retrieval failures degrade to an empty context, never an error.
async fn plan_tasks<E, EFut>(
    ctx: &RunContext,
    target: ReviewTarget,
    embed: &E,
) -> Result<Vec<Arc<ReviewTask>>>
where
    E: Fn(String) -> EFut,
    EFut: Future<Output = Result<Vec<f32>>>,
{
    let mut units: Vec<(TargetUnit, String, String)> = Vec::new();

    match target {
        ReviewTarget::Repository { ignore } => {
            let filter = IgnoreFilter::new(&ignore)?;
            let root = ctx.repo_root.clone();
            let files =
                tokio::task::spawn_blocking(move || scan_repo_files(&root, &filter)).await?;
            for file in files {
                units.push((TargetUnit::WholeFile, file.relative_path, file.content));
            }
        }
        ReviewTarget::Files(paths) => {
            for path in paths {
                match std::fs::read_to_string(ctx.repo_root.join(&path)) {
                    Ok(content) => units.push((TargetUnit::WholeFile, path, content)),
                    Err(e) => {
                        tracing::warn!("Skipping unreadable review target {path}: {e}");
                    }
                }
            }
        }
        ReviewTarget::Diff(text) => {
            for hunk in diff::parse_hunks(&text) {
                units.push((
                    TargetUnit::DiffHunk {
                        start_line: hunk.start_line,
                    },
                    hunk.file_path,
                    hunk.content,
                ));
            }
        }
    }

    let mut tasks = Vec::with_capacity(units.len());
    for (unit, file_path, content) in units {
        if content.trim().is_empty() {
            continue;
        }
        let context = retrieve_context_with(
            ctx,
            &file_path,
            &content,
            ctx.config.retrieve_k,
            ctx.config.context_budget_chars,
            embed,
        )
        .await
        .unwrap_or_default();

        tasks.push(Arc::new(ReviewTask {
            unit,
            file_path,
            content,
            context,
        }));
    }

    Ok(tasks)
}
