use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::index::store::{JsonVectorStore, VectorBackend};

/// Run-scoped context threaded through indexing and review. Its lifetime
/// is exactly one `index` or `review` invocation; there is no global
/// client or index-location state.
pub struct RunContext {
    pub config: Config,
    pub repo_root: PathBuf,
    pub run_id: Uuid,
    pub http_client: reqwest::Client,
    pub store: Arc<dyn VectorBackend>,
}

impl RunContext {
    /// Validate the repository root and open its index namespace with the
    /// default JSON backend. An unreadable root is a configuration error
    /// and aborts before any indexing.
    pub fn new(repo_root: impl AsRef<Path>, config: Config) -> Result<Self> {
        let repo_root = validate_root(repo_root.as_ref())?;
        let namespace = namespace_key(&repo_root);
        let store = JsonVectorStore::open_or_create(&config.index_dir(), &namespace)?;
        Self::with_backend(repo_root, config, Arc::new(store))
    }

    /// Same as [`RunContext::new`] with a caller-provided storage backend.
    pub fn with_backend(
        repo_root: impl AsRef<Path>,
        config: Config,
        store: Arc<dyn VectorBackend>,
    ) -> Result<Self> {
        let repo_root = validate_root(repo_root.as_ref())?;

        Ok(Self {
            config,
            repo_root,
            run_id: Uuid::new_v4(),
            http_client: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            store,
        })
    }
}

fn validate_root(root: &Path) -> Result<PathBuf> {
    let canonical = root
        .canonicalize()
        .with_context(|| format!("Repository root {} is not readable", root.display()))?;
    if !canonical.is_dir() {
        anyhow::bail!("Repository root {} is not a directory", canonical.display());
    }
    Ok(canonical)
}

/// Stable namespace key for a repository: truncated SHA-256 of the
/// canonical root path.
fn namespace_key(root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(root.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}
