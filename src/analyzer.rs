//! Analysis orchestration and the query surface over the latest snapshot.
//!
//! `RepoAnalyzer` runs the crawl and the history index on independent worker
//! threads, joins both, and stores one immutable snapshot per run. Queries
//! always see either the previous complete snapshot or the new one, never a
//! half-built state.

use crate::config::AnalyzerConfig;
use crate::context::{self, ContextBundle};
use crate::crawler::{primary_language, readme_summary, CrawlOutput, RepositoryCrawler};
use crate::diff::DiffEngine;
use crate::embedding::EmbeddingProvider;
use crate::error::{AnalyzerError, ResolveError};
use crate::history::CommitHistoryIndexer;
use crate::ranking::rank_by_similarity;
use crate::resolve::{find_in_history, sanitize_ref, CommitResolver};
use crate::types::{Analysis, CommitRecord, RepoInfo};
use chrono::Utc;
use git2::Repository;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Path patterns that mark a file as a structural signal: source files,
/// dependency manifests, container and CI configuration.
const IMPORTANT_PATTERNS: &[&str] = &[
    r"\.md$",
    r"\.py$",
    r"\.java$",
    r"\.js$",
    r"\.ts$",
    r"\.go$",
    r"\.rs$",
    r"\.c$",
    r"\.cpp$",
    r"\.h$",
    r"(^|/)package\.json$",
    r"(^|/)requirements\.txt$",
    r"(^|/)Cargo\.toml$",
    r"(^|/)Dockerfile$",
    r"(^|/)docker-compose\.yml$",
    r"\.github/workflows/.*\.ya?ml$",
];

/// A file returned from a relevance query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevantFile {
    pub path: String,
    pub content: String,
    pub score: f32,
}

/// One complete analysis run plus the per-file data queries need.
struct Snapshot {
    analysis: Analysis,
    file_contents: std::collections::BTreeMap<String, crate::types::FileContent>,
    file_embeddings: std::collections::BTreeMap<String, Vec<f32>>,
}

/// Coordinates analysis phases and answers queries against the result.
pub struct RepoAnalyzer {
    root: PathBuf,
    provider: Arc<dyn EmbeddingProvider>,
    config: AnalyzerConfig,
    state: Mutex<Option<Arc<Snapshot>>>,
}

impl RepoAnalyzer {
    /// Create an analyzer over a local working tree. Validates the
    /// configuration up front; no analysis runs until [`analyze`] is called.
    ///
    /// [`analyze`]: RepoAnalyzer::analyze
    pub fn open(
        root: impl Into<PathBuf>,
        provider: Arc<dyn EmbeddingProvider>,
        config: AnalyzerConfig,
    ) -> Result<Self, AnalyzerError> {
        config.validate()?;
        Ok(Self {
            root: root.into(),
            provider,
            config,
            state: Mutex::new(None),
        })
    }

    /// Run a full analysis and replace the stored snapshot.
    ///
    /// Repository metadata is gathered first, then the crawl and the history
    /// index run on their own threads. A failed phase degrades to an empty
    /// result; the returned `Analysis` always carries all four fields.
    pub fn analyze(&self) -> Analysis {
        tracing::info!("Starting analysis of {}", self.root.display());
        let mut repo_info = self.repo_info();

        let (crawl_result, history_result) = std::thread::scope(|s| {
            let crawl = s.spawn(|| {
                RepositoryCrawler::new(&self.root, self.provider.as_ref(), &self.config.crawl)
                    .crawl()
            });
            let history = s.spawn(|| self.index_history());
            (crawl.join(), history.join())
        });

        let crawl = match crawl_result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!("Crawl phase failed: {}", e);
                CrawlOutput::default()
            }
            Err(_) => {
                tracing::warn!("Crawl phase panicked");
                CrawlOutput::default()
            }
        };
        let commit_history = match history_result {
            Ok(Ok(history)) => history,
            Ok(Err(e)) => {
                tracing::warn!("History phase failed: {:#}", e);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("History phase panicked");
                Vec::new()
            }
        };

        let CrawlOutput {
            file_structure,
            file_contents,
            file_embeddings,
        } = crawl;

        repo_info.primary_language = primary_language(file_contents.keys().map(String::as_str));
        let important_files = classify_important(file_contents.keys().map(String::as_str));

        let analysis = Analysis {
            repo_info,
            commit_history,
            file_structure,
            important_files,
        };

        let snapshot = Arc::new(Snapshot {
            analysis: analysis.clone(),
            file_contents,
            file_embeddings,
        });
        match self.state.lock() {
            Ok(mut guard) => *guard = Some(snapshot),
            Err(e) => tracing::warn!("Snapshot lock poisoned, result not stored: {}", e),
        }

        tracing::info!(
            "Analysis complete: {} files, {} commits",
            analysis.file_structure.file_count(),
            analysis.commit_history.len()
        );
        analysis
    }

    /// The most recent completed analysis, if any run has finished.
    pub fn latest_analysis(&self) -> Option<Analysis> {
        self.snapshot().map(|s| s.analysis.clone())
    }

    /// Files most similar to `query`, best first. Empty when no analysis has
    /// run or the tree produced no embeddings.
    pub fn relevant_files(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RelevantFile>, AnalyzerError> {
        let Some(snapshot) = self.snapshot() else {
            return Ok(Vec::new());
        };
        if snapshot.file_embeddings.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.provider.embed(query)?;
        let ranked = rank_by_similarity(
            &query_embedding,
            snapshot
                .file_embeddings
                .iter()
                .map(|(path, emb)| (path.as_str(), emb.as_slice())),
            top_k,
        );

        Ok(ranked
            .into_iter()
            .map(|item| {
                let content = snapshot
                    .file_contents
                    .get(&item.key)
                    .map(|c| c.display_text().to_string())
                    .unwrap_or_default();
                RelevantFile {
                    path: item.key,
                    content,
                    score: item.score,
                }
            })
            .collect())
    }

    /// Commits whose messages are most similar to `query`, best first.
    /// Message embeddings are computed on demand, not stored in the snapshot.
    pub fn relevant_commits(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<CommitRecord>, AnalyzerError> {
        let Some(snapshot) = self.snapshot() else {
            return Ok(Vec::new());
        };
        let history = &snapshot.analysis.commit_history;
        if history.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.provider.embed(query)?;
        let messages: Vec<String> = history.iter().map(|c| c.message.clone()).collect();
        let embeddings = self.provider.embed_batch(messages)?;

        let ranked = rank_by_similarity(
            &query_embedding,
            history
                .iter()
                .zip(embeddings.iter())
                .map(|(commit, emb)| (commit.hash.as_str(), emb.as_slice())),
            top_k,
        );

        Ok(ranked
            .into_iter()
            .filter_map(|item| history.iter().find(|c| c.hash == item.key).cloned())
            .collect())
    }

    /// Resolve a possibly short, possibly malformed commit reference.
    /// Hits in the indexed history are served without touching the
    /// repository.
    pub fn resolve_commit(&self, reference: &str) -> Result<CommitRecord, ResolveError> {
        let cleaned = sanitize_ref(reference)?;

        if let Some(snapshot) = self.snapshot() {
            if let Some(record) = find_in_history(&snapshot.analysis.commit_history, &cleaned) {
                return Ok(record.clone());
            }
        }

        let repo = self.open_repo(&cleaned)?;
        CommitResolver::new(&repo, &self.config.resolve).resolve(&cleaned, &[])
    }

    /// Diff text for one file at one commit. Always returns text.
    pub fn file_diff(&self, commit_ref: &str, file_path: &str) -> String {
        match Repository::open(&self.root) {
            Ok(repo) => DiffEngine::new(&repo, self.config.crawl.binary_sniff_bytes)
                .diff_for_file(commit_ref, file_path),
            Err(e) => format!("Could not retrieve diff: {}", e.message()),
        }
    }

    /// Blob content of `file_path` as of `commit_ref`, with the same targeted
    /// fetch fallback the resolver uses for missing objects.
    pub fn file_content_at_commit(
        &self,
        commit_ref: &str,
        file_path: &str,
    ) -> Result<String, ResolveError> {
        let cleaned = sanitize_ref(commit_ref)?;
        let repo = self.open_repo(&cleaned)?;

        let resolver = CommitResolver::new(&repo, &self.config.resolve);
        let oid = resolver.resolve_oid(&cleaned)?;

        let commit = repo
            .find_commit(oid)
            .map_err(|_| ResolveError::NotFound(cleaned.clone()))?;
        let tree = commit.tree().map_err(|e| ResolveError::Transient {
            hash: cleaned.clone(),
            reason: e.message().to_string(),
        })?;

        let blob = tree
            .get_path(Path::new(file_path))
            .ok()
            .and_then(|entry| repo.find_blob(entry.id()).ok())
            .ok_or_else(|| ResolveError::Transient {
                hash: cleaned.clone(),
                reason: format!("file '{}' not present in this commit", file_path),
            })?;

        Ok(String::from_utf8_lossy(blob.content()).to_string())
    }

    /// Assemble a context bundle for `query`: ranked files, important-file
    /// backfill, and ranked commits with per-file diffs attached.
    pub fn build_context(&self, query: &str) -> Result<ContextBundle, AnalyzerError> {
        let snapshot = self.snapshot();
        let repo_info = snapshot
            .as_ref()
            .map(|s| s.analysis.repo_info.clone())
            .unwrap_or_default();

        let ranked = self
            .relevant_files(query, self.config.ranking.file_top_k)?
            .into_iter()
            .map(|f| (f.path, f.content, f.score))
            .collect();
        let commits = self.relevant_commits(query, self.config.ranking.commit_top_k)?;

        let empty_pool = Vec::new();
        let empty_contents = std::collections::BTreeMap::new();
        let (pool, contents) = match snapshot.as_ref() {
            Some(s) => (&s.analysis.important_files, &s.file_contents),
            None => (&empty_pool, &empty_contents),
        };

        let repo = Repository::open(&self.root).ok();
        let sniff_bytes = self.config.crawl.binary_sniff_bytes;
        let mut diff_for = |hash: &str, path: &str| match repo.as_ref() {
            Some(repo) => DiffEngine::new(repo, sniff_bytes).diff_for_file(hash, path),
            None => "Could not retrieve diff: repository unavailable".to_string(),
        };

        Ok(context::assemble(
            repo_info,
            ranked,
            pool,
            contents,
            commits,
            &mut diff_for,
        ))
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.lock().ok().and_then(|guard| guard.clone())
    }

    fn open_repo(&self, cleaned: &str) -> Result<Repository, ResolveError> {
        Repository::open(&self.root).map_err(|e| ResolveError::Transient {
            hash: cleaned.to_string(),
            reason: e.message().to_string(),
        })
    }

    fn index_history(&self) -> anyhow::Result<Vec<CommitRecord>> {
        let repo = Repository::open(&self.root)?;
        CommitHistoryIndexer::new(&repo, self.config.history.max_commits).index()
    }

    /// Repository metadata gathered before the heavy phases. Every field has
    /// a usable default when the directory is not a Git repository.
    fn repo_info(&self) -> RepoInfo {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let description = readme_summary(&self.root);

        let (branches, default_branch) = match Repository::open(&self.root) {
            Ok(repo) => {
                let mut branches = Vec::new();
                if let Ok(iter) = repo.branches(Some(git2::BranchType::Local)) {
                    for entry in iter.flatten() {
                        if let Ok(Some(name)) = entry.0.name() {
                            branches.push(name.to_string());
                        }
                    }
                }
                let default = repo
                    .head()
                    .ok()
                    .and_then(|head| head.shorthand().map(str::to_string))
                    .unwrap_or_else(|| "unknown".to_string());
                (branches, default)
            }
            Err(e) => {
                tracing::warn!(
                    "Could not open repository at {}: {}",
                    self.root.display(),
                    e
                );
                (Vec::new(), "unknown".to_string())
            }
        };

        RepoInfo {
            name,
            description,
            branches,
            default_branch,
            primary_language: None,
            last_analyzed: Utc::now(),
        }
    }
}

/// Paths matching any signal pattern, in crawl order.
fn classify_important<'p>(paths: impl Iterator<Item = &'p str>) -> Vec<String> {
    let patterns: Vec<Regex> = IMPORTANT_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

    paths
        .filter(|path| patterns.iter().any(|re| re.is_match(path)))
        .map(str::to_string)
        .collect()
}
