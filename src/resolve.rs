//! Commit reference resolution with shallow-clone fallback.
//!
//! Resolution order: sanitize the reference, scan the already-indexed
//! history, ask libgit2 to disambiguate, fetch exactly that object from the
//! remote, and finally report a structured `NotFound`. Nothing past this
//! boundary panics or propagates a raw VCS error.

use crate::config::ResolveConfig;
use crate::error::ResolveError;
use crate::history::change_from_delta;
use crate::types::{iso_date, ChangeKind, CommitRecord, CommitStats, FileChange};
use git2::{DiffOptions, Repository, TreeWalkMode, TreeWalkResult};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

/// Strip whitespace and non-hexadecimal characters from a raw reference.
/// Rejects input with nothing left after cleaning.
pub fn sanitize_ref(raw: &str) -> Result<String, ResolveError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if cleaned.is_empty() {
        return Err(ResolveError::InvalidHash(raw.to_string()));
    }
    Ok(cleaned)
}

/// Scan indexed history for an exact hash, hash-prefix, or short-hash match.
/// Works on a plain slice so cached lookups never touch the repository.
pub fn find_in_history<'a>(history: &'a [CommitRecord], cleaned: &str) -> Option<&'a CommitRecord> {
    history.iter().find(|record| record.matches_ref(cleaned))
}

/// Resolves hash strings to full commit records.
pub struct CommitResolver<'r> {
    repo: &'r Repository,
    config: &'r ResolveConfig,
}

impl<'r> CommitResolver<'r> {
    pub fn new(repo: &'r Repository, config: &'r ResolveConfig) -> Self {
        Self { repo, config }
    }

    /// Resolve a possibly short, possibly malformed reference.
    ///
    /// `history` is the already-indexed commit window; hits there return the
    /// cached record without any repository access.
    pub fn resolve(
        &self,
        raw: &str,
        history: &[CommitRecord],
    ) -> Result<CommitRecord, ResolveError> {
        let cleaned = sanitize_ref(raw)?;

        if let Some(record) = find_in_history(history, &cleaned) {
            tracing::debug!("Resolved {} from indexed history", cleaned);
            return Ok(record.clone());
        }

        let oid = self.resolve_oid(&cleaned)?;
        self.record_with_ceiling(oid, &cleaned)
    }

    /// Resolve a cleaned reference to a commit id, fetching from the remote
    /// when the object is missing locally.
    pub fn resolve_oid(&self, cleaned: &str) -> Result<git2::Oid, ResolveError> {
        if let Some(oid) = self.lookup(cleaned) {
            return Ok(oid);
        }

        // Shallow or bounded clones may simply not have the object; try one
        // targeted fetch before giving up.
        tracing::info!("Commit {} not found locally, attempting targeted fetch", cleaned);
        self.fetch_object(cleaned)?;

        self.lookup(cleaned)
            .ok_or_else(|| ResolveError::NotFound(cleaned.to_string()))
    }

    /// Disambiguate a (possibly abbreviated) hash into a commit id.
    fn lookup(&self, cleaned: &str) -> Option<git2::Oid> {
        let object = self.repo.revparse_single(cleaned).ok()?;
        object.peel_to_commit().ok().map(|commit| commit.id())
    }

    /// Fetch exactly one object from the configured remote, bounded by the
    /// configured timeout. Timing out is reported distinctly from not-found
    /// so callers can suggest a more recent commit.
    fn fetch_object(&self, hash: &str) -> Result<(), ResolveError> {
        let repo_path: PathBuf = self.repo.path().to_path_buf();
        let remote_name = self.config.remote.clone();
        let target = hash.to_string();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let outcome = (|| -> Result<(), git2::Error> {
                let repo = Repository::open(&repo_path)?;
                let mut remote = repo.find_remote(&remote_name)?;
                remote.fetch(&[target.as_str()], None, None)
            })();
            let _ = tx.send(outcome.map_err(|e| e.message().to_string()));
        });

        match rx.recv_timeout(Duration::from_secs(self.config.fetch_timeout_secs)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => {
                tracing::warn!("Targeted fetch of {} failed: {}", hash, reason);
                Err(ResolveError::Transient {
                    hash: hash.to_string(),
                    reason,
                })
            }
            Err(_) => Err(ResolveError::FetchTimeout {
                hash: hash.to_string(),
                seconds: self.config.fetch_timeout_secs,
            }),
        }
    }

    /// Build the full record for a resolved commit, enforcing the
    /// file-change ceiling while iterating.
    fn record_with_ceiling(
        &self,
        oid: git2::Oid,
        cleaned: &str,
    ) -> Result<CommitRecord, ResolveError> {
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|_| ResolveError::NotFound(cleaned.to_string()))?;

        let hash = commit.id().to_string();
        let author = commit.author();
        let (changes, truncated) = self.ceilinged_changes(&commit);

        Ok(CommitRecord {
            short_hash: CommitRecord::short_of(&hash),
            hash,
            author: format!(
                "{} <{}>",
                author.name().unwrap_or("Unknown"),
                author.email().unwrap_or("")
            ),
            date: iso_date(commit.time().seconds()),
            message: commit.message().unwrap_or("").trim().to_string(),
            stats: CommitStats {
                files_changed: changes.len(),
                insertions: 0,
                deletions: 0,
                truncated,
            },
            file_changes: changes,
        })
    }

    /// Compute file changes up to the ceiling. One deterministic rule for
    /// every strategy: stop appending the moment the ceiling is reached and
    /// flag the stats as truncated.
    fn ceilinged_changes(&self, commit: &git2::Commit) -> (Vec<FileChange>, bool) {
        let ceiling = self.config.change_ceiling;
        let mut changes: Vec<FileChange> = Vec::new();
        let mut truncated = false;

        let tree = match commit.tree() {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!("Commit {} has no readable tree: {}", commit.id(), e);
                return (changes, false);
            }
        };

        if commit.parent_count() == 0 {
            // Root commit: enumerate blobs directly, cheaper than diffing.
            let walk_result = tree.walk(TreeWalkMode::PreOrder, |root, entry| {
                if entry.kind() == Some(git2::ObjectType::Blob) {
                    if changes.len() >= ceiling {
                        truncated = true;
                        return TreeWalkResult::Abort;
                    }
                    let path = format!("{}{}", root, entry.name().unwrap_or(""));
                    changes.push(FileChange::new(path, ChangeKind::Added));
                }
                TreeWalkResult::Ok
            });
            if let Err(e) = walk_result {
                // Abort surfaces as an error; truncation is already flagged.
                if !truncated {
                    tracing::warn!("Error walking tree of {}: {}", commit.id(), e);
                }
            }
            return (changes, truncated);
        }

        'parents: for parent in commit.parents() {
            let parent_tree = match parent.tree() {
                Ok(tree) => tree,
                Err(e) => {
                    tracing::warn!("Unreadable parent tree of {}: {}", commit.id(), e);
                    continue;
                }
            };

            // Name-status style diff first; fall back to a manual tree
            // comparison when the diff primitive fails.
            let parent_changes = match self.name_status_changes(&parent_tree, &tree) {
                Ok(list) => list,
                Err(e) => {
                    tracing::warn!(
                        "Diff failed for {} against parent {}, using tree comparison: {}",
                        commit.id(),
                        parent.id(),
                        e
                    );
                    compare_trees(&parent_tree, &tree)
                }
            };

            for change in parent_changes {
                if changes.len() >= ceiling {
                    truncated = true;
                    break 'parents;
                }
                changes.push(change);
            }
        }

        (changes, truncated)
    }

    /// Fast path: delta list only, no content patches.
    fn name_status_changes(
        &self,
        parent_tree: &git2::Tree,
        tree: &git2::Tree,
    ) -> Result<Vec<FileChange>, git2::Error> {
        let mut opts = DiffOptions::new();
        opts.skip_binary_check(true);
        let diff = self
            .repo
            .diff_tree_to_tree(Some(parent_tree), Some(tree), Some(&mut opts))?;

        Ok(diff
            .deltas()
            .filter_map(|delta| change_from_delta(&delta))
            .collect())
    }
}

/// Per-file fallback: classify changes by entry presence and blob identity.
fn compare_trees(parent_tree: &git2::Tree, tree: &git2::Tree) -> Vec<FileChange> {
    let mut changes = Vec::new();

    let mut commit_paths = std::collections::BTreeMap::new();
    collect_blobs(tree, &mut commit_paths);
    let mut parent_paths = std::collections::BTreeMap::new();
    collect_blobs(parent_tree, &mut parent_paths);

    for (path, oid) in &commit_paths {
        match parent_paths.get(path) {
            None => changes.push(FileChange::new(path.clone(), ChangeKind::Added)),
            Some(parent_oid) if parent_oid != oid => {
                changes.push(FileChange::new(path.clone(), ChangeKind::Modified))
            }
            Some(_) => {}
        }
    }

    for path in parent_paths.keys() {
        if !commit_paths.contains_key(path) {
            changes.push(FileChange::new(path.clone(), ChangeKind::Deleted));
        }
    }

    changes
}

fn collect_blobs(tree: &git2::Tree, out: &mut std::collections::BTreeMap<String, git2::Oid>) {
    let _ = tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(git2::ObjectType::Blob) {
            let path = format!("{}{}", root, entry.name().unwrap_or(""));
            out.insert(path, entry.id());
        }
        TreeWalkResult::Ok
    });
}
