//! Bounded commit-history indexing.

use crate::types::{iso_date, ChangeKind, CommitRecord, CommitStats, FileChange};
use anyhow::{Context, Result};
use git2::{Delta, DiffOptions, Repository, Sort, TreeWalkMode, TreeWalkResult};

/// Extracts the most recent commits with best-effort file-change lists.
pub struct CommitHistoryIndexer<'r> {
    repo: &'r Repository,
    max_commits: usize,
}

impl<'r> CommitHistoryIndexer<'r> {
    pub fn new(repo: &'r Repository, max_commits: usize) -> Self {
        Self { repo, max_commits }
    }

    /// Return up to `max_commits` commits, newest first.
    ///
    /// Merge commits are diffed against every parent and the results
    /// concatenated, so a path can appear once per parent; callers needing
    /// single-parent semantics should de-duplicate by path. Per-diff
    /// failures drop only the affected entries - the commit record is still
    /// produced.
    pub fn index(&self) -> Result<Vec<CommitRecord>> {
        let mut revwalk = self.repo.revwalk().context("Failed to start revwalk")?;
        revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;
        revwalk.push_head().context("Repository has no HEAD")?;

        let mut commits = Vec::new();
        for oid in revwalk {
            if commits.len() >= self.max_commits {
                break;
            }

            let oid = match oid {
                Ok(oid) => oid,
                Err(e) => {
                    tracing::warn!("Skipping unreadable revwalk entry: {}", e);
                    continue;
                }
            };

            match self.repo.find_commit(oid) {
                Ok(commit) => commits.push(self.record_for(&commit)),
                Err(e) => {
                    tracing::warn!("Skipping unreadable commit {}: {}", oid, e);
                }
            }
        }

        tracing::info!("Indexed {} commits", commits.len());
        Ok(commits)
    }

    /// Build a record for one commit; file-change failures are contained here.
    pub fn record_for(&self, commit: &git2::Commit) -> CommitRecord {
        let hash = commit.id().to_string();
        let author = commit.author();
        let (file_changes, insertions, deletions) = self.changes_for(commit);

        CommitRecord {
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
                files_changed: file_changes.len(),
                insertions,
                deletions,
                truncated: false,
            },
            file_changes,
        }
    }

    /// File changes against all parents, plus best-effort line counts.
    fn changes_for(&self, commit: &git2::Commit) -> (Vec<FileChange>, usize, usize) {
        let tree = match commit.tree() {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!("Commit {} has no readable tree: {}", commit.id(), e);
                return (Vec::new(), 0, 0);
            }
        };

        if commit.parent_count() == 0 {
            return (root_commit_changes(&tree), 0, 0);
        }

        let mut changes = Vec::new();
        let mut insertions = 0;
        let mut deletions = 0;

        for parent in commit.parents() {
            let parent_tree = match parent.tree() {
                Ok(tree) => tree,
                Err(e) => {
                    tracing::warn!(
                        "Error reading parent tree for commit {}: {}",
                        commit.id(),
                        e
                    );
                    continue;
                }
            };

            let mut opts = DiffOptions::new();
            let diff = match self.repo.diff_tree_to_tree(
                Some(&parent_tree),
                Some(&tree),
                Some(&mut opts),
            ) {
                Ok(diff) => diff,
                Err(e) => {
                    tracing::warn!("Error diffing commit {}: {}", commit.id(), e);
                    continue;
                }
            };

            for delta in diff.deltas() {
                match change_from_delta(&delta) {
                    Some(change) => changes.push(change),
                    None => continue,
                }
            }

            if let Ok(stats) = diff.stats() {
                insertions += stats.insertions();
                deletions += stats.deletions();
            }
        }

        (changes, insertions, deletions)
    }
}

/// A root commit has no parent to diff against: every tracked blob is "added".
fn root_commit_changes(tree: &git2::Tree) -> Vec<FileChange> {
    let mut changes = Vec::new();
    let walk_result = tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(git2::ObjectType::Blob) {
            let path = format!("{}{}", root, entry.name().unwrap_or(""));
            changes.push(FileChange::new(path, ChangeKind::Added));
        }
        TreeWalkResult::Ok
    });

    if let Err(e) = walk_result {
        tracing::warn!("Error walking root commit tree: {}", e);
    }
    changes
}

/// Classify one diff delta; `None` when the delta carries no usable path.
pub(crate) fn change_from_delta(delta: &git2::DiffDelta) -> Option<FileChange> {
    let change_type = match delta.status() {
        Delta::Added => ChangeKind::Added,
        Delta::Deleted => ChangeKind::Deleted,
        Delta::Renamed => ChangeKind::Renamed,
        _ => ChangeKind::Modified,
    };

    let path = delta
        .new_file()
        .path()
        .or_else(|| delta.old_file().path())?;

    Some(FileChange::new(
        path.to_string_lossy().to_string(),
        change_type,
    ))
}
