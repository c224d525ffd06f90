//! Core data model for repository analysis.
//!
//! Everything the engine hands to a consumer is a plain tagged record with
//! serde derives: no formatting obligations, no untyped maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel recorded for files whose content could not be read as text.
pub const BINARY_CONTENT: &str = "[Binary content]";

/// Length of the abbreviated commit hash exposed alongside the full hash.
pub const SHORT_HASH_LEN: usize = 7;

/// Content of a single crawled file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum FileContent {
    /// UTF-8 text content, read in full.
    Text(String),
    /// Binary or unreadable file. The path is still tracked in the file tree.
    Binary,
}

impl FileContent {
    pub fn is_binary(&self) -> bool {
        matches!(self, FileContent::Binary)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(s) => Some(s),
            FileContent::Binary => None,
        }
    }

    /// Text for display: the content itself, or the binary sentinel.
    pub fn display_text(&self) -> &str {
        match self {
            FileContent::Text(s) => s,
            FileContent::Binary => BINARY_CONTENT,
        }
    }
}

/// A node in the hierarchical file map. Files serialize as `null`, matching
/// the leaf-marker convention consumers expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileNode {
    Dir(FileTree),
    File,
}

/// Nested map mirroring the working-tree directory structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileTree(pub BTreeMap<String, FileNode>);

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file by its slash-separated relative path, creating
    /// intermediate directories as needed.
    pub fn insert_file(&mut self, rel_path: &str) {
        let mut parts = rel_path.split('/').filter(|p| !p.is_empty()).peekable();
        let mut current = &mut self.0;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                current.insert(part.to_string(), FileNode::File);
            } else {
                let entry = current
                    .entry(part.to_string())
                    .or_insert_with(|| FileNode::Dir(FileTree::new()));
                match entry {
                    FileNode::Dir(tree) => current = &mut tree.0,
                    // A file and a directory with the same name cannot
                    // coexist in a working tree; keep the existing file.
                    FileNode::File => return,
                }
            }
        }
    }

    /// Whether a slash-separated relative path is present as a file.
    pub fn contains_file(&self, rel_path: &str) -> bool {
        let mut parts = rel_path.split('/').filter(|p| !p.is_empty()).peekable();
        let mut current = &self.0;
        while let Some(part) = parts.next() {
            match current.get(part) {
                Some(FileNode::File) => return parts.peek().is_none(),
                Some(FileNode::Dir(tree)) => current = &tree.0,
                None => return false,
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of files in the tree.
    pub fn file_count(&self) -> usize {
        self.0
            .values()
            .map(|node| match node {
                FileNode::File => 1,
                FileNode::Dir(tree) => tree.file_count(),
            })
            .sum()
    }
}

/// How a file changed within a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Renamed => "renamed",
        }
    }
}

/// One file touched by a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub change_type: ChangeKind,
    /// Best-effort line counts; 0 when the underlying diff did not provide them.
    #[serde(default)]
    pub insertions: usize,
    #[serde(default)]
    pub deletions: usize,
    /// Unified diff text, attached lazily when a consumer asks for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, change_type: ChangeKind) -> Self {
        Self {
            path: path.into(),
            change_type,
            insertions: 0,
            deletions: 0,
            diff: None,
        }
    }
}

/// Aggregate stats for a commit. All counts are best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
    /// Set when the file-change list was cut off at the configured ceiling.
    #[serde(default)]
    pub truncated: bool,
}

/// A fully materialized commit. Identity is the full hash; the short hash is
/// a left-anchored prefix kept as a lookup alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub short_hash: String,
    /// `name <email>`
    pub author: String,
    /// ISO-8601 committed date.
    pub date: String,
    pub message: String,
    pub stats: CommitStats,
    pub file_changes: Vec<FileChange>,
}

impl CommitRecord {
    /// Abbreviate a full hash to the standard short form.
    pub fn short_of(hash: &str) -> String {
        hash.chars().take(SHORT_HASH_LEN).collect()
    }

    /// Whether a sanitized reference string identifies this commit, either as
    /// the full hash, a hash prefix, or the short hash.
    pub fn matches_ref(&self, cleaned: &str) -> bool {
        !cleaned.is_empty() && (self.hash.starts_with(cleaned) || self.short_hash == cleaned)
    }
}

/// Basic repository facts gathered before the heavy analysis phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    /// README-derived summary, or a placeholder when none exists.
    pub description: String,
    pub branches: Vec<String>,
    pub default_branch: String,
    /// Inferred from file extension counts; `None` for empty trees.
    pub primary_language: Option<String>,
    pub last_analyzed: DateTime<Utc>,
}

impl Default for RepoInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            branches: Vec::new(),
            default_branch: String::new(),
            primary_language: None,
            last_analyzed: Utc::now(),
        }
    }
}

/// One complete analysis run. Rebuilt wholesale; all four fields are always
/// present even when a phase failed and produced an empty result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub repo_info: RepoInfo,
    /// Newest first, bounded by the configured commit cap.
    pub commit_history: Vec<CommitRecord>,
    pub file_structure: FileTree,
    /// Paths matching the known signal patterns (source files, manifests, CI config).
    pub important_files: Vec<String>,
}

/// Convert epoch seconds to an ISO-8601 timestamp string.
pub fn iso_date(epoch_secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
