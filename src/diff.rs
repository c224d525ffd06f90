//! Per-file diff text for a single commit.
//!
//! Four disjoint cases, decided once per call: initial commit, file added,
//! file deleted, file modified. Every failure degrades to a descriptive
//! string; this module never returns an error to the caller.

use git2::{DiffFormat, DiffOptions, Repository};
use std::path::Path;

/// Marker returned when the tracked content is binary.
pub const BINARY_FILE: &str = "Binary file";

/// Marker returned when parent and commit content are identical.
pub const NO_CHANGES: &str = "No changes detected";

/// Marker returned when only file metadata (mode/permissions) changed.
pub const METADATA_ONLY: &str = "File metadata changed (mode or permissions)";

/// Produces diff text for one file at one commit.
pub struct DiffEngine<'r> {
    repo: &'r Repository,
    sniff_bytes: usize,
}

impl<'r> DiffEngine<'r> {
    pub fn new(repo: &'r Repository, sniff_bytes: usize) -> Self {
        Self { repo, sniff_bytes }
    }

    /// Diff `file_path` at `commit_ref` (full or abbreviated hash).
    /// Always returns text; failures become descriptive strings.
    pub fn diff_for_file(&self, commit_ref: &str, file_path: &str) -> String {
        match self.try_diff(commit_ref, file_path) {
            Ok(text) => text,
            Err(e) => format!("Could not retrieve diff: {}", e.message()),
        }
    }

    fn try_diff(&self, commit_ref: &str, file_path: &str) -> Result<String, git2::Error> {
        let commit = self
            .repo
            .revparse_single(commit_ref)?
            .peel_to_commit()?;
        let tree = commit.tree()?;

        let in_commit = self.blob_bytes(&tree, file_path);

        let parent = match commit.parent(0) {
            Ok(parent) => parent,
            Err(_) => {
                // Initial commit: the whole content is the diff.
                return Ok(match in_commit {
                    Some(bytes) => self.render_content("Initial commit, file added", file_path, &bytes),
                    None => format!("File {} not found in commit {}", file_path, commit_ref),
                });
            }
        };

        let parent_tree = parent.tree()?;
        let in_parent = self.blob_bytes(&parent_tree, file_path);

        let text = match (in_parent, in_commit) {
            (None, Some(bytes)) => self.render_content("File added", file_path, &bytes),
            (Some(bytes), None) => self.render_deleted(file_path, &bytes),
            (Some(parent_bytes), Some(bytes)) => {
                if self.is_binary(&parent_bytes) || self.is_binary(&bytes) {
                    BINARY_FILE.to_string()
                } else {
                    self.render_unified(&parent_tree, &tree, file_path)?
                }
            }
            (None, None) => format!(
                "File {} not found in commit {} or its parent",
                file_path, commit_ref
            ),
        };
        Ok(text)
    }

    /// Blob content at a path within a tree, if present.
    fn blob_bytes(&self, tree: &git2::Tree, file_path: &str) -> Option<Vec<u8>> {
        let entry = tree.get_path(Path::new(file_path)).ok()?;
        let blob = self.repo.find_blob(entry.id()).ok()?;
        Some(blob.content().to_vec())
    }

    /// A NUL byte in the sampled prefix means binary.
    fn is_binary(&self, bytes: &[u8]) -> bool {
        bytes.iter().take(self.sniff_bytes).any(|b| *b == 0)
    }

    fn render_content(&self, label: &str, file_path: &str, bytes: &[u8]) -> String {
        if self.is_binary(bytes) {
            return BINARY_FILE.to_string();
        }
        let content = String::from_utf8_lossy(bytes);
        let body: String = content.lines().map(|line| format!("+{}\n", line)).collect();
        format!("{}: {}\n{}", label, file_path, body)
    }

    fn render_deleted(&self, file_path: &str, bytes: &[u8]) -> String {
        if self.is_binary(bytes) {
            return BINARY_FILE.to_string();
        }
        let content = String::from_utf8_lossy(bytes);
        let body: String = content.lines().map(|line| format!("-{}\n", line)).collect();
        format!("File deleted: {}\n{}", file_path, body)
    }

    /// Unified diff restricted to one path. An empty patch with a non-empty
    /// delta list means a metadata-only change.
    fn render_unified(
        &self,
        parent_tree: &git2::Tree,
        tree: &git2::Tree,
        file_path: &str,
    ) -> Result<String, git2::Error> {
        let mut opts = DiffOptions::new();
        opts.pathspec(file_path).context_lines(3);

        let diff =
            self.repo
                .diff_tree_to_tree(Some(parent_tree), Some(tree), Some(&mut opts))?;

        // Collect hunk and content lines only. libgit2 emits file headers
        // even for a mode-only delta, so headers must not count as change
        // text or the metadata marker below would be unreachable.
        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if let Ok(content) = std::str::from_utf8(line.content()) {
                match line.origin() {
                    '+' | '-' | ' ' => {
                        text.push(line.origin());
                        text.push_str(content);
                    }
                    'H' => text.push_str(content),
                    _ => {}
                }
            }
            true
        })?;

        if !text.is_empty() {
            return Ok(text);
        }

        if diff.deltas().len() > 0 {
            Ok(METADATA_ONLY.to_string())
        } else {
            Ok(NO_CHANGES.to_string())
        }
    }
}
