//! Context bundle assembly for a downstream consumer.
//!
//! The bundle is plain structured data: ranked files with capped content,
//! a backfill of important files when ranking comes up short, and ranked
//! commits with per-file diffs attached lazily.

use crate::crawler::truncate_chars;
use crate::types::{ChangeKind, CommitRecord, FileContent, RepoInfo};
use serde::Serialize;
use std::collections::BTreeMap;

/// Cap on content carried for a query-ranked file.
pub const RELEVANT_CONTENT_CAP: usize = 2_000;

/// Cap on content carried for a backfilled important file.
pub const IMPORTANT_CONTENT_CAP: usize = 1_000;

/// Important files are backfilled when fewer ranked files than this exist.
pub const IMPORTANT_BACKFILL: usize = 5;

/// One file included in a context bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextFile {
    pub path: String,
    pub content: String,
    /// Similarity score for ranked files; absent for backfilled ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// The structured payload handed to the consumer.
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    pub repo_info: RepoInfo,
    pub relevant_files: Vec<ContextFile>,
    pub important_files: Vec<ContextFile>,
    pub relevant_commits: Vec<CommitRecord>,
}

/// Assemble a bundle from ranked files, the important-file pool, and ranked
/// commits. `diff_for(hash, path)` supplies diff text on demand.
pub fn assemble(
    repo_info: RepoInfo,
    ranked_files: Vec<(String, String, f32)>,
    important_pool: &[String],
    contents: &BTreeMap<String, FileContent>,
    mut commits: Vec<CommitRecord>,
    diff_for: &mut dyn FnMut(&str, &str) -> String,
) -> ContextBundle {
    let relevant_files: Vec<ContextFile> = ranked_files
        .into_iter()
        .map(|(path, content, score)| ContextFile {
            path,
            content: cap_content(&content, RELEVANT_CONTENT_CAP),
            score: Some(score),
        })
        .collect();

    let mut important_files = Vec::new();
    if relevant_files.len() < IMPORTANT_BACKFILL {
        for path in important_pool {
            if important_files.len() >= IMPORTANT_BACKFILL {
                break;
            }
            if relevant_files.iter().any(|f| &f.path == path) {
                continue;
            }
            if let Some(content) = contents.get(path) {
                important_files.push(ContextFile {
                    path: path.clone(),
                    content: cap_content(content.display_text(), IMPORTANT_CONTENT_CAP),
                    score: None,
                });
            }
        }
    }

    for commit in &mut commits {
        for change in &mut commit.file_changes {
            if change.change_type != ChangeKind::Deleted && change.diff.is_none() {
                change.diff = Some(diff_for(&commit.hash, &change.path));
            }
        }
    }

    ContextBundle {
        repo_info,
        relevant_files,
        important_files,
        relevant_commits: commits,
    }
}

fn cap_content(content: &str, cap: usize) -> String {
    let truncated = truncate_chars(content, cap);
    if truncated.len() < content.len() {
        format!("{}...", truncated)
    } else {
        truncated.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommitStats, FileChange};

    fn commit_with_changes(hash: &str, changes: Vec<FileChange>) -> CommitRecord {
        CommitRecord {
            hash: hash.to_string(),
            short_hash: CommitRecord::short_of(hash),
            author: "Test <t@example.com>".to_string(),
            date: String::new(),
            message: "change things".to_string(),
            stats: CommitStats {
                files_changed: changes.len(),
                ..CommitStats::default()
            },
            file_changes: changes,
        }
    }

    #[test]
    fn test_relevant_content_capped() {
        let long = "x".repeat(3_000);
        let bundle = assemble(
            RepoInfo::default(),
            vec![("big.txt".to_string(), long, 0.9)],
            &[],
            &BTreeMap::new(),
            vec![],
            &mut |_, _| String::new(),
        );

        let content = &bundle.relevant_files[0].content;
        assert!(content.ends_with("..."));
        assert_eq!(content.len(), RELEVANT_CONTENT_CAP + 3);
    }

    #[test]
    fn test_important_backfill_skips_ranked_paths() {
        let mut contents = BTreeMap::new();
        contents.insert("a.rs".to_string(), FileContent::Text("fn a() {}".into()));
        contents.insert("b.rs".to_string(), FileContent::Text("fn b() {}".into()));
        let pool = vec!["a.rs".to_string(), "b.rs".to_string()];

        let bundle = assemble(
            RepoInfo::default(),
            vec![("a.rs".to_string(), "fn a() {}".to_string(), 0.8)],
            &pool,
            &contents,
            vec![],
            &mut |_, _| String::new(),
        );

        let backfilled: Vec<&str> = bundle
            .important_files
            .iter()
            .map(|f| f.path.as_str())
            .collect();
        assert_eq!(backfilled, vec!["b.rs"]);
    }

    #[test]
    fn test_no_backfill_when_enough_ranked() {
        let ranked: Vec<(String, String, f32)> = (0..IMPORTANT_BACKFILL)
            .map(|i| (format!("f{}.rs", i), "fn f() {}".to_string(), 0.5))
            .collect();
        let pool = vec!["extra.rs".to_string()];
        let mut contents = BTreeMap::new();
        contents.insert("extra.rs".to_string(), FileContent::Text("x".into()));

        let bundle = assemble(
            RepoInfo::default(),
            ranked,
            &pool,
            &contents,
            vec![],
            &mut |_, _| String::new(),
        );
        assert!(bundle.important_files.is_empty());
    }

    #[test]
    fn test_diffs_attached_lazily_except_deleted() {
        let changes = vec![
            FileChange::new("kept.rs", ChangeKind::Modified),
            FileChange::new("gone.rs", ChangeKind::Deleted),
        ];
        let commits = vec![commit_with_changes(
            "abc1234def5678901234567890123456789012ab",
            changes,
        )];

        let mut calls = Vec::new();
        let bundle = assemble(
            RepoInfo::default(),
            vec![],
            &[],
            &BTreeMap::new(),
            commits,
            &mut |hash, path| {
                calls.push((hash.to_string(), path.to_string()));
                format!("diff of {}", path)
            },
        );

        let commit = &bundle.relevant_commits[0];
        assert_eq!(commit.file_changes[0].diff.as_deref(), Some("diff of kept.rs"));
        assert!(commit.file_changes[1].diff.is_none());
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn test_existing_diff_not_overwritten() {
        let mut change = FileChange::new("kept.rs", ChangeKind::Modified);
        change.diff = Some("precomputed".to_string());
        let commits = vec![commit_with_changes(
            "abc1234def5678901234567890123456789012ab",
            vec![change],
        )];

        let bundle = assemble(
            RepoInfo::default(),
            vec![],
            &[],
            &BTreeMap::new(),
            commits,
            &mut |_, _| panic!("diff_for must not be called"),
        );
        assert_eq!(
            bundle.relevant_commits[0].file_changes[0].diff.as_deref(),
            Some("precomputed")
        );
    }
}
