//! Shared fixtures: throwaway Git repositories built with git2.

use git2::{Repository, Signature};
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::TempDir;

static TRACING: Once = Once::new();

/// Route log output through the test harness. Safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Create an empty repository in a temp directory. The directory is cleaned
/// up when the returned guard is dropped.
pub fn init_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().expect("create temp dir");
    let repo = Repository::init(dir.path()).expect("init repo");
    (dir, repo)
}

/// Write the given files into the working tree and commit them.
pub fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> git2::Oid {
    let workdir = repo.workdir().expect("bare repo has no workdir");
    for (path, content) in files {
        let full = workdir.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&full, content).expect("write file");
    }
    stage_and_commit(repo, files.iter().map(|(p, _)| *p), message)
}

/// Write raw bytes to one path and commit it.
pub fn commit_binary(repo: &Repository, path: &str, bytes: &[u8], message: &str) -> git2::Oid {
    let workdir = repo.workdir().expect("bare repo has no workdir");
    let full = workdir.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&full, bytes).expect("write file");
    stage_and_commit(repo, std::iter::once(path), message)
}

/// Create a commit with an explicit parent without touching HEAD or the
/// working tree. Paths must be top-level file names.
pub fn commit_off_parent(
    repo: &Repository,
    parent: git2::Oid,
    files: &[(&str, &str)],
    message: &str,
) -> git2::Oid {
    let parent_commit = repo.find_commit(parent).expect("find parent");
    let base_tree = parent_commit.tree().expect("parent tree");
    let tree = build_tree(repo, Some(&base_tree), files);
    let sig = Signature::now("Test Author", "test@example.com").expect("signature");
    repo.commit(None, &sig, &sig, message, &tree, &[&parent_commit])
        .expect("commit")
}

/// Merge two commits into a two-parent commit on HEAD. `extra` files are
/// added on top of the merged tree.
pub fn merge_branches(
    repo: &Repository,
    ours: git2::Oid,
    theirs: git2::Oid,
    extra: &[(&str, &str)],
    message: &str,
) -> git2::Oid {
    let ours_commit = repo.find_commit(ours).expect("find ours");
    let theirs_commit = repo.find_commit(theirs).expect("find theirs");

    let mut index = repo
        .merge_commits(&ours_commit, &theirs_commit, None)
        .expect("merge trees");
    assert!(!index.has_conflicts(), "fixture merge must be clean");
    let merged_id = index.write_tree_to(repo).expect("write merged tree");
    let merged_tree = repo.find_tree(merged_id).expect("find merged tree");

    let tree = build_tree(repo, Some(&merged_tree), extra);
    let sig = Signature::now("Test Author", "test@example.com").expect("signature");
    repo.commit(
        Some("HEAD"),
        &sig,
        &sig,
        message,
        &tree,
        &[&ours_commit, &theirs_commit],
    )
    .expect("merge commit")
}

fn build_tree<'r>(
    repo: &'r Repository,
    base: Option<&git2::Tree>,
    files: &[(&str, &str)],
) -> git2::Tree<'r> {
    let mut builder = repo.treebuilder(base).expect("treebuilder");
    for (path, content) in files {
        let blob = repo.blob(content.as_bytes()).expect("write blob");
        builder.insert(path, blob, 0o100644).expect("insert blob");
    }
    let tree_id = builder.write().expect("write tree");
    repo.find_tree(tree_id).expect("find tree")
}

/// Delete paths from the working tree and commit the removal.
pub fn remove_files(repo: &Repository, paths: &[&str], message: &str) -> git2::Oid {
    let workdir = repo.workdir().expect("bare repo has no workdir");
    let mut index = repo.index().expect("open index");
    for path in paths {
        fs::remove_file(workdir.join(path)).expect("remove file");
        index.remove_path(Path::new(path)).expect("unstage file");
    }
    index.write().expect("write index");
    commit_index(repo, &mut index, message)
}

fn stage_and_commit<'p>(
    repo: &Repository,
    paths: impl Iterator<Item = &'p str>,
    message: &str,
) -> git2::Oid {
    let mut index = repo.index().expect("open index");
    for path in paths {
        index.add_path(Path::new(path)).expect("stage file");
    }
    index.write().expect("write index");
    commit_index(repo, &mut index, message)
}

fn commit_index(repo: &Repository, index: &mut git2::Index, message: &str) -> git2::Oid {
    let tree_id = index.write_tree().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let sig = Signature::now("Test Author", "test@example.com").expect("signature");

    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .expect("commit")
}
