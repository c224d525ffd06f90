//! Working-tree crawl: file map, contents, and embeddings.
//!
//! The crawl never aborts because of one unreadable file; anything that
//! cannot be read as UTF-8 is recorded with the binary sentinel and stays
//! visible in the file tree.

use crate::config::CrawlConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::CrawlError;
use crate::types::{FileContent, FileTree};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Extensions always treated as binary, without attempting a read.
const BINARY_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "jpeg", "png", "gif", "ico", "bmp", "tiff", "webp",
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    // Archives
    "zip", "tar", "gz", "rar", "7z",
    // Binaries
    "exe", "dll", "so", "dylib", "bin",
    // Media
    "mp3", "mp4", "wav", "avi", "mov", "flv",
    // Compiled objects
    "pyc", "pyo", "pyd", "jar", "class", "o", "a", "lib",
];

/// Everything a single crawl pass produces. The three maps are mutually
/// path-consistent: every content key appears in the tree, and embeddings
/// exist only for text content.
#[derive(Debug, Default)]
pub struct CrawlOutput {
    pub file_structure: FileTree,
    pub file_contents: BTreeMap<String, FileContent>,
    pub file_embeddings: BTreeMap<String, Vec<f32>>,
}

/// Walks a working tree and loads file content plus embeddings.
pub struct RepositoryCrawler<'a> {
    root: &'a Path,
    provider: &'a dyn EmbeddingProvider,
    config: &'a CrawlConfig,
}

impl<'a> RepositoryCrawler<'a> {
    pub fn new(root: &'a Path, provider: &'a dyn EmbeddingProvider, config: &'a CrawlConfig) -> Self {
        Self {
            root,
            provider,
            config,
        }
    }

    /// Crawl the working tree. Only a missing or unreadable root is fatal.
    pub fn crawl(&self) -> Result<CrawlOutput, CrawlError> {
        if !self.root.exists() {
            return Err(CrawlError::RootNotFound(self.root.display().to_string()));
        }
        if !self.root.is_dir() {
            return Err(CrawlError::NotADirectory(self.root.display().to_string()));
        }
        if let Err(e) = fs::read_dir(self.root) {
            return Err(CrawlError::WalkFailed(e.to_string()));
        }

        let mut output = CrawlOutput::default();
        let mut embedded = 0usize;

        for entry in WalkDir::new(self.root)
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let rel_path = match entry.path().strip_prefix(self.root) {
                Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };

            output.file_structure.insert_file(&rel_path);

            let content = self.load_content(entry.path());
            if let Some(text) = content.as_text() {
                match self.provider.embed(truncate_chars(text, self.config.max_embed_chars)) {
                    Ok(embedding) => {
                        output.file_embeddings.insert(rel_path.clone(), embedding);
                        embedded += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to embed {}: {}", rel_path, e);
                    }
                }
            }
            output.file_contents.insert(rel_path, content);
        }

        tracing::info!(
            "Crawled {} files ({} embedded) under {}",
            output.file_contents.len(),
            embedded,
            self.root.display()
        );
        Ok(output)
    }

    /// Read one file, downgrading every per-file failure to the binary sentinel.
    fn load_content(&self, path: &Path) -> FileContent {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if BINARY_EXTENSIONS.contains(&ext.as_str()) {
            return FileContent::Binary;
        }

        if let Ok(metadata) = fs::metadata(path) {
            if metadata.len() > self.config.max_file_size {
                tracing::debug!("Oversized file treated as binary: {:?}", path);
                return FileContent::Binary;
            }
        }

        match fs::read_to_string(path) {
            Ok(text) => FileContent::Text(text),
            Err(e) => {
                tracing::debug!("Unreadable file treated as binary: {:?}: {}", path, e);
                FileContent::Binary
            }
        }
    }
}

// Depth 0 is the crawl root itself; a dot-named root is still crawled.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_string_lossy()
            .starts_with('.')
}

/// Truncate on a char boundary at most `max` characters in.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Extract a summary from the repository README, if one exists.
///
/// Short READMEs are returned whole; long ones are reduced to the lead
/// section plus any section whose title matches a known keyword, capped.
pub fn readme_summary(root: &Path) -> String {
    const README_NAMES: &[&str] = &["README.md", "README.rst", "Readme.md", "readme.md"];
    const SHORT_README: usize = 1_500;
    const SECTION_CAP: usize = 500;
    const KEYWORDS: &[&str] = &[
        "about",
        "introduction",
        "overview",
        "description",
        "features",
        "usage",
    ];

    for name in README_NAMES {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Error reading README {:?}: {}", path, e);
                return "Error reading README file".to_string();
            }
        };

        if content.chars().count() < SHORT_README {
            return content.trim().to_string();
        }

        static HEADER_RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        let header =
            HEADER_RE.get_or_init(|| regex::Regex::new(r"(?m)^#{1,6}\s+").expect("static regex"));
        let mut sections = header.split(&content);
        let mut summary = sections.next().unwrap_or("").trim().to_string();

        for section in sections {
            let mut lines = section.trim().lines();
            let title = match lines.next() {
                Some(t) => t,
                None => continue,
            };
            let lowered = title.to_lowercase();
            if KEYWORDS.iter().any(|k| lowered.contains(k)) {
                let body: String = lines.collect::<Vec<_>>().join("\n");
                let body = truncate_chars(body.trim(), SECTION_CAP);
                summary.push_str(&format!("\n\n## {}\n{}...", title, body));
            }
        }

        return summary;
    }

    "No README found".to_string()
}

/// Infer the dominant language from file extension counts.
pub fn primary_language<'p>(paths: impl Iterator<Item = &'p str>) -> Option<String> {
    let mut counts: HashMap<&'static str, usize> = HashMap::new();

    for path in paths {
        let ext = Path::new(path)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if let Some(language) = language_for_extension(&ext) {
            *counts.entry(language).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(language, _)| language.to_string())
}

fn language_for_extension(ext: &str) -> Option<&'static str> {
    let language = match ext {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "sh" | "bash" => "shell",
        "ex" | "exs" => "elixir",
        "hs" => "haskell",
        "lua" => "lua",
        "r" => "r",
        "dart" => "dart",
        "zig" => "zig",
        _ => return None,
    };
    Some(language)
}
