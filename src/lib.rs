//! Repository analysis and context retrieval for local Git working trees.
//!
//! The crate crawls a working tree, indexes recent commit history, embeds
//! file content with a pluggable provider, and answers relevance queries
//! over the result. Everything is plain structured data; no server, no
//! storage backend.
//!
//! The usual entry point is [`analyzer::RepoAnalyzer`]:
//!
//! ```no_run
//! use reposcope::analyzer::RepoAnalyzer;
//! use reposcope::config::AnalyzerConfig;
//! use reposcope::embedding::shared_provider;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = AnalyzerConfig::default();
//! let provider = shared_provider(&config.embedding)?;
//! let analyzer = RepoAnalyzer::open("/path/to/repo", provider, config)?;
//! let analysis = analyzer.analyze();
//! println!("{} commits indexed", analysis.commit_history.len());
//!
//! let files = analyzer.relevant_files("where is authentication handled", 10)?;
//! for file in files {
//!     println!("{} ({:.3})", file.path, file.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod config;
pub mod context;
pub mod crawler;
pub mod diff;
pub mod embedding;
pub mod error;
pub mod history;
pub mod ranking;
pub mod resolve;
pub mod types;

pub use analyzer::RepoAnalyzer;
pub use config::AnalyzerConfig;
pub use error::AnalyzerError;
pub use types::Analysis;
