#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! repo-introspector - analytics and AI insights for GitHub repositories
//!
//! Given a repository URL, the service fetches metadata, the language
//! breakdown and the commit history concurrently, attributes commits to
//! contributors and caches the resulting report. Around that core it can
//! build the repository's file hierarchy, summarize the project with a
//! language model and answer questions about selected files, in text or
//! speech.
//!
//! ## Usage
//! ```rust,no_run
//! use repo_introspector::{Aggregator, DateRange, GitHubClient, parse_repo_url, Config};
//!
//! async fn example() -> repo_introspector::Result<()> {
//!     let config = Config::load()?;
//!     let aggregator = Aggregator::new(GitHubClient::new(&config)?);
//!     let repo = parse_repo_url("https://github.com/rust-lang/rust")?;
//!     let report = aggregator.aggregate(&repo, &DateRange::default()).await?;
//!     println!("{} contributors", report.contributors.len());
//!     Ok(())
//! }
//! ```

/// Language model, chat and speech collaborators
pub mod ai;
/// Report model, commit attribution and aggregation
pub mod analytics;
/// Service operations behind the HTTP routes
pub mod api;
/// Report persistence
pub mod cache;
/// Configuration module for the application
pub mod config;
/// Error handling types and utilities
pub mod error;
/// GitHub REST client, pagination and file trees
pub mod github;
/// Logging configuration and utilities
pub mod logging;
/// Rate limiting functionality to respect API limits
pub mod rate_limiter;
/// HTTP router and error responses
pub mod server;

// Re-export common types
pub use analytics::{Aggregator, AnalyticsReport, DateRange, RepositorySource};
pub use api::IntrospectService;
pub use config::Config;
pub use error::{IntrospectError, Result};
pub use github::{parse_repo_url, GitHubClient, RepoRef};
pub use server::create_app;
