//! Repository analytics: the report data model, commit attribution and the
//! concurrent aggregation that assembles them.

/// Report, metadata and date range types
pub mod report;
/// Commit author attribution
pub mod reconcile;
/// Concurrent report assembly
pub mod aggregator;

pub use aggregator::{Aggregator, RepositorySource};
pub use reconcile::{reconcile, RawCommit, Reconciliation};
pub use report::{AnalyticsReport, ContributorIdentity, ContributorStat, DateRange, RepositoryMetadata};
