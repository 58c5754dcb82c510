//! Report persistence.
//!
//! One report is kept per `owner/name`. The key is enforced by the update-or-insert
//! query pattern rather than a schema constraint, and concurrent writers for
//! the same key simply overwrite each other.

use crate::analytics::{AnalyticsReport, ContributorStat, RepositoryMetadata};
use crate::error::{IntrospectError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Migrations, applied in order; entry `i` upgrades to version `i + 1`
const MIGRATIONS: &[&str] = &[r#"
    CREATE TABLE IF NOT EXISTS reports (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name        TEXT NOT NULL,
        repo_info        JSON NOT NULL,
        contributors     JSON NOT NULL,
        file_types       JSON NOT NULL,
        commit_timeline  JSON NOT NULL,
        generated_at     DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_reports_full_name ON reports(full_name);
"#];

/// Storage for analytics reports keyed by `owner/name`
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// The stored report for `full_name`, if any
    async fn get(&self, full_name: &str) -> Result<Option<AnalyticsReport>>;

    /// Stores `report` under its full name, replacing any previous one
    async fn save(&self, report: &AnalyticsReport) -> Result<()>;
}

/// Applies pending migrations based on `PRAGMA user_version`
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current {
            info!(version, "running report store migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    Ok(())
}

/// SQLite-backed report store
#[derive(Clone)]
pub struct SqliteReportStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReportStore {
    /// Opens or creates the database at `path` and migrates it
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        run_migrations(&conn)?;
        info!(path = %path.display(), "opened report store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A migrated in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    fn schema_version(&self) -> Result<i32> {
        let conn = lock(&self.conn)?;
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    #[cfg(test)]
    fn row_count(&self, full_name: &str) -> Result<i64> {
        let conn = lock(&self.conn)?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM reports WHERE full_name = ?1",
            params![full_name],
            |row| row.get(0),
        )?)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = lock(&conn)?;
            f(&guard)
        })
        .await
        .map_err(|e| IntrospectError::Message(format!("report store task failed: {}", e)))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| IntrospectError::new("report store connection poisoned"))
}

/// JSON-encoded columns of one report row
struct ReportRow {
    repo_info: String,
    contributors: String,
    file_types: String,
    commit_timeline: String,
    generated_at: String,
}

impl ReportRow {
    fn encode(report: &AnalyticsReport) -> Result<Self> {
        Ok(Self {
            repo_info: serde_json::to_string(&report.repo_info)?,
            contributors: serde_json::to_string(&report.contributors)?,
            file_types: serde_json::to_string(&report.file_types)?,
            commit_timeline: serde_json::to_string(&report.commit_timeline)?,
            generated_at: report.generated_at.to_rfc3339(),
        })
    }

    fn decode(self) -> Result<AnalyticsReport> {
        let repo_info: RepositoryMetadata = serde_json::from_str(&self.repo_info)?;
        let contributors: Vec<ContributorStat> = serde_json::from_str(&self.contributors)?;
        let file_types: BTreeMap<String, u64> = serde_json::from_str(&self.file_types)?;
        let commit_timeline: Vec<DateTime<Utc>> = serde_json::from_str(&self.commit_timeline)?;
        let generated_at = DateTime::parse_from_rfc3339(&self.generated_at)
            .map_err(|e| IntrospectError::decode(format!("bad generated_at: {}", e), self.generated_at.clone()))?
            .with_timezone(&Utc);

        Ok(AnalyticsReport {
            repo_info,
            contributors,
            file_types,
            commit_timeline,
            generated_at,
        })
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn get(&self, full_name: &str) -> Result<Option<AnalyticsReport>> {
        let key = full_name.to_string();
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT repo_info, contributors, file_types, commit_timeline, generated_at
                         FROM reports WHERE full_name = ?1 ORDER BY id DESC LIMIT 1",
                        params![key],
                        |row| {
                            Ok(ReportRow {
                                repo_info: row.get(0)?,
                                contributors: row.get(1)?,
                                file_types: row.get(2)?,
                                commit_timeline: row.get(3)?,
                                generated_at: row.get(4)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        debug!(full_name, hit = row.is_some(), "report store lookup");
        row.map(ReportRow::decode).transpose()
    }

    async fn save(&self, report: &AnalyticsReport) -> Result<()> {
        let key = report.full_name().to_string();
        let row = ReportRow::encode(report)?;

        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE reports
                 SET repo_info = ?2, contributors = ?3, file_types = ?4, commit_timeline = ?5, generated_at = ?6
                 WHERE id = (SELECT MAX(id) FROM reports WHERE full_name = ?1)",
                params![
                    key,
                    row.repo_info,
                    row.contributors,
                    row.file_types,
                    row.commit_timeline,
                    row.generated_at
                ],
            )?;

            if updated == 0 {
                conn.execute(
                    "INSERT INTO reports (full_name, repo_info, contributors, file_types, commit_timeline, generated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        key,
                        row.repo_info,
                        row.contributors,
                        row.file_types,
                        row.commit_timeline,
                        row.generated_at
                    ],
                )?;
            }
            debug!(full_name = %key, updated, "stored report");
            Ok(())
        })
        .await
    }
}

/// Process-local report store
#[derive(Debug, Clone, Default)]
pub struct MemoryReportStore {
    store: Arc<RwLock<HashMap<String, AnalyticsReport>>>,
}

impl MemoryReportStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reports
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether nothing has been stored
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn get(&self, full_name: &str) -> Result<Option<AnalyticsReport>> {
        Ok(self.store.read().await.get(full_name).cloned())
    }

    async fn save(&self, report: &AnalyticsReport) -> Result<()> {
        self.store
            .write()
            .await
            .insert(report.full_name().to_string(), report.clone());
        Ok(())
    }
}
