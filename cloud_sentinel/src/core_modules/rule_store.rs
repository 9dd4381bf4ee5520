// THEORY:
// The rule store is the sentinel's long-term memory: a tiny graph of hazard
// nodes, protocol nodes, and "triggers" edges between them. It is deliberately
// dumb. It answers exactly one interesting question, "which protocols hang off
// any keyword contained in this text?", and supports a destructive bulk reload.
//
// Key architectural principles:
// 1.  **Trait Seam**: The orchestrator and matcher only see `RuleStore`. The
//     SQLite implementation is one backend; tests and future backends plug in
//     behind the same trait.
// 2.  **One Connection, Owned**: `SqliteRuleStore` opens its connection once and
//     keeps it for the life of the handle. Dropping the handle closes it.
// 3.  **Blocking Off the Loop**: SQLite is synchronous, so every call is moved
//     onto `spawn_blocking` and the connection is guarded by a mutex.
// 4.  **Containment in SQL**: The substring test runs inside the query with
//     `instr`, lower-casing both sides. Keywords loaded through `rule_set` are
//     already lower-case, but the file may have been written by other tools.

use crate::core_modules::rule_set::RuleSet;
use crate::error::StoreError;
use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, info};

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;
CREATE TABLE IF NOT EXISTS hazards (
    keyword  TEXT PRIMARY KEY,
    category TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS protocols (
    code   TEXT PRIMARY KEY,
    action TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS triggers (
    keyword TEXT NOT NULL REFERENCES hazards(keyword) ON DELETE CASCADE,
    code    TEXT NOT NULL REFERENCES protocols(code) ON DELETE CASCADE,
    PRIMARY KEY (keyword, code)
);
"#;

/// A protocol reached through a trigger edge. Ordering is by action, then code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolRecommendation {
    pub action: String,
    pub code: String,
}

impl ProtocolRecommendation {
    pub fn new(action: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for ProtocolRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.action, self.code)
    }
}

/// Which keyword fired which protocol. Diagnostic output only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    pub keyword: String,
    pub action: String,
    pub code: String,
}

/// Counts written by a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub hazards: usize,
    pub protocols: usize,
    pub triggers: usize,
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Wipes every hazard, protocol and edge, then inserts `rules`.
    async fn reset_and_load(&self, rules: &RuleSet) -> Result<LoadSummary, StoreError>;

    /// All stored keywords, sorted.
    async fn list_hazard_keywords(&self) -> Result<Vec<String>, StoreError>;

    /// Protocols triggered by any stored keyword that is a case-insensitive
    /// substring of `hazard_text`, without duplicates.
    async fn find_triggered_protocols(
        &self,
        hazard_text: &str,
    ) -> Result<Vec<ProtocolRecommendation>, StoreError>;

    /// Same query as `find_triggered_protocols`, keeping the keyword that matched.
    async fn find_keyword_matches(&self, hazard_text: &str) -> Result<Vec<KeywordMatch>, StoreError>;
}

/// `RuleStore` backed by a single SQLite connection.
#[derive(Clone)]
pub struct SqliteRuleStore {
    conn: Arc<Mutex<Connection>>,
    location: String,
}

impl SqliteRuleStore {
    /// Opens (or creates) the database file and makes sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .and_then(|conn| conn.execute_batch(SCHEMA).map(|_| conn))
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Rule store opened at {}", path.display());
        Ok(Self::from_connection(conn, path.display().to_string()))
    }

    /// A private, throwaway store. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self::from_connection(conn, ":memory:".to_string()))
    }

    fn from_connection(conn: Connection, location: String) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            location,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Worker("rule store connection lock poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    async fn reset_and_load(&self, rules: &RuleSet) -> Result<LoadSummary, StoreError> {
        let rules = rules.clone();
        let summary = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM triggers", [])?;
                tx.execute("DELETE FROM hazards", [])?;
                tx.execute("DELETE FROM protocols", [])?;

                for hazard in rules.hazards() {
                    tx.execute(
                        "INSERT INTO hazards (keyword, category) VALUES (?1, ?2)",
                        params![hazard.keyword, hazard.category.as_str()],
                    )?;
                }
                for protocol in rules.protocols() {
                    tx.execute(
                        "INSERT INTO protocols (code, action) VALUES (?1, ?2)",
                        params![protocol.code, protocol.action],
                    )?;
                }
                for edge in rules.triggers() {
                    tx.execute(
                        "INSERT INTO triggers (keyword, code) VALUES (?1, ?2)",
                        params![edge.keyword, edge.code],
                    )?;
                }
                tx.commit()?;

                Ok(LoadSummary {
                    hazards: rules.hazards().len(),
                    protocols: rules.protocols().len(),
                    triggers: rules.triggers().len(),
                })
            })
            .await?;

        info!(
            "Rule store {} reloaded: {} hazards, {} protocols, {} triggers",
            self.location, summary.hazards, summary.protocols, summary.triggers
        );
        Ok(summary)
    }

    async fn list_hazard_keywords(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT keyword FROM hazards ORDER BY keyword")?;
            let keywords = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(keywords)
        })
        .await
    }

    async fn find_triggered_protocols(
        &self,
        hazard_text: &str,
    ) -> Result<Vec<ProtocolRecommendation>, StoreError> {
        let text = hazard_text.to_lowercase();
        debug!("Querying rule store for text: {:?}", text);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT p.action, p.code
                 FROM triggers t
                 JOIN hazards h ON h.keyword = t.keyword
                 JOIN protocols p ON p.code = t.code
                 WHERE instr(lower(?1), lower(h.keyword)) > 0
                 ORDER BY p.action, p.code",
            )?;
            let protocols = stmt
                .query_map(params![text], |row| {
                    Ok(ProtocolRecommendation::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(protocols)
        })
        .await
    }

    async fn find_keyword_matches(&self, hazard_text: &str) -> Result<Vec<KeywordMatch>, StoreError> {
        let text = hazard_text.to_lowercase();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT h.keyword, p.action, p.code
                 FROM triggers t
                 JOIN hazards h ON h.keyword = t.keyword
                 JOIN protocols p ON p.code = t.code
                 WHERE instr(lower(?1), lower(h.keyword)) > 0
                 ORDER BY h.keyword, p.code",
            )?;
            let matches = stmt
                .query_map(params![text], |row| {
                    Ok(KeywordMatch {
                        keyword: row.get(0)?,
                        action: row.get(1)?,
                        code: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(matches)
        })
        .await
    }
}
