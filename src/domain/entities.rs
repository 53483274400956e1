// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Domain Entities
//!
//! The outcome of every unit of work in a run is recorded as a value instead of
//! only being logged: each view ends up `Exported`, `NotFound` or `Failed`, and
//! each database either gets processed or fails as a whole. The collected
//! `RunSummary` is what the orchestrator hands back and what the JSON report
//! is built from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What happened to one target view in one database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewOutcome {
    /// The view existed and all of its rows were written to `path`.
    Exported { rows: u64, path: PathBuf },
    /// The view does not exist in this database.
    NotFound,
    /// The existence check or the export itself failed.
    Failed { reason: String },
}

impl fmt::Display for ViewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewOutcome::Exported { rows, .. } => write!(f, "EXPORTED ({} rows)", rows),
            ViewOutcome::NotFound => write!(f, "NOT_FOUND"),
            ViewOutcome::Failed { reason } => write!(f, "FAILED ({})", reason),
        }
    }
}

/// The result for a single (database, view) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewReport {
    pub database: String,
    pub view: String,
    #[serde(flatten)]
    pub outcome: ViewOutcome,
}

impl ViewReport {
    pub fn exported(database: &str, view: &str, rows: u64, path: PathBuf) -> Self {
        Self::new(database, view, ViewOutcome::Exported { rows, path })
    }

    pub fn not_found(database: &str, view: &str) -> Self {
        Self::new(database, view, ViewOutcome::NotFound)
    }

    pub fn failed(database: &str, view: &str, reason: String) -> Self {
        Self::new(database, view, ViewOutcome::Failed { reason })
    }

    fn new(database: &str, view: &str, outcome: ViewOutcome) -> Self {
        Self {
            database: database.to_string(),
            view: view.to_string(),
            outcome,
        }
    }
}

/// Whether a database could be worked on at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatabaseOutcome {
    /// A session was opened and every target view was attempted.
    Processed,
    /// The database could not be processed (typically the connection failed).
    Failed { reason: String },
}

/// Everything that happened to one discovered database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseReport {
    pub database: String,
    #[serde(flatten)]
    pub outcome: DatabaseOutcome,
    pub views: Vec<ViewReport>,
}

impl DatabaseReport {
    pub fn processed(database: &str, views: Vec<ViewReport>) -> Self {
        Self {
            database: database.to_string(),
            outcome: DatabaseOutcome::Processed,
            views,
        }
    }

    pub fn failed(database: &str, reason: String, views: Vec<ViewReport>) -> Self {
        Self {
            database: database.to_string(),
            outcome: DatabaseOutcome::Failed { reason },
            views,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, DatabaseOutcome::Failed { .. })
    }
}

/// The collected outcome of a whole run, in discovery order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub server: String,
    pub databases: Vec<DatabaseReport>,
}

impl RunSummary {
    pub fn new(server: &str) -> Self {
        Self {
            server: server.to_string(),
            databases: Vec::new(),
        }
    }

    /// Iterates every view result across all databases.
    pub fn views(&self) -> impl Iterator<Item = &ViewReport> {
        self.databases.iter().flat_map(|d| d.views.iter())
    }

    pub fn exported_views(&self) -> usize {
        self.views()
            .filter(|v| matches!(v.outcome, ViewOutcome::Exported { .. }))
            .count()
    }

    pub fn missing_views(&self) -> usize {
        self.views()
            .filter(|v| v.outcome == ViewOutcome::NotFound)
            .count()
    }

    pub fn failed_views(&self) -> usize {
        self.views()
            .filter(|v| matches!(v.outcome, ViewOutcome::Failed { .. }))
            .count()
    }

    pub fn failed_databases(&self) -> usize {
        self.databases.iter().filter(|d| d.is_failed()).count()
    }

    pub fn total_rows(&self) -> u64 {
        self.views()
            .map(|v| match v.outcome {
                ViewOutcome::Exported { rows, .. } => rows,
                _ => 0,
            })
            .sum()
    }

    /// Looks up the result for a (database, view) pair.
    pub fn view(&self, database: &str, view: &str) -> Option<&ViewReport> {
        self.views()
            .find(|v| v.database == database && v.view == view)
    }
}
