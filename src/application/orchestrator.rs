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

//! The core application logic that orchestrates the overall export process.
//!
//! Connects to the catalog database, discovers the matching databases, then
//! walks them one at a time. Failures are contained at the level they occur:
//! a database that cannot be opened is skipped, a view that cannot be checked
//! or exported is skipped. Only losing the catalog aborts the run.

use crate::application::exporter::ViewExporter;
use crate::config::AppConfig as Config;
use crate::domain::entities::{DatabaseReport, RunSummary, ViewReport};
use crate::domain::errors::{ExportError, Result};
use crate::ports::session_port::{DatabaseSession, SessionFactory};
use log::{error, info, warn};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Orchestrates the export of the target views from every matching database.
pub struct Orchestrator {
    sessions: Arc<dyn SessionFactory>,
    exporter: ViewExporter,
    config: Config,
}

impl Orchestrator {
    pub fn new(sessions: Arc<dyn SessionFactory>, exporter: ViewExporter, config: Config) -> Self {
        Self {
            sessions,
            exporter,
            config,
        }
    }

    /// Entry point for running the full export process.
    ///
    /// Returns `Err` only when the catalog cannot be reached or queried.
    pub fn run(&self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let server = self.sessions.server();
        info!("Starting export from {}", server);

        // Held until the end of the run; dropped on every return path.
        let mut catalog = self.sessions.open(&self.config.server.catalog_database)?;
        let databases = self.discover(catalog.as_mut())?;

        let mut summary = RunSummary::new(server);
        if databases.is_empty() {
            warn!(
                "No online databases with '{}' in the name found on {}",
                self.config.export.database_marker, server
            );
            return Ok(summary);
        }

        std::fs::create_dir_all(&self.exporter.settings().output_dir)?;

        for database in &databases {
            summary.databases.push(self.process_database(database));
        }
        drop(catalog);

        if self.config.export.write_report {
            match self.generate_report(&summary, start_time.elapsed().as_secs_f64()) {
                Ok(path) => info!("Report written to {}", path.display()),
                Err(e) => error!("Could not write report: {}", e),
            }
        }

        info!(
            "Export finished in {:.1}s: {} views exported, {} not found, {} failed, {} of {} databases failed",
            start_time.elapsed().as_secs_f64(),
            summary.exported_views(),
            summary.missing_views(),
            summary.failed_views(),
            summary.failed_databases(),
            summary.databases.len()
        );
        Ok(summary)
    }

    /// Names of the online databases containing the marker, sorted ascending.
    fn discover(&self, catalog: &mut dyn DatabaseSession) -> Result<Vec<String>> {
        let marker = &self.config.export.database_marker;
        let mut names = catalog
            .list_online_databases(marker)
            .map_err(|e| ExportError::DiscoveryError(e.to_string()))?;
        // Case-insensitive like the default server collation.
        names.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        names.dedup();
        info!("Found {} databases matching '{}'", names.len(), marker);
        Ok(names)
    }

    /// Opens a dedicated session for `database` and handles every target view.
    ///
    /// The session is dropped, and its connection closed, before returning.
    fn process_database(&self, database: &str) -> DatabaseReport {
        info!("Checking database: {}", database);
        let mut session = match self.sessions.open(database) {
            Ok(s) => s,
            Err(e) => {
                error!("Error while processing {}: {}", database, e);
                return DatabaseReport::failed(database, e.to_string(), Vec::new());
            }
        };

        let views = self
            .config
            .export
            .views
            .iter()
            .map(|view| self.process_view(session.as_mut(), database, view))
            .collect();
        DatabaseReport::processed(database, views)
    }

    fn process_view(
        &self,
        session: &mut dyn DatabaseSession,
        database: &str,
        view: &str,
    ) -> ViewReport {
        match session.view_exists(view) {
            Ok(true) => match self.exporter.export(session, view) {
                Ok(exported) => ViewReport::exported(database, view, exported.rows, exported.path),
                Err(e) => {
                    error!("Export of {} from {} failed: {}", view, database, e);
                    ViewReport::failed(database, view, e.to_string())
                }
            },
            Ok(false) => {
                info!("View {} not found in {}", view, database);
                ViewReport::not_found(database, view)
            }
            Err(e) => {
                error!("Could not check view {} in {}: {}", view, database, e);
                ViewReport::failed(database, view, e.to_string())
            }
        }
    }

    fn generate_report(&self, summary: &RunSummary, duration_secs: f64) -> Result<PathBuf> {
        let report = json!({
            "summary": {
                "server": summary.server,
                "databases": summary.databases.len(),
                "failed_databases": summary.failed_databases(),
                "exported_views": summary.exported_views(),
                "missing_views": summary.missing_views(),
                "failed_views": summary.failed_views(),
                "total_rows": summary.total_rows(),
                "total_duration_seconds": duration_secs,
            },
            "details": summary.databases,
        });

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let report_path = self
            .exporter
            .settings()
            .output_dir
            .join(format!("report_{}.json", timestamp));

        let file = std::fs::File::create(&report_path)?;
        serde_json::to_writer_pretty(file, &report)
            .map_err(|e| ExportError::ReportError(e.to_string()))?;
        Ok(report_path)
    }
}
