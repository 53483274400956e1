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

//! # WinCC Views Exporter
//!
//! Finds the WinCC alarm-logging databases on a SQL Server instance (every
//! online database with `_ALG_` in its name), looks for the configured alarm
//! views in each, and dumps every view it finds to
//! `<output_dir>/<database>/<view>.csv`.
//!
//! The application follows the **Hexagonal Architecture** (Ports and Adapters):
//! the pipeline in `application` only talks to the traits in `ports`, and the
//! SQL Server specifics live in `infrastructure`.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

use crate::application::exporter::{ExportSettings, ViewExporter};
use crate::application::orchestrator::Orchestrator;
use crate::config::{AppConfig, CliArgs};
use crate::infrastructure::sqlserver::connector::SqlServerConnector;
use clap::Parser;
use log::{error, info};
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = if let Some(config_path) = &args.config {
        match AppConfig::from_file(config_path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        }
    } else {
        AppConfig::default()
    };

    // Merge CLI overrides
    config.merge_cli(&args);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // 4. Initialize Hexagonal Components
    let connector = match SqlServerConnector::new(&config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to initialize SQL Server connector: {}", e);
            process::exit(1);
        }
    };

    let settings = match ExportSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid export settings: {}", e);
            process::exit(1);
        }
    };
    let exporter = ViewExporter::new(settings);

    // 5. Run Orchestrator
    let orchestrator = Orchestrator::new(connector, exporter, config);

    match orchestrator.run() {
        Ok(summary) => {
            info!(
                "Done. {} views exported from {} databases ({} rows).",
                summary.exported_views(),
                summary.databases.len(),
                summary.total_rows()
            );
        }
        Err(e) => {
            error!("Export aborted: {}", e);
            process::exit(1);
        }
    }
}
