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

//! # Configuration
//!
//! Run settings come from an optional YAML/JSON file, then CLI overrides are
//! merged on top. The resolved `AppConfig` is validated once and then passed by
//! value into the pipeline; nothing reads settings from global state after that.

use crate::domain::errors::{ExportError, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Server used when no address is given on the command line or in a file.
pub const DEFAULT_SERVER: &str = r"172.16.0.244\WINCC";
/// Named instance appended to the local machine name by the local fallback.
pub const DEFAULT_INSTANCE: &str = "WINCC";
pub const DEFAULT_CATALOG_DATABASE: &str = "master";
pub const DEFAULT_OUTPUT_DIR: &str = "wincc_views_export";
pub const DEFAULT_DATABASE_MARKER: &str = "_ALG_";
pub const DEFAULT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_SQL_PORT: u16 = 1433;
pub const PASSWORD_ENV_VAR: &str = "WINCC_EXPORT_PASSWORD";

/// Alarm views exported from every matching database, in export order.
pub const DEFAULT_VIEWS: [&str; 3] = [
    "AlgViewENU_ID_OPT",
    "AlgViewRUS_ID_OPT",
    "AlgViewDEU_ID_OPT",
];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// `host`, `host\instance` or `host,port`. Empty means "this machine".
    pub address: Option<String>,
    pub port: Option<u16>,
    #[serde(default = "default_catalog")]
    pub catalog_database: String,
    #[serde(default = "default_true")]
    pub trusted_connection: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default = "default_true")]
    pub trust_server_certificate: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_views")]
    pub views: Vec<String>,
    #[serde(default = "default_marker")]
    pub database_marker: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_delimiter")]
    pub field_delimiter: String,
    #[serde(default = "default_true")]
    pub atomic_writes: bool,
    #[serde(default = "default_true")]
    pub write_report: bool,
}

fn default_true() -> bool {
    true
}

fn default_catalog() -> String {
    DEFAULT_CATALOG_DATABASE.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_views() -> Vec<String> {
    DEFAULT_VIEWS.iter().map(|v| v.to_string()).collect()
}

fn default_marker() -> String {
    DEFAULT_DATABASE_MARKER.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_delimiter() -> String {
    ";".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: None,
            catalog_database: default_catalog(),
            trusted_connection: true,
            username: None,
            password: None,
            encrypt: false,
            trust_server_certificate: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            views: default_views(),
            database_marker: default_marker(),
            batch_size: default_batch_size(),
            field_delimiter: default_delimiter(),
            atomic_writes: true,
            write_report: true,
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// SQL Server address, e.g. `HOST\WINCC`. Pass an empty string for this machine.
    #[arg(long)]
    pub server: Option<String>,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Target view name; repeat to export several views
    #[arg(long = "view")]
    pub views: Vec<String>,
    #[arg(long)]
    pub username: Option<String>,
    /// SQL login password. Visible in the process list; prefer the
    /// WINCC_EXPORT_PASSWORD environment variable.
    #[arg(long)]
    pub password: Option<String>,
}

/// A parsed server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub instance: Option<String>,
    pub port: Option<u16>,
}

impl Endpoint {
    /// Parses `host`, `host\instance`, `host,port` or `host\instance,port`.
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        let (rest, port) = match address.rsplit_once(',') {
            Some((rest, port)) => {
                let port = port.trim().parse::<u16>().map_err(|_| {
                    ExportError::ConfigError(format!("Invalid port in server address '{}'", address))
                })?;
                (rest, Some(port))
            }
            None => (address, None),
        };

        let (host, instance) = match rest.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => (host, Some(instance.to_string())),
            Some((host, _)) => (host, None),
            None => (rest, None),
        };

        let host = match host.trim() {
            "" => {
                return Err(ExportError::ConfigError(format!(
                    "Server address '{}' has no host",
                    address
                )))
            }
            "." | "(local)" => "localhost",
            h => h,
        };

        Ok(Self {
            host: host.to_string(),
            instance,
            port,
        })
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents).map_err(|e| ExportError::ConfigError(e.to_string()))?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ExportError::ConfigError(e.to_string()))?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(s) = &args.server { self.server.address = Some(s.clone()); }
        if let Some(o) = &args.output { self.export.output_dir = o.clone(); }
        if !args.views.is_empty() { self.export.views = args.views.clone(); }
        if let Some(u) = &args.username {
            self.server.username = Some(u.clone());
            self.server.trusted_connection = false;
        }
        if let Some(p) = &args.password { self.server.password = Some(p.clone()); }
    }

    pub fn validate(&self) -> Result<()> {
        let export = &self.export;
        if export.views.is_empty() {
            return Err(ExportError::ConfigError("No target views configured".into()));
        }
        let mut seen = HashSet::new();
        for view in &export.views {
            if view.trim().is_empty() {
                return Err(ExportError::ConfigError("Empty view name".into()));
            }
            if view.contains(']') {
                return Err(ExportError::ConfigError(format!(
                    "View name '{}' must not contain ']'",
                    view
                )));
            }
            if !seen.insert(view.as_str()) {
                return Err(ExportError::ConfigError(format!("Duplicate view name '{}'", view)));
            }
        }
        if export.database_marker.is_empty() {
            return Err(ExportError::ConfigError("Database marker must not be empty".into()));
        }
        if export.batch_size == 0 {
            return Err(ExportError::ConfigError("batch_size must be greater than 0".into()));
        }
        self.field_delimiter()?;

        if !self.server.trusted_connection && self.server.username.is_none() {
            return Err(ExportError::ConfigError(
                "SQL authentication requires a username".into(),
            ));
        }
        Endpoint::parse(&self.server_address())?;
        Ok(())
    }

    /// The single-byte field delimiter written between values.
    pub fn field_delimiter(&self) -> Result<u8> {
        match self.export.field_delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ExportError::ConfigError(format!(
                "Field delimiter '{}' must be a single ASCII character",
                self.export.field_delimiter
            ))),
        }
    }

    /// Resolves the server address: an explicit address wins, an empty one
    /// means this machine's WinCC instance, and nothing at all means the
    /// default plant server.
    pub fn server_address(&self) -> String {
        match self.server.address.as_deref().map(str::trim) {
            Some("") => local_server_address(std::env::var("COMPUTERNAME").ok()),
            Some(address) => address.to_string(),
            None => DEFAULT_SERVER.to_string(),
        }
    }

    /// Password from the config, falling back to the environment.
    pub fn password(&self) -> Option<String> {
        self.server
            .password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV_VAR).ok())
    }
}

fn local_server_address(computer_name: Option<String>) -> String {
    let host = computer_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}\\{}", host, DEFAULT_INSTANCE)
}
