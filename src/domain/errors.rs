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

//! Core error definitions for the WinCC views exporter.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used throughout the application to handle SQL Server, I/O, and logic errors.

use thiserror::Error;

/// Error types encountered during the export process.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cannot connect to {database} on {server}: {reason}")]
    ConnectionError {
        server: String,
        database: String,
        reason: String,
    },

    #[error("Database discovery failed: {0}")]
    DiscoveryError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("Report generation failed: {0}")]
    ReportError(String),
}

impl From<tiberius::error::Error> for ExportError {
    fn from(e: tiberius::error::Error) -> Self {
        ExportError::QueryError(e.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::CsvError(e.to_string())
    }
}

/// A specialized Result type for the WinCC views exporter.
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_names_database() {
        let err = ExportError::ConnectionError {
            server: r"HOST\WINCC".to_string(),
            database: "CC_X_ALG_1".to_string(),
            reason: "login failed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CC_X_ALG_1"));
        assert!(msg.contains(r"HOST\WINCC"));
        assert!(msg.contains("login failed"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ExportError = io.into();
        assert!(matches!(err, ExportError::IoError(_)));
    }
}
