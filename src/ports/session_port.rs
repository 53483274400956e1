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

//! # Session Port
//!
//! This Port defines what the exporter needs from a database server. It does
//! not care whether the other side is a real SQL Server or an in-memory mock
//! used by the tests.
//!
//! - A `SessionFactory` opens one connection ("session") per database.
//! - A `DatabaseSession` answers catalog and schema questions and opens views.
//! - A `ViewCursor` hands out the rows of one view in bounded batches.

use crate::domain::errors::Result;

/// Opens connections to databases on one configured server.
pub trait SessionFactory: Send + Sync {
    /// Human readable name of the server endpoint (used in logs and reports).
    fn server(&self) -> &str;

    /// Opens an authenticated session on `database`.
    ///
    /// Fails with `ExportError::ConnectionError` when the server is unreachable
    /// or the login is rejected. No retries are attempted.
    fn open(&self, database: &str) -> Result<Box<dyn DatabaseSession>>;
}

/// An open connection to a single database.
///
/// The connection is released when the session is dropped, so every exit path
/// of the code holding it closes it exactly once.
pub trait DatabaseSession {
    /// Name of the database this session is connected to.
    fn database(&self) -> &str;

    /// Returns the online databases whose name contains `marker` literally.
    ///
    /// Only meaningful on the catalog database.
    fn list_online_databases(&mut self, marker: &str) -> Result<Vec<String>>;

    /// Checks whether a view named exactly `view` exists in this database.
    fn view_exists(&mut self, view: &str) -> Result<bool>;

    /// Starts a full scan of `view`.
    fn open_view<'a>(&'a mut self, view: &str) -> Result<Box<dyn ViewCursor + 'a>>;
}

/// A running `SELECT *` over a view.
pub trait ViewCursor {
    /// Column names of the result, in result order.
    fn columns(&self) -> &[String];

    /// Fetches up to `max_rows` rows, each rendered as one text field per column.
    ///
    /// An empty batch means the result is exhausted.
    fn fetch_batch(&mut self, max_rows: usize) -> Result<Vec<Vec<String>>>;
}
