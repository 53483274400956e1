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

//! `DatabaseSession` and `ViewCursor` on top of a live tiberius client.
//!
//! tiberius is async; each call here drives it to completion on the
//! connector's current-thread runtime, so the ports stay synchronous.

use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::sqlserver::queries::{
    contains_pattern, select_all_sql, SQL_LIST_DATABASES, SQL_VIEW_EXISTS,
};
use crate::infrastructure::sqlserver::value_format::format_row;
use crate::ports::session_port::{DatabaseSession, ViewCursor};
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use log::{debug, warn};
use std::sync::Arc;
use tiberius::{Client, Row};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::Compat;

pub type SqlClient = Client<Compat<TcpStream>>;

/// An open connection to one database. Dropping it closes the connection.
pub struct SqlServerSession {
    runtime: Arc<Runtime>,
    client: Option<SqlClient>,
    database: String,
}

impl SqlServerSession {
    pub fn new(runtime: Arc<Runtime>, client: SqlClient, database: &str) -> Self {
        Self {
            runtime,
            client: Some(client),
            database: database.to_string(),
        }
    }

    fn parts(&mut self) -> Result<(&Runtime, &mut SqlClient)> {
        let client = self.client.as_mut().ok_or_else(|| {
            ExportError::QueryError(format!("Connection to {} is closed", self.database))
        })?;
        Ok((&*self.runtime, client))
    }
}

impl DatabaseSession for SqlServerSession {
    fn database(&self) -> &str {
        &self.database
    }

    fn list_online_databases(&mut self, marker: &str) -> Result<Vec<String>> {
        let pattern = contains_pattern(marker);
        let (runtime, client) = self.parts()?;
        let rows = runtime.block_on(async {
            client
                .query(SQL_LIST_DATABASES, &[&pattern.as_str()])
                .await?
                .into_first_result()
                .await
        })?;

        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(name) = row.try_get::<&str, _>(0)? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn view_exists(&mut self, view: &str) -> Result<bool> {
        let (runtime, client) = self.parts()?;
        let row = runtime.block_on(async {
            client.query(SQL_VIEW_EXISTS, &[&view]).await?.into_row().await
        })?;
        Ok(row.is_some())
    }

    fn open_view<'a>(&'a mut self, view: &str) -> Result<Box<dyn ViewCursor + 'a>> {
        let sql = select_all_sql(view);
        debug!("{}: {}", self.database, sql);
        let (runtime, client) = self.parts()?;

        let mut stream = runtime.block_on(client.simple_query(sql))?;
        let columns: Vec<String> = runtime
            .block_on(stream.columns())?
            .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        Ok(Box::new(SqlServerViewCursor {
            runtime,
            columns,
            rows: stream.into_row_stream(),
        }))
    }
}

impl Drop for SqlServerSession {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            debug!("Closing connection to {}", self.database);
            if let Err(e) = self.runtime.block_on(client.close()) {
                warn!("Closing connection to {} failed: {}", self.database, e);
            }
        }
    }
}

/// Rows of a running `SELECT *`, pulled from the wire one batch at a time.
struct SqlServerViewCursor<'a> {
    runtime: &'a Runtime,
    columns: Vec<String>,
    rows: BoxStream<'a, tiberius::Result<Row>>,
}

impl ViewCursor for SqlServerViewCursor<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn fetch_batch(&mut self, max_rows: usize) -> Result<Vec<Vec<String>>> {
        let rows = &mut self.rows;
        self.runtime.block_on(async {
            let mut batch = Vec::with_capacity(max_rows.min(1024));
            while batch.len() < max_rows {
                match rows.try_next().await? {
                    Some(row) => batch.push(format_row(row)?),
                    None => break,
                }
            }
            Ok::<_, ExportError>(batch)
        })
    }
}
