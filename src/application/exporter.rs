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

//! # View Exporter
//!
//! Streams one view into `<output_dir>/<database>/<view>.csv`: the column
//! names as the header line, then every row, fetched in fixed-size batches so
//! memory stays bounded for large views.

use crate::config::AppConfig;
use crate::domain::errors::Result;
use crate::ports::session_port::{DatabaseSession, ViewCursor};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    pub batch_size: usize,
    pub delimiter: u8,
    /// Write to a temporary file and rename it over the target when complete.
    pub atomic_writes: bool,
}

impl ExportSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            output_dir: config.export.output_dir.clone(),
            batch_size: config.export.batch_size,
            delimiter: config.field_delimiter()?,
            atomic_writes: config.export.atomic_writes,
        })
    }
}

/// A finished export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedView {
    pub path: PathBuf,
    pub rows: u64,
}

pub struct ViewExporter {
    settings: ExportSettings,
}

impl ViewExporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Path of the file a (database, view) pair is exported to.
    pub fn target_path(&self, database: &str, view: &str) -> PathBuf {
        self.settings
            .output_dir
            .join(database)
            .join(format!("{}.csv", view))
    }

    /// Exports all rows of `view` from the database `session` is connected to.
    ///
    /// An existing file for the same pair is replaced. When the export fails
    /// half way, atomic mode leaves the previous file (if any) untouched;
    /// otherwise the partially written file stays in place.
    pub fn export(&self, session: &mut dyn DatabaseSession, view: &str) -> Result<ExportedView> {
        let database = session.database().to_string();
        let target = self.target_path(&database, view);
        let db_dir = self.settings.output_dir.join(&database);
        fs::create_dir_all(&db_dir)?;

        let mut cursor = session.open_view(view)?;

        let rows = if self.settings.atomic_writes {
            let mut tmp = tempfile::Builder::new()
                .prefix(&format!(".{}.", view))
                .suffix(".part")
                .tempfile_in(&db_dir)?;
            let rows = self.write_rows(cursor.as_mut(), tmp.as_file_mut())?;
            tmp.persist(&target).map_err(|e| e.error)?;
            rows
        } else {
            let file = File::create(&target)?;
            self.write_rows(cursor.as_mut(), file)?
        };

        info!("Exported {}/{} ({} rows)", database, view, rows);
        Ok(ExportedView { path: target, rows })
    }

    fn write_rows<W: Write>(&self, cursor: &mut dyn ViewCursor, out: W) -> Result<u64> {
        let mut wtr = WriterBuilder::new()
            .delimiter(self.settings.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::CRLF)
            .from_writer(BufWriter::with_capacity(128 * 1024, out));

        wtr.write_record(cursor.columns())?;

        let mut count: u64 = 0;
        loop {
            let batch = cursor.fetch_batch(self.settings.batch_size)?;
            if batch.is_empty() {
                break;
            }
            for record in &batch {
                wtr.write_record(record)?;
            }
            count += batch.len() as u64;
            wtr.flush()?;
            debug!("Wrote batch of {} rows ({} total)", batch.len(), count);
        }

        wtr.flush()?;
        Ok(count)
    }
}
