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

//! Renders SQL Server column values as text fields.
//!
//! NULL becomes an empty field. Binary data is Base64 encoded, date and time
//! values use ISO-like formats with microseconds only when they are non-zero.

use crate::domain::errors::Result;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tiberius::{ColumnData, FromSql, Row};

/// Renders every value of a row, in column order.
pub fn format_row(row: Row) -> Result<Vec<String>> {
    row.into_iter().map(|data| format_value(&data)).collect()
}

pub fn format_value(data: &ColumnData<'static>) -> Result<String> {
    let text = match data {
        ColumnData::U8(v) => v.map(|v| v.to_string()),
        ColumnData::I16(v) => v.map(|v| v.to_string()),
        ColumnData::I32(v) => v.map(|v| v.to_string()),
        ColumnData::I64(v) => v.map(|v| v.to_string()),
        ColumnData::F32(v) => v.map(|v| v.to_string()),
        ColumnData::F64(v) => v.map(|v| v.to_string()),
        ColumnData::Bit(v) => v.map(|b| if b { "True" } else { "False" }.to_string()),
        ColumnData::String(v) => v.as_ref().map(|s| s.to_string()),
        ColumnData::Guid(v) => v.map(|g| g.to_string().to_uppercase()),
        ColumnData::Binary(v) => v.as_ref().map(|b| general_purpose::STANDARD.encode(b)),
        ColumnData::Numeric(v) => v.as_ref().map(|n| n.to_string()),
        ColumnData::Xml(v) => v.as_ref().map(|x| (**x).to_string()),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(|dt| format_datetime(&dt))
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data)?.map(|d| d.format("%Y-%m-%d").to_string()),
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map(|t| format_time(&t)),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<FixedOffset>::from_sql(data)?.map(|dt| format_datetime_offset(&dt))
        }
    };
    Ok(text.unwrap_or_default())
}

/// `2024-03-01 12:00:05` or `2024-03-01 12:00:05.250000`.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    format!("{} {}", dt.format("%Y-%m-%d"), format_time(&dt.time()))
}

pub fn format_time(t: &NaiveTime) -> String {
    if t.nanosecond() / 1_000 == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.6f").to_string()
    }
}

fn format_datetime_offset(dt: &DateTime<FixedOffset>) -> String {
    format!("{}{}", format_datetime(&dt.naive_local()), dt.format("%:z"))
}
