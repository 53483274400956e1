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

//! SQL text used against SQL Server and the helpers that keep names literal.

/// Online databases whose name matches a LIKE pattern, escaped with `\`.
///
/// `state = 0` is ONLINE in `sys.databases`.
pub const SQL_LIST_DATABASES: &str = "
    SELECT name
    FROM sys.databases
    WHERE name LIKE @P1 ESCAPE '\\'
      AND state = 0
    ORDER BY name
";

pub const SQL_VIEW_EXISTS: &str = "
    SELECT 1
    FROM INFORMATION_SCHEMA.VIEWS
    WHERE TABLE_NAME = @P1
";

/// Builds a LIKE pattern that matches names containing `marker` literally.
///
/// `_`, `%`, `[` and the escape character itself would otherwise act as
/// wildcards or break the pattern.
pub fn contains_pattern(marker: &str) -> String {
    let mut pattern = String::with_capacity(marker.len() * 2 + 2);
    pattern.push('%');
    for c in marker.chars() {
        if matches!(c, '_' | '%' | '[' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Quotes an identifier in brackets, doubling any closing bracket.
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Full scan of a view. No ordering is imposed beyond what the engine returns.
pub fn select_all_sql(view: &str) -> String {
    format!("SELECT * FROM {}", quote_identifier(view))
}
