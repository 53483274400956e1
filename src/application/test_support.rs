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

//! In-memory implementations of the session ports for unit tests.

use crate::domain::errors::{ExportError, Result};
use crate::ports::session_port::{DatabaseSession, SessionFactory, ViewCursor};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default, Clone)]
pub struct MockView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Fail the fetch once this many rows were handed out.
    pub fail_after: Option<usize>,
}

impl MockView {
    pub fn new(columns: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            fail_after: None,
        }
    }

    /// A two-column view with `count` numbered rows.
    pub fn numbered(count: usize) -> Self {
        let rows = (0..count)
            .map(|i| vec![i.to_string(), format!("msg {}", i)])
            .collect();
        Self::new(&["ID", "Text"], rows)
    }
}

#[derive(Default, Clone)]
pub struct MockDatabase {
    pub online: bool,
    pub views: HashMap<String, MockView>,
    /// Views whose existence check errors.
    pub broken_checks: HashSet<String>,
}

impl MockDatabase {
    pub fn online() -> Self {
        Self {
            online: true,
            ..Default::default()
        }
    }

    pub fn with_view(mut self, name: &str, view: MockView) -> Self {
        self.views.insert(name.to_string(), view);
        self
    }

    pub fn with_broken_check(mut self, name: &str) -> Self {
        self.broken_checks.insert(name.to_string());
        self
    }
}

/// Connection bookkeeping shared by the factory and its sessions.
#[derive(Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub max_open: AtomicUsize,
    pub batch_sizes: Mutex<Vec<usize>>,
}

impl Counters {
    pub fn open_now(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }
}

pub struct MockServer {
    pub databases: BTreeMap<String, MockDatabase>,
    pub unreachable: HashSet<String>,
    pub counters: Arc<Counters>,
}

impl MockServer {
    pub fn new() -> Self {
        let mut databases = BTreeMap::new();
        databases.insert("master".to_string(), MockDatabase::online());
        Self {
            databases,
            unreachable: HashSet::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_database(mut self, name: &str, db: MockDatabase) -> Self {
        self.databases.insert(name.to_string(), db);
        self
    }

    pub fn with_unreachable(mut self, name: &str) -> Self {
        self.unreachable.insert(name.to_string());
        self
    }

    pub fn into_factory(self) -> Arc<MockSessionFactory> {
        Arc::new(MockSessionFactory {
            server: Arc::new(Mutex::new(self)),
        })
    }
}

pub struct MockSessionFactory {
    pub server: Arc<Mutex<MockServer>>,
}

impl MockSessionFactory {
    pub fn counters(&self) -> Arc<Counters> {
        self.server.lock().unwrap().counters.clone()
    }
}

impl SessionFactory for MockSessionFactory {
    fn server(&self) -> &str {
        "MOCK\\WINCC"
    }

    fn open(&self, database: &str) -> Result<Box<dyn DatabaseSession>> {
        let server = self.server.lock().unwrap();
        if server.unreachable.contains(database) || !server.databases.contains_key(database) {
            return Err(ExportError::ConnectionError {
                server: "MOCK\\WINCC".into(),
                database: database.into(),
                reason: "login failed".into(),
            });
        }
        let counters = server.counters.clone();
        counters.opened.fetch_add(1, Ordering::SeqCst);
        counters.max_open.fetch_max(counters.open_now(), Ordering::SeqCst);
        Ok(Box::new(MockSession {
            database: database.to_string(),
            server: self.server.clone(),
            counters,
        }))
    }
}

pub struct MockSession {
    database: String,
    server: Arc<Mutex<MockServer>>,
    counters: Arc<Counters>,
}

impl MockSession {
    fn db(&self) -> MockDatabase {
        self.server.lock().unwrap().databases[&self.database].clone()
    }
}

impl DatabaseSession for MockSession {
    fn database(&self) -> &str {
        &self.database
    }

    fn list_online_databases(&mut self, marker: &str) -> Result<Vec<String>> {
        let server = self.server.lock().unwrap();
        // Reverse order so callers cannot rely on the source being sorted.
        Ok(server
            .databases
            .iter()
            .rev()
            .filter(|(name, db)| db.online && name.contains(marker))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn view_exists(&mut self, view: &str) -> Result<bool> {
        let db = self.db();
        if db.broken_checks.contains(view) {
            return Err(ExportError::QueryError(format!("lookup of {} failed", view)));
        }
        Ok(db.views.contains_key(view))
    }

    fn open_view<'a>(&'a mut self, view: &str) -> Result<Box<dyn ViewCursor + 'a>> {
        let data = self
            .db()
            .views
            .get(view)
            .cloned()
            .ok_or_else(|| ExportError::QueryError(format!("Invalid object name '{}'", view)))?;
        Ok(Box::new(MockCursor {
            data,
            position: 0,
            counters: self.counters.clone(),
        }))
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockCursor {
    data: MockView,
    position: usize,
    counters: Arc<Counters>,
}

impl ViewCursor for MockCursor {
    fn columns(&self) -> &[String] {
        &self.data.columns
    }

    fn fetch_batch(&mut self, max_rows: usize) -> Result<Vec<Vec<String>>> {
        self.counters.batch_sizes.lock().unwrap().push(max_rows);
        let end = (self.position + max_rows).min(self.data.rows.len());
        if let Some(limit) = self.data.fail_after {
            if end > limit {
                return Err(ExportError::QueryError("connection reset".into()));
            }
        }
        let batch = self.data.rows[self.position..end].to_vec();
        self.position = end;
        Ok(batch)
    }
}
