// ABOUTME: In-memory cluster used by the integration tests
// ABOUTME: Mimics the CouchDB endpoints the migration calls and records every call

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use cloudant_migrator::cluster::{Cluster, ClusterResponse};
use cloudant_migrator::config::{Credentials, MigrationConfig};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    /// Databases in creation order, each with its stored documents
    databases: Vec<(String, Vec<Map<String, Value>>)>,
    failing_all_docs: BTreeSet<String>,
    error_bodies: BTreeSet<String>,
    unreachable: bool,
    next_rev: u64,
    calls: Vec<String>,
    uploads: Vec<Value>,
}

impl State {
    fn database(&self, name: &str) -> Option<&Vec<Map<String, Value>>> {
        self.databases
            .iter()
            .find(|(db, _)| db == name)
            .map(|(_, docs)| docs)
    }

    fn database_mut(&mut self, name: &str) -> Option<&mut Vec<Map<String, Value>>> {
        self.databases
            .iter_mut()
            .find(|(db, _)| db == name)
            .map(|(_, docs)| docs)
    }

    fn new_rev(&mut self) -> String {
        self.next_rev += 1;
        format!("1-{:032x}", self.next_rev)
    }
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a database holding `docs`; each gets a server-assigned `_rev`
    pub fn with_database(self, name: &str, docs: Vec<Value>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let mut stored = Vec::new();
            for doc in docs {
                let mut doc = doc.as_object().cloned().expect("document must be an object");
                doc.insert("_rev".to_string(), Value::String(state.new_rev()));
                stored.push(doc);
            }
            state.databases.push((name.to_string(), stored));
        }
        self
    }

    /// `_all_docs` on this database answers 500
    pub fn failing_all_docs(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_all_docs
            .insert(name.to_string());
        self
    }

    /// `_all_docs` on this database answers 200 with an `error` body
    pub fn error_body(self, name: &str) -> Self {
        self.state.lock().unwrap().error_bodies.insert(name.to_string());
        self
    }

    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().unreachable = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn database_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.databases.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Stored documents without their revisions, sorted by `_id`
    pub fn documents_without_revs(&self, name: &str) -> Option<Vec<Value>> {
        let state = self.state.lock().unwrap();
        let mut docs: Vec<Value> = state
            .database(name)?
            .iter()
            .map(|doc| {
                let mut doc = doc.clone();
                doc.remove("_rev");
                Value::Object(doc)
            })
            .collect();
        docs.sort_by(|a, b| a["_id"].as_str().cmp(&b["_id"].as_str()));
        Some(docs)
    }

    /// Every document submitted through `_bulk_docs`
    pub fn uploads(&self) -> Vec<Value> {
        self.state.lock().unwrap().uploads.clone()
    }

    fn record(&self, call: String) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.unreachable {
            return Err(anyhow!("error trying to connect: Connection refused"));
        }
        Ok(state)
    }
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn ping(&self) -> Result<ClusterResponse> {
        let _state = self.record("GET /".to_string())?;
        Ok(ClusterResponse::new(
            200,
            Some(json!({"couchdb": "Welcome", "version": "3.3.3"})),
        ))
    }

    async fn list_databases(&self) -> Result<ClusterResponse> {
        let state = self.record("GET /_all_dbs".to_string())?;
        let names: Vec<&str> = state.databases.iter().map(|(n, _)| n.as_str()).collect();
        Ok(ClusterResponse::new(200, Some(json!(names))))
    }

    async fn all_docs(&self, database: &str) -> Result<ClusterResponse> {
        let state = self.record(format!("GET /{}/_all_docs", database))?;

        if state.failing_all_docs.contains(database) {
            return Ok(ClusterResponse::new(
                500,
                Some(json!({"error": "internal_server_error"})),
            ));
        }
        if state.error_bodies.contains(database) {
            return Ok(ClusterResponse::new(
                200,
                Some(json!({"error": "forbidden", "reason": "not allowed"})),
            ));
        }

        let Some(docs) = state.database(database) else {
            return Ok(ClusterResponse::new(
                404,
                Some(json!({"error": "not_found", "reason": "Database does not exist."})),
            ));
        };

        let rows: Vec<Value> = docs
            .iter()
            .map(|doc| {
                json!({
                    "id": doc["_id"],
                    "key": doc["_id"],
                    "value": {"rev": doc["_rev"]},
                    "doc": doc,
                })
            })
            .collect();
        Ok(ClusterResponse::new(
            200,
            Some(json!({"total_rows": rows.len(), "offset": 0, "rows": rows})),
        ))
    }

    async fn delete_database(&self, database: &str) -> Result<ClusterResponse> {
        let mut state = self.record(format!("DELETE /{}", database))?;
        let before = state.databases.len();
        state.databases.retain(|(name, _)| name != database);
        if state.databases.len() == before {
            return Ok(ClusterResponse::new(404, Some(json!({"error": "not_found"}))));
        }
        Ok(ClusterResponse::new(200, Some(json!({"ok": true}))))
    }

    async fn create_database(&self, database: &str) -> Result<ClusterResponse> {
        let mut state = self.record(format!("PUT /{}", database))?;
        if state.database(database).is_some() {
            return Ok(ClusterResponse::new(
                412,
                Some(json!({"error": "file_exists"})),
            ));
        }
        state.databases.push((database.to_string(), Vec::new()));
        Ok(ClusterResponse::new(201, Some(json!({"ok": true}))))
    }

    async fn bulk_docs(&self, database: &str, docs: &[Value]) -> Result<ClusterResponse> {
        let mut state = self.record(format!("POST /{}/_bulk_docs", database))?;
        state.uploads.extend_from_slice(docs);

        if state.database(database).is_none() {
            return Ok(ClusterResponse::new(404, Some(json!({"error": "not_found"}))));
        }

        let mut results = Vec::new();
        for doc in docs {
            let mut doc = doc.as_object().cloned().unwrap_or_default();
            let id = doc.get("_id").cloned().unwrap_or(Value::Null);
            let exists = state
                .database(database)
                .map(|stored| stored.iter().any(|d| d.get("_id") == Some(&id)))
                .unwrap_or(false);

            // a revision the target never issued, or a duplicate id, is a conflict
            if doc.contains_key("_rev") || exists {
                results.push(json!({"id": id, "error": "conflict", "reason": "Document update conflict."}));
                continue;
            }

            let rev = state.new_rev();
            doc.insert("_rev".to_string(), Value::String(rev.clone()));
            if let Some(stored) = state.database_mut(database) {
                stored.push(doc);
            }
            results.push(json!({"ok": true, "id": id, "rev": rev}));
        }

        Ok(ClusterResponse::new(201, Some(Value::Array(results))))
    }
}

pub fn test_config(base_dir: &Path) -> MigrationConfig {
    MigrationConfig::new(
        base_dir,
        "http://cloudant-svc/",
        Credentials {
            username: "admin".to_string(),
            password: "pass".to_string(),
        },
        false,
    )
}

/// Sorted entry names of a tar archive, directories without trailing slash
pub fn archive_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(file);
    let mut names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|entry| {
            entry
                .unwrap()
                .path()
                .unwrap()
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string()
        })
        .collect();
    names.sort();
    names
}
