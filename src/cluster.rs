// ABOUTME: HTTP client for the Cloudant/CouchDB cluster being migrated
// ABOUTME: Defines the Cluster trait used by the migration steps and its reqwest implementation

use crate::config::{Credentials, MigrationConfig};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

/// Status and decoded body of one cluster call
///
/// `body` is `None` when the response was empty or not valid JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ClusterResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// Any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 200 OK or 201 Created, the only statuses accepted for writes
    pub fn is_created(&self) -> bool {
        self.status == 200 || self.status == 201
    }
}

/// Operations the migration needs from the cluster
///
/// `Err` means the call itself failed (connection refused, DNS, broken body);
/// every HTTP status, including errors, comes back as `Ok(ClusterResponse)`
/// so callers decide how to classify it.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// `GET /`
    async fn ping(&self) -> Result<ClusterResponse>;

    /// `GET /_all_dbs`
    async fn list_databases(&self) -> Result<ClusterResponse>;

    /// `GET /{db}/_all_docs?include_docs=true`
    async fn all_docs(&self, database: &str) -> Result<ClusterResponse>;

    /// `DELETE /{db}`
    async fn delete_database(&self, database: &str) -> Result<ClusterResponse>;

    /// `PUT /{db}`
    async fn create_database(&self, database: &str) -> Result<ClusterResponse>;

    /// `POST /{db}/_bulk_docs` with body `{"docs": [...]}`
    async fn bulk_docs(&self, database: &str, docs: &[Value]) -> Result<ClusterResponse>;
}

/// Cluster reached over HTTP with basic auth
pub struct HttpCluster {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl HttpCluster {
    pub fn new(config: &MigrationConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.cluster_url)
            .with_context(|| format!("Invalid cluster URL: {}", config.cluster_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Cluster URL cannot be used as a base: {}", base_url));
        }
        // Credentials are sent per request, never kept in the URL
        let _ = base_url.set_username("");
        let _ = base_url.set_password(None);

        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            credentials: config.credentials.clone(),
        })
    }

    /// Base URL without credentials, safe to log
    pub fn endpoint(&self) -> &Url {
        &self.base_url
    }

    /// Builds `<base>/<database>/<suffix...>`, percent-encoding the database
    /// name so names containing `/` stay a single path segment.
    pub fn database_url(&self, database: &str, suffix: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Cluster URL cannot be used as a base: {}", self.base_url))?
            .pop_if_empty()
            .push(database)
            .extend(suffix);
        Ok(url)
    }

    fn root_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Failed to build cluster URL for '{}'", path))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<ClusterResponse> {
        let response = request
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await?;

        let status = response.status().as_u16();
        tracing::debug!("Returned status code: {}", status);

        let bytes = response
            .bytes()
            .await
            .context("Failed to read response body from cluster")?;
        let body = serde_json::from_slice(&bytes).ok();

        Ok(ClusterResponse { status, body })
    }
}

#[async_trait]
impl Cluster for HttpCluster {
    async fn ping(&self) -> Result<ClusterResponse> {
        let url = self.base_url.clone();
        self.send(self.http.get(url))
            .await
            .context("Failed to connect to cloudant server")
    }

    async fn list_databases(&self) -> Result<ClusterResponse> {
        let url = self.root_url("_all_dbs")?;
        self.send(self.http.get(url))
            .await
            .context("Failed to query databases from cloudant server")
    }

    async fn all_docs(&self, database: &str) -> Result<ClusterResponse> {
        let mut url = self.database_url(database, &["_all_docs"])?;
        url.query_pairs_mut().append_pair("include_docs", "true");
        self.send(self.http.get(url))
            .await
            .with_context(|| format!("Failed to fetch documents of database '{}'", database))
    }

    async fn delete_database(&self, database: &str) -> Result<ClusterResponse> {
        let url = self.database_url(database, &[])?;
        self.send(self.http.delete(url))
            .await
            .with_context(|| format!("Failed to delete database '{}'", database))
    }

    async fn create_database(&self, database: &str) -> Result<ClusterResponse> {
        let url = self.database_url(database, &[])?;
        let request = self
            .http
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8");
        self.send(request)
            .await
            .with_context(|| format!("Failed to create database '{}'", database))
    }

    async fn bulk_docs(&self, database: &str, docs: &[Value]) -> Result<ClusterResponse> {
        let url = self.database_url(database, &["_bulk_docs"])?;
        let request = self
            .http
            .post(url)
            .json(&serde_json::json!({ "docs": docs }));
        self.send(request)
            .await
            .with_context(|| format!("Failed to bulk upload to database '{}'", database))
    }
}
