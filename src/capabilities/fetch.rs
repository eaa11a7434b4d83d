//! Tactical data endpoints: the fetch provider trait, the HTTP
//! implementation used in production shells, and an in-memory feed for tests.
//!
//! The endpoints own their schemas; this crate treats their payloads as
//! opaque JSON to be counted, decimated, and forwarded. The only field it
//! reads is the loaded-entity count on a scenario activation record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use thiserror::Error;
use url::Url;

pub use async_trait::async_trait;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("endpoint returned HTTP {status}")]
    Status { status: u16 },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    Decode(String),
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Status {
                status: status.as_u16(),
            };
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        Self::Transport(err.to_string())
    }
}

/// Activation record returned by the scenario endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioActivation {
    #[serde(default)]
    pub scenario_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub emitters_loaded: u64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Provider seam over the collaborator endpoints. Collections come back as
/// opaque JSON values in server order.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch_emitters(&self) -> Result<Vec<Value>, FetchError>;
    async fn fetch_threats(&self) -> Result<Vec<Value>, FetchError>;
    async fn fetch_metrics(&self) -> Result<Value, FetchError>;
    async fn activate_scenario(&self, scenario_id: &str) -> Result<ScenarioActivation, FetchError>;
}

/// The `/api` base plus the well-known routes under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet {
    base: Url,
}

impl EndpointSet {
    pub fn new(mut base: Url) -> Result<Self, FetchError> {
        if base.cannot_be_a_base() {
            return Err(FetchError::InvalidEndpoint(base.to_string()));
        }
        // Relative joins replace the last path segment unless the base ends
        // with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    #[must_use]
    pub fn emitters(&self) -> Url {
        self.join("emitters")
    }

    #[must_use]
    pub fn threat_assessments(&self) -> Url {
        self.join("threats/assess")
    }

    #[must_use]
    pub fn system_metrics(&self) -> Url {
        self.join("metrics")
    }

    #[must_use]
    pub fn scenario_activation(&self, scenario_id: &str) -> Url {
        self.join(&format!("scenarios/{scenario_id}/activate"))
    }

    fn join(&self, route: &str) -> Url {
        self.base
            .join(route)
            .unwrap_or_else(|_| self.base.clone())
    }
}

/// Production fetcher speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDataFetcher {
    client: reqwest::Client,
    endpoints: EndpointSet,
}

impl HttpDataFetcher {
    #[must_use]
    pub fn new(endpoints: EndpointSet) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, endpoints: EndpointSet) -> Self {
        Self { client, endpoints }
    }

    async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

fn into_collection(value: Value, what: &str) -> Result<Vec<Value>, FetchError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(FetchError::Decode(format!(
            "{what} endpoint did not return an array (got {})",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl DataFetcher for HttpDataFetcher {
    async fn fetch_emitters(&self) -> Result<Vec<Value>, FetchError> {
        let value = self.get_json(self.endpoints.emitters()).await?;
        into_collection(value, "emitter")
    }

    async fn fetch_threats(&self) -> Result<Vec<Value>, FetchError> {
        let mut value = self.get_json(self.endpoints.threat_assessments()).await?;
        // The assessment endpoint wraps its collection in a summary object.
        if let Some(assessments) = value.get_mut("assessments").map(Value::take) {
            return into_collection(assessments, "threat assessment");
        }
        into_collection(value, "threat assessment")
    }

    async fn fetch_metrics(&self) -> Result<Value, FetchError> {
        self.get_json(self.endpoints.system_metrics()).await
    }

    async fn activate_scenario(&self, scenario_id: &str) -> Result<ScenarioActivation, FetchError> {
        let response = self
            .client
            .post(self.endpoints.scenario_activation(scenario_id))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// In-memory feed for tests and demo shells. `set_failing(true)` makes every
/// fetch fail with a transport error until cleared.
#[derive(Debug, Default)]
pub struct InMemoryFeed {
    emitters: RwLock<Vec<Value>>,
    threats: RwLock<Vec<Value>>,
    system_metrics: RwLock<Value>,
    failing: AtomicBool,
}

impl InMemoryFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_emitters(&self, emitters: Vec<Value>) {
        if let Ok(mut guard) = self.emitters.write() {
            *guard = emitters;
        }
    }

    pub fn set_threats(&self, threats: Vec<Value>) {
        if let Ok(mut guard) = self.threats.write() {
            *guard = threats;
        }
    }

    pub fn set_system_metrics(&self, metrics: Value) {
        if let Ok(mut guard) = self.system_metrics.write() {
            *guard = metrics;
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_link(&self) -> Result<(), FetchError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(FetchError::Transport("simulated link failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DataFetcher for InMemoryFeed {
    async fn fetch_emitters(&self) -> Result<Vec<Value>, FetchError> {
        self.check_link()?;
        Ok(self.emitters.read().map(|g| g.clone()).unwrap_or_default())
    }

    async fn fetch_threats(&self) -> Result<Vec<Value>, FetchError> {
        self.check_link()?;
        Ok(self.threats.read().map(|g| g.clone()).unwrap_or_default())
    }

    async fn fetch_metrics(&self) -> Result<Value, FetchError> {
        self.check_link()?;
        Ok(self
            .system_metrics
            .read()
            .map(|g| g.clone())
            .unwrap_or_default())
    }

    async fn activate_scenario(&self, scenario_id: &str) -> Result<ScenarioActivation, FetchError> {
        self.check_link()?;
        let loaded = self.emitters.read().map(|g| g.len()).unwrap_or_default();
        Ok(ScenarioActivation {
            scenario_id: scenario_id.to_string(),
            status: "activated".into(),
            emitters_loaded: loaded as u64,
            timestamp: None,
        })
    }
}
