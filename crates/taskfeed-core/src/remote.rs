//! Simulated remote task API
//!
//! Stands in for an external service that serves the same tasks in the API
//! schema. It translates every element and resolves after a fixed artificial
//! delay modelling network latency. There is no network to fail against, so
//! fetches never fail; a production replacement would add timeout and retry
//! semantics on top of [`RemoteApiConfig`].

use std::time::Duration;

use tracing::debug;

use crate::translate::ApiTask;
use crate::types::Task;

/// Default simulated latency for API fetches
pub const SIMULATED_API_LATENCY: Duration = Duration::from_millis(500);

/// Default endpoint the shim pretends to talk to
pub const DEFAULT_API_ENDPOINT: &str = "https://javataskapi.com/v1/tasks";

/// Configuration for the remote task API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteApiConfig {
    /// Endpoint identifying the simulated service (used for tracing)
    pub endpoint: String,
    /// Fixed artificial delay applied to every fetch
    pub latency: Duration,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
            latency: SIMULATED_API_LATENCY,
        }
    }
}

/// Simulated remote task API
#[derive(Debug, Clone, Default)]
pub struct RemoteApi {
    config: RemoteApiConfig,
}

impl RemoteApi {
    /// Create a shim with the given configuration
    pub fn new(config: RemoteApiConfig) -> Self {
        Self { config }
    }

    /// Create a shim with the given latency and the default endpoint
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            config: RemoteApiConfig {
                latency,
                ..Default::default()
            },
        }
    }

    /// The configured latency
    pub fn latency(&self) -> Duration {
        self.config.latency
    }

    /// Fetch the API-schema view of the given tasks
    ///
    /// Resolves after the configured latency with every task translated
    /// into the API form. The delay is fixed, not derived from input size.
    pub async fn fetch_api_view(&self, tasks: &[Task]) -> Vec<ApiTask> {
        debug!(
            endpoint = %self.config.endpoint,
            count = tasks.len(),
            "Fetching API view"
        );
        tokio::time::sleep(self.config.latency).await;
        tasks.iter().cloned().map(ApiTask::from).collect()
    }
}
