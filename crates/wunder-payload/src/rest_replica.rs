//! Replica backed by a JSON-over-HTTP realtime database.
//!
//! Each namespace is the resource `<base>/<namespace>.json`. Writes are
//! `PATCH` requests (which merge keys); snapshots come from polling `GET` and
//! are only delivered when the contents changed.

use parking_lot::Mutex;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use wunder_core::{NetworkError, ReplicaConfig, ReplicaError};

use crate::replica::{ReplicaHandle, ReplicaSnapshot, ReplicaStore, SnapshotCallback};

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct RestReplica {
    client: Client,
    base_url: String,
    poll_interval: Duration,
    runtime: Handle,
}

impl RestReplica {
    /// Background work (polling, writes) runs on `runtime`.
    pub fn new(
        base_url: &str,
        poll_interval: Duration,
        runtime: Handle,
    ) -> Result<Self, ReplicaError> {
        if poll_interval.is_zero() {
            return Err(ReplicaError::ZeroPollInterval);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(NetworkError::from)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval,
            runtime,
        })
    }

    /// `None` when no replica URL is configured.
    pub fn from_config(config: &ReplicaConfig, runtime: Handle) -> Result<Option<Self>, ReplicaError> {
        config
            .base_url
            .as_deref()
            .map(|base| Self::new(base, config.poll_interval(), runtime))
            .transpose()
    }

    /// Concrete handle for `namespace`, for callers that want the async API.
    pub fn open_namespace(&self, namespace: &str) -> Result<RestNamespace, ReplicaError> {
        if namespace.is_empty() || namespace.contains(&['/', '.', '#', '$', '[', ']'][..]) {
            return Err(ReplicaError::InvalidNamespace(namespace.to_string()));
        }

        Ok(RestNamespace {
            client: self.client.clone(),
            namespace: namespace.to_string(),
            url: format!("{}/{}.json", self.base_url, namespace),
            poll_interval: self.poll_interval,
            runtime: self.runtime.clone(),
            pollers: Mutex::new(Vec::new()),
        })
    }
}

impl ReplicaStore for RestReplica {
    fn open(&self, namespace: &str) -> Result<Arc<dyn ReplicaHandle>, ReplicaError> {
        Ok(Arc::new(self.open_namespace(namespace)?))
    }
}

pub struct RestNamespace {
    client: Client,
    namespace: String,
    url: String,
    poll_interval: Duration,
    runtime: Handle,
    pollers: Mutex<Vec<JoinHandle<()>>>,
}

impl RestNamespace {
    /// Read the whole namespace. A missing namespace reads as empty.
    pub async fn fetch(&self) -> Result<ReplicaSnapshot, ReplicaError> {
        fetch(&self.client, &self.url).await
    }

    /// Merge `partial` into the namespace.
    pub async fn push(&self, partial: &ReplicaSnapshot) -> Result<(), ReplicaError> {
        push(&self.client, &self.url, partial).await
    }
}

async fn fetch(client: &Client, url: &str) -> Result<ReplicaSnapshot, ReplicaError> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(NetworkError::from)?;

    let body: Option<ReplicaSnapshot> = response
        .json()
        .await
        .map_err(|e| ReplicaError::Encoding(e.to_string()))?;

    Ok(body.unwrap_or_default())
}

async fn push(client: &Client, url: &str, partial: &ReplicaSnapshot) -> Result<(), ReplicaError> {
    client
        .patch(url)
        .json(partial)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(NetworkError::from)?;
    Ok(())
}

impl ReplicaHandle for RestNamespace {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn on_snapshot(&self, callback: SnapshotCallback) {
        let client = self.client.clone();
        let url = self.url.clone();
        let period = self.poll_interval;

        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut last: Option<ReplicaSnapshot> = None;
            loop {
                ticker.tick().await;
                match fetch(&client, &url).await {
                    Ok(snapshot) if last.as_ref() != Some(&snapshot) => {
                        last = Some(snapshot.clone());
                        callback(snapshot);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::debug!("Replica poll of {} failed: {}", url, e),
                }
            }
        });

        self.pollers.lock().push(task);
    }

    fn update(&self, partial: ReplicaSnapshot) -> Result<(), ReplicaError> {
        let client = self.client.clone();
        let url = self.url.clone();

        self.runtime.spawn(async move {
            if let Err(e) = push(&client, &url, &partial).await {
                tracing::warn!("Replica update of {} failed: {}", url, e);
            }
        });
        Ok(())
    }
}

impl Drop for RestNamespace {
    fn drop(&mut self) {
        for task in self.pollers.lock().drain(..) {
            task.abort();
        }
    }
}
