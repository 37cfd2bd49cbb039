use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    error::FetchError,
    http::{FetchRequest, HttpResponse},
    protocol::{MessageError, PostedMessage, WorkerMessage, PROTOCOL_VERSION},
};
use storage::{CacheStorage, CacheStore};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    fetch::Fetcher,
    notifications::{DisplayOutcome, NotificationCenter},
    policy::{cache_first, network_first, CachePolicy},
    API_CACHE, DEFAULT_API_HOST, SHELL_CACHE, SHELL_RESOURCES,
};

const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Requests to this host (or its subdomains) are network-first.
    pub api_host: String,
    /// Origin the shell resources are resolved against. Without one there is
    /// nothing to pre-cache.
    pub shell_origin: Option<Url>,
    pub shell_resources: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.into(),
            shell_origin: None,
            shell_resources: SHELL_RESOURCES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl WorkerConfig {
    fn precache_requests(&self) -> Result<Vec<FetchRequest>, WorkerError> {
        let Some(origin) = &self.shell_origin else {
            return Ok(Vec::new());
        };
        self.shell_resources
            .iter()
            .map(|resource| {
                let url = origin.join(resource).map_err(|e| WorkerError::Install {
                    resource: resource.clone(),
                    reason: e.to_string(),
                })?;
                Ok(FetchRequest {
                    method: Default::default(),
                    url,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed or the worker stopped; it will never handle events.
    Redundant,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("install failed for '{resource}': {reason}")]
    Install { resource: String, reason: String },
    #[error("cache storage error: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("worker is not running")]
    Disconnected,
}

enum WorkerEvent {
    Fetch {
        id: Uuid,
        request: FetchRequest,
        respond_to: oneshot::Sender<Result<HttpResponse, FetchError>>,
    },
    Message(PostedMessage),
}

/// The page's side of the channel to the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    events: mpsc::Sender<WorkerEvent>,
    state: watch::Receiver<WorkerState>,
}

impl WorkerHandle {
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state() == WorkerState::Activated && !self.events.is_closed()
    }

    /// Delivery is best-effort: the worker may drop messages it cannot decode.
    pub async fn post_message(&self, message: PostedMessage) -> Result<(), WorkerError> {
        self.events
            .send(WorkerEvent::Message(message))
            .await
            .map_err(|_| WorkerError::Disconnected)
    }
}

#[async_trait]
impl Fetcher for WorkerHandle {
    async fn fetch(&self, request: FetchRequest) -> Result<HttpResponse, FetchError> {
        let (respond_to, response) = oneshot::channel();
        self.events
            .send(WorkerEvent::Fetch {
                id: Uuid::new_v4(),
                request,
                respond_to,
            })
            .await
            .map_err(|_| FetchError::WorkerUnavailable)?;
        response.await.map_err(|_| FetchError::WorkerUnavailable)?
    }
}

pub struct WorkerRegistration {
    handle: WorkerHandle,
    task: JoinHandle<()>,
}

impl WorkerRegistration {
    /// The worker, if it is activated and still running.
    pub fn active(&self) -> Option<&WorkerHandle> {
        self.handle.is_active().then_some(&self.handle)
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    pub fn unregister(self) {
        self.task.abort();
    }
}

/// Spawns the worker, runs its install and activate phases and resolves once
/// it is ready to intercept requests.
pub async fn register(
    config: WorkerConfig,
    storage: CacheStorage,
    network: Arc<dyn Fetcher>,
    notifications: NotificationCenter,
) -> Result<WorkerRegistration, WorkerError> {
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let (state_tx, state_rx) = watch::channel(WorkerState::Installing);
    let (ready_tx, ready_rx) = oneshot::channel();

    let worker = ServiceWorker {
        config,
        storage,
        network,
        notifications,
        state: state_tx,
    };
    let task = tokio::spawn(worker.run(events_rx, ready_tx));

    match ready_rx.await {
        Ok(Ok(())) => Ok(WorkerRegistration {
            handle: WorkerHandle {
                events: events_tx,
                state: state_rx,
            },
            task,
        }),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(WorkerError::Disconnected),
    }
}

struct ServiceWorker {
    config: WorkerConfig,
    storage: CacheStorage,
    network: Arc<dyn Fetcher>,
    notifications: NotificationCenter,
    state: watch::Sender<WorkerState>,
}

struct Interceptor {
    api_host: String,
    storage: CacheStorage,
    api_cache: CacheStore,
    network: Arc<dyn Fetcher>,
}

impl ServiceWorker {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<WorkerEvent>,
        ready: oneshot::Sender<Result<(), WorkerError>>,
    ) {
        let interceptor = match self.start().await {
            Ok(interceptor) => Arc::new(interceptor),
            Err(err) => {
                error!(error = %err, "worker install failed");
                self.state.send_replace(WorkerState::Redundant);
                let _ = ready.send(Err(err));
                return;
            }
        };
        let _ = ready.send(Ok(()));

        while let Some(event) = events.recv().await {
            match event {
                WorkerEvent::Fetch {
                    id,
                    request,
                    respond_to,
                } => {
                    let interceptor = interceptor.clone();
                    tokio::spawn(async move {
                        let result = interceptor.handle_fetch(id, request).await;
                        let _ = respond_to.send(result);
                    });
                }
                WorkerEvent::Message(message) => self.handle_message(message),
            }
        }

        debug!("all worker handles dropped, stopping");
        self.state.send_replace(WorkerState::Redundant);
    }

    async fn start(&mut self) -> Result<Interceptor, WorkerError> {
        self.state.send_replace(WorkerState::Installing);
        self.install().await?;
        self.state.send_replace(WorkerState::Installed);

        self.state.send_replace(WorkerState::Activating);
        let api_cache = self.storage.open(API_CACHE).await?;
        self.state.send_replace(WorkerState::Activated);
        info!("worker activated");

        Ok(Interceptor {
            api_host: self.config.api_host.clone(),
            storage: self.storage.clone(),
            api_cache,
            network: self.network.clone(),
        })
    }

    /// Pre-caches the application shell. Every resource must be fetched
    /// successfully before anything is stored.
    async fn install(&self) -> Result<(), WorkerError> {
        let requests = self.config.precache_requests()?;
        info!(resources = requests.len(), "installing, caching app shell");

        let shell = self.storage.open(SHELL_CACHE).await?;
        let mut fetched = Vec::with_capacity(requests.len());
        for request in requests {
            let key = request.key();
            let response = self
                .network
                .fetch(request)
                .await
                .map_err(|e| WorkerError::Install {
                    resource: key.url.clone(),
                    reason: e.to_string(),
                })?;
            if !response.ok() {
                return Err(WorkerError::Install {
                    resource: key.url,
                    reason: format!("unexpected status {}", response.status),
                });
            }
            fetched.push((key, response));
        }

        for (key, response) in &fetched {
            shell.put(key, response).await?;
        }
        Ok(())
    }

    fn handle_message(&mut self, message: PostedMessage) {
        if message.version != PROTOCOL_VERSION {
            warn!(
                version = message.version,
                expected = PROTOCOL_VERSION,
                "dropping message with unsupported protocol version"
            );
            return;
        }

        let decoded = match WorkerMessage::decode(&message.data) {
            Ok(decoded) => decoded,
            Err(MessageError::UnknownType(kind)) => {
                debug!(%kind, "ignoring message of unknown type");
                return;
            }
            Err(err) => {
                debug!(error = %err, "ignoring malformed message");
                return;
            }
        };

        match decoded {
            WorkerMessage::ShowNotification(payload) => {
                match self.notifications.display(payload.into_notification()) {
                    Ok(DisplayOutcome::PermissionDenied) => {}
                    Ok(outcome) => debug!(?outcome, "notification displayed"),
                    Err(err) => warn!(error = %err, "failed to display notification"),
                }
            }
        }
    }
}

impl Interceptor {
    async fn handle_fetch(
        &self,
        id: Uuid,
        request: FetchRequest,
    ) -> Result<HttpResponse, FetchError> {
        let policy = CachePolicy::for_request(&request, &self.api_host);
        let url = request.url.clone();
        debug!(%id, %url, ?policy, "intercepted fetch");

        let result = match policy {
            CachePolicy::NetworkFirst => {
                network_first(self.network.as_ref(), &self.api_cache, request).await
            }
            CachePolicy::CacheFirst => {
                cache_first(self.network.as_ref(), &self.storage, request).await
            }
        };

        match result {
            Ok(resolved) => {
                debug!(%id, %url, source = ?resolved.source, status = resolved.response.status, "fetch resolved");
                Ok(resolved.response)
            }
            Err(err) => {
                warn!(%id, %url, error = %err, "fetch failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
