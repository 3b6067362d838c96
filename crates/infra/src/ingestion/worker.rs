//! In-process ingestion worker with request/reply messaging.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use docgate_core::{DocumentId, IngestionId, UserId};

use super::types::Ingestion;
use crate::store::Store;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct IngestionWorkerConfig {
    /// How long a job stays `processing` before it settles.
    pub completion_delay: Duration,
    /// Probability in `[0, 1]` that a job completes rather than fails.
    pub success_rate: f64,
    /// Bounded request queue size.
    pub queue_capacity: usize,
    /// Name for logging.
    pub name: String,
}

impl Default for IngestionWorkerConfig {
    fn default() -> Self {
        Self {
            completion_delay: Duration::from_secs(5),
            success_rate: 0.8,
            queue_capacity: 64,
            name: "ingestion-worker".to_string(),
        }
    }
}

impl IngestionWorkerConfig {
    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestionError {
    #[error("ingestion worker unavailable")]
    WorkerUnavailable,
    #[error("document {0} already has an ingestion")]
    DuplicateDocument(DocumentId),
}

/// Request/reply surface of the ingestion worker.
#[async_trait]
pub trait IngestionClient: Send + Sync {
    async fn create(
        &self,
        document_id: DocumentId,
        user_id: UserId,
    ) -> Result<Ingestion, IngestionError>;

    async fn get(&self, id: IngestionId) -> Result<Option<Ingestion>, IngestionError>;

    async fn list(&self) -> Result<Vec<Ingestion>, IngestionError>;
}

#[derive(Debug)]
enum IngestionRequest {
    Create {
        document_id: DocumentId,
        user_id: UserId,
        reply: oneshot::Sender<Result<Ingestion, IngestionError>>,
    },
    Get {
        id: IngestionId,
        reply: oneshot::Sender<Option<Ingestion>>,
    },
    List {
        reply: oneshot::Sender<Vec<Ingestion>>,
    },
}

/// Client half of the worker channel.
#[derive(Debug, Clone)]
pub struct ChannelIngestionClient {
    tx: mpsc::Sender<IngestionRequest>,
}

impl ChannelIngestionClient {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> IngestionRequest,
    ) -> Result<T, IngestionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| IngestionError::WorkerUnavailable)?;
        rx.await.map_err(|_| IngestionError::WorkerUnavailable)
    }
}

#[async_trait]
impl IngestionClient for ChannelIngestionClient {
    async fn create(
        &self,
        document_id: DocumentId,
        user_id: UserId,
    ) -> Result<Ingestion, IngestionError> {
        self.request(|reply| IngestionRequest::Create {
            document_id,
            user_id,
            reply,
        })
        .await?
    }

    async fn get(&self, id: IngestionId) -> Result<Option<Ingestion>, IngestionError> {
        self.request(|reply| IngestionRequest::Get { id, reply }).await
    }

    async fn list(&self) -> Result<Vec<Ingestion>, IngestionError> {
        self.request(|reply| IngestionRequest::List { reply }).await
    }
}

/// Handle to a running worker.
#[derive(Debug)]
pub struct IngestionWorkerHandle {
    join: JoinHandle<()>,
}

impl IngestionWorkerHandle {
    /// Stop the worker loop. Pending completions already scheduled still run.
    pub async fn shutdown(self) {
        self.join.abort();
        let _ = self.join.await;
    }
}

/// Background worker owning the ingestion records.
///
/// Each created job is stored as `processing` and answered immediately; a
/// detached task settles it after the configured delay.
pub struct IngestionWorker<S: Store<Ingestion>> {
    store: Arc<S>,
    config: IngestionWorkerConfig,
}

impl<S: Store<Ingestion> + 'static> IngestionWorker<S> {
    pub fn new(store: Arc<S>, config: IngestionWorkerConfig) -> Self {
        Self { store, config }
    }

    /// Start the worker on the current tokio runtime.
    pub fn spawn(self) -> (ChannelIngestionClient, IngestionWorkerHandle) {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let join = tokio::spawn(self.run(rx));
        (ChannelIngestionClient { tx }, IngestionWorkerHandle { join })
    }

    async fn run(self, mut rx: mpsc::Receiver<IngestionRequest>) {
        info!(worker = %self.config.name, "ingestion worker started");

        while let Some(request) = rx.recv().await {
            match request {
                IngestionRequest::Create {
                    document_id,
                    user_id,
                    reply,
                } => {
                    let _ = reply.send(self.start(document_id, user_id));
                }
                IngestionRequest::Get { id, reply } => {
                    let _ = reply.send(self.store.get(&id));
                }
                IngestionRequest::List { reply } => {
                    let _ = reply.send(self.store.list());
                }
            }
        }

        info!(worker = %self.config.name, "ingestion worker stopped");
    }

    fn start(&self, document_id: DocumentId, user_id: UserId) -> Result<Ingestion, IngestionError> {
        let ingestion = Ingestion::start(document_id, user_id);
        let stored = self.store.upsert_unless(ingestion.clone(), &|existing: &Ingestion| {
            existing.document_id == document_id
        });
        if !stored {
            return Err(IngestionError::DuplicateDocument(document_id));
        }

        info!(
            worker = %self.config.name,
            ingestion_id = %ingestion.id,
            document_id = %document_id,
            "ingestion started"
        );
        self.schedule_completion(ingestion.id);
        Ok(ingestion)
    }

    fn schedule_completion(&self, id: IngestionId) {
        let store = Arc::clone(&self.store);
        let delay = self.config.completion_delay;
        let success_rate = self.config.success_rate.clamp(0.0, 1.0);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let success = rand::thread_rng().gen_bool(success_rate);
            let Some(ingestion) = store.update(&id, &mut |ingestion: &mut Ingestion| ingestion.finish(success))
            else {
                debug!(ingestion_id = %id, "ingestion vanished before completion");
                return;
            };
            let document_id = ingestion.document_id;

            if success {
                info!(ingestion_id = %id, document_id = %document_id, "ingestion completed");
            } else {
                warn!(ingestion_id = %id, document_id = %document_id, "ingestion failed");
            }
        });
    }
}
