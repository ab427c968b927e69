//! Index reconciliation between the embedding width and the vector store.
//!
//! The [`IndexReconciler`] makes sure the collection that ingestion and
//! retrieval use was built for the current embedding width. When the width
//! changes (a different embedding model, say) the old collection is
//! released, dropped and recreated. If the store keeps reporting the dropped
//! collection past the timeout, a fresh collection named
//! `{configured}_{unix seconds}` is used instead and the rename is reported
//! through [`ReconcileAction::Renamed`].
//!
//! Reconciliation is destructive, so every call is serialized behind an
//! async mutex that the admin [`IndexReconciler::drop_collection`] shares.
//!
//! ```rust,ignore
//! let reconciler = IndexReconciler::new(store, embedder, ReconcilerConfig::new("documents"));
//! let outcome = reconciler.ensure_collection(None).await?;
//! println!("{} ({:?})", outcome.collection.name, outcome.action);
//! ```

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ReconcilerConfig;
use crate::document::CollectionSchema;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Text embedded to discover the embedding width.
pub const PROBE_TEXT: &str = "dim";

/// The collection currently used for ingestion and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCollection {
    pub name: String,
    pub dimensions: usize,
}

/// What [`IndexReconciler::ensure_collection`] had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// The collection already existed with the right width.
    Opened,
    /// The collection did not exist and was created.
    Created,
    /// The collection had another width and was dropped and recreated.
    Rebuilt,
    /// The old collection would not go away; `effective` is the
    /// configured name plus a timestamp and is now in use.
    Renamed { configured: String, effective: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub collection: ActiveCollection,
    pub action: ReconcileAction,
}

pub struct IndexReconciler {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: ReconcilerConfig,
    lock: Mutex<()>,
    active: RwLock<Option<ActiveCollection>>,
}

impl IndexReconciler {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: ReconcilerConfig,
    ) -> Self {
        Self { store, embedder, config, lock: Mutex::new(()), active: RwLock::new(None) }
    }

    /// The configured collection name.
    pub fn configured_name(&self) -> &str {
        &self.config.collection_name
    }

    /// The collection in use, if reconciliation has run.
    pub async fn active_collection(&self) -> Option<ActiveCollection> {
        self.active.read().await.clone()
    }

    /// Reconcile the collection with `target_dim`, probing the embedder when `None`.
    pub async fn ensure_collection(&self, target_dim: Option<usize>) -> Result<ReconcileOutcome> {
        let _guard = self.lock.lock().await;
        self.reconcile_locked(target_dim).await
    }

    /// The active collection, reconciling first if none is active yet.
    pub async fn active_or_ensure(&self) -> Result<ActiveCollection> {
        if let Some(active) = self.active_collection().await {
            return Ok(active);
        }
        let _guard = self.lock.lock().await;
        // Another caller may have reconciled while we waited.
        if let Some(active) = self.active_collection().await {
            return Ok(active);
        }
        Ok(self.reconcile_locked(None).await?.collection)
    }

    /// Release then drop a collection. Dropping the active collection
    /// makes the next ingestion reconcile again.
    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        if let Err(e) = self.store.release_collection(name).await {
            debug!(collection = name, error = %e, "release before drop failed, continuing");
        }
        self.store.drop_collection(name).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to drop collection");
            e
        })?;

        let mut active = self.active.write().await;
        if active.as_ref().is_some_and(|a| a.name == name) {
            *active = None;
        }
        info!(collection = name, "collection dropped");
        Ok(())
    }

    async fn probe_dimensions(&self) -> Result<usize> {
        let vector = self.embedder.embed(PROBE_TEXT).await?;
        if vector.is_empty() {
            return Err(RagError::ConfigError(format!(
                "embedding provider '{}' returned an empty probe vector",
                self.embedder.name()
            )));
        }
        debug!(provider = self.embedder.name(), dimensions = vector.len(), "probed embedding width");
        Ok(vector.len())
    }

    async fn reconcile_locked(&self, target_dim: Option<usize>) -> Result<ReconcileOutcome> {
        let dimensions = match target_dim {
            Some(0) => {
                return Err(RagError::ConfigError("collection width must be non-zero".to_string()));
            }
            Some(d) => d,
            None => self.probe_dimensions().await?,
        };

        // After a rename the effective name is the one to open or drop.
        let name = self
            .active_collection()
            .await
            .map(|a| a.name)
            .unwrap_or_else(|| self.config.collection_name.clone());

        let existed = self.store.has_collection(&name).await?;
        let schema = CollectionSchema::new(name.clone(), dimensions);

        let (name, action) = match self.store.create_collection(&schema).await {
            Ok(()) if existed => (name, ReconcileAction::Opened),
            Ok(()) => (name, ReconcileAction::Created),
            Err(RagError::SchemaMismatch { actual, .. }) => {
                warn!(collection = %name, expected = dimensions, actual, "collection width changed, rebuilding");
                self.rebuild(&name, dimensions).await?
            }
            Err(e) => {
                error!(collection = %name, error = %e, "failed to open collection");
                return Err(e);
            }
        };

        let collection = ActiveCollection { name, dimensions };
        *self.active.write().await = Some(collection.clone());
        info!(collection = %collection.name, dimensions, action = ?action, "collection ready");
        Ok(ReconcileOutcome { collection, action })
    }

    async fn rebuild(&self, name: &str, dimensions: usize) -> Result<(String, ReconcileAction)> {
        if let Err(e) = self.store.release_collection(name).await {
            debug!(collection = name, error = %e, "release before drop failed, continuing");
        }
        self.store.drop_collection(name).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to drop mismatched collection");
            e
        })?;

        if self.wait_until_absent(name).await? {
            self.store.create_collection(&CollectionSchema::new(name, dimensions)).await?;
            return Ok((name.to_string(), ReconcileAction::Rebuilt));
        }

        // The suffix always goes on the configured name, never on an
        // earlier rename. Within the same second, fall back to millis.
        let configured = &self.config.collection_name;
        let now = Utc::now();
        let mut effective = format!("{configured}_{}", now.timestamp());
        if effective == name {
            effective = format!("{configured}_{}", now.timestamp_millis());
        }
        warn!(
            configured = %configured,
            dropped = name,
            effective = %effective,
            timeout_ms = self.config.drop_timeout.as_millis() as u64,
            "dropped collection still present, switching to a new collection name"
        );
        self.store.create_collection(&CollectionSchema::new(effective.clone(), dimensions)).await?;
        Ok((
            effective.clone(),
            ReconcileAction::Renamed { configured: configured.clone(), effective },
        ))
    }

    /// Poll until the store no longer reports `name`. `false` on timeout.
    async fn wait_until_absent(&self, name: &str) -> Result<bool> {
        let deadline = Instant::now() + self.config.drop_timeout;
        loop {
            if !self.store.has_collection(name).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
