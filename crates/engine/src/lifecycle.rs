//! Generation lifecycle: installation, activation, garbage collection.
//!
//! `Uninitialized -> Installing -> Installed -> Activating -> Active`.
//!
//! Installing populates the current generation's stores with the critical
//! asset set (any failure aborts the transition; the prior generation stays
//! current) and best-effort optional assets. Activating deletes every store
//! the current generation does not own, claims interception, and broadcasts
//! the update to connected instances.

use std::sync::{Arc, RwLock};

use url::Url;

use sevacache_core::{AppConfig, Error, ResponseRecord, StoreClass, StoreRegistry};
use sevacache_core::store::key::request_key;

use crate::hub::{ClientHub, ClientMessage};
use crate::transport::{FetchRequest, Transport};

/// Lifecycle state. Transitions only move forward within one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Installing,
    Installed,
    Activating,
    Active,
}

/// Owns generation transitions; the only component permitted to delete a
/// store.
#[derive(Clone)]
pub struct LifecycleManager {
    registry: StoreRegistry,
    transport: Arc<dyn Transport>,
    hub: ClientHub,
    origin: Url,
    critical_assets: Vec<String>,
    optional_assets: Vec<String>,
    store_cap: usize,
    phase: Arc<RwLock<Phase>>,
}

impl LifecycleManager {
    pub fn new(
        registry: StoreRegistry, transport: Arc<dyn Transport>, hub: ClientHub, config: &AppConfig,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            registry,
            transport,
            hub,
            origin,
            critical_assets: config.critical_assets.clone(),
            optional_assets: config.optional_assets.clone(),
            store_cap: config.store_cap,
            phase: Arc::new(RwLock::new(Phase::Uninitialized)),
        })
    }

    pub fn phase(&self) -> Phase {
        *self.phase.read().expect("phase lock poisoned")
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.write().expect("phase lock poisoned") = phase;
    }

    /// Populate the current generation's stores.
    ///
    /// Critical assets are all-or-nothing: the first failure aborts, the
    /// new generation's partial store is discarded best-effort, and the
    /// phase stays at Installing. Optional assets fail individually without
    /// aborting. Re-running installation is idempotent; puts overwrite.
    pub async fn install(&self) -> Result<(), Error> {
        if matches!(self.phase(), Phase::Activating | Phase::Active) {
            return Err(Error::Lifecycle("already activated".to_string()));
        }
        self.set_phase(Phase::Installing);

        let store = self.registry.open(StoreClass::Runtime);
        tracing::info!(generation = %self.registry.generation(), "installing");

        for asset in &self.critical_assets {
            if let Err(e) = self.populate(&store, asset).await {
                tracing::error!(asset, error = %e, "critical asset failed, aborting install");
                if let Err(cleanup) = self.registry.delete_store(&store).await {
                    tracing::warn!(store, error = %cleanup, "failed to discard partial store");
                }
                return Err(Error::InstallFailed(format!("{asset}: {e}")));
            }
        }

        for asset in &self.optional_assets {
            if let Err(e) = self.populate(&store, asset).await {
                tracing::warn!(asset, error = %e, "optional asset failed, continuing");
            }
        }

        self.set_phase(Phase::Installed);
        tracing::info!(generation = %self.registry.generation(), "installed");
        Ok(())
    }

    /// Delete stale-generation stores, take over interception, notify
    /// connected instances. Cleanup failures are logged and never block.
    pub async fn activate(&self) -> Result<(), Error> {
        if self.phase() != Phase::Installed {
            return Err(Error::Lifecycle(format!("activate from {:?}", self.phase())));
        }
        self.set_phase(Phase::Activating);

        let generation = self.registry.generation().clone();
        match self.registry.list_store_names().await {
            Ok(names) => {
                for name in names {
                    if !generation.owns(&name) {
                        match self.registry.delete_store(&name).await {
                            Ok(count) => tracing::info!(store = name, records = count, "deleted stale store"),
                            Err(e) => tracing::warn!(store = name, error = %e, "stale store deletion failed"),
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not enumerate stores for garbage collection"),
        }

        for class in [StoreClass::Images, StoreClass::Tiles] {
            let store = self.registry.open(class);
            match self.registry.trim_store(&store, self.store_cap).await {
                Ok(0) => {}
                Ok(trimmed) => tracing::info!(store, trimmed, "trimmed store to cap"),
                Err(e) => tracing::warn!(store, error = %e, "trim failed"),
            }
        }

        self.set_phase(Phase::Active);
        let delivered = self
            .hub
            .broadcast(ClientMessage::GenerationUpdated { generation: generation.as_str().to_string() });
        tracing::info!(generation = %generation, clients = delivered, "active, interception taken over");
        Ok(())
    }

    /// Skip-wait semantics: promote the installed generation immediately
    /// instead of waiting for the previous generation's instances to
    /// retire. A no-op unless the phase is Installed.
    pub async fn skip_waiting(&self) -> Result<(), Error> {
        if self.phase() == Phase::Installed {
            self.activate().await
        } else {
            Ok(())
        }
    }

    async fn populate(&self, store: &str, asset: &str) -> Result<(), Error> {
        let url = self.origin.join(asset).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resp = self.transport.fetch(&FetchRequest::new(url.clone())).await?;
        if !resp.is_success() {
            return Err(Error::NotCacheable(resp.status));
        }
        let record = ResponseRecord::new(resp.status, resp.headers, resp.body.to_vec());
        let key = request_key("GET", url.as_str());
        self.registry.put(store, &key, &record).await
    }
}
