//! The single entry point for outgoing retrieval requests.
//!
//! Applies the exclusion rules, classifies what remains, and delegates to
//! the routed strategy. Nothing throws past this boundary: every path,
//! including excluded requests whose direct fetch fails, terminates in a
//! returned response.

use std::sync::Arc;

use sevacache_core::{AppConfig, Error, StoreRegistry};

use crate::request::{Exclusions, Intercepted};
use crate::response::{ServedResponse, generic_unavailable};
use crate::selector::{Selector, StrategyKind};
use crate::strategy::StrategyRunner;
use crate::transport::{FetchRequest, Transport};

pub struct RequestInterceptor {
    exclusions: Exclusions,
    selector: Selector,
    runner: StrategyRunner,
    transport: Arc<dyn Transport>,
}

impl RequestInterceptor {
    pub fn new(config: &AppConfig, registry: StoreRegistry, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        let origin = url::Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let shell_url = origin
            .join(&config.shell_path)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self {
            exclusions: Exclusions::from_config(config),
            selector: Selector::from_config(config),
            runner: StrategyRunner::new(Arc::clone(&transport), registry, shell_url),
            transport,
        })
    }

    /// Handle one outgoing request. Infallible by contract.
    pub async fn handle(&self, req: &Intercepted) -> ServedResponse {
        if self.exclusions.is_excluded(req) {
            tracing::debug!(url = %req.url, method = %req.method, "excluded, passing through");
            return self.pass_through(req).await;
        }

        let route = self.selector.classify(req);
        tracing::debug!(url = %req.url, strategy = ?route.strategy, class = ?route.class, "routed");

        if route.strategy == StrategyKind::NetworkOnly {
            return self.pass_through(req).await;
        }

        self.runner.run(route, req).await
    }

    async fn pass_through(&self, req: &Intercepted) -> ServedResponse {
        match self
            .transport
            .fetch(&FetchRequest::with_method(&req.method, req.url.clone()))
            .await
        {
            Ok(resp) => resp.into(),
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "pass-through fetch failed");
                generic_unavailable()
            }
        }
    }
}
