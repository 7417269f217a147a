//! Fetch strategy execution.
//!
//! Each strategy implements the request -> response contract against the
//! store registry and the network transport: at most one foreground network
//! call, plus optionally one detached background refresh. A response is
//! stored only if its status indicates success, and a record is always
//! cloned before it is both stored and returned (copy-on-store).

use std::sync::Arc;

use url::Url;

use sevacache_core::{ResponseRecord, StoreClass, StoreRegistry};

use crate::request::{Destination, Intercepted};
use crate::response::{ServedResponse, generic_unavailable, offline_response, placeholder_image};
use crate::selector::{Route, StrategyKind};
use crate::transport::{CacheMode, FetchRequest, NetworkResponse, Transport};

/// What a network-preferring strategy serves when its whole fallback chain
/// is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureTail {
    /// Structured 503 with the explicit offline indicator (Network-First).
    Offline,
    /// Generic 503 (Network-with-Fallback).
    Generic,
}

/// Executes the classified strategy for one request.
///
/// Stateless apart from the shared registry; safe to call concurrently from
/// independent request executions.
#[derive(Clone)]
pub struct StrategyRunner {
    transport: Arc<dyn Transport>,
    registry: StoreRegistry,
    shell_url: Url,
}

impl StrategyRunner {
    pub fn new(transport: Arc<dyn Transport>, registry: StoreRegistry, shell_url: Url) -> Self {
        Self { transport, registry, shell_url }
    }

    /// Run the routed strategy. Never returns an error; every failure path
    /// terminates in a served response.
    pub async fn run(&self, route: Route, req: &Intercepted) -> ServedResponse {
        match route.strategy {
            StrategyKind::CacheFirst => {
                let store = self.registry.open(route.class.unwrap_or(StoreClass::Runtime));
                self.cache_first(req, &store, route.class).await
            }
            StrategyKind::NetworkFirst => {
                let store = self.registry.open(route.class.unwrap_or(StoreClass::Runtime));
                self.network_preferred(req, &store, CacheMode::NoCache, FailureTail::Offline)
                    .await
            }
            StrategyKind::NetworkWithFallback => {
                let store = self.registry.open(route.class.unwrap_or(StoreClass::Runtime));
                self.network_preferred(req, &store, CacheMode::Default, FailureTail::Generic)
                    .await
            }
            StrategyKind::NetworkOnly => match self.transport.fetch(&FetchRequest::new(req.url.clone())).await {
                Ok(resp) => resp.into(),
                Err(e) => {
                    tracing::debug!(url = %req.url, error = %e, "network-only fetch failed");
                    generic_unavailable()
                }
            },
        }
    }

    /// Cache-First: stored record wins, with an unconditional detached
    /// refresh (stale-while-revalidate). On a miss, one foreground fetch;
    /// if that fails, a generated substitute.
    async fn cache_first(&self, req: &Intercepted, store: &str, class: Option<StoreClass>) -> ServedResponse {
        let key = req.key();

        match self.registry.get(store, &key).await {
            Ok(Some(record)) => {
                self.spawn_revalidate(store.to_string(), req.clone());
                return record.into();
            }
            Ok(None) => {}
            Err(e) => {
                // corrupt entry: treat as a miss, the refresh overwrites it
                tracing::warn!(store, url = %req.url, error = %e, "store read failed");
            }
        }

        match self.transport.fetch(&FetchRequest::new(req.url.clone())).await {
            Ok(resp) if resp.is_success() => {
                self.store_copy(store, &key, &resp).await;
                resp.into()
            }
            Ok(resp) => resp.into(),
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "cache-first miss and network failed");
                if image_class(req, class) { placeholder_image() } else { offline_response() }
            }
        }
    }

    /// Network-First and Network-with-Fallback share this shape; they
    /// differ only in the cache mode of the network call and the tail of
    /// the fallback chain.
    async fn network_preferred(
        &self, req: &Intercepted, store: &str, mode: CacheMode, tail: FailureTail,
    ) -> ServedResponse {
        let key = req.key();
        let fetch = FetchRequest { mode, ..FetchRequest::new(req.url.clone()) };

        match self.transport.fetch(&fetch).await {
            Ok(resp) if resp.is_success() => {
                self.store_copy(store, &key, &resp).await;
                return resp.into();
            }
            // non-success responses are returned as-is but never cached
            Ok(resp) => return resp.into(),
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "network fetch failed, walking fallback chain");
            }
        }

        match self.registry.get(store, &key).await {
            Ok(Some(record)) => return record.into(),
            Ok(None) => {}
            Err(e) => tracing::warn!(store, url = %req.url, error = %e, "store read failed"),
        }

        if req.is_navigation() {
            if let Some(shell) = self.shell_record().await {
                return shell.into();
            }
        }

        match tail {
            FailureTail::Offline => offline_response(),
            FailureTail::Generic => generic_unavailable(),
        }
    }

    /// Detached background refresh. The caller never waits on this; its
    /// outcome is observable only through the store's subsequent state.
    fn spawn_revalidate(&self, store: String, req: Intercepted) {
        let transport = Arc::clone(&self.transport);
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let key = req.key();
            match transport.fetch(&FetchRequest::new(req.url.clone())).await {
                Ok(resp) if resp.is_success() => {
                    let record = ResponseRecord::new(resp.status, resp.headers, resp.body.to_vec());
                    if let Err(e) = registry.put(&store, &key, &record).await {
                        tracing::debug!(store, url = %req.url, error = %e, "revalidation write failed");
                    }
                }
                Ok(resp) => {
                    tracing::debug!(url = %req.url, status = resp.status, "revalidation returned non-success");
                }
                Err(e) => {
                    tracing::debug!(url = %req.url, error = %e, "revalidation fetch failed");
                }
            }
        });
    }

    /// Capture a successful response into the store without consuming the
    /// response itself. Write failures degrade to serving without caching.
    async fn store_copy(&self, store: &str, key: &str, resp: &NetworkResponse) {
        let record = ResponseRecord::new(resp.status, resp.headers.clone(), resp.body.to_vec());
        if let Err(e) = self.registry.put(store, key, &record).await {
            tracing::warn!(store, error = %e, "store write failed");
        }
    }

    /// Cached application shell document, if installation populated it.
    async fn shell_record(&self) -> Option<ResponseRecord> {
        let store = self.registry.open(StoreClass::Runtime);
        let key = sevacache_core::store::key::request_key("GET", self.shell_url.as_str());
        match self.registry.get(&store, &key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "shell lookup failed");
                None
            }
        }
    }
}

fn image_class(req: &Intercepted, class: Option<StoreClass>) -> bool {
    req.destination == Destination::Image || matches!(class, Some(StoreClass::Images | StoreClass::Tiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use sevacache_core::{Error, Generation, StoreDb};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted transport: per-URL queues of outcomes, records every call.
    struct ScriptedTransport {
        outcomes: Mutex<HashMap<String, VecDeque<Scripted>>>,
        calls: Mutex<Vec<String>>,
    }

    enum Scripted {
        Ok { status: u16, body: &'static str },
        Fail,
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self { outcomes: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()) }
        }

        fn script(&self, url: &str, outcome: Scripted) {
            self.outcomes
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(outcome);
        }

        fn calls_to(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn fetch(&self, req: &FetchRequest) -> Result<NetworkResponse, Error> {
            self.calls.lock().unwrap().push(req.url.to_string());
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .get_mut(req.url.as_str())
                .and_then(|q| q.pop_front());
            match outcome {
                Some(Scripted::Ok { status, body }) => Ok(NetworkResponse {
                    status,
                    headers: vec![("content-type".to_string(), "text/plain".to_string())],
                    body: Bytes::from_static(body.as_bytes()),
                }),
                Some(Scripted::Fail) | None => Err(Error::Network("connection refused".to_string())),
            }
        }
    }

    async fn runner() -> (Arc<ScriptedTransport>, StrategyRunner, StoreRegistry) {
        let db = StoreDb::open_in_memory().await.unwrap();
        let registry = StoreRegistry::new(db, Generation::new("seva-v2"));
        let transport = Arc::new(ScriptedTransport::new());
        let shell_url = Url::parse("https://www.seva.org/index.html").unwrap();
        let runner = StrategyRunner::new(transport.clone(), registry.clone(), shell_url);
        (transport, runner, registry)
    }

    fn route(strategy: StrategyKind, class: StoreClass) -> Route {
        Route { strategy, class: Some(class) }
    }

    #[tokio::test]
    async fn test_cache_first_hit_serves_stored_and_revalidates_once() {
        let (transport, runner, registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/logo.png", Destination::Image).unwrap();
        let store = registry.open(StoreClass::Images);
        registry
            .put(&store, &req.key(), &ResponseRecord::new(200, vec![], b"old-bytes".to_vec()))
            .await
            .unwrap();
        transport.script(req.url.as_str(), Scripted::Ok { status: 200, body: "new-bytes" });

        let served = runner.run(route(StrategyKind::CacheFirst, StoreClass::Images), &req).await;
        assert_eq!(served.body, Bytes::from_static(b"old-bytes"));

        // let the detached refresh land
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.calls_to(req.url.as_str()), 1);
        let refreshed = registry.get(&store, &req.key()).await.unwrap().unwrap();
        assert_eq!(refreshed.body, b"new-bytes");
    }

    #[tokio::test]
    async fn test_cache_first_revalidation_failure_never_surfaces() {
        let (transport, runner, registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/logo.png", Destination::Image).unwrap();
        let store = registry.open(StoreClass::Images);
        registry
            .put(&store, &req.key(), &ResponseRecord::new(200, vec![], b"stored".to_vec()))
            .await
            .unwrap();
        transport.script(req.url.as_str(), Scripted::Fail);

        let served = runner.run(route(StrategyKind::CacheFirst, StoreClass::Images), &req).await;
        assert_eq!(served.status, 200);
        assert_eq!(served.body, Bytes::from_static(b"stored"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.calls_to(req.url.as_str()), 1);
        // stored record untouched by the failed refresh
        let record = registry.get(&store, &req.key()).await.unwrap().unwrap();
        assert_eq!(record.body, b"stored");
    }

    #[tokio::test]
    async fn test_cache_first_miss_fetches_and_stores() {
        let (transport, runner, registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/app.css", Destination::Style).unwrap();
        transport.script(req.url.as_str(), Scripted::Ok { status: 200, body: "body{}" });

        let served = runner.run(route(StrategyKind::CacheFirst, StoreClass::Runtime), &req).await;
        assert_eq!(served.body, Bytes::from_static(b"body{}"));

        let store = registry.open(StoreClass::Runtime);
        let record = registry.get(&store, &req.key()).await.unwrap().unwrap();
        assert_eq!(record.body, b"body{}");
    }

    #[tokio::test]
    async fn test_cache_first_image_miss_offline_serves_placeholder_without_store_write() {
        let (_transport, runner, registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/photo.jpg", Destination::Image).unwrap();

        let served = runner.run(route(StrategyKind::CacheFirst, StoreClass::Images), &req).await;
        assert_eq!(served.status, 203);
        assert!(served.is_substitute());

        let store = registry.open(StoreClass::Images);
        assert_eq!(registry.count(&store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_non_image_miss_offline_serves_offline_response() {
        let (_transport, runner, _registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/app.js", Destination::Script).unwrap();

        let served = runner.run(route(StrategyKind::CacheFirst, StoreClass::Runtime), &req).await;
        assert_eq!(served.status, 503);
        assert_eq!(served.header("x-cache-substitute"), Some("offline"));
    }

    #[tokio::test]
    async fn test_network_first_success_stores_exactly_that_response() {
        let (transport, runner, registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/feed.json", Destination::Other).unwrap();
        transport.script(req.url.as_str(), Scripted::Ok { status: 200, body: "{\"a\":1}" });

        let served = runner.run(route(StrategyKind::NetworkFirst, StoreClass::Runtime), &req).await;
        assert_eq!(served.body, Bytes::from_static(b"{\"a\":1}"));

        let store = registry.open(StoreClass::Runtime);
        let record = registry.get(&store, &req.key()).await.unwrap().unwrap();
        assert_eq!(record.body, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_network_first_failure_returns_prior_record() {
        let (transport, runner, registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/feed.json", Destination::Other).unwrap();
        let store = registry.open(StoreClass::Runtime);
        registry
            .put(&store, &req.key(), &ResponseRecord::new(200, vec![], b"prior".to_vec()))
            .await
            .unwrap();
        transport.script(req.url.as_str(), Scripted::Fail);

        let served = runner.run(route(StrategyKind::NetworkFirst, StoreClass::Runtime), &req).await;
        assert_eq!(served.status, 200);
        assert_eq!(served.body, Bytes::from_static(b"prior"));
    }

    #[tokio::test]
    async fn test_network_first_non_success_returned_but_not_cached() {
        let (transport, runner, registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/feed.json", Destination::Other).unwrap();
        transport.script(req.url.as_str(), Scripted::Ok { status: 500, body: "boom" });

        let served = runner.run(route(StrategyKind::NetworkFirst, StoreClass::Runtime), &req).await;
        assert_eq!(served.status, 500);

        let store = registry.open(StoreClass::Runtime);
        assert_eq!(registry.count(&store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_navigation_failure_serves_shell() {
        let (transport, runner, registry) = runner().await;
        let store = registry.open(StoreClass::Runtime);
        let shell_key =
            sevacache_core::store::key::request_key("GET", "https://www.seva.org/index.html");
        registry
            .put(&store, &shell_key, &ResponseRecord::new(200, vec![], b"<html>shell</html>".to_vec()))
            .await
            .unwrap();

        let req = Intercepted::get("https://www.seva.org/donate", Destination::Document).unwrap();
        transport.script(req.url.as_str(), Scripted::Fail);

        let served = runner
            .run(route(StrategyKind::NetworkWithFallback, StoreClass::Runtime), &req)
            .await;
        assert_eq!(served.body, Bytes::from_static(b"<html>shell</html>"));
    }

    #[tokio::test]
    async fn test_non_navigation_failure_no_record_ends_in_offline_tail() {
        let (transport, runner, _registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/feed.json", Destination::Other).unwrap();
        transport.script(req.url.as_str(), Scripted::Fail);

        let served = runner.run(route(StrategyKind::NetworkFirst, StoreClass::Runtime), &req).await;
        assert_eq!(served.status, 503);
        assert_eq!(served.header("x-cache-substitute"), Some("offline"));
    }

    #[tokio::test]
    async fn test_network_with_fallback_generic_tail() {
        let (transport, runner, _registry) = runner().await;
        let req = Intercepted::get("https://www.seva.org/misc", Destination::Other).unwrap();
        transport.script(req.url.as_str(), Scripted::Fail);

        let served = runner
            .run(route(StrategyKind::NetworkWithFallback, StoreClass::Runtime), &req)
            .await;
        assert_eq!(served.status, 503);
        assert_eq!(served.header("x-cache-substitute"), Some("unavailable"));
    }
}
