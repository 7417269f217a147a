//! Strategy selection as an ordered, table-driven classification.
//!
//! The routing logic is an explicit ordered table of (matcher, strategy,
//! store-class) rules evaluated top to bottom, first match wins. The table
//! is pure data built once from configuration; classification is a
//! stateless function recomputed per request.

use sevacache_core::{AppConfig, StoreClass};

use crate::request::{Destination, HostMatch, Intercepted};

/// The fetch/cache policies a request can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Serve stored content immediately, refresh asynchronously.
    CacheFirst,
    /// Prefer a live fetch (forcing end-to-end revalidation), fall back to
    /// stored content.
    NetworkFirst,
    /// Like Network-First but without the no-cache directive and with a
    /// generic failure tail. The default policy.
    NetworkWithFallback,
    /// Bypass the cache entirely.
    NetworkOnly,
}

/// Where a classified request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub strategy: StrategyKind,
    /// Absent for NetworkOnly, which touches no store.
    pub class: Option<StoreClass>,
}

/// Request attribute predicate for one table row.
#[derive(Debug, Clone)]
enum Matcher {
    DestinationIs(Destination),
    HostIn(Vec<String>),
    ExtensionIn(Vec<String>),
    Any,
}

#[derive(Debug, Clone)]
struct RouteRule {
    matcher: Matcher,
    strategy: StrategyKind,
    class: Option<StoreClass>,
}

/// Pure classification over the ordered rule table.
#[derive(Debug, Clone)]
pub struct Selector {
    rules: Vec<RouteRule>,
    host_match: HostMatch,
}

impl Selector {
    /// Build the precedence table:
    ///
    /// 1. image destination -> Cache-First, images store
    /// 2. map-tile host -> Cache-First, tiles store
    /// 3. script-CDN host -> Cache-First, vendor store
    /// 4. extension classes -> Cache-First / Network-First / network-only
    /// 5. default -> Network-with-Fallback, runtime store
    pub fn from_config(config: &AppConfig) -> Self {
        let rules = vec![
            RouteRule {
                matcher: Matcher::DestinationIs(Destination::Image),
                strategy: StrategyKind::CacheFirst,
                class: Some(StoreClass::Images),
            },
            RouteRule {
                matcher: Matcher::HostIn(config.tile_hosts.clone()),
                strategy: StrategyKind::CacheFirst,
                class: Some(StoreClass::Tiles),
            },
            RouteRule {
                matcher: Matcher::HostIn(config.cdn_hosts.clone()),
                strategy: StrategyKind::CacheFirst,
                class: Some(StoreClass::Vendor),
            },
            RouteRule {
                matcher: Matcher::ExtensionIn(config.cache_first_exts.clone()),
                strategy: StrategyKind::CacheFirst,
                class: Some(StoreClass::Runtime),
            },
            RouteRule {
                matcher: Matcher::ExtensionIn(config.network_first_exts.clone()),
                strategy: StrategyKind::NetworkFirst,
                class: Some(StoreClass::Runtime),
            },
            RouteRule {
                matcher: Matcher::ExtensionIn(config.bypass_exts.clone()),
                strategy: StrategyKind::NetworkOnly,
                class: None,
            },
            RouteRule {
                matcher: Matcher::Any,
                strategy: StrategyKind::NetworkWithFallback,
                class: Some(StoreClass::Runtime),
            },
        ];

        Self { rules, host_match: HostMatch::from_config(&config.host_match) }
    }

    /// Classify a request. The trailing Any rule guarantees a match.
    pub fn classify(&self, req: &Intercepted) -> Route {
        for rule in &self.rules {
            if self.matches(&rule.matcher, req) {
                return Route { strategy: rule.strategy, class: rule.class };
            }
        }
        Route { strategy: StrategyKind::NetworkWithFallback, class: Some(StoreClass::Runtime) }
    }

    fn matches(&self, matcher: &Matcher, req: &Intercepted) -> bool {
        match matcher {
            Matcher::DestinationIs(dest) => req.destination == *dest,
            Matcher::HostIn(hosts) => req
                .url
                .host_str()
                .is_some_and(|host| hosts.iter().any(|p| self.host_match.matches(host, p))),
            Matcher::ExtensionIn(exts) => req.extension().is_some_and(|ext| exts.contains(&ext)),
            Matcher::Any => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> Selector {
        let config = AppConfig {
            tile_hosts: vec!["tile.openstreetmap.org".into()],
            cdn_hosts: vec!["cdn.jsdelivr.net".into()],
            bypass_exts: vec!["php".into()],
            ..Default::default()
        };
        Selector::from_config(&config)
    }

    fn get(url: &str, dest: Destination) -> Intercepted {
        Intercepted::get(url, dest).unwrap()
    }

    #[test]
    fn test_image_destination_wins_over_host() {
        let sel = selector();
        let route = sel.classify(&get("https://tile.openstreetmap.org/1/2/3.html", Destination::Image));
        assert_eq!(route.strategy, StrategyKind::CacheFirst);
        assert_eq!(route.class, Some(StoreClass::Images));
    }

    #[test]
    fn test_tile_host() {
        let sel = selector();
        let route = sel.classify(&get("https://tile.openstreetmap.org/1/2/3", Destination::Other));
        assert_eq!(route.strategy, StrategyKind::CacheFirst);
        assert_eq!(route.class, Some(StoreClass::Tiles));
    }

    #[test]
    fn test_cdn_host() {
        let sel = selector();
        let route = sel.classify(&get("https://cdn.jsdelivr.net/npm/lib@1/dist/lib.min.js", Destination::Script));
        assert_eq!(route.strategy, StrategyKind::CacheFirst);
        assert_eq!(route.class, Some(StoreClass::Vendor));
    }

    #[test]
    fn test_extension_cache_first() {
        let sel = selector();
        let route = sel.classify(&get("https://www.seva.org/app/styles.css", Destination::Style));
        assert_eq!(route.strategy, StrategyKind::CacheFirst);
        assert_eq!(route.class, Some(StoreClass::Runtime));
    }

    #[test]
    fn test_extension_network_first() {
        let sel = selector();
        let route = sel.classify(&get("https://www.seva.org/data/feed.json", Destination::Other));
        assert_eq!(route.strategy, StrategyKind::NetworkFirst);
        assert_eq!(route.class, Some(StoreClass::Runtime));
    }

    #[test]
    fn test_extension_bypass() {
        let sel = selector();
        let route = sel.classify(&get("https://www.seva.org/backend/submit.php", Destination::Other));
        assert_eq!(route.strategy, StrategyKind::NetworkOnly);
        assert_eq!(route.class, None);
    }

    #[test]
    fn test_default_fallback() {
        let sel = selector();
        let route = sel.classify(&get("https://www.seva.org/donate", Destination::Document));
        assert_eq!(route.strategy, StrategyKind::NetworkWithFallback);
        assert_eq!(route.class, Some(StoreClass::Runtime));
    }

    #[test]
    fn test_prefix_host_match() {
        let config = AppConfig {
            tile_hosts: vec!["tile.".into()],
            host_match: "prefix".into(),
            ..Default::default()
        };
        let sel = Selector::from_config(&config);
        let route = sel.classify(&get("https://tile.example.net/1/2/3", Destination::Other));
        assert_eq!(route.class, Some(StoreClass::Tiles));
    }
}
