//! Caching-strategy engine for sevacache.
//!
//! This crate sits between an application's outgoing retrieval requests and
//! the network. It classifies each request, routes it to a fetch/cache
//! strategy, manages the versioned-store lifecycle across deployments, and
//! revalidates cached entries in the background without blocking callers.

pub mod control;
pub mod hub;
pub mod interceptor;
pub mod lifecycle;
pub mod notify;
pub mod request;
pub mod response;
pub mod selector;
pub mod strategy;
pub mod transport;

pub use control::{ControlCommand, run_control_loop};
pub use hub::{ClientHub, ClientMessage};
pub use interceptor::RequestInterceptor;
pub use lifecycle::{LifecycleManager, Phase};
pub use request::{Destination, Exclusions, HostMatch, Intercepted, UrlError, canonicalize};
pub use response::{SUBSTITUTE_HEADER, ServedResponse};
pub use selector::{Route, Selector, StrategyKind};
pub use strategy::StrategyRunner;
pub use transport::{CacheMode, FetchRequest, HttpTransport, NetworkResponse, Transport, TransportConfig};
