//! Generation labels and store naming.
//!
//! A generation is the immutable version label for one deployment's set of
//! cached stores. Store names are derived as `<generation>-<class>`, which
//! makes generation-scoped garbage collection a plain name-ownership check.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque version identifier for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generation(String);

impl Generation {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Durable store name for a content class under this generation.
    pub fn store_name(&self, class: StoreClass) -> String {
        format!("{}-{}", self.0, class.as_str())
    }

    /// Whether a store name belongs to this generation's namespace.
    ///
    /// `seva-v2` owns `seva-v2-images` but not `seva-v1` or `seva-v10-images`.
    pub fn owns(&self, store_name: &str) -> bool {
        store_name == self.0 || store_name.strip_prefix(&self.0).is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical partition of the cache by content class.
///
/// Each class gets its own named store so eviction can be tuned per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreClass {
    /// General runtime content (documents, data, anything unclassified).
    Runtime,
    /// Image responses.
    Images,
    /// Map tiles.
    Tiles,
    /// Third-party CDN assets (UI libraries and the like).
    Vendor,
}

impl StoreClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreClass::Runtime => "runtime",
            StoreClass::Images => "images",
            StoreClass::Tiles => "tiles",
            StoreClass::Vendor => "vendor",
        }
    }
}

impl fmt::Display for StoreClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
