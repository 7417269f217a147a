//! Request-identity key generation.

use sha2::{Digest, Sha256};

/// Compute the store key for a retrieval request.
///
/// Identity is method plus full URL (query included, fragment already
/// stripped by canonicalization).
pub fn request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
