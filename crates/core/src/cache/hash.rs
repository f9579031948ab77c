//! Request keys for exact-match lookups.

use sha2::{Digest, Sha256};

/// Compute the lookup key of a request from its method and fragment-free URL.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
