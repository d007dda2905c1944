pub mod conversation;
pub mod health;
pub mod remedy;

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Lenient JSON body: empty or malformed bodies yield `T::default()`, so the
/// handler reports the missing field instead of a parse error.
pub(crate) fn parse_lenient<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Ignoring unparseable request body: {}", e);
            T::default()
        }
    }
}

/// Present and non-empty.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
