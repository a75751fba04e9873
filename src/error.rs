use thiserror::Error;

use crate::models::Store;

/// Failure taxonomy for upstream catalog calls.
///
/// Everything except `Validation` is recovered internally: the transport
/// cascade advances on timeouts, schema mismatches, empty responses and
/// barcode mismatches, and the aggregator treats a fully-failed store as
/// "zero results". Only malformed caller input surfaces to the caller.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{store} timed out during {transport}")]
    UpstreamTimeout {
        store: Store,
        transport: &'static str,
    },

    #[error("{store} returned an unexpected payload shape: {detail}")]
    UpstreamSchemaMismatch { store: Store, detail: String },

    #[error("{store} returned no usable items")]
    UpstreamEmpty { store: Store },

    #[error("barcode mismatch: requested {requested}, upstream returned {received}")]
    BarcodeMismatch { requested: String, received: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CatalogError {
    /// Whether the cascade may advance to the next transport/strategy after
    /// this error instead of surfacing it.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CatalogError::Validation(_))
    }

    /// Not-found semantics at the lookup boundary (maps to HTTP 404).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::UpstreamEmpty { .. } | CatalogError::BarcodeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_the_only_terminal_error() {
        assert!(!CatalogError::Validation("empty query".into()).is_recoverable());
        assert!(CatalogError::UpstreamEmpty {
            store: Store::Walmart
        }
        .is_recoverable());
        assert!(CatalogError::BarcodeMismatch {
            requested: "7441".into(),
            received: "7442".into(),
        }
        .is_recoverable());
    }

    #[test]
    fn lookup_misses_map_to_not_found() {
        assert!(CatalogError::UpstreamEmpty {
            store: Store::Automercado
        }
        .is_not_found());
        assert!(!CatalogError::Validation("bad".into()).is_not_found());
    }
}
