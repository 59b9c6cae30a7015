use kc_core::errors::*;

// Errors that callers of the cache are expected to inspect.  Everything crosses API boundaries
// as an anyhow::Error, so use `downcast_ref::<CacheError>()` (or the helpers below) to tell
// them apart.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    #[error("index \"{0}\" does not exist")]
    IndexNotFound(String),

    #[error("indexer \"{0}\" is already registered")]
    IndexerConflict(String),

    #[error("relist of {0} failed; cache contents left unchanged")]
    SyncFailed(String),
}

impl CacheError {
    pub fn not_found(kind: &str, name: &str) -> anyhow::Error {
        anyhow!(CacheError::NotFound { kind: kind.into(), name: name.into() })
    }

    pub fn index_not_found(index_name: &str) -> anyhow::Error {
        anyhow!(CacheError::IndexNotFound(index_name.into()))
    }

    pub fn indexer_conflict(index_name: &str) -> anyhow::Error {
        anyhow!(CacheError::IndexerConflict(index_name.into()))
    }
}

pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<CacheError>(), Some(CacheError::NotFound { .. }))
}

pub fn is_index_not_found(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<CacheError>(), Some(CacheError::IndexNotFound(_)))
}

pub fn is_sync_failed(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<CacheError>(), Some(CacheError::SyncFailed(_)))
}
