// ============================================================================
// Event Store Errors
// ============================================================================
//
// Every failure of the store surfaces through this enum. Nothing is retried
// or translated locally; backing-store errors keep their own source.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Concurrency conflict on aggregate {aggregate_id} at version {version}")]
    ConcurrencyConflict { aggregate_id: String, version: i64 },

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backing store error: {0:#}")]
    Backend(anyhow::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl EventStoreError {
    /// Wrap a driver error, keeping it as the source
    pub fn backend<E>(error: E, context: &'static str) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(anyhow::Error::new(error).context(context))
    }

    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, EventStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_aggregate_and_version() {
        let error = EventStoreError::ConcurrencyConflict {
            aggregate_id: "order-1".to_string(),
            version: 4,
        };

        assert!(error.is_concurrency_conflict());
        assert_eq!(
            error.to_string(),
            "Concurrency conflict on aggregate order-1 at version 4"
        );
    }

    #[test]
    fn test_backend_error_keeps_context_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "node timed out");
        let error = EventStoreError::backend(io, "Failed to execute batch");

        let message = error.to_string();
        assert!(message.contains("Failed to execute batch"));
        assert!(message.contains("node timed out"));
        assert!(!error.is_concurrency_conflict());
    }
}
