use thiserror::Error;

/// Errors that can occur when generating identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    /// The node id does not fit in the node bits.
    #[error("Node id {node_id} out of range (max {max})")]
    InvalidNodeId { node_id: u16, max: u16 },

    /// The clock went backwards further than the generator is willing to wait.
    #[error("Clock moved backwards by {drift_ms}ms; refusing to generate ids")]
    ClockMovedBackwards { drift_ms: u64 },

    /// The clock reads earlier than the generator epoch.
    #[error("Clock reads before the generator epoch")]
    ClockBeforeEpoch,

    /// The timestamp no longer fits in the timestamp bits.
    #[error("Timestamp exhausted the generator's bit range")]
    TimestampOverflow,
}

/// Result type for id generation.
pub type Result<T> = std::result::Result<T, IdError>;
