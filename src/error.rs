use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, VeredaError>;

/// Failures reported by indexes, graphs, queues and traversals.
///
/// Every variant leaves the structure it came from unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VeredaError {
    /// A unique index already holds an equal key.
    #[error("an item with an equal key is already indexed")]
    DuplicateKey,
    /// The vertex is already queued in the target queue.
    #[error("vertex is already a member of this queue")]
    AlreadyMember,
    /// The vertex is not queued where the operation expected it.
    #[error("vertex is not a member of this queue")]
    NotMember,
    /// The vertex handle is stale or belongs to another graph.
    #[error("unknown vertex")]
    UnknownVertex,
    /// The edge handle is stale or belongs to another graph.
    #[error("unknown edge")]
    UnknownEdge,
    /// The queue handle is stale or belongs to another pool.
    #[error("unknown queue")]
    UnknownQueue,
    /// An edge between the two vertices already exists.
    #[error("vertices are already connected")]
    AlreadyConnected,
    /// A configured pool limit was reached.
    #[error("pool exhausted: {0}")]
    PoolExhausted(&'static str),
    /// An argument was rejected, such as a NaN cost.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}
