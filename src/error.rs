//! # Pool Error Types
//!
//! Every condition the pool detects. None of them terminate the process on
//! their own; the configured [`FaultHandler`](crate::FaultHandler) decides that.

use thiserror::Error;

/// Errors that can occur while managing the pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  /// No free block can hold the requested payload.
  #[error("memory pool out of memory: requested {requested} bytes, largest free block is {largest}")]
  OutOfMemory {
    /// Requested payload size.
    requested: usize,
    /// Largest free payload at the time of the request.
    largest: usize,
  },

  /// The block behind this payload is already free.
  #[error("data has already been deallocated (payload offset {offset})")]
  DoubleFree {
    /// Payload offset inside the arena.
    offset: usize,
  },

  /// The payload does not designate a block of this pool.
  #[error("payload offset {offset} does not belong to a block of this pool")]
  InvalidPointer {
    /// Payload offset inside the arena.
    offset: usize,
  },

  /// Zero-byte allocations are rejected.
  #[error("allocation of zero bytes requested")]
  ZeroSizeRequest,

  /// Invalid configuration value or file.
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  /// The operating system refused to map the arena.
  #[error("failed to map {len} byte arena (os error {errno})")]
  ArenaMap {
    /// Requested arena length.
    len: usize,
    /// Raw OS error code.
    errno: i32,
  },

  /// A boundary-tag or free-list invariant does not hold.
  #[error("pool corrupted at offset {offset}: {reason}")]
  Corrupted {
    /// Header offset of the offending block.
    offset: usize,
    /// Which invariant failed.
    reason: &'static str,
  },
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
