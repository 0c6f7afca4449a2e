//! # poolalloc - A Fixed-Capacity Pool Allocator
//!
//! This crate provides a **boundary-tag first-fit allocator** that serves
//! every allocation out of one statically sized byte arena, without going
//! through the host's general-purpose allocator.
//!
//! ## Overview
//!
//! The arena is cut into blocks. Each block carries a header before its
//! payload and a mirrored footer after it, so both neighbours of any block
//! are reachable in O(1):
//!
//! ```text
//!   Arena (POOL_SIZE bytes):
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ ┌─────┬─────────┬─────┐┌─────┬──────┬─────┐┌─────┬─────────┬─────┐   │
//!   │ │ hdr │  free   │ ftr ││ hdr │ used │ ftr ││ hdr │  used   │ ftr │   │
//!   │ └─────┴─────────┴─────┘└─────┴──────┴─────┘└─────┴─────────┴─────┘   │
//!   │    ▲                                                                 │
//!   │    └── free-list entry point                                         │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Free blocks are additionally threaded on a circular doubly linked list,
//! whose links live inside their headers.
//!
//! ## Crate Structure
//!
//! ```text
//!   poolalloc
//!   ├── arena      - Fixed byte region (mmap or boxed)
//!   ├── block      - Header/footer layout (internal)
//!   ├── free_list  - Intrusive circular free list (internal)
//!   ├── pool       - MemoryPool: allocate, deallocate, statistics
//!   ├── fault      - Out-of-memory / illegal-operation hooks
//!   ├── config     - PoolConfig, loaded from TOML
//!   └── error      - PoolError
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use poolalloc::{Arena, MemoryPool};
//!
//! fn main() -> Result<(), poolalloc::PoolError> {
//!     let mut pool = MemoryPool::initialize(Arena::map(65536)?)?;
//!
//!     let number = pool.allocate(8)?;
//!     pool.payload_mut(number)?.copy_from_slice(&42u64.to_le_bytes());
//!
//!     println!("entry block holds {} bytes", pool.free_remaining());
//!
//!     pool.deallocate(Some(number))?;
//!     Ok(())
//! }
//! ```
//!
//! ## How It Works
//!
//! Allocation walks the free list from its entry point and takes the first
//! block that is large enough. If the leftover could hold another block, the
//! request is carved off the block's tail and the front stays free:
//!
//! ```text
//!   before:  ┌─────┬──────────────────────────────┬─────┐
//!            │ hdr │            free              │ ftr │
//!            └─────┴──────────────────────────────┴─────┘
//!
//!   after:   ┌─────┬──────────────┬─────┐┌─────┬────────┬─────┐
//!            │ hdr │    free      │ ftr ││ hdr │  used  │ ftr │
//!            └─────┴──────────────┴─────┘└─────┴────────┴─────┘
//!                                              ▲
//!                                              └── payload returned
//! ```
//!
//! Deallocation clears the used state, swallows a free right neighbour, then
//! folds into a free left neighbour. Only a block that did not fold left is
//! pushed onto the free list.
//!
//! ## Faults
//!
//! Exhaustion and illegal operations (double free, foreign payload,
//! zero-byte request) are reported to a [`FaultHandler`] and returned as
//! [`PoolError`]. [`LogFaults`] logs and returns; [`AbortOnFault`] exits the
//! process.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Fixed size**: The arena never grows
//! - **No alignment**: Payloads are only byte-aligned
//! - **Unix-only**: Mapped arenas require `libc` and `mmap`

mod arena;
mod block;
mod config;
mod error;
mod fault;
mod free_list;
mod pool;

pub use arena::Arena;
pub use block::{BlockState, FOOTER_SIZE, HEADER_SIZE, TAG_OVERHEAD};
pub use config::{Backing, POOL_SIZE, PoolConfig};
pub use error::{PoolError, PoolResult};
pub use fault::{AbortOnFault, FaultHandler, LogFaults};
pub use pool::{BlockInfo, Blocks, MemoryPool, Payload};
