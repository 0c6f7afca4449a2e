use std::fmt;

use crate::{
  arena::Arena,
  block::{
    BlockState, FOOTER_SIZE, HEADER_SIZE, Header, MIN_SPLIT_SLACK, TAG_OVERHEAD, end_of, footer_of, payload_of, read_footer,
    read_header, write_header, write_tags,
  },
  config::{PoolConfig, validate_arena_len},
  error::{PoolError, PoolResult},
  fault::{FaultHandler, LogFaults},
  free_list::FreeList,
};

/// Handle to an allocated payload: its byte offset inside the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Payload {
  offset: usize,
}

impl Payload {
  pub fn offset(&self) -> usize {
    self.offset
  }
}

/// One block of the arena as seen by an address-order walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Header offset.
  pub offset: usize,
  /// Payload bytes, tags excluded.
  pub size: usize,
  pub state: BlockState,
}

impl BlockInfo {
  pub fn payload(&self) -> Payload {
    Payload {
      offset: payload_of(self.offset),
    }
  }

  pub fn is_free(&self) -> bool {
    self.state == BlockState::Free
  }
}

/// First-fit boundary-tag allocator over a single fixed arena.
///
/// ```text
///   ┌────────┬─────────────┬────────┬────────┬──────────┬────────┬─────
///   │ header │   payload   │ footer │ header │ payload  │ footer │ ...
///   │ size   │             │ size   │        │          │        │
///   │ state  │             │ state  │        │          │        │
///   │ prev   │             │        │        │          │        │
///   │ next   │             │        │        │          │        │
///   └────────┴─────────────┴────────┴────────┴──────────┴────────┴─────
///   ▲ first header                                        last footer ▲
/// ```
///
/// A block's left neighbour is found through the footer just before its
/// header, its right neighbour through the header just after its footer.
///
/// The pool is single-threaded and never grows.
pub struct MemoryPool<H: FaultHandler = LogFaults> {
  arena: Arena,
  free: FreeList,
  first_header: usize,
  last_footer: usize,
  handler: H,
}

impl MemoryPool<LogFaults> {
  /// Carves `arena` into one free block. Faults are logged.
  pub fn initialize(arena: Arena) -> PoolResult<Self> {
    Self::with_handler(arena, LogFaults)
  }

  pub fn from_config(config: &PoolConfig) -> PoolResult<Self> {
    Self::initialize(config.build_arena()?)
  }
}

impl<H: FaultHandler> MemoryPool<H> {
  /// Carves `arena` into one free block, reporting faults to `handler`.
  pub fn with_handler(
    arena: Arena,
    handler: H,
  ) -> PoolResult<Self> {
    validate_arena_len(arena.len())?;

    let mut pool = Self {
      arena,
      free: FreeList::default(),
      first_header: 0,
      last_footer: 0,
      handler,
    };
    pool.reset();

    Ok(pool)
  }

  /// Forgets every block and starts over with a single free block spanning
  /// the arena. Outstanding payloads become invalid.
  pub fn reset(&mut self) {
    let len = self.arena.len();
    let size = len - TAG_OVERHEAD;
    let bytes = self.arena.as_mut_slice();

    // Stale headers of handles from before the reset must read as free.
    bytes.fill(0);
    write_tags(bytes, 0, &Header::new(size as u32, BlockState::Free));

    self.free = FreeList::seeded(bytes, 0);
    self.first_header = 0;
    self.last_footer = len - FOOTER_SIZE;

    tracing::debug!(len, free = size, "memory pool initialized");
  }

  pub fn handler(&self) -> &H {
    &self.handler
  }

  pub fn handler_mut(&mut self) -> &mut H {
    &mut self.handler
  }

  pub fn arena_len(&self) -> usize {
    self.arena.len()
  }

  /// Payload bytes of the pool when it holds a single free block.
  pub fn capacity(&self) -> usize {
    self.arena.len() - TAG_OVERHEAD
  }

  /// Hands out a payload of at least `size` bytes.
  ///
  /// The free list is searched first-fit from its entry point. When the
  /// chosen block has room for another block after the request, the request
  /// is carved from its tail and the rest stays on the free list in place;
  /// otherwise the whole block is handed out.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> PoolResult<Payload> {
    if size == 0 {
      self.handler.on_illegal_operation("allocation of zero bytes requested");
      return Err(PoolError::ZeroSizeRequest);
    }

    let Some(at) = self.free.first_fit(self.arena.as_slice(), size) else {
      let largest = self.largest_free();
      tracing::trace!(size, largest, "no free block large enough");
      self.handler.on_out_of_memory(size);
      return Err(PoolError::OutOfMemory {
        requested: size,
        largest,
      });
    };

    let bytes = self.arena.as_mut_slice();
    let mut chosen = read_header(bytes, at);
    let slack = chosen.size as usize - size;

    let used_at = if slack >= MIN_SPLIT_SLACK {
      chosen.size = (slack - TAG_OVERHEAD) as u32;
      write_tags(bytes, at, &chosen);

      let used_at = end_of(at, chosen.size as usize);
      write_tags(bytes, used_at, &Header::new(size as u32, BlockState::Used));

      tracing::trace!(size, block = at, remaining = chosen.size, "split free block");
      used_at
    } else {
      self.free.remove(bytes, at);

      let mut header = read_header(bytes, at);
      header.set_state(BlockState::Used);
      write_tags(bytes, at, &header);

      tracing::trace!(size, block = at, slack, "handed out whole block");
      at
    };

    Ok(Payload {
      offset: payload_of(used_at),
    })
  }

  /// Returns a payload to the pool, merging it with free neighbours.
  ///
  /// `None` is accepted and ignored. Freeing a block twice, or a payload
  /// that does not designate a block, is reported and leaves the pool
  /// untouched.
  pub fn deallocate(
    &mut self,
    payload: Option<Payload>,
  ) -> PoolResult<()> {
    let Some(payload) = payload else {
      return Ok(());
    };

    let Some((at, mut header)) = self.header_at(payload) else {
      return Err(self.illegal_pointer(payload));
    };

    if header.is_free() {
      self.handler.on_illegal_operation("data has already been deallocated");
      return Err(PoolError::DoubleFree {
        offset: payload.offset,
      });
    }

    let bytes = self.arena.as_mut_slice();

    if read_footer(bytes, footer_of(at, header.size as usize)) != header.mirror() {
      return Err(self.illegal_pointer(payload));
    }

    header.set_state(BlockState::Free);
    let mut size = header.size as usize;

    if footer_of(at, size) != self.last_footer {
      let right = end_of(at, size);
      let right_header = read_header(bytes, right);

      if right_header.is_free() {
        self.free.remove(bytes, right);
        size += TAG_OVERHEAD + right_header.size as usize;
        tracing::trace!(block = at, right, "merged right neighbour");
      }
    }

    header.size = size as u32;

    let mut merged_left = false;

    if at != self.first_header {
      let left_footer = read_footer(bytes, at - FOOTER_SIZE);

      if left_footer.is_free() {
        let left = at - FOOTER_SIZE - left_footer.size as usize - HEADER_SIZE;
        let mut left_header = read_header(bytes, left);
        left_header.size += (TAG_OVERHEAD + size) as u32;
        write_tags(bytes, left, &left_header);

        // The absorbed header stays readable as free so a repeated
        // deallocate of this payload is still caught.
        write_header(bytes, at, &header);

        merged_left = true;
        tracing::trace!(block = at, left, size = left_header.size, "merged into left neighbour");
      }
    }

    if !merged_left {
      write_tags(bytes, at, &header);
      self.free.insert(bytes, at);
      tracing::trace!(block = at, size, "inserted into free list");
    }

    Ok(())
  }

  /// The payload bytes of a live allocation.
  pub fn payload(
    &self,
    payload: Payload,
  ) -> PoolResult<&[u8]> {
    let range = self.live_range(payload)?;
    Ok(&self.arena.as_slice()[range])
  }

  pub fn payload_mut(
    &mut self,
    payload: Payload,
  ) -> PoolResult<&mut [u8]> {
    let range = self.live_range(payload)?;
    Ok(&mut self.arena.as_mut_slice()[range])
  }

  /// Size of the block at the free-list entry point.
  ///
  /// This is not the total free memory; see [`total_free`](Self::total_free).
  /// Zero when every byte is allocated.
  pub fn free_remaining(&self) -> usize {
    self
      .free
      .entry()
      .map_or(0, |at| read_header(self.arena.as_slice(), at).size as usize)
  }

  /// Size of the largest free block, zero when none is free.
  pub fn largest_free(&self) -> usize {
    self.free_sizes().max().unwrap_or(0)
  }

  /// Size of the smallest free block, zero when none is free.
  pub fn smallest_free(&self) -> usize {
    self.free_sizes().min().unwrap_or(0)
  }

  /// Sum of every free block's payload size.
  pub fn total_free(&self) -> usize {
    self.free_sizes().sum()
  }

  pub fn free_block_count(&self) -> usize {
    self.free.iter(self.arena.as_slice()).count()
  }

  /// Every block in address order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      bytes: self.arena.as_slice(),
      at: self.first_header,
    }
  }

  /// Checks tag mirroring, arena coverage, coalescing and free-list
  /// membership.
  pub fn verify(&self) -> PoolResult<()> {
    let bytes = self.arena.as_slice();
    let len = bytes.len();

    let mut at = self.first_header;
    let mut free_blocks = 0usize;
    let mut previous_free = false;

    while at < len {
      if at + TAG_OVERHEAD > len {
        return Err(corrupted(at, "block tags run past the arena"));
      }

      let header = read_header(bytes, at);
      let end = end_of(at, header.size as usize);

      if end > len {
        return Err(corrupted(at, "block runs past the arena"));
      }
      if read_footer(bytes, footer_of(at, header.size as usize)) != header.mirror() {
        return Err(corrupted(at, "footer does not mirror header"));
      }
      if header.is_free() {
        if previous_free {
          return Err(corrupted(at, "adjacent free blocks were not merged"));
        }
        free_blocks += 1;
      }

      previous_free = header.is_free();
      at = end;
    }

    if at != len || self.last_footer + FOOTER_SIZE != len {
      return Err(corrupted(at, "blocks do not tile the arena"));
    }

    let mut members = 0usize;
    for member in self.free.iter(bytes).take(free_blocks + 1) {
      let header = read_header(bytes, member);

      if !header.is_free() {
        return Err(corrupted(member, "used block on the free list"));
      }
      if header.next as usize + HEADER_SIZE > len || header.prev as usize + HEADER_SIZE > len {
        return Err(corrupted(member, "free-list link points outside the arena"));
      }
      if read_header(bytes, header.next as usize).prev as usize != member {
        return Err(corrupted(member, "free-list links disagree"));
      }
      members += 1;
    }

    if members != free_blocks {
      return Err(corrupted(self.free.entry().unwrap_or(0), "free list does not hold exactly the free blocks"));
    }

    Ok(())
  }

  fn free_sizes(&self) -> impl Iterator<Item = usize> + '_ {
    let bytes = self.arena.as_slice();
    self.free.iter(bytes).map(move |at| read_header(bytes, at).size as usize)
  }

  /// Header offset and header for `payload`, if the tags it points at lie
  /// inside the arena.
  fn header_at(
    &self,
    payload: Payload,
  ) -> Option<(usize, Header)> {
    let bytes = self.arena.as_slice();
    let at = payload.offset.checked_sub(HEADER_SIZE)?;

    if at + TAG_OVERHEAD > bytes.len() {
      return None;
    }

    let header = read_header(bytes, at);
    (end_of(at, header.size as usize) <= bytes.len()).then_some((at, header))
  }

  fn live_range(
    &self,
    payload: Payload,
  ) -> PoolResult<std::ops::Range<usize>> {
    let invalid = PoolError::InvalidPointer {
      offset: payload.offset,
    };
    let (at, header) = self.header_at(payload).ok_or_else(|| invalid.clone())?;

    if header.is_free() || read_footer(self.arena.as_slice(), footer_of(at, header.size as usize)) != header.mirror() {
      return Err(invalid);
    }

    Ok(payload.offset..payload.offset + header.size as usize)
  }

  fn illegal_pointer(
    &mut self,
    payload: Payload,
  ) -> PoolError {
    self
      .handler
      .on_illegal_operation("pointer does not designate a block of this pool");
    PoolError::InvalidPointer {
      offset: payload.offset,
    }
  }
}

fn corrupted(
  offset: usize,
  reason: &'static str,
) -> PoolError {
  PoolError::Corrupted { offset, reason }
}

impl<H: FaultHandler> fmt::Debug for MemoryPool<H> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("MemoryPool")
      .field("arena", &self.arena)
      .field("free_blocks", &self.free_block_count())
      .field("total_free", &self.total_free())
      .field("largest_free", &self.largest_free())
      .finish()
  }
}

/// Address-order walk over a pool's blocks.
pub struct Blocks<'a> {
  bytes: &'a [u8],
  at: usize,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    if self.at + TAG_OVERHEAD > self.bytes.len() {
      return None;
    }

    let header = read_header(self.bytes, self.at);
    let end = end_of(self.at, header.size as usize);

    if end > self.bytes.len() {
      return None;
    }

    let info = BlockInfo {
      offset: self.at,
      size: header.size as usize,
      state: header.state(),
    };
    self.at = end;

    Some(info)
  }
}
