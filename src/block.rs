use std::mem;

use bytemuck::{Pod, Zeroable};

/// Sentinel link stored in `prev`/`next` of a block that is not on the free list.
pub const NIL: u32 = u32::MAX;

/// Bytes occupied by a [`Header`] in the arena.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Bytes occupied by a [`Footer`] in the arena.
pub const FOOTER_SIZE: usize = mem::size_of::<Footer>();

/// Bookkeeping bytes spent on every block.
pub const TAG_OVERHEAD: usize = HEADER_SIZE + FOOTER_SIZE;

/// Smallest slack that is worth splitting off as its own free block:
/// a header, a footer and at least one payload byte.
pub const MIN_SPLIT_SLACK: usize = TAG_OVERHEAD + 1;

/// Whether a block is handed out or waiting on the free list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockState {
  Free,
  Used,
}

impl BlockState {
  fn from_raw(raw: u32) -> Self {
    if raw == 0 { Self::Free } else { Self::Used }
  }

  fn into_raw(self) -> u32 {
    match self {
      Self::Free => 0,
      Self::Used => 1,
    }
  }
}

/// Boundary tag placed right before every payload.
///
/// `prev` and `next` are header offsets of the neighbouring free-list members
/// and only carry meaning while the block is free.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Header {
  pub size: u32,
  used: u32,
  pub prev: u32,
  pub next: u32,
}

impl Header {
  pub fn new(
    size: u32,
    state: BlockState,
  ) -> Self {
    Self {
      size,
      used: state.into_raw(),
      prev: NIL,
      next: NIL,
    }
  }

  pub fn state(&self) -> BlockState {
    BlockState::from_raw(self.used)
  }

  pub fn set_state(
    &mut self,
    state: BlockState,
  ) {
    self.used = state.into_raw();
  }

  pub fn is_free(&self) -> bool {
    self.state() == BlockState::Free
  }

  /// The footer this header should be mirrored by.
  pub fn mirror(&self) -> Footer {
    Footer {
      size: self.size,
      used: self.used,
    }
  }
}

/// Boundary tag placed right after every payload, a copy of the header's
/// size and state.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Footer {
  pub size: u32,
  used: u32,
}

impl Footer {
  pub fn state(&self) -> BlockState {
    BlockState::from_raw(self.used)
  }

  pub fn is_free(&self) -> bool {
    self.state() == BlockState::Free
  }
}

/// Offset of the payload for the block whose header is at `header`.
#[inline]
pub fn payload_of(header: usize) -> usize {
  header + HEADER_SIZE
}

/// Offset of the footer for the block whose header is at `header`.
#[inline]
pub fn footer_of(
  header: usize,
  size: usize,
) -> usize {
  header + HEADER_SIZE + size
}

/// Offset one past the last byte of the block whose header is at `header`.
#[inline]
pub fn end_of(
  header: usize,
  size: usize,
) -> usize {
  header + TAG_OVERHEAD + size
}

pub fn read_header(
  bytes: &[u8],
  at: usize,
) -> Header {
  bytemuck::pod_read_unaligned(&bytes[at..at + HEADER_SIZE])
}

pub fn write_header(
  bytes: &mut [u8],
  at: usize,
  header: &Header,
) {
  bytes[at..at + HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(header));
}

pub fn read_footer(
  bytes: &[u8],
  at: usize,
) -> Footer {
  bytemuck::pod_read_unaligned(&bytes[at..at + FOOTER_SIZE])
}

pub fn write_footer(
  bytes: &mut [u8],
  at: usize,
  footer: &Footer,
) {
  bytes[at..at + FOOTER_SIZE].copy_from_slice(bytemuck::bytes_of(footer));
}

/// Writes `header` and its mirrored footer, keeping both tags in sync.
pub fn write_tags(
  bytes: &mut [u8],
  at: usize,
  header: &Header,
) {
  write_header(bytes, at, header);
  write_footer(bytes, footer_of(at, header.size as usize), &header.mirror());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_tag_sizes() {
    assert_eq!(HEADER_SIZE, 16);
    assert_eq!(FOOTER_SIZE, 8);
    assert_eq!(MIN_SPLIT_SLACK, 25);
  }

  #[test]
  fn test_tags_mirror() {
    let mut bytes = vec![0u8; 64];
    let mut header = Header::new(16, BlockState::Used);
    header.next = 7;

    // Odd offset: tags are read and written unaligned.
    write_tags(&mut bytes, 3, &header);

    let read = read_header(&bytes, 3);
    assert_eq!(read, header);
    assert_eq!(read.state(), BlockState::Used);

    let footer = read_footer(&bytes, footer_of(3, 16));
    assert_eq!(footer, header.mirror());
    assert!(!footer.is_free());
  }

  #[test]
  fn test_state_toggle() {
    let mut header = Header::new(8, BlockState::Free);
    assert!(header.is_free());
    assert_eq!(header.prev, NIL);

    header.set_state(BlockState::Used);
    assert!(!header.is_free());
    assert_eq!(header.mirror().state(), BlockState::Used);
  }

  #[test]
  fn test_offsets() {
    assert_eq!(payload_of(0), HEADER_SIZE);
    assert_eq!(footer_of(0, 10), HEADER_SIZE + 10);
    assert_eq!(end_of(0, 10), TAG_OVERHEAD + 10);
  }
}
