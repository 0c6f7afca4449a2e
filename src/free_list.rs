//! Circular doubly linked list of free blocks.
//!
//! The links live inside the free blocks' own headers as arena offsets, so
//! the list itself is just the entry point:
//!
//! ```text
//!          entry
//!            │
//!            ▼
//!   ┌──▶ [hdr A] ──next──▶ [hdr B] ──next──▶ [hdr C] ──┐
//!   │      ▲                                           │
//!   │      └──────────────────prev────────────────────-┘
//!   └─────────────────────────next─────────────────────┘
//! ```
//!
//! List order has nothing to do with address order.

use crate::block::{NIL, read_header, write_header};

#[derive(Debug, Clone, Copy, Default)]
pub struct FreeList {
  entry: Option<u32>,
}

impl FreeList {
  /// A list whose only member is the block at `at`, linked to itself.
  pub fn seeded(
    bytes: &mut [u8],
    at: usize,
  ) -> Self {
    let mut list = Self::default();
    list.insert(bytes, at);
    list
  }

  pub fn entry(&self) -> Option<usize> {
    self.entry.map(|at| at as usize)
  }

  /// Links the block at `at` in right after the entry point, or makes it the
  /// sole member when the list is empty.
  pub fn insert(
    &mut self,
    bytes: &mut [u8],
    at: usize,
  ) {
    let node = at as u32;
    let mut header = read_header(bytes, at);

    match self.entry {
      None => {
        header.prev = node;
        header.next = node;
        write_header(bytes, at, &header);
        self.entry = Some(node);
      }
      Some(entry) => {
        let mut anchor = read_header(bytes, entry as usize);
        let after = anchor.next;

        header.prev = entry;
        header.next = after;
        write_header(bytes, at, &header);

        if after == entry {
          anchor.prev = node;
          anchor.next = node;
          write_header(bytes, entry as usize, &anchor);
        } else {
          anchor.next = node;
          write_header(bytes, entry as usize, &anchor);

          let mut successor = read_header(bytes, after as usize);
          successor.prev = node;
          write_header(bytes, after as usize, &successor);
        }
      }
    }
  }

  /// Unlinks the block at `at`. The entry point slides to the successor when
  /// it is the block being removed.
  pub fn remove(
    &mut self,
    bytes: &mut [u8],
    at: usize,
  ) {
    let node = at as u32;
    let mut header = read_header(bytes, at);
    let (prev, next) = (header.prev, header.next);

    if next == node {
      self.entry = None;
    } else {
      let mut before = read_header(bytes, prev as usize);
      before.next = next;
      write_header(bytes, prev as usize, &before);

      let mut after = read_header(bytes, next as usize);
      after.prev = prev;
      write_header(bytes, next as usize, &after);

      if self.entry == Some(node) {
        self.entry = Some(next);
      }
    }

    header.prev = NIL;
    header.next = NIL;
    write_header(bytes, at, &header);
  }

  /// First-fit: the first member, walking `next` from the entry point, whose
  /// payload holds `size` bytes.
  pub fn first_fit(
    &self,
    bytes: &[u8],
    size: usize,
  ) -> Option<usize> {
    self.iter(bytes).find(|&at| read_header(bytes, at).size as usize >= size)
  }

  /// Member header offsets in list order, one lap starting at the entry point.
  pub fn iter<'a>(
    &self,
    bytes: &'a [u8],
  ) -> Iter<'a> {
    Iter {
      bytes,
      start: self.entry,
      current: self.entry,
    }
  }
}

pub struct Iter<'a> {
  bytes: &'a [u8],
  start: Option<u32>,
  current: Option<u32>,
}

impl Iterator for Iter<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let at = self.current?;
    let next = read_header(self.bytes, at as usize).next;

    // Stop on return to start, checked after visiting so a single
    // self-linked member is still yielded once.
    self.current = if Some(next) == self.start { None } else { Some(next) };

    Some(at as usize)
  }
}
