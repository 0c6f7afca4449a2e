use std::{ptr::NonNull, slice};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};

use crate::error::{PoolError, PoolResult};

enum Storage {
  /// Anonymous private mapping requested straight from the kernel.
  Mapped { base: NonNull<u8>, len: usize },
  Owned(Box<[u8]>),
}

/// The fixed-length byte region every block lives in.
///
/// An arena is sized once and never grows. Blocks are only ever views over
/// ranges of it, addressed by byte offset.
pub struct Arena {
  storage: Storage,
}

impl Arena {
  /// Maps `len` zeroed bytes with `mmap(2)`, bypassing the global allocator.
  pub fn map(len: usize) -> PoolResult<Self> {
    if len == 0 {
      return Err(PoolError::InvalidConfig("arena length must be non-zero".into()));
    }

    let address = unsafe {
      mmap(
        std::ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
      return Err(PoolError::ArenaMap { len, errno });
    }

    let base = NonNull::new(address as *mut u8).ok_or(PoolError::ArenaMap { len, errno: 0 })?;

    tracing::debug!(len, ?base, "mapped arena");

    Ok(Self {
      storage: Storage::Mapped { base, len },
    })
  }

  /// Arena backed by a zeroed boxed slice.
  pub fn owned(len: usize) -> Self {
    Self::from_boxed(vec![0u8; len].into_boxed_slice())
  }

  /// Arena over caller-provided storage.
  pub fn from_boxed(bytes: Box<[u8]>) -> Self {
    Self {
      storage: Storage::Owned(bytes),
    }
  }

  pub fn len(&self) -> usize {
    match &self.storage {
      Storage::Mapped { len, .. } => *len,
      Storage::Owned(bytes) => bytes.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_mapped(&self) -> bool {
    matches!(self.storage, Storage::Mapped { .. })
  }

  pub fn as_slice(&self) -> &[u8] {
    match &self.storage {
      // The mapping is exclusively owned and stays valid until drop.
      Storage::Mapped { base, len } => unsafe { slice::from_raw_parts(base.as_ptr(), *len) },
      Storage::Owned(bytes) => &bytes[..],
    }
  }

  pub fn as_mut_slice(&mut self) -> &mut [u8] {
    match &mut self.storage {
      Storage::Mapped { base, len } => unsafe { slice::from_raw_parts_mut(base.as_ptr(), *len) },
      Storage::Owned(bytes) => &mut bytes[..],
    }
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    if let Storage::Mapped { base, len } = self.storage {
      let result = unsafe { munmap(base.as_ptr() as *mut c_void, len) };
      if result != 0 {
        tracing::warn!(len, "munmap of arena failed");
      }
    }
  }
}

impl std::fmt::Debug for Arena {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    f.debug_struct("Arena")
      .field("len", &self.len())
      .field("mapped", &self.is_mapped())
      .finish()
  }
}
