use std::{io, ptr, slice};
use std::ptr::NonNull;

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};
use tracing::{debug, warn};

use crate::error::{HeapError, Result};

const WORD: usize = size_of::<u64>();

/// A fixed-size, zero-initialised byte region mapped straight from the OS.
///
/// The arena never grows. Every access goes through a bounds-checked slice,
/// so a bad offset panics instead of touching memory outside the mapping.
pub(crate) struct Arena {
  base: NonNull<u8>,
  len: usize,
}

impl Arena {
  pub fn reserve(len: usize) -> Result<Self> {
    // SAFETY: anonymous private mapping with no fixed address; the kernel picks
    // a fresh page-aligned region or reports failure.
    let address = unsafe {
      mmap(
        ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(HeapError::Reserve {
        size: len,
        source: io::Error::last_os_error(),
      });
    }

    let base = NonNull::new(address.cast::<u8>()).ok_or_else(|| HeapError::Reserve {
      size: len,
      source: io::Error::other("mmap returned a null mapping"),
    })?;

    debug!(len, base = ?base, "reserved arena");

    Ok(Self { base, len })
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn base(&self) -> NonNull<u8> {
    self.base
  }

  pub fn as_slice(&self) -> &[u8] {
    // SAFETY: `base` points to `len` readable bytes owned by this arena for its
    // whole lifetime, and the returned borrow is tied to `&self`.
    unsafe { slice::from_raw_parts(self.base.as_ptr(), self.len) }
  }

  pub fn as_mut_slice(&mut self) -> &mut [u8] {
    // SAFETY: as above, and `&mut self` guarantees the view is unique.
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
  }

  pub fn read_word(
    &self,
    offset: usize,
  ) -> usize {
    let mut word = [0u8; WORD];
    word.copy_from_slice(&self.as_slice()[offset..offset + WORD]);
    u64::from_ne_bytes(word) as usize
  }

  pub fn write_word(
    &mut self,
    offset: usize,
    value: usize,
  ) {
    self.as_mut_slice()[offset..offset + WORD].copy_from_slice(&(value as u64).to_ne_bytes());
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    // SAFETY: the mapping was created in `reserve` with exactly this length and
    // is unmapped only here.
    let status = unsafe { munmap(self.base.as_ptr().cast::<c_void>(), self.len) };

    if status != 0 {
      warn!(len = self.len, error = %io::Error::last_os_error(), "failed to release arena");
    } else {
      debug!(len = self.len, "released arena");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reserve_is_zeroed_and_aligned() {
    let arena = Arena::reserve(4096).unwrap();

    assert_eq!(arena.len(), 4096);
    assert_eq!(arena.base().as_ptr() as usize % 8, 0);
    assert!(arena.as_slice().iter().all(|&byte| byte == 0));
  }

  #[test]
  fn test_words() {
    let mut arena = Arena::reserve(64).unwrap();

    arena.write_word(0, 0xDEAD_BEEF);
    arena.write_word(56, usize::MAX);

    assert_eq!(arena.read_word(0), 0xDEAD_BEEF);
    assert_eq!(arena.read_word(56), usize::MAX);
    assert_eq!(arena.read_word(8), 0);
  }

  #[test]
  #[should_panic]
  fn test_word_past_the_end_panics() {
    let arena = Arena::reserve(64).unwrap();

    arena.read_word(60);
  }
}
