use std::{fmt, ptr::NonNull};

use tracing::{debug, trace};

use crate::{
  align,
  align::ALIGNMENT,
  align_down,
  arena::Arena,
  chunk::{Chunk, Chunks, HEADER_SIZE},
  config::HeapConfig,
  error::{Corruption, HeapError, Result},
  policy::Policy,
  stats::Stats,
};

/// Handle to a live allocation: where its user data starts and how many bytes
/// were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Allocation {
  offset: usize,
  len: usize,
}

impl Allocation {
  /// Offset of the first user byte from the start of the arena. Always a
  /// multiple of 8.
  pub fn offset(&self) -> usize {
    self.offset
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

/// A fixed-arena heap with an explicit, address-ordered free list.
pub struct Heap {
  arena: Arena,
  config: HeapConfig,
  /// Offset of the sentinel header.
  last: usize,
  stats: Stats,
}

impl Heap {
  pub fn new(
    arena_size: usize,
    policy: Policy,
  ) -> Result<Self> {
    Self::with_config(HeapConfig::new(arena_size, policy))
  }

  /// Reserves the arena and lays out the first free chunk and the sentinel.
  ///
  /// ```text
  ///   0               16                                  size - 16     size
  ///   ┌───────────────┬───────────────────────────────────┬─────────────┐
  ///   │ first (free)  │            user data              │  sentinel   │
  ///   └───────────────┴───────────────────────────────────┴─────────────┘
  /// ```
  pub fn with_config(config: HeapConfig) -> Result<Self> {
    let size = align_down!(config.arena_size);
    let minimum = 2 * HEADER_SIZE;

    if size < minimum {
      return Err(HeapError::ArenaTooSmall {
        size: config.arena_size,
        minimum,
      });
    }

    if config.split_threshold < HEADER_SIZE - 1 {
      return Err(HeapError::InvalidSplitThreshold {
        threshold: config.split_threshold,
        minimum: HEADER_SIZE - 1,
      });
    }

    let mut arena = Arena::reserve(size)?;
    let last = size - HEADER_SIZE;

    Chunk::new(0, Some(last), None, true).store(&mut arena);
    Chunk::new(last, None, Some(0), false).store(&mut arena);

    debug!(size, policy = %config.policy, split_threshold = config.split_threshold, "heap initialised");

    Ok(Self {
      arena,
      config,
      last,
      stats: Stats {
        free_chunks: 1,
        occupied_chunks: 0,
      },
    })
  }

  /// Allocates `size` bytes, or returns `None` when no free chunk is large
  /// enough under the configured policy. A failed request leaves the heap
  /// untouched.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<Allocation> {
    let Some(aligned_size) = aligned_size(size) else {
      trace!(size, "request overflows the address space");
      return None;
    };

    let Some(mut chunk) = self.config.policy.locate(self.chunks(), aligned_size) else {
      trace!(size, aligned_size, policy = %self.config.policy, "out of memory");
      return None;
    };

    chunk.is_free = false;
    self.stats.occupied_chunks += 1;

    let next = chunk.user_data() + chunk.length();
    let tail = chunk.user_data() + aligned_size;
    debug_assert!(tail <= next);

    let split = next - tail > self.config.split_threshold;
    if split {
      Chunk::new(tail, Some(next), Some(chunk.offset), true).store(&mut self.arena);
      self.set_previous(next, tail);
      chunk.next = Some(tail);
    } else {
      // The tail is too small to be worth a header and stays inside the chunk.
      assert!(self.stats.free_chunks > 0, "free chunk count underflow");
      self.stats.free_chunks -= 1;
    }

    chunk.store(&mut self.arena);

    trace!(
      size,
      offset = chunk.user_data(),
      capacity = chunk.length(),
      split,
      "allocated"
    );

    self.check();

    Some(Allocation {
      offset: chunk.user_data(),
      len: size,
    })
  }

  /// Releases an allocation and merges it with free neighbours.
  ///
  /// # Panics
  ///
  /// On a double free, on a handle that cannot belong to this heap, and, with
  /// verification enabled, on any structural damage found afterwards.
  pub fn free(
    &mut self,
    allocation: Allocation,
  ) {
    let offset = self.header_of(&allocation);
    let mut released = Chunk::load(&self.arena, offset);

    assert!(!released.is_sentinel(), "allocation at offset {} does not belong to this heap", allocation.offset);
    assert!(!released.is_free, "double free of allocation at offset {}", allocation.offset);

    released.is_free = true;
    self.stats.free_chunks += 1;
    assert!(self.stats.occupied_chunks > 0, "occupied chunk count underflow");
    self.stats.occupied_chunks -= 1;
    released.store(&mut self.arena);

    if let Some(next) = released.next {
      let next = Chunk::load(&self.arena, next);
      if next.is_free && next.offset != self.last {
        released = self.join(released, next);
      }
    }

    if let Some(previous) = released.previous {
      let previous = Chunk::load(&self.arena, previous);
      if previous.is_free {
        released = self.join(previous, released);
      }
    }

    trace!(
      offset = allocation.offset,
      merged_into = released.offset,
      capacity = released.length(),
      "freed"
    );

    self.check();
  }

  /// Requested bytes of a live allocation.
  pub fn bytes(
    &self,
    allocation: &Allocation,
  ) -> &[u8] {
    debug_assert!(self.is_live(allocation), "access to a freed allocation");
    &self.arena.as_slice()[allocation.offset..allocation.offset + allocation.len]
  }

  pub fn bytes_mut(
    &mut self,
    allocation: &Allocation,
  ) -> &mut [u8] {
    debug_assert!(self.is_live(allocation), "access to a freed allocation");
    &mut self.arena.as_mut_slice()[allocation.offset..allocation.offset + allocation.len]
  }

  /// Raw address of an allocation. It stays valid until the allocation is
  /// freed or the heap is dropped.
  pub fn as_ptr(
    &self,
    allocation: &Allocation,
  ) -> NonNull<u8> {
    self.header_of(allocation);
    // SAFETY: `header_of` checked that the offset lies inside the mapping.
    unsafe { self.arena.base().add(allocation.offset) }
  }

  /// Usable bytes of the chunk backing an allocation, including any tail that
  /// was too small to split off.
  pub fn capacity(
    &self,
    allocation: &Allocation,
  ) -> usize {
    Chunk::load(&self.arena, self.header_of(allocation)).length()
  }

  pub fn stats(&self) -> Stats {
    self.stats
  }

  /// See [`Stats::fragmentation_level`].
  pub fn fragmentation_level(&self) -> f64 {
    self.stats.fragmentation_level()
  }

  pub fn policy(&self) -> Policy {
    self.config.policy
  }

  /// Usable arena size in bytes, sentinel included.
  pub fn arena_size(&self) -> usize {
    self.arena.len()
  }

  /// Walks every chunk except the sentinel in address order.
  pub fn chunks(&self) -> Chunks<'_> {
    Chunks::new(&self.arena)
  }

  /// Walks the whole chunk list and checks every structural invariant.
  pub fn verify(&self) -> std::result::Result<(), Corruption> {
    let size = self.arena.len();
    let mut listed_free = 0;
    let mut listed_occupied = 0;
    let mut previous: Option<Chunk> = None;
    let mut cursor = 0;

    loop {
      if cursor % ALIGNMENT != 0 {
        return Err(Corruption::Misaligned { offset: cursor });
      }
      if cursor.checked_add(HEADER_SIZE).is_none_or(|end| end > size) {
        return Err(Corruption::OutOfBounds { offset: cursor });
      }

      let chunk = Chunk::load(&self.arena, cursor);
      let expected = previous.map(|previous| previous.offset);
      if chunk.previous != expected {
        return Err(Corruption::BrokenLink {
          offset: cursor,
          found: chunk.previous,
          expected,
        });
      }

      let Some(next) = chunk.next else {
        if cursor != self.last || chunk.is_free {
          return Err(Corruption::Sentinel { offset: cursor });
        }
        break;
      };

      if cursor == self.last {
        return Err(Corruption::Sentinel { offset: cursor });
      }
      if next < chunk.user_data() {
        return Err(Corruption::Unordered { offset: cursor, next });
      }

      if chunk.is_free {
        if let Some(left) = previous.filter(|previous| previous.is_free) {
          return Err(Corruption::AdjacentFree {
            left: left.offset,
            right: cursor,
          });
        }
        listed_free += 1;
      } else {
        listed_occupied += 1;
      }

      previous = Some(chunk);
      cursor = next;
    }

    if listed_free != self.stats.free_chunks || listed_occupied != self.stats.occupied_chunks {
      return Err(Corruption::CountMismatch {
        free: self.stats.free_chunks,
        occupied: self.stats.occupied_chunks,
        listed_free,
        listed_occupied,
      });
    }

    Ok(())
  }

  fn check(&self) {
    if !self.config.verify {
      return;
    }
    if let Err(corruption) = self.verify() {
      panic!("heap corrupted: {corruption}");
    }
  }

  /// Splices `right` out of the list so that `left` absorbs its header and
  /// user data.
  fn join(
    &mut self,
    mut left: Chunk,
    right: Chunk,
  ) -> Chunk {
    left.next = right.next;
    left.store(&mut self.arena);

    if let Some(next) = right.next {
      self.set_previous(next, left.offset);
    }

    self.stats.free_chunks -= 1;
    left
  }

  fn set_previous(
    &mut self,
    offset: usize,
    previous: usize,
  ) {
    let mut chunk = Chunk::load(&self.arena, offset);
    chunk.previous = Some(previous);
    chunk.store(&mut self.arena);
  }

  fn header_of(
    &self,
    allocation: &Allocation,
  ) -> usize {
    let offset = allocation.offset.wrapping_sub(HEADER_SIZE);

    assert!(
      allocation.offset >= HEADER_SIZE && offset < self.last && offset % ALIGNMENT == 0,
      "allocation at offset {} does not belong to this heap",
      allocation.offset
    );

    offset
  }

  fn is_live(
    &self,
    allocation: &Allocation,
  ) -> bool {
    let chunk = Chunk::load(&self.arena, self.header_of(allocation));
    !chunk.is_free && !chunk.is_sentinel() && allocation.len <= chunk.length()
  }
}

impl fmt::Debug for Heap {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Heap")
      .field("arena_size", &self.arena.len())
      .field("config", &self.config)
      .field("stats", &self.stats)
      .finish()
  }
}

/// Grows a request so that the header of the following chunk lands on an
/// 8-byte boundary.
fn aligned_size(size: usize) -> Option<usize> {
  size.checked_add(HEADER_SIZE + ALIGNMENT - 1)?;
  Some(align!(size + HEADER_SIZE) - HEADER_SIZE)
}
