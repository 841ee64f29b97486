use std::io;

use thiserror::Error;

/// Errors that can occur while building a heap.
#[derive(Debug, Error)]
pub enum HeapError {
  /// The arena cannot hold the first chunk header and the sentinel.
  #[error("arena of {size} bytes is too small, at least {minimum} bytes are required")]
  ArenaTooSmall { size: usize, minimum: usize },

  /// A split threshold below this value could carve a tail that cannot hold a header.
  #[error("split threshold of {threshold} bytes is below the minimum of {minimum} bytes")]
  InvalidSplitThreshold { threshold: usize, minimum: usize },

  /// The operating system refused to map the arena.
  #[error("failed to reserve an arena of {size} bytes: {source}")]
  Reserve {
    size: usize,
    #[source]
    source: io::Error,
  },
}

pub type Result<T> = std::result::Result<T, HeapError>;

/// Structural damage found by [`Heap::verify`](crate::Heap::verify).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Corruption {
  #[error("chunk header at offset {offset} lies outside the arena")]
  OutOfBounds { offset: usize },

  #[error("chunk header at offset {offset} is not 8-byte aligned")]
  Misaligned { offset: usize },

  #[error("chunk at offset {offset} links back to {found:?} instead of {expected:?}")]
  BrokenLink {
    offset: usize,
    found: Option<usize>,
    expected: Option<usize>,
  },

  #[error("chunk at offset {offset} is followed by a lower address {next}")]
  Unordered { offset: usize, next: usize },

  #[error("adjacent chunks at offsets {left} and {right} are both free")]
  AdjacentFree { left: usize, right: usize },

  #[error("sentinel chunk at offset {offset} is damaged")]
  Sentinel { offset: usize },

  #[error(
    "statistics report {free} free and {occupied} occupied chunks but the list holds {listed_free} free and {listed_occupied} occupied"
  )]
  CountMismatch {
    free: usize,
    occupied: usize,
    listed_free: usize,
    listed_occupied: usize,
  },
}
