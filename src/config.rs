use crate::{chunk::HEADER_SIZE, policy::Policy};

/// Default split threshold: a tail is carved into a new free chunk only when it
/// spans more than three headers.
pub const DEFAULT_SPLIT_THRESHOLD: usize = 3 * HEADER_SIZE;

/// Construction parameters for a [`Heap`](crate::Heap).
///
/// ```rust
/// use rfreelist::{HeapConfig, Policy};
///
/// let config = HeapConfig::new(64 * 1024, Policy::Best)
///   .with_split_threshold(64)
///   .with_verification(true);
///
/// assert_eq!(config.split_threshold, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  /// Requested arena size in bytes. Rounded down to a multiple of 8.
  pub arena_size: usize,
  pub policy: Policy,
  /// Largest tail, in bytes, that stays inside an allocated chunk. Longer tails
  /// are split off into a new free chunk.
  pub split_threshold: usize,
  /// Walk the whole chunk list after every `allocate` and `free` and panic on
  /// any structural damage. On by default in debug builds.
  pub verify: bool,
}

impl HeapConfig {
  pub fn new(
    arena_size: usize,
    policy: Policy,
  ) -> Self {
    Self {
      arena_size,
      policy,
      split_threshold: DEFAULT_SPLIT_THRESHOLD,
      verify: cfg!(debug_assertions),
    }
  }

  pub fn with_policy(
    mut self,
    policy: Policy,
  ) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_split_threshold(
    mut self,
    split_threshold: usize,
  ) -> Self {
    self.split_threshold = split_threshold;
    self
  }

  pub fn with_verification(
    mut self,
    verify: bool,
  ) -> Self {
    self.verify = verify;
    self
  }
}
