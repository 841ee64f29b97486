/// Running chunk counts, kept purely to measure fragmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
  pub free_chunks: usize,
  pub occupied_chunks: usize,
}

impl Stats {
  /// Ratio of free to occupied chunks.
  ///
  /// A healthy heap trends towards a single free chunk next to many occupied
  /// ones, so lower is better. With no occupied chunks the ratio is infinite
  /// (or NaN when the heap holds no counted chunks at all); callers that care
  /// should check [`Stats::occupied_chunks`] first.
  pub fn fragmentation_level(&self) -> f64 {
    self.free_chunks as f64 / self.occupied_chunks as f64
  }

  pub fn total_chunks(&self) -> usize {
    self.free_chunks + self.occupied_chunks
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fragmentation_level() {
    let stats = Stats {
      free_chunks: 1,
      occupied_chunks: 4,
    };
    assert_eq!(stats.fragmentation_level(), 0.25);
    assert_eq!(stats.total_chunks(), 5);
  }

  #[test]
  fn test_fragmentation_level_without_occupied_chunks() {
    let stats = Stats {
      free_chunks: 1,
      occupied_chunks: 0,
    };
    assert!(stats.fragmentation_level().is_infinite());
    assert!(Stats::default().fragmentation_level().is_nan());
  }
}
