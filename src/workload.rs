//! Randomised allocation workload.
//!
//! Keeps a fixed number of live allocations, each painted with its own 16-bit
//! marker. Every iteration shuffles them, frees a random prefix, allocates the
//! same number again with fresh sizes and markers, and checks that every live
//! allocation still holds its marker. Two allocations that overlap, even by a
//! byte, sooner or later overwrite each other's marker.

use rand::{Rng, seq::SliceRandom};
use thiserror::Error;
use tracing::debug;

use crate::{Allocation, Heap, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadConfig {
  /// Number of allocations kept alive.
  pub chunks: usize,
  /// Largest request in bytes, inclusive.
  pub max_size: usize,
  pub iterations: usize,
  /// Report every this many iterations. Zero disables reports.
  pub report_every: usize,
}

impl Default for WorkloadConfig {
  fn default() -> Self {
    Self {
      chunks: 100,
      max_size: 512,
      iterations: 1000,
      report_every: 100,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
  pub iteration: usize,
  pub stats: Stats,
  pub fragmentation_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
  pub iterations: usize,
  pub allocations: usize,
  pub frees: usize,
  /// Highest fragmentation level seen at the end of an iteration.
  pub peak_fragmentation_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorkloadError {
  #[error("out of memory allocating {size} bytes with {live} allocations alive")]
  OutOfMemory { size: usize, live: usize },

  #[error("iteration {iteration}: allocation at offset {offset} lost its marker {marker:#06x}")]
  Corrupted {
    iteration: usize,
    offset: usize,
    marker: u16,
  },
}

#[derive(Debug, Clone, Copy)]
struct Slot {
  allocation: Allocation,
  marker: u16,
}

pub struct Workload<'h, R> {
  heap: &'h mut Heap,
  config: WorkloadConfig,
  rng: R,
  slots: Vec<Slot>,
  allocations: usize,
  frees: usize,
}

impl<'h, R: Rng> Workload<'h, R> {
  pub fn new(
    heap: &'h mut Heap,
    config: WorkloadConfig,
    rng: R,
  ) -> Self {
    Self {
      heap,
      config,
      rng,
      slots: Vec::with_capacity(config.chunks),
      allocations: 0,
      frees: 0,
    }
  }

  /// Runs the whole workload and frees every allocation it still holds.
  ///
  /// On error the live allocations are left in the heap.
  pub fn run(
    mut self,
    mut on_report: impl FnMut(&Report),
  ) -> Result<Summary, WorkloadError> {
    self.fill(self.config.chunks)?;

    let mut peak_fragmentation_level: f64 = 0.0;

    for iteration in 0..self.config.iterations {
      self.slots.shuffle(&mut self.rng);

      let count = self.rng.gen_range(0..(self.config.chunks / 2).max(1));
      self.release(count);
      self.fill(count)?;
      self.check(iteration)?;

      let stats = self.heap.stats();
      let fragmentation_level = stats.fragmentation_level();
      peak_fragmentation_level = peak_fragmentation_level.max(fragmentation_level);

      if self.config.report_every > 0 && iteration % self.config.report_every == 0 {
        let report = Report {
          iteration,
          stats,
          fragmentation_level,
        };
        debug!(iteration, fragmentation_level, free = stats.free_chunks, occupied = stats.occupied_chunks, "workload progress");
        on_report(&report);
      }
    }

    self.release(self.slots.len());

    Ok(Summary {
      iterations: self.config.iterations,
      allocations: self.allocations,
      frees: self.frees,
      peak_fragmentation_level,
    })
  }

  fn fill(
    &mut self,
    count: usize,
  ) -> Result<(), WorkloadError> {
    for _ in 0..count {
      let size = self.rng.gen_range(0..=self.config.max_size);
      let marker: u16 = self.rng.r#gen();

      let allocation = self.heap.allocate(size).ok_or(WorkloadError::OutOfMemory {
        size,
        live: self.slots.len(),
      })?;

      paint(self.heap.bytes_mut(&allocation), marker);
      self.slots.push(Slot { allocation, marker });
      self.allocations += 1;
    }

    Ok(())
  }

  fn release(
    &mut self,
    count: usize,
  ) {
    for slot in self.slots.drain(..count) {
      self.heap.free(slot.allocation);
    }
    self.frees += count;
  }

  fn check(
    &self,
    iteration: usize,
  ) -> Result<(), WorkloadError> {
    match self.slots.iter().find(|slot| !is_painted(self.heap.bytes(&slot.allocation), slot.marker)) {
      Some(slot) => Err(WorkloadError::Corrupted {
        iteration,
        offset: slot.allocation.offset(),
        marker: slot.marker,
      }),
      None => Ok(()),
    }
  }
}

fn paint(
  bytes: &mut [u8],
  marker: u16,
) {
  for (byte, pattern) in bytes.iter_mut().zip(marker.to_ne_bytes().iter().cycle()) {
    *byte = *pattern;
  }
}

fn is_painted(
  bytes: &[u8],
  marker: u16,
) -> bool {
  bytes.iter().zip(marker.to_ne_bytes().iter().cycle()).all(|(byte, pattern)| byte == pattern)
}

#[cfg(test)]
mod tests {
  use rand::{SeedableRng, rngs::StdRng};

  use super::*;
  use crate::Policy;

  #[test]
  fn test_paint() {
    let mut bytes = [0u8; 5];
    paint(&mut bytes, 0xABCD);

    assert!(is_painted(&bytes, 0xABCD));
    assert!(!is_painted(&bytes, 0xABCE));
    assert!(is_painted(&[], 0x1234));
  }

  #[test]
  fn test_check_detects_overwrite() {
    let mut heap = Heap::new(16 * 1024, Policy::Best).unwrap();
    let config = WorkloadConfig {
      chunks: 10,
      max_size: 64,
      ..WorkloadConfig::default()
    };
    let mut workload = Workload::new(&mut heap, config, StdRng::seed_from_u64(7));

    workload.fill(10).unwrap();
    assert!(workload.check(0).is_ok());

    let victim = workload.slots.iter().find(|slot| !slot.allocation.is_empty()).copied().unwrap();
    workload.heap.bytes_mut(&victim.allocation)[0] ^= 0xFF;

    assert_eq!(
      workload.check(3),
      Err(WorkloadError::Corrupted {
        iteration: 3,
        offset: victim.allocation.offset(),
        marker: victim.marker,
      })
    );
  }

  #[test]
  fn test_out_of_memory_is_reported() {
    let mut heap = Heap::new(256, Policy::First).unwrap();
    let config = WorkloadConfig {
      chunks: 100,
      max_size: 64,
      ..WorkloadConfig::default()
    };

    let result = Workload::new(&mut heap, config, StdRng::seed_from_u64(1)).run(|_| {});

    assert!(matches!(result, Err(WorkloadError::OutOfMemory { .. })));
  }
}
