//! # rfreelist - A Fixed-Arena Free-List Allocator
//!
//! This crate provides an **explicit free-list heap** that serves allocations
//! out of one arena reserved up front with `mmap(2)`. Every chunk, free or
//! occupied, starts with a small header linking it to its neighbours, so the
//! whole arena is one address-ordered, doubly-linked list.
//!
//! ## Overview
//!
//! ```text
//!   Arena Layout:
//!
//!   ┌─────┬──────────┬─────┬──────┬─────┬──────────────────────────┬─────┐
//!   │ hdr │ A (used) │ hdr │ B    │ hdr │   free (wilderness)      │ hdr │
//!   └─────┴──────────┴─────┴──────┴─────┴──────────────────────────┴─────┘
//!     ▲                ▲              ▲                              ▲
//!     └── next/prev ──►└─ next/prev ─►└────────── next/prev ────────►│
//!                                                                 sentinel
//!                                                        (zero length, never free)
//! ```
//!
//! Allocating walks the list under one of three policies:
//!
//! - **First**: the first free chunk that is large enough.
//! - **Best**: the smallest free chunk that is large enough.
//! - **Worst**: the largest free chunk.
//!
//! The chosen chunk is split when its unused tail is larger than the split
//! threshold. Freeing merges the chunk with a free successor and then with a
//! free predecessor, so two free chunks are never adjacent.
//!
//! ## Crate Structure
//!
//! ```text
//!   rfreelist
//!   ├── align      - Alignment macros (align!, align_down!)
//!   ├── arena      - mmap-backed byte region (internal)
//!   ├── chunk      - Chunk header layout and list walk
//!   ├── config     - HeapConfig
//!   ├── error      - HeapError, Corruption
//!   ├── heap       - Heap implementation
//!   ├── policy     - First / Best / Worst fit
//!   ├── stats      - Chunk counts and fragmentation level
//!   └── workload   - Randomised stress workload (feature `workload`)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rfreelist::{Heap, Policy};
//!
//! let mut heap = Heap::new(16 * 1024, Policy::Best).unwrap();
//!
//! let allocation = heap.allocate(12).unwrap();
//! heap.bytes_mut(&allocation).copy_from_slice(b"hello, arena");
//!
//! assert_eq!(heap.bytes(&allocation), b"hello, arena");
//! assert_eq!(allocation.offset() % 8, 0);
//!
//! heap.free(allocation);
//! assert_eq!(heap.stats().free_chunks, 1);
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Heap` is neither `Send` nor `Sync`
//! - **Fixed size**: the arena never grows or shrinks
//! - **Unix-only**: the arena comes from `libc::mmap`

pub mod align;
mod arena;
mod chunk;
mod config;
mod error;
mod heap;
mod policy;
mod stats;
#[cfg(feature = "workload")]
pub mod workload;

pub use chunk::{Chunk, Chunks, HEADER_SIZE};
pub use config::{DEFAULT_SPLIT_THRESHOLD, HeapConfig};
pub use error::{Corruption, HeapError, Result};
pub use heap::{Allocation, Heap};
pub use policy::{ParsePolicyError, Policy};
pub use stats::Stats;
