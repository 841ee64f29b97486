use std::{fmt, str::FromStr};

use crate::chunk::Chunk;

/// How the heap picks a free chunk for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Policy {
  /// The first free chunk, in address order, that is large enough.
  #[default]
  First,
  /// The smallest free chunk that is large enough.
  Best,
  /// The largest free chunk that is large enough.
  Worst,
}

impl Policy {
  pub const ALL: [Policy; 3] = [Policy::First, Policy::Best, Policy::Worst];

  /// Scans `chunks` for a free chunk with at least `size` bytes of user data.
  ///
  /// `Best` and `Worst` keep the earliest chunk when capacities tie.
  pub(crate) fn locate(
    self,
    chunks: impl Iterator<Item = Chunk>,
    size: usize,
  ) -> Option<Chunk> {
    let mut candidates = chunks.filter(|chunk| chunk.is_free() && chunk.length() >= size);

    match self {
      Policy::First => candidates.next(),
      Policy::Best => candidates.reduce(smaller),
      Policy::Worst => candidates.reduce(larger),
    }
  }
}

fn smaller(
  best: Chunk,
  chunk: Chunk,
) -> Chunk {
  if chunk.length() < best.length() { chunk } else { best }
}

fn larger(
  worst: Chunk,
  chunk: Chunk,
) -> Chunk {
  if chunk.length() > worst.length() { chunk } else { worst }
}

impl fmt::Display for Policy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let name = match self {
      Policy::First => "first",
      Policy::Best => "best",
      Policy::Worst => "worst",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown allocation policy `{0}`, expected one of: first, best, worst")]
pub struct ParsePolicyError(String);

impl FromStr for Policy {
  type Err = ParsePolicyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "first" => Ok(Policy::First),
      "best" => Ok(Policy::Best),
      "worst" => Ok(Policy::Worst),
      _ => Err(ParsePolicyError(s.to_owned())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // Free chunks of 64, 256 and 128 bytes separated by occupied ones, then a
  // 256 byte free chunk that ties with the second.
  fn layout() -> Vec<Chunk> {
    let spans = [(64, true), (8, false), (256, true), (8, false), (128, true), (8, false), (256, true)];

    let mut offset = 0;
    let mut chunks = Vec::new();
    for (len, is_free) in spans {
      let next = offset + crate::chunk::HEADER_SIZE + len;
      chunks.push(Chunk::new(offset, Some(next), None, is_free));
      offset = next;
    }
    chunks
  }

  fn pick(
    policy: Policy,
    size: usize,
  ) -> Option<usize> {
    policy.locate(layout().into_iter(), size).map(|chunk| chunk.length())
  }

  #[test]
  fn test_first_fit() {
    let chunk = Policy::First.locate(layout().into_iter(), 100).unwrap();

    assert_eq!(chunk.length(), 256);
    assert_eq!(chunk.offset(), 64 + 16 + 8 + 16);
  }

  #[test]
  fn test_best_fit() {
    assert_eq!(pick(Policy::Best, 100), Some(128));
    assert_eq!(pick(Policy::Best, 8), Some(64));
  }

  #[test]
  fn test_worst_fit_keeps_earliest_on_tie() {
    let chunk = Policy::Worst.locate(layout().into_iter(), 100).unwrap();

    assert_eq!(chunk.length(), 256);
    assert_eq!(chunk.offset(), 104);
  }

  #[test]
  fn test_occupied_chunks_are_skipped() {
    for policy in Policy::ALL {
      assert_eq!(pick(policy, 257), None);
    }
    assert_eq!(pick(Policy::First, 0), Some(64));
  }

  #[test]
  fn test_parse_and_display() {
    for policy in Policy::ALL {
      assert_eq!(policy.to_string().parse::<Policy>(), Ok(policy));
    }
    assert_eq!("BEST".parse::<Policy>(), Ok(Policy::Best));
    assert!("next".parse::<Policy>().is_err());
  }
}
