/// Granularity of every chunk header and user-data region, in bytes.
pub const ALIGNMENT: usize = 8;

/// Rounds the given size up to the next multiple of [`ALIGNMENT`].
///
/// # Examples
///
/// ```rust
/// use rfreelist::align;
///
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(0), 0);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Rounds the given size down to the previous multiple of [`ALIGNMENT`].
#[macro_export]
macro_rules! align_down {
  ($value:expr) => {
    $value & !($crate::align::ALIGNMENT - 1)
  };
}

#[cfg(test)]
mod tests {
  use crate::chunk::HEADER_SIZE;

  #[test]
  fn test_align() {
    let cases: [(usize, usize); 8] = [(0, 0), (1, 8), (7, 8), (8, 8), (9, 16), (13, 16), (116, 120), (1008, 1008)];

    for (size, expected) in cases {
      assert_eq!(align!(size), expected, "size {size}");
    }
  }

  #[test]
  fn test_align_places_next_header_on_boundary() {
    for size in 0..64usize {
      let end = align!(size + HEADER_SIZE);

      assert!(end >= size + HEADER_SIZE);
      assert!(end - (size + HEADER_SIZE) < super::ALIGNMENT);
      assert_eq!(end % super::ALIGNMENT, 0);
    }
  }

  #[test]
  fn test_align_down() {
    assert_eq!(align_down!(0usize), 0);
    assert_eq!(align_down!(7usize), 0);
    assert_eq!(align_down!(8usize), 8);
    assert_eq!(align_down!(16_383usize), 16_376);
  }
}
