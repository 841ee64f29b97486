use crate::arena::Arena;

/// Size of a chunk header: the tagged `next` word followed by the `previous` word.
pub const HEADER_SIZE: usize = 2 * size_of::<u64>();

/// Offset stored in place of a missing neighbour. It is never a valid header
/// offset and keeps the low tag bits clear.
pub(crate) const NIL: usize = usize::MAX & !TAG_MASK;

const FREE_BIT: usize = 0b1;
const TAG_MASK: usize = crate::align::ALIGNMENT - 1;

/// A decoded view of one chunk header living in the arena.
///
/// ```text
///   offset          offset + 16                         next
///   ┌───────────────┬───────────────────────────────────┬──────────
///   │ next | free   │                                   │ header of
///   │ previous      │          user data                │ next chunk
///   └───────────────┴───────────────────────────────────┴──────────
/// ```
///
/// The view is a copy: changes only reach the arena through [`Chunk::store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
  pub(crate) offset: usize,
  pub(crate) next: Option<usize>,
  pub(crate) previous: Option<usize>,
  pub(crate) is_free: bool,
}

impl Chunk {
  pub(crate) fn new(
    offset: usize,
    next: Option<usize>,
    previous: Option<usize>,
    is_free: bool,
  ) -> Self {
    Self {
      offset,
      next,
      previous,
      is_free,
    }
  }

  pub(crate) fn load(
    arena: &Arena,
    offset: usize,
  ) -> Self {
    let tagged = arena.read_word(offset);
    let previous = arena.read_word(offset + size_of::<u64>());

    Self {
      offset,
      next: link(tagged & !FREE_BIT),
      previous: link(previous),
      is_free: tagged & FREE_BIT != 0,
    }
  }

  pub(crate) fn store(
    &self,
    arena: &mut Arena,
  ) {
    let mut tagged = self.next.unwrap_or(NIL);
    if self.is_free {
      tagged |= FREE_BIT;
    }

    arena.write_word(self.offset, tagged);
    arena.write_word(self.offset + size_of::<u64>(), self.previous.unwrap_or(NIL));
  }

  /// Offset of the header inside the arena.
  pub fn offset(&self) -> usize {
    self.offset
  }

  /// Offset of the first user-data byte.
  pub fn user_data(&self) -> usize {
    self.offset + HEADER_SIZE
  }

  /// Usable bytes between the end of this header and the next header.
  pub fn length(&self) -> usize {
    self.next.map_or(0, |next| next - self.user_data())
  }

  pub fn is_free(&self) -> bool {
    self.is_free
  }

  pub(crate) fn is_sentinel(&self) -> bool {
    self.next.is_none()
  }
}

fn link(raw: usize) -> Option<usize> {
  (raw != NIL).then_some(raw)
}

/// Address-ordered walk over every chunk except the sentinel.
pub struct Chunks<'a> {
  arena: &'a Arena,
  cursor: Option<usize>,
}

impl<'a> Chunks<'a> {
  pub(crate) fn new(arena: &'a Arena) -> Self {
    Self {
      arena,
      cursor: Some(0),
    }
  }
}

impl Iterator for Chunks<'_> {
  type Item = Chunk;

  fn next(&mut self) -> Option<Self::Item> {
    let chunk = Chunk::load(self.arena, self.cursor?);

    if chunk.is_sentinel() {
      self.cursor = None;
      return None;
    }

    self.cursor = chunk.next;
    Some(chunk)
  }
}
