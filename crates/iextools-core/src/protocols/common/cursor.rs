use thiserror::Error;

/// Error raised when a fixed-width read would cross the readable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("read out of bounds: need {needed} bytes at offset {position}, range ends at {end}")]
    OutOfBounds {
        position: usize,
        needed: usize,
        end: usize,
    },
}

/// Fixed-width value that can be copied out of the wire in host byte order.
pub trait FixedWidth: Copy {
    const WIDTH: usize;

    /// Build the value from exactly `WIDTH` bytes, host byte order.
    fn from_ne_slice(bytes: &[u8]) -> Self;

    /// Reverse the byte order of the value.
    fn swap_endian(self) -> Self;

    /// Convert a value read in host order from little-endian wire order.
    fn from_le(self) -> Self {
        if cfg!(target_endian = "little") {
            self
        } else {
            self.swap_endian()
        }
    }

    /// Convert a value read in host order from big-endian wire order.
    fn from_be(self) -> Self {
        if cfg!(target_endian = "big") {
            self
        } else {
            self.swap_endian()
        }
    }
}

macro_rules! impl_fixed_width {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn from_ne_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }

                fn swap_endian(self) -> Self {
                    self.swap_bytes()
                }
            }
        )*
    };
}

impl_fixed_width!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Section byte order used by container-level fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Read position over a borrowed, immutable capture buffer.
///
/// The cursor is `Copy`: duplicating it duplicates only the position marker,
/// never the bytes. An optional sub-range end restricts reads to a block or
/// message body.
///
/// # Examples
/// This type lives in an internal module, so the example is marked as text.
/// ```text
/// let bytes = [0x00, 0x50, 0x01, 0xbb];
/// let mut cursor = ByteCursor::new(&bytes);
/// assert_eq!(cursor.read_be::<u16>().unwrap(), 80);
/// assert_eq!(cursor.read_be::<u16>().unwrap(), 443);
/// assert!(cursor.read::<u8>().is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            end: buf.len(),
        }
    }

    /// Cursor over `buf` starting at `position`, readable up to the buffer end.
    pub fn at(buf: &'a [u8], position: usize) -> Result<Self, CursorError> {
        if position > buf.len() {
            return Err(CursorError::OutOfBounds {
                position,
                needed: 0,
                end: buf.len(),
            });
        }
        Ok(Self {
            buf,
            pos: position,
            end: buf.len(),
        })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.end
    }

    /// Bytes between the current position and the range end.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..self.end]
    }

    /// Copy of this cursor whose readable range stops `len` bytes ahead.
    pub fn bounded(&self, len: usize) -> Result<Self, CursorError> {
        self.require(len)?;
        Ok(Self {
            buf: self.buf,
            pos: self.pos,
            end: self.pos + len,
        })
    }

    /// Copy of this cursor whose readable range stops at absolute offset `end`.
    pub fn bounded_to(&self, end: usize) -> Result<Self, CursorError> {
        if end < self.pos {
            return Err(CursorError::OutOfBounds {
                position: self.pos,
                needed: 0,
                end,
            });
        }
        self.bounded(end - self.pos)
    }

    pub fn advance(&mut self, count: usize) -> Result<(), CursorError> {
        self.require(count)?;
        self.pos += count;
        Ok(())
    }

    /// Read a value in host byte order and advance past it.
    pub fn read<T: FixedWidth>(&mut self) -> Result<T, CursorError> {
        let bytes = self.take(T::WIDTH)?;
        Ok(T::from_ne_slice(bytes))
    }

    pub fn read_le<T: FixedWidth>(&mut self) -> Result<T, CursorError> {
        self.read::<T>().map(T::from_le)
    }

    pub fn read_be<T: FixedWidth>(&mut self) -> Result<T, CursorError> {
        self.read::<T>().map(T::from_be)
    }

    pub fn read_with<T: FixedWidth>(&mut self, order: Endianness) -> Result<T, CursorError> {
        match order {
            Endianness::Little => self.read_le(),
            Endianness::Big => self.read_be(),
        }
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a value at `offset` bytes ahead without moving the cursor.
    pub fn peek_at<T: FixedWidth>(&self, offset: usize, order: Endianness) -> Result<T, CursorError> {
        let mut ahead = *self;
        ahead.advance(offset)?;
        ahead.read_with(order)
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], CursorError> {
        self.require(count)?;
        let bytes = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    fn require(&self, count: usize) -> Result<(), CursorError> {
        if self.remaining() < count {
            return Err(CursorError::OutOfBounds {
                position: self.pos,
                needed: count,
                end: self.end,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteCursor, CursorError, Endianness, FixedWidth};

    #[test]
    fn read_advances_by_width() {
        let bytes = [1u8, 2, 3, 4, 5, 6, 7];
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read::<u8>().unwrap(), 1);
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_le::<u16>().unwrap(), 0x0302);
        assert_eq!(cursor.read_le::<u32>().unwrap(), 0x0706_0504);
        assert!(cursor.is_at_end());
    }

    #[test]
    fn read_past_end_is_out_of_bounds() {
        let bytes = [0u8; 3];
        let mut cursor = ByteCursor::new(&bytes);
        cursor.advance(1).unwrap();
        let err = cursor.read::<u32>().unwrap_err();
        assert_eq!(
            err,
            CursorError::OutOfBounds {
                position: 1,
                needed: 4,
                end: 3
            }
        );
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn bounded_cursor_stops_at_sub_range() {
        let bytes = [0xaa; 16];
        let cursor = ByteCursor::new(&bytes);
        let mut sub = cursor.bounded(5).unwrap();
        assert_eq!(sub.read::<u32>().unwrap(), 0xaaaa_aaaa);
        assert!(matches!(
            sub.read::<u16>(),
            Err(CursorError::OutOfBounds { end: 5, .. })
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn bounded_beyond_parent_fails() {
        let bytes = [0u8; 4];
        let cursor = ByteCursor::new(&bytes);
        assert!(cursor.bounded(5).is_err());
        assert!(cursor.bounded_to(4).is_ok());
    }

    #[test]
    fn copies_are_independent() {
        let bytes = [9u8, 8, 7];
        let mut first = ByteCursor::new(&bytes);
        let mut second = first;
        first.advance(2).unwrap();
        assert_eq!(second.read::<u8>().unwrap(), 9);
        assert_eq!(first.read::<u8>().unwrap(), 7);
    }

    #[test]
    fn swap_endian_reverses_bytes() {
        assert_eq!(0x1234u16.swap_endian(), 0x3412);
        assert_eq!(0x0102_0304u32.swap_endian(), 0x0403_0201);
        assert_eq!(7u8.swap_endian(), 7);
    }

    #[test]
    fn big_endian_reads_network_order() {
        let bytes = [0x00, 0x50, 0x01, 0xbb, 0x00, 0x10, 0xab, 0xcd];
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_be::<u16>().unwrap(), 80);
        assert_eq!(cursor.read_be::<u16>().unwrap(), 443);
        assert_eq!(cursor.read_with::<u16>(Endianness::Big).unwrap(), 16);
        assert_eq!(cursor.read_be::<u16>().unwrap(), 0xabcd);
    }

    #[test]
    fn peek_does_not_move() {
        let bytes = [0u8, 0, 0x4d, 0x3c, 0x2b, 0x1a];
        let cursor = ByteCursor::new(&bytes);
        let magic: u32 = cursor.peek_at(2, Endianness::Little).unwrap();
        assert_eq!(magic, 0x1a2b_3c4d);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn read_array_copies_bytes() {
        let bytes = *b"AAPL    rest";
        let mut cursor = ByteCursor::new(&bytes);
        let symbol: [u8; 8] = cursor.read_array().unwrap();
        assert_eq!(&symbol, b"AAPL    ");
        assert_eq!(cursor.rest(), b"rest");
    }
}
