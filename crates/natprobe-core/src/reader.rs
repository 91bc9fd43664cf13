//! Bounds-checked cursor over untrusted wire bytes.

use crate::error::{CodecError, CodecResult};

/// Big-endian reader that never reads past the end of its buffer.
///
/// Every read checks the remaining length first and returns
/// [`CodecError::Truncated`] instead of panicking.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `buf`
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Borrow the next `n` bytes and advance past them
    pub fn read_bytes(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read a fixed-size array
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a big-endian u16
    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Read a big-endian u32
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Advance up to `n` bytes, stopping at the end of the buffer.
    ///
    /// Returns the number of bytes actually skipped.
    pub fn skip_at_most(&mut self, n: usize) -> usize {
        let skipped = n.min(self.remaining());
        self.pos += skipped;
        skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian_fields() {
        let data = [0x01, 0x02, 0x21, 0x12, 0xA4, 0x42, 0xFF];
        let mut reader = ByteReader::new(&data);

        assert_eq!(reader.read_u16().unwrap(), 0x0102);
        assert_eq!(reader.read_u32().unwrap(), 0x2112_A442);
        assert_eq!(reader.read_u8().unwrap(), 0xFF);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.position(), 7);
    }

    #[test]
    fn test_short_read_is_an_error() {
        let data = [0x00, 0x01, 0x02];
        let mut reader = ByteReader::new(&data);

        let err = reader.read_u32().unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                needed: 4,
                remaining: 3
            }
        );
        // Failed reads do not consume input
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u16().unwrap(), 0x0001);
    }

    #[test]
    fn test_skip_stops_at_end() {
        let data = [0u8; 5];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.skip_at_most(3), 3);
        assert_eq!(reader.skip_at_most(3), 2);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_read_bytes_borrows_slice() {
        let data = b"natprobe";
        let mut reader = ByteReader::new(data);
        assert_eq!(reader.read_bytes(3).unwrap(), b"nat");
        assert_eq!(reader.read_bytes(5).unwrap(), b"probe");
        assert!(reader.read_bytes(1).is_err());
    }
}
