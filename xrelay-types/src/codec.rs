//! Zero-copy binary codec used by the relay chain.
//!
//! Integers are little-endian. Variable-length fields are prefixed with a
//! var-uint: a single byte below `0xFD`, otherwise a marker byte followed by a
//! u16 (`0xFD`), u32 (`0xFE`) or u64 (`0xFF`).

use crate::CodecError;

/// Size in bytes of a relay-chain hash.
pub const HASH_SIZE: usize = 32;

/// Size in bytes of a relay-chain address.
pub const ADDRESS_SIZE: usize = 20;

/// Forward-only reader over a byte slice.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Source<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying buffer.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take exactly `n` bytes or fail without moving the cursor.
    pub fn next_bytes(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                field,
                offset: self.pos,
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn next_u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
        Ok(self.next_bytes(1, field)?[0])
    }

    pub fn next_u16(&mut self, field: &'static str) -> Result<u16, CodecError> {
        let bytes = self.next_bytes(2, field)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn next_u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.next_bytes(4, field)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub fn next_u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.next_bytes(8, field)?);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn next_hash(&mut self, field: &'static str) -> Result<[u8; HASH_SIZE], CodecError> {
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(self.next_bytes(HASH_SIZE, field)?);
        Ok(hash)
    }

    pub fn next_address(&mut self, field: &'static str) -> Result<[u8; ADDRESS_SIZE], CodecError> {
        let mut address = [0u8; ADDRESS_SIZE];
        address.copy_from_slice(self.next_bytes(ADDRESS_SIZE, field)?);
        Ok(address)
    }

    /// Read a var-uint, rejecting non-minimal encodings.
    pub fn next_var_uint(&mut self, field: &'static str) -> Result<u64, CodecError> {
        let start = self.pos;
        let marker = self.next_u8(field)?;
        let (value, min) = match marker {
            0xFD => (self.next_u16(field)? as u64, 0xFD),
            0xFE => (self.next_u32(field)? as u64, 0x1_0000),
            0xFF => (self.next_u64(field)?, 0x1_0000_0000),
            v => return Ok(v as u64),
        };
        if value < min {
            return Err(CodecError::NonCanonicalVarInt { field, offset: start });
        }
        Ok(value)
    }

    pub fn next_var_bytes(&mut self, field: &'static str) -> Result<&'a [u8], CodecError> {
        let offset = self.pos;
        let len = self.next_var_uint(field)?;
        let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof { field, offset })?;
        self.next_bytes(len, field)
            .map_err(|_| CodecError::UnexpectedEof { field, offset })
    }

    pub fn next_var_string(&mut self, field: &'static str) -> Result<String, CodecError> {
        let bytes = self.next_var_bytes(field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { field })
    }

    /// Fail if any input is left.
    pub fn finish(&self) -> Result<(), CodecError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes {
                remaining: self.remaining(),
            })
        }
    }
}

/// Append-only writer producing the relay chain's binary layout.
#[derive(Debug, Default, Clone)]
pub struct Sink {
    buf: Vec<u8>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn write_var_uint(&mut self, v: u64) -> &mut Self {
        if v < 0xFD {
            self.buf.push(v as u8);
        } else if v <= 0xFFFF {
            self.buf.push(0xFD);
            self.buf.extend_from_slice(&(v as u16).to_le_bytes());
        } else if v <= 0xFFFF_FFFF {
            self.buf.push(0xFE);
            self.buf.extend_from_slice(&(v as u32).to_le_bytes());
        } else {
            self.buf.push(0xFF);
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
        self
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_var_uint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn write_var_string(&mut self, s: &str) -> &mut Self {
        self.write_var_bytes(s.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
