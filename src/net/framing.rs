//! Fixed-width field I/O for wire frames
//!
//! The transport delivers whole messages, so frames carry no outer length
//! prefix. Inside a frame every integer is little-endian and every string is
//! a `u32` byte length followed by UTF-8 bytes.

/// Frame builder for constructing messages
#[derive(Debug)]
pub struct FrameBuilder {
    buffer: Vec<u8>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Write raw bytes to the frame
    pub fn write(mut self, data: &[u8]) -> Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Write a u8
    pub fn write_u8(mut self, value: u8) -> Self {
        self.buffer.push(value);
        self
    }

    /// Write a u16 (little-endian)
    pub fn write_u16(mut self, value: u16) -> Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a u32 (little-endian)
    pub fn write_u32(mut self, value: u32) -> Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write an i32 (little-endian)
    pub fn write_i32(mut self, value: i32) -> Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a length-prefixed UTF-8 string
    ///
    /// Strings longer than `u32::MAX` bytes cannot exist on any supported
    /// target, so the length cast is lossless.
    pub fn write_str(self, value: &str) -> Self {
        self.write_u32(value.len() as u32).write(value.as_bytes())
    }

    /// Get the built frame
    pub fn build(self) -> Vec<u8> {
        self.buffer
    }

    /// Get the current length
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of reading a string field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrField<'a> {
    Ok(&'a str),
    /// Length prefix was satisfied but the bytes are not UTF-8
    InvalidUtf8,
}

/// Frame reader for parsing messages
///
/// Every read returns `None` when fewer bytes remain than the field needs;
/// the position is left unchanged in that case.
#[derive(Debug)]
pub struct FrameReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read n bytes
    pub fn read(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(n)?;
        if end > self.data.len() {
            return None;
        }
        let slice = &self.data[self.position..end];
        self.position = end;
        Some(slice)
    }

    /// Read a u8
    pub fn read_u8(&mut self) -> Option<u8> {
        self.read(1).map(|b| b[0])
    }

    /// Read a u16 (little-endian)
    pub fn read_u16(&mut self) -> Option<u16> {
        self.read(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a u32 (little-endian)
    pub fn read_u32(&mut self) -> Option<u32> {
        self.read(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read an i32 (little-endian)
    pub fn read_i32(&mut self) -> Option<i32> {
        self.read(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a length-prefixed string
    pub fn read_str(&mut self) -> Option<StrField<'a>> {
        let start = self.position;
        let len = self.read_u32()? as usize;
        let Some(bytes) = self.read(len) else {
            self.position = start;
            return None;
        };
        Some(match std::str::from_utf8(bytes) {
            Ok(s) => StrField::Ok(s),
            Err(_) => StrField::InvalidUtf8,
        })
    }

    /// Get remaining bytes
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Check if there are more bytes to read
    pub fn has_remaining(&self) -> bool {
        self.position < self.data.len()
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.position
    }
}
