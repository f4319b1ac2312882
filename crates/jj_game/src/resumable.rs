//! Flat little-endian byte stream used for save/resume.
//!
//! Strings are prefixed with a single length byte, everything else is a fixed
//! width integer or float. The reader never panics on short input; it reports
//! how far it got so callers can tell a truncated file from a malformed one.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream truncated at offset {offset}: needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidString { offset: usize },
    #[error("malformed stream: {0}")]
    Malformed(String),
}

#[derive(Debug, Default)]
pub struct StreamWriter {
    buf: Vec<u8>,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Strings longer than 255 bytes are cut at the last char boundary that fits.
    pub fn write_string(&mut self, value: &str) {
        let mut len = value.len().min(u8::MAX as usize);
        while !value.is_char_boundary(len) {
            len -= 1;
        }
        self.buf.push(len as u8);
        self.buf.extend_from_slice(&value.as_bytes()[..len]);
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

#[derive(Debug)]
pub struct StreamReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StreamReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], StreamError> {
        if self.remaining() < count {
            return Err(StreamError::Truncated {
                offset: self.pos,
                needed: count - self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, StreamError> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, StreamError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, StreamError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, StreamError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        self.take_array()
    }

    pub fn read_string(&mut self) -> Result<String, StreamError> {
        let len = self.read_u8()? as usize;
        let offset = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| StreamError::InvalidString { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_fields_read_back_in_order() {
        let mut w = StreamWriter::new();
        w.write_u8(7);
        w.write_string("share/01_xmas1");
        w.write_f32(1234.5);
        w.write_i32(-3);
        w.write_i16(-512);
        let bytes = w.into_bytes();

        let mut r = StreamReader::new(&bytes);
        assert_eq!(r.read_u8().expect("u8"), 7);
        assert_eq!(r.read_string().expect("string"), "share/01_xmas1");
        assert_eq!(r.read_f32().expect("f32"), 1234.5);
        assert_eq!(r.read_i32().expect("i32"), -3);
        assert_eq!(r.read_i16().expect("i16"), -512);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let bytes = [1u8, 2, 3];
        let mut r = StreamReader::new(&bytes);
        r.read_u8().expect("first byte");
        let err = r.read_u32().expect_err("only two bytes left");
        assert_eq!(err, StreamError::Truncated { offset: 1, needed: 2 });
    }

    #[test]
    fn test_string_length_is_one_byte() {
        let long = "x".repeat(300);
        let mut w = StreamWriter::new();
        w.write_string(&long);
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 255);
        assert_eq!(bytes.len(), 256);
    }

    #[test]
    fn test_invalid_utf8_is_reported() {
        let bytes = [2u8, 0xFF, 0xFE];
        let err = StreamReader::new(&bytes)
            .read_string()
            .expect_err("invalid utf-8");
        assert_eq!(err, StreamError::InvalidString { offset: 1 });
    }
}
