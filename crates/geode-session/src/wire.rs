//! Big-endian primitives shared by the serializers.
//!
//! Layout of the encoded forms:
//!
//! ```text
//! name         u16 byte length, UTF-8 bytes
//! typed value  u8 tag, payload
//!   0x00 null
//!   0x01 bool    u8 (0 or 1)
//!   0x02 int     i32
//!   0x03 long    i64
//!   0x04 double  u64 IEEE-754 bits
//!   0x05 string  i32 byte length, UTF-8 bytes
//!   0x06 opaque  i32 byte length, bytes
//! ```
//!
//! Reads never panic on short input; every read checks the remaining length
//! and reports a [`Error::Serialization`] instead.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::value::AttributeValue;

const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_LONG: u8 = 0x03;
const TAG_DOUBLE: u8 = 0x04;
const TAG_STRING: u8 = 0x05;
const TAG_OPAQUE: u8 = 0x06;

/// Encoding sink.
#[derive(Debug, Default)]
pub struct DataOutput {
    buf: BytesMut,
}

impl DataOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    /// Write a collection length as an `i32` count.
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| Error::malformed(format!("count {count} exceeds i32 range")))?;
        self.buf.put_i32(count);
        Ok(())
    }

    /// Write a `u16`-length-prefixed UTF-8 name.
    pub fn write_name(&mut self, name: &str) -> Result<()> {
        let len = u16::try_from(name.len()).map_err(|_| {
            Error::malformed(format!("name of {} bytes exceeds 65535", name.len()))
        })?;
        self.buf.put_u16(len);
        self.buf.put_slice(name.as_bytes());
        Ok(())
    }

    fn write_blob(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_count(bytes.len())?;
        self.buf.put_slice(bytes);
        Ok(())
    }

    /// Write a tagged attribute value.
    pub fn write_value(&mut self, value: &AttributeValue) -> Result<()> {
        match value {
            AttributeValue::Null => self.buf.put_u8(TAG_NULL),
            AttributeValue::Bool(b) => {
                self.buf.put_u8(TAG_BOOL);
                self.buf.put_u8(u8::from(*b));
            }
            AttributeValue::Int(n) => {
                self.buf.put_u8(TAG_INT);
                self.buf.put_i32(*n);
            }
            AttributeValue::Long(n) => {
                self.buf.put_u8(TAG_LONG);
                self.buf.put_i64(*n);
            }
            AttributeValue::Double(n) => {
                self.buf.put_u8(TAG_DOUBLE);
                self.buf.put_u64(n.to_bits());
            }
            AttributeValue::String(s) => {
                self.buf.put_u8(TAG_STRING);
                self.write_blob(s.as_bytes())?;
            }
            AttributeValue::Opaque(bytes) => {
                self.buf.put_u8(TAG_OPAQUE);
                self.write_blob(bytes)?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Decoding source over a borrowed buffer.
#[derive(Debug)]
pub struct DataInput<'a> {
    buf: &'a [u8],
}

impl<'a> DataInput<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(Error::malformed(format!(
                "truncated stream reading {what}: need {n} bytes, have {}",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1, "u8")?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.need(4, "u32")?;
        Ok(self.buf.get_u32())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.need(4, "i32")?;
        Ok(self.buf.get_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.need(8, "i64")?;
        Ok(self.buf.get_i64())
    }

    /// Read an `i32` count, rejecting negative values.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| Error::malformed(format!("negative count {count}")))
    }

    fn read_slice(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        self.need(len, what)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn read_utf8(&mut self, len: usize, what: &str) -> Result<String> {
        let raw = self.read_slice(len, what)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|e| Error::malformed(format!("invalid UTF-8 in {what}: {e}")))
    }

    pub fn read_name(&mut self) -> Result<String> {
        self.need(2, "name length")?;
        let len = usize::from(self.buf.get_u16());
        self.read_utf8(len, "name")
    }

    pub fn read_value(&mut self) -> Result<AttributeValue> {
        let tag = self.read_u8()?;
        let value = match tag {
            TAG_NULL => AttributeValue::Null,
            TAG_BOOL => match self.read_u8()? {
                0 => AttributeValue::Bool(false),
                1 => AttributeValue::Bool(true),
                other => return Err(Error::malformed(format!("invalid bool byte {other}"))),
            },
            TAG_INT => AttributeValue::Int(self.read_i32()?),
            TAG_LONG => AttributeValue::Long(self.read_i64()?),
            TAG_DOUBLE => {
                self.need(8, "double")?;
                AttributeValue::Double(f64::from_bits(self.buf.get_u64()))
            }
            TAG_STRING => {
                let len = self.read_count()?;
                AttributeValue::String(self.read_utf8(len, "string value")?)
            }
            TAG_OPAQUE => {
                let len = self.read_count()?;
                AttributeValue::Opaque(self.read_slice(len, "opaque value")?.to_vec())
            }
            other => return Err(Error::malformed(format!("unknown value tag {other:#04x}"))),
        };
        Ok(value)
    }

    /// Fail if any bytes are left after a complete decode.
    pub fn finish(&self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(Error::malformed(format!(
                "{} trailing bytes after payload",
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}
