// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounds-checked little-endian token stream reader.

use crate::error::{SerResult, SerializationError};
use crate::token::Token;
use crate::values::{DateTime, DateTimeKind, Decimal, TimeSpan};
use uuid::Uuid;

/// Generate read methods for little-endian primitives.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> SerResult<$type> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.read_bytes($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Cursor over an immutable byte buffer.
#[derive(Debug)]
pub struct TokenReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> TokenReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Current read position; the decode-side back-reference table keys
    /// on this value.
    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    fn truncated(&self) -> SerializationError {
        SerializationError::StreamFormat {
            offset: self.offset,
            reason: "unexpected end of buffer".into(),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> SerResult<&'a [u8]> {
        if self.offset + len > self.buffer.len() {
            return Err(self.truncated());
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Look at the next token without consuming it.
    ///
    /// This is what keeps `try_read_simple` non-destructive: on a
    /// non-simple token the cursor stays positioned at the token byte.
    pub fn peek_token(&self) -> SerResult<Token> {
        let byte = *self.buffer.get(self.offset).ok_or_else(|| self.truncated())?;
        Token::try_from(byte).map_err(|_| SerializationError::StreamFormat {
            offset: self.offset,
            reason: format!("unknown token byte {:#04x}", byte),
        })
    }

    pub fn read_token(&mut self) -> SerResult<Token> {
        let token = self.peek_token()?;
        self.offset += 1;
        Ok(token)
    }

    pub fn read_u8(&mut self) -> SerResult<u8> {
        let byte = *self.buffer.get(self.offset).ok_or_else(|| self.truncated())?;
        self.offset += 1;
        Ok(byte)
    }

    impl_read_le!(read_i8, i8, 1);
    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_u64, u64, 8);
    impl_read_le!(read_i64, i64, 8);

    pub fn read_f32(&mut self) -> SerResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> SerResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_char(&mut self) -> SerResult<char> {
        let offset = self.offset;
        let scalar = self.read_u32()?;
        char::from_u32(scalar).ok_or_else(|| SerializationError::StreamFormat {
            offset,
            reason: format!("invalid char scalar {:#x}", scalar),
        })
    }

    pub fn read_str(&mut self) -> SerResult<String> {
        let offset = self.offset;
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| SerializationError::StreamFormat {
            offset,
            reason: format!("invalid UTF-8 string: {}", e),
        })
    }

    pub fn read_guid(&mut self) -> SerResult<Uuid> {
        let bytes = self.read_bytes(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Ok(Uuid::from_bytes(raw))
    }

    pub fn read_date(&mut self) -> SerResult<DateTime> {
        let ticks = self.read_i64()?;
        let offset = self.offset;
        let kind_byte = self.read_u8()?;
        let kind = DateTimeKind::from_u8(kind_byte).ok_or_else(|| {
            SerializationError::StreamFormat {
                offset,
                reason: format!("invalid date kind byte {}", kind_byte),
            }
        })?;
        Ok(DateTime::new(ticks, kind))
    }

    pub fn read_timespan(&mut self) -> SerResult<TimeSpan> {
        Ok(TimeSpan::from_ticks(self.read_i64()?))
    }

    pub fn read_decimal(&mut self) -> SerResult<Decimal> {
        let bytes = self.read_bytes(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Ok(Decimal::from_le_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::TokenWriter;

    #[test]
    fn test_peek_does_not_consume() {
        let bytes = [Token::Int.to_u8(), 42, 0, 0, 0];
        let mut r = TokenReader::new(&bytes);
        assert_eq!(r.peek_token().unwrap(), Token::Int);
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_token().unwrap(), Token::Int);
        assert_eq!(r.read_i32().unwrap(), 42);
        assert!(r.is_eof());
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let bytes = [1u8, 2];
        let mut r = TokenReader::new(&bytes);
        r.read_u8().expect("first byte should read");
        let err = r.read_u32().unwrap_err();
        match err {
            SerializationError::StreamFormat { offset, reason } => {
                assert_eq!(offset, 1);
                assert_eq!(reason, "unexpected end of buffer");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_primitive_roundtrip() {
        let mut w = TokenWriter::new();
        w.write_i16(-5);
        w.write_u64(7);
        w.write_f64(6.25);
        w.write_char('λ');
        w.write_str("grain");
        let bytes = w.into_bytes();

        let mut r = TokenReader::new(&bytes);
        assert_eq!(r.read_i16().unwrap(), -5);
        assert_eq!(r.read_u64().unwrap(), 7);
        assert!((r.read_f64().unwrap() - 6.25).abs() < f64::EPSILON);
        assert_eq!(r.read_char().unwrap(), 'λ');
        assert_eq!(r.read_str().unwrap(), "grain");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let bytes = [2, 0, 0, 0, 0xFF, 0xFE];
        let mut r = TokenReader::new(&bytes);
        assert!(r.read_str().is_err());
    }

    #[test]
    fn test_invalid_char_scalar_rejected() {
        let mut w = TokenWriter::new();
        w.write_u32(0xD800); // surrogate range
        let bytes = w.into_bytes();
        let mut r = TokenReader::new(&bytes);
        assert!(r.read_char().is_err());
    }

    #[test]
    fn test_date_roundtrip() {
        let mut w = TokenWriter::new();
        let date = DateTime::new(637_000_000_000_000_000, DateTimeKind::Local);
        w.write_date(date);
        w.write_timespan(TimeSpan::from_seconds(90));
        let bytes = w.into_bytes();

        let mut r = TokenReader::new(&bytes);
        assert_eq!(r.read_date().unwrap(), date);
        assert_eq!(r.read_timespan().unwrap(), TimeSpan::from_seconds(90));
    }
}
