// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire token constants.
//!
//! Every token is a single byte. Tokens either carry an inline payload
//! (primitive values, length-prefixed strings and arrays) or mark a
//! structural position (type headers, back-references, codec delegation).
//! Both endpoints must agree on these byte values exactly.

use crate::error::SerializationError;

/// Single-byte wire tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Token {
    // Structural
    Null = 0,
    Reference = 1,
    Fallback = 2,
    KeyedSerializer = 3,
    SpecifiedType = 4,
    ExpectedType = 5,
    NamedType = 6,
    /// Bare `object` sentinel: an object with no state of its own.
    Object = 7,

    // Primitive values with inline payload
    True = 8,
    False = 9,
    Byte = 10,
    SByte = 11,
    Short = 12,
    UShort = 13,
    Int = 14,
    UInt = 15,
    Long = 16,
    ULong = 17,
    Float = 18,
    Double = 19,
    Decimal = 20,
    Char = 21,
    String = 22,
    Guid = 23,
    Date = 24,
    TimeSpan = 25,

    // Arrays of blittable primitives: 4-byte length, then raw LE payload
    ByteArray = 32,
    SByteArray = 33,
    BoolArray = 34,
    CharArray = 35,
    ShortArray = 36,
    UShortArray = 37,
    IntArray = 38,
    UIntArray = 39,
    LongArray = 40,
    ULongArray = 41,
    FloatArray = 42,
    DoubleArray = 43,
    /// General array: element type descriptor + rank, dimensions in body.
    Array = 44,
}

impl Token {
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// True for tokens the simple-value fastpath understands.
    pub fn is_simple_value(self) -> bool {
        matches!(
            self,
            Token::Null
                | Token::True
                | Token::False
                | Token::Byte
                | Token::SByte
                | Token::Short
                | Token::UShort
                | Token::Int
                | Token::UInt
                | Token::Long
                | Token::ULong
                | Token::Float
                | Token::Double
                | Token::Decimal
                | Token::Char
                | Token::String
                | Token::Guid
                | Token::Date
                | Token::TimeSpan
        )
    }

    /// True for the twelve blittable-array tokens.
    pub fn is_primitive_array(self) -> bool {
        (Token::ByteArray.to_u8()..=Token::DoubleArray.to_u8()).contains(&self.to_u8())
    }
}

impl TryFrom<u8> for Token {
    type Error = SerializationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let token = match value {
            0 => Token::Null,
            1 => Token::Reference,
            2 => Token::Fallback,
            3 => Token::KeyedSerializer,
            4 => Token::SpecifiedType,
            5 => Token::ExpectedType,
            6 => Token::NamedType,
            7 => Token::Object,
            8 => Token::True,
            9 => Token::False,
            10 => Token::Byte,
            11 => Token::SByte,
            12 => Token::Short,
            13 => Token::UShort,
            14 => Token::Int,
            15 => Token::UInt,
            16 => Token::Long,
            17 => Token::ULong,
            18 => Token::Float,
            19 => Token::Double,
            20 => Token::Decimal,
            21 => Token::Char,
            22 => Token::String,
            23 => Token::Guid,
            24 => Token::Date,
            25 => Token::TimeSpan,
            32 => Token::ByteArray,
            33 => Token::SByteArray,
            34 => Token::BoolArray,
            35 => Token::CharArray,
            36 => Token::ShortArray,
            37 => Token::UShortArray,
            38 => Token::IntArray,
            39 => Token::UIntArray,
            40 => Token::LongArray,
            41 => Token::ULongArray,
            42 => Token::FloatArray,
            43 => Token::DoubleArray,
            44 => Token::Array,
            other => {
                return Err(SerializationError::StreamFormat {
                    offset: 0,
                    reason: format!("unknown token byte {:#04x}", other),
                })
            }
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip_all() {
        for byte in 0u8..=255 {
            if let Ok(token) = Token::try_from(byte) {
                assert_eq!(token.to_u8(), byte);
            }
        }
    }

    #[test]
    fn test_unknown_token_rejected() {
        assert!(Token::try_from(26).is_err());
        assert!(Token::try_from(31).is_err());
        assert!(Token::try_from(45).is_err());
        assert!(Token::try_from(255).is_err());
    }

    #[test]
    fn test_simple_value_classification() {
        assert!(Token::Int.is_simple_value());
        assert!(Token::Null.is_simple_value());
        assert!(Token::Guid.is_simple_value());
        assert!(!Token::Reference.is_simple_value());
        assert!(!Token::SpecifiedType.is_simple_value());
        assert!(!Token::ByteArray.is_simple_value());
    }

    #[test]
    fn test_primitive_array_classification() {
        assert!(Token::ByteArray.is_primitive_array());
        assert!(Token::DoubleArray.is_primitive_array());
        assert!(!Token::Array.is_primitive_array());
        assert!(!Token::String.is_primitive_array());
    }
}
