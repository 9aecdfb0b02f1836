// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type headers and type descriptors.
//!
//! A type header is either a single `ExpectedType` token (the concrete
//! type equals the statically expected one, so the reader already knows
//! it) or `SpecifiedType` followed by a descriptor. Descriptors spend one
//! token byte on well-known types, a dedicated array token on rank-1
//! blittable arrays, and `NamedType` plus the key string otherwise. The
//! collapse is a pure size optimization and is mechanical on both sides.

use crate::error::{SerResult, SerializationError};
use crate::registry::{primitive_by_key, TypeRegistry};
use crate::stream::{TokenReader, TokenWriter};
use crate::token::Token;
use crate::type_key::{ResolvedType, TypeShape};

/// Value token doubling as the type descriptor of a primitive key.
fn token_for_primitive(key: &str) -> Option<Token> {
    Some(match key {
        "bool" => Token::True, // descriptor position only; value side never uses it
        "byte" => Token::Byte,
        "sbyte" => Token::SByte,
        "short" => Token::Short,
        "ushort" => Token::UShort,
        "int" => Token::Int,
        "uint" => Token::UInt,
        "long" => Token::Long,
        "ulong" => Token::ULong,
        "float" => Token::Float,
        "double" => Token::Double,
        "decimal" => Token::Decimal,
        "char" => Token::Char,
        "string" => Token::String,
        "guid" => Token::Guid,
        "date" => Token::Date,
        "timespan" => Token::TimeSpan,
        "object" => Token::Object,
        _ => return None,
    })
}

fn primitive_for_token(token: Token) -> Option<&'static str> {
    Some(match token {
        Token::True => "bool",
        Token::Byte => "byte",
        Token::SByte => "sbyte",
        Token::Short => "short",
        Token::UShort => "ushort",
        Token::Int => "int",
        Token::UInt => "uint",
        Token::Long => "long",
        Token::ULong => "ulong",
        Token::Float => "float",
        Token::Double => "double",
        Token::Decimal => "decimal",
        Token::Char => "char",
        Token::String => "string",
        Token::Guid => "guid",
        Token::Date => "date",
        Token::TimeSpan => "timespan",
        Token::Object => "object",
        _ => return None,
    })
}

/// Array token of a rank-1 array over the given blittable element key.
pub(crate) fn array_token_for_element(key: &str) -> Option<Token> {
    Some(match key {
        "byte" => Token::ByteArray,
        "sbyte" => Token::SByteArray,
        "bool" => Token::BoolArray,
        "char" => Token::CharArray,
        "short" => Token::ShortArray,
        "ushort" => Token::UShortArray,
        "int" => Token::IntArray,
        "uint" => Token::UIntArray,
        "long" => Token::LongArray,
        "ulong" => Token::ULongArray,
        "float" => Token::FloatArray,
        "double" => Token::DoubleArray,
        _ => return None,
    })
}

pub(crate) fn element_for_array_token(token: Token) -> Option<&'static str> {
    Some(match token {
        Token::ByteArray => "byte",
        Token::SByteArray => "sbyte",
        Token::BoolArray => "bool",
        Token::CharArray => "char",
        Token::ShortArray => "short",
        Token::UShortArray => "ushort",
        Token::IntArray => "int",
        Token::UIntArray => "uint",
        Token::LongArray => "long",
        Token::ULongArray => "ulong",
        Token::FloatArray => "float",
        Token::DoubleArray => "double",
        _ => return None,
    })
}

/// Write `ExpectedType` when the concrete type matches the expected one,
/// else `SpecifiedType` plus the concrete descriptor.
pub(crate) fn write_type_header(
    writer: &mut TokenWriter,
    concrete: &ResolvedType,
    expected: Option<&ResolvedType>,
) {
    if expected.map(|e| e.key() == concrete.key()).unwrap_or(false) {
        writer.write_token(Token::ExpectedType);
    } else {
        writer.write_token(Token::SpecifiedType);
        write_type_descriptor(writer, concrete);
    }
}

pub(crate) fn write_type_descriptor(writer: &mut TokenWriter, ty: &ResolvedType) {
    match ty.shape() {
        TypeShape::Array { element, rank } => {
            if *rank == 1 {
                if let Some(token) = array_token_for_element(element.key().as_str()) {
                    writer.write_token(token);
                    return;
                }
            }
            writer.write_token(Token::Array);
            write_type_descriptor(writer, element);
            writer.write_u32(*rank);
        }
        _ => {
            if let Some(token) = token_for_primitive(ty.key().as_str()) {
                writer.write_token(token);
            } else {
                writer.write_token(Token::NamedType);
                writer.write_str(ty.key().as_str());
            }
        }
    }
}

pub(crate) fn read_type_descriptor(
    registry: &TypeRegistry,
    reader: &mut TokenReader<'_>,
) -> SerResult<ResolvedType> {
    let offset = reader.position();
    let token = reader.read_token()?;
    if let Some(key) = primitive_for_token(token) {
        return Ok(primitive_by_key(key).unwrap_or_else(|| {
            unreachable!("primitive key {} must be in the table", key)
        }));
    }
    if let Some(elem_key) = element_for_array_token(token) {
        let element = primitive_by_key(elem_key)
            .unwrap_or_else(|| unreachable!("element key {} must be in the table", elem_key));
        return Ok(ResolvedType::array(element, 1));
    }
    match token {
        Token::NamedType => {
            let key = reader.read_str()?;
            registry.resolve(&key)
        }
        Token::Array => {
            let element = read_type_descriptor(registry, reader)?;
            let rank = reader.read_u32()?;
            if rank == 0 {
                return Err(SerializationError::stream(offset, "array rank of zero"));
            }
            Ok(ResolvedType::array(element, rank))
        }
        other => Err(SerializationError::StreamFormat {
            offset,
            reason: format!("token {:?} is not a type descriptor", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::fallback::DynStructReflector;
    use crate::type_key::TypeKey;
    use std::sync::Arc;

    fn empty_registry() -> TypeRegistry {
        TypeRegistry::new(
            Vec::new(),
            Vec::new(),
            std::collections::HashMap::new(),
            Arc::new(DynStructReflector),
            None,
        )
    }

    #[test]
    fn test_expected_type_collapse() {
        let ty = primitive_by_key("int").unwrap();
        let mut w = TokenWriter::new();
        write_type_header(&mut w, &ty, Some(&ty));
        assert_eq!(w.into_bytes(), vec![Token::ExpectedType.to_u8()]);
    }

    #[test]
    fn test_specified_primitive_descriptor() {
        let ty = primitive_by_key("int").unwrap();
        let mut w = TokenWriter::new();
        write_type_header(&mut w, &ty, None);
        let bytes = w.into_bytes();
        assert_eq!(
            bytes,
            vec![Token::SpecifiedType.to_u8(), Token::Int.to_u8()]
        );
    }

    #[test]
    fn test_blittable_array_descriptor_roundtrip() {
        let ty = ResolvedType::array(primitive_by_key("byte").unwrap(), 1);
        let mut w = TokenWriter::new();
        write_type_descriptor(&mut w, &ty);
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![Token::ByteArray.to_u8()]);

        let registry = empty_registry();
        let mut r = TokenReader::new(&bytes);
        let decoded = read_type_descriptor(&registry, &mut r).unwrap();
        assert_eq!(decoded.key().as_str(), "byte[]");
    }

    #[test]
    fn test_general_array_descriptor_roundtrip() {
        // rank-3 string array has no dedicated token
        let ty = ResolvedType::array(primitive_by_key("string").unwrap(), 3);
        let mut w = TokenWriter::new();
        write_type_descriptor(&mut w, &ty);
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], Token::Array.to_u8());

        let registry = empty_registry();
        let mut r = TokenReader::new(&bytes);
        let decoded = read_type_descriptor(&registry, &mut r).unwrap();
        assert_eq!(decoded.key().as_str(), "string[,,]");
    }

    #[test]
    fn test_named_descriptor_resolves_through_registry() {
        let registry = empty_registry();
        registry.register_marker("demo.widget", None);

        let ty = ResolvedType::named(TypeKey::from("demo.widget"));
        let mut w = TokenWriter::new();
        write_type_descriptor(&mut w, &ty);
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], Token::NamedType.to_u8());

        let mut r = TokenReader::new(&bytes);
        let decoded = read_type_descriptor(&registry, &mut r).unwrap();
        assert_eq!(decoded.key().as_str(), "demo.widget");
    }

    #[test]
    fn test_unknown_named_type_fails() {
        let registry = empty_registry();
        let mut w = TokenWriter::new();
        w.write_token(Token::NamedType);
        w.write_str("no.such.type");
        let bytes = w.into_bytes();
        let mut r = TokenReader::new(&bytes);
        assert!(read_type_descriptor(&registry, &mut r).is_err());
    }

    #[test]
    fn test_value_token_is_not_a_descriptor() {
        let registry = empty_registry();
        let bytes = [Token::Reference.to_u8()];
        let mut r = TokenReader::new(&bytes);
        assert!(read_type_descriptor(&registry, &mut r).is_err());
    }
}
