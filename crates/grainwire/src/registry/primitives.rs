// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Well-known primitive keys and their compiled types.
//!
//! Primitives and the twelve blittable vector types are known to the
//! engine ahead of any registration; the simple-value fastpath and the
//! array fastpath key off these tables.

use crate::type_key::{ResolvedType, TypeKey};
use crate::values::{DateTime, Decimal, TimeSpan};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

macro_rules! primitive_table {
    ($(($key:literal, $type:ty)),+ $(,)?) => {
        fn by_key() -> &'static HashMap<&'static str, TypeId> {
            static MAP: OnceLock<HashMap<&'static str, TypeId>> = OnceLock::new();
            MAP.get_or_init(|| {
                let mut map = HashMap::new();
                $(map.insert($key, TypeId::of::<$type>());)+
                map
            })
        }

        fn by_id() -> &'static HashMap<TypeId, &'static str> {
            static MAP: OnceLock<HashMap<TypeId, &'static str>> = OnceLock::new();
            MAP.get_or_init(|| {
                let mut map = HashMap::new();
                $(map.insert(TypeId::of::<$type>(), $key);)+
                map
            })
        }
    };
}

primitive_table![
    ("bool", bool),
    ("byte", u8),
    ("sbyte", i8),
    ("short", i16),
    ("ushort", u16),
    ("int", i32),
    ("uint", u32),
    ("long", i64),
    ("ulong", u64),
    ("float", f32),
    ("double", f64),
    ("decimal", Decimal),
    ("char", char),
    ("string", String),
    ("guid", Uuid),
    ("date", DateTime),
    ("timespan", TimeSpan),
    ("object", ()),
];

/// Resolved type of a primitive key, if the key is one.
pub fn primitive_by_key(key: &str) -> Option<ResolvedType> {
    by_key()
        .get(key)
        .map(|id| ResolvedType::runtime(TypeKey::from(key), *id))
}

/// Primitive key of a compiled type, if it is one.
pub fn primitive_key_of(type_id: TypeId) -> Option<TypeKey> {
    by_id().get(&type_id).map(|key| TypeKey::from(*key))
}

macro_rules! primitive_vec_table {
    ($(($key:literal, $elem:ty)),+ $(,)?) => {
        fn vec_by_id() -> &'static HashMap<TypeId, &'static str> {
            static MAP: OnceLock<HashMap<TypeId, &'static str>> = OnceLock::new();
            MAP.get_or_init(|| {
                let mut map = HashMap::new();
                $(map.insert(TypeId::of::<Vec<$elem>>(), $key);)+
                map
            })
        }
    };
}

primitive_vec_table![
    ("byte", u8),
    ("sbyte", i8),
    ("bool", bool),
    ("char", char),
    ("short", i16),
    ("ushort", u16),
    ("int", i32),
    ("uint", u32),
    ("long", i64),
    ("ulong", u64),
    ("float", f32),
    ("double", f64),
];

/// Rank-1 array type of a blittable vector's compiled type, if it is one.
pub fn primitive_array_type(type_id: TypeId) -> Option<ResolvedType> {
    vec_by_id().get(&type_id).map(|elem_key| {
        let element = primitive_by_key(elem_key)
            .unwrap_or_else(|| ResolvedType::named(TypeKey::from(*elem_key)));
        ResolvedType::array(element, 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_round_lookup() {
        let ty = primitive_by_key("int").unwrap();
        assert_eq!(ty.key().as_str(), "int");
        assert_eq!(ty.type_id(), Some(TypeId::of::<i32>()));
        assert_eq!(
            primitive_key_of(TypeId::of::<i32>()).unwrap().as_str(),
            "int"
        );
    }

    #[test]
    fn test_unknown_key() {
        assert!(primitive_by_key("widget").is_none());
        assert!(primitive_key_of(TypeId::of::<Vec<String>>()).is_none());
    }

    #[test]
    fn test_vector_types() {
        let ty = primitive_array_type(TypeId::of::<Vec<i32>>()).unwrap();
        assert_eq!(ty.key().as_str(), "int[]");
        let ty = primitive_array_type(TypeId::of::<Vec<f64>>()).unwrap();
        assert_eq!(ty.key().as_str(), "double[]");
        assert!(primitive_array_type(TypeId::of::<Vec<String>>()).is_none());
    }

    #[test]
    fn test_object_sentinel() {
        let ty = primitive_by_key("object").unwrap();
        assert_eq!(ty.type_id(), Some(TypeId::of::<()>()));
    }
}
