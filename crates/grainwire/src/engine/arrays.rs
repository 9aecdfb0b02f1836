// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Array codec.
//!
//! Rank-1 arrays of the twelve blittable element types travel as their
//! dedicated token, a 4-byte length, and the raw little-endian payload
//! with no per-element tokens. Every other array is an [`ObjectArray`]: type
//! header, dimension lengths, then elements serialized recursively in
//! row-major order. The flat row-major representation makes high-rank
//! indexing a stride computation (`ObjectArray::strides`), never a change
//! of element order.

use crate::context::{CopyContext, DeserializeContext, SerializeContext};
use crate::engine::headers::{array_token_for_element, write_type_header};
use crate::engine::SerializationEngine;
use crate::error::{SerResult, SerializationError};
use crate::type_key::{ResolvedType, TypeShape};
use crate::values::{ObjectArray, ObjectRef};
use std::sync::Arc;

macro_rules! try_serialize_vec {
    ($engine:expr, $ctx:expr, $obj:expr, $ty:expr, $expected:expr,
     $(($elem:ty, $size:expr, $write:ident)),+ $(,)?) => {
        $(
            if let Some(v) = (**$obj).downcast_ref::<Vec<$elem>>() {
                write_type_header($ctx.writer(), $ty, $expected);
                $ctx.writer().write_u32(v.len() as u32);
                for item in v {
                    $ctx.writer().$write(*item);
                }
                $engine.check_large_allocation(v.len() * $size);
                return Ok(true);
            }
        )+
    };
}

/// Serialize the object if it is an array. Returns whether it was.
pub(crate) fn try_serialize_array(
    engine: &SerializationEngine,
    ctx: &mut SerializeContext<'_>,
    obj: &ObjectRef,
    ty: &ResolvedType,
    expected: Option<&ResolvedType>,
) -> SerResult<bool> {
    if let Some(v) = (**obj).downcast_ref::<Vec<u8>>() {
        write_type_header(ctx.writer(), ty, expected);
        ctx.writer().write_u32(v.len() as u32);
        ctx.writer().write_bytes(v);
        engine.check_large_allocation(v.len());
        return Ok(true);
    }
    if let Some(v) = (**obj).downcast_ref::<Vec<bool>>() {
        write_type_header(ctx.writer(), ty, expected);
        ctx.writer().write_u32(v.len() as u32);
        for item in v {
            ctx.writer().write_u8(u8::from(*item));
        }
        engine.check_large_allocation(v.len());
        return Ok(true);
    }
    try_serialize_vec!(
        engine,
        ctx,
        obj,
        ty,
        expected,
        (i8, 1, write_i8),
        (char, 4, write_char),
        (i16, 2, write_i16),
        (u16, 2, write_u16),
        (i32, 4, write_i32),
        (u32, 4, write_u32),
        (i64, 8, write_i64),
        (u64, 8, write_u64),
        (f32, 4, write_f32),
        (f64, 8, write_f64),
    );

    if let Some(arr) = (**obj).downcast_ref::<ObjectArray>() {
        // Rank-1 blittable-element arrays have exactly one wire form: the
        // bulk vector. An ObjectArray is not it.
        if arr.rank() == 1 && array_token_for_element(arr.element_type().key().as_str()).is_some()
        {
            return Err(SerializationError::StreamFormat {
                offset: ctx.writer().position(),
                reason: format!(
                    "rank-1 '{}' arrays must use the vector form",
                    arr.element_type()
                ),
            });
        }
        write_type_header(ctx.writer(), ty, expected);
        for dim in arr.dims() {
            ctx.writer().write_u32(*dim);
        }
        let items = arr.items();
        engine.check_large_allocation(items.len() * std::mem::size_of::<Option<ObjectRef>>());
        let element = match ty.shape() {
            TypeShape::Array { element, .. } => element.as_ref().clone(),
            _ => arr.element_type().clone(),
        };
        for item in &items {
            ctx.serialize_inner(item.as_ref(), Some(&element))?;
        }
        return Ok(true);
    }

    Ok(false)
}

macro_rules! read_vec {
    ($ctx:expr, $len:expr, $read:ident) => {{
        let mut v = Vec::with_capacity($len);
        for _ in 0..$len {
            v.push($ctx.reader().$read()?);
        }
        v
    }};
}

/// Decode an array value whose resolved type has array shape. The
/// decoded object is recorded at `offset` before its elements are read.
pub(crate) fn deserialize_array(
    engine: &SerializationEngine,
    ctx: &mut DeserializeContext<'_>,
    ty: &ResolvedType,
    offset: u32,
) -> SerResult<ObjectRef> {
    let (element, rank) = match ty.shape() {
        TypeShape::Array { element, rank } => (element.as_ref().clone(), *rank),
        _ => {
            return Err(SerializationError::stream(
                offset as usize,
                "array decode on a non-array type",
            ))
        }
    };

    if rank == 1 {
        if let Some(obj) = read_blittable_vec(ctx, element.key().as_str())? {
            ctx.record_at(offset, &obj);
            return Ok(obj);
        }
    }

    let mut dims = Vec::with_capacity(rank as usize);
    for _ in 0..rank {
        dims.push(ctx.reader().read_u32()?);
    }
    let len: usize = dims.iter().map(|d| *d as usize).product();
    // Each element costs at least one token byte; a larger claim is a
    // truncated or corrupt buffer.
    if len > ctx.reader().remaining() {
        return Err(SerializationError::stream(
            ctx.reader().position(),
            "array length exceeds remaining buffer",
        ));
    }

    let arr = Arc::new(ObjectArray::new(element.clone(), dims));
    let obj: ObjectRef = arr.clone();
    ctx.record_at(offset, &obj);
    for i in 0..len {
        let value = ctx.deserialize_inner(Some(&element))?;
        arr.set(i, value);
    }
    engine.check_large_allocation(len * std::mem::size_of::<Option<ObjectRef>>());
    Ok(obj)
}

fn read_blittable_vec(
    ctx: &mut DeserializeContext<'_>,
    element_key: &str,
) -> SerResult<Option<ObjectRef>> {
    if array_token_for_element(element_key).is_none() {
        return Ok(None);
    }
    let len_offset = ctx.reader().position();
    let len = ctx.reader().read_u32()? as usize;
    if len > ctx.reader().remaining() {
        return Err(SerializationError::stream(
            len_offset,
            "array length exceeds remaining buffer",
        ));
    }
    let obj: ObjectRef = match element_key {
        "byte" => Arc::new(ctx.reader().read_bytes(len)?.to_vec()),
        "sbyte" => Arc::new(read_vec!(ctx, len, read_i8)),
        "bool" => {
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(ctx.reader().read_u8()? != 0);
            }
            Arc::new(v)
        }
        "char" => Arc::new(read_vec!(ctx, len, read_char)),
        "short" => Arc::new(read_vec!(ctx, len, read_i16)),
        "ushort" => Arc::new(read_vec!(ctx, len, read_u16)),
        "int" => Arc::new(read_vec!(ctx, len, read_i32)),
        "uint" => Arc::new(read_vec!(ctx, len, read_u32)),
        "long" => Arc::new(read_vec!(ctx, len, read_i64)),
        "ulong" => Arc::new(read_vec!(ctx, len, read_u64)),
        "float" => Arc::new(read_vec!(ctx, len, read_f32)),
        "double" => Arc::new(read_vec!(ctx, len, read_f64)),
        _ => return Ok(None),
    };
    Ok(Some(obj))
}

macro_rules! try_copy_vec {
    ($engine:expr, $ctx:expr, $obj:expr, $(($elem:ty, $size:expr)),+ $(,)?) => {
        $(
            if let Some(v) = (**$obj).downcast_ref::<Vec<$elem>>() {
                let copy: ObjectRef = Arc::new(v.clone());
                $ctx.record_copy($obj, &copy);
                $engine.check_large_allocation(v.len() * $size);
                return Ok(Some(copy));
            }
        )+
    };
}

/// Deep-copy the object if it is an array. Returns the copy if it was.
pub(crate) fn try_deep_copy_array(
    engine: &SerializationEngine,
    ctx: &mut CopyContext<'_>,
    obj: &ObjectRef,
) -> SerResult<Option<ObjectRef>> {
    try_copy_vec!(
        engine,
        ctx,
        obj,
        (u8, 1),
        (i8, 1),
        (bool, 1),
        (char, 4),
        (i16, 2),
        (u16, 2),
        (i32, 4),
        (u32, 4),
        (i64, 8),
        (u64, 8),
        (f32, 4),
        (f64, 8),
    );

    if let Some(arr) = (**obj).downcast_ref::<ObjectArray>() {
        let target = Arc::new(ObjectArray::new(
            arr.element_type().clone(),
            arr.dims().to_vec(),
        ));
        let copy: ObjectRef = target.clone();
        ctx.record_copy(obj, &copy);
        let items = arr.items();
        engine.check_large_allocation(items.len() * std::mem::size_of::<Option<ObjectRef>>());
        if engine.is_shallow_copyable(arr.element_type()) {
            // Elements are safely shared; clone the whole array shallowly.
            target.set_items(items);
        } else {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                out.push(ctx.deep_copy_inner(item.as_ref())?);
            }
            target.set_items(out);
        }
        return Ok(Some(copy));
    }

    Ok(None)
}
