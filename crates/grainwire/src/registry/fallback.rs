// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Default fallback serializer: a reflector over [`DynStruct`] values.
//!
//! There is no runtime code generation in this engine; the last-resort
//! codec instead walks the dynamic value model. It owns the bytes after
//! a `Fallback` token: the logical type key, a field count, then each
//! field as a name plus a recursively serialized value. Types backed by
//! compiled structs are *not* supported here; they either have a codec
//! or they fail, which is what lets error values fall through to the
//! exception-substitution path.

use crate::context::{CopyContext, DeserializeContext, SerializeContext};
use crate::error::{SerResult, SerializationError};
use crate::registry::codec::ObjectCodec;
use crate::registry::primitive_by_key;
use crate::type_key::{ResolvedType, TypeKey, TypeShape};
use crate::values::{DynStruct, ObjectRef};
use std::sync::Arc;

/// Fallback codec over the dynamic value model.
#[derive(Debug, Default)]
pub struct DynStructReflector;

fn as_dyn_struct(obj: &ObjectRef) -> SerResult<&DynStruct> {
    (**obj).downcast_ref::<DynStruct>().ok_or_else(|| {
        SerializationError::StreamFormat {
            offset: 0,
            reason: "fallback reflector requires a dynamic struct value".into(),
        }
    })
}

impl ObjectCodec for DynStructReflector {
    fn supports_type(&self, ty: &ResolvedType) -> bool {
        // Named keys are the dynamic-value territory; compiled and
        // structural types belong to other tiers.
        matches!(ty.shape(), TypeShape::Named)
            && primitive_by_key(ty.key().as_str()).is_none()
    }

    fn copy(&self, obj: &ObjectRef, ctx: &mut CopyContext<'_>) -> SerResult<ObjectRef> {
        let source = as_dyn_struct(obj)?;
        let target = Arc::new(DynStruct::new(source.type_key().clone()));
        let copy: ObjectRef = target.clone();
        ctx.record_copy(obj, &copy);
        for (name, value) in source.fields() {
            let copied = ctx.deep_copy_inner(value.as_ref())?;
            target.push_field(name, copied);
        }
        Ok(copy)
    }

    fn serialize(
        &self,
        obj: &ObjectRef,
        _ty: &ResolvedType,
        ctx: &mut SerializeContext<'_>,
    ) -> SerResult<()> {
        let source = as_dyn_struct(obj)?;
        let fields = source.fields();
        ctx.writer().write_str(source.type_key().as_str());
        ctx.writer().write_u32(fields.len() as u32);
        for (name, value) in &fields {
            ctx.writer().write_str(name);
            ctx.serialize_inner(value.as_ref(), None)?;
        }
        Ok(())
    }

    fn deserialize(
        &self,
        _expected: Option<&ResolvedType>,
        ctx: &mut DeserializeContext<'_>,
    ) -> SerResult<ObjectRef> {
        let key = ctx.reader().read_str()?;
        let target = Arc::new(DynStruct::new(TypeKey::new(key)));
        let obj: ObjectRef = target.clone();
        // Recorded before the fields so self-references resolve.
        ctx.record_object(&obj);
        let count = ctx.reader().read_u32()?;
        for _ in 0..count {
            let name = ctx.reader().read_str()?;
            let value = ctx.deserialize_inner(None)?;
            target.push_field(name, value);
        }
        Ok(obj)
    }
}
