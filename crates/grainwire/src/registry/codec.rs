// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec abstractions: function triples and pluggable codec tiers.
//!
//! External, keyed, and fallback serializers are three tiers of the same
//! abstraction, [`ObjectCodec`], differentiated only by lookup policy
//! and wire token. Registered per-type codecs are bare function triples
//! produced at registration time (monomorphized closures; no per-call
//! reflection exists or is needed).

use crate::context::{CopyContext, DeserializeContext, SerializeContext};
use crate::error::{SerResult, SerializationError};
use crate::type_key::ResolvedType;
use crate::values::ObjectRef;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Copier half of a codec triple.
pub type CopierFn =
    Arc<dyn Fn(&ObjectRef, &mut CopyContext<'_>) -> SerResult<ObjectRef> + Send + Sync>;

/// Serializer half of a codec triple.
pub type SerializeFn = Arc<
    dyn Fn(&ObjectRef, &mut SerializeContext<'_>, Option<&ResolvedType>) -> SerResult<()>
        + Send
        + Sync,
>;

/// Deserializer half of a codec triple.
pub type DeserializeFn =
    Arc<dyn Fn(&ResolvedType, &mut DeserializeContext<'_>) -> SerResult<ObjectRef> + Send + Sync>;

/// Wrap a typed copier into the type-erased form.
pub fn copier_fn<T, F>(f: F) -> CopierFn
where
    T: Any + Send + Sync,
    F: Fn(&T, &mut CopyContext<'_>) -> SerResult<ObjectRef> + Send + Sync + 'static,
{
    Arc::new(move |obj, ctx| {
        let value = downcast_value::<T>(obj)?;
        f(value, ctx)
    })
}

/// Wrap a typed serializer into the type-erased form.
pub fn serializer_fn<T, F>(f: F) -> SerializeFn
where
    T: Any + Send + Sync,
    F: Fn(&T, &mut SerializeContext<'_>) -> SerResult<()> + Send + Sync + 'static,
{
    Arc::new(move |obj, ctx, _expected| {
        let value = downcast_value::<T>(obj)?;
        f(value, ctx)
    })
}

/// Wrap a deserializer closure into the type-erased form.
pub fn deserializer_fn<F>(f: F) -> DeserializeFn
where
    F: Fn(&ResolvedType, &mut DeserializeContext<'_>) -> SerResult<ObjectRef>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

fn downcast_value<T: Any + Send + Sync>(obj: &ObjectRef) -> SerResult<&T> {
    (**obj).downcast_ref::<T>().ok_or_else(|| {
        SerializationError::RegistrationInconsistency {
            type_key: std::any::type_name::<T>().to_string(),
            reason: "codec invoked with a value of a different runtime type".into(),
        }
    })
}

/// Pluggable codec with its own type-support predicate.
///
/// The serialize side receives the already-resolved runtime type; the
/// deserialize side receives the statically expected type if the caller
/// knows one. Codecs recurse through the contexts for nested values.
pub trait ObjectCodec: Send + Sync {
    fn supports_type(&self, ty: &ResolvedType) -> bool;

    fn copy(&self, obj: &ObjectRef, ctx: &mut CopyContext<'_>) -> SerResult<ObjectRef>;

    fn serialize(
        &self,
        obj: &ObjectRef,
        ty: &ResolvedType,
        ctx: &mut SerializeContext<'_>,
    ) -> SerResult<()>;

    fn deserialize(
        &self,
        expected: Option<&ResolvedType>,
        ctx: &mut DeserializeContext<'_>,
    ) -> SerResult<ObjectRef>;
}

/// Identifier a keyed serializer is selected by on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerializerId(pub u8);

impl SerializerId {
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SerializerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An [`ObjectCodec`] addressed by a one-byte id on the wire.
pub trait KeyedCodec: ObjectCodec {
    fn id(&self) -> SerializerId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializer_id_display() {
        assert_eq!(SerializerId(9).to_string(), "9");
        assert_eq!(SerializerId(9).value(), 9);
    }
}
