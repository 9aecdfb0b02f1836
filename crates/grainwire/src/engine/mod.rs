// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Top-level serialize / deserialize / deep-copy dispatch.
//!
//! Every entry point constructs a fresh context, optionally starts a
//! timer, calls the recursive inner routine, and records statistics.
//! Encoding follows one normative codec order: simple fastpath, enums,
//! the bare-object sentinel, arrays, external serializers, registered
//! codecs, keyed serializers, fallback, and, for error values nothing
//! accepts, substitution of a transportable error envelope.

mod arrays;
mod builder;
mod headers;
mod simple;

pub use builder::{EngineBuilder, EXCEPTION_TYPE_KEY};

use crate::config::EngineConfig;
use crate::context::{CopyContext, DeserializeContext, SerializeContext};
use crate::error::{SerResult, SerializationError};
use crate::registry::{SerializerId, TypeRegistry};
use crate::stats::StatisticsSink;
use crate::token::Token;
use crate::type_key::{ResolvedType, TypeShape};
use crate::values::{downcast, DynStruct, ObjectArray, ObjectRef};
use std::any::{Any, TypeId};
use std::sync::Arc;
use std::time::Instant;

/// The polymorphic binary serialization engine.
///
/// An explicitly constructed value owned by the host runtime; build one
/// with [`SerializationEngine::builder`]. All operations are safe to
/// invoke from parallel threads; each owns its context exclusively.
pub struct SerializationEngine {
    registry: TypeRegistry,
    config: EngineConfig,
    stats: Arc<dyn StatisticsSink>,
}

impl SerializationEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) fn new(
        registry: TypeRegistry,
        config: EngineConfig,
        stats: Arc<dyn StatisticsSink>,
    ) -> Self {
        Self {
            registry,
            config,
            stats,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn statistics(&self) -> &Arc<dyn StatisticsSink> {
        &self.stats
    }

    // -------------------------------------------------------------------
    // Public surface
    // -------------------------------------------------------------------

    /// Encode an object graph into a token stream.
    pub fn serialize(&self, obj: Option<&ObjectRef>) -> SerResult<Vec<u8>> {
        let started = self.timer();
        let mut ctx = SerializeContext::new(self);
        self.serialize_dispatch(&mut ctx, obj, None)?;
        if let Some(started) = started {
            self.stats.record_serialization(ticks_since(started));
        }
        Ok(ctx.into_bytes())
    }

    /// Decode a token stream, optionally against a statically expected type.
    pub fn deserialize(
        &self,
        expected: Option<&ResolvedType>,
        bytes: &[u8],
    ) -> SerResult<Option<ObjectRef>> {
        let started = self.timer();
        let mut ctx = DeserializeContext::new(self, bytes);
        let result = self.deserialize_dispatch(&mut ctx, expected)?;
        if let Some(started) = started {
            self.stats.record_deserialization(ticks_since(started));
        }
        Ok(result)
    }

    /// Decode into a concrete value of a registered (or primitive) type.
    pub fn deserialize_as<T>(&self, bytes: &[u8]) -> SerResult<T>
    where
        T: Any + Send + Sync + Clone,
    {
        let expected = self
            .registry
            .type_key_of(TypeId::of::<T>())
            .and_then(|key| self.registry.resolve(key.as_str()).ok());
        let decoded = self.deserialize(expected.as_ref(), bytes)?.ok_or_else(|| {
            SerializationError::stream(0, "unexpected null at top level")
        })?;
        let value = downcast::<T>(&decoded).ok_or_else(|| {
            SerializationError::stream(0, "decoded value has a different runtime type")
        })?;
        Ok((*value).clone())
    }

    /// Deep-copy an object graph without the wire format.
    pub fn deep_copy(&self, obj: &ObjectRef) -> SerResult<ObjectRef> {
        let started = self.timer();
        let mut ctx = CopyContext::new(self);
        let copy = self
            .deep_copy_dispatch(&mut ctx, Some(obj))?
            .unwrap_or_else(|| obj.clone());
        if let Some(started) = started {
            self.stats.record_copy(ticks_since(started));
        }
        Ok(copy)
    }

    /// Deep-copy every element of an array slice in place, preserving
    /// shared subgraphs among the elements.
    pub fn deep_copy_array_in_place(
        &self,
        items: &mut [Option<ObjectRef>],
    ) -> SerResult<()> {
        let started = self.timer();
        let mut ctx = CopyContext::new(self);
        for slot in items.iter_mut() {
            let original = slot.take();
            *slot = self.deep_copy_dispatch(&mut ctx, original.as_ref())?;
        }
        if let Some(started) = started {
            self.stats.record_copy(ticks_since(started));
        }
        Ok(())
    }

    /// Serialize then deserialize a value. Test helper.
    pub fn round_trip<T>(&self, value: &T) -> SerResult<T>
    where
        T: Any + Send + Sync + Clone,
    {
        let obj: ObjectRef = Arc::new(value.clone());
        let bytes = self.serialize(Some(&obj))?;
        self.deserialize_as::<T>(&bytes)
    }

    /// True when a serializer exists for the type.
    pub fn has_serializer(&self, ty: &ResolvedType) -> bool {
        self.registry.has_serializer(ty)
    }

    /// Resolve a type-key string to a runtime type handle.
    pub fn resolve_type_name(&self, key: &str) -> SerResult<ResolvedType> {
        self.registry.resolve(key)
    }

    // -------------------------------------------------------------------
    // Encode dispatch
    // -------------------------------------------------------------------

    pub(crate) fn serialize_dispatch(
        &self,
        ctx: &mut SerializeContext<'_>,
        obj: Option<&ObjectRef>,
        expected: Option<&ResolvedType>,
    ) -> SerResult<()> {
        ctx.enter()?;
        let result = self.serialize_step(ctx, obj, expected);
        ctx.exit();
        result
    }

    fn serialize_step(
        &self,
        ctx: &mut SerializeContext<'_>,
        obj: Option<&ObjectRef>,
        expected: Option<&ResolvedType>,
    ) -> SerResult<()> {
        let Some(obj) = obj else {
            ctx.writer().write_token(Token::Null);
            return Ok(());
        };
        if simple::try_write_simple(ctx.writer(), obj) {
            return Ok(());
        }

        let ty = match self.runtime_type_of(obj) {
            Ok(ty) => ty,
            Err(err) => {
                // An unregistered error value is still transportable.
                if let Some(substitute) = self.substitute_error(obj) {
                    return self.serialize_dispatch(ctx, Some(&substitute), expected);
                }
                return Err(err);
            }
        };
        let entry = self.registry.entry_for_type(&ty)?;

        // Back-reference bookkeeping for reference-typed objects: first
        // occurrence recorded before its body, later occurrences collapse
        // to a Reference token.
        let tracked = entry.as_ref().map(|e| !e.is_value_type()).unwrap_or(true);
        if tracked {
            if let Some(offset) = ctx.existing_reference(obj) {
                ctx.writer().write_token(Token::Reference);
                ctx.writer().write_u32(offset);
                return Ok(());
            }
            ctx.record(obj);
        }

        // Enums: type header, then the raw underlying integer.
        if let Some(repr) = entry.as_ref().and_then(|e| e.enum_repr()) {
            headers::write_type_header(ctx.writer(), &ty, expected);
            let raw = (*repr.to_raw)(obj)?;
            return simple::write_raw_int(ctx.writer(), repr.width, raw);
        }

        // Bare object sentinel.
        if ty.key().as_str() == "object" {
            ctx.writer().write_token(Token::SpecifiedType);
            ctx.writer().write_token(Token::Object);
            return Ok(());
        }

        if arrays::try_serialize_array(self, ctx, obj, &ty, expected)? {
            return Ok(());
        }

        if let Some(codec) = self.registry.external_for(&ty) {
            headers::write_type_header(ctx.writer(), &ty, expected);
            return codec.serialize(obj, &ty, ctx);
        }

        if let Some(serializer) = entry.as_ref().and_then(|e| e.serializer()) {
            headers::write_type_header(ctx.writer(), &ty, expected);
            return (*serializer)(obj, ctx, expected);
        }

        if let Some(codec) = self.registry.keyed_for(&ty) {
            ctx.writer().write_token(Token::KeyedSerializer);
            ctx.writer().write_u8(codec.id().value());
            return codec.serialize(obj, &ty, ctx);
        }

        let fallback = self.registry.fallback();
        if fallback.supports_type(&ty) {
            ctx.writer().write_token(Token::Fallback);
            let started = self.timer();
            let result = fallback.serialize(obj, &ty, ctx);
            if let Some(started) = started {
                self.stats.record_fallback_serialization(ticks_since(started));
            }
            return result;
        }

        if let Some(substitute) = self.substitute_error(obj) {
            log::warn!(
                "substituting transportable envelope for error type '{}'",
                ty.key()
            );
            return self.serialize_dispatch(ctx, Some(&substitute), expected);
        }

        Err(SerializationError::no_codec(ty.key().as_str()))
    }

    // -------------------------------------------------------------------
    // Decode dispatch
    // -------------------------------------------------------------------

    pub(crate) fn deserialize_dispatch(
        &self,
        ctx: &mut DeserializeContext<'_>,
        expected: Option<&ResolvedType>,
    ) -> SerResult<Option<ObjectRef>> {
        ctx.enter()?;
        let result = self.deserialize_step(ctx, expected);
        ctx.exit();
        result
    }

    fn deserialize_step(
        &self,
        ctx: &mut DeserializeContext<'_>,
        expected: Option<&ResolvedType>,
    ) -> SerResult<Option<ObjectRef>> {
        let offset = ctx.reader().position() as u32;
        if let Some(value) = simple::try_read_simple(ctx.reader())? {
            return Ok(value);
        }

        let token = ctx.reader().read_token()?;
        match token {
            Token::Reference => {
                let target_offset = ctx.reader().position();
                let target = ctx.reader().read_u32()?;
                ctx.lookup(target).map(Some).ok_or_else(|| {
                    SerializationError::StreamFormat {
                        offset: target_offset,
                        reason: format!("reference to unrecorded offset {}", target),
                    }
                })
            }
            Token::Fallback => {
                let fallback = self.registry.fallback();
                let started = self.timer();
                let obj = self.run_nested_deserialize(ctx, offset, |ctx| {
                    fallback.deserialize(expected, ctx)
                })?;
                if let Some(started) = started {
                    self.stats
                        .record_fallback_deserialization(ticks_since(started));
                }
                Ok(Some(obj))
            }
            Token::KeyedSerializer => {
                let id_offset = ctx.reader().position();
                let id = SerializerId(ctx.reader().read_u8()?);
                let codec = self.registry.keyed_by_id(id).ok_or_else(|| {
                    SerializationError::StreamFormat {
                        offset: id_offset,
                        reason: format!("unknown keyed serializer id {}", id),
                    }
                })?;
                let obj = self.run_nested_deserialize(ctx, offset, |ctx| {
                    codec.deserialize(expected, ctx)
                })?;
                Ok(Some(obj))
            }
            Token::ExpectedType => {
                let ty = expected.cloned().ok_or_else(|| {
                    SerializationError::StreamFormat {
                        offset: offset as usize,
                        reason: "expected-type token with no expected type supplied".into(),
                    }
                })?;
                self.deserialize_with_type(ctx, &ty, offset)
            }
            Token::SpecifiedType => {
                let ty = headers::read_type_descriptor(&self.registry, ctx.reader())?;
                self.deserialize_with_type(ctx, &ty, offset)
            }
            other => Err(SerializationError::StreamFormat {
                offset: offset as usize,
                reason: format!("unexpected token {:?} at structural position", other),
            }),
        }
    }

    fn deserialize_with_type(
        &self,
        ctx: &mut DeserializeContext<'_>,
        ty: &ResolvedType,
        offset: u32,
    ) -> SerResult<Option<ObjectRef>> {
        if ty.key().as_str() == "object" {
            let token_offset = ctx.reader().position();
            let token = ctx.reader().read_token()?;
            if token != Token::Object {
                return Err(SerializationError::StreamFormat {
                    offset: token_offset,
                    reason: format!("expected object sentinel, found {:?}", token),
                });
            }
            let obj: ObjectRef = Arc::new(());
            ctx.record_at(offset, &obj);
            return Ok(Some(obj));
        }

        if matches!(ty.shape(), TypeShape::Array { .. }) {
            return arrays::deserialize_array(self, ctx, ty, offset).map(Some);
        }

        let entry = self.registry.entry_for_type(ty)?;

        if let Some(repr) = entry.as_ref().and_then(|e| e.enum_repr()) {
            let raw = simple::read_raw_int(ctx.reader(), repr.width)?;
            return (*repr.from_raw)(raw).map(Some);
        }

        if let Some(codec) = self.registry.external_for(ty) {
            let obj = self.run_nested_deserialize(ctx, offset, |ctx| {
                codec.deserialize(Some(ty), ctx)
            })?;
            return Ok(Some(obj));
        }

        if let Some(deserializer) = entry.as_ref().and_then(|e| e.deserializer()) {
            let obj =
                self.run_nested_deserialize(ctx, offset, |ctx| (*deserializer)(ty, ctx))?;
            return Ok(Some(obj));
        }

        Err(SerializationError::no_codec(ty.key().as_str()))
    }

    /// Run a codec with `current_object_offset` pointed at this value,
    /// restoring the parent's offset afterwards and making sure the
    /// result lands in the back-reference table.
    fn run_nested_deserialize<F>(
        &self,
        ctx: &mut DeserializeContext<'_>,
        offset: u32,
        body: F,
    ) -> SerResult<ObjectRef>
    where
        F: FnOnce(&mut DeserializeContext<'_>) -> SerResult<ObjectRef>,
    {
        let saved = ctx.current_object_offset();
        ctx.set_current_object_offset(offset);
        let result = body(ctx);
        ctx.set_current_object_offset(saved);
        let obj = result?;
        ctx.record_at(offset, &obj);
        Ok(obj)
    }

    // -------------------------------------------------------------------
    // Deep-copy dispatch
    // -------------------------------------------------------------------

    pub(crate) fn deep_copy_dispatch(
        &self,
        ctx: &mut CopyContext<'_>,
        obj: Option<&ObjectRef>,
    ) -> SerResult<Option<ObjectRef>> {
        let Some(obj) = obj else {
            return Ok(None);
        };
        ctx.enter()?;
        let result = self.deep_copy_step(ctx, obj);
        ctx.exit();
        result.map(Some)
    }

    fn deep_copy_step(
        &self,
        ctx: &mut CopyContext<'_>,
        obj: &ObjectRef,
    ) -> SerResult<ObjectRef> {
        // Shallow-copyable values are returned unchanged.
        if simple::is_simple_value(obj) {
            return Ok(obj.clone());
        }

        let ty = self.runtime_type_of(obj)?;
        if ty.key().as_str() == "object" {
            return Ok(Arc::new(()));
        }

        let entry = self.registry.entry_for_type(&ty)?;
        if entry.as_ref().map(|e| e.is_immutable()).unwrap_or(false) {
            return Ok(obj.clone());
        }

        if let Some(copy) = ctx.existing_copy(obj) {
            return Ok(copy);
        }

        if let Some(codec) = self.registry.external_for(&ty) {
            let copy = codec.copy(obj, ctx)?;
            ctx.record_copy(obj, &copy);
            return Ok(copy);
        }

        if let Some(copier) = entry.as_ref().and_then(|e| e.copier()) {
            let saved = ctx.swap_current_original(Some(obj.clone()));
            let result = (*copier)(obj, ctx);
            ctx.swap_current_original(saved);
            let copy = result?;
            ctx.record_copy(obj, &copy);
            return Ok(copy);
        }

        if let Some(copy) = arrays::try_deep_copy_array(self, ctx, obj)? {
            return Ok(copy);
        }

        if let Some(codec) = self.registry.keyed_for(&ty) {
            let copy = codec.copy(obj, ctx)?;
            ctx.record_copy(obj, &copy);
            return Ok(copy);
        }

        let fallback = self.registry.fallback();
        if fallback.supports_type(&ty) {
            let started = self.timer();
            let copy = fallback.copy(obj, ctx)?;
            if let Some(started) = started {
                self.stats.record_fallback_copy(ticks_since(started));
            }
            ctx.record_copy(obj, &copy);
            return Ok(copy);
        }

        // Value types without a copier are plain data; share them.
        if entry.as_ref().map(|e| e.is_value_type()).unwrap_or(false) {
            return Ok(obj.clone());
        }

        Err(SerializationError::no_codec(ty.key().as_str()))
    }

    // -------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------

    /// Runtime type handle of an instance.
    fn runtime_type_of(&self, obj: &ObjectRef) -> SerResult<ResolvedType> {
        let id = (**obj).type_id();
        if let Some(ty) = crate::registry::primitive_array_type(id) {
            return Ok(ty);
        }
        if let Some(arr) = (**obj).downcast_ref::<ObjectArray>() {
            return Ok(ResolvedType::array(arr.element_type().clone(), arr.rank()));
        }
        if let Some(s) = (**obj).downcast_ref::<DynStruct>() {
            return Ok(ResolvedType::named(s.type_key().clone()));
        }
        if let Some(key) = self.registry.type_key_of(id) {
            return self.registry.resolve(key.as_str());
        }
        Err(SerializationError::no_codec(format!(
            "unregistered runtime type {:?}",
            id
        )))
    }

    fn substitute_error(&self, obj: &ObjectRef) -> Option<ObjectRef> {
        let extractor = self.registry.error_extractor((**obj).type_id())?;
        let carried = (*extractor)(obj)?;
        Some(Arc::new(carried))
    }

    /// True when values of this type are safely shared by reference
    /// during deep copy.
    pub(crate) fn is_shallow_copyable(&self, ty: &ResolvedType) -> bool {
        let key = ty.key().as_str();
        if key != "object" && crate::registry::primitive_by_key(key).is_some() {
            return true;
        }
        self.registry
            .entry_for_type(ty)
            .ok()
            .flatten()
            .map(|e| e.is_immutable())
            .unwrap_or(false)
    }

    pub(crate) fn check_large_allocation(&self, bytes: usize) {
        if bytes >= self.config.large_object_threshold {
            log::warn!("large object allocation: {} bytes", bytes);
            self.stats.large_object_allocation(bytes);
        }
    }

    fn timer(&self) -> Option<Instant> {
        self.config.collect_statistics.then(Instant::now)
    }
}

fn ticks_since(started: Instant) -> u64 {
    started.elapsed().as_nanos() as u64
}

impl std::fmt::Debug for SerializationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}
