// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-operation contexts and back-reference tracking.
//!
//! Each serialize, deserialize, or deep-copy operation owns one context
//! exclusively; every operation is a fresh back-reference namespace.
//! Identity keys are `Arc` data-pointer addresses, valid exactly for the
//! operation's lifetime.

use crate::engine::SerializationEngine;
use crate::error::{SerResult, SerializationError};
use crate::registry::TypeRegistry;
use crate::stream::{TokenReader, TokenWriter};
use crate::type_key::ResolvedType;
use crate::values::{identity, ObjectRef};
use std::collections::HashMap;

fn depth_exceeded(limit: usize) -> SerializationError {
    SerializationError::StreamFormat {
        offset: 0,
        reason: format!("recursion depth exceeded ({})", limit),
    }
}

/// Encode-side context: token writer plus the identity -> offset table.
pub struct SerializeContext<'a> {
    engine: &'a SerializationEngine,
    writer: TokenWriter,
    references: HashMap<usize, u32>,
    depth: usize,
}

impl<'a> SerializeContext<'a> {
    pub(crate) fn new(engine: &'a SerializationEngine) -> Self {
        Self {
            engine,
            writer: TokenWriter::new(),
            references: HashMap::new(),
            depth: 0,
        }
    }

    pub fn writer(&mut self) -> &mut TokenWriter {
        &mut self.writer
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.engine.registry()
    }

    /// Recurse into a nested value. Codecs call this for every field
    /// that is itself a serializable object.
    pub fn serialize_inner(
        &mut self,
        obj: Option<&ObjectRef>,
        expected: Option<&ResolvedType>,
    ) -> SerResult<()> {
        let engine = self.engine;
        engine.serialize_dispatch(self, obj, expected)
    }

    /// Offset previously recorded for this object, if any.
    pub(crate) fn existing_reference(&self, obj: &ObjectRef) -> Option<u32> {
        self.references.get(&identity(obj)).copied()
    }

    /// Record the object at the current stream position, before its body
    /// is written.
    pub(crate) fn record(&mut self, obj: &ObjectRef) {
        let position = self.writer.position() as u32;
        self.references.insert(identity(obj), position);
    }

    pub(crate) fn enter(&mut self) -> SerResult<()> {
        self.depth += 1;
        let limit = self.engine.config().max_serialization_depth;
        if self.depth > limit {
            return Err(depth_exceeded(limit));
        }
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.writer.into_bytes()
    }
}

/// Decode-side context: token reader plus the offset -> object table.
pub struct DeserializeContext<'a> {
    engine: &'a SerializationEngine,
    reader: TokenReader<'a>,
    objects: HashMap<u32, ObjectRef>,
    current_object_offset: u32,
    depth: usize,
}

impl<'a> DeserializeContext<'a> {
    pub(crate) fn new(engine: &'a SerializationEngine, bytes: &'a [u8]) -> Self {
        Self {
            engine,
            reader: TokenReader::new(bytes),
            objects: HashMap::new(),
            current_object_offset: 0,
            depth: 0,
        }
    }

    pub fn reader(&mut self) -> &mut TokenReader<'a> {
        &mut self.reader
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.engine.registry()
    }

    /// Recurse into a nested value.
    pub fn deserialize_inner(
        &mut self,
        expected: Option<&ResolvedType>,
    ) -> SerResult<Option<ObjectRef>> {
        let engine = self.engine;
        engine.deserialize_dispatch(self, expected)
    }

    /// Record the object under the offset of the value currently being
    /// decoded, so references inside its own body can resolve forward.
    ///
    /// Deserializers call this as soon as the object exists, before
    /// reading its fields. The first record for an offset wins.
    pub fn record_object(&mut self, obj: &ObjectRef) {
        let offset = self.current_object_offset;
        self.record_at(offset, obj);
    }

    pub(crate) fn record_at(&mut self, offset: u32, obj: &ObjectRef) {
        self.objects.entry(offset).or_insert_with(|| obj.clone());
    }

    pub(crate) fn lookup(&self, offset: u32) -> Option<ObjectRef> {
        self.objects.get(&offset).cloned()
    }

    pub(crate) fn current_object_offset(&self) -> u32 {
        self.current_object_offset
    }

    pub(crate) fn set_current_object_offset(&mut self, offset: u32) {
        self.current_object_offset = offset;
    }

    pub(crate) fn enter(&mut self) -> SerResult<()> {
        self.depth += 1;
        let limit = self.engine.config().max_serialization_depth;
        if self.depth > limit {
            return Err(depth_exceeded(limit));
        }
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.depth -= 1;
    }
}

/// Copy-side context: original identity -> copy table.
pub struct CopyContext<'a> {
    engine: &'a SerializationEngine,
    copies: HashMap<usize, ObjectRef>,
    current_original: Option<ObjectRef>,
    depth: usize,
}

impl<'a> CopyContext<'a> {
    pub(crate) fn new(engine: &'a SerializationEngine) -> Self {
        Self {
            engine,
            copies: HashMap::new(),
            current_original: None,
            depth: 0,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.engine.registry()
    }

    /// Deep-copy a nested value. Codecs call this for every field.
    pub fn deep_copy_inner(
        &mut self,
        obj: Option<&ObjectRef>,
    ) -> SerResult<Option<ObjectRef>> {
        let engine = self.engine;
        engine.deep_copy_dispatch(self, obj)
    }

    /// Record a copy before descending into the original's fields, so
    /// shared subgraphs stay shared and cycles terminate.
    pub fn record_copy(&mut self, original: &ObjectRef, copy: &ObjectRef) {
        self.copies.insert(identity(original), copy.clone());
    }

    /// Record the copy of the value currently being copied.
    ///
    /// Registered copiers call this before descending into fields; it is
    /// the copy-side counterpart of
    /// [`DeserializeContext::record_object`].
    pub fn record_copy_of_current(&mut self, copy: &ObjectRef) {
        if let Some(original) = self.current_original.clone() {
            self.record_copy(&original, copy);
        }
    }

    pub(crate) fn swap_current_original(
        &mut self,
        original: Option<ObjectRef>,
    ) -> Option<ObjectRef> {
        std::mem::replace(&mut self.current_original, original)
    }

    pub(crate) fn existing_copy(&self, original: &ObjectRef) -> Option<ObjectRef> {
        self.copies.get(&identity(original)).cloned()
    }

    pub(crate) fn enter(&mut self) -> SerResult<()> {
        self.depth += 1;
        let limit = self.engine.config().max_serialization_depth;
        if self.depth > limit {
            return Err(depth_exceeded(limit));
        }
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.depth -= 1;
    }
}
