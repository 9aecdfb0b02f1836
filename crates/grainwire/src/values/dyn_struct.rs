// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic named-field aggregate.
//!
//! [`DynStruct`] is the value model the default fallback serializer walks:
//! a logical type key plus ordered named fields. Fields sit behind a lock
//! so a decoded instance can be registered in the back-reference table
//! before its own fields are materialized; that is what lets a fallback
//! struct participate in cycles.

use crate::type_key::TypeKey;
use crate::values::ObjectRef;
use parking_lot::RwLock;

/// Runtime struct: type key + ordered `(name, value)` fields.
#[derive(Debug)]
pub struct DynStruct {
    type_key: TypeKey,
    fields: RwLock<Vec<(String, Option<ObjectRef>)>>,
}

impl DynStruct {
    pub fn new(type_key: TypeKey) -> Self {
        Self {
            type_key,
            fields: RwLock::new(Vec::new()),
        }
    }

    pub fn with_fields(type_key: TypeKey, fields: Vec<(String, Option<ObjectRef>)>) -> Self {
        Self {
            type_key,
            fields: RwLock::new(fields),
        }
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    /// Append a field, preserving declaration order.
    pub fn push_field(&self, name: impl Into<String>, value: Option<ObjectRef>) {
        self.fields.write().push((name.into(), value));
    }

    /// Value of the named field, if present.
    pub fn get(&self, name: &str) -> Option<Option<ObjectRef>> {
        self.fields
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Snapshot of all fields in declaration order.
    pub fn fields(&self) -> Vec<(String, Option<ObjectRef>)> {
        self.fields.read().clone()
    }

    pub fn field_count(&self) -> usize {
        self.fields.read().len()
    }
}
