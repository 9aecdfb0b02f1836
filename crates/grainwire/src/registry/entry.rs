// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry entries and the registration description.

use crate::context::{CopyContext, SerializeContext};
use crate::error::{SerResult, SerializationError};
use crate::registry::codec::{
    copier_fn, serializer_fn, CopierFn, DeserializeFn, SerializeFn,
};
use crate::type_key::TypeKey;
use crate::values::{object, ObjectRef};
use std::any::Any;
use std::sync::Arc;

/// Integer width an enum travels as. Non-integer underlying
/// representations are inexpressible here, so they fail at registration
/// instead of being silently widened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

/// Conversion pair for a registered enum.
#[derive(Clone)]
pub struct EnumRepr {
    pub width: IntWidth,
    pub to_raw: Arc<dyn Fn(&ObjectRef) -> SerResult<i128> + Send + Sync>,
    pub from_raw: Arc<dyn Fn(i128) -> SerResult<ObjectRef> + Send + Sync>,
}

impl std::fmt::Debug for EnumRepr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumRepr").field("width", &self.width).finish()
    }
}

/// A registered type: stable key, codec triple, behavior flags.
#[derive(Clone)]
pub struct TypeEntry {
    pub(crate) key: TypeKey,
    pub(crate) copier: Option<CopierFn>,
    pub(crate) serializer: Option<SerializeFn>,
    pub(crate) deserializer: Option<DeserializeFn>,
    pub(crate) value_type: bool,
    pub(crate) immutable: bool,
    pub(crate) enum_repr: Option<EnumRepr>,
}

impl TypeEntry {
    pub(crate) fn marker(key: TypeKey) -> Self {
        Self {
            key,
            copier: None,
            serializer: None,
            deserializer: None,
            value_type: false,
            immutable: false,
            enum_repr: None,
        }
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn has_serializer(&self) -> bool {
        self.serializer.is_some()
    }

    pub fn is_value_type(&self) -> bool {
        self.value_type
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn enum_repr(&self) -> Option<&EnumRepr> {
        self.enum_repr.as_ref()
    }

    pub fn copier(&self) -> Option<CopierFn> {
        self.copier.clone()
    }

    pub fn serializer(&self) -> Option<SerializeFn> {
        self.serializer.clone()
    }

    pub fn deserializer(&self) -> Option<DeserializeFn> {
        self.deserializer.clone()
    }
}

impl std::fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeEntry")
            .field("key", &self.key)
            .field("copier", &self.copier.is_some())
            .field("serializer", &self.serializer.is_some())
            .field("value_type", &self.value_type)
            .field("immutable", &self.immutable)
            .field("enum", &self.enum_repr.is_some())
            .finish()
    }
}

/// Description of one type registration, fed to the engine builder.
///
/// ```no_run
/// # use grainwire::registry::Registration;
/// # use grainwire::error::SerResult;
/// # struct Point { x: i32, y: i32 }
/// let reg = Registration::new("geo.point")
///     .with_codec::<Point, _, _>(
///         |p, ctx| {
///             ctx.writer().write_i32(p.x);
///             ctx.writer().write_i32(p.y);
///             Ok(())
///         },
///         |_ty, ctx| {
///             let x = ctx.reader().read_i32()?;
///             let y = ctx.reader().read_i32()?;
///             Ok(grainwire::values::object(Point { x, y }))
///         },
///     )
///     .immutable();
/// ```
pub struct Registration {
    pub(crate) key: TypeKey,
    pub(crate) copier: Option<CopierFn>,
    pub(crate) serializer: Option<SerializeFn>,
    pub(crate) deserializer: Option<DeserializeFn>,
    pub(crate) value_type: bool,
    pub(crate) immutable: bool,
    pub(crate) enum_repr: Option<EnumRepr>,
    pub(crate) abstract_keys: Vec<TypeKey>,
    pub(crate) override_existing: bool,
}

impl Registration {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: TypeKey::new(key),
            copier: None,
            serializer: None,
            deserializer: None,
            value_type: false,
            immutable: false,
            enum_repr: None,
            abstract_keys: Vec::new(),
            override_existing: false,
        }
    }

    /// Attach a serializer/deserializer pair.
    ///
    /// The pair travels together; registering one half alone is a
    /// registration inconsistency the builder rejects.
    pub fn with_codec<T, S, D>(mut self, serialize: S, deserialize: D) -> Self
    where
        T: Any + Send + Sync,
        S: Fn(&T, &mut SerializeContext<'_>) -> SerResult<()> + Send + Sync + 'static,
        D: Fn(
                &crate::type_key::ResolvedType,
                &mut crate::context::DeserializeContext<'_>,
            ) -> SerResult<ObjectRef>
            + Send
            + Sync
            + 'static,
    {
        self.serializer = Some(serializer_fn::<T, _>(serialize));
        self.deserializer = Some(Arc::new(deserialize));
        self
    }

    /// Attach a copier.
    pub fn with_copier<T, F>(mut self, copy: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &mut CopyContext<'_>) -> SerResult<ObjectRef> + Send + Sync + 'static,
    {
        self.copier = Some(copier_fn::<T, _>(copy));
        self
    }

    /// Register as an enum over the given integer width.
    pub fn as_enum<T, R, W>(mut self, width: IntWidth, to_raw: R, from_raw: W) -> Self
    where
        T: Any + Send + Sync,
        R: Fn(&T) -> i128 + Send + Sync + 'static,
        W: Fn(i128) -> SerResult<T> + Send + Sync + 'static,
    {
        self.enum_repr = Some(EnumRepr {
            width,
            to_raw: Arc::new(move |obj| {
                let value = (**obj).downcast_ref::<T>().ok_or_else(|| {
                    SerializationError::RegistrationInconsistency {
                        type_key: std::any::type_name::<T>().to_string(),
                        reason: "enum codec invoked with a different runtime type".into(),
                    }
                })?;
                Ok(to_raw(value))
            }),
            from_raw: Arc::new(move |raw| Ok(object(from_raw(raw)?))),
        });
        self.value_type = true;
        self
    }

    /// Values of this type are never back-reference tracked.
    pub fn value_type(mut self) -> Self {
        self.value_type = true;
        self
    }

    /// Values of this type are safely shared by reference during deep copy.
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// Interface-like keys this registration also makes resolvable
    /// (marker entries, codec-free).
    pub fn abstract_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.abstract_keys = keys.into_iter().map(|k| TypeKey::new(k)).collect();
        self
    }

    /// Replace an existing registration under the same key.
    pub fn override_existing(mut self) -> Self {
        self.override_existing = true;
        self
    }

    /// Enforce the paired-or-both-absent codec rule.
    pub(crate) fn validate(&self) -> SerResult<()> {
        if self.serializer.is_some() != self.deserializer.is_some() {
            return Err(SerializationError::RegistrationInconsistency {
                type_key: self.key.as_str().to_string(),
                reason: "serializer and deserializer must be registered together".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn into_entry(self) -> TypeEntry {
        TypeEntry {
            key: self.key,
            copier: self.copier,
            serializer: self.serializer,
            deserializer: self.deserializer,
            value_type: self.value_type,
            immutable: self.immutable,
            enum_repr: self.enum_repr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_rule() {
        let reg = Registration::new("demo.widget");
        assert!(reg.validate().is_ok());

        let mut reg = Registration::new("demo.widget");
        reg.serializer = Some(Arc::new(|_, _, _| Ok(())));
        let err = reg.validate().unwrap_err();
        assert!(matches!(
            err,
            SerializationError::RegistrationInconsistency { .. }
        ));

        let mut reg = Registration::new("demo.widget");
        reg.deserializer = Some(Arc::new(|_, _| {
            Ok(object(0i32))
        }));
        assert!(reg.validate().is_err());
    }

    #[test]
    fn test_marker_entry_has_no_codecs() {
        let entry = TypeEntry::marker(TypeKey::from("demo.iface"));
        assert!(!entry.has_serializer());
        assert!(entry.copier.is_none());
        assert_eq!(entry.key().as_str(), "demo.iface");
    }
}
