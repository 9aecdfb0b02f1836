// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry: runtime types <-> stable string keys <-> codec triples.
//!
//! The registry is read on every operation and written at startup
//! registration, lazy generic specialization, and codec memoization. The
//! main tables sit behind coarse `RwLock`s (the hot path is read-only);
//! the memo caches are concurrent maps where an insert race resolves to
//! "first writer wins, both readers get the same entry".

mod codec;
mod entry;
pub mod fallback;
mod generic;
mod primitives;

pub use codec::{
    copier_fn, deserializer_fn, serializer_fn, CopierFn, DeserializeFn, KeyedCodec, ObjectCodec,
    SerializeFn, SerializerId,
};
pub use entry::{EnumRepr, IntWidth, Registration, TypeEntry};
pub use generic::GenericCodecFactory;
pub use primitives::{primitive_array_type, primitive_by_key, primitive_key_of};

use crate::error::{SerResult, SerializationError};
use crate::type_key::{parse_key, ParsedKey, ResolvedType, TypeKey, TypeShape};
use crate::values::{CarriedException, ObjectRef};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Extracts error details from a value for exception substitution.
pub type ErrorExtractor = Arc<dyn Fn(&ObjectRef) -> Option<CarriedException> + Send + Sync>;

/// Loads a type from its fully-qualified name on behalf of the resolver.
///
/// The default loader looks the name up in the registry's own
/// fully-qualified-name index; hosts with richer type catalogs can
/// plug in their own.
pub trait TypeLoader: Send + Sync {
    fn load(&self, fully_qualified: &str, registry: &TypeRegistry) -> Option<ResolvedType>;
}

/// Bidirectional mapping between runtime types, stable keys, and codecs.
pub struct TypeRegistry {
    entries: RwLock<HashMap<TypeKey, TypeEntry>>,
    id_by_key: RwLock<HashMap<TypeKey, TypeId>>,
    key_by_id: RwLock<HashMap<TypeId, TypeKey>>,
    known_types: RwLock<HashMap<TypeKey, String>>,
    fqn_index: RwLock<HashMap<String, TypeKey>>,
    resolution_cache: DashMap<String, ResolvedType>,
    generic_factories: RwLock<HashMap<TypeKey, Arc<dyn GenericCodecFactory>>>,
    error_extractors: RwLock<HashMap<TypeId, ErrorExtractor>>,
    externals: Vec<Arc<dyn ObjectCodec>>,
    external_memo: DashMap<TypeKey, Option<usize>>,
    keyed_ordered: Vec<Arc<dyn KeyedCodec>>,
    keyed_by_id: HashMap<SerializerId, Arc<dyn KeyedCodec>>,
    keyed_memo: DashMap<TypeKey, Option<SerializerId>>,
    fallback: Arc<dyn ObjectCodec>,
    loader: Option<Arc<dyn TypeLoader>>,
}

impl TypeRegistry {
    pub(crate) fn new(
        externals: Vec<Arc<dyn ObjectCodec>>,
        keyed_ordered: Vec<Arc<dyn KeyedCodec>>,
        keyed_by_id: HashMap<SerializerId, Arc<dyn KeyedCodec>>,
        fallback: Arc<dyn ObjectCodec>,
        loader: Option<Arc<dyn TypeLoader>>,
    ) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            id_by_key: RwLock::new(HashMap::new()),
            key_by_id: RwLock::new(HashMap::new()),
            known_types: RwLock::new(HashMap::new()),
            fqn_index: RwLock::new(HashMap::new()),
            resolution_cache: DashMap::new(),
            generic_factories: RwLock::new(HashMap::new()),
            error_extractors: RwLock::new(HashMap::new()),
            externals,
            external_memo: DashMap::new(),
            keyed_ordered,
            keyed_by_id,
            keyed_memo: DashMap::new(),
            fallback,
            loader,
        }
    }

    // -------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------

    /// Install a registration, optionally bound to a compiled type.
    ///
    /// Marker entries for the registration's abstract keys are inserted
    /// alongside so values statically typed by those keys resolve at
    /// decode time.
    ///
    /// # Errors
    ///
    /// [`SerializationError::RegistrationInconsistency`] when the codec
    /// pair rule is violated or the key is already taken by a full
    /// registration and `override_existing` is not set.
    pub fn register(&self, type_id: Option<TypeId>, registration: Registration) -> SerResult<()> {
        let mut reg = registration;
        reg.validate()?;
        let key = reg.key.clone();
        let abstract_keys = std::mem::take(&mut reg.abstract_keys);

        {
            let mut entries = self.entries.write();
            if let Some(existing) = entries.get(&key) {
                if !is_marker(existing) && !reg.override_existing {
                    return Err(SerializationError::RegistrationInconsistency {
                        type_key: key.as_str().to_string(),
                        reason: "key already registered (pass override to replace)".into(),
                    });
                }
            }
            for abstract_key in &abstract_keys {
                entries
                    .entry(abstract_key.clone())
                    .or_insert_with(|| TypeEntry::marker(abstract_key.clone()));
            }
            entries.insert(key.clone(), reg.into_entry());
        }

        if let Some(id) = type_id {
            self.id_by_key.write().insert(key.clone(), id);
            self.key_by_id.write().insert(id, key.clone());
        }
        self.resolution_cache.remove(key.as_str());
        log::debug!("registry: registered '{}'", key);
        Ok(())
    }

    /// Key-only registration for interface-like and abstract keys.
    pub fn register_marker(&self, key: impl Into<String>, type_id: Option<TypeId>) {
        let key = TypeKey::new(key);
        self.entries
            .write()
            .entry(key.clone())
            .or_insert_with(|| TypeEntry::marker(key.clone()));
        if let Some(id) = type_id {
            self.id_by_key.write().insert(key.clone(), id);
            self.key_by_id.write().insert(id, key);
        }
    }

    /// Record a `type key -> fully-qualified name` pair for the resolver.
    pub fn add_known_type(&self, key: impl Into<String>, fully_qualified: impl Into<String>) {
        let key = TypeKey::new(key);
        let fqn = fully_qualified.into();
        self.fqn_index.write().insert(fqn.clone(), key.clone());
        self.known_types.write().insert(key, fqn);
    }

    /// Register a generic-definition factory under `` base`arity ``.
    pub fn register_generic_definition(
        &self,
        base: &str,
        arity: usize,
        factory: Arc<dyn GenericCodecFactory>,
    ) {
        let def = TypeKey::definition_of(base, arity);
        self.generic_factories.write().insert(def, factory);
    }

    pub(crate) fn register_error_extractor(&self, type_id: TypeId, extractor: ErrorExtractor) {
        self.error_extractors.write().insert(type_id, extractor);
    }

    pub(crate) fn error_extractor(&self, type_id: TypeId) -> Option<ErrorExtractor> {
        self.error_extractors.read().get(&type_id).cloned()
    }

    // -------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------

    /// Stable key of a compiled type, if registered or primitive.
    pub fn type_key_of(&self, type_id: TypeId) -> Option<TypeKey> {
        if let Some(key) = primitive_key_of(type_id) {
            return Some(key);
        }
        self.key_by_id.read().get(&type_id).cloned()
    }

    /// Entry for the exact key, or a lazily specialized entry when the
    /// type is a closed generic whose definition has a factory.
    ///
    /// A key-only marker under the concrete key does not block
    /// specialization; the specialized entry replaces it.
    pub fn entry_for_type(&self, ty: &ResolvedType) -> SerResult<Option<TypeEntry>> {
        let existing = self.entries.read().get(ty.key()).cloned();
        if let Some(entry) = &existing {
            if !is_marker(entry) {
                return Ok(existing);
            }
        }
        if let TypeShape::Generic { definition, args } = ty.shape() {
            if let Some(entry) = self.specialize_generic(ty.key(), definition, args)? {
                return Ok(Some(entry));
            }
        }
        Ok(existing)
    }

    /// Materialize a concrete codec from a generic-definition factory and
    /// cache it under the concrete key.
    fn specialize_generic(
        &self,
        concrete: &TypeKey,
        definition: &TypeKey,
        args: &[ResolvedType],
    ) -> SerResult<Option<TypeEntry>> {
        let factory = match self.generic_factories.read().get(definition).cloned() {
            Some(f) => f,
            None => return Ok(None),
        };
        // Build outside the entries lock; factories may consult the
        // registry themselves.
        let mut registration = factory.specialize(self, args)?;
        registration.validate()?;
        registration.key = concrete.clone();

        let mut entries = self.entries.write();
        // Re-check under the lock: a racing specialization wins and the
        // duplicate is dropped. Markers are upgraded.
        if let Some(existing) = entries.get(concrete) {
            if !is_marker(existing) {
                return Ok(Some(existing.clone()));
            }
        }
        let entry = registration.into_entry();
        entries.insert(concrete.clone(), entry.clone());
        log::debug!("registry: specialized '{}' from '{}'", concrete, definition);
        Ok(Some(entry))
    }

    pub fn copier_for(&self, ty: &ResolvedType) -> SerResult<Option<CopierFn>> {
        Ok(self.entry_for_type(ty)?.and_then(|e| e.copier))
    }

    pub fn serializer_for(&self, ty: &ResolvedType) -> SerResult<Option<SerializeFn>> {
        Ok(self.entry_for_type(ty)?.and_then(|e| e.serializer))
    }

    pub fn deserializer_for(&self, ty: &ResolvedType) -> SerResult<Option<DeserializeFn>> {
        Ok(self.entry_for_type(ty)?.and_then(|e| e.deserializer))
    }

    /// True when a serializer exists for the type: primitives always
    /// pass; arrays pass when their element does; generics pass when the
    /// definition is known and every argument recursively passes.
    pub fn has_serializer(&self, ty: &ResolvedType) -> bool {
        if primitive_by_key(ty.key().as_str()).is_some() {
            return true;
        }
        match ty.shape() {
            TypeShape::Array { element, .. } => self.has_serializer(element),
            TypeShape::Generic { definition, args } => {
                let direct = self
                    .entries
                    .read()
                    .get(ty.key())
                    .map(|e| e.serializer.is_some() || e.enum_repr.is_some())
                    .unwrap_or(false);
                if direct {
                    return true;
                }
                let def_known = self.generic_factories.read().contains_key(definition)
                    || self
                        .entries
                        .read()
                        .get(definition)
                        .map(|e| e.serializer.is_some())
                        .unwrap_or(false);
                def_known && args.iter().all(|a| self.has_serializer(a))
            }
            _ => self
                .entries
                .read()
                .get(ty.key())
                .map(|e| e.serializer.is_some() || e.enum_repr.is_some())
                .unwrap_or(false),
        }
    }

    // -------------------------------------------------------------------
    // External / keyed / fallback tiers
    // -------------------------------------------------------------------

    /// First external serializer supporting the type, memoized per key
    /// including the negative result.
    pub fn external_for(&self, ty: &ResolvedType) -> Option<Arc<dyn ObjectCodec>> {
        let slot = *self
            .external_memo
            .entry(ty.key().clone())
            .or_insert_with(|| {
                self.externals
                    .iter()
                    .position(|codec| codec.supports_type(ty))
            });
        slot.map(|i| self.externals[i].clone())
    }

    /// First keyed serializer supporting the type, memoized per key.
    pub fn keyed_for(&self, ty: &ResolvedType) -> Option<Arc<dyn KeyedCodec>> {
        let slot = *self.keyed_memo.entry(ty.key().clone()).or_insert_with(|| {
            self.keyed_ordered
                .iter()
                .find(|codec| codec.supports_type(ty))
                .map(|codec| codec.id())
        });
        slot.and_then(|id| self.keyed_by_id.get(&id).cloned())
    }

    pub fn keyed_by_id(&self, id: SerializerId) -> Option<Arc<dyn KeyedCodec>> {
        self.keyed_by_id.get(&id).cloned()
    }

    pub fn fallback(&self) -> Arc<dyn ObjectCodec> {
        self.fallback.clone()
    }

    // -------------------------------------------------------------------
    // Name resolution
    // -------------------------------------------------------------------

    /// Resolve a type-key string to a runtime type handle.
    ///
    /// Resolution order: cache, primitives, registered keys, known-type
    /// table (via the loader), array suffix, generic construction.
    ///
    /// # Errors
    ///
    /// [`SerializationError::UnresolvableTypeName`] when every rule is
    /// exhausted.
    pub fn resolve(&self, key_str: &str) -> SerResult<ResolvedType> {
        if let Some(cached) = self.resolution_cache.get(key_str) {
            return Ok(cached.clone());
        }
        let ty = self.resolve_uncached(key_str)?;
        self.resolution_cache
            .insert(key_str.to_string(), ty.clone());
        Ok(ty)
    }

    fn resolve_uncached(&self, key_str: &str) -> SerResult<ResolvedType> {
        if let Some(ty) = primitive_by_key(key_str) {
            return Ok(ty);
        }
        let key = TypeKey::from(key_str);
        if let Some(fqn) = self.known_types.read().get(&key).cloned() {
            if let Some(ty) = self.load_by_name(&fqn) {
                return Ok(ty);
            }
        }
        if key_str.ends_with(']') || key_str.contains('<') {
            // Structural keys resolve structurally so generic-definition
            // specialization can see the argument types; a directly
            // registered entry under the full key still wins below.
            match self.resolve_structural(&key) {
                Ok(ty) => return Ok(ty),
                Err(err) => {
                    if let Some(ty) = self.registered_type(&key) {
                        return Ok(ty);
                    }
                    return Err(err);
                }
            }
        }
        if let Some(ty) = self.registered_type(&key) {
            return Ok(ty);
        }
        Err(SerializationError::UnresolvableTypeName {
            key: key_str.to_string(),
        })
    }

    fn resolve_structural(&self, key: &TypeKey) -> SerResult<ResolvedType> {
        match parse_key(key)? {
            ParsedKey::Array { element, rank } => {
                let element = self.resolve(element.as_str())?;
                Ok(ResolvedType::array(element, rank))
            }
            ParsedKey::Generic { base, args } => {
                let args = args
                    .iter()
                    .map(|a| self.resolve(a.as_str()))
                    .collect::<SerResult<Vec<_>>>()?;
                let definition = TypeKey::definition_of(&base, args.len());
                let definition_known = self.generic_factories.read().contains_key(&definition)
                    || self.entries.read().contains_key(&definition)
                    || self.entries.read().contains_key(key);
                if !definition_known {
                    return Err(SerializationError::UnresolvableTypeName {
                        key: key.as_str().to_string(),
                    });
                }
                Ok(ResolvedType::generic(&base, args))
            }
            ParsedKey::Simple => Err(SerializationError::UnresolvableTypeName {
                key: key.as_str().to_string(),
            }),
        }
    }

    fn registered_type(&self, key: &TypeKey) -> Option<ResolvedType> {
        if let Some(id) = self.id_by_key.read().get(key).copied() {
            return Some(ResolvedType::runtime(key.clone(), id));
        }
        if self.entries.read().contains_key(key) {
            return Some(ResolvedType::named(key.clone()));
        }
        None
    }

    fn load_by_name(&self, fqn: &str) -> Option<ResolvedType> {
        if let Some(loader) = &self.loader {
            return loader.load(fqn, self);
        }
        let key = self.fqn_index.read().get(fqn).cloned()?;
        self.registered_type(&key)
    }
}

/// Key-only entry: resolvable, but carries no codec at all.
fn is_marker(entry: &TypeEntry) -> bool {
    entry.serializer.is_none() && entry.copier.is_none() && entry.enum_repr.is_none()
}


impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("entries", &self.entries.read().len())
            .field("externals", &self.externals.len())
            .field("keyed", &self.keyed_ordered.len())
            .finish()
    }
}
