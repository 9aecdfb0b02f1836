// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent construction of a [`SerializationEngine`].
//!
//! The builder collects the registry feed (typed registrations, marker
//! keys, known-type entries, generic definition factories, external and
//! keyed serializers, the fallback), validates it, and produces the
//! engine. Registration errors abort `build`; nothing is reported late.

use crate::config::EngineConfig;
use crate::engine::SerializationEngine;
use crate::error::{SerResult, SerializationError};
use crate::registry::fallback::DynStructReflector;
use crate::registry::{
    ErrorExtractor, GenericCodecFactory, KeyedCodec, ObjectCodec, Registration, SerializerId,
    TypeLoader, TypeRegistry,
};
use crate::stats::{AtomicStatistics, StatisticsSink};
use crate::type_key::TypeKey;
use crate::values::{object, CarriedException};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Key the synthetic error envelope is registered under.
pub const EXCEPTION_TYPE_KEY: &str = "runtime.exception";

/// Assembles the registry feed and produces an engine.
pub struct EngineBuilder {
    registrations: Vec<(Option<TypeId>, Registration)>,
    markers: Vec<(TypeKey, Option<TypeId>)>,
    known_types: Vec<(String, String)>,
    generic_definitions: Vec<(String, usize, Arc<dyn GenericCodecFactory>)>,
    externals: Vec<Arc<dyn ObjectCodec>>,
    keyed: Vec<Arc<dyn KeyedCodec>>,
    error_extractors: Vec<(TypeId, ErrorExtractor)>,
    fallback: Option<Arc<dyn ObjectCodec>>,
    loader: Option<Arc<dyn TypeLoader>>,
    statistics: Option<Arc<dyn StatisticsSink>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub(crate) fn new() -> Self {
        Self {
            registrations: Vec::new(),
            markers: Vec::new(),
            known_types: Vec::new(),
            generic_definitions: Vec::new(),
            externals: Vec::new(),
            keyed: Vec::new(),
            error_extractors: Vec::new(),
            fallback: None,
            loader: None,
            statistics: None,
            config: EngineConfig::default(),
        }
    }

    /// Register a compiled type with its codecs.
    pub fn register<T: Any + Send + Sync>(mut self, registration: Registration) -> Self {
        self.registrations
            .push((Some(TypeId::of::<T>()), registration));
        self
    }

    /// Register codecs for a key with no compiled counterpart (decode
    /// side of lazily specialized generics, dynamic-only types).
    pub fn register_named(mut self, registration: Registration) -> Self {
        self.registrations.push((None, registration));
        self
    }

    /// Key-only marker registration.
    pub fn register_marker(mut self, key: impl Into<String>) -> Self {
        self.markers.push((TypeKey::new(key), None));
        self
    }

    /// Key-only marker registration bound to a compiled type.
    pub fn register_marker_for<T: Any + Send + Sync>(mut self, key: impl Into<String>) -> Self {
        self.markers.push((TypeKey::new(key), Some(TypeId::of::<T>())));
        self
    }

    /// Make values of an error type transportable even without a codec:
    /// when nothing accepts it, the engine substitutes a
    /// [`CarriedException`] with the original message, type name, and
    /// source-chain text.
    pub fn register_error<E>(mut self) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let extractor: ErrorExtractor = Arc::new(|obj| {
            (**obj)
                .downcast_ref::<E>()
                .map(CarriedException::from_error)
        });
        self.error_extractors.push((TypeId::of::<E>(), extractor));
        self
    }

    /// Add a `type key -> fully-qualified name` entry.
    pub fn known_type(
        mut self,
        key: impl Into<String>,
        fully_qualified: impl Into<String>,
    ) -> Self {
        self.known_types.push((key.into(), fully_qualified.into()));
        self
    }

    /// Register a generic-definition factory for `` base`arity ``.
    pub fn generic_definition(
        mut self,
        base: impl Into<String>,
        arity: usize,
        factory: Arc<dyn GenericCodecFactory>,
    ) -> Self {
        self.generic_definitions.push((base.into(), arity, factory));
        self
    }

    /// Append an external serializer; earlier entries win ties.
    pub fn external(mut self, codec: Arc<dyn ObjectCodec>) -> Self {
        self.externals.push(codec);
        self
    }

    /// Append a keyed serializer. Ids must be unique.
    pub fn keyed(mut self, codec: Arc<dyn KeyedCodec>) -> Self {
        self.keyed.push(codec);
        self
    }

    /// Replace the default fallback serializer.
    pub fn fallback(mut self, codec: Arc<dyn ObjectCodec>) -> Self {
        self.fallback = Some(codec);
        self
    }

    /// Plug in a type loader for the known-type table.
    pub fn type_loader(mut self, loader: Arc<dyn TypeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Inject a statistics sink (default: [`AtomicStatistics`]).
    pub fn statistics(mut self, sink: Arc<dyn StatisticsSink>) -> Self {
        self.statistics = Some(sink);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the feed and construct the engine.
    ///
    /// # Errors
    ///
    /// [`SerializationError::RegistrationInconsistency`] for duplicate
    /// keyed serializer ids, codec pair violations, or duplicate keys.
    pub fn build(self) -> SerResult<SerializationEngine> {
        let mut keyed_by_id: HashMap<SerializerId, Arc<dyn KeyedCodec>> = HashMap::new();
        for codec in &self.keyed {
            let id = codec.id();
            if keyed_by_id.insert(id, codec.clone()).is_some() {
                return Err(SerializationError::RegistrationInconsistency {
                    type_key: format!("serializer id {}", id),
                    reason: "duplicate keyed serializer id".into(),
                });
            }
        }

        let fallback = self
            .fallback
            .unwrap_or_else(|| Arc::new(DynStructReflector));
        let registry = TypeRegistry::new(
            self.externals,
            self.keyed,
            keyed_by_id,
            fallback,
            self.loader,
        );

        register_exception_envelope(&registry)?;

        for (key, type_id) in self.markers {
            registry.register_marker(key.as_str(), type_id);
        }
        for (key, fqn) in self.known_types {
            registry.add_known_type(key, fqn);
        }
        for (base, arity, factory) in self.generic_definitions {
            registry.register_generic_definition(&base, arity, factory);
        }
        for (type_id, registration) in self.registrations {
            registry.register(type_id, registration)?;
        }
        for (type_id, extractor) in self.error_extractors {
            registry.register_error_extractor(type_id, extractor);
        }

        let stats = self
            .statistics
            .unwrap_or_else(|| Arc::new(AtomicStatistics::new()));
        Ok(SerializationEngine::new(registry, self.config, stats))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The error envelope always has a codec, so the substitution clause can
/// never itself fail to find one.
fn register_exception_envelope(registry: &TypeRegistry) -> SerResult<()> {
    let registration = Registration::new(EXCEPTION_TYPE_KEY)
        .with_codec::<CarriedException, _, _>(
            |e, ctx| {
                ctx.writer().write_str(&e.type_name);
                ctx.writer().write_str(&e.message);
                ctx.writer().write_str(&e.stack);
                Ok(())
            },
            |_ty, ctx| {
                let type_name = ctx.reader().read_str()?;
                let message = ctx.reader().read_str()?;
                let stack = ctx.reader().read_str()?;
                let obj = object(CarriedException::new(type_name, message, stack));
                ctx.record_object(&obj);
                Ok(obj)
            },
        )
        .immutable();
    registry.register(Some(TypeId::of::<CarriedException>()), registration)?;

    let extractor: ErrorExtractor = Arc::new(|obj| {
        (**obj).downcast_ref::<CarriedException>().cloned()
    });
    registry.register_error_extractor(TypeId::of::<CarriedException>(), extractor);
    Ok(())
}
