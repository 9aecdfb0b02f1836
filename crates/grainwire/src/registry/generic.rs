// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lazy specialization of generic-definition codecs.
//!
//! A generic definition (say `` list`1 ``) registers a factory instead of
//! a codec triple. When the registry misses on a concrete key such as
//! `list<int>`, it resolves the arguments and asks the factory to
//! materialize the concrete triple, then caches it under the concrete key.
//! Monomorphization happens inside the factory at compile time; the
//! registry only orchestrates lookup, specialization, and caching.

use crate::error::SerResult;
use crate::registry::{Registration, TypeRegistry};
use crate::type_key::ResolvedType;

/// Factory that materializes a codec triple for one concrete
/// instantiation of a generic definition.
pub trait GenericCodecFactory: Send + Sync {
    /// Build the registration for the given argument types.
    ///
    /// The registry replaces the registration key with the concrete key,
    /// so factories may leave it as the definition key.
    ///
    /// # Errors
    ///
    /// Return an error if the argument combination is unsupported; the
    /// engine surfaces it as the operation's failure.
    fn specialize(
        &self,
        registry: &TypeRegistry,
        args: &[ResolvedType],
    ) -> SerResult<Registration>;
}
