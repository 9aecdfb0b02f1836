// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! General (non-blittable) array value.
//!
//! Elements are stored row-major in one flat vector regardless of rank;
//! dimension lengths describe the logical shape. Lower bounds are zero.
//! Items sit behind a lock so a decoded array can enter the
//! back-reference table before its elements are materialized.

use crate::type_key::ResolvedType;
use crate::values::ObjectRef;
use parking_lot::RwLock;

/// Array of objects with arbitrary rank, row-major element order.
#[derive(Debug)]
pub struct ObjectArray {
    element: ResolvedType,
    dims: Vec<u32>,
    items: RwLock<Vec<Option<ObjectRef>>>,
}

impl ObjectArray {
    /// Create an array of the given shape with all elements unset.
    pub fn new(element: ResolvedType, dims: Vec<u32>) -> Self {
        let len = dims.iter().map(|d| *d as usize).product();
        Self {
            element,
            dims,
            items: RwLock::new(vec![None; len]),
        }
    }

    /// Create a rank-1 array from its elements.
    pub fn from_items(element: ResolvedType, items: Vec<Option<ObjectRef>>) -> Self {
        let dims = vec![items.len() as u32];
        Self {
            element,
            dims,
            items: RwLock::new(items),
        }
    }

    pub fn element_type(&self) -> &ResolvedType {
        &self.element
    }

    pub fn rank(&self) -> u32 {
        self.dims.len() as u32
    }

    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    /// Total element count across all dimensions.
    pub fn len(&self) -> usize {
        self.dims.iter().map(|d| *d as usize).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Option<ObjectRef>> {
        self.items.read().get(index).cloned()
    }

    pub fn set(&self, index: usize, value: Option<ObjectRef>) {
        if let Some(slot) = self.items.write().get_mut(index) {
            *slot = value;
        }
    }

    /// Snapshot of all elements in row-major order.
    pub fn items(&self) -> Vec<Option<ObjectRef>> {
        self.items.read().clone()
    }

    /// Replace all elements. The caller must supply `len()` items.
    pub fn set_items(&self, items: Vec<Option<ObjectRef>>) {
        debug_assert_eq!(items.len(), self.len());
        *self.items.write() = items;
    }

    /// Row-major stride table: element distance per dimension.
    ///
    /// Used for linear indexing at ranks above three; element order is
    /// row-major either way.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.dims.len()];
        for i in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1] as usize;
        }
        strides
    }

    /// Linear index of a multi-dimensional coordinate.
    pub fn linear_index(&self, coords: &[u32]) -> Option<usize> {
        if coords.len() != self.dims.len() {
            return None;
        }
        let strides = self.strides();
        let mut index = 0usize;
        for (i, &c) in coords.iter().enumerate() {
            if c >= self.dims[i] {
                return None;
            }
            index += c as usize * strides[i];
        }
        Some(index)
    }
}
