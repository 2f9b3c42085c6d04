//! # logfleet-merge
//!
//! Non-destructive layered defaulting for partially specified
//! configuration trees.
//!
//! ## Semantics
//!
//! - A field that is already set on the destination is never overwritten.
//! - An unset optional field is filled with a copy of the source value.
//!   The merge never descends into an optional that is already set, even
//!   when fields nested inside it are individually unset: setting any
//!   part of an optional sub-tree claims the whole sub-tree.
//! - Collections are filled wholesale. An empty destination collection is
//!   replaced by a copy of the source collection; a non-empty one is left
//!   untouched. There is no element-wise union.
//!
//! Layering is expressed by calling [`Merge::merge_from`] once per
//! defaults layer: earlier layers win, because each later layer only sees
//! the fields that are still unset.

use std::collections::BTreeMap;

/// Fills unset fields of `self` from a defaults source of the same shape.
pub trait Merge {
    /// Merge `defaults` into `self` without overwriting set fields.
    fn merge_from(&mut self, defaults: &Self);
}

/// Fill an unset optional field with a copy of the source value.
///
/// A `Some` destination is left untouched; the merge stops at the first
/// set ancestor and does not descend into its nested fields.
pub fn fill<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if dst.is_none() {
        if let Some(value) = src {
            *dst = Some(value.clone());
        }
    }
}

/// Replace an empty destination sequence with a copy of the source.
pub fn fill_vec<T: Clone>(dst: &mut Vec<T>, src: &[T]) {
    if dst.is_empty() && !src.is_empty() {
        *dst = src.to_vec();
    }
}

/// Replace an empty destination map with a copy of the source.
pub fn fill_map<K: Ord + Clone, V: Clone>(dst: &mut BTreeMap<K, V>, src: &BTreeMap<K, V>) {
    if dst.is_empty() && !src.is_empty() {
        *dst = src.clone();
    }
}
