//! Metadata inspection with per-(type, key) memoization.
//!
//! Resolution of a document key against a type's field table is pure but not
//! free - setter-name camel-casing plus up to four scans over the field list.
//! Documents usually arrive in arrays of like-typed objects, so results
//! (including misses) are memoized in a cache shared by every mapping call on
//! one `Mapper`.
//!
//! The cache is read-mostly: a read-lock probe first, computation outside any
//! lock, then a write-lock insert. A race between two callers computes the
//! same entry twice and inserts identical values - redundant work, never
//! corruption. Entries are never invalidated; the registry is immutable for
//! the mapper's lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::registry::{AccessorKind, CompiledField, RegisteredType};

#[derive(Default)]
pub(crate) struct InspectionCache {
    entries: RwLock<HashMap<(String, String), Option<Arc<CompiledField>>>>,
}

impl InspectionCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Resolve `key` against `ty`'s field table, memoized per (type, key).
    pub(crate) fn resolve(
        &self,
        ty: &RegisteredType,
        key: &str,
    ) -> Option<Arc<CompiledField>> {
        if let Ok(entries) = self.entries.read() {
            if let Some(cached) = entries.get(&(ty.name.clone(), key.to_string())) {
                return cached.clone();
            }
        }

        let resolved = inspect(ty, key);

        if let Ok(mut entries) = self.entries.write() {
            entries
                .entry((ty.name.clone(), key.to_string()))
                .or_insert_with(|| resolved.clone());
        }

        resolved
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

/// Uncached resolution, in precedence order:
///
/// 1. a setter-style accessor matching the camel-cased key (method lookup is
///    case-insensitive);
/// 2. a field whose alias equals the key;
/// 3. an alias-free field whose name equals the key exactly;
/// 4. an alias-free field whose name matches the key case-insensitively,
///    first match in declaration order.
///
/// An aliased field never matches by its bare name - aliases are exclusive.
fn inspect(ty: &RegisteredType, key: &str) -> Option<Arc<CompiledField>> {
    let setter_name = camelize(key);
    let find = |pred: &dyn Fn(&CompiledField) -> bool| {
        ty.fields.iter().find(|f| pred(f)).cloned()
    };

    find(&|f| {
        f.accessor == AccessorKind::Setter && f.name.eq_ignore_ascii_case(&setter_name)
    })
    .or_else(|| {
        find(&|f| {
            f.accessor == AccessorKind::Field && f.source_key.as_deref() == Some(key)
        })
    })
    .or_else(|| {
        find(&|f| {
            f.accessor == AccessorKind::Field && f.source_key.is_none() && f.name == key
        })
    })
    .or_else(|| {
        find(&|f| {
            f.accessor == AccessorKind::Field
                && f.source_key.is_none()
                && f.name.eq_ignore_ascii_case(key)
        })
    })
}

/// `phone_number` → `phoneNumber`. Keys without underscores pass through.
fn camelize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for (i, ch) in key.chars().enumerate() {
        if ch == '_' {
            upper_next = i > 0;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

// ===========================================================================
// Tests
// ===========================================================================
