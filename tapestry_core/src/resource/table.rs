// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-session id → resource map.

use alloc::collections::BTreeMap;

use crate::error::ResourceError;

use super::id::{Handle, ResourceId};
use super::kind::{ResourceKind, TypeFlags};

/// Maps a session's client-chosen ids to resources.
///
/// Each entry owns one reference to its resource. The table itself has no
/// access to the [`ResourceStore`](super::ResourceStore): [`remove`](Self::remove)
/// hands the handle back so the caller can release that reference.
#[derive(Clone, Debug)]
pub struct ResourceTable {
    entries: BTreeMap<ResourceId, (Handle, ResourceKind)>,
    capacity: usize,
}

impl ResourceTable {
    /// Creates an empty table holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that [`add`](Self::add) would accept `id`.
    pub fn check_add(&self, id: ResourceId) -> Result<(), ResourceError> {
        if id == 0 {
            return Err(ResourceError::ReservedId);
        }
        if self.entries.contains_key(&id) {
            return Err(ResourceError::DuplicateId(id));
        }
        if self.entries.len() >= self.capacity {
            return Err(ResourceError::LimitExceeded(self.capacity));
        }
        Ok(())
    }

    /// Inserts `handle` under `id`.
    ///
    /// The table takes over the caller's reference on success. On failure the
    /// caller still owns it.
    pub fn add(
        &mut self,
        id: ResourceId,
        handle: Handle,
        kind: ResourceKind,
    ) -> Result<(), ResourceError> {
        self.check_add(id)?;
        self.entries.insert(id, (handle, kind));
        Ok(())
    }

    /// Erases `id` and returns the handle whose reference the caller must now
    /// release.
    pub fn remove(&mut self, id: ResourceId) -> Result<Handle, ResourceError> {
        self.entries
            .remove(&id)
            .map(|(handle, _)| handle)
            .ok_or(ResourceError::NotFound(id))
    }

    /// Looks up `id`, requiring every capability in `required`.
    pub fn find(&self, id: ResourceId, required: TypeFlags) -> Result<Handle, ResourceError> {
        let &(handle, kind) = self.entries.get(&id).ok_or(ResourceError::NotFound(id))?;
        if kind.type_flags().contains(required) {
            Ok(handle)
        } else {
            Err(ResourceError::WrongType {
                id,
                actual: kind,
                expected: required,
            })
        }
    }

    /// Looks up `id` without a capability check.
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<(Handle, ResourceKind)> {
        self.entries.get(&id).copied()
    }

    /// Iterates `(id, handle)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, Handle)> + '_ {
        self.entries.iter().map(|(&id, &(handle, _))| (id, handle))
    }

    /// Removes every entry, returning the handles whose references the caller
    /// must release.
    pub fn clear(&mut self) -> impl Iterator<Item = Handle> + use<> {
        core::mem::take(&mut self.entries)
            .into_values()
            .map(|(handle, _)| handle)
    }
}
