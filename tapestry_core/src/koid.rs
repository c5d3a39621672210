// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide identities and linking tokens.
//!
//! A [`Koid`] names an object across sessions. Token pairs come from
//! [`token_pair`]: each half is handed to a different client out of band and
//! later moved into the [`ObjectLinker`](crate::linker::ObjectLinker), which
//! pairs them by their shared koid. Tokens are neither `Clone` nor `Copy`, so
//! a token can be consumed at most once.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

static NEXT_KOID: AtomicU64 = AtomicU64::new(1);

/// A process-wide unique object identity.
///
/// Koid `0` is never allocated.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Koid(u64);

impl Koid {
    /// Allocates a fresh koid.
    #[must_use]
    pub fn new() -> Self {
        Self(NEXT_KOID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Default for Koid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Koid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Koid({})", self.0)
    }
}

impl fmt::Display for Koid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct PairState {
    export_closed: Cell<bool>,
    import_closed: Cell<bool>,
}

/// The exporting half of a token pair. Consumed by a `ViewHolder`.
pub struct ExportToken {
    koid: Koid,
    state: Rc<PairState>,
}

/// The importing half of a token pair. Consumed by a View.
pub struct ImportToken {
    koid: Koid,
    state: Rc<PairState>,
}

/// Creates a linked pair of tokens sharing one koid.
#[must_use]
pub fn token_pair() -> (ExportToken, ImportToken) {
    let koid = Koid::new();
    let state = Rc::new(PairState::default());
    (
        ExportToken {
            koid,
            state: Rc::clone(&state),
        },
        ImportToken { koid, state },
    )
}

impl ExportToken {
    /// The koid shared by both halves of the pair.
    #[must_use]
    pub fn koid(&self) -> Koid {
        self.koid
    }

    /// Returns `true` once the import half has been dropped.
    #[must_use]
    pub fn peer_closed(&self) -> bool {
        self.state.import_closed.get()
    }
}

impl ImportToken {
    /// The koid shared by both halves of the pair.
    #[must_use]
    pub fn koid(&self) -> Koid {
        self.koid
    }

    /// Returns `true` once the export half has been dropped.
    #[must_use]
    pub fn peer_closed(&self) -> bool {
        self.state.export_closed.get()
    }
}

impl Drop for ExportToken {
    fn drop(&mut self) {
        self.state.export_closed.set(true);
    }
}

impl Drop for ImportToken {
    fn drop(&mut self) {
        self.state.import_closed.set(true);
    }
}

impl fmt::Debug for ExportToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportToken")
            .field("koid", &self.koid)
            .field("peer_closed", &self.peer_closed())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ImportToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportToken")
            .field("koid", &self.koid)
            .field("peer_closed", &self.peer_closed())
            .finish_non_exhaustive()
    }
}

/// The stable cross-process identity of a View or Scene in the view tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ViewRef {
    koid: Koid,
}

impl ViewRef {
    /// Allocates a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self { koid: Koid::new() }
    }

    /// The koid that keys this view in the view tree.
    #[must_use]
    pub fn koid(&self) -> Koid {
        self.koid
    }
}

impl Default for ViewRef {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn koids_are_unique() {
        let a = Koid::new();
        let b = Koid::new();
        assert_ne!(a, b);
        assert_ne!(a.get(), 0);
    }

    #[test]
    fn token_pair_shares_koid() {
        let (export, import) = token_pair();
        assert_eq!(export.koid(), import.koid());
        assert!(!export.peer_closed());
        assert!(!import.peer_closed());
    }

    #[test]
    fn dropping_one_half_closes_it_for_the_peer() {
        let (export, import) = token_pair();
        drop(import);
        assert!(export.peer_closed());

        let (export, import) = token_pair();
        drop(export);
        assert!(import.peer_closed());
    }

    #[test]
    fn token_debug_shows_identity_and_peer_state() {
        let (export, import) = token_pair();
        let koid = export.koid();
        drop(import);
        assert_eq!(
            alloc::format!("{export:?}"),
            alloc::format!("ExportToken {{ koid: {koid:?}, peer_closed: true, .. }}")
        );
    }

    #[test]
    fn view_ref_clones_keep_identity() {
        let a = ViewRef::new();
        let b = a.clone();
        assert_eq!(a.koid(), b.koid());
        assert_ne!(a.koid(), ViewRef::new().koid());
    }
}
