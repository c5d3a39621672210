// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-sided token rendezvous.
//!
//! An [`ObjectLinker`] pairs an exporter with an importer that may live in
//! different sessions. Each side registers its token independently
//! ([`create_export`](ObjectLinker::create_export) /
//! [`create_import`](ObjectLinker::create_import)) and later binds an object
//! to the endpoint with `initialize_*`. Once both sides are bound, a
//! [`LinkEvent::Resolved`] is queued. If either side is released, or its
//! token is dropped before registering, the surviving side receives an
//! invalidation event instead.
//!
//! Events are queued, never delivered from inside a registration call. The
//! owner drains them with [`pop_event`](ObjectLinker::pop_event) at a point of
//! its choosing.

use alloc::collections::{BTreeMap, VecDeque};
use core::fmt;

use crate::error::LinkError;
use crate::koid::{ExportToken, ImportToken, Koid};

/// The registered export side of a link. Hand back to
/// [`ObjectLinker::release_export`] to tear it down.
#[derive(Debug, PartialEq, Eq)]
pub struct ExportLink {
    koid: Koid,
}

/// The registered import side of a link. Hand back to
/// [`ObjectLinker::release_import`] to tear it down.
#[derive(Debug, PartialEq, Eq)]
pub struct ImportLink {
    koid: Koid,
}

impl ExportLink {
    /// The koid shared with the import side.
    #[must_use]
    pub fn koid(&self) -> Koid {
        self.koid
    }
}

impl ImportLink {
    /// The koid shared with the export side.
    #[must_use]
    pub fn koid(&self) -> Koid {
        self.koid
    }
}

/// Something that happened to a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent<E, I> {
    /// Both sides are bound.
    Resolved {
        /// The exporting object.
        export: E,
        /// The importing object.
        import: I,
    },
    /// The export side's peer went away.
    ExportInvalidated(E),
    /// The import side's peer went away.
    ImportInvalidated(I),
}

struct Endpoint<T, K> {
    token: K,
    object: Option<T>,
    invalidated: bool,
}

impl<T, K> Endpoint<T, K> {
    fn new(token: K) -> Self {
        Self {
            token,
            object: None,
            invalidated: false,
        }
    }
}

struct LinkSlot<E, I> {
    export: Option<Endpoint<E, ExportToken>>,
    import: Option<Endpoint<I, ImportToken>>,
}

impl<E, I> Default for LinkSlot<E, I> {
    fn default() -> Self {
        Self {
            export: None,
            import: None,
        }
    }
}

/// Pairs export and import endpoints by their shared token koid.
pub struct ObjectLinker<E, I> {
    links: BTreeMap<Koid, LinkSlot<E, I>>,
    events: VecDeque<LinkEvent<E, I>>,
}

impl<E, I> fmt::Debug for ObjectLinker<E, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectLinker")
            .field("links", &self.links.len())
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl<E, I> Default for ObjectLinker<E, I> {
    fn default() -> Self {
        Self {
            links: BTreeMap::new(),
            events: VecDeque::new(),
        }
    }
}

impl<E: Copy + PartialEq, I: Copy + PartialEq> ObjectLinker<E, I> {
    /// Creates an empty linker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of links with at least one registered side.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if no link has a registered side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Registers the export half of a token pair.
    ///
    /// Fails with [`LinkError::PeerClosed`] if the import half is already
    /// gone; the token is consumed either way.
    pub fn create_export(&mut self, token: ExportToken) -> Result<ExportLink, LinkError> {
        if token.peer_closed() {
            return Err(LinkError::PeerClosed);
        }
        let koid = token.koid();
        let slot = self.links.entry(koid).or_default();
        slot.export = Some(Endpoint::new(token));
        Ok(ExportLink { koid })
    }

    /// Registers the import half of a token pair.
    ///
    /// Fails with [`LinkError::PeerClosed`] if the export half is already
    /// gone; the token is consumed either way.
    pub fn create_import(&mut self, token: ImportToken) -> Result<ImportLink, LinkError> {
        if token.peer_closed() {
            return Err(LinkError::PeerClosed);
        }
        let koid = token.koid();
        let slot = self.links.entry(koid).or_default();
        slot.import = Some(Endpoint::new(token));
        Ok(ImportLink { koid })
    }

    /// Binds `object` to a registered export endpoint.
    ///
    /// Queues [`LinkEvent::Resolved`] if the import side is already bound.
    pub fn initialize_export(&mut self, link: &ExportLink, object: E) -> Result<(), LinkError> {
        let Some(slot) = self.links.get_mut(&link.koid) else {
            return Err(LinkError::PeerClosed);
        };
        let Some(export) = slot.export.as_mut() else {
            return Err(LinkError::PeerClosed);
        };
        if export.object.is_some() {
            return Err(LinkError::AlreadyInitialized);
        }
        export.object = Some(object);

        match slot.import.as_ref() {
            Some(Endpoint {
                object: Some(import),
                invalidated: false,
                ..
            }) => self.events.push_back(LinkEvent::Resolved {
                export: object,
                import: *import,
            }),
            Some(_) => {}
            None => {
                if export.token.peer_closed() {
                    export.invalidated = true;
                    self.events.push_back(LinkEvent::ExportInvalidated(object));
                }
            }
        }
        Ok(())
    }

    /// Binds `object` to a registered import endpoint.
    ///
    /// Queues [`LinkEvent::Resolved`] if the export side is already bound.
    pub fn initialize_import(&mut self, link: &ImportLink, object: I) -> Result<(), LinkError> {
        let Some(slot) = self.links.get_mut(&link.koid) else {
            return Err(LinkError::PeerClosed);
        };
        let Some(import) = slot.import.as_mut() else {
            return Err(LinkError::PeerClosed);
        };
        if import.object.is_some() {
            return Err(LinkError::AlreadyInitialized);
        }
        import.object = Some(object);

        match slot.export.as_ref() {
            Some(Endpoint {
                object: Some(export),
                invalidated: false,
                ..
            }) => self.events.push_back(LinkEvent::Resolved {
                export: *export,
                import: object,
            }),
            Some(_) => {}
            None => {
                if import.token.peer_closed() {
                    import.invalidated = true;
                    self.events.push_back(LinkEvent::ImportInvalidated(object));
                }
            }
        }
        Ok(())
    }

    /// Tears down the export side.
    ///
    /// Pending events addressed to this side are discarded and a bound import
    /// peer is queued an [`LinkEvent::ImportInvalidated`].
    pub fn release_export(&mut self, link: ExportLink) {
        let Some(slot) = self.links.get_mut(&link.koid) else {
            return;
        };
        let Some(export) = slot.export.take() else {
            return;
        };
        if let Some(object) = export.object {
            self.events.retain(|event| match event {
                LinkEvent::Resolved { export, .. } | LinkEvent::ExportInvalidated(export) => {
                    *export != object
                }
                LinkEvent::ImportInvalidated(_) => true,
            });
        }
        if let Some(import) = slot.import.as_mut()
            && let Some(object) = import.object
            && !import.invalidated
        {
            import.invalidated = true;
            self.events.push_back(LinkEvent::ImportInvalidated(object));
        }
        if slot.import.is_none() {
            self.links.remove(&link.koid);
        }
    }

    /// Tears down the import side.
    ///
    /// Pending events addressed to this side are discarded and a bound export
    /// peer is queued an [`LinkEvent::ExportInvalidated`].
    pub fn release_import(&mut self, link: ImportLink) {
        let Some(slot) = self.links.get_mut(&link.koid) else {
            return;
        };
        let Some(import) = slot.import.take() else {
            return;
        };
        if let Some(object) = import.object {
            self.events.retain(|event| match event {
                LinkEvent::Resolved { import, .. } | LinkEvent::ImportInvalidated(import) => {
                    *import != object
                }
                LinkEvent::ExportInvalidated(_) => true,
            });
        }
        if let Some(export) = slot.export.as_mut()
            && let Some(object) = export.object
            && !export.invalidated
        {
            export.invalidated = true;
            self.events.push_back(LinkEvent::ExportInvalidated(object));
        }
        if slot.export.is_none() {
            self.links.remove(&link.koid);
        }
    }

    /// Queues invalidations for bound endpoints whose peer token was dropped
    /// without ever registering.
    ///
    /// Returns the number of invalidations queued.
    pub fn poll_closed_peers(&mut self) -> usize {
        let mut queued = 0;
        for slot in self.links.values_mut() {
            match (slot.export.as_mut(), slot.import.as_mut()) {
                (Some(export), None) if !export.invalidated && export.token.peer_closed() => {
                    if let Some(object) = export.object {
                        export.invalidated = true;
                        self.events.push_back(LinkEvent::ExportInvalidated(object));
                        queued += 1;
                    }
                }
                (None, Some(import)) if !import.invalidated && import.token.peer_closed() => {
                    if let Some(object) = import.object {
                        import.invalidated = true;
                        self.events.push_back(LinkEvent::ImportInvalidated(object));
                        queued += 1;
                    }
                }
                _ => {}
            }
        }
        queued
    }

    /// Removes and returns the oldest queued event.
    pub fn pop_event(&mut self) -> Option<LinkEvent<E, I>> {
        self.events.pop_front()
    }

    /// Returns `true` if events are waiting to be dispatched.
    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::koid::token_pair;

    type Linker = ObjectLinker<u32, u32>;

    fn drain(linker: &mut Linker) -> Vec<LinkEvent<u32, u32>> {
        let mut out = Vec::new();
        while let Some(event) = linker.pop_event() {
            out.push(event);
        }
        out
    }

    #[test]
    fn resolves_once_both_sides_are_bound() {
        let mut linker = Linker::new();
        let (export_token, import_token) = token_pair();

        let export = linker.create_export(export_token).unwrap();
        linker.initialize_export(&export, 1).unwrap();
        assert!(drain(&mut linker).is_empty(), "one side alone never resolves");

        let import = linker.create_import(import_token).unwrap();
        assert!(!linker.has_pending_events(), "registration alone never resolves");
        linker.initialize_import(&import, 2).unwrap();
        assert_eq!(
            drain(&mut linker),
            [LinkEvent::Resolved {
                export: 1,
                import: 2
            }]
        );
    }

    #[test]
    fn resolution_order_does_not_matter() {
        let mut linker = Linker::new();
        let (export_token, import_token) = token_pair();
        let import = linker.create_import(import_token).unwrap();
        linker.initialize_import(&import, 7).unwrap();
        let export = linker.create_export(export_token).unwrap();
        linker.initialize_export(&export, 3).unwrap();
        assert_eq!(
            drain(&mut linker),
            [LinkEvent::Resolved {
                export: 3,
                import: 7
            }]
        );
    }

    #[test]
    fn double_initialize_is_rejected() {
        let mut linker = Linker::new();
        let (export_token, _import_token) = token_pair();
        let export = linker.create_export(export_token).unwrap();
        linker.initialize_export(&export, 1).unwrap();
        assert_eq!(
            linker.initialize_export(&export, 2),
            Err(LinkError::AlreadyInitialized)
        );
    }

    #[test]
    fn registering_against_a_closed_peer_fails() {
        let mut linker = Linker::new();
        let (export_token, import_token) = token_pair();
        drop(import_token);
        assert_eq!(
            linker.create_export(export_token),
            Err(LinkError::PeerClosed)
        );
        assert!(linker.is_empty());
    }

    #[test]
    fn releasing_one_side_invalidates_the_other() {
        let mut linker = Linker::new();
        let (export_token, import_token) = token_pair();
        let export = linker.create_export(export_token).unwrap();
        let import = linker.create_import(import_token).unwrap();
        linker.initialize_export(&export, 1).unwrap();
        linker.initialize_import(&import, 2).unwrap();
        let _ = drain(&mut linker);

        linker.release_import(import);
        assert_eq!(drain(&mut linker), [LinkEvent::ExportInvalidated(1)]);

        linker.release_export(export);
        assert!(drain(&mut linker).is_empty());
        assert!(linker.is_empty());
    }

    #[test]
    fn release_before_dispatch_cancels_resolution() {
        let mut linker = Linker::new();
        let (export_token, import_token) = token_pair();
        let export = linker.create_export(export_token).unwrap();
        let import = linker.create_import(import_token).unwrap();
        linker.initialize_export(&export, 1).unwrap();
        linker.initialize_import(&import, 2).unwrap();

        // The export side goes away before anyone drained the resolution.
        linker.release_export(export);
        assert_eq!(drain(&mut linker), [LinkEvent::ImportInvalidated(2)]);
    }

    #[test]
    fn dropped_unregistered_peer_is_found_by_polling() {
        let mut linker = Linker::new();
        let (export_token, import_token) = token_pair();
        let export = linker.create_export(export_token).unwrap();
        linker.initialize_export(&export, 9).unwrap();
        assert_eq!(linker.poll_closed_peers(), 0);

        drop(import_token);
        assert_eq!(linker.poll_closed_peers(), 1);
        assert_eq!(linker.poll_closed_peers(), 0, "invalidation fires once");
        assert_eq!(drain(&mut linker), [LinkEvent::ExportInvalidated(9)]);
    }

    #[test]
    fn peer_dropped_before_initialize_invalidates_on_bind() {
        let mut linker = Linker::new();
        let (export_token, import_token) = token_pair();
        let import = linker.create_import(import_token).unwrap();
        drop(export_token);
        linker.initialize_import(&import, 4).unwrap();
        assert_eq!(drain(&mut linker), [LinkEvent::ImportInvalidated(4)]);
    }
}
