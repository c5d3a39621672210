// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The single writer of the scene graph.
//!
//! [`Engine`] owns the [`ResourceStore`], every [`Session`], and the
//! [`SceneGraph`]. Commands are applied synchronously, one session at a time.
//! After each command the engine drains the store's side effects:
//!
//! - Link resolutions and invalidations are dispatched.
//! - Session events are delivered.
//! - View-tree changes are recorded in the owning session's updater and
//!   immediately staged, so the scene graph replays them in the order they
//!   happened across all sessions.
//!
//! [`update`](Engine::update) runs one cycle:
//!
//! ```text
//!   links ─▶ connections ─▶ global root ─▶ merge ─▶ focus repair ─▶ metrics
//! ```

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use tracing::{debug, warn};

use crate::applier::GfxCommandApplier;
use crate::command::Command;
use crate::config::EngineConfig;
use crate::error::{CommandError, FocusChangeDenied};
use crate::geometry::{Ray3, Vec3};
use crate::hit::{Hit, hit_test};
use crate::koid::{ExportToken, Koid};
use crate::node::NodeKind;
use crate::resource::{
    Handle, ResourceId, ResourceKind, ResourceStore, SessionId, TypeFlags, ViewTreeOp,
};
use crate::session::{METRICS_EVENT_MASK, Session, SessionEvent};
use crate::trace::{
    CommandEvent, CycleBeginEvent, FocusChainEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    Tracer, ViewTreeMergeEvent,
};
use crate::view_tree::{
    FocusChainChange, FocusChainListener, SceneGraph, ViewTree, ViewTreeUpdate,
};

/// What one [`Engine::update`] cycle did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// The cycle number, starting at 1.
    pub cycle: u64,
    /// Link resolutions and invalidations dispatched.
    pub link_events: usize,
    /// View-tree updates applied by the merge.
    pub updates_applied: usize,
    /// View-tree updates skipped as inconsistent.
    pub updates_skipped: usize,
    /// Whether the global root changed.
    pub root_changed: bool,
    /// Whether the focus chain changed.
    pub focus_changed: bool,
    /// Metrics events delivered.
    pub metrics_reported: usize,
}

/// Outcome of [`Engine::request_focus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusResult {
    /// Focus moved, or was already there.
    Honored,
    /// The request was outside the requestor's authority.
    Denied(FocusChangeDenied),
}

/// The compositor's scene-graph kernel.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: ResourceStore,
    sessions: BTreeMap<SessionId, Session>,
    scene_graph: SceneGraph,
    next_session: u32,
    cycle: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Creates an engine with no sessions.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: ResourceStore::new(),
            sessions: BTreeMap::new(),
            scene_graph: SceneGraph::new(),
            next_session: 1,
            cycle: 0,
        }
    }

    // -- Accessors --

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared resource store.
    #[must_use]
    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// A live session.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// The canonical view tree.
    #[must_use]
    pub fn view_tree(&self) -> &ViewTree {
        self.scene_graph.view_tree()
    }

    /// The current focus chain, root first.
    #[must_use]
    pub fn focus_chain(&self) -> &[Koid] {
        self.scene_graph.focus_chain()
    }

    /// Number of completed update cycles.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Looks up a session's resource by id.
    #[must_use]
    pub fn resolve(&self, session: SessionId, id: ResourceId) -> Option<Handle> {
        self.sessions
            .get(&session)?
            .resources()
            .get(id)
            .map(|(handle, _)| handle)
    }

    /// The view-tree identity of a session's Scene or View.
    #[must_use]
    pub fn view_ref_of(&self, session: SessionId, id: ResourceId) -> Option<Koid> {
        let handle = self.resolve(session, id)?;
        if let Some(view) = self.store.view(handle) {
            return Some(view.view_ref().koid());
        }
        match self.store.node(handle)?.kind() {
            NodeKind::Scene(scene) => Some(scene.view_ref.koid()),
            _ => None,
        }
    }

    // -- Sessions --

    /// Opens a new session.
    pub fn create_session(&mut self) -> SessionId {
        let id = SessionId(self.next_session);
        self.next_session += 1;
        self.sessions
            .insert(id, Session::new(id, self.config.max_resources_per_session));
        debug!(session = %id, "session created");
        id
    }

    /// Closes a session, releasing every resource in its table.
    ///
    /// Returns `false` if the session does not exist.
    pub fn remove_session(&mut self, id: SessionId) -> bool {
        let handles: Vec<Handle> = match self.sessions.get_mut(&id) {
            Some(session) => session.resources.clear().collect(),
            None => return false,
        };
        for handle in handles {
            self.store.release(handle);
        }
        self.route_outbox();
        if let Some(mut session) = self.sessions.remove(&id) {
            self.scene_graph
                .stage_updates(session.view_tree.stage_updates());
        }
        debug!(session = %id, "session removed");
        true
    }

    // -- Commands --

    /// Applies one command on behalf of `session`.
    ///
    /// Returns `false` if the command failed (see [`take_errors`](Self::take_errors))
    /// or the session does not exist.
    pub fn apply_command(&mut self, session: SessionId, command: Command) -> bool {
        let Some(s) = self.sessions.get_mut(&session) else {
            warn!(session = %session, "command for an unknown session");
            return false;
        };
        let ok = GfxCommandApplier::new(&mut self.store, s, &self.config).apply(command);
        self.route_outbox();
        ok
    }

    /// Applies `commands` in order, reporting each outcome to `tracer`.
    pub fn apply_commands(
        &mut self,
        session: SessionId,
        commands: Vec<Command>,
        tracer: &mut Tracer<'_>,
    ) -> Vec<bool> {
        commands
            .into_iter()
            .map(|command| {
                let tag = command.tag();
                let ok = self.apply_command(session, command);
                tracer.command(&CommandEvent { session, tag, ok });
                ok
            })
            .collect()
    }

    /// Drains the events delivered to `session`.
    pub fn take_events(&mut self, session: SessionId) -> Vec<SessionEvent> {
        self.sessions
            .get_mut(&session)
            .map(Session::take_events)
            .unwrap_or_default()
    }

    /// Drains the diagnostics of `session`'s failed commands.
    pub fn take_errors(&mut self, session: SessionId) -> Vec<String> {
        self.sessions
            .get_mut(&session)
            .map(Session::take_errors)
            .unwrap_or_default()
    }

    // -- Views --

    /// Reports that a View has rendered, firing its holder's render watch.
    pub fn signal_view_rendered(&mut self, view: Handle) -> bool {
        if !self.store.is_alive(view) {
            return false;
        }
        let fired = self.store.signal_view_rendered(view);
        self.route_outbox();
        fired
    }

    /// Creates an annotation `ViewHolder` owned by a session's View.
    pub fn create_annotation_view_holder(
        &mut self,
        session: SessionId,
        view_id: ResourceId,
        token: ExportToken,
    ) -> Result<Handle, CommandError> {
        let view = self
            .sessions
            .get(&session)
            .ok_or(CommandError::InvalidArgument("unknown session"))?
            .resources()
            .find(view_id, TypeFlags::VIEW)?;
        let holder = self.store.create_annotation_view_holder(view, token);
        self.route_outbox();
        holder
    }

    /// Hit-tests the subtree under `root` with a world-space ray.
    #[must_use]
    pub fn hit_test(&self, root: Handle, ray: &Ray3) -> Vec<Hit> {
        hit_test(&self.store, root, ray)
    }

    // -- Focus --

    /// Registers a listener for focus chain changes.
    pub fn register_focus_chain_listener(&mut self, listener: Box<dyn FocusChainListener>) {
        self.scene_graph.register_focus_chain_listener(listener);
    }

    /// Asks to move focus from `requestor`, which `session` must own, to
    /// `request`.
    pub fn request_focus(
        &mut self,
        session: SessionId,
        requestor: Koid,
        request: Koid,
    ) -> FocusResult {
        if self.scene_graph.focus_chain().is_empty() {
            return FocusResult::Denied(FocusChangeDenied::EmptyFocusChain);
        }
        if self.scene_graph.view_tree().session_of(requestor) != Some(session) {
            return FocusResult::Denied(FocusChangeDenied::RequestorNotAuthorized);
        }
        match self.scene_graph.request_focus_change(requestor, request) {
            Ok(change) => {
                if let Some(change) = change {
                    self.deliver_focus_change(&change);
                }
                FocusResult::Honored
            }
            Err(denied) => {
                debug!(session = %session, %denied, "focus request denied");
                FocusResult::Denied(denied)
            }
        }
    }

    // -- Update cycle --

    /// Runs one update cycle.
    pub fn update(&mut self, tracer: &mut Tracer<'_>) -> UpdateReport {
        self.cycle += 1;
        let cycle = self.cycle;
        let mut report = UpdateReport {
            cycle,
            ..UpdateReport::default()
        };
        tracer.cycle_begin(&CycleBeginEvent {
            cycle,
            sessions: self.sessions.len(),
        });

        // Links whose peer token died unregistered.
        tracer.phase_begin(&PhaseBeginEvent {
            cycle,
            phase: PhaseKind::Links,
        });
        self.store.linker.poll_closed_peers();
        report.link_events = self.route_outbox();
        tracer.phase_end(&PhaseEndEvent {
            cycle,
            phase: PhaseKind::Links,
        });

        // ViewHolder connections within each session.
        tracer.phase_begin(&PhaseBeginEvent {
            cycle,
            phase: PhaseKind::Connections,
        });
        for session in self.sessions.values_mut() {
            session.view_tree.update_view_holder_connections(&self.store);
            self.scene_graph
                .stage_updates(session.view_tree.stage_updates());
        }
        if let Some(root) = self.display_root()
            && self.scene_graph.view_tree().root() != Some(root)
        {
            self.scene_graph
                .stage_updates([ViewTreeUpdate::MakeGlobalRoot { koid: root }]);
        }
        tracer.phase_end(&PhaseEndEvent {
            cycle,
            phase: PhaseKind::Connections,
        });

        // Merge.
        tracer.phase_begin(&PhaseBeginEvent {
            cycle,
            phase: PhaseKind::Merge,
        });
        let staged = self.scene_graph.staged_len();
        let outcome = self.scene_graph.process_updates();
        report.updates_applied = outcome.applied;
        report.updates_skipped = outcome.skipped;
        report.root_changed = outcome.root_changed;
        tracer.view_tree_merge(&ViewTreeMergeEvent {
            cycle,
            updates: staged,
            root: self.scene_graph.view_tree().root(),
        });
        tracer.phase_end(&PhaseEndEvent {
            cycle,
            phase: PhaseKind::Merge,
        });

        // Focus repair.
        tracer.phase_begin(&PhaseBeginEvent {
            cycle,
            phase: PhaseKind::Focus,
        });
        if let Some(change) = self.scene_graph.repair_focus_chain(outcome.root_changed) {
            report.focus_changed = true;
            self.deliver_focus_change(&change);
            tracer.focus_chain(&FocusChainEvent {
                cycle,
                depth: change.new_chain.len(),
                leaf: change.new_leaf(),
            });
        }
        tracer.phase_end(&PhaseEndEvent {
            cycle,
            phase: PhaseKind::Focus,
        });

        // Metrics.
        tracer.phase_begin(&PhaseBeginEvent {
            cycle,
            phase: PhaseKind::Metrics,
        });
        report.metrics_reported = self.report_metrics();
        tracer.phase_end(&PhaseEndEvent {
            cycle,
            phase: PhaseKind::Metrics,
        });

        tracer.cycle_end(&report);
        report
    }

    // -- Internals --

    /// Dispatches pending link events and delivers the store's side effects
    /// until nothing is left. Returns the number of link events handled.
    fn route_outbox(&mut self) -> usize {
        let mut link_events = 0;
        loop {
            link_events += self.store.dispatch_link_events();
            let outbox = self.store.take_outbox();
            if outbox.is_empty() {
                return link_events;
            }
            for (session, event) in outbox.events {
                match self.sessions.get_mut(&session) {
                    Some(s) => s.push_event(event),
                    None => debug!(session = %session, ?event, "dropping event for a closed session"),
                }
            }
            for (session, op) in outbox.view_tree {
                let Some(s) = self.sessions.get_mut(&session) else {
                    debug!(session = %session, ?op, "dropping view tree change for a closed session");
                    continue;
                };
                match op {
                    ViewTreeOp::Track { koid, holder } => s.view_tree.track_view_holder(koid, holder),
                    ViewTreeOp::Untrack { koid } => s.view_tree.untrack_view_holder(koid),
                    ViewTreeOp::Update(update) => s.view_tree.add_update(update),
                }
                self.scene_graph.stage_updates(s.view_tree.stage_updates());
            }
        }
    }

    fn deliver_focus_change(&mut self, change: &FocusChainChange) {
        if let (Some(leaf), Some(session)) = (change.old_leaf(), change.old_leaf_session)
            && let Some(s) = self.sessions.get_mut(&session)
        {
            s.push_event(SessionEvent::Focus {
                view_ref: leaf,
                focused: false,
            });
        }
        if let (Some(leaf), Some(session)) = (change.new_leaf(), change.new_leaf_session)
            && let Some(s) = self.sessions.get_mut(&session)
        {
            s.push_event(SessionEvent::Focus {
                view_ref: leaf,
                focused: true,
            });
        }
    }

    /// The Scene drawn by the first display compositor:
    /// compositor → layer stack → layer → renderer → camera → scene.
    fn display_root(&self) -> Option<Koid> {
        let store = &self.store;
        store
            .iter()
            .filter(|&h| store.kind(h) == ResourceKind::DisplayCompositor)
            .find_map(|compositor| {
                let stack = store.compositor(compositor)?.layer_stack?;
                store.layer_stack(stack)?.layers.iter().find_map(|&layer| {
                    let renderer = store.layer(layer)?.renderer?;
                    let camera = store.renderer(renderer)?.camera?;
                    let scene = store.camera(camera)?.scene;
                    match store.node(scene)?.kind() {
                        NodeKind::Scene(data) => Some(data.view_ref.koid()),
                        _ => None,
                    }
                })
            })
    }

    /// Reports the world scale of every metered node in a scene whose scale
    /// changed since its last report.
    fn report_metrics(&mut self) -> usize {
        let changed: Vec<(Handle, Vec3)> = self
            .store
            .iter()
            .filter(|&h| {
                self.store.event_mask(h) & METRICS_EVENT_MASK != 0
                    && self.store.scene_of(h).is_some()
            })
            .filter_map(|h| {
                let node = self.store.node(h)?;
                let scale = self.store.world_transform(h).axis_scale();
                (node.reported_scale != Some(scale)).then_some((h, scale))
            })
            .collect();
        for &(node, scale) in &changed {
            if let Some(n) = self.store.node_mut(node) {
                n.reported_scale = Some(scale);
            }
            self.store
                .emit(node, |node_id| SessionEvent::Metrics { node_id, scale });
        }
        let reported = changed.len();
        self.route_outbox();
        reported
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::command::{ResourceArgs, Value};
    use crate::koid::ViewRef;

    fn create(engine: &mut Engine, session: SessionId, id: ResourceId, resource: ResourceArgs) {
        assert!(
            engine.apply_command(session, Command::CreateResource { id, resource }),
            "{:?}",
            engine.take_errors(session)
        );
    }

    /// Scene 1 drawn by display compositor 2 through stack 3, layer 4,
    /// renderer 5, camera 6.
    fn displayed_scene(engine: &mut Engine, session: SessionId) -> Koid {
        let view_ref = ViewRef::new();
        let koid = view_ref.koid();
        create(engine, session, 1, ResourceArgs::Scene { view_ref });
        create(engine, session, 2, ResourceArgs::DisplayCompositor);
        create(engine, session, 3, ResourceArgs::LayerStack);
        create(engine, session, 4, ResourceArgs::Layer);
        create(engine, session, 5, ResourceArgs::Renderer);
        create(engine, session, 6, ResourceArgs::Camera { scene_id: 1 });
        let ok = engine.apply_commands(
            session,
            vec![
                Command::SetLayerStack {
                    compositor_id: 2,
                    layer_stack_id: 3,
                },
                Command::AddLayer {
                    layer_stack_id: 3,
                    layer_id: 4,
                },
                Command::SetRenderer {
                    layer_id: 4,
                    renderer_id: 5,
                },
                Command::SetCamera {
                    renderer_id: 5,
                    camera_id: 6,
                },
            ],
            &mut Tracer::none(),
        );
        assert_eq!(ok, [true; 4]);
        koid
    }

    #[test]
    fn display_scene_becomes_root_and_focus() {
        let mut engine = Engine::default();
        let s = engine.create_session();
        let scene = displayed_scene(&mut engine, s);

        let report = engine.update(&mut Tracer::none());
        assert_eq!(report.cycle, 1);
        assert!(report.root_changed);
        assert!(report.focus_changed);
        assert_eq!(engine.view_tree().root(), Some(scene));
        assert_eq!(engine.focus_chain(), [scene]);
        assert_eq!(
            engine.take_events(s),
            [SessionEvent::Focus {
                view_ref: scene,
                focused: true
            }]
        );

        let report = engine.update(&mut Tracer::none());
        assert!(!report.root_changed);
        assert!(!report.focus_changed);
    }

    #[test]
    fn metrics_report_on_change_only() {
        let mut engine = Engine::default();
        let s = engine.create_session();
        displayed_scene(&mut engine, s);
        create(&mut engine, s, 10, ResourceArgs::EntityNode);
        let ok = engine.apply_commands(
            s,
            vec![
                Command::AddChild {
                    node_id: 1,
                    child_id: 10,
                },
                Command::SetEventMask {
                    id: 10,
                    event_mask: METRICS_EVENT_MASK,
                },
            ],
            &mut Tracer::none(),
        );
        assert_eq!(ok, [true, true]);

        let report = engine.update(&mut Tracer::none());
        assert_eq!(report.metrics_reported, 1);
        let events = engine.take_events(s);
        assert!(events.contains(&SessionEvent::Metrics {
            node_id: 10,
            scale: Vec3::ONE
        }));

        assert_eq!(engine.update(&mut Tracer::none()).metrics_reported, 0);

        assert!(engine.apply_command(
            s,
            Command::SetScale {
                id: 1,
                value: Value::Literal(Vec3::new(2.0, 2.0, 1.0)),
            }
        ));
        assert_eq!(engine.update(&mut Tracer::none()).metrics_reported, 1);
        assert_eq!(
            engine.take_events(s),
            [SessionEvent::Metrics {
                node_id: 10,
                scale: Vec3::new(2.0, 2.0, 1.0)
            }]
        );
    }

    #[test]
    fn removing_a_session_releases_its_resources() {
        let mut engine = Engine::default();
        let s = engine.create_session();
        let scene = displayed_scene(&mut engine, s);
        engine.update(&mut Tracer::none());
        assert!(!engine.store().is_empty());

        assert!(engine.remove_session(s));
        assert!(engine.store().is_empty());
        assert!(!engine.remove_session(s));

        engine.update(&mut Tracer::none());
        assert!(!engine.view_tree().contains(scene));
        assert!(engine.focus_chain().is_empty());
    }

    #[test]
    fn unknown_session_rejects_commands() {
        let mut engine = Engine::default();
        assert!(!engine.apply_command(SessionId(42), Command::ReleaseResource { id: 1 }));
    }
}
