// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use tapestry_core::engine::UpdateReport;
use tapestry_core::trace::{
    CommandEvent, CycleBeginEvent, FocusChainEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    TraceSink, ViewTreeMergeEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    commands: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            commands: true,
        }
    }

    /// Whether to print a line per applied command. On by default; busy
    /// sessions can drown out the cycle lines.
    #[must_use]
    pub fn with_commands(mut self, commands: bool) -> Self {
        self.commands = commands;
        self
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Links => "links",
        PhaseKind::Connections => "connections",
        PhaseKind::Merge => "merge",
        PhaseKind::Focus => "focus",
        PhaseKind::Metrics => "metrics",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_cycle_begin(&mut self, e: &CycleBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[cycle] #{} sessions={}",
            e.cycle, e.sessions
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] cycle={} {}",
            e.cycle,
            phase_name(e.phase),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] cycle={} {}",
            e.cycle,
            phase_name(e.phase),
        );
    }

    fn on_command(&mut self, e: &CommandEvent) {
        if !self.commands {
            return;
        }
        let status = if e.ok { "ok" } else { "FAILED" };
        let _ = writeln!(
            self.writer,
            "[command] session={} {} {status}",
            e.session.0, e.tag,
        );
    }

    fn on_view_tree_merge(&mut self, e: &ViewTreeMergeEvent) {
        let root = e.root.map_or_else(|| String::from("-"), |r| r.to_string());
        let _ = writeln!(
            self.writer,
            "[merge] cycle={} updates={} root={root}",
            e.cycle, e.updates,
        );
    }

    fn on_focus_chain(&mut self, e: &FocusChainEvent) {
        let leaf = e.leaf.map_or_else(|| String::from("-"), |l| l.to_string());
        let _ = writeln!(
            self.writer,
            "[focus] cycle={} depth={} leaf={leaf}",
            e.cycle, e.depth,
        );
    }

    fn on_cycle_end(&mut self, r: &UpdateReport) {
        let _ = writeln!(
            self.writer,
            "[summary] cycle={} links={} applied={} skipped={} root_changed={} \
             focus_changed={} metrics={}",
            r.cycle,
            r.link_events,
            r.updates_applied,
            r.updates_skipped,
            r.root_changed,
            r.focus_changed,
            r.metrics_reported,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapestry_core::command::{Command, ResourceArgs};
    use tapestry_core::engine::Engine;
    use tapestry_core::resource::SessionId;
    use tapestry_core::trace::Tracer;

    #[test]
    fn pretty_print_command() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_command(&CommandEvent {
            session: SessionId(3),
            tag: "AddChild",
            ok: false,
        });
        let output = String::from_utf8(sink.into_writer()).unwrap();
        assert!(output.contains("[command]"), "got: {output}");
        assert!(output.contains("session=3 AddChild FAILED"), "got: {output}");
    }

    #[test]
    fn commands_can_be_muted() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new()).with_commands(false);
        sink.on_command(&CommandEvent {
            session: SessionId(1),
            tag: "SetTag",
            ok: true,
        });
        assert!(sink.into_writer().is_empty());
    }

    #[test]
    fn engine_cycle_prints_every_phase() {
        let mut engine = Engine::default();
        let s = engine.create_session();
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        {
            let mut tracer = Tracer::new(&mut sink);
            engine.apply_commands(
                s,
                vec![Command::CreateResource {
                    id: 1,
                    resource: ResourceArgs::EntityNode,
                }],
                &mut tracer,
            );
            engine.update(&mut tracer);
        }
        let output = String::from_utf8(sink.into_writer()).unwrap();
        assert!(output.contains("[command] session=1 CreateResource ok"), "got: {output}");
        assert!(output.contains("[cycle] #1 sessions=1"), "got: {output}");
        for phase in ["links", "connections", "merge", "focus", "metrics"] {
            assert!(
                output.contains(&format!("[phase:end] cycle=1 {phase}")),
                "missing {phase}: {output}"
            );
        }
        assert!(output.contains("[summary] cycle=1"), "got: {output}");
    }
}
