// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.

use crate::resource::Rgba8;

/// Tunables for an [`Engine`](crate::engine::Engine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on table entries per session.
    pub max_resources_per_session: usize,
    /// Whether new Views start with debug bounds enabled.
    pub view_debug_bounds: bool,
    /// Bounds color given to new `ViewHolder`s.
    pub default_bounds_color: Rgba8,
    /// Labels longer than this many characters are truncated.
    pub label_max_len: usize,
}

impl EngineConfig {
    /// Default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_resources_per_session: 65_536,
            view_debug_bounds: false,
            default_bounds_color: Rgba8::WHITE,
            label_max_len: 32,
        }
    }

    /// A tighter configuration for untrusted or test sessions.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            max_resources_per_session: 4_096,
            view_debug_bounds: false,
            default_bounds_color: Rgba8::WHITE,
            label_max_len: 16,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
