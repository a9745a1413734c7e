//! Shared request state.

use engram_engine::Engine;

/// State handed to every handler: the engine context built once at
/// startup. No globals.
#[derive(Clone)]
pub struct ApiState {
    /// The wired memory engine.
    pub engine: Engine,
}

impl ApiState {
    /// Wrap an engine for the router.
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }
}
