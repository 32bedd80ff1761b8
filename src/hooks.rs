//! Hook phases and the registered-callback table
//!
//! Configuration generation runs three named phases, strictly once each
//! and in a fixed order:
//!
//! 1. `set-defaults` — adjust the defaults table before anything else.
//! 2. `before-init` — runs before the external bootstrap call.
//! 3. `after-init` — runs after the bootstrap, once the configuration
//!    documents are readable.
//!
//! Modules register callbacks against this fixed API instead of being
//! executed as foreign code. Within a phase, callbacks run in
//! registration order; modules themselves were ordered beforehand (see
//! [`crate::modules`]), so the combination is a deterministic total
//! order. Everything is single-threaded: a later callback may assume all
//! earlier mutations are visible.

use std::fmt;

use crate::error::Result;
use crate::session::Session;

/// The three hook phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SetDefaults,
    BeforeInit,
    AfterInit,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::SetDefaults => "set-defaults",
            Phase::BeforeInit => "before-init",
            Phase::AfterInit => "after-init",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered hook callback.
pub type Callback = Box<dyn FnMut(&mut Session) -> Result<()>>;

/// Callback table keyed by phase.
#[derive(Default)]
pub struct Hooks {
    set_defaults: Vec<Callback>,
    before_init: Vec<Callback>,
    after_init: Vec<Callback>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_set_defaults<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Session) -> Result<()> + 'static,
    {
        self.set_defaults.push(Box::new(callback));
    }

    pub fn register_before_init<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Session) -> Result<()> + 'static,
    {
        self.before_init.push(Box::new(callback));
    }

    pub fn register_after_init<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Session) -> Result<()> + 'static,
    {
        self.after_init.push(Box::new(callback));
    }

    fn phase_callbacks(&mut self, phase: Phase) -> &mut Vec<Callback> {
        match phase {
            Phase::SetDefaults => &mut self.set_defaults,
            Phase::BeforeInit => &mut self.before_init,
            Phase::AfterInit => &mut self.after_init,
        }
    }

    /// Number of callbacks registered for a phase.
    pub fn registered(&self, phase: Phase) -> usize {
        match phase {
            Phase::SetDefaults => self.set_defaults.len(),
            Phase::BeforeInit => self.before_init.len(),
            Phase::AfterInit => self.after_init.len(),
        }
    }

    /// Run one phase: invoke its callbacks sequentially, in registration
    /// order, stopping at the first error.
    pub fn run(&mut self, phase: Phase, session: &mut Session) -> Result<()> {
        log::debug!(
            "running {} phase ({} callbacks)",
            phase,
            self.registered(phase)
        );
        for callback in self.phase_callbacks(phase) {
            callback(session)?;
        }
        Ok(())
    }
}
