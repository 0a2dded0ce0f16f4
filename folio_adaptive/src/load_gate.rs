use std::time::{Duration, Instant};

use folio_shared::log::{debug, trace};

use crate::{Anchor, Observation, Viewport};

/// Delay of [`LoadPriority::Deferred`] components.
pub const DEFERRED_LOAD_DELAY: Duration = Duration::from_secs(1);

/// Delay after which a [`LoadPriority::Lazy`] component loads when its anchor doesn't exist.
pub const LAZY_FALLBACK_DELAY: Duration = Duration::from_secs(2);

/// Distance in pixels at which a lazy component starts loading before its anchor becomes visible.
pub const LAZY_LOAD_MARGIN: f32 = 200.0;

/// When a heavy component starts loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPriority {
    /// On the first evaluation.
    Immediate,
    /// [`DEFERRED_LOAD_DELAY`] after the first evaluation.
    Deferred,
    /// When the anchor comes near the visible region. `None` waits for the
    /// first element with the `lazy` load trigger.
    Lazy { anchor: Option<Anchor> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Opened,
}

enum Trigger {
    Deadline(Instant),
    Proximity(Observation),
}

enum Phase {
    /// Not evaluated yet.
    Idle,
    Waiting(Trigger),
    Opened,
}

/// Decides once per component when it may start loading.
///
/// The gate is evaluated with [`LoadGate::poll`]. Once opened it stays open. Timers
/// and viewport observations belong to the waiting gate and are released when it
/// opens or is dropped.
pub struct LoadGate {
    priority: LoadPriority,
    phase: Phase,
}

impl LoadGate {
    pub fn new(priority: LoadPriority) -> Self {
        Self {
            priority,
            phase: Phase::Idle,
        }
    }

    pub fn priority(&self) -> &LoadPriority {
        &self.priority
    }

    pub fn state(&self) -> GateState {
        match self.phase {
            Phase::Opened => GateState::Opened,
            Phase::Idle | Phase::Waiting(_) => GateState::Pending,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == GateState::Opened
    }

    /// Evaluates the gate at `now` and returns its state.
    pub fn poll(&mut self, now: Instant, viewport: &Viewport) -> GateState {
        if let Phase::Idle = self.phase {
            self.phase = self.arm(now, viewport);
        }

        let should_open = match &self.phase {
            Phase::Idle | Phase::Opened => false,
            Phase::Waiting(Trigger::Deadline(deadline)) => now >= *deadline,
            Phase::Waiting(Trigger::Proximity(observation)) => observation.has_entered(),
        };
        if should_open {
            debug!("Opening load gate ({:?})", self.priority);
            // Dropping the trigger releases the observation.
            self.phase = Phase::Opened;
        }

        self.state()
    }

    fn arm(&self, now: Instant, viewport: &Viewport) -> Phase {
        match &self.priority {
            LoadPriority::Immediate => Phase::Waiting(Trigger::Deadline(now)),
            LoadPriority::Deferred => Phase::Waiting(Trigger::Deadline(now + DEFERRED_LOAD_DELAY)),
            LoadPriority::Lazy { anchor } => {
                let anchor = anchor.clone().unwrap_or_default();
                match viewport.find(&anchor) {
                    Some(element) => Phase::Waiting(Trigger::Proximity(viewport.observe(&element, LAZY_LOAD_MARGIN))),
                    None => {
                        trace!("Anchor {anchor:?} not found. Falling back to a timer");
                        Phase::Waiting(Trigger::Deadline(now + LAZY_FALLBACK_DELAY))
                    }
                }
            }
        }
    }
}

/// A value that is initialized only after its [`LoadGate`] has opened.
pub struct Progressive<T> {
    gate: LoadGate,
    init: Option<Box<dyn FnOnce() -> T>>,
    value: Option<T>,
}

impl<T> Progressive<T> {
    pub fn new(priority: LoadPriority, init: impl FnOnce() -> T + 'static) -> Self {
        Self {
            gate: LoadGate::new(priority),
            init: Some(Box::new(init)),
            value: None,
        }
    }

    /// Polls the gate and runs the initializer the first time it's open.
    pub fn poll(&mut self, now: Instant, viewport: &Viewport) -> Option<&T> {
        if self.gate.poll(now, viewport) == GateState::Opened {
            if let Some(init) = self.init.take() {
                self.value = Some(init());
            }
        }
        self.value.as_ref()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn state(&self) -> GateState {
        self.gate.state()
    }
}
