//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │  StateTable                                           │
//! │  ┌─────────────────┬──────────┬──────────────────────┐│
//! │  │ StateId         │ on_enter │ on_update            ││
//! │  ├─────────────────┼──────────┼──────────────────────┤│
//! │  │ ProbeModem      │ fn(ctx)  │ fn(ctx) -> Transition││
//! │  │ CheckSim        │    —     │ fn(ctx) -> Transition││
//! │  │ ...             │          │                      ││
//! │  │ ErrorState      │ fn(ctx)  │ fn(ctx) -> Transition││
//! │  └─────────────────┴──────────┴──────────────────────┘│
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state, which
//! runs one whole lifecycle stage (blocking on the modem as long as it
//! needs).  `Next` runs `on_exit` / `on_enter` and moves the pointer;
//! `Sleep` parks the engine for good, since the host powers down next.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Lifecycle stages.  Must stay in sync with [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    ProbeModem = 1,
    CheckSim = 2,
    RegisterNetwork = 3,
    ProvisionTls = 4,
    OpenGprs = 5,
    OpenMqtt = 6,
    PublishData = 7,
    ErrorState = 8,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 8;

    /// Position in the state table.
    pub fn index(self) -> usize {
        self as usize - 1
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Why the lifecycle asked for deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepReason {
    /// The reading was acknowledged by the broker.
    Published,
    /// Restarts ran out and the error dwell elapsed.
    ErrorDwellExpired,
}

/// What an `on_update` handler asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Next(StateId),
    Sleep(SleepReason),
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn<P, C> = fn(&mut FsmContext<P, C>);

/// Signature for the per-tick update handler.
pub type StateUpdateFn<P, C> = fn(&mut FsmContext<P, C>) -> Transition;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor<P, C> {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn<P, C>>,
    pub on_exit: Option<StateActionFn<P, C>>,
    pub on_update: StateUpdateFn<P, C>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm<P, C> {
    /// Fixed-size table indexed by [`StateId::index`].
    table: [StateDescriptor<P, C>; StateId::COUNT],
    current: usize,
    tick_count: u64,
    state_entry_tick: u64,
    /// Set once a handler requested sleep; the engine is done after that.
    asleep: Option<SleepReason>,
}

impl<P, C> Fsm<P, C> {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor<P, C>; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial.index(),
            tick_count: 0,
            state_entry_tick: 0,
            asleep: None,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext<P, C>) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Run one stage.  Returns the sleep reason once a handler has asked
    /// for sleep; every later call returns it again without running anything.
    pub fn tick(&mut self, ctx: &mut FsmContext<P, C>) -> Option<SleepReason> {
        if self.asleep.is_some() {
            return self.asleep;
        }

        self.tick_count += 1;

        match (self.table[self.current].on_update)(ctx) {
            Transition::Stay => {}
            Transition::Next(next) => self.transition(next, ctx),
            Transition::Sleep(reason) => {
                info!(
                    "FSM: {} requested sleep ({reason:?})",
                    self.table[self.current].name
                );
                self.asleep = Some(reason);
            }
        }
        self.asleep
    }

    /// Force an immediate transition.
    #[cfg(test)]
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext<P, C>) {
        if next.index() != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        self.table[self.current].id
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    pub fn sleep_reason(&self) -> Option<SleepReason> {
        self.asleep
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: StateId, ctx: &mut FsmContext<P, C>) {
        let next_idx = next.index();

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
