//! An interpreter for TrafCOD traffic-signal control programs.
//!
//! A TrafCOD program is a list of rules that switch variables on and off in
//! response to detector inputs and timers. A [Controller] loads a program and
//! evaluates it once per tick, driving the [TrafficLight]s bound to its
//! exported variables.

pub use config::ControllerConfig;
pub use controller::{Controller, TickReport};
pub use error::{Error, EvalError, Location, Result, RuleHalf};
pub use event::Event;
pub use light::{LightColor, TrafficLight};
pub use rule::{Rule, RuleKind, Token};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use variable::{Edge, Variable, VariableKind};

mod config;
mod controller;
mod debug;
mod error;
pub mod eval;
mod event;
mod light;
pub mod name;
mod program;
mod rule;
mod variable;

new_key_type! {
    /// Unique ID of a [Variable].
    pub struct VariableId;
    /// Unique ID of a [TrafficLight].
    pub struct TrafficLightId;
}

type VariableSet = SlotMap<VariableId, Variable>;
type LightSet = SlotMap<TrafficLightId, TrafficLight>;
