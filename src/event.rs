use crate::light::LightColor;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A notification emitted by a controller, collected with
/// [Controller::take_events](crate::Controller::take_events).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Event {
    /// An exported variable switched one of its traffic lights.
    LightChanged {
        controller: String,
        /// The exported variable, e.g. `RA08`.
        source: String,
        /// The traffic light.
        light: String,
        color: LightColor,
    },
    /// A conflict group variable was activated.
    ConflictGroupChanged {
        controller: String,
        /// The streams of the previous group, e.g. `01 05 09`.
        from: String,
        /// The streams of the new group.
        to: String,
    },
    /// A traced variable changed value.
    VariableTraced {
        controller: String,
        variable: String,
        stream: Option<u8>,
        old: i32,
        new: i32,
        cause: String,
    },
    /// Something in the program looks wrong, but evaluation continues.
    Warning { controller: String, message: String },
}
