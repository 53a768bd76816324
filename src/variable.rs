use crate::error::Location;
use crate::light::LightColor;
use crate::name::canonical_id;
use crate::TrafficLightId;
use smallvec::SmallVec;

/// Letters that distinguish the conflict group variables `MRA`, `MRB`, etc.
const CONFLICT_GROUP_LETTERS: &str = "ABCDXYZUVW";

/// A TrafCOD variable, timer or detector.
#[derive(Clone, Debug)]
pub struct Variable {
    /// The name without the stream number.
    name: String,
    /// The traffic stream, if any.
    stream: Option<u8>,
    /// Whether this is a plain variable, a timer or a detector.
    kind: VariableKind,
    /// The current value; the remaining time in tenths of a second for timers.
    value: i32,
    /// The most recent activation edge.
    edge: Edge,
    /// Whether the value changed during the current iteration.
    changed: bool,
    /// The traffic light colour and sinks, if this variable is exported.
    output: Option<Output>,
    /// The rank of the conflict group this variable selects, if any.
    conflict_group: Option<usize>,
    /// Where the start rule was defined.
    start_source: Option<Location>,
    /// Where the end rule was defined.
    end_source: Option<Location>,
    /// The number of rule operands that refer to this variable.
    ref_count: usize,
    /// Whether the variable is activated when the program is loaded.
    inited: bool,
    /// Whether changes to this variable are logged.
    traced: bool,
    /// The tick at which the value last changed.
    last_update: u64,
}

/// The kind of a variable, decided once from its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableKind {
    Plain,
    /// A countdown timer.
    Timer {
        /// The countdown length in tenths of a second.
        max: i32,
        /// Whether the timer ran out during the current tick.
        expired: bool,
    },
    /// A vehicle detector; `sub` distinguishes detectors of one stream.
    Detector { sub: u8 },
}

/// The activation edge of a variable, as observed by `S` and `E` operands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Edge {
    #[default]
    None,
    /// The variable went from zero to nonzero.
    Start,
    /// The variable went from nonzero to zero.
    End,
}

/// The effect of a value update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// From zero to nonzero.
    Started,
    /// From nonzero to zero.
    Ended,
    /// From one nonzero value to another.
    Updated,
}

/// An exported variable, driving traffic lights.
#[derive(Clone, Debug)]
pub struct Output {
    pub color: LightColor,
    pub sinks: SmallVec<[TrafficLightId; 4]>,
}

impl VariableKind {
    /// Classifies a variable by the TrafCOD naming convention: names starting
    /// with `T` are timers, and `D` followed by a single digit is a detector.
    pub fn classify(name: &str) -> Self {
        let bytes = name.as_bytes();
        match bytes {
            [b'D', sub] if sub.is_ascii_digit() => VariableKind::Detector { sub: *sub - b'0' },
            [b'T', ..] => VariableKind::Timer {
                max: 0,
                expired: false,
            },
            _ => VariableKind::Plain,
        }
    }
}

impl Variable {
    /// Creates a new variable with value zero.
    pub(crate) fn new(name: &str, stream: Option<u8>) -> Self {
        let conflict_group = match (stream, name.strip_prefix("MR")) {
            (None, Some(letter)) if letter.len() == 1 => CONFLICT_GROUP_LETTERS.find(letter),
            _ => None,
        };
        Self {
            name: name.to_string(),
            stream,
            kind: VariableKind::classify(name),
            value: 0,
            edge: Edge::None,
            changed: false,
            output: None,
            conflict_group,
            start_source: None,
            end_source: None,
            ref_count: 0,
            inited: false,
            traced: false,
            last_update: 0,
        }
    }

    /// Gets the name, without the stream number.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the traffic stream of the variable.
    pub fn stream(&self) -> Option<u8> {
        self.stream
    }

    /// Gets the identifier of the variable as written in a program, e.g. `TGL08`.
    pub fn id(&self) -> String {
        canonical_id(&self.name, self.stream)
    }

    /// Gets the kind of the variable.
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Gets the current value.
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Gets the value as seen by an expression operand.
    /// Timers read as booleans.
    pub fn operand_value(&self) -> i32 {
        match self.kind {
            VariableKind::Timer { .. } => (self.value != 0) as i32,
            _ => self.value,
        }
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    /// Whether the variable has just been activated.
    pub fn has_started(&self) -> bool {
        self.edge == Edge::Start
    }

    /// Whether the variable has just been deactivated.
    pub fn has_ended(&self) -> bool {
        self.edge == Edge::End
    }

    /// Whether the value changed during the most recent iteration.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn is_timer(&self) -> bool {
        matches!(self.kind, VariableKind::Timer { .. })
    }

    pub fn is_detector(&self) -> bool {
        matches!(self.kind, VariableKind::Detector { .. })
    }

    /// Whether a timer ran out during the current tick.
    pub fn timer_expired(&self) -> bool {
        matches!(self.kind, VariableKind::Timer { expired: true, .. })
    }

    /// Gets the countdown length of a timer in tenths of a second.
    pub fn timer_max(&self) -> Option<i32> {
        match self.kind {
            VariableKind::Timer { max, .. } => Some(max),
            _ => None,
        }
    }

    pub fn is_output(&self) -> bool {
        self.output.is_some()
    }

    /// Gets the colour shown by the sinks of an exported variable.
    pub fn color(&self) -> Option<LightColor> {
        self.output.as_ref().map(|output| output.color)
    }

    /// Gets the traffic lights driven by an exported variable.
    pub fn sinks(&self) -> &[TrafficLightId] {
        self.output
            .as_ref()
            .map_or(&[][..], |output| output.sinks.as_slice())
    }

    pub fn conflict_group(&self) -> Option<usize> {
        self.conflict_group
    }

    pub fn start_source(&self) -> Option<Location> {
        self.start_source
    }

    pub fn end_source(&self) -> Option<Location> {
        self.end_source
    }

    pub fn has_start_rule(&self) -> bool {
        self.start_source.is_some()
    }

    pub fn has_end_rule(&self) -> bool {
        self.end_source.is_some()
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    pub fn is_inited(&self) -> bool {
        self.inited
    }

    pub fn is_traced(&self) -> bool {
        self.traced
    }

    /// Gets the tick at which the value last changed.
    pub fn last_update(&self) -> u64 {
        self.last_update
    }

    /// Records the location of the start rule, returning the earlier
    /// location if there already is one.
    pub(crate) fn set_start_source(&mut self, location: Location) -> Result<(), Location> {
        match self.start_source {
            Some(first) => Err(first),
            None => {
                self.start_source = Some(location);
                Ok(())
            }
        }
    }

    /// Records the location of the end rule, returning the earlier
    /// location if there already is one.
    pub(crate) fn set_end_source(&mut self, location: Location) -> Result<(), Location> {
        match self.end_source {
            Some(first) => Err(first),
            None => {
                self.end_source = Some(location);
                Ok(())
            }
        }
    }

    pub(crate) fn add_reference(&mut self) {
        self.ref_count += 1;
    }

    pub(crate) fn set_inited(&mut self) {
        self.inited = true;
    }

    pub(crate) fn set_traced(&mut self, traced: bool) {
        self.traced = traced;
    }

    /// Sets the countdown length of a timer. Returns false for non-timers.
    pub(crate) fn set_timer_max(&mut self, value: i32) -> bool {
        match &mut self.kind {
            VariableKind::Timer { max, .. } => {
                *max = value;
                true
            }
            _ => false,
        }
    }

    /// Marks the variable as an output. Returns false if it already is one.
    pub(crate) fn set_output(&mut self, color: LightColor) -> bool {
        if self.output.is_some() {
            return false;
        }
        self.output = Some(Output {
            color,
            sinks: SmallVec::new(),
        });
        true
    }

    /// Attaches a traffic light to an output. Returns false for non-outputs.
    pub(crate) fn add_sink(&mut self, light: TrafficLightId) -> bool {
        match &mut self.output {
            Some(output) => {
                if !output.sinks.contains(&light) {
                    output.sinks.push(light);
                }
                true
            }
            None => false,
        }
    }

    /// The value the variable takes when the program is loaded.
    pub(crate) fn initial_value(&self) -> i32 {
        match (self.inited, self.kind) {
            (false, _) => 0,
            (true, VariableKind::Timer { max, .. }) => max,
            (true, _) => 1,
        }
    }

    /// Updates the value, maintaining the edge and changed state.
    pub(crate) fn set_value(&mut self, value: i32, tick: u64) -> Transition {
        let old = self.value;
        if old == value {
            return Transition::Unchanged;
        }
        self.value = value;
        self.changed = true;
        self.last_update = tick;
        match (old, value) {
            (0, _) => {
                self.edge = Edge::Start;
                Transition::Started
            }
            (_, 0) => {
                self.edge = Edge::End;
                Transition::Ended
            }
            _ => Transition::Updated,
        }
    }

    /// Counts a running timer down. Returns true when the timer runs out.
    pub(crate) fn decrement_timer(&mut self, step: i32, tick: u64) -> bool {
        let VariableKind::Timer { expired, .. } = &mut self.kind else {
            return false;
        };
        if self.value <= 0 {
            return false;
        }
        self.value = (self.value - step).max(0);
        if self.value == 0 {
            *expired = true;
            self.edge = Edge::End;
            self.changed = true;
            self.last_update = tick;
            return true;
        }
        false
    }

    /// Clears the edge if it is the given one.
    pub(crate) fn clear_edge(&mut self, edge: Edge) {
        if self.edge == edge {
            self.edge = Edge::None;
        }
    }

    /// Forgets all edges; done at the start of every tick.
    pub(crate) fn clear_edges(&mut self) {
        self.edge = Edge::None;
        if let VariableKind::Timer { expired, .. } = &mut self.kind {
            *expired = false;
        }
    }

    pub(crate) fn clear_changed(&mut self) {
        self.changed = false;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(Variable::new("D1", Some(8)).kind(), VariableKind::Detector { sub: 1 });
        assert!(Variable::new("TGL", Some(8)).is_timer());
        assert_eq!(Variable::new("RA", Some(8)).kind(), VariableKind::Plain);
        assert_eq!(Variable::new("DA", Some(8)).kind(), VariableKind::Plain);
    }

    #[test]
    fn conflict_groups() {
        assert_eq!(Variable::new("MRA", None).conflict_group(), Some(0));
        assert_eq!(Variable::new("MRX", None).conflict_group(), Some(4));
        assert_eq!(Variable::new("MRA", Some(1)).conflict_group(), None);
        assert_eq!(Variable::new("MRE", None).conflict_group(), None);
    }

    #[test]
    fn edges_follow_transitions() {
        let mut v = Variable::new("A", Some(1));
        assert_eq!(v.set_value(1, 3), Transition::Started);
        assert!(v.has_started() && v.is_changed());
        assert_eq!(v.last_update(), 3);

        assert_eq!(v.set_value(4, 4), Transition::Updated);
        assert!(v.has_started());

        assert_eq!(v.set_value(0, 5), Transition::Ended);
        assert!(v.has_ended() && !v.has_started());

        v.clear_changed();
        assert_eq!(v.set_value(0, 6), Transition::Unchanged);
        assert!(!v.is_changed());
        assert_eq!(v.last_update(), 5);
    }

    #[test]
    fn timer_countdown() {
        let mut t = Variable::new("T", Some(1));
        assert!(t.set_timer_max(3));
        t.set_value(3, 0);
        t.clear_edges();
        assert!(!t.decrement_timer(1, 1));
        assert!(!t.decrement_timer(1, 2));
        assert!(t.decrement_timer(1, 3));
        assert_eq!(t.value(), 0);
        assert!(t.has_ended() && t.timer_expired());
        assert!(!t.decrement_timer(1, 4));

        t.clear_edges();
        assert!(!t.timer_expired() && !t.has_ended());
    }

    #[test]
    fn timers_read_as_booleans() {
        let mut t = Variable::new("T", Some(1));
        t.set_value(25, 0);
        assert_eq!(t.operand_value(), 1);
        let mut a = Variable::new("A", Some(1));
        a.set_value(-3, 0);
        assert_eq!(a.operand_value(), -3);
    }

    #[test]
    fn rule_sources_are_unique() {
        let mut v = Variable::new("A", Some(1));
        assert!(v.set_start_source(Location::new(1, 1)).is_ok());
        assert_eq!(v.set_start_source(Location::new(2, 1)), Err(Location::new(1, 1)));
        assert!(v.set_end_source(Location::new(2, 1)).is_ok());
    }

    #[test]
    fn only_timers_take_a_maximum() {
        let mut v = Variable::new("A", Some(1));
        assert!(!v.set_timer_max(30));
        assert_eq!(v.timer_max(), None);
    }
}
