use crate::config::ControllerConfig;
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::debug::{debug_change, debug_timer_expired};
use crate::error::{Error, EvalError, Location, Result};
use crate::eval;
use crate::event::Event;
use crate::light::TrafficLight;
use crate::name::{canonical_id, ParsedName};
use crate::program::Program;
use crate::rule::{Rule, RuleKind};
use crate::variable::{Edge, Transition, Variable};
use crate::{LightSet, TrafficLightId, VariableId, VariableSet};
use itertools::Itertools;
use log::{debug, error, info, warn};
use std::collections::HashMap;

/// A TrafCOD traffic-signal controller.
///
/// The controller owns the variables and rules of one program. The host calls
/// [tick](Self::tick) once per tick interval, reports detector changes with
/// [on_detector](Self::on_detector), and collects the resulting
/// [Event]s with [take_events](Self::take_events).
pub struct Controller {
    /// The settings the controller was loaded with.
    config: ControllerConfig,
    /// The variables of the program.
    variables: VariableSet,
    /// Variables by canonical identifier.
    index: HashMap<String, VariableId>,
    /// The rules, in evaluation order.
    rules: Vec<Rule>,
    /// The traffic lights driven by the outputs.
    lights: LightSet,
    /// The streams of each conflict group.
    conflict_groups: Vec<Vec<u8>>,
    /// The structure number declared by the program.
    structure: Option<i32>,
    /// The rank of the active conflict group.
    current_group: Option<usize>,
    /// Detector changes waiting for the next tick.
    pending: Vec<(VariableId, bool)>,
    /// Events not yet collected.
    events: Vec<Event>,
    /// The number of ticks evaluated so far.
    tick: u64,
    /// The time of the last tick, as given by the host.
    time: f64,
    /// The current pass of the convergence loop.
    pass: usize,
    /// Set once an evaluation error has occurred.
    halted: bool,
    /// Debugging information from the previous tick.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

/// The outcome of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The number of variable changes, including expired timers and detector changes.
    pub changed_count: usize,
    /// The number of passes over the rules.
    pub iterations_used: usize,
    /// Whether the rules were still changing variables after the final pass.
    pub oscillation_detected: bool,
}

/// What caused a variable to change.
#[derive(Clone, Copy)]
enum Cause {
    Init,
    Detector,
    TimerExpired,
    Rule(usize),
}

impl Controller {
    /// Loads a program.
    ///
    /// Every exported variable is bound to the configured traffic lights of
    /// its stream, and every detector the program mentions must be configured.
    /// Variables named in `%init` directives are activated before this returns.
    pub fn load(config: &ControllerConfig, program: &str) -> Result<Self> {
        let Program {
            variables,
            index,
            rules,
            conflict_groups,
            structure,
            ..
        } = Program::parse(program)?;

        let mut controller = Self {
            config: config.clone(),
            variables,
            index,
            rules,
            lights: LightSet::with_key(),
            conflict_groups,
            structure,
            current_group: None,
            pending: vec![],
            events: vec![],
            tick: 0,
            time: 0.0,
            pass: 0,
            halted: false,
            #[cfg(feature = "debug")]
            debug: serde_json::Value::Null,
        };

        for light in &config.traffic_lights {
            controller.add_traffic_light(light);
        }
        controller.check_outputs()?;
        controller.check_detectors()?;
        controller.check_consistency();
        controller.initialize();

        debug!(
            "Loaded controller {} with {} variables, {} rules and {} lights",
            controller.name(),
            controller.variables.len(),
            controller.rules.len(),
            controller.lights.len()
        );
        Ok(controller)
    }

    /// Gets the name of the controller.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Gets the settings the controller was loaded with.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Evaluates the program once.
    ///
    /// Running timers count down first, then queued detector changes are
    /// applied, and finally all rules are executed repeatedly until a pass
    /// changes nothing or `max_loop_count` passes have been made.
    ///
    /// An evaluation error halts the controller: the error is returned, and
    /// every later call returns [Error::Halted].
    pub fn tick(&mut self, time: f64) -> Result<TickReport> {
        if self.halted {
            return Err(Error::Halted {
                controller: self.name().to_string(),
            });
        }
        self.tick += 1;
        self.time = time;
        self.pass = 0;

        for variable in self.variables.values_mut() {
            variable.clear_edges();
        }

        let mut report = TickReport::default();
        report.changed_count += self.decrement_timers();
        report.changed_count += self.apply_detector_events();

        let max_loop_count = self.config.max_loop_count.max(1);
        loop {
            self.pass += 1;
            for variable in self.variables.values_mut() {
                variable.clear_changed();
            }
            let changes = self.execute_rules()?;
            report.changed_count += changes;
            // Timer edges last one pass
            for variable in self.variables.values_mut().filter(|var| var.is_timer()) {
                variable.clear_edges();
            }
            if changes == 0 {
                break;
            }
            if self.pass >= max_loop_count {
                report.oscillation_detected = true;
                self.report_oscillation();
                break;
            }
        }
        report.iterations_used = self.pass;

        debug!(
            "{}: tick {} at {:.1}s took {} passes, {} changes",
            self.name(),
            self.tick,
            time,
            report.iterations_used,
            report.changed_count
        );

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }

        Ok(report)
    }

    /// Reports that a detector became occupied or clear.
    ///
    /// The change takes effect at the start of the next tick.
    pub fn on_detector(&mut self, detector: &str, occupied: bool) -> Result<()> {
        let id = self
            .lookup(detector)
            .filter(|id| self.variables[*id].is_detector())
            .ok_or_else(|| Error::Config(format!("{} has no detector {}", self.name(), detector)))?;
        self.pending.push((id, occupied));
        Ok(())
    }

    /// Enables or disables logging of changes to a variable.
    pub fn trace(&mut self, name: &str, stream: Option<u8>, enabled: bool) -> Result<()> {
        let key = canonical_id(&name.to_ascii_uppercase(), stream);
        let id = self
            .index
            .get(&key)
            .copied()
            .ok_or_else(|| Error::Config(format!("unknown variable {}", key)))?;
        self.variables[id].set_traced(enabled);
        Ok(())
    }

    /// Enables or disables logging of changes to all variables of a stream.
    pub fn trace_stream(&mut self, stream: u8, enabled: bool) {
        for variable in self.variables.values_mut() {
            if variable.stream() == Some(stream) {
                variable.set_traced(enabled);
            }
        }
    }

    /// Adds a traffic light, subscribing it to every output of its stream.
    pub fn add_traffic_light(&mut self, name: &str) -> TrafficLightId {
        let light = TrafficLight::new(name, self.name());
        let stream = light.stream();
        let light_id = self.lights.insert(light);
        if stream.is_some() {
            for variable in self.variables.values_mut() {
                if variable.is_output() && variable.stream() == stream {
                    variable.add_sink(light_id);
                }
            }
        }
        light_id
    }

    /// Subscribes a traffic light to an output, regardless of its stream.
    pub fn subscribe_output(&mut self, output: &str, light: TrafficLightId) -> Result<()> {
        if !self.lights.contains_key(light) {
            return Err(Error::Config(format!("unknown traffic light for {}", output)));
        }
        let id = self
            .lookup(output)
            .ok_or_else(|| Error::Config(format!("unknown variable {}", output)))?;
        let variable = &mut self.variables[id];
        if !variable.add_sink(light) {
            return Err(Error::Config(format!("{} is not exported", variable.id())));
        }
        Ok(())
    }

    /// Takes the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Gets a variable by identifier, e.g. `TGL08` or `D081`.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.lookup(name).map(|id| &self.variables[id])
    }

    /// Gets a variable by ID.
    pub fn variable_by_id(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id)
    }

    /// Returns an iterator over all the variables, in order of first appearance.
    pub fn iter_variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables.iter()
    }

    /// Gets the rules, in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Renders a rule of this controller, optionally with the current value
    /// of every variable, e.g. `RA08<1>=TGL08N<0>`.
    pub fn render_rule(&self, rule: &Rule, values: bool) -> String {
        rule.render(&self.variables, values)
    }

    /// Returns an iterator over all the traffic lights.
    pub fn iter_lights(&self) -> impl Iterator<Item = (TrafficLightId, &TrafficLight)> {
        self.lights.iter()
    }

    /// Gets a reference to the traffic light with the given ID.
    pub fn get_light(&self, light_id: TrafficLightId) -> &TrafficLight {
        &self.lights[light_id]
    }

    /// Gets the streams of each conflict group.
    pub fn conflict_groups(&self) -> &[Vec<u8>] {
        &self.conflict_groups
    }

    /// Gets the rank of the active conflict group.
    pub fn current_conflict_group(&self) -> Option<usize> {
        self.current_group
    }

    /// Gets the structure number declared by the program.
    pub fn structure_number(&self) -> Option<i32> {
        self.structure
    }

    /// Gets the number of ticks evaluated so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Gets the time of the last tick.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Whether an evaluation error has stopped the controller.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Gets the debugging information for the previous tick as JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        self.debug.clone()
    }

    fn lookup(&self, name: &str) -> Option<VariableId> {
        let upper = name.to_ascii_uppercase();
        if let Some(id) = self.index.get(&upper) {
            return Some(*id);
        }
        let parsed = ParsedName::parse(&upper, Location::default()).ok()?;
        if parsed.consumed != upper.len() {
            return None;
        }
        self.index.get(&canonical_id(&parsed.name, parsed.stream)).copied()
    }

    fn check_outputs(&self) -> Result<()> {
        match self
            .variables
            .values()
            .find(|var| var.is_output() && var.sinks().is_empty())
        {
            Some(var) => Err(Error::Config(format!(
                "no traffic light found that matches output {} of {}",
                var.id(),
                self.name()
            ))),
            None => Ok(()),
        }
    }

    fn check_detectors(&self) -> Result<()> {
        for variable in self.variables.values().filter(|var| var.is_detector()) {
            let id = variable.id();
            if !self
                .config
                .detectors
                .iter()
                .any(|detector| detector.eq_ignore_ascii_case(&id))
            {
                return Err(Error::Config(format!(
                    "no detector found that matches {} of {}",
                    id,
                    self.name()
                )));
            }
        }
        Ok(())
    }

    /// Warns about variables that look unused or incompletely defined.
    fn check_consistency(&mut self) {
        let mut warnings = vec![];
        for variable in self.variables.values() {
            let id = variable.id();
            if variable.ref_count() == 0 && !variable.is_output() && !variable.name().starts_with("RA") {
                warnings.push(format!("variable {} is never referenced", id));
            }
            if !variable.is_detector() {
                if !variable.has_start_rule() {
                    warnings.push(format!("variable {} has no start rule", id));
                }
                if !variable.has_end_rule() && !variable.is_timer() {
                    warnings.push(format!("variable {} has no end rule", id));
                }
            }
        }
        for message in warnings {
            self.warn(message);
        }
    }

    /// Activates the variables named in `%init` directives.
    fn initialize(&mut self) {
        let inited = self
            .variables
            .iter()
            .filter(|(_, var)| var.is_inited())
            .map(|(id, var)| (id, var.initial_value()))
            .collect::<Vec<_>>();
        for (id, value) in inited {
            self.update(id, value, Cause::Init);
        }
    }

    /// Counts running timers down, returning the number that expired.
    fn decrement_timers(&mut self) -> usize {
        let step = self.config.timer_step();
        let tick = self.tick;
        let mut expired = vec![];
        for (id, variable) in &mut self.variables {
            let old = variable.value();
            if variable.decrement_timer(step, tick) {
                debug_timer_expired(&variable.id());
                expired.push((id, old));
            }
        }
        for (id, old) in &expired {
            if self.variables[*id].is_traced() {
                self.trace_change(*id, *old, 0, Cause::TimerExpired);
            }
        }
        expired.len()
    }

    /// Applies queued detector changes, returning the number of changes.
    fn apply_detector_events(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter(|(id, occupied)| self.update(*id, *occupied as i32, Cause::Detector))
            .count()
    }

    /// Executes every rule once, returning the number of changes.
    fn execute_rules(&mut self) -> Result<usize> {
        let mut changes = 0;
        for index in 0..self.rules.len() {
            match self.execute_rule(index) {
                Ok(true) => changes += 1,
                Ok(false) => {}
                Err(source) => {
                    self.halted = true;
                    let rule = self.rules[index].text().to_string();
                    error!("{}: cannot evaluate rule `{}`: {}", self.name(), rule, source);
                    return Err(Error::Evaluation { rule, source });
                }
            }
        }
        Ok(changes)
    }

    /// Executes a rule, returning whether its destination changed.
    fn execute_rule(&mut self, index: usize) -> std::result::Result<bool, EvalError> {
        let rule = &self.rules[index];
        let (kind, dest) = (rule.kind(), rule.destination());

        // The destination's own edge is forgotten whenever its rule comes up,
        // whether or not the rule applies
        let variable = &mut self.variables[dest];
        if !variable.is_timer() && !variable.is_detector() {
            match kind {
                RuleKind::Start => variable.clear_edge(Edge::Start),
                RuleKind::End => variable.clear_edge(Edge::End),
                _ => variable.clear_edges(),
            }
        }

        let variable = &self.variables[dest];
        let old = variable.value();
        let applies = match kind {
            RuleKind::Start | RuleKind::InitTimer => old == 0,
            RuleKind::End => old != 0,
            RuleKind::Assign | RuleKind::NegAssign | RuleKind::ReinitTimer => true,
        };
        if !applies {
            return Ok(false);
        }

        let rhs = eval::evaluate(rule.tokens(), &self.variables)?;

        let new = if let Some(max) = variable.timer_max() {
            match (kind, rhs) {
                (_, 0) => return Ok(false),
                (RuleKind::End, _) => 0,
                _ => max.max(1),
            }
        } else {
            match kind {
                RuleKind::End if rhs == 0 => old,
                RuleKind::End => 0,
                _ => rhs,
            }
        };

        Ok(self.update(dest, new, Cause::Rule(index)))
    }

    /// Sets the value of a variable, propagating the change to traffic
    /// lights, conflict groups and the trace log.
    ///
    /// Returns whether the change counts towards convergence; restarting a
    /// running timer does not.
    fn update(&mut self, id: VariableId, value: i32, cause: Cause) -> bool {
        let variable = &mut self.variables[id];
        let old = variable.value();
        let transition = variable.set_value(value, self.tick);
        if transition == Transition::Unchanged {
            return false;
        }
        debug_change(&variable.id(), old, value, self.pass);
        let (traced, is_timer) = (variable.is_traced(), variable.is_timer());

        if traced {
            self.trace_change(id, old, value, cause);
        }
        if transition == Transition::Started {
            self.activate(id);
        }
        !(is_timer && transition == Transition::Updated)
    }

    /// Pushes the colour of an output to its lights and switches the
    /// conflict group of a conflict group variable.
    fn activate(&mut self, id: VariableId) {
        let variable = &self.variables[id];

        if let Some(color) = variable.color() {
            let source = variable.id();
            for light_id in variable.sinks() {
                let light = &mut self.lights[*light_id];
                light.set_color(color, self.tick);
                self.events.push(Event::LightChanged {
                    controller: self.config.name.clone(),
                    source: source.clone(),
                    light: light.name().to_string(),
                    color,
                });
            }
        }

        if let Some(rank) = variable.conflict_group() {
            if rank < self.conflict_groups.len() && self.current_group != Some(rank) {
                let streams = |rank: Option<usize>| {
                    rank.map_or(String::new(), |rank| {
                        self.conflict_groups[rank]
                            .iter()
                            .map(|stream| format!("{:02}", stream))
                            .join(" ")
                    })
                };
                let (from, to) = (streams(self.current_group), streams(Some(rank)));
                info!("{}: conflict group changed from [{}] to [{}]", self.name(), from, to);
                self.events.push(Event::ConflictGroupChanged {
                    controller: self.config.name.clone(),
                    from,
                    to,
                });
                self.current_group = Some(rank);
            }
        }
    }

    fn trace_change(&mut self, id: VariableId, old: i32, new: i32, cause: Cause) {
        let variable = &self.variables[id];
        let cause = match cause {
            Cause::Init => "%init".to_string(),
            Cause::Detector => "detector".to_string(),
            Cause::TimerExpired => "timer expired".to_string(),
            Cause::Rule(index) => self.rules[index].render(&self.variables, true),
        };
        info!(
            "{}: tick {}: {} changed from {} to {} by {}",
            self.name(),
            self.tick,
            variable.id(),
            old,
            new,
            cause
        );
        self.events.push(Event::VariableTraced {
            controller: self.config.name.clone(),
            variable: variable.id(),
            stream: variable.stream(),
            old,
            new,
            cause,
        });
    }

    fn report_oscillation(&mut self) {
        let changed = self
            .variables
            .values()
            .filter(|var| var.is_changed())
            .map(|var| var.id())
            .join(", ");
        self.warn(format!(
            "no convergence after {} passes at tick {}; still changing: {}",
            self.pass, self.tick, changed
        ));
    }

    fn warn(&mut self, message: String) {
        warn!("{}: {}", self.name(), message);
        self.events.push(Event::Warning {
            controller: self.config.name.clone(),
            message,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn controller(program: &str) -> Controller {
        let config = ControllerConfig::new("TLC")
            .with_detector("D011")
            .with_detector("D012")
            .with_traffic_light("01.1");
        Controller::load(&config, program).unwrap()
    }

    #[test]
    fn start_edges_are_visible_to_later_rules() {
        let mut c = controller("A01=D011\nB01.=SA01\nB01N.=0");
        c.on_detector("D011", true).unwrap();
        c.tick(0.1).unwrap();
        assert_eq!(c.variable("B01").unwrap().value(), 1);
    }

    #[test]
    fn start_edges_are_cleared_between_ticks() {
        let mut c = controller("A01=D011\nB01=SA01");
        c.on_detector("D011", true).unwrap();
        c.tick(0.1).unwrap();
        assert!(!c.variable("A01").unwrap().has_started());
        assert_eq!(c.variable("B01").unwrap().value(), 0);
        c.tick(0.2).unwrap();
        assert_eq!(c.variable("A01").unwrap().value(), 1);
        assert_eq!(c.variable("B01").unwrap().value(), 0);
    }

    #[test]
    fn timer_restart_does_not_count_as_change() {
        let mut c = controller("%time T01 50\nRIT01.=D011");
        c.on_detector("D011", true).unwrap();
        let report = c.tick(0.1).unwrap();
        assert_eq!(c.variable("T01").unwrap().value(), 50);
        // The detector and the timer start
        assert_eq!(report.changed_count, 2);
        assert_eq!(report.iterations_used, 2);

        let report = c.tick(0.2).unwrap();
        assert_eq!(c.variable("T01").unwrap().value(), 50);
        assert_eq!(report.changed_count, 0);
        assert_eq!(report.iterations_used, 1);
    }

    #[test]
    fn timer_end_rule_stops_timer() {
        let mut c = controller("%time T01 50\nIT01.=D011\nET01.=D012");
        c.on_detector("D011", true).unwrap();
        c.tick(0.1).unwrap();
        assert_eq!(c.variable("T01").unwrap().value(), 50);

        c.on_detector("D011", false).unwrap();
        c.on_detector("D012", true).unwrap();
        c.tick(0.2).unwrap();
        assert_eq!(c.variable("T01").unwrap().value(), 0);
    }

    #[test]
    fn start_edges_of_latched_variables_are_cleared() {
        let mut c = controller("A01.=D011\nA01N.=D012\nB01=SA01");
        c.on_detector("D011", true).unwrap();
        c.tick(0.1).unwrap();
        assert_eq!(c.variable("A01").unwrap().value(), 1);
        assert!(!c.variable("A01").unwrap().has_started());
        assert_eq!(c.variable("B01").unwrap().value(), 0);
    }

    #[test]
    fn timer_end_edges_last_one_pass() {
        let mut c = controller("%time T01 2\nIT01.=D011\nA01=ET01\nB01.=ET01\nB01N.=0");
        c.on_detector("D011", true).unwrap();
        c.tick(0.1).unwrap();
        c.on_detector("D011", false).unwrap();
        c.tick(0.2).unwrap();
        assert_eq!(c.variable("T01").unwrap().value(), 1);

        let report = c.tick(0.3).unwrap();
        assert_eq!(c.variable("T01").unwrap().value(), 0);
        assert!(!c.variable("T01").unwrap().has_ended());
        // A01 follows the edge up and down again, B01 latches it
        assert_eq!(c.variable("A01").unwrap().value(), 0);
        assert_eq!(c.variable("B01").unwrap().value(), 1);
        assert_eq!(report.changed_count, 4);
        assert_eq!(report.iterations_used, 3);
    }

    #[test]
    fn colour_is_pushed_on_activation_only() {
        let mut c = controller("%export RA01 R\nRA01=5-D011");
        c.tick(0.1).unwrap();
        assert_eq!(c.variable("RA01").unwrap().value(), 5);
        let pushed = |events: Vec<Event>| {
            events
                .iter()
                .filter(|event| matches!(event, Event::LightChanged { .. }))
                .count()
        };
        assert_eq!(pushed(c.take_events()), 1);

        c.on_detector("D011", true).unwrap();
        c.tick(0.2).unwrap();
        assert_eq!(c.variable("RA01").unwrap().value(), 4);
        assert_eq!(pushed(c.take_events()), 0);
    }

    #[test]
    fn evaluation_error_halts_controller() {
        use crate::rule::Token;

        let mut c = controller("A01=D011");
        let a = c.lookup("A01").unwrap();
        c.rules.push(Rule {
            kind: RuleKind::Assign,
            destination: a,
            tokens: vec![Token::Constant(1), Token::Plus],
            location: Location::new(2, 1),
            text: "A01=1+".into(),
        });

        assert_eq!(
            c.tick(0.1),
            Err(Error::Evaluation {
                rule: "A01=1+".into(),
                source: EvalError::MissingOperand,
            })
        );
        assert!(c.is_halted());
        assert_eq!(c.variable("A01").unwrap().value(), 0);
        assert_eq!(
            c.tick(0.2),
            Err(Error::Halted {
                controller: "TLC".into()
            })
        );
    }

    #[test]
    fn tracing_emits_events() {
        let mut c = controller("A01=D011");
        c.trace("A", Some(1), true).unwrap();
        assert!(c.trace("B", Some(1), true).is_err());
        c.on_detector("D011", true).unwrap();
        c.tick(0.1).unwrap();
        let traced = c
            .take_events()
            .into_iter()
            .filter_map(|event| match event {
                Event::VariableTraced {
                    variable, old, new, cause, ..
                } => Some((variable, old, new, cause)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(traced, vec![("A01".to_string(), 0, 1, "A01<1>=D011<1>".to_string())]);
    }

    #[test]
    fn consistency_warnings() {
        let mut c = controller("A01.=D011\nB01=A01");
        let warnings = c
            .take_events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Warning { message, .. } => Some(message),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            warnings,
            vec![
                "variable A01 has no end rule".to_string(),
                "variable B01 is never referenced".to_string(),
            ]
        );
    }

    #[test]
    fn conflict_groups_switch() {
        let program = "# Sequence\n2 2\n# Structure: 3\n1 2\n3 4\n\
                       MRA=D011\nMRB=D011N";
        let mut c = controller(program);
        assert_eq!(c.structure_number(), Some(3));
        c.tick(0.1).unwrap();
        assert_eq!(c.current_conflict_group(), Some(1));
        c.take_events();

        c.on_detector("D011", true).unwrap();
        c.tick(0.2).unwrap();
        assert_eq!(c.current_conflict_group(), Some(0));
        let events = c.take_events();
        assert!(events.contains(&Event::ConflictGroupChanged {
            controller: "TLC".into(),
            from: "02 04".into(),
            to: "01 03".into(),
        }));
    }
}
