#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The default evaluation interval in s.
const DEFAULT_TICK_INTERVAL: f64 = 0.1;

/// The default maximum number of rule passes per tick.
const DEFAULT_MAX_LOOP_COUNT: usize = 10;

/// The settings of a [Controller](crate::Controller) and the intersection it controls.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ControllerConfig {
    /// The name of the controller.
    pub name: String,
    /// The time between evaluations in s.
    pub tick_interval: f64,
    /// The maximum number of passes over the rules in one tick.
    pub max_loop_count: usize,
    /// The traffic lights that exported variables may drive, e.g. `08.1`.
    pub traffic_lights: Vec<String>,
    /// The detectors available to the program, e.g. `D081`.
    pub detectors: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: "TLC".to_string(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_loop_count: DEFAULT_MAX_LOOP_COUNT,
            traffic_lights: vec![],
            detectors: vec![],
        }
    }
}

impl ControllerConfig {
    /// Creates a configuration with default settings and no lights or detectors.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Adds a traffic light.
    pub fn with_traffic_light(mut self, name: &str) -> Self {
        self.traffic_lights.push(name.to_string());
        self
    }

    /// Adds a detector.
    pub fn with_detector(mut self, name: &str) -> Self {
        self.detectors.push(name.to_string());
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: f64) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_max_loop_count(mut self, max_loop_count: usize) -> Self {
        self.max_loop_count = max_loop_count;
        self
    }

    /// The number of tenths of a second a timer counts down per tick.
    pub(crate) fn timer_step(&self) -> i32 {
        ((self.tick_interval * 10.0).round() as i32).max(1)
    }
}
