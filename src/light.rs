#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A traffic light driven by one of the controller's outputs.
#[derive(Clone, Debug)]
pub struct TrafficLight {
    /// The name of the light, e.g. `08.1`.
    name: String,
    /// The stream the light belongs to, if its name encodes one.
    stream: Option<u8>,
    /// The current colour; `None` until an output first switches the light.
    color: Option<LightColor>,
    /// The tick at which the colour last changed.
    since: u64,
}

/// The colour of a traffic light.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LightColor {
    Red,
    Yellow,
    Green,
}

impl LightColor {
    /// Parses the colour code of an `%export` directive.
    /// Accepts the letters `R`, `Y` and `G` or their ASCII codes.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "R" | "82" => Some(LightColor::Red),
            "Y" | "89" => Some(LightColor::Yellow),
            "G" | "71" => Some(LightColor::Green),
            _ => None,
        }
    }
}

impl fmt::Display for LightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightColor::Red => f.write_str("red"),
            LightColor::Yellow => f.write_str("yellow"),
            LightColor::Green => f.write_str("green"),
        }
    }
}

impl TrafficLight {
    /// Creates a traffic light belonging to the named controller.
    pub(crate) fn new(name: &str, controller: &str) -> Self {
        Self {
            name: name.to_string(),
            stream: light_stream(name, controller),
            color: None,
            since: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stream(&self) -> Option<u8> {
        self.stream
    }

    pub fn color(&self) -> Option<LightColor> {
        self.color
    }

    /// Gets the tick at which the colour last changed.
    pub fn since(&self) -> u64 {
        self.since
    }

    /// Switches the light, returning true if the colour changed.
    pub(crate) fn set_color(&mut self, color: LightColor, tick: u64) -> bool {
        if self.color == Some(color) {
            return false;
        }
        self.color = Some(color);
        self.since = tick;
        true
    }
}

/// Finds the stream a light belongs to from its name.
///
/// The controller name and a `.` are stripped from the front, and a
/// `.<digit>` suffix from the back; what remains must be two digits.
fn light_stream(name: &str, controller: &str) -> Option<u8> {
    let mut name = name.strip_prefix(controller).unwrap_or(name);
    name = name.strip_prefix('.').unwrap_or(name);
    if let Some((head, tail)) = name.rsplit_once('.') {
        if tail.len() == 1 {
            name = head;
        }
    }
    match name.as_bytes() {
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => Some(10 * (a - b'0') + (b - b'0')),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn streams_from_names() {
        assert_eq!(light_stream("08.1", "TLC"), Some(8));
        assert_eq!(light_stream("TLC.11.2", "TLC"), Some(11));
        assert_eq!(light_stream("TLC08", "TLC"), Some(8));
        assert_eq!(light_stream("05", "TLC"), Some(5));
        assert_eq!(light_stream("OTHER.08.1", "TLC"), None);
        assert_eq!(light_stream("8.1", "TLC"), None);
    }

    #[test]
    fn colour_codes() {
        assert_eq!(LightColor::from_code("R"), Some(LightColor::Red));
        assert_eq!(LightColor::from_code("71"), Some(LightColor::Green));
        assert_eq!(LightColor::from_code("Y"), Some(LightColor::Yellow));
        assert_eq!(LightColor::from_code("B"), None);
    }

    #[test]
    fn colour_changes() {
        let mut light = TrafficLight::new("08.1", "TLC");
        assert_eq!(light.color(), None);
        assert!(light.set_color(LightColor::Green, 4));
        assert!(!light.set_color(LightColor::Green, 5));
        assert_eq!(light.since(), 4);
    }
}
