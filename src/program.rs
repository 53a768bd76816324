//! Loading of TrafCOD program text.
//!
//! A program is line oriented. Lines starting with `#` are comments, some of
//! which carry metadata (the language version and the conflict group tables).
//! Lines starting with `%` are directives, and all other non-blank lines are
//! rules.

use crate::error::{Error, Location, Result, RuleHalf};
use crate::light::LightColor;
use crate::name::{canonical_id, ParsedName};
use crate::rule::{Rule, RuleKind};
use crate::variable::Variable;
use crate::{VariableId, VariableSet};
use log::debug;
use std::collections::HashMap;

mod rule;

/// The version of the TrafCOD language this interpreter understands.
pub(crate) const TRAFCOD_VERSION: i32 = 100;

const VERSION_PREFIX: &str = "trafcod-version=";
const SEQUENCE_KEY: &str = "sequence";
const STRUCTURE_PREFIX: &str = "structure:";

/// A parsed program: the variables it refers to and its rules.
#[derive(Default)]
pub(crate) struct Program {
    /// All variables, in order of first appearance.
    pub variables: VariableSet,
    /// Variables by identifier, e.g. `TGL08`.
    pub index: HashMap<String, VariableId>,
    /// The rules, in evaluation order.
    pub rules: Vec<Rule>,
    /// The streams of each conflict group.
    pub conflict_groups: Vec<Vec<u8>>,
    /// The structure number declared by the program, if any.
    pub structure: Option<i32>,
    /// The number of conflict groups and their size, from the sequence line.
    sequence: Option<(usize, usize)>,
}

/// The lines of a program, with a cursor.
struct Lines<'a> {
    lines: Vec<&'a str>,
    next: usize,
}

impl Program {
    /// Parses the text of a program.
    pub fn parse(text: &str) -> Result<Self> {
        let mut program = Self::default();
        let mut lines = Lines {
            lines: text.lines().collect(),
            next: 0,
        };

        while let Some((line, location)) = lines.next_line() {
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                program.parse_comment(comment.trim(), location, &mut lines)?;
            } else if line.starts_with('%') {
                program.parse_directive(line, location)?;
            } else {
                let rule = rule::parse(&mut program, line, location)?;
                program.rules.push(rule);
            }
        }

        debug!(
            "Parsed {} variables and {} rules",
            program.variables.len(),
            program.rules.len()
        );
        Ok(program)
    }

    /// Looks up a variable, creating it if it does not exist yet.
    pub fn install(&mut self, name: &ParsedName) -> VariableId {
        let key = canonical_id(&name.name, name.stream);
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = self
            .variables
            .insert(Variable::new(&name.name, name.stream));
        self.index.insert(key, id);
        id
    }

    /// Records that a rule defines one or both halves of a variable's logic.
    pub fn add_rule_source(
        &mut self,
        id: VariableId,
        kind: RuleKind,
        location: Location,
    ) -> Result<()> {
        let variable = &mut self.variables[id];
        for half in kind.halves() {
            let result = match half {
                RuleHalf::Start => variable.set_start_source(location),
                RuleHalf::End => variable.set_end_source(location),
            };
            if let Err(first) = result {
                return Err(Error::DuplicateRule {
                    variable: variable.id(),
                    half: *half,
                    first,
                    location,
                });
            }
        }
        Ok(())
    }

    fn parse_comment(&mut self, comment: &str, location: Location, lines: &mut Lines) -> Result<()> {
        if let Some(version) = strip_prefix_ignore_case(comment, VERSION_PREFIX) {
            let version: i32 = version
                .trim()
                .parse()
                .map_err(|_| Error::syntax(location, format!("bad TrafCOD version {:?}", version)))?;
            if version != TRAFCOD_VERSION {
                return Err(Error::Config(format!(
                    "wrong TrafCOD version (expected {}, got {})",
                    TRAFCOD_VERSION, version
                )));
            }
        } else if strip_prefix_ignore_case(comment, SEQUENCE_KEY).is_some() {
            let (line, location) = lines.next_data_line(location)?;
            let fields = parse_numbers::<usize>(line, location)?;
            match fields[..] {
                [groups, size] => self.sequence = Some((groups, size)),
                _ => {
                    return Err(Error::syntax(
                        location,
                        "the sequence line must hold the number of conflict groups and their size",
                    ))
                }
            }
        } else if let Some(number) = strip_prefix_ignore_case(comment, STRUCTURE_PREFIX) {
            let number = number.trim();
            self.structure = Some(number.parse().map_err(|_| {
                Error::syntax(location, format!("bad structure number {:?}", number))
            })?);
            let (groups, size) = self.sequence.ok_or_else(|| {
                Error::syntax(location, "structure table without a preceding sequence line")
            })?;
            self.conflict_groups = vec![vec![]; size];
            for _ in 0..groups {
                let (line, location) = lines.next_data_line(location)?;
                let streams = parse_numbers::<u8>(line, location)?;
                if streams.len() != size {
                    return Err(Error::syntax(
                        location,
                        format!("expected {} streams in the structure table, got {}", size, streams.len()),
                    ));
                }
                for (group, stream) in self.conflict_groups.iter_mut().zip(streams) {
                    group.push(stream);
                }
            }
        }
        Ok(())
    }

    fn parse_directive(&mut self, line: &str, location: Location) -> Result<()> {
        let mut fields = line.split_whitespace();
        let keyword = fields.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = fields.collect();
        let name_field = args
            .first()
            .ok_or_else(|| Error::syntax(location, format!("{} requires a variable", keyword)))?;
        let name = parse_whole_name(name_field, location)?;

        match keyword.as_str() {
            "%init" => {
                // Any initial value given is ignored
                let id = self.install(&name);
                self.variables[id].set_inited();
            }
            "%time" => {
                let value: i32 = args
                    .get(1)
                    .and_then(|value| value.parse().ok())
                    .filter(|value| *value >= 0)
                    .ok_or_else(|| Error::syntax(location, "%time requires a duration in tenths of a second"))?;
                let id = self.install(&name);
                let variable = &mut self.variables[id];
                if !variable.set_timer_max(value) {
                    return Err(Error::Config(format!(
                        "cannot set the duration of {} because it is not a timer",
                        variable.id()
                    )));
                }
            }
            "%export" => {
                let color = args
                    .get(1)
                    .and_then(|code| LightColor::from_code(&code.to_ascii_uppercase()))
                    .ok_or_else(|| Error::syntax(location, "%export requires a colour code (R, Y or G)"))?;
                let id = self.install(&name);
                let variable = &mut self.variables[id];
                if !variable.set_output(color) {
                    return Err(Error::Config(format!("{} is exported more than once", variable.id())));
                }
            }
            _ => {
                return Err(Error::syntax(location, format!("unknown directive {}", keyword)));
            }
        }
        Ok(())
    }
}

impl<'a> Lines<'a> {
    /// Returns the next trimmed line and its location.
    fn next_line(&mut self) -> Option<(&'a str, Location)> {
        let raw = *self.lines.get(self.next)?;
        self.next += 1;
        let indent = raw.len() - raw.trim_start().len();
        Some((raw.trim(), Location::new(self.next, indent + 1)))
    }

    /// Returns the next line that is neither blank nor a comment.
    fn next_data_line(&mut self, table: Location) -> Result<(&'a str, Location)> {
        while let Some((line, location)) = self.next_line() {
            if !line.is_empty() && !line.starts_with('#') {
                return Ok((line, location));
            }
        }
        Err(Error::syntax(table, "unexpected end of file while reading a conflict group table"))
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn parse_numbers<T: std::str::FromStr>(line: &str, location: Location) -> Result<Vec<T>> {
    line.split_whitespace()
        .map(|field| {
            field
                .parse()
                .map_err(|_| Error::syntax(location, format!("bad number {:?}", field)))
        })
        .collect()
}

/// Parses a directive argument that must consist of a single identifier.
fn parse_whole_name(field: &str, location: Location) -> Result<ParsedName> {
    let name = ParsedName::parse(&field.to_ascii_uppercase(), location)?;
    if name.consumed != field.len() {
        return Err(Error::syntax(location, format!("bad variable name {}", field)));
    }
    Ok(name)
}
