//! Parsing of TrafCOD identifiers.
//!
//! A TrafCOD identifier embeds a two-digit stream number somewhere inside the
//! name (`TGL08`, `RA08`) and may carry a trailing `N` (or an `N` just before
//! the stream digits) to denote logical negation. Detectors use the fixed form
//! `D<stream><sub>` (`D081`), optionally negated as `DN081` or `D081N`.

use crate::error::{Error, Location, Result};
use crate::variable::VariableKind;

/// A parsed identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedName {
    /// The name without the stream digits or negation marker.
    pub name: String,
    /// The stream number, if the identifier contains one.
    pub stream: Option<u8>,
    /// Whether the identifier carried a negation marker.
    pub negated: bool,
    /// The number of characters consumed, including leading whitespace.
    pub consumed: usize,
}

impl ParsedName {
    /// Parses the identifier at the start of `text`.
    ///
    /// `text` is expected to be upper case already. Parsing stops at the first
    /// character that is neither a letter nor a digit.
    pub fn parse(text: &str, location: Location) -> Result<Self> {
        let leading = text.len() - text.trim_start().len();
        let ident: Vec<char> = text[leading..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        let consumed = leading + ident.len();
        let location = location.at_column(location.column + leading);

        if ident.is_empty() {
            return Err(Error::syntax(location, "missing variable"));
        }

        if let Some(parsed) = Self::parse_detector(&ident, consumed) {
            return Ok(parsed);
        }

        let mut name = String::with_capacity(ident.len());
        let mut stream = None;
        let mut negated = false;
        let mut i = 0;
        while i < ident.len() {
            let c = ident[i];
            let next_is_digit = ident.get(i + 1).map_or(false, char::is_ascii_digit);
            if stream.is_none() && c.is_ascii_digit() && next_is_digit {
                if i == 0 || (i == 1 && ident[0] == 'N') {
                    return Err(Error::syntax(
                        location,
                        format!("bad variable name {}", ident.iter().collect::<String>()),
                    ));
                }
                if ident[i - 1] == 'N' {
                    // The N belonged to the stream, not to the name
                    name.pop();
                    negated = true;
                }
                stream = Some(two_digits(c, ident[i + 1]));
                i += 2;
            } else {
                name.push(c);
                i += 1;
            }
        }
        if !negated && name.len() > 1 && name.ends_with('N') {
            name.pop();
            negated = true;
        }

        Ok(Self {
            name,
            stream,
            negated,
            consumed,
        })
    }

    /// Recognises `D<ss><n>`, `DN<ss><n>` and `D<ss><n>N`.
    fn parse_detector(ident: &[char], consumed: usize) -> Option<Self> {
        let (digits, negated) = match ident {
            ['D', 'N', a, b, c] => ([*a, *b, *c], true),
            ['D', a, b, c, 'N'] => ([*a, *b, *c], true),
            ['D', a, b, c] => ([*a, *b, *c], false),
            _ => return None,
        };
        if !digits.iter().all(char::is_ascii_digit) {
            return None;
        }
        Some(Self {
            name: format!("D{}", digits[2]),
            stream: Some(two_digits(digits[0], digits[1])),
            negated,
            consumed,
        })
    }

    /// The kind of variable this name denotes.
    pub fn kind(&self) -> VariableKind {
        VariableKind::classify(&self.name)
    }
}

fn two_digits(tens: char, units: char) -> u8 {
    let digit = |c: char| c.to_digit(10).unwrap_or(0) as u8;
    10 * digit(tens) + digit(units)
}

/// Builds the canonical identifier of a variable, as used for lookups.
///
/// The stream is inserted before the first digit of the name, so that the
/// detector `D1` of stream 8 reads `D081`.
pub fn canonical_id(name: &str, stream: Option<u8>) -> String {
    match stream {
        Some(stream) => {
            let at = name.find(|c: char| c.is_ascii_digit()).unwrap_or(name.len());
            format!("{}{:02}{}", &name[..at], stream, &name[at..])
        }
        None => name.to_string(),
    }
}
