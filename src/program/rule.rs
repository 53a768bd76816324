use super::Program;
use crate::error::{Error, Location, Result};
use crate::eval;
use crate::name::ParsedName;
use crate::rule::{Rule, RuleKind, Token};
use crate::VariableId;

/// Parses a rule line, registering every variable it mentions.
///
/// The line must be trimmed; keywords and identifiers are case-insensitive.
pub(super) fn parse(program: &mut Program, line: &str, location: Location) -> Result<Rule> {
    let upper = line.to_ascii_uppercase();
    let mut cursor = Cursor {
        text: &upper,
        pos: 0,
        location,
    };

    let (kind, destination) = parse_destination(program, &mut cursor)?;
    let kind = parse_assignment(&mut cursor, kind)?;
    program.add_rule_source(destination, kind, location)?;
    let tokens = parse_expression(program, &mut cursor)?;

    eval::check(&tokens).map_err(|err| Error::syntax(location, err.to_string()))?;

    Ok(Rule {
        kind,
        destination,
        tokens,
        location,
        text: line.to_string(),
    })
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    location: Location,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.text.as_bytes().get(self.pos + offset).copied()
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn here(&self) -> Location {
        self.location.at_column(self.location.column + self.pos)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, |c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Consumes the next byte if it is `c`.
    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn name(&mut self) -> Result<ParsedName> {
        let name = ParsedName::parse(self.rest(), self.here())?;
        self.pos += name.consumed;
        Ok(name)
    }

    fn unexpected(&self) -> Error {
        match self.rest().chars().next() {
            Some(c) => Error::syntax(self.here(), format!("unexpected character {:?}", c)),
            None => Error::syntax(self.here(), "unexpected end of rule"),
        }
    }
}

/// Parses the optional rule kind marker and the destination variable.
fn parse_destination(program: &mut Program, cursor: &mut Cursor) -> Result<(RuleKind, VariableId)> {
    cursor.skip_whitespace();
    let start = cursor.here();
    let rest = cursor.rest();

    let kind = if rest.starts_with("RIT") {
        // The T belongs to the name of the timer
        cursor.pos += 2;
        RuleKind::ReinitTimer
    } else if rest.starts_with("IT") {
        cursor.pos += 1;
        RuleKind::InitTimer
    } else if cursor.eat(b'S') {
        RuleKind::Start
    } else if cursor.eat(b'E') {
        RuleKind::End
    } else {
        if rest.starts_with('T') && is_timer_assignment(rest) {
            return Err(Error::syntax(
                start,
                "a timer can only be started with IT or RIT",
            ));
        }
        RuleKind::Assign
    };

    let name = cursor.name()?;
    let kind = match (kind, name.negated) {
        (RuleKind::Assign, true) => RuleKind::NegAssign,
        (kind, false) => kind,
        (_, true) => {
            return Err(Error::syntax(
                start,
                "the destination of a start or end rule cannot be negated",
            ))
        }
    };
    Ok((kind, program.install(&name)))
}

/// Whether a rule assigns directly to a timer, with no negation before the `=`.
fn is_timer_assignment(rule: &str) -> bool {
    match (rule.find('='), rule.find('N')) {
        (Some(assign), Some(negation)) => negation > assign,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Parses `=` or `.=`, which may turn an assignment into a start or end rule.
fn parse_assignment(cursor: &mut Cursor, kind: RuleKind) -> Result<RuleKind> {
    cursor.skip_whitespace();
    if cursor.peek() == Some(b'.') && cursor.peek_at(1) == Some(b'=') {
        cursor.pos += 2;
        return Ok(match kind {
            RuleKind::Assign => RuleKind::Start,
            RuleKind::NegAssign => RuleKind::End,
            kind => kind,
        });
    }
    if cursor.eat(b'=') {
        return Ok(kind);
    }
    Err(Error::syntax(cursor.here(), "expected = or .="))
}

/// Tokenises the right hand side of a rule.
fn parse_expression(program: &mut Program, cursor: &mut Cursor) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    // Unary minus may appear at the start and after an opening parenthesis
    let mut operand_position = true;

    loop {
        cursor.skip_whitespace();
        let Some(c) = cursor.peek() else {
            return Ok(tokens);
        };
        if operand_position && c == b'-' {
            cursor.pos += 1;
            tokens.push(Token::UnaryMinus);
            operand_position = false;
            continue;
        }
        operand_position = false;

        let token = match c {
            b'0'..=b'9' => Token::Constant(parse_constant(cursor)?),
            b'+' | b'-' | b'.' | b')' | b'(' => {
                cursor.pos += 1;
                match c {
                    b'+' => Token::Plus,
                    b'-' => Token::Minus,
                    b'.' => Token::Times,
                    b')' => Token::CloseParen,
                    _ => {
                        operand_position = true;
                        Token::OpenParen
                    }
                }
            }
            b'<' => {
                cursor.pos += 1;
                if cursor.eat(b'=') {
                    Token::Le
                } else if cursor.eat(b'>') {
                    Token::NotEq
                } else {
                    Token::Lt
                }
            }
            b'>' => {
                cursor.pos += 1;
                if cursor.eat(b'=') {
                    Token::Ge
                } else if cursor.eat(b'<') {
                    Token::NotEq
                } else {
                    Token::Gt
                }
            }
            b'=' => {
                cursor.pos += 1;
                if cursor.eat(b'<') {
                    Token::Le
                } else if cursor.eat(b'>') {
                    Token::Ge
                } else {
                    Token::Eq
                }
            }
            b'S' | b'E' => {
                let location = cursor.here();
                cursor.pos += 1;
                let name = cursor.name()?;
                if name.negated {
                    return Err(Error::syntax(
                        location,
                        "S and E must be followed by a variable that is not negated",
                    ));
                }
                let id = reference(program, &name);
                if c == b'S' {
                    Token::StartOf(id)
                } else {
                    Token::EndOf(id)
                }
            }
            c if c.is_ascii_alphabetic() => {
                let name = cursor.name()?;
                let id = reference(program, &name);
                if name.negated {
                    Token::NegVariable(id)
                } else {
                    Token::Variable(id)
                }
            }
            _ => return Err(cursor.unexpected()),
        };
        tokens.push(token);
    }
}

fn parse_constant(cursor: &mut Cursor) -> Result<i32> {
    let location = cursor.here();
    let mut value: i32 = 0;
    while let Some(c) = cursor.peek().filter(u8::is_ascii_digit) {
        value = value
            .checked_mul(10)
            .and_then(|value| value.checked_add((c - b'0') as i32))
            .ok_or_else(|| Error::syntax(location, "number too large"))?;
        cursor.pos += 1;
    }
    Ok(value)
}

fn reference(program: &mut Program, name: &ParsedName) -> VariableId {
    let id = program.install(name);
    program.variables[id].add_reference();
    id
}
