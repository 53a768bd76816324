//! Tokenised TrafCOD rules.

use crate::error::{Location, RuleHalf};
use crate::{VariableId, VariableSet};
use std::fmt;

/// How a rule's result is applied to its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    /// `X=expr`
    Assign,
    /// `XN=expr`
    NegAssign,
    /// `X.=expr` or `SX.=expr`; only evaluated while `X` is inactive.
    Start,
    /// `XN.=expr` or `EX.=expr`; only evaluated while `X` is active.
    End,
    /// `ITX.=expr`; starts timer `TX` unless it is running.
    InitTimer,
    /// `RITX.=expr`; (re)starts timer `TX`.
    ReinitTimer,
}

/// An element of a rule's right hand side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    Constant(i32),
    Variable(VariableId),
    /// A variable followed by `N`.
    NegVariable(VariableId),
    /// `S` followed by a variable.
    StartOf(VariableId),
    /// `E` followed by a variable.
    EndOf(VariableId),
    UnaryMinus,
    Plus,
    Minus,
    /// `.`
    Times,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    OpenParen,
    CloseParen,
}

/// A tokenised rule.
#[derive(Clone, Debug)]
pub struct Rule {
    pub(crate) kind: RuleKind,
    pub(crate) destination: VariableId,
    pub(crate) tokens: Vec<Token>,
    pub(crate) location: Location,
    pub(crate) text: String,
}

impl RuleKind {
    /// The halves of the destination's activation logic this kind defines.
    pub(crate) fn halves(self) -> &'static [RuleHalf] {
        match self {
            RuleKind::Assign | RuleKind::NegAssign => &[RuleHalf::Start, RuleHalf::End],
            RuleKind::Start | RuleKind::InitTimer | RuleKind::ReinitTimer => &[RuleHalf::Start],
            RuleKind::End => &[RuleHalf::End],
        }
    }
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn destination(&self) -> VariableId {
        self.destination
    }

    /// Gets the right hand side.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Gets where the rule was defined.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Gets the rule as it was written.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Renders the tokenised rule, optionally showing the current value of
    /// every variable, e.g. `RA08<1>=TGL08N<0>`.
    pub(crate) fn render(&self, variables: &VariableSet, values: bool) -> String {
        let id = |var: VariableId| variables[var].id();
        let shown = |value: i32| {
            if values {
                format!("<{}>", value)
            } else {
                String::new()
            }
        };

        let dest = self.destination;
        let mut out = match self.kind {
            RuleKind::Assign => format!("{}{}=", id(dest), shown(variables[dest].value())),
            RuleKind::NegAssign => format!("{}N{}=", id(dest), shown(variables[dest].value())),
            RuleKind::Start => format!("{}.=", id(dest)),
            RuleKind::End => format!("{}N.=", id(dest)),
            RuleKind::InitTimer => format!("I{}.=", id(dest)),
            RuleKind::ReinitTimer => format!("RI{}.=", id(dest)),
        };
        for token in &self.tokens {
            let var = |var: VariableId| &variables[var];
            let text = match *token {
                Token::Constant(c) => c.to_string(),
                Token::Variable(v) => format!("{}{}", id(v), shown(var(v).value())),
                Token::NegVariable(v) => {
                    format!("{}N{}", id(v), shown((var(v).value() == 0) as i32))
                }
                Token::StartOf(v) => format!("S{}{}", id(v), shown(var(v).has_started() as i32)),
                Token::EndOf(v) => format!("E{}{}", id(v), shown(var(v).has_ended() as i32)),
                Token::UnaryMinus | Token::Minus => "-".into(),
                Token::Plus => "+".into(),
                Token::Times => ".".into(),
                Token::Eq => "=".into(),
                Token::NotEq => "<>".into(),
                Token::Lt => "<".into(),
                Token::Le => "<=".into(),
                Token::Gt => ">".into(),
                Token::Ge => ">=".into(),
                Token::OpenParen => "(".into(),
                Token::CloseParen => ")".into(),
            };
            out.push_str(&text);
        }
        out
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Assign => "assignment",
            RuleKind::NegAssign => "negated assignment",
            RuleKind::Start => "start rule",
            RuleKind::End => "end rule",
            RuleKind::InitTimer => "timer initialisation",
            RuleKind::ReinitTimer => "timer re-initialisation",
        };
        f.write_str(name)
    }
}
