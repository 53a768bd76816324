//! Evaluation of rule expressions.
//!
//! Expressions are evaluated by precedence climbing over the token stream,
//! with operands kept on a small value stack. `expr` is called with the binding
//! strength of the pending operator to its left; a binary operator that binds
//! no more strongly than that is left for the caller to apply.

use crate::error::EvalError;
use crate::rule::Token;
use crate::{VariableId, VariableSet};
use smallvec::SmallVec;

/// Binding strength of the relational operators.
const BIND_RELATIONAL: u8 = 1;
/// Binding strength of `+` and `-`.
const BIND_ADDITION: u8 = 2;
/// Binding strength of `.`.
const BIND_MULTIPLY: u8 = 3;
/// Binding strength of unary minus.
const BIND_UNARY_MINUS: u8 = 4;

/// How deeply `expr` may recurse through parentheses and unary minus.
const MAX_NESTING: usize = 256;

/// The variable state an expression reads.
pub trait Operands {
    /// The value of a variable operand; timers read as `0` or `1`.
    fn value(&self, var: VariableId) -> i32;
    /// Whether the variable carries a start edge.
    fn has_started(&self, var: VariableId) -> bool;
    /// Whether the variable carries an end edge.
    fn has_ended(&self, var: VariableId) -> bool;
}

impl Operands for VariableSet {
    fn value(&self, var: VariableId) -> i32 {
        self[var].operand_value()
    }

    fn has_started(&self, var: VariableId) -> bool {
        self[var].has_started()
    }

    fn has_ended(&self, var: VariableId) -> bool {
        self[var].has_ended()
    }
}

/// Operands that are all zero, used to check the shape of an expression.
struct Unbound;

impl Operands for Unbound {
    fn value(&self, _: VariableId) -> i32 {
        0
    }

    fn has_started(&self, _: VariableId) -> bool {
        false
    }

    fn has_ended(&self, _: VariableId) -> bool {
        false
    }
}

/// Evaluates an expression.
pub fn evaluate(tokens: &[Token], operands: &impl Operands) -> Result<i32, EvalError> {
    let mut evaluator = Evaluator {
        tokens,
        pos: 0,
        depth: 0,
        stack: SmallVec::new(),
        operands,
    };
    evaluator.expr(0)?;
    if evaluator.pos < tokens.len() {
        return Err(EvalError::UnbalancedCloseParen);
    }
    evaluator.pop()
}

/// Checks that an expression is well formed, without reading any variables.
pub fn check(tokens: &[Token]) -> Result<(), EvalError> {
    evaluate(tokens, &Unbound).map(|_| ())
}

/// Applies a binary operator.
///
/// `.` and `+` are logical AND and OR, yielding `0` or `1`, whereas `-` is
/// plain subtraction.
pub fn apply(op: Token, left: i32, right: i32) -> i32 {
    match op {
        Token::Times => (left != 0 && right != 0) as i32,
        Token::Plus => (left != 0 || right != 0) as i32,
        Token::Minus => left.wrapping_sub(right),
        Token::Eq => (left == right) as i32,
        Token::NotEq => (left != right) as i32,
        Token::Lt => (left < right) as i32,
        Token::Le => (left <= right) as i32,
        Token::Gt => (left > right) as i32,
        Token::Ge => (left >= right) as i32,
        _ => unreachable!("{:?} is not a binary operator", op),
    }
}

struct Evaluator<'a, O> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    stack: SmallVec<[i32; 16]>,
    operands: &'a O,
}

impl<'a, O: Operands> Evaluator<'a, O> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn push(&mut self, value: i32) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<i32, EvalError> {
        self.stack.pop().ok_or(EvalError::StackUnderflow)
    }

    /// Evaluates an operand and any operators that bind more strongly than
    /// `binding`, leaving the result on the stack.
    fn expr(&mut self, binding: u8) -> Result<(), EvalError> {
        if self.depth == MAX_NESTING {
            return Err(EvalError::TooDeeplyNested);
        }
        self.depth += 1;
        let result = self.climb(binding);
        self.depth -= 1;
        result
    }

    fn climb(&mut self, binding: u8) -> Result<(), EvalError> {
        let token = self.peek().ok_or(EvalError::MissingOperand)?;
        self.pos += 1;
        match token {
            Token::UnaryMinus => {
                if !self.peek().map_or(false, starts_operand) {
                    return Err(EvalError::OperandExpected);
                }
                self.expr(BIND_UNARY_MINUS)?;
                let value = self.pop()?;
                self.push(value.wrapping_neg());
            }
            Token::OpenParen => {
                self.expr(0)?;
                if self.peek() != Some(Token::CloseParen) {
                    return Err(EvalError::MissingCloseParen);
                }
                self.pos += 1;
            }
            Token::Constant(value) => self.push(value),
            Token::Variable(var) => self.push(self.operands.value(var)),
            Token::NegVariable(var) => self.push((self.operands.value(var) == 0) as i32),
            Token::StartOf(var) => self.push(self.operands.has_started(var) as i32),
            Token::EndOf(var) => self.push(self.operands.has_ended(var) as i32),
            _ => return Err(EvalError::OperandExpected),
        }
        self.rhs(binding)
    }

    /// Applies binary operators for as long as they bind more strongly
    /// than `binding`.
    fn rhs(&mut self, binding: u8) -> Result<(), EvalError> {
        while let Some(token) = self.peek() {
            let strength = match token {
                Token::CloseParen => return Ok(()),
                Token::Times => BIND_MULTIPLY,
                Token::Plus | Token::Minus => BIND_ADDITION,
                Token::Eq | Token::NotEq | Token::Lt | Token::Le | Token::Gt | Token::Ge => {
                    BIND_RELATIONAL
                }
                _ => return Err(EvalError::MissingOperator),
            };
            if strength <= binding {
                return Ok(());
            }
            self.pos += 1;
            self.expr(strength)?;
            // The right operand was pushed last
            let right = self.pop()?;
            let left = self.pop()?;
            self.push(apply(token, left, right));
        }
        Ok(())
    }
}

fn starts_operand(token: Token) -> bool {
    matches!(
        token,
        Token::OpenParen
            | Token::Constant(_)
            | Token::Variable(_)
            | Token::NegVariable(_)
            | Token::StartOf(_)
            | Token::EndOf(_)
    )
}
