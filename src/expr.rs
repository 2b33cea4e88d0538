//! A tiny arithmetic language over `x`, `y` and `z`, compiled once to reverse polish notation
//! and evaluated many times per ray.
//!
//! Precedence is `+ -` < `* /` < `^`. Every operator is left associative, `^` included, so
//! `2^3^2` is `(2^3)^2 = 64`. Scene files written for this renderer depend on that.

use glam::DVec3;
use smallvec::SmallVec;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Reasons a formula can fail to compile. Offsets are byte offsets into the source text.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ExprError {
    #[error("malformed expression: empty formula")]
    Empty,
    #[error("malformed expression: unexpected character {ch:?} at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },
    #[error("malformed expression: invalid number {text:?} at offset {offset}")]
    InvalidNumber { text: String, offset: usize },
    #[error("malformed expression: missing operand at offset {offset}")]
    MissingOperand { offset: usize },
    #[error("malformed expression: missing operator at offset {offset}")]
    MissingOperator { offset: usize },
    #[error("malformed expression: unbalanced parenthesis at offset {offset}")]
    UnbalancedParenthesis { offset: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Sub),
            '*' => Some(BinaryOp::Mul),
            '/' => Some(BinaryOp::Div),
            '^' => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    pub fn priority(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 3,
        }
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Pow => lhs.powf(rhs),
        }
    }

    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::Pow => '^',
        }
    }
}

/// One instruction of a compiled program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Token {
    Constant(f64),
    X,
    Y,
    Z,
    Op(BinaryOp),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Constant(c) => write!(f, "{}", c),
            Token::X => f.write_str("x"),
            Token::Y => f.write_str("y"),
            Token::Z => f.write_str("z"),
            Token::Op(op) => write!(f, "{}", op.symbol()),
        }
    }
}

// Entries of the operator stack during compilation
#[derive(Clone, Copy)]
enum Pending {
    Paren { offset: usize },
    Op(BinaryOp),
}

impl Pending {
    // Parentheses have the lowest priority so operators never flush past them
    fn priority(self) -> u8 {
        match self {
            Pending::Paren { .. } => 0,
            Pending::Op(op) => op.priority(),
        }
    }
}

/// Compiles `expr` into a post-fix program using the shunting-yard algorithm.
///
/// The returned program is well formed: evaluating it never runs out of operands and always leaves
/// exactly one value.
pub fn to_rpn(expr: &str) -> Result<Vec<Token>, ExprError> {
    let mut output = Vec::new();
    let mut ops: Vec<Pending> = Vec::new();
    // True when the next token has to be a number, a variable or an opening parenthesis
    let mut expect_operand = true;
    let mut chars = expr.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => {
                if !expect_operand {
                    return Err(ExprError::MissingOperator { offset });
                }
                ops.push(Pending::Paren { offset });
            }
            ')' => {
                if expect_operand {
                    return Err(ExprError::MissingOperand { offset });
                }
                loop {
                    match ops.pop() {
                        Some(Pending::Op(op)) => output.push(Token::Op(op)),
                        Some(Pending::Paren { .. }) => break,
                        None => return Err(ExprError::UnbalancedParenthesis { offset }),
                    }
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                if !expect_operand {
                    return Err(ExprError::MissingOperator { offset });
                }
                let mut end = offset + c.len_utf8();
                while let Some(&(next, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = next + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &expr[offset..end];
                let value = text.parse::<f64>().map_err(|_| ExprError::InvalidNumber {
                    text: text.to_owned(),
                    offset,
                })?;
                output.push(Token::Constant(value));
                expect_operand = false;
            }
            'x' | 'X' | 'y' | 'Y' | 'z' | 'Z' => {
                if !expect_operand {
                    return Err(ExprError::MissingOperator { offset });
                }
                output.push(match c.to_ascii_lowercase() {
                    'x' => Token::X,
                    'y' => Token::Y,
                    _ => Token::Z,
                });
                expect_operand = false;
            }
            c => {
                let op = BinaryOp::from_char(c)
                    .ok_or(ExprError::UnexpectedCharacter { ch: c, offset })?;
                if expect_operand {
                    return Err(ExprError::MissingOperand { offset });
                }
                while let Some(&top) = ops.last() {
                    match top {
                        Pending::Op(pending) if top.priority() >= op.priority() => {
                            output.push(Token::Op(pending));
                            ops.pop();
                        }
                        _ => break,
                    }
                }
                ops.push(Pending::Op(op));
                expect_operand = true;
            }
        }
    }

    if output.is_empty() && ops.is_empty() {
        return Err(ExprError::Empty);
    }
    if expect_operand {
        return Err(ExprError::MissingOperand { offset: expr.len() });
    }

    while let Some(pending) = ops.pop() {
        match pending {
            Pending::Op(op) => output.push(Token::Op(op)),
            Pending::Paren { offset } => return Err(ExprError::UnbalancedParenthesis { offset }),
        }
    }

    Ok(output)
}

/// A compiled formula. Immutable, so it can be evaluated from any number of threads.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    program: Vec<Token>,
    depth: usize,
}

// Stack depth that covers every formula a scene file is likely to contain
type EvalStack = SmallVec<[f64; 16]>;

impl Expression {
    pub fn compile(expr: &str) -> Result<Self, ExprError> {
        let program = to_rpn(expr)?;
        let depth = program
            .iter()
            .scan(0usize, |depth, token| {
                match token {
                    Token::Op(_) => *depth -= 1,
                    _ => *depth += 1,
                }
                Some(*depth)
            })
            .max()
            .unwrap_or(0);

        let expression = Self { program, depth };
        log::debug!("compiled {:?} to `{}`", expr, expression);
        Ok(expression)
    }

    pub fn program(&self) -> &[Token] {
        &self.program
    }

    pub fn eval(&self, x: f64, y: f64, z: f64) -> f64 {
        let mut stack = EvalStack::with_capacity(self.depth);

        for token in &self.program {
            match *token {
                Token::Constant(c) => stack.push(c),
                Token::X => stack.push(x),
                Token::Y => stack.push(y),
                Token::Z => stack.push(z),
                Token::Op(op) => {
                    // to_rpn guarantees two operands for every operator
                    let rhs = stack.pop().unwrap_or(f64::NAN);
                    let lhs = stack.pop().unwrap_or(f64::NAN);
                    stack.push(op.apply(lhs, rhs));
                }
            }
        }

        stack.pop().unwrap_or(f64::NAN)
    }

    pub fn eval_at(&self, p: DVec3) -> f64 {
        self.eval(p.x, p.y, p.z)
    }
}

impl FromStr for Expression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::compile(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.program.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}
