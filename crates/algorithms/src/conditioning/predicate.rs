//! No-data predicate expressions
//!
//! A small boolean language over the elevation of a single cell, used to
//! mark cells as missing. Examples:
//!
//! - `"z <= 0"`
//! - `"elevation <= 0 or elevation > 1000"`
//! - `"dem.z < -100 | isnan(z)"`
//! - `"not (abs(z - 50) < 10)"`
//!
//! The elevation may be referred to as `z`, `elevation`, `elev`, `dem` or
//! `dem.z` (case-insensitive). Supported operators, lowest precedence
//! first: `or`/`||`/`|`, `and`/`&&`/`&`, `not`/`!`/`~`, comparisons
//! (`<`, `<=`, `>`, `>=`, `==`, `!=`, `~=`), `+ -`, `* /`, unary minus.
//! Functions: `isnan(x)`, `abs(x)`.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use crate::maybe_rayon::*;
use swathflow_core::raster::Raster;
use swathflow_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Arith(char),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    IsNan,
    Abs,
}

#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    Elevation,
    Neg(Box<Expr>),
    Arith {
        op: char,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Cmp {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Call(Func, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Num(f64),
    Bool(bool),
}

fn syntax(msg: impl Into<String>) -> Error {
    Error::InvalidParameter {
        name: "nodata",
        value: String::new(),
        reason: msg.into(),
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let next_is = |i: usize, c: char| chars.get(i + 1) == Some(&c);

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Arith(chars[i]));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '<' | '>' => {
                let strict = chars[i] == '<';
                let or_equal = next_is(i, '=');
                tokens.push(Token::Cmp(match (strict, or_equal) {
                    (true, false) => CmpOp::Lt,
                    (true, true) => CmpOp::Le,
                    (false, false) => CmpOp::Gt,
                    (false, true) => CmpOp::Ge,
                }));
                i += if or_equal { 2 } else { 1 };
            }
            '=' if next_is(i, '=') => {
                tokens.push(Token::Cmp(CmpOp::Eq));
                i += 2;
            }
            '!' | '~' if next_is(i, '=') => {
                tokens.push(Token::Cmp(CmpOp::Ne));
                i += 2;
            }
            '!' | '~' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '&' => {
                tokens.push(Token::And);
                i += if next_is(i, '&') { 2 } else { 1 };
            }
            '|' => {
                tokens.push(Token::Or);
                i += if next_is(i, '|') { 2 } else { 1 };
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let num = text
                    .parse::<f64>()
                    .map_err(|_| syntax(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(num));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect::<String>().to_ascii_lowercase();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                });
            }
            c => return Err(syntax(format!("unexpected character '{}'", c))),
        }
    }

    Ok(tokens)
}

/// Longest accepted token stream; bounds the depth of operator chains
const MAX_TOKENS: usize = 1024;
/// Deepest accepted nesting of parentheses, calls and unary operators
const MAX_NESTING: usize = 256;

/// Recursive descent parser for predicate expressions
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Run `f` one nesting level deeper
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<Expr>) -> Result<Expr> {
        if self.depth >= MAX_NESTING {
            return Err(syntax("expression nested too deeply"));
        }
        self.depth += 1;
        let expr = f(self);
        self.depth -= 1;
        expr
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse(mut self) -> Result<Expr> {
        if self.tokens.len() > MAX_TOKENS {
            return Err(syntax(format!(
                "expression too long ({} tokens, at most {})",
                self.tokens.len(),
                MAX_TOKENS
            )));
        }
        let expr = self.parse_or()?;
        match self.peek() {
            None => Ok(expr),
            Some(t) => Err(syntax(format!("unexpected trailing {:?}", t))),
        }
    }

    /// or = and ('or' and)*
    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while let Some(Token::Or) = self.peek() {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// and = not ('and' not)*
    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while let Some(Token::And) = self.peek() {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// not = 'not' not | cmp
    fn parse_not(&mut self) -> Result<Expr> {
        if let Some(Token::Not) = self.peek() {
            self.advance();
            let inner = self.nested(Self::parse_not)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_cmp()
    }

    /// cmp = sum (cmp_op sum)?
    fn parse_cmp(&mut self) -> Result<Expr> {
        let left = self.parse_sum()?;
        if let Some(&Token::Cmp(op)) = self.peek() {
            self.advance();
            let right = self.parse_sum()?;
            return Ok(Expr::Cmp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// sum = term (('+' | '-') term)*
    fn parse_sum(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        while let Some(&Token::Arith(op @ ('+' | '-'))) = self.peek() {
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// term = factor (('*' | '/') factor)*
    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_factor()?;
        while let Some(&Token::Arith(op @ ('*' | '/'))) = self.peek() {
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// factor = number | ident | func '(' or ')' | '(' or ')' | '-' factor
    fn parse_factor(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Num(n)),
            Some(Token::Ident(name)) => match name.as_str() {
                "z" | "elevation" | "elev" | "dem" | "dem.z" => Ok(Expr::Elevation),
                "isnan" | "abs" => {
                    let func = if name == "isnan" { Func::IsNan } else { Func::Abs };
                    self.expect(Token::LParen)?;
                    let arg = self.nested(Self::parse_or)?;
                    self.expect(Token::RParen)?;
                    Ok(Expr::Call(func, Box::new(arg)))
                }
                "nan" => Ok(Expr::Num(f64::NAN)),
                "inf" => Ok(Expr::Num(f64::INFINITY)),
                _ => Err(syntax(format!("unknown identifier '{}'", name))),
            },
            Some(Token::LParen) => {
                let expr = self.nested(Self::parse_or)?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Arith('-')) => {
                let inner = self.nested(Self::parse_factor)?;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Token::Arith('+')) => self.nested(Self::parse_factor),
            other => Err(syntax(format!("unexpected token {:?}", other))),
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        match self.advance() {
            Some(t) if t == token => Ok(()),
            other => Err(syntax(format!("expected {:?}, found {:?}", token, other))),
        }
    }
}

fn eval(expr: &Expr, z: f64) -> Result<Value> {
    let num = |e: &Expr| -> Result<f64> {
        match eval(e, z)? {
            Value::Num(n) => Ok(n),
            Value::Bool(_) => Err(Error::Algorithm("expected a number, found a boolean".into())),
        }
    };
    let boolean = |e: &Expr| -> Result<bool> {
        match eval(e, z)? {
            Value::Bool(b) => Ok(b),
            Value::Num(_) => Err(Error::Algorithm("expected a boolean, found a number".into())),
        }
    };

    Ok(match expr {
        Expr::Num(n) => Value::Num(*n),
        Expr::Elevation => Value::Num(z),
        Expr::Neg(inner) => Value::Num(-num(inner)?),
        Expr::Arith { op, left, right } => {
            let (l, r) = (num(left)?, num(right)?);
            Value::Num(match op {
                '+' => l + r,
                '-' => l - r,
                '*' => l * r,
                _ => l / r,
            })
        }
        Expr::Cmp { op, left, right } => {
            let (l, r) = (num(left)?, num(right)?);
            Value::Bool(match op {
                CmpOp::Lt => l < r,
                CmpOp::Le => l <= r,
                CmpOp::Gt => l > r,
                CmpOp::Ge => l >= r,
                CmpOp::Eq => l == r,
                CmpOp::Ne => l != r,
            })
        }
        Expr::And(left, right) => Value::Bool(boolean(left)? & boolean(right)?),
        Expr::Or(left, right) => Value::Bool(boolean(left)? | boolean(right)?),
        Expr::Not(inner) => Value::Bool(!boolean(inner)?),
        Expr::Call(Func::IsNan, arg) => Value::Bool(num(arg)?.is_nan()),
        Expr::Call(Func::Abs, arg) => Value::Num(num(arg)?.abs()),
    })
}

/// A parsed no-data predicate
#[derive(Debug, Clone)]
pub struct NoDataPredicate {
    source: String,
    expr: Expr,
}

impl NoDataPredicate {
    /// Parse a predicate expression
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source).map_err(|e| with_source(e, source))?;
        if tokens.is_empty() {
            return Err(with_source(syntax("empty expression"), source));
        }
        let expr = Parser::new(tokens)
            .parse()
            .map_err(|e| with_source(e, source))?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The expression text as given
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether a cell of elevation `z` is missing.
    ///
    /// Fails if the expression does not produce a boolean.
    pub fn evaluate(&self, z: f64) -> Result<bool> {
        match eval(&self.expr, z)? {
            Value::Bool(b) => Ok(b),
            Value::Num(_) => Err(Error::Algorithm(format!(
                "predicate '{}' yields a number, not a boolean",
                self.source
            ))),
        }
    }

    /// Evaluate the predicate over every cell of `dem`
    pub fn mask(&self, dem: &Raster<f64>) -> Result<Array2<bool>> {
        let (rows, cols) = dem.shape();

        let row_masks: Vec<Result<Vec<bool>>> = (0..rows)
            .into_par_iter()
            .map(|row| {
                (0..cols)
                    .map(|col| self.evaluate(unsafe { dem.get_unchecked(row, col) }))
                    .collect()
            })
            .collect();

        let mut data = Vec::with_capacity(rows * cols);
        for row in row_masks {
            data.extend(row?);
        }

        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
    }
}

fn with_source(err: Error, source: &str) -> Error {
    match err {
        Error::InvalidParameter { name, reason, .. } => Error::InvalidParameter {
            name,
            value: source.to_string(),
            reason,
        },
        other => other,
    }
}

impl FromStr for NoDataPredicate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NoDataPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
