//! Arithmetic and comparison evaluation
//!
//! Used in two places: the automatic calculation pass that runs after
//! placeholder substitution, and expression conditions on `if` blocks.
//!
//! Supported grammar, lowest precedence first:
//!
//! - `or` / `||`
//! - `and` / `&&`
//! - `not` / `!`
//! - comparisons `= == <> != < <= > >=`
//! - `+ -`
//! - `* / %`
//! - unary `-`, parentheses, numbers, quoted text, `true` / `false`

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// Characters whose presence makes text a candidate for calculation
pub const CALC_OPERATORS: [char; 5] = ['*', '+', '-', '=', '/'];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d/%m/%Y %H:%M:%S",
];

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum CalcValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CalcValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            CalcValue::Bool(b) => *b,
            CalcValue::Number(n) => *n != 0.0,
            CalcValue::Text(s) => {
                let s = s.trim();
                !s.is_empty() && !s.eq_ignore_ascii_case("false") && s != "0"
            }
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            CalcValue::Number(n) => Some(*n),
            CalcValue::Text(s) => s.trim().parse().ok(),
            CalcValue::Bool(_) => None,
        }
    }

    fn as_bool(&self) -> Result<bool> {
        match self {
            CalcValue::Bool(b) => Ok(*b),
            other => Err(anyhow!("Expected a boolean but found {}", other)),
        }
    }
}

impl fmt::Display for CalcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcValue::Number(n) => write!(f, "{}", format_number(*n)),
            CalcValue::Text(s) => write!(f, "{}", s),
            CalcValue::Bool(true) => write!(f, "True"),
            CalcValue::Bool(false) => write!(f, "False"),
        }
    }
}

/// Render integral results without a fractional part
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Apply the automatic calculation pass to resolved text.
///
/// Text is left untouched when it is a lone operator, starts with an
/// operator, parses as a date or time, contains no operator, or fails to
/// evaluate.
pub fn auto_calculate(text: &str) -> String {
    let Some(first) = text.chars().next() else {
        return text.to_string();
    };
    if CALC_OPERATORS.contains(&first) {
        return text.to_string();
    }
    if !text.contains(&CALC_OPERATORS[..]) {
        return text.to_string();
    }
    if text.chars().count() > 6 && looks_like_date(text) {
        return text.to_string();
    }
    match evaluate(text) {
        Ok(value) => value.to_string(),
        Err(_) => text.to_string(),
    }
}

/// Whether the text parses as a date or a date and time
pub fn looks_like_date(text: &str) -> bool {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text).is_ok()
        || DateTime::parse_from_rfc2822(text).is_ok()
        || DATE_FORMATS
            .iter()
            .any(|format| NaiveDate::parse_from_str(text, format).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(text, format).is_ok())
}

/// Evaluate an expression
pub fn evaluate(expression: &str) -> Result<CalcValue> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        bail!("Empty expression");
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.parse_or()?;
    if let Some(token) = tokens.get(parser.pos) {
        bail!("Unexpected token {:?} in '{}'", token, expression);
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Boolean(bool),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    Not,
    LeftParen,
    RightParen,
}

/// Parse comparison and logical operators with one character of lookahead
fn parse_operator(ch: char, chars: &mut Peekable<Chars>) -> Result<Token> {
    chars.next();
    let token = match ch {
        '=' => {
            if chars.peek() == Some(&'=') {
                chars.next();
            }
            Token::Equal
        }
        '!' => {
            if chars.peek() == Some(&'=') {
                chars.next();
                Token::NotEqual
            } else {
                Token::Not
            }
        }
        '<' => match chars.peek() {
            Some('=') => {
                chars.next();
                Token::LessEqual
            }
            Some('>') => {
                chars.next();
                Token::NotEqual
            }
            _ => Token::Less,
        },
        '>' => {
            if chars.peek() == Some(&'=') {
                chars.next();
                Token::GreaterEqual
            } else {
                Token::Greater
            }
        }
        '&' | '|' => {
            if chars.peek() != Some(&ch) {
                bail!("Expected {ch}{ch} but got single {ch}");
            }
            chars.next();
            if ch == '&' {
                Token::And
            } else {
                Token::Or
            }
        }
        _ => bail!("Unexpected operator '{}'", ch),
    };
    Ok(token)
}

fn parse_string(quote: char, chars: &mut Peekable<Chars>) -> Result<String> {
    let mut string = String::new();
    for ch in chars.by_ref() {
        if ch == quote {
            return Ok(string);
        }
        string.push(ch);
    }
    bail!("Unterminated string literal")
}

fn parse_number(chars: &mut Peekable<Chars>) -> Result<f64> {
    let mut num_str = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_digit() || ch == '.' {
            num_str.push(ch);
            chars.next();
        } else {
            break;
        }
    }
    num_str
        .parse::<f64>()
        .map_err(|_| anyhow!("Invalid number: {}", num_str))
}

fn parse_word(chars: &mut Peekable<Chars>) -> Result<Token> {
    let mut word = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_alphanumeric() || ch == '_' {
            word.push(ch);
            chars.next();
        } else {
            break;
        }
    }
    match word.to_lowercase().as_str() {
        "true" => Ok(Token::Boolean(true)),
        "false" => Ok(Token::Boolean(false)),
        "and" => Ok(Token::And),
        "or" => Ok(Token::Or),
        "not" => Ok(Token::Not),
        _ => bail!("Unknown identifier '{}'", word),
    }
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&ch) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => Token::Number(parse_number(&mut chars)?),
            '\'' | '"' => {
                chars.next();
                Token::Text(parse_string(ch, &mut chars)?)
            }
            '=' | '!' | '<' | '>' | '&' | '|' => parse_operator(ch, &mut chars)?,
            '+' | '-' | '*' | '/' | '%' | '(' | ')' => {
                chars.next();
                match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LeftParen,
                    _ => Token::RightParen,
                }
            }
            c if c.is_alphabetic() || c == '_' => parse_word(&mut chars)?,
            other => bail!("Unexpected character '{}'", other),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Deepest nesting of parentheses and prefix operators the parser accepts
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            bail!("Expression nests deeper than {} levels", MAX_DEPTH);
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<CalcValue> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = CalcValue::Bool(left.as_bool()? || right.as_bool()?);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<CalcValue> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = CalcValue::Bool(left.as_bool()? && right.as_bool()?);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<CalcValue> {
        if self.eat(&Token::Not) {
            let value = self.nested(Self::parse_not)?;
            return Ok(CalcValue::Bool(!value.as_bool()?));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<CalcValue> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Some(
                op @ (Token::Equal
                | Token::NotEqual
                | Token::Less
                | Token::LessEqual
                | Token::Greater
                | Token::GreaterEqual),
            ) => op.clone(),
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_additive()?;
        compare(&left, &op, &right).map(CalcValue::Bool)
    }

    fn parse_additive(&mut self) -> Result<CalcValue> {
        let mut left = self.parse_multiplicative()?;
        loop {
            if self.eat(&Token::Plus) {
                let right = self.parse_multiplicative()?;
                left = match (&left, &right) {
                    (CalcValue::Number(a), CalcValue::Number(b)) => CalcValue::Number(a + b),
                    (CalcValue::Text(_), _) | (_, CalcValue::Text(_)) => {
                        CalcValue::Text(format!("{}{}", left, right))
                    }
                    _ => bail!("Cannot add {} and {}", left, right),
                };
            } else if self.eat(&Token::Minus) {
                let right = self.parse_multiplicative()?;
                left = CalcValue::Number(number(&left)? - number(&right)?);
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_multiplicative(&mut self) -> Result<CalcValue> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(op @ (Token::Star | Token::Slash | Token::Percent)) => op.clone(),
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            let (a, b) = (number(&left)?, number(&right)?);
            left = CalcValue::Number(match op {
                Token::Star => a * b,
                Token::Slash if b == 0.0 => bail!("Division by zero"),
                Token::Slash => a / b,
                Token::Percent if b == 0.0 => bail!("Modulo by zero"),
                _ => a % b,
            });
        }
    }

    fn parse_unary(&mut self) -> Result<CalcValue> {
        if self.eat(&Token::Minus) {
            let value = self.nested(Self::parse_unary)?;
            return Ok(CalcValue::Number(-number(&value)?));
        }
        if self.eat(&Token::Plus) {
            return self.nested(Self::parse_unary);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<CalcValue> {
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(CalcValue::Number(n)),
            Some(Token::Text(s)) => Ok(CalcValue::Text(s)),
            Some(Token::Boolean(b)) => Ok(CalcValue::Bool(b)),
            Some(Token::LeftParen) => {
                let value = self.nested(Self::parse_or)?;
                if !self.eat(&Token::RightParen) {
                    bail!("Mismatched parentheses");
                }
                Ok(value)
            }
            Some(token) => bail!("Unexpected token {:?}", token),
            None => bail!("Unexpected end of expression"),
        }
    }
}

fn number(value: &CalcValue) -> Result<f64> {
    value
        .as_number()
        .ok_or_else(|| anyhow!("Expected a number but found '{}'", value))
}

fn compare(left: &CalcValue, op: &Token, right: &CalcValue) -> Result<bool> {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (CalcValue::Bool(a), CalcValue::Bool(b)) => match op {
            Token::Equal => return Ok(a == b),
            Token::NotEqual => return Ok(a != b),
            _ => bail!("Booleans can only be compared for equality"),
        },
        (CalcValue::Text(a), CalcValue::Text(b)) => a.cmp(b),
        _ => {
            let (a, b) = (number(left)?, number(right)?);
            a.partial_cmp(&b)
                .ok_or_else(|| anyhow!("Cannot compare {} and {}", a, b))?
        }
    };

    Ok(match op {
        Token::Equal => ordering == Ordering::Equal,
        Token::NotEqual => ordering != Ordering::Equal,
        Token::Less => ordering == Ordering::Less,
        Token::LessEqual => ordering != Ordering::Greater,
        Token::Greater => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}
