//! Scaling formula engine
//!
//! Calibration cells are stored as raw 8/16-bit integers and displayed in
//! engineering units through a per-map scaling formula such as `X*0.05` or
//! `(X-40)/2`. This module parses and evaluates those formulas with a small
//! embedded grammar (`+ - * / ( )`, numeric literals and the single free
//! variable `X`) instead of handing user text to a general evaluator.
//!
//! Forward evaluation never fails: a malformed formula degrades to the
//! identity transform. Reverse evaluation (engineering value back to raw
//! byte) is best effort, since formulas are not guaranteed invertible in
//! closed form.

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Formula AST
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(f64),
    /// The raw-value variable `X`
    Variable,
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Neg(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Variable,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' | '\r' | '\n' => continue,
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            'x' | 'X' => tokens.push(Token::Variable),
            ch if ch.is_ascii_digit() || ch == '.' => {
                let mut s = String::new();
                s.push(ch);
                while let Some(&next_ch) = chars.peek() {
                    if next_ch.is_ascii_digit() || next_ch == '.' {
                        s.push(chars.next().unwrap());
                    } else {
                        break;
                    }
                }
                match s.parse::<f64>() {
                    Ok(n) => tokens.push(Token::Number(n)),
                    Err(_) => return Err(format!("Invalid number: {}", s)),
                }
            }
            other => return Err(format!("Unexpected character: {}", other)),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(&mut self) -> Result<Expr, String> {
        let expr = self.parse_additive()?;
        if self.pos != self.tokens.len() {
            return Err("Trailing tokens".to_string());
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut node = self.parse_multiplicative()?;
        loop {
            let op = if self.match_token(Token::Plus) {
                BinOp::Add
            } else if self.match_token(Token::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            node = Expr::Binary(Box::new(node), op, Box::new(right));
        }
        Ok(node)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut node = self.parse_unary()?;
        loop {
            let op = if self.match_token(Token::Star) {
                BinOp::Mul
            } else if self.match_token(Token::Slash) {
                BinOp::Div
            } else {
                break;
            };
            let right = self.parse_unary()?;
            node = Expr::Binary(Box::new(node), op, Box::new(right));
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.match_token(Token::Minus) {
            Ok(Expr::Neg(Box::new(self.parse_unary()?)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(*n)),
            Some(Token::Variable) => Ok(Expr::Variable),
            Some(Token::LParen) => {
                let expr = self.parse_additive()?;
                if !self.match_token(Token::RParen) {
                    return Err("Expected ')'".to_string());
                }
                Ok(expr)
            }
            _ => Err("Unexpected token".to_string()),
        }
    }

    fn advance(&mut self) -> Option<&Token> {
        if self.pos < self.tokens.len() {
            let token = &self.tokens[self.pos];
            self.pos += 1;
            Some(token)
        } else {
            None
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.tokens.get(self.pos) == Some(&token) {
            self.pos += 1;
            return true;
        }
        false
    }
}

fn eval_expr(expr: &Expr, raw: f64) -> f64 {
    match expr {
        Expr::Literal(n) => *n,
        Expr::Variable => raw,
        Expr::Neg(inner) => -eval_expr(inner, raw),
        Expr::Binary(left, op, right) => {
            let l = eval_expr(left, raw);
            let r = eval_expr(right, raw);
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => {
                    if r == 0.0 {
                        0.0
                    } else {
                        l / r
                    }
                }
            }
        }
    }
}

/// A parsed scaling formula
///
/// Parse once per map, evaluate once per cell. A formula that failed to
/// parse still evaluates, as the identity transform.
#[derive(Debug, Clone)]
pub struct Formula {
    expr: Option<Expr>,
}

impl Formula {
    /// Parse a formula. Malformed input yields the identity formula.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self { expr: None };
        }
        let expr = lex(trimmed)
            .and_then(|tokens| Parser::new(tokens).parse())
            .ok();
        Self { expr }
    }

    /// Forward evaluation: raw stored integer to engineering value
    pub fn forward(&self, raw: f64) -> f64 {
        match &self.expr {
            Some(expr) => eval_expr(expr, raw),
            None => raw,
        }
    }

    /// Reverse evaluation: engineering value back to a raw integer.
    ///
    /// - bare `X` (or unparseable text): `target` rounded
    /// - `X/k`, `X*k`, `k*X`: exact analytic inverse, rounded
    /// - anything else at 8-bit width: exhaustive scan of all 256 raw
    ///   values, picking the one whose forward value is closest to `target`
    ///   (ties go to the lowest raw value)
    /// - anything else at 16-bit width: a lone `*k` or `/k` factor found in
    ///   the normalized text is inverted; failing that, `target` rounded.
    ///   The 65,536-candidate scan is not worth its cost per edited cell.
    pub fn reverse(&self, target: f64, data_size: u8) -> i64 {
        let expr = match &self.expr {
            Some(expr) => expr,
            None => return target.round() as i64,
        };

        match expr {
            Expr::Variable => target.round() as i64,
            Expr::Binary(l, BinOp::Div, r) if **l == Expr::Variable => {
                if let Expr::Literal(k) = **r {
                    if k != 0.0 {
                        return (target * k).round() as i64;
                    }
                }
                self.reverse_fallback(target, data_size)
            }
            Expr::Binary(l, BinOp::Mul, r) => match (&**l, &**r) {
                (Expr::Variable, Expr::Literal(k)) | (Expr::Literal(k), Expr::Variable)
                    if *k != 0.0 =>
                {
                    (target / k).round() as i64
                }
                _ => self.reverse_fallback(target, data_size),
            },
            _ => self.reverse_fallback(target, data_size),
        }
    }

    fn reverse_fallback(&self, target: f64, data_size: u8) -> i64 {
        if data_size == 8 {
            // Bounded domain: try every raw byte and keep the closest.
            let mut best_raw = 0i64;
            let mut best_err = f64::INFINITY;
            for raw in 0..=255i64 {
                let err = (self.forward(raw as f64) - target).abs();
                if err < best_err {
                    best_err = err;
                    best_raw = raw;
                }
            }
            best_raw
        } else if let Some(raw) = invert_single_factor(&self.normalized(), target) {
            raw
        } else {
            target.round() as i64
        }
    }

    fn normalized(&self) -> String {
        match &self.expr {
            Some(expr) => render(expr),
            None => String::new(),
        }
    }
}

fn render(expr: &Expr) -> String {
    match expr {
        Expr::Literal(n) => format!("{}", n),
        Expr::Variable => "X".to_string(),
        Expr::Neg(inner) => format!("-{}", render(inner)),
        Expr::Binary(l, op, r) => {
            let op = match op {
                BinOp::Add => '+',
                BinOp::Sub => '-',
                BinOp::Mul => '*',
                BinOp::Div => '/',
            };
            format!("{}{}{}", render(l), op, render(r))
        }
    }
}

/// Find the first `*factor` or `/factor` in a normalized (whitespace-free)
/// expression and invert just that factor against `target`.
fn invert_single_factor(normalized: &str, target: f64) -> Option<i64> {
    let bytes = normalized.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'*' && b != b'/' {
            continue;
        }
        let rest = &normalized[i + 1..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if let Ok(k) = rest[..end].parse::<f64>() {
            if k != 0.0 {
                let raw = if b == b'*' { target / k } else { target * k };
                return Some(raw.round() as i64);
            }
        }
    }
    None
}

/// Convenience wrapper: parse and forward-evaluate in one call
pub fn evaluate(formula: &str, raw: f64) -> f64 {
    Formula::parse(formula).forward(raw)
}

/// Convenience wrapper: parse and reverse-evaluate in one call
pub fn solve_raw(formula: &str, target: f64, data_size: u8) -> i64 {
    Formula::parse(formula).reverse(target, data_size)
}
