use std::fmt::Display;

use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Literals
    IntegerConst(i64),
    RealConst(f64),
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,

    // Punctuation
    Assign,
    Semicolon,
    Dot,
    Colon,
    Comma,
    LeftParen,
    RightParen,

    // Reserved words
    Program,
    Var,
    Begin,
    End,
    Procedure,
    Div,
    Integer,
    Real,

    // End of input
    Eof,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::IntegerConst(n) => write!(f, "{}", n),
            TokenType::RealConst(n) => write!(f, "{}", n),
            TokenType::Identifier(name) => write!(f, "{}", name),
            TokenType::Plus => write!(f, "+"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Star => write!(f, "*"),
            TokenType::Slash => write!(f, "/"),
            TokenType::Assign => write!(f, ":="),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Dot => write!(f, "."),
            TokenType::Colon => write!(f, ":"),
            TokenType::Comma => write!(f, ","),
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::Program => write!(f, "PROGRAM"),
            TokenType::Var => write!(f, "VAR"),
            TokenType::Begin => write!(f, "BEGIN"),
            TokenType::End => write!(f, "END"),
            TokenType::Procedure => write!(f, "PROCEDURE"),
            TokenType::Div => write!(f, "DIV"),
            TokenType::Integer => write!(f, "INTEGER"),
            TokenType::Real => write!(f, "REAL"),
            TokenType::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn token_type(&self) -> &TokenType {
        &self.token_type
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Invalid character '{0}' at {1}")]
    InvalidCharacter(char, Span),
    #[error("Unterminated comment starting at {0}")]
    UnterminatedComment(Span),
    #[error("Invalid number literal \"{0}\" at {1}")]
    InvalidNumber(String, Span),
}

/// Scans source text on demand. Once the input is exhausted every further
/// call to [`Lexer::next_token`] yields another [`TokenType::Eof`].
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    rest: &'a str,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            rest: source,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        if self.rest.is_empty() {
            return Ok(Token {
                token_type: TokenType::Eof,
                lexeme: String::new(),
                span: Span::point(self.line, self.column),
            });
        }

        let (token_type, rest) = maximal(
            &[
                // Single-character tokens
                semicolon,
                dot,
                comma,
                plus,
                minus,
                star,
                slash,
                left_paren,
                right_paren,
                // One or two character tokens
                colon,
                assign,
                // Literals and reserved words
                identifier,
                number,
            ],
            self.rest,
        )
        .ok_or_else(|| self.unrecognized())?;

        let start = Span::point(self.line, self.column);
        let lexeme = self.advance(self.rest.len() - rest.len());
        let token = Token {
            token_type,
            lexeme: lexeme.to_string(),
            span: start + Span::point(self.line, self.column),
        };
        log::trace!("token {:?} at {}", token.token_type, token.span);
        Ok(token)
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            let whitespace = self
                .rest
                .chars()
                .take_while(|c| c.is_whitespace())
                .map(char::len_utf8)
                .sum();
            self.advance(whitespace);

            if !self.rest.starts_with('{') {
                return Ok(());
            }

            let start = Span::point(self.line, self.column);
            match self.rest.find('}') {
                Some(close) => {
                    self.advance(close + 1);
                }
                None => {
                    let len = self.rest.len();
                    self.advance(len);
                    return Err(LexError::UnterminatedComment(
                        start + Span::point(self.line, self.column),
                    ));
                }
            }
        }
    }

    fn advance(&mut self, len: usize) -> &'a str {
        let (consumed, rest) = self.rest.split_at(len);
        for c in consumed.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.rest = rest;
        consumed
    }

    fn unrecognized(&self) -> LexError {
        let span = Span::point(self.line, self.column);
        match self.rest.chars().next() {
            Some(c) if c.is_ascii_digit() => {
                let len = number_len(self.rest);
                LexError::InvalidNumber(self.rest[..len].to_string(), span)
            }
            Some(c) => LexError::InvalidCharacter(c, span),
            None => LexError::InvalidCharacter('\0', span),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    /// Yields every token including the final [`TokenType::Eof`], then stops.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        match &token {
            Ok(Token {
                token_type: TokenType::Eof,
                ..
            })
            | Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(token)
    }
}

pub fn tokens(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}

fn maximal<'a, T: std::fmt::Debug>(
    parsers: &[fn(&str) -> Option<(T, &str)>],
    source: &'a str,
) -> Option<(T, &'a str)> {
    let mut min_left = source.len() + 1;
    let mut max_match = None;

    let matching_parsers = parsers.iter().filter_map(|parser| parser(source));
    for (m, rest) in matching_parsers {
        let left = rest.len();
        if left < min_left {
            min_left = left;
            max_match = Some((m, rest));
        }
    }

    max_match
}

macro_rules! match_literal {
    ($name:ident, $word:literal, $token:expr) => {
        fn $name(source: &str) -> Option<(TokenType, &str)> {
            source.strip_prefix($word).map(|rest| ($token, rest))
        }
    };
}

match_literal! { semicolon, ";", TokenType::Semicolon }
match_literal! { dot, ".", TokenType::Dot }
match_literal! { comma, ",", TokenType::Comma }
match_literal! { plus, "+", TokenType::Plus }
match_literal! { minus, "-", TokenType::Minus }
match_literal! { star, "*", TokenType::Star }
match_literal! { slash, "/", TokenType::Slash }
match_literal! { left_paren, "(", TokenType::LeftParen }
match_literal! { right_paren, ")", TokenType::RightParen }
match_literal! { colon, ":", TokenType::Colon }
match_literal! { assign, ":=", TokenType::Assign }

fn keyword(word: &str) -> Option<TokenType> {
    let token_type = match word {
        "PROGRAM" => TokenType::Program,
        "VAR" => TokenType::Var,
        "BEGIN" => TokenType::Begin,
        "END" => TokenType::End,
        "PROCEDURE" => TokenType::Procedure,
        "DIV" => TokenType::Div,
        "INTEGER" => TokenType::Integer,
        "REAL" => TokenType::Real,
        _ => return None,
    };
    Some(token_type)
}

fn identifier(source: &str) -> Option<(TokenType, &str)> {
    let first = source.chars().next()?;
    if !first.is_ascii_alphabetic() && first != '_' {
        return None;
    }

    let len = source
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum::<usize>();

    let word = &source[..len];
    let token_type = keyword(word).unwrap_or_else(|| TokenType::Identifier(word.to_string()));
    Some((token_type, &source[len..]))
}

fn digits(source: &str) -> usize {
    source.chars().take_while(char::is_ascii_digit).count()
}

// Length of the digit run plus an optional `.` and fraction digits.
fn number_len(source: &str) -> usize {
    let integer_len = digits(source);
    match source[integer_len..].strip_prefix('.') {
        Some(fraction) => integer_len + 1 + digits(fraction),
        None => integer_len,
    }
}

fn number(source: &str) -> Option<(TokenType, &str)> {
    let len = number_len(source);
    if len == 0 {
        return None;
    }

    let lexeme = &source[..len];
    let token_type = if lexeme.contains('.') {
        let value: f64 = lexeme.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        TokenType::RealConst(value)
    } else {
        TokenType::IntegerConst(lexeme.parse().ok()?)
    };
    Some((token_type, &source[len..]))
}
