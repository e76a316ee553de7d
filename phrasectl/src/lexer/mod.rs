//! Lexer for the small C-like teaching language the `phrasing` program understands.
//!
//! The language has six keywords, a handful of operators, two delimiters, lower-case
//! identifiers and unsigned integer constants. Every token gets a numeric code: fixed codes for
//! keywords (11..), operators (21..) and delimiters (31..), and codes assigned in first-seen
//! order for identifiers (41..) and constants (51..). Anything the grammar does not accept is an
//! [`TokenKind::Error`] token without a code. Scanning never fails; errors are just tokens.
//!
//! [`report`] renders the token listing plus the identifier and constant tables in the format
//! the legacy `phrasing` program writes to its output file.

mod report;
mod symbols;

pub use report::{CONSTANT_TABLE_HEADING, IDENTIFIER_TABLE_HEADING, report};
pub use symbols::SymbolTable;

const KEYWORDS: &[(&str, u32)] = &[("if", 11), ("then", 12), ("else", 13), ("int", 14), ("char", 15), ("for", 16)];
const OPERATORS: &[(&str, u32)] = &[("=", 21), (">=", 22), ("==", 23), ("+", 24), ("/", 25), ("%", 26), ("++", 27)];
const DELIMITERS: &[(&str, u32)] = &[("\"", 31), (";", 32)];

const FIRST_IDENTIFIER_CODE: u32 = 41;
const FIRST_CONSTANT_CODE: u32 = 51;

/// Identifiers of this length or longer are rejected.
pub const MAX_IDENTIFIER_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Constant,
    Operator,
    Delimiter,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// `None` for error tokens
    pub code: Option<u32>,
}

impl Token {
    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Error,
            text: text.into(),
            code: None,
        }
    }
}

fn lookup(table: &[(&str, u32)], text: &str) -> Option<u32> {
    table.iter().find(|(t, _)| *t == text).map(|(_, code)| *code)
}

/// C-locale `isspace`: space, tab, newline, vertical tab, form feed, carriage return.
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Streaming tokenizer. Iterate it to get tokens; the symbol tables fill up as it goes.
#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    identifiers: SymbolTable,
    constants: SymbolTable,
}

impl Lexer {
    /// ASCII letters are folded to lower case before scanning, so `IF` is the keyword `if`.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.to_ascii_lowercase().chars().collect(),
            pos: 0,
            identifiers: SymbolTable::new(FIRST_IDENTIFIER_CODE),
            constants: SymbolTable::new(FIRST_CONSTANT_CODE),
        }
    }

    pub fn identifiers(&self) -> &SymbolTable {
        &self.identifiers
    }

    pub fn constants(&self) -> &SymbolTable {
        &self.constants
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn take_while(&mut self, text: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek().filter(|c| pred(*c)) {
            text.push(c);
            self.pos += 1;
        }
    }

    fn word(&mut self) -> Token {
        let mut text = String::new();
        self.take_while(&mut text, |c| c.is_ascii_alphabetic());

        // `if1`: letters glued to digits
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.take_while(&mut text, |c| c.is_ascii_digit());
            return Token::error(text);
        }

        if text.len() >= MAX_IDENTIFIER_LEN {
            return Token::error(text);
        }

        if let Some(code) = lookup(KEYWORDS, &text) {
            return Token {
                kind: TokenKind::Keyword,
                text,
                code: Some(code),
            };
        }

        let code = self.identifiers.intern(&text);
        Token {
            kind: TokenKind::Identifier,
            text,
            code: Some(code),
        }
    }

    fn number(&mut self) -> Token {
        let mut text = String::new();
        self.take_while(&mut text, |c| c.is_ascii_digit());

        // `123a`: digits glued to letters swallow the rest of the word
        if self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.take_while(&mut text, |c| c.is_ascii_alphanumeric());
            return Token::error(text);
        }

        let code = self.constants.intern(&text);
        Token {
            kind: TokenKind::Constant,
            text,
            code: Some(code),
        }
    }

    fn operator(&mut self, first: char) -> Token {
        self.pos += 1;
        let mut text = first.to_string();
        let second = if first == '+' { '+' } else { '=' };
        if matches!(first, '=' | '>' | '<' | '+') && self.peek() == Some(second) {
            self.pos += 1;
            text.push(second);
        }

        match lookup(OPERATORS, &text) {
            Some(code) => Token {
                kind: TokenKind::Operator,
                text,
                code: Some(code),
            },
            // `<`, `<=` and a lone `>` are not part of the language
            None => Token::error(text),
        }
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        while self.peek().is_some_and(is_space) {
            self.pos += 1;
        }

        let c = self.peek()?;
        let token = if c.is_ascii_alphabetic() {
            self.word()
        } else if c.is_ascii_digit() {
            self.number()
        } else if "=+/><%".contains(c) {
            self.operator(c)
        } else {
            self.pos += 1;
            let text = c.to_string();
            match lookup(DELIMITERS, &text) {
                Some(code) => Token {
                    kind: TokenKind::Delimiter,
                    text,
                    code: Some(code),
                },
                None => Token::error(text),
            }
        };

        Some(token)
    }
}
