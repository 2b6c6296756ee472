//! SQL lexer — UTF-8 text to a token stream with source positions.
//!
//! Every token carries its kind, its text, and a 1-based line/column.
//! Keywords are recognized case-insensitively; `--` and `/* */` comments
//! are skipped (an unterminated block comment simply runs to the end of
//! the input).

use crate::error::{RelicError, RelicResult};

/// Token kinds of the SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Create,
    Drop,
    Table,
    If,
    Exists,
    Not,
    Null,
    And,
    Or,
    Join,
    Inner,
    Left,
    Right,
    Cross,
    On,
    As,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Offset,
    Primary,
    Key,
    Unique,
    Is,
    Like,
    True,
    False,

    // Data type keywords
    Integer,
    Int,
    Text,
    Varchar,
    StringType,
    Real,
    Float,
    Double,
    Boolean,
    Bool,

    // Literals and identifiers
    Number,
    StringLit,
    Identifier,

    // Operators
    Eq,        // =
    Ne,        // <> or !=
    Lt,        // <
    Le,        // <=
    Gt,        // >
    Ge,        // >=
    Star,      // *
    Plus,      // +
    Minus,     // -
    Slash,     // /
    Dot,       // .

    // Punctuation
    LParen,
    RParen,
    Comma,
    Semicolon,

    Eof,
}

impl TokenKind {
    /// True for the data-type keywords accepted in column definitions.
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Integer
                | TokenKind::Int
                | TokenKind::Text
                | TokenKind::Varchar
                | TokenKind::StringType
                | TokenKind::Real
                | TokenKind::Float
                | TokenKind::Double
                | TokenKind::Boolean
                | TokenKind::Bool
        )
    }
}

fn keyword(upper: &str) -> Option<TokenKind> {
    let kind = match upper {
        "SELECT" => TokenKind::Select,
        "FROM" => TokenKind::From,
        "WHERE" => TokenKind::Where,
        "INSERT" => TokenKind::Insert,
        "INTO" => TokenKind::Into,
        "VALUES" => TokenKind::Values,
        "UPDATE" => TokenKind::Update,
        "SET" => TokenKind::Set,
        "DELETE" => TokenKind::Delete,
        "CREATE" => TokenKind::Create,
        "DROP" => TokenKind::Drop,
        "TABLE" => TokenKind::Table,
        "IF" => TokenKind::If,
        "EXISTS" => TokenKind::Exists,
        "NOT" => TokenKind::Not,
        "NULL" => TokenKind::Null,
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "JOIN" => TokenKind::Join,
        "INNER" => TokenKind::Inner,
        "LEFT" => TokenKind::Left,
        "RIGHT" => TokenKind::Right,
        "CROSS" => TokenKind::Cross,
        "ON" => TokenKind::On,
        "AS" => TokenKind::As,
        "ORDER" => TokenKind::Order,
        "BY" => TokenKind::By,
        "ASC" => TokenKind::Asc,
        "DESC" => TokenKind::Desc,
        "LIMIT" => TokenKind::Limit,
        "OFFSET" => TokenKind::Offset,
        "PRIMARY" => TokenKind::Primary,
        "KEY" => TokenKind::Key,
        "UNIQUE" => TokenKind::Unique,
        "IS" => TokenKind::Is,
        "LIKE" => TokenKind::Like,
        "TRUE" => TokenKind::True,
        "FALSE" => TokenKind::False,
        "INTEGER" => TokenKind::Integer,
        "INT" => TokenKind::Int,
        "TEXT" => TokenKind::Text,
        "VARCHAR" => TokenKind::Varchar,
        "STRING" => TokenKind::StringType,
        "REAL" => TokenKind::Real,
        "FLOAT" => TokenKind::Float,
        "DOUBLE" => TokenKind::Double,
        "BOOLEAN" => TokenKind::Boolean,
        "BOOL" => TokenKind::Bool,
        _ => return None,
    };
    Some(kind)
}

/// One lexical token. For string literals `text` holds the decoded
/// content; for everything else it holds the raw lexeme.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

/// Converts input text into a stream of tokens.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new(text: &str) -> Self {
        Lexer {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenizes the entire input, ending with an EOF token.
    pub fn tokenize(mut self) -> RelicResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Skips one comment if the cursor sits on one.
    fn skip_comment(&mut self) -> bool {
        if self.current() == Some('-') && self.peek(1) == Some('-') {
            while let Some(ch) = self.current() {
                if ch == '\n' {
                    break;
                }
                self.advance();
            }
            return true;
        }
        if self.current() == Some('/') && self.peek(1) == Some('*') {
            self.advance();
            self.advance();
            while let Some(ch) = self.current() {
                if ch == '*' && self.peek(1) == Some('/') {
                    self.advance();
                    self.advance();
                    return true;
                }
                self.advance();
            }
            // Unterminated block comment runs to EOF.
            return true;
        }
        false
    }

    fn next_token(&mut self) -> RelicResult<Token> {
        loop {
            self.skip_whitespace();
            if !self.skip_comment() {
                break;
            }
        }

        let line = self.line;
        let column = self.column;
        let Some(ch) = self.current() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line,
                column,
            });
        };

        if ch.is_ascii_digit()
            || (ch == '-' && self.peek(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return Ok(self.read_number(line, column));
        }
        if ch == '\'' || ch == '"' {
            return self.read_string(line, column);
        }
        if ch.is_alphabetic() || ch == '_' {
            return Ok(self.read_identifier(line, column));
        }

        // Two-character operators
        if let Some(next) = self.peek(1) {
            let kind = match (ch, next) {
                ('<', '>') | ('!', '=') => Some(TokenKind::Ne),
                ('<', '=') => Some(TokenKind::Le),
                ('>', '=') => Some(TokenKind::Ge),
                _ => None,
            };
            if let Some(kind) = kind {
                self.advance();
                self.advance();
                return Ok(Token {
                    kind,
                    text: format!("{ch}{next}"),
                    line,
                    column,
                });
            }
        }

        let kind = match ch {
            '=' => Some(TokenKind::Eq),
            '<' => Some(TokenKind::Lt),
            '>' => Some(TokenKind::Gt),
            '*' => Some(TokenKind::Star),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '/' => Some(TokenKind::Slash),
            '.' => Some(TokenKind::Dot),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semicolon),
            _ => None,
        };
        if let Some(kind) = kind {
            self.advance();
            return Ok(Token {
                kind,
                text: ch.to_string(),
                line,
                column,
            });
        }

        self.advance();
        Err(RelicError::Syntax {
            message: format!("unexpected character: '{ch}'"),
            line,
            column,
        })
    }

    fn read_number(&mut self, line: u32, column: u32) -> Token {
        let mut text = String::new();
        if self.current() == Some('-') {
            text.push(self.advance().expect("minus sign present"));
        }
        let mut seen_dot = false;
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                text.push(ch);
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                text.push(ch);
            } else {
                break;
            }
            self.advance();
        }
        Token {
            kind: TokenKind::Number,
            text,
            line,
            column,
        }
    }

    fn read_string(&mut self, line: u32, column: u32) -> RelicResult<Token> {
        let quote = self.advance().expect("opening quote present");
        let mut text = String::new();
        loop {
            match self.current() {
                None => {
                    return Err(RelicError::Syntax {
                        message: "unterminated string literal".to_string(),
                        line,
                        column,
                    });
                }
                Some(ch) if ch == quote => {
                    if self.peek(1) == Some(quote) {
                        // Doubled quote escapes itself.
                        text.push(quote);
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        break;
                    }
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('\\') => text.push('\\'),
                        Some(c) if c == quote => text.push(quote),
                        Some(c) => text.push(c),
                        None => continue,
                    }
                    self.advance();
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
            }
        }
        Ok(Token {
            kind: TokenKind::StringLit,
            text,
            line,
            column,
        })
    }

    fn read_identifier(&mut self, line: u32, column: u32) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        let kind = keyword(&text.to_ascii_uppercase()).unwrap_or(TokenKind::Identifier);
        Token {
            kind,
            text,
            line,
            column,
        }
    }
}
