//! A module implementing lexical analysis (tokenization) of a single input line.
//!
//! The lexer is a finite state machine that walks the line left to right without
//! backtracking. Its states and transitions:
//!
//! | state           | input                                  | action                                   |
//! |-----------------|----------------------------------------|------------------------------------------|
//! | `Normal`        | `'` / `"`                              | enter `InSingleQuote` / `InDoubleQuote`   |
//! | `Normal`        | space                                  | emit one `Space` for the whole run       |
//! | `Normal`        | `\`                                    | emit the next char as a `Literal`        |
//! | `Normal`        | `1` / `2` [space] `>` or `>>`          | emit `Redirect` / `Append` for the fd    |
//! | `Normal`        | `>` / `>>`                             | emit `Redirect` / `Append` for stdout    |
//! | `Normal`        | `\|`                                   | emit `Pipe`                              |
//! | `Normal`        | anything else                          | start a word, enter `InWord`             |
//! | `InWord`        | space, quote, `\|`, `>`                | emit the word, reprocess in `Normal`     |
//! | `InWord`        | `\`                                    | take the next char verbatim              |
//! | `InSingleQuote` | `'`                                    | emit contents verbatim, back to `Normal` |
//! | `InDoubleQuote` | `\` + `$`, `\`, `"` or newline         | take the escaped char                    |
//! | `InDoubleQuote` | `"`                                    | emit contents, back to `Normal`          |

use thiserror::Error;

/// Stream tag carried by redirection tokens for standard output.
pub const STDOUT_TAG: &str = "stdout";
/// Stream tag carried by redirection tokens for standard error.
pub const STDERR_TAG: &str = "stderr";

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A piece of literal text: a bare word or the contents of a quoted string.
    Literal,
    /// A run of one or more spaces.
    Space,
    /// Output redirection with truncation, `>`.
    Redirect,
    /// Output redirection with append, `>>`.
    Append,
    /// The pipe operator, `|`.
    Pipe,
}

/// Represents a token resulting from lexical analysis.
///
/// `text` holds the literal value for [`TokenKind::Literal`] and the stream tag
/// ([`STDOUT_TAG`] or [`STDERR_TAG`]) for redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn literal(text: impl Into<String>) -> Self {
        Token {
            kind: TokenKind::Literal,
            text: text.into(),
        }
    }

    pub fn space() -> Self {
        Token {
            kind: TokenKind::Space,
            text: " ".to_string(),
        }
    }

    pub fn pipe() -> Self {
        Token {
            kind: TokenKind::Pipe,
            text: "|".to_string(),
        }
    }

    pub fn redirect(tag: &str) -> Self {
        Token {
            kind: TokenKind::Redirect,
            text: tag.to_string(),
        }
    }

    pub fn append(tag: &str) -> Self {
        Token {
            kind: TokenKind::Append,
            text: tag.to_string(),
        }
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unexpected end of input: unmatched {0}")]
    UnterminatedQuote(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Normal,
    InWord,
    InSingleQuote,
    InDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Normal,
            buffer: String::new(),
        }
    }

    /// Runs the machine over the whole line.
    ///
    /// Returns the tokens on success or a `LexingError` if a quoted string is
    /// still open when the input runs out. No partial token list is returned.
    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Normal => self.handle_normal(ch, &mut out),
                LexingState::InWord => self.handle_word(ch, &mut out),
                LexingState::InSingleQuote => self.handle_single_quote(ch, &mut out),
                LexingState::InDoubleQuote => self.handle_double_quote(ch, &mut out),
            }
        }

        match self.state {
            LexingState::InSingleQuote => return Err(LexingError::UnterminatedQuote('\'')),
            LexingState::InDoubleQuote => return Err(LexingError::UnterminatedQuote('"')),
            LexingState::InWord => self.finish_literal(&mut out),
            LexingState::Normal => {}
        }

        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input.get(self.pos + n).copied()
    }

    fn handle_normal(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            '\'' => self.state = LexingState::InSingleQuote,
            '"' => self.state = LexingState::InDoubleQuote,
            ' ' => {
                out.push(Token::space());
                while self.peek_char() == Some(' ') {
                    self.read_char();
                }
            }
            '\\' => {
                if let Some(next) = self.read_char() {
                    out.push(Token::literal(next));
                }
            }
            '1' | '2' => match self.fd_redirection(ch) {
                Some(token) => out.push(token),
                None => {
                    self.buffer.push(ch);
                    self.state = LexingState::InWord;
                }
            },
            '>' => {
                if self.peek_char() == Some('>') {
                    self.read_char();
                    out.push(Token::append(STDOUT_TAG));
                } else {
                    out.push(Token::redirect(STDOUT_TAG));
                }
            }
            '|' => out.push(Token::pipe()),
            c => {
                self.buffer.push(c);
                self.state = LexingState::InWord;
            }
        }
    }

    /// Recognizes `N>`, `N>>`, `N >` and `N >>` right after a leading `1` or `2`.
    ///
    /// Consumes the operator and returns its token, or leaves the position
    /// untouched when the digit is just a digit.
    fn fd_redirection(&mut self, digit: char) -> Option<Token> {
        let tag = if digit == '2' { STDERR_TAG } else { STDOUT_TAG };
        let mut offset = 0;
        if self.peek_nth(offset) == Some(' ') {
            offset += 1;
        }
        if self.peek_nth(offset) != Some('>') {
            return None;
        }
        if self.peek_nth(offset + 1) == Some('>') {
            self.pos += offset + 2;
            Some(Token::append(tag))
        } else {
            self.pos += offset + 1;
            Some(Token::redirect(tag))
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            ' ' | '\'' | '"' | '|' | '>' => {
                self.finish_literal(out);
                self.state = LexingState::Normal;
                self.handle_normal(ch, out);
            }
            // Any character can be escaped here; a trailing backslash stays literal.
            '\\' => match self.read_char() {
                Some(next) => self.buffer.push(next),
                None => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            '\'' => {
                self.finish_literal(out);
                self.state = LexingState::Normal;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            '"' => {
                self.finish_literal(out);
                self.state = LexingState::Normal;
            }
            '\\' => match self.peek_char() {
                Some(next @ ('$' | '\\' | '"' | '\n')) => {
                    self.read_char();
                    self.buffer.push(next);
                }
                _ => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    /// Emits the buffered text as a literal. Quoted strings are emitted even when
    /// empty, so `''` still produces a (blank) word.
    fn finish_literal(&mut self, out: &mut Vec<Token>) {
        out.push(Token::literal(std::mem::take(&mut self.buffer)));
    }
}

/// The main entry point function to perform lexical analysis.
///
/// Creates and runs the finite state machine to tokenize the input line.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    let mut lexer = LexingFSM::new(line);
    lexer.make_tokens()
}
