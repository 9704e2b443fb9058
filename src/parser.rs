use crate::lexer::{STDERR_TAG, Token, TokenKind};
use std::path::PathBuf;
use thiserror::Error;

/// How a redirection target file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// `>`: create the file, truncating it if it exists.
    Truncate,
    /// `>>`: create the file if absent, append otherwise.
    Append,
}

/// Output stream of a process that a redirection replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    /// The conventional file descriptor number of the stream.
    pub fn fd(self) -> i32 {
        match self {
            OutputStream::Stdout => 1,
            OutputStream::Stderr => 2,
        }
    }

    fn from_tag(tag: &str) -> Self {
        if tag == STDERR_TAG {
            OutputStream::Stderr
        } else {
            OutputStream::Stdout
        }
    }
}

/// A request to replace a stage's stdout or stderr with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub mode: RedirectMode,
    pub stream: OutputStream,
    pub path: PathBuf,
}

/// One stage of a pipeline: a command name, its arguments and its redirections.
///
/// For `echo`, single `" "` arguments stand for the separators between words, so
/// concatenating the arguments reproduces the spacing of the source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSegment {
    pub name: String,
    pub args: Vec<String>,
    pub redirections: Vec<Redirection>,
}

/// An ordered, non-empty chain of segments connected by `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub segments: Vec<CommandSegment>,
}

impl Pipeline {
    /// The final stage, the only one whose redirections take effect.
    ///
    /// `None` only for a pipeline built by hand without segments.
    pub fn last(&self) -> Option<&CommandSegment> {
        self.segments.last()
    }
}

/// Errors that can occur while turning tokens into a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    /// The line, or one stage of it, has no command name.
    #[error("syntax error: no command")]
    NoCommand,
    /// A `>`/`>>` operator is not followed by a file name.
    #[error("syntax error: expected a file name after redirection")]
    MissingRedirectTarget,
    /// A stage other than the last one redirects its output.
    #[error("syntax error: `{0}` redirects its output but is not the last command of the pipeline")]
    RedirectionNotLast(String),
}

struct PipelineBuilder {
    tokens: Vec<Token>,
    pos: usize,
}

impl PipelineBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        PipelineBuilder { tokens, pos: 0 }
    }

    fn build_pipeline(mut self) -> Result<Pipeline, ParsingError> {
        let mut segments = vec![self.parse_segment()?];
        while self.consume_if(TokenKind::Pipe) {
            segments.push(self.parse_segment()?);
        }

        let inner = &segments[..segments.len() - 1];
        if let Some(segment) = inner.iter().find(|s| !s.redirections.is_empty()) {
            return Err(ParsingError::RedirectionNotLast(segment.name.clone()));
        }

        Ok(Pipeline { segments })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn consume_if(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_spaces(&mut self) {
        while self.consume_if(TokenKind::Space) {}
    }

    /// Reads one word: a run of adjacent literal tokens, glued together.
    fn parse_word(&mut self) -> Option<String> {
        if self.peek_kind() != Some(TokenKind::Literal) {
            return None;
        }
        let mut word = String::new();
        while self.peek_kind() == Some(TokenKind::Literal) {
            if let Some(token) = self.consume() {
                word.push_str(&token.text);
            }
        }
        Some(word)
    }

    /// Parse one stage: name, then words and redirections until `|` or the end.
    fn parse_segment(&mut self) -> Result<CommandSegment, ParsingError> {
        self.skip_spaces();
        let name = match self.parse_word() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ParsingError::NoCommand),
        };
        let keep_spacing = name == "echo";

        let mut args = Vec::new();
        let mut redirections = Vec::new();
        let mut separated = false;

        while let Some(kind) = self.peek_kind() {
            match kind {
                TokenKind::Pipe => break,
                TokenKind::Space => {
                    self.consume();
                    separated = true;
                }
                TokenKind::Literal => {
                    let word = self.parse_word().unwrap_or_default();
                    if keep_spacing && separated && !args.is_empty() {
                        args.push(" ".to_string());
                    }
                    args.push(word);
                    separated = false;
                }
                TokenKind::Redirect | TokenKind::Append => {
                    redirections.push(self.parse_redirection()?);
                }
            }
        }

        Ok(CommandSegment {
            name,
            args,
            redirections,
        })
    }

    fn parse_redirection(&mut self) -> Result<Redirection, ParsingError> {
        let operator = self.consume().ok_or(ParsingError::MissingRedirectTarget)?;
        let mode = match operator.kind {
            TokenKind::Append => RedirectMode::Append,
            _ => RedirectMode::Truncate,
        };
        self.skip_spaces();
        match self.parse_word() {
            Some(path) if !path.is_empty() => Ok(Redirection {
                mode,
                stream: OutputStream::from_tag(&operator.text),
                path: PathBuf::from(path),
            }),
            _ => Err(ParsingError::MissingRedirectTarget),
        }
    }
}

/// Constructs a [`Pipeline`] from the tokens of one input line.
///
/// Fails with [`ParsingError::NoCommand`] when a stage has no command name (an
/// empty or blank line, a leading or trailing `|`), with
/// [`ParsingError::MissingRedirectTarget`] when a redirection has no file name,
/// and with [`ParsingError::RedirectionNotLast`] when a stage before the last one
/// redirects its output, since only the last stage's output is not a pipe.
pub fn parse_pipeline(tokens: Vec<Token>) -> Result<Pipeline, ParsingError> {
    let builder = PipelineBuilder::from(tokens);
    builder.build_pipeline()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::split_into_tokens;

    fn parse(line: &str) -> Result<Pipeline, ParsingError> {
        parse_pipeline(split_into_tokens(line).unwrap())
    }

    fn segment(name: &str, args: &[&str]) -> CommandSegment {
        CommandSegment {
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            redirections: Vec::new(),
        }
    }

    #[test]
    fn test_echo_pipe_grep() {
        let pipeline = parse("echo hello | grep hello").unwrap();
        assert_eq!(
            pipeline.segments,
            vec![segment("echo", &["hello"]), segment("grep", &["hello"])]
        );
    }

    #[test]
    fn test_last_segment() {
        let pipeline = parse("echo hello | grep hello").unwrap();
        assert_eq!(pipeline.last(), Some(&segment("grep", &["hello"])));

        let empty = Pipeline { segments: Vec::new() };
        assert_eq!(empty.last(), None);
    }

    #[test]
    fn test_segment_count_follows_pipes() {
        assert_eq!(parse("a").unwrap().segments.len(), 1);
        assert_eq!(parse("a | b").unwrap().segments.len(), 2);
        assert_eq!(parse("a|b|c|d").unwrap().segments.len(), 4);
        assert_eq!(parse("a '|' b \"|\" c\\|d").unwrap().segments.len(), 1);

        let names: Vec<_> = parse("cat x | sort | uniq -c")
            .unwrap()
            .segments
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["cat", "sort", "uniq"]);
    }

    #[test]
    fn test_echo_keeps_word_separators() {
        let pipeline = parse("echo   hello    world  ").unwrap();
        assert_eq!(pipeline.segments, vec![segment("echo", &["hello", " ", "world"])]);

        let pipeline = parse("echo 'a  b'").unwrap();
        assert_eq!(pipeline.segments, vec![segment("echo", &["a  b"])]);
    }

    #[test]
    fn test_echo_trailing_space_before_pipe_is_dropped() {
        let pipeline = parse("echo a b   | cat").unwrap();
        assert_eq!(pipeline.segments[0], segment("echo", &["a", " ", "b"]));
    }

    #[test]
    fn test_other_commands_split_on_spaces() {
        let pipeline = parse("ls   -l   /tmp").unwrap();
        assert_eq!(pipeline.segments, vec![segment("ls", &["-l", "/tmp"])]);
    }

    #[test]
    fn test_adjacent_literals_form_one_word() {
        let pipeline = parse("cat \"my \"'file'.txt").unwrap();
        assert_eq!(pipeline.segments, vec![segment("cat", &["my file.txt"])]);

        let pipeline = parse("'ec'ho \"x\\\"y\"").unwrap();
        assert_eq!(pipeline.segments, vec![segment("echo", &["x\"y"])]);
    }

    #[test]
    fn test_append_forms_are_equivalent() {
        let explicit = parse("cmd 1>> out.txt").unwrap();
        let bare = parse("cmd >> out.txt").unwrap();
        let expected = Redirection {
            mode: RedirectMode::Append,
            stream: OutputStream::Stdout,
            path: PathBuf::from("out.txt"),
        };
        assert_eq!(explicit.last().unwrap().redirections, vec![expected.clone()]);
        assert_eq!(bare.last().unwrap().redirections, vec![expected]);
    }

    #[test]
    fn test_redirections_anywhere_in_last_segment() {
        let pipeline = parse("echo a > out b 2>>err").unwrap();
        let last = pipeline.last().unwrap();
        assert_eq!(last.args, vec!["a", " ", "b"]);
        assert_eq!(
            last.redirections,
            vec![
                Redirection {
                    mode: RedirectMode::Truncate,
                    stream: OutputStream::Stdout,
                    path: PathBuf::from("out"),
                },
                Redirection {
                    mode: RedirectMode::Append,
                    stream: OutputStream::Stderr,
                    path: PathBuf::from("err"),
                },
            ]
        );
        assert_eq!(last.redirections[1].stream.fd(), 2);
    }

    #[test]
    fn test_no_command() {
        assert_eq!(parse(""), Err(ParsingError::NoCommand));
        assert_eq!(parse("    "), Err(ParsingError::NoCommand));
        assert_eq!(parse("| cat"), Err(ParsingError::NoCommand));
        assert_eq!(parse("ls |"), Err(ParsingError::NoCommand));
        assert_eq!(parse("ls | | cat"), Err(ParsingError::NoCommand));
        assert_eq!(parse("> out"), Err(ParsingError::NoCommand));
        assert_eq!(parse("''"), Err(ParsingError::NoCommand));
    }

    #[test]
    fn test_missing_redirect_target() {
        assert_eq!(parse("ls >"), Err(ParsingError::MissingRedirectTarget));
        assert_eq!(parse("ls >    "), Err(ParsingError::MissingRedirectTarget));
        assert_eq!(parse("ls 2> | cat"), Err(ParsingError::MissingRedirectTarget));
        assert_eq!(parse("ls > ''"), Err(ParsingError::MissingRedirectTarget));
    }

    #[test]
    fn test_redirection_before_pipe_is_rejected() {
        assert_eq!(
            parse("ls > out | cat"),
            Err(ParsingError::RedirectionNotLast("ls".to_string()))
        );
    }
}
