//! Lexical analysis.
//!
//! # Tokenization
//! This is the first phase of the compiler. A [`Tokenizer`] pulls source text
//! line by line and classifies it into [`Token`]s on demand; there is no token
//! buffer beyond the current token. Whitespace is always discarded. Comments
//! are either surfaced as tokens or skipped, depending on the [`CommentMode`]
//! the tokenizer was built with.
//!
//! # Classification
//! The untokenized fragment of the current line is examined in a fixed
//! priority order: line comment, block comment, symbol, string constant,
//! integer constant, identifier or keyword. Anything else is an error.
//! Block comments are the only tokens allowed to span lines.
//!
//! # Errors
//! Every [`TokenizerError`] is fatal for the file being tokenized. It keeps
//! the raw source line, its number, the untokenized remainder of that line and
//! the token kind that was being assumed, so the driver can report exactly
//! where tokenization stopped.

use crate::source::{self, Line, Lines};
use std::{
    fmt::{self, Display},
    io::{self, BufRead},
    iter::Peekable,
    str::FromStr,
    vec,
};

use log::trace;
use thiserror::Error;

/// Characters that form single-character symbol tokens.
pub const SYMBOLS: &str = "{}()[].,;+-*/&|<>=~";

/// Largest integer constant.
pub const INT_MAX: u16 = 32767;

/// Reason a tokenizer stopped.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Reason {
    /// I/O error while reading the next line.
    #[error("I/O error")]
    Input(#[from] io::Error),

    /// No classification rule applies to the next character.
    #[error("Token not recognized")]
    Unrecognized,

    /// A string constant has no closing quote on its line.
    #[error("Invalid string constant, no closing \"")]
    UnterminatedString,

    /// End of input was reached inside a block comment.
    #[error("Encountered end of file inside a block comment")]
    UnterminatedComment,

    /// An integer constant is out of range.
    #[error("Invalid integer constant `{0}`, valid range is 0 to {INT_MAX}")]
    IntegerRange(String),
}

/// Tokenization failure, with the context needed to report it.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct TokenizerError {
    reason: Reason,
    line: String,
    number: u32,
    untokenized: String,
    assumed: Option<TokenKind>,
}

impl TokenizerError {
    pub fn reason(&self) -> &Reason {
        &self.reason
    }

    /// The raw source line where the error occurred.
    pub fn error_line(&self) -> &str {
        &self.line
    }

    /// 1-based number of [`TokenizerError::error_line()`].
    pub fn line_number(&self) -> u32 {
        self.number
    }

    /// Portion of the line that was not tokenized yet.
    pub fn untokenized(&self) -> &str {
        &self.untokenized
    }

    /// Token kind the tokenizer had settled on, if it got that far.
    pub fn assumed_kind(&self) -> Option<TokenKind> {
        self.assumed
    }
}

/// A keyword.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("class",       Keyword::Class),
    ("constructor", Keyword::Constructor),
    ("function",    Keyword::Function),
    ("method",      Keyword::Method),
    ("field",       Keyword::Field),
    ("static",      Keyword::Static),
    ("var",         Keyword::Var),
    ("int",         Keyword::Int),
    ("char",        Keyword::Char),
    ("boolean",     Keyword::Boolean),
    ("void",        Keyword::Void),
    ("true",        Keyword::True),
    ("false",       Keyword::False),
    ("null",        Keyword::Null),
    ("this",        Keyword::This),
    ("let",         Keyword::Let),
    ("do",          Keyword::Do),
    ("if",          Keyword::If),
    ("else",        Keyword::Else),
    ("while",       Keyword::While),
    ("return",      Keyword::Return),
];

impl Keyword {
    /// Source spelling.
    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|&&(_, keyword)| keyword == self)
            .map(|&(name, _)| name)
            .unwrap_or_default()
    }
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Tag of a [`Token`], without its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Symbol,
    Identifier,
    IntegerConstant,
    StringConstant,
    LineComment,
    BlockComment,
}

impl TokenKind {
    /// XML element name used for terminals of this kind.
    pub fn tag(self) -> &'static str {
        match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Symbol => "symbol",
            TokenKind::Identifier => "identifier",
            TokenKind::IntegerConstant => "integerConstant",
            TokenKind::StringConstant => "stringConstant",
            TokenKind::LineComment | TokenKind::BlockComment => "comment",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Symbol => "symbol",
            TokenKind::Identifier => "identifier",
            TokenKind::IntegerConstant => "integer constant",
            TokenKind::StringConstant => "string constant",
            TokenKind::LineComment => "line comment",
            TokenKind::BlockComment => "block comment",
        };

        fmt.write_str(string)
    }
}

/// Lexical unit.
///
/// Exactly one payload exists per variant. The accessors return `None` when
/// asked for a payload that the token does not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),

    /// One character out of [`SYMBOLS`].
    Symbol(char),

    Identifier(String),

    /// Always within `0..=INT_MAX`.
    IntegerConstant(u16),

    /// Text between the quotes, never containing a quote or a newline.
    StringConstant(String),

    /// Text after `//` up to the end of the line.
    LineComment(String),

    /// Text between `/*` and `*/`, line breaks included.
    BlockComment(String),
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Keyword(_) => TokenKind::Keyword,
            Token::Symbol(_) => TokenKind::Symbol,
            Token::Identifier(_) => TokenKind::Identifier,
            Token::IntegerConstant(_) => TokenKind::IntegerConstant,
            Token::StringConstant(_) => TokenKind::StringConstant,
            Token::LineComment(_) => TokenKind::LineComment,
            Token::BlockComment(_) => TokenKind::BlockComment,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            Token::Keyword(keyword) => Some(*keyword),
            _ => None,
        }
    }

    pub fn symbol(&self) -> Option<char> {
        match self {
            Token::Symbol(symbol) => Some(*symbol),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            Token::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<u16> {
        match self {
            Token::IntegerConstant(value) => Some(*value),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match self {
            Token::StringConstant(value) => Some(value),
            _ => None,
        }
    }

    pub fn comment_text(&self) -> Option<&str> {
        match self {
            Token::LineComment(text) | Token::BlockComment(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Token::LineComment(_) | Token::BlockComment(_))
    }

    pub fn is_symbol(&self, symbol: char) -> bool {
        self.symbol() == Some(symbol)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    /// Token text as it appears in XML output, before escaping.
    pub fn text(&self) -> String {
        match self {
            Token::Keyword(keyword) => keyword.to_string(),
            Token::Symbol(symbol) => symbol.to_string(),
            Token::IntegerConstant(value) => value.to_string(),
            Token::Identifier(text)
            | Token::StringConstant(text)
            | Token::LineComment(text)
            | Token::BlockComment(text) => text.clone(),
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Token::Symbol(symbol) => write!(fmt, "`{}`", symbol),
            Token::Identifier(name) => write!(fmt, "identifier `{}`", name),
            Token::IntegerConstant(value) => write!(fmt, "integer `{}`", value),
            Token::StringConstant(value) => write!(fmt, "string {:?}", value),
            Token::LineComment(_) => fmt.write_str("line comment"),
            Token::BlockComment(_) => fmt.write_str("block comment"),
        }
    }
}

/// Whether comment tokens reach the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommentMode {
    /// Comments are consumed silently and replaced by the next real token.
    Skip,

    /// Comments are returned as [`Token::LineComment`] and [`Token::BlockComment`].
    Surface,
}

impl Default for CommentMode {
    fn default() -> Self {
        CommentMode::Skip
    }
}

/// A source of classified tokens.
///
/// The compilation engine drives any implementation of this trait one token
/// at a time. [`Tokenizer`] reads real source text; [`TokenSequence`] replays
/// a literal list of tokens.
pub trait TokenSource {
    /// Whether unconsumed input remains.
    fn has_more_tokens(&mut self) -> bool;

    /// Replaces the current token with the next one.
    ///
    /// At end of input the current token becomes `None`.
    fn advance(&mut self) -> Result<(), TokenizerError>;

    /// Token produced by the most recent [`TokenSource::advance()`].
    fn current(&self) -> Option<&Token>;

    /// Source line of the current token, when known.
    fn line(&self) -> Option<u32>;
}

/// Line-based tokenizer over a buffered reader.
pub struct Tokenizer<R> {
    lines: Lines<R>,
    raw: String,
    number: u32,
    rest: String,
    current: Option<Token>,
    comments: CommentMode,
    parked: Option<io::Error>,
}

impl<R: BufRead> Tokenizer<R> {
    /// Creates a tokenizer with no current token.
    pub fn new(reader: R, comments: CommentMode) -> Self {
        Tokenizer {
            lines: source::lines(reader),
            raw: String::new(),
            number: 0,
            rest: String::new(),
            current: None,
            comments,
            parked: None,
        }
    }

    /// Ensures the untokenized fragment starts with a non-whitespace
    /// character, pulling lines as needed. Returns `false` at end of input.
    fn fill(&mut self) -> io::Result<bool> {
        loop {
            let skipped = self.rest.len() - self.rest.trim_start().len();
            self.rest.drain(..skipped);

            if !self.rest.is_empty() {
                return Ok(true);
            }

            match self.lines.next() {
                None => return Ok(false),
                Some(line) => self.load(line?),
            }
        }
    }

    fn load(&mut self, line: Line) {
        self.number = line.number();
        self.raw = line.into_text();
        self.rest = self.raw.clone();
    }

    fn lex(&mut self) -> Result<Option<Token>, TokenizerError> {
        if let Some(error) = self.parked.take() {
            return Err(self.error(error.into(), None));
        }

        match self.fill() {
            Ok(true) => (),
            Ok(false) => return Ok(None),
            Err(error) => return Err(self.error(error.into(), None)),
        }

        if self.rest.starts_with("//") {
            let text = self.rest[2..].to_owned();
            self.rest.clear();

            return Ok(Some(Token::LineComment(text)));
        } else if self.rest.starts_with("/*") {
            return self.block_comment().map(Some);
        }

        let first = match self.rest.chars().next() {
            Some(first) => first,
            None => return Ok(None),
        };

        let token = if SYMBOLS.contains(first) {
            self.rest.drain(..first.len_utf8());
            Token::Symbol(first)
        } else if first == '"' {
            let close = match self.rest[1..].find('"') {
                Some(offset) => offset + 1,
                None => {
                    let kind = Some(TokenKind::StringConstant);
                    return Err(self.error(Reason::UnterminatedString, kind));
                }
            };

            let value = self.rest[1..close].to_owned();
            self.rest.drain(..=close);
            Token::StringConstant(value)
        } else if first.is_ascii_digit() {
            let end = self
                .rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(self.rest.len());

            let digits = &self.rest[..end];
            let value = match digits.parse::<u16>() {
                Ok(value) if value <= INT_MAX => value,
                _ => {
                    let reason = Reason::IntegerRange(digits.to_owned());
                    return Err(self.error(reason, Some(TokenKind::IntegerConstant)));
                }
            };

            self.rest.drain(..end);
            Token::IntegerConstant(value)
        } else if is_identifier_start(first) {
            let end = self
                .rest
                .find(|c: char| !is_identifier_char(c))
                .unwrap_or(self.rest.len());

            let word: String = self.rest.drain(..end).collect();
            match Keyword::from_str(&word) {
                Ok(keyword) => Token::Keyword(keyword),
                Err(()) => Token::Identifier(word),
            }
        } else {
            return Err(self.error(Reason::Unrecognized, None));
        };

        Ok(Some(token))
    }

    /// Consumes a block comment, which may span several lines. The current
    /// fragment starts with `/*`.
    fn block_comment(&mut self) -> Result<Token, TokenizerError> {
        let mut body = String::new();
        let mut text = self.rest[2..].to_owned();

        loop {
            if let Some(end) = text.find("*/") {
                body.push_str(&text[..end]);
                self.rest = text[end + 2..].to_owned();

                return Ok(Token::BlockComment(body));
            }

            body.push_str(&text);
            body.push('\n');

            match self.lines.next() {
                Some(Ok(line)) => {
                    self.number = line.number();
                    self.raw = line.text().to_owned();
                    text = line.into_text();
                }

                Some(Err(error)) => {
                    self.rest.clear();
                    return Err(self.error(error.into(), Some(TokenKind::BlockComment)));
                }

                None => {
                    self.rest = text;
                    let kind = Some(TokenKind::BlockComment);
                    return Err(self.error(Reason::UnterminatedComment, kind));
                }
            }
        }
    }

    fn error(&self, reason: Reason, assumed: Option<TokenKind>) -> TokenizerError {
        TokenizerError {
            reason,
            line: self.raw.clone(),
            number: self.number,
            untokenized: self.rest.clone(),
            assumed,
        }
    }
}

impl<R: BufRead> TokenSource for Tokenizer<R> {
    fn has_more_tokens(&mut self) -> bool {
        if self.parked.is_some() {
            return true;
        }

        match self.fill() {
            Ok(more) => more,
            Err(error) => {
                // Reported by the next advance()
                self.parked = Some(error);
                true
            }
        }
    }

    fn advance(&mut self) -> Result<(), TokenizerError> {
        self.current = None;

        loop {
            match self.lex()? {
                Some(token) if token.is_comment() && self.comments == CommentMode::Skip => {
                    trace!("line {}: skipped {}", self.number, token);
                }

                token => {
                    if let Some(token) = &token {
                        trace!("line {}: {}", self.number, token);
                    }

                    self.current = token;
                    return Ok(());
                }
            }
        }
    }

    fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    fn line(&self) -> Option<u32> {
        Some(self.number)
    }
}

/// Replays a fixed list of tokens.
///
/// Used to drive the compilation engine without any source text.
pub struct TokenSequence {
    tokens: Peekable<vec::IntoIter<Token>>,
    current: Option<Token>,
}

impl TokenSequence {
    pub fn new<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = Token>,
    {
        let tokens: Vec<_> = tokens.into_iter().collect();
        TokenSequence {
            tokens: tokens.into_iter().peekable(),
            current: None,
        }
    }
}

impl FromIterator<Token> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = Token>>(tokens: I) -> Self {
        TokenSequence::new(tokens)
    }
}

impl TokenSource for TokenSequence {
    fn has_more_tokens(&mut self) -> bool {
        self.tokens.peek().is_some()
    }

    fn advance(&mut self) -> Result<(), TokenizerError> {
        self.current = self.tokens.next();
        Ok(())
    }

    fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    fn line(&self) -> Option<u32> {
        None
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str, comments: CommentMode) -> Result<Vec<Token>, TokenizerError> {
        let mut tokenizer = Tokenizer::new(source.as_bytes(), comments);
        let mut tokens = Vec::new();

        while tokenizer.has_more_tokens() {
            tokenizer.advance()?;
            tokens.extend(tokenizer.current().cloned());
        }

        Ok(tokens)
    }

    fn id(name: &str) -> Token {
        Token::Identifier(name.to_owned())
    }

    #[test]
    fn keywords_need_a_full_word() {
        let tokens = tokenize("classy class do_ doit do _if if9", CommentMode::Skip).unwrap();

        assert_eq!(
            tokens,
            vec![
                id("classy"),
                Token::Keyword(Keyword::Class),
                id("do_"),
                id("doit"),
                Token::Keyword(Keyword::Do),
                id("_if"),
                id("if9"),
            ]
        );
    }

    #[test]
    fn statement_tokens() {
        let tokens = tokenize("let s = \"hi there\";\nlet a[3]=~x;", CommentMode::Skip).unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Let),
                id("s"),
                Token::Symbol('='),
                Token::StringConstant("hi there".to_owned()),
                Token::Symbol(';'),
                Token::Keyword(Keyword::Let),
                id("a"),
                Token::Symbol('['),
                Token::IntegerConstant(3),
                Token::Symbol(']'),
                Token::Symbol('='),
                Token::Symbol('~'),
                id("x"),
                Token::Symbol(';'),
            ]
        );
    }

    #[test]
    fn digits_then_letters_split() {
        let tokens = tokenize("12abc", CommentMode::Skip).unwrap();
        assert_eq!(tokens, vec![Token::IntegerConstant(12), id("abc")]);
    }

    #[test]
    fn comments_are_skipped_across_lines() {
        let source = "/** doc\n * more\n */ let // trailing\n\n  x /* inline */ ;";
        let tokens = tokenize(source, CommentMode::Skip).unwrap();

        assert_eq!(
            tokens,
            vec![Token::Keyword(Keyword::Let), id("x"), Token::Symbol(';')]
        );
    }

    #[test]
    fn comments_can_be_surfaced() {
        let source = "/* a\n b */ x // c ";
        let tokens = tokenize(source, CommentMode::Surface).unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::BlockComment(" a\n b ".to_owned()),
                id("x"),
                Token::LineComment(" c ".to_owned()),
            ]
        );
    }

    #[test]
    fn long_comment_runs_do_not_recurse() {
        let source = "// c\n".repeat(100_000) + "x";
        let tokens = tokenize(&source, CommentMode::Skip).unwrap();
        assert_eq!(tokens, vec![id("x")]);
    }

    #[test]
    fn comment_mode_is_per_tokenizer() {
        let source = "// note\nx";
        let mut skipping = Tokenizer::new(source.as_bytes(), CommentMode::Skip);
        let mut surfacing = Tokenizer::new(source.as_bytes(), CommentMode::Surface);

        surfacing.advance().unwrap();
        skipping.advance().unwrap();

        assert!(surfacing.current().unwrap().is_comment());
        assert_eq!(skipping.current(), Some(&id("x")));
    }

    #[test]
    fn integer_bounds() {
        let tokens = tokenize("0 32767", CommentMode::Skip).unwrap();
        assert_eq!(
            tokens,
            vec![Token::IntegerConstant(0), Token::IntegerConstant(INT_MAX)]
        );

        for source in ["32768", "4294967295", "18446744073709551616"] {
            let error = tokenize(source, CommentMode::Skip).unwrap_err();
            assert!(matches!(error.reason(), Reason::IntegerRange(digits) if digits == source));
            assert_eq!(error.assumed_kind(), Some(TokenKind::IntegerConstant));
        }
    }

    #[test]
    fn unterminated_string_reports_context() {
        let source = "class Main {\n  let s = \"oops;\n}";
        let error = tokenize(source, CommentMode::Skip).unwrap_err();

        assert!(matches!(error.reason(), Reason::UnterminatedString));
        assert_eq!(error.line_number(), 2);
        assert_eq!(error.error_line(), "  let s = \"oops;");
        assert_eq!(error.untokenized(), "\"oops;");
        assert_eq!(error.assumed_kind(), Some(TokenKind::StringConstant));
    }

    #[test]
    fn unterminated_block_comment() {
        let error = tokenize("x /* never\nclosed", CommentMode::Skip).unwrap_err();

        assert!(matches!(error.reason(), Reason::UnterminatedComment));
        assert_eq!(error.line_number(), 2);
        assert_eq!(error.assumed_kind(), Some(TokenKind::BlockComment));
    }

    #[test]
    fn unrecognized_character() {
        let error = tokenize("let x = #;", CommentMode::Skip).unwrap_err();

        assert!(matches!(error.reason(), Reason::Unrecognized));
        assert_eq!(error.line_number(), 1);
        assert_eq!(error.untokenized(), "#;");
        assert_eq!(error.assumed_kind(), None);
    }

    #[test]
    fn end_of_input_is_not_an_error() {
        let mut tokenizer = Tokenizer::new("x\n\n   \n".as_bytes(), CommentMode::Skip);

        assert!(tokenizer.has_more_tokens());
        tokenizer.advance().unwrap();
        assert!(!tokenizer.has_more_tokens());

        tokenizer.advance().unwrap();
        assert_eq!(tokenizer.current(), None);
    }

    #[test]
    fn trailing_comment_leaves_no_token() {
        let mut tokenizer = Tokenizer::new("x // bye".as_bytes(), CommentMode::Skip);

        tokenizer.advance().unwrap();
        assert!(tokenizer.has_more_tokens());
        tokenizer.advance().unwrap();
        assert_eq!(tokenizer.current(), None);
    }

    #[test]
    fn token_sequence_replays_tokens() {
        let mut tokens: TokenSequence = vec![Token::Symbol('('), Token::Symbol(')')]
            .into_iter()
            .collect();

        assert_eq!(tokens.current(), None);
        assert!(tokens.has_more_tokens());

        tokens.advance().unwrap();
        assert_eq!(tokens.current(), Some(&Token::Symbol('(')));
        tokens.advance().unwrap();
        assert!(!tokens.has_more_tokens());
        tokens.advance().unwrap();
        assert_eq!(tokens.current(), None);
    }

    #[test]
    fn accessors_follow_the_variant() {
        let token = Token::IntegerConstant(7);

        assert_eq!(token.kind(), TokenKind::IntegerConstant);
        assert_eq!(token.int_value(), Some(7));
        assert_eq!(token.symbol(), None);
        assert_eq!(token.identifier(), None);
        assert_eq!(Keyword::from_str("constructor"), Ok(Keyword::Constructor));
        assert_eq!(Keyword::Boolean.to_string(), "boolean");
    }
}
