//! Compilation errors and their user-facing rendering.

use crate::{
    engine::{CompilationError, Reason},
    lex::TokenizerError,
    xml::TokensError,
};

use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::{Path, PathBuf},
    string::FromUtf8Error,
};

use thiserror::Error;

/// Any error that stops the compilation of a file.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error("Source is not valid UTF-8")]
    Encoding(#[from] FromUtf8Error),

    #[error("Failed to write output")]
    Io(#[from] io::Error),
}

impl CompileError {
    /// 1-based line where the error was detected, if known.
    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::Tokenizer(error) => Some(error.line_number()),
            CompileError::Compilation(error) => error.line(),
            CompileError::Encoding(error) => {
                let valid = &error.as_bytes()[..error.utf8_error().valid_up_to()];
                let breaks = valid.iter().filter(|&&byte| byte == b'\n').count();
                u32::try_from(breaks).ok()?.checked_add(1)
            }

            CompileError::Io(_) => None,
        }
    }

    /// Label of the phase that failed.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Tokenizer(_) => "Lexical error",
            CompileError::Compilation(error) => match error.reason() {
                Reason::Redefined(_) | Reason::Undeclared(_) => "Semantic error",
                _ => "Syntax error",
            },

            CompileError::Encoding(_) => "Encoding error",
            CompileError::Io(_) => "I/O error",
        }
    }
}

impl From<TokensError> for CompileError {
    fn from(error: TokensError) -> Self {
        match error {
            TokensError::Tokenizer(error) => CompileError::Tokenizer(error),
            TokensError::Output(error) => CompileError::Io(error),
        }
    }
}

/// A compile error attributed to a source file.
pub struct Diagnostic {
    path: PathBuf,
    source: String,
    error: CompileError,
}

impl Diagnostic {
    pub fn new(path: PathBuf, source: String, error: CompileError) -> Self {
        Diagnostic {
            path,
            source,
            error,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn error(&self) -> &CompileError {
        &self.error
    }

    /// Raw text of a source line.
    fn quote(&self, line: u32) -> Option<&str> {
        let index = line.checked_sub(1)? as usize;
        self.source.lines().nth(index)
    }

    fn render(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostic { path, error, .. } = self;

        writeln!(fmt, "{}: {}", error.kind(), error)?;

        let line = match error.line() {
            Some(line) => {
                writeln!(fmt, " --> {}:{}", path.display(), line)?;
                line
            }

            None => {
                writeln!(fmt, " --> {}", path.display())?;
                0
            }
        };

        let digits = line.to_string().chars().count();
        let quoted = match error {
            CompileError::Tokenizer(error) => Some(error.error_line()),
            _ => self.quote(line),
        };

        if let Some(text) = quoted {
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;
            writeln!(fmt, "{:>digits$} | {}", line, text, digits = digits)?;

            if let CompileError::Tokenizer(error) = error {
                let rest = error.untokenized().trim_end();
                let width = text.chars().count();
                let untokenized = error.untokenized().chars().count();

                if !rest.is_empty() && width >= untokenized {
                    let skip = width - untokenized;
                    let highlight = rest.chars().count();

                    writeln!(
                        fmt,
                        "{:digits$} | {:skip$}{:^<highlight$}",
                        "",
                        "",
                        "",
                        digits = digits,
                        skip = skip,
                        highlight = highlight
                    )?;
                }
            }
        }

        match error {
            CompileError::Tokenizer(error) => {
                if let Some(kind) = error.assumed_kind() {
                    writeln!(fmt, "{:digits$} = note: assumed {}", "", kind.tag(), digits = digits)?;
                }
            }

            CompileError::Compilation(error) => {
                let found = match error.found() {
                    Some(token) => token.to_string(),
                    None => String::from("end of input"),
                };

                write!(fmt, "{:digits$} = note: found {}", "", found, digits = digits)?;
                match error.production() {
                    Some(rule) => writeln!(fmt, " while compiling {}", rule)?,
                    None => writeln!(fmt)?,
                }
            }

            CompileError::Encoding(_) | CompileError::Io(_) => (),
        }

        let mut cause = error.source();
        while let Some(error) = cause {
            writeln!(fmt, "{:digits$} = caused by: {}", "", error, digits = digits)?;
            cause = error.source();
        }

        Ok(())
    }
}

/// A batch of diagnostics, rendered like a compiler's error listing.
#[derive(Default)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Diagnostics {
            errors: vec![diagnostic],
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            error.render(fmt)?;
            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Compilation failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::Engine,
        lex::{CommentMode, TokenSource, Tokenizer},
        vm::VmWriter,
    };

    fn compile(source: &str) -> CompileError {
        let tokenizer = Tokenizer::new(source.as_bytes(), CommentMode::Skip);
        let result = Engine::new(tokenizer, VmWriter::new(Vec::new()))
            .and_then(|mut engine| engine.compile_class());

        match result {
            Err(error) => error,
            Ok(()) => panic!("compilation succeeded"),
        }
    }

    fn render(source: &str) -> String {
        let error = compile(source);
        let diagnostic = Diagnostic::new(PathBuf::from("Main.jack"), source.to_owned(), error);
        Diagnostics::from(diagnostic).to_string()
    }

    #[test]
    fn tokenizer_errors_point_at_the_remainder() {
        let source = "class Main {\n  function void f() {\n    var String s;\n    let s = \"open;\n  }\n}";
        let output = render(source);
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines[0], "Lexical error: Invalid string constant, no closing \"");
        assert_eq!(lines[1], " --> Main.jack:4");
        assert_eq!(lines[2], "  |");
        assert_eq!(lines[3], "4 |     let s = \"open;");
        assert_eq!(lines[4], format!("  | {}^^^^^^", " ".repeat(12)));
        assert_eq!(lines[5], "  = note: assumed stringConstant");
        assert_eq!(lines.last(), Some(&"Compilation failed with 1 error"));
    }

    #[test]
    fn carets_count_characters_not_bytes() {
        let source = "class M {\n  function void f() {\n    var String s;\n    let s = \"\u{e9}\u{e9}\u{e9}\"; #\n  }\n}";
        let output = render(source);
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines[0], "Lexical error: Token not recognized");
        assert_eq!(lines[3], "4 |     let s = \"\u{e9}\u{e9}\u{e9}\"; #");

        let quoted = lines[3].chars().position(|c| c == '#');
        let caret = lines[4].chars().position(|c| c == '^');
        assert_eq!(caret, quoted);
        assert_eq!(lines[4].chars().filter(|&c| c == '^').count(), 1);
    }

    #[test]
    fn compilation_errors_name_token_and_production() {
        let output = render("class Main {\n  function void f() {\n    let x 1;\n  }\n}");

        assert!(output.starts_with("Syntax error: Expected `=`\n --> Main.jack:3\n"));
        assert!(output.contains("3 |     let x 1;\n"));
        assert!(output.contains("  = note: found integer `1` while compiling letStatement\n"));
    }

    #[test]
    fn line_numbers_follow_the_error() {
        let mut tokenizer = Tokenizer::new("\n\n  ?".as_bytes(), CommentMode::Skip);
        let error = CompileError::from(tokenizer.advance().unwrap_err());

        assert_eq!(error.line(), Some(3));
        assert!(matches!(error, CompileError::Tokenizer(_)));
    }

    #[test]
    fn encoding_errors_locate_the_first_bad_line() {
        let bytes = b"class Main {\n  // caf\xe9\n}\n".to_vec();
        let error = CompileError::from(String::from_utf8(bytes).unwrap_err());

        assert_eq!(error.line(), Some(2));
        assert_eq!(error.kind(), "Encoding error");
    }

    #[test]
    fn empty_batch() {
        let diagnostics = Diagnostics::default();
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.to_string(), "No errors were reported\n");
    }
}
