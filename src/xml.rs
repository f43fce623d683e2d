//! XML renderings used for grammar conformance testing.
//!
//! [`XmlWriter`] receives the parse tree from the compilation engine as a
//! stream of events in tree order: rule opened, terminal, rule closed. The
//! tree itself is never built. Each node takes one line, indented by two
//! spaces per nesting level.
//!
//! [`write_tokens`] renders the flat token listing of tokenize-only mode.

use crate::{
    engine::{Category, Identity, Sink},
    lex::{Token, TokenSource, TokenizerError},
};

use std::{
    fmt::{self, Display},
    io::{self, Write},
};

use log::debug;
use thiserror::Error;

/// Grammar rules that appear as non-terminal nodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    Class,
    ClassVarDec,
    SubroutineDec,
    ParameterList,
    SubroutineBody,
    VarDec,
    Statements,
    LetStatement,
    IfStatement,
    WhileStatement,
    DoStatement,
    ReturnStatement,
    Expression,
    Term,
    ExpressionList,
}

impl Rule {
    /// Element name of the rule.
    pub fn tag(self) -> &'static str {
        use Rule::*;

        match self {
            Class => "class",
            ClassVarDec => "classVarDec",
            SubroutineDec => "subroutineDec",
            ParameterList => "parameterList",
            SubroutineBody => "subroutineBody",
            VarDec => "varDec",
            Statements => "statements",
            LetStatement => "letStatement",
            IfStatement => "ifStatement",
            WhileStatement => "whileStatement",
            DoStatement => "doStatement",
            ReturnStatement => "returnStatement",
            Expression => "expression",
            Term => "term",
            ExpressionList => "expressionList",
        }
    }
}

impl Display for Rule {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.tag())
    }
}

/// Escapes the characters that XML reserves in text content.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

/// Streams parse-tree events as indented XML.
pub struct XmlWriter<W> {
    output: W,
    depth: usize,
    extended: bool,
}

impl<W: Write> XmlWriter<W> {
    /// Plain parse tree.
    pub fn new(output: W) -> Self {
        XmlWriter {
            output,
            depth: 0,
            extended: false,
        }
    }

    /// Parse tree whose identifiers carry their category, usage and index.
    pub fn extended(output: W) -> Self {
        XmlWriter {
            extended: true,
            ..XmlWriter::new(output)
        }
    }

    /// Flushes and releases the output.
    pub fn close(mut self) -> io::Result<W> {
        self.output.flush()?;
        Ok(self.output)
    }

    fn indent(&mut self) -> io::Result<()> {
        write!(self.output, "{:width$}", "", width = 2 * self.depth)
    }
}

impl<W: Write> Sink for XmlWriter<W> {
    fn begin(&mut self, rule: Rule) -> io::Result<()> {
        self.indent()?;
        writeln!(self.output, "<{}>", rule)?;
        self.depth += 1;
        Ok(())
    }

    fn end(&mut self, rule: Rule) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.indent()?;
        writeln!(self.output, "</{}>", rule)
    }

    fn terminal(&mut self, token: &Token, identity: Option<&Identity>) -> io::Result<()> {
        self.indent()?;

        let tag = token.kind().tag();
        let text = escape(&token.text());

        match identity {
            Some(identity) if self.extended => {
                write!(self.output, "<{} category=\"{}\"", tag, identity.category)?;
                write!(self.output, " usage=\"{}\"", identity.usage)?;

                if let Category::Variable(_) = identity.category {
                    if let Some(index) = identity.index {
                        write!(self.output, " index=\"{}\"", index)?;
                    }
                }

                writeln!(self.output, "> {} </{}>", text, tag)
            }

            _ => writeln!(self.output, "<{0}> {1} </{0}>", tag, text),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TokensError {
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error("I/O error")]
    Output(#[from] io::Error),
}

/// Renders every token of a source as a flat `<tokens>` listing.
///
/// Comment tokens are not part of the listing; when the source surfaces
/// them they are logged instead.
pub fn write_tokens<T, W>(tokens: &mut T, output: &mut W) -> Result<(), TokensError>
where
    T: TokenSource,
    W: Write,
{
    writeln!(output, "<tokens>")?;

    while tokens.has_more_tokens() {
        tokens.advance()?;

        match tokens.current() {
            None => break,
            Some(token) if token.is_comment() => {
                debug!("comment: {}", token.comment_text().unwrap_or_default());
            }

            Some(token) => {
                let tag = token.kind().tag();
                writeln!(output, "<{0}> {1} </{0}>", tag, escape(&token.text()))?;
            }
        }
    }

    writeln!(output, "</tokens>")?;
    output.flush()?;

    Ok(())
}
