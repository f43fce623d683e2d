//! Syntax-directed translation.
//!
//! The [`Engine`] is a recursive-descent parser with one method per grammar
//! production. It pulls tokens from a [`TokenSource`] one at a time and, as
//! each production is recognized, streams events to a [`Sink`]: rule
//! boundaries and terminals for XML renderings, instructions for VM code. A
//! sink ignores whatever it has no use for, so the same pass drives every
//! output mode.
//!
//! # Parsing discipline
//! Every production method is entered with the first token of its production
//! as the current token and returns with the first token *after* the
//! production as the current token. No production backtracks.
//!
//! # Code generation
//! Variables resolve through the [`SymbolTable`]: statics, fields, arguments
//! and locals map to their own segments. Methods receive the object as
//! argument 0 and constructors allocate one word per field. Every call leaves
//! exactly one value on the stack, so `do` statements discard it and `return;`
//! pushes a dummy 0.

use crate::{
    error::CompileError,
    lex::{Keyword, Token, TokenSource},
    symbol::{Kind, Symbol, SymbolError, SymbolTable, Type},
    vm::{Command, Instruction, Segment},
    xml::Rule,
};

use std::{
    fmt::{self, Display},
    io,
};

use log::debug;
use thiserror::Error;

/// Binary operator symbols.
const OPERATORS: &str = "+-*/&|<>=";

/// Receiver of the events produced during compilation.
///
/// Every event has a no-op default, which lets each output format implement
/// only the part of the translation it renders.
pub trait Sink {
    /// Whether this sink renders VM code. Unresolved variables are only fatal
    /// when it does.
    fn emits_code(&self) -> bool {
        false
    }

    /// A non-terminal starts.
    fn begin(&mut self, _rule: Rule) -> io::Result<()> {
        Ok(())
    }

    /// A non-terminal ends.
    fn end(&mut self, _rule: Rule) -> io::Result<()> {
        Ok(())
    }

    /// A terminal, with its resolution when it is an identifier.
    fn terminal(&mut self, _token: &Token, _identity: Option<&Identity>) -> io::Result<()> {
        Ok(())
    }

    fn instruction(&mut self, _instruction: Instruction) -> io::Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()>;
}

/// What an identifier names.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Category {
    Class,
    Subroutine,
    Variable(Kind),
}

impl Display for Category {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Class => fmt.write_str("class"),
            Category::Subroutine => fmt.write_str("subroutine"),
            Category::Variable(kind) => kind.fmt(fmt),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Usage {
    Declared,
    Used,
}

impl Display for Usage {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Usage::Declared => fmt.write_str("declared"),
            Usage::Used => fmt.write_str("used"),
        }
    }
}

/// Resolution of an identifier terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub category: Category,
    pub usage: Usage,

    /// Running index, for variables only.
    pub index: Option<u16>,
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Reason {
    #[error("Expected {0}")]
    Expected(String),

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Expected end of input after the class declaration")]
    TrailingInput,

    #[error("Undeclared variable `{0}`")]
    Undeclared(String),

    #[error(transparent)]
    Redefined(#[from] SymbolError),

    #[error("String constant cannot be represented as VM constants")]
    StringConstant,
}

/// A structural violation, located by the production being compiled, the
/// current token and its line.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct CompilationError {
    reason: Reason,
    production: Option<Rule>,
    found: Option<Token>,
    line: Option<u32>,
}

impl CompilationError {
    pub fn reason(&self) -> &Reason {
        &self.reason
    }

    /// Innermost production being compiled.
    pub fn production(&self) -> Option<Rule> {
        self.production
    }

    /// Current token when the error was detected, `None` at end of input.
    pub fn found(&self) -> Option<&Token> {
        self.found.as_ref()
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }
}

type Compile<T> = Result<T, CompileError>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// Recursive-descent compiler for one class.
pub struct Engine<T, S> {
    tokens: T,
    sink: S,
    symbols: SymbolTable,
    class_name: String,
    subroutine_name: String,
    subroutine_kind: SubroutineKind,
    labels: u32,
    rules: Vec<Rule>,
}

impl<T: TokenSource, S: Sink> Engine<T, S> {
    /// Creates an engine and makes the first token current.
    pub fn new(mut tokens: T, sink: S) -> Result<Self, CompileError> {
        tokens.advance()?;

        Ok(Engine {
            tokens,
            sink,
            symbols: SymbolTable::new(),
            class_name: String::new(),
            subroutine_name: String::new(),
            subroutine_kind: SubroutineKind::Function,
            labels: 0,
            rules: Vec::new(),
        })
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn current(&self) -> Option<&Token> {
        self.tokens.current()
    }

    /// Flushes and releases the sink.
    pub fn finish(mut self) -> io::Result<S> {
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// `'class' className '{' classVarDec* subroutineDec* '}'`
    pub fn compile_class(&mut self) -> Compile<()> {
        self.begin(Rule::Class)?;
        self.keyword(Keyword::Class)?;

        let name = self.identifier()?;
        self.emit_name(&name, Some(Category::Class), Usage::Declared)?;
        self.class_name = name;

        self.symbol('{')?;

        while self.is_keyword(Keyword::Static) || self.is_keyword(Keyword::Field) {
            self.compile_class_var_dec()?;
        }

        while self.is_keyword(Keyword::Constructor)
            || self.is_keyword(Keyword::Function)
            || self.is_keyword(Keyword::Method)
        {
            self.compile_subroutine()?;
        }

        self.symbol('}')?;
        self.end(Rule::Class)?;

        match self.tokens.current() {
            None => Ok(()),
            Some(_) => Err(self.fail(Reason::TrailingInput)),
        }
    }

    /// `('static' | 'field') type varName (',' varName)* ';'`
    pub fn compile_class_var_dec(&mut self) -> Compile<()> {
        self.begin(Rule::ClassVarDec)?;

        let kind = match self.current_keyword() {
            Some(Keyword::Static) => Kind::Static,
            Some(Keyword::Field) => Kind::Field,
            _ => return self.expected("`static` or `field`"),
        };

        self.shift()?;
        self.declarations(kind)?;
        self.end(Rule::ClassVarDec)
    }

    /// `('constructor' | 'function' | 'method') ('void' | type) subroutineName
    /// '(' parameterList ')' subroutineBody`
    pub fn compile_subroutine(&mut self) -> Compile<()> {
        self.begin(Rule::SubroutineDec)?;

        let kind = match self.current_keyword() {
            Some(Keyword::Constructor) => SubroutineKind::Constructor,
            Some(Keyword::Function) => SubroutineKind::Function,
            Some(Keyword::Method) => SubroutineKind::Method,
            _ => return self.expected("`constructor`, `function` or `method`"),
        };

        self.shift()?;
        self.symbols.start_subroutine();
        self.subroutine_kind = kind;

        if kind == SubroutineKind::Method {
            // The receiver takes argument 0
            let receiver = Type::Class(self.class_name.clone());
            self.define("this", receiver, Kind::Argument)?;
        }

        if self.is_keyword(Keyword::Void) {
            self.shift()?;
        } else {
            self.typ()?;
        }

        let name = self.identifier()?;
        self.emit_name(&name, Some(Category::Subroutine), Usage::Declared)?;
        self.subroutine_name = name;

        self.symbol('(')?;
        self.compile_parameter_list()?;
        self.symbol(')')?;
        self.compile_subroutine_body()?;

        self.end(Rule::SubroutineDec)
    }

    /// `((type varName) (',' type varName)*)?`
    ///
    /// Stops at the closing parenthesis without consuming it.
    pub fn compile_parameter_list(&mut self) -> Compile<()> {
        self.begin(Rule::ParameterList)?;

        if !self.is_symbol(')') {
            loop {
                let typ = self.typ()?;
                self.declare(&typ, Kind::Argument)?;

                if !self.is_symbol(',') {
                    break;
                }

                self.shift()?;
            }
        }

        self.end(Rule::ParameterList)
    }

    /// `'{' varDec* statements '}'`
    pub fn compile_subroutine_body(&mut self) -> Compile<()> {
        self.begin(Rule::SubroutineBody)?;
        self.symbol('{')?;

        while self.is_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let function = format!("{}.{}", self.class_name, self.subroutine_name);
        let locals = self.symbols.var_count(Kind::Local);

        debug!("function {} ({:?}, {} locals)", function, self.subroutine_kind, locals);
        self.emit(Instruction::Function(function, locals))?;

        match self.subroutine_kind {
            SubroutineKind::Constructor => {
                let fields = self.symbols.var_count(Kind::Field);
                self.push(Segment::Constant, fields)?;
                self.call("Memory.alloc", 1)?;
                self.pop(Segment::Pointer, 0)?;
            }

            SubroutineKind::Method => {
                self.push(Segment::Argument, 0)?;
                self.pop(Segment::Pointer, 0)?;
            }

            SubroutineKind::Function => (),
        }

        self.compile_statements()?;
        self.symbol('}')?;

        self.end(Rule::SubroutineBody)
    }

    /// `'var' type varName (',' varName)* ';'`
    pub fn compile_var_dec(&mut self) -> Compile<()> {
        self.begin(Rule::VarDec)?;
        self.keyword(Keyword::Var)?;
        self.declarations(Kind::Local)?;
        self.end(Rule::VarDec)
    }

    /// `statement*`
    pub fn compile_statements(&mut self) -> Compile<()> {
        self.begin(Rule::Statements)?;

        loop {
            match self.current_keyword() {
                Some(Keyword::Let) => self.compile_let()?,
                Some(Keyword::If) => self.compile_if()?,
                Some(Keyword::While) => self.compile_while()?,
                Some(Keyword::Do) => self.compile_do()?,
                Some(Keyword::Return) => self.compile_return()?,
                _ => break,
            }
        }

        self.end(Rule::Statements)
    }

    /// `'let' varName ('[' expression ']')? '=' expression ';'`
    pub fn compile_let(&mut self) -> Compile<()> {
        self.begin(Rule::LetStatement)?;
        self.keyword(Keyword::Let)?;

        let name = self.identifier()?;
        let target = self.variable(&name)?;
        self.emit_variable(&name, target.as_ref())?;

        if self.is_symbol('[') {
            self.shift()?;
            self.push_variable(target.as_ref())?;
            self.compile_expression()?;
            self.symbol(']')?;
            self.arithmetic(Command::Add)?;

            self.symbol('=')?;
            self.compile_expression()?;
            self.symbol(';')?;

            self.pop(Segment::Temp, 0)?;
            self.pop(Segment::Pointer, 1)?;
            self.push(Segment::Temp, 0)?;
            self.pop(Segment::That, 0)?;
        } else {
            self.symbol('=')?;
            self.compile_expression()?;
            self.symbol(';')?;

            if let Some(target) = target {
                self.pop(Segment::from(target.kind), target.index)?;
            }
        }

        self.end(Rule::LetStatement)
    }

    /// `'if' '(' expression ')' '{' statements '}' ('else' '{' statements '}')?`
    pub fn compile_if(&mut self) -> Compile<()> {
        self.begin(Rule::IfStatement)?;
        self.keyword(Keyword::If)?;

        let label = self.next_label();
        let else_label = format!("IF_ELSE{}", label);
        let end_label = format!("IF_END{}", label);

        self.condition()?;
        self.emit(Instruction::IfGoto(else_label.clone()))?;
        self.block()?;
        self.emit(Instruction::Goto(end_label.clone()))?;
        self.emit(Instruction::Label(else_label))?;

        if self.is_keyword(Keyword::Else) {
            self.shift()?;
            self.block()?;
        }

        self.emit(Instruction::Label(end_label))?;
        self.end(Rule::IfStatement)
    }

    /// `'while' '(' expression ')' '{' statements '}'`
    pub fn compile_while(&mut self) -> Compile<()> {
        self.begin(Rule::WhileStatement)?;
        self.keyword(Keyword::While)?;

        let label = self.next_label();
        let test_label = format!("WHILE_EXP{}", label);
        let end_label = format!("WHILE_END{}", label);

        self.emit(Instruction::Label(test_label.clone()))?;
        self.condition()?;
        self.emit(Instruction::IfGoto(end_label.clone()))?;
        self.block()?;
        self.emit(Instruction::Goto(test_label))?;
        self.emit(Instruction::Label(end_label))?;

        self.end(Rule::WhileStatement)
    }

    /// `'do' subroutineCall ';'`
    pub fn compile_do(&mut self) -> Compile<()> {
        self.begin(Rule::DoStatement)?;
        self.keyword(Keyword::Do)?;

        let name = self.identifier()?;
        self.subroutine_call(name)?;
        self.symbol(';')?;

        // Discard the returned value
        self.pop(Segment::Temp, 0)?;

        self.end(Rule::DoStatement)
    }

    /// `'return' expression? ';'`
    pub fn compile_return(&mut self) -> Compile<()> {
        self.begin(Rule::ReturnStatement)?;
        self.keyword(Keyword::Return)?;

        if self.is_symbol(';') {
            self.push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }

        self.symbol(';')?;
        self.emit(Instruction::Return)?;

        self.end(Rule::ReturnStatement)
    }

    /// `term (op term)*`, evaluated strictly left to right.
    pub fn compile_expression(&mut self) -> Compile<()> {
        self.begin(Rule::Expression)?;
        self.compile_term()?;

        while let Some(operator) = self.current_operator() {
            self.shift()?;
            self.compile_term()?;

            match operator {
                '*' => self.call("Math.multiply", 2)?,
                '/' => self.call("Math.divide", 2)?,
                _ => {
                    if let Some(command) = Command::binary(operator) {
                        self.arithmetic(command)?;
                    }
                }
            }
        }

        self.end(Rule::Expression)
    }

    /// `integerConstant | stringConstant | keywordConstant | varName |
    /// varName '[' expression ']' | subroutineCall | '(' expression ')' |
    /// unaryOp term`
    pub fn compile_term(&mut self) -> Compile<()> {
        self.begin(Rule::Term)?;

        let token = match self.tokens.current() {
            Some(token) => token.clone(),
            None => return Err(self.fail(Reason::UnexpectedEof)),
        };

        match token {
            Token::IntegerConstant(value) => {
                self.shift()?;
                self.push(Segment::Constant, value)?;
            }

            Token::StringConstant(value) => {
                let (length, characters) = self.string_characters(&value)?;
                self.shift()?;
                self.string(length, &characters)?;
            }

            Token::Keyword(Keyword::True) => {
                self.shift()?;
                self.push(Segment::Constant, 0)?;
                self.arithmetic(Command::Not)?;
            }

            Token::Keyword(Keyword::False | Keyword::Null) => {
                self.shift()?;
                self.push(Segment::Constant, 0)?;
            }

            Token::Keyword(Keyword::This) => {
                self.shift()?;
                self.push(Segment::Pointer, 0)?;
            }

            Token::Symbol('(') => {
                self.shift()?;
                self.compile_expression()?;
                self.symbol(')')?;
            }

            Token::Symbol(operator @ ('-' | '~')) => {
                self.shift()?;
                self.compile_term()?;

                if let Some(command) = Command::unary(operator) {
                    self.arithmetic(command)?;
                }
            }

            Token::Identifier(name) => {
                self.tokens.advance()?;

                if self.is_symbol('(') || self.is_symbol('.') {
                    self.subroutine_call(name)?;
                } else {
                    let variable = self.variable(&name)?;
                    self.emit_variable(&name, variable.as_ref())?;
                    self.push_variable(variable.as_ref())?;

                    if self.is_symbol('[') {
                        self.shift()?;
                        self.compile_expression()?;
                        self.symbol(']')?;

                        self.arithmetic(Command::Add)?;
                        self.pop(Segment::Pointer, 1)?;
                        self.push(Segment::That, 0)?;
                    }
                }
            }

            _ => return self.expected("a term"),
        }

        self.end(Rule::Term)
    }

    /// `(expression (',' expression)*)?`
    ///
    /// Returns the number of expressions. Stops at the closing parenthesis
    /// without consuming it.
    pub fn compile_expression_list(&mut self) -> Compile<u16> {
        self.begin(Rule::ExpressionList)?;

        let mut count = 0;
        if !self.is_symbol(')') {
            self.compile_expression()?;
            count += 1;

            while self.is_symbol(',') {
                self.shift()?;
                self.compile_expression()?;
                count += 1;
            }
        }

        self.end(Rule::ExpressionList)?;
        Ok(count)
    }

    /// `subroutineName '(' expressionList ')' |
    /// (className | varName) '.' subroutineName '(' expressionList ')'`
    ///
    /// The leading identifier has already been consumed; the current token
    /// is `(` or `.`.
    fn subroutine_call(&mut self, name: String) -> Compile<()> {
        let (function, receivers) = if self.is_symbol('.') {
            let object = self.symbols.get(&name).cloned();
            match &object {
                Some(symbol) => {
                    self.emit_variable(&name, Some(symbol))?;
                    self.push(Segment::from(symbol.kind), symbol.index)?;
                }

                None => self.emit_name(&name, Some(Category::Class), Usage::Used)?,
            }

            self.shift()?;
            let subroutine = self.identifier()?;
            self.emit_name(&subroutine, Some(Category::Subroutine), Usage::Used)?;

            match object {
                Some(symbol) => (format!("{}.{}", symbol.typ, subroutine), 1),
                None => (format!("{}.{}", name, subroutine), 0),
            }
        } else {
            // Method of the current object
            self.emit_name(&name, Some(Category::Subroutine), Usage::Used)?;
            self.push(Segment::Pointer, 0)?;

            (format!("{}.{}", self.class_name, name), 1)
        };

        self.symbol('(')?;
        let arguments = self.compile_expression_list()?;
        self.symbol(')')?;

        self.call(&function, arguments + receivers)
    }

    /// `'(' expression ')'` followed by the negation used by branches.
    fn condition(&mut self) -> Compile<()> {
        self.symbol('(')?;
        self.compile_expression()?;
        self.symbol(')')?;
        self.arithmetic(Command::Not)
    }

    /// `'{' statements '}'`
    fn block(&mut self) -> Compile<()> {
        self.symbol('{')?;
        self.compile_statements()?;
        self.symbol('}')
    }

    /// `type varName (',' varName)* ';'`
    fn declarations(&mut self, kind: Kind) -> Compile<()> {
        let typ = self.typ()?;
        self.declare(&typ, kind)?;

        while self.is_symbol(',') {
            self.shift()?;
            self.declare(&typ, kind)?;
        }

        self.symbol(';')
    }

    /// `'int' | 'char' | 'boolean' | className`
    fn typ(&mut self) -> Compile<Type> {
        let typ = match self.current_keyword() {
            Some(Keyword::Int) => Type::Int,
            Some(Keyword::Char) => Type::Char,
            Some(Keyword::Boolean) => Type::Boolean,

            _ => {
                let name = match self.tokens.current() {
                    Some(Token::Identifier(_)) => self.identifier()?,
                    _ => return self.expected("a type"),
                };

                self.emit_name(&name, Some(Category::Class), Usage::Used)?;
                return Ok(Type::Class(name));
            }
        };

        self.shift()?;
        Ok(typ)
    }

    fn declare(&mut self, typ: &Type, kind: Kind) -> Compile<()> {
        let name = self.identifier()?;
        self.define(&name, typ.clone(), kind)?;
        self.emit_name(&name, Some(Category::Variable(kind)), Usage::Declared)
    }

    fn define(&mut self, name: &str, typ: Type, kind: Kind) -> Compile<()> {
        match self.symbols.define(name, typ, kind) {
            Ok(_) => Ok(()),
            Err(error) => Err(self.fail(error.into())),
        }
    }

    /// Resolves a variable reference. Unknown names are only an error when
    /// generating code.
    fn variable(&self, name: &str) -> Compile<Option<Symbol>> {
        match self.symbols.get(name) {
            Some(symbol) => Ok(Some(symbol.clone())),
            None if self.sink.emits_code() => Err(self.fail(Reason::Undeclared(name.to_owned()))),
            None => Ok(None),
        }
    }

    fn push_variable(&mut self, variable: Option<&Symbol>) -> Compile<()> {
        match variable {
            Some(symbol) => self.push(Segment::from(symbol.kind), symbol.index),
            None => Ok(()),
        }
    }

    fn emit_variable(&mut self, name: &str, variable: Option<&Symbol>) -> Compile<()> {
        let category = variable.map(|symbol| Category::Variable(symbol.kind));
        self.emit_name(name, category, Usage::Used)
    }

    /// Emits an identifier terminal that was consumed by [`Engine::identifier()`].
    fn emit_name(&mut self, name: &str, category: Option<Category>, usage: Usage) -> Compile<()> {
        let identity = category.map(|category| Identity {
            category,
            usage,
            index: match category {
                Category::Variable(_) => self.symbols.index_of(name),
                _ => None,
            },
        });

        let token = Token::Identifier(name.to_owned());
        self.sink.terminal(&token, identity.as_ref())?;

        Ok(())
    }

    /// Length and character codes of a string constant, checked while the
    /// constant is still the current token.
    fn string_characters(&self, value: &str) -> Compile<(u16, Vec<u16>)> {
        let characters = value
            .chars()
            .map(|c| {
                u16::try_from(u32::from(c))
                    .ok()
                    .filter(|&code| code <= crate::lex::INT_MAX)
                    .ok_or_else(|| self.fail(Reason::StringConstant))
            })
            .collect::<Compile<Vec<u16>>>()?;

        let length = u16::try_from(characters.len())
            .ok()
            .filter(|&length| length <= crate::lex::INT_MAX)
            .ok_or_else(|| self.fail(Reason::StringConstant))?;

        Ok((length, characters))
    }

    fn string(&mut self, length: u16, characters: &[u16]) -> Compile<()> {
        self.push(Segment::Constant, length)?;
        self.call("String.new", 1)?;

        for &code in characters {
            self.push(Segment::Constant, code)?;
            self.call("String.appendChar", 2)?;
        }

        Ok(())
    }

    fn next_label(&mut self) -> u32 {
        let label = self.labels;
        self.labels += 1;
        label
    }

    fn begin(&mut self, rule: Rule) -> Compile<()> {
        self.sink.begin(rule)?;
        self.rules.push(rule);
        Ok(())
    }

    fn end(&mut self, rule: Rule) -> Compile<()> {
        self.rules.pop();
        self.sink.end(rule)?;
        Ok(())
    }

    fn emit(&mut self, instruction: Instruction) -> Compile<()> {
        self.sink.instruction(instruction)?;
        Ok(())
    }

    fn push(&mut self, segment: Segment, index: u16) -> Compile<()> {
        self.emit(Instruction::Push(segment, index))
    }

    fn pop(&mut self, segment: Segment, index: u16) -> Compile<()> {
        self.emit(Instruction::Pop(segment, index))
    }

    fn arithmetic(&mut self, command: Command) -> Compile<()> {
        self.emit(Instruction::Arithmetic(command))
    }

    fn call(&mut self, function: &str, arguments: u16) -> Compile<()> {
        self.emit(Instruction::Call(function.to_owned(), arguments))
    }

    fn current_keyword(&self) -> Option<Keyword> {
        self.tokens.current().and_then(Token::keyword)
    }

    fn current_operator(&self) -> Option<char> {
        self.tokens
            .current()
            .and_then(Token::symbol)
            .filter(|&symbol| OPERATORS.contains(symbol))
    }

    fn is_symbol(&self, symbol: char) -> bool {
        self.tokens
            .current()
            .map_or(false, |token| token.is_symbol(symbol))
    }

    fn is_keyword(&self, keyword: Keyword) -> bool {
        self.current_keyword() == Some(keyword)
    }

    /// Emits the current token as a terminal and advances past it.
    fn shift(&mut self) -> Compile<Token> {
        let token = match self.tokens.current() {
            Some(token) => token.clone(),
            None => return Err(self.fail(Reason::UnexpectedEof)),
        };

        self.sink.terminal(&token, None)?;
        self.tokens.advance()?;

        Ok(token)
    }

    fn symbol(&mut self, symbol: char) -> Compile<()> {
        if self.is_symbol(symbol) {
            self.shift()?;
            Ok(())
        } else {
            self.expected(format!("`{}`", symbol))
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Compile<()> {
        if self.is_keyword(keyword) {
            self.shift()?;
            Ok(())
        } else {
            self.expected(format!("keyword `{}`", keyword))
        }
    }

    /// Consumes an identifier without emitting it. The caller emits it once
    /// it knows what the identifier names.
    fn identifier(&mut self) -> Compile<String> {
        let name = match self.tokens.current() {
            Some(Token::Identifier(name)) => name.clone(),
            _ => return self.expected("an identifier"),
        };

        self.tokens.advance()?;
        Ok(name)
    }

    fn expected<R>(&self, what: impl Into<String>) -> Compile<R> {
        Err(self.fail(Reason::Expected(what.into())))
    }

    fn fail(&self, reason: Reason) -> CompileError {
        let reason = match (reason, self.tokens.current()) {
            (Reason::Expected(_), None) => Reason::UnexpectedEof,
            (reason, _) => reason,
        };

        CompileError::from(CompilationError {
            reason,
            production: self.rules.last().copied(),
            found: self.tokens.current().cloned(),
            line: self.tokens.line(),
        })
    }
}
