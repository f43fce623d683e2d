//! VM code emission.
//!
//! The target is a stack machine with eight memory segments. Every
//! [`Instruction`] renders to exactly one line of text; stack operations,
//! arithmetic and control transfers are indented by four spaces, while
//! `label` and `function` lines start at column 1.
//!
//! [`VmWriter`] performs no validation of operands. Choosing correct
//! segments and indices is the responsibility of the compilation engine.

use crate::{
    engine::Sink,
    symbol::Kind,
};

use std::{
    fmt::{self, Display},
    io::{self, Write},
};

/// Indentation for instructions other than `label` and `function`.
const INDENT: &str = "    ";

/// VM memory segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl From<Kind> for Segment {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }
}

impl Display for Segment {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        };

        fmt.write_str(string)
    }
}

/// Arithmetic and logical commands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl Command {
    /// Command for a binary operator symbol.
    ///
    /// `*` and `/` have no VM command and map to `None`, like any symbol
    /// that is not an operator.
    pub fn binary(symbol: char) -> Option<Command> {
        match symbol {
            '+' => Some(Command::Add),
            '-' => Some(Command::Sub),
            '=' => Some(Command::Eq),
            '>' => Some(Command::Gt),
            '<' => Some(Command::Lt),
            '&' => Some(Command::And),
            '|' => Some(Command::Or),
            _ => None,
        }
    }

    /// Command for a unary operator symbol.
    pub fn unary(symbol: char) -> Option<Command> {
        match symbol {
            '-' => Some(Command::Neg),
            '~' => Some(Command::Not),
            _ => None,
        }
    }
}

impl Display for Command {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Command::Add => "add",
            Command::Sub => "sub",
            Command::Neg => "neg",
            Command::Eq => "eq",
            Command::Gt => "gt",
            Command::Lt => "lt",
            Command::And => "and",
            Command::Or => "or",
            Command::Not => "not",
        };

        fmt.write_str(string)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(Command),
    Label(String),
    Goto(String),
    IfGoto(String),
    Call(String, u16),
    Function(String, u16),
    Return,
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Push(segment, index) => write!(fmt, "{}push {} {}", INDENT, segment, index),
            Pop(segment, index) => write!(fmt, "{}pop {} {}", INDENT, segment, index),
            Arithmetic(command) => write!(fmt, "{}{}", INDENT, command),
            Label(label) => write!(fmt, "label {}", label),
            Goto(label) => write!(fmt, "{}goto {}", INDENT, label),
            IfGoto(label) => write!(fmt, "{}if-goto {}", INDENT, label),
            Call(name, arguments) => write!(fmt, "{}call {} {}", INDENT, name, arguments),
            Function(name, locals) => write!(fmt, "function {} {}", name, locals),
            Return => write!(fmt, "{}return", INDENT),
        }
    }
}

/// Writes VM instructions, one per line.
pub struct VmWriter<W> {
    output: W,
}

impl<W: Write> VmWriter<W> {
    pub fn new(output: W) -> Self {
        VmWriter { output }
    }

    pub fn write(&mut self, instruction: &Instruction) -> io::Result<()> {
        writeln!(self.output, "{}", instruction)
    }

    pub fn write_push(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        self.write(&Instruction::Push(segment, index))
    }

    pub fn write_pop(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        self.write(&Instruction::Pop(segment, index))
    }

    pub fn write_arithmetic(&mut self, command: Command) -> io::Result<()> {
        self.write(&Instruction::Arithmetic(command))
    }

    pub fn write_label(&mut self, label: &str) -> io::Result<()> {
        self.write(&Instruction::Label(label.to_owned()))
    }

    pub fn write_goto(&mut self, label: &str) -> io::Result<()> {
        self.write(&Instruction::Goto(label.to_owned()))
    }

    pub fn write_if(&mut self, label: &str) -> io::Result<()> {
        self.write(&Instruction::IfGoto(label.to_owned()))
    }

    pub fn write_call(&mut self, name: &str, arguments: u16) -> io::Result<()> {
        self.write(&Instruction::Call(name.to_owned(), arguments))
    }

    pub fn write_function(&mut self, name: &str, locals: u16) -> io::Result<()> {
        self.write(&Instruction::Function(name.to_owned(), locals))
    }

    pub fn write_return(&mut self) -> io::Result<()> {
        self.write(&Instruction::Return)
    }

    /// Flushes and releases the output.
    pub fn close(mut self) -> io::Result<W> {
        self.output.flush()?;
        Ok(self.output)
    }
}

impl<W: Write> Sink for VmWriter<W> {
    fn emits_code(&self) -> bool {
        true
    }

    fn instruction(&mut self, instruction: Instruction) -> io::Result<()> {
        use Instruction::*;

        match instruction {
            Push(segment, index) => self.write_push(segment, index),
            Pop(segment, index) => self.write_pop(segment, index),
            Arithmetic(command) => self.write_arithmetic(command),
            Label(label) => self.write_label(&label),
            Goto(label) => self.write_goto(&label),
            IfGoto(label) => self.write_if(&label),
            Call(name, arguments) => self.write_call(&name, arguments),
            Function(name, locals) => self.write_function(&name, locals),
            Return => self.write_return(),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}
