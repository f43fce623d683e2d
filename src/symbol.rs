//! Symbol table.
//!
//! Identifiers live in one of two nested scopes. The class scope holds
//! `static` and `field` variables for the whole class; the subroutine scope
//! holds arguments and locals and is reset at every subroutine. Each kind has
//! its own running index, starting at 0 and increasing by one per definition.
//!
//! Identifiers found in neither scope are class or subroutine names, which
//! the language rules disambiguate without a table entry.

use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("The symbol `{name}` already exists in the {scope} scope")]
    Redefined { name: String, scope: Scope },
}

/// Storage class of a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    /// Scope where variables of this kind are defined.
    pub fn scope(self) -> Scope {
        match self {
            Kind::Static | Kind::Field => Scope::Class,
            Kind::Argument | Kind::Local => Scope::Subroutine,
        }
    }
}

impl Display for Kind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Kind::Static => "static",
            Kind::Field => "field",
            Kind::Argument => "argument",
            Kind::Local => "local",
        };

        fmt.write_str(string)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Class,
    Subroutine,
}

impl Display for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Class => fmt.write_str("class"),
            Scope::Subroutine => fmt.write_str("subroutine"),
        }
    }
}

/// Declared type of a variable: a primitive or a class name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Char,
    Boolean,
    Class(String),
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => fmt.write_str("int"),
            Type::Char => fmt.write_str("char"),
            Type::Boolean => fmt.write_str("boolean"),
            Type::Class(name) => fmt.write_str(name),
        }
    }
}

/// A table entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub typ: Type,
    pub kind: Kind,
    pub index: u16,
}

#[derive(Default)]
pub struct SymbolTable {
    class: HashMap<String, Symbol>,
    subroutine: HashMap<String, Symbol>,
    statics: u16,
    fields: u16,
    arguments: u16,
    locals: u16,
}

impl SymbolTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Starts a new subroutine scope. The class scope is untouched.
    pub fn start_subroutine(&mut self) {
        self.subroutine.clear();
        self.arguments = 0;
        self.locals = 0;
    }

    /// Defines a variable and returns the index it was given.
    pub fn define(&mut self, name: &str, typ: Type, kind: Kind) -> Result<u16, SymbolError> {
        let scope = kind.scope();
        let (symbols, counter) = match kind {
            Kind::Static => (&mut self.class, &mut self.statics),
            Kind::Field => (&mut self.class, &mut self.fields),
            Kind::Argument => (&mut self.subroutine, &mut self.arguments),
            Kind::Local => (&mut self.subroutine, &mut self.locals),
        };

        if symbols.contains_key(name) {
            return Err(SymbolError::Redefined {
                name: name.to_owned(),
                scope,
            });
        }

        let index = *counter;
        *counter += 1;

        symbols.insert(name.to_owned(), Symbol { typ, kind, index });
        Ok(index)
    }

    /// Number of variables of this kind defined in its current scope.
    pub fn var_count(&self, kind: Kind) -> u16 {
        match kind {
            Kind::Static => self.statics,
            Kind::Field => self.fields,
            Kind::Argument => self.arguments,
            Kind::Local => self.locals,
        }
    }

    /// Looks up a name, subroutine scope first.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.subroutine.get(name).or_else(|| self.class.get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.get(name).map(|symbol| symbol.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&Type> {
        self.get(name).map(|symbol| &symbol.typ)
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.get(name).map(|symbol| symbol.index)
    }
}
