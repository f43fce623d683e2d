//! Compiler for the Jack language.
//!
//! # Front end
//! Every compilation unit is a single source file holding exactly one class.
//! Its text is read line by line through [`source`] and split into tokens by
//! [`lex`]. Tokens are pulled on demand, one at a time, by the recursive
//! descent in [`engine`]; no token list and no syntax tree are ever
//! materialized.
//!
//! # Back end
//! The engine resolves variables through the two-scope table in [`symbol`]
//! and streams what it recognizes to a [`engine::Sink`]. Stack-machine code
//! is rendered by [`vm`]; the grammar-conformance XML renderings come from
//! [`xml`]. Compilation stops at the first error, which [`error`] renders for
//! humans.
//!
//! # Driver
//! [`driver`] maps paths to compilation units and output files and runs
//! whole directories in one go.

pub mod driver;
pub mod engine;
pub mod error;
pub mod lex;
pub mod source;
pub mod symbol;
pub mod vm;
pub mod xml;

pub use driver::{translate, Mode};
pub use error::CompileError;
