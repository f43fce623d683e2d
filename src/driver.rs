//! Batch driver.
//!
//! Maps a path given on the command line to the compilation units it
//! designates, runs each one through the selected [`Mode`] and writes the
//! result next to its source. The core modules never touch the filesystem;
//! everything path-related lives here.

use crate::{
    engine::{Engine, Sink},
    error::{CompileError, Diagnostic, Diagnostics},
    lex::{CommentMode, Tokenizer},
    vm::VmWriter,
    xml::{self, XmlWriter},
};

use std::{
    fmt::{self, Display},
    fs::{self, File},
    io::{self, BufRead, BufWriter, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use bitflags::bitflags;
use log::{info, warn};
use thiserror::Error;

/// Extension of compilation units.
pub const SOURCE_EXTENSION: &str = "jack";

bitflags! {
    /// Options applied to a batch.
    pub struct Options: u32 {
        /// Continue with the remaining files after one fails to compile.
        const KEEP_GOING = 0x01;

        /// Write every output to stdout instead of files.
        const STDOUT = 0x02;
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("No .{} files found at {}", SOURCE_EXTENSION, .0.display())]
    NoSources(PathBuf),

    #[error("Failed to scan {}", .path.display())]
    Scan { path: PathBuf, source: io::Error },

    #[error("Failed to read {}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to create {}", .path.display())]
    Create { path: PathBuf, source: io::Error },
}

/// What to produce for each compilation unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Flat token listing.
    Tokenize,

    /// Parse tree.
    Parse,

    /// Parse tree with identifier resolution.
    ExtendedParse,

    /// VM code.
    Compile,
}

impl Mode {
    /// Extension of output files.
    pub fn suffix(self) -> &'static str {
        match self {
            Mode::Tokenize | Mode::Parse | Mode::ExtendedParse => "xml",
            Mode::Compile => "vm",
        }
    }
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "tokenize" => Ok(Mode::Tokenize),
            "parse" => Ok(Mode::Parse),
            "extended-parse" => Ok(Mode::ExtendedParse),
            "compile" => Ok(Mode::Compile),
            _ => Err(()),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Mode::Tokenize => "tokenize",
            Mode::Parse => "parse",
            Mode::ExtendedParse => "extended-parse",
            Mode::Compile => "compile",
        };

        fmt.write_str(string)
    }
}

/// Outcome of a batch.
#[derive(Default)]
pub struct Report {
    compiled: Vec<PathBuf>,
    diagnostics: Diagnostics,
}

impl Report {
    /// Sources that were translated successfully, in order.
    pub fn compiled(&self) -> &[PathBuf] {
        &self.compiled
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Lists the compilation units at a path.
///
/// A file is a unit by itself. A directory contributes every `.jack` file
/// directly inside it, sorted by name; subdirectories are not searched.
pub fn discover(path: &Path) -> Result<Vec<PathBuf>, DriverError> {
    let scan_error = |source| DriverError::Scan {
        path: path.to_owned(),
        source,
    };

    let metadata = fs::metadata(path).map_err(scan_error)?;
    if !metadata.is_dir() {
        if is_source(path) {
            return Ok(vec![path.to_owned()]);
        }

        return Err(DriverError::NoSources(path.to_owned()));
    }

    let mut sources = Vec::new();
    for entry in fs::read_dir(path).map_err(scan_error)? {
        let entry = entry.map_err(scan_error)?;
        let file_type = entry.file_type().map_err(scan_error)?;

        if !file_type.is_dir() && is_source(&entry.path()) {
            sources.push(entry.path());
        }
    }

    if sources.is_empty() {
        return Err(DriverError::NoSources(path.to_owned()));
    }

    sources.sort();
    Ok(sources)
}

/// Output file for a source: same directory and stem, mode suffix.
pub fn output_path(source: &Path, mode: Mode) -> PathBuf {
    source.with_extension(mode.suffix())
}

/// Translates one compilation unit.
///
/// The tokenizer, engine and sink live only for this call. Output is flushed
/// on success; on failure it may be incomplete.
pub fn translate<R, W>(mode: Mode, input: R, output: W) -> Result<(), CompileError>
where
    R: BufRead,
    W: Write,
{
    match mode {
        Mode::Tokenize => {
            let mut tokenizer = Tokenizer::new(input, CommentMode::Surface);
            let mut output = output;

            xml::write_tokens(&mut tokenizer, &mut output)?;
        }

        Mode::Parse => {
            compile(input, XmlWriter::new(output))?.close()?;
        }

        Mode::ExtendedParse => {
            compile(input, XmlWriter::extended(output))?.close()?;
        }

        Mode::Compile => {
            compile(input, VmWriter::new(output))?.close()?;
        }
    }

    Ok(())
}

fn compile<R: BufRead, S: Sink>(input: R, sink: S) -> Result<S, CompileError> {
    let tokenizer = Tokenizer::new(input, CommentMode::Skip);

    let mut engine = Engine::new(tokenizer, sink)?;
    engine.compile_class()?;

    Ok(engine.finish()?)
}

/// Translates every compilation unit at a path.
///
/// Compile errors are collected in the returned [`Report`], including
/// sources that are not valid UTF-8. Unless [`Options::KEEP_GOING`] is given,
/// the batch stops at the first one. A failed unit leaves no output file
/// behind.
pub fn run(path: &Path, mode: Mode, options: Options) -> Result<Report, DriverError> {
    let mut report = Report::default();

    for source_path in discover(path)? {
        let bytes = fs::read(&source_path).map_err(|source| DriverError::Read {
            path: source_path.clone(),
            source,
        })?;

        let (source, result) = match String::from_utf8(bytes) {
            Ok(source) => {
                let result = unit(&source_path, &source, mode, options)?;
                (source, result)
            }

            Err(error) => {
                let source = String::from_utf8_lossy(error.as_bytes()).into_owned();
                (source, Err(CompileError::from(error)))
            }
        };

        match result {
            Ok(()) => report.compiled.push(source_path),

            Err(error) => {
                report
                    .diagnostics
                    .push(Diagnostic::new(source_path, source, error));

                if !options.contains(Options::KEEP_GOING) {
                    break;
                }
            }
        }
    }

    Ok(report)
}

/// Translates one decoded source to stdout or to its output file.
fn unit(
    source_path: &Path,
    source: &str,
    mode: Mode,
    options: Options,
) -> Result<Result<(), CompileError>, DriverError> {
    if options.contains(Options::STDOUT) {
        return Ok(translate(mode, source.as_bytes(), io::stdout().lock()));
    }

    let target = output_path(source_path, mode);
    let file = File::create(&target).map_err(|source| DriverError::Create {
        path: target.clone(),
        source,
    })?;

    let result = translate(mode, source.as_bytes(), BufWriter::new(file));
    if result.is_ok() {
        info!("{} -> {}", source_path.display(), target.display());
    } else if let Err(error) = fs::remove_file(&target) {
        warn!("Failed to remove {}: {}", target.display(), error);
    }

    Ok(result)
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .map_or(false, |extension| extension == SOURCE_EXTENSION)
}
