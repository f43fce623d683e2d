use jackc::{
    driver::{self, DriverError, Mode, Options},
    CompileError,
};

use std::{fs, path::Path};

const MAIN: &str = "class Main {\n  function void main() {\n    do Game.run();\n    return;\n  }\n}\n";
const GAME: &str = "class Game {\n  function void run() {\n    return;\n  }\n}\n";
const BROKEN: &str = "class Broken {\n  function void f() {\n    let = 1;\n  }\n}\n";

fn write(dir: &Path, name: &str, source: &str) {
    fs::write(dir.join(name), source).unwrap();
}

#[test]
fn directories_compile_every_source() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Main.jack", MAIN);
    write(dir.path(), "Game.jack", GAME);
    write(dir.path(), "notes.txt", "not a source");
    fs::create_dir(dir.path().join("nested.jack")).unwrap();

    let report = driver::run(dir.path(), Mode::Compile, Options::empty()).unwrap();
    assert!(report.is_success());
    assert_eq!(
        report.compiled(),
        [dir.path().join("Game.jack"), dir.path().join("Main.jack")]
    );

    let main = fs::read_to_string(dir.path().join("Main.vm")).unwrap();
    assert!(main.starts_with("function Main.main 0\n"));
    assert!(main.contains("call Game.run 0"));
    assert!(dir.path().join("Game.vm").exists());
}

#[test]
fn single_files_produce_xml_next_to_the_source() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Game.jack", GAME);

    let source = dir.path().join("Game.jack");
    let report = driver::run(&source, Mode::Parse, Options::empty()).unwrap();
    assert!(report.is_success());

    let tree = fs::read_to_string(dir.path().join("Game.xml")).unwrap();
    assert!(tree.starts_with("<class>\n"));
    assert!(tree.contains("  <subroutineDec>\n"));
}

#[test]
fn failures_stop_the_batch_unless_asked_to_keep_going() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "A.jack", BROKEN);
    write(dir.path(), "B.jack", GAME);

    let report = driver::run(dir.path(), Mode::Compile, Options::empty()).unwrap();
    assert!(!report.is_success());
    assert!(report.compiled().is_empty());
    assert!(!dir.path().join("A.vm").exists());
    assert!(!dir.path().join("B.vm").exists());

    let report = driver::run(dir.path(), Mode::Compile, Options::KEEP_GOING).unwrap();
    assert_eq!(report.compiled(), [dir.path().join("B.jack")]);
    assert_eq!(report.diagnostics().len(), 1);

    let diagnostic = report.diagnostics().iter().next().unwrap();
    assert_eq!(diagnostic.path(), dir.path().join("A.jack"));
    assert!(matches!(diagnostic.error(), CompileError::Compilation(_)));
    assert_eq!(diagnostic.error().line(), Some(3));

    let rendered = report.diagnostics().to_string();
    assert!(rendered.contains("A.jack:3"));
    assert!(rendered.contains("3 |     let = 1;"));
    assert!(rendered.ends_with("Compilation failed with 1 error\n"));
}

#[test]
fn undecodable_sources_are_reported_per_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("A.jack"), b"class A {\n  // caf\xe9\n}\n").unwrap();
    write(dir.path(), "B.jack", GAME);

    let report = driver::run(dir.path(), Mode::Compile, Options::empty()).unwrap();
    assert!(!report.is_success());
    assert!(report.compiled().is_empty());

    let report = driver::run(dir.path(), Mode::Compile, Options::KEEP_GOING).unwrap();
    assert_eq!(report.compiled(), [dir.path().join("B.jack")]);
    assert!(!dir.path().join("A.vm").exists());

    let diagnostic = report.diagnostics().iter().next().unwrap();
    assert_eq!(diagnostic.path(), dir.path().join("A.jack"));
    assert!(matches!(diagnostic.error(), CompileError::Encoding(_)));

    let rendered = report.diagnostics().to_string();
    assert!(rendered.starts_with("Encoding error: Source is not valid UTF-8\n"));
    assert!(rendered.contains("A.jack:2"));
    assert!(rendered.contains("2 |   // caf\u{fffd}"));
}

#[test]
fn directories_without_sources_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "README", "nothing to compile");

    let error = driver::discover(dir.path()).unwrap_err();
    assert!(matches!(error, DriverError::NoSources(_)));

    let error = driver::run(&dir.path().join("missing.jack"), Mode::Compile, Options::empty());
    assert!(matches!(error, Err(DriverError::Scan { .. })));
}
