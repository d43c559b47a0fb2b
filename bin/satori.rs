//! The CLI driver: no argument-parsing crate, a flat match over the
//! first argument, `{:#?}` debug-printing for the `-t`/`-a` inspection
//! flags.

use std::process::ExitCode;

use satori::{
    common::source::Source,
    parser::Parser,
    run_source,
    scanner::Scanner,
    SatoriError,
};

const USAGE: &str = "Usage: satori <path> | -t <path> | -a <path> | -h | -v";
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        None => {
            eprintln!("{}", USAGE);
            ExitCode::FAILURE
        },
        Some("-h") | Some("--help") => {
            println!("{}", USAGE);
            ExitCode::SUCCESS
        },
        Some("-v") | Some("--version") => {
            println!("satori {}", VERSION);
            ExitCode::SUCCESS
        },
        Some("-t") | Some("--tokens") => match args.next() {
            Some(path) => dump_tokens(&path),
            None => {
                eprintln!("{}", USAGE);
                ExitCode::FAILURE
            },
        },
        Some("-a") | Some("--ast") => match args.next() {
            Some(path) => dump_ast(&path),
            None => {
                eprintln!("{}", USAGE);
                ExitCode::FAILURE
            },
        },
        Some(path) => run_file(path),
    }
}

fn load(path: &str) -> Result<std::rc::Rc<Source>, ExitCode> {
    Source::path(std::path::Path::new(path)).map_err(|error| {
        eprintln!("error: could not read '{}': {}", path, error);
        ExitCode::FAILURE
    })
}

fn run_file(path: &str) -> ExitCode {
    let source = match load(path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    match run_source(source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(SatoriError::Syntax(diagnostics)) | Err(SatoriError::Compile(diagnostics)) => {
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic);
            }
            ExitCode::FAILURE
        },
        Err(SatoriError::Runtime(error)) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        },
    }
}

fn dump_tokens(path: &str) -> ExitCode {
    let source = match load(path) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let tokens = Scanner::new(source).scan_tokens();
    println!("{:#?}", tokens);
    ExitCode::SUCCESS
}

fn dump_ast(path: &str) -> ExitCode {
    let source = match load(path) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let tokens = Scanner::new(source).scan_tokens();
    match Parser::parse(tokens) {
        Ok(program) => {
            println!("{:#?}", program);
            ExitCode::SUCCESS
        },
        Err(diagnostics) => {
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic);
            }
            ExitCode::FAILURE
        },
    }
}
