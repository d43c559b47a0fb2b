//! Satori: scan -> parse -> compile -> run. Each stage owns its own
//! artifact and hands exactly one thing to the next; this module is
//! the glue that wires them together for both the CLI driver and the
//! integration tests.

pub mod common;
pub mod compiler;
pub mod error;
pub mod modules;
pub mod parser;
pub mod scanner;
pub mod vm;

use std::rc::Rc;

use crate::{
    common::{source::Source, span::Span},
    compiler::Compiler,
    error::Diagnostic,
    parser::Parser,
    scanner::Scanner,
    vm::{error::RuntimeError, Vm},
};

/// Every way the pipeline can fail to produce a result, tagged by the
/// stage that raised it: scan/syntax/compile errors discard their
/// stage's artifact; runtime errors terminate the VM run.
#[derive(Debug)]
pub enum SatoriError {
    Syntax(Vec<Diagnostic>),
    Compile(Vec<Diagnostic>),
    Runtime(RuntimeError),
}

impl std::fmt::Display for SatoriError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SatoriError::Syntax(diagnostics) | SatoriError::Compile(diagnostics) => {
                for diagnostic in diagnostics {
                    writeln!(f, "{}", diagnostic)?;
                }
                Ok(())
            },
            SatoriError::Runtime(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for SatoriError {}

/// Runs a complete program through the pipeline: scan, parse, compile,
/// execute. Returns the first stage's failure without attempting later
/// stages.
pub fn run_source(source: Rc<Source>) -> Result<(), SatoriError> {
    let tokens = Scanner::new(source.clone()).scan_tokens();
    let program = Parser::parse(tokens).map_err(SatoriError::Syntax)?;
    let eof_span = Span::eof(&source, 1, 1);
    let chunk = Compiler::compile(&program, eof_span).map_err(SatoriError::Compile)?;
    Vm::new(chunk).run().map_err(SatoriError::Runtime)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hello_scenario_runs_cleanly() {
        let source = Source::source("import io\nio.println \"Hello, World!\"");
        assert!(run_source(source).is_ok());
    }

    #[test]
    fn undefined_variable_fails_at_compile_not_runtime() {
        let source = Source::source("import io\nio.println y");
        match run_source(source) {
            Err(SatoriError::Compile(diagnostics)) => {
                assert!(diagnostics.iter().any(|d| d.reason.contains("Undefined variable")));
            },
            other => panic!("expected a Compile error, got {:?}", other),
        }
    }
}
