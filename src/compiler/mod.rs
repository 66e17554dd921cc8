pub mod ast;
pub mod diagnostics;
pub mod emitter;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod semantic_analyser;
pub mod token;
pub mod validator;

use std::fs;
use std::path::Path;

use ast::Ast;
use diagnostics::{Diagnostic, Logger, Severity};
use emitter::{Emitter, WasmEmitter};
use formatter::Formatter;
use parser::AstParser;
use semantic_analyser::{AnalysisResult, Analyzer, SemanticAnalyser};
use validator::Validator;

/// Everything a completed compile produced: the Wasm module bytes (absent
/// if analysis reported any error-severity diagnostic, per spec §7's
/// propagation policy) plus every diagnostic raised by the validator and
/// the analyser, in emission order.
pub struct CompileOutput {
    pub wasm: Option<Vec<u8>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("could not read source file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not write output file: {0}")]
    Write(std::io::Error),
}

/// `Compiler` holds a compilation configuration: which parser and which
/// Wasm generator to use, and how large a linear memory to target. The
/// validator and semantic analyser are fixed, Schwa has exactly one of
/// each, so the two fixed members are collapsed out of the type parameters.
pub struct Compiler<P: AstParser, G: Emitter> {
    parser: P,
    generator: G,
    pages: u32,
}

impl<P: AstParser, G: Emitter> Compiler<P, G> {
    pub fn default() -> Self {
        Compiler { parser: P::default(), generator: G::default(), pages: 1 }
    }

    pub fn set_pages(mut self, pages: u32) -> Self {
        self.pages = pages;
        self.generator.set_pages(pages);
        self
    }

    /// Runs the full pipeline over a source string: parse, validate,
    /// analyse, and, only if no error-severity diagnostic was raised,
    /// emit a Wasm binary module.
    pub fn compile_str(self, source: &str) -> CompileOutput {
        let mut ast = self.parser.parse(source);

        let mut logger = Logger::new();
        Validator::validate(&mut ast, &mut logger);

        let analysis: AnalysisResult = <Analyzer as SemanticAnalyser>::default().analyse(&mut ast);

        let mut diagnostics = logger.into_diagnostics();
        diagnostics.extend(analysis.logger.into_diagnostics());
        let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);

        let wasm = if has_errors {
            None
        } else {
            Some(self.generator.generate(&ast, &analysis.symbols, analysis.program_scope))
        };

        CompileOutput { wasm, diagnostics }
    }

    /// Re-serializes the source through the formatter without running
    /// analysis, useful for a `--format`-only invocation that doesn't
    /// need a fully annotated tree.
    pub fn format_str(self, source: &str) -> String {
        let ast = self.parser.parse(source);
        Formatter::format(&ast)
    }

    pub fn compile(self, source_path: &Path) -> Result<CompileOutput, CompileError> {
        let source = fs::read_to_string(source_path)?;
        Ok(self.compile_str(&source))
    }

    pub fn compile_and_save(self, source_path: &Path, dest_path: &Path) -> Result<CompileOutput, CompileError> {
        let output = self.compile(source_path)?;
        if let Some(wasm) = &output.wasm {
            fs::write(dest_path, wasm).map_err(CompileError::Write)?;
        }
        Ok(output)
    }
}
