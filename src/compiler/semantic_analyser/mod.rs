pub mod analyser;
pub mod builtin_functions;

use super::ast::symbol_table::{ScopeId, SymbolTable};
use super::ast::Ast;
use super::diagnostics::Logger;

pub use analyser::Analyzer;

/// Everything downstream stages (the formatter, the Wasm generator) need
/// out of analysis: the populated symbol table, the scope holding the
/// program's own top-level declarations, and whatever diagnostics were
/// raised along the way.
pub struct AnalysisResult {
    pub symbols: SymbolTable,
    pub program_scope: ScopeId,
    pub logger: Logger,
}

/// Mirrors `AstParser`: a fresh analyser consumes the parsed tree, annotates
/// it in place, and hands back the symbol table it built.
pub trait SemanticAnalyser {
    fn default() -> Self;
    fn analyse(self, ast: &mut Ast) -> AnalysisResult;
}

impl SemanticAnalyser for Analyzer {
    fn default() -> Self {
        Analyzer::new()
    }

    fn analyse(mut self, ast: &mut Ast) -> AnalysisResult {
        self.analyze(ast);
        AnalysisResult {
            symbols: self.symbols,
            program_scope: self.program_scope.expect("hoist pass always sets the program scope"),
            logger: self.logger,
        }
    }
}
