//! Schwa: an ahead-of-time compiler from a small, statically-typed,
//! indentation-structured surface language to WebAssembly binary modules.

pub mod compiler;

pub use compiler::ast::{Ast, NodeKind};
pub use compiler::diagnostics::{Diagnostic, Logger, Severity};
pub use compiler::emitter::{Emitter, WasmEmitter};
pub use compiler::parser::{AstParser, SchwaParser};
pub use compiler::semantic_analyser::{AnalysisResult, Analyzer, SemanticAnalyser};
pub use compiler::validator::Validator;
pub use compiler::{CompileError, CompileOutput, Compiler};
