use std::collections::HashMap;

use wasm_encoder::{
    CodeSection, ConstExpr, ExportKind, ExportSection, Function as WasmFunction, FunctionSection,
    GlobalSection, GlobalType, Instruction, MemArg, MemorySection, MemoryType, Module, TypeSection,
    ValType,
};

use super::ast::datatype::DataType;
use super::ast::symbol_table::{Function, FuncId, ScopeId, SymbolTable, VarId};
use super::ast::{Ast, NodeId, NodeKind};
use super::token::TokenKind;

/// `Emitter` takes the annotated AST a `SemanticAnalyser` produced and
/// lowers it to a binary Wasm module. Mirrors the teacher's
/// `BackEndGenerator` trait shape (`default`/`generate`/a configuration
/// setter), swapped to Schwa's actual compile target.
pub trait Emitter {
    fn default() -> Self;

    /// Target linear-memory size, in 64KiB Wasm pages. Mirrors the
    /// teacher's `set_precision` configuration knob.
    fn set_pages(&mut self, pages: u32);

    fn generate(self, ast: &Ast, symbols: &SymbolTable, program_scope: ScopeId) -> Vec<u8>;
}

/// Encodes straight into a Wasm binary module with `wasm-encoder`, used here
/// in place of a bespoke bytecode builder since Schwa's compile target is
/// Wasm itself, not a custom VM instruction set.
pub struct WasmEmitter {
    pages: u32,
}

impl Emitter for WasmEmitter {
    fn default() -> Self {
        WasmEmitter { pages: 1 }
    }

    fn set_pages(&mut self, pages: u32) {
        self.pages = pages;
    }

    fn generate(self, ast: &Ast, symbols: &SymbolTable, program_scope: ScopeId) -> Vec<u8> {
        let mut collector = Collector::new(symbols);
        collector.collect(ast, program_scope);
        collector.emit(ast, self.pages)
    }
}

fn wasm_val_type(ty: &DataType) -> ValType {
    match ty {
        DataType::Int | DataType::Uint | DataType::Bool => ValType::I32,
        DataType::Long | DataType::Ulong => ValType::I64,
        DataType::Float => ValType::F32,
        DataType::Double => ValType::F64,
        // Structs never appear as a value type of their own, only mapped
        // fields are addressable, and void never appears as a signature's
        // parameter or local type.
        _ => ValType::I32,
    }
}

/// Walks the program's top-level declarations in source order (through any
/// `const`/`export` wrappers) and assigns each exported/defined symbol the
/// Wasm-section index it will occupy, before any code is emitted. Source
/// order is kept as the Wasm declaration order so the emitted module is
/// deterministic and traceable back to the written program.
struct Collector<'a> {
    symbols: &'a SymbolTable,
    functions: Vec<FuncId>,
    func_index: HashMap<FuncId, u32>,
    globals: Vec<VarId>,
    global_index: HashMap<VarId, u32>,
    mapped_end: u32,
}

impl<'a> Collector<'a> {
    fn new(symbols: &'a SymbolTable) -> Self {
        Collector {
            symbols,
            functions: Vec::new(),
            func_index: HashMap::new(),
            globals: Vec::new(),
            global_index: HashMap::new(),
            mapped_end: 0,
        }
    }

    fn collect(&mut self, ast: &Ast, program_scope: ScopeId) {
        let top_level = ast.node(ast.root).children.clone();
        for child in top_level {
            self.collect_declaration(ast, child, program_scope);
        }
    }

    fn collect_declaration(&mut self, ast: &Ast, node: NodeId, program_scope: ScopeId) {
        match ast.node(node).kind {
            NodeKind::Const | NodeKind::Export => {
                let inner = ast.node(node).children[0];
                self.collect_declaration(ast, inner, program_scope);
            }
            NodeKind::FunctionDef => {
                let name = ast.node(node).token.text.clone();
                if let Some(func_id) = self.symbols.get_function(program_scope, &name) {
                    self.func_index.insert(func_id, self.functions.len() as u32);
                    self.functions.push(func_id);
                }
            }
            NodeKind::Global => {
                let var_def = ast.node(node).children[0];
                let name = ast.node(var_def).token.text.clone();
                if let Some(var_id) = self.symbols.get_variable(program_scope, &name) {
                    let var = self.symbols.var(var_id);
                    if var.is_mapped {
                        self.note_mapped_extent(var_id);
                    } else {
                        self.global_index.insert(var_id, self.globals.len() as u32);
                        self.globals.push(var_id);
                    }
                }
            }
            NodeKind::Map => {
                let var_def = ast.node(node).children[0];
                let name = ast.node(var_def).token.text.clone();
                if let Some(var_id) = self.symbols.get_variable(program_scope, &name) {
                    self.note_mapped_extent(var_id);
                }
            }
            _ => {}
        }
    }

    fn note_mapped_extent(&mut self, var_id: VarId) {
        let var = self.symbols.var(var_id);
        let mut missing = None;
        let size = self.symbols.size_of(&var.ty, var.scope, 0, &mut missing);
        self.mapped_end = self.mapped_end.max(var.offset + size);
    }

    fn emit(&self, ast: &Ast, pages: u32) -> Vec<u8> {
        let mut module = Module::new();

        let mut types = TypeSection::new();
        let mut func_section = FunctionSection::new();
        for (index, func_id) in self.functions.iter().enumerate() {
            let func = self.symbols.func(*func_id).clone();
            let params: Vec<ValType> = func.params.iter().map(|p| wasm_val_type(&self.symbols.var(*p).ty)).collect();
            let results = if func.return_type == DataType::Void { vec![] } else { vec![wasm_val_type(&func.return_type)] };
            types.function(params, results);
            func_section.function(index as u32);
        }
        module.section(&types);
        module.section(&func_section);

        let required_pages = ((self.mapped_end as u64 + 65535) / 65536).max(1) as u32;
        let mut memories = MemorySection::new();
        memories.memory(MemoryType { minimum: pages.max(required_pages) as u64, maximum: None, memory64: false, shared: false });
        module.section(&memories);

        let mut globals = GlobalSection::new();
        for var_id in &self.globals {
            let var = self.symbols.var(*var_id);
            let global_type = GlobalType { val_type: wasm_val_type(&var.ty), mutable: !var.is_const };
            let init = self.global_init_expr(ast, *var_id, &var.ty);
            globals.global(global_type, &init);
        }
        module.section(&globals);

        let mut exports = ExportSection::new();
        for var_id in &self.globals {
            let var = self.symbols.var(*var_id);
            if var.is_export {
                exports.export(&var.id, ExportKind::Global, self.global_index[var_id]);
            }
        }
        for func_id in &self.functions {
            let func = self.symbols.func(*func_id);
            if func.is_export {
                exports.export(&func.id, ExportKind::Func, self.func_index[func_id]);
            }
        }
        exports.export("memory", ExportKind::Memory, 0);
        module.section(&exports);

        let mut codes = CodeSection::new();
        for func_id in &self.functions {
            let func = self.symbols.func(*func_id).clone();
            let wasm_fn = self.compile_function(ast, &func);
            codes.function(&wasm_fn);
        }
        module.section(&codes);

        module.finish()
    }

    /// Global initializers must reduce to a Wasm constant expression
    /// (`i32.const`/.../`global.get`). Literal initializers lower directly.
    /// Anything else falls back to the type's zero value, since the analyzer
    /// already required the initializer's *type* to match the declaration
    /// and leaves the exact constant folding up to the generator.
    fn global_init_expr(&self, ast: &Ast, var_id: VarId, ty: &DataType) -> ConstExpr {
        let var = self.symbols.var(var_id);
        let node = var.node;
        if let Some(node) = node {
            if let Some(parent) = ast.node(node).parent {
                let siblings = &ast.node(parent).children;
                if siblings.len() == 2 {
                    let value_node = siblings[1];
                    if ast.node(value_node).kind == NodeKind::Literal {
                        return literal_const_expr(&ast.node(value_node).token.text, ty);
                    }
                }
            }
        }
        zero_const_expr(ty)
    }

    fn compile_function(&self, ast: &Ast, func: &Function) -> WasmFunction {
        let ctx = FnCtx { symbols: self.symbols, func, func_index: &self.func_index, global_index: &self.global_index };
        let mut wasm_fn = WasmFunction::new(Vec::<(u32, ValType)>::new());
        let body = func.node.expect("user-defined function always has a defining node");
        let block = ast.node(body).children[2];
        for &statement in &ast.node(block).children {
            compile_statement(ast, statement, &ctx, &mut wasm_fn);
        }
        wasm_fn.instruction(&Instruction::End);
        wasm_fn
    }
}

fn literal_const_expr(text: &str, ty: &DataType) -> ConstExpr {
    let trimmed = text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    match ty {
        DataType::Int | DataType::Uint => ConstExpr::i32_const(trimmed.parse::<i64>().unwrap_or(0) as i32),
        DataType::Long | DataType::Ulong => ConstExpr::i64_const(trimmed.parse::<i64>().unwrap_or(0)),
        DataType::Float => ConstExpr::f32_const(trimmed.parse::<f32>().unwrap_or(0.0)),
        DataType::Double => ConstExpr::f64_const(trimmed.parse::<f64>().unwrap_or(0.0)),
        DataType::Bool => ConstExpr::i32_const(if text == "true" { 1 } else { 0 }),
        _ => ConstExpr::i32_const(0),
    }
}

fn zero_const_expr(ty: &DataType) -> ConstExpr {
    match ty {
        DataType::Long | DataType::Ulong => ConstExpr::i64_const(0),
        DataType::Float => ConstExpr::f32_const(0.0),
        DataType::Double => ConstExpr::f64_const(0.0),
        _ => ConstExpr::i32_const(0),
    }
}

struct FnCtx<'a> {
    symbols: &'a SymbolTable,
    func: &'a Function,
    func_index: &'a HashMap<FuncId, u32>,
    global_index: &'a HashMap<VarId, u32>,
}

fn compile_statement(ast: &Ast, node: NodeId, ctx: &FnCtx, out: &mut WasmFunction) {
    match ast.node(node).kind {
        NodeKind::Assignment => compile_assignment(ast, node, ctx, out),
        NodeKind::Return => {
            let child = ast.node(node).children[0];
            compile_expr(ast, child, ctx, out);
            out.instruction(&Instruction::Return);
        }
        NodeKind::ReturnVoid => {
            out.instruction(&Instruction::Return);
        }
        NodeKind::FunctionCall => {
            let returns_value = compile_call(ast, node, ctx, out);
            if returns_value {
                out.instruction(&Instruction::Drop);
            }
        }
        _ => {}
    }
}

fn compile_assignment(ast: &Ast, node: NodeId, ctx: &FnCtx, out: &mut WasmFunction) {
    let children = ast.node(node).children.clone();
    let target = children[0];
    let value = children[1];

    let var_id = match resolve_variable(ast, target, ctx) {
        Some(id) => id,
        None => return,
    };
    let var = ctx.symbols.var(var_id);

    if var.is_mapped {
        out.instruction(&Instruction::I32Const(var.offset as i32));
        compile_expr(ast, value, ctx, out);
        out.instruction(&store_instruction(&var.ty));
    } else if var.is_global {
        compile_expr(ast, value, ctx, out);
        out.instruction(&Instruction::GlobalSet(ctx.global_index[&var_id]));
    } else {
        compile_expr(ast, value, ctx, out);
        let index = local_index(ctx, var_id);
        out.instruction(&Instruction::LocalSet(index));
    }
}

fn resolve_variable(ast: &Ast, node: NodeId, ctx: &FnCtx) -> Option<VarId> {
    let leaf = match ast.node(node).kind {
        NodeKind::Access => ast.node(node).children[1],
        _ => node,
    };
    let scope = ast.node(leaf).scope?;
    ctx.symbols.get_variable(scope, &ast.node(leaf).token.text)
}

fn local_index(ctx: &FnCtx, var_id: VarId) -> u32 {
    ctx.func.params.iter().position(|p| *p == var_id).expect("non-global variable must be a parameter") as u32
}

fn compile_expr(ast: &Ast, node: NodeId, ctx: &FnCtx, out: &mut WasmFunction) {
    match ast.node(node).kind {
        NodeKind::Literal => compile_literal(ast, node, out),
        NodeKind::VariableId | NodeKind::Access => compile_read(ast, node, ctx, out),
        NodeKind::BinaryOp => compile_binary(ast, node, ctx, out),
        NodeKind::UnaryOp => compile_unary(ast, node, ctx, out),
        NodeKind::FunctionCall => {
            compile_call(ast, node, ctx, out);
        }
        _ => {}
    }
}

fn compile_literal(ast: &Ast, node: NodeId, out: &mut WasmFunction) {
    let token = &ast.node(node).token;
    let ty = ast.node(node).data_type.clone().unwrap_or(DataType::Invalid);
    match ty {
        DataType::Int | DataType::Uint => {
            let trimmed = token.text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
            out.instruction(&Instruction::I32Const(trimmed.parse::<i64>().unwrap_or(0) as i32));
        }
        DataType::Long | DataType::Ulong => {
            let trimmed = token.text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
            out.instruction(&Instruction::I64Const(trimmed.parse::<i64>().unwrap_or(0)));
        }
        DataType::Float => {
            let trimmed = token.text.trim_end_matches(|c: char| c.is_ascii_alphabetic());
            out.instruction(&Instruction::F32Const(trimmed.parse::<f32>().unwrap_or(0.0)));
        }
        DataType::Double => {
            out.instruction(&Instruction::F64Const(token.text.parse::<f64>().unwrap_or(0.0)));
        }
        DataType::Bool => {
            out.instruction(&Instruction::I32Const(if token.text == "true" { 1 } else { 0 }));
        }
        _ => {}
    }
}

fn compile_read(ast: &Ast, node: NodeId, ctx: &FnCtx, out: &mut WasmFunction) {
    let var_id = match resolve_variable(ast, node, ctx) {
        Some(id) => id,
        None => return,
    };
    let var = ctx.symbols.var(var_id);
    if var.is_mapped {
        out.instruction(&Instruction::I32Const(var.offset as i32));
        out.instruction(&load_instruction(&var.ty));
    } else if var.is_global {
        out.instruction(&Instruction::GlobalGet(ctx.global_index[&var_id]));
    } else {
        out.instruction(&Instruction::LocalGet(local_index(ctx, var_id)));
    }
}

fn load_instruction(ty: &DataType) -> Instruction<'static> {
    let mem = MemArg { offset: 0, align: 0, memory_index: 0 };
    match ty {
        DataType::Int | DataType::Uint | DataType::Bool => Instruction::I32Load(mem),
        DataType::Long | DataType::Ulong => Instruction::I64Load(mem),
        DataType::Float => Instruction::F32Load(mem),
        DataType::Double => Instruction::F64Load(mem),
        _ => Instruction::I32Load(mem),
    }
}

fn store_instruction(ty: &DataType) -> Instruction<'static> {
    let mem = MemArg { offset: 0, align: 0, memory_index: 0 };
    match ty {
        DataType::Int | DataType::Uint | DataType::Bool => Instruction::I32Store(mem),
        DataType::Long | DataType::Ulong => Instruction::I64Store(mem),
        DataType::Float => Instruction::F32Store(mem),
        DataType::Double => Instruction::F64Store(mem),
        _ => Instruction::I32Store(mem),
    }
}

fn compile_binary(ast: &Ast, node: NodeId, ctx: &FnCtx, out: &mut WasmFunction) {
    let op = ast.node(node).token.kind;
    let children = ast.node(node).children.clone();
    let lhs = children[0];
    let rhs = children[1];

    if matches!(op, TokenKind::As | TokenKind::To) {
        compile_cast(ast, node, ctx, out);
        return;
    }

    compile_expr(ast, lhs, ctx, out);
    compile_expr(ast, rhs, ctx, out);
    let operand_type = ast.node(lhs).data_type.clone().unwrap_or(DataType::Invalid);
    out.instruction(&binary_instruction(op, &operand_type));
}

fn binary_instruction(op: TokenKind, ty: &DataType) -> Instruction<'static> {
    use DataType::*;
    use TokenKind::*;
    let signed = matches!(ty, Int | Long);
    match (op, ty) {
        (Plus, Int | Uint) => Instruction::I32Add,
        (Plus, Long | Ulong) => Instruction::I64Add,
        (Plus, Float) => Instruction::F32Add,
        (Plus, Double) => Instruction::F64Add,
        (Minus, Int | Uint) => Instruction::I32Sub,
        (Minus, Long | Ulong) => Instruction::I64Sub,
        (Minus, Float) => Instruction::F32Sub,
        (Minus, Double) => Instruction::F64Sub,
        (Star, Int | Uint) => Instruction::I32Mul,
        (Star, Long | Ulong) => Instruction::I64Mul,
        (Star, Float) => Instruction::F32Mul,
        (Star, Double) => Instruction::F64Mul,
        (Slash, Int) => Instruction::I32DivS,
        (Slash, Uint) => Instruction::I32DivU,
        (Slash, Long) => Instruction::I64DivS,
        (Slash, Ulong) => Instruction::I64DivU,
        (Slash, Float) => Instruction::F32Div,
        (Slash, Double) => Instruction::F64Div,
        (Percent, Int) => Instruction::I32RemS,
        (Percent, Uint) => Instruction::I32RemU,
        (Percent, Long) => Instruction::I64RemS,
        (Percent, Ulong) => Instruction::I64RemU,
        (Amp, Int | Uint) => Instruction::I32And,
        (Amp, Long | Ulong) => Instruction::I64And,
        (Pipe, Int | Uint) => Instruction::I32Or,
        (Pipe, Long | Ulong) => Instruction::I64Or,
        (Caret, Int | Uint) => Instruction::I32Xor,
        (Caret, Long | Ulong) => Instruction::I64Xor,
        (Shl, Int | Uint) => Instruction::I32Shl,
        (Shl, Long | Ulong) => Instruction::I64Shl,
        (Shr, Int | Uint) if signed => Instruction::I32ShrS,
        (Shr, Int | Uint) => Instruction::I32ShrU,
        (Shr, Long | Ulong) if signed => Instruction::I64ShrS,
        (Shr, Long | Ulong) => Instruction::I64ShrU,
        (RotateLeft, Int | Uint) => Instruction::I32Rotl,
        (RotateLeft, Long | Ulong) => Instruction::I64Rotl,
        (RotateRight, Int | Uint) => Instruction::I32Rotr,
        (RotateRight, Long | Ulong) => Instruction::I64Rotr,
        (EqEq, Int | Uint | Bool) => Instruction::I32Eq,
        (EqEq, Long | Ulong) => Instruction::I64Eq,
        (EqEq, Float) => Instruction::F32Eq,
        (EqEq, Double) => Instruction::F64Eq,
        (NotEq, Int | Uint | Bool) => Instruction::I32Ne,
        (NotEq, Long | Ulong) => Instruction::I64Ne,
        (NotEq, Float) => Instruction::F32Ne,
        (NotEq, Double) => Instruction::F64Ne,
        (Lt, Int) => Instruction::I32LtS,
        (Lt, Uint) => Instruction::I32LtU,
        (Lt, Long) => Instruction::I64LtS,
        (Lt, Ulong) => Instruction::I64LtU,
        (Lt, Float) => Instruction::F32Lt,
        (Lt, Double) => Instruction::F64Lt,
        (Le, Int) => Instruction::I32LeS,
        (Le, Uint) => Instruction::I32LeU,
        (Le, Long) => Instruction::I64LeS,
        (Le, Ulong) => Instruction::I64LeU,
        (Le, Float) => Instruction::F32Le,
        (Le, Double) => Instruction::F64Le,
        (Gt, Int) => Instruction::I32GtS,
        (Gt, Uint) => Instruction::I32GtU,
        (Gt, Long) => Instruction::I64GtS,
        (Gt, Ulong) => Instruction::I64GtU,
        (Gt, Float) => Instruction::F32Gt,
        (Gt, Double) => Instruction::F64Gt,
        (Ge, Int) => Instruction::I32GeS,
        (Ge, Uint) => Instruction::I32GeU,
        (Ge, Long) => Instruction::I64GeS,
        (Ge, Ulong) => Instruction::I64GeU,
        (Ge, Float) => Instruction::F32Ge,
        (Ge, Double) => Instruction::F64Ge,
        (AndAnd, _) => Instruction::I32And,
        (OrOr, _) => Instruction::I32Or,
        _ => Instruction::Nop,
    }
}

fn compile_unary(ast: &Ast, node: NodeId, ctx: &FnCtx, out: &mut WasmFunction) {
    let op = ast.node(node).token.kind;
    let operand = ast.node(node).children[0];
    let ty = ast.node(operand).data_type.clone().unwrap_or(DataType::Invalid);

    match (op, &ty) {
        (TokenKind::Minus, DataType::Int | DataType::Long) => {
            zero(&ty, out);
            compile_expr(ast, operand, ctx, out);
            out.instruction(&sub_instruction(&ty));
        }
        (TokenKind::Minus, DataType::Float) => {
            compile_expr(ast, operand, ctx, out);
            out.instruction(&Instruction::F32Neg);
        }
        (TokenKind::Minus, DataType::Double) => {
            compile_expr(ast, operand, ctx, out);
            out.instruction(&Instruction::F64Neg);
        }
        (TokenKind::Tilde, DataType::Int | DataType::Uint) => {
            compile_expr(ast, operand, ctx, out);
            out.instruction(&Instruction::I32Const(-1));
            out.instruction(&Instruction::I32Xor);
        }
        (TokenKind::Tilde, DataType::Long | DataType::Ulong) => {
            compile_expr(ast, operand, ctx, out);
            out.instruction(&Instruction::I64Const(-1));
            out.instruction(&Instruction::I64Xor);
        }
        (TokenKind::Bang, _) => {
            compile_expr(ast, operand, ctx, out);
            out.instruction(&Instruction::I32Eqz);
        }
        _ => {
            compile_expr(ast, operand, ctx, out);
        }
    }
}

fn zero(ty: &DataType, out: &mut WasmFunction) {
    match ty {
        DataType::Long => out.instruction(&Instruction::I64Const(0)),
        _ => out.instruction(&Instruction::I32Const(0)),
    };
}

fn sub_instruction(ty: &DataType) -> Instruction<'static> {
    match ty {
        DataType::Long => Instruction::I64Sub,
        _ => Instruction::I32Sub,
    }
}

/// `as`/`to` cast lowering. Mirrors `is_as_castable`/`is_to_castable` in
/// the semantic analyser: pairs outside both tables never reach codegen
/// (the analyser already poisoned them to `invalid` and the compiler
/// driver refuses to emit on any error). Pairs within the *same* Wasm
/// value-type representation (`int`<->`uint`, `long`<->`ulong`) need no
/// instruction at all, the bit pattern is already correct.
fn compile_cast(ast: &Ast, node: NodeId, ctx: &FnCtx, out: &mut WasmFunction) {
    let children = ast.node(node).children.clone();
    let lhs = children[0];
    let rhs = children[1];
    let op = ast.node(node).token.kind;
    let from = ast.node(lhs).data_type.clone().unwrap_or(DataType::Invalid);
    let to = ast.node(rhs).data_type.clone().unwrap_or(DataType::Invalid);

    compile_expr(ast, lhs, ctx, out);
    if let Some(instr) = cast_instruction(op, &from, &to) {
        out.instruction(&instr);
    }
}

fn cast_instruction(op: TokenKind, from: &DataType, to: &DataType) -> Option<Instruction<'static>> {
    use DataType::*;
    use Instruction::*;
    use TokenKind::*;
    Some(match (op, from, to) {
        (As, Int, Uint) | (As, Uint, Int) => return None,
        (As, Int, Float) => F32ConvertI32S,
        (As, Float, Int) => I32TruncF32S,
        (As, Uint, Float) => F32ConvertI32U,
        (As, Float, Uint) => I32TruncF32U,
        (As, Long, Ulong) | (As, Ulong, Long) => return None,
        (As, Long, Double) => F64ConvertI64S,
        (As, Double, Long) => I64TruncF64S,
        (As, Ulong, Double) => F64ConvertI64U,
        (As, Double, Ulong) => I64TruncF64U,

        (To, Int, Long) => I64ExtendI32S,
        (To, Int, Ulong) => I64ExtendI32S,
        (To, Int, Double) => F64ConvertI32S,
        (To, Uint, Long) => I64ExtendI32U,
        (To, Uint, Ulong) => I64ExtendI32U,
        (To, Uint, Double) => F64ConvertI32U,
        (To, Long, Int) => I32WrapI64,
        (To, Long, Uint) => I32WrapI64,
        (To, Long, Float) => F32ConvertI64S,
        (To, Ulong, Int) => I32WrapI64,
        (To, Ulong, Uint) => I32WrapI64,
        (To, Ulong, Float) => F32ConvertI64U,
        (To, Float, Long) => I64TruncF32S,
        (To, Float, Ulong) => I64TruncF32U,
        (To, Float, Double) => F64PromoteF32,
        (To, Double, Int) => I32TruncF64S,
        (To, Double, Uint) => I32TruncF64U,
        (To, Double, Float) => F32DemoteF64,
        _ => return None,
    })
}

/// Builtin calls (`<type>.load`, `float.sqrt`, `nop`, ...) are the sole
/// source of truth for what a bare identifier call lowers to (spec §4.6):
/// each one maps directly onto the Wasm instruction it mirrors, so unlike
/// a user `FunctionCall` there is no `Call` indirection at all. Returns
/// `true` iff the call leaves a value on the stack (non-void).
fn compile_call(ast: &Ast, node: NodeId, ctx: &FnCtx, out: &mut WasmFunction) -> bool {
    let children = ast.node(node).children.clone();
    let callee = children[0];
    let args_node = children[1];
    let arguments = ast.node(args_node).children.clone();

    if let Some((namespace, op_name)) = builtin_name(ast, callee) {
        for &arg in &arguments {
            compile_expr(ast, arg, ctx, out);
        }
        return compile_builtin(&namespace, &op_name, out);
    }

    for &arg in &arguments {
        compile_expr(ast, arg, ctx, out);
    }
    let func_id = resolve_function(ast, callee, ctx);
    if let Some(func_id) = func_id {
        if let Some(&index) = ctx.func_index.get(&func_id) {
            out.instruction(&Instruction::Call(index));
            return ctx.symbols.func(func_id).return_type != DataType::Void;
        }
    }
    false
}

fn resolve_function(ast: &Ast, node: NodeId, ctx: &FnCtx) -> Option<FuncId> {
    let leaf = match ast.node(node).kind {
        NodeKind::Access => ast.node(node).children[1],
        _ => node,
    };
    let scope = ast.node(leaf).scope?;
    ctx.symbols.get_function(scope, &ast.node(leaf).token.text)
}

/// Returns `(namespace, op)` for a callee that names a builtin (e.g.
/// `int.load` -> `("int", "load")`, bare `nop` -> `("", "nop")`).
fn builtin_name(ast: &Ast, callee: NodeId) -> Option<(String, String)> {
    const NAMESPACES: [&str; 6] = ["int", "uint", "long", "ulong", "float", "double"];
    match ast.node(callee).kind {
        NodeKind::Access => {
            let base = ast.node(callee).children[0];
            let field = ast.node(callee).children[1];
            let base_name = ast.node(base).token.text.clone();
            if NAMESPACES.contains(&base_name.as_str()) {
                Some((base_name, ast.node(field).token.text.clone()))
            } else {
                None
            }
        }
        NodeKind::FunctionId if ast.node(callee).token.text == "nop" => Some((String::new(), "nop".to_string())),
        _ => None,
    }
}

fn compile_builtin(namespace: &str, op: &str, out: &mut WasmFunction) -> bool {
    let mem = MemArg { offset: 0, align: 0, memory_index: 0 };
    let word64 = matches!(namespace, "long" | "ulong");

    match op {
        "nop" => {
            out.instruction(&Instruction::Nop);
            return false;
        }
        "load" => {
            out.instruction(&match namespace {
                "int" | "uint" => Instruction::I32Load(mem),
                "long" | "ulong" => Instruction::I64Load(mem),
                "float" => Instruction::F32Load(mem),
                "double" => Instruction::F64Load(mem),
                _ => Instruction::I32Load(mem),
            });
            return true;
        }
        "store" => {
            out.instruction(&match namespace {
                "int" | "uint" => Instruction::I32Store(mem),
                "long" | "ulong" => Instruction::I64Store(mem),
                "float" => Instruction::F32Store(mem),
                "double" => Instruction::F64Store(mem),
                _ => Instruction::I32Store(mem),
            });
            return false;
        }
        "loadSByte" => out.instruction(&if word64 { Instruction::I64Load8S(mem) } else { Instruction::I32Load8S(mem) }),
        "loadByte" => out.instruction(&if word64 { Instruction::I64Load8U(mem) } else { Instruction::I32Load8U(mem) }),
        "loadShort" => out.instruction(&if word64 { Instruction::I64Load16S(mem) } else { Instruction::I32Load16S(mem) }),
        "loadUShort" => out.instruction(&if word64 { Instruction::I64Load16U(mem) } else { Instruction::I32Load16U(mem) }),
        "loadInt" => out.instruction(&Instruction::I64Load32S(mem)),
        "loadUInt" => out.instruction(&Instruction::I64Load32U(mem)),
        "storeSByte" | "storeByte" => out.instruction(&if word64 { Instruction::I64Store8(mem) } else { Instruction::I32Store8(mem) }),
        "storeShort" | "storeUShort" => out.instruction(&if word64 { Instruction::I64Store16(mem) } else { Instruction::I32Store16(mem) }),
        "storeInt" | "storeUInt" => out.instruction(&Instruction::I64Store32(mem)),

        "clz" => out.instruction(&if word64 { Instruction::I64Clz } else { Instruction::I32Clz }),
        "ctz" => out.instruction(&if word64 { Instruction::I64Ctz } else { Instruction::I32Ctz }),
        "popcnt" => out.instruction(&if word64 { Instruction::I64Popcnt } else { Instruction::I32Popcnt }),
        "eqz" => out.instruction(&if word64 { Instruction::I64Eqz } else { Instruction::I32Eqz }),

        "abs" => out.instruction(&if namespace == "double" { Instruction::F64Abs } else { Instruction::F32Abs }),
        "ceil" => out.instruction(&if namespace == "double" { Instruction::F64Ceil } else { Instruction::F32Ceil }),
        "floor" => out.instruction(&if namespace == "double" { Instruction::F64Floor } else { Instruction::F32Floor }),
        "truncate" => out.instruction(&if namespace == "double" { Instruction::F64Trunc } else { Instruction::F32Trunc }),
        "round" => out.instruction(&if namespace == "double" { Instruction::F64Nearest } else { Instruction::F32Nearest }),
        "sqrt" => out.instruction(&if namespace == "double" { Instruction::F64Sqrt } else { Instruction::F32Sqrt }),
        "min" => out.instruction(&if namespace == "double" { Instruction::F64Min } else { Instruction::F32Min }),
        "max" => out.instruction(&if namespace == "double" { Instruction::F64Max } else { Instruction::F32Max }),
        "copysign" => out.instruction(&if namespace == "double" { Instruction::F64Copysign } else { Instruction::F32Copysign }),
        _ => out.instruction(&Instruction::Nop),
    };

    !matches!(
        op,
        "storeSByte" | "storeByte" | "storeShort" | "storeUShort" | "storeInt" | "storeUInt"
    )
}
