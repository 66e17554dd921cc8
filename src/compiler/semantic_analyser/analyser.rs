use super::builtin_functions;
use super::super::ast::datatype::DataType;
use super::super::ast::symbol_table::{Declared, FuncId, Function, ScopeId, Struct, SymbolTable, VarId, Variable};
use super::super::ast::{Ast, NodeId, NodeKind};
use super::super::diagnostics::{Logger, Span};
use super::super::token::TokenKind;

const PRODUCER: &str = "Analyzer";

/// `SchwaAnalyzer`: walks a validated AST in four fixed passes (hoist,
/// scope, type, analysis) building the symbol tree and annotating every
/// node's `scope`/`data_type` cells along the way. One instance is
/// consumed per `analyze` call; the root scope it starts from already
/// holds the builtin numeric-intrinsic catalog.
pub struct Analyzer {
    pub(super) symbols: SymbolTable,
    pub(super) logger: Logger,
    pub(super) program_scope: Option<ScopeId>,
    root: ScopeId,
}

impl Analyzer {
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        let root = symbols.new_root();
        builtin_functions::register(&mut symbols, root);
        Analyzer { symbols, logger: Logger::new(), program_scope: None, root }
    }

    pub fn analyze(&mut self, ast: &mut Ast) {
        self.run_hoist_pass(ast);
        self.run_scope_pass(ast);
        self.run_type_pass(ast);
        self.run_analysis_pass(ast);
    }

    // ---------------------------------------------------------------
    // Pass 1: hoist. Struct types must exist before any expression in
    // the tree tries to resolve a reference to them, so every
    // struct-definition child (however many `const`/`export` wrappers
    // deep) gets its scope computed before anything else runs.
    // ---------------------------------------------------------------

    fn run_hoist_pass(&mut self, ast: &mut Ast) {
        let program_scope = self.scope_of(ast, ast.root, self.root);
        let children = ast.node(ast.root).children.clone();
        for child in children {
            self.hoist_struct(ast, child, program_scope);
        }
    }

    fn hoist_struct(&mut self, ast: &mut Ast, node: NodeId, parent_scope: ScopeId) {
        match ast.node(node).kind {
            NodeKind::StructDef => {
                self.scope_of(ast, node, parent_scope);
            }
            NodeKind::Const | NodeKind::Export => {
                let inner = ast.node(node).children[0];
                self.hoist_struct(ast, inner, parent_scope);
            }
            _ => {}
        }
    }

    // ---------------------------------------------------------------
    // Pass 2: scope. Every node gets a scope annotation; scope rules
    // for declaring kinds also populate the symbol table.
    // ---------------------------------------------------------------

    fn run_scope_pass(&mut self, ast: &mut Ast) {
        self.visit_scope(ast, ast.root);
    }

    fn visit_scope(&mut self, ast: &mut Ast, node: NodeId) {
        self.get_scope(ast, node);
        let children = ast.node(node).children.clone();
        for child in children {
            self.visit_scope(ast, child);
        }
    }

    /// Memoizing accessor: derives the parent scope by walking the AST
    /// parent edge, then defers to `scope_of`.
    fn get_scope(&mut self, ast: &mut Ast, node: NodeId) -> ScopeId {
        if let Some(scope) = ast.node(node).scope {
            return scope;
        }
        let parent_scope = match ast.node(node).parent {
            Some(parent) => self.get_scope(ast, parent),
            None => self.root,
        };
        self.scope_of(ast, node, parent_scope)
    }

    /// Same memoization as `get_scope`, but takes the parent scope
    /// directly instead of deriving it from the AST parent edge. Needed
    /// wherever a rule computes a descendant's scope from *within* its
    /// own ancestor's scope rule (struct fields, function parameters,
    /// `const`/`export`'s inner declaration, chained member access).
    /// Going back through the AST parent edge in those cases would
    /// re-enter the very rule still being computed.
    fn scope_of(&mut self, ast: &mut Ast, node: NodeId, parent_scope: ScopeId) -> ScopeId {
        if let Some(scope) = ast.node(node).scope {
            return scope;
        }
        let scope = self.compute_scope(ast, node, parent_scope);
        ast.node_mut(node).scope = Some(scope);
        scope
    }

    fn compute_scope(&mut self, ast: &mut Ast, node: NodeId, parent_scope: ScopeId) -> ScopeId {
        match ast.node(node).kind {
            NodeKind::Program | NodeKind::Block => {
                let scope = self.symbols.new_scope("", parent_scope, Some(node));
                if ast.node(node).kind == NodeKind::Program {
                    self.program_scope = Some(scope);
                }
                scope
            }
            NodeKind::StructDef => self.scope_struct_def(ast, node, parent_scope),
            NodeKind::FunctionDef => self.scope_function_def(ast, node, parent_scope),
            NodeKind::VariableDef => {
                self.declare_variable_def(ast, node, parent_scope);
                parent_scope
            }
            // `Global`/`Map` introduce no scope of their own, but their
            // wrapped `VariableDef` must be declared as soon as this node's
            // scope is forced, not merely when the tree walk later reaches
            // it as a child. `Const`/`Export` need the symbol to already
            // exist the moment they resolve their own wrapped declaration.
            NodeKind::Global | NodeKind::Map => {
                let var_def = ast.node(node).children[0];
                self.scope_of(ast, var_def, parent_scope);
                parent_scope
            }
            NodeKind::Access => self.scope_access(ast, node, parent_scope),
            NodeKind::Const => self.scope_const_export(ast, node, parent_scope, true),
            NodeKind::Export => self.scope_const_export(ast, node, parent_scope, false),
            _ => parent_scope,
        }
    }

    fn scope_struct_def(&mut self, ast: &mut Ast, node: NodeId, parent_scope: ScopeId) -> ScopeId {
        let name = ast.node(node).token.text.clone();
        let scope = self.symbols.new_scope(name.clone(), parent_scope, Some(node));

        let fields_node = ast.node(node).children[0];
        ast.node_mut(fields_node).scope = Some(scope);
        let field_nodes = ast.node(fields_node).children.clone();

        let mut fields = Vec::new();
        for field_node in field_nodes {
            if let Some(var_id) = self.declare_variable_def(ast, field_node, scope) {
                fields.push(var_id);
            }
        }

        let strukt = Struct { id: name.clone(), fields, scope, node: Some(node), is_export: false };
        if let Declared::Duplicate = self.symbols.declare_struct(parent_scope, strukt) {
            self.logger.error(
                PRODUCER,
                format!("Struct \"{}\" is already declared in this scope", name),
                Span::of(&ast.node(node).token),
            );
        }
        scope
    }

    fn scope_function_def(&mut self, ast: &mut Ast, node: NodeId, parent_scope: ScopeId) -> ScopeId {
        let name = ast.node(node).token.text.clone();
        let scope = self.symbols.new_scope(name.clone(), parent_scope, Some(node));

        let children = ast.node(node).children.clone();
        let return_type_node = children[0];
        let params_node = children[1];

        ast.node_mut(return_type_node).scope = Some(scope);
        let return_type = DataType::from_name(&ast.node(return_type_node).token.text);

        ast.node_mut(params_node).scope = Some(scope);
        let param_nodes = ast.node(params_node).children.clone();
        let mut params = Vec::new();
        for param_node in param_nodes {
            if let Some(var_id) = self.declare_variable_def(ast, param_node, scope) {
                params.push(var_id);
            }
        }

        let function = Function { id: name.clone(), return_type, params, scope, node: Some(node), is_export: false };
        if let Declared::Duplicate = self.symbols.declare_function(parent_scope, function) {
            self.logger.error(
                PRODUCER,
                format!("Function \"{}\" is already declared in this scope", name),
                Span::of(&ast.node(node).token),
            );
        }
        scope
    }

    /// Declares a `VariableDef`'s variable in `scope`, reading the
    /// `const`/`global`/`mapped` flags and mapped offset off whatever
    /// `Global`/`Map` ancestor wraps it (per spec invariant 5, `const`
    /// and `mapped` both imply `global`). Returns the declared id, or
    /// `None` on a duplicate (already diagnosed).
    fn declare_variable_def(&mut self, ast: &mut Ast, node: NodeId, scope: ScopeId) -> Option<VarId> {
        let id = ast.node(node).token.text.clone();
        let type_node = ast.node(node).children[0];
        ast.node_mut(type_node).scope = Some(scope);
        let ty = DataType::from_name(&ast.node(type_node).token.text);

        let mut variable = Variable::new(id.clone(), ty.clone(), scope, Some(node));
        let mut ancestor = ast.node(node).parent;
        while let Some(parent) = ancestor {
            match ast.node(parent).kind {
                NodeKind::Global => variable.is_global = true,
                NodeKind::Map => {
                    variable.is_global = true;
                    variable.is_mapped = true;
                    let map_children = ast.node(parent).children.clone();
                    if let Some(&offset_node) = map_children.get(1) {
                        if let Ok(offset) = ast.node(offset_node).token.text.parse::<u32>() {
                            variable.offset = offset;
                        }
                    }
                }
                _ => {}
            }
            ancestor = ast.node(parent).parent;
        }

        ast.node_mut(node).scope = Some(scope);

        if ty.is_struct() && self.symbols.get_struct(scope, &ty.name()).is_none() {
            self.logger.error(
                PRODUCER,
                format!("Struct \"{}\" is not declared", ty.name()),
                Span::of(&ast.node(type_node).token),
            );
        }

        match self.symbols.declare_variable(scope, variable) {
            Declared::Inserted(var_id) => Some(var_id),
            Declared::Duplicate => {
                self.logger.error(
                    PRODUCER,
                    format!("Variable \"{}\" is already declared in this scope", id),
                    Span::of(&ast.node(node).token),
                );
                None
            }
        }
    }

    /// `Const`/`Export` wrap a declaration without introducing a scope
    /// of their own: force the inner declaration's scope (so the symbol
    /// it names actually exists), then flag whichever variable/function/
    /// struct bears the declared id.
    fn scope_const_export(&mut self, ast: &mut Ast, node: NodeId, parent_scope: ScopeId, is_const: bool) -> ScopeId {
        let inner = ast.node(node).children[0];
        let scope = self.scope_of(ast, inner, parent_scope);
        if let Some(id) = Self::declared_id(ast, inner) {
            if is_const {
                if let Some(var_id) = self.symbols.get_variable(scope, &id) {
                    self.symbols.var_mut(var_id).is_const = true;
                }
            } else if let Some(var_id) = self.symbols.get_variable(scope, &id) {
                self.symbols.var_mut(var_id).is_export = true;
            } else if let Some(func_id) = self.symbols.get_function(scope, &id) {
                self.symbols.func_mut(func_id).is_export = true;
            } else if let Some(struct_id) = self.symbols.get_struct(scope, &id) {
                self.symbols.strukt_mut(struct_id).is_export = true;
            }
        }
        scope
    }

    fn declared_id(ast: &Ast, node: NodeId) -> Option<String> {
        match ast.node(node).kind {
            NodeKind::Global | NodeKind::Map => {
                let var_def = ast.node(node).children[0];
                Some(ast.node(var_def).token.text.clone())
            }
            NodeKind::FunctionDef | NodeKind::StructDef => Some(ast.node(node).token.text.clone()),
            NodeKind::Const | NodeKind::Export => {
                let inner = ast.node(node).children[0];
                Self::declared_id(ast, inner)
            }
            _ => None,
        }
    }

    /// `Access`'s scope rule resolves its base child to a scope, either by
    /// recursing into a nested `Access` (chained member access shares the
    /// same lexical parent scope throughout the chain), or by treating a
    /// leaf identifier's text as a name to resolve, first as a registered
    /// scope (builtin type-prefix namespaces like `int`), then as a
    /// struct-typed variable to lazily materialize via `make_struct_scope`.
    /// The field child's own scope is set to whatever this resolves to, so
    /// its own type rule looks it up in the right place.
    fn scope_access(&mut self, ast: &mut Ast, node: NodeId, parent_scope: ScopeId) -> ScopeId {
        let children = ast.node(node).children.clone();
        let first = children[0];
        let field = children[1];

        let resolved = match ast.node(first).kind {
            NodeKind::Access => Some(self.scope_of(ast, first, parent_scope)),
            NodeKind::VariableId | NodeKind::FunctionId | NodeKind::StructId => {
                self.scope_of(ast, first, parent_scope);
                let name = ast.node(first).token.text.clone();
                self.resolve_named_scope(ast, first, parent_scope, &name)
            }
            _ => None,
        };

        match resolved {
            Some(scope) => {
                ast.node_mut(field).scope = Some(scope);
                scope
            }
            None => {
                self.logger.error(
                    PRODUCER,
                    format!("Could not resolve \"{}\"", ast.node(first).token.text),
                    Span::of(&ast.node(first).token),
                );
                ast.node_mut(field).scope = Some(parent_scope);
                parent_scope
            }
        }
    }

    fn resolve_named_scope(&mut self, ast: &mut Ast, leaf: NodeId, scope: ScopeId, name: &str) -> Option<ScopeId> {
        if let Some(s) = self.symbols.get_scope(scope, name) {
            // A pure namespace reference (`int` in `int.load(...)`) never
            // names a real value; short-circuit its own type rule rather
            // than let it report a spurious unresolved-variable diagnostic.
            ast.node_mut(leaf).data_type = Some(DataType::Void);
            return Some(s);
        }
        let var_id = self.symbols.get_variable(scope, name)?;
        if !self.symbols.var(var_id).ty.is_struct() {
            return None;
        }
        self.make_struct_scope(Span::of(&ast.node(leaf).token), var_id)
    }

    /// Materializes the per-variable field scope for a struct-typed
    /// variable (spec §4.3): idempotent (keyed by variable id within its
    /// declaring scope), offsets begin at the variable's own offset and
    /// accumulate by field size so mapped struct instances get a
    /// concrete memory layout.
    fn make_struct_scope(&mut self, span: Span, var_id: VarId) -> Option<ScopeId> {
        let var = self.symbols.var(var_id).clone();
        if let Some(existing) = self.local_scope(var.scope, &var.id) {
            return Some(existing);
        }
        let struct_name = var.ty.name();
        let struct_id = match self.symbols.get_struct(var.scope, &struct_name) {
            Some(s) => s,
            None => {
                self.logger.error(PRODUCER, format!("Struct \"{}\" is not declared", struct_name), span);
                return None;
            }
        };
        let strukt = self.symbols.strukt(struct_id).clone();
        let new_scope = self.symbols.new_scope(var.id.clone(), var.scope, var.node);

        let mut cursor = var.offset;
        for field_id in &strukt.fields {
            let field = self.symbols.var(*field_id).clone();
            let mut synthesized = Variable::new(field.id.clone(), field.ty.clone(), new_scope, None);
            synthesized.is_const = var.is_const;
            synthesized.is_export = var.is_export;
            synthesized.is_mapped = var.is_mapped;
            synthesized.is_global = var.is_global;
            synthesized.offset = cursor;
            let mut missing = None;
            cursor += self.symbols.size_of(&field.ty, strukt.scope, 0, &mut missing);
            if let Some(name) = missing {
                self.logger.error(PRODUCER, format!("Struct \"{}\" is not declared", name), span);
            }
            self.symbols.declare_variable(new_scope, synthesized);
        }
        self.symbols.register_scope(var.scope, &var.id, new_scope);
        Some(new_scope)
    }

    fn local_scope(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        self.symbols.scope(scope).scopes.get(name).copied()
    }

    // ---------------------------------------------------------------
    // Pass 3: type.
    // ---------------------------------------------------------------

    fn run_type_pass(&mut self, ast: &mut Ast) {
        self.visit_type(ast, ast.root);
    }

    fn visit_type(&mut self, ast: &mut Ast, node: NodeId) {
        self.get_data_type(ast, node);
        let children = ast.node(node).children.clone();
        for child in children {
            self.visit_type(ast, child);
        }
    }

    /// Memoizing accessor (spec §4.1): a node already carrying a
    /// dataType is returned unchanged (covers both re-analysis and the
    /// `Void` short-circuit `scope_access` stamps on namespace leaves).
    /// An invalid node (per the upstream validator) is poisoned directly
    /// without running any type rule, so malformed shapes never get
    /// indexed into.
    fn get_data_type(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        if let Some(ty) = ast.node(node).data_type.clone() {
            return ty;
        }
        if !ast.node(node).valid {
            ast.node_mut(node).data_type = Some(DataType::Invalid);
            return DataType::Invalid;
        }
        let ty = self.compute_data_type(ast, node);
        ast.node_mut(node).data_type = Some(ty.clone());
        ty
    }

    fn compute_data_type(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        match ast.node(node).kind {
            NodeKind::VariableId => self.type_variable_id(ast, node),
            NodeKind::FunctionId => self.type_function_id(ast, node),
            NodeKind::StructId => self.type_struct_id(ast, node),
            NodeKind::Access => {
                let field = ast.node(node).children[1];
                self.get_data_type(ast, field)
            }
            NodeKind::Type => DataType::Type,
            NodeKind::VariableDef | NodeKind::FunctionDef => {
                let type_node = ast.node(node).children[0];
                DataType::from_name(&ast.node(type_node).token.text)
            }
            NodeKind::StructDef => DataType::Struct(ast.node(node).token.text.clone()),
            NodeKind::Literal => Self::type_literal(ast, node),
            NodeKind::Assignment => self.type_assignment(ast, node),
            NodeKind::Global => self.type_global(ast, node),
            NodeKind::FunctionCall => self.type_function_call(ast, node),
            NodeKind::Return => self.type_return(ast, node),
            NodeKind::ReturnVoid => self.type_return_void(ast, node),
            NodeKind::BinaryOp => self.type_binary_op(ast, node),
            NodeKind::UnaryOp => self.type_unary_op(ast, node),
            _ => DataType::Void,
        }
    }

    fn type_variable_id(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let scope = ast.node(node).scope.expect("scope pass runs before the type pass");
        let name = ast.node(node).token.text.clone();
        match self.symbols.get_variable(scope, &name) {
            Some(var_id) => self.symbols.var(var_id).ty.clone(),
            None => {
                self.logger.error(PRODUCER, format!("Variable \"{}\" is not declared", name), Span::of(&ast.node(node).token));
                DataType::Invalid
            }
        }
    }

    fn type_function_id(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let scope = ast.node(node).scope.expect("scope pass runs before the type pass");
        let name = ast.node(node).token.text.clone();
        match self.symbols.get_function(scope, &name) {
            Some(func_id) => self.symbols.func(func_id).return_type.clone(),
            None => {
                self.logger.error(PRODUCER, format!("Function \"{}\" is not declared", name), Span::of(&ast.node(node).token));
                DataType::Invalid
            }
        }
    }

    fn type_struct_id(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let scope = ast.node(node).scope.expect("scope pass runs before the type pass");
        let name = ast.node(node).token.text.clone();
        match self.symbols.get_struct(scope, &name) {
            Some(struct_id) => DataType::Struct(self.symbols.strukt(struct_id).id.clone()),
            None => {
                self.logger.error(PRODUCER, format!("Struct \"{}\" is not declared", name), Span::of(&ast.node(node).token));
                DataType::Invalid
            }
        }
    }

    fn type_literal(ast: &Ast, node: NodeId) -> DataType {
        DataType::from_token(ast.node(node).token.kind).unwrap_or(DataType::Invalid)
    }

    fn type_assignment(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let children = ast.node(node).children.clone();
        let target = children[0];
        let value = children[1];

        if let Some(var_id) = self.resolve_target_variable(ast, target) {
            if self.symbols.var(var_id).is_const {
                self.logger.error(PRODUCER, "Constant globals cannot be assigned to", Span::of(&ast.node(node).token));
                return DataType::Invalid;
            }
        }

        let target_type = self.get_data_type(ast, target);
        let value_type = self.get_data_type(ast, value);

        if target_type == DataType::Invalid {
            self.logger.error(PRODUCER, "Invalid left-hand side of assignment", Span::of(&ast.node(target).token));
            return DataType::Invalid;
        }
        if value_type == DataType::Invalid {
            self.logger.error(PRODUCER, "Invalid right-hand side of assignment", Span::of(&ast.node(value).token));
            return DataType::Invalid;
        }
        if target_type != value_type {
            self.logger.error(PRODUCER, "Both sides of an assignment must be of the same type", Span::of(&ast.node(node).token));
            return DataType::Invalid;
        }
        target_type
    }

    fn type_global(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let children = ast.node(node).children.clone();
        let target = children[0];
        let value = children[1];

        let target_type = self.get_data_type(ast, target);
        let value_type = self.get_data_type(ast, value);

        if target_type == DataType::Invalid {
            self.logger.error(PRODUCER, "Invalid left-hand side of assignment", Span::of(&ast.node(target).token));
            return DataType::Invalid;
        }
        if value_type == DataType::Invalid {
            self.logger.error(PRODUCER, "Invalid right-hand side of assignment", Span::of(&ast.node(value).token));
            return DataType::Invalid;
        }
        if target_type != value_type {
            self.logger.error(PRODUCER, "Both sides of an assignment must be of the same type", Span::of(&ast.node(node).token));
            return DataType::Invalid;
        }
        target_type
    }

    fn type_function_call(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let children = ast.node(node).children.clone();
        let callee = children[0];
        let args_node = children[1];

        let func_id = match self.resolve_callee_function(ast, callee) {
            Some(f) => f,
            None => {
                self.logger.error(
                    PRODUCER,
                    format!("Function \"{}\" is not declared", Self::callee_name(ast, callee)),
                    Span::of(&ast.node(callee).token),
                );
                return DataType::Invalid;
            }
        };

        let arguments = ast.node(args_node).children.clone();
        let func = self.symbols.func(func_id).clone();

        if func.params.len() != arguments.len() {
            self.logger.error(
                PRODUCER,
                format!("Function \"{}\" takes {} arguments, not {}", func.id, func.params.len(), arguments.len()),
                Span::of(&ast.node(node).token),
            );
            for arg in &arguments {
                self.get_data_type(ast, *arg);
            }
            return DataType::Invalid;
        }

        let mut any_invalid = false;
        for (index, (arg_node, param_id)) in arguments.iter().zip(func.params.iter()).enumerate() {
            let arg_type = self.get_data_type(ast, *arg_node);
            let param = self.symbols.var(*param_id).clone();
            if arg_type != param.ty {
                self.logger.error(
                    PRODUCER,
                    format!(
                        "Argument {} (\"{}\") of function \"{}\" expected type \"{}\" but got \"{}\"",
                        index + 1,
                        param.id,
                        func.id,
                        param.ty.name(),
                        arg_type.name()
                    ),
                    Span::of(&ast.node(*arg_node).token),
                );
                any_invalid = true;
            }
        }

        if any_invalid { DataType::Invalid } else { func.return_type }
    }

    fn callee_name(ast: &Ast, callee: NodeId) -> String {
        match ast.node(callee).kind {
            NodeKind::Access => ast.node(ast.node(callee).children[1]).token.text.clone(),
            _ => ast.node(callee).token.text.clone(),
        }
    }

    fn type_return(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let child = ast.node(node).children[0];
        let value_type = self.get_data_type(ast, child);
        if value_type == DataType::Invalid {
            return DataType::Invalid;
        }
        let return_type = self.enclosing_return_type(ast, node);

        if value_type != return_type || return_type == DataType::Void {
            self.logger.error(
                PRODUCER,
                format!("Expected return type \"{}\" but got \"{}\"", return_type.name(), value_type.name()),
                Span::of(&ast.node(node).token),
            );
            return DataType::Invalid;
        }
        value_type
    }

    fn type_return_void(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let return_type = self.enclosing_return_type(ast, node);
        if return_type != DataType::Void {
            self.logger.error(
                PRODUCER,
                format!("Expected a \"{}\" return value", return_type.name()),
                Span::of(&ast.node(node).token),
            );
            return DataType::Invalid;
        }
        DataType::Void
    }

    fn enclosing_return_type(&self, ast: &Ast, node: NodeId) -> DataType {
        let mut cursor = ast.node(node).parent;
        while let Some(parent) = cursor {
            if ast.node(parent).kind == NodeKind::FunctionDef {
                let return_type_node = ast.node(parent).children[0];
                return DataType::from_name(&ast.node(return_type_node).token.text);
            }
            cursor = ast.node(parent).parent;
        }
        DataType::Invalid
    }

    fn type_binary_op(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let op = ast.node(node).token.kind;
        let children = ast.node(node).children.clone();
        let lhs_node = children[0];
        let rhs_node = children[1];

        if matches!(op, TokenKind::As | TokenKind::To) {
            return self.type_cast(ast, node, op, lhs_node, rhs_node);
        }

        let lhs_type = self.get_data_type(ast, lhs_node);
        let rhs_type = self.get_data_type(ast, rhs_node);
        if lhs_type == DataType::Invalid || rhs_type == DataType::Invalid {
            return DataType::Invalid;
        }

        match binary_result_type(op, &lhs_type, &rhs_type) {
            Some(ty) => ty,
            None => {
                self.logger.error(
                    PRODUCER,
                    format!("Invalid argument types \"{}\" and \"{}\" for operator \"{}\"", lhs_type.name(), rhs_type.name(), ast.node(node).token.text),
                    Span::of(&ast.node(node).token),
                );
                DataType::Invalid
            }
        }
    }

    fn type_cast(&mut self, ast: &mut Ast, node: NodeId, op: TokenKind, lhs_node: NodeId, rhs_node: NodeId) -> DataType {
        let lhs_type = self.get_data_type(ast, lhs_node);
        self.get_data_type(ast, rhs_node); // Type meta-node, always `type`
        let requested = DataType::from_name(&ast.node(rhs_node).token.text);

        if requested == DataType::Bool {
            self.logger.error(
                PRODUCER,
                format!("Cannot cast to \"{}\"", requested.name()),
                Span::of(&ast.node(rhs_node).token),
            );
            return DataType::Invalid;
        }
        if lhs_type == DataType::Invalid {
            return DataType::Invalid;
        }

        let allowed = if op == TokenKind::As { is_as_castable(&lhs_type, &requested) } else { is_to_castable(&lhs_type, &requested) };
        if allowed {
            requested
        } else {
            let op_text = if op == TokenKind::As { "as" } else { "to" };
            self.logger.error(
                PRODUCER,
                format!("Cannot cast \"{}\" {} \"{}\"", lhs_type.name(), op_text, requested.name()),
                Span::of(&ast.node(node).token),
            );
            DataType::Invalid
        }
    }

    fn type_unary_op(&mut self, ast: &mut Ast, node: NodeId) -> DataType {
        let op = ast.node(node).token.kind;
        let operand = ast.node(node).children[0];
        let operand_type = self.get_data_type(ast, operand);
        if operand_type == DataType::Invalid {
            return DataType::Invalid;
        }
        match unary_result_type(op, &operand_type) {
            Some(ty) => ty,
            None => {
                self.logger.error(
                    PRODUCER,
                    format!("Invalid argument type \"{}\" for operator \"{}\"", operand_type.name(), ast.node(node).token.text),
                    Span::of(&ast.node(node).token),
                );
                DataType::Invalid
            }
        }
    }

    fn resolve_target_variable(&self, ast: &Ast, node: NodeId) -> Option<VarId> {
        match ast.node(node).kind {
            NodeKind::VariableId => {
                let scope = ast.node(node).scope?;
                self.symbols.get_variable(scope, &ast.node(node).token.text)
            }
            NodeKind::Access => {
                let field = ast.node(node).children[1];
                let scope = ast.node(field).scope?;
                self.symbols.get_variable(scope, &ast.node(field).token.text)
            }
            _ => None,
        }
    }

    fn resolve_callee_function(&self, ast: &Ast, node: NodeId) -> Option<FuncId> {
        match ast.node(node).kind {
            NodeKind::FunctionId => {
                let scope = ast.node(node).scope?;
                self.symbols.get_function(scope, &ast.node(node).token.text)
            }
            NodeKind::Access => {
                let field = ast.node(node).children[1];
                let scope = ast.node(field).scope?;
                self.symbols.get_function(scope, &ast.node(field).token.text)
            }
            _ => None,
        }
    }

    // ---------------------------------------------------------------
    // Pass 4: analysis. Reserved for pure-diagnostic rules that don't
    // feed back into scope/type resolution (missing-return detection,
    // alignment warnings, literal range checks). None of those are
    // implemented yet (spec §9's open TODOs), so this pass is a
    // structural walk with nothing to do per node.
    // ---------------------------------------------------------------

    fn run_analysis_pass(&mut self, ast: &mut Ast) {
        self.visit_analysis(ast, ast.root);
    }

    fn visit_analysis(&mut self, ast: &mut Ast, node: NodeId) {
        let children = ast.node(node).children.clone();
        for child in children {
            self.visit_analysis(ast, child);
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::new()
    }
}

fn binary_result_type(op: TokenKind, lhs: &DataType, rhs: &DataType) -> Option<DataType> {
    use TokenKind::*;
    match op {
        Plus | Minus | Star | Slash => {
            if lhs == rhs && lhs.is_numeric() {
                Some(lhs.clone())
            } else {
                None
            }
        }
        Percent | Amp | Pipe | Caret | Shl | Shr | RotateLeft | RotateRight => {
            if lhs == rhs && lhs.is_fixed_width_integer() {
                Some(lhs.clone())
            } else {
                None
            }
        }
        EqEq | NotEq => {
            if lhs == rhs && (lhs.is_numeric() || *lhs == DataType::Bool) {
                Some(DataType::Bool)
            } else {
                None
            }
        }
        Lt | Le | Gt | Ge => {
            if lhs == rhs && lhs.is_numeric() {
                Some(DataType::Bool)
            } else {
                None
            }
        }
        AndAnd | OrOr => {
            if *lhs == DataType::Bool && *rhs == DataType::Bool {
                Some(DataType::Bool)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn unary_result_type(op: TokenKind, operand: &DataType) -> Option<DataType> {
    use DataType::*;
    match op {
        TokenKind::Minus => {
            if matches!(operand, Int | Long | Float | Double) {
                Some(operand.clone())
            } else {
                None
            }
        }
        TokenKind::Tilde => {
            if operand.is_fixed_width_integer() {
                Some(operand.clone())
            } else {
                None
            }
        }
        TokenKind::Bang => {
            if *operand == Bool {
                Some(Bool)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// `as`: value-preserving cast between numeric types of the same
/// width-class (spec §4.5). Bool is never a valid RHS (checked by the
/// caller before this runs).
fn is_as_castable(from: &DataType, to: &DataType) -> bool {
    use DataType::*;
    let pairs: [(DataType, DataType); 12] = [
        (Int, Uint), (Uint, Int),
        (Int, Float), (Float, Int),
        (Uint, Float), (Float, Uint),
        (Long, Ulong), (Ulong, Long),
        (Long, Double), (Double, Long),
        (Ulong, Double), (Double, Ulong),
    ];
    pairs.iter().any(|(a, b)| a == from && b == to)
}

/// `to`: bit-reinterpret/widening cast across width classes. Resolves
/// spec §4.5's "see the source language reference" with a closed table
/// covering the pairs `as` does not: every ordered pair among the six
/// numeric primitives other than the twelve `is_as_castable` already
/// handles (DESIGN.md records this as the open-question decision).
fn is_to_castable(from: &DataType, to: &DataType) -> bool {
    use DataType::*;
    let pairs: [(DataType, DataType); 18] = [
        (Int, Long), (Int, Ulong), (Int, Double),
        (Uint, Long), (Uint, Ulong), (Uint, Double),
        (Long, Int), (Long, Uint), (Long, Float),
        (Ulong, Int), (Ulong, Uint), (Ulong, Float),
        (Float, Long), (Float, Ulong), (Float, Double),
        (Double, Int), (Double, Uint), (Double, Float),
    ];
    pairs.iter().any(|(a, b)| a == from && b == to)
}
