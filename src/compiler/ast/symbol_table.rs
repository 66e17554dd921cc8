use std::collections::HashMap;

use super::datatype::DataType;
use super::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructId(pub u32);

/// A variable record: a local, parameter, struct field, or global. The four
/// modifier flags are independent bits per §3 invariant 5 (`const` implies
/// `global`; `mapped` implies `global`) which callers must enforce when they
/// set them.
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: String,
    pub ty: DataType,
    pub scope: ScopeId,
    pub node: Option<NodeId>,
    pub offset: u32,
    pub is_const: bool,
    pub is_export: bool,
    pub is_global: bool,
    pub is_mapped: bool,
}

impl Variable {
    pub fn new(id: String, ty: DataType, scope: ScopeId, node: Option<NodeId>) -> Self {
        Variable {
            id,
            ty,
            scope,
            node,
            offset: 0,
            is_const: false,
            is_export: false,
            is_global: false,
            is_mapped: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: String,
    pub return_type: DataType,
    pub params: Vec<VarId>,
    pub scope: ScopeId,
    pub node: Option<NodeId>,
    pub is_export: bool,
}

#[derive(Debug, Clone)]
pub struct Struct {
    pub id: String,
    pub fields: Vec<VarId>,
    pub scope: ScopeId,
    pub node: Option<NodeId>,
    pub is_export: bool,
}

/// A lexical scope: a parent link plus four independently-keyed symbol maps.
/// `id` is empty for anonymous block scopes (`Program`/`Block`), in which
/// case the scope is never registered under a name in its parent.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: String,
    pub parent: Option<ScopeId>,
    pub node: Option<NodeId>,
    pub scopes: HashMap<String, ScopeId>,
    pub vars: HashMap<String, VarId>,
    pub funcs: HashMap<String, FuncId>,
    pub structs: HashMap<String, StructId>,
}

impl Scope {
    fn new(id: String, parent: Option<ScopeId>, node: Option<NodeId>) -> Self {
        Scope {
            id,
            parent,
            node,
            scopes: HashMap::new(),
            vars: HashMap::new(),
            funcs: HashMap::new(),
            structs: HashMap::new(),
        }
    }
}

/// Outcome of attempting to declare a symbol: either it was inserted, or a
/// symbol with that id already existed in the scope's local map (§3
/// invariant 2: duplicate declarations emit a diagnostic and the second is
/// discarded).
pub enum Declared<T> {
    Inserted(T),
    Duplicate,
}

/// Arena holding every scope/variable/function/struct record created during
/// analysis. Parent/defining-node/scope back-edges are plain indices, never
/// owned pointers, per the design notes' arena-allocation guidance.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    vars: Vec<Variable>,
    funcs: Vec<Function>,
    structs: Vec<Struct>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { scopes: Vec::new(), vars: Vec::new(), funcs: Vec::new(), structs: Vec::new() }
    }

    /// Creates the scope tree's root: no parent, no id, no defining node.
    /// Used once, to seed the builtin catalog.
    pub fn new_root(&mut self) -> ScopeId {
        self.scopes.push(Scope::new(String::new(), None, None));
        ScopeId((self.scopes.len() - 1) as u32)
    }

    pub fn new_scope(&mut self, id: impl Into<String>, parent: ScopeId, node: Option<NodeId>) -> ScopeId {
        self.scopes.push(Scope::new(id.into(), Some(parent), node));
        ScopeId((self.scopes.len() - 1) as u32)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0 as usize]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0 as usize]
    }

    pub fn func(&self, id: FuncId) -> &Function {
        &self.funcs[id.0 as usize]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.funcs[id.0 as usize]
    }

    pub fn strukt(&self, id: StructId) -> &Struct {
        &self.structs[id.0 as usize]
    }

    pub fn strukt_mut(&mut self, id: StructId) -> &mut Struct {
        &mut self.structs[id.0 as usize]
    }

    pub fn struct_count(&self) -> usize {
        self.structs.len()
    }

    /// Registers a nested named scope under `parent` (e.g. a builtin
    /// type-prefix scope like `int`). Scopes created via `new_scope` are not
    /// automatically registered by name; callers that want the scope
    /// reachable via `get_scope` must call this explicitly.
    pub fn register_scope(&mut self, parent: ScopeId, id: &str, scope: ScopeId) {
        self.scope_mut(parent).scopes.insert(id.to_string(), scope);
    }

    pub fn declare_variable(&mut self, scope: ScopeId, mut variable: Variable) -> Declared<VarId> {
        if self.scope(scope).vars.contains_key(&variable.id) {
            return Declared::Duplicate;
        }
        variable.scope = scope;
        let id = variable.id.clone();
        self.vars.push(variable);
        let var_id = VarId((self.vars.len() - 1) as u32);
        self.scope_mut(scope).vars.insert(id, var_id);
        Declared::Inserted(var_id)
    }

    pub fn declare_function(&mut self, scope: ScopeId, function: Function) -> Declared<FuncId> {
        if self.scope(scope).funcs.contains_key(&function.id) {
            return Declared::Duplicate;
        }
        let id = function.id.clone();
        self.funcs.push(function);
        let func_id = FuncId((self.funcs.len() - 1) as u32);
        self.scope_mut(scope).funcs.insert(id, func_id);
        Declared::Inserted(func_id)
    }

    pub fn declare_struct(&mut self, scope: ScopeId, strukt: Struct) -> Declared<StructId> {
        if self.scope(scope).structs.contains_key(&strukt.id) {
            return Declared::Duplicate;
        }
        let id = strukt.id.clone();
        self.structs.push(strukt);
        let struct_id = StructId((self.structs.len() - 1) as u32);
        self.scope_mut(scope).structs.insert(id, struct_id);
        Declared::Inserted(struct_id)
    }

    /// Hierarchical lookup: consult `scope`'s own map, then delegate to the
    /// parent chain. Absent shadowing, a symbol resolvable in `S` is
    /// resolvable in every descendant of `S`.
    pub fn get_variable(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(var) = self.scope(id).vars.get(name) {
                return Some(*var);
            }
            current = self.scope(id).parent;
        }
        None
    }

    pub fn get_function(&self, scope: ScopeId, name: &str) -> Option<FuncId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(func) = self.scope(id).funcs.get(name) {
                return Some(*func);
            }
            current = self.scope(id).parent;
        }
        None
    }

    pub fn get_struct(&self, scope: ScopeId, name: &str) -> Option<StructId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(s) = self.scope(id).structs.get(name) {
                return Some(*s);
            }
            current = self.scope(id).parent;
        }
        None
    }

    pub fn get_scope(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(s) = self.scope(id).scopes.get(name) {
                return Some(*s);
            }
            current = self.scope(id).parent;
        }
        None
    }

    /// The dot-joined chain of non-empty scope ids from root plus the
    /// symbol's own id.
    pub fn path_to(&self, scope: ScopeId, symbol_id: &str) -> String {
        let mut parts = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if !scope.id.is_empty() {
                parts.push(scope.id.clone());
            }
            current = scope.parent;
        }
        parts.reverse();
        parts.push(symbol_id.to_string());
        parts.join(".")
    }

    /// Recursive, cycle-guarded size computation (§4.4). Struct field cycles
    /// deeper than 16 levels are treated as size 0 rather than overflowing
    /// the stack.
    pub fn size_of(&self, ty: &DataType, scope: ScopeId, depth: u32, missing: &mut Option<String>) -> u32 {
        if depth > 16 {
            return 0;
        }
        if ty.is_primitive() {
            return ty.primitive_size();
        }
        let name = ty.name();
        match self.get_struct(scope, &name) {
            Some(struct_id) => {
                let strukt = self.strukt(struct_id).clone();
                strukt
                    .fields
                    .iter()
                    .map(|field| {
                        let field = self.var(*field);
                        self.size_of(&field.ty, strukt.scope, depth + 1, missing)
                    })
                    .sum()
            }
            None => {
                *missing = Some(name);
                0
            }
        }
    }
}
