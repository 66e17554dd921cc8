use super::super::ast::datatype::DataType;
use super::super::ast::symbol_table::{Declared, Function, ScopeId, SymbolTable, Variable};

/// Populates the root scope with the numeric intrinsic catalog: a nested
/// scope per primitive type (`int`, `uint`, ...) holding that type's load,
/// store and bit/float utility functions, plus the single free `nop()`.
/// These mirror WebAssembly's own numeric instruction families, since
/// Schwa compiles straight down to them.
pub fn register(symbols: &mut SymbolTable, root: ScopeId) {
    for (name, ty) in [
        ("int", DataType::Int),
        ("uint", DataType::Uint),
        ("long", DataType::Long),
        ("ulong", DataType::Ulong),
    ] {
        let scope = symbols.new_scope(name, root, None);
        symbols.register_scope(root, name, scope);
        register_integer_family(symbols, scope, ty);
    }

    for (name, ty) in [("float", DataType::Float), ("double", DataType::Double)] {
        let scope = symbols.new_scope(name, root, None);
        symbols.register_scope(root, name, scope);
        register_float_family(symbols, scope, ty);
    }

    register_function(symbols, root, "nop", &[], DataType::Void);
}

fn register_integer_family(symbols: &mut SymbolTable, scope: ScopeId, ty: DataType) {
    register_function(symbols, scope, "load", &[DataType::Uint], ty.clone());
    register_function(symbols, scope, "store", &[DataType::Uint, ty.clone()], DataType::Void);

    register_function(symbols, scope, "loadSByte", &[DataType::Uint], ty.clone());
    register_function(symbols, scope, "loadByte", &[DataType::Uint], ty.clone());
    register_function(symbols, scope, "loadShort", &[DataType::Uint], ty.clone());
    register_function(symbols, scope, "loadUShort", &[DataType::Uint], ty.clone());
    register_function(symbols, scope, "storeSByte", &[DataType::Uint, ty.clone()], DataType::Void);
    register_function(symbols, scope, "storeByte", &[DataType::Uint, ty.clone()], DataType::Void);
    register_function(symbols, scope, "storeShort", &[DataType::Uint, ty.clone()], DataType::Void);
    register_function(symbols, scope, "storeUShort", &[DataType::Uint, ty.clone()], DataType::Void);

    // Narrowing to/from a full 32-bit word only makes sense for the
    // 64-bit types; `int.loadInt` would just be `int.load`.
    if matches!(ty, DataType::Long | DataType::Ulong) {
        register_function(symbols, scope, "loadInt", &[DataType::Uint], ty.clone());
        register_function(symbols, scope, "loadUInt", &[DataType::Uint], ty.clone());
        register_function(symbols, scope, "storeInt", &[DataType::Uint, ty.clone()], DataType::Void);
        register_function(symbols, scope, "storeUInt", &[DataType::Uint, ty.clone()], DataType::Void);
    }

    register_function(symbols, scope, "clz", &[ty.clone()], ty.clone());
    register_function(symbols, scope, "ctz", &[ty.clone()], ty.clone());
    register_function(symbols, scope, "popcnt", &[ty.clone()], ty.clone());
    register_function(symbols, scope, "eqz", &[ty.clone()], ty);
}

fn register_float_family(symbols: &mut SymbolTable, scope: ScopeId, ty: DataType) {
    register_function(symbols, scope, "load", &[DataType::Uint], ty.clone());
    register_function(symbols, scope, "store", &[DataType::Uint, ty.clone()], DataType::Void);

    register_function(symbols, scope, "sqrt", &[ty.clone()], ty.clone());
    register_function(symbols, scope, "abs", &[ty.clone()], ty.clone());
    register_function(symbols, scope, "ceil", &[ty.clone()], ty.clone());
    register_function(symbols, scope, "floor", &[ty.clone()], ty.clone());
    register_function(symbols, scope, "truncate", &[ty.clone()], ty.clone());
    register_function(symbols, scope, "round", &[ty.clone()], ty.clone());
    register_function(symbols, scope, "min", &[ty.clone(), ty.clone()], ty.clone());
    register_function(symbols, scope, "max", &[ty.clone(), ty.clone()], ty.clone());
    register_function(symbols, scope, "copysign", &[ty.clone(), ty.clone()], ty);
}

fn register_function(symbols: &mut SymbolTable, scope: ScopeId, name: &str, params: &[DataType], return_type: DataType) {
    let fn_scope = symbols.new_scope(format!("{}#builtin", name), scope, None);
    let mut param_ids = Vec::new();
    for (index, param_type) in params.iter().enumerate() {
        let variable = Variable::new(format!("arg{}", index), param_type.clone(), fn_scope, None);
        if let Declared::Inserted(id) = symbols.declare_variable(fn_scope, variable) {
            param_ids.push(id);
        }
    }
    let function = Function { id: name.to_string(), return_type, params: param_ids, scope: fn_scope, node: None, is_export: false };
    let _ = symbols.declare_function(scope, function);
}
