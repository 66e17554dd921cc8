use super::ast::{Ast, NodeId, NodeKind};
use super::diagnostics::{Logger, Span};

const PRODUCER: &str = "validator";

/// Walks a freshly parsed tree and marks each node's `valid` flag according
/// to the shape its kind is allowed to have. The analyser trusts `valid`
/// rather than re-deriving arity/kind constraints itself, so a node the
/// validator rejects is skipped by every later pass instead of panicking
/// it into a corner.
pub struct Validator;

impl Validator {
    pub fn validate(ast: &mut Ast, logger: &mut Logger) {
        let root = ast.root;
        Self::validate_node(ast, root, logger);
    }

    fn validate_node(ast: &mut Ast, id: NodeId, logger: &mut Logger) {
        let children = ast.node(id).children.clone();
        for child in &children {
            Self::validate_node(ast, *child, logger);
        }

        let kind = ast.node(id).kind;
        let child_kinds: Vec<NodeKind> = children.iter().map(|c| ast.node(*c).kind).collect();

        if let Err(message) = Self::check_shape(kind, &child_kinds) {
            let span = Span::of(&ast.node(id).token);
            logger.error(PRODUCER, message, span);
            ast.node_mut(id).valid = false;
        }
    }

    fn check_shape(kind: NodeKind, children: &[NodeKind]) -> Result<(), String> {
        use NodeKind::*;

        match kind {
            Program => each(children, |k| {
                matches!(k, StructDef | FunctionDef | Global | Map | Const | Export)
            }, "program statement must be a struct, function, global, map, const or export definition"),

            Block => each(children, |k| {
                matches!(k, Assignment | Return | ReturnVoid | FunctionCall)
            }, "block statement must be an assignment, return or call"),

            StructDef => arity(children, &[Fields], "struct definition expects a single field list"),

            FunctionDef => {
                arity(children, &[Type, Parameters, Block], "function definition expects a return type, parameter list and body")
            }

            VariableDef => arity(children, &[Type], "variable definition expects a single type annotation"),

            Global => {
                if children.len() != 2 || children[0] != VariableDef {
                    return Err("global definition expects a variable definition and an initializer expression".to_string());
                }
                Ok(())
            }

            Map => arity(children, &[VariableDef, Literal], "map definition expects a variable definition and an offset literal"),

            Access => {
                if children.len() != 2 || !matches!(children[1], VariableId | FunctionId) {
                    return Err("member access expects a base expression and a field or method name".to_string());
                }
                Ok(())
            }

            Const | Export => each(children, |k| {
                matches!(k, Global | Map | FunctionDef | StructDef | Const | Export)
            }, "const/export must wrap a global, map, function or struct definition"),

            Type | VariableId | FunctionId | StructId | Literal | ReturnVoid => {
                if children.is_empty() {
                    Ok(())
                } else {
                    Err("leaf node must not have children".to_string())
                }
            }

            Assignment => {
                if children.len() != 2 || !matches!(children[0], VariableId | Access) {
                    return Err("assignment expects an assignable target and a value expression".to_string());
                }
                Ok(())
            }

            BinaryOp => {
                if children.len() != 2 {
                    return Err("binary operation expects exactly two operands".to_string());
                }
                Ok(())
            }

            UnaryOp => {
                if children.len() != 1 {
                    return Err("unary operation expects exactly one operand".to_string());
                }
                Ok(())
            }

            FunctionCall => {
                if children.len() != 2 || !matches!(children[0], FunctionId | Access) || children[1] != Arguments {
                    return Err("function call expects a callee and an argument list".to_string());
                }
                Ok(())
            }

            Arguments => Ok(()),

            Parameters | Fields => each(children, |k| k == VariableDef, "parameter/field list may only contain variable definitions"),

            Return => {
                if children.len() != 1 {
                    return Err("return expects exactly one value expression".to_string());
                }
                Ok(())
            }
        }
    }
}

fn each(children: &[NodeKind], predicate: impl Fn(NodeKind) -> bool, message: &str) -> Result<(), String> {
    if children.iter().all(|k| predicate(*k)) {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

fn arity(children: &[NodeKind], expected: &[NodeKind], message: &str) -> Result<(), String> {
    if children.len() == expected.len() && children.iter().zip(expected).all(|(a, b)| a == b) {
        Ok(())
    } else {
        Err(message.to_string())
    }
}
