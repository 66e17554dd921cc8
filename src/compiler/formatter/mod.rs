use std::fmt::Write as _;

use super::ast::{Ast, NodeId, NodeKind};

const INDENT: &str = "    ";

/// Re-serializes an AST back into indented Schwa source. Mirrors the
/// teacher's `ProgramCode` `Display` impl in spirit, one pass over the
/// structure writing line by line, but walks a tree instead of a flat
/// instruction list, since there is no bytecode here to linearize.
pub struct Formatter;

impl Formatter {
    pub fn format(ast: &Ast) -> String {
        let mut out = String::new();
        Self::write_block(ast, ast.root, 0, &mut out);
        out
    }

    fn write_block(ast: &Ast, node: NodeId, depth: usize, out: &mut String) {
        for &child in &ast.node(node).children {
            Self::write_statement(ast, child, depth, out);
        }
    }

    fn write_statement(ast: &Ast, node: NodeId, depth: usize, out: &mut String) {
        let indent = INDENT.repeat(depth);
        match ast.node(node).kind {
            NodeKind::Const => {
                let _ = write!(out, "{}const ", indent);
                Self::write_declaration(ast, ast.node(node).children[0], depth, out);
            }
            NodeKind::Export => {
                let _ = write!(out, "{}export ", indent);
                Self::write_declaration(ast, ast.node(node).children[0], depth, out);
            }
            NodeKind::Global | NodeKind::StructDef | NodeKind::FunctionDef | NodeKind::Map => {
                let _ = write!(out, "{}", indent);
                Self::write_declaration(ast, node, depth, out);
            }
            NodeKind::Return => {
                let _ = write!(out, "{}return ", indent);
                Self::write_expression(ast, ast.node(node).children[0], out);
                out.push('\n');
            }
            NodeKind::ReturnVoid => {
                let _ = writeln!(out, "{}return", indent);
            }
            NodeKind::Assignment => {
                let children = &ast.node(node).children;
                let _ = write!(out, "{}", indent);
                Self::write_expression(ast, children[0], out);
                out.push_str(" = ");
                Self::write_expression(ast, children[1], out);
                out.push('\n');
            }
            _ => {
                let _ = write!(out, "{}", indent);
                Self::write_expression(ast, node, out);
                out.push('\n');
            }
        }
    }

    /// Writes a declaration without its own leading indent. Used both at
    /// statement position and nested inside `const`/`export`.
    fn write_declaration(ast: &Ast, node: NodeId, depth: usize, out: &mut String) {
        match ast.node(node).kind {
            NodeKind::Global => {
                let children = &ast.node(node).children;
                Self::write_variable_def(ast, children[0], out);
                out.push_str(" = ");
                Self::write_expression(ast, children[1], out);
                out.push('\n');
            }
            NodeKind::Map => {
                let children = &ast.node(node).children;
                out.push_str("map ");
                Self::write_variable_def(ast, children[0], out);
                out.push(' ');
                Self::write_expression(ast, children[1], out);
                out.push('\n');
            }
            NodeKind::StructDef => {
                let _ = writeln!(out, "struct {}", ast.node(node).token.text);
                let fields_node = ast.node(node).children[0];
                for &field in &ast.node(fields_node).children {
                    let _ = write!(out, "{}", INDENT.repeat(depth + 1));
                    Self::write_variable_def(ast, field, out);
                    out.push('\n');
                }
            }
            NodeKind::FunctionDef => {
                let children = &ast.node(node).children;
                let return_type = ast.node(children[0]).token.text.clone();
                let params_node = children[1];
                let block_node = children[2];
                let params: Vec<String> = ast
                    .node(params_node)
                    .children
                    .iter()
                    .map(|&p| {
                        let mut s = String::new();
                        Self::write_variable_def(ast, p, &mut s);
                        s
                    })
                    .collect();
                let _ = writeln!(out, "{} {}({})", return_type, ast.node(node).token.text, params.join(", "));
                Self::write_block(ast, block_node, depth + 1, out);
            }
            _ => {}
        }
    }

    /// A variable definition is written in Schwa's own declaration order,
    /// type then name (`parse_type_annotation` then an identifier token).
    /// The language has no `:` token to separate them.
    fn write_variable_def(ast: &Ast, node: NodeId, out: &mut String) {
        let type_node = ast.node(node).children[0];
        let _ = write!(out, "{} {}", ast.node(type_node).token.text, ast.node(node).token.text);
    }

    fn write_expression(ast: &Ast, node: NodeId, out: &mut String) {
        match ast.node(node).kind {
            NodeKind::Literal | NodeKind::VariableId | NodeKind::FunctionId | NodeKind::StructId | NodeKind::Type => {
                out.push_str(&ast.node(node).token.text);
            }
            NodeKind::Access => {
                let children = &ast.node(node).children;
                Self::write_expression(ast, children[0], out);
                out.push('.');
                Self::write_expression(ast, children[1], out);
            }
            NodeKind::FunctionCall => {
                let children = &ast.node(node).children;
                Self::write_expression(ast, children[0], out);
                out.push('(');
                let args_node = children[1];
                for (index, &arg) in ast.node(args_node).children.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    Self::write_expression(ast, arg, out);
                }
                out.push(')');
            }
            NodeKind::BinaryOp => {
                let children = &ast.node(node).children;
                out.push('(');
                Self::write_expression(ast, children[0], out);
                let _ = write!(out, " {} ", ast.node(node).token.text);
                Self::write_expression(ast, children[1], out);
                out.push(')');
            }
            NodeKind::UnaryOp => {
                out.push_str(&ast.node(node).token.text);
                Self::write_expression(ast, ast.node(node).children[0], out);
            }
            _ => {}
        }
    }
}
