pub mod datatype;
pub mod symbol_table;

use super::token::Token;
use datatype::DataType;
use symbol_table::ScopeId;

/// The closed set of AST node kinds the analyser (and its ambient
/// collaborators) consume, per §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Program,
    Block,
    StructDef,
    FunctionDef,
    VariableDef,
    Global,
    Map,
    Access,
    Const,
    Export,
    Type,
    VariableId,
    FunctionId,
    StructId,
    Literal,
    Assignment,
    BinaryOp,
    UnaryOp,
    FunctionCall,
    Arguments,
    Parameters,
    Fields,
    Return,
    ReturnVoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// A single AST node. Children/parent are arena indices; `scope` and
/// `data_type` are the two analyser-owned annotation cells, left `None`
/// until the analyser visits the node. `valid` is set by the upstream
/// structural validator and is read-only to the analyser.
#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: NodeKind,
    pub token: Token,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub valid: bool,
    pub scope: Option<ScopeId>,
    pub data_type: Option<DataType>,
}

impl AstNode {
    pub fn new(kind: NodeKind, token: Token) -> Self {
        AstNode { kind, token, children: Vec::new(), parent: None, valid: true, scope: None, data_type: None }
    }
}

/// Arena-backed tree: `Ast` owns every node, indexed by `NodeId`, per the
/// design notes' guidance to represent parent/scope/node pointers as stable
/// integer indices rather than owned pointers.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<AstNode>,
    pub root: NodeId,
}

impl Ast {
    /// Builds an `Ast` from a root node, assigning parent back-edges by
    /// walking the tree the builder already shaped via `children`.
    pub fn new(nodes: Vec<AstNode>, root: NodeId) -> Self {
        let mut ast = Ast { nodes, root };
        ast.relink_parents();
        ast
    }

    fn relink_parents(&mut self) {
        let root = self.root;
        self.relink_parents_from(root, None);
    }

    fn relink_parents_from(&mut self, node: NodeId, parent: Option<NodeId>) {
        self.nodes[node.0 as usize].parent = parent;
        let children = self.nodes[node.0 as usize].children.clone();
        for child in children {
            self.relink_parents_from(child, Some(node));
        }
    }

    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut AstNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builder used by the parser: pushes nodes into a flat arena and returns
/// their `NodeId`s as it goes, so children can be wired up before the whole
/// tree is handed to `Ast::new`.
#[derive(Debug, Default)]
pub struct AstBuilder {
    nodes: Vec<AstNode>,
}

impl AstBuilder {
    pub fn new() -> Self {
        AstBuilder { nodes: Vec::new() }
    }

    pub fn push(&mut self, kind: NodeKind, token: Token, children: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(kind, token);
        node.children = children;
        self.nodes.push(node);
        NodeId((self.nodes.len() - 1) as u32)
    }

    pub fn finish(self, root: NodeId) -> Ast {
        Ast::new(self.nodes, root)
    }
}
