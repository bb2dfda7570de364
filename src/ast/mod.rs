// src/ast/mod.rs
// Arena-allocated syntax tree. One node kind per grammar nonterminal.

pub mod nodes;

pub use nodes::{Callee, Declarator};

use crate::{
    diagnostics::SourceRange,
    lexer::{Token, TokenKind},
    parser::grammar::{NonTerminal, ProductionId},
    semantic::{macros::BranchFrame, scope::SymbolId, types::Type},
};

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub enum Child {
    Token(Token),
    Node(NodeId),
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub kind: NonTerminal,
    pub production: ProductionId,
    pub children: Vec<Child>,
    pub range: SourceRange,
    /// Set by `Ast::link_parents` once the tree is complete; `None` before that.
    pub parent: Option<NodeId>,
    /// Inferred type of expressions and type specifiers; `Any` elsewhere.
    pub ty: Type,
    /// Symbol this node declares or resolves to.
    pub symbol: Option<SymbolId>,
    /// Conditional frames open when a struct member was declared.
    pub frames: Vec<BranchFrame>,
}

#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<TreeNode>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn push(
        &mut self,
        kind: NonTerminal,
        production: ProductionId,
        children: Vec<Child>,
    ) -> NodeId {
        let range = self.span(&children);
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            kind,
            production,
            children,
            range,
            parent: None,
            ty: Type::Any,
            symbol: None,
            frames: Vec::new(),
        });
        id
    }

    fn span(&self, children: &[Child]) -> SourceRange {
        let range_of = |c: &Child| match c {
            Child::Token(t) => t.range,
            Child::Node(n) => self.nodes[*n].range,
        };
        match (children.first(), children.last()) {
            (Some(a), Some(b)) => range_of(a).cover(range_of(b)),
            _ => SourceRange::default(),
        }
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn kind(&self, id: NodeId) -> NonTerminal {
        self.nodes[id].kind
    }

    pub fn ty(&self, id: NodeId) -> &Type {
        &self.nodes[id].ty
    }

    /// Child node at position `i` (counting tokens too).
    pub fn child_node(&self, id: NodeId, i: usize) -> Option<NodeId> {
        match self.nodes[id].children.get(i)? {
            Child::Node(n) => Some(*n),
            Child::Token(_) => None,
        }
    }

    pub fn child_token(&self, id: NodeId, i: usize) -> Option<&Token> {
        match self.nodes[id].children.get(i)? {
            Child::Token(t) => Some(t),
            Child::Node(_) => None,
        }
    }

    pub fn child_nodes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id].children.iter().filter_map(|c| match c {
            Child::Node(n) => Some(*n),
            Child::Token(_) => None,
        })
    }

    /// First direct child node of the given kind.
    pub fn find_child(&self, id: NodeId, kind: NonTerminal) -> Option<NodeId> {
        self.child_nodes(id).find(|&n| self.nodes[n].kind == kind)
    }

    /// First direct token child of the given kind.
    pub fn find_token(&self, id: NodeId, kind: TokenKind) -> Option<&Token> {
        self.nodes[id].children.iter().find_map(|c| match c {
            Child::Token(t) if t.kind == kind => Some(t),
            _ => None,
        })
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.nodes[id].children.len()
    }

    /// Descends through single-child nodes (`expression -> assignment -> ... -> postfix`).
    pub fn unwrap_chain(&self, mut id: NodeId) -> NodeId {
        loop {
            match self.nodes[id].children.as_slice() {
                [Child::Node(n)] => id = *n,
                _ => return id,
            }
        }
    }

    /// Leftmost token under `id`.
    pub fn first_token(&self, id: NodeId) -> Option<&Token> {
        match self.nodes[id].children.first()? {
            Child::Token(t) => Some(t),
            Child::Node(n) => self.first_token(*n),
        }
    }

    /// Source-like text of a subtree: lexemes joined by single spaces.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = Vec::new();
        self.collect_lexemes(id, &mut out);
        out.join(" ")
    }

    fn collect_lexemes<'a>(&'a self, id: NodeId, out: &mut Vec<&'a str>) {
        for c in &self.nodes[id].children {
            match c {
                Child::Token(t) => out.push(&t.lexeme),
                Child::Node(n) => self.collect_lexemes(*n, out),
            }
        }
    }

    /// Fills every node's parent link. Children always precede their parent in the
    /// arena, so one pass over the nodes suffices.
    pub fn link_parents(&mut self) {
        for parent in 0..self.nodes.len() {
            for i in 0..self.nodes[parent].children.len() {
                if let Child::Node(child) = self.nodes[parent].children[i] {
                    self.nodes[child].parent = Some(parent);
                }
            }
        }
    }

    /// Nearest ancestor (or self) of the given kind.
    pub fn ancestor(&self, mut id: NodeId, kind: NonTerminal) -> Option<NodeId> {
        loop {
            if self.nodes[id].kind == kind {
                return Some(id);
            }
            id = self.nodes[id].parent?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Position;

    fn tok(kind: TokenKind, lexeme: &str, at: usize) -> Child {
        let start = Position::new(at, 1, at + 1);
        let end = Position::new(at + lexeme.len(), 1, at + lexeme.len() + 1);
        Child::Token(Token {
            kind,
            lexeme: lexeme.to_string(),
            range: SourceRange::new(start, end),
        })
    }

    #[test]
    fn ranges_cover_children_and_parents_link() {
        let mut ast = Ast::default();
        let var = ast.push(NonTerminal::VariableIdentifier, 1, vec![tok(TokenKind::Ident, "uv", 4)]);
        let primary = ast.push(NonTerminal::PrimaryExpression, 2, vec![Child::Node(var)]);
        let paren = ast.push(
            NonTerminal::PrimaryExpression,
            3,
            vec![
                tok(TokenKind::LeftParen, "(", 3),
                Child::Node(primary),
                tok(TokenKind::RightParen, ")", 6),
            ],
        );
        assert_eq!(ast.node(paren).range.start.index, 3);
        assert_eq!(ast.node(paren).range.end.index, 7);
        assert_eq!(ast.text(paren), "( uv )");
        assert_eq!(ast.unwrap_chain(primary), var);
        assert_eq!(ast.node(var).parent, None);

        ast.link_parents();
        assert_eq!(ast.node(var).parent, Some(primary));
        assert_eq!(ast.node(primary).parent, Some(paren));
        assert_eq!(ast.ancestor(var, NonTerminal::PrimaryExpression), Some(primary));
        assert_eq!(ast.first_token(paren).map(|t| t.kind), Some(TokenKind::LeftParen));
    }
}
