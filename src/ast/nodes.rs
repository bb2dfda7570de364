// src/ast/nodes.rs
// Typed accessors over the generic children lists, one group per node kind.

use super::{Ast, Child, NodeId};
use crate::{
    lexer::{Token, TokenKind},
    parser::grammar::NonTerminal as N,
};

/// Callee of a `function_call_generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee<'a> {
    /// `vec3(...)`, `mat4(...)`
    Constructor(TokenKind),
    /// `float[2](...)`; carries the type specifier node.
    ArrayConstructor(NodeId),
    /// Struct constructor, user function, macro or built-in function.
    Named(&'a Token),
}

/// One declarator of an `init_declarator_list`.
#[derive(Debug, Clone, Copy)]
pub struct Declarator<'a> {
    pub name: &'a Token,
    pub array: Option<NodeId>,
    pub initializer: Option<NodeId>,
    /// The `single_declaration` or `init_declarator_list` node that introduced it.
    pub node: NodeId,
}

impl Ast {
    // ---- functions ----

    /// `function_header` under a `function_prototype`.
    pub fn prototype_header(&self, proto: NodeId) -> Option<NodeId> {
        let mut id = self.child_node(proto, 0)?;
        loop {
            match self.kind(id) {
                N::FunctionHeader => return Some(id),
                N::FunctionDeclarator | N::FunctionHeaderWithParameters => {
                    id = self.child_node(id, 0)?;
                }
                _ => return None,
            }
        }
    }

    /// `parameter_declaration` nodes in declaration order.
    pub fn prototype_parameters(&self, proto: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(mut id) = self.child_node(proto, 0).and_then(|d| self.child_node(d, 0)) else {
            return out;
        };
        while self.kind(id) == N::FunctionHeaderWithParameters {
            if let Some(param) = self.find_child(id, N::ParameterDeclaration) {
                out.push(param);
            }
            match self.child_node(id, 0) {
                Some(inner) => id = inner,
                None => break,
            }
        }
        out.reverse();
        out
    }

    pub fn header_name(&self, header: NodeId) -> Option<&Token> {
        self.child_token(header, 1)
    }

    /// `fully_specified_type` of a header.
    pub fn header_return_type(&self, header: NodeId) -> Option<NodeId> {
        self.child_node(header, 0)
    }

    pub fn definition_prototype(&self, def: NodeId) -> Option<NodeId> {
        self.child_node(def, 0)
    }

    pub fn definition_body(&self, def: NodeId) -> Option<NodeId> {
        self.child_node(def, 1)
    }

    /// `parameter_declarator` of a `parameter_declaration`, absent for unnamed parameters.
    pub fn parameter_declarator(&self, param: NodeId) -> Option<NodeId> {
        self.find_child(param, N::ParameterDeclarator)
    }

    pub fn parameter_name(&self, param: NodeId) -> Option<&Token> {
        let decl = self.parameter_declarator(param)?;
        self.child_token(decl, 1)
    }

    /// Qualifier keywords (`in`, `out`, `highp`, ...) attached to a parameter or type.
    pub fn qualifier_keywords(&self, owner: NodeId) -> Vec<TokenKind> {
        let mut out = Vec::new();
        if let Some(q) = self.find_child(owner, N::TypeQualifier) {
            self.collect_token_kinds(q, &mut out);
        }
        out
    }

    fn collect_token_kinds(&self, id: NodeId, out: &mut Vec<TokenKind>) {
        for c in &self.node(id).children {
            match c {
                Child::Token(t) => out.push(t.kind),
                Child::Node(n) => self.collect_token_kinds(*n, out),
            }
        }
    }

    // ---- calls ----

    pub fn call_callee(&self, call: NodeId) -> Option<Callee<'_>> {
        let ident = self.child_node(call, 0)?;
        let spec = self.child_node(ident, 0)?;
        if self.child_count(spec) > 1 {
            return Some(Callee::ArrayConstructor(spec));
        }
        let nonarray = self.child_node(spec, 0)?;
        match self.node(nonarray).children.first()? {
            Child::Token(t) => Some(Callee::Named(t)),
            Child::Node(builtin) => {
                let kw = self.child_token(*builtin, 0)?;
                Some(Callee::Constructor(kw.kind))
            }
        }
    }

    /// Argument expressions of a call, left to right.
    pub fn call_arguments(&self, call: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(mut list) = self.find_child(call, N::FunctionCallParameterList) else {
            return out;
        };
        loop {
            match self.node(list).children.as_slice() {
                [Child::Node(arg)] => {
                    out.push(*arg);
                    break;
                }
                [Child::Node(rest), _, Child::Node(arg)] => {
                    out.push(*arg);
                    list = *rest;
                }
                _ => break,
            }
        }
        out.reverse();
        out
    }

    /// The `function_call_generic` an expression reduces to, if it is a bare call.
    pub fn as_call(&self, expr: NodeId) -> Option<NodeId> {
        let inner = self.unwrap_chain(expr);
        (self.kind(inner) == N::FunctionCallGeneric).then_some(inner)
    }

    // ---- declarations ----

    /// `fully_specified_type` shared by every declarator of a declaration list.
    pub fn declaration_type(&self, list: NodeId) -> Option<NodeId> {
        let mut id = list;
        while self.kind(id) == N::InitDeclaratorList {
            id = self.child_node(id, 0)?;
        }
        match self.kind(id) {
            N::SingleDeclaration => self.child_node(id, 0),
            _ => None,
        }
    }

    /// Declarators of an `init_declarator_list` (or `single_declaration`) in order.
    pub fn declarators(&self, list: NodeId) -> Vec<Declarator<'_>> {
        let mut out = Vec::new();
        let mut id = list;
        loop {
            let node = self.node(id);
            let (name_at, next) = match node.kind {
                N::SingleDeclaration => (1, None),
                N::InitDeclaratorList if node.children.len() == 1 => match self.child_node(id, 0) {
                    Some(single) => {
                        id = single;
                        continue;
                    }
                    None => break,
                },
                N::InitDeclaratorList => (2, self.child_node(id, 0)),
                _ => break,
            };
            if let Some(name) = self.child_token(id, name_at) {
                out.push(Declarator {
                    name,
                    array: self.find_child(id, N::ArraySpecifier),
                    initializer: self.find_child(id, N::Initializer),
                    node: id,
                });
            }
            match next {
                Some(n) => id = n,
                None => break,
            }
        }
        out.reverse();
        out
    }

    /// `struct_declaration` nodes of a struct specifier, directives included.
    pub fn struct_declarations(&self, spec: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(mut list) = self.find_child(spec, N::StructDeclarationList) else {
            return out;
        };
        loop {
            match self.node(list).children.as_slice() {
                [Child::Node(decl)] => {
                    out.push(*decl);
                    break;
                }
                [Child::Node(rest), Child::Node(decl)] => {
                    out.push(*decl);
                    list = *rest;
                }
                _ => break,
            }
        }
        out.reverse();
        out
    }

    /// `struct_declarator` nodes of one struct declaration.
    pub fn struct_declarators(&self, decl: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(mut list) = self.find_child(decl, N::StructDeclaratorList) else {
            return out;
        };
        loop {
            match self.node(list).children.as_slice() {
                [Child::Node(d)] => {
                    out.push(*d);
                    break;
                }
                [Child::Node(rest), _, Child::Node(d)] => {
                    out.push(*d);
                    list = *rest;
                }
                _ => break,
            }
        }
        out.reverse();
        out
    }

    /// Directive line carried by a `macro_directive` node.
    pub fn directive(&self, id: NodeId) -> Option<&Token> {
        self.child_token(id, 0)
    }

    /// Statements of a statement list (or a compound statement), in order.
    pub fn statements(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(mut list) = (match self.kind(id) {
            N::StatementList => Some(id),
            _ => self.find_child(id, N::StatementList),
        }) else {
            return out;
        };
        loop {
            match self.node(list).children.as_slice() {
                [Child::Node(s)] => {
                    out.push(*s);
                    break;
                }
                [Child::Node(rest), Child::Node(s)] => {
                    out.push(*s);
                    list = *rest;
                }
                _ => break,
            }
        }
        out.reverse();
        out
    }
}
