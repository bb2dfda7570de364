// src/semantic/scope.rs
// Symbol arena plus a scope arena addressed through an index stack.

use hashbrown::HashMap;

use super::{macros::BranchFrame, types::Type};
use crate::ast::NodeId;

pub type SymbolId = usize;
pub type ScopeId = usize;

pub const BUILTIN_SCOPE: ScopeId = 0;
pub const GLOBAL_SCOPE: ScopeId = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Var,
    Function,
    Struct,
    Macro,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
    /// Declarator text as written (`uv`, `weights[4]`).
    pub declarator: String,
    pub precision: Option<String>,
    pub interpolation: Option<String>,
    pub node: NodeId,
    /// Conditional directives enclosing the member, opened after the struct itself.
    pub frames: Vec<BranchFrame>,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    /// Defining node: declarator, struct specifier, function definition/prototype or directive.
    pub node: Option<NodeId>,
    pub scope: ScopeId,
    /// Parameter types (functions) or parameter count as `Any`s (function-like macros).
    pub params: Vec<Type>,
    pub members: Vec<StructMember>,
    /// Function declared by a prototype only (so far).
    pub prototype: bool,
    /// Declared while a conditional-compilation branch was open.
    pub conditional: bool,
    /// Function-like macro.
    pub callable: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            node: None,
            scope: BUILTIN_SCOPE,
            params: Vec::new(),
            members: Vec::new(),
            prototype: false,
            conditional: false,
            callable: false,
        }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn member(&self, name: &str) -> Option<(usize, &StructMember)> {
        self.members.iter().enumerate().find(|(_, m)| m.name == name)
    }

    /// `name(float, vec2)` style signature for diagnostics.
    pub fn signature(&self) -> String {
        format_signature(&self.name, &self.params)
    }
}

pub fn format_signature(name: &str, params: &[Type]) -> String {
    let params: Vec<String> = params.iter().map(|t| t.to_string()).collect();
    format!("{name}({})", params.join(", "))
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    symbols: HashMap<String, Vec<SymbolId>>,
}

/// Scopes live in an arena for the whole compilation; the stack only tracks which
/// ones are open. The global scope therefore stays resolvable after tear-down.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
}

const BUILTIN_VARIABLES: &[(&str, &str)] = &[
    ("gl_Position", "vec4"),
    ("gl_PointSize", "float"),
    ("gl_VertexID", "int"),
    ("gl_InstanceID", "int"),
    ("gl_FragCoord", "vec4"),
    ("gl_FrontFacing", "bool"),
    ("gl_PointCoord", "vec2"),
    ("gl_FragColor", "vec4"),
    ("gl_FragData", "vec4[]"),
    ("gl_FragDepth", "float"),
    ("gl_FragDepthEXT", "float"),
];

fn builtin_variable_type(spelling: &str) -> Type {
    match spelling {
        "vec4" => Type::vec(4),
        "vec2" => Type::vec(2),
        "float" => Type::FLOAT,
        "int" => Type::INT,
        "bool" => Type::BOOL,
        "vec4[]" => Type::Array(Box::new(Type::vec(4))),
        _ => Type::Any,
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Table with the built-in scope populated and the global scope open.
    pub fn new() -> Self {
        let mut table = Self {
            symbols: Vec::new(),
            scopes: Vec::new(),
            stack: Vec::new(),
        };
        table.push_scope();
        for &(name, ty) in BUILTIN_VARIABLES {
            let sym = Symbol::new(name, SymbolKind::Var, builtin_variable_type(ty));
            table.add(sym);
        }
        table.push_scope();
        table
    }

    pub fn push_scope(&mut self) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            parent: self.stack.last().copied(),
            symbols: HashMap::new(),
        });
        self.stack.push(id);
        id
    }

    pub fn pop_scope(&mut self) -> Option<ScopeId> {
        self.stack.pop()
    }

    pub fn pop_all(&mut self) {
        self.stack.clear();
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current_scope(&self) -> Option<ScopeId> {
        self.stack.last().copied()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    fn add(&mut self, mut sym: Symbol) -> SymbolId {
        let scope = self.current_scope().unwrap_or(BUILTIN_SCOPE);
        sym.scope = scope;
        let id = self.symbols.len();
        self.scopes[scope]
            .symbols
            .entry(sym.name.clone())
            .or_default()
            .push(id);
        self.symbols.push(sym);
        id
    }

    /// Inserts into the innermost open scope. Fails on a redeclaration unless either
    /// side was declared inside a conditional branch. Functions may repeat with a new
    /// signature, and a prototype may be paired with one definition.
    pub fn insert(&mut self, sym: Symbol) -> Result<SymbolId, String> {
        let scope = self.current_scope().unwrap_or(BUILTIN_SCOPE);
        if let Some(existing) = self.scopes[scope].symbols.get(&sym.name) {
            for &other_id in existing {
                let other = &self.symbols[other_id];
                if other.conditional || sym.conditional {
                    continue;
                }
                if other.kind == SymbolKind::Function && sym.kind == SymbolKind::Function {
                    if other.params != sym.params || other.prototype || sym.prototype {
                        continue;
                    }
                    return Err(format!("redefinition of function '{}'", sym.signature()));
                }
                if other.kind == SymbolKind::Macro && sym.kind == SymbolKind::Macro {
                    return Err(format!("macro '{}' redefined", sym.name));
                }
                return Err(format!("redeclaration of '{}'", sym.name));
            }
        }
        Ok(self.add(sym))
    }

    /// Innermost symbol named `name` satisfying `filter`, walking parent scopes.
    pub fn lookup_where(
        &self,
        name: &str,
        filter: impl Fn(&Symbol) -> bool,
    ) -> Option<SymbolId> {
        let mut scope = self.current_scope();
        while let Some(s) = scope {
            if let Some(ids) = self.scopes[s].symbols.get(name) {
                if let Some(&id) = ids.iter().rev().find(|&&id| filter(&self.symbols[id])) {
                    return Some(id);
                }
            }
            scope = self.scopes[s].parent;
        }
        None
    }

    /// Variable or object-like macro visible under `name`.
    pub fn lookup_value(&self, name: &str) -> Option<SymbolId> {
        self.lookup_where(name, |s| matches!(s.kind, SymbolKind::Var | SymbolKind::Macro))
    }

    pub fn lookup_struct(&self, name: &str) -> Option<SymbolId> {
        self.lookup_where(name, |s| s.kind == SymbolKind::Struct)
    }

    /// Every function overload visible under `name`, innermost scope first.
    pub fn functions(&self, name: &str) -> Vec<SymbolId> {
        let mut out = Vec::new();
        let mut scope = self.current_scope();
        while let Some(s) = scope {
            if let Some(ids) = self.scopes[s].symbols.get(name) {
                out.extend(
                    ids.iter()
                        .rev()
                        .copied()
                        .filter(|&id| self.symbols[id].kind == SymbolKind::Function),
                );
            }
            scope = self.scopes[s].parent;
        }
        out
    }

    /// Overload whose parameters match `args` by arity and position; `Any` matches anything.
    /// A definition is preferred over a prototype with the same signature.
    pub fn resolve_function(&self, name: &str, args: &[Type]) -> Option<SymbolId> {
        let candidates = self.functions(name);
        let matching = |id: &SymbolId| {
            let f = &self.symbols[*id];
            f.params.len() == args.len()
                && f.params.iter().zip(args).all(|(p, a)| p.compatible(a))
        };
        candidates
            .iter()
            .copied()
            .filter(matching)
            .find(|&id| !self.symbols[id].prototype)
            .or_else(|| candidates.iter().copied().find(matching))
    }

    /// Symbols declared directly in the global scope under `name`, in declaration order.
    pub fn globals_named(&self, name: &str) -> &[SymbolId] {
        self.scopes
            .get(GLOBAL_SCOPE)
            .and_then(|s| s.symbols.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Global lookup that keeps working after every scope was popped.
    pub fn lookup_global(&self, name: &str, kind: SymbolKind) -> Option<SymbolId> {
        self.globals_named(name)
            .iter()
            .rev()
            .copied()
            .find(|&id| self.symbols[id].kind == kind)
    }

    pub fn is_global(&self, id: SymbolId) -> bool {
        self.symbols[id].scope == GLOBAL_SCOPE
    }

    pub fn is_builtin(&self, id: SymbolId) -> bool {
        self.symbols[id].scope == BUILTIN_SCOPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, ty: Type) -> Symbol {
        Symbol::new(name, SymbolKind::Var, ty)
    }

    fn func(name: &str, params: Vec<Type>, ret: Type) -> Symbol {
        let mut s = Symbol::new(name, SymbolKind::Function, ret);
        s.params = params;
        s
    }

    #[test]
    fn inner_declaration_shadows_until_popped() {
        let mut t = SymbolTable::new();
        let outer = t.insert(var("x", Type::FLOAT)).unwrap();
        t.push_scope();
        let inner = t.insert(var("x", Type::vec(2))).unwrap();
        assert_eq!(t.lookup_value("x"), Some(inner));
        t.pop_scope();
        assert_eq!(t.lookup_value("x"), Some(outer));
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut t = SymbolTable::new();
        t.insert(var("x", Type::FLOAT)).unwrap();
        let err = t.insert(var("x", Type::INT)).unwrap_err();
        assert!(err.contains("redeclaration"));

        let mut conditional = var("x", Type::INT);
        conditional.conditional = true;
        assert!(t.insert(conditional).is_ok());
    }

    #[test]
    fn overloads_resolve_by_signature() {
        let mut t = SymbolTable::new();
        let f1 = t.insert(func("f", vec![Type::FLOAT], Type::FLOAT)).unwrap();
        let f2 = t.insert(func("f", vec![Type::vec(2)], Type::vec(2))).unwrap();
        assert_eq!(t.resolve_function("f", &[Type::FLOAT]), Some(f1));
        assert_eq!(t.resolve_function("f", &[Type::vec(2)]), Some(f2));
        assert_eq!(t.resolve_function("f", &[Type::vec(3)]), None);
        assert_eq!(t.resolve_function("f", &[Type::FLOAT, Type::FLOAT]), None);
        assert!(t.resolve_function("f", &[Type::Any]).is_some());
        assert!(t.insert(func("f", vec![Type::FLOAT], Type::FLOAT)).is_err());
    }

    #[test]
    fn prototype_then_definition_is_allowed() {
        let mut t = SymbolTable::new();
        let mut proto = func("g", vec![Type::INT], Type::Void);
        proto.prototype = true;
        let p = t.insert(proto).unwrap();
        let d = t.insert(func("g", vec![Type::INT], Type::Void)).unwrap();
        assert_ne!(p, d);
        assert_eq!(t.resolve_function("g", &[Type::INT]), Some(d));
    }

    #[test]
    fn builtins_and_globals_survive_pop_all() {
        let mut t = SymbolTable::new();
        let g = t.insert(var("u_time", Type::FLOAT)).unwrap();
        assert!(t.lookup_value("gl_Position").is_some_and(|id| t.is_builtin(id)));
        t.pop_all();
        assert_eq!(t.lookup_global("u_time", SymbolKind::Var), Some(g));
        assert!(t.is_global(g));
        assert_eq!(t.lookup_value("u_time"), None);
    }
}
