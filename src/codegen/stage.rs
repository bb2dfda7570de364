// src/codegen/stage.rs
// Per-stage visitor: rewrites the entry body into `main`, flattens interface structs
// and collects every global the stage references.

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};

use super::{
    Interface, Role,
    profile::{Profile, Stage},
    writer::{Piece, render},
};
use crate::{
    ast::{Ast, Callee, Child, NodeId},
    diagnostics::{Diagnostic, SourceRange},
    lexer::{Token, TokenKind},
    parser::grammar::NonTerminal as N,
    semantic::{
        ShaderAnalysis,
        scope::{SymbolId, SymbolKind, SymbolTable},
        types::Type,
    },
};

const VERTEX_ONLY: &[&str] = &["gl_Position", "gl_PointSize", "gl_VertexID", "gl_InstanceID"];
const FRAGMENT_ONLY: &[&str] = &[
    "gl_FragCoord",
    "gl_FrontFacing",
    "gl_PointCoord",
    "gl_FragColor",
    "gl_FragData",
    "gl_FragDepth",
    "gl_FragDepthEXT",
];

pub(super) struct StageGen<'a> {
    ast: &'a Ast,
    symbols: &'a SymbolTable,
    profile: &'static dyn Profile,
    iface: &'a Interface,
    pub stage: Stage,
    /// Rendered text of every referenced `global_declaration`, keyed by node.
    pub cache: HashMap<NodeId, String>,
    pending: Vec<NodeId>,
    queued: HashSet<NodeId>,
    in_entry: bool,
    pub extensions: BTreeSet<&'static str>,
    /// Member indices referenced per interface role.
    pub used: HashMap<Role, BTreeSet<usize>>,
    /// The single color output is written.
    pub frag_color: bool,
    /// First use of `gl_FragData`.
    pub frag_data: Option<SourceRange>,
    /// One past the highest literal `gl_FragData` index.
    frag_data_len: usize,
    frag_data_dynamic: bool,
    reported: HashSet<(SymbolId, &'static str)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> StageGen<'a> {
    pub fn new(
        analysis: &'a ShaderAnalysis,
        profile: &'static dyn Profile,
        iface: &'a Interface,
        stage: Stage,
    ) -> Self {
        Self {
            ast: &analysis.ast,
            symbols: &analysis.symbols,
            profile,
            iface,
            stage,
            cache: HashMap::new(),
            pending: Vec::new(),
            queued: HashSet::new(),
            in_entry: false,
            extensions: BTreeSet::new(),
            used: HashMap::new(),
            frag_color: false,
            frag_data: None,
            frag_data_len: 0,
            frag_data_dynamic: false,
            reported: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    fn error(&mut self, range: SourceRange, message: String) {
        log::debug!("[codegen:{}] {message}", self.stage.name());
        self.diagnostics.push(Diagnostic::error(range, message));
    }

    /// Reports once per symbol and kind of problem.
    fn error_once(&mut self, sid: SymbolId, what: &'static str, range: SourceRange, message: String) {
        if self.reported.insert((sid, what)) {
            self.error(range, message);
        }
    }

    pub fn used(&self, role: Role) -> BTreeSet<usize> {
        self.used.get(&role).cloned().unwrap_or_default()
    }

    /// Slots `gl_FragData` needs; `None` when some index is not a literal.
    pub fn frag_data_size(&self) -> Option<usize> {
        (!self.frag_data_dynamic && self.frag_data_len > 0).then_some(self.frag_data_len)
    }

    // ---- driver ----

    /// `void main() { <entry body> }`, then every global reachable from it.
    pub fn generate_main(&mut self, entry: NodeId) -> String {
        let ast = self.ast;
        let mut out: Vec<Piece> = ["void", "main", "(", ")", "{"].into_iter().map(Piece::token).collect();
        self.in_entry = true;
        if let Some(list) = ast
            .definition_body(entry)
            .and_then(|b| ast.find_child(b, N::StatementList))
        {
            self.emit(list, &mut out);
        }
        self.in_entry = false;
        out.push(Piece::token("}"));
        let main = render(&out);
        self.drain_globals();
        if self.stage == Stage::Fragment {
            self.check_color_outputs();
        }
        main
    }

    /// `gl_FragData` excludes every other way of writing colors.
    fn check_color_outputs(&mut self) {
        let Some(range) = self.frag_data else { return };
        if self.iface.returns_color {
            self.error(range, "gl_FragData cannot be used when the fragment entry returns a vec4".into());
        } else if self.frag_color {
            self.error(range, "gl_FragData cannot be used together with gl_FragColor".into());
        }
        if let Some(output) = self.iface.output {
            let symbols = self.symbols;
            let sname = &symbols.symbol(output).name;
            self.error(range, format!("gl_FragData cannot be used together with output struct '{sname}'"));
        }
    }

    fn is_frag_data(&self, expr: NodeId) -> bool {
        let var = self.ast.unwrap_chain(expr);
        self.ast.kind(var) == N::VariableIdentifier
            && self.ast.node(var).symbol.is_some_and(|sid| {
                self.symbols.is_builtin(sid) && self.symbols.symbol(sid).name == "gl_FragData"
            })
    }

    fn note_frag_data_index(&mut self, index: NodeId) {
        let lit = self.ast.unwrap_chain(index);
        let slot = match self.ast.node(lit).children.as_slice() {
            [Child::Token(t)] if t.kind == TokenKind::IntConstant => t.lexeme.parse::<usize>().ok(),
            _ => None,
        };
        match slot {
            Some(i) => self.frag_data_len = self.frag_data_len.max(i + 1),
            None => self.frag_data_dynamic = true,
        }
    }

    fn drain_globals(&mut self) {
        while let Some(unit) = self.pending.pop() {
            let mut out = Vec::new();
            self.global_unit(unit, &mut out);
            let text = render(&out);
            self.cache.insert(unit, text);
        }
    }

    /// Queues the global declaration that owns `node`.
    fn enqueue(&mut self, node: NodeId) {
        let Some(unit) = self.ast.ancestor(node, N::GlobalDeclaration) else {
            return;
        };
        if self.queued.insert(unit) {
            self.pending.push(unit);
        }
    }

    /// Queues a global symbol together with conditional alternates of the same name
    /// and, for functions, prototypes with the same signature.
    fn enqueue_symbol(&mut self, sid: SymbolId) {
        let symbols = self.symbols;
        let sym = symbols.symbol(sid);
        let mut nodes = Vec::new();
        for &other in symbols.globals_named(&sym.name) {
            let o = symbols.symbol(other);
            if o.kind != sym.kind {
                continue;
            }
            let same_signature = o.kind != SymbolKind::Function || o.params == sym.params;
            let include = other == sid
                || (same_signature && (o.conditional || sym.conditional))
                || (o.kind == SymbolKind::Function && same_signature && o.prototype);
            if include {
                nodes.extend(o.node);
            }
        }
        for n in nodes {
            self.enqueue(n);
        }
    }

    /// Interface role of a struct type in this stage.
    fn special(&self, ty: &Type) -> Option<(Role, SymbolId)> {
        let name = ty.struct_name()?;
        self.iface.role_of(self.stage, self.symbols, name)
    }

    // ---- globals ----

    fn global_unit(&mut self, unit: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        let Some(first) = ast.child_node(unit, 0) else { return };
        match ast.kind(first) {
            N::FunctionDefinition => self.function_definition(first, out),
            N::FunctionPrototype => {
                self.prototype(first, out);
                out.push(Piece::token(";"));
            }
            N::Declaration => self.global_declaration(first, out),
            _ => self.emit(unit, out),
        }
    }

    fn global_declaration(&mut self, decl: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        let Some(list) = ast.child_node(decl, 0) else { return };
        let Some(fst) = ast.declaration_type(list) else { return };
        if self.special(ast.ty(fst)).is_some() {
            return;
        }
        let storage = ast.qualifier_keywords(fst).iter().any(|k| {
            matches!(
                k,
                TokenKind::Const | TokenKind::Uniform | TokenKind::In | TokenKind::Out | TokenKind::Inout
            )
        });
        let initialized = ast.declarators(list).iter().any(|d| d.initializer.is_some());
        if !storage && !initialized {
            out.push(Piece::token("uniform"));
        }
        self.emit_children(decl, out);
    }

    fn function_definition(&mut self, def: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        let Some(proto) = ast.definition_prototype(def) else { return };
        self.prototype(proto, out);
        if let Some(body) = ast.definition_body(def) {
            self.emit(body, out);
        }
    }

    /// Prototype with interface-struct parameters dropped.
    fn prototype(&mut self, proto: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        let Some(header) = ast.prototype_header(proto) else { return };
        if let Some(ret) = ast.header_return_type(header) {
            self.emit(ret, out);
        }
        if let Some(name) = ast.header_name(header) {
            out.push(Piece::token(name.lexeme.as_str()));
        }
        out.push(Piece::token("("));
        let mut first = true;
        for p in ast.prototype_parameters(proto) {
            if self.special(ast.ty(p)).is_some() {
                continue;
            }
            if !first {
                out.push(Piece::token(","));
            }
            first = false;
            self.emit(p, out);
        }
        out.push(Piece::token(")"));
    }

    // ---- visitor ----

    fn emit(&mut self, id: NodeId, out: &mut Vec<Piece>) {
        match self.ast.kind(id) {
            N::VariableIdentifier => self.variable(id, out),
            N::PostfixExpression => self.postfix(id, out),
            N::UnaryExpression => self.unary(id, out),
            N::FunctionCallGeneric => self.call(id, out),
            N::TypeSpecifierNonarray => self.type_name(id, out),
            N::Declaration => self.local_declaration(id, out),
            N::JumpStatement => self.jump(id, out),
            _ => self.emit_children(id, out),
        }
    }

    fn emit_children(&mut self, id: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        for c in &ast.node(id).children {
            match c {
                Child::Token(t) => self.token(t, out),
                Child::Node(n) => self.emit(*n, out),
            }
        }
    }

    fn token(&mut self, t: &Token, out: &mut Vec<Piece>) {
        match t.kind {
            TokenKind::FloatConstant => {
                out.push(Piece::token(self.profile.float_literal(&t.lexeme).into_owned()));
            }
            k if k.is_macro() => out.push(Piece::Directive(t.lexeme.clone())),
            _ => out.push(Piece::token(t.lexeme.as_str())),
        }
    }

    fn variable(&mut self, id: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        let Some(tok) = ast.child_token(id, 0) else { return };
        let Some(sid) = ast.node(id).symbol else {
            out.push(Piece::token(tok.lexeme.as_str()));
            return;
        };
        let symbols = self.symbols;
        let sym = symbols.symbol(sid);

        if symbols.is_builtin(sid) {
            let name = sym.name.as_str();
            let wrong_stage = match self.stage {
                Stage::Vertex => FRAGMENT_ONLY.contains(&name),
                Stage::Fragment => VERTEX_ONLY.contains(&name),
            };
            if wrong_stage {
                self.error(
                    tok.range,
                    format!("'{name}' is not available in the {} stage", self.stage.name()),
                );
            }
            if name == "gl_FragData" && self.stage == Stage::Fragment {
                self.frag_data.get_or_insert(tok.range);
            }
            if name == "gl_FragColor" && self.stage == Stage::Fragment {
                self.frag_color = true;
                if let Some(output) = self.iface.output {
                    let sname = symbols.symbol(output).name.clone();
                    self.error_once(
                        output,
                        "frag-color",
                        tok.range,
                        format!("gl_FragColor cannot be used together with output struct '{sname}'"),
                    );
                }
            }
            let spelling = self.profile.builtin_variable(name);
            self.extensions.extend(spelling.extension);
            out.push(Piece::token(spelling.name.into_owned()));
            return;
        }

        if symbols.is_global(sid) && sym.kind == SymbolKind::Var {
            self.enqueue_symbol(sid);
        }
        out.push(Piece::token(tok.lexeme.as_str()));
    }

    /// Flat name for `value.member` when `value` has an interface struct type.
    fn member_target(&mut self, base: NodeId, field: &str) -> Option<String> {
        let var = self.ast.unwrap_chain(base);
        if self.ast.kind(var) != N::VariableIdentifier {
            return None;
        }
        let (role, sid) = self.special(self.ast.ty(var))?;
        let symbols = self.symbols;
        let (index, member) = symbols.symbol(sid).member(field)?;
        let target = match role {
            Role::Attribute | Role::Varying => member.name.clone(),
            Role::Output => self.profile.output_target(index, &member.name),
        };
        self.used.entry(role).or_default().insert(index);
        Some(target)
    }

    fn postfix(&mut self, id: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        match ast.node(id).children.as_slice() {
            [Child::Node(base), Child::Token(dot), Child::Token(field)] if dot.kind == TokenKind::Dot => {
                match self.member_target(*base, &field.lexeme) {
                    Some(flat) => out.push(Piece::token(flat)),
                    None => self.emit_children(id, out),
                }
            }
            [Child::Node(base), Child::Token(op)] => {
                self.emit(*base, out);
                out.push(Piece::Suffix(op.lexeme.clone()));
            }
            [Child::Node(base), Child::Token(lb), Child::Node(index), Child::Token(_)]
                if lb.kind == TokenKind::LeftBracket && self.stage == Stage::Fragment && self.is_frag_data(*base) =>
            {
                self.note_frag_data_index(*index);
                self.emit_children(id, out);
            }
            _ => self.emit_children(id, out),
        }
    }

    fn unary(&mut self, id: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        match ast.node(id).children.as_slice() {
            [Child::Token(op), Child::Node(operand)] => {
                out.push(Piece::Prefix(op.lexeme.clone()));
                self.emit(*operand, out);
            }
            [Child::Node(op), Child::Node(operand)] => {
                if let Some(t) = ast.child_token(*op, 0) {
                    out.push(Piece::Prefix(t.lexeme.clone()));
                }
                self.emit(*operand, out);
            }
            _ => self.emit_children(id, out),
        }
    }

    fn type_name(&mut self, id: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        if let (Some(sid), Some(tok)) = (ast.node(id).symbol, ast.child_token(id, 0)) {
            if self.special(ast.ty(id)).is_none() {
                self.enqueue_symbol(sid);
            }
            out.push(Piece::token(tok.lexeme.as_str()));
            return;
        }
        self.emit_children(id, out);
    }

    fn call(&mut self, id: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        let Some(Callee::Named(name)) = ast.call_callee(id) else {
            self.emit_children(id, out);
            return;
        };
        let args = ast.call_arguments(id);

        let symbols = self.symbols;
        let spelled = match ast.node(id).symbol.map(|s| (s, symbols.symbol(s))) {
            Some((sid, f)) if f.kind == SymbolKind::Function => {
                if f.prototype {
                    let sig = f.signature();
                    self.error_once(
                        sid,
                        "undefined",
                        name.range,
                        format!("function '{sig}' is declared but never defined"),
                    );
                }
                if let Some((_, special)) = self.special(&f.ty) {
                    let sname = symbols.symbol(special).name.clone();
                    self.error_once(
                        sid,
                        "special-return",
                        name.range,
                        format!("function '{}' cannot return '{sname}' outside an entry point", f.name),
                    );
                }
                self.enqueue_symbol(sid);
                let kept: Vec<NodeId> = args
                    .iter()
                    .copied()
                    .filter(|&a| self.special(ast.ty(a)).is_none())
                    .collect();
                self.call_pieces(name.lexeme.clone(), &kept, out);
                return;
            }
            Some((sid, s)) if s.kind == SymbolKind::Struct => {
                if self.special(&s.ty).is_none() {
                    self.enqueue_symbol(sid);
                }
                name.lexeme.clone()
            }
            Some(_) => name.lexeme.clone(),
            None => {
                let sampler = args.first().map(|&a| ast.ty(a));
                let spelling = self.profile.builtin_call(&name.lexeme, sampler, self.stage);
                self.extensions.extend(spelling.extension);
                spelling.name.into_owned()
            }
        };
        self.call_pieces(spelled, &args, out);
    }

    fn call_pieces(&mut self, name: String, args: &[NodeId], out: &mut Vec<Piece>) {
        out.push(Piece::token(name));
        out.push(Piece::token("("));
        for (i, &a) in args.iter().enumerate() {
            if i > 0 {
                out.push(Piece::token(","));
            }
            self.emit(a, out);
        }
        out.push(Piece::token(")"));
    }

    /// `target = arg;` for each member when `init` constructs the interface struct.
    fn member_assignments(&mut self, role: Role, sid: SymbolId, init: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        let Some(call) = ast.as_call(init) else { return };
        if ast.node(call).symbol != Some(sid) {
            // Not the constructor: keep the call so its callee is still checked.
            self.emit(init, out);
            out.push(Piece::token(";"));
            return;
        }
        let symbols = self.symbols;
        let members = &symbols.symbol(sid).members;
        for (index, (member, arg)) in members.iter().zip(ast.call_arguments(call)).enumerate() {
            let target = match role {
                Role::Attribute | Role::Varying => member.name.clone(),
                Role::Output => self.profile.output_target(index, &member.name),
            };
            self.used.entry(role).or_default().insert(index);
            out.push(Piece::token(target));
            out.push(Piece::token("="));
            self.emit(arg, out);
            out.push(Piece::token(";"));
        }
    }

    /// Locals of an interface struct type vanish; a constructor initializer becomes
    /// member assignments.
    fn local_declaration(&mut self, id: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        let list = ast.child_node(id, 0);
        let special = list
            .and_then(|l| ast.declaration_type(l))
            .and_then(|fst| self.special(ast.ty(fst)));
        match (special, list) {
            (Some((role, sid)), Some(list)) => {
                for d in ast.declarators(list) {
                    if let Some(init) = d.initializer {
                        self.member_assignments(role, sid, init, out);
                    }
                }
            }
            _ => self.emit_children(id, out),
        }
    }

    fn jump(&mut self, id: NodeId, out: &mut Vec<Piece>) {
        let ast = self.ast;
        let is_return = ast.child_token(id, 0).is_some_and(|t| t.kind == TokenKind::Return);
        let value = ast.child_node(id, 1);
        let (true, true, Some(value)) = (self.in_entry, is_return, value) else {
            self.emit_children(id, out);
            return;
        };

        if let Some((role, sid)) = self.special(ast.ty(value)) {
            out.push(Piece::token("{"));
            self.member_assignments(role, sid, value, out);
            out.extend(["return", ";", "}"].map(Piece::token));
        } else if self.stage == Stage::Fragment && self.iface.returns_color {
            self.frag_color = true;
            let target = self.profile.builtin_variable("gl_FragColor").name.into_owned();
            out.extend([Piece::token("{"), Piece::token(target), Piece::token("=")]);
            self.emit(value, out);
            out.extend([";", "return", ";", "}"].map(Piece::token));
        } else {
            self.emit_children(id, out);
        }
    }
}
