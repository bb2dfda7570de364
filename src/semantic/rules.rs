// src/semantic/rules.rs
// One semantic hook per node kind: scopes, declarations, lookups and type inference.

use super::{
    FunctionContext, SemanticAnalyzer,
    builtins::resolve_builtin,
    macros::{MacroTracker, parse_define},
    scope::{StructMember, Symbol, SymbolId, SymbolKind, format_signature},
    types::Type,
};
use crate::{
    ast::{Callee, Child, NodeId},
    diagnostics::SourceRange,
    lexer::TokenKind,
    parser::grammar::NonTerminal as N,
};

impl SemanticAnalyzer {
    pub(super) fn analyze(&mut self, id: NodeId) {
        match self.ast.kind(id) {
            N::ScopeBrace | N::ForScopeStart => {
                self.symbols.push_scope();
            }
            N::ScopeEndBrace => {
                self.symbols.pop_scope();
            }
            N::ExtBuiltinTypeSpecifierNonarray => {
                let ty = self
                    .ast
                    .child_token(id, 0)
                    .and_then(|t| Type::from_keyword(t.kind))
                    .unwrap_or(Type::Any);
                self.set_ty(id, ty);
            }
            N::TypeSpecifierNonarray => self.type_specifier_nonarray(id),
            N::TypeSpecifier => self.type_specifier(id),
            N::FullySpecifiedType | N::ParameterTypeSpecifier => {
                if let Some(spec) = self.ast.find_child(id, N::TypeSpecifier) {
                    self.require_type(spec);
                }
                self.inherit_last(id);
            }
            N::ParameterDeclaration
            | N::Initializer
            | N::IntegerExpression
            | N::FunctionCall
            | N::FunctionIdentifier
            | N::Expression => self.inherit_last(id),
            N::FunctionHeader => self.function_header(id),
            N::ParameterDeclarator => self.parameter_declarator(id),
            N::FunctionPrototype => {
                let ret = self.child_ty(self.ast.prototype_header(id), 0);
                self.set_ty(id, ret);
            }
            N::FunctionDefinition => self.function_definition(id),
            N::GlobalDeclaration => self.global_declaration(id),
            N::PrecisionSpecifier => self.shader_data.precisions.push(id),
            N::StructDeclarator => {
                let frames = self.macros.frames().to_vec();
                self.ast.node_mut(id).frames = frames;
            }
            N::StructDeclaration => {
                if let Some(spec) = self.ast.find_child(id, N::TypeSpecifier) {
                    self.require_type(spec);
                }
            }
            N::StructSpecifier => self.struct_specifier(id),
            N::MacroDirective => self.macro_directive(id),
            N::SingleDeclaration | N::InitDeclaratorList => self.declaration(id),
            N::IntegerConstantExpression => self.set_ty(id, Type::INT),
            N::VariableIdentifier => self.variable_identifier(id),
            N::PrimaryExpression => self.primary_expression(id),
            N::PostfixExpression => self.postfix_expression(id),
            N::FunctionCallGeneric => self.function_call(id),
            N::UnaryExpression => self.unary_expression(id),
            N::MultiplicativeExpression
            | N::AdditiveExpression
            | N::ShiftExpression
            | N::RelationalExpression
            | N::EqualityExpression
            | N::AndExpression
            | N::ExclusiveOrExpression
            | N::InclusiveOrExpression
            | N::LogicalAndExpression
            | N::LogicalXorExpression
            | N::LogicalOrExpression => self.binary_expression(id),
            N::ConditionalExpression => self.conditional_expression(id),
            N::AssignmentExpression => self.assignment_expression(id),
            N::SelectionStatement => self.require_bool(self.ast.child_node(id, 2)),
            N::IterationStatement => self.iteration_statement(id),
            N::ForRestStatement => {
                let cond = self
                    .ast
                    .child_node(id, 0)
                    .filter(|&n| self.ast.kind(n) == N::Expression);
                if cond.is_some() {
                    self.require_bool(cond);
                }
            }
            N::JumpStatement => self.jump_statement(id),
            _ => {}
        }
    }

    // ---- helpers ----

    fn set_ty(&mut self, id: NodeId, ty: Type) {
        self.ast.node_mut(id).ty = ty;
    }

    fn child_ty(&self, id: Option<NodeId>, i: usize) -> Type {
        id.and_then(|id| self.ast.child_node(id, i))
            .map_or(Type::Any, |n| self.ast.ty(n).clone())
    }

    /// Copies the type of the last child node.
    fn inherit_last(&mut self, id: NodeId) {
        let ty = self
            .ast
            .child_nodes(id)
            .last()
            .map_or(Type::Any, |n| self.ast.ty(n).clone());
        self.set_ty(id, ty);
    }

    fn require_type(&mut self, spec: NodeId) {
        if self.ast.ty(spec).is_any() {
            let name = self.ast.text(spec);
            let range = self.ast.node(spec).range;
            self.report_error(range, format!("unknown type '{name}'"));
        }
    }

    fn require_bool(&mut self, cond: Option<NodeId>) {
        let Some(cond) = cond else { return };
        let ty = self.ast.ty(cond).clone();
        if !ty.is_bool_scalar() {
            let range = self.ast.node(cond).range;
            self.report_error(range, format!("condition must be a bool, found '{ty}'"));
        }
    }

    fn with_array(&self, base: Type, array: Option<NodeId>) -> Type {
        match array {
            Some(_) => Type::Array(Box::new(base)),
            None => base,
        }
    }

    fn insert_symbol(&mut self, mut sym: Symbol, range: SourceRange) -> Option<SymbolId> {
        sym.conditional = self.macros.in_branch();
        match self.symbols.insert(sym) {
            Ok(id) => Some(id),
            Err(msg) => {
                self.report_error(range, msg);
                None
            }
        }
    }

    // ---- types ----

    fn type_specifier_nonarray(&mut self, id: NodeId) {
        match self.ast.node(id).children.first() {
            Some(Child::Node(n)) => {
                let ty = self.ast.ty(*n).clone();
                self.set_ty(id, ty);
            }
            Some(Child::Token(t)) => {
                // Unknown names stay `Any`: the same node also spells function names.
                if let Some(sid) = self.symbols.lookup_struct(&t.lexeme) {
                    let ty = Type::Struct(t.lexeme.clone());
                    let node = self.ast.node_mut(id);
                    node.ty = ty;
                    node.symbol = Some(sid);
                }
            }
            None => {}
        }
    }

    fn type_specifier(&mut self, id: NodeId) {
        let base = self.child_ty(Some(id), 0);
        let array = self.ast.find_child(id, N::ArraySpecifier);
        let ty = self.with_array(base, array);
        self.set_ty(id, ty);
    }

    // ---- functions ----

    fn function_header(&mut self, id: NodeId) {
        let return_type = self.child_ty(Some(id), 0);
        let name = self
            .ast
            .header_name(id)
            .map(|t| t.lexeme.clone())
            .unwrap_or_default();
        self.set_ty(id, return_type.clone());
        self.symbols.push_scope();
        self.function = Some(FunctionContext { name, return_type });
    }

    fn parameter_declarator(&mut self, id: NodeId) {
        let Some(spec) = self.ast.child_node(id, 0) else { return };
        self.require_type(spec);
        let array = self.ast.find_child(id, N::ArraySpecifier);
        let ty = self.with_array(self.ast.ty(spec).clone(), array);
        self.set_ty(id, ty.clone());
        let Some(name) = self.ast.child_token(id, 1).cloned() else { return };
        let sym = Symbol::new(name.lexeme, SymbolKind::Var, ty).with_node(id);
        let sid = self.insert_symbol(sym, name.range);
        self.ast.node_mut(id).symbol = sid;
    }

    /// Name, return type and parameter types declared by a prototype. `f(void)` has no parameters.
    fn prototype_signature(&self, proto: NodeId) -> (String, Type, Vec<Type>) {
        let header = self.ast.prototype_header(proto);
        let name = header
            .and_then(|h| self.ast.header_name(h))
            .map(|t| t.lexeme.clone())
            .unwrap_or_default();
        let ret = self.ast.ty(proto).clone();
        let mut params: Vec<Type> = self
            .ast
            .prototype_parameters(proto)
            .into_iter()
            .map(|p| self.ast.ty(p).clone())
            .collect();
        if params == [Type::Void] {
            params.clear();
        }
        (name, ret, params)
    }

    fn declare_function(&mut self, proto: NodeId, owner: NodeId, prototype: bool) {
        self.symbols.pop_scope();
        self.function = None;
        let (name, ret, params) = self.prototype_signature(proto);
        let mut sym = Symbol::new(name, SymbolKind::Function, ret).with_node(owner);
        sym.params = params;
        sym.prototype = prototype;
        let range = self.ast.node(proto).range;
        let sid = self.insert_symbol(sym, range);
        self.ast.node_mut(owner).symbol = sid;
    }

    fn function_definition(&mut self, id: NodeId) {
        if let Some(proto) = self.ast.definition_prototype(id) {
            self.declare_function(proto, id, false);
        }
    }

    fn global_declaration(&mut self, id: NodeId) {
        let Some(first) = self.ast.child_node(id, 0) else { return };
        match self.ast.kind(first) {
            N::FunctionPrototype => self.declare_function(first, id, true),
            N::MacroDirective => self.shader_data.global_macros.push(first),
            _ => {}
        }
    }

    // ---- structs ----

    fn struct_specifier(&mut self, id: NodeId) {
        let Some(name) = self.ast.child_token(id, 1).cloned() else { return };
        let outer = self.macros.frames().to_vec();
        let mut members: Vec<StructMember> = Vec::new();

        for decl in self.ast.struct_declarations(id) {
            let Some(spec) = self.ast.find_child(decl, N::TypeSpecifier) else {
                continue; // directive
            };
            let base = self.ast.ty(spec).clone();
            let qualifiers = self.ast.qualifier_keywords(decl);
            let precision = qualifiers
                .iter()
                .find(|k| matches!(k, TokenKind::Highp | TokenKind::Mediump | TokenKind::Lowp))
                .map(|k| k.text().to_string());
            let interpolation = qualifiers
                .iter()
                .find(|k| matches!(k, TokenKind::Smooth | TokenKind::Flat))
                .map(|k| k.text().to_string());

            for d in self.ast.struct_declarators(decl) {
                let Some(member_name) = self.ast.child_token(d, 0).cloned() else { continue };
                let array = self.ast.find_child(d, N::ArraySpecifier);
                let declarator = match array {
                    Some(a) => {
                        let size = self
                            .ast
                            .child_node(a, 1)
                            .map(|n| self.ast.text(n))
                            .unwrap_or_default();
                        format!("{}[{size}]", member_name.lexeme)
                    }
                    None => member_name.lexeme.clone(),
                };
                let frames = MacroTracker::trim_outer(&self.ast.node(d).frames, &outer);
                let clash = members
                    .iter()
                    .any(|m| m.name == member_name.lexeme && m.frames.is_empty() && frames.is_empty());
                if clash {
                    self.report_error(
                        member_name.range,
                        format!("duplicate member '{}' in struct '{}'", member_name.lexeme, name.lexeme),
                    );
                    continue;
                }
                members.push(StructMember {
                    name: member_name.lexeme.clone(),
                    ty: self.with_array(base.clone(), array),
                    declarator,
                    precision: precision.clone(),
                    interpolation: interpolation.clone(),
                    node: d,
                    frames,
                });
            }
        }

        let mut sym = Symbol::new(name.lexeme.clone(), SymbolKind::Struct, Type::Struct(name.lexeme.clone()))
            .with_node(id);
        sym.members = members;
        let sid = self.insert_symbol(sym, name.range);
        let node = self.ast.node_mut(id);
        node.symbol = sid;
        node.ty = Type::Struct(name.lexeme);
    }

    // ---- directives ----

    fn macro_directive(&mut self, id: NodeId) {
        let Some(tok) = self.ast.directive(id).cloned() else { return };
        match tok.kind {
            k if k.opens_branch() => self.macros.open(&tok.lexeme),
            TokenKind::MacroElse | TokenKind::MacroElif => {
                if let Err(msg) = self.macros.alternate(&tok.lexeme) {
                    self.report_error(tok.range, msg);
                }
            }
            TokenKind::MacroEndif => {
                if let Err(msg) = self.macros.close() {
                    self.report_error(tok.range, msg);
                }
            }
            TokenKind::MacroDefine => {
                let Some(def) = parse_define(&tok.lexeme) else {
                    self.report_error(tok.range, "malformed #define");
                    return;
                };
                let mut sym = Symbol::new(def.name, SymbolKind::Macro, literal_type(&def.body))
                    .with_node(id);
                if let Some(params) = def.params {
                    sym.callable = true;
                    sym.params = vec![Type::Any; params.len()];
                    sym.ty = Type::Any;
                }
                sym.conditional = self.macros.in_branch();
                match self.symbols.insert(sym) {
                    Ok(sid) => self.ast.node_mut(id).symbol = Some(sid),
                    Err(msg) => self.report_warning(tok.range, msg),
                }
            }
            _ => {}
        }
    }

    // ---- declarations ----

    fn declaration(&mut self, id: NodeId) {
        let node = self.ast.node(id);
        if node.kind == N::InitDeclaratorList && node.children.len() == 1 {
            return;
        }
        let Some(fst) = self.ast.declaration_type(id) else { return };
        let base = self.ast.ty(fst).clone();
        let is_const = self.ast.qualifier_keywords(fst).contains(&TokenKind::Const);

        // Only the declarator introduced by this node; earlier ones were handled already.
        let Some(decl) = self.ast.declarators(id).pop() else { return };
        let (name, array, initializer) = (decl.name.clone(), decl.array, decl.initializer);
        let ty = self.with_array(base.clone(), array);

        if base == Type::Void {
            self.report_error(name.range, format!("variable '{}' declared void", name.lexeme));
        }
        match initializer {
            Some(init) => {
                let init_ty = self.ast.ty(init).clone();
                if !ty.compatible(&init_ty) {
                    let range = self.ast.node(init).range;
                    self.report_error(range, format!("cannot initialize '{ty}' with '{init_ty}'"));
                }
            }
            None if is_const => {
                self.report_error(
                    name.range,
                    format!("const variable '{}' requires an initializer", name.lexeme),
                );
            }
            None => {}
        }

        let sym = Symbol::new(name.lexeme, SymbolKind::Var, ty.clone()).with_node(id);
        let sid = self.insert_symbol(sym, name.range);
        let node = self.ast.node_mut(id);
        node.symbol = sid;
        node.ty = ty;
    }

    // ---- expressions ----

    fn variable_identifier(&mut self, id: NodeId) {
        let Some(tok) = self.ast.child_token(id, 0).cloned() else { return };
        match self.symbols.lookup_value(&tok.lexeme) {
            Some(sid) => {
                let ty = self.symbols.symbol(sid).ty.clone();
                let node = self.ast.node_mut(id);
                node.symbol = Some(sid);
                node.ty = ty;
            }
            None => self.report_error(tok.range, format!("undeclared identifier '{}'", tok.lexeme)),
        }
    }

    fn primary_expression(&mut self, id: NodeId) {
        let ty = match self.ast.node(id).children.as_slice() {
            [Child::Node(n)] => self.ast.ty(*n).clone(),
            [Child::Token(t)] => match t.kind {
                TokenKind::IntConstant => Type::INT,
                TokenKind::UintConstant => Type::UINT,
                TokenKind::FloatConstant => Type::FLOAT,
                TokenKind::True | TokenKind::False => Type::BOOL,
                _ => Type::Any,
            },
            [_, Child::Node(inner), _] => self.ast.ty(*inner).clone(),
            _ => Type::Any,
        };
        self.set_ty(id, ty);
    }

    fn postfix_expression(&mut self, id: NodeId) {
        let base = self.child_ty(Some(id), 0);
        let range = self.ast.node(id).range;
        let ty = match self.ast.child_token(id, 1).map(|t| t.kind) {
            None => base,
            Some(TokenKind::LeftBracket) => {
                let index_ty = self.child_ty(Some(id), 2);
                if !(index_ty.is_any() || index_ty == Type::INT || index_ty == Type::UINT) {
                    self.report_error(range, format!("array index must be an integer, found '{index_ty}'"));
                }
                match base.index() {
                    Some(t) => t,
                    None => {
                        self.report_error(range, format!("cannot index a value of type '{base}'"));
                        Type::Any
                    }
                }
            }
            Some(TokenKind::Dot) => {
                let field = self
                    .ast
                    .child_token(id, 2)
                    .map(|t| t.lexeme.clone())
                    .unwrap_or_default();
                self.field_access(&base, &field, range)
            }
            Some(op @ (TokenKind::IncOp | TokenKind::DecOp)) => match Type::unary(op.text(), &base) {
                Some(t) => t,
                None => {
                    self.report_error(range, format!("'{}' requires a numeric operand, found '{base}'", op.text()));
                    Type::Any
                }
            },
            Some(_) => Type::Any,
        };
        self.set_ty(id, ty);
    }

    fn field_access(&mut self, base: &Type, field: &str, range: SourceRange) -> Type {
        match base {
            Type::Any => Type::Any,
            Type::Struct(name) => {
                let member = self
                    .symbols
                    .lookup_struct(name)
                    .or_else(|| self.symbols.lookup_global(name, SymbolKind::Struct))
                    .and_then(|sid| self.symbols.symbol(sid).member(field).map(|(_, m)| m.ty.clone()));
                match member {
                    Some(t) => t,
                    None => {
                        self.report_error(range, format!("struct '{name}' has no member '{field}'"));
                        Type::Any
                    }
                }
            }
            Type::Vector(..) => match base.swizzle(field) {
                Some(t) => t,
                None => {
                    self.report_error(range, format!("invalid swizzle '.{field}' on '{base}'"));
                    Type::Any
                }
            },
            _ => {
                self.report_error(range, format!("type '{base}' has no field '{field}'"));
                Type::Any
            }
        }
    }

    fn function_call(&mut self, id: NodeId) {
        let args: Vec<Type> = self
            .ast
            .call_arguments(id)
            .into_iter()
            .map(|a| self.ast.ty(a).clone())
            .collect();
        let range = self.ast.node(id).range;
        let Some(callee) = self.ast.call_callee(id) else { return };

        let (ty, symbol) = match callee {
            Callee::Constructor(kind) => {
                let ty = Type::from_keyword(kind).unwrap_or(Type::Any);
                self.check_constructor(&ty, &args, range);
                (ty, None)
            }
            Callee::ArrayConstructor(spec) => {
                let ty = self.ast.ty(spec).clone();
                if let Some(elem) = ty.index() {
                    if let Some(bad) = args.iter().find(|a| !elem.compatible(a)) {
                        self.report_error(range, format!("array constructor of '{elem}' given '{bad}'"));
                    }
                }
                (ty, None)
            }
            Callee::Named(tok) => {
                let name = tok.lexeme.clone();
                self.resolve_named_call(&name, &args, range)
            }
        };
        let node = self.ast.node_mut(id);
        node.ty = ty;
        node.symbol = symbol;
    }

    fn resolve_named_call(
        &mut self,
        name: &str,
        args: &[Type],
        range: SourceRange,
    ) -> (Type, Option<SymbolId>) {
        if let Some(sid) = self.symbols.lookup_struct(name) {
            let members: Vec<Type> = self.symbols.symbol(sid).members.iter().map(|m| m.ty.clone()).collect();
            let ok = members.len() == args.len() && members.iter().zip(args).all(|(m, a)| m.compatible(a));
            if !ok {
                self.report_error(
                    range,
                    format!("no matching constructor for '{}'", format_signature(name, args)),
                );
            }
            return (Type::Struct(name.to_string()), Some(sid));
        }

        let overloads = self.symbols.functions(name);
        if !overloads.is_empty() {
            if let Some(fid) = self.symbols.resolve_function(name, args) {
                return (self.symbols.symbol(fid).ty.clone(), Some(fid));
            }
            if let Ok(ty) = resolve_builtin(name, args) {
                return (ty, None);
            }
            self.report_error(
                range,
                format!("no matching overload for call to '{}'", format_signature(name, args)),
            );
            return (Type::Any, None);
        }

        if let Some(mid) = self
            .symbols
            .lookup_where(name, |s| s.kind == SymbolKind::Macro && s.callable)
        {
            let arity = self.symbols.symbol(mid).params.len();
            if arity != args.len() {
                self.report_error(
                    range,
                    format!("macro '{name}' expects {arity} arguments, {} given", args.len()),
                );
            }
            return (Type::Any, Some(mid));
        }

        match resolve_builtin(name, args) {
            Ok(ty) => (ty, None),
            Err(true) => {
                self.report_error(
                    range,
                    format!("no matching overload for built-in '{}'", format_signature(name, args)),
                );
                (Type::Any, None)
            }
            Err(false) => {
                self.report_error(range, format!("undeclared function '{name}'"));
                (Type::Any, None)
            }
        }
    }

    fn check_constructor(&mut self, ty: &Type, args: &[Type], range: SourceRange) {
        if args.is_empty() {
            self.report_error(range, format!("constructor '{ty}' requires arguments"));
            return;
        }
        if let Some(bad) = args.iter().find(|a| !a.is_any() && a.component_count().is_none()) {
            self.report_error(range, format!("cannot construct '{ty}' from '{bad}'"));
            return;
        }
        let (Some(need), Some(counts)) = (
            ty.component_count(),
            args.iter().map(Type::component_count).collect::<Option<Vec<u8>>>(),
        ) else {
            return;
        };
        // A single scalar splats; a single matrix converts to any matrix.
        if args.len() == 1 && (counts[0] == 1 || matches!((ty, &args[0]), (Type::Matrix(_), Type::Matrix(_)))) {
            return;
        }
        let total: u32 = counts.iter().map(|&c| c as u32).sum();
        let last = *counts.last().unwrap_or(&0) as u32;
        if total < need as u32 {
            self.report_error(range, format!("not enough data provided for constructor '{ty}'"));
        } else if total - last >= need as u32 {
            self.report_error(range, format!("too many arguments to constructor '{ty}'"));
        }
    }

    fn unary_expression(&mut self, id: NodeId) {
        let (op, operand) = match self.ast.node(id).children.as_slice() {
            [Child::Node(n)] => {
                let ty = self.ast.ty(*n).clone();
                self.set_ty(id, ty);
                return;
            }
            [Child::Token(t), Child::Node(n)] => (t.lexeme.clone(), *n),
            [Child::Node(op), Child::Node(n)] => {
                let op = self.ast.child_token(*op, 0).map(|t| t.lexeme.clone()).unwrap_or_default();
                (op, *n)
            }
            _ => return,
        };
        let operand_ty = self.ast.ty(operand).clone();
        let ty = match Type::unary(&op, &operand_ty) {
            Some(t) => t,
            None => {
                let range = self.ast.node(id).range;
                self.report_error(range, format!("cannot apply unary '{op}' to '{operand_ty}'"));
                Type::Any
            }
        };
        self.set_ty(id, ty);
    }

    fn binary_expression(&mut self, id: NodeId) {
        let [Child::Node(l), Child::Token(op), Child::Node(r)] = self.ast.node(id).children.as_slice() else {
            self.inherit_last(id);
            return;
        };
        let (lhs, rhs) = (self.ast.ty(*l).clone(), self.ast.ty(*r).clone());
        let op = op.lexeme.clone();
        let ty = match Type::binary(&op, &lhs, &rhs) {
            Some(t) => t,
            None => {
                let range = self.ast.node(id).range;
                self.report_error(range, format!("cannot apply operator '{op}' to '{lhs}' and '{rhs}'"));
                Type::Any
            }
        };
        self.set_ty(id, ty);
    }

    fn conditional_expression(&mut self, id: NodeId) {
        if self.ast.child_count(id) == 1 {
            self.inherit_last(id);
            return;
        }
        self.require_bool(self.ast.child_node(id, 0));
        let then_ty = self.child_ty(Some(id), 2);
        let else_ty = self.child_ty(Some(id), 4);
        let ty = if !then_ty.compatible(&else_ty) {
            let range = self.ast.node(id).range;
            self.report_error(range, format!("ternary branches differ: '{then_ty}' and '{else_ty}'"));
            Type::Any
        } else if then_ty.is_any() {
            else_ty
        } else {
            then_ty
        };
        self.set_ty(id, ty);
    }

    fn assignment_expression(&mut self, id: NodeId) {
        if self.ast.child_count(id) == 1 {
            self.inherit_last(id);
            return;
        }
        let lhs = self.child_ty(Some(id), 0);
        let rhs = self.child_ty(Some(id), 2);
        let op = self
            .ast
            .child_node(id, 1)
            .and_then(|n| self.ast.child_token(n, 0))
            .map(|t| t.lexeme.clone())
            .unwrap_or_default();
        let ok = if op == "=" {
            lhs.compatible(&rhs)
        } else {
            let arith = op.trim_end_matches('=');
            Type::binary(arith, &lhs, &rhs).is_some_and(|t| lhs.compatible(&t))
        };
        if !ok {
            let range = self.ast.node(id).range;
            self.report_error(range, format!("cannot assign '{rhs}' to '{lhs}' with '{op}'"));
        }
        self.set_ty(id, lhs);
    }

    // ---- statements ----

    fn iteration_statement(&mut self, id: NodeId) {
        match self.ast.child_token(id, 0).map(|t| t.kind) {
            Some(TokenKind::While) => self.require_bool(self.ast.child_node(id, 2)),
            Some(TokenKind::Do) => self.require_bool(self.ast.child_node(id, 4)),
            _ => {
                // for: closes the scope opened by `for (`
                self.symbols.pop_scope();
            }
        }
    }

    fn jump_statement(&mut self, id: NodeId) {
        if self.ast.child_token(id, 0).map(|t| t.kind) != Some(TokenKind::Return) {
            return;
        }
        let Some(FunctionContext { name, return_type }) = self.function.clone() else { return };
        let range = self.ast.node(id).range;
        match self.ast.child_node(id, 1) {
            Some(value) => {
                let ty = self.ast.ty(value).clone();
                if return_type == Type::Void {
                    self.report_error(range, format!("void function '{name}' cannot return a value"));
                } else if !return_type.compatible(&ty) {
                    self.report_error(
                        range,
                        format!("function '{name}' returns '{return_type}', found '{ty}'"),
                    );
                }
            }
            None if !matches!(return_type, Type::Void | Type::Any) => {
                self.report_error(range, format!("function '{name}' must return a '{return_type}'"));
            }
            None => {}
        }
    }
}

/// Type of an object-like macro body when it is a plain literal.
fn literal_type(body: &str) -> Type {
    let body = body.trim();
    if body == "true" || body == "false" {
        return Type::BOOL;
    }
    if let Some(digits) = body.strip_suffix(['u', 'U']) {
        if digits.parse::<u64>().is_ok() {
            return Type::UINT;
        }
    }
    if body.parse::<i64>().is_ok() {
        return Type::INT;
    }
    let float_body = body.strip_suffix(['f', 'F']).unwrap_or(body);
    if float_body.parse::<f64>().is_ok() && float_body.contains(['.', 'e', 'E']) {
        return Type::FLOAT;
    }
    Type::Any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analyze, diagnostics::Severity, semantic::ShaderAnalysis};

    fn analyzed(src: &str) -> ShaderAnalysis {
        analyze(src).expect("source should parse")
    }

    fn error_messages(src: &str) -> Vec<String> {
        analyzed(src)
            .errors()
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn clean_program_has_no_diagnostics() {
        let a = analyzed(
            "uniform sampler2D tex;\n\
             struct V { vec2 uv; vec4 color; };\n\
             vec4 shade(vec2 uv) { return texture2D(tex, uv) * 2.0; }\n\
             void frag(V v) { gl_FragColor = shade(v.uv) + v.color; }\n",
        );
        assert!(a.diagnostics.is_empty(), "{:?}", a.diagnostics);
    }

    #[test]
    fn undeclared_identifier_is_reported_once() {
        let errs = error_messages("void f() { float a = b + 1.0; }");
        assert_eq!(errs, vec!["undeclared identifier 'b'".to_string()]);
    }

    #[test]
    fn redeclaration_in_same_scope() {
        let errs = error_messages("void f() { float a; int a; }");
        assert!(errs.iter().any(|e| e.contains("redeclaration of 'a'")), "{errs:?}");
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let a = analyzed("void f() { float a = 1.0; { vec2 a = vec2(1.0); a.x = 2.0; } a = 3.0; }");
        assert!(a.diagnostics.is_empty(), "{:?}", a.diagnostics);
    }

    #[test]
    fn overloads_and_mismatch() {
        let src = "float g(float x) { return x; }\n\
                   vec2 g(vec2 x) { return x; }\n\
                   void f() { float a = g(1.0); vec2 b = g(vec2(1.0)); g(vec3(1.0)); }";
        let errs = error_messages(src);
        assert_eq!(errs.len(), 1, "{errs:?}");
        assert!(errs[0].contains("no matching overload for call to 'g(vec3)'"));
    }

    #[test]
    fn type_errors_are_accumulated() {
        let errs = error_messages(
            "void f() { vec3 a = vec2(1.0); float b = true; if (b) { } a.q = 1.0; }",
        );
        assert_eq!(errs.len(), 4, "{errs:?}");
        assert!(errs[0].contains("cannot initialize 'vec3' with 'vec2'"));
        assert!(errs[1].contains("cannot initialize 'float' with 'bool'"));
        assert!(errs[2].contains("condition must be a bool"));
        assert!(errs[3].contains("invalid swizzle"));
    }

    #[test]
    fn any_does_not_cascade() {
        let errs = error_messages(
            "void f() { vec3 a = missing * 2.0; mat2 m = 0.5 * missing; float l = length(missing); }",
        );
        assert_eq!(errs, vec!["undeclared identifier 'missing'"; 3]);
    }

    #[test]
    fn return_types_are_checked() {
        let errs = error_messages("float f() { return vec2(0.0); }\nvoid g() { return 1.0; }");
        assert_eq!(errs.len(), 2, "{errs:?}");
    }

    #[test]
    fn conditional_members_keep_their_frames() {
        let a = analyzed(
            "struct V {\n vec2 uv;\n#ifdef USE_FOG\n float fog;\n#else\n float depth;\n#endif\n};\n",
        );
        assert!(a.diagnostics.is_empty(), "{:?}", a.diagnostics);
        let sid = a.symbols.lookup_global("V", SymbolKind::Struct).unwrap();
        let members = &a.symbols.symbol(sid).members;
        assert_eq!(members.len(), 3);
        assert!(members[0].frames.is_empty());
        assert_eq!(members[1].frames[0].lines, vec!["#ifdef USE_FOG"]);
        assert_eq!(members[2].frames[0].lines, vec!["#ifdef USE_FOG", "#else"]);
    }

    #[test]
    fn conditional_redeclaration_is_allowed() {
        let a = analyzed(
            "#ifdef HIGH\nuniform vec4 tint;\n#else\nuniform vec4 tint;\n#endif\nvoid f() { vec4 t = tint; }",
        );
        assert!(a.diagnostics.is_empty(), "{:?}", a.diagnostics);
    }

    #[test]
    fn unbalanced_directives() {
        let errs = error_messages("#endif\nvoid f() { }");
        assert!(errs[0].contains("without matching #if"));
        let errs = error_messages("#ifdef A\nvoid f() { }");
        assert!(errs[0].contains("unterminated conditional directive '#ifdef A'"));
    }

    #[test]
    fn macros_resolve_as_values_and_calls() {
        let a = analyzed(
            "#define SCALE 2.0\n#define SQR(x) ((x)*(x))\nvoid f() { float a = SCALE; float b = SQR(a); }",
        );
        assert!(a.diagnostics.is_empty(), "{:?}", a.diagnostics);
    }

    #[test]
    fn macro_redefinition_is_only_a_warning() {
        let a = analyzed("#define SCALE 2.0\n#define SCALE 3.0\nvoid f() { float a = SCALE; }");
        assert_eq!(a.errors().count(), 0);
        let warnings: Vec<(Severity, &str)> =
            a.diagnostics.iter().map(|d| (d.severity, d.message.as_str())).collect();
        assert_eq!(warnings, [(Severity::Warning, "macro 'SCALE' redefined")]);
    }

    #[test]
    fn prototype_then_definition() {
        let a = analyzed("float h(float x);\nvoid f() { float y = h(1.0); }\nfloat h(float x) { return x; }");
        assert!(a.diagnostics.is_empty(), "{:?}", a.diagnostics);
    }

    #[test]
    fn for_loop_scope_closes() {
        let errs = error_messages("void f() { for (int i = 0; i < 4; i++) { } int j = i; }");
        assert_eq!(errs, vec!["undeclared identifier 'i'".to_string()]);
    }

    #[test]
    fn literal_types() {
        assert_eq!(literal_type("3"), Type::INT);
        assert_eq!(literal_type("3u"), Type::UINT);
        assert_eq!(literal_type("2.5"), Type::FLOAT);
        assert_eq!(literal_type("1e3f"), Type::FLOAT);
        assert_eq!(literal_type("a+b"), Type::Any);
        assert_eq!(literal_type(""), Type::Any);
    }
}
