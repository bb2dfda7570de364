// src/codegen/mod.rs
// Two-stage GLSL generation from an analyzed pass body.

pub mod profile;
mod stage;
pub mod writer;

use std::collections::BTreeSet;

use hashbrown::HashMap;
use profile::{Profile, Stage};
use serde::{Deserialize, Serialize};
use stage::StageGen;
use writer::{Piece, render};

use crate::{
    ast::{Ast, Child, NodeId},
    config::{Backend, CompileOptions},
    diagnostics::{Diagnostic, SourceRange},
    semantic::{
        ShaderAnalysis,
        macros::BranchFrame,
        scope::{StructMember, SymbolId, SymbolKind, SymbolTable},
        types::Type,
    },
};

/// Generated sources of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPass {
    pub backend: Backend,
    pub vertex: String,
    pub fragment: String,
}

/// Part an author struct plays at a stage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Per-vertex inputs (vertex entry parameter).
    Attribute,
    /// Vertex outputs / fragment inputs (vertex entry return type).
    Varying,
    /// Color outputs (fragment entry return type).
    Output,
}

/// Entry points and the structs that cross stage boundaries.
#[derive(Debug, Default)]
pub struct Interface {
    pub vertex_entry: Option<SymbolId>,
    pub fragment_entry: Option<SymbolId>,
    pub attribute: Option<SymbolId>,
    pub varying: Option<SymbolId>,
    pub output: Option<SymbolId>,
    /// Primitive-typed entry parameters (`parameter_declaration` nodes).
    pub vertex_inputs: Vec<NodeId>,
    pub fragment_inputs: Vec<NodeId>,
    /// The fragment entry returns a `vec4` color.
    pub returns_color: bool,
}

impl Interface {
    pub fn role_of(&self, stage: Stage, symbols: &SymbolTable, name: &str) -> Option<(Role, SymbolId)> {
        let candidates = match stage {
            Stage::Vertex => [(Role::Attribute, self.attribute), (Role::Varying, self.varying)],
            Stage::Fragment => [(Role::Varying, self.varying), (Role::Output, self.output)],
        };
        candidates.into_iter().find_map(|(role, sid)| {
            let sid = sid?;
            (symbols.symbol(sid).name == name).then_some((role, sid))
        })
    }
}

fn entry_function(symbols: &SymbolTable, name: &str) -> Option<SymbolId> {
    symbols.globals_named(name).iter().copied().find(|&id| {
        let s = symbols.symbol(id);
        s.kind == SymbolKind::Function && !s.prototype
    })
}

fn is_primitive(ty: &Type) -> bool {
    matches!(ty, Type::Scalar(_) | Type::Vector(..) | Type::Matrix(_))
}

/// Resolves both entry points and classifies their signatures.
pub fn resolve_interface(analysis: &ShaderAnalysis, options: &CompileOptions) -> (Interface, Vec<Diagnostic>) {
    let (ast, symbols) = (&analysis.ast, &analysis.symbols);
    let mut iface = Interface::default();
    let mut diags = Vec::new();
    let root_range = ast.root().map(|r| ast.node(r).range).unwrap_or_default();

    iface.vertex_entry = entry_function(symbols, &options.vertex_entry);
    iface.fragment_entry = entry_function(symbols, &options.fragment_entry);
    for (stage, name, found) in [
        (Stage::Vertex, &options.vertex_entry, iface.vertex_entry),
        (Stage::Fragment, &options.fragment_entry, iface.fragment_entry),
    ] {
        if found.is_none() {
            diags.push(Diagnostic::error(
                root_range,
                format!("{} entry '{name}' not found", stage.name()),
            ));
        }
    }
    let (Some(vert), Some(frag)) = (iface.vertex_entry, iface.fragment_entry) else {
        return (iface, diags);
    };

    // ---- vertex ----
    let vsym = symbols.symbol(vert);
    let vproto = vsym.node.and_then(|n| ast.definition_prototype(n));
    let vrange = vproto.map(|p| ast.node(p).range).unwrap_or(root_range);
    match &vsym.ty {
        Type::Struct(name) => iface.varying = symbols.lookup_global(name, SymbolKind::Struct),
        Type::Void => {}
        other => diags.push(Diagnostic::error(
            vrange,
            format!("vertex entry '{}' must return a struct or void, found '{other}'", vsym.name),
        )),
    }
    for p in vproto.map(|p| ast.prototype_parameters(p)).unwrap_or_default() {
        let ty = ast.ty(p);
        match ty {
            Type::Struct(name) => {
                let sid = symbols.lookup_global(name, SymbolKind::Struct);
                match iface.attribute {
                    None => iface.attribute = sid,
                    Some(prev) if Some(prev) == sid => {}
                    Some(_) => diags.push(Diagnostic::error(
                        ast.node(p).range,
                        format!("vertex entry '{}' takes more than one attribute struct", vsym.name),
                    )),
                }
            }
            Type::Void if ast.parameter_name(p).is_none() => {}
            t if is_primitive(t) => iface.vertex_inputs.push(p),
            other => diags.push(Diagnostic::error(
                ast.node(p).range,
                format!("invalid parameter of type '{other}' in vertex entry '{}'", vsym.name),
            )),
        }
    }

    // ---- fragment ----
    let fsym = symbols.symbol(frag);
    let fproto = fsym.node.and_then(|n| ast.definition_prototype(n));
    let frange = fproto.map(|p| ast.node(p).range).unwrap_or(root_range);
    match &fsym.ty {
        Type::Struct(name) => {
            iface.output = symbols.lookup_global(name, SymbolKind::Struct);
            if let Some(out) = iface.output {
                for m in &symbols.symbol(out).members {
                    if m.ty != Type::vec(4) {
                        diags.push(Diagnostic::error(
                            ast.node(m.node).range,
                            format!("output member '{}' must be a vec4, found '{}'", m.name, m.ty),
                        ));
                    }
                }
            }
        }
        Type::Void => {}
        t if *t == Type::vec(4) => iface.returns_color = true,
        other => diags.push(Diagnostic::error(
            frange,
            format!(
                "fragment entry '{}' must return void, vec4 or a struct, found '{other}'",
                fsym.name
            ),
        )),
    }
    let varying_name = iface.varying.map(|v| symbols.symbol(v).name.clone());
    for p in fproto.map(|p| ast.prototype_parameters(p)).unwrap_or_default() {
        match ast.ty(p) {
            Type::Struct(name) => {
                if varying_name.as_deref() != Some(name.as_str()) {
                    let expected = varying_name.as_deref().unwrap_or("void");
                    diags.push(Diagnostic::error(
                        ast.node(p).range,
                        format!("fragment input struct '{name}' differs from vertex output '{expected}'"),
                    ));
                }
            }
            Type::Void if ast.parameter_name(p).is_none() => {}
            t if is_primitive(t) => iface.fragment_inputs.push(p),
            other => diags.push(Diagnostic::error(
                ast.node(p).range,
                format!("invalid parameter of type '{other}' in fragment entry '{}'", fsym.name),
            )),
        }
    }

    (iface, diags)
}

/// Generates both stages. Output is `None` when an entry point is missing; callers
/// must also discard it when the diagnostics contain errors.
pub fn generate(analysis: &mut ShaderAnalysis, options: &CompileOptions) -> (Option<CompiledPass>, Vec<Diagnostic>) {
    let profile = options.backend.profile();
    let (iface, mut diags) = resolve_interface(analysis, options);
    analysis.shader_data.vertex_entry = iface.vertex_entry;
    analysis.shader_data.fragment_entry = iface.fragment_entry;
    let analysis = &*analysis;
    let symbols = &analysis.symbols;
    let entry_node = |sid: Option<SymbolId>| sid.and_then(|s| symbols.symbol(s).node);
    let (Some(vert_def), Some(frag_def)) = (entry_node(iface.vertex_entry), entry_node(iface.fragment_entry)) else {
        return (None, diags);
    };

    // Fragment first: its reads decide which varyings matter.
    let mut frag = StageGen::new(analysis, profile, &iface, Stage::Fragment);
    let frag_main = frag.generate_main(frag_def);
    let mut vert = StageGen::new(analysis, profile, &iface, Stage::Vertex);
    let vert_main = vert.generate_main(vert_def);

    let written = vert.used(Role::Varying);
    let read = frag.used(Role::Varying);
    if let Some(v) = iface.varying {
        for &i in written.difference(&read) {
            let m = &symbols.symbol(v).members[i];
            diags.push(Diagnostic::warning(
                analysis.ast.node(m.node).range,
                format!("varying '{}' is written by the vertex stage but never read", m.name),
            ));
        }
    }
    // The vertex stage declares what either side touches; the fragment only what it reads.
    let vert_varyings: BTreeSet<usize> = written.union(&read).copied().collect();
    diags.extend(check_flattened_names(analysis, &iface, &vert, &vert_varyings));
    diags.extend(check_flattened_names(analysis, &iface, &frag, &read));

    let vertex = assemble(analysis, profile, &iface, &vert, &vert_varyings, vert_main);
    let fragment = assemble(analysis, profile, &iface, &frag, &read, frag_main);
    diags.append(&mut vert.diagnostics);
    diags.append(&mut frag.diagnostics);

    log::debug!(
        "[codegen] {}: vertex {} bytes, fragment {} bytes",
        profile.backend(),
        vertex.len(),
        fragment.len()
    );
    let pass = CompiledPass {
        backend: profile.backend(),
        vertex,
        fragment,
    };
    (Some(pass), diags)
}

/// Flattened members and entry inputs all become globals of the stage, so their names
/// must be distinct.
fn check_flattened_names(
    analysis: &ShaderAnalysis,
    iface: &Interface,
    gen_: &StageGen<'_>,
    varyings: &BTreeSet<usize>,
) -> Vec<Diagnostic> {
    let (ast, symbols) = (&analysis.ast, &analysis.symbols);
    let stage = gen_.stage;
    let mut names: Vec<(String, String, SourceRange)> = Vec::new();
    let mut members = |sid: Option<SymbolId>, role: &str, used: &BTreeSet<usize>| {
        let Some(sid) = sid else { return };
        let sym = symbols.symbol(sid);
        let owner = format!("{role} struct '{}'", sym.name);
        for &i in used {
            let m = &sym.members[i];
            names.push((m.name.clone(), owner.clone(), ast.node(m.node).range));
        }
    };
    match stage {
        Stage::Vertex => {
            members(iface.attribute, "attribute", &gen_.used(Role::Attribute));
            members(iface.varying, "varying", varyings);
        }
        Stage::Fragment => {
            members(iface.varying, "varying", varyings);
            members(iface.output, "output", &gen_.used(Role::Output));
        }
    }
    let inputs = match stage {
        Stage::Vertex => &iface.vertex_inputs,
        Stage::Fragment => &iface.fragment_inputs,
    };
    for &p in inputs {
        if let Some(tok) = ast.parameter_name(p) {
            names.push((tok.lexeme.clone(), format!("{} entry parameter", stage.name()), tok.range));
        }
    }

    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut diags = Vec::new();
    for (name, owner, range) in &names {
        match seen.get(name.as_str()) {
            Some(prev) => diags.push(Diagnostic::error(
                *range,
                format!("flattened name '{name}' of {owner} collides with {prev}"),
            )),
            None => {
                seen.insert(name.as_str(), owner.as_str());
            }
        }
    }
    diags
}

fn member_declaration(profile: &dyn Profile, qualifier: &str, m: &StructMember, interpolate: bool) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if interpolate && profile.supports_interpolation() {
        parts.extend(m.interpolation.as_deref());
    }
    parts.push(qualifier);
    parts.extend(m.precision.as_deref());
    let elem = match &m.ty {
        Type::Array(e) => e.to_string(),
        t => t.to_string(),
    };
    let decl = format!("{} {elem} {};", parts.join(" "), m.declarator);
    BranchFrame::wrap(&m.frames, &decl)
}

fn input_declaration(ast: &Ast, qualifier: &str, param: NodeId) -> Option<String> {
    let name = ast.parameter_name(param)?;
    Some(format!("{qualifier} {} {};", ast.ty(param), name.lexeme))
}

/// Source text of a subtree, laid out by the writer.
fn plain(ast: &Ast, id: NodeId) -> String {
    fn collect(ast: &Ast, id: NodeId, out: &mut Vec<Piece>) {
        for c in &ast.node(id).children {
            match c {
                Child::Token(t) => out.push(Piece::token(t.lexeme.as_str())),
                Child::Node(n) => collect(ast, *n, out),
            }
        }
    }
    let mut out = Vec::new();
    collect(ast, id, &mut out);
    render(&out)
}

fn position(ast: &Ast, id: NodeId) -> usize {
    ast.node(id).range.start.index
}

fn assemble(
    analysis: &ShaderAnalysis,
    profile: &dyn Profile,
    iface: &Interface,
    gen_: &StageGen<'_>,
    varyings: &BTreeSet<usize>,
    main: String,
) -> String {
    let (ast, symbols, data) = (&analysis.ast, &analysis.symbols, &analysis.shader_data);
    let stage = gen_.stage;
    let mut lines: Vec<String> = vec![profile.version().to_string()];

    let mut extensions = gen_.extensions.clone();
    let outputs = gen_.used(Role::Output);
    if stage == Stage::Fragment && iface.output.is_some() {
        extensions.extend(profile.output_extension(outputs.len()));
    }
    if gen_.frag_data.is_some() {
        // A dynamic index may reach any draw buffer.
        let count = gen_.frag_data_size().unwrap_or(usize::MAX);
        extensions.extend(profile.output_extension(count));
    }
    lines.extend(extensions.iter().filter_map(|e| profile.extension_line(e)));
    lines.extend(profile.default_precision(stage).iter().map(|s| s.to_string()));
    lines.extend(data.precisions.iter().map(|&p| plain(ast, p)));

    if stage == Stage::Fragment {
        if gen_.frag_color {
            lines.extend(profile.frag_color_declaration().map(str::to_string));
        }
        if gen_.frag_data.is_some() {
            lines.extend(profile.frag_data_declaration(gen_.frag_data_size()));
        }
        if let Some(out) = iface.output {
            let members = &symbols.symbol(out).members;
            for &i in &outputs {
                if let Some(d) = profile.output_declaration(i, &members[i].name) {
                    lines.push(BranchFrame::wrap(&members[i].frames, &d));
                }
            }
        }
    }

    // Globals keep their source order; flattened members sit where they were declared.
    let mut units: Vec<(usize, String)> = Vec::new();
    units.extend(
        gen_.cache
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(&node, text)| (position(ast, node), text.clone())),
    );
    units.extend(data.global_macros.iter().filter_map(|&m| {
        let tok = ast.directive(m)?;
        Some((position(ast, m), tok.lexeme.trim().to_string()))
    }));
    if let (Stage::Vertex, Some(attr)) = (stage, iface.attribute) {
        let members = &symbols.symbol(attr).members;
        for i in gen_.used(Role::Attribute) {
            let m = &members[i];
            units.push((position(ast, m.node), member_declaration(profile, profile.attribute_qualifier(), m, false)));
        }
    }
    if let Some(v) = iface.varying {
        let members = &symbols.symbol(v).members;
        let qualifier = profile.varying_qualifier(stage);
        for &i in varyings {
            let m = &members[i];
            units.push((position(ast, m.node), member_declaration(profile, qualifier, m, true)));
        }
    }
    let (inputs, qualifier) = match stage {
        Stage::Vertex => (&iface.vertex_inputs, profile.attribute_qualifier()),
        Stage::Fragment => (&iface.fragment_inputs, profile.varying_qualifier(Stage::Fragment)),
    };
    for &p in inputs {
        if let Some(d) = input_declaration(ast, qualifier, p) {
            units.push((position(ast, p), d));
        }
    }
    units.sort();
    lines.extend(units.into_iter().map(|(_, text)| text));

    lines.push(main);
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
