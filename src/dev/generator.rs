// src/dev/generator.rs
// Random-but-valid pass bodies: every generated source should compile under both
// backends without a single diagnostic.

use std::fmt::Write as _;

use rand::Rng;

const VARYING_TYPES: &[(&str, &str)] = &[
    ("float", "position.x"),
    ("vec2", "position.xy"),
    ("vec3", "position.xyz"),
    ("vec4", "position"),
];

/// One float-typed varying read per member type (matches `VARYING_TYPES`).
const VARYING_READS: &[&str] = &["", ".x", ".y", ".z"];

struct Shape {
    uniforms: usize,
    helpers: usize,
    /// (type index, guarded by `#ifdef`)
    varyings: Vec<(usize, bool)>,
    statements: usize,
}

/// Builds a pass with `vert`/`frag` entry points. `size` scales the number of
/// uniforms, helpers, varyings and statements.
pub fn gen_valid_pass<R: Rng>(rng: &mut R, size: usize) -> String {
    let size = size.max(1);
    let shape = Shape {
        uniforms: rng.random_range(1..=size.min(8)),
        helpers: rng.random_range(0..=size.min(4)),
        varyings: (0..rng.random_range(1..=size.min(6)))
            .map(|_| (rng.random_range(0..VARYING_TYPES.len()), rng.random_bool(0.2)))
            .collect(),
        statements: rng.random_range(1..=size.min(10)),
    };

    let mut out = String::new();
    out.push_str("precision mediump float;\n\n");

    // ---- interface ----
    out.push_str("struct V {\n");
    for (i, &(t, guarded)) in shape.varyings.iter().enumerate() {
        let decl = format!("    {} v{i};\n", VARYING_TYPES[t].0);
        push_guarded(&mut out, i, guarded, &decl);
    }
    out.push_str("};\n\n");

    // ---- uniforms and helpers ----
    for u in 0..shape.uniforms {
        if rng.random_bool(0.5) {
            let _ = writeln!(out, "uniform float u{u};");
        } else {
            let _ = writeln!(out, "float u{u};");
        }
    }
    out.push_str("uniform vec4 tint;\n\n");
    for h in 0..shape.helpers {
        let body = float_expr(rng, &shape, h, false, 2);
        let _ = writeln!(out, "float h{h}(float x) {{\n    return x * {};\n}}\n", body);
    }

    // ---- vertex ----
    out.push_str("V vert(vec4 position) {\n    gl_Position = position;\n    V o;\n");
    for (i, &(t, guarded)) in shape.varyings.iter().enumerate() {
        let f = float_expr(rng, &shape, shape.helpers, true, 2);
        let stmt = match t {
            0 => format!("    o.v{i} = {f};\n"),
            _ => format!("    o.v{i} = {} * {f};\n", VARYING_TYPES[t].1),
        };
        push_guarded(&mut out, i, guarded, &stmt);
    }
    out.push_str("    return o;\n}\n\n");

    // ---- fragment ----
    out.push_str("void frag(V i) {\n    float acc = 0.0;\n");
    for (i, &(t, guarded)) in shape.varyings.iter().enumerate() {
        let stmt = format!("    acc = acc + i.v{i}{};\n", VARYING_READS[t]);
        push_guarded(&mut out, i, guarded, &stmt);
    }
    for _ in 0..shape.statements {
        let f = float_expr(rng, &shape, shape.helpers, false, 3);
        if rng.random_bool(0.3) {
            let _ = writeln!(out, "    if (acc > {}) {{\n        acc = acc - {f};\n    }}", literal(rng));
        } else {
            let _ = writeln!(out, "    acc = acc * {f};");
        }
    }
    out.push_str("    gl_FragColor = tint * acc;\n}\n");
    out
}

fn push_guarded(out: &mut String, index: usize, guarded: bool, text: &str) {
    if guarded {
        let _ = writeln!(out, "#ifdef USE_V{index}");
        out.push_str(text);
        out.push_str("#endif\n");
    } else {
        out.push_str(text);
    }
}

fn literal<R: Rng>(rng: &mut R) -> String {
    format!("{:.1}", rng.random_range(0.1f32..8.0))
}

/// Float-typed expression over literals, uniforms, the first `helpers` helpers and,
/// in the vertex stage, components of `position`.
fn float_expr<R: Rng>(rng: &mut R, shape: &Shape, helpers: usize, vertex: bool, depth: u32) -> String {
    let leaf = depth == 0 || rng.random_bool(0.4);
    if leaf {
        return match rng.random_range(0..3) {
            0 => literal(rng),
            1 if vertex => {
                let c = ["x", "y", "z", "w"][rng.random_range(0..4)];
                format!("position.{c}")
            }
            _ => format!("u{}", rng.random_range(0..shape.uniforms)),
        };
    }
    if helpers > 0 && rng.random_bool(0.3) {
        let h = rng.random_range(0..helpers);
        return format!("h{h}({})", float_expr(rng, shape, helpers, vertex, depth - 1));
    }
    let op = ["+", "-", "*"][rng.random_range(0..3)];
    let lhs = float_expr(rng, shape, helpers, vertex, depth - 1);
    let rhs = float_expr(rng, shape, helpers, vertex, depth - 1);
    format!("({lhs} {op} {rhs})")
}
