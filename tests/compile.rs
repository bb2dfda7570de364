//! End-to-end compilation scenarios under both backends.

use shaderlabc::{Backend, CompileError, CompileOptions, Severity, compile, compile_with_diagnostics};

fn opts(backend: Backend) -> CompileOptions {
    CompileOptions {
        backend,
        ..CompileOptions::default()
    }
}

fn errors(src: &str, backend: Backend) -> Vec<String> {
    match compile(src, &opts(backend)) {
        Err(CompileError::Semantic(diags)) => diags.into_iter().map(|d| d.message).collect(),
        Err(e) => panic!("unexpected fatal error: {e}"),
        Ok(pass) => panic!("expected errors, got:\n{}\n{}", pass.vertex, pass.fragment),
    }
}

const VARYINGS: &str = "
struct Varyings {
    vec2 v_uv;
    vec3 v_normal;
    vec4 v_color;
};
uniform mat4 u_mvp;
Varyings vert(vec3 a_pos) {
    gl_Position = u_mvp * vec4(a_pos, 1.0);
    Varyings o;
    o.v_uv = a_pos.xy;
    return o;
}
uniform sampler2D u_tex;
void frag(Varyings i) {
    gl_FragColor = texture2D(u_tex, i.v_uv);
}
";

#[test]
fn only_used_varyings_are_declared_glsl300() {
    let pass = compile(VARYINGS, &opts(Backend::Glsl300)).unwrap();
    assert_eq!(
        pass.vertex,
        "#version 300 es
precision highp float;
precision highp int;
out vec2 v_uv;
uniform mat4 u_mvp;
in vec3 a_pos;
void main() {
    gl_Position = u_mvp * vec4(a_pos, 1.0);
    v_uv = a_pos.xy;
    {
        return;
    }
}
"
    );
    assert_eq!(
        pass.fragment,
        "#version 300 es
#ifdef GL_FRAGMENT_PRECISION_HIGH
precision highp float;
precision highp int;
#else
precision mediump float;
precision mediump int;
#endif
layout(location = 0) out vec4 glFragColor;
in vec2 v_uv;
uniform sampler2D u_tex;
void main() {
    glFragColor = texture(u_tex, v_uv);
}
"
    );
}

#[test]
fn only_used_varyings_are_declared_glsl100() {
    let pass = compile(VARYINGS, &opts(Backend::Glsl100)).unwrap();
    assert!(pass.vertex.starts_with("#version 100\n"));
    assert!(pass.vertex.contains("\nvarying vec2 v_uv;\n"));
    assert!(pass.vertex.contains("\nattribute vec3 a_pos;\n"));
    assert!(pass.fragment.contains("\nvarying vec2 v_uv;\n"));
    assert!(pass.fragment.contains("gl_FragColor = texture2D(u_tex, v_uv);"));
    for stage in [&pass.vertex, &pass.fragment] {
        assert!(!stage.contains("v_normal"));
        assert!(!stage.contains("v_color"));
        assert!(!stage.contains("Varyings"));
    }
}

#[test]
fn profiles_never_mix_keywords() {
    for src in [VARYINGS, FRAG_DATA] {
        let old = compile(src, &opts(Backend::Glsl100)).unwrap();
        let new = compile(src, &opts(Backend::Glsl300)).unwrap();
        for text in [&old.vertex, &old.fragment] {
            assert!(!text.contains("#version 300"));
            assert!(!text.contains("layout("));
            assert!(!text.contains("\nin "));
            assert!(!text.contains("\nout "));
            assert!(!text.contains("glFragColor"));
            assert!(!text.contains("glFragData"));
        }
        for text in [&new.vertex, &new.fragment] {
            assert!(!text.contains("attribute "));
            assert!(!text.contains("varying "));
            assert!(!text.contains("texture2D("));
            assert!(!text.contains("gl_FragColor"));
            assert!(!text.contains("gl_FragData"));
        }
    }
}

const MRT: &str = "
struct V { vec2 uv; };
struct Out { vec4 color; vec4 normal; };
V vert(vec4 p) {
    gl_Position = p;
    return V(p.xy);
}
Out frag(V i) {
    Out o;
    o.color = vec4(i.uv, 0.0, 1.0);
    o.normal = vec4(0.5);
    return o;
}
";

#[test]
fn multiple_render_targets() {
    let new = compile(MRT, &opts(Backend::Glsl300)).unwrap();
    assert!(new.fragment.contains("layout(location = 0) out vec4 color;\nlayout(location = 1) out vec4 normal;"));
    assert!(new.fragment.contains("    color = vec4(uv, 0.0, 1.0);\n    normal = vec4(0.5);"));
    assert!(new.vertex.contains("    {\n        uv = p.xy;\n        return;\n    }"));

    let old = compile(MRT, &opts(Backend::Glsl100)).unwrap();
    assert!(old.fragment.starts_with("#version 100\n#extension GL_EXT_draw_buffers : enable\n"));
    assert!(old.fragment.contains("gl_FragData[0] = vec4(uv, 0.0, 1.0);"));
    assert!(old.fragment.contains("gl_FragData[1] = vec4(0.5);"));
    assert!(!old.fragment.contains("Out"));
}

#[test]
fn single_color_output_cannot_mix_with_output_struct() {
    let src = MRT.replace("o.normal = vec4(0.5);", "gl_FragColor = vec4(0.5);");
    for backend in Backend::ALL {
        let errs = errors(&src, backend);
        assert!(
            errs.contains(&"gl_FragColor cannot be used together with output struct 'Out'".to_string()),
            "{errs:?}"
        );
    }
}

#[test]
fn vec4_returning_fragment_writes_the_color() {
    let src = "
struct V { vec2 uv; };
V vert(vec4 p) { gl_Position = p; return V(p.xy); }
vec4 frag(V i) { return vec4(i.uv, 0.0, 1.0); }
";
    let new = compile(src, &opts(Backend::Glsl300)).unwrap();
    assert!(new.fragment.contains("layout(location = 0) out vec4 glFragColor;"));
    assert!(new.fragment.contains("        glFragColor = vec4(uv, 0.0, 1.0);\n        return;"));
    let old = compile(src, &opts(Backend::Glsl100)).unwrap();
    assert!(old.fragment.contains("gl_FragColor = vec4(uv, 0.0, 1.0);"));
}

#[test]
fn conditional_members_keep_their_directives() {
    let src = "
struct V {
    vec2 uv;
#ifdef USE_FOG
    float fog;
#endif
};
V vert(vec4 p) {
    gl_Position = p;
    V o;
    o.uv = p.xy;
#ifdef USE_FOG
    o.fog = p.z;
#endif
    return o;
}
void frag(V i) {
    vec4 c = vec4(i.uv, 0.0, 1.0);
#ifdef USE_FOG
    c = c * i.fog;
#endif
    gl_FragColor = c;
}
";
    let new = compile(src, &opts(Backend::Glsl300)).unwrap();
    assert!(new.vertex.contains("out vec2 uv;\n#ifdef USE_FOG\nout float fog;\n#endif\n"));
    assert!(new.vertex.contains("\n#ifdef USE_FOG\n    fog = p.z;\n#endif\n"));
    assert!(new.fragment.contains("in vec2 uv;\n#ifdef USE_FOG\nin float fog;\n#endif\n"));
    assert!(new.fragment.contains("\n#ifdef USE_FOG\n    c = c * fog;\n#endif\n"));
}

#[test]
fn helpers_uniforms_and_prototypes_follow_source_order() {
    let src = "
struct V { vec2 uv; };
float u_scale;
const float K = 2.0;
float scale(float x);
float scale(float x) {
    return x * u_scale * K;
}
float unused(float x) { return x; }
V vert(vec4 p) { gl_Position = p; return V(p.xy); }
void frag(V i) { gl_FragColor = vec4(scale(i.uv.x)); }
";
    let pass = compile(src, &opts(Backend::Glsl300)).unwrap();
    let f = &pass.fragment;
    let order = ["uniform float u_scale;", "const float K = 2.0;", "float scale(float x);", "float scale(float x) {"]
        .map(|s| f.find(s).unwrap_or_else(|| panic!("missing {s:?} in\n{f}")));
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{f}");
    assert!(f.contains("    return x * u_scale * K;\n}"));
    assert!(!f.contains("unused"));
    assert!(!pass.vertex.contains("scale"));
}

#[test]
fn legacy_texture_lod_needs_an_extension_in_glsl100() {
    let src = "
struct V { vec2 uv; };
uniform sampler2D t;
V vert(vec4 p) { gl_Position = p; return V(p.xy); }
void frag(V i) { gl_FragColor = texture2DLodEXT(t, i.uv, 0.0) + vec4(dFdx(i.uv.x)); }
";
    let old = compile(src, &opts(Backend::Glsl100)).unwrap();
    assert!(old.fragment.starts_with(
        "#version 100\n#extension GL_EXT_shader_texture_lod : enable\n#extension GL_OES_standard_derivatives : enable\n"
    ));
    assert!(old.fragment.contains("texture2DLodEXT(t, uv, 0.0)"));
    let new = compile(src, &opts(Backend::Glsl300)).unwrap();
    assert!(new.fragment.contains("textureLod(t, uv, 0.0)"));
    assert!(!new.fragment.contains("#extension"));
}

#[test]
fn unread_varyings_warn_but_compile() {
    let src = "
struct V { vec2 uv; float extra; };
V vert(vec4 p) { gl_Position = p; return V(p.xy, p.z); }
void frag(V i) { gl_FragColor = vec4(i.uv, 0.0, 1.0); }
";
    let report = compile_with_diagnostics(src, &opts(Backend::Glsl300)).unwrap();
    assert!(!report.has_errors());
    let warnings: Vec<&str> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(warnings, ["varying 'extra' is written by the vertex stage but never read"]);
    let pass = report.output.unwrap();
    assert!(pass.vertex.contains("out float extra;"));
    assert!(pass.vertex.contains("    {\n        uv = p.xy;\n        extra = p.z;\n        return;\n    }"));
    assert!(pass.fragment.contains("\nin vec2 uv;\n"));
    assert!(!pass.fragment.contains("extra"), "{}", pass.fragment);
}

const FRAG_DATA: &str = "
struct V { vec2 uv; };
V vert(vec4 p) { gl_Position = p; return V(p.xy); }
void frag(V i) {
    gl_FragData[0] = vec4(i.uv, 0.0, 1.0);
    gl_FragData[1] = vec4(0.5);
}
";

#[test]
fn frag_data_follows_the_profile() {
    let new = compile(FRAG_DATA, &opts(Backend::Glsl300)).unwrap();
    assert!(new.fragment.contains("\nlayout(location = 0) out vec4 glFragData[2];\n"), "{}", new.fragment);
    assert!(new.fragment.contains("    glFragData[0] = vec4(uv, 0.0, 1.0);\n    glFragData[1] = vec4(0.5);"));
    assert!(!new.fragment.contains("gl_FragData"));

    let old = compile(FRAG_DATA, &opts(Backend::Glsl100)).unwrap();
    assert!(old.fragment.starts_with("#version 100\n#extension GL_EXT_draw_buffers : enable\n"));
    assert!(old.fragment.contains("    gl_FragData[0] = vec4(uv, 0.0, 1.0);\n    gl_FragData[1] = vec4(0.5);"));
    assert!(!old.fragment.contains("glFragData"));
}

#[test]
fn frag_data_with_a_dynamic_index_covers_every_draw_buffer() {
    let src = FRAG_DATA.replace("gl_FragData[1]", "gl_FragData[int(i.uv.x)]");
    let new = compile(&src, &opts(Backend::Glsl300)).unwrap();
    assert!(new.fragment.contains("layout(location = 0) out vec4 glFragData[gl_MaxDrawBuffers];"));
    let old = compile(&src, &opts(Backend::Glsl100)).unwrap();
    assert!(old.fragment.contains("#extension GL_EXT_draw_buffers : enable\n"));

    let first_only = FRAG_DATA.replace("    gl_FragData[1] = vec4(0.5);\n", "");
    let old = compile(&first_only, &opts(Backend::Glsl100)).unwrap();
    assert!(!old.fragment.contains("#extension"), "{}", old.fragment);
}

#[test]
fn frag_data_excludes_other_color_outputs() {
    let with_color = FRAG_DATA.replace("gl_FragData[0]", "gl_FragColor");
    let returning = "
struct V { vec2 uv; };
V vert(vec4 p) { gl_Position = p; return V(p.xy); }
vec4 frag(V i) {
    gl_FragData[1] = vec4(0.5);
    return vec4(i.uv, 0.0, 1.0);
}
";
    let with_struct = MRT.replace("o.normal = vec4(0.5);", "gl_FragData[1] = vec4(0.5);");
    for backend in Backend::ALL {
        assert_eq!(errors(&with_color, backend), ["gl_FragData cannot be used together with gl_FragColor"]);
        assert_eq!(
            errors(returning, backend),
            ["gl_FragData cannot be used when the fragment entry returns a vec4"]
        );
        assert_eq!(
            errors(&with_struct, backend),
            ["gl_FragData cannot be used together with output struct 'Out'"]
        );
    }
}

#[test]
fn flattened_names_must_not_collide() {
    let attribute_clash = "
struct A { vec3 pos; vec2 uv; };
struct V { vec2 uv; };
V vert(A a) { gl_Position = vec4(a.pos, 1.0); return V(a.uv); }
void frag(V i) { gl_FragColor = vec4(i.uv, 0.0, 1.0); }
";
    let output_clash = "
struct V { vec2 uv; };
struct Out { vec4 uv; };
V vert(vec4 p) { gl_Position = p; return V(p.xy); }
Out frag(V i) { return Out(vec4(i.uv, 0.0, 1.0)); }
";
    for backend in Backend::ALL {
        assert_eq!(
            errors(attribute_clash, backend),
            ["flattened name 'uv' of varying struct 'V' collides with attribute struct 'A'"]
        );
        assert_eq!(
            errors(output_clash, backend),
            ["flattened name 'uv' of output struct 'Out' collides with varying struct 'V'"]
        );
    }
}

#[test]
fn entry_point_errors() {
    let base = "
struct V { vec2 uv; };
struct W { vec2 uv; };
V vert(vec4 p) { gl_Position = p; return V(p.xy); }
void frag(W i) { gl_FragColor = vec4(i.uv, 0.0, 1.0); }
";
    assert_eq!(
        errors(base, Backend::Glsl300),
        ["fragment input struct 'W' differs from vertex output 'V'"]
    );

    let missing = CompileOptions::new(Backend::Glsl300, "main_v", "frag");
    match compile(base, &missing) {
        Err(CompileError::Semantic(diags)) => {
            assert_eq!(diags[0].message, "vertex entry 'main_v' not found");
        }
        other => panic!("{other:?}"),
    }
}

#[test]
fn stage_and_helper_misuse() {
    let src = "
struct V { vec2 uv; };
V make(vec2 p) { return V(p); }
V vert(vec4 p) { gl_Position = gl_FragCoord; return make(p.xy); }
void frag(V i) { gl_FragColor = vec4(i.uv, 0.0, 1.0); }
";
    let errs = errors(src, Backend::Glsl300);
    assert!(errs.contains(&"'gl_FragCoord' is not available in the vertex stage".to_string()), "{errs:?}");
    assert!(errs.contains(&"function 'make' cannot return 'V' outside an entry point".to_string()), "{errs:?}");
}

#[test]
fn prototype_without_definition_is_reported() {
    let src = "
struct V { vec2 uv; };
float g(float x);
V vert(vec4 p) { gl_Position = p; return V(p.xy); }
void frag(V i) { gl_FragColor = vec4(g(i.uv.x)); }
";
    let errs = errors(src, Backend::Glsl100);
    assert_eq!(errs, ["function 'g(float)' is declared but never defined"]);
}
