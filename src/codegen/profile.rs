// src/codegen/profile.rs
// Backend profiles: everything that differs between the two GLSL ES revisions.

use std::borrow::Cow;

use crate::{config::Backend, lexer::TokenKind, semantic::types::Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        }
    }
}

pub const EXT_DERIVATIVES: &str = "GL_OES_standard_derivatives";
pub const EXT_TEXTURE_LOD: &str = "GL_EXT_shader_texture_lod";
pub const EXT_DRAW_BUFFERS: &str = "GL_EXT_draw_buffers";
pub const EXT_FRAG_DEPTH: &str = "GL_EXT_frag_depth";

/// Spelling of a built-in function or variable in the target profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spelling {
    pub name: Cow<'static, str>,
    pub extension: Option<&'static str>,
}

impl Spelling {
    fn keep(name: &str) -> Self {
        Self {
            name: Cow::Owned(name.to_string()),
            extension: None,
        }
    }

    fn to(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            extension: None,
        }
    }

    fn with(name: &'static str, extension: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            extension: Some(extension),
        }
    }
}

const VERTEX_PRECISION: &[&str] = &["precision highp float;", "precision highp int;"];

const FRAGMENT_PRECISION: &[&str] = &[
    "#ifdef GL_FRAGMENT_PRECISION_HIGH",
    "precision highp float;",
    "precision highp int;",
    "#else",
    "precision mediump float;",
    "precision mediump int;",
    "#endif",
];

pub trait Profile: Sync {
    fn backend(&self) -> Backend;

    fn version(&self) -> &'static str;

    /// Qualifier of per-vertex inputs.
    fn attribute_qualifier(&self) -> &'static str;

    /// Qualifier of stage-to-stage values, as seen from `stage`.
    fn varying_qualifier(&self, stage: Stage) -> &'static str;

    fn supports_interpolation(&self) -> bool;

    fn default_precision(&self, stage: Stage) -> &'static [&'static str] {
        match stage {
            Stage::Vertex => VERTEX_PRECISION,
            Stage::Fragment => FRAGMENT_PRECISION,
        }
    }

    /// `#extension` line, for profiles that need them.
    fn extension_line(&self, _extension: &str) -> Option<String> {
        None
    }

    /// Call spelling for the built-in `name`; `sampler` is the first argument's type.
    fn builtin_call(&self, name: &str, sampler: Option<&Type>, stage: Stage) -> Spelling;

    /// Spelling of a built-in variable (`gl_FragColor`, `gl_FragDepth`, ...).
    fn builtin_variable(&self, name: &str) -> Spelling;

    /// Declaration introduced when the single color output is written.
    fn frag_color_declaration(&self) -> Option<&'static str>;

    /// Declaration backing `gl_FragData`; `size` is `None` when some index is dynamic.
    fn frag_data_declaration(&self, size: Option<usize>) -> Option<String>;

    /// Assignment target for output struct member `index`.
    fn output_target(&self, index: usize, member: &str) -> String;

    fn output_declaration(&self, index: usize, member: &str) -> Option<String>;

    /// Extension needed when `count` color outputs are written.
    fn output_extension(&self, count: usize) -> Option<&'static str>;

    fn float_literal<'a>(&self, lexeme: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(lexeme)
    }
}

// ---- GLSL ES 1.00 ----

pub struct Glsl100;

fn is_cube(sampler: Option<&Type>) -> bool {
    matches!(
        sampler,
        Some(Type::Sampler(TokenKind::SamplerCube | TokenKind::SamplerCubeShadow))
    )
}

impl Profile for Glsl100 {
    fn backend(&self) -> Backend {
        Backend::Glsl100
    }

    fn version(&self) -> &'static str {
        "#version 100"
    }

    fn attribute_qualifier(&self) -> &'static str {
        "attribute"
    }

    fn varying_qualifier(&self, _stage: Stage) -> &'static str {
        "varying"
    }

    fn supports_interpolation(&self) -> bool {
        false
    }

    fn extension_line(&self, extension: &str) -> Option<String> {
        Some(format!("#extension {extension} : enable"))
    }

    fn builtin_call(&self, name: &str, sampler: Option<&Type>, stage: Stage) -> Spelling {
        let cube = is_cube(sampler) || name.contains("Cube");
        let frag = stage == Stage::Fragment;
        match name {
            "texture" if cube => Spelling::to("textureCube"),
            "texture" => Spelling::to("texture2D"),
            "textureProj" => Spelling::to("texture2DProj"),
            "textureLod" | "textureCubeLod" | "textureCubeLodEXT" if cube => {
                if frag {
                    Spelling::with("textureCubeLodEXT", EXT_TEXTURE_LOD)
                } else {
                    Spelling::to("textureCubeLod")
                }
            }
            "textureLod" | "texture2DLod" | "texture2DLodEXT" => {
                if frag {
                    Spelling::with("texture2DLodEXT", EXT_TEXTURE_LOD)
                } else {
                    Spelling::to("texture2DLod")
                }
            }
            "textureProjLod" | "texture2DProjLod" | "texture2DProjLodEXT" => {
                if frag {
                    Spelling::with("texture2DProjLodEXT", EXT_TEXTURE_LOD)
                } else {
                    Spelling::to("texture2DProjLod")
                }
            }
            "textureGrad" | "textureCubeGradEXT" if cube => {
                Spelling::with("textureCubeGradEXT", EXT_TEXTURE_LOD)
            }
            "textureGrad" | "texture2DGradEXT" => Spelling::with("texture2DGradEXT", EXT_TEXTURE_LOD),
            "dFdx" | "dFdy" | "fwidth" if frag => Spelling {
                name: Cow::Owned(name.to_string()),
                extension: Some(EXT_DERIVATIVES),
            },
            _ => Spelling::keep(name),
        }
    }

    fn builtin_variable(&self, name: &str) -> Spelling {
        match name {
            "gl_FragDepth" | "gl_FragDepthEXT" => Spelling::with("gl_FragDepthEXT", EXT_FRAG_DEPTH),
            _ => Spelling::keep(name),
        }
    }

    fn frag_color_declaration(&self) -> Option<&'static str> {
        None
    }

    fn frag_data_declaration(&self, _size: Option<usize>) -> Option<String> {
        None
    }

    fn output_target(&self, index: usize, _member: &str) -> String {
        format!("gl_FragData[{index}]")
    }

    fn output_declaration(&self, _index: usize, _member: &str) -> Option<String> {
        None
    }

    fn output_extension(&self, count: usize) -> Option<&'static str> {
        (count > 1).then_some(EXT_DRAW_BUFFERS)
    }

    /// ES 1.00 has no float suffix.
    fn float_literal<'a>(&self, lexeme: &'a str) -> Cow<'a, str> {
        match lexeme.strip_suffix(['f', 'F']) {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Borrowed(lexeme),
        }
    }
}

// ---- GLSL ES 3.00 ----

pub struct Glsl300;

pub const FRAG_COLOR_300: &str = "glFragColor";
pub const FRAG_DATA_300: &str = "glFragData";

impl Profile for Glsl300 {
    fn backend(&self) -> Backend {
        Backend::Glsl300
    }

    fn version(&self) -> &'static str {
        "#version 300 es"
    }

    fn attribute_qualifier(&self) -> &'static str {
        "in"
    }

    fn varying_qualifier(&self, stage: Stage) -> &'static str {
        match stage {
            Stage::Vertex => "out",
            Stage::Fragment => "in",
        }
    }

    fn supports_interpolation(&self) -> bool {
        true
    }

    fn builtin_call(&self, name: &str, _sampler: Option<&Type>, _stage: Stage) -> Spelling {
        match name {
            "texture2D" | "textureCube" => Spelling::to("texture"),
            "texture2DLod" | "texture2DLodEXT" | "textureCubeLod" | "textureCubeLodEXT" => {
                Spelling::to("textureLod")
            }
            "texture2DProj" => Spelling::to("textureProj"),
            "texture2DProjLod" | "texture2DProjLodEXT" => Spelling::to("textureProjLod"),
            "texture2DGradEXT" | "textureCubeGradEXT" => Spelling::to("textureGrad"),
            _ => Spelling::keep(name),
        }
    }

    fn builtin_variable(&self, name: &str) -> Spelling {
        match name {
            "gl_FragColor" => Spelling::to(FRAG_COLOR_300),
            "gl_FragData" => Spelling::to(FRAG_DATA_300),
            "gl_FragDepthEXT" => Spelling::to("gl_FragDepth"),
            _ => Spelling::keep(name),
        }
    }

    fn frag_color_declaration(&self) -> Option<&'static str> {
        Some("layout(location = 0) out vec4 glFragColor;")
    }

    fn frag_data_declaration(&self, size: Option<usize>) -> Option<String> {
        let size = size.map_or_else(|| "gl_MaxDrawBuffers".to_string(), |n| n.to_string());
        Some(format!("layout(location = 0) out vec4 {FRAG_DATA_300}[{size}];"))
    }

    fn output_target(&self, _index: usize, member: &str) -> String {
        member.to_string()
    }

    fn output_declaration(&self, index: usize, member: &str) -> Option<String> {
        Some(format!("layout(location = {index}) out vec4 {member};"))
    }

    fn output_extension(&self, _count: usize) -> Option<&'static str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_texture_calls_follow_the_sampler() {
        let cube = Type::Sampler(TokenKind::SamplerCube);
        let flat = Type::Sampler(TokenKind::Sampler2D);
        assert_eq!(Glsl100.builtin_call("texture", Some(&cube), Stage::Fragment).name, "textureCube");
        assert_eq!(Glsl100.builtin_call("texture", Some(&flat), Stage::Vertex).name, "texture2D");
        let lod = Glsl100.builtin_call("textureLod", Some(&flat), Stage::Fragment);
        assert_eq!(lod, Spelling::with("texture2DLodEXT", EXT_TEXTURE_LOD));
        let lod = Glsl100.builtin_call("textureLod", Some(&flat), Stage::Vertex);
        assert_eq!(lod.name, "texture2DLod");
        assert_eq!(lod.extension, None);
    }

    #[test]
    fn modern_profile_unifies_texture_calls() {
        for legacy in ["texture2D", "textureCube"] {
            assert_eq!(Glsl300.builtin_call(legacy, None, Stage::Fragment).name, "texture");
        }
        assert_eq!(Glsl300.builtin_call("texture2DLodEXT", None, Stage::Fragment).name, "textureLod");
        assert_eq!(Glsl300.builtin_call("mix", None, Stage::Fragment).name, "mix");
    }

    #[test]
    fn outputs_and_literals() {
        assert_eq!(Glsl100.output_target(2, "normal"), "gl_FragData[2]");
        assert_eq!(Glsl100.output_extension(1), None);
        assert_eq!(Glsl100.output_extension(2), Some(EXT_DRAW_BUFFERS));
        assert_eq!(
            Glsl300.output_declaration(1, "normal").as_deref(),
            Some("layout(location = 1) out vec4 normal;")
        );
        assert_eq!(Glsl100.float_literal("1.5f"), "1.5");
        assert_eq!(Glsl300.float_literal("1.5f"), "1.5f");
        assert_eq!(Glsl300.builtin_variable("gl_FragDepthEXT").name, "gl_FragDepth");
        assert_eq!(Glsl300.builtin_variable("gl_FragData").name, "glFragData");
        assert_eq!(
            Glsl300.frag_data_declaration(None).as_deref(),
            Some("layout(location = 0) out vec4 glFragData[gl_MaxDrawBuffers];")
        );
        assert_eq!(Glsl100.frag_data_declaration(Some(2)), None);
        assert_eq!(Glsl100.builtin_variable("gl_FragDepth").extension, Some(EXT_FRAG_DEPTH));
    }
}
