// src/lexer/tokens.rs
// Terminal tags of the shader grammar plus the fixed keyword table.

use std::sync::LazyLock;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

macro_rules! token_kinds {
    ($($name:ident => $text:literal,)*) => {
        /// Token kinds. Discriminants are dense so they index table columns directly.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(u16)]
        pub enum TokenKind {
            $($name,)*
        }

        impl TokenKind {
            pub const ALL: &'static [TokenKind] = &[$(TokenKind::$name,)*];

            /// Canonical spelling (keywords and punctuation) or an upper-case class name.
            pub fn text(self) -> &'static str {
                match self {
                    $(TokenKind::$name => $text,)*
                }
            }
        }
    };
}

token_kinds! {
    Eof => "EOF",
    Ident => "IDENTIFIER",
    IntConstant => "INTCONSTANT",
    UintConstant => "UINTCONSTANT",
    FloatConstant => "FLOATCONSTANT",
    StringLiteral => "STRING",

    // qualifiers
    Const => "const",
    In => "in",
    Out => "out",
    Inout => "inout",
    Centroid => "centroid",
    Uniform => "uniform",
    Highp => "highp",
    Mediump => "mediump",
    Lowp => "lowp",
    Smooth => "smooth",
    Flat => "flat",
    Invariant => "invariant",
    Precision => "precision",

    // control flow
    If => "if",
    Else => "else",
    For => "for",
    While => "while",
    Do => "do",
    Break => "break",
    Continue => "continue",
    Return => "return",
    Discard => "discard",
    Struct => "struct",
    True => "true",
    False => "false",

    // built-in types
    Void => "void",
    Bool => "bool",
    Int => "int",
    Uint => "uint",
    Float => "float",
    Vec2 => "vec2",
    Vec3 => "vec3",
    Vec4 => "vec4",
    Ivec2 => "ivec2",
    Ivec3 => "ivec3",
    Ivec4 => "ivec4",
    Uvec2 => "uvec2",
    Uvec3 => "uvec3",
    Uvec4 => "uvec4",
    Bvec2 => "bvec2",
    Bvec3 => "bvec3",
    Bvec4 => "bvec4",
    Mat2 => "mat2",
    Mat3 => "mat3",
    Mat4 => "mat4",
    Sampler2D => "sampler2D",
    Sampler3D => "sampler3D",
    SamplerCube => "samplerCube",
    Sampler2DShadow => "sampler2DShadow",
    SamplerCubeShadow => "samplerCubeShadow",
    Sampler2DArray => "sampler2DArray",
    Sampler2DArrayShadow => "sampler2DArrayShadow",
    Isampler2D => "isampler2D",
    Isampler3D => "isampler3D",
    IsamplerCube => "isamplerCube",
    Isampler2DArray => "isampler2DArray",
    Usampler2D => "usampler2D",
    Usampler3D => "usampler3D",
    UsamplerCube => "usamplerCube",
    Usampler2DArray => "usampler2DArray",

    // multi-char operators
    LeftAssign => "<<=",
    RightAssign => ">>=",
    LeftOp => "<<",
    RightOp => ">>",
    IncOp => "++",
    DecOp => "--",
    LeOp => "<=",
    GeOp => ">=",
    EqOp => "==",
    NeOp => "!=",
    AndOp => "&&",
    OrOp => "||",
    XorOp => "^^",
    MulAssign => "*=",
    DivAssign => "/=",
    ModAssign => "%=",
    AddAssign => "+=",
    SubAssign => "-=",
    AndAssign => "&=",
    XorAssign => "^=",
    OrAssign => "|=",

    // single-char punctuation
    LeftParen => "(",
    RightParen => ")",
    LeftBracket => "[",
    RightBracket => "]",
    LeftBrace => "{",
    RightBrace => "}",
    Dot => ".",
    Comma => ",",
    Colon => ":",
    Equal => "=",
    Semicolon => ";",
    Bang => "!",
    Dash => "-",
    Tilde => "~",
    Plus => "+",
    Star => "*",
    Slash => "/",
    Percent => "%",
    LeftAngle => "<",
    RightAngle => ">",
    VerticalBar => "|",
    Caret => "^",
    Ampersand => "&",
    Question => "?",

    // preprocessor lines
    MacroIf => "#if",
    MacroIfdef => "#ifdef",
    MacroIfndef => "#ifndef",
    MacroElif => "#elif",
    MacroElse => "#else",
    MacroEndif => "#endif",
    MacroDefine => "#define",
    MacroUndef => "#undef",
    MacroOther => "#directive",
}

pub const N_KINDS: usize = TokenKind::ALL.len();

impl TokenKind {
    #[inline]
    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<TokenKind> {
        TokenKind::ALL.get(i).copied()
    }

    pub fn is_keyword(self) -> bool {
        (TokenKind::Const..=TokenKind::Usampler2DArray).contains(&self)
    }

    pub fn is_builtin_type(self) -> bool {
        (TokenKind::Void..=TokenKind::Usampler2DArray).contains(&self)
    }

    pub fn is_macro(self) -> bool {
        self >= TokenKind::MacroIf
    }

    /// Branch-open markers of conditional compilation.
    pub fn opens_branch(self) -> bool {
        matches!(
            self,
            TokenKind::MacroIf | TokenKind::MacroIfdef | TokenKind::MacroIfndef
        )
    }
}

static KEYWORDS: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    TokenKind::ALL
        .iter()
        .filter(|k| k.is_keyword())
        .map(|&k| (k.text(), k))
        .collect()
});

/// Resolves an identifier against the keyword table, falling back to `Ident`.
pub fn keyword_or_ident(word: &str) -> TokenKind {
    KEYWORDS.get(word).copied().unwrap_or(TokenKind::Ident)
}

/// Directive name (without `#`) to token kind.
pub fn directive_kind(name: &str) -> TokenKind {
    match name {
        "if" => TokenKind::MacroIf,
        "ifdef" => TokenKind::MacroIfdef,
        "ifndef" => TokenKind::MacroIfndef,
        "elif" => TokenKind::MacroElif,
        "else" => TokenKind::MacroElse,
        "endif" => TokenKind::MacroEndif,
        "define" => TokenKind::MacroDefine,
        "undef" => TokenKind::MacroUndef,
        _ => TokenKind::MacroOther,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_are_dense() {
        for (i, k) in TokenKind::ALL.iter().enumerate() {
            assert_eq!(k.idx(), i);
            assert_eq!(TokenKind::from_index(i), Some(*k));
        }
    }

    #[test]
    fn keyword_table_covers_types_and_qualifiers() {
        assert_eq!(keyword_or_ident("vec3"), TokenKind::Vec3);
        assert_eq!(keyword_or_ident("mediump"), TokenKind::Mediump);
        assert_eq!(keyword_or_ident("samplerCube"), TokenKind::SamplerCube);
        assert_eq!(keyword_or_ident("vec5"), TokenKind::Ident);
        // class names are not keywords
        assert_eq!(keyword_or_ident("IDENTIFIER"), TokenKind::Ident);
    }
}
