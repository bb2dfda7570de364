// src/semantic/builtins.rs
// Built-in function table with generic parameter placeholders.

use std::sync::LazyLock;

use hashbrown::HashMap;

use super::types::{Scalar, Type};
use crate::lexer::TokenKind;

/// Declared parameter type of a built-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Concrete(Type),
    /// float, vec2, vec3, vec4
    GenType,
    /// int, ivec2..4
    GenIntType,
    /// uint, uvec2..4
    GenUintType,
    /// bool, bvec2..4
    GenBoolType,
    /// mat2..4
    GenMatType,
    /// vec2..4
    Vec,
    /// ivec2..4
    IVec,
    /// bvec2..4
    BVec,
}

impl Param {
    fn accepts(&self, arg: &Type) -> bool {
        match self {
            Param::Concrete(t) => t == arg,
            Param::GenType => matches!(arg, Type::Scalar(Scalar::Float) | Type::Vector(Scalar::Float, _)),
            Param::GenIntType => matches!(arg, Type::Scalar(Scalar::Int) | Type::Vector(Scalar::Int, _)),
            Param::GenUintType => matches!(arg, Type::Scalar(Scalar::Uint) | Type::Vector(Scalar::Uint, _)),
            Param::GenBoolType => matches!(arg, Type::Scalar(Scalar::Bool) | Type::Vector(Scalar::Bool, _)),
            Param::GenMatType => matches!(arg, Type::Matrix(_)),
            Param::Vec => matches!(arg, Type::Vector(Scalar::Float, _)),
            Param::IVec => matches!(arg, Type::Vector(Scalar::Int, _)),
            Param::BVec => matches!(arg, Type::Vector(Scalar::Bool, _)),
        }
    }

    fn slot(&self) -> Option<usize> {
        Some(match self {
            Param::Concrete(_) => return None,
            Param::GenType => 0,
            Param::GenIntType => 1,
            Param::GenUintType => 2,
            Param::GenBoolType => 3,
            Param::GenMatType => 4,
            Param::Vec => 5,
            Param::IVec => 6,
            Param::BVec => 7,
        })
    }
}

/// How the return type of a built-in is derived from its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ret {
    Concrete(Type),
    /// The type bound to the first generic parameter.
    Bound,
    /// Bool scalar/vector with the bound arity.
    BoolOfBound,
    /// Int scalar/vector with the bound arity.
    IntOfBound,
    /// Float scalar/vector with the bound arity.
    FloatOfBound,
}

#[derive(Debug, Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub params: Vec<Param>,
    pub ret: Ret,
}

impl Builtin {
    /// Binds every placeholder to the first concrete argument seen for it, and checks the
    /// remaining arguments against that binding. `Any` arguments match anything.
    pub fn match_args(&self, args: &[Type]) -> Option<Type> {
        if args.len() != self.params.len() {
            return None;
        }
        let mut bound: [Option<&Type>; 8] = [None; 8];
        let mut first: Option<&Type> = None;
        for (param, arg) in self.params.iter().zip(args) {
            if arg.is_any() {
                continue;
            }
            if !param.accepts(arg) {
                return None;
            }
            let Some(slot) = param.slot() else {
                continue;
            };
            match bound[slot] {
                Some(b) if b != arg => return None,
                Some(_) => {}
                None => {
                    bound[slot] = Some(arg);
                    first.get_or_insert(arg);
                }
            }
        }

        let arity = first.and_then(|t| t.component_count());
        Some(match &self.ret {
            Ret::Concrete(t) => t.clone(),
            Ret::Bound => first.cloned().unwrap_or(Type::Any),
            Ret::BoolOfBound => arity.map_or(Type::Any, |n| Type::of_components(Scalar::Bool, n)),
            Ret::IntOfBound => arity.map_or(Type::Any, |n| Type::of_components(Scalar::Int, n)),
            Ret::FloatOfBound => arity.map_or(Type::Any, |n| Type::of_components(Scalar::Float, n)),
        })
    }
}

static BUILTINS: LazyLock<HashMap<&'static str, Vec<Builtin>>> = LazyLock::new(build_table);

/// Overloads of the built-in function `name`, if any.
pub fn builtin_overloads(name: &str) -> Option<&'static [Builtin]> {
    BUILTINS.get(name).map(Vec::as_slice)
}

/// Resolves a call to a built-in; `Err` carries whether the name exists at all.
pub fn resolve_builtin(name: &str, args: &[Type]) -> Result<Type, bool> {
    let overloads = builtin_overloads(name).ok_or(false)?;
    overloads
        .iter()
        .find_map(|b| b.match_args(args))
        .ok_or(true)
}

fn sampler(kind: TokenKind) -> Param {
    Param::Concrete(Type::Sampler(kind))
}

fn build_table() -> HashMap<&'static str, Vec<Builtin>> {
    use Param::{BVec, Concrete, GenBoolType, GenIntType, GenMatType, GenType, GenUintType, IVec};
    let float = || Concrete(Type::FLOAT);
    let int = || Concrete(Type::INT);
    let v2 = || Concrete(Type::vec(2));
    let v3 = || Concrete(Type::vec(3));
    let v4 = || Concrete(Type::vec(4));
    let iv2 = || Concrete(Type::Vector(Scalar::Int, 2));
    let iv3 = || Concrete(Type::Vector(Scalar::Int, 3));

    let mut out: HashMap<&'static str, Vec<Builtin>> = HashMap::new();
    let mut def = |name: &'static str, params: Vec<Param>, ret: Ret| {
        out.entry(name).or_default().push(Builtin { name, params, ret });
    };

    for name in [
        "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "sinh", "cosh", "tanh",
        "exp", "log", "exp2", "log2", "sqrt", "inversesqrt", "floor", "ceil", "fract", "trunc",
        "round", "roundEven", "normalize", "dFdx", "dFdy", "fwidth",
    ] {
        def(name, vec![GenType], Ret::Bound);
    }
    def("atan", vec![GenType], Ret::Bound);
    def("atan", vec![GenType, GenType], Ret::Bound);
    def("pow", vec![GenType, GenType], Ret::Bound);

    for name in ["abs", "sign"] {
        def(name, vec![GenType], Ret::Bound);
        def(name, vec![GenIntType], Ret::Bound);
    }
    def("mod", vec![GenType, GenType], Ret::Bound);
    def("mod", vec![GenType, float()], Ret::Bound);
    for name in ["min", "max"] {
        def(name, vec![GenType, GenType], Ret::Bound);
        def(name, vec![GenType, float()], Ret::Bound);
        def(name, vec![GenIntType, GenIntType], Ret::Bound);
        def(name, vec![GenIntType, int()], Ret::Bound);
        def(name, vec![GenUintType, GenUintType], Ret::Bound);
    }
    def("clamp", vec![GenType, GenType, GenType], Ret::Bound);
    def("clamp", vec![GenType, float(), float()], Ret::Bound);
    def("clamp", vec![GenIntType, GenIntType, GenIntType], Ret::Bound);
    def("clamp", vec![GenIntType, int(), int()], Ret::Bound);
    def("mix", vec![GenType, GenType, GenType], Ret::Bound);
    def("mix", vec![GenType, GenType, float()], Ret::Bound);
    def("mix", vec![GenType, GenType, GenBoolType], Ret::Bound);
    def("step", vec![GenType, GenType], Ret::Bound);
    def("step", vec![float(), GenType], Ret::Bound);
    def("smoothstep", vec![GenType, GenType, GenType], Ret::Bound);
    def("smoothstep", vec![float(), float(), GenType], Ret::Bound);
    def("isnan", vec![GenType], Ret::BoolOfBound);
    def("isinf", vec![GenType], Ret::BoolOfBound);
    def("floatBitsToInt", vec![GenType], Ret::IntOfBound);
    def("intBitsToFloat", vec![GenIntType], Ret::FloatOfBound);

    def("length", vec![GenType], Ret::Concrete(Type::FLOAT));
    def("distance", vec![GenType, GenType], Ret::Concrete(Type::FLOAT));
    def("dot", vec![GenType, GenType], Ret::Concrete(Type::FLOAT));
    def("cross", vec![v3(), v3()], Ret::Concrete(Type::vec(3)));
    def("faceforward", vec![GenType, GenType, GenType], Ret::Bound);
    def("reflect", vec![GenType, GenType], Ret::Bound);
    def("refract", vec![GenType, GenType, float()], Ret::Bound);

    def("matrixCompMult", vec![GenMatType, GenMatType], Ret::Bound);
    def("transpose", vec![GenMatType], Ret::Bound);
    def("inverse", vec![GenMatType], Ret::Bound);
    def("determinant", vec![GenMatType], Ret::Concrete(Type::FLOAT));
    def("outerProduct", vec![v4(), v4()], Ret::Concrete(Type::Matrix(4)));
    def("outerProduct", vec![v3(), v3()], Ret::Concrete(Type::Matrix(3)));
    def("outerProduct", vec![v2(), v2()], Ret::Concrete(Type::Matrix(2)));

    for name in ["lessThan", "lessThanEqual", "greaterThan", "greaterThanEqual"] {
        def(name, vec![Param::Vec, Param::Vec], Ret::BoolOfBound);
        def(name, vec![IVec, IVec], Ret::BoolOfBound);
    }
    for name in ["equal", "notEqual"] {
        def(name, vec![Param::Vec, Param::Vec], Ret::BoolOfBound);
        def(name, vec![IVec, IVec], Ret::BoolOfBound);
        def(name, vec![BVec, BVec], Ret::BoolOfBound);
    }
    def("any", vec![BVec], Ret::Concrete(Type::BOOL));
    def("all", vec![BVec], Ret::Concrete(Type::BOOL));
    def("not", vec![BVec], Ret::Bound);

    let s2d = || sampler(TokenKind::Sampler2D);
    let scube = || sampler(TokenKind::SamplerCube);
    let s3d = || sampler(TokenKind::Sampler3D);
    let s2da = || sampler(TokenKind::Sampler2DArray);
    let sample = || Ret::Concrete(Type::vec(4));

    // legacy spellings
    def("texture2D", vec![s2d(), v2()], sample());
    def("texture2D", vec![s2d(), v2(), float()], sample());
    def("texture2DProj", vec![s2d(), v3()], sample());
    def("texture2DProj", vec![s2d(), v4()], sample());
    def("texture2DProj", vec![s2d(), v3(), float()], sample());
    def("texture2DProj", vec![s2d(), v4(), float()], sample());
    for name in ["texture2DLod", "texture2DLodEXT"] {
        def(name, vec![s2d(), v2(), float()], sample());
    }
    for name in ["texture2DProjLod", "texture2DProjLodEXT"] {
        def(name, vec![s2d(), v3(), float()], sample());
        def(name, vec![s2d(), v4(), float()], sample());
    }
    def("texture2DGradEXT", vec![s2d(), v2(), v2(), v2()], sample());
    def("textureCube", vec![scube(), v3()], sample());
    def("textureCube", vec![scube(), v3(), float()], sample());
    for name in ["textureCubeLod", "textureCubeLodEXT"] {
        def(name, vec![scube(), v3(), float()], sample());
    }
    def("textureCubeGradEXT", vec![scube(), v3(), v3(), v3()], sample());

    // unified spellings
    def("texture", vec![s2d(), v2()], sample());
    def("texture", vec![s2d(), v2(), float()], sample());
    def("texture", vec![scube(), v3()], sample());
    def("texture", vec![scube(), v3(), float()], sample());
    def("texture", vec![s3d(), v3()], sample());
    def("texture", vec![s2da(), v3()], sample());
    def(
        "texture",
        vec![sampler(TokenKind::Sampler2DShadow), v3()],
        Ret::Concrete(Type::FLOAT),
    );
    def(
        "texture",
        vec![sampler(TokenKind::SamplerCubeShadow), v4()],
        Ret::Concrete(Type::FLOAT),
    );
    def("textureLod", vec![s2d(), v2(), float()], sample());
    def("textureLod", vec![scube(), v3(), float()], sample());
    def("textureLod", vec![s3d(), v3(), float()], sample());
    def("textureLod", vec![s2da(), v3(), float()], sample());
    def("textureProj", vec![s2d(), v3()], sample());
    def("textureProj", vec![s2d(), v4()], sample());
    def("textureProjLod", vec![s2d(), v3(), float()], sample());
    def("textureProjLod", vec![s2d(), v4(), float()], sample());
    def("textureGrad", vec![s2d(), v2(), v2(), v2()], sample());
    def("textureGrad", vec![scube(), v3(), v3(), v3()], sample());
    def("textureSize", vec![s2d(), int()], Ret::Concrete(Type::Vector(Scalar::Int, 2)));
    def("textureSize", vec![scube(), int()], Ret::Concrete(Type::Vector(Scalar::Int, 2)));
    def("texelFetch", vec![s2d(), iv2(), int()], sample());
    def("texelFetch", vec![s3d(), iv3(), int()], sample());

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_binds_to_first_concrete_argument() {
        assert_eq!(
            resolve_builtin("mix", &[Type::vec(3), Type::vec(3), Type::FLOAT]),
            Ok(Type::vec(3))
        );
        assert_eq!(
            resolve_builtin("mix", &[Type::vec(3), Type::vec(2), Type::FLOAT]),
            Err(true)
        );
        assert_eq!(resolve_builtin("dot", &[Type::vec(4), Type::vec(4)]), Ok(Type::FLOAT));
        assert_eq!(resolve_builtin("nope", &[]), Err(false));
    }

    #[test]
    fn derived_return_types() {
        assert_eq!(
            resolve_builtin("lessThan", &[Type::vec(3), Type::vec(3)]),
            Ok(Type::Vector(Scalar::Bool, 3))
        );
        assert_eq!(resolve_builtin("isnan", &[Type::FLOAT]), Ok(Type::BOOL));
        assert_eq!(
            resolve_builtin("floatBitsToInt", &[Type::vec(2)]),
            Ok(Type::Vector(Scalar::Int, 2))
        );
    }

    #[test]
    fn any_arguments_match_and_leave_result_open() {
        assert_eq!(resolve_builtin("normalize", &[Type::Any]), Ok(Type::Any));
        // the first concrete argument binds the placeholder
        assert_eq!(
            resolve_builtin("clamp", &[Type::Any, Type::FLOAT, Type::FLOAT]),
            Ok(Type::FLOAT)
        );
        assert_eq!(
            resolve_builtin("texture2D", &[Type::Any, Type::vec(2)]),
            Ok(Type::vec(4))
        );
    }

    #[test]
    fn texture_overloads_pick_by_sampler() {
        let cube = Type::Sampler(TokenKind::SamplerCube);
        assert_eq!(resolve_builtin("texture", &[cube.clone(), Type::vec(3)]), Ok(Type::vec(4)));
        assert_eq!(resolve_builtin("texture", &[cube, Type::vec(2)]), Err(true));
        let shadow = Type::Sampler(TokenKind::Sampler2DShadow);
        assert_eq!(resolve_builtin("texture", &[shadow, Type::vec(3)]), Ok(Type::FLOAT));
    }
}
