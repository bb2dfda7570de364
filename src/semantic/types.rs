// src/semantic/types.rs
// Static types of the kernel dialect and the GLSL operator typing rules.

use std::fmt;

use crate::lexer::TokenKind;

/// Component type of scalars, vectors and matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Int,
    Uint,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Wildcard for expressions whose type could not be deduced. Compatible with everything.
    Any,
    Void,
    Scalar(Scalar),
    /// Vector of 2..=4 components.
    Vector(Scalar, u8),
    /// Square float matrix of dimension 2..=4.
    Matrix(u8),
    /// Sampler type, identified by its keyword.
    Sampler(TokenKind),
    Struct(String),
    Array(Box<Type>),
}

impl Type {
    pub const BOOL: Type = Type::Scalar(Scalar::Bool);
    pub const INT: Type = Type::Scalar(Scalar::Int);
    pub const UINT: Type = Type::Scalar(Scalar::Uint);
    pub const FLOAT: Type = Type::Scalar(Scalar::Float);

    pub fn vec(n: u8) -> Type {
        Type::Vector(Scalar::Float, n)
    }

    /// Scalar when `n == 1`, vector otherwise.
    pub fn of_components(base: Scalar, n: u8) -> Type {
        if n == 1 {
            Type::Scalar(base)
        } else {
            Type::Vector(base, n)
        }
    }

    pub fn from_keyword(kind: TokenKind) -> Option<Type> {
        use TokenKind as K;
        Some(match kind {
            K::Void => Type::Void,
            K::Bool => Type::BOOL,
            K::Int => Type::INT,
            K::Uint => Type::UINT,
            K::Float => Type::FLOAT,
            K::Vec2 => Type::Vector(Scalar::Float, 2),
            K::Vec3 => Type::Vector(Scalar::Float, 3),
            K::Vec4 => Type::Vector(Scalar::Float, 4),
            K::Ivec2 => Type::Vector(Scalar::Int, 2),
            K::Ivec3 => Type::Vector(Scalar::Int, 3),
            K::Ivec4 => Type::Vector(Scalar::Int, 4),
            K::Uvec2 => Type::Vector(Scalar::Uint, 2),
            K::Uvec3 => Type::Vector(Scalar::Uint, 3),
            K::Uvec4 => Type::Vector(Scalar::Uint, 4),
            K::Bvec2 => Type::Vector(Scalar::Bool, 2),
            K::Bvec3 => Type::Vector(Scalar::Bool, 3),
            K::Bvec4 => Type::Vector(Scalar::Bool, 4),
            K::Mat2 => Type::Matrix(2),
            K::Mat3 => Type::Matrix(3),
            K::Mat4 => Type::Matrix(4),
            k if k.is_builtin_type() => Type::Sampler(k),
            _ => return None,
        })
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    /// Component scalar of scalars, vectors and matrices.
    pub fn scalar(&self) -> Option<Scalar> {
        match self {
            Type::Scalar(s) | Type::Vector(s, _) => Some(*s),
            Type::Matrix(_) => Some(Scalar::Float),
            _ => None,
        }
    }

    /// Number of scalar components (matrices count every cell).
    pub fn component_count(&self) -> Option<u8> {
        match self {
            Type::Scalar(_) => Some(1),
            Type::Vector(_, n) => Some(*n),
            Type::Matrix(n) => Some(n * n),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.scalar().is_some_and(|s| s != Scalar::Bool)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Scalar(Scalar::Int | Scalar::Uint) | Type::Vector(Scalar::Int | Scalar::Uint, _))
    }

    pub fn is_bool_scalar(&self) -> bool {
        matches!(self, Type::Any | Type::Scalar(Scalar::Bool))
    }

    pub fn struct_name(&self) -> Option<&str> {
        match self {
            Type::Struct(name) => Some(name),
            _ => None,
        }
    }

    /// Assignment/argument compatibility. `Any` on either side always matches.
    pub fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Array(a), Type::Array(b)) => a.compatible(b),
            (a, b) => a == b,
        }
    }

    /// Type produced by `value[i]`.
    pub fn index(&self) -> Option<Type> {
        match self {
            Type::Any => Some(Type::Any),
            Type::Vector(s, _) => Some(Type::Scalar(*s)),
            Type::Matrix(n) => Some(Type::vec(*n)),
            Type::Array(elem) => Some((**elem).clone()),
            _ => None,
        }
    }

    /// Type produced by a swizzle such as `.xy` or `.rgba`; `None` when invalid.
    pub fn swizzle(&self, field: &str) -> Option<Type> {
        let Type::Vector(base, n) = self else {
            return None;
        };
        const SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];
        if field.is_empty() || field.len() > 4 {
            return None;
        }
        let set = SETS.iter().find(|set| field.chars().all(|c| set.contains(c)))?;
        for c in field.chars() {
            let pos = set.find(c)?;
            if pos >= *n as usize {
                return None;
            }
        }
        Some(Type::of_components(*base, field.len() as u8))
    }

    /// Result of the binary operator `op` (spelled as in source) applied to `lhs` and `rhs`.
    pub fn binary(op: &str, lhs: &Type, rhs: &Type) -> Option<Type> {
        if lhs.is_any() || rhs.is_any() {
            let known = if lhs.is_any() { rhs } else { lhs };
            return Some(match (op, known) {
                ("<" | ">" | "<=" | ">=" | "==" | "!=" | "&&" | "||" | "^^", _) => Type::BOOL,
                ("<<" | ">>", _) if !lhs.is_any() => lhs.clone(),
                // A scalar or matrix operand can widen to whatever the unknown side is.
                (_, Type::Vector(..)) => known.clone(),
                ("+" | "-" | "/", Type::Matrix(_)) => known.clone(),
                _ => Type::Any,
            });
        }
        match op {
            "+" | "-" | "*" | "/" => arithmetic(op, lhs, rhs),
            "%" | "&" | "|" | "^" => {
                if lhs.is_integer() && rhs.is_integer() {
                    componentwise(lhs, rhs)
                } else {
                    None
                }
            }
            "<<" | ">>" => {
                if lhs.is_integer() && rhs.is_integer() {
                    Some(lhs.clone())
                } else {
                    None
                }
            }
            "<" | ">" | "<=" | ">=" => match (lhs, rhs) {
                (Type::Scalar(a), Type::Scalar(b)) if a == b && *a != Scalar::Bool => Some(Type::BOOL),
                _ => None,
            },
            "==" | "!=" => {
                if lhs == rhs && !matches!(lhs, Type::Sampler(_) | Type::Void) {
                    Some(Type::BOOL)
                } else {
                    None
                }
            }
            "&&" | "||" | "^^" => {
                if *lhs == Type::BOOL && *rhs == Type::BOOL {
                    Some(Type::BOOL)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Result of a prefix operator (`-`, `+`, `!`, `~`, `++`, `--`).
    pub fn unary(op: &str, operand: &Type) -> Option<Type> {
        if operand.is_any() {
            return Some(Type::Any);
        }
        let ok = match op {
            "-" | "+" | "++" | "--" => operand.is_numeric(),
            "!" => *operand == Type::BOOL,
            "~" => operand.is_integer(),
            _ => false,
        };
        ok.then(|| operand.clone())
    }
}

fn arithmetic(op: &str, lhs: &Type, rhs: &Type) -> Option<Type> {
    if op == "*" {
        match (lhs, rhs) {
            (Type::Matrix(a), Type::Vector(Scalar::Float, b))
            | (Type::Vector(Scalar::Float, b), Type::Matrix(a))
                if a == b =>
            {
                return Some(Type::vec(*a));
            }
            (Type::Matrix(a), Type::Matrix(b)) if a == b => return Some(Type::Matrix(*a)),
            _ => {}
        }
    }
    if !lhs.is_numeric() || !rhs.is_numeric() {
        return None;
    }
    componentwise(lhs, rhs)
}

// Same type, or a scalar paired with a vector/matrix of the same component type.
fn componentwise(lhs: &Type, rhs: &Type) -> Option<Type> {
    if lhs == rhs {
        return Some(lhs.clone());
    }
    match (lhs, rhs) {
        (Type::Scalar(s), other) | (other, Type::Scalar(s)) if other.scalar() == Some(*s) => {
            Some(other.clone())
        }
        _ => None,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("<any>"),
            Type::Void => f.write_str("void"),
            Type::Scalar(s) => f.write_str(match s {
                Scalar::Bool => "bool",
                Scalar::Int => "int",
                Scalar::Uint => "uint",
                Scalar::Float => "float",
            }),
            Type::Vector(s, n) => {
                let prefix = match s {
                    Scalar::Bool => "b",
                    Scalar::Int => "i",
                    Scalar::Uint => "u",
                    Scalar::Float => "",
                };
                write!(f, "{prefix}vec{n}")
            }
            Type::Matrix(n) => write!(f, "mat{n}"),
            Type::Sampler(k) => f.write_str(k.text()),
            Type::Struct(name) => f.write_str(name),
            Type::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_types_round_trip_through_display() {
        for &k in TokenKind::ALL.iter().filter(|k| k.is_builtin_type()) {
            let ty = Type::from_keyword(k).unwrap();
            assert_eq!(ty.to_string(), k.text());
        }
        assert_eq!(Type::from_keyword(TokenKind::Ident), None);
    }

    #[test]
    fn swizzles_respect_arity_and_sets() {
        let v3 = Type::vec(3);
        assert_eq!(v3.swizzle("xy"), Some(Type::vec(2)));
        assert_eq!(v3.swizzle("z"), Some(Type::FLOAT));
        assert_eq!(v3.swizzle("rgb"), Some(Type::vec(3)));
        assert_eq!(v3.swizzle("w"), None);
        assert_eq!(v3.swizzle("xg"), None);
        assert_eq!(v3.swizzle("xxxxx"), None);
        assert_eq!(Type::FLOAT.swizzle("x"), None);
    }

    #[test]
    fn arithmetic_follows_component_rules() {
        let v4 = Type::vec(4);
        assert_eq!(Type::binary("*", &Type::Matrix(4), &v4), Some(v4.clone()));
        assert_eq!(Type::binary("*", &v4, &Type::Matrix(4)), Some(v4.clone()));
        assert_eq!(Type::binary("*", &Type::Matrix(3), &v4), None);
        assert_eq!(Type::binary("+", &v4, &Type::FLOAT), Some(v4.clone()));
        assert_eq!(Type::binary("+", &v4, &Type::INT), None);
        assert_eq!(Type::binary("+", &v4, &Type::vec(3)), None);
        assert_eq!(Type::binary("%", &Type::INT, &Type::INT), Some(Type::INT));
        assert_eq!(Type::binary("%", &Type::FLOAT, &Type::FLOAT), None);
        assert_eq!(Type::binary("<", &Type::FLOAT, &Type::FLOAT), Some(Type::BOOL));
        assert_eq!(Type::binary("<", &v4, &v4), None);
        assert_eq!(Type::binary("==", &v4, &v4), Some(Type::BOOL));
        assert_eq!(Type::binary("&&", &Type::BOOL, &Type::INT), None);
    }

    #[test]
    fn any_is_a_wildcard() {
        assert!(Type::Any.compatible(&Type::vec(2)));
        assert!(Type::Struct("S".into()).compatible(&Type::Any));
        assert_eq!(Type::binary("+", &Type::Any, &Type::vec(2)), Some(Type::vec(2)));
        assert_eq!(Type::binary("*", &Type::vec(3), &Type::Any), Some(Type::vec(3)));
        assert_eq!(Type::binary("*", &Type::Any, &Type::FLOAT), Some(Type::Any));
        assert_eq!(Type::binary("*", &Type::Matrix(4), &Type::Any), Some(Type::Any));
        assert_eq!(Type::binary("+", &Type::Matrix(4), &Type::Any), Some(Type::Matrix(4)));
        assert_eq!(Type::binary("<<", &Type::INT, &Type::Any), Some(Type::INT));
        assert_eq!(Type::binary("<", &Type::Any, &Type::vec(2)), Some(Type::BOOL));
        assert_eq!(Type::unary("-", &Type::Any), Some(Type::Any));
    }

    #[test]
    fn indexing() {
        assert_eq!(Type::Matrix(3).index(), Some(Type::vec(3)));
        assert_eq!(Type::Vector(Scalar::Int, 2).index(), Some(Type::INT));
        assert_eq!(Type::Array(Box::new(Type::vec(4))).index(), Some(Type::vec(4)));
        assert_eq!(Type::FLOAT.index(), None);
    }
}
