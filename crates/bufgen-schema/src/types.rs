//! Type expressions as written in schema sources.
//!
//! A type expression is a compact string such as `Vec<Option<String>>` or
//! `LinearTable<f32, Test>`. `Vec` and `Option` are the built-in collection and
//! optional constructors; primitive names are reserved; anything else names a
//! declaration or, inside a generic declaration, one of its type parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Built-in collection constructor name.
pub const COLLECTION: &str = "Vec";

/// Built-in optional constructor name.
pub const OPTIONAL: &str = "Option";

/// Fixed-shape wire primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    U8,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    Bool,
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 9] = [
        Primitive::U8,
        Primitive::I32,
        Primitive::I64,
        Primitive::U32,
        Primitive::U64,
        Primitive::F32,
        Primitive::F64,
        Primitive::Bool,
        Primitive::String,
    ];

    /// Look up a primitive by its schema name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Schema name, which is also the Rust type name.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::U8 => "u8",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Bool => "bool",
            Primitive::String => "String",
        }
    }

    /// Encoded width, or `None` for length-prefixed strings.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Primitive::U8 | Primitive::Bool => Some(1),
            Primitive::I32 | Primitive::U32 | Primitive::F32 => Some(4),
            Primitive::I64 | Primitive::U64 | Primitive::F64 => Some(8),
            Primitive::String => None,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Primitive::U8 | Primitive::I32 | Primitive::I64 | Primitive::U32 | Primitive::U64
        )
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// True for names a declaration or type parameter may not take.
pub fn is_reserved(name: &str) -> bool {
    name == COLLECTION || name == OPTIONAL || Primitive::from_name(name).is_some()
}

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Primitive(Primitive),
    Optional(Box<TypeRef>),
    Collection(Box<TypeRef>),
    Named { name: String, args: Vec<TypeRef> },
}

impl TypeRef {
    /// Reference to a declaration or type parameter without arguments.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Visit every named reference in this expression, outermost first.
    pub fn for_each_named<'a>(&'a self, visit: &mut impl FnMut(&'a str, &'a [TypeRef])) {
        match self {
            TypeRef::Primitive(_) => {}
            TypeRef::Optional(inner) | TypeRef::Collection(inner) => inner.for_each_named(visit),
            TypeRef::Named { name, args } => {
                visit(name, args);
                for arg in args {
                    arg.for_each_named(visit);
                }
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => write!(f, "{p}"),
            TypeRef::Optional(inner) => write!(f, "{OPTIONAL}<{inner}>"),
            TypeRef::Collection(inner) => write!(f, "{COLLECTION}<{inner}>"),
            TypeRef::Named { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for TypeRef {
    type Err = SchemaError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            src: expr.as_bytes(),
            pos: 0,
        };
        let parsed = parser.parse_expr().and_then(|ty| {
            parser.skip_ws();
            if parser.pos == parser.src.len() {
                Ok(ty)
            } else {
                Err(format!("unexpected input at offset {}", parser.pos))
            }
        });
        parsed.map_err(|reason| SchemaError::InvalidTypeExpr {
            expr: expr.to_string(),
            reason,
        })
    }
}

impl TryFrom<String> for TypeRef {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, punct: u8) -> bool {
        self.skip_ws();
        if self.src.get(self.pos) == Some(&punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.src.len()
            && (self.src[self.pos].is_ascii_alphanumeric() || self.src[self.pos] == b'_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("expected identifier at offset {start}"));
        }
        if self.src[start].is_ascii_digit() {
            return Err(format!("identifier may not start with a digit at offset {start}"));
        }
        // Only ASCII bytes were consumed.
        Ok(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn parse_expr(&mut self) -> Result<TypeRef, String> {
        let name = self.ident()?;
        let mut args = Vec::new();
        if self.eat(b'<') {
            args.push(self.parse_expr()?);
            while self.eat(b',') {
                args.push(self.parse_expr()?);
            }
            if !self.eat(b'>') {
                return Err(format!("expected `>` at offset {}", self.pos));
            }
        }
        build(name, args)
    }
}

fn build(name: String, mut args: Vec<TypeRef>) -> Result<TypeRef, String> {
    if let Some(primitive) = Primitive::from_name(&name) {
        if !args.is_empty() {
            return Err(format!("primitive `{name}` takes no type arguments"));
        }
        return Ok(TypeRef::Primitive(primitive));
    }
    if name == COLLECTION || name == OPTIONAL {
        if args.len() != 1 {
            return Err(format!("`{name}` takes exactly one type argument"));
        }
        let inner = Box::new(args.remove(0));
        return Ok(if name == COLLECTION {
            TypeRef::Collection(inner)
        } else {
            TypeRef::Optional(inner)
        });
    }
    Ok(TypeRef::Named { name, args })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(expr: &str) -> TypeRef {
        expr.parse().unwrap()
    }

    #[test]
    fn parses_nested_builtins() {
        assert_eq!(
            parse("Vec<Option<String>>"),
            TypeRef::Collection(Box::new(TypeRef::Optional(Box::new(
                TypeRef::Primitive(Primitive::String)
            ))))
        );
    }

    #[test]
    fn parses_generic_reference() {
        assert_eq!(
            parse("LinearTable< f32 ,Test >"),
            TypeRef::Named {
                name: "LinearTable".into(),
                args: vec![TypeRef::Primitive(Primitive::F32), TypeRef::named("Test")],
            }
        );
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(
            parse("LinearTable<Vec<u8>,Option<T>>").to_string(),
            "LinearTable<Vec<u8>, Option<T>>"
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expr in ["", "Vec", "Vec<u8, u8>", "u8<i32>", "Table<", "Table<>", "1abc", "A B"] {
            assert!(
                matches!(
                    expr.parse::<TypeRef>(),
                    Err(SchemaError::InvalidTypeExpr { .. })
                ),
                "{expr} should not parse"
            );
        }
    }

    #[test]
    fn serde_uses_expression_strings() {
        let ty: TypeRef = serde_json::from_str("\"Option<Vec2>\"").unwrap();
        assert_eq!(ty, TypeRef::Optional(Box::new(TypeRef::named("Vec2"))));
        assert_eq!(serde_json::to_string(&ty).unwrap(), "\"Option<Vec2>\"");
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved("Vec"));
        assert!(is_reserved("f64"));
        assert!(!is_reserved("Vec2"));
    }
}
