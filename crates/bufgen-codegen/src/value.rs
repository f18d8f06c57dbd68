//! Schema-shaped dynamic values.

use bufgen_schema::Primitive;

/// A decoded instance of any resolved type.
///
/// Struct and variant payloads hold their fields in declaration order; field
/// names live in the codec tables, not in the value.
#[derive(Debug, Clone)]
pub enum Value {
    U8(u8),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Optional(Option<Box<Value>>),
    Collection(Vec<Value>),
    Struct(Vec<Value>),
    Enum { discriminant: u32, fields: Vec<Value> },
}

impl Value {
    /// Canonical default of a primitive.
    pub fn zero(primitive: Primitive) -> Self {
        match primitive {
            Primitive::U8 => Value::U8(0),
            Primitive::I32 => Value::I32(0),
            Primitive::I64 => Value::I64(0),
            Primitive::U32 => Value::U32(0),
            Primitive::U64 => Value::U64(0),
            Primitive::F32 => Value::F32(0.0),
            Primitive::F64 => Value::F64(0.0),
            Primitive::Bool => Value::Bool(false),
            Primitive::String => Value::String(String::new()),
        }
    }

    /// Short shape name used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::U8(_) => "u8",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::String(_) => "String",
            Value::Optional(_) => "optional",
            Value::Collection(_) => "collection",
            Value::Struct(_) => "struct",
            Value::Enum { .. } => "enum",
        }
    }

    pub fn some(value: Value) -> Self {
        Value::Optional(Some(Box::new(value)))
    }

    pub fn none() -> Self {
        Value::Optional(None)
    }

    /// Unit variant with the given discriminant.
    pub fn unit(discriminant: u32) -> Self {
        Value::Enum {
            discriminant,
            fields: Vec::new(),
        }
    }

    pub(crate) fn primitive_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value as Json;

        let json = match self {
            Value::U8(v) => Json::from(*v),
            Value::I32(v) => Json::from(*v),
            Value::I64(v) => Json::from(*v),
            Value::U32(v) => Json::from(*v),
            Value::U64(v) => Json::from(*v),
            Value::F32(v) => float_json(f64::from(*v)),
            Value::F64(v) => float_json(*v),
            Value::Bool(v) => Json::Bool(*v),
            Value::String(v) => Json::String(v.clone()),
            _ => return None,
        };
        Some(json)
    }
}

// NaN and infinities have no JSON number form.
fn float_json(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Floats compare by bit pattern, so `NaN == NaN` and `0.0 != -0.0`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Optional(a), Value::Optional(b)) => a == b,
            (Value::Collection(a), Value::Collection(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (
                Value::Enum {
                    discriminant: a,
                    fields: fa,
                },
                Value::Enum {
                    discriminant: b,
                    fields: fb,
                },
            ) => a == b && fa == fb,
            _ => false,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )+
    };
}

value_from!(
    u8 => U8,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => String,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}
