/// Errors raised while loading or resolving a schema snapshot.
///
/// Every variant is fatal for generation: no partial schema is produced.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema source could not be read.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema source exceeds the configured size limit.
    #[error("schema source too large ({size} bytes, max {max})")]
    SourceTooLarge { size: u64, max: usize },

    /// The schema source is not valid JSON for the expected shape.
    #[error("schema source is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A type expression string could not be parsed.
    #[error("invalid type expression `{expr}`: {reason}")]
    InvalidTypeExpr { expr: String, reason: String },

    /// A type reference names no declaration, primitive or type parameter.
    #[error("unknown type `{name}` referenced from {context}")]
    UnknownType { name: String, context: String },

    /// Two declarations share a name.
    #[error("duplicate type `{0}`")]
    DuplicateType(String),

    /// A declaration or type parameter uses a built-in type name.
    #[error("`{0}` is a reserved type name")]
    ReservedName(String),

    /// Two fields of one struct, variant, method or command share a name.
    #[error("duplicate field `{field}` in {owner}")]
    DuplicateField { owner: String, field: String },

    /// Two variants of one enum share a name.
    #[error("duplicate variant `{variant}` in enum {enum_name}")]
    DuplicateVariant { enum_name: String, variant: String },

    /// Two variants of one enum share a discriminant.
    #[error("duplicate discriminant {value} in enum {enum_name} ({first} and {second})")]
    DuplicateDiscriminant {
        enum_name: String,
        value: u32,
        first: String,
        second: String,
    },

    /// An enum declares no variant as its default.
    #[error("enum {0} has no default variant")]
    MissingDefault(String),

    /// An enum declares more than one default variant.
    #[error("enum {enum_name} has multiple default variants ({first} and {second})")]
    MultipleDefaults {
        enum_name: String,
        first: String,
        second: String,
    },

    /// An enum declares no variants.
    #[error("enum {0} has no variants")]
    EmptyEnum(String),

    /// A generic declaration never uses one of its type parameters.
    #[error("type parameter `{param}` of {decl} is never used")]
    UnusedParameter { decl: String, param: String },

    /// A generic reference supplies the wrong number of type arguments.
    #[error("type `{name}` expects {expected} type arguments, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Generic instantiation nests deeper than the configured bound.
    #[error("instantiating `{name}` exceeds max depth {max}")]
    InstantiationTooDeep { name: String, max: usize },

    /// Two RPC methods share a name.
    #[error("duplicate method `{0}`")]
    DuplicateMethod(String),

    /// Two RPC methods share a method id within the scope.
    #[error("duplicate method id {id} ({first} and {second})")]
    DuplicateMethodId { id: u32, first: String, second: String },

    /// A `read` method does not have the shape of a stream producer.
    #[error("stream method `{name}` {reason}")]
    InvalidStreamMethod { name: String, reason: String },

    /// Two names map to the same identifier in generated code.
    #[error("{kind} `{first}` and `{second}` both become `{ident}`")]
    IdentifierCollision {
        kind: &'static str,
        first: String,
        second: String,
        ident: String,
    },

    /// Two routing entries share a name.
    #[error("duplicate {kind} `{name}`")]
    DuplicateRoute { kind: &'static str, name: String },

    /// A constant's value does not fit its declared type.
    #[error("invalid constant `{name}`: {reason}")]
    InvalidConst { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
