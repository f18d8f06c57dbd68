//! Resolved, immutable schema IR.

use std::collections::BTreeMap;
use std::fmt;

use crate::source::{ConstBlock, Decl, MethodKind};
use crate::types::Primitive;

/// Index of a resolved type within its [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Field label: a name, or a symbolic position for tuple-like payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldName {
    Named(String),
    Positional(u32),
}

impl FieldName {
    /// Identifier used for generated bindings (`p8` for position 8).
    pub fn binding(&self) -> String {
        match self {
            FieldName::Named(name) => name.clone(),
            FieldName::Positional(position) => format!("p{position}"),
        }
    }

    pub fn is_positional(&self) -> bool {
        matches!(self, FieldName::Positional(_))
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldName::Named(name) => f.write_str(name),
            FieldName::Positional(position) => write!(f, "{position}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub name: FieldName,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStruct {
    /// Declaration this struct was instantiated from.
    pub decl: String,
    /// Concrete type arguments; empty for non-generic declarations.
    pub args: Vec<TypeId>,
    pub fields: Vec<ResolvedField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariant {
    pub name: String,
    pub discriminant: u32,
    pub fields: Vec<ResolvedField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnum {
    pub decl: String,
    pub args: Vec<TypeId>,
    pub variants: Vec<ResolvedVariant>,
    /// Index into `variants` of the declared default.
    pub default_index: usize,
}

impl ResolvedEnum {
    pub fn variant_by_discriminant(&self, discriminant: u32) -> Option<&ResolvedVariant> {
        self.variants
            .iter()
            .find(|variant| variant.discriminant == discriminant)
    }

    pub fn default_variant(&self) -> &ResolvedVariant {
        &self.variants[self.default_index]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKind {
    Primitive(Primitive),
    Optional(TypeId),
    Collection(TypeId),
    Struct(ResolvedStruct),
    Enum(ResolvedEnum),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub id: TypeId,
    /// Canonical display name, e.g. `LinearTable<f32, Test>`.
    pub name: String,
    pub kind: ResolvedKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArg {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMethod {
    pub name: String,
    pub id: u32,
    pub kind: MethodKind,
    pub args: Vec<ResolvedArg>,
    pub ret: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    pub name: String,
    pub address: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommandBuffer {
    pub surface: String,
    pub name: String,
    pub address: u64,
}

impl ResolvedCommandBuffer {
    /// Constant name, e.g. `WIN1_MAIN_RENDER`.
    pub fn const_name(&self) -> String {
        format!("{}_{}", self.surface, self.name).to_ascii_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub name: String,
    pub opcode: u64,
    pub fields: Vec<ResolvedField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routing {
    pub groups: Vec<ResolvedGroup>,
    pub command_buffers: Vec<ResolvedCommandBuffer>,
    pub commands: Vec<ResolvedCommand>,
}

/// A fully resolved schema snapshot.
///
/// Built once by the resolver and never mutated.
#[derive(Debug, Clone)]
pub struct Schema {
    pub scope_id: String,
    /// Validated declarations, in source order.
    pub decls: Vec<Decl>,
    /// Every resolved type, indexed by [`TypeId`].
    pub types: Vec<ResolvedType>,
    pub methods: Vec<ResolvedMethod>,
    pub routing: Routing,
    pub consts: Vec<ConstBlock>,
    pub(crate) by_name: BTreeMap<String, TypeId>,
}

impl Schema {
    pub fn get(&self, id: TypeId) -> Option<&ResolvedType> {
        self.types.get(id.index())
    }

    /// Look up a resolved type by canonical name (`Vec2`, `Option<Vec2>`,
    /// `LinearTable<f32, Test>`).
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn decl(&self, name: &str) -> Option<&Decl> {
        self.decls.iter().find(|decl| decl.name() == name)
    }

    pub fn method(&self, name: &str) -> Option<&ResolvedMethod> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Name of a resolved type, or its id if the index is out of range.
    pub fn type_name(&self, id: TypeId) -> String {
        self.get(id)
            .map(|ty| ty.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
