//! Schema model and resolver for bufgen.
//!
//! A [`SchemaSource`] is the already-parsed declaration set of one schema
//! snapshot (structs, tagged unions, generic declarations, RPC methods, routing
//! and constants). [`resolve`] validates it and produces an immutable
//! [`Schema`] in which every type reference is bound and every generic
//! instantiation in use has exactly one [`TypeId`].

pub mod config;
pub mod error;
pub mod naming;
pub mod resolver;
pub mod schema;
pub mod source;
pub mod types;

pub use config::ResolverConfig;
pub use error::{Result, SchemaError};
pub use resolver::{
    resolve, Resolver, COMMANDS_BUFFER_ADDRESS_TYPE, GENERATED_MODULES, GROUP_ADDRESS_TYPE,
};
pub use schema::{
    FieldName, ResolvedArg, ResolvedCommand, ResolvedCommandBuffer, ResolvedEnum, ResolvedField,
    ResolvedGroup, ResolvedKind, ResolvedMethod, ResolvedStruct, ResolvedType, ResolvedVariant,
    Routing, Schema, TypeId,
};
pub use source::{
    ArgDecl, CommandDecl, ConstBlock, ConstItem, ConstValue, Decl, EnumDecl, FieldDecl,
    MethodDecl, MethodKind, RoutingDecl, SchemaSource, StructDecl, SurfaceDecl, VariantDecl,
};
pub use types::{Primitive, TypeRef};
