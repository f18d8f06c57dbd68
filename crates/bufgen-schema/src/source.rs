//! Raw, unresolved declarations as read from a schema source document.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::{Result, SchemaError};
use crate::schema::FieldName;
use crate::types::TypeRef;

/// One schema snapshot: declarations, RPC methods, routing and constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSource {
    /// Opaque, stable identifier of the RPC scope these methods live in.
    pub scope_id: String,
    #[serde(default)]
    pub types: Vec<Decl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub routing: RoutingDecl,
    #[serde(default)]
    pub consts: Vec<ConstBlock>,
}

impl SchemaSource {
    /// Parse a schema source from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a schema source from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_path_with_config(path, &ResolverConfig::default())
    }

    /// Load a schema source from a JSON file, bounded by `config.max_source_size`.
    pub fn from_path_with_config(path: &Path, config: &ResolverConfig) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;
        let size = file
            .metadata()
            .map_err(|err| SchemaError::LoadFailed(err.to_string()))?
            .len();
        if size > config.max_source_size as u64 {
            return Err(SchemaError::SourceTooLarge {
                size,
                max: config.max_source_size,
            });
        }

        let read_limit = u64::try_from(config.max_source_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;
        if content.len() > config.max_source_size {
            return Err(SchemaError::SourceTooLarge {
                size: content.len() as u64,
                max: config.max_source_size,
            });
        }

        debug!(path = %path.display(), bytes = content.len(), "loaded schema source");
        Self::from_json(&content)
    }
}

/// A named type declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decl {
    Struct(StructDecl),
    Enum(EnumDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Struct(decl) => &decl.name,
            Decl::Enum(decl) => &decl.name,
        }
    }

    pub fn params(&self) -> &[String] {
        match self {
            Decl::Struct(decl) => &decl.params,
            Decl::Enum(decl) => &decl.params,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.params().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    /// Type parameter names, for generic declarations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// A struct, variant or command field.
///
/// Unnamed fields are positional; `position` only feeds documentation and
/// generated binding names and defaults to the field's index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl FieldDecl {
    pub fn named(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: Some(name.into()),
            position: None,
            ty,
        }
    }

    pub fn positional(ty: TypeRef) -> Self {
        Self {
            name: None,
            position: None,
            ty,
        }
    }

    /// Resolved label of the field at `index` in its owner's field list.
    pub fn label(&self, index: usize) -> FieldName {
        match &self.name {
            Some(name) => FieldName::Named(name.clone()),
            None => FieldName::Positional(self.position.unwrap_or(index as u32)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    pub variants: Vec<VariantDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDecl {
    pub name: String,
    /// Stable wire tag; never derived from declaration order.
    pub discriminant: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// How a remote method executes and which routing group carries it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Blocking request/response.
    #[default]
    Sync,
    /// Request/response completed off the caller's thread.
    Async,
    /// Argument-free stream producer; pushes values to subscribers.
    Read,
}

impl MethodKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MethodKind::Sync => "sync",
            MethodKind::Async => "async",
            MethodKind::Read => "read",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub args: Vec<ArgDecl>,
    /// Return type; `None` means the call returns after dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret: Option<TypeRef>,
    #[serde(default)]
    pub kind: MethodKind,
    /// Explicit method id; otherwise assigned sequentially.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// Routing namespace declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecl {
    /// Group names in id order.
    #[serde(default = "default_groups")]
    pub groups: Vec<String>,
    /// Command buffers per rendering surface.
    #[serde(default)]
    pub surfaces: Vec<SurfaceDecl>,
    /// Draw/render commands in opcode order. Append-only across versions.
    #[serde(default)]
    pub commands: Vec<CommandDecl>,
}

impl Default for RoutingDecl {
    fn default() -> Self {
        Self {
            groups: default_groups(),
            surfaces: Vec::new(),
            commands: Vec::new(),
        }
    }
}

fn default_groups() -> Vec<String> {
    bufgen_wire::STANDARD_GROUPS
        .iter()
        .map(|name| name.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDecl {
    pub name: String,
    pub buffers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDecl {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// A named block of constants, emitted as a nested module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstBlock {
    pub name: String,
    pub items: Vec<ConstItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstItem {
    Block(ConstBlock),
    Value {
        name: String,
        #[serde(rename = "type")]
        ty: String,
        value: ConstValue,
    },
}

/// A literal constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}
