//! Per-type operation tables.
//!
//! [`CodecSet::build`] compiles every resolved type of a [`Schema`] into a
//! [`TypeCodec`] holding a small step program. Generic instantiations already
//! have their own [`TypeId`] after resolution, so each gets its own table with
//! the argument codecs substituted in.

use std::collections::BTreeMap;

use bufgen_schema::{FieldName, Primitive, ResolvedField, ResolvedKind, Schema, TypeId};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldStep {
    pub name: FieldName,
    pub ty: TypeId,
}

impl From<&ResolvedField> for FieldStep {
    fn from(field: &ResolvedField) -> Self {
        Self {
            name: field.name.clone(),
            ty: field.ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedVariant {
    pub name: String,
    pub discriminant: u32,
    pub fields: Vec<FieldStep>,
}

/// How one type is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// Fixed-width little-endian primitive.
    Fixed(Primitive),
    /// Length-prefixed UTF-8.
    Text,
    /// Presence byte, then the inner value.
    Optional(TypeId),
    /// Count prefix, then elements.
    Collection(TypeId),
    /// Fields in order, no framing.
    Sequence(Vec<FieldStep>),
    /// Discriminant, then the matching variant's fields.
    Tagged {
        variants: Vec<TaggedVariant>,
        default: usize,
    },
}

impl Program {
    pub fn shape(&self) -> &'static str {
        match self {
            Program::Fixed(_) => "primitive",
            Program::Text => "String",
            Program::Optional(_) => "optional",
            Program::Collection(_) => "collection",
            Program::Sequence(_) => "struct",
            Program::Tagged { .. } => "enum",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCodec {
    pub id: TypeId,
    pub name: String,
    pub program: Program,
    /// Encoded width when every instance has the same size.
    ///
    /// Tagged types never have one: skipping them must still check the
    /// discriminant.
    pub fixed_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCodec {
    pub name: String,
    pub opcode: u64,
    pub fields: Vec<FieldStep>,
}

/// Operation tables for one schema snapshot, indexed by [`TypeId`].
#[derive(Debug, Clone, Default)]
pub struct CodecSet {
    codecs: Vec<TypeCodec>,
    commands: BTreeMap<u64, CommandCodec>,
    by_name: BTreeMap<String, TypeId>,
}

impl CodecSet {
    pub fn build(schema: &Schema) -> Self {
        let mut codecs: Vec<TypeCodec> = schema
            .types
            .iter()
            .map(|ty| TypeCodec {
                id: ty.id,
                name: ty.name.clone(),
                program: program_for(&ty.kind),
                fixed_size: None,
            })
            .collect();
        compute_fixed_sizes(&mut codecs);

        let by_name = codecs
            .iter()
            .map(|codec| (codec.name.clone(), codec.id))
            .collect();
        let commands: BTreeMap<u64, CommandCodec> = schema
            .routing
            .commands
            .iter()
            .map(|command| {
                (
                    command.opcode,
                    CommandCodec {
                        name: command.name.clone(),
                        opcode: command.opcode,
                        fields: command.fields.iter().map(FieldStep::from).collect(),
                    },
                )
            })
            .collect();

        debug!(
            types = codecs.len(),
            commands = commands.len(),
            "built codec tables"
        );
        Self {
            codecs,
            commands,
            by_name,
        }
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeCodec> {
        self.codecs.get(id.index())
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn command(&self, opcode: u64) -> Option<&CommandCodec> {
        self.commands.get(&opcode)
    }

    /// Commands in opcode order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandCodec> {
        self.commands.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeCodec> {
        self.codecs.iter()
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

fn program_for(kind: &ResolvedKind) -> Program {
    match kind {
        ResolvedKind::Primitive(Primitive::String) => Program::Text,
        ResolvedKind::Primitive(primitive) => Program::Fixed(*primitive),
        ResolvedKind::Optional(inner) => Program::Optional(*inner),
        ResolvedKind::Collection(inner) => Program::Collection(*inner),
        ResolvedKind::Struct(strukt) => {
            Program::Sequence(strukt.fields.iter().map(FieldStep::from).collect())
        }
        ResolvedKind::Enum(enumeration) => Program::Tagged {
            variants: enumeration
                .variants
                .iter()
                .map(|variant| TaggedVariant {
                    name: variant.name.clone(),
                    discriminant: variant.discriminant,
                    fields: variant.fields.iter().map(FieldStep::from).collect(),
                })
                .collect(),
            default: enumeration.default_index,
        },
    }
}

/// Propagate fixed widths until nothing changes.
fn compute_fixed_sizes(codecs: &mut [TypeCodec]) {
    loop {
        let mut changed = false;
        for index in 0..codecs.len() {
            if codecs[index].fixed_size.is_some() {
                continue;
            }
            let size = match &codecs[index].program {
                Program::Fixed(primitive) => primitive.fixed_width(),
                Program::Sequence(fields) => fields_width(codecs, fields),
                Program::Text
                | Program::Optional(_)
                | Program::Collection(_)
                | Program::Tagged { .. } => None,
            };
            if size.is_some() {
                codecs[index].fixed_size = size;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn fields_width(codecs: &[TypeCodec], fields: &[FieldStep]) -> Option<usize> {
    fields.iter().try_fold(0usize, |total, field| {
        Some(total + codecs.get(field.ty.index())?.fixed_size?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bufgen_schema::{resolve, SchemaSource};

    fn build(json: &str) -> (Schema, CodecSet) {
        let schema = resolve(&SchemaSource::from_json(json).unwrap()).unwrap();
        let set = CodecSet::build(&schema);
        (schema, set)
    }

    #[test]
    fn fixed_sizes_propagate_through_structs() {
        let (schema, set) = build(
            r#"{ "scope_id": "t", "types": [
                { "kind": "struct", "name": "Vec2", "fields": [
                    { "name": "x", "type": "f32" }, { "name": "y", "type": "f32" }
                ]},
                { "kind": "struct", "name": "Rect", "fields": [
                    { "name": "min", "type": "Vec2" }, { "name": "max", "type": "Vec2" },
                    { "name": "visible", "type": "bool" }
                ]},
                { "kind": "struct", "name": "Label", "fields": [
                    { "name": "at", "type": "Vec2" }, { "name": "text", "type": "String" }
                ]},
                { "kind": "struct", "name": "Marker" }
            ]}"#,
        );

        let width = |name: &str| set.get(schema.lookup(name).unwrap()).unwrap().fixed_size;
        assert_eq!(width("Vec2"), Some(8));
        assert_eq!(width("Rect"), Some(17));
        assert_eq!(width("Label"), None);
        assert_eq!(width("Marker"), Some(0));
    }

    #[test]
    fn tagged_types_are_never_fixed() {
        let (schema, set) = build(
            r#"{ "scope_id": "t", "types": [
                { "kind": "enum", "name": "Flag", "variants": [
                    { "name": "Off", "discriminant": 0, "default": true },
                    { "name": "On", "discriminant": 1 }
                ]},
                { "kind": "struct", "name": "Holder", "fields": [
                    { "name": "flag", "type": "Flag" }
                ]}
            ]}"#,
        );

        let flag = set.get(schema.lookup("Flag").unwrap()).unwrap();
        assert_eq!(flag.fixed_size, None);
        assert!(matches!(flag.program, Program::Tagged { default: 0, .. }));
        assert_eq!(
            set.get(schema.lookup("Holder").unwrap()).unwrap().fixed_size,
            None
        );
    }

    #[test]
    fn commands_are_keyed_by_opcode() {
        let (_, set) = build(
            r#"{ "scope_id": "t", "routing": { "commands": [
                { "name": "Clear" },
                { "name": "SetColor", "fields": [{ "type": "u32" }] }
            ]}}"#,
        );

        let names: Vec<&str> = set.commands().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Clear", "SetColor"]);
        let set_color = set.command(131074).unwrap();
        assert_eq!(set_color.fields[0].name, FieldName::Positional(0));
        assert!(set.command(131072).is_none());
    }
}
