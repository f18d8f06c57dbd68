//! Table-driven codec over dynamic [`Value`]s.
//!
//! Produces the same bytes as the generated `BuffersModel` impls, so tooling
//! can inspect buffers without compiling generated code.

use bufgen_schema::{Primitive, Schema, TypeId};
use bufgen_wire::{BytesReader, BytesWriter, WireError};
use tracing::trace;

use crate::error::{CodecError, Result};
use crate::table::{CodecSet, FieldStep, Program, TaggedVariant, TypeCodec};
use crate::value::Value;

/// Default bound on value nesting for every operation.
pub const MAX_VALUE_DEPTH: usize = 256;

/// One decoded draw/render command.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCommand {
    pub name: String,
    pub opcode: u64,
    pub fields: Vec<Value>,
}

/// Default, decode, skip and encode for every type of one schema snapshot.
#[derive(Debug, Clone)]
pub struct Codec {
    set: CodecSet,
    max_depth: usize,
}

impl Codec {
    pub fn new(schema: &Schema) -> Self {
        Self::from_set(CodecSet::build(schema))
    }

    pub fn from_set(set: CodecSet) -> Self {
        Self {
            set,
            max_depth: MAX_VALUE_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn tables(&self) -> &CodecSet {
        &self.set
    }

    /// Look up a type by canonical name, e.g. `LinearTable<f32, Test>`.
    pub fn type_id(&self, name: &str) -> Result<TypeId> {
        self.set
            .lookup(name)
            .ok_or_else(|| CodecError::UnknownType(name.to_string()))
    }

    /// Canonical default instance.
    pub fn default_value(&self, id: TypeId) -> Result<Value> {
        self.default_at(id, 0)
    }

    /// Consume exactly one encoded instance.
    pub fn decode(&self, id: TypeId, reader: &mut BytesReader<'_>) -> Result<Value> {
        self.decode_at(id, reader, 0)
    }

    /// Decode one instance that must fill `buf` exactly.
    pub fn decode_exact(&self, id: TypeId, buf: &[u8]) -> Result<Value> {
        let mut reader = BytesReader::new(buf);
        let value = self.decode(id, &mut reader)?;
        if !reader.is_empty() {
            return Err(CodecError::TrailingBytes(reader.remaining()));
        }
        Ok(value)
    }

    /// Advance past `count` instances; lands exactly where `count` decodes would.
    pub fn skip(&self, id: TypeId, reader: &mut BytesReader<'_>, count: u64) -> Result<()> {
        self.skip_at(id, reader, count, 0)
    }

    /// Append the encoding of `value`.
    ///
    /// The value is checked against the type before anything is appended, so
    /// a shape mismatch leaves `writer` untouched.
    pub fn encode(&self, id: TypeId, value: &Value, writer: &mut BytesWriter) -> Result<()> {
        let mut scratch = BytesWriter::new();
        self.encode_at(id, value, &mut scratch, 0)?;
        writer.write_raw(scratch.as_slice());
        Ok(())
    }

    pub fn encode_to_vec(&self, id: TypeId, value: &Value) -> Result<Vec<u8>> {
        let mut writer = BytesWriter::new();
        self.encode_at(id, value, &mut writer, 0)?;
        Ok(writer.as_slice().to_vec())
    }

    /// Decode one opcode-prefixed command.
    pub fn decode_command(&self, reader: &mut BytesReader<'_>) -> Result<DecodedCommand> {
        let opcode = reader.read_u64()?;
        let command = self
            .set
            .command(opcode)
            .ok_or(CodecError::UnknownOpcode(opcode))?;
        trace!(opcode, name = %command.name, "decoding command");
        let fields = self.decode_fields(&command.fields, reader, 0)?;
        Ok(DecodedCommand {
            name: command.name.clone(),
            opcode,
            fields,
        })
    }

    /// Decode commands until `buf` is exhausted.
    pub fn decode_commands(&self, buf: &[u8]) -> Result<Vec<DecodedCommand>> {
        let mut reader = BytesReader::new(buf);
        let mut commands = Vec::new();
        while !reader.is_empty() {
            commands.push(self.decode_command(&mut reader)?);
        }
        Ok(commands)
    }

    /// Render a value as JSON using schema field and variant names.
    ///
    /// Structs become objects keyed by field binding (`p8` for positional
    /// fields), unit variants become their name, and other variants become a
    /// single-key object `{ "Variant": { ...fields } }`.
    pub fn to_json(&self, id: TypeId, value: &Value) -> Result<serde_json::Value> {
        self.json_at(id, value, 0)
    }

    pub fn command_to_json(&self, command: &DecodedCommand) -> Result<serde_json::Value> {
        let codec = self
            .set
            .command(command.opcode)
            .ok_or(CodecError::UnknownOpcode(command.opcode))?;
        let mut object = serde_json::Map::new();
        object.insert("command".to_string(), command.name.clone().into());
        object.insert("opcode".to_string(), command.opcode.into());
        object.insert(
            "fields".to_string(),
            self.fields_json(&command.name, &codec.fields, &command.fields, 0)?,
        );
        Ok(serde_json::Value::Object(object))
    }

    fn codec(&self, id: TypeId) -> Result<&TypeCodec> {
        self.set
            .get(id)
            .ok_or_else(|| CodecError::UnknownType(id.to_string()))
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        if depth >= self.max_depth {
            return Err(CodecError::DepthExceeded(self.max_depth));
        }
        Ok(depth + 1)
    }

    fn default_at(&self, id: TypeId, depth: usize) -> Result<Value> {
        let depth = self.enter(depth)?;
        let codec = self.codec(id)?;
        let value = match &codec.program {
            Program::Fixed(primitive) => Value::zero(*primitive),
            Program::Text => Value::String(String::new()),
            Program::Optional(_) => Value::Optional(None),
            Program::Collection(_) => Value::Collection(Vec::new()),
            Program::Sequence(fields) => Value::Struct(self.default_fields(fields, depth)?),
            Program::Tagged { variants, default } => {
                let variant = variants
                    .get(*default)
                    .ok_or_else(|| CodecError::UnknownType(codec.name.clone()))?;
                Value::Enum {
                    discriminant: variant.discriminant,
                    fields: self.default_fields(&variant.fields, depth)?,
                }
            }
        };
        Ok(value)
    }

    fn default_fields(&self, fields: &[FieldStep], depth: usize) -> Result<Vec<Value>> {
        fields
            .iter()
            .map(|field| self.default_at(field.ty, depth))
            .collect()
    }

    fn decode_at(&self, id: TypeId, reader: &mut BytesReader<'_>, depth: usize) -> Result<Value> {
        let depth = self.enter(depth)?;
        let codec = self.codec(id)?;
        let value = match &codec.program {
            Program::Fixed(primitive) => read_fixed(*primitive, reader)?,
            Program::Text => Value::String(reader.read_string()?),
            Program::Optional(inner) => {
                if reader.read_bool()? {
                    Value::some(self.decode_at(*inner, reader, depth)?)
                } else {
                    Value::none()
                }
            }
            Program::Collection(inner) => {
                let len = reader.read_len()?;
                let mut items = Vec::with_capacity(len.min(reader.remaining()));
                for _ in 0..len {
                    items.push(self.decode_at(*inner, reader, depth)?);
                }
                Value::Collection(items)
            }
            Program::Sequence(fields) => Value::Struct(self.decode_fields(fields, reader, depth)?),
            Program::Tagged { variants, .. } => {
                let discriminant = reader.read_discriminant()?;
                let variant = find_variant(codec, variants, discriminant)?;
                Value::Enum {
                    discriminant,
                    fields: self.decode_fields(&variant.fields, reader, depth)?,
                }
            }
        };
        Ok(value)
    }

    fn decode_fields(
        &self,
        fields: &[FieldStep],
        reader: &mut BytesReader<'_>,
        depth: usize,
    ) -> Result<Vec<Value>> {
        fields
            .iter()
            .map(|field| self.decode_at(field.ty, reader, depth))
            .collect()
    }

    fn skip_at(
        &self,
        id: TypeId,
        reader: &mut BytesReader<'_>,
        count: u64,
        depth: usize,
    ) -> Result<()> {
        let depth = self.enter(depth)?;
        let codec = self.codec(id)?;
        if let Some(width) = codec.fixed_size {
            return Ok(reader.skip_fixed(width, count)?);
        }

        for _ in 0..count {
            match &codec.program {
                Program::Fixed(primitive) => {
                    read_fixed(*primitive, reader)?;
                }
                Program::Text => reader.skip_bytes()?,
                Program::Optional(inner) => {
                    if reader.read_bool()? {
                        self.skip_at(*inner, reader, 1, depth)?;
                    }
                }
                Program::Collection(inner) => {
                    let len = reader.read_len()?;
                    self.skip_at(*inner, reader, len as u64, depth)?;
                }
                Program::Sequence(fields) => self.skip_fields(fields, reader, depth)?,
                Program::Tagged { variants, .. } => {
                    let discriminant = reader.read_discriminant()?;
                    let variant = find_variant(codec, variants, discriminant)?;
                    self.skip_fields(&variant.fields, reader, depth)?;
                }
            }
        }
        Ok(())
    }

    fn skip_fields(
        &self,
        fields: &[FieldStep],
        reader: &mut BytesReader<'_>,
        depth: usize,
    ) -> Result<()> {
        for field in fields {
            self.skip_at(field.ty, reader, 1, depth)?;
        }
        Ok(())
    }

    fn encode_at(
        &self,
        id: TypeId,
        value: &Value,
        writer: &mut BytesWriter,
        depth: usize,
    ) -> Result<()> {
        let depth = self.enter(depth)?;
        let codec = self.codec(id)?;
        match (&codec.program, value) {
            (Program::Fixed(primitive), value) => write_fixed(codec, *primitive, value, writer),
            (Program::Text, Value::String(text)) => {
                writer.write_string(text);
                Ok(())
            }
            (Program::Optional(inner), Value::Optional(present)) => {
                writer.write_presence(present.is_some());
                match present {
                    Some(inner_value) => self.encode_at(*inner, inner_value, writer, depth),
                    None => Ok(()),
                }
            }
            (Program::Collection(inner), Value::Collection(items)) => {
                writer.write_len(items.len());
                for item in items {
                    self.encode_at(*inner, item, writer, depth)?;
                }
                Ok(())
            }
            (Program::Sequence(fields), Value::Struct(values)) => {
                self.encode_fields(codec, fields, values, writer, depth)
            }
            (
                Program::Tagged { variants, .. },
                Value::Enum {
                    discriminant,
                    fields,
                },
            ) => {
                let variant = variants
                    .iter()
                    .find(|variant| variant.discriminant == *discriminant)
                    .ok_or_else(|| CodecError::ShapeMismatch {
                        type_name: codec.name.clone(),
                        expected: "a declared discriminant".to_string(),
                        found: format!("discriminant {discriminant}"),
                    })?;
                writer.write_discriminant(*discriminant);
                self.encode_fields(codec, &variant.fields, fields, writer, depth)
            }
            (program, value) => Err(mismatch(codec, program.shape(), value)),
        }
    }

    fn encode_fields(
        &self,
        codec: &TypeCodec,
        fields: &[FieldStep],
        values: &[Value],
        writer: &mut BytesWriter,
        depth: usize,
    ) -> Result<()> {
        if fields.len() != values.len() {
            return Err(CodecError::ShapeMismatch {
                type_name: codec.name.clone(),
                expected: format!("{} fields", fields.len()),
                found: format!("{} fields", values.len()),
            });
        }
        for (field, value) in fields.iter().zip(values) {
            self.encode_at(field.ty, value, writer, depth)?;
        }
        Ok(())
    }

    fn json_at(&self, id: TypeId, value: &Value, depth: usize) -> Result<serde_json::Value> {
        let depth = self.enter(depth)?;
        let codec = self.codec(id)?;
        match (&codec.program, value) {
            (Program::Fixed(_) | Program::Text, value) => value
                .primitive_json()
                .ok_or_else(|| mismatch(codec, codec.program.shape(), value)),
            (Program::Optional(_), Value::Optional(None)) => Ok(serde_json::Value::Null),
            (Program::Optional(inner), Value::Optional(Some(inner_value))) => {
                self.json_at(*inner, inner_value, depth)
            }
            (Program::Collection(inner), Value::Collection(items)) => items
                .iter()
                .map(|item| self.json_at(*inner, item, depth))
                .collect::<Result<Vec<_>>>()
                .map(serde_json::Value::Array),
            (Program::Sequence(fields), Value::Struct(values)) => {
                self.fields_json(&codec.name, fields, values, depth)
            }
            (
                Program::Tagged { variants, .. },
                Value::Enum {
                    discriminant,
                    fields,
                },
            ) => {
                let variant = find_variant(codec, variants, *discriminant)?;
                if variant.fields.is_empty() {
                    return Ok(serde_json::Value::String(variant.name.clone()));
                }
                let mut object = serde_json::Map::new();
                object.insert(
                    variant.name.clone(),
                    self.fields_json(&codec.name, &variant.fields, fields, depth)?,
                );
                Ok(serde_json::Value::Object(object))
            }
            (program, value) => Err(mismatch(codec, program.shape(), value)),
        }
    }

    fn fields_json(
        &self,
        owner: &str,
        fields: &[FieldStep],
        values: &[Value],
        depth: usize,
    ) -> Result<serde_json::Value> {
        if fields.len() != values.len() {
            return Err(CodecError::ShapeMismatch {
                type_name: owner.to_string(),
                expected: format!("{} fields", fields.len()),
                found: format!("{} fields", values.len()),
            });
        }
        let mut object = serde_json::Map::new();
        for (field, value) in fields.iter().zip(values) {
            object.insert(field.name.binding(), self.json_at(field.ty, value, depth)?);
        }
        Ok(serde_json::Value::Object(object))
    }
}

fn find_variant<'c>(
    codec: &TypeCodec,
    variants: &'c [TaggedVariant],
    discriminant: u32,
) -> Result<&'c TaggedVariant> {
    variants
        .iter()
        .find(|variant| variant.discriminant == discriminant)
        .ok_or_else(|| WireError::unknown_discriminant(codec.name.clone(), discriminant).into())
}

fn mismatch(codec: &TypeCodec, expected: &str, found: &Value) -> CodecError {
    CodecError::ShapeMismatch {
        type_name: codec.name.clone(),
        expected: expected.to_string(),
        found: found.kind().to_string(),
    }
}

fn read_fixed(primitive: Primitive, reader: &mut BytesReader<'_>) -> Result<Value> {
    let value = match primitive {
        Primitive::U8 => Value::U8(reader.read_u8()?),
        Primitive::I32 => Value::I32(reader.read_i32()?),
        Primitive::I64 => Value::I64(reader.read_i64()?),
        Primitive::U32 => Value::U32(reader.read_u32()?),
        Primitive::U64 => Value::U64(reader.read_u64()?),
        Primitive::F32 => Value::F32(reader.read_f32()?),
        Primitive::F64 => Value::F64(reader.read_f64()?),
        Primitive::Bool => Value::Bool(reader.read_bool()?),
        Primitive::String => Value::String(reader.read_string()?),
    };
    Ok(value)
}

fn write_fixed(
    codec: &TypeCodec,
    primitive: Primitive,
    value: &Value,
    writer: &mut BytesWriter,
) -> Result<()> {
    match (primitive, value) {
        (Primitive::U8, Value::U8(v)) => writer.write_u8(*v),
        (Primitive::I32, Value::I32(v)) => writer.write_i32(*v),
        (Primitive::I64, Value::I64(v)) => writer.write_i64(*v),
        (Primitive::U32, Value::U32(v)) => writer.write_u32(*v),
        (Primitive::U64, Value::U64(v)) => writer.write_u64(*v),
        (Primitive::F32, Value::F32(v)) => writer.write_f32(*v),
        (Primitive::F64, Value::F64(v)) => writer.write_f64(*v),
        (Primitive::Bool, Value::Bool(v)) => writer.write_bool(*v),
        (Primitive::String, Value::String(v)) => writer.write_string(v),
        (primitive, value) => return Err(mismatch(codec, primitive.name(), value)),
    }
    Ok(())
}
