//! Command opcodes and command-stream decoding.
//!
//! A command stream is a sequence of `u64` little-endian opcodes, each
//! followed by its fixed-arity payload. Opcodes live in a flat namespace
//! offset from [`COMMANDS_BASE`] and are append-only across schema versions.

use std::collections::BTreeMap;
use std::fmt;

use bufgen_wire::{BuffersModel, BytesReader, BytesWriter};
use tracing::{debug, trace};

use crate::error::{Result, RpcError};

pub use bufgen_wire::routing::COMMANDS_BASE;

/// Opcode of one command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode(pub u64);

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-only opcode assignment, in declaration order.
#[derive(Debug, Default, Clone)]
pub struct OpcodeTable {
    names: Vec<String>,
}

impl OpcodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from command names in declaration order.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for name in names {
            table.push(name)?;
        }
        Ok(table)
    }

    /// Assign the next free opcode to `name`.
    pub fn push(&mut self, name: impl Into<String>) -> Result<Opcode> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(RpcError::AlreadyRegistered(format!("command {name}")));
        }
        self.names.push(name);
        Ok(Opcode(COMMANDS_BASE + self.names.len() as u64))
    }

    pub fn opcode(&self, name: &str) -> Option<Opcode> {
        self.names
            .iter()
            .position(|existing| existing == name)
            .map(|index| Opcode(COMMANDS_BASE + 1 + index as u64))
    }

    pub fn name(&self, opcode: Opcode) -> Option<&str> {
        let index = opcode.0.checked_sub(COMMANDS_BASE + 1)?;
        self.names
            .get(usize::try_from(index).ok()?)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(opcode, name)` pairs in opcode order.
    pub fn iter(&self) -> impl Iterator<Item = (Opcode, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (Opcode(COMMANDS_BASE + 1 + index as u64), name.as_str()))
    }
}

/// Append one command: opcode, then payload.
pub fn write_command<T: BuffersModel>(writer: &mut BytesWriter, opcode: Opcode, payload: &T) {
    writer.write_u64(opcode.0);
    payload.write_to_buffers(writer);
}

type PayloadDecoder<C> = Box<dyn Fn(&mut BytesReader<'_>) -> bufgen_wire::Result<C> + Send + Sync>;

/// Dispatches a leading opcode to its registered payload decoder.
pub struct CommandDecoder<C> {
    decoders: BTreeMap<Opcode, PayloadDecoder<C>>,
}

impl<C> Default for CommandDecoder<C> {
    fn default() -> Self {
        Self {
            decoders: BTreeMap::new(),
        }
    }
}

impl<C> fmt::Debug for CommandDecoder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDecoder")
            .field("opcodes", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> CommandDecoder<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the payload decoder for `opcode`.
    pub fn register<F>(&mut self, opcode: Opcode, decode: F) -> Result<()>
    where
        F: Fn(&mut BytesReader<'_>) -> bufgen_wire::Result<C> + Send + Sync + 'static,
    {
        if self.decoders.contains_key(&opcode) {
            return Err(RpcError::AlreadyRegistered(format!("opcode {opcode}")));
        }
        self.decoders.insert(opcode, Box::new(decode));
        debug!(%opcode, "registered command decoder");
        Ok(())
    }

    /// Register a payload type whose decoded value maps into `C`.
    pub fn register_model<T, F>(&mut self, opcode: Opcode, wrap: F) -> Result<()>
    where
        T: BuffersModel,
        F: Fn(T) -> C + Send + Sync + 'static,
    {
        self.register(opcode, move |reader| T::read_from_buffers(reader).map(&wrap))
    }

    pub fn contains(&self, opcode: Opcode) -> bool {
        self.decoders.contains_key(&opcode)
    }

    /// Decode one command. An unknown opcode is fatal for the stream.
    pub fn decode(&self, reader: &mut BytesReader<'_>) -> Result<C> {
        let opcode = Opcode(reader.read_u64()?);
        let decode = self
            .decoders
            .get(&opcode)
            .ok_or(RpcError::UnknownOpcode(opcode))?;
        trace!(%opcode, "decoding command");
        Ok(decode(reader)?)
    }

    /// Decode commands until the buffer is exhausted.
    pub fn decode_stream(&self, buf: &[u8]) -> Result<Vec<C>> {
        let mut reader = BytesReader::new(buf);
        let mut commands = Vec::new();
        while !reader.is_empty() {
            commands.push(self.decode(&mut reader)?);
        }
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Draw {
        Lines(Vec<f32>),
        Path,
    }

    fn decoder(table: &OpcodeTable) -> CommandDecoder<Draw> {
        let mut decoder = CommandDecoder::new();
        decoder
            .register_model(table.opcode("DrawLines").unwrap(), Draw::Lines)
            .unwrap();
        decoder
            .register(table.opcode("DrawPath").unwrap(), |_| Ok(Draw::Path))
            .unwrap();
        decoder
    }

    #[test]
    fn opcodes_start_after_base() {
        let table = OpcodeTable::from_names(["DrawLines", "DrawPath", "DrawQuads"]).unwrap();
        assert_eq!(table.opcode("DrawLines"), Some(Opcode(131073)));
        assert_eq!(table.opcode("DrawQuads"), Some(Opcode(131075)));
        assert_eq!(table.name(Opcode(131074)), Some("DrawPath"));
        assert_eq!(table.name(Opcode(COMMANDS_BASE)), None);
        assert_eq!(table.name(Opcode(131076)), None);
    }

    #[test]
    fn opcode_table_is_append_only() {
        let mut table = OpcodeTable::from_names(["DrawLines"]).unwrap();
        assert_eq!(table.push("DrawPath").unwrap(), Opcode(131074));
        assert!(table.push("DrawLines").is_err());
        assert_eq!(table.len(), 2);
        assert_eq!(table.opcode("DrawLines"), Some(Opcode(131073)));
    }

    #[test]
    fn decodes_command_stream_in_order() {
        let table = OpcodeTable::from_names(["DrawLines", "DrawPath"]).unwrap();
        let decoder = decoder(&table);

        let mut writer = BytesWriter::new();
        write_command(&mut writer, Opcode(131074), &());
        write_command(&mut writer, Opcode(131073), &vec![1.0f32, 2.0]);
        let wire = writer.freeze();

        assert_eq!(&wire[..8], &131074u64.to_le_bytes());
        assert_eq!(
            decoder.decode_stream(&wire).unwrap(),
            vec![Draw::Path, Draw::Lines(vec![1.0, 2.0])]
        );
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let table = OpcodeTable::from_names(["DrawLines", "DrawPath"]).unwrap();
        let decoder = decoder(&table);

        let mut writer = BytesWriter::new();
        write_command(&mut writer, Opcode(131074), &());
        writer.write_u64(131999);
        let wire = writer.freeze();

        assert_eq!(
            decoder.decode_stream(&wire).unwrap_err(),
            RpcError::UnknownOpcode(Opcode(131999))
        );
    }

    #[test]
    fn duplicate_decoder_is_rejected() {
        let mut decoder: CommandDecoder<Draw> = CommandDecoder::new();
        decoder.register(Opcode(131073), |_| Ok(Draw::Path)).unwrap();
        assert!(decoder.register(Opcode(131073), |_| Ok(Draw::Path)).is_err());
        assert!(decoder.contains(Opcode(131073)));
    }
}
