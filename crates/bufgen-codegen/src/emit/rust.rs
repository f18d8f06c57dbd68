//! Rust target.
//!
//! Emits one self-contained module per schema snapshot: model types with
//! `BuffersModel` impls, RPC client stubs, a handler trait with dispatcher
//! registration, stream registration, routing constants, the command enum with
//! its decoder, and constant blocks. Output depends only on the schema and the
//! config, so regenerating an unchanged snapshot is byte-identical.

use std::collections::{BTreeMap, BTreeSet};

use bufgen_schema::{
    ConstBlock, ConstItem, ConstValue, Decl, EnumDecl, FieldDecl, FieldName, MethodKind,
    ResolvedMethod, Schema, StructDecl, TypeRef, COMMANDS_BUFFER_ADDRESS_TYPE,
    GROUP_ADDRESS_TYPE,
};
use tracing::debug;

use super::naming::{escape_ident, screaming_snake, snake, upper_camel};
use super::writer::SourceWriter;
use crate::table::CodecSet;

/// Locals used by generated function bodies; field bindings are renamed away
/// from these.
const RESERVED_LOCALS: [&str; 5] = [
    "bytes_reader",
    "bytes_writer",
    "count",
    "discriminant",
    "handler",
];

const DEFAULT_HEADER: &str = "@generated by bufgen. Do not edit by hand.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitConfig {
    /// Path of the wire runtime crate as seen from the generated module.
    pub wire_crate: String,
    /// Path of the RPC runtime crate as seen from the generated module.
    pub rpc_crate: String,
    /// Leading comment; `None` uses an `@generated` marker.
    pub header: Option<String>,
    /// Emit method ids, client stubs, handler trait and stream helpers.
    pub rpc: bool,
    /// Emit group, command buffer and command definitions.
    pub routing: bool,
    /// Emit constant blocks.
    pub consts: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            wire_crate: "bufgen_wire".to_string(),
            rpc_crate: "bufgen_rpc".to_string(),
            header: None,
            rpc: true,
            routing: true,
            consts: true,
        }
    }
}

/// Emit Rust source for `schema`.
pub fn emit_rust(schema: &Schema, config: &EmitConfig) -> String {
    RustEmitter::new(schema, config).emit()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Unit,
    Tuple,
    Named,
}

#[derive(Debug, Clone)]
struct FieldPlan {
    /// Struct member: field identifier, or tuple index.
    member: String,
    /// Local used when destructuring.
    binding: String,
    ty: String,
}

#[derive(Debug, Clone)]
struct VariantPlan {
    name: String,
    discriminant: u64,
    shape: Shape,
    fields: Vec<FieldPlan>,
}

impl VariantPlan {
    fn wildcard(&self, path: &str) -> String {
        match self.shape {
            Shape::Unit => format!("{path}::{}", self.name),
            Shape::Tuple => format!("{path}::{}(..)", self.name),
            Shape::Named => format!("{path}::{} {{ .. }}", self.name),
        }
    }

    fn pattern(&self, path: &str) -> String {
        match self.shape {
            Shape::Unit => format!("{path}::{}", self.name),
            Shape::Tuple => {
                let bindings: Vec<&str> = self.fields.iter().map(|f| f.binding.as_str()).collect();
                format!("{path}::{}({})", self.name, bindings.join(", "))
            }
            Shape::Named => {
                let bindings: Vec<String> = self
                    .fields
                    .iter()
                    .map(|field| {
                        if field.member == field.binding {
                            field.binding.clone()
                        } else {
                            format!("{}: {}", field.member, field.binding)
                        }
                    })
                    .collect();
                format!("{path}::{} {{ {} }}", self.name, bindings.join(", "))
            }
        }
    }

    /// Single-line variant declaration.
    fn declaration(&self) -> String {
        match self.shape {
            Shape::Unit => format!("{},", self.name),
            Shape::Tuple => {
                let types: Vec<&str> = self.fields.iter().map(|f| f.ty.as_str()).collect();
                format!("{}({}),", self.name, types.join(", "))
            }
            Shape::Named => {
                let fields: Vec<String> = self
                    .fields
                    .iter()
                    .map(|f| format!("{}: {}", f.member, f.ty))
                    .collect();
                format!("{} {{ {} }},", self.name, fields.join(", "))
            }
        }
    }
}

/// Emits the Rust module for one schema.
pub struct RustEmitter<'a> {
    schema: &'a Schema,
    config: &'a EmitConfig,
    codecs: CodecSet,
    /// Declarations each declaration stores inline (outside any `Vec`).
    direct_refs: BTreeMap<&'a str, BTreeSet<&'a str>>,
    wire_imports: BTreeSet<&'static str>,
    uses_arc: bool,
}

impl<'a> RustEmitter<'a> {
    pub fn new(schema: &'a Schema, config: &'a EmitConfig) -> Self {
        let direct_refs = schema
            .decls
            .iter()
            .map(|decl| {
                let mut refs = BTreeSet::new();
                for field in decl_fields(decl) {
                    collect_inline_refs(&field.ty, &mut refs);
                }
                (decl.name(), refs)
            })
            .collect();

        Self {
            schema,
            config,
            codecs: CodecSet::build(schema),
            direct_refs,
            wire_imports: BTreeSet::new(),
            uses_arc: false,
        }
    }

    pub fn emit(mut self) -> String {
        let schema = self.schema;
        let config = self.config;
        let mut body = SourceWriter::new();

        body.line(format!("pub const SCOPE_ID: &str = {:?};", schema.scope_id));
        for decl in &schema.decls {
            body.blank();
            match decl {
                Decl::Struct(decl) => self.emit_struct(&mut body, decl),
                Decl::Enum(decl) => self.emit_enum(&mut body, decl),
            }
        }
        if config.rpc && !schema.methods.is_empty() {
            self.emit_rpc(&mut body);
        }
        if config.routing {
            self.emit_routing(&mut body);
        }
        if config.consts {
            for block in &schema.consts {
                body.blank();
                self.emit_const_block(&mut body, block);
            }
        }

        let mut out = SourceWriter::new();
        for line in config.header.as_deref().unwrap_or(DEFAULT_HEADER).lines() {
            out.line(format!("// {line}").trim_end());
        }
        out.blank();
        if self.uses_arc {
            out.line("use std::sync::Arc;");
            out.blank();
        }
        if !self.wire_imports.is_empty() {
            let imports: Vec<&str> = self.wire_imports.iter().copied().collect();
            let imports = match imports.as_slice() {
                [single] => single.to_string(),
                _ => format!("{{{}}}", imports.join(", ")),
            };
            out.line(format!("use {}::{imports};", config.wire_crate));
            out.blank();
        }

        let mut source = out.finish();
        source.push_str(&body.finish());
        debug!(
            scope = %schema.scope_id,
            decls = schema.decls.len(),
            methods = schema.methods.len(),
            bytes = source.len(),
            "emitted rust source"
        );
        source
    }

    fn emit_struct(&mut self, out: &mut SourceWriter, decl: &StructDecl) {
        self.wire_imports
            .extend(["BuffersModel", "BytesReader", "BytesWriter"]);
        let wire = self.config.wire_crate.as_str();
        let name = &decl.name;
        let generics = type_params(&decl.params);
        let (shape, fields) = self.plan_decl_fields(&decl.fields, name);

        out.line("#[derive(Debug, Clone, PartialEq)]");
        match shape {
            Shape::Unit => out.line(format!("pub struct {name}{generics};")),
            Shape::Tuple => {
                let types: Vec<String> = fields.iter().map(|f| format!("pub {}", f.ty)).collect();
                out.line(format!("pub struct {name}{generics}({});", types.join(", ")));
            }
            Shape::Named => {
                out.open(format!("pub struct {name}{generics}"));
                for field in &fields {
                    out.line(format!("pub {}: {},", field.member, field.ty));
                }
                out.close("");
            }
        }

        out.blank();
        out.open(format!(
            "impl{} BuffersModel for {name}{generics}",
            bounded_params(&decl.params)
        ));

        out.open("fn create_buffers_default() -> Self");
        construct(out, "", "Self", "", shape, &fields, |field| {
            format!("{}::create_buffers_default()", qualified(&field.ty))
        });
        out.close("");

        out.blank();
        let reader = if fields.is_empty() { "_bytes_reader" } else { "bytes_reader" };
        out.open(format!(
            "fn read_from_buffers({reader}: &mut BytesReader<'_>) -> {wire}::Result<Self>"
        ));
        construct(out, "Ok(", "Self", ")", shape, &fields, |field| {
            format!("{}::read_from_buffers(bytes_reader)?", qualified(&field.ty))
        });
        out.close("");

        out.blank();
        out.open(format!(
            "fn skip_in_buffers(bytes_reader: &mut BytesReader<'_>, count: u64) -> {wire}::Result<()>"
        ));
        match self.fixed_size(&decl.name, decl.params.is_empty()) {
            Some(width) => out.line(format!("bytes_reader.skip_fixed({width}, count)")),
            None => {
                out.open("for _ in 0..count");
                for field in &fields {
                    out.line(format!(
                        "{}::skip_in_buffers(bytes_reader, 1)?;",
                        qualified(&field.ty)
                    ));
                }
                out.close("");
                out.line("Ok(())");
            }
        }
        out.close("");

        out.blank();
        if fields.is_empty() {
            out.line("fn write_to_buffers(&self, _bytes_writer: &mut BytesWriter) {}");
        } else {
            out.open("fn write_to_buffers(&self, bytes_writer: &mut BytesWriter)");
            for field in &fields {
                out.line(format!(
                    "self.{}.write_to_buffers(bytes_writer);",
                    field.member
                ));
            }
            out.close("");
        }
        out.close("");
    }

    fn emit_enum(&mut self, out: &mut SourceWriter, decl: &EnumDecl) {
        self.wire_imports
            .extend(["BuffersModel", "BytesReader", "BytesWriter"]);
        let wire = self.config.wire_crate.as_str();
        let name = &decl.name;
        let generics = type_params(&decl.params);
        let variants: Vec<VariantPlan> = decl
            .variants
            .iter()
            .map(|variant| {
                let (shape, fields) = self.plan_decl_fields(&variant.fields, name);
                VariantPlan {
                    name: escape_ident(&variant.name),
                    discriminant: u64::from(variant.discriminant),
                    shape,
                    fields,
                }
            })
            .collect();
        let default = decl
            .variants
            .iter()
            .position(|variant| variant.default)
            .and_then(|index| variants.get(index));

        out.line("#[derive(Debug, Clone, PartialEq)]");
        out.open(format!("pub enum {name}{generics}"));
        for variant in &variants {
            out.line(variant.declaration());
        }
        out.close("");

        out.blank();
        out.open(format!("impl{generics} {name}{generics}"));
        out.line("/// Wire discriminant of this variant.");
        out.open("pub fn discriminant(&self) -> u32");
        out.open("match self");
        for variant in &variants {
            out.line(format!(
                "{} => {},",
                variant.wildcard("Self"),
                variant.discriminant
            ));
        }
        out.close("");
        out.close("");
        out.close("");

        out.blank();
        out.open(format!(
            "impl{} BuffersModel for {name}{generics}",
            bounded_params(&decl.params)
        ));

        out.open("fn create_buffers_default() -> Self");
        if let Some(variant) = default {
            let path = format!("Self::{}", variant.name);
            construct(out, "", &path, "", variant.shape, &variant.fields, |field| {
                format!("{}::create_buffers_default()", qualified(&field.ty))
            });
        }
        out.close("");

        out.blank();
        out.open(format!(
            "fn read_from_buffers(bytes_reader: &mut BytesReader<'_>) -> {wire}::Result<Self>"
        ));
        out.line("let discriminant = bytes_reader.read_discriminant()?;");
        out.open("match discriminant");
        for variant in &variants {
            let path = format!("Self::{}", variant.name);
            let head = format!("{} => Ok(", variant.discriminant);
            construct(out, &head, &path, "),", variant.shape, &variant.fields, |field| {
                format!("{}::read_from_buffers(bytes_reader)?", qualified(&field.ty))
            });
        }
        out.line(format!(
            "_ => Err({wire}::WireError::unknown_discriminant({name:?}, discriminant)),"
        ));
        out.close("");
        out.close("");

        out.blank();
        out.open(format!(
            "fn skip_in_buffers(bytes_reader: &mut BytesReader<'_>, count: u64) -> {wire}::Result<()>"
        ));
        out.open("for _ in 0..count");
        out.line("let discriminant = bytes_reader.read_discriminant()?;");
        out.open("match discriminant");
        for variant in &variants {
            if variant.fields.is_empty() {
                out.line(format!("{} => {{}}", variant.discriminant));
                continue;
            }
            out.open(format!("{} =>", variant.discriminant));
            for field in &variant.fields {
                out.line(format!(
                    "{}::skip_in_buffers(bytes_reader, 1)?;",
                    qualified(&field.ty)
                ));
            }
            out.close("");
        }
        out.line(format!(
            "_ => return Err({wire}::WireError::unknown_discriminant({name:?}, discriminant)),"
        ));
        out.close("");
        out.close("");
        out.line("Ok(())");
        out.close("");

        out.blank();
        out.open("fn write_to_buffers(&self, bytes_writer: &mut BytesWriter)");
        out.line("bytes_writer.write_discriminant(self.discriminant());");
        emit_write_arms(out, "Self", &variants);
        out.close("");
        out.close("");
    }

    fn emit_rpc(&mut self, out: &mut SourceWriter) {
        let schema = self.schema;
        self.wire_imports.insert("BuffersModel");

        out.blank();
        out.line("/// Method ids within [`SCOPE_ID`].");
        out.open("pub mod methods");
        for method in &schema.methods {
            out.line(format!(
                "pub const {}: u32 = {};",
                screaming_snake(&method.name),
                method.id
            ));
        }
        out.close("");

        let calls: Vec<&ResolvedMethod> = schema
            .methods
            .iter()
            .filter(|method| method.kind != MethodKind::Read)
            .collect();
        let streams: Vec<&ResolvedMethod> = schema
            .methods
            .iter()
            .filter(|method| method.kind == MethodKind::Read)
            .collect();

        if !calls.is_empty() {
            self.emit_client(out, &calls);
        }
        self.emit_handler(out);
        if !streams.is_empty() {
            self.emit_streams(out, &streams);
        }
    }

    fn emit_client(&mut self, out: &mut SourceWriter, calls: &[&ResolvedMethod]) {
        let rpc = self.config.rpc_crate.as_str();

        out.blank();
        out.line("/// Blocking client for every request/response method of this scope.");
        out.line("#[derive(Debug, Clone)]");
        out.open("pub struct RpcClient<T>");
        out.line("transport: T,");
        out.line(format!("scope: {rpc}::ScopeId,"));
        out.close("");

        out.blank();
        out.open(format!("impl<T: {rpc}::RpcTransport> RpcClient<T>"));
        out.open("pub fn new(transport: T) -> Self");
        out.open("Self");
        out.line("transport,");
        out.line(format!("scope: {rpc}::ScopeId::new(SCOPE_ID),"));
        out.close("");
        out.close("");

        out.blank();
        out.open("pub fn transport(&self) -> &T");
        out.line("&self.transport");
        out.close("");

        out.blank();
        out.open(format!("fn address(&self, method: u32) -> {rpc}::MethodAddress"));
        out.line(format!("{rpc}::MethodAddress::new(self.scope.clone(), method)"));
        out.close("");

        for method in calls {
            let params: Vec<String> = method
                .args
                .iter()
                .map(|arg| {
                    format!(
                        "{}: {}",
                        escape_ident(&snake(&arg.name)),
                        self.schema.type_name(arg.ty)
                    )
                })
                .collect();
            let ret = method
                .ret
                .map(|ret| self.schema.type_name(ret))
                .unwrap_or_else(|| "()".to_string());

            out.blank();
            out.open(format!(
                "pub fn {}(&self{}) -> {rpc}::Result<{ret}>",
                method_fn(&method.name),
                params.iter().map(|p| format!(", {p}")).collect::<String>()
            ));
            out.line(format!(
                "{rpc}::SyncCall::new(&self.transport, self.address(methods::{}))",
                screaming_snake(&method.name)
            ));
            out.indent();
            for arg in &method.args {
                out.line(format!(".arg(&{})", escape_ident(&snake(&arg.name))));
            }
            out.line(if method.ret.is_some() {
                ".invoke()"
            } else {
                ".invoke_unit()"
            });
            out.dedent();
            out.close("");
        }
        out.close("");
    }

    fn emit_handler(&mut self, out: &mut SourceWriter) {
        let schema = self.schema;
        let rpc = self.config.rpc_crate.as_str();
        self.uses_arc = true;

        out.blank();
        out.line("/// Server-side implementation of this scope's methods.");
        out.open("pub trait RpcHandler: Send + Sync + 'static");
        for method in &schema.methods {
            let params: String = method
                .args
                .iter()
                .map(|arg| {
                    format!(
                        ", {}: {}",
                        escape_ident(&snake(&arg.name)),
                        schema.type_name(arg.ty)
                    )
                })
                .collect();
            let ret = match (method.kind, method.ret) {
                (MethodKind::Read, _) => {
                    format!(" -> {rpc}::SignalResult<{}>", self.stream_type(method))
                }
                (_, Some(ret)) => format!(" -> {}", schema.type_name(ret)),
                (_, None) => String::new(),
            };
            out.line(format!(
                "fn {}(&self{params}){ret};",
                method_fn(&method.name)
            ));
        }
        out.close("");

        out.blank();
        out.line("/// Register every method of `handler`; sync methods go to `RPC_SYNC`,");
        out.line("/// async methods to `RPC` and stream producers to `RPC_READ`.");
        out.line("pub fn register_rpc<H: RpcHandler>(");
        out.indent();
        out.line(format!("dispatcher: &mut {rpc}::RpcDispatcher,"));
        out.line("handler: Arc<H>,");
        out.dedent();
        out.open(format!(") -> {rpc}::Result<()>"));
        out.line(format!("let scope = {rpc}::ScopeId::new(SCOPE_ID);"));
        for method in &schema.methods {
            let group = match method.kind {
                MethodKind::Sync => "RPC_SYNC",
                MethodKind::Async => "RPC",
                MethodKind::Read => "RPC_READ",
            };
            let reader = if method.args.is_empty() {
                "_bytes_reader"
            } else {
                "bytes_reader"
            };
            let writer = if method.ret.is_some() || method.kind == MethodKind::Read {
                "bytes_writer"
            } else {
                "_bytes_writer"
            };
            let call_args: Vec<String> = method
                .args
                .iter()
                .map(|arg| format!("arg_{}", snake(&arg.name)))
                .collect();
            let call = format!(
                "handler.{}({})",
                method_fn(&method.name),
                call_args.join(", ")
            );

            out.open("");
            out.line("let handler = Arc::clone(&handler);");
            out.line("dispatcher.register(");
            out.indent();
            out.line(format!("{rpc}::groups::{group},"));
            out.line(format!(
                "{rpc}::MethodAddress::new(scope.clone(), methods::{}),",
                screaming_snake(&method.name)
            ));
            out.open(format!("move |{reader}, {writer}|"));
            for (arg, local) in method.args.iter().zip(&call_args) {
                out.line(format!(
                    "let {local} = {}::read_from_buffers(bytes_reader)?;",
                    qualified(&schema.type_name(arg.ty))
                ));
            }
            match (method.kind, method.ret) {
                (MethodKind::Read, _) => out.line(format!("{call}.write_frame(bytes_writer);")),
                (_, Some(_)) => out.line(format!("{call}.write_to_buffers(bytes_writer);")),
                (_, None) => out.line(format!("{call};")),
            }
            out.line("Ok(())");
            out.close(",");
            out.dedent();
            out.line(")?;");
            out.close("");
        }
        out.line("Ok(())");
        out.close("");
    }

    fn emit_streams(&mut self, out: &mut SourceWriter, streams: &[&ResolvedMethod]) {
        let rpc = self.config.rpc_crate.as_str();

        out.blank();
        out.line("/// Register a typed slot for every stream of this scope.");
        out.open(format!(
            "pub fn register_streams(hub: &{rpc}::StreamHub) -> {rpc}::Result<()>"
        ));
        for method in streams {
            out.line(format!(
                "hub.register::<{}>({rpc}::MethodAddress::new(SCOPE_ID, methods::{}))?;",
                self.stream_type(method),
                screaming_snake(&method.name)
            ));
        }
        out.line("Ok(())");
        out.close("");

        for method in streams {
            out.blank();
            out.line(format!("pub fn subscribe_{}(", snake(&method.name)));
            out.indent();
            out.line(format!("hub: &{rpc}::StreamHub,"));
            out.dedent();
            out.open(format!(
                ") -> {rpc}::Result<{rpc}::Subscription<{}>>",
                self.stream_type(method)
            ));
            out.line(format!(
                "hub.subscribe(&{rpc}::MethodAddress::new(SCOPE_ID, methods::{}))",
                screaming_snake(&method.name)
            ));
            out.close("");
        }
    }

    /// Value type of a stream; signal streams carry `()`.
    fn stream_type(&self, method: &ResolvedMethod) -> String {
        method
            .ret
            .map(|ret| self.schema.type_name(ret))
            .unwrap_or_else(|| "()".to_string())
    }

    fn emit_routing(&mut self, out: &mut SourceWriter) {
        let schema = self.schema;
        let rpc = self.config.rpc_crate.as_str();
        let routing = &schema.routing;

        if !routing.groups.is_empty() {
            out.blank();
            out.open("pub mod groups");
            out.line(format!("use {rpc}::GroupAddress;"));
            out.blank();
            for group in &routing.groups {
                out.line(format!(
                    "pub const {}: GroupAddress = GroupAddress({});",
                    screaming_snake(&group.name),
                    group.address
                ));
            }
            out.close("");
        }

        if !routing.command_buffers.is_empty() {
            out.blank();
            out.open("pub mod commands_buffers");
            out.line(format!("use {rpc}::CommandsBufferAddress;"));
            out.blank();
            for buffer in &routing.command_buffers {
                out.line(format!(
                    "pub const {}: CommandsBufferAddress = CommandsBufferAddress({});",
                    buffer.const_name(),
                    buffer.address
                ));
            }
            out.close("");
        }

        if routing.commands.is_empty() {
            return;
        }
        self.wire_imports.extend(["BuffersModel", "BytesWriter"]);

        let commands: Vec<VariantPlan> = routing
            .commands
            .iter()
            .map(|command| {
                let labels = command
                    .fields
                    .iter()
                    .map(|field| (field.name.clone(), schema.type_name(field.ty)))
                    .collect();
                let (shape, fields) = plan_fields(labels);
                VariantPlan {
                    name: upper_camel(&command.name),
                    discriminant: command.opcode,
                    shape,
                    fields,
                }
            })
            .collect();

        out.blank();
        out.line("/// Command opcodes.");
        out.open("pub mod commands");
        for (command, plan) in routing.commands.iter().zip(&commands) {
            out.line(format!(
                "pub const {}: u64 = {};",
                screaming_snake(&command.name),
                plan.discriminant
            ));
        }
        out.close("");

        out.blank();
        out.line("/// Draw/render commands carried in command buffers.");
        out.line("#[derive(Debug, Clone, PartialEq)]");
        out.open("pub enum Command");
        for plan in &commands {
            out.line(plan.declaration());
        }
        out.close("");

        out.blank();
        out.open("impl Command");
        out.open(format!("pub fn opcode(&self) -> {rpc}::Opcode"));
        out.open("match self");
        for (command, plan) in routing.commands.iter().zip(&commands) {
            out.line(format!(
                "{} => {rpc}::Opcode(commands::{}),",
                plan.wildcard("Self"),
                screaming_snake(&command.name)
            ));
        }
        out.close("");
        out.close("");
        out.blank();
        out.line("/// Append the opcode and payload.");
        out.open("pub fn write_to_buffers(&self, bytes_writer: &mut BytesWriter)");
        out.line("bytes_writer.write_u64(self.opcode().0);");
        emit_write_arms(out, "Self", &commands);
        out.close("");
        out.close("");

        out.blank();
        out.line("/// Decoder for every command declared in this schema.");
        out.open(format!(
            "pub fn command_decoder() -> {rpc}::Result<{rpc}::CommandDecoder<Command>>"
        ));
        out.line(format!("let mut decoder = {rpc}::CommandDecoder::new();"));
        for (command, plan) in routing.commands.iter().zip(&commands) {
            let opcode = format!("{rpc}::Opcode(commands::{})", screaming_snake(&command.name));
            let path = format!("Command::{}", plan.name);
            if plan.fields.is_empty() {
                out.line(format!("decoder.register({opcode}, |_| Ok({path}))?;"));
                continue;
            }
            out.open(format!("decoder.register({opcode}, |bytes_reader|"));
            construct(out, "Ok(", &path, ")", plan.shape, &plan.fields, |field| {
                format!("{}::read_from_buffers(bytes_reader)?", qualified(&field.ty))
            });
            out.close(")?;");
        }
        out.line("Ok(decoder)");
        out.close("");
    }

    fn emit_const_block(&self, out: &mut SourceWriter, block: &ConstBlock) {
        out.open(format!("pub mod {}", escape_ident(&block.name)));
        let mut after_block = false;
        for item in &block.items {
            match item {
                ConstItem::Block(inner) => {
                    out.blank();
                    self.emit_const_block(out, inner);
                    after_block = true;
                }
                ConstItem::Value { name, ty, value } => {
                    if after_block {
                        out.blank();
                        after_block = false;
                    }
                    let (ty, literal) = self.const_literal(ty, value);
                    out.line(format!(
                        "pub const {}: {ty} = {literal};",
                        escape_ident(name)
                    ));
                }
            }
        }
        out.close("");
    }

    fn const_literal(&self, ty: &str, value: &ConstValue) -> (String, String) {
        let rpc = self.config.rpc_crate.as_str();
        let literal = match value {
            ConstValue::Bool(value) => value.to_string(),
            ConstValue::Int(value) if ty == "f32" || ty == "f64" => format!("{value}.0"),
            ConstValue::Int(value) => value.to_string(),
            ConstValue::Float(value) => format!("{value:?}"),
            ConstValue::Str(value) => format!("{value:?}"),
        };
        match ty {
            GROUP_ADDRESS_TYPE | COMMANDS_BUFFER_ADDRESS_TYPE => {
                (format!("{rpc}::{ty}"), format!("{rpc}::{ty}({literal})"))
            }
            "String" => ("&str".to_string(), literal),
            _ => (ty.to_string(), literal),
        }
    }

    fn plan_decl_fields(&self, fields: &[FieldDecl], owner: &str) -> (Shape, Vec<FieldPlan>) {
        let labels = fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.label(index), self.render(&field.ty, Some(owner))))
            .collect();
        plan_fields(labels)
    }

    fn fixed_size(&self, name: &str, concrete: bool) -> Option<usize> {
        if !concrete {
            return None;
        }
        let id = self.schema.lookup(name)?;
        self.codecs.get(id)?.fixed_size
    }

    /// Rust spelling of a field type; inline references that lead back to
    /// `owner` are boxed.
    fn render(&self, ty: &TypeRef, owner: Option<&str>) -> String {
        match ty {
            TypeRef::Primitive(primitive) => primitive.name().to_string(),
            TypeRef::Optional(inner) => format!("Option<{}>", self.render(inner, owner)),
            TypeRef::Collection(inner) => format!("Vec<{}>", self.render(inner, None)),
            TypeRef::Named { name, args } => {
                let base = if args.is_empty() {
                    name.clone()
                } else {
                    let args: Vec<String> =
                        args.iter().map(|arg| self.render(arg, owner)).collect();
                    format!("{name}<{}>", args.join(", "))
                };
                match owner {
                    Some(owner) if self.reaches(name, owner) => format!("Box<{base}>"),
                    _ => base,
                }
            }
        }
    }

    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(name) = stack.pop() {
            if name == to {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            if let Some(refs) = self.direct_refs.get(name) {
                stack.extend(refs.iter().copied());
            }
        }
        false
    }
}

fn decl_fields(decl: &Decl) -> Vec<&FieldDecl> {
    match decl {
        Decl::Struct(decl) => decl.fields.iter().collect(),
        Decl::Enum(decl) => decl
            .variants
            .iter()
            .flat_map(|variant| &variant.fields)
            .collect(),
    }
}

fn collect_inline_refs<'t>(ty: &'t TypeRef, out: &mut BTreeSet<&'t str>) {
    match ty {
        TypeRef::Primitive(_) | TypeRef::Collection(_) => {}
        TypeRef::Optional(inner) => collect_inline_refs(inner, out),
        TypeRef::Named { name, args } => {
            out.insert(name);
            for arg in args {
                collect_inline_refs(arg, out);
            }
        }
    }
}

fn plan_fields(labels: Vec<(FieldName, String)>) -> (Shape, Vec<FieldPlan>) {
    let shape = if labels.is_empty() {
        Shape::Unit
    } else if labels.iter().all(|(label, _)| label.is_positional()) {
        Shape::Tuple
    } else {
        Shape::Named
    };

    let fields = labels
        .into_iter()
        .enumerate()
        .map(|(index, (label, ty))| {
            let ident = escape_ident(&label.binding());
            let binding = if RESERVED_LOCALS.contains(&ident.as_str()) {
                format!("{ident}_")
            } else {
                ident.clone()
            };
            let member = match shape {
                Shape::Tuple => index.to_string(),
                _ => ident,
            };
            FieldPlan {
                member,
                binding,
                ty,
            }
        })
        .collect();
    (shape, fields)
}

/// Emit `{head}{path}{fields}{tail}` with one field per line.
fn construct(
    out: &mut SourceWriter,
    head: &str,
    path: &str,
    tail: &str,
    shape: Shape,
    fields: &[FieldPlan],
    expr: impl Fn(&FieldPlan) -> String,
) {
    match shape {
        Shape::Unit => out.line(format!("{head}{path}{tail}")),
        Shape::Tuple => {
            out.line(format!("{head}{path}("));
            out.indent();
            for field in fields {
                out.line(format!("{},", expr(field)));
            }
            out.dedent();
            out.line(format!("){tail}"));
        }
        Shape::Named => {
            out.line(format!("{head}{path} {{"));
            out.indent();
            for field in fields {
                out.line(format!("{}: {},", field.member, expr(field)));
            }
            out.dedent();
            out.line(format!("}}{tail}"));
        }
    }
}

fn emit_write_arms(out: &mut SourceWriter, path: &str, variants: &[VariantPlan]) {
    if variants.iter().all(|variant| variant.fields.is_empty()) {
        return;
    }
    out.open("match self");
    for variant in variants {
        if variant.fields.is_empty() {
            out.line(format!("{} => {{}}", variant.pattern(path)));
            continue;
        }
        out.open(format!("{} =>", variant.pattern(path)));
        for field in &variant.fields {
            out.line(format!("{}.write_to_buffers(bytes_writer);", field.binding));
        }
        out.close("");
    }
    out.close("");
}

fn qualified(ty: &str) -> String {
    format!("<{ty} as BuffersModel>")
}

fn method_fn(name: &str) -> String {
    escape_ident(&snake(name))
}

fn type_params(params: &[String]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!("<{}>", params.join(", "))
    }
}

fn bounded_params(params: &[String]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        let bounded: Vec<String> = params
            .iter()
            .map(|param| format!("{param}: BuffersModel"))
            .collect();
        format!("<{}>", bounded.join(", "))
    }
}
