use std::collections::{BTreeMap, BTreeSet, HashMap};

use bufgen_wire::command_opcode;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::{Result, SchemaError};
use crate::naming::{screaming_snake, upper_camel};
use crate::schema::{
    ResolvedArg, ResolvedCommand, ResolvedCommandBuffer, ResolvedEnum, ResolvedField,
    ResolvedGroup, ResolvedKind, ResolvedMethod, ResolvedStruct, ResolvedType, ResolvedVariant,
    Routing, Schema, TypeId,
};
use crate::source::{
    ConstBlock, ConstItem, ConstValue, Decl, EnumDecl, FieldDecl, MethodDecl, MethodKind,
    RoutingDecl, SchemaSource,
};
use crate::types::{is_reserved, Primitive, TypeRef};

/// Constant type naming a routing group address.
pub const GROUP_ADDRESS_TYPE: &str = "GroupAddress";

/// Constant type naming a command buffer address.
pub const COMMANDS_BUFFER_ADDRESS_TYPE: &str = "CommandsBufferAddress";

/// Module names taken by generated routing and RPC code.
pub const GENERATED_MODULES: [&str; 4] = ["groups", "commands_buffers", "commands", "methods"];

/// Resolve a schema source with default limits.
pub fn resolve(source: &SchemaSource) -> Result<Schema> {
    Resolver::new().resolve(source)
}

/// Turns raw declarations into an immutable [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Validate every declaration and instantiate every type in use.
    ///
    /// Non-generic declarations are always resolved; generic declarations are
    /// instantiated once per distinct argument tuple actually referenced.
    pub fn resolve(&self, source: &SchemaSource) -> Result<Schema> {
        let mut builder = Builder::new(self.config, source)?;

        for decl in &source.types {
            builder.validate_decl(decl)?;
        }
        for decl in source.types.iter().filter(|decl| !decl.is_generic()) {
            builder.intern(&TypeRef::named(decl.name()), &BTreeMap::new(), 0)?;
        }

        let methods = builder.resolve_methods(&source.methods)?;
        let routing = builder.resolve_routing(&source.routing)?;
        for block in &source.consts {
            if GENERATED_MODULES.contains(&block.name.as_str()) {
                return Err(SchemaError::InvalidConst {
                    name: block.name.clone(),
                    reason: "block name collides with a generated module".to_string(),
                });
            }
            check_const_block(block)?;
        }

        debug!(
            scope = %source.scope_id,
            decls = source.types.len(),
            types = builder.types.len(),
            methods = methods.len(),
            commands = routing.commands.len(),
            "resolved schema"
        );

        Ok(Schema {
            scope_id: source.scope_id.clone(),
            decls: source.types.clone(),
            types: builder.types,
            methods,
            routing,
            consts: source.consts.clone(),
            by_name: builder.by_name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Primitive(Primitive),
    Optional(TypeId),
    Collection(TypeId),
    Named(String, Vec<TypeId>),
}

struct Builder<'s> {
    config: ResolverConfig,
    decls: BTreeMap<&'s str, &'s Decl>,
    types: Vec<ResolvedType>,
    memo: HashMap<TypeKey, TypeId>,
    by_name: BTreeMap<String, TypeId>,
}

impl<'s> Builder<'s> {
    fn new(config: ResolverConfig, source: &'s SchemaSource) -> Result<Self> {
        let mut decls = BTreeMap::new();
        for decl in &source.types {
            let name = decl.name();
            if is_reserved(name) {
                return Err(SchemaError::ReservedName(name.to_string()));
            }
            if decls.insert(name, decl).is_some() {
                return Err(SchemaError::DuplicateType(name.to_string()));
            }

            let mut params = BTreeSet::new();
            for param in decl.params() {
                if is_reserved(param) {
                    return Err(SchemaError::ReservedName(param.clone()));
                }
                if !params.insert(param.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        owner: format!("type parameters of {name}"),
                        field: param.clone(),
                    });
                }
            }
        }

        Ok(Self {
            config,
            decls,
            types: Vec::new(),
            memo: HashMap::new(),
            by_name: BTreeMap::new(),
        })
    }

    fn validate_decl(&self, decl: &Decl) -> Result<()> {
        match decl {
            Decl::Struct(decl) => {
                self.check_fields(&format!("struct {}", decl.name), &decl.fields, &decl.params)?
            }
            Decl::Enum(decl) => self.validate_enum(decl)?,
        }
        check_params_used(decl)
    }

    fn validate_enum(&self, decl: &EnumDecl) -> Result<()> {
        if decl.variants.is_empty() {
            return Err(SchemaError::EmptyEnum(decl.name.clone()));
        }

        let mut names = BTreeSet::new();
        let mut discriminants: BTreeMap<u32, &str> = BTreeMap::new();
        let mut default: Option<&str> = None;
        for variant in &decl.variants {
            if !names.insert(variant.name.as_str()) {
                return Err(SchemaError::DuplicateVariant {
                    enum_name: decl.name.clone(),
                    variant: variant.name.clone(),
                });
            }
            if let Some(first) = discriminants.insert(variant.discriminant, variant.name.as_str()) {
                return Err(SchemaError::DuplicateDiscriminant {
                    enum_name: decl.name.clone(),
                    value: variant.discriminant,
                    first: first.to_string(),
                    second: variant.name.clone(),
                });
            }
            if variant.default {
                if let Some(first) = default {
                    return Err(SchemaError::MultipleDefaults {
                        enum_name: decl.name.clone(),
                        first: first.to_string(),
                        second: variant.name.clone(),
                    });
                }
                default = Some(variant.name.as_str());
            }
            self.check_fields(
                &format!("variant {}::{}", decl.name, variant.name),
                &variant.fields,
                &decl.params,
            )?;
        }

        if default.is_none() {
            return Err(SchemaError::MissingDefault(decl.name.clone()));
        }
        Ok(())
    }

    fn check_fields(&self, owner: &str, fields: &[FieldDecl], params: &[String]) -> Result<()> {
        let mut bindings = BTreeSet::new();
        for (index, field) in fields.iter().enumerate() {
            let binding = field.label(index).binding();
            if !bindings.insert(binding.clone()) {
                return Err(SchemaError::DuplicateField {
                    owner: owner.to_string(),
                    field: binding,
                });
            }
            self.check_ref(&field.ty, params, owner)?;
        }
        Ok(())
    }

    /// Check that every name in `ty` resolves with the right arity.
    fn check_ref(&self, ty: &TypeRef, params: &[String], context: &str) -> Result<()> {
        let mut failure = None;
        ty.for_each_named(&mut |name, args| {
            if failure.is_none() {
                failure = self.check_named(name, args.len(), params, context).err();
            }
        });
        failure.map_or(Ok(()), Err)
    }

    fn check_named(&self, name: &str, arity: usize, params: &[String], context: &str) -> Result<()> {
        let expected = if params.iter().any(|param| param == name) {
            0
        } else {
            match self.decls.get(name) {
                Some(decl) => decl.params().len(),
                None => {
                    return Err(SchemaError::UnknownType {
                        name: name.to_string(),
                        context: context.to_string(),
                    })
                }
            }
        };
        if arity != expected {
            return Err(SchemaError::ArityMismatch {
                name: name.to_string(),
                expected,
                found: arity,
            });
        }
        Ok(())
    }

    fn insert(&mut self, key: TypeKey, name: String, kind: ResolvedKind) -> TypeId {
        if let Some(id) = self.memo.get(&key) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ResolvedType {
            id,
            name: name.clone(),
            kind,
        });
        self.memo.insert(key, id);
        self.by_name.insert(name, id);
        id
    }

    /// Resolve `ty` under `subst`, instantiating generic declarations on first use.
    ///
    /// `depth` counts nested generic instantiations only; recursion through
    /// already-interned types terminates on the memo.
    fn intern(
        &mut self,
        ty: &TypeRef,
        subst: &BTreeMap<String, TypeId>,
        depth: usize,
    ) -> Result<TypeId> {
        match ty {
            TypeRef::Primitive(primitive) => Ok(self.insert(
                TypeKey::Primitive(*primitive),
                primitive.name().to_string(),
                ResolvedKind::Primitive(*primitive),
            )),
            TypeRef::Optional(inner) => {
                let inner = self.intern(inner, subst, depth)?;
                let name = format!("Option<{}>", self.types[inner.index()].name);
                Ok(self.insert(TypeKey::Optional(inner), name, ResolvedKind::Optional(inner)))
            }
            TypeRef::Collection(inner) => {
                let inner = self.intern(inner, subst, depth)?;
                let name = format!("Vec<{}>", self.types[inner.index()].name);
                Ok(self.insert(
                    TypeKey::Collection(inner),
                    name,
                    ResolvedKind::Collection(inner),
                ))
            }
            TypeRef::Named { name, args } => {
                if args.is_empty() {
                    if let Some(id) = subst.get(name) {
                        return Ok(*id);
                    }
                }
                self.instantiate(name, args, subst, depth)
            }
        }
    }

    fn instantiate(
        &mut self,
        name: &str,
        args: &[TypeRef],
        subst: &BTreeMap<String, TypeId>,
        depth: usize,
    ) -> Result<TypeId> {
        let decl: &'s Decl = match self.decls.get(name) {
            Some(decl) => *decl,
            None => {
                return Err(SchemaError::UnknownType {
                    name: name.to_string(),
                    context: "type expression".to_string(),
                })
            }
        };
        if decl.params().len() != args.len() {
            return Err(SchemaError::ArityMismatch {
                name: name.to_string(),
                expected: decl.params().len(),
                found: args.len(),
            });
        }

        let arg_ids = args
            .iter()
            .map(|arg| self.intern(arg, subst, depth))
            .collect::<Result<Vec<_>>>()?;
        let key = TypeKey::Named(name.to_string(), arg_ids.clone());
        if let Some(id) = self.memo.get(&key) {
            return Ok(*id);
        }

        let depth = if arg_ids.is_empty() { depth } else { depth + 1 };
        if depth > self.config.max_instantiation_depth {
            return Err(SchemaError::InstantiationTooDeep {
                name: name.to_string(),
                max: self.config.max_instantiation_depth,
            });
        }

        let display = if arg_ids.is_empty() {
            name.to_string()
        } else {
            let args: Vec<&str> = arg_ids
                .iter()
                .map(|id| self.types[id.index()].name.as_str())
                .collect();
            format!("{name}<{}>", args.join(", "))
        };

        // Reserve the id before resolving fields so self-references hit the memo.
        let placeholder = ResolvedKind::Struct(ResolvedStruct {
            decl: name.to_string(),
            args: arg_ids.clone(),
            fields: Vec::new(),
        });
        let id = self.insert(key, display, placeholder);

        let inner: BTreeMap<String, TypeId> = decl
            .params()
            .iter()
            .cloned()
            .zip(arg_ids.iter().copied())
            .collect();
        let kind = match decl {
            Decl::Struct(decl) => ResolvedKind::Struct(ResolvedStruct {
                decl: decl.name.clone(),
                args: arg_ids,
                fields: self.resolve_fields(&decl.fields, &inner, depth)?,
            }),
            Decl::Enum(decl) => {
                let mut variants = Vec::with_capacity(decl.variants.len());
                let mut default_index = 0;
                for (index, variant) in decl.variants.iter().enumerate() {
                    if variant.default {
                        default_index = index;
                    }
                    variants.push(ResolvedVariant {
                        name: variant.name.clone(),
                        discriminant: variant.discriminant,
                        fields: self.resolve_fields(&variant.fields, &inner, depth)?,
                    });
                }
                ResolvedKind::Enum(ResolvedEnum {
                    decl: decl.name.clone(),
                    args: arg_ids,
                    variants,
                    default_index,
                })
            }
        };
        self.types[id.index()].kind = kind;
        Ok(id)
    }

    fn resolve_fields(
        &mut self,
        fields: &[FieldDecl],
        subst: &BTreeMap<String, TypeId>,
        depth: usize,
    ) -> Result<Vec<ResolvedField>> {
        fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                Ok(ResolvedField {
                    name: field.label(index),
                    ty: self.intern(&field.ty, subst, depth)?,
                })
            })
            .collect()
    }

    fn resolve_methods(&mut self, methods: &[MethodDecl]) -> Result<Vec<ResolvedMethod>> {
        let mut names = BTreeSet::new();
        let mut ids: BTreeMap<u32, &str> = BTreeMap::new();
        let mut next_id = 0u32;
        let mut resolved = Vec::with_capacity(methods.len());

        for method in methods {
            if !names.insert(method.name.as_str()) {
                return Err(SchemaError::DuplicateMethod(method.name.clone()));
            }
            let id = method.id.unwrap_or(next_id);
            next_id = id.saturating_add(1);
            if let Some(first) = ids.insert(id, method.name.as_str()) {
                return Err(SchemaError::DuplicateMethodId {
                    id,
                    first: first.to_string(),
                    second: method.name.clone(),
                });
            }

            // A read method without a return type is a bare signal stream.
            if method.kind == MethodKind::Read && !method.args.is_empty() {
                return Err(SchemaError::InvalidStreamMethod {
                    name: method.name.clone(),
                    reason: "must not take arguments".to_string(),
                });
            }

            let context = format!("method {}", method.name);
            let mut arg_names = BTreeSet::new();
            let mut args = Vec::with_capacity(method.args.len());
            for arg in &method.args {
                if !arg_names.insert(arg.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        owner: context,
                        field: arg.name.clone(),
                    });
                }
                self.check_ref(&arg.ty, &[], &context)?;
                args.push(ResolvedArg {
                    name: arg.name.clone(),
                    ty: self.intern(&arg.ty, &BTreeMap::new(), 0)?,
                });
            }
            let ret = match &method.ret {
                Some(ty) => {
                    self.check_ref(ty, &[], &context)?;
                    Some(self.intern(ty, &BTreeMap::new(), 0)?)
                }
                None => None,
            };

            resolved.push(ResolvedMethod {
                name: method.name.clone(),
                id,
                kind: method.kind,
                args,
                ret,
            });
        }
        check_identifiers("method", methods.iter().map(|m| m.name.clone()), screaming_snake)?;
        Ok(resolved)
    }

    fn resolve_routing(&mut self, routing: &RoutingDecl) -> Result<Routing> {
        let mut seen = BTreeSet::new();
        let mut groups = Vec::with_capacity(routing.groups.len());
        for (index, name) in routing.groups.iter().enumerate() {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateRoute {
                    kind: "group",
                    name: name.clone(),
                });
            }
            groups.push(ResolvedGroup {
                name: name.clone(),
                address: index as u64,
            });
        }

        let mut surfaces = BTreeSet::new();
        let mut command_buffers = Vec::new();
        for surface in &routing.surfaces {
            if !surfaces.insert(surface.name.as_str()) {
                return Err(SchemaError::DuplicateRoute {
                    kind: "surface",
                    name: surface.name.clone(),
                });
            }
            let mut buffers = BTreeSet::new();
            for (index, name) in surface.buffers.iter().enumerate() {
                if !buffers.insert(name.as_str()) {
                    return Err(SchemaError::DuplicateRoute {
                        kind: "command buffer",
                        name: format!("{}.{name}", surface.name),
                    });
                }
                command_buffers.push(ResolvedCommandBuffer {
                    surface: surface.name.clone(),
                    name: name.clone(),
                    address: index as u64,
                });
            }
        }

        let mut names = BTreeSet::new();
        let mut commands = Vec::with_capacity(routing.commands.len());
        for (index, command) in routing.commands.iter().enumerate() {
            if !names.insert(command.name.as_str()) {
                return Err(SchemaError::DuplicateRoute {
                    kind: "command",
                    name: command.name.clone(),
                });
            }
            self.check_fields(&format!("command {}", command.name), &command.fields, &[])?;
            commands.push(ResolvedCommand {
                name: command.name.clone(),
                opcode: command_opcode(index),
                fields: self.resolve_fields(&command.fields, &BTreeMap::new(), 0)?,
            });
        }

        check_identifiers("group", routing.groups.iter().cloned(), screaming_snake)?;
        check_identifiers(
            "command buffer",
            command_buffers.iter().map(|buffer| buffer.const_name()),
            str::to_string,
        )?;
        let command_names = || routing.commands.iter().map(|command| command.name.clone());
        check_identifiers("command", command_names(), screaming_snake)?;
        check_identifiers("command", command_names(), upper_camel)?;

        Ok(Routing {
            groups,
            command_buffers,
            commands,
        })
    }
}

/// Reject names that differ in the schema but convert to the same identifier.
fn check_identifiers(
    kind: &'static str,
    names: impl Iterator<Item = String>,
    convert: impl Fn(&str) -> String,
) -> Result<()> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for name in names {
        let ident = convert(&name);
        if let Some(first) = seen.get(&ident) {
            return Err(SchemaError::IdentifierCollision {
                kind,
                first: first.clone(),
                second: name,
                ident,
            });
        }
        seen.insert(ident, name);
    }
    Ok(())
}

fn check_params_used(decl: &Decl) -> Result<()> {
    if !decl.is_generic() {
        return Ok(());
    }
    let fields: Vec<&FieldDecl> = match decl {
        Decl::Struct(decl) => decl.fields.iter().collect(),
        Decl::Enum(decl) => decl.variants.iter().flat_map(|v| &v.fields).collect(),
    };
    let mut used = BTreeSet::new();
    for field in fields {
        field.ty.for_each_named(&mut |name, _| {
            used.insert(name);
        });
    }
    match decl.params().iter().find(|param| !used.contains(param.as_str())) {
        Some(param) => Err(SchemaError::UnusedParameter {
            decl: decl.name().to_string(),
            param: param.clone(),
        }),
        None => Ok(()),
    }
}

fn check_const_block(block: &ConstBlock) -> Result<()> {
    let mut names = BTreeSet::new();
    for item in &block.items {
        let name = match item {
            ConstItem::Block(inner) => {
                check_const_block(inner)?;
                &inner.name
            }
            ConstItem::Value { name, ty, value } => {
                check_const_value(name, ty, value)?;
                name
            }
        };
        if !names.insert(name.as_str()) {
            return Err(SchemaError::InvalidConst {
                name: name.clone(),
                reason: format!("declared twice in block {}", block.name),
            });
        }
    }
    Ok(())
}

fn check_const_value(name: &str, ty: &str, value: &ConstValue) -> Result<()> {
    let invalid = |reason: String| SchemaError::InvalidConst {
        name: name.to_string(),
        reason,
    };

    if ty == GROUP_ADDRESS_TYPE || ty == COMMANDS_BUFFER_ADDRESS_TYPE {
        return match value {
            ConstValue::Int(v) if *v >= 0 => Ok(()),
            _ => Err(invalid(format!("{ty} requires a non-negative integer"))),
        };
    }

    let primitive = Primitive::from_name(ty)
        .ok_or_else(|| invalid(format!("unsupported constant type `{ty}`")))?;
    let fits = match (primitive, value) {
        (Primitive::U8, ConstValue::Int(v)) => u8::try_from(*v).is_ok(),
        (Primitive::I32, ConstValue::Int(v)) => i32::try_from(*v).is_ok(),
        (Primitive::U32, ConstValue::Int(v)) => u32::try_from(*v).is_ok(),
        (Primitive::U64, ConstValue::Int(v)) => *v >= 0,
        (Primitive::I64, ConstValue::Int(_)) => true,
        (Primitive::F32 | Primitive::F64, ConstValue::Int(_) | ConstValue::Float(_)) => true,
        (Primitive::Bool, ConstValue::Bool(_)) => true,
        (Primitive::String, ConstValue::Str(_)) => true,
        _ => false,
    };
    if fits {
        Ok(())
    } else {
        Err(invalid(format!("value {value:?} does not fit {ty}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ArgDecl, CommandDecl, StructDecl, SurfaceDecl, VariantDecl};
    use pretty_assertions::assert_eq;

    fn ty(expr: &str) -> TypeRef {
        expr.parse().unwrap()
    }

    fn source(types: Vec<Decl>) -> SchemaSource {
        SchemaSource {
            scope_id: "test".into(),
            types,
            methods: Vec::new(),
            routing: RoutingDecl::default(),
            consts: Vec::new(),
        }
    }

    fn strukt(name: &str, params: &[&str], fields: &[(&str, &str)]) -> Decl {
        Decl::Struct(StructDecl {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            fields: fields
                .iter()
                .map(|(name, expr)| FieldDecl::named(*name, ty(expr)))
                .collect(),
        })
    }

    fn variant(name: &str, discriminant: u32, default: bool, fields: &[&str]) -> VariantDecl {
        VariantDecl {
            name: name.into(),
            discriminant,
            default,
            fields: fields.iter().map(|expr| FieldDecl::positional(ty(expr))).collect(),
        }
    }

    fn enumeration(name: &str, variants: Vec<VariantDecl>) -> Decl {
        Decl::Enum(EnumDecl {
            name: name.into(),
            params: Vec::new(),
            variants,
        })
    }

    fn method(name: &str, args: &[(&str, &str)], ret: Option<&str>, kind: MethodKind) -> MethodDecl {
        MethodDecl {
            name: name.into(),
            args: args
                .iter()
                .map(|(name, expr)| ArgDecl {
                    name: name.to_string(),
                    ty: ty(expr),
                })
                .collect(),
            ret: ret.map(ty),
            kind,
            id: None,
        }
    }

    #[test]
    fn resolves_struct_fields_in_declared_order() {
        let schema = resolve(&source(vec![strukt(
            "Vec2",
            &[],
            &[("y", "f32"), ("x", "f32")],
        )]))
        .unwrap();

        let id = schema.lookup("Vec2").unwrap();
        let ResolvedKind::Struct(vec2) = &schema.get(id).unwrap().kind else {
            panic!("expected struct");
        };
        let names: Vec<String> = vec2.fields.iter().map(|f| f.name.to_string()).collect();
        assert_eq!(names, vec!["y", "x"]);
    }

    #[test]
    fn generic_instantiations_are_memoized_per_argument_tuple() {
        let schema = resolve(&source(vec![
            strukt("Test", &[], &[("a", "u8")]),
            strukt(
                "LinearTable",
                &["K", "V"],
                &[("keys", "Vec<K>"), ("values", "Vec<V>")],
            ),
            strukt(
                "Holder",
                &[],
                &[
                    ("first", "LinearTable<f32, Test>"),
                    ("second", "LinearTable<f32, Test>"),
                    ("third", "LinearTable<u8, Test>"),
                ],
            ),
        ]))
        .unwrap();

        let holder = schema.lookup("Holder").unwrap();
        let ResolvedKind::Struct(holder) = &schema.get(holder).unwrap().kind else {
            panic!("expected struct");
        };
        assert_eq!(holder.fields[0].ty, holder.fields[1].ty);
        assert_ne!(holder.fields[0].ty, holder.fields[2].ty);
        assert_eq!(
            schema.type_name(holder.fields[0].ty),
            "LinearTable<f32, Test>"
        );
        assert!(schema.lookup("Vec<Test>").is_some());
        // Generic declarations alone produce no instantiation.
        assert!(schema.lookup("LinearTable").is_none());
    }

    #[test]
    fn self_reference_through_collection_resolves() {
        let schema = resolve(&source(vec![strukt(
            "Node",
            &[],
            &[("label", "String"), ("children", "Vec<Node>")],
        )]))
        .unwrap();

        let node = schema.lookup("Node").unwrap();
        let children = schema.lookup("Vec<Node>").unwrap();
        assert_eq!(
            schema.get(children).unwrap().kind,
            ResolvedKind::Collection(node)
        );
    }

    #[test]
    fn unbounded_generic_expansion_hits_depth_limit() {
        let src = source(vec![
            strukt("Nest", &["T"], &[("inner", "Option<Nest<Vec<T>>>")]),
            strukt("Root", &[], &[("nest", "Nest<u8>")]),
        ]);

        let err = Resolver::with_config(ResolverConfig {
            max_instantiation_depth: 4,
            ..ResolverConfig::default()
        })
        .resolve(&src)
        .unwrap_err();
        assert!(matches!(err, SchemaError::InstantiationTooDeep { max: 4, .. }));
    }

    #[test]
    fn enum_default_and_discriminants() {
        let schema = resolve(&source(vec![enumeration(
            "State",
            vec![
                variant("Move", 1, false, &["f64", "f64"]),
                variant("Idle", 3, true, &[]),
            ],
        )]))
        .unwrap();

        let id = schema.lookup("State").unwrap();
        let ResolvedKind::Enum(state) = &schema.get(id).unwrap().kind else {
            panic!("expected enum");
        };
        assert_eq!(state.default_variant().name, "Idle");
        assert_eq!(state.variant_by_discriminant(1).unwrap().name, "Move");
        assert!(state.variant_by_discriminant(2).is_none());
        assert_eq!(state.variants[0].fields[1].name.binding(), "p1");
    }

    #[test]
    fn enum_validation_errors() {
        let cases = [
            (
                enumeration("E", vec![]),
                "no variants",
            ),
            (
                enumeration("E", vec![variant("A", 0, false, &[])]),
                "no default",
            ),
            (
                enumeration("E", vec![variant("A", 0, true, &[]), variant("B", 1, true, &[])]),
                "multiple default",
            ),
            (
                enumeration("E", vec![variant("A", 5, true, &[]), variant("B", 5, false, &[])]),
                "duplicate discriminant 5",
            ),
            (
                enumeration("E", vec![variant("A", 0, true, &[]), variant("A", 1, false, &[])]),
                "duplicate variant",
            ),
        ];
        for (decl, expected) in cases {
            let err = resolve(&source(vec![decl])).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "`{err}` should mention `{expected}`"
            );
        }
    }

    #[test]
    fn declaration_errors() {
        let err = resolve(&source(vec![strukt("A", &[], &[("b", "Missing")])])).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { ref name, .. } if name == "Missing"));

        let err = resolve(&source(vec![
            strukt("A", &[], &[]),
            strukt("A", &[], &[]),
        ]))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateType(ref name) if name == "A"));

        let err = resolve(&source(vec![strukt("A", &[], &[("x", "u8"), ("x", "u8")])]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));

        let err = resolve(&source(vec![
            strukt("Pair", &["A", "B"], &[("a", "A"), ("b", "B")]),
            strukt("User", &[], &[("p", "Pair<u8>")]),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));

        let err = resolve(&source(vec![strukt("f32", &[], &[])])).unwrap_err();
        assert!(matches!(err, SchemaError::ReservedName(_)));

        let err = resolve(&source(vec![strukt("Tagged", &["T", "U"], &[("t", "T")])]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnusedParameter { ref param, .. } if param == "U"));
    }

    #[test]
    fn method_ids_are_sequential_unless_explicit() {
        let mut src = source(vec![]);
        src.methods = vec![
            method("hello", &[], Some("String"), MethodKind::Sync),
            method("add", &[("a", "i32"), ("b", "i32")], Some("i32"), MethodKind::Async),
            MethodDecl {
                id: Some(10),
                ..method("reset", &[], None, MethodKind::Sync)
            },
            method("counter", &[], Some("i32"), MethodKind::Read),
        ];

        let schema = resolve(&src).unwrap();
        let ids: Vec<u32> = schema.methods.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![0, 1, 10, 11]);
        assert_eq!(schema.method("reset").unwrap().ret, None);
    }

    #[test]
    fn method_validation_errors() {
        let mut src = source(vec![]);
        src.methods = vec![
            method("a", &[], None, MethodKind::Sync),
            MethodDecl {
                id: Some(0),
                ..method("b", &[], None, MethodKind::Sync)
            },
        ];
        assert!(matches!(
            resolve(&src).unwrap_err(),
            SchemaError::DuplicateMethodId { id: 0, .. }
        ));

        src.methods = vec![method("tick", &[("n", "u8")], Some("u8"), MethodKind::Read)];
        assert!(matches!(
            resolve(&src).unwrap_err(),
            SchemaError::InvalidStreamMethod { .. }
        ));

    }

    #[test]
    fn read_method_without_return_is_a_signal_stream() {
        let mut src = source(vec![]);
        src.methods = vec![method("trigger", &[], None, MethodKind::Read)];

        let schema = resolve(&src).unwrap();
        let trigger = schema.method("trigger").unwrap();
        assert_eq!(trigger.kind, MethodKind::Read);
        assert_eq!(trigger.ret, None);
    }

    #[test]
    fn names_colliding_after_case_conversion_are_rejected() {
        let mut src = source(vec![]);
        src.methods = vec![
            method("addNumbers", &[], None, MethodKind::Sync),
            method("add_numbers", &[], None, MethodKind::Sync),
        ];
        let err = resolve(&src).unwrap_err();
        assert_eq!(
            err.to_string(),
            "method `addNumbers` and `add_numbers` both become `ADD_NUMBERS`"
        );

        src.methods.clear();
        src.routing.commands = vec![
            CommandDecl {
                name: "DrawLines".into(),
                fields: vec![],
            },
            CommandDecl {
                name: "draw_lines".into(),
                fields: vec![],
            },
        ];
        assert!(matches!(
            resolve(&src).unwrap_err(),
            SchemaError::IdentifierCollision { kind: "command", ref ident, .. } if ident == "DRAW_LINES"
        ));

        src.routing.commands.clear();
        src.routing.surfaces = vec![
            SurfaceDecl {
                name: "win".into(),
                buffers: vec!["main_render".into()],
            },
            SurfaceDecl {
                name: "win_main".into(),
                buffers: vec!["render".into()],
            },
        ];
        assert!(matches!(
            resolve(&src).unwrap_err(),
            SchemaError::IdentifierCollision { kind: "command buffer", ref ident, .. }
                if ident == "WIN_MAIN_RENDER"
        ));
    }

    #[test]
    fn routing_addresses_and_opcodes() {
        let mut src = source(vec![]);
        src.routing.surfaces = vec![SurfaceDecl {
            name: "win1".into(),
            buffers: vec!["main_render".into(), "overlay".into()],
        }];
        src.routing.commands = vec![
            CommandDecl {
                name: "DrawLines".into(),
                fields: vec![FieldDecl::named("points", ty("Vec<f32>"))],
            },
            CommandDecl {
                name: "DrawPath".into(),
                fields: vec![],
            },
        ];

        let schema = resolve(&src).unwrap();
        assert_eq!(schema.routing.groups[4].name, "RPC_READ");
        assert_eq!(schema.routing.groups[4].address, 4);
        assert_eq!(schema.routing.command_buffers[0].const_name(), "WIN1_MAIN_RENDER");
        assert_eq!(schema.routing.command_buffers[1].address, 1);
        assert_eq!(schema.routing.commands[0].opcode, 131073);
        assert_eq!(schema.routing.commands[1].opcode, 131074);
    }

    #[test]
    fn const_values_are_type_checked() {
        let mut src = source(vec![]);
        src.consts = vec![ConstBlock {
            name: "addr".into(),
            items: vec![
                ConstItem::Value {
                    name: "MAIN".into(),
                    ty: GROUP_ADDRESS_TYPE.into(),
                    value: ConstValue::Int(0),
                },
                ConstItem::Value {
                    name: "DELTA_TIME".into(),
                    ty: "f64".into(),
                    value: ConstValue::Float(16.6),
                },
            ],
        }];
        resolve(&src).unwrap();

        src.consts[0].items.push(ConstItem::Value {
            name: "SMALL".into(),
            ty: "u8".into(),
            value: ConstValue::Int(300),
        });
        assert!(matches!(
            resolve(&src).unwrap_err(),
            SchemaError::InvalidConst { ref name, .. } if name == "SMALL"
        ));

        src.consts[0].items.pop();
        src.consts[0].name = "commands".into();
        assert!(matches!(
            resolve(&src).unwrap_err(),
            SchemaError::InvalidConst { ref name, .. } if name == "commands"
        ));
    }
}
