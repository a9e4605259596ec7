//! Source graph to declaration translation
//!
//! Components seed a FIFO worklist. Translating a declaration rewrites every
//! type reference in it; a reference to a program declaration allocates the
//! declaration's output name and enqueues it, once. The name table doubles
//! as the visited set, so self-referential and mutually recursive types
//! terminate and are emitted exactly once, without recursion over the
//! declaration graph.
//!
//! Internal declarations and external imports share one [`Namer`]: a second
//! `User` from another file becomes `User_1`, and so does an imported
//! `User` that would shadow an emitted one.

use crate::emitter::{GlobalBinding, ImportStatement, Statement, Translation};
use crate::node::{ClassDef, ClassMemberKind, DeclId, DeclKind, FileId, ImportKind};
use crate::program::{is_relative, Program, Resolved};
use crate::replace::Replacer;
use crate::types::{EtchType, ParamDef, TemplatePart, TupleElement, TypeElement, TypeParamDef};
use conduit_weld::{CallMode, ComponentDescriptor, Operation};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

/// Allocates unique output names
#[derive(Debug, Default)]
pub struct Namer {
    taken: HashSet<String>,
}

impl Namer {
    /// `base`, or the first free `base_N`
    pub fn allocate(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Translation state for one generation run
pub struct Translator<'a> {
    program: &'a Program,
    replacer: &'a Replacer,
    namer: Namer,
    /// Output name per declaration; `Some` once enqueued
    names: Vec<Option<String>>,
    queue: VecDeque<DeclId>,
    imports: IndexMap<String, ImportStatement>,
    external_names: HashMap<(String, ImportKind), String>,
}

impl<'a> Translator<'a> {
    pub fn new(program: &'a Program, replacer: &'a Replacer) -> Self {
        Self {
            program,
            replacer,
            namer: Namer::default(),
            names: vec![None; program.decls().len()],
            queue: VecDeque::new(),
            imports: IndexMap::new(),
            external_names: HashMap::new(),
        }
    }

    /// Translate every component and everything reachable from its surface
    pub fn translate(mut self) -> Translation {
        let program = self.program;
        let mut globals: Vec<GlobalBinding> = Vec::new();
        for decl in program.components() {
            let Some(descriptor) = decl.component() else {
                continue;
            };
            let interface = self.reference(decl.id);
            let alias = descriptor.external_alias();
            if globals.iter().any(|g| g.alias == alias) {
                tracing::warn!(component = %descriptor.identity, alias = %alias, "Duplicate component alias, skipping global binding");
                continue;
            }
            globals.push(GlobalBinding { alias, interface });
        }

        let mut statements = Vec::new();
        while let Some(id) = self.queue.pop_front() {
            statements.push(self.translate_decl(id));
        }

        tracing::debug!(
            statements = statements.len(),
            imports = self.imports.len(),
            globals = globals.len(),
            "Translated program"
        );
        Translation {
            imports: self.imports.into_values().collect(),
            statements,
            globals,
        }
    }

    /// Output name of `id`, enqueueing it on first use
    fn reference(&mut self, id: DeclId) -> String {
        if let Some(name) = &self.names[id.0] {
            return name.clone();
        }
        let name = self.namer.allocate(&self.program.decl(id).name);
        self.names[id.0] = Some(name.clone());
        self.queue.push_back(id);
        name
    }

    /// Local name for an external binding, adding its import once
    fn import(&mut self, specifier: &str, kind: &ImportKind, local: &str) -> String {
        let key = (specifier.to_string(), kind.clone());
        if let Some(name) = self.external_names.get(&key) {
            return name.clone();
        }
        let name = match kind {
            ImportKind::Named(exported) => self.namer.allocate(exported),
            ImportKind::Default | ImportKind::Namespace => self.namer.allocate(local),
        };
        let statement = self
            .imports
            .entry(specifier.to_string())
            .or_insert_with(|| ImportStatement::new(specifier));
        match kind {
            ImportKind::Named(exported) => statement.named.push((exported.clone(), name.clone())),
            ImportKind::Default => statement.default = Some(name.clone()),
            ImportKind::Namespace => statement.namespace = Some(name.clone()),
        }
        self.external_names.insert(key, name.clone());
        name
    }

    fn translate_decl(&mut self, id: DeclId) -> Statement {
        let program = self.program;
        let decl = program.decl(id);
        let name = self.names[id.0].clone().unwrap_or_else(|| decl.name.clone());
        let file = decl.file;

        match &decl.kind {
            DeclKind::Class(class) => match &class.component {
                Some(descriptor) => self.component_interface(file, name, class, descriptor),
                None => self.class_interface(file, name, class),
            },
            DeclKind::Interface(interface) => {
                let mut scope = Vec::new();
                let type_params = self.rewrite_type_params(file, &interface.type_params, &mut scope);
                let extends = interface
                    .extends
                    .iter()
                    .filter_map(|base| self.heritage(file, base, &mut scope, false))
                    .collect();
                let members = interface
                    .members
                    .iter()
                    .map(|m| self.rewrite_element(file, m, &mut scope))
                    .collect();
                Statement::Interface {
                    name,
                    type_params,
                    extends,
                    members,
                }
            }
            DeclKind::TypeAlias(alias) => {
                let mut scope = Vec::new();
                let type_params = self.rewrite_type_params(file, &alias.type_params, &mut scope);
                let ty = self.rewrite(file, &alias.ty, &mut scope);
                Statement::TypeAlias {
                    name,
                    type_params,
                    ty,
                }
            }
            DeclKind::Enum(def) => Statement::Enum {
                name,
                is_const: def.is_const,
                members: def.members.clone(),
            },
        }
    }

    /// The sandbox-facing surface of a component, row for row
    fn component_interface(
        &mut self,
        file: FileId,
        name: String,
        class: &ClassDef,
        descriptor: &ComponentDescriptor,
    ) -> Statement {
        let mut scope = Vec::new();
        let type_params = self.rewrite_type_params(file, &class.type_params, &mut scope);
        let extends = class
            .extends
            .iter()
            .filter_map(|base| self.heritage(file, base, &mut scope, true))
            .collect();

        let mut members = Vec::new();
        for call in descriptor.surface() {
            let non_blocking = call.mode == CallMode::NonBlocking;
            let element = match call.operation {
                Operation::Call => {
                    let Some(ClassMemberKind::Method {
                        type_params,
                        params,
                        return_type,
                        ..
                    }) = class.method(&call.target).map(|m| &m.kind)
                    else {
                        tracing::warn!(component = %descriptor.identity, method = %call.target, "Exposed method not found on class");
                        continue;
                    };
                    let depth = scope.len();
                    let type_params = self.rewrite_type_params(file, type_params, &mut scope);
                    let params = self.rewrite_params(file, params, &mut scope);
                    let mut ret = match return_type {
                        Some(ty) => self.rewrite(file, ty, &mut scope),
                        None => {
                            tracing::debug!(component = %descriptor.identity, method = %call.target, "No return type, using any");
                            EtchType::any()
                        }
                    };
                    scope.truncate(depth);
                    if non_blocking {
                        ret = ret.into_promise();
                    }
                    TypeElement::Method {
                        name: call.member,
                        type_params,
                        params,
                        return_type: Some(ret),
                        optional: false,
                    }
                }
                Operation::Get => {
                    let ty = self.property_type(file, class, &call.target, &mut scope);
                    let ret = if non_blocking { ty.into_promise() } else { ty };
                    TypeElement::method(call.member, Vec::new(), ret)
                }
                Operation::Set => {
                    let ty = self.property_type(file, class, &call.target, &mut scope);
                    let param = descriptor
                        .accessors
                        .iter()
                        .find(|a| a.property_key == call.target)
                        .and_then(|a| a.alias.clone())
                        .unwrap_or_else(|| call.target.trim_start_matches('#').to_string());
                    let ret = if non_blocking {
                        EtchType::promise(EtchType::void())
                    } else {
                        EtchType::void()
                    };
                    TypeElement::method(call.member, vec![ParamDef::new(param, Some(ty))], ret)
                }
                Operation::Command => continue,
            };
            members.push(element);
        }

        Statement::Interface {
            name,
            type_params,
            extends,
            members,
        }
    }

    fn property_type(
        &mut self,
        file: FileId,
        class: &ClassDef,
        key: &str,
        scope: &mut Vec<String>,
    ) -> EtchType {
        match class.property_type(key) {
            Some(ty) => self.rewrite(file, ty, scope),
            None => {
                tracing::debug!(property = %key, "No property type, using any");
                EtchType::any()
            }
        }
    }

    /// A plain class referenced from a signature: its public instance shape
    fn class_interface(&mut self, file: FileId, name: String, class: &ClassDef) -> Statement {
        let mut scope = Vec::new();
        let type_params = self.rewrite_type_params(file, &class.type_params, &mut scope);
        let extends = class
            .extends
            .iter()
            .filter_map(|base| self.heritage(file, base, &mut scope, false))
            .collect();

        let mut members = Vec::new();
        let mut seen_accessors: HashSet<&str> = HashSet::new();
        for member in class.members.iter().filter(|m| m.is_public_instance()) {
            let element = match &member.kind {
                ClassMemberKind::Method {
                    type_params,
                    params,
                    return_type,
                    ..
                } => {
                    let depth = scope.len();
                    let type_params = self.rewrite_type_params(file, type_params, &mut scope);
                    let params = self.rewrite_params(file, params, &mut scope);
                    let return_type = return_type.as_ref().map(|t| self.rewrite(file, t, &mut scope));
                    scope.truncate(depth);
                    TypeElement::Method {
                        name: member.name.clone(),
                        type_params,
                        params,
                        return_type,
                        optional: member.optional,
                    }
                }
                ClassMemberKind::Property { ty, readonly } => TypeElement::Property {
                    name: member.name.clone(),
                    ty: ty.as_ref().map(|t| self.rewrite(file, t, &mut scope)),
                    optional: member.optional,
                    readonly: *readonly,
                },
                ClassMemberKind::Getter { .. } | ClassMemberKind::Setter { .. } => {
                    if !seen_accessors.insert(member.name.as_str()) {
                        continue;
                    }
                    let has_setter = class.members.iter().any(|m| {
                        m.name == member.name && matches!(m.kind, ClassMemberKind::Setter { .. })
                    });
                    let ty = class.property_type(&member.name).cloned().or_else(|| {
                        class.members.iter().find_map(|m| match &m.kind {
                            ClassMemberKind::Setter { param: Some(p) } if m.name == member.name => {
                                p.ty.clone()
                            }
                            _ => None,
                        })
                    });
                    TypeElement::Property {
                        name: member.name.clone(),
                        ty: ty.map(|t| self.rewrite(file, &t, &mut scope)),
                        optional: false,
                        readonly: !has_setter,
                    }
                }
            };
            members.push(element);
        }

        Statement::Interface {
            name,
            type_params,
            extends,
            members,
        }
    }

    /// Rewrite a base type, dropping bases that cannot be emitted.
    /// Components only carry bases that are themselves components.
    fn heritage(
        &mut self,
        file: FileId,
        base: &EtchType,
        scope: &mut Vec<String>,
        components_only: bool,
    ) -> Option<EtchType> {
        if components_only {
            let head = base.head_name()?;
            let head = head.split('.').next().unwrap_or(head);
            let is_component = match self.program.resolve_name(file, head) {
                Resolved::Decl(id) => self.program.decl(id).component().is_some(),
                _ => false,
            };
            if !is_component {
                tracing::debug!(base = %base, "Dropping non-component base of a component");
                return None;
            }
        }
        match self.rewrite(file, base, scope) {
            ty @ EtchType::TypeRef { .. } => Some(ty),
            other => {
                tracing::debug!(base = %base, rewritten = %other, "Dropping unresolvable base type");
                None
            }
        }
    }

    fn rewrite_type_params(
        &mut self,
        file: FileId,
        params: &[TypeParamDef],
        scope: &mut Vec<String>,
    ) -> Vec<TypeParamDef> {
        scope.extend(params.iter().map(|p| p.name.clone()));
        params
            .iter()
            .map(|p| TypeParamDef {
                name: p.name.clone(),
                constraint: p.constraint.as_ref().map(|c| Box::new(self.rewrite(file, c, scope))),
                default: p.default.as_ref().map(|d| Box::new(self.rewrite(file, d, scope))),
                is_const: p.is_const,
            })
            .collect()
    }

    fn rewrite_params(&mut self, file: FileId, params: &[ParamDef], scope: &mut Vec<String>) -> Vec<ParamDef> {
        params
            .iter()
            .map(|p| ParamDef {
                ty: p.ty.as_ref().map(|t| self.rewrite(file, t, scope)),
                ..p.clone()
            })
            .collect()
    }

    fn rewrite_opt(&mut self, file: FileId, ty: &Option<EtchType>, scope: &mut Vec<String>) -> Option<EtchType> {
        ty.as_ref().map(|t| self.rewrite(file, t, scope))
    }

    fn rewrite_box(&mut self, file: FileId, ty: &EtchType, scope: &mut Vec<String>) -> Box<EtchType> {
        Box::new(self.rewrite(file, ty, scope))
    }

    fn rewrite_element(&mut self, file: FileId, element: &TypeElement, scope: &mut Vec<String>) -> TypeElement {
        match element {
            TypeElement::Property {
                name,
                ty,
                optional,
                readonly,
            } => TypeElement::Property {
                name: name.clone(),
                ty: self.rewrite_opt(file, ty, scope),
                optional: *optional,
                readonly: *readonly,
            },
            TypeElement::Method {
                name,
                type_params,
                params,
                return_type,
                optional,
            } => {
                let depth = scope.len();
                let type_params = self.rewrite_type_params(file, type_params, scope);
                let params = self.rewrite_params(file, params, scope);
                let return_type = self.rewrite_opt(file, return_type, scope);
                scope.truncate(depth);
                TypeElement::Method {
                    name: name.clone(),
                    type_params,
                    params,
                    return_type,
                    optional: *optional,
                }
            }
            TypeElement::Call {
                type_params,
                params,
                return_type,
            } => {
                let depth = scope.len();
                let type_params = self.rewrite_type_params(file, type_params, scope);
                let params = self.rewrite_params(file, params, scope);
                let return_type = self.rewrite_opt(file, return_type, scope);
                scope.truncate(depth);
                TypeElement::Call {
                    type_params,
                    params,
                    return_type,
                }
            }
            TypeElement::Construct {
                type_params,
                params,
                return_type,
            } => {
                let depth = scope.len();
                let type_params = self.rewrite_type_params(file, type_params, scope);
                let params = self.rewrite_params(file, params, scope);
                let return_type = self.rewrite_opt(file, return_type, scope);
                scope.truncate(depth);
                TypeElement::Construct {
                    type_params,
                    params,
                    return_type,
                }
            }
            TypeElement::Index { params, ty, readonly } => TypeElement::Index {
                params: self.rewrite_params(file, params, scope),
                ty: self.rewrite_opt(file, ty, scope),
                readonly: *readonly,
            },
            TypeElement::Getter { name, ty } => TypeElement::Getter {
                name: name.clone(),
                ty: self.rewrite_opt(file, ty, scope),
            },
            TypeElement::Setter { name, param } => TypeElement::Setter {
                name: name.clone(),
                param: param.as_ref().map(|p| ParamDef {
                    ty: self.rewrite_opt(file, &p.ty, scope),
                    ..p.clone()
                }),
            },
        }
    }

    /// Rewrite every reference in `ty` as seen from `file`
    pub fn rewrite(&mut self, file: FileId, ty: &EtchType, scope: &mut Vec<String>) -> EtchType {
        match ty {
            EtchType::TypeRef { name, type_args } => {
                let type_args: Vec<EtchType> = type_args.iter().map(|a| self.rewrite(file, a, scope)).collect();
                self.rewrite_reference(file, name, type_args, scope)
            }
            EtchType::Primitive(_) | EtchType::Literal(_) | EtchType::This => ty.clone(),
            EtchType::TemplateLiteral(parts) => EtchType::TemplateLiteral(
                parts
                    .iter()
                    .map(|part| match part {
                        TemplatePart::String(s) => TemplatePart::String(s.clone()),
                        TemplatePart::Type(t) => TemplatePart::Type(self.rewrite_box(file, t, scope)),
                    })
                    .collect(),
            ),
            EtchType::Array(inner) => EtchType::Array(self.rewrite_box(file, inner, scope)),
            EtchType::Tuple(elements) => EtchType::Tuple(
                elements
                    .iter()
                    .map(|e| TupleElement {
                        label: e.label.clone(),
                        ty: self.rewrite(file, &e.ty, scope),
                    })
                    .collect(),
            ),
            EtchType::Union(types) => EtchType::Union(types.iter().map(|t| self.rewrite(file, t, scope)).collect()),
            EtchType::Intersection(types) => {
                EtchType::Intersection(types.iter().map(|t| self.rewrite(file, t, scope)).collect())
            }
            EtchType::Function {
                type_params,
                params,
                return_type,
                is_constructor,
                is_abstract,
            } => {
                let depth = scope.len();
                let type_params = self.rewrite_type_params(file, type_params, scope);
                let params = self.rewrite_params(file, params, scope);
                let return_type = self.rewrite_box(file, return_type, scope);
                scope.truncate(depth);
                EtchType::Function {
                    type_params,
                    params,
                    return_type,
                    is_constructor: *is_constructor,
                    is_abstract: *is_abstract,
                }
            }
            EtchType::TypeLiteral(elements) => {
                EtchType::TypeLiteral(elements.iter().map(|e| self.rewrite_element(file, e, scope)).collect())
            }
            EtchType::Conditional {
                check_type,
                extends_type,
                true_type,
                false_type,
            } => {
                let check_type = self.rewrite_box(file, check_type, scope);
                let false_type = self.rewrite_box(file, false_type, scope);
                // `infer` names are bound in the extends clause and the true branch
                let depth = scope.len();
                collect_infer_names(extends_type, scope);
                let extends_type = self.rewrite_box(file, extends_type, scope);
                let true_type = self.rewrite_box(file, true_type, scope);
                scope.truncate(depth);
                EtchType::Conditional {
                    check_type,
                    extends_type,
                    true_type,
                    false_type,
                }
            }
            EtchType::IndexedAccess {
                obj_type,
                index_type,
                readonly,
            } => EtchType::IndexedAccess {
                obj_type: self.rewrite_box(file, obj_type, scope),
                index_type: self.rewrite_box(file, index_type, scope),
                readonly: *readonly,
            },
            EtchType::Mapped {
                readonly,
                type_param,
                constraint,
                name_type,
                optional,
                value_type,
            } => {
                let constraint = constraint.as_ref().map(|c| self.rewrite_box(file, c, scope));
                scope.push(type_param.clone());
                let name_type = name_type.as_ref().map(|n| self.rewrite_box(file, n, scope));
                let value_type = value_type.as_ref().map(|v| self.rewrite_box(file, v, scope));
                scope.pop();
                EtchType::Mapped {
                    readonly: *readonly,
                    type_param: type_param.clone(),
                    constraint,
                    name_type,
                    optional: *optional,
                    value_type,
                }
            }
            EtchType::TypeOperator { operator, type_arg } => EtchType::TypeOperator {
                operator: *operator,
                type_arg: self.rewrite_box(file, type_arg, scope),
            },
            EtchType::TypeQuery { expr, type_args } => {
                let type_args = type_args.iter().map(|a| self.rewrite(file, a, scope)).collect();
                let (head, rest) = split_qualified(expr);
                match self.program.resolve_name(file, head) {
                    Resolved::External { specifier, kind } => {
                        let local = self.import(&specifier, &kind, head);
                        EtchType::TypeQuery {
                            expr: join_qualified(&local, rest),
                            type_args,
                        }
                    }
                    Resolved::Global => EtchType::TypeQuery {
                        expr: expr.clone(),
                        type_args,
                    },
                    _ => {
                        tracing::debug!(query = %expr, "Value query cannot be emitted, using any");
                        EtchType::any()
                    }
                }
            }
            EtchType::Infer { name, constraint } => EtchType::Infer {
                name: name.clone(),
                constraint: constraint.as_ref().map(|c| self.rewrite_box(file, c, scope)),
            },
            EtchType::Import {
                arg,
                qualifier,
                type_args,
            } => {
                let type_args: Vec<EtchType> = type_args.iter().map(|a| self.rewrite(file, a, scope)).collect();
                let internal = self.program.resolve_module(file, arg);
                match (internal, qualifier) {
                    (Some(target), Some(qualifier)) => {
                        let (head, rest) = split_qualified(qualifier);
                        match self.program.export_of(target, head) {
                            Some(id) => EtchType::type_ref(join_qualified(&self.reference(id), rest), type_args),
                            None => {
                                tracing::debug!(module = %arg, name = %qualifier, "Unresolved import type, using any");
                                EtchType::any()
                            }
                        }
                    }
                    (None, _) if !is_relative(arg) => EtchType::Import {
                        arg: arg.clone(),
                        qualifier: qualifier.clone(),
                        type_args,
                    },
                    _ => {
                        tracing::debug!(module = %arg, "Unresolved import type, using any");
                        EtchType::any()
                    }
                }
            }
            EtchType::Parenthesized(inner) => EtchType::Parenthesized(self.rewrite_box(file, inner, scope)),
            EtchType::Optional(inner) => EtchType::Optional(self.rewrite_box(file, inner, scope)),
            EtchType::Rest(inner) => EtchType::Rest(self.rewrite_box(file, inner, scope)),
            EtchType::TypePredicate {
                param_name,
                ty,
                asserts,
            } => EtchType::TypePredicate {
                param_name: param_name.clone(),
                ty: ty.as_ref().map(|t| self.rewrite_box(file, t, scope)),
                asserts: *asserts,
            },
        }
    }

    fn rewrite_reference(
        &mut self,
        file: FileId,
        name: &str,
        type_args: Vec<EtchType>,
        scope: &[String],
    ) -> EtchType {
        let (head, rest) = split_qualified(name);
        if rest.is_none() {
            if scope.iter().any(|p| p == name) {
                return EtchType::type_ref(name, type_args);
            }
            if let Some(replacement) = self.replacer.replace(name) {
                tracing::trace!(from = %name, to = %replacement, "Replaced host-only type");
                return replacement;
            }
        }

        match self.program.resolve_name(file, head) {
            Resolved::Decl(id) => EtchType::type_ref(join_qualified(&self.reference(id), rest), type_args),
            Resolved::Namespace(target) => {
                let Some(rest) = rest else {
                    tracing::debug!(name = %name, "Namespace used as a type, using any");
                    return EtchType::any();
                };
                let (member, tail) = split_qualified(rest);
                match self.program.export_of(target, member) {
                    Some(id) => EtchType::type_ref(join_qualified(&self.reference(id), tail), type_args),
                    None => {
                        tracing::debug!(name = %name, "Unresolved namespace member, using any");
                        EtchType::any()
                    }
                }
            }
            Resolved::External { specifier, kind } => {
                let local = self.import(&specifier, &kind, head);
                EtchType::type_ref(join_qualified(&local, rest), type_args)
            }
            Resolved::Missing { specifier } => {
                tracing::debug!(name = %name, module = %specifier, "Unresolved import, using any");
                EtchType::any()
            }
            Resolved::Global => EtchType::type_ref(name, type_args),
        }
    }
}

/// Translate `program` with fresh state
pub fn translate(program: &Program, replacer: &Replacer) -> Translation {
    Translator::new(program, replacer).translate()
}

fn split_qualified(name: &str) -> (&str, Option<&str>) {
    match name.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (name, None),
    }
}

fn join_qualified(head: &str, rest: Option<&str>) -> String {
    match rest {
        Some(rest) => format!("{}.{}", head, rest),
        None => head.to_string(),
    }
}

/// Names introduced by `infer X` anywhere inside `ty`
fn collect_infer_names(ty: &EtchType, out: &mut Vec<String>) {
    match ty {
        EtchType::Infer { name, .. } => out.push(name.clone()),
        EtchType::Array(inner)
        | EtchType::Parenthesized(inner)
        | EtchType::Optional(inner)
        | EtchType::Rest(inner) => collect_infer_names(inner, out),
        EtchType::Tuple(elements) => elements.iter().for_each(|e| collect_infer_names(&e.ty, out)),
        EtchType::Union(types) | EtchType::Intersection(types) => {
            types.iter().for_each(|t| collect_infer_names(t, out))
        }
        EtchType::TypeRef { type_args, .. } => type_args.iter().for_each(|t| collect_infer_names(t, out)),
        EtchType::Function { params, return_type, .. } => {
            params
                .iter()
                .filter_map(|p| p.ty.as_ref())
                .for_each(|t| collect_infer_names(t, out));
            collect_infer_names(return_type, out);
        }
        EtchType::TemplateLiteral(parts) => parts.iter().for_each(|p| {
            if let TemplatePart::Type(t) = p {
                collect_infer_names(t, out)
            }
        }),
        EtchType::TypeOperator { type_arg, .. } => collect_infer_names(type_arg, out),
        EtchType::IndexedAccess { obj_type, index_type, .. } => {
            collect_infer_names(obj_type, out);
            collect_infer_names(index_type, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::emit;
    use crate::program::TsConfig;
    use pretty_assertions::assert_eq;

    fn translate_sources(sources: &[(&str, &str)]) -> Translation {
        let mut program = Program::new(TsConfig::default());
        for (path, text) in sources {
            program.add_source(path, *text).unwrap();
        }
        translate(&program, &Replacer::default())
    }

    fn members(translation: &Translation, name: &str) -> Vec<String> {
        match translation.statement(name) {
            Some(Statement::Interface { members, .. }) => members.iter().map(TypeElement::to_typescript).collect(),
            other => panic!("expected interface {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_counter_surface() {
        let translation = translate_sources(&[(
            "/app/src/counter.ts",
            r#"
            @Component()
            export class Counter {
                @Accessor()
                value: number = 0;

                @Expose()
                increment(): number {
                    return ++this.value;
                }

                reset(): void {}
            }
            "#,
        )]);

        assert_eq!(
            members(&translation, "Counter"),
            [
                "increment(): number",
                "incrementAsync(): Promise<number>",
                "getValue(): number",
                "getValueAsync(): Promise<number>",
                "setValue(value: number): void",
                "setValueAsync(value: number): Promise<void>",
            ]
        );
        assert_eq!(
            translation.globals,
            [GlobalBinding {
                alias: "counter".into(),
                interface: "Counter".into()
            }]
        );
    }

    #[test]
    fn test_async_method_has_single_signature() {
        let translation = translate_sources(&[(
            "/app/src/store.ts",
            r#"
            @Component({ as: "kv" })
            export class Store {
                @Expose({ as: "fetch" })
                async load(key: string): Promise<string> { return key; }

                @Expose()
                async drop(key: string) {}
            }
            "#,
        )]);
        assert_eq!(
            members(&translation, "Store"),
            ["fetch(key: string): Promise<string>", "drop(key: string): Promise<any>"]
        );
        assert_eq!(translation.globals[0].alias, "kv");
    }

    #[test]
    fn test_self_reference_emits_once() {
        let translation = translate_sources(&[(
            "/app/src/tree.ts",
            r#"
            interface Node { children: Node[]; parent?: Node }
            @Component()
            export class Tree {
                @Expose()
                root(): Node { return null!; }
                @Expose()
                self(): Tree { return this; }
            }
            "#,
        )]);
        let names: Vec<&str> = translation.statements.iter().map(Statement::name).collect();
        assert_eq!(names, ["Tree", "Node"]);
        assert_eq!(members(&translation, "Node"), ["children: Node[]", "parent?: Node"]);
    }

    #[test]
    fn test_mutual_recursion_across_files() {
        let translation = translate_sources(&[
            (
                "/app/src/a.ts",
                r#"
                import { B } from "./b";
                export interface A { b: B }
                @Component()
                export class Svc { @Expose() get(): A { return null!; } }
                "#,
            ),
            ("/app/src/b.ts", r#"import type { A } from "./a"; export interface B { a: A }"#),
        ]);
        let names: Vec<&str> = translation.statements.iter().map(Statement::name).collect();
        assert_eq!(names, ["Svc", "A", "B"]);
    }

    #[test]
    fn test_external_imports_are_deduplicated() {
        let translation = translate_sources(&[
            (
                "/app/src/io.ts",
                r#"
                import { Readable } from "node:stream";
                import type { Writable } from "node:stream";
                import { Readable as R } from "node:stream";
                @Component()
                export class Io {
                    @Expose() input(): Readable { return null!; }
                    @Expose() output(): Writable { return null!; }
                    @Expose() again(): R { return null!; }
                }
                "#,
            ),
        ]);
        assert_eq!(translation.imports.len(), 1);
        assert_eq!(
            translation.imports[0].to_typescript(),
            ["import type { Readable, Writable } from \"node:stream\";"]
        );
        assert_eq!(members(&translation, "Io")[4], "again(): Readable");
    }

    #[test]
    fn test_name_collisions_get_suffixes() {
        let translation = translate_sources(&[
            ("/app/src/a/user.ts", "export interface User { id: string }"),
            ("/app/src/b/user.ts", "export interface User { id: number }"),
            (
                "/app/src/users.ts",
                r#"
                import { User } from "./a/user";
                import { User as LegacyUser } from "./b/user";
                @Component()
                export class Users {
                    @Expose() async current(): Promise<User> { return null!; }
                    @Expose() async legacy(): Promise<LegacyUser> { return null!; }
                }
                "#,
            ),
        ]);
        assert_eq!(
            members(&translation, "Users"),
            ["current(): Promise<User>", "legacy(): Promise<User_1>"]
        );
        assert_eq!(members(&translation, "User_1"), ["id: number"]);
    }

    #[test]
    fn test_heritage_filtering() {
        let translation = translate_sources(&[(
            "/app/src/svc.ts",
            r#"
            class Plain { hidden(): void {} }
            @Component()
            class Base { @Expose() ping(): string { return ""; } }
            @Component()
            class Derived extends Base {}
            @Component()
            class Other extends Plain {}
            "#,
        )]);
        let Some(Statement::Interface { extends, .. }) = translation.statement("Derived") else {
            panic!("Derived is emitted");
        };
        assert_eq!(extends, &[EtchType::simple_ref("Base")]);
        let Some(Statement::Interface { extends, .. }) = translation.statement("Other") else {
            panic!("Other is emitted");
        };
        assert!(extends.is_empty());
        assert!(translation.statement("Plain").is_none());
    }

    #[test]
    fn test_generics_and_replacements() {
        let translation = translate_sources(&[(
            "/app/src/blob.ts",
            r#"
            type Unwrap<T> = T extends Promise<infer U> ? U : T;
            type Flags<T> = { readonly [K in keyof T]: boolean };
            @Component()
            export class Blobs {
                @Expose() read<T extends object>(path: string, into: T): Buffer { return null!; }
                @Expose() onDone(cb: Function): Unwrap<Promise<Flags<string>>> { return null!; }
            }
            "#,
        )]);
        assert_eq!(
            members(&translation, "Blobs"),
            [
                "read<T extends object>(path: string, into: T): Uint8Array",
                "readAsync<T extends object>(path: string, into: T): Promise<Uint8Array>",
                "onDone(cb: never): Unwrap<Promise<Flags<string>>>",
                "onDoneAsync(cb: never): Promise<Unwrap<Promise<Flags<string>>>>",
            ]
        );
        let emitted = emit(&translation);
        assert!(emitted.contains("export type Unwrap<T> = T extends Promise<infer U> ? U : T;"));
        assert!(emitted.contains("export type Flags<T> = { readonly [K in keyof T]: boolean; };"));
    }

    #[test]
    fn test_plain_class_and_enum_dependencies() {
        let translation = translate_sources(&[(
            "/app/src/account.ts",
            r#"
            export enum Role { Admin = "admin", Guest = "guest" }
            export class Account {
                private secret = "";
                readonly id: string = "";
                role: Role = Role.Guest;
                get label(): string { return ""; }
                static create(): Account { return new Account(); }
                rename(name: string): void {}
            }
            @Component()
            export class Accounts {
                @Expose() find(id: string): Account | undefined { return undefined; }
                @Expose() missing(x: NotImported): Gone { return null!; }
            }
            "#,
        )]);
        assert_eq!(
            members(&translation, "Account"),
            ["readonly id: string", "role: Role", "readonly label: string", "rename(name: string): void"]
        );
        assert!(matches!(translation.statement("Role"), Some(Statement::Enum { .. })));
        // unknown names are treated as globals
        assert_eq!(members(&translation, "Accounts")[2], "missing(x: NotImported): Gone");
    }

    #[test]
    fn test_unresolved_relative_import_falls_back_to_any() {
        let translation = translate_sources(&[(
            "/app/src/broken.ts",
            r#"
            import { Ghost } from "./ghost";
            @Component()
            export class Haunted { @Expose() async boo(): Promise<Ghost> { return null!; } }
            "#,
        )]);
        assert_eq!(members(&translation, "Haunted"), ["boo(): Promise<any>"]);
    }

    #[test]
    fn test_namer() {
        let mut namer = Namer::default();
        assert_eq!(namer.allocate("User"), "User");
        assert_eq!(namer.allocate("User"), "User_1");
        assert_eq!(namer.allocate("User_1"), "User_1_1");
        assert_eq!(namer.allocate("User"), "User_2");
    }
}
