//! SWC AST to source graph conversion
//!
//! [`parse_module`] reads one file's imports, exports and type-level
//! declarations. Classes carrying a component decorator get a
//! [`ComponentDescriptor`] built from their member decorators with the same
//! async inference the runtime uses.

use crate::decorators::{
    self, Decorator, ACCESSOR, COMMAND, EXPOSE, INVOKE, MENU_ITEM, ON_MAIN, ON_RENDERER,
};
use crate::node::{
    ClassDef, ClassMember, ClassMemberKind, DeclKind, EnumDef, EnumMemberDef, ExportTarget,
    ImportBinding, ImportKind, InterfaceDef, ModuleScope, SourceDecl, TypeAliasDef, Visibility,
};
use crate::types::{
    format_number, quote, EtchLiteral, EtchPrimitive, EtchType, MappedModifier, ParamDef,
    TemplatePart, TupleElement, TypeElement, TypeOperator, TypeParamDef,
};
use crate::utils::swc::{expr_to_name, member_key, prop_name_str, wtf8_to_string, ParsedModule};
use conduit_weld::{
    infer_async, AccessorDescriptor, CommandDescriptor, ComponentDescriptor, ExposedMethod,
    HookDescriptor, ListenerDescriptor, MenuBinding,
};
use deno_ast::swc::ast as swc_ast;

/// Everything the generator needs from one source file
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub scope: ModuleScope,
    pub declarations: Vec<SourceDecl>,
}

/// Read imports, exports and declarations from a parsed module
pub fn parse_module(parsed: &ParsedModule) -> ParsedFile {
    let mut file = ParsedFile::default();
    let Some(module) = parsed.module() else {
        return file;
    };

    for item in &module.body {
        match item {
            swc_ast::ModuleItem::Stmt(swc_ast::Stmt::Decl(decl)) => {
                if let Some(decl) = convert_decl(decl) {
                    file.declarations.push(decl);
                }
            }
            swc_ast::ModuleItem::Stmt(_) => {}
            swc_ast::ModuleItem::ModuleDecl(module_decl) => {
                visit_module_decl(&mut file, module_decl);
            }
        }
    }

    tracing::trace!(
        file = %parsed.path().display(),
        declarations = file.declarations.len(),
        imports = file.scope.imports.len(),
        "Parsed module"
    );
    file
}

fn visit_module_decl(file: &mut ParsedFile, module_decl: &swc_ast::ModuleDecl) {
    match module_decl {
        swc_ast::ModuleDecl::Import(import) => {
            let specifier = wtf8_to_string(&import.src);
            for spec in &import.specifiers {
                let (local, kind) = match spec {
                    swc_ast::ImportSpecifier::Named(named) => {
                        let imported = named
                            .imported
                            .as_ref()
                            .map(export_name)
                            .unwrap_or_else(|| named.local.sym.to_string());
                        (named.local.sym.to_string(), ImportKind::Named(imported))
                    }
                    swc_ast::ImportSpecifier::Default(default) => {
                        (default.local.sym.to_string(), ImportKind::Default)
                    }
                    swc_ast::ImportSpecifier::Namespace(ns) => {
                        (ns.local.sym.to_string(), ImportKind::Namespace)
                    }
                };
                file.scope.imports.insert(
                    local,
                    ImportBinding {
                        specifier: specifier.clone(),
                        kind,
                    },
                );
            }
        }
        swc_ast::ModuleDecl::ExportDecl(export) => {
            if let Some(decl) = convert_decl(&export.decl) {
                file.scope
                    .exports
                    .insert(decl.name.clone(), ExportTarget::Local(decl.name.clone()));
                file.declarations.push(decl);
            }
        }
        swc_ast::ModuleDecl::ExportDefaultDecl(export) => {
            let decl = match &export.decl {
                swc_ast::DefaultDecl::Class(class) => class
                    .ident
                    .as_ref()
                    .map(|ident| convert_class(&ident.sym, &class.class)),
                swc_ast::DefaultDecl::TsInterfaceDecl(interface) => {
                    Some(convert_interface(interface))
                }
                swc_ast::DefaultDecl::Fn(_) => None,
            };
            match decl {
                Some(decl) => {
                    file.scope
                        .exports
                        .insert("default".to_string(), ExportTarget::Local(decl.name.clone()));
                    file.declarations.push(decl);
                }
                None => tracing::trace!("Skipping anonymous default export"),
            }
        }
        swc_ast::ModuleDecl::ExportDefaultExpr(export) => {
            if let swc_ast::Expr::Ident(ident) = export.expr.as_ref() {
                file.scope.exports.insert(
                    "default".to_string(),
                    ExportTarget::Local(ident.sym.to_string()),
                );
            }
        }
        swc_ast::ModuleDecl::ExportNamed(named) => {
            let source = named.src.as_ref().map(|s| wtf8_to_string(s));
            for spec in &named.specifiers {
                let swc_ast::ExportSpecifier::Named(spec) = spec else {
                    continue;
                };
                let orig = export_name(&spec.orig);
                let exported = spec.exported.as_ref().map(export_name).unwrap_or_else(|| orig.clone());
                let target = match &source {
                    Some(specifier) => ExportTarget::ReExport {
                        specifier: specifier.clone(),
                        name: orig,
                    },
                    None => ExportTarget::Local(orig),
                };
                file.scope.exports.insert(exported, target);
            }
        }
        swc_ast::ModuleDecl::ExportAll(all) => {
            file.scope.star_exports.push(wtf8_to_string(&all.src));
        }
        _ => {}
    }
}

fn export_name(name: &swc_ast::ModuleExportName) -> String {
    match name {
        swc_ast::ModuleExportName::Ident(i) => i.sym.to_string(),
        swc_ast::ModuleExportName::Str(s) => wtf8_to_string(s),
    }
}

fn convert_decl(decl: &swc_ast::Decl) -> Option<SourceDecl> {
    match decl {
        swc_ast::Decl::Class(class) => Some(convert_class(&class.ident.sym, &class.class)),
        swc_ast::Decl::TsInterface(interface) => Some(convert_interface(interface)),
        swc_ast::Decl::TsTypeAlias(alias) => Some(SourceDecl {
            name: alias.id.sym.to_string(),
            kind: DeclKind::TypeAlias(TypeAliasDef {
                type_params: extract_type_params(alias.type_params.as_deref()),
                ty: swc_type_to_etch_type(&alias.type_ann),
            }),
        }),
        swc_ast::Decl::TsEnum(e) => Some(SourceDecl {
            name: e.id.sym.to_string(),
            kind: DeclKind::Enum(EnumDef {
                is_const: e.is_const,
                members: e.members.iter().map(convert_enum_member).collect(),
            }),
        }),
        _ => None,
    }
}

fn convert_enum_member(member: &swc_ast::TsEnumMember) -> EnumMemberDef {
    let name = match &member.id {
        swc_ast::TsEnumMemberId::Ident(i) => i.sym.to_string(),
        swc_ast::TsEnumMemberId::Str(s) => wtf8_to_string(s),
    };
    let init = member.init.as_ref().and_then(|init| match init.as_ref() {
        swc_ast::Expr::Lit(swc_ast::Lit::Num(n)) => Some(format_number(n.value)),
        swc_ast::Expr::Lit(swc_ast::Lit::Str(s)) => Some(quote(&wtf8_to_string(s))),
        swc_ast::Expr::Unary(unary) if unary.op == swc_ast::UnaryOp::Minus => {
            match unary.arg.as_ref() {
                swc_ast::Expr::Lit(swc_ast::Lit::Num(n)) => Some(format!("-{}", format_number(n.value))),
                _ => None,
            }
        }
        _ => {
            tracing::debug!(member = %name, "Enum initializer is not a literal, dropping it");
            None
        }
    });
    EnumMemberDef { name, init }
}

fn convert_interface(interface: &swc_ast::TsInterfaceDecl) -> SourceDecl {
    SourceDecl {
        name: interface.id.sym.to_string(),
        kind: DeclKind::Interface(InterfaceDef {
            type_params: extract_type_params(interface.type_params.as_deref()),
            extends: interface.extends.iter().map(heritage_to_etch_type).collect(),
            members: interface.body.body.iter().filter_map(convert_type_element).collect(),
        }),
    }
}

fn heritage_to_etch_type(heritage: &swc_ast::TsExprWithTypeArgs) -> EtchType {
    let name = expr_to_name(&heritage.expr).unwrap_or_else(|| "unknown".to_string());
    EtchType::type_ref(name, type_args(heritage.type_args.as_deref()))
}

// ============================================================================
// Classes
// ============================================================================

fn convert_class(name: &str, class: &swc_ast::Class) -> SourceDecl {
    let class_decorators = decorators::read_decorators(&class.decorators);
    let mut component = class_decorators
        .iter()
        .find(|d| d.is_component())
        .map(|d| component_descriptor(name, d));

    let mut members = Vec::new();
    for member in &class.body {
        match member {
            swc_ast::ClassMember::Method(method) => {
                let Some(member_name) = prop_name_str(&method.key) else {
                    continue;
                };
                let kind = match method.kind {
                    swc_ast::MethodKind::Method => {
                        let return_type = method
                            .function
                            .return_type
                            .as_ref()
                            .map(|t| swc_type_to_etch_type(&t.type_ann));
                        let is_async = infer_async(
                            method.function.is_async,
                            return_type.as_ref().and_then(EtchType::head_name),
                        );
                        if let Some(descriptor) = component.as_mut() {
                            let marks = decorators::read_decorators(&method.function.decorators);
                            bind_method(descriptor, &member_name, is_async, &marks);
                        }
                        ClassMemberKind::Method {
                            type_params: extract_type_params(method.function.type_params.as_deref()),
                            params: method.function.params.iter().map(|p| extract_param(&p.pat)).collect(),
                            return_type,
                            is_async,
                        }
                    }
                    swc_ast::MethodKind::Getter => ClassMemberKind::Getter {
                        ty: method
                            .function
                            .return_type
                            .as_ref()
                            .map(|t| swc_type_to_etch_type(&t.type_ann)),
                    },
                    swc_ast::MethodKind::Setter => ClassMemberKind::Setter {
                        param: method.function.params.first().map(|p| extract_param(&p.pat)),
                    },
                };
                members.push(ClassMember {
                    name: member_name,
                    visibility: visibility(method.accessibility),
                    is_static: method.is_static,
                    optional: method.is_optional,
                    kind,
                });
            }
            swc_ast::ClassMember::ClassProp(prop) => {
                let Some(member_name) = prop_name_str(&prop.key) else {
                    continue;
                };
                if let Some(descriptor) = component.as_mut() {
                    let marks = decorators::read_decorators(&prop.decorators);
                    if let Some(accessor) = decorators::find(&marks, ACCESSOR) {
                        descriptor.accessors.push(accessor_descriptor(&member_name, accessor));
                    }
                }
                let ty = prop
                    .type_ann
                    .as_ref()
                    .map(|t| swc_type_to_etch_type(&t.type_ann))
                    .or_else(|| prop.value.as_deref().and_then(infer_initializer_type));
                members.push(ClassMember {
                    name: member_name,
                    visibility: visibility(prop.accessibility),
                    is_static: prop.is_static,
                    optional: prop.is_optional,
                    kind: ClassMemberKind::Property {
                        ty,
                        readonly: prop.readonly,
                    },
                });
            }
            swc_ast::ClassMember::PrivateProp(prop) => {
                members.push(ClassMember {
                    name: format!("#{}", prop.key.name),
                    visibility: Visibility::Private,
                    is_static: prop.is_static,
                    optional: false,
                    kind: ClassMemberKind::Property {
                        ty: None,
                        readonly: prop.readonly,
                    },
                });
            }
            swc_ast::ClassMember::Constructor(ctor) => {
                members.extend(ctor.params.iter().filter_map(parameter_property));
            }
            _ => {}
        }
    }

    if let Some(descriptor) = &component {
        tracing::debug!(
            component = %descriptor.identity,
            methods = descriptor.methods.len(),
            accessors = descriptor.accessors.len(),
            commands = descriptor.commands.len(),
            "Found component"
        );
    }

    let extends = class.super_class.as_ref().and_then(|expr| {
        let name = expr_to_name(expr)?;
        Some(EtchType::type_ref(name, type_args(class.super_type_params.as_deref())))
    });

    SourceDecl {
        name: name.to_string(),
        kind: DeclKind::Class(ClassDef {
            type_params: extract_type_params(class.type_params.as_deref()),
            extends,
            members,
            component,
        }),
    }
}

fn component_descriptor(name: &str, decorator: &Decorator) -> ComponentDescriptor {
    let mut descriptor = ComponentDescriptor::new(name);
    if let Some(alias) = decorator.option_str(&["as", "alias"]) {
        descriptor = descriptor.with_alias(alias);
    }
    if let Some(inject) = decorator.option("inject") {
        for dependency in inject.strings() {
            descriptor = descriptor.depends_on(dependency);
        }
    }
    descriptor
}

fn bind_method(descriptor: &mut ComponentDescriptor, name: &str, is_async: bool, marks: &[Decorator]) {
    if let Some(expose) = decorators::find(marks, EXPOSE) {
        let mut method = ExposedMethod::new(name).asynchronous(is_async);
        if let Some(alias) = expose.option_str(&["as", "alias"]) {
            method = method.with_alias(alias);
        }
        descriptor.methods.push(method);
    }
    if let Some(command) = decorators::find(marks, COMMAND) {
        descriptor
            .commands
            .push(CommandDescriptor::new(name, command.strings()).asynchronous(is_async));
    }
    if let Some(menu) = decorators::find(marks, MENU_ITEM) {
        descriptor
            .menu_items
            .push(MenuBinding::new(name, menu.strings()).asynchronous(is_async));
    }
    if let Some(channel) = decorators::find(marks, INVOKE).and_then(Decorator::first_str) {
        descriptor
            .hooks
            .push(HookDescriptor::new(name, channel).asynchronous(is_async));
    }
    if let Some(channel) = decorators::find(marks, ON_MAIN).and_then(Decorator::first_str) {
        descriptor
            .listeners
            .push(ListenerDescriptor::on_main(name, channel).asynchronous(is_async));
    }
    if let Some(channel) = decorators::find(marks, ON_RENDERER).and_then(Decorator::first_str) {
        descriptor
            .listeners
            .push(ListenerDescriptor::on_renderer(name, channel).asynchronous(is_async));
    }
}

fn accessor_descriptor(key: &str, decorator: &Decorator) -> AccessorDescriptor {
    let mut accessor = AccessorDescriptor::new(key);
    if let Some(getter) = decorator.option_str(&["getter"]) {
        accessor = accessor.with_getter(getter);
    }
    if let Some(setter) = decorator.option_str(&["setter"]) {
        accessor = accessor.with_setter(setter);
    }
    if let Some(alias) = decorator.option_str(&["as", "alias"]) {
        accessor = accessor.with_alias(alias);
    }
    accessor
}

fn visibility(access: Option<swc_ast::Accessibility>) -> Visibility {
    match access {
        Some(swc_ast::Accessibility::Private) => Visibility::Private,
        Some(swc_ast::Accessibility::Protected) => Visibility::Protected,
        Some(swc_ast::Accessibility::Public) | None => Visibility::Public,
    }
}

/// `constructor(public readonly name: string)` declares a property
fn parameter_property(param: &swc_ast::ParamOrTsParamProp) -> Option<ClassMember> {
    let swc_ast::ParamOrTsParamProp::TsParamProp(prop) = param else {
        return None;
    };
    let (ident, optional) = match &prop.param {
        swc_ast::TsParamPropParam::Ident(i) => (i, i.optional),
        swc_ast::TsParamPropParam::Assign(a) => match a.left.as_ref() {
            swc_ast::Pat::Ident(i) => (i, true),
            _ => return None,
        },
    };
    Some(ClassMember {
        name: ident.sym.to_string(),
        visibility: visibility(prop.accessibility),
        is_static: false,
        optional,
        kind: ClassMemberKind::Property {
            ty: ident
                .type_ann
                .as_ref()
                .map(|t| swc_type_to_etch_type(&t.type_ann)),
            readonly: prop.readonly,
        },
    })
}

/// Literal type of an un-annotated property initializer
pub fn infer_initializer_type(expr: &swc_ast::Expr) -> Option<EtchType> {
    match expr {
        swc_ast::Expr::Lit(swc_ast::Lit::Num(_)) => Some(EtchType::number()),
        swc_ast::Expr::Lit(swc_ast::Lit::Str(_)) | swc_ast::Expr::Tpl(_) => Some(EtchType::string()),
        swc_ast::Expr::Lit(swc_ast::Lit::Bool(_)) => Some(EtchType::boolean()),
        swc_ast::Expr::Lit(swc_ast::Lit::BigInt(_)) => {
            Some(EtchType::primitive(EtchPrimitive::BigInt))
        }
        swc_ast::Expr::Unary(unary) if unary.op == swc_ast::UnaryOp::Minus => {
            infer_initializer_type(&unary.arg)
        }
        swc_ast::Expr::New(new) => {
            let name = expr_to_name(&new.callee)?;
            Some(EtchType::type_ref(name, type_args(new.type_args.as_deref())))
        }
        swc_ast::Expr::TsAs(as_expr) => Some(swc_type_to_etch_type(&as_expr.type_ann)),
        swc_ast::Expr::Paren(paren) => infer_initializer_type(&paren.expr),
        _ => None,
    }
}

// ============================================================================
// Types
// ============================================================================

fn type_args(args: Option<&swc_ast::TsTypeParamInstantiation>) -> Vec<EtchType> {
    args.map(|a| a.params.iter().map(|p| swc_type_to_etch_type(p)).collect())
        .unwrap_or_default()
}

/// Convert an SWC TsType to EtchType
pub fn swc_type_to_etch_type(ty: &swc_ast::TsType) -> EtchType {
    match ty {
        swc_ast::TsType::TsKeywordType(kw) => {
            let primitive = match kw.kind {
                swc_ast::TsKeywordTypeKind::TsStringKeyword => EtchPrimitive::String,
                swc_ast::TsKeywordTypeKind::TsNumberKeyword => EtchPrimitive::Number,
                swc_ast::TsKeywordTypeKind::TsBooleanKeyword => EtchPrimitive::Boolean,
                swc_ast::TsKeywordTypeKind::TsVoidKeyword => EtchPrimitive::Void,
                swc_ast::TsKeywordTypeKind::TsNullKeyword => EtchPrimitive::Null,
                swc_ast::TsKeywordTypeKind::TsUndefinedKeyword => EtchPrimitive::Undefined,
                swc_ast::TsKeywordTypeKind::TsNeverKeyword => EtchPrimitive::Never,
                swc_ast::TsKeywordTypeKind::TsUnknownKeyword => EtchPrimitive::Unknown,
                swc_ast::TsKeywordTypeKind::TsAnyKeyword => EtchPrimitive::Any,
                swc_ast::TsKeywordTypeKind::TsObjectKeyword => EtchPrimitive::Object,
                swc_ast::TsKeywordTypeKind::TsSymbolKeyword => EtchPrimitive::Symbol,
                swc_ast::TsKeywordTypeKind::TsBigIntKeyword => EtchPrimitive::BigInt,
                swc_ast::TsKeywordTypeKind::TsIntrinsicKeyword => EtchPrimitive::Intrinsic,
            };
            EtchType::Primitive(primitive)
        }
        swc_ast::TsType::TsTypeRef(ref_type) => EtchType::TypeRef {
            name: entity_name(&ref_type.type_name),
            type_args: type_args(ref_type.type_params.as_deref()),
        },
        swc_ast::TsType::TsArrayType(arr) => EtchType::array(swc_type_to_etch_type(&arr.elem_type)),
        swc_ast::TsType::TsTupleType(tuple) => EtchType::Tuple(
            tuple
                .elem_types
                .iter()
                .map(|e| TupleElement {
                    label: e.label.as_ref().and_then(tuple_label),
                    ty: swc_type_to_etch_type(&e.ty),
                })
                .collect(),
        ),
        swc_ast::TsType::TsUnionOrIntersectionType(union_inter) => match union_inter {
            swc_ast::TsUnionOrIntersectionType::TsUnionType(u) => {
                EtchType::Union(u.types.iter().map(|t| swc_type_to_etch_type(t)).collect())
            }
            swc_ast::TsUnionOrIntersectionType::TsIntersectionType(i) => {
                EtchType::Intersection(i.types.iter().map(|t| swc_type_to_etch_type(t)).collect())
            }
        },
        swc_ast::TsType::TsLitType(lit) => match &lit.lit {
            swc_ast::TsLit::Str(s) => EtchType::Literal(EtchLiteral::String(wtf8_to_string(s))),
            swc_ast::TsLit::Number(n) => EtchType::Literal(EtchLiteral::Number(n.value)),
            swc_ast::TsLit::Bool(b) => EtchType::Literal(EtchLiteral::Boolean(b.value)),
            swc_ast::TsLit::BigInt(b) => EtchType::Literal(EtchLiteral::BigInt(b.value.to_string())),
            swc_ast::TsLit::Tpl(tpl) => {
                let mut parts = Vec::new();
                for (i, quasi) in tpl.quasis.iter().enumerate() {
                    if !quasi.raw.is_empty() {
                        parts.push(TemplatePart::String(quasi.raw.to_string()));
                    }
                    if let Some(ty) = tpl.types.get(i) {
                        parts.push(TemplatePart::Type(Box::new(swc_type_to_etch_type(ty))));
                    }
                }
                EtchType::TemplateLiteral(parts)
            }
        },
        swc_ast::TsType::TsFnOrConstructorType(fn_type) => match fn_type {
            swc_ast::TsFnOrConstructorType::TsFnType(f) => EtchType::Function {
                type_params: extract_type_params(f.type_params.as_deref()),
                params: f.params.iter().map(extract_param_from_fn_param).collect(),
                return_type: Box::new(swc_type_to_etch_type(&f.type_ann.type_ann)),
                is_constructor: false,
                is_abstract: false,
            },
            swc_ast::TsFnOrConstructorType::TsConstructorType(c) => EtchType::Function {
                type_params: extract_type_params(c.type_params.as_deref()),
                params: c.params.iter().map(extract_param_from_fn_param).collect(),
                return_type: Box::new(swc_type_to_etch_type(&c.type_ann.type_ann)),
                is_constructor: true,
                is_abstract: c.is_abstract,
            },
        },
        swc_ast::TsType::TsTypeLit(lit) => {
            EtchType::TypeLiteral(lit.members.iter().filter_map(convert_type_element).collect())
        }
        swc_ast::TsType::TsParenthesizedType(paren) => {
            EtchType::Parenthesized(Box::new(swc_type_to_etch_type(&paren.type_ann)))
        }
        swc_ast::TsType::TsOptionalType(opt) => {
            EtchType::Optional(Box::new(swc_type_to_etch_type(&opt.type_ann)))
        }
        swc_ast::TsType::TsRestType(rest) => {
            EtchType::Rest(Box::new(swc_type_to_etch_type(&rest.type_ann)))
        }
        swc_ast::TsType::TsTypeQuery(query) => match &query.expr_name {
            swc_ast::TsTypeQueryExpr::TsEntityName(entity) => EtchType::TypeQuery {
                expr: entity_name(entity),
                type_args: type_args(query.type_args.as_deref()),
            },
            swc_ast::TsTypeQueryExpr::Import(import) => import_type(import),
        },
        swc_ast::TsType::TsThisType(_) => EtchType::This,
        swc_ast::TsType::TsConditionalType(cond) => EtchType::Conditional {
            check_type: Box::new(swc_type_to_etch_type(&cond.check_type)),
            extends_type: Box::new(swc_type_to_etch_type(&cond.extends_type)),
            true_type: Box::new(swc_type_to_etch_type(&cond.true_type)),
            false_type: Box::new(swc_type_to_etch_type(&cond.false_type)),
        },
        swc_ast::TsType::TsInferType(infer) => EtchType::Infer {
            name: infer.type_param.name.sym.to_string(),
            constraint: infer
                .type_param
                .constraint
                .as_ref()
                .map(|c| Box::new(swc_type_to_etch_type(c))),
        },
        swc_ast::TsType::TsMappedType(mapped) => EtchType::Mapped {
            readonly: mapped.readonly.map(mapped_modifier),
            type_param: mapped.type_param.name.sym.to_string(),
            constraint: mapped
                .type_param
                .constraint
                .as_ref()
                .map(|c| Box::new(swc_type_to_etch_type(c))),
            name_type: mapped
                .name_type
                .as_ref()
                .map(|t| Box::new(swc_type_to_etch_type(t))),
            optional: mapped.optional.map(mapped_modifier),
            value_type: mapped
                .type_ann
                .as_ref()
                .map(|t| Box::new(swc_type_to_etch_type(t))),
        },
        swc_ast::TsType::TsIndexedAccessType(indexed) => EtchType::IndexedAccess {
            obj_type: Box::new(swc_type_to_etch_type(&indexed.obj_type)),
            index_type: Box::new(swc_type_to_etch_type(&indexed.index_type)),
            readonly: indexed.readonly,
        },
        swc_ast::TsType::TsTypeOperator(op) => {
            let operator = match op.op {
                swc_ast::TsTypeOperatorOp::KeyOf => TypeOperator::KeyOf,
                swc_ast::TsTypeOperatorOp::Unique => TypeOperator::Unique,
                swc_ast::TsTypeOperatorOp::ReadOnly => TypeOperator::Readonly,
            };
            EtchType::TypeOperator {
                operator,
                type_arg: Box::new(swc_type_to_etch_type(&op.type_ann)),
            }
        }
        swc_ast::TsType::TsImportType(import) => import_type(import),
        swc_ast::TsType::TsTypePredicate(pred) => {
            let param_name = match &pred.param_name {
                swc_ast::TsThisTypeOrIdent::TsThisType(_) => "this".to_string(),
                swc_ast::TsThisTypeOrIdent::Ident(i) => i.sym.to_string(),
            };
            EtchType::TypePredicate {
                param_name,
                ty: pred
                    .type_ann
                    .as_ref()
                    .map(|t| Box::new(swc_type_to_etch_type(&t.type_ann))),
                asserts: pred.asserts,
            }
        }
    }
}

fn import_type(import: &swc_ast::TsImportType) -> EtchType {
    EtchType::Import {
        arg: wtf8_to_string(&import.arg),
        qualifier: import.qualifier.as_ref().map(entity_name),
        type_args: type_args(import.type_args.as_deref()),
    }
}

fn mapped_modifier(modifier: swc_ast::TruePlusMinus) -> MappedModifier {
    match modifier {
        swc_ast::TruePlusMinus::True => MappedModifier::Present,
        swc_ast::TruePlusMinus::Plus => MappedModifier::Plus,
        swc_ast::TruePlusMinus::Minus => MappedModifier::Minus,
    }
}

fn tuple_label(label: &swc_ast::Pat) -> Option<String> {
    match label {
        swc_ast::Pat::Ident(i) => Some(format!(
            "{}{}",
            i.sym,
            if i.optional { "?" } else { "" }
        )),
        swc_ast::Pat::Rest(rest) => match rest.arg.as_ref() {
            swc_ast::Pat::Ident(i) => Some(format!("...{}", i.sym)),
            _ => None,
        },
        _ => None,
    }
}

/// Format an entity name (e.g., `Namespace.Type`)
pub fn entity_name(name: &swc_ast::TsEntityName) -> String {
    match name {
        swc_ast::TsEntityName::Ident(i) => i.sym.to_string(),
        swc_ast::TsEntityName::TsQualifiedName(q) => {
            format!("{}.{}", entity_name(&q.left), q.right.sym)
        }
    }
}

fn convert_type_element(element: &swc_ast::TsTypeElement) -> Option<TypeElement> {
    let annotation = |ann: &Option<Box<swc_ast::TsTypeAnn>>| {
        ann.as_ref().map(|t| swc_type_to_etch_type(&t.type_ann))
    };
    match element {
        swc_ast::TsTypeElement::TsPropertySignature(prop) => Some(TypeElement::Property {
            name: member_key(&prop.key, prop.computed)?,
            ty: annotation(&prop.type_ann),
            optional: prop.optional,
            readonly: prop.readonly,
        }),
        swc_ast::TsTypeElement::TsMethodSignature(method) => Some(TypeElement::Method {
            name: member_key(&method.key, method.computed)?,
            type_params: extract_type_params(method.type_params.as_deref()),
            params: method.params.iter().map(extract_param_from_fn_param).collect(),
            return_type: annotation(&method.type_ann),
            optional: method.optional,
        }),
        swc_ast::TsTypeElement::TsCallSignatureDecl(call) => Some(TypeElement::Call {
            type_params: extract_type_params(call.type_params.as_deref()),
            params: call.params.iter().map(extract_param_from_fn_param).collect(),
            return_type: annotation(&call.type_ann),
        }),
        swc_ast::TsTypeElement::TsConstructSignatureDecl(ctor) => Some(TypeElement::Construct {
            type_params: extract_type_params(ctor.type_params.as_deref()),
            params: ctor.params.iter().map(extract_param_from_fn_param).collect(),
            return_type: annotation(&ctor.type_ann),
        }),
        swc_ast::TsTypeElement::TsIndexSignature(index) => Some(TypeElement::Index {
            params: index.params.iter().map(extract_param_from_fn_param).collect(),
            ty: annotation(&index.type_ann),
            readonly: index.readonly,
        }),
        swc_ast::TsTypeElement::TsGetterSignature(getter) => Some(TypeElement::Getter {
            name: member_key(&getter.key, getter.computed)?,
            ty: annotation(&getter.type_ann),
        }),
        swc_ast::TsTypeElement::TsSetterSignature(setter) => Some(TypeElement::Setter {
            name: member_key(&setter.key, setter.computed)?,
            param: Some(extract_param_from_fn_param(&setter.param)),
        }),
    }
}

/// Extract a single parameter from a pattern
fn extract_param(pat: &swc_ast::Pat) -> ParamDef {
    let annotation = |ann: &Option<Box<swc_ast::TsTypeAnn>>| {
        ann.as_ref().map(|t| swc_type_to_etch_type(&t.type_ann))
    };
    match pat {
        swc_ast::Pat::Ident(i) => ParamDef {
            optional: i.optional,
            ..ParamDef::new(i.sym.to_string(), annotation(&i.type_ann))
        },
        swc_ast::Pat::Rest(r) => {
            let mut param = extract_param(&r.arg);
            if param.ty.is_none() {
                param.ty = annotation(&r.type_ann);
            }
            param.rest = true;
            param
        }
        swc_ast::Pat::Assign(a) => {
            let mut param = extract_param(&a.left);
            param.optional = true;
            if param.ty.is_none() {
                param.ty = infer_initializer_type(&a.right);
            }
            param
        }
        swc_ast::Pat::Array(arr) => ParamDef {
            optional: arr.optional,
            ..ParamDef::new("destructured", annotation(&arr.type_ann))
        },
        swc_ast::Pat::Object(obj) => ParamDef {
            optional: obj.optional,
            ..ParamDef::new("destructured", annotation(&obj.type_ann))
        },
        swc_ast::Pat::Expr(_) | swc_ast::Pat::Invalid(_) => ParamDef::new("unknown", None),
    }
}

/// Extract a parameter from a TsFnParam
fn extract_param_from_fn_param(param: &swc_ast::TsFnParam) -> ParamDef {
    match param {
        swc_ast::TsFnParam::Ident(i) => extract_param(&swc_ast::Pat::Ident(i.clone())),
        swc_ast::TsFnParam::Array(arr) => extract_param(&swc_ast::Pat::Array(arr.clone())),
        swc_ast::TsFnParam::Object(obj) => extract_param(&swc_ast::Pat::Object(obj.clone())),
        swc_ast::TsFnParam::Rest(r) => extract_param(&swc_ast::Pat::Rest(r.clone())),
    }
}

/// Extract type parameters
fn extract_type_params(params: Option<&swc_ast::TsTypeParamDecl>) -> Vec<TypeParamDef> {
    params
        .map(|p| {
            p.params
                .iter()
                .map(|param| TypeParamDef {
                    name: param.name.sym.to_string(),
                    constraint: param
                        .constraint
                        .as_ref()
                        .map(|c| Box::new(swc_type_to_etch_type(c))),
                    default: param
                        .default
                        .as_ref()
                        .map(|d| Box::new(swc_type_to_etch_type(d))),
                    is_const: param.is_const,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::swc::parse_typescript_source;
    use conduit_weld::{CallMode, Operation};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> ParsedFile {
        let parsed = parse_typescript_source("/tmp/app/src/main.ts", source).unwrap();
        parse_module(&parsed)
    }

    fn class<'a>(file: &'a ParsedFile, name: &str) -> &'a ClassDef {
        file.declarations
            .iter()
            .find_map(|d| match &d.kind {
                DeclKind::Class(c) if d.name == name => Some(c),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_hook_and_listener_decorators() {
        let file = parse(
            r#"
            @Injectable({ as: "dep" })
            export class Dependency {
                @Expose()
                @Invoke("message")
                foo() { return "Message from Dependency"; }

                @OnMain("refresh")
                async reload(full: boolean): Promise<void> {}

                @OnRenderer("theme")
                redraw(theme: string): void {}
            }
            "#,
        );

        let descriptor = class(&file, "Dependency").component.as_ref().unwrap();
        assert_eq!(descriptor.hooks, [HookDescriptor::new("foo", "message")]);
        assert_eq!(
            descriptor.listeners,
            [
                ListenerDescriptor::on_main("reload", "refresh").asynchronous(true),
                ListenerDescriptor::on_renderer("redraw", "theme"),
            ]
        );
        // listeners alone add nothing to the callable surface
        assert_eq!(descriptor.surface().len(), 2);
    }

    #[test]
    fn test_component_descriptor_from_decorators() {
        let file = parse(
            r##"
            import { Injectable, Expose, Accessor, Command, MenuItem } from "@conduit/core";

            @Injectable({ inject: [Database], as: "counter" })
            export class Counter {
                @Accessor({ as: "value" })
                private _value = 0;

                @Expose()
                increment(): number { return ++this._value; }

                @Expose({ as: "fetchRemote" })
                async fetch(url: string) { return url; }

                @Expose()
                load(): Promise<string> { return Promise.resolve(""); }

                @Command(["ctrl+c", "ctrl+shift+c"])
                @MenuItem("#reset")
                reset(): void { this._value = 0; }

                private helper(): void {}
            }
            "##,
        );

        let counter = class(&file, "Counter");
        let descriptor = counter.component.as_ref().unwrap();
        assert_eq!(descriptor.identity.as_str(), "Counter");
        assert_eq!(descriptor.alias.as_deref(), Some("counter"));
        assert_eq!(descriptor.dependencies.len(), 1);
        assert_eq!(descriptor.dependencies[0].as_str(), "Database");

        let methods: Vec<(&str, bool)> = descriptor
            .methods
            .iter()
            .map(|m| (m.external_name(), m.is_async))
            .collect();
        assert_eq!(methods, [("increment", false), ("fetchRemote", true), ("load", true)]);

        assert_eq!(descriptor.accessors[0].getter_name(), "getValue");
        assert_eq!(descriptor.commands[0].combinations, ["ctrl+c", "ctrl+shift+c"]);
        assert_eq!(descriptor.menu_items[0].name, "reset");

        let surface = descriptor.surface();
        let rows: Vec<(&str, Operation, CallMode)> = surface
            .iter()
            .map(|c| (c.member.as_str(), c.operation, c.mode))
            .collect();
        assert_eq!(rows.len(), 2 + 1 + 1 + 4);
        assert_eq!(rows[1], ("incrementAsync", Operation::Call, CallMode::NonBlocking));

        assert_eq!(counter.property_type("_value"), Some(&EtchType::number()));
        assert!(file.scope.exports.contains_key("Counter"));
        assert_eq!(
            file.scope.imports["Expose"],
            ImportBinding {
                specifier: "@conduit/core".into(),
                kind: ImportKind::Named("Expose".into())
            }
        );
    }

    #[test]
    fn test_plain_class_members() {
        let file = parse(
            r#"
            class Session<T> extends Base<T> {
                static count = 0;
                #secret = "x";
                protected token?: string;
                user = new User();
                constructor(public readonly id: string, private db: Db) { super(); }
                get active(): boolean { return true; }
                lookup<K extends keyof T>(key: K, ...rest: string[]): T[K] { return null!; }
            }
            "#,
        );
        let session = class(&file, "Session");
        assert!(session.component.is_none());
        assert_eq!(session.extends.as_ref().unwrap().to_typescript(), "Base<T>");
        assert_eq!(session.type_params[0].name, "T");

        let public: Vec<&str> = session
            .members
            .iter()
            .filter(|m| m.is_public_instance())
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(public, ["user", "id", "active", "lookup"]);
        assert_eq!(session.property_type("user"), Some(&EtchType::simple_ref("User")));

        let lookup = session.method("lookup").unwrap();
        let ClassMemberKind::Method { params, return_type, .. } = &lookup.kind else {
            panic!("lookup is a method");
        };
        assert_eq!(params[1].to_typescript(), "...rest: string[]");
        assert_eq!(return_type.as_ref().unwrap().to_typescript(), "T[K]");
    }

    #[test]
    fn test_type_round_trips_through_printer() {
        let file = parse(
            r#"
            type A<T> = T extends Promise<infer U> ? U : never;
            type B = { readonly [K in keyof Opts]?: Opts[K] | null };
            type C = `on${Capitalize<string>}`;
            type D = [name: string, count: number];
            type E = (typeof config)["mode"];
            type F = import("./models").User<number>;
            type G = new (...args: any[]) => object;
            type H = { (x: number): string; new (): H; [key: string]: unknown; method?(): void };
            "#,
        );
        let printed: Vec<String> = file
            .declarations
            .iter()
            .map(|d| match &d.kind {
                DeclKind::TypeAlias(alias) => alias.ty.to_typescript(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            printed,
            [
                "T extends Promise<infer U> ? U : never",
                "{ readonly [K in keyof Opts]?: Opts[K] | null; }",
                "`on${Capitalize<string>}`",
                "[name: string, count: number]",
                "(typeof config)[\"mode\"]",
                "import(\"./models\").User<number>",
                "new (...args: any[]) => object",
                "{ (x: number): string; new (): H; [key: string]: unknown; method?(): void; }",
            ]
        );
    }

    #[test]
    fn test_imports_and_exports() {
        let file = parse(
            r#"
            import Default, { A as B } from "./a";
            import * as models from "../models";
            export { B as C } from "./a";
            export * from "./all";
            export default interface Shape { sides: number }
            export enum Mode { Light = "light", Dark = "dark", Auto = -1 }
            "#,
        );
        assert_eq!(file.scope.imports["Default"].kind, ImportKind::Default);
        assert_eq!(file.scope.imports["B"].kind, ImportKind::Named("A".into()));
        assert_eq!(file.scope.imports["models"].kind, ImportKind::Namespace);
        assert_eq!(
            file.scope.exports["C"],
            ExportTarget::ReExport {
                specifier: "./a".into(),
                name: "B".into()
            }
        );
        assert_eq!(file.scope.exports["default"], ExportTarget::Local("Shape".into()));
        assert_eq!(file.scope.star_exports, ["./all"]);

        let DeclKind::Enum(mode) = &file.declarations[1].kind else {
            panic!("Mode is an enum");
        };
        let inits: Vec<Option<&str>> = mode.members.iter().map(|m| m.init.as_deref()).collect();
        assert_eq!(inits, [Some("\"light\""), Some("\"dark\""), Some("-1")]);
    }
}
