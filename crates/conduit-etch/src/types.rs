//! TypeScript type representation
//!
//! `EtchType` mirrors the TypeScript type grammar closely enough to print
//! any parsed type back out. The translator rewrites references inside it
//! and the emitter prints it with [`EtchType::to_typescript`].

use std::fmt;

/// Keyword types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EtchPrimitive {
    String,
    Number,
    BigInt,
    Boolean,
    Void,
    Null,
    Undefined,
    Never,
    Any,
    Unknown,
    Symbol,
    Object,
    Intrinsic,
}

impl EtchPrimitive {
    /// Convert to TypeScript type string
    pub fn to_typescript(&self) -> &'static str {
        match self {
            EtchPrimitive::String => "string",
            EtchPrimitive::Number => "number",
            EtchPrimitive::BigInt => "bigint",
            EtchPrimitive::Boolean => "boolean",
            EtchPrimitive::Void => "void",
            EtchPrimitive::Null => "null",
            EtchPrimitive::Undefined => "undefined",
            EtchPrimitive::Never => "never",
            EtchPrimitive::Any => "any",
            EtchPrimitive::Unknown => "unknown",
            EtchPrimitive::Symbol => "symbol",
            EtchPrimitive::Object => "object",
            EtchPrimitive::Intrinsic => "intrinsic",
        }
    }

    /// Parse from TypeScript type string
    pub fn from_typescript(s: &str) -> Option<Self> {
        match s {
            "string" => Some(EtchPrimitive::String),
            "number" => Some(EtchPrimitive::Number),
            "bigint" => Some(EtchPrimitive::BigInt),
            "boolean" => Some(EtchPrimitive::Boolean),
            "void" => Some(EtchPrimitive::Void),
            "null" => Some(EtchPrimitive::Null),
            "undefined" => Some(EtchPrimitive::Undefined),
            "never" => Some(EtchPrimitive::Never),
            "any" => Some(EtchPrimitive::Any),
            "unknown" => Some(EtchPrimitive::Unknown),
            "symbol" => Some(EtchPrimitive::Symbol),
            "object" => Some(EtchPrimitive::Object),
            _ => None,
        }
    }
}

impl fmt::Display for EtchPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_typescript())
    }
}

/// Literal type values
#[derive(Debug, Clone, PartialEq)]
pub enum EtchLiteral {
    String(String),
    Number(f64),
    /// Digits as written, without the `n` suffix
    BigInt(String),
    Boolean(bool),
}

impl EtchLiteral {
    /// Convert to TypeScript representation
    pub fn to_typescript(&self) -> String {
        match self {
            EtchLiteral::String(s) => quote(s),
            EtchLiteral::Number(n) => format_number(*n),
            EtchLiteral::BigInt(n) => format!("{}n", n),
            EtchLiteral::Boolean(b) => b.to_string(),
        }
    }
}

/// Part of a template literal type
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Static text, as written in the source
    String(String),
    /// `${T}` substitution
    Type(Box<EtchType>),
}

/// Function or method parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub name: String,
    pub ty: Option<EtchType>,
    pub optional: bool,
    pub rest: bool,
}

impl ParamDef {
    pub fn new(name: impl Into<String>, ty: Option<EtchType>) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            rest: false,
        }
    }

    pub fn to_typescript(&self) -> String {
        let mut out = String::new();
        if self.rest {
            out.push_str("...");
        }
        out.push_str(&self.name);
        if self.optional {
            out.push('?');
        }
        out.push_str(": ");
        match &self.ty {
            Some(ty) => out.push_str(&ty.to_typescript()),
            None if self.rest => out.push_str("any[]"),
            None => out.push_str("any"),
        }
        out
    }
}

/// Generic type parameter
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamDef {
    pub name: String,
    pub constraint: Option<Box<EtchType>>,
    pub default: Option<Box<EtchType>>,
    pub is_const: bool,
}

impl TypeParamDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
            default: None,
            is_const: false,
        }
    }

    pub fn to_typescript(&self) -> String {
        let mut out = String::new();
        if self.is_const {
            out.push_str("const ");
        }
        out.push_str(&self.name);
        if let Some(constraint) = &self.constraint {
            out.push_str(" extends ");
            out.push_str(&constraint.to_typescript());
        }
        if let Some(default) = &self.default {
            out.push_str(" = ");
            out.push_str(&default.to_typescript());
        }
        out
    }
}

/// Print `<A, B extends C>`, or nothing for an empty list
pub fn type_params_to_typescript(params: &[TypeParamDef]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let params: Vec<String> = params.iter().map(TypeParamDef::to_typescript).collect();
    format!("<{}>", params.join(", "))
}

fn params_to_typescript(params: &[ParamDef]) -> String {
    let params: Vec<String> = params.iter().map(ParamDef::to_typescript).collect();
    params.join(", ")
}

/// Element of a tuple type
#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    /// `name`, `name?` or `...name`
    pub label: Option<String>,
    pub ty: EtchType,
}

/// Signature inside an interface body or a type literal
#[derive(Debug, Clone, PartialEq)]
pub enum TypeElement {
    Property {
        name: String,
        ty: Option<EtchType>,
        optional: bool,
        readonly: bool,
    },
    Method {
        name: String,
        type_params: Vec<TypeParamDef>,
        params: Vec<ParamDef>,
        return_type: Option<EtchType>,
        optional: bool,
    },
    Call {
        type_params: Vec<TypeParamDef>,
        params: Vec<ParamDef>,
        return_type: Option<EtchType>,
    },
    Construct {
        type_params: Vec<TypeParamDef>,
        params: Vec<ParamDef>,
        return_type: Option<EtchType>,
    },
    Index {
        params: Vec<ParamDef>,
        ty: Option<EtchType>,
        readonly: bool,
    },
    Getter {
        name: String,
        ty: Option<EtchType>,
    },
    Setter {
        name: String,
        param: Option<ParamDef>,
    },
}

impl TypeElement {
    /// Method signature shorthand
    pub fn method(name: impl Into<String>, params: Vec<ParamDef>, return_type: EtchType) -> Self {
        TypeElement::Method {
            name: name.into(),
            type_params: Vec::new(),
            params,
            return_type: Some(return_type),
            optional: false,
        }
    }

    /// Print without the trailing `;`
    pub fn to_typescript(&self) -> String {
        fn annotation(ty: &Option<EtchType>) -> String {
            ty.as_ref()
                .map(|t| format!(": {}", t.to_typescript()))
                .unwrap_or_else(|| ": any".to_string())
        }

        match self {
            TypeElement::Property {
                name,
                ty,
                optional,
                readonly,
            } => format!(
                "{}{}{}{}",
                if *readonly { "readonly " } else { "" },
                name,
                if *optional { "?" } else { "" },
                annotation(ty)
            ),
            TypeElement::Method {
                name,
                type_params,
                params,
                return_type,
                optional,
            } => format!(
                "{}{}{}({}){}",
                name,
                if *optional { "?" } else { "" },
                type_params_to_typescript(type_params),
                params_to_typescript(params),
                annotation(return_type)
            ),
            TypeElement::Call {
                type_params,
                params,
                return_type,
            } => format!(
                "{}({}){}",
                type_params_to_typescript(type_params),
                params_to_typescript(params),
                annotation(return_type)
            ),
            TypeElement::Construct {
                type_params,
                params,
                return_type,
            } => format!(
                "new {}({}){}",
                type_params_to_typescript(type_params),
                params_to_typescript(params),
                annotation(return_type)
            ),
            TypeElement::Index {
                params,
                ty,
                readonly,
            } => format!(
                "{}[{}]{}",
                if *readonly { "readonly " } else { "" },
                params_to_typescript(params),
                annotation(ty)
            ),
            TypeElement::Getter { name, ty } => format!("get {}(){}", name, annotation(ty)),
            TypeElement::Setter { name, param } => format!(
                "set {}({})",
                name,
                param.as_ref().map(ParamDef::to_typescript).unwrap_or_default()
            ),
        }
    }
}

/// Type operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeOperator {
    /// keyof T
    KeyOf,
    /// readonly T[]
    Readonly,
    /// unique symbol
    Unique,
}

impl TypeOperator {
    /// Get operator keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeOperator::KeyOf => "keyof",
            TypeOperator::Readonly => "readonly",
            TypeOperator::Unique => "unique",
        }
    }
}

/// `+`, `-` or bare modifier on a mapped type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappedModifier {
    Present,
    Plus,
    Minus,
}

impl MappedModifier {
    fn prefix(&self) -> &'static str {
        match self {
            MappedModifier::Present => "",
            MappedModifier::Plus => "+",
            MappedModifier::Minus => "-",
        }
    }
}

/// A TypeScript type
#[derive(Debug, Clone, PartialEq)]
pub enum EtchType {
    Primitive(EtchPrimitive),
    Literal(EtchLiteral),
    /// `` `prefix-${T}` ``
    TemplateLiteral(Vec<TemplatePart>),
    Array(Box<EtchType>),
    Tuple(Vec<TupleElement>),
    Union(Vec<EtchType>),
    Intersection(Vec<EtchType>),
    /// Named reference, possibly qualified (`ns.Name`)
    TypeRef {
        name: String,
        type_args: Vec<EtchType>,
    },
    /// `(a: A) => R` or `new (a: A) => R`
    Function {
        type_params: Vec<TypeParamDef>,
        params: Vec<ParamDef>,
        return_type: Box<EtchType>,
        is_constructor: bool,
        is_abstract: bool,
    },
    TypeLiteral(Vec<TypeElement>),
    Conditional {
        check_type: Box<EtchType>,
        extends_type: Box<EtchType>,
        true_type: Box<EtchType>,
        false_type: Box<EtchType>,
    },
    IndexedAccess {
        obj_type: Box<EtchType>,
        index_type: Box<EtchType>,
        readonly: bool,
    },
    Mapped {
        readonly: Option<MappedModifier>,
        type_param: String,
        constraint: Option<Box<EtchType>>,
        name_type: Option<Box<EtchType>>,
        optional: Option<MappedModifier>,
        value_type: Option<Box<EtchType>>,
    },
    TypeOperator {
        operator: TypeOperator,
        type_arg: Box<EtchType>,
    },
    /// `typeof x`
    TypeQuery {
        expr: String,
        type_args: Vec<EtchType>,
    },
    Infer {
        name: String,
        constraint: Option<Box<EtchType>>,
    },
    /// `import("module").Name<T>`
    Import {
        arg: String,
        qualifier: Option<String>,
        type_args: Vec<EtchType>,
    },
    Parenthesized(Box<EtchType>),
    This,
    /// Optional tuple member (`T?`)
    Optional(Box<EtchType>),
    /// Rest tuple member (`...T`)
    Rest(Box<EtchType>),
    TypePredicate {
        param_name: String,
        ty: Option<Box<EtchType>>,
        asserts: bool,
    },
}

impl EtchType {
    pub fn primitive(p: EtchPrimitive) -> Self {
        EtchType::Primitive(p)
    }

    pub fn string() -> Self {
        Self::primitive(EtchPrimitive::String)
    }

    pub fn number() -> Self {
        Self::primitive(EtchPrimitive::Number)
    }

    pub fn boolean() -> Self {
        Self::primitive(EtchPrimitive::Boolean)
    }

    pub fn void() -> Self {
        Self::primitive(EtchPrimitive::Void)
    }

    pub fn any() -> Self {
        Self::primitive(EtchPrimitive::Any)
    }

    pub fn never() -> Self {
        Self::primitive(EtchPrimitive::Never)
    }

    pub fn array(element: EtchType) -> Self {
        EtchType::Array(Box::new(element))
    }

    pub fn union(types: Vec<EtchType>) -> Self {
        EtchType::Union(types)
    }

    pub fn type_ref(name: impl Into<String>, type_args: Vec<EtchType>) -> Self {
        EtchType::TypeRef {
            name: name.into(),
            type_args,
        }
    }

    pub fn simple_ref(name: impl Into<String>) -> Self {
        Self::type_ref(name, Vec::new())
    }

    pub fn promise(inner: EtchType) -> Self {
        Self::type_ref("Promise", vec![inner])
    }

    /// Whether this is a `Promise<..>` reference
    pub fn is_promise(&self) -> bool {
        matches!(self, EtchType::TypeRef { name, .. } if name == "Promise")
    }

    /// Wrap in `Promise<..>` unless it already is one
    pub fn into_promise(self) -> Self {
        if self.is_promise() {
            self
        } else {
            Self::promise(self)
        }
    }

    /// Name of the outermost reference, used for async inference
    pub fn head_name(&self) -> Option<&str> {
        match self {
            EtchType::TypeRef { name, .. } => Some(name.as_str()),
            EtchType::Parenthesized(inner) => inner.head_name(),
            _ => None,
        }
    }

    /// Convert to TypeScript type string
    pub fn to_typescript(&self) -> String {
        match self {
            EtchType::Primitive(p) => p.to_typescript().to_string(),
            EtchType::Literal(lit) => lit.to_typescript(),
            EtchType::TemplateLiteral(parts) => {
                let mut result = String::from("`");
                for part in parts {
                    match part {
                        TemplatePart::String(s) => result.push_str(s),
                        TemplatePart::Type(t) => {
                            result.push_str("${");
                            result.push_str(&t.to_typescript());
                            result.push('}');
                        }
                    }
                }
                result.push('`');
                result
            }
            EtchType::Array(inner) => format!("{}[]", inner.operand()),
            EtchType::Tuple(elements) => {
                let elements: Vec<String> = elements
                    .iter()
                    .map(|e| match &e.label {
                        Some(label) => format!("{}: {}", label, e.ty.to_typescript()),
                        None => e.ty.to_typescript(),
                    })
                    .collect();
                format!("[{}]", elements.join(", "))
            }
            EtchType::Union(types) => {
                let types: Vec<String> = types.iter().map(EtchType::member).collect();
                types.join(" | ")
            }
            EtchType::Intersection(types) => {
                let types: Vec<String> = types.iter().map(EtchType::member).collect();
                types.join(" & ")
            }
            EtchType::TypeRef { name, type_args } => {
                format!("{}{}", name, type_args_to_typescript(type_args))
            }
            EtchType::Function {
                type_params,
                params,
                return_type,
                is_constructor,
                is_abstract,
            } => {
                let prefix = match (is_constructor, is_abstract) {
                    (true, true) => "abstract new ",
                    (true, false) => "new ",
                    _ => "",
                };
                format!(
                    "{}{}({}) => {}",
                    prefix,
                    type_params_to_typescript(type_params),
                    params_to_typescript(params),
                    return_type.to_typescript()
                )
            }
            EtchType::TypeLiteral(members) => {
                if members.is_empty() {
                    return "{}".to_string();
                }
                let members: Vec<String> = members.iter().map(TypeElement::to_typescript).collect();
                format!("{{ {}; }}", members.join("; "))
            }
            EtchType::Conditional {
                check_type,
                extends_type,
                true_type,
                false_type,
            } => format!(
                "{} extends {} ? {} : {}",
                check_type.member(),
                extends_type.member(),
                true_type.to_typescript(),
                false_type.to_typescript()
            ),
            EtchType::IndexedAccess {
                obj_type,
                index_type,
                readonly,
            } => format!(
                "{}{}[{}]",
                if *readonly { "readonly " } else { "" },
                obj_type.operand(),
                index_type.to_typescript()
            ),
            EtchType::Mapped {
                readonly,
                type_param,
                constraint,
                name_type,
                optional,
                value_type,
            } => {
                let mut out = String::from("{ ");
                if let Some(m) = readonly {
                    out.push_str(m.prefix());
                    out.push_str("readonly ");
                }
                out.push('[');
                out.push_str(type_param);
                if let Some(constraint) = constraint {
                    out.push_str(" in ");
                    out.push_str(&constraint.to_typescript());
                }
                if let Some(name_type) = name_type {
                    out.push_str(" as ");
                    out.push_str(&name_type.to_typescript());
                }
                out.push(']');
                if let Some(m) = optional {
                    out.push_str(m.prefix());
                    out.push('?');
                }
                out.push_str(": ");
                match value_type {
                    Some(value) => out.push_str(&value.to_typescript()),
                    None => out.push_str("any"),
                }
                out.push_str("; }");
                out
            }
            EtchType::TypeOperator { operator, type_arg } => {
                format!("{} {}", operator.keyword(), type_arg.operand())
            }
            EtchType::TypeQuery { expr, type_args } => {
                format!("typeof {}{}", expr, type_args_to_typescript(type_args))
            }
            EtchType::Infer { name, constraint } => match constraint {
                Some(c) => format!("infer {} extends {}", name, c.to_typescript()),
                None => format!("infer {}", name),
            },
            EtchType::Import {
                arg,
                qualifier,
                type_args,
            } => {
                let mut out = format!("import({})", quote(arg));
                if let Some(q) = qualifier {
                    out.push('.');
                    out.push_str(q);
                }
                out.push_str(&type_args_to_typescript(type_args));
                out
            }
            EtchType::Parenthesized(inner) => format!("({})", inner.to_typescript()),
            EtchType::This => "this".to_string(),
            EtchType::Optional(inner) => format!("{}?", inner.operand()),
            EtchType::Rest(inner) => format!("...{}", inner.to_typescript()),
            EtchType::TypePredicate {
                param_name,
                ty,
                asserts,
            } => match (asserts, ty) {
                (true, Some(ty)) => format!("asserts {} is {}", param_name, ty.to_typescript()),
                (true, None) => format!("asserts {}", param_name),
                (false, Some(ty)) => format!("{} is {}", param_name, ty.to_typescript()),
                (false, None) => param_name.clone(),
            },
        }
    }

    /// Printed as a union or intersection member
    fn member(&self) -> String {
        match self {
            EtchType::Function { .. } | EtchType::Conditional { .. } => {
                format!("({})", self.to_typescript())
            }
            _ => self.to_typescript(),
        }
    }

    /// Printed as the operand of a postfix or prefix operator
    fn operand(&self) -> String {
        match self {
            EtchType::Union(_)
            | EtchType::Intersection(_)
            | EtchType::Function { .. }
            | EtchType::Conditional { .. }
            | EtchType::TypeOperator { .. }
            | EtchType::Infer { .. } => format!("({})", self.to_typescript()),
            _ => self.to_typescript(),
        }
    }
}

impl fmt::Display for EtchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_typescript())
    }
}

fn type_args_to_typescript(args: &[EtchType]) -> String {
    if args.is_empty() {
        return String::new();
    }
    let args: Vec<String> = args.iter().map(EtchType::to_typescript).collect();
    format!("<{}>", args.join(", "))
}

/// Double-quoted TypeScript string literal
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Integral values print without a fraction
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etch_type_to_typescript() {
        assert_eq!(EtchType::string().to_typescript(), "string");
        assert_eq!(EtchType::array(EtchType::number()).to_typescript(), "number[]");
        assert_eq!(
            EtchType::union(vec![EtchType::string(), EtchType::Primitive(EtchPrimitive::Null)])
                .to_typescript(),
            "string | null"
        );
        assert_eq!(
            EtchType::type_ref("Map", vec![EtchType::string(), EtchType::simple_ref("User")])
                .to_typescript(),
            "Map<string, User>"
        );
        assert_eq!(
            EtchType::Literal(EtchLiteral::String("dark".into())).to_typescript(),
            "\"dark\""
        );
        assert_eq!(EtchType::Literal(EtchLiteral::Number(3.0)).to_typescript(), "3");
    }

    #[test]
    fn test_synthesized_types_get_parentheses() {
        let union = EtchType::union(vec![EtchType::string(), EtchType::number()]);
        assert_eq!(EtchType::array(union).to_typescript(), "(string | number)[]");

        let callback = EtchType::Function {
            type_params: vec![],
            params: vec![ParamDef::new("value", Some(EtchType::string()))],
            return_type: Box::new(EtchType::void()),
            is_constructor: false,
            is_abstract: false,
        };
        assert_eq!(
            EtchType::union(vec![callback, EtchType::Primitive(EtchPrimitive::Undefined)])
                .to_typescript(),
            "((value: string) => void) | undefined"
        );
    }

    #[test]
    fn test_into_promise_does_not_double_wrap() {
        let wrapped = EtchType::number().into_promise();
        assert_eq!(wrapped.to_typescript(), "Promise<number>");
        assert_eq!(wrapped.into_promise().to_typescript(), "Promise<number>");
        assert_eq!(EtchType::any().into_promise().to_typescript(), "Promise<any>");
    }

    #[test]
    fn test_type_elements() {
        let method = TypeElement::Method {
            name: "find".into(),
            type_params: vec![TypeParamDef {
                constraint: Some(Box::new(EtchType::simple_ref("Entity"))),
                ..TypeParamDef::new("T")
            }],
            params: vec![
                ParamDef {
                    optional: true,
                    ..ParamDef::new("id", Some(EtchType::string()))
                },
                ParamDef {
                    rest: true,
                    ..ParamDef::new("tags", None)
                },
            ],
            return_type: Some(EtchType::simple_ref("T")),
            optional: false,
        };
        assert_eq!(
            method.to_typescript(),
            "find<T extends Entity>(id?: string, ...tags: any[]): T"
        );

        let index = TypeElement::Index {
            params: vec![ParamDef::new("key", Some(EtchType::string()))],
            ty: Some(EtchType::number()),
            readonly: true,
        };
        assert_eq!(index.to_typescript(), "readonly [key: string]: number");
    }

    #[test]
    fn test_mapped_and_template() {
        let mapped = EtchType::Mapped {
            readonly: Some(MappedModifier::Minus),
            type_param: "K".into(),
            constraint: Some(Box::new(EtchType::TypeOperator {
                operator: TypeOperator::KeyOf,
                type_arg: Box::new(EtchType::simple_ref("T")),
            })),
            name_type: None,
            optional: Some(MappedModifier::Present),
            value_type: Some(Box::new(EtchType::IndexedAccess {
                obj_type: Box::new(EtchType::simple_ref("T")),
                index_type: Box::new(EtchType::simple_ref("K")),
                readonly: false,
            })),
        };
        assert_eq!(mapped.to_typescript(), "{ -readonly [K in keyof T]?: T[K]; }");

        let template = EtchType::TemplateLiteral(vec![
            TemplatePart::String("on".into()),
            TemplatePart::Type(Box::new(EtchType::type_ref(
                "Capitalize",
                vec![EtchType::simple_ref("E")],
            ))),
        ]);
        assert_eq!(template.to_typescript(), "`on${Capitalize<E>}`");
    }
}
