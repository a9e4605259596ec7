//! Source graph nodes
//!
//! Every declaration the generator can emit lives in one arena owned by the
//! [`Program`](crate::program::Program) and is addressed by [`DeclId`].

use crate::types::{EtchType, ParamDef, TypeElement, TypeParamDef};
use conduit_weld::ComponentDescriptor;
use indexmap::IndexMap;
use std::fmt;

/// Index of a source file in the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

/// Index of a declaration in the program arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub usize);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a local name was imported
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `import { Name } from` (the exported name, not the local alias)
    Named(String),
    /// `import Name from`
    Default,
    /// `import * as ns from`
    Namespace,
}

/// One imported local binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub specifier: String,
    pub kind: ImportKind,
}

/// What an exported name refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// A name in the file's own scope
    Local(String),
    /// `export { name } from "specifier"`
    ReExport { specifier: String, name: String },
}

/// Module-level scope of one parsed file
#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    /// Local name to binding
    pub imports: IndexMap<String, ImportBinding>,
    /// Exported name to target
    pub exports: IndexMap<String, ExportTarget>,
    /// `export * from` specifiers
    pub star_exports: Vec<String>,
}

/// Declared visibility of a class member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    /// `private` or `#name`
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMemberKind {
    Method {
        type_params: Vec<TypeParamDef>,
        params: Vec<ParamDef>,
        return_type: Option<EtchType>,
        is_async: bool,
    },
    /// Field or constructor parameter property; `ty` falls back to the
    /// initializer's literal type
    Property { ty: Option<EtchType>, readonly: bool },
    Getter { ty: Option<EtchType> },
    Setter { param: Option<ParamDef> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub optional: bool,
    pub kind: ClassMemberKind,
}

impl ClassMember {
    /// Public instance member
    pub fn is_public_instance(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_static
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub type_params: Vec<TypeParamDef>,
    /// Base class reference with its type arguments
    pub extends: Option<EtchType>,
    pub members: Vec<ClassMember>,
    /// Present when the class carries a component decorator
    pub component: Option<ComponentDescriptor>,
}

impl ClassDef {
    /// First instance method called `name`
    pub fn method(&self, name: &str) -> Option<&ClassMember> {
        self.members.iter().find(|m| {
            !m.is_static && m.name == name && matches!(m.kind, ClassMemberKind::Method { .. })
        })
    }

    /// Type of the instance property or getter called `key`
    pub fn property_type(&self, key: &str) -> Option<&EtchType> {
        self.members
            .iter()
            .filter(|m| !m.is_static && m.name == key)
            .find_map(|m| match &m.kind {
                ClassMemberKind::Property { ty, .. } | ClassMemberKind::Getter { ty } => {
                    ty.as_ref()
                }
                _ => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDef {
    pub type_params: Vec<TypeParamDef>,
    pub extends: Vec<EtchType>,
    pub members: Vec<TypeElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDef {
    pub type_params: Vec<TypeParamDef>,
    pub ty: EtchType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberDef {
    pub name: String,
    /// Literal initializer, already printed
    pub init: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub is_const: bool,
    pub members: Vec<EnumMemberDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Class(ClassDef),
    Interface(InterfaceDef),
    TypeAlias(TypeAliasDef),
    Enum(EnumDef),
}

impl DeclKind {
    pub fn label(&self) -> &'static str {
        match self {
            DeclKind::Class(_) => "class",
            DeclKind::Interface(_) => "interface",
            DeclKind::TypeAlias(_) => "type alias",
            DeclKind::Enum(_) => "enum",
        }
    }
}

/// A named declaration as it comes out of the parser
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDecl {
    pub name: String,
    pub kind: DeclKind,
}

/// A declaration placed in the program arena
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub id: DeclId,
    pub file: FileId,
    pub name: String,
    pub kind: DeclKind,
}

impl Declaration {
    /// The component descriptor of an annotated class
    pub fn component(&self) -> Option<&ComponentDescriptor> {
        match &self.kind {
            DeclKind::Class(class) => class.component.as_ref(),
            _ => None,
        }
    }
}
