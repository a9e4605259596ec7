//! Declaration file printer

use crate::node::EnumMemberDef;
use crate::types::{quote, type_params_to_typescript, EtchType, TypeElement, TypeParamDef};
use crate::utils::swc::is_identifier;
use std::fmt::Write;

pub const HEADER: &str = "// Generated by conduit. Do not edit.";
const INDENT: &str = "    ";

/// Type-only imports from one external module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportStatement {
    pub module: String,
    pub default: Option<String>,
    pub namespace: Option<String>,
    /// `(exported, local)` pairs
    pub named: Vec<(String, String)>,
}

impl ImportStatement {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Default::default()
        }
    }

    /// One line per binding form; `import type` takes either a default or
    /// named bindings, never both
    pub fn to_typescript(&self) -> Vec<String> {
        let from = quote(&self.module);
        let mut lines = Vec::new();
        if let Some(default) = &self.default {
            lines.push(format!("import type {} from {};", default, from));
        }
        if let Some(namespace) = &self.namespace {
            lines.push(format!("import type * as {} from {};", namespace, from));
        }
        if !self.named.is_empty() {
            let named: Vec<String> = self
                .named
                .iter()
                .map(|(exported, local)| {
                    if exported == local {
                        local.clone()
                    } else {
                        format!("{} as {}", exported, local)
                    }
                })
                .collect();
            lines.push(format!("import type {{ {} }} from {};", named.join(", "), from));
        }
        lines
    }
}

/// A top-level declaration in the output
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Interface {
        name: String,
        type_params: Vec<TypeParamDef>,
        extends: Vec<EtchType>,
        members: Vec<TypeElement>,
    },
    TypeAlias {
        name: String,
        type_params: Vec<TypeParamDef>,
        ty: EtchType,
    },
    Enum {
        name: String,
        is_const: bool,
        members: Vec<EnumMemberDef>,
    },
}

impl Statement {
    pub fn name(&self) -> &str {
        match self {
            Statement::Interface { name, .. }
            | Statement::TypeAlias { name, .. }
            | Statement::Enum { name, .. } => name,
        }
    }

    pub fn to_typescript(&self) -> String {
        match self {
            Statement::Interface {
                name,
                type_params,
                extends,
                members,
            } => {
                let mut out = format!("export interface {}{}", name, type_params_to_typescript(type_params));
                if !extends.is_empty() {
                    let bases: Vec<String> = extends.iter().map(EtchType::to_typescript).collect();
                    out.push_str(" extends ");
                    out.push_str(&bases.join(", "));
                }
                if members.is_empty() {
                    out.push_str(" {}");
                    return out;
                }
                out.push_str(" {\n");
                for member in members {
                    let _ = writeln!(out, "{}{};", INDENT, member.to_typescript());
                }
                out.push('}');
                out
            }
            Statement::TypeAlias {
                name,
                type_params,
                ty,
            } => format!(
                "export type {}{} = {};",
                name,
                type_params_to_typescript(type_params),
                ty.to_typescript()
            ),
            Statement::Enum {
                name,
                is_const,
                members,
            } => {
                let keyword = if *is_const { "const enum" } else { "enum" };
                if members.is_empty() {
                    return format!("export {} {} {{}}", keyword, name);
                }
                let mut out = format!("export {} {} {{\n", keyword, name);
                for member in members {
                    let key = if is_identifier(&member.name) {
                        member.name.clone()
                    } else {
                        quote(&member.name)
                    };
                    match &member.init {
                        Some(init) => {
                            let _ = writeln!(out, "{}{} = {},", INDENT, key, init);
                        }
                        None => {
                            let _ = writeln!(out, "{}{},", INDENT, key);
                        }
                    }
                }
                out.push('}');
                out
            }
        }
    }
}

/// `var <alias>: <Interface>;` inside `declare global`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalBinding {
    pub alias: String,
    pub interface: String,
}

/// Everything one generation run produces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    pub imports: Vec<ImportStatement>,
    pub statements: Vec<Statement>,
    pub globals: Vec<GlobalBinding>,
}

impl Translation {
    pub fn statement(&self, name: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.name() == name)
    }
}

/// Print the declaration file
pub fn emit(translation: &Translation) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    if !translation.imports.is_empty() {
        out.push('\n');
        for import in &translation.imports {
            for line in import.to_typescript() {
                out.push_str(&line);
                out.push('\n');
            }
        }
    }

    for statement in &translation.statements {
        out.push('\n');
        out.push_str(&statement.to_typescript());
        out.push('\n');
    }
    if translation.statements.is_empty() {
        // keeps the file a module so `declare global` is legal
        out.push_str("\nexport {};\n");
    }

    if !translation.globals.is_empty() {
        out.push_str("\ndeclare global {\n");
        for global in &translation.globals {
            let _ = writeln!(out, "{}var {}: {};", INDENT, global.alias, global.interface);
        }
        out.push_str("}\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamDef;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_import_lines() {
        let import = ImportStatement {
            module: "node:events".into(),
            default: Some("Events".into()),
            namespace: None,
            named: vec![
                ("EventEmitter".into(), "EventEmitter".into()),
                ("Listener".into(), "Listener_1".into()),
            ],
        };
        assert_eq!(
            import.to_typescript(),
            [
                "import type Events from \"node:events\";",
                "import type { EventEmitter, Listener as Listener_1 } from \"node:events\";",
            ]
        );
    }

    #[test]
    fn test_emit_full_file() {
        let translation = Translation {
            imports: vec![ImportStatement {
                named: vec![("Readable".into(), "Readable".into())],
                ..ImportStatement::new("node:stream")
            }],
            statements: vec![
                Statement::Interface {
                    name: "Files".into(),
                    type_params: vec![],
                    extends: vec![],
                    members: vec![TypeElement::method(
                        "open",
                        vec![ParamDef::new("mode", Some(EtchType::simple_ref("Mode")))],
                        EtchType::simple_ref("Readable"),
                    )],
                },
                Statement::Enum {
                    name: "Mode".into(),
                    is_const: false,
                    members: vec![
                        EnumMemberDef {
                            name: "Read".into(),
                            init: Some("\"r\"".into()),
                        },
                        EnumMemberDef {
                            name: "read-write".into(),
                            init: None,
                        },
                    ],
                },
                Statement::TypeAlias {
                    name: "Empty".into(),
                    type_params: vec![],
                    ty: EtchType::TypeLiteral(vec![]),
                },
            ],
            globals: vec![GlobalBinding {
                alias: "files".into(),
                interface: "Files".into(),
            }],
        };

        let expected = r#"// Generated by conduit. Do not edit.

import type { Readable } from "node:stream";

export interface Files {
    open(mode: Mode): Readable;
}

export enum Mode {
    Read = "r",
    "read-write",
}

export type Empty = {};

declare global {
    var files: Files;
}
"#;
        assert_eq!(emit(&translation), expected);
    }

    #[test]
    fn test_empty_translation_is_still_a_module() {
        assert_eq!(
            emit(&Translation::default()),
            "// Generated by conduit. Do not edit.\n\nexport {};\n"
        );
    }
}
