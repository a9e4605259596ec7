//! SWC/deno_ast TypeScript parsing utilities

use crate::diagnostics::{EtchError, EtchResult};
use deno_ast::swc::ast as swc_ast;
use deno_ast::{MediaType, ParseParams, ParsedSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A parsed TypeScript module
#[derive(Debug)]
pub struct ParsedModule {
    /// The parsed source from deno_ast
    pub source: ParsedSource,
    pub path: PathBuf,
}

impl ParsedModule {
    /// The module AST, `None` if the source parsed as a script
    pub fn module(&self) -> Option<&swc_ast::Module> {
        match self.source.program_ref() {
            deno_ast::ProgramRef::Module(m) => Some(m),
            deno_ast::ProgramRef::Script(_) => None,
        }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse a TypeScript file from disk
pub fn parse_typescript_file(path: impl AsRef<Path>) -> EtchResult<ParsedModule> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        EtchError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read {}: {}", path.display(), e),
        ))
    })?;

    parse_typescript_source(path, text)
}

/// Parse TypeScript source code from a string
pub fn parse_typescript_source(
    path: impl AsRef<Path>,
    source: impl Into<Arc<str>>,
) -> EtchResult<ParsedModule> {
    let path = path.as_ref();
    let source: Arc<str> = source.into();

    let media_type = MediaType::from_path(path);

    // deno_ast requires absolute paths for file specifiers
    let specifier = deno_ast::ModuleSpecifier::from_file_path(path)
        .map_err(|_| EtchError::InvalidPath(path.display().to_string()))?;

    let parsed = deno_ast::parse_module(ParseParams {
        specifier,
        text: source,
        media_type,
        capture_tokens: false,
        scope_analysis: false,
        maybe_syntax: None,
    })
    .map_err(|e| EtchError::parse(path, e.to_string()))?;

    Ok(ParsedModule {
        source: parsed,
        path: path.to_path_buf(),
    })
}

/// Helper to convert Wtf8Atom to String
pub fn wtf8_to_string(s: &swc_ast::Str) -> String {
    // Wtf8Atom stores WTF-8 encoded data which is a superset of UTF-8
    String::from_utf8_lossy(s.value.as_bytes()).into_owned()
}

/// Get the name of a property key
pub fn prop_name_str(name: &swc_ast::PropName) -> Option<String> {
    match name {
        swc_ast::PropName::Ident(i) => Some(i.sym.to_string()),
        swc_ast::PropName::Str(s) => Some(wtf8_to_string(s)),
        swc_ast::PropName::Num(n) => Some(n.value.to_string()),
        swc_ast::PropName::BigInt(b) => Some(b.value.to_string()),
        swc_ast::PropName::Computed(_) => None,
    }
}

/// Get the name from an expression (for interface member keys)
pub fn expr_to_name(expr: &swc_ast::Expr) -> Option<String> {
    match expr {
        swc_ast::Expr::Ident(i) => Some(i.sym.to_string()),
        swc_ast::Expr::Lit(swc_ast::Lit::Str(s)) => Some(wtf8_to_string(s)),
        swc_ast::Expr::Lit(swc_ast::Lit::Num(n)) => Some(n.value.to_string()),
        swc_ast::Expr::Member(m) => {
            // Symbol.iterator and friends
            let obj = expr_to_name(&m.obj)?;
            let prop = match &m.prop {
                swc_ast::MemberProp::Ident(i) => i.sym.to_string(),
                swc_ast::MemberProp::Computed(c) => expr_to_name(&c.expr)?,
                swc_ast::MemberProp::PrivateName(p) => format!("#{}", p.name),
            };
            Some(format!("{}.{}", obj, prop))
        }
        _ => None,
    }
}

/// Print a member key the way it has to appear in a declaration
pub fn member_key(expr: &swc_ast::Expr, computed: bool) -> Option<String> {
    let name = expr_to_name(expr)?;
    if computed {
        return Some(format!("[{}]", name));
    }
    match expr {
        swc_ast::Expr::Lit(swc_ast::Lit::Str(_)) if !is_identifier(&name) => {
            Some(crate::types::quote(&name))
        }
        _ => Some(name),
    }
}

/// Whether `name` can be written without quotes
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
