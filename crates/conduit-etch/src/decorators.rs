//! Component decorators in TypeScript sources
//!
//! Decorator calls are read into plain values; the parser turns them into
//! the same descriptors the Rust `#[component]` macro produces:
//!
//! - `@Component({ inject: [A, B], as: "alias" })` (also `@Injectable`)
//! - `@Expose()`, `@Expose({ as: "name" })`
//! - `@Accessor({ getter: "g", setter: "s", as: "name" })`
//! - `@Command("ctrl+c")`, `@Command(["ctrl+c", "ctrl+shift+c"])`
//! - `@MenuItem("#id")`, `@MenuItem(["Label", "$role"])`
//! - `@Invoke("channel")`, `@OnMain("channel")`, `@OnRenderer("channel")`

use crate::utils::swc::{prop_name_str, wtf8_to_string};
use deno_ast::swc::ast as swc_ast;
use indexmap::IndexMap;

/// Class-level decorator names
pub const COMPONENT_DECORATORS: &[&str] = &["Component", "Injectable"];
pub const EXPOSE: &str = "Expose";
pub const ACCESSOR: &str = "Accessor";
pub const COMMAND: &str = "Command";
pub const MENU_ITEM: &str = "MenuItem";
pub const INVOKE: &str = "Invoke";
pub const ON_MAIN: &str = "OnMain";
pub const ON_RENDERER: &str = "OnRenderer";

/// A statically readable decorator argument
#[derive(Debug, Clone, PartialEq)]
pub enum DecoratorArg {
    /// String literal or bare identifier
    String(String),
    List(Vec<String>),
    Options(IndexMap<String, DecoratorArg>),
    /// Anything that needs evaluation
    Other,
}

impl DecoratorArg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecoratorArg::String(s) => Some(s),
            _ => None,
        }
    }

    /// A single string or a list of strings
    pub fn strings(&self) -> Vec<String> {
        match self {
            DecoratorArg::String(s) => vec![s.clone()],
            DecoratorArg::List(items) => items.clone(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    pub name: String,
    pub args: Vec<DecoratorArg>,
}

impl Decorator {
    /// Value of `key` in the first options object
    pub fn option(&self, key: &str) -> Option<&DecoratorArg> {
        self.args.iter().find_map(|arg| match arg {
            DecoratorArg::Options(options) => options.get(key),
            _ => None,
        })
    }

    /// String value of the first of `keys` present
    pub fn option_str(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|key| self.option(key).and_then(DecoratorArg::as_str))
            .map(str::to_string)
    }

    /// First positional string argument
    pub fn first_str(&self) -> Option<String> {
        self.args.first().and_then(DecoratorArg::as_str).map(str::to_string)
    }

    /// Positional string arguments, flattened
    pub fn strings(&self) -> Vec<String> {
        self.args.iter().flat_map(DecoratorArg::strings).collect()
    }

    pub fn is_component(&self) -> bool {
        COMPONENT_DECORATORS.contains(&self.name.as_str())
    }
}

/// Find a decorator by name
pub fn find<'a>(decorators: &'a [Decorator], name: &str) -> Option<&'a Decorator> {
    decorators.iter().find(|d| d.name == name)
}

/// Read every decorator whose callee is a plain or namespaced identifier
pub fn read_decorators(decorators: &[swc_ast::Decorator]) -> Vec<Decorator> {
    decorators
        .iter()
        .filter_map(|d| match d.expr.as_ref() {
            swc_ast::Expr::Call(call) => {
                let name = call.callee.as_expr().and_then(|e| callee_name(e))?;
                let args = call.args.iter().map(|a| read_arg(&a.expr)).collect();
                Some(Decorator { name, args })
            }
            expr => callee_name(expr).map(|name| Decorator {
                name,
                args: Vec::new(),
            }),
        })
        .collect()
}

/// `Expose` and `conduit.Expose` both name `Expose`
fn callee_name(expr: &swc_ast::Expr) -> Option<String> {
    match expr {
        swc_ast::Expr::Ident(i) => Some(i.sym.to_string()),
        swc_ast::Expr::Member(m) => match &m.prop {
            swc_ast::MemberProp::Ident(i) => Some(i.sym.to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn read_string(expr: &swc_ast::Expr) -> Option<String> {
    match expr {
        swc_ast::Expr::Lit(swc_ast::Lit::Str(s)) => Some(wtf8_to_string(s)),
        swc_ast::Expr::Tpl(tpl) if tpl.exprs.is_empty() => {
            Some(tpl.quasis.iter().map(|q| q.raw.to_string()).collect())
        }
        swc_ast::Expr::Ident(i) => Some(i.sym.to_string()),
        swc_ast::Expr::Paren(p) => read_string(&p.expr),
        _ => None,
    }
}

fn read_arg(expr: &swc_ast::Expr) -> DecoratorArg {
    if let Some(s) = read_string(expr) {
        return DecoratorArg::String(s);
    }
    match expr {
        swc_ast::Expr::Array(array) => DecoratorArg::List(
            array
                .elems
                .iter()
                .flatten()
                .filter_map(|e| read_string(&e.expr))
                .collect(),
        ),
        swc_ast::Expr::Object(object) => {
            let mut options = IndexMap::new();
            for prop in &object.props {
                let swc_ast::PropOrSpread::Prop(prop) = prop else {
                    continue;
                };
                match prop.as_ref() {
                    swc_ast::Prop::KeyValue(kv) => {
                        if let Some(key) = prop_name_str(&kv.key) {
                            options.insert(key, read_arg(&kv.value));
                        }
                    }
                    // `{ inject }` shorthand
                    swc_ast::Prop::Shorthand(ident) => {
                        options.insert(ident.sym.to_string(), DecoratorArg::Other);
                    }
                    _ => {}
                }
            }
            DecoratorArg::Options(options)
        }
        _ => DecoratorArg::Other,
    }
}
