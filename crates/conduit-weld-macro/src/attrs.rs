//! Attribute parsing for #[component] and its member markers

use proc_macro2::TokenStream;
use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{Attribute, Ident, LitStr, Token};

/// Options of `#[component(...)]`
#[derive(Debug, Default)]
pub struct ComponentAttrs {
    pub name: Option<String>,
    pub alias: Option<String>,
    pub inject: Vec<String>,
    pub accessors: Vec<AccessorAttr>,
}

/// One `accessor(field, getter = "..", setter = "..", alias = "..")` entry
#[derive(Debug)]
pub struct AccessorAttr {
    pub field: Ident,
    pub getter: Option<String>,
    pub setter: Option<String>,
    pub alias: Option<String>,
}

impl ComponentAttrs {
    pub fn parse(attr: TokenStream) -> syn::Result<Self> {
        let mut attrs = ComponentAttrs::default();
        let parser = syn::meta::parser(|meta| attrs.parse_meta(meta));
        syn::parse::Parser::parse2(parser, attr)?;
        Ok(attrs)
    }

    fn parse_meta(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse::<LitStr>()?.value());
        } else if meta.path.is_ident("alias") {
            self.alias = Some(meta.value()?.parse::<LitStr>()?.value());
        } else if meta.path.is_ident("inject") {
            meta.parse_nested_meta(|dep| {
                let segment = dep
                    .path
                    .segments
                    .last()
                    .ok_or_else(|| dep.error("expected a component type"))?;
                self.inject.push(segment.ident.to_string());
                Ok(())
            })?;
        } else if meta.path.is_ident("accessor") {
            self.accessors.push(parse_accessor(&meta)?);
        } else {
            return Err(meta.error("unsupported component option"));
        }
        Ok(())
    }
}

fn parse_accessor(meta: &ParseNestedMeta) -> syn::Result<AccessorAttr> {
    let mut field = None;
    let mut getter = None;
    let mut setter = None;
    let mut alias = None;

    meta.parse_nested_meta(|item| {
        if item.input.peek(Token![=]) {
            let value = item.value()?.parse::<LitStr>()?.value();
            if item.path.is_ident("getter") {
                getter = Some(value);
            } else if item.path.is_ident("setter") {
                setter = Some(value);
            } else if item.path.is_ident("alias") {
                alias = Some(value);
            } else {
                return Err(item.error("unsupported accessor option"));
            }
        } else {
            let ident = item
                .path
                .get_ident()
                .cloned()
                .ok_or_else(|| item.error("expected a field name"))?;
            field = Some(ident);
        }
        Ok(())
    })?;

    let field = field.ok_or_else(|| meta.error("accessor needs a field name"))?;
    Ok(AccessorAttr {
        field,
        getter,
        setter,
        alias,
    })
}

/// Member markers found on one method
#[derive(Debug, Default)]
pub struct MemberRoles {
    /// `#[expose]`, with its optional alias
    pub expose: Option<Option<String>>,
    /// `#[command("ctrl+c", ...)]`
    pub command: Option<Vec<String>>,
    /// `#[menu_item("#id", ...)]`
    pub menu_item: Option<Vec<String>>,
    /// `#[hook("channel")]`
    pub hook: Option<String>,
    /// `#[on_main("channel")]`
    pub on_main: Option<String>,
    /// `#[on_renderer("channel")]`
    pub on_renderer: Option<String>,
}

impl MemberRoles {
    pub fn is_empty(&self) -> bool {
        self.expose.is_none()
            && self.command.is_none()
            && self.menu_item.is_none()
            && self.hook.is_none()
            && self.on_main.is_none()
            && self.on_renderer.is_none()
    }

    /// Consume marker attributes, returning whether `attr` was one
    pub fn take(&mut self, attr: &Attribute) -> syn::Result<bool> {
        if attr.path().is_ident("expose") {
            let mut alias = None;
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("alias") {
                        alias = Some(meta.value()?.parse::<LitStr>()?.value());
                        Ok(())
                    } else {
                        Err(meta.error("unsupported expose option"))
                    }
                })?;
            }
            self.expose = Some(alias);
            Ok(true)
        } else if attr.path().is_ident("command") {
            self.command = Some(string_list(attr, "key combination")?);
            Ok(true)
        } else if attr.path().is_ident("menu_item") {
            self.menu_item = Some(string_list(attr, "menu selector")?);
            Ok(true)
        } else if attr.path().is_ident("hook") {
            self.hook = Some(attr.parse_args::<LitStr>()?.value());
            Ok(true)
        } else if attr.path().is_ident("on_main") {
            self.on_main = Some(attr.parse_args::<LitStr>()?.value());
            Ok(true)
        } else if attr.path().is_ident("on_renderer") {
            self.on_renderer = Some(attr.parse_args::<LitStr>()?.value());
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

fn string_list(attr: &Attribute, what: &str) -> syn::Result<Vec<String>> {
    let list = attr.parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated)?;
    if list.is_empty() {
        return Err(syn::Error::new_spanned(
            attr,
            format!("expected at least one {}", what),
        ));
    }
    Ok(list.iter().map(LitStr::value).collect())
}
