//! Implementation of the #[component] macro

use crate::attrs::{ComponentAttrs, MemberRoles};
use conduit_weld::{infer_async, to_camel_case};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse2, FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, PathArguments, ReturnType,
    Type, TypeParamBound,
};

/// An annotated method of the impl block
struct Member {
    ident: syn::Ident,
    name: String,
    is_async: bool,
    /// `self: Arc<Self>` instead of `&self`
    typed_receiver: bool,
    params: Vec<Type>,
    returns_result: bool,
    roles: MemberRoles,
}

/// Last path segment of a type, or the first trait of an `impl Trait`
fn type_head(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(p) => p.path.segments.last(),
        Type::ImplTrait(t) => t.bounds.iter().find_map(|b| match b {
            TypeParamBound::Trait(t) => t.path.segments.last(),
            _ => None,
        }),
        Type::Paren(p) => type_head(&p.elem),
        Type::Group(g) => type_head(&g.elem),
        _ => None,
    }
}

/// Type the caller eventually receives, looking through future wrappers
fn settled_type(ty: &Type, awaits_return: bool) -> Option<&Type> {
    if !awaits_return {
        return Some(ty);
    }
    let head = type_head(ty)?;
    match &head.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().rev().find_map(|arg| match arg {
            GenericArgument::Type(t) => Some(t),
            GenericArgument::AssocType(assoc) if assoc.ident == "Output" => Some(&assoc.ty),
            _ => None,
        }),
        _ => None,
    }
}

impl Member {
    fn from_method(method: &ImplItemFn, roles: MemberRoles) -> syn::Result<Self> {
        let sig = &method.sig;
        let typed_receiver = match sig.inputs.first() {
            Some(FnArg::Receiver(r)) if r.reference.is_some() && r.mutability.is_none() => false,
            Some(FnArg::Receiver(r)) if r.colon_token.is_some() => true,
            _ => {
                return Err(syn::Error::new_spanned(
                    sig,
                    "component members take `&self` or `self: Arc<Self>`",
                ))
            }
        };

        let params = sig
            .inputs
            .iter()
            .skip(1)
            .map(|arg| match arg {
                FnArg::Typed(pat) => Ok((*pat.ty).clone()),
                FnArg::Receiver(r) => Err(syn::Error::new_spanned(r, "unexpected receiver")),
            })
            .collect::<syn::Result<Vec<_>>>()?;

        let output = match &sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => Some(&**ty),
        };
        let head = output.and_then(type_head).map(|s| s.ident.to_string());
        let is_async = infer_async(sig.asyncness.is_some(), head.as_deref());

        // A sync fn returning a future hands back the future itself.
        let awaits_return = is_async && sig.asyncness.is_none();
        let returns_result = output
            .and_then(|ty| settled_type(ty, awaits_return))
            .and_then(type_head)
            .is_some_and(|s| s.ident == "Result");

        Ok(Member {
            ident: sig.ident.clone(),
            name: to_camel_case(&sig.ident.to_string()),
            is_async,
            typed_receiver,
            params,
            returns_result,
            roles,
        })
    }

    fn dispatch_arm(&self) -> TokenStream {
        let name = &self.name;
        let ident = &self.ident;
        let vars: Vec<_> = (0..self.params.len())
            .map(|i| format_ident!("arg{}", i))
            .collect();
        let decodes = self.params.iter().zip(&vars).enumerate().map(|(i, (ty, var))| {
            quote! {
                let #var: #ty = match ::conduit_weld::decode_arg(&mut args, #name, #i) {
                    Ok(value) => value,
                    Err(err) => return Err(err),
                };
            }
        });
        let args_iter = if self.params.is_empty() {
            quote! { let _ = args; }
        } else {
            quote! { let mut args = args.into_iter(); }
        };

        let receiver = if self.typed_receiver {
            quote! { ::std::sync::Arc::clone(&this) }
        } else {
            quote! { this }
        };
        let mut call = quote! { #receiver.#ident(#(#vars),*) };
        if self.is_async {
            call = quote! { #call.await };
        }
        let finish = if self.returns_result {
            quote! {
                match #call {
                    Ok(out) => ::conduit_weld::encode_return(#name, out),
                    Err(err) => Err(::conduit_weld::MemberError::failed(#name, err.to_string())),
                }
            }
        } else {
            quote! { ::conduit_weld::encode_return(#name, #call) }
        };

        if self.is_async {
            quote! {
                #name => {
                    let this = self;
                    ::conduit_weld::Invocation::pending(async move {
                        #args_iter
                        #(#decodes)*
                        #finish
                    })
                }
            }
        } else {
            quote! {
                #name => {
                    let this = self;
                    let result = (move || -> ::std::result::Result<
                        ::conduit_weld::serde_json::Value,
                        ::conduit_weld::MemberError,
                    > {
                        #args_iter
                        #(#decodes)*
                        #finish
                    })();
                    ::conduit_weld::Invocation::ready(result)
                }
            }
        }
    }

    fn descriptor_calls(&self) -> TokenStream {
        let name = &self.name;
        let is_async = self.is_async;
        let mut calls = TokenStream::new();

        if let Some(alias) = &self.roles.expose {
            let alias = alias.as_ref().map(|a| quote!(.with_alias(#a)));
            calls.extend(quote! {
                .expose(::conduit_weld::ExposedMethod::new(#name).asynchronous(#is_async) #alias)
            });
        }
        if let Some(combinations) = &self.roles.command {
            calls.extend(quote! {
                .command(
                    ::conduit_weld::CommandDescriptor::new(#name, [#(#combinations),*])
                        .asynchronous(#is_async)
                )
            });
        }
        if let Some(selectors) = &self.roles.menu_item {
            calls.extend(quote! {
                .menu_item(
                    ::conduit_weld::MenuBinding::new(#name, [#(#selectors),*])
                        .asynchronous(#is_async)
                )
            });
        }
        if let Some(channel) = &self.roles.hook {
            calls.extend(quote! {
                .hook(::conduit_weld::HookDescriptor::new(#name, #channel).asynchronous(#is_async))
            });
        }
        if let Some(channel) = &self.roles.on_main {
            calls.extend(quote! {
                .listener(
                    ::conduit_weld::ListenerDescriptor::on_main(#name, #channel)
                        .asynchronous(#is_async)
                )
            });
        }
        if let Some(channel) = &self.roles.on_renderer {
            calls.extend(quote! {
                .listener(
                    ::conduit_weld::ListenerDescriptor::on_renderer(#name, #channel)
                        .asynchronous(#is_async)
                )
            });
        }
        calls
    }
}

fn collect_members(input: &mut ItemImpl) -> syn::Result<Vec<Member>> {
    let mut members = Vec::new();

    for item in input.items.iter_mut() {
        let ImplItem::Fn(method) = item else {
            continue;
        };

        let mut roles = MemberRoles::default();
        let mut kept = Vec::with_capacity(method.attrs.len());
        for attr in method.attrs.drain(..) {
            if !roles.take(&attr)? {
                kept.push(attr);
            }
        }
        method.attrs = kept;

        if !roles.is_empty() {
            members.push(Member::from_method(method, roles)?);
        }
    }

    Ok(members)
}

fn expand(attr: TokenStream, mut input: ItemImpl) -> syn::Result<TokenStream> {
    let attrs = ComponentAttrs::parse(attr)?;

    if input.trait_.is_some() {
        return Err(syn::Error::new_spanned(
            &input.self_ty,
            "#[component] goes on an inherent impl block",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic components are not supported",
        ));
    }

    let self_ty = input.self_ty.clone();
    let type_ident = type_head(&self_ty)
        .map(|s| s.ident.clone())
        .ok_or_else(|| syn::Error::new_spanned(&self_ty, "expected a named type"))?;
    let identity = attrs.name.clone().unwrap_or_else(|| type_ident.to_string());

    let members = collect_members(&mut input)?;

    let alias = attrs.alias.as_ref().map(|a| quote!(.with_alias(#a)));
    let dependencies = attrs.inject.iter().map(|dep| quote!(.depends_on(#dep)));
    let member_calls = members.iter().map(Member::descriptor_calls);
    let accessor_calls = attrs.accessors.iter().map(|acc| {
        let key = to_camel_case(&acc.field.to_string());
        let getter = acc.getter.as_ref().map(|g| quote!(.with_getter(#g)));
        let setter = acc.setter.as_ref().map(|s| quote!(.with_setter(#s)));
        let alias = acc.alias.as_ref().map(|a| quote!(.with_alias(#a)));
        quote! {
            .accessor(::conduit_weld::AccessorDescriptor::new(#key) #getter #setter #alias)
        }
    });

    let arms = members.iter().map(Member::dispatch_arm);

    let property_access = if attrs.accessors.is_empty() {
        TokenStream::new()
    } else {
        let keys: Vec<_> = attrs
            .accessors
            .iter()
            .map(|acc| to_camel_case(&acc.field.to_string()))
            .collect();
        let fields: Vec<_> = attrs.accessors.iter().map(|acc| &acc.field).collect();
        quote! {
            fn read(
                &self,
                property: &str,
            ) -> ::std::result::Result<::conduit_weld::serde_json::Value, ::conduit_weld::MemberError> {
                match property {
                    #(#keys => self.#fields.to_json(property),)*
                    other => Err(::conduit_weld::MemberError::unknown_property(other)),
                }
            }

            fn write(
                &self,
                property: &str,
                value: ::conduit_weld::serde_json::Value,
            ) -> ::std::result::Result<(), ::conduit_weld::MemberError> {
                match property {
                    #(#keys => self.#fields.set_json(property, value),)*
                    other => Err(::conduit_weld::MemberError::unknown_property(other)),
                }
            }
        }
    };

    Ok(quote! {
        #input

        impl #self_ty {
            #[doc(hidden)]
            pub fn component_descriptor() -> ::conduit_weld::ComponentDescriptor {
                ::conduit_weld::ComponentDescriptor::new(#identity)
                    #alias
                    #(#dependencies)*
                    #(#member_calls)*
                    #(#accessor_calls)*
            }
        }

        impl ::conduit_weld::Component for #self_ty {
            fn invoke(
                self: ::std::sync::Arc<Self>,
                member: &str,
                args: ::std::vec::Vec<::conduit_weld::serde_json::Value>,
            ) -> ::conduit_weld::Invocation {
                match member {
                    #(#arms)*
                    other => {
                        let _ = args;
                        ::conduit_weld::Invocation::ready(Err(
                            ::conduit_weld::MemberError::unknown_member(other),
                        ))
                    }
                }
            }

            #property_access
        }

        const _: () = {
            #[::conduit_weld::linkme::distributed_slice(::conduit_weld::COMPONENTS)]
            #[linkme(crate = ::conduit_weld::linkme)]
            static REGISTRATION: fn() -> ::conduit_weld::Registration = || {
                ::conduit_weld::Registration::new(
                    <#self_ty>::component_descriptor(),
                    |deps| -> ::std::sync::Arc<dyn ::conduit_weld::Component> {
                        ::std::sync::Arc::new(<#self_ty as ::conduit_weld::Inject>::inject(deps))
                    },
                )
            };
        };
    })
}

pub fn component_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input: ItemImpl = match parse2(item) {
        Ok(input) => input,
        Err(e) => return e.to_compile_error(),
    };

    expand(attr, input).unwrap_or_else(|e| e.to_compile_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded(attr: TokenStream, item: TokenStream) -> String {
        component_impl(attr, item).to_string()
    }

    #[test]
    fn test_descriptor_and_dispatch_are_generated() {
        let out = expanded(
            quote!(alias = "counter", accessor(value)),
            quote! {
                impl Counter {
                    #[expose]
                    pub fn increment(&self) -> i64 { 1 }

                    #[expose(alias = "fetchAll")]
                    pub async fn load_all(&self, limit: u32) -> Result<Vec<i64>, String> { Ok(vec![]) }

                    #[command("ctrl+r")]
                    #[menu_item("#reset", "Reset")]
                    fn reset(&self) {}

                    fn helper(&self) {}
                }
            },
        );

        assert!(out.contains("component_descriptor"));
        assert!(out.contains("ExposedMethod :: new (\"increment\") . asynchronous (false)"));
        assert!(out.contains("ExposedMethod :: new (\"loadAll\") . asynchronous (true) . with_alias (\"fetchAll\")"));
        assert!(out.contains("CommandDescriptor :: new (\"reset\" , [\"ctrl+r\"])"));
        assert!(out.contains("MenuBinding :: new (\"reset\" , [\"#reset\" , \"Reset\"])"));
        assert!(out.contains("AccessorDescriptor :: new (\"value\")"));
        assert!(out.contains("Invocation :: pending"));
        assert!(out.contains("const _ : () ="));
        assert!(!out.contains("\"helper\""));
        // markers are stripped from the emitted impl
        assert!(!out.contains("# [expose"));
    }

    #[test]
    fn test_hook_and_listener_markers() {
        let out = expanded(
            quote!(),
            quote! {
                impl Notifier {
                    #[expose]
                    #[hook("message")]
                    pub fn greet(&self) -> String { String::new() }

                    #[on_main("refresh")]
                    pub async fn refresh(&self, full: bool) {}

                    #[on_renderer("theme")]
                    fn redraw(&self, theme: String) {}
                }
            },
        );

        assert!(out.contains("HookDescriptor :: new (\"greet\" , \"message\") . asynchronous (false)"));
        assert!(out.contains("ListenerDescriptor :: on_main (\"refresh\" , \"refresh\") . asynchronous (true)"));
        assert!(out.contains("ListenerDescriptor :: on_renderer (\"redraw\" , \"theme\")"));
        // listener-only methods still get a dispatch arm
        assert!(out.contains("\"redraw\" =>"));
        assert!(!out.contains("# [hook"));
    }

    #[test]
    fn test_two_components_in_one_module_expand_to_anonymous_statics() {
        let first = expanded(quote!(), quote!(impl Clock { #[expose] fn now(&self) -> u64 { 0 } }));
        let second = expanded(quote!(), quote!(impl Timer { #[expose] fn now(&self) -> u64 { 0 } }));
        for out in [&first, &second] {
            assert!(out.contains("const _ : () ="));
            assert!(!out.contains("__CONDUIT_COMPONENT"));
        }
    }

    #[test]
    fn test_future_returning_method_is_async() {
        let out = expanded(
            quote!(),
            quote! {
                impl Store {
                    #[expose]
                    fn fetch(&self) -> BoxFuture<'static, Result<String, Error>> { todo!() }
                }
            },
        );
        assert!(out.contains("asynchronous (true)"));
        assert!(out.contains("MemberError :: failed"));
    }

    #[test]
    fn test_trait_impl_is_rejected() {
        let out = expanded(quote!(), quote!(impl Default for Counter {}));
        assert!(out.contains("compile_error"));
    }

    #[test]
    fn test_mut_receiver_is_rejected() {
        let out = expanded(
            quote!(),
            quote! {
                impl Counter {
                    #[expose]
                    fn bump(&mut self) {}
                }
            },
        );
        assert!(out.contains("compile_error"));
    }
}
