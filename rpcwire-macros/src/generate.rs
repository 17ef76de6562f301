//! Code generation for the rpcwire macros.
//!
//! For an interface trait this module generates:
//! - The trait itself, made object safe with `async_trait`
//! - A client stub forwarding every method to an `Invoker`
//! - The `RemoteInterface` implementation for `dyn Trait`
//! - A link-time `InterfaceRegistration`
//!
//! For a component struct it generates the `Component` implementation and a
//! link-time `ClassRegistration`.

use crate::parse::{
    AnnotationDef, ComponentDef, FieldKind, FieldShape, InterfaceDef, MethodDef, field_shape,
    type_token,
};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Lit, Visibility};

/// Generate the trait with `Send + Sync` supertraits and `async_trait`.
pub fn generate_trait(interface: &InterfaceDef) -> TokenStream {
    let mut trait_def = interface.trait_def.clone();
    trait_def.supertraits.push(syn::parse_quote!(::core::marker::Send));
    trait_def.supertraits.push(syn::parse_quote!(::core::marker::Sync));
    quote! {
        #[::rpcwire::__private::async_trait::async_trait]
        #trait_def
    }
}

/// Generate the client stub for an interface.
pub fn generate_stub(interface: &InterfaceDef) -> TokenStream {
    let trait_name = &interface.ident;
    let stub_name = format_ident!("{}Stub", interface.ident);
    let vis = &interface.trait_def.vis;
    let methods = interface.methods.iter().map(generate_stub_method);

    quote! {
        #[doc = concat!("Client stub for the `", stringify!(#trait_name), "` interface.")]
        #[doc = ""]
        #[doc = "Every call is encoded into an invocation and handed to the invoker."]
        #vis struct #stub_name {
            invoker: ::std::sync::Arc<dyn ::rpcwire::rpc::Invoker>,
        }

        #[allow(dead_code)]
        impl #stub_name {
            /// Creates a stub forwarding to `invoker`.
            #vis fn new(invoker: ::std::sync::Arc<dyn ::rpcwire::rpc::Invoker>) -> Self {
                Self { invoker }
            }

            /// Returns the invoker this stub forwards to.
            #vis fn invoker(&self) -> &::std::sync::Arc<dyn ::rpcwire::rpc::Invoker> {
                &self.invoker
            }
        }

        impl ::core::fmt::Debug for #stub_name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(stringify!(#stub_name))
                    .field("invoker", &self.invoker)
                    .finish()
            }
        }

        #[::rpcwire::__private::async_trait::async_trait]
        impl #trait_name for #stub_name {
            #(#methods)*
        }
    }
}

fn generate_stub_method(method: &MethodDef) -> TokenStream {
    let name = &method.name;
    let method_name = name.to_string();
    let return_type = &method.return_type;
    let params = method.params.iter().map(|param| {
        let name = &param.name;
        let ty = &param.ty;
        quote! { #name: #ty }
    });
    let type_tokens = method.params.iter().map(|param| param.type_token());
    let arguments = method.params.iter().map(|param| {
        let name = &param.name;
        quote! { ::rpcwire::rpc::encode_value(&#name)? }
    });

    quote! {
        async fn #name(&self, #(#params),*) -> #return_type {
            let invocation = ::rpcwire::rpc::Invocation::new(
                #method_name,
                &[#(#type_tokens),*],
                vec![#(#arguments),*],
            );
            let value = self.invoker.invoke(invocation).await?;
            ::rpcwire::rpc::decode_result(value).map_err(::core::convert::From::from)
        }
    }
}

/// Generate the `RemoteInterface` implementation and its registration.
pub fn generate_remote_interface(interface: &InterfaceDef) -> TokenStream {
    let trait_name = &interface.ident;
    let stub_name = format_ident!("{}Stub", interface.ident);
    let name = &interface.name;
    let register = format_ident!("__rpcwire_interface_{}", interface.ident);

    let descriptors = interface.methods.iter().map(|method| {
        let method_name = method.name.to_string();
        let type_tokens = method.params.iter().map(|param| param.type_token());
        let return_type = type_token(&method.return_type);
        quote! {
            ::rpcwire::rpc::MethodDescriptor {
                name: #method_name,
                parameter_types: &[#(#type_tokens),*],
                return_type: #return_type,
            }
        }
    });

    let arms = interface.methods.iter().map(|method| {
        let method_ident = &method.name;
        let method_name = method.name.to_string();
        let bindings: Vec<_> = method.params.iter().map(|param| &param.name).collect();
        let decodes = method.params.iter().enumerate().map(|(index, param)| {
            let binding = &param.name;
            let ty = &param.ty;
            quote! {
                let #binding: #ty = ::rpcwire::rpc::decode_argument(
                    arguments.next(),
                    #method_name,
                    #index,
                )?;
            }
        });
        quote! {
            #method_name => {
                #(#decodes)*
                let result = service
                    .#method_ident(#(#bindings),*)
                    .await
                    .map_err(::core::convert::Into::<::rpcwire::RpcError>::into)?;
                ::rpcwire::rpc::encode_value(&result)
            }
        }
    });

    quote! {
        impl ::rpcwire::rpc::RemoteInterface for dyn #trait_name {
            const NAME: &'static str = #name;

            fn methods() -> &'static [::rpcwire::rpc::MethodDescriptor] {
                const METHODS: &[::rpcwire::rpc::MethodDescriptor] = &[#(#descriptors),*];
                METHODS
            }

            fn stub(
                invoker: ::std::sync::Arc<dyn ::rpcwire::rpc::Invoker>,
            ) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(#stub_name::new(invoker))
            }

            #[allow(unused_mut, unused_variables)]
            fn dispatch(
                service: ::std::sync::Arc<Self>,
                invocation: ::rpcwire::rpc::Invocation,
            ) -> ::rpcwire::__private::futures_util::future::BoxFuture<
                'static,
                ::core::result::Result<::rpcwire::__private::serde_json::Value, ::rpcwire::RpcError>,
            > {
                ::std::boxed::Box::pin(async move {
                    let (method, arguments) = invocation.into_parts();
                    let mut arguments = arguments.into_iter();
                    let reply: ::core::result::Result<
                        ::rpcwire::__private::serde_json::Value,
                        ::rpcwire::RpcError,
                    > = match method.as_str() {
                        #(#arms)*
                        _ => ::core::result::Result::Err(::rpcwire::RpcError::MethodNotFound {
                            interface: #name.to_string(),
                            method: method.clone(),
                        }),
                    };
                    reply
                })
            }
        }

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #register() -> ::rpcwire::rpc::InterfaceType {
            ::rpcwire::rpc::InterfaceType::of::<dyn #trait_name>()
        }

        ::rpcwire::__private::inventory::submit! {
            ::rpcwire::rpc::InterfaceRegistration { interface: #register }
        }
    }
}

/// Generate the `Component` implementation and its registration.
pub fn generate_component(component: &ComponentDef) -> TokenStream {
    let ident = &component.ident;
    let class_name = &component.class_name;

    let implements = component.implements.iter().map(|path| {
        quote! {
            .implements::<dyn #path>(|object: ::std::sync::Arc<Self>| -> ::std::sync::Arc<dyn #path> {
                object
            })
        }
    });

    let service = component.service.as_ref().map(|annotation| {
        let value = generate_annotation(quote!(::rpcwire::component::ServiceAnnotation), annotation);
        quote! { .service(#value) }
    });

    let fields = component.fields.iter().map(|field| {
        let name = &field.name;
        let name_str = name.to_string();
        let visibility = generate_visibility(&field.vis);
        let annotation = generate_annotation(
            quote!(::rpcwire::component::ReferenceAnnotation),
            &field.reference,
        );
        match field_shape(&field.ty) {
            FieldShape::Interface(site) => quote! {
                .reference_field::<#site>(#name_str, #visibility, #annotation, |target| &mut target.#name)
            },
            FieldShape::Erased => {
                let site = type_token(&field.ty);
                quote! {
                    .member(
                        ::rpcwire::component::Member::field(
                            #name_str,
                            ::rpcwire::component::SiteType::Concrete(#site.to_string()),
                        )
                        .with_visibility(#visibility)
                        .with_reference(#annotation)
                        .with_injector(::std::sync::Arc::new(
                            |target: &mut dyn ::std::any::Any,
                             stub: &::rpcwire::rpc::InterfaceObject|
                             -> ::core::result::Result<(), ::std::string::String> {
                                let target = ::rpcwire::component::downcast_target::<Self>(target)?;
                                target.#name = ::core::convert::From::from(stub.clone());
                                ::core::result::Result::Ok(())
                            },
                        )),
                    )
                }
            }
            FieldShape::Concrete => {
                let site = type_token(&field.ty);
                quote! {
                    .member(
                        ::rpcwire::component::Member::field(
                            #name_str,
                            ::rpcwire::component::SiteType::Concrete(#site.to_string()),
                        )
                        .with_visibility(#visibility)
                        .with_reference(#annotation),
                    )
                }
            }
        }
    });

    let setters = component.setters.iter().map(|setter| {
        let name = &setter.name;
        let name_str = name.to_string();
        let site = &setter.site;
        let annotation = generate_annotation(
            quote!(::rpcwire::component::ReferenceAnnotation),
            &setter.reference,
        );
        quote! {
            .reference_setter::<dyn #site>(
                #name_str,
                #annotation,
                |target, stub| target.#name(stub),
            )
        }
    });

    quote! {
        impl ::rpcwire::component::Component for #ident {
            fn descriptor() -> &'static ::rpcwire::component::ClassDescriptor
            where
                Self: Sized,
            {
                static DESCRIPTOR: ::std::sync::OnceLock<::rpcwire::component::ClassDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    ::rpcwire::component::ClassDescriptor::builder::<Self>(#class_name)
                        #(#implements)*
                        #service
                        #(#fields)*
                        #(#setters)*
                        .build()
                })
            }

            fn class(&self) -> &'static ::rpcwire::component::ClassDescriptor {
                <Self as ::rpcwire::component::Component>::descriptor()
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn into_any(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::std::any::Any + ::core::marker::Send + ::core::marker::Sync> {
                self
            }
        }

        ::rpcwire::__private::inventory::submit! {
            ::rpcwire::component::ClassRegistration {
                class: <#ident as ::rpcwire::component::Component>::descriptor,
            }
        }
    }
}

fn generate_visibility(vis: &Visibility) -> TokenStream {
    match vis {
        Visibility::Public(_) => quote!(::rpcwire::component::Visibility::Public),
        Visibility::Restricted(_) => quote!(::rpcwire::component::Visibility::Restricted),
        Visibility::Inherited => quote!(::rpcwire::component::Visibility::Private),
    }
}

/// Generate an annotation literal, leaving unset attributes at their default.
fn generate_annotation(ty: TokenStream, annotation: &AnnotationDef) -> TokenStream {
    let interface = annotation.interface.as_ref().map(|path| {
        quote! {
            interface_class: ::core::option::Option::Some(
                ::rpcwire::rpc::InterfaceType::of::<dyn #path>(),
            ),
        }
    });
    let values = annotation.values.iter().map(|value| {
        let field = &value.field;
        let lit = &value.value;
        let expr = match (value.kind, lit) {
            (FieldKind::Text, _) => quote! { ::std::string::String::from(#lit) },
            (FieldKind::OptionalText, _) => {
                quote! { ::core::option::Option::Some(::std::string::String::from(#lit)) }
            }
            (FieldKind::List, Lit::Str(list)) => {
                let items = split_list(&list.value());
                quote! { vec![#(::std::string::String::from(#items)),*] }
            }
            (FieldKind::Flag | FieldKind::Number, _) | (FieldKind::List, _) => {
                quote! { ::core::option::Option::Some(#lit) }
            }
        };
        quote! { #field: #expr, }
    });
    quote! {
        #ty {
            #interface
            #(#values)*
            ..::core::default::Default::default()
        }
    }
}

/// Splits a comma-separated attribute list, dropping blank entries.
fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_component, parse_interface};
    use syn::{DeriveInput, ItemTrait, parse_quote};

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("east, west"), ["east", "west"]);
        assert_eq!(split_list(" a ,, b ,"), ["a", "b"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_stub_encodes_type_tokens() {
        let item: ItemTrait = parse_quote! {
            trait Calculator {
                async fn add(&self, a: i32, b: Vec<i32>) -> Result<i32, RpcError>;
            }
        };
        let def = parse_interface(&item, &[]).unwrap();
        let tokens = generate_stub(&def).to_string();
        assert!(tokens.contains("CalculatorStub"));
        assert!(tokens.contains("\"i32\""));
        assert!(tokens.contains("\"Vec<i32>\""));
    }

    #[test]
    fn test_remote_interface_registers() {
        let item: ItemTrait = parse_quote! {
            trait Clock {
                async fn now(&self) -> Result<u64, RpcError>;
            }
        };
        let def = parse_interface(&item, &[]).unwrap();
        let tokens = generate_remote_interface(&def).to_string();
        assert!(tokens.contains("__rpcwire_interface_Clock"));
        assert!(tokens.contains("InterfaceRegistration"));
    }

    #[test]
    fn test_list_attribute_expands_to_vec() {
        let input: DeriveInput = parse_quote! {
            #[service(registry = "east, west")]
            struct Svc;
        };
        let def = parse_component(&input).unwrap();
        let tokens = generate_component(&def).to_string();
        assert!(tokens.contains("registries"));
        assert!(tokens.contains("\"east\""));
        assert!(tokens.contains("\"west\""));
    }
}
