//! Procedural macros for the rpcwire framework.
//!
//! This crate provides two macros, re-exported from `rpcwire`:
//!
//! - `#[rpcwire::interface]` turns a trait into a remote interface with a
//!   client stub, a dispatcher and a link-time registration.
//! - `#[derive(rpcwire::Component)]` describes a struct to the wiring
//!   processor: its class name, the interfaces it implements, its service
//!   annotation and its reference injection sites.
//!
//! # Example
//!
//! ```ignore
//! use rpcwire::{Component, RpcError};
//! use std::sync::Arc;
//!
//! #[rpcwire::interface(name = "com.acme.Calculator")]
//! pub trait Calculator {
//!     async fn add(&self, a: i32, b: i32) -> Result<i32, RpcError>;
//! }
//!
//! #[derive(Component, Default)]
//! #[component(class = "com.acme.Desk")]
//! struct Desk {
//!     #[reference(version = "1")]
//!     calculator: Option<Arc<dyn Calculator>>,
//! }
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, ItemTrait, Meta, Token, parse_macro_input, punctuated::Punctuated};

mod generate;
mod parse;

/// Declares a remote interface.
///
/// # Attributes
///
/// - `name`: The textual interface identity. Defaults to the trait name.
///
/// # Method Signatures
///
/// Every method must be `async`, take `&self` and return `Result<T, E>`
/// where arguments and `T` are serde types and `E` converts from and into
/// `RpcError`:
///
/// ```ignore
/// async fn method(&self, arg: String) -> Result<i32, RpcError>;
/// ```
///
/// # Generated Items
///
/// - The trait, with `Send + Sync` supertraits and `async_trait` applied
/// - `{Trait}Stub`, implementing the trait by forwarding to an `Invoker`
/// - `impl RemoteInterface for dyn Trait`
/// - An `InterfaceRegistration`, so `InterfaceType::by_name` can find it
#[proc_macro_attribute]
pub fn interface(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args = parse_macro_input!(attr with Punctuated::<Meta, Token![,]>::parse_terminated);
    let trait_def = parse_macro_input!(item as ItemTrait);

    let attr_args: Vec<Meta> = attr_args.into_iter().collect();
    let interface = match parse::parse_interface(&trait_def, &attr_args) {
        Ok(def) => def,
        Err(e) => return e.to_compile_error().into(),
    };

    let trait_tokens = generate::generate_trait(&interface);
    let stub = generate::generate_stub(&interface);
    let remote = generate::generate_remote_interface(&interface);

    let expanded = quote! {
        #trait_tokens
        #stub
        #remote
    };

    TokenStream::from(expanded)
}

/// Derives `rpcwire::component::Component`.
///
/// # Struct Attributes
///
/// - `#[component(class = "...", implements(Trait, ...))]`: The class name
///   (defaults to the struct name) and the remote interfaces the struct
///   implements, in declaration order.
/// - `#[service(...)]`: Marks the struct as a service. Accepts `interface`
///   (a trait path), `interface_name`, `version`, `group`, `registry`,
///   `protocol` (comma-separated lists), `application`, `module`, `provider`,
///   `monitor`, `scope` and `listener`.
/// - `#[reference_setter(name = "set_x", site = Trait, ...)]`: Declares a
///   public setter `fn set_x(&mut self, Arc<dyn Trait>)` as an injection site.
///
/// # Field Attributes
///
/// - `#[reference(...)]`: Declares the field an injection site. Accepts
///   `interface`, `interface_name`, `version`, `group`, `registry`,
///   `consumer`, `application`, `module`, `monitor`, `url`, `check`,
///   `timeout`, `scope`, `injvm` and `listener`.
///
/// Fields of type `Option<Arc<dyn Trait>>` receive a typed stub. Fields of
/// type `InterfaceObject` or `Option<InterfaceObject>` receive the erased
/// stub. Any other field type is recorded as a concrete site and cannot be
/// assigned.
#[proc_macro_derive(Component, attributes(component, service, reference, reference_setter))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match parse::parse_component(&input) {
        Ok(component) => generate::generate_component(&component).into(),
        Err(e) => e.to_compile_error().into(),
    }
}
