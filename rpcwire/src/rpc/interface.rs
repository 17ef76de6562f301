//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Remote interface identity and type-erased interface objects.
//!
//! A remote interface is a trait annotated with
//! [`#[rpcwire::interface]`](crate::interface). The macro implements
//! [`RemoteInterface`] for the trait object type `dyn Trait`, which gives the
//! runtime three things without reflection:
//!
//! - the interface name and method table,
//! - a stub constructor that forwards every call to an [`Invoker`],
//! - a dispatcher that routes an [`Invocation`] into a service object.
//!
//! [`InterfaceType`] erases the trait so endpoints, protocols and the proxy
//! factory can handle any interface uniformly. [`InterfaceObject`] erases an
//! `Arc<dyn Trait>` in the same way.

use crate::rpc::{Invocation, Invoker, RpcError};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Static description of one interface method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Method name
    pub name: &'static str,
    /// Parameter type tokens, in declaration order
    pub parameter_types: &'static [&'static str],
    /// Return type token
    pub return_type: &'static str,
}

impl MethodDescriptor {
    /// Returns `true` if the descriptor accepts the given parameter types.
    pub fn accepts(&self, parameter_types: &[String]) -> bool {
        self.parameter_types.len() == parameter_types.len()
            && self
                .parameter_types
                .iter()
                .zip(parameter_types)
                .all(|(expected, given)| *expected == given)
    }
}

/// Implemented for `dyn Trait` of every remote interface.
///
/// Normally generated by [`#[rpcwire::interface]`](crate::interface); a manual
/// implementation is possible for interfaces that cannot use the macro.
pub trait RemoteInterface: Send + Sync + 'static {
    /// Textual interface identity.
    const NAME: &'static str;

    /// Returns the method table.
    fn methods() -> &'static [MethodDescriptor];

    /// Creates a client stub forwarding every call to `invoker`.
    fn stub(invoker: Arc<dyn Invoker>) -> Arc<Self>;

    /// Routes `invocation` into `service`.
    fn dispatch(service: Arc<Self>, invocation: Invocation) -> BoxFuture<'static, Result<Value, RpcError>>;
}

/// A copyable, type-erased interface token.
#[derive(Clone, Copy)]
pub struct InterfaceType {
    name: &'static str,
    type_id: TypeId,
    methods: fn() -> &'static [MethodDescriptor],
    make_stub: fn(Arc<dyn Invoker>) -> InterfaceObject,
    dispatch: fn(&InterfaceObject, Invocation) -> BoxFuture<'static, Result<Value, RpcError>>,
}

impl InterfaceType {
    /// Returns the token for `I`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rpcwire::rpc::InterfaceType;
    ///
    /// #[rpcwire::interface(name = "com.acme.Greeter")]
    /// pub trait Greeter {
    ///     async fn greet(&self, name: String) -> Result<String, rpcwire::RpcError>;
    /// }
    ///
    /// let ty = InterfaceType::of::<dyn Greeter>();
    /// assert_eq!(ty.name(), "com.acme.Greeter");
    /// assert_eq!(ty.method_names(), vec!["greet"]);
    /// ```
    pub fn of<I: ?Sized + RemoteInterface>() -> Self {
        Self {
            name: I::NAME,
            type_id: TypeId::of::<I>(),
            methods: I::methods,
            make_stub: erased_stub::<I>,
            dispatch: erased_dispatch::<I>,
        }
    }

    /// Finds a remote interface declared anywhere in the program by name.
    ///
    /// Every trait annotated with [`#[rpcwire::interface]`](crate::interface)
    /// registers itself at link time.
    pub fn by_name(name: &str) -> Option<Self> {
        inventory::iter::<InterfaceRegistration>
            .into_iter()
            .map(|registration| (registration.interface)())
            .find(|interface| interface.name() == name)
    }

    /// Returns the interface name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the method table.
    pub fn methods(&self) -> &'static [MethodDescriptor] {
        (self.methods)()
    }

    /// Returns the method names in declaration order.
    pub fn method_names(&self) -> Vec<&'static str> {
        self.methods().iter().map(|method| method.name).collect()
    }

    /// Looks up a method by name.
    pub fn method(&self, name: &str) -> Option<&'static MethodDescriptor> {
        self.methods().iter().find(|method| method.name == name)
    }

    /// Returns `true` if this token denotes `I`.
    pub fn is<I: ?Sized + RemoteInterface>(&self) -> bool {
        self.type_id == TypeId::of::<I>()
    }

    /// Creates a stub for this interface.
    pub fn stub(&self, invoker: Arc<dyn Invoker>) -> InterfaceObject {
        (self.make_stub)(invoker)
    }

    /// Routes `invocation` into `target`.
    ///
    /// `target` must hold this interface; a mismatch is reported as
    /// [`RpcError::MethodNotFound`].
    pub fn dispatch(
        &self,
        target: &InterfaceObject,
        invocation: Invocation,
    ) -> BoxFuture<'static, Result<Value, RpcError>> {
        (self.dispatch)(target, invocation)
    }
}

impl PartialEq for InterfaceType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for InterfaceType {}

impl std::hash::Hash for InterfaceType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterfaceType").field(&self.name).finish()
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Link-time record of a remote interface, submitted by the interface macro.
#[derive(Debug)]
pub struct InterfaceRegistration {
    /// Returns the interface token
    pub interface: fn() -> InterfaceType,
}

inventory::collect!(InterfaceRegistration);

fn erased_stub<I: ?Sized + RemoteInterface>(invoker: Arc<dyn Invoker>) -> InterfaceObject {
    InterfaceObject::new::<I>(I::stub(invoker))
}

fn erased_dispatch<I: ?Sized + RemoteInterface>(
    target: &InterfaceObject,
    invocation: Invocation,
) -> BoxFuture<'static, Result<Value, RpcError>> {
    match target.downcast::<I>() {
        Some(service) => I::dispatch(service, invocation),
        None => {
            let error = RpcError::MethodNotFound {
                interface: target.interface().name().to_string(),
                method: invocation.method_name().to_string(),
            };
            Box::pin(async move { Err(error) })
        }
    }
}

/// A type-erased `Arc<dyn Trait>` for some remote interface.
///
/// Cloning shares the underlying object; two clones downcast to pointer-equal
/// `Arc`s, and [`InterfaceObject::same_object`] compares object identity.
#[derive(Clone)]
pub struct InterfaceObject {
    interface: InterfaceType,
    address: usize,
    target: Arc<dyn Any + Send + Sync>,
}

impl InterfaceObject {
    /// Erases `object`.
    pub fn new<I: ?Sized + RemoteInterface>(object: Arc<I>) -> Self {
        Self {
            interface: InterfaceType::of::<I>(),
            address: Arc::as_ptr(&object) as *const () as usize,
            target: Arc::new(object),
        }
    }

    /// Returns the interface this object implements.
    pub fn interface(&self) -> InterfaceType {
        self.interface
    }

    /// Recovers the typed object.
    pub fn downcast<I: ?Sized + RemoteInterface>(&self) -> Option<Arc<I>> {
        self.target.downcast_ref::<Arc<I>>().cloned()
    }

    /// Returns `true` if both handles refer to the same object.
    pub fn same_object(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl fmt::Debug for InterfaceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceObject")
            .field("interface", &self.interface)
            .finish_non_exhaustive()
    }
}
