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

//! Client stubs and server-side dispatch.
//!
//! A [`ProxyFactory`] converts in both directions between invokers and
//! interface objects:
//!
//! - [`ProxyFactory::get_proxy`] turns an [`Invoker`] into a [`Proxy`]: one
//!   client stub per requested interface, each forwarding its calls to the
//!   invoker.
//! - [`ProxyFactory::get_invoker`] turns a service object into an [`Invoker`]
//!   whose calls are routed into the object by a per-class [`Dispatcher`].
//!
//! Stubs and per-interface dispatch are generated at compile time by
//! [`#[rpcwire::interface]`](crate::interface); the factory only selects and
//! caches them.

mod dispatch;

pub use dispatch::{DispatchProxyFactory, Dispatcher};

use crate::rpc::{InterfaceObject, InterfaceType, Invoker, RemoteInterface, RpcError};
use crate::url::{Url, keys};
use std::sync::Arc;

/// A service object as seen by the dispatcher: the runtime class name and the
/// object viewed through each of its remote interfaces.
#[derive(Debug, Clone)]
pub struct ServiceRef {
    class_name: String,
    objects: Vec<InterfaceObject>,
}

impl ServiceRef {
    /// Creates a reference from the views of one object.
    pub fn new(class_name: impl Into<String>, objects: Vec<InterfaceObject>) -> Self {
        Self {
            class_name: class_name.into(),
            objects,
        }
    }

    /// Creates a reference for an object known through one interface.
    pub fn of<I: ?Sized + RemoteInterface>(class_name: impl Into<String>, object: Arc<I>) -> Self {
        Self::new(class_name, vec![InterfaceObject::new(object)])
    }

    /// Returns the runtime class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the interfaces the object is known through, in declaration
    /// order.
    pub fn interfaces(&self) -> Vec<InterfaceType> {
        self.objects.iter().map(InterfaceObject::interface).collect()
    }

    /// Returns the object viewed through `interface`.
    pub fn object(&self, interface: InterfaceType) -> Option<&InterfaceObject> {
        self.objects
            .iter()
            .find(|object| object.interface() == interface)
    }
}

/// A client stub implementing one or more interfaces.
///
/// Every interface view forwards to the same invoker. Clones share the views,
/// so `get` on two clones returns pointer-equal `Arc`s.
#[derive(Debug, Clone)]
pub struct Proxy {
    invoker: Arc<dyn Invoker>,
    stubs: Arc<[InterfaceObject]>,
}

impl Proxy {
    /// Returns the invoker every view forwards to.
    pub fn invoker(&self) -> &Arc<dyn Invoker> {
        &self.invoker
    }

    /// Returns the implemented interfaces, primary first.
    pub fn interfaces(&self) -> Vec<InterfaceType> {
        self.stubs.iter().map(InterfaceObject::interface).collect()
    }

    /// Returns the view for the primary interface.
    pub fn primary(&self) -> &InterfaceObject {
        // get_proxy never builds an empty proxy
        &self.stubs[0]
    }

    /// Returns the view for `interface`.
    pub fn object(&self, interface: InterfaceType) -> Option<&InterfaceObject> {
        self.stubs.iter().find(|stub| stub.interface() == interface)
    }

    /// Returns the typed view for `I`.
    pub fn get<I: ?Sized + RemoteInterface>(&self) -> Option<Arc<I>> {
        self.object(InterfaceType::of::<I>())
            .and_then(InterfaceObject::downcast::<I>)
    }
}

/// Converts between invokers and interface objects.
pub trait ProxyFactory: Send + Sync + 'static {
    /// Creates a stub implementing every interface in `interfaces`.
    ///
    /// An empty list means the invoker's own interface. Duplicates are
    /// ignored; the first interface is the primary one.
    ///
    /// # Errors
    ///
    /// Returns an error if a stub cannot be built.
    fn get_proxy(
        &self,
        invoker: Arc<dyn Invoker>,
        interfaces: &[InterfaceType],
    ) -> Result<Proxy, RpcError>;

    /// Creates an invoker routing calls of `interface` at `url` into `service`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::MethodNotFound`] if `service` is not known through
    /// `interface`.
    fn get_invoker(
        &self,
        service: ServiceRef,
        interface: InterfaceType,
        url: Url,
    ) -> Result<Arc<dyn Invoker>, RpcError>;

    /// Creates a stub for the invoker's interface plus those named in the
    /// comma-separated `interfaces` URL parameter.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::ExtensionNotFound`] if a named interface is not
    /// declared in the program.
    fn proxy_for(&self, invoker: Arc<dyn Invoker>) -> Result<Proxy, RpcError> {
        let mut interfaces = vec![invoker.interface()];
        if let Some(names) = invoker.url().parameter(keys::INTERFACES) {
            for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                let interface =
                    InterfaceType::by_name(name).ok_or_else(|| RpcError::ExtensionNotFound {
                        kind: "interface".to_string(),
                        name: name.to_string(),
                    })?;
                interfaces.push(interface);
            }
        }
        self.get_proxy(invoker, &interfaces)
    }
}

pub(crate) fn build_proxy(invoker: Arc<dyn Invoker>, interfaces: &[InterfaceType]) -> Proxy {
    let mut selected: Vec<InterfaceType> = Vec::with_capacity(interfaces.len().max(1));
    for interface in interfaces {
        if !selected.contains(interface) {
            selected.push(*interface);
        }
    }
    if selected.is_empty() {
        selected.push(invoker.interface());
    }
    let stubs: Vec<InterfaceObject> = selected
        .iter()
        .map(|interface| interface.stub(Arc::clone(&invoker)))
        .collect();
    Proxy {
        invoker,
        stubs: stubs.into(),
    }
}
