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

use crate::proxy::{Proxy, ProxyFactory, ServiceRef, build_proxy};
use crate::rpc::{InterfaceType, Invocation, Invoker, MethodDescriptor, RpcError};
use crate::url::Url;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Routes invocations into the objects of one class.
///
/// A dispatcher merges the method tables of every interface of the class.
/// Methods are matched by name and, when the invocation carries them, by
/// parameter types.
#[derive(Debug)]
pub struct Dispatcher {
    class_name: String,
    methods: HashMap<&'static str, Vec<(InterfaceType, &'static MethodDescriptor)>>,
}

impl Dispatcher {
    /// Builds the dispatcher for a class known through `interfaces`.
    pub fn new(class_name: impl Into<String>, interfaces: &[InterfaceType]) -> Self {
        let mut methods: HashMap<&'static str, Vec<(InterfaceType, &'static MethodDescriptor)>> =
            HashMap::new();
        for interface in interfaces {
            for method in interface.methods() {
                methods
                    .entry(method.name)
                    .or_default()
                    .push((*interface, method));
            }
        }
        Self {
            class_name: class_name.into(),
            methods,
        }
    }

    /// Returns the class this dispatcher was built for.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the dispatchable method names, sorted.
    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn resolve(&self, invocation: &Invocation) -> Option<InterfaceType> {
        let candidates = self.methods.get(invocation.method_name())?;
        let parameter_types = invocation.parameter_types();
        candidates
            .iter()
            .find(|(_, method)| method.accepts(parameter_types))
            .or_else(|| {
                if parameter_types.is_empty() && candidates.len() == 1 {
                    candidates.first()
                } else {
                    None
                }
            })
            .map(|(interface, _)| *interface)
    }

    /// Calls the method named by `invocation` on `service`.
    pub fn dispatch(
        &self,
        service: &ServiceRef,
        invocation: Invocation,
    ) -> BoxFuture<'static, Result<Value, RpcError>> {
        let target = self
            .resolve(&invocation)
            .and_then(|interface| service.object(interface).map(|object| (interface, object)));
        match target {
            Some((interface, object)) => interface.dispatch(object, invocation),
            None => {
                let error = RpcError::MethodNotFound {
                    interface: self.class_name.clone(),
                    method: invocation.method_name().to_string(),
                };
                Box::pin(async move { Err(error) })
            }
        }
    }
}

/// The standard [`ProxyFactory`].
///
/// Dispatchers are built once per class and cached in the factory. Classes
/// whose name contains `$` are generated or proxied types; their dispatcher is
/// built from the declared interface instead and cached under its name.
///
/// # Examples
///
/// ```rust
/// use rpcwire::proxy::{DispatchProxyFactory, ProxyFactory, ServiceRef};
/// use rpcwire::rpc::InterfaceType;
/// use rpcwire::url::Url;
/// use rpcwire::RpcError;
/// use std::sync::Arc;
///
/// #[rpcwire::interface(name = "com.acme.Greeter")]
/// pub trait Greeter {
///     async fn greet(&self, name: String) -> Result<String, RpcError>;
/// }
///
/// struct English;
///
/// #[rpcwire::async_trait]
/// impl Greeter for English {
///     async fn greet(&self, name: String) -> Result<String, RpcError> {
///         Ok(format!("Hello, {name}"))
///     }
/// }
///
/// # tokio_test();
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn tokio_test() {
/// let factory = DispatchProxyFactory::new();
/// let interface = InterfaceType::of::<dyn Greeter>();
/// let service = ServiceRef::of::<dyn Greeter>("com.acme.English", Arc::new(English));
/// let url = Url::new("injvm", "127.0.0.1", 0, "com.acme.Greeter");
///
/// let invoker = factory.get_invoker(service, interface, url).unwrap();
/// let proxy = factory.get_proxy(invoker, &[interface]).unwrap();
/// let greeter = proxy.get::<dyn Greeter>().unwrap();
/// assert_eq!(greeter.greet("Ada".to_string()).await.unwrap(), "Hello, Ada");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DispatchProxyFactory {
    dispatchers: RwLock<HashMap<DispatcherKey, Arc<Dispatcher>>>,
}

/// Cache key; class names and interface names never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DispatcherKey {
    Class(String),
    Interface(String),
}

impl DispatcherKey {
    fn name(&self) -> &str {
        match self {
            DispatcherKey::Class(name) | DispatcherKey::Interface(name) => name,
        }
    }
}

impl DispatchProxyFactory {
    /// Creates a factory with an empty dispatcher cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached dispatcher for `service`, building it on first use.
    pub fn dispatcher(&self, service: &ServiceRef, interface: InterfaceType) -> Arc<Dispatcher> {
        let (key, interfaces) = if service.class_name().contains('$') {
            (DispatcherKey::Interface(interface.name().to_string()), vec![interface])
        } else {
            (DispatcherKey::Class(service.class_name().to_string()), service.interfaces())
        };
        if let Some(dispatcher) = self.dispatchers.read().get(&key) {
            return Arc::clone(dispatcher);
        }
        let mut dispatchers = self.dispatchers.write();
        let dispatcher = dispatchers.entry(key).or_insert_with_key(|key| {
            debug!(class = %key.name(), "building dispatcher");
            Arc::new(Dispatcher::new(key.name(), &interfaces))
        });
        Arc::clone(dispatcher)
    }

    /// Returns the number of cached dispatchers.
    pub fn cached_dispatchers(&self) -> usize {
        self.dispatchers.read().len()
    }
}

impl ProxyFactory for DispatchProxyFactory {
    fn get_proxy(
        &self,
        invoker: Arc<dyn Invoker>,
        interfaces: &[InterfaceType],
    ) -> Result<Proxy, RpcError> {
        Ok(build_proxy(invoker, interfaces))
    }

    fn get_invoker(
        &self,
        service: ServiceRef,
        interface: InterfaceType,
        url: Url,
    ) -> Result<Arc<dyn Invoker>, RpcError> {
        if service.object(interface).is_none() {
            return Err(RpcError::MethodNotFound {
                interface: interface.name().to_string(),
                method: "*".to_string(),
            });
        }
        let dispatcher = self.dispatcher(&service, interface);
        Ok(Arc::new(DispatchInvoker {
            interface,
            url,
            service,
            dispatcher,
        }))
    }
}

/// Provider-side invoker calling into a local service object.
struct DispatchInvoker {
    interface: InterfaceType,
    url: Url,
    service: ServiceRef,
    dispatcher: Arc<Dispatcher>,
}

#[async_trait::async_trait]
impl Invoker for DispatchInvoker {
    fn interface(&self) -> InterfaceType {
        self.interface
    }

    fn url(&self) -> &Url {
        &self.url
    }

    async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError> {
        self.dispatcher.dispatch(&self.service, invocation).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::InterfaceObject;
    use serde_json::json;

    #[crate::interface(name = "test.Calculator")]
    trait Calculator {
        async fn add(&self, a: i32, b: i32) -> Result<i32, RpcError>;
    }

    #[crate::interface(name = "test.Labelled")]
    trait Labelled {
        async fn label(&self) -> Result<String, RpcError>;
    }

    struct Device;

    #[async_trait::async_trait]
    impl Calculator for Device {
        async fn add(&self, a: i32, b: i32) -> Result<i32, RpcError> {
            Ok(a + b)
        }
    }

    #[async_trait::async_trait]
    impl Labelled for Device {
        async fn label(&self) -> Result<String, RpcError> {
            Ok("device".to_string())
        }
    }

    fn device(class_name: &str) -> ServiceRef {
        let device = Arc::new(Device);
        ServiceRef::new(
            class_name,
            vec![
                InterfaceObject::new::<dyn Calculator>(device.clone()),
                InterfaceObject::new::<dyn Labelled>(device),
            ],
        )
    }

    fn url() -> Url {
        Url::new("injvm", "127.0.0.1", 0, "test.Calculator")
    }

    #[tokio::test]
    async fn test_dispatch_across_interfaces() {
        let factory = DispatchProxyFactory::new();
        let invoker = factory
            .get_invoker(device("app.Device"), InterfaceType::of::<dyn Calculator>(), url())
            .unwrap();

        let sum = invoker
            .invoke(Invocation::new("add", &["i32", "i32"], vec![json!(2), json!(3)]))
            .await
            .unwrap();
        assert_eq!(sum, json!(5));

        let label = invoker
            .invoke(Invocation::new("label", &[], vec![]))
            .await
            .unwrap();
        assert_eq!(label, json!("device"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let factory = DispatchProxyFactory::new();
        let invoker = factory
            .get_invoker(device("app.Device"), InterfaceType::of::<dyn Calculator>(), url())
            .unwrap();
        let error = invoker
            .invoke(Invocation::new("sub", &["i32", "i32"], vec![]))
            .await
            .unwrap_err();
        assert_eq!(
            error,
            RpcError::MethodNotFound {
                interface: "app.Device".to_string(),
                method: "sub".to_string()
            }
        );
    }

    #[test]
    fn test_dispatcher_cached_per_class() {
        let factory = DispatchProxyFactory::new();
        let calculator = InterfaceType::of::<dyn Calculator>();
        let first = factory.dispatcher(&device("app.Device"), calculator);
        let second = factory.dispatcher(&device("app.Device"), calculator);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.method_names(), ["add", "label"]);
        assert_eq!(factory.cached_dispatchers(), 1);
    }

    #[test]
    fn test_synthetic_class_uses_declared_interface() {
        let factory = DispatchProxyFactory::new();
        let calculator = InterfaceType::of::<dyn Calculator>();
        let dispatcher = factory.dispatcher(&device("app.Device$Proxy1"), calculator);
        assert_eq!(dispatcher.class_name(), "test.Calculator");
        assert_eq!(dispatcher.method_names(), ["add"]);

        let other = factory.dispatcher(&device("app.Device$Proxy2"), calculator);
        assert!(Arc::ptr_eq(&dispatcher, &other));
    }

    #[test]
    fn test_class_named_like_interface_keeps_own_dispatcher() {
        let factory = DispatchProxyFactory::new();
        let calculator = InterfaceType::of::<dyn Calculator>();
        let synthetic = factory.dispatcher(&device("app.Device$Proxy1"), calculator);
        let named = factory.dispatcher(&device("test.Calculator"), calculator);

        assert!(!Arc::ptr_eq(&synthetic, &named));
        assert_eq!(synthetic.method_names(), ["add"]);
        assert_eq!(named.method_names(), ["add", "label"]);
        assert_eq!(factory.cached_dispatchers(), 2);
    }

    #[test]
    fn test_get_invoker_requires_interface_view() {
        let factory = DispatchProxyFactory::new();
        let service = ServiceRef::of::<dyn Labelled>("app.Device", Arc::new(Device));
        let error = factory
            .get_invoker(service, InterfaceType::of::<dyn Calculator>(), url())
            .unwrap_err();
        assert!(matches!(error, RpcError::MethodNotFound { .. }));
    }
}
