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

//! In-process protocol.
//!
//! Exported invokers are kept in a table keyed by service key. A referred
//! invoker resolves its provider from that table on every call, so a consumer
//! may be referred before its provider is exported.

use crate::protocol::Protocol;
use crate::rpc::{Exporter, InterfaceType, Invocation, Invoker, RpcError};
use crate::url::Url;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::info;

type ExportTable = RwLock<HashMap<String, Arc<dyn Invoker>>>;

/// The `injvm` protocol.
///
/// # Examples
///
/// ```rust
/// use rpcwire::protocol::{InjvmProtocol, Protocol};
/// use rpcwire::url::Url;
///
/// let protocol = InjvmProtocol::new();
/// let url = Url::new("injvm", "127.0.0.1", 0, "com.acme.Greeter");
/// assert!(!protocol.is_exported(&url));
/// ```
#[derive(Default)]
pub struct InjvmProtocol {
    exported: Arc<ExportTable>,
    referred: Mutex<Vec<Weak<InjvmInvoker>>>,
}

impl InjvmProtocol {
    /// Creates an empty protocol.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a provider for the service key of `url` is exported.
    pub fn is_exported(&self, url: &Url) -> bool {
        self.exported.read().contains_key(&url.service_key())
    }

    /// Returns the number of exported services.
    pub fn exported_count(&self) -> usize {
        self.exported.read().len()
    }
}

impl Protocol for InjvmProtocol {
    fn default_port(&self) -> u16 {
        0
    }

    fn export(&self, invoker: Arc<dyn Invoker>) -> Result<Arc<dyn Exporter>, RpcError> {
        let key = invoker.url().service_key();
        info!(service = %key, "exporting in-process service");
        self.exported
            .write()
            .insert(key.clone(), Arc::clone(&invoker));
        Ok(Arc::new(InjvmExporter {
            key,
            invoker,
            table: Arc::downgrade(&self.exported),
            unexported: AtomicBool::new(false),
        }))
    }

    fn refer(&self, interface: InterfaceType, url: &Url) -> Result<Arc<dyn Invoker>, RpcError> {
        let invoker = Arc::new(InjvmInvoker {
            interface,
            key: url.service_key(),
            url: url.clone(),
            table: Arc::clone(&self.exported),
            destroyed: AtomicBool::new(false),
        });
        let mut referred = self.referred.lock();
        referred.retain(|weak| weak.strong_count() > 0);
        referred.push(Arc::downgrade(&invoker));
        Ok(invoker)
    }

    fn destroy(&self) {
        for invoker in self.referred.lock().drain(..) {
            if let Some(invoker) = invoker.upgrade() {
                invoker.destroy();
            }
        }
        self.exported.write().clear();
    }
}

struct InjvmExporter {
    key: String,
    invoker: Arc<dyn Invoker>,
    table: Weak<ExportTable>,
    unexported: AtomicBool,
}

impl Exporter for InjvmExporter {
    fn invoker(&self) -> Arc<dyn Invoker> {
        Arc::clone(&self.invoker)
    }

    fn unexport(&self) -> Result<(), RpcError> {
        if self.unexported.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(service = %self.key, "unexporting in-process service");
        if let Some(table) = self.table.upgrade() {
            let mut table = table.write();
            // a later export under the same key replaced this one
            if table
                .get(&self.key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.invoker))
            {
                table.remove(&self.key);
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct InjvmInvoker {
    interface: InterfaceType,
    key: String,
    url: Url,
    table: Arc<ExportTable>,
    destroyed: AtomicBool,
}

#[async_trait::async_trait]
impl Invoker for InjvmInvoker {
    fn interface(&self) -> InterfaceType {
        self.interface
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn is_available(&self) -> bool {
        !self.destroyed.load(Ordering::Acquire) && self.table.read().contains_key(&self.key)
    }

    async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(RpcError::Destroyed {
                url: self.url.to_string(),
            });
        }
        let provider = self.table.read().get(&self.key).cloned();
        match provider {
            Some(provider) => provider.invoke(invocation).await,
            None => Err(RpcError::NoProvider {
                service_key: self.key.clone(),
            }),
        }
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::{INJVM_SCHEME, LOCALHOST};
    use serde_json::json;

    #[crate::interface(name = "test.Counter")]
    trait Counter {
        async fn next(&self) -> Result<u64, RpcError>;
    }

    struct Provider {
        url: Url,
        value: u64,
    }

    #[async_trait::async_trait]
    impl Invoker for Provider {
        fn interface(&self) -> InterfaceType {
            InterfaceType::of::<dyn Counter>()
        }

        fn url(&self) -> &Url {
            &self.url
        }

        async fn invoke(&self, _invocation: Invocation) -> Result<Value, RpcError> {
            Ok(json!(self.value))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn url() -> Url {
        Url::new(INJVM_SCHEME, LOCALHOST, 0, "test.Counter").with_parameter("group", "g")
    }

    fn provider(value: u64) -> Arc<dyn Invoker> {
        Arc::new(Provider { url: url(), value })
    }

    #[tokio::test]
    async fn test_refer_before_export() {
        let protocol = InjvmProtocol::new();
        let invoker = protocol
            .refer(InterfaceType::of::<dyn Counter>(), &url())
            .unwrap();
        assert!(!invoker.is_available());

        let error = invoker
            .invoke(Invocation::new("next", &[], vec![]))
            .await
            .unwrap_err();
        assert_eq!(
            error,
            RpcError::NoProvider {
                service_key: "g/test.Counter".to_string()
            }
        );

        let _exporter = protocol.export(provider(7)).unwrap();
        assert!(invoker.is_available());
        let value = invoker
            .invoke(Invocation::new("next", &[], vec![]))
            .await
            .unwrap();
        assert_eq!(value, json!(7));
    }

    #[test]
    fn test_unexport_keeps_newer_export() {
        let protocol = InjvmProtocol::new();
        let first = protocol.export(provider(1)).unwrap();
        let _second = protocol.export(provider(2)).unwrap();
        first.unexport().unwrap();
        assert!(protocol.is_exported(&url()));
        assert_eq!(protocol.exported_count(), 1);
    }

    #[test]
    fn test_unexport_removes_service() {
        let protocol = InjvmProtocol::new();
        let exporter = protocol.export(provider(1)).unwrap();
        exporter.unexport().unwrap();
        exporter.unexport().unwrap();
        assert!(!protocol.is_exported(&url()));
    }

    #[tokio::test]
    async fn test_destroy_releases_referred_invokers() {
        let protocol = InjvmProtocol::new();
        let _exporter = protocol.export(provider(1)).unwrap();
        let invoker = protocol
            .refer(InterfaceType::of::<dyn Counter>(), &url())
            .unwrap();
        protocol.destroy();

        assert!(!invoker.is_available());
        let error = invoker
            .invoke(Invocation::new("next", &[], vec![]))
            .await
            .unwrap_err();
        assert!(matches!(error, RpcError::Destroyed { .. }));
        assert_eq!(protocol.exported_count(), 0);
    }
}
