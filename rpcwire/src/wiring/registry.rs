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

use crate::endpoint::{ReferenceEndpoint, ServiceEndpoint};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Owner of every endpoint built by a wiring processor.
///
/// Services are kept in export order. References are keyed by
/// `group/interface:version`; the first endpoint inserted under a key wins
/// and every later resolution shares it.
#[derive(Default)]
pub struct WiringRegistry {
    services: Mutex<Vec<Arc<ServiceEndpoint>>>,
    references: RwLock<HashMap<String, Arc<ReferenceEndpoint>>>,
}

impl WiringRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of an exported service.
    pub fn add_service(&self, endpoint: Arc<ServiceEndpoint>) {
        self.services.lock().push(endpoint);
    }

    /// Returns the services in export order.
    pub fn services(&self) -> Vec<Arc<ServiceEndpoint>> {
        self.services.lock().clone()
    }

    /// Returns the number of services.
    pub fn service_count(&self) -> usize {
        self.services.lock().len()
    }

    /// Returns the reference registered under `key`.
    pub fn reference(&self, key: &str) -> Option<Arc<ReferenceEndpoint>> {
        self.references.read().get(key).cloned()
    }

    /// Returns the reference keys in sorted order.
    pub fn reference_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.references.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of references.
    pub fn reference_count(&self) -> usize {
        self.references.read().len()
    }

    /// Inserts `candidate` under `key` unless an endpoint is already there.
    ///
    /// Returns the endpoint that holds the key afterwards. A losing candidate
    /// is dropped without being destroyed; it never referred anything.
    pub fn insert_reference(
        &self,
        key: String,
        candidate: Arc<ReferenceEndpoint>,
    ) -> Arc<ReferenceEndpoint> {
        let winner = self
            .references
            .write()
            .entry(key)
            .or_insert_with(|| candidate.clone())
            .clone();
        if !Arc::ptr_eq(&winner, &candidate) {
            debug!(key = %winner.key(), "reference already registered, discarding duplicate");
        }
        winner
    }

    /// Returns `true` if no endpoint is registered.
    pub fn is_empty(&self) -> bool {
        self.services.lock().is_empty() && self.references.read().is_empty()
    }

    /// Removes and returns every endpoint.
    pub fn drain(&self) -> (Vec<Arc<ServiceEndpoint>>, Vec<Arc<ReferenceEndpoint>>) {
        let services = std::mem::take(&mut *self.services.lock());
        let references = self.references.write().drain().map(|(_, e)| e).collect();
        (services, references)
    }
}

impl std::fmt::Debug for WiringRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WiringRegistry")
            .field("services", &self.service_count())
            .field("references", &self.reference_keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RpcError;
    use crate::config::ReferenceConfig;
    use crate::protocol::ProtocolSelector;
    use crate::proxy::DispatchProxyFactory;
    use crate::rpc::InterfaceType;

    #[crate::interface(name = "test.Ledger")]
    trait Ledger {
        async fn balance(&self) -> Result<i64, RpcError>;
    }

    fn candidate(key: &str) -> Arc<ReferenceEndpoint> {
        let config = ReferenceConfig::new(key).with_interface(InterfaceType::of::<dyn Ledger>());
        Arc::new(
            ReferenceEndpoint::new(
                key,
                config,
                Arc::new(ProtocolSelector::new()),
                Arc::new(DispatchProxyFactory::new()),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_first_writer_wins() {
        let registry = WiringRegistry::new();
        let first = candidate("/test.Ledger:");
        let second = candidate("/test.Ledger:");

        let winner = registry.insert_reference("/test.Ledger:".to_string(), first.clone());
        assert!(Arc::ptr_eq(&winner, &first));
        let winner = registry.insert_reference("/test.Ledger:".to_string(), second);
        assert!(Arc::ptr_eq(&winner, &first));
        assert_eq!(registry.reference_count(), 1);
    }

    #[test]
    fn test_concurrent_inserts_agree() {
        let registry = Arc::new(WiringRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.insert_reference("g/test.Ledger:1".to_string(), candidate("g/test.Ledger:1"))
                })
            })
            .collect();
        let winners: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(winners.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(registry.reference_keys(), ["g/test.Ledger:1"]);
    }

    #[test]
    fn test_drain_empties() {
        let registry = WiringRegistry::new();
        registry.insert_reference("a".to_string(), candidate("a"));
        registry.insert_reference("b".to_string(), candidate("b"));
        assert!(!registry.is_empty());

        let (services, references) = registry.drain();
        assert!(services.is_empty());
        assert_eq!(references.len(), 2);
        assert!(registry.is_empty());
    }
}
