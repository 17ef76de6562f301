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

//! Joining several invokers behind one.

use crate::rpc::{InterfaceType, Invocation, Invoker, RpcError};
use crate::url::Url;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Calls the first available member.
///
/// Used when a reference resolves to more than one invoker: one per registry,
/// or one per provider found in a registry.
pub struct AvailableInvoker {
    interface: InterfaceType,
    url: Url,
    invokers: Vec<Arc<dyn Invoker>>,
    destroyed: AtomicBool,
}

impl AvailableInvoker {
    /// Joins `invokers`; `url` identifies the joined invoker.
    pub fn new(interface: InterfaceType, url: Url, invokers: Vec<Arc<dyn Invoker>>) -> Self {
        Self {
            interface,
            url,
            invokers,
            destroyed: AtomicBool::new(false),
        }
    }

    /// Returns the members in preference order.
    pub fn invokers(&self) -> &[Arc<dyn Invoker>] {
        &self.invokers
    }

    fn select(&self) -> Option<&Arc<dyn Invoker>> {
        self.invokers.iter().find(|invoker| invoker.is_available())
    }
}

#[async_trait::async_trait]
impl Invoker for AvailableInvoker {
    fn interface(&self) -> InterfaceType {
        self.interface
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn is_available(&self) -> bool {
        !self.destroyed.load(Ordering::Acquire) && self.select().is_some()
    }

    async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(RpcError::Destroyed {
                url: self.url.to_string(),
            });
        }
        match self.select() {
            Some(invoker) => invoker.invoke(invocation).await,
            None => Err(RpcError::NoProvider {
                service_key: self.url.service_key(),
            }),
        }
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        for invoker in &self.invokers {
            invoker.destroy();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[crate::interface(name = "test.Named")]
    trait Named {
        async fn name(&self) -> Result<String, RpcError>;
    }

    struct Member {
        url: Url,
        name: &'static str,
        available: bool,
        destroyed: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Invoker for Member {
        fn interface(&self) -> InterfaceType {
            InterfaceType::of::<dyn Named>()
        }

        fn url(&self) -> &Url {
            &self.url
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn invoke(&self, _invocation: Invocation) -> Result<Value, RpcError> {
            Ok(json!(self.name))
        }

        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn member(name: &'static str, available: bool) -> Arc<Member> {
        Arc::new(Member {
            url: Url::new("dubbo", name, 20880, "test.Named"),
            name,
            available,
            destroyed: AtomicUsize::new(0),
        })
    }

    fn joined(members: &[Arc<Member>]) -> AvailableInvoker {
        AvailableInvoker::new(
            InterfaceType::of::<dyn Named>(),
            Url::new("registry", "127.0.0.1", 9090, "test.Named"),
            members
                .iter()
                .map(|m| Arc::clone(m) as Arc<dyn Invoker>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_skips_unavailable_members() {
        let invoker = joined(&[member("a", false), member("b", true), member("c", true)]);
        assert!(invoker.is_available());
        let name = invoker
            .invoke(Invocation::new("name", &[], vec![]))
            .await
            .unwrap();
        assert_eq!(name, json!("b"));
    }

    #[tokio::test]
    async fn test_no_available_member() {
        let invoker = joined(&[member("a", false)]);
        assert!(!invoker.is_available());
        let error = invoker
            .invoke(Invocation::new("name", &[], vec![]))
            .await
            .unwrap_err();
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_destroy_reaches_every_member_once() {
        let members = [member("a", true), member("b", false)];
        let invoker = joined(&members);
        invoker.destroy();
        invoker.destroy();
        assert!(!invoker.is_available());
        for member in &members {
            assert_eq!(member.destroyed.load(Ordering::SeqCst), 1);
        }
    }
}
