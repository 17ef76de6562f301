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


//! Package gating and class scanning.

use rpcwire::config::ProcessorConfig;
use rpcwire::container::SimpleContainer;
use rpcwire::wiring::WiringProcessor;
use rpcwire::{Component, RpcError};
use serde_json::json;
use std::sync::Arc;

#[rpcwire::interface(name = "com.app.biz.Orders")]
pub trait Orders {
    async fn place(&self, sku: String, quantity: u32) -> Result<u64, RpcError>;
}

#[derive(Component)]
#[component(class = "com.app.biz.OrderService", implements(Orders))]
#[service(scope = "local")]
struct OrderService;

#[rpcwire::async_trait]
impl Orders for OrderService {
    async fn place(&self, _sku: String, quantity: u32) -> Result<u64, RpcError> {
        Ok(u64::from(quantity))
    }
}

#[derive(Component, Default)]
#[component(class = "com.app.biz.web.OrderController")]
struct OrderController {
    #[reference]
    orders: Option<Arc<dyn Orders>>,
}

#[derive(Component)]
#[component(class = "com.other.Svc", implements(Orders))]
#[service(scope = "local")]
struct OtherService;

#[rpcwire::async_trait]
impl Orders for OtherService {
    async fn place(&self, _sku: String, _quantity: u32) -> Result<u64, RpcError> {
        Ok(0)
    }
}

/// Only service classes below the configured packages are registered, and
/// each only once.
#[test]
fn test_scan_registers_matching_service_classes() {
    let container = Arc::new(SimpleContainer::new());
    let processor = WiringProcessor::builder(container.clone())
        .with_packages("com.app.biz")
        .build();

    assert_eq!(processor.scan_definitions(), 1);
    assert_eq!(container.registered_classes(), vec!["com.app.biz.OrderService".to_string()]);
    assert_eq!(processor.scan_definitions(), 0);
}

/// Scanning is skipped without packages or without a definition registry.
#[test]
fn test_scan_skipped() {
    let container = Arc::new(SimpleContainer::new());
    let processor = WiringProcessor::builder(container.clone()).build();
    assert_eq!(processor.scan_definitions(), 0);
    assert!(container.registered_classes().is_empty());

    let processor = WiringProcessor::builder(Arc::new(SimpleContainer::without_definitions()))
        .with_packages("com.app.biz")
        .build();
    assert_eq!(processor.scan_definitions(), 0);
}

/// Package gating applies to export and injection alike.
#[tokio::test]
async fn test_package_gating() {
    let processor = WiringProcessor::builder(Arc::new(SimpleContainer::new()))
        .with_packages("com.app.biz")
        .build();

    processor.register(OtherService).unwrap();
    assert_eq!(processor.registry().service_count(), 0);

    processor.register(OrderService).unwrap();
    let controller = processor.register(OrderController::default()).unwrap();
    assert_eq!(processor.registry().service_count(), 1);

    let orders = controller.orders.as_ref().expect("controller wired");
    assert_eq!(orders.place("A-1".to_string(), 4).await.unwrap(), 4);

    processor.shutdown();
}

/// Packages deserialize from a list or a comma-separated string.
#[test]
fn test_processor_config_deserializes() {
    let joined: ProcessorConfig =
        serde_json::from_value(json!({ "packages": "com.app.biz, com.app.api" })).unwrap();
    let listed: ProcessorConfig =
        serde_json::from_value(json!({ "packages": ["com.app.biz", "com.app.api"] })).unwrap();
    assert_eq!(joined, listed);
    assert_eq!(joined.package_prefixes(), ["com.app.biz", "com.app.api"]);

    let empty: ProcessorConfig = serde_json::from_value(json!({})).unwrap();
    assert!(empty.package_prefixes().is_empty());
}
