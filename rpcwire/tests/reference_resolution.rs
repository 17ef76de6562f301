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


//! Reference resolution and injection.

mod common;

use common::RecordingProtocol;
use rpcwire::component::{ReferenceAnnotation, SiteType};
use rpcwire::config::ConsumerConfig;
use rpcwire::container::SimpleContainer;
use rpcwire::endpoint::ReferenceState;
use rpcwire::protocol::ProtocolSelector;
use rpcwire::rpc::{InterfaceObject, InterfaceType};
use rpcwire::wiring::WiringProcessor;
use rpcwire::{Component, RpcError, WiringError};
use serde_json::json;
use std::sync::Arc;

#[rpcwire::interface(name = "com.acme.Inventory")]
pub trait Inventory {
    async fn stock(&self, sku: String) -> Result<u32, RpcError>;
}

#[rpcwire::interface(name = "com.acme.Pricing")]
pub trait Pricing {
    async fn price(&self, sku: String) -> Result<f64, RpcError>;
}

struct Warehouse;

#[derive(Component, Default)]
#[component(class = "com.acme.shop.Checkout")]
#[reference_setter(name = "set_pricing", site = Pricing, version = "2")]
struct Checkout {
    #[reference(version = "2")]
    inventory: Option<Arc<dyn Inventory>>,
    #[reference(interface = Inventory, version = "2")]
    warehouse: Option<Arc<Warehouse>>,
    #[reference]
    audit: Option<String>,
    pricing: Option<Arc<dyn Pricing>>,
}

impl Checkout {
    pub fn set_pricing(&mut self, pricing: Arc<dyn Pricing>) {
        self.pricing = Some(pricing);
    }
}

#[derive(Component, Default)]
#[component(class = "com.acme.shop.Remote")]
struct RemoteShop {
    #[reference(url = "dubbo://10.0.0.5:20880", timeout = 3000, group = "eu")]
    inventory: Option<Arc<dyn Inventory>>,
}

#[derive(Component, Default)]
#[component(class = "com.acme.shop.Misconfigured")]
struct Misconfigured {
    #[reference(consumer = "missing", version = "9")]
    inventory: Option<Arc<dyn Inventory>>,
}

fn processor() -> (Arc<WiringProcessor>, Arc<RecordingProtocol>) {
    let selector = ProtocolSelector::standard();
    let protocol = RecordingProtocol::install(&selector);
    let processor = WiringProcessor::builder(Arc::new(SimpleContainer::new()))
        .with_selector(selector)
        .build();
    (Arc::new(processor), protocol)
}

fn inventory_site() -> SiteType {
    SiteType::Interface(InterfaceType::of::<dyn Inventory>())
}

/// Concurrent resolutions of one key create exactly one endpoint.
#[test]
fn test_concurrent_resolution_shares_one_endpoint() {
    let (processor, _protocol) = processor();
    let annotation = ReferenceAnnotation::new().with_group("g").with_version("1");

    let stubs: Vec<InterfaceObject> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| processor.resolve_reference(&annotation, &inventory_site())))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect()
    });

    assert!(stubs.windows(2).all(|pair| pair[0].same_object(&pair[1])));
    assert_eq!(
        processor.registry().reference_keys(),
        vec!["g/com.acme.Inventory:1".to_string()]
    );
}

/// Keys differing only in group or version resolve to distinct stubs.
#[test]
fn test_distinct_keys_resolve_distinct_stubs() {
    let (processor, _protocol) = processor();
    let plain = processor
        .resolve_reference(&ReferenceAnnotation::new(), &inventory_site())
        .unwrap();
    let grouped = processor
        .resolve_reference(&ReferenceAnnotation::new().with_group("g"), &inventory_site())
        .unwrap();
    let versioned = processor
        .resolve_reference(&ReferenceAnnotation::new().with_version("1"), &inventory_site())
        .unwrap();

    assert!(!plain.same_object(&grouped));
    assert!(!plain.same_object(&versioned));
    assert_eq!(
        processor.registry().reference_keys(),
        vec![
            "/com.acme.Inventory:".to_string(),
            "/com.acme.Inventory:1".to_string(),
            "g/com.acme.Inventory:".to_string(),
        ]
    );
}

/// The annotation's interface name wins over its interface token, which
/// wins over the site type.
#[test]
fn test_interface_precedence() {
    let (processor, _protocol) = processor();

    let named = ReferenceAnnotation::new()
        .with_interface_name("com.acme.Pricing")
        .with_interface::<dyn Inventory>();
    let stub = processor.resolve_reference(&named, &inventory_site()).unwrap();
    assert_eq!(stub.interface(), InterfaceType::of::<dyn Pricing>());

    let typed = ReferenceAnnotation::new().with_interface::<dyn Pricing>();
    let stub = processor
        .resolve_reference(&typed, &SiteType::Concrete("Warehouse".to_string()))
        .unwrap();
    assert!(stub.downcast::<dyn Pricing>().is_some());

    let error = processor
        .resolve_reference(
            &ReferenceAnnotation::new(),
            &SiteType::Concrete("Warehouse".to_string()),
        )
        .unwrap_err();
    assert_eq!(
        error,
        WiringError::MissingInterface {
            target: "Warehouse".to_string()
        }
    );
}

/// Fields and setters are injected; sites that cannot hold a stub are
/// skipped without failing the component.
#[test]
fn test_pre_process_injects_fields_and_setters() {
    let (processor, _protocol) = processor();
    let mut checkout = Checkout::default();

    let injected = processor.pre_process(&mut checkout);

    assert_eq!(injected, 2);
    assert!(checkout.inventory.is_some());
    assert!(checkout.pricing.is_some());
    assert!(checkout.warehouse.is_none());
    assert!(checkout.audit.is_none());
    // the concrete site still resolved the shared inventory endpoint
    assert_eq!(
        processor.registry().reference_keys(),
        vec![
            "/com.acme.Inventory:2".to_string(),
            "/com.acme.Pricing:2".to_string(),
        ]
    );
}

/// Direct URLs are referred through their own scheme with the consumer
/// parameters merged in.
#[tokio::test]
async fn test_direct_url_reference() {
    let (processor, protocol) = processor();
    protocol.reply_with(json!(12));

    let shop = processor.register(RemoteShop::default()).unwrap();
    let inventory = shop.inventory.as_ref().expect("remote inventory wired");
    assert_eq!(inventory.stock("A-1".to_string()).await.unwrap(), 12);

    let refers = protocol.refers();
    assert_eq!(refers.len(), 1);
    assert_eq!(refers[0].host(), "10.0.0.5");
    assert_eq!(refers[0].path(), "com.acme.Inventory");
    assert_eq!(refers[0].parameter("timeout"), Some("3000"));
    assert_eq!(refers[0].parameter("group"), Some("eu"));
    assert_eq!(refers[0].parameter("side"), Some("consumer"));
}

/// With `check` set, a reference without a provider fails at resolution.
#[test]
fn test_check_fails_without_provider() {
    let (processor, _protocol) = processor();
    let annotation = ReferenceAnnotation::new().with_check(true);

    let error = processor
        .resolve_reference(&annotation, &inventory_site())
        .unwrap_err();
    assert!(matches!(
        error,
        WiringError::ReferFailed {
            source: RpcError::NoProvider { .. },
            ..
        }
    ));
}

/// Consumer ids resolve against the container; unknown ids fail the site.
#[test]
fn test_named_consumer_lookup() {
    let selector = ProtocolSelector::standard();
    RecordingProtocol::install(&selector);
    let container = SimpleContainer::new().with_object(
        "eu-consumer",
        ConsumerConfig::new().with_group("eu").with_version("3"),
    );
    let processor = WiringProcessor::builder(Arc::new(container))
        .with_selector(selector)
        .build();

    let annotation = ReferenceAnnotation::new().with_consumer("eu-consumer");
    processor.resolve_reference(&annotation, &inventory_site()).unwrap();
    let endpoint = processor
        .registry()
        .reference("/com.acme.Inventory:")
        .expect("endpoint under the annotation key");
    assert_eq!(endpoint.config().group, "eu");
    assert_eq!(endpoint.config().version, "3");

    let mut misconfigured = Misconfigured::default();
    assert_eq!(processor.pre_process(&mut misconfigured), 0);
    assert!(misconfigured.inventory.is_none());
}

/// After shutdown, stubs handed out earlier report the destroyed endpoint.
#[tokio::test]
async fn test_shutdown_destroys_references() {
    let (processor, _protocol) = processor();
    let stub = processor
        .resolve_reference(&ReferenceAnnotation::new(), &inventory_site())
        .unwrap();
    let endpoint = processor.registry().reference("/com.acme.Inventory:").unwrap();
    assert_eq!(endpoint.state(), ReferenceState::Initialised);

    processor.shutdown();

    assert_eq!(endpoint.state(), ReferenceState::Destroyed);
    assert!(matches!(
        endpoint.acquire_stub(),
        Err(WiringError::EndpointDestroyed { .. })
    ));
    let inventory = stub.downcast::<dyn Inventory>().unwrap();
    assert!(inventory.stock("A-1".to_string()).await.is_err());
}
