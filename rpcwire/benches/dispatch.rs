//! Dispatch benchmarks for rpcwire
//!
//! Measures the in-process call path:
//! - Stub to dispatcher round trip for different payload sizes
//! - Dispatcher cache lookups
//! - Deduplicated reference resolution

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rpcwire::component::{ReferenceAnnotation, SiteType};
use rpcwire::container::SimpleContainer;
use rpcwire::proxy::{DispatchProxyFactory, ProxyFactory, ServiceRef};
use rpcwire::rpc::InterfaceType;
use rpcwire::url::Url;
use rpcwire::wiring::WiringProcessor;
use rpcwire::RpcError;
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use std::sync::Arc;

/// Payload echoed by the benchmark service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    id: u64,
    data: Vec<u8>,
}

#[rpcwire::interface(name = "bench.Echo")]
pub trait Echo {
    async fn echo(&self, payload: Payload) -> Result<Payload, RpcError>;
}

struct EchoService;

#[rpcwire::async_trait]
impl Echo for EchoService {
    async fn echo(&self, payload: Payload) -> Result<Payload, RpcError> {
        Ok(payload)
    }
}

/// Benchmark a call through a stub over a dispatching invoker
fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_round_trip");
    let rt = tokio::runtime::Runtime::new().unwrap();

    let factory = DispatchProxyFactory::new();
    let invoker = factory
        .get_invoker(
            ServiceRef::of::<dyn Echo>("bench.EchoService", Arc::new(EchoService)),
            InterfaceType::of::<dyn Echo>(),
            Url::new("injvm", "127.0.0.1", 0, "bench.Echo"),
        )
        .unwrap();
    let echo = factory.get_proxy(invoker, &[]).unwrap().get::<dyn Echo>().unwrap();

    for size in [16, 1024, 16384].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}bytes", size)),
            size,
            |b, &size| {
                let payload = Payload {
                    id: 1,
                    data: vec![0u8; size],
                };
                b.to_async(&rt).iter(|| {
                    let echo = echo.clone();
                    let payload = payload.clone();
                    async move { black_box(echo.echo(payload).await.unwrap()) }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark dispatcher cache hits, by class and by interface
fn bench_dispatcher_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher_cache");
    let factory = DispatchProxyFactory::new();
    let interface = InterfaceType::of::<dyn Echo>();

    let named = ServiceRef::of::<dyn Echo>("bench.EchoService", Arc::new(EchoService));
    group.bench_function("class", |b| {
        b.iter(|| black_box(factory.dispatcher(&named, interface)))
    });

    let generated = ServiceRef::of::<dyn Echo>("bench.Echo$Generated", Arc::new(EchoService));
    group.bench_function("generated_class", |b| {
        b.iter(|| black_box(factory.dispatcher(&generated, interface)))
    });

    group.finish();
}

/// Benchmark resolution of an already registered reference
fn bench_reference_resolution(c: &mut Criterion) {
    let processor = WiringProcessor::builder(Arc::new(SimpleContainer::new())).build();
    let annotation = ReferenceAnnotation::new().with_group("g").with_version("1");
    let site = SiteType::Interface(InterfaceType::of::<dyn Echo>());
    processor.resolve_reference(&annotation, &site).unwrap();

    c.bench_function("resolve_reference_hit", |b| {
        b.iter(|| black_box(processor.resolve_reference(&annotation, &site).unwrap()))
    });

    processor.shutdown();
}

criterion_group!(
    benches,
    bench_round_trip,
    bench_dispatcher_cache,
    bench_reference_resolution
);
criterion_main!(benches);
