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

//! Component model for container-produced objects.
//!
//! The wiring processor never inspects types at runtime. Instead every
//! component carries a [`ClassDescriptor`] describing its class name, the
//! remote interfaces it implements, its [`ServiceAnnotation`] and its
//! reference injection sites. Descriptors are normally generated by
//! [`#[derive(Component)]`](crate::Component), which also records the class in
//! a link-time table used by package scanning.
//!
//! # Examples
//!
//! ```rust
//! use rpcwire::Component;
//! use rpcwire::component::Component as _;
//! use std::sync::Arc;
//!
//! #[rpcwire::interface(name = "com.acme.Greeter")]
//! pub trait Greeter {
//!     async fn greet(&self, name: String) -> Result<String, rpcwire::RpcError>;
//! }
//!
//! #[derive(Component)]
//! #[component(class = "com.acme.EnglishGreeter", implements(Greeter))]
//! #[service(version = "1.0")]
//! struct EnglishGreeter;
//!
//! #[rpcwire::async_trait]
//! impl Greeter for EnglishGreeter {
//!     async fn greet(&self, name: String) -> Result<String, rpcwire::RpcError> {
//!         Ok(format!("Hello, {name}"))
//!     }
//! }
//!
//! let class = EnglishGreeter.class();
//! assert_eq!(class.name(), "com.acme.EnglishGreeter");
//! assert_eq!(class.service().map(|s| s.version.as_str()), Some("1.0"));
//! ```

mod annotation;
mod descriptor;

pub use annotation::{ReferenceAnnotation, ServiceAnnotation};
pub use descriptor::{
    ClassBuilder, ClassDescriptor, Injector, Member, MemberKind, SiteType, Visibility,
    downcast_stub, downcast_target,
};

use std::any::Any;
use std::sync::Arc;

/// An object the wiring processor can inspect and inject into.
pub trait Component: Any + Send + Sync {
    /// Returns the descriptor of the implementing type.
    fn descriptor() -> &'static ClassDescriptor
    where
        Self: Sized;

    /// Returns the descriptor of the runtime class.
    fn class(&self) -> &'static ClassDescriptor;

    /// Returns `self` for injection.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Converts a shared component into a shared `Any` for interface views.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("class", &self.class().name())
            .finish_non_exhaustive()
    }
}

/// Link-time record of a component class, submitted by
/// [`#[derive(Component)]`](crate::Component).
#[derive(Debug)]
pub struct ClassRegistration {
    /// Returns the class descriptor
    pub class: fn() -> &'static ClassDescriptor,
}

inventory::collect!(ClassRegistration);

/// Returns every component class linked into the program.
pub fn registered_classes() -> impl Iterator<Item = &'static ClassDescriptor> {
    inventory::iter::<ClassRegistration>
        .into_iter()
        .map(|registration| (registration.class)())
}
