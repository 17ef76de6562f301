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

use crate::component::{ReferenceAnnotation, ServiceAnnotation};
use crate::rpc::{InterfaceObject, InterfaceType, RemoteInterface};
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Assigns a resolved stub to an injection site of a type-erased object.
///
/// Returns a description of the failure if the object or the stub has the
/// wrong type.
pub type Injector = Arc<dyn Fn(&mut dyn Any, &InterfaceObject) -> Result<(), String> + Send + Sync>;

type Upcaster = Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Option<InterfaceObject> + Send + Sync>;

/// Declared type of an injection site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteType {
    /// The site holds a remote interface.
    Interface(InterfaceType),
    /// The site holds a concrete type, named for diagnostics.
    Concrete(String),
}

impl SiteType {
    /// Returns the declared type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Interface(interface) => interface.name(),
            Self::Concrete(name) => name,
        }
    }

    /// Returns the interface when the site holds one.
    pub fn interface(&self) -> Option<InterfaceType> {
        match self {
            Self::Interface(interface) => Some(*interface),
            Self::Concrete(_) => None,
        }
    }
}

/// Kind of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A field.
    Field,
    /// A method.
    Method,
}

/// Visibility of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Visible everywhere.
    Public,
    /// Visible within the crate or a parent module.
    Restricted,
    /// Visible within the declaring module.
    #[default]
    Private,
}

/// A field or method of a component class.
#[derive(Clone)]
pub struct Member {
    name: String,
    kind: MemberKind,
    visibility: Visibility,
    is_static: bool,
    parameter_count: usize,
    site_type: SiteType,
    reference: Option<ReferenceAnnotation>,
    injector: Option<Injector>,
}

impl Member {
    /// Describes a private field.
    pub fn field(name: impl Into<String>, site_type: SiteType) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field,
            visibility: Visibility::Private,
            is_static: false,
            parameter_count: 0,
            site_type,
            reference: None,
            injector: None,
        }
    }

    /// Describes a public instance method whose first parameter has type
    /// `site_type`.
    pub fn method(name: impl Into<String>, parameter_count: usize, site_type: SiteType) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            visibility: Visibility::Public,
            is_static: false,
            parameter_count,
            site_type,
            reference: None,
            injector: None,
        }
    }

    /// Sets the visibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Marks the member as static.
    #[must_use]
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Attaches a reference annotation.
    #[must_use]
    pub fn with_reference(mut self, reference: ReferenceAnnotation) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Sets the injector.
    #[must_use]
    pub fn with_injector(mut self, injector: Injector) -> Self {
        self.injector = Some(injector);
        self
    }

    /// Returns the member name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the member kind.
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Returns the visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Returns `true` for static members.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Returns the number of parameters of a method, zero for fields.
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Returns the declared type of the site.
    pub fn site_type(&self) -> &SiteType {
        &self.site_type
    }

    /// Returns the reference annotation.
    pub fn reference(&self) -> Option<&ReferenceAnnotation> {
        self.reference.as_ref()
    }

    /// Returns `true` if the member is a reference injection site.
    ///
    /// Every annotated field qualifies. An annotated method qualifies when it
    /// is a public instance method named `set*` taking exactly one parameter.
    pub fn is_injection_site(&self) -> bool {
        if self.reference.is_none() {
            return false;
        }
        match self.kind {
            MemberKind::Field => true,
            MemberKind::Method => {
                self.visibility == Visibility::Public
                    && !self.is_static
                    && self.name.starts_with("set")
                    && self.parameter_count == 1
            }
        }
    }

    /// Assigns `stub` to this site of `target`.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure if the member has no injector or
    /// the injector rejects the target or the stub.
    pub fn inject(&self, target: &mut dyn Any, stub: &InterfaceObject) -> Result<(), String> {
        match &self.injector {
            Some(injector) => injector(target, stub),
            None => Err(format!("member '{}' cannot be assigned", self.name)),
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static)
            .field("parameter_count", &self.parameter_count)
            .field("site_type", &self.site_type)
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct InterfaceBinding {
    interface: InterfaceType,
    upcast: Upcaster,
}

/// Runtime description of a component class.
///
/// Stands in for reflective type metadata: the class name, the remote
/// interfaces it implements in declaration order, its service annotation and
/// its members.
pub struct ClassDescriptor {
    name: String,
    type_id: TypeId,
    interfaces: Vec<InterfaceBinding>,
    service: Option<ServiceAnnotation>,
    members: Vec<Member>,
}

impl ClassDescriptor {
    /// Starts a descriptor for the type `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rpcwire::component::{ClassDescriptor, ReferenceAnnotation, ServiceAnnotation, Visibility};
    /// use std::sync::Arc;
    ///
    /// #[rpcwire::interface(name = "com.acme.Greeter")]
    /// pub trait Greeter {
    ///     async fn greet(&self, name: String) -> Result<String, rpcwire::RpcError>;
    /// }
    ///
    /// #[derive(Default)]
    /// struct Frontend {
    ///     greeter: Option<Arc<dyn Greeter>>,
    /// }
    ///
    /// let class = ClassDescriptor::builder::<Frontend>("com.acme.Frontend")
    ///     .reference_field::<dyn Greeter>(
    ///         "greeter",
    ///         Visibility::Private,
    ///         ReferenceAnnotation::new().with_version("1"),
    ///         |frontend| &mut frontend.greeter,
    ///     )
    ///     .build();
    ///
    /// assert_eq!(class.name(), "com.acme.Frontend");
    /// assert!(class.service().is_none());
    /// assert_eq!(class.members().len(), 1);
    /// ```
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> ClassBuilder<T> {
        ClassBuilder {
            descriptor: ClassDescriptor {
                name: name.into(),
                type_id: TypeId::of::<T>(),
                interfaces: Vec::new(),
                service: None,
                members: Vec::new(),
            },
            marker: PhantomData,
        }
    }

    /// Returns the fully qualified class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the descriptor describes `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns the implemented remote interfaces in declaration order.
    pub fn interfaces(&self) -> Vec<InterfaceType> {
        self.interfaces
            .iter()
            .map(|binding| binding.interface)
            .collect()
    }

    /// Returns the service annotation.
    pub fn service(&self) -> Option<&ServiceAnnotation> {
        self.service.as_ref()
    }

    /// Returns the declared members.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Views `object` through every implemented interface.
    ///
    /// Interfaces whose upcast rejects the object are left out.
    pub fn interface_objects(&self, object: Arc<dyn Any + Send + Sync>) -> Vec<InterfaceObject> {
        self.interfaces
            .iter()
            .filter_map(|binding| (binding.upcast)(object.clone()))
            .collect()
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("interfaces", &self.interfaces())
            .field("service", &self.service)
            .field("members", &self.members)
            .finish()
    }
}

/// Builder for [`ClassDescriptor`].
pub struct ClassBuilder<T> {
    descriptor: ClassDescriptor,
    marker: PhantomData<fn(T)>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    /// Declares that `T` implements the remote interface `I`.
    ///
    /// `upcast` converts the object to the trait object, usually the
    /// identity closure `|object| object`.
    #[must_use]
    pub fn implements<I: ?Sized + RemoteInterface>(mut self, upcast: fn(Arc<T>) -> Arc<I>) -> Self {
        let upcast: Upcaster = Arc::new(move |object: Arc<dyn Any + Send + Sync>| {
            object
                .downcast::<T>()
                .ok()
                .map(|object| InterfaceObject::new::<I>(upcast(object)))
        });
        self.descriptor.interfaces.push(InterfaceBinding {
            interface: InterfaceType::of::<I>(),
            upcast,
        });
        self
    }

    /// Marks the class as a service.
    #[must_use]
    pub fn service(mut self, annotation: ServiceAnnotation) -> Self {
        self.descriptor.service = Some(annotation);
        self
    }

    /// Declares a reference field of type `Option<Arc<I>>`.
    #[must_use]
    pub fn reference_field<I: ?Sized + RemoteInterface>(
        self,
        name: &str,
        visibility: Visibility,
        annotation: ReferenceAnnotation,
        field: fn(&mut T) -> &mut Option<Arc<I>>,
    ) -> Self {
        let member = Member::field(name, SiteType::Interface(InterfaceType::of::<I>()))
            .with_visibility(visibility)
            .with_reference(annotation)
            .with_injector(Arc::new(
                move |target: &mut dyn Any, stub: &InterfaceObject| -> Result<(), String> {
                    let stub = downcast_stub::<I>(stub)?;
                    *field(downcast_target::<T>(target)?) = Some(stub);
                    Ok(())
                },
            ));
        self.member(member)
    }

    /// Declares a public setter taking one `Arc<I>`.
    #[must_use]
    pub fn reference_setter<I: ?Sized + RemoteInterface>(
        self,
        name: &str,
        annotation: ReferenceAnnotation,
        setter: fn(&mut T, Arc<I>),
    ) -> Self {
        let member = Member::method(name, 1, SiteType::Interface(InterfaceType::of::<I>()))
            .with_reference(annotation)
            .with_injector(Arc::new(
                move |target: &mut dyn Any, stub: &InterfaceObject| -> Result<(), String> {
                    let stub = downcast_stub::<I>(stub)?;
                    setter(downcast_target::<T>(target)?, stub);
                    Ok(())
                },
            ));
        self.member(member)
    }

    /// Adds a member as is.
    #[must_use]
    pub fn member(mut self, member: Member) -> Self {
        self.descriptor.members.push(member);
        self
    }

    /// Finishes the descriptor.
    pub fn build(self) -> ClassDescriptor {
        self.descriptor
    }
}

/// Borrows `target` as `T` for an injector.
///
/// # Errors
///
/// Returns a description of the mismatch if `target` is not a `T`.
pub fn downcast_target<T: Any>(target: &mut dyn Any) -> Result<&mut T, String> {
    target
        .downcast_mut::<T>()
        .ok_or_else(|| format!("target is not a {}", type_name::<T>()))
}

/// Recovers the typed stub for an injector.
///
/// # Errors
///
/// Returns a description of the mismatch if `stub` does not implement `I`.
pub fn downcast_stub<I: ?Sized + RemoteInterface>(stub: &InterfaceObject) -> Result<Arc<I>, String> {
    stub.downcast::<I>().ok_or_else(|| {
        format!(
            "stub implements {} but the site expects {}",
            stub.interface().name(),
            I::NAME
        )
    })
}
