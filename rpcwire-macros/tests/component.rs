//! Tests for `#[derive(Component)]`.
//!
//! These tests verify the generated class descriptor, its injection sites and
//! the link-time class registration.

use rpcwire::component::{
    Component as _, MemberKind, ReferenceAnnotation, SiteType, Visibility, registered_classes,
};
use rpcwire::rpc::{InterfaceObject, InterfaceType, RemoteInterface};
use rpcwire::{Component, RpcError};
use std::sync::Arc;

#[rpcwire::interface(name = "test.derive.Greeter")]
pub trait Greeter {
    async fn greet(&self, name: String) -> Result<String, RpcError>;
}

#[rpcwire::interface(name = "test.derive.Clock")]
pub trait Clock {
    async fn now(&self) -> Result<u64, RpcError>;
}

#[derive(Component)]
#[component(class = "com.acme.EnglishGreeter", implements(Greeter, Clock))]
#[service(
    interface = Greeter,
    version = "1.0",
    group = "g",
    registry = "east, west",
    protocol = "injvm",
    scope = "local"
)]
struct EnglishGreeter;

#[rpcwire::async_trait]
impl Greeter for EnglishGreeter {
    async fn greet(&self, name: String) -> Result<String, RpcError> {
        Ok(format!("Hello, {name}"))
    }
}

#[rpcwire::async_trait]
impl Clock for EnglishGreeter {
    async fn now(&self) -> Result<u64, RpcError> {
        Ok(0)
    }
}

#[derive(Component, Default)]
#[reference_setter(name = "set_clock", site = Clock, version = "2")]
struct Frontend {
    #[reference(group = "g", version = "1", check = true, timeout = 250)]
    pub greeter: Option<Arc<dyn Greeter>>,
    #[reference(interface_name = "test.derive.Clock")]
    pub(crate) erased: Option<InterfaceObject>,
    #[reference(interface = Greeter)]
    concrete: Option<Arc<EnglishGreeter>>,
    clock: Option<Arc<dyn Clock>>,
    untouched: u32,
}

impl Frontend {
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = Some(clock);
    }
}

fn greeter_object() -> InterfaceObject {
    InterfaceObject::new::<dyn Greeter>(Arc::new(EnglishGreeter))
}

fn clock_object() -> InterfaceObject {
    InterfaceObject::new::<dyn Clock>(Arc::new(EnglishGreeter))
}

#[test]
fn test_service_descriptor() {
    let class = EnglishGreeter.class();
    assert_eq!(class.name(), "com.acme.EnglishGreeter");
    assert!(class.is::<EnglishGreeter>());
    assert_eq!(
        class.interfaces(),
        vec![
            InterfaceType::of::<dyn Greeter>(),
            InterfaceType::of::<dyn Clock>()
        ]
    );

    let service = class.service().unwrap();
    assert_eq!(service.interface_class, Some(InterfaceType::of::<dyn Greeter>()));
    assert_eq!(service.version, "1.0");
    assert_eq!(service.group, "g");
    assert_eq!(service.registries, ["east", "west"]);
    assert_eq!(service.protocols, ["injvm"]);
    assert_eq!(service.scope.as_deref(), Some("local"));
    assert!(service.application.is_none());
    assert!(class.members().is_empty());
}

#[test]
fn test_class_name_defaults_to_struct() {
    let class = Frontend::descriptor();
    assert_eq!(class.name(), "Frontend");
    assert!(class.service().is_none());
    assert!(class.interfaces().is_empty());
}

#[test]
fn test_descriptor_is_shared() {
    assert!(std::ptr::eq(Frontend::descriptor(), Frontend::default().class()));
}

#[test]
fn test_reference_members() {
    let members = Frontend::descriptor().members();
    let names: Vec<&str> = members.iter().map(|member| member.name()).collect();
    assert_eq!(names, ["greeter", "erased", "concrete", "set_clock"]);

    let greeter = &members[0];
    assert_eq!(greeter.kind(), MemberKind::Field);
    assert_eq!(greeter.visibility(), Visibility::Public);
    assert_eq!(greeter.site_type().interface(), Some(InterfaceType::of::<dyn Greeter>()));
    assert_eq!(
        greeter.reference(),
        Some(
            &ReferenceAnnotation::new()
                .with_group("g")
                .with_version("1")
                .with_check(true)
                .with_timeout(250)
        )
    );

    let erased = &members[1];
    assert_eq!(erased.visibility(), Visibility::Restricted);
    assert!(erased.site_type().interface().is_none());
    assert_eq!(erased.reference().unwrap().interface_name, "test.derive.Clock");

    let concrete = &members[2];
    assert_eq!(concrete.visibility(), Visibility::Private);
    assert_eq!(
        concrete.site_type(),
        &SiteType::Concrete("Option<Arc<EnglishGreeter>>".to_string())
    );
    assert_eq!(
        concrete.reference().unwrap().interface_class,
        Some(InterfaceType::of::<dyn Greeter>())
    );

    let setter = &members[3];
    assert_eq!(setter.kind(), MemberKind::Method);
    assert_eq!(setter.parameter_count(), 1);
    assert!(setter.is_injection_site());
    assert_eq!(setter.reference().unwrap().version, "2");
}

#[test]
fn test_injection_assigns_sites() {
    let mut frontend = Frontend::default();
    let members = Frontend::descriptor().members();
    let greeter = greeter_object();
    let clock = clock_object();

    members[0].inject(&mut frontend, &greeter).unwrap();
    members[1].inject(&mut frontend, &clock).unwrap();
    members[3].inject(&mut frontend, &clock).unwrap();

    let injected = InterfaceObject::new::<dyn Greeter>(frontend.greeter.clone().unwrap());
    assert!(injected.same_object(&greeter));
    assert!(frontend.erased.as_ref().unwrap().same_object(&clock));
    assert!(frontend.clock.is_some());
    assert_eq!(frontend.untouched, 0);
}

#[test]
fn test_injection_rejects_mismatches() {
    let mut frontend = Frontend::default();
    let members = Frontend::descriptor().members();

    // A clock stub cannot fill a greeter field.
    assert!(members[0].inject(&mut frontend, &clock_object()).is_err());
    // Concrete sites have no injector.
    assert!(members[2].inject(&mut frontend, &greeter_object()).is_err());
    assert!(frontend.greeter.is_none());
}

#[test]
fn test_interface_objects() {
    let objects = EnglishGreeter::descriptor().interface_objects(Arc::new(EnglishGreeter));
    let names: Vec<&str> = objects.iter().map(|object| object.interface().name()).collect();
    assert_eq!(names, [<dyn Greeter>::NAME, <dyn Clock>::NAME]);
    assert!(objects[0].downcast::<dyn Greeter>().is_some());
}

#[test]
fn test_classes_registered() {
    let names: Vec<&str> = registered_classes().map(|class| class.name()).collect();
    assert!(names.contains(&"com.acme.EnglishGreeter"));
    assert!(names.contains(&"Frontend"));
}
