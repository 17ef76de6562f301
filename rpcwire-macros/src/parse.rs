//! Parsing logic for the `#[rpcwire::interface]` and `#[derive(Component)]`
//! macros.
//!
//! Interface traits are reduced to an [`InterfaceDef`]; component structs to a
//! [`ComponentDef`] holding their class name, implemented interfaces and the
//! raw attribute values of every `service`, `reference` and
//! `reference_setter` annotation.

use proc_macro2::Span;
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, ExprLit, Field, FnArg, GenericArgument, Ident,
    ItemTrait, Lit, LitStr, Meta, Path, PathArguments, Result, ReturnType, Token, TraitItem,
    TraitItemFn, Type, punctuated::Punctuated, spanned::Spanned,
};

/// Parsed remote interface.
#[derive(Debug)]
pub struct InterfaceDef {
    /// The original trait
    pub trait_def: ItemTrait,
    /// Trait name
    pub ident: Ident,
    /// Textual interface identity (defaults to the trait name)
    pub name: String,
    /// Interface methods in declaration order
    pub methods: Vec<MethodDef>,
}

/// Parsed interface method.
#[derive(Debug)]
pub struct MethodDef {
    /// Method name
    pub name: Ident,
    /// Parameters, excluding the receiver
    pub params: Vec<ParamDef>,
    /// Declared return type
    pub return_type: Type,
}

/// Parsed method parameter.
#[derive(Debug)]
pub struct ParamDef {
    /// Binding name
    pub name: Ident,
    /// Parameter type
    pub ty: Type,
}

impl ParamDef {
    /// Returns the type token carried in invocations.
    pub fn type_token(&self) -> String {
        type_token(&self.ty)
    }
}

/// Renders a type without the spaces `quote` puts between tokens.
pub fn type_token(ty: &Type) -> String {
    quote::quote!(#ty).to_string().replace(' ', "")
}

/// Parse an interface trait definition.
pub fn parse_interface(trait_def: &ItemTrait, attr_args: &[Meta]) -> Result<InterfaceDef> {
    let mut name = None;
    for meta in attr_args {
        match meta {
            Meta::NameValue(nv) if nv.path.is_ident("name") => {
                name = Some(expect_str(&nv.value)?.value());
            }
            other => {
                return Err(Error::new_spanned(
                    other,
                    "unknown interface attribute, expected `name = \"...\"`",
                ));
            }
        }
    }

    if !trait_def.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &trait_def.generics,
            "remote interfaces cannot be generic",
        ));
    }

    let mut methods = Vec::new();
    for item in &trait_def.items {
        match item {
            TraitItem::Fn(method) => methods.push(parse_method(method)?),
            other => {
                return Err(Error::new_spanned(
                    other,
                    "remote interfaces may only declare methods",
                ));
            }
        }
    }

    let name = match name {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::new(Span::call_site(), "interface name must not be empty"));
        }
        Some(name) => name,
        None => trait_def.ident.to_string(),
    };

    Ok(InterfaceDef {
        trait_def: trait_def.clone(),
        ident: trait_def.ident.clone(),
        name,
        methods,
    })
}

fn parse_method(method: &TraitItemFn) -> Result<MethodDef> {
    let sig = &method.sig;
    if sig.asyncness.is_none() {
        return Err(Error::new_spanned(sig, "interface methods must be async"));
    }
    if !sig.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &sig.generics,
            "interface methods cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(Error::new_spanned(
                sig,
                "interface methods must take `&self` as their first parameter",
            ));
        }
    }

    let mut params = Vec::new();
    for arg in inputs {
        let FnArg::Typed(pat_type) = arg else {
            return Err(Error::new_spanned(arg, "unexpected receiver"));
        };
        let syn::Pat::Ident(pat_ident) = &*pat_type.pat else {
            return Err(Error::new_spanned(
                &pat_type.pat,
                "Only simple parameter names are supported",
            ));
        };
        params.push(ParamDef {
            name: pat_ident.ident.clone(),
            ty: (*pat_type.ty).clone(),
        });
    }

    let return_type = match &sig.output {
        ReturnType::Type(_, ty) => (**ty).clone(),
        ReturnType::Default => {
            return Err(Error::new_spanned(
                sig,
                "interface methods must return `Result<T, E>` where `E: From<RpcError>`",
            ));
        }
    };

    Ok(MethodDef {
        name: sig.ident.clone(),
        params,
        return_type,
    })
}

/// How an annotation attribute maps onto its runtime field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `String`, empty when unset
    Text,
    /// `Option<String>`
    OptionalText,
    /// `Vec<String>` from a comma-separated list
    List,
    /// `Option<bool>`
    Flag,
    /// `Option<u64>`
    Number,
}

/// Attributes accepted by `#[service(...)]`, with their runtime field.
const SERVICE_KEYS: &[(&str, &str, FieldKind)] = &[
    ("interface_name", "interface_name", FieldKind::Text),
    ("version", "version", FieldKind::Text),
    ("group", "group", FieldKind::Text),
    ("registry", "registries", FieldKind::List),
    ("protocol", "protocols", FieldKind::List),
    ("application", "application", FieldKind::OptionalText),
    ("module", "module", FieldKind::OptionalText),
    ("provider", "provider", FieldKind::OptionalText),
    ("monitor", "monitor", FieldKind::OptionalText),
    ("scope", "scope", FieldKind::OptionalText),
    ("listener", "listener", FieldKind::OptionalText),
];

/// Attributes accepted by `#[reference(...)]` and `#[reference_setter(...)]`.
const REFERENCE_KEYS: &[(&str, &str, FieldKind)] = &[
    ("interface_name", "interface_name", FieldKind::Text),
    ("version", "version", FieldKind::Text),
    ("group", "group", FieldKind::Text),
    ("registry", "registries", FieldKind::List),
    ("consumer", "consumer", FieldKind::OptionalText),
    ("application", "application", FieldKind::OptionalText),
    ("module", "module", FieldKind::OptionalText),
    ("monitor", "monitor", FieldKind::OptionalText),
    ("url", "url", FieldKind::OptionalText),
    ("check", "check", FieldKind::Flag),
    ("timeout", "timeout", FieldKind::Number),
    ("scope", "scope", FieldKind::OptionalText),
    ("injvm", "injvm", FieldKind::Flag),
    ("listener", "listener", FieldKind::OptionalText),
];

/// One `key = value` attribute, checked against its field kind.
#[derive(Debug, Clone)]
pub struct AnnotationValue {
    /// Runtime field name
    pub field: Ident,
    /// Field kind
    pub kind: FieldKind,
    /// Literal value
    pub value: Lit,
}

/// Parsed `#[service]`, `#[reference]` or `#[reference_setter]` attribute.
#[derive(Debug, Clone, Default)]
pub struct AnnotationDef {
    /// Explicit interface, as a trait path (`interface = Greeter`)
    pub interface: Option<Path>,
    /// Remaining attributes
    pub values: Vec<AnnotationValue>,
}

/// A reference field.
#[derive(Debug)]
pub struct FieldDef {
    /// Field name
    pub name: Ident,
    /// Field visibility
    pub vis: syn::Visibility,
    /// Field type
    pub ty: Type,
    /// Reference annotation
    pub reference: AnnotationDef,
}

/// A reference setter declared on the struct.
#[derive(Debug)]
pub struct SetterDef {
    /// Setter method name
    pub name: Ident,
    /// Trait the setter accepts as `Arc<dyn Trait>`
    pub site: Path,
    /// Reference annotation
    pub reference: AnnotationDef,
}

/// Parsed component struct.
#[derive(Debug)]
pub struct ComponentDef {
    /// Struct name
    pub ident: Ident,
    /// Fully qualified class name (defaults to the struct name)
    pub class_name: String,
    /// Implemented remote interfaces, in declaration order
    pub implements: Vec<Path>,
    /// Service annotation, if the struct is a service
    pub service: Option<AnnotationDef>,
    /// Reference fields
    pub fields: Vec<FieldDef>,
    /// Reference setters
    pub setters: Vec<SetterDef>,
}

/// Parse a struct deriving `Component`.
pub fn parse_component(input: &DeriveInput) -> Result<ComponentDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "components cannot be generic",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "`Component` can only be derived for structs",
        ));
    };

    let mut class_name = None;
    let mut implements = Vec::new();
    let mut service = None;
    let mut setters = Vec::new();

    for attr in &input.attrs {
        if attr.path().is_ident("component") {
            for meta in nested_metas(attr)? {
                match &meta {
                    Meta::NameValue(nv) if nv.path.is_ident("class") => {
                        class_name = Some(expect_str(&nv.value)?.value());
                    }
                    Meta::List(list) if list.path.is_ident("implements") => {
                        let paths = list
                            .parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)?;
                        implements.extend(paths);
                    }
                    other => {
                        return Err(Error::new_spanned(
                            other,
                            "expected `class = \"...\"` or `implements(...)`",
                        ));
                    }
                }
            }
        } else if attr.path().is_ident("service") {
            if service.is_some() {
                return Err(Error::new_spanned(attr, "duplicate `service` attribute"));
            }
            service = Some(parse_annotation(attr, SERVICE_KEYS, None)?);
        } else if attr.path().is_ident("reference_setter") {
            setters.push(parse_setter(attr)?);
        }
    }

    let mut fields = Vec::new();
    for field in &data.fields {
        if let Some(def) = parse_field(field)? {
            fields.push(def);
        }
    }

    Ok(ComponentDef {
        ident: input.ident.clone(),
        class_name: class_name.unwrap_or_else(|| input.ident.to_string()),
        implements,
        service,
        fields,
        setters,
    })
}

fn parse_field(field: &Field) -> Result<Option<FieldDef>> {
    let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("reference")) else {
        return Ok(None);
    };
    let Some(name) = field.ident.clone() else {
        return Err(Error::new_spanned(
            field,
            "`reference` requires a named field",
        ));
    };
    Ok(Some(FieldDef {
        name,
        vis: field.vis.clone(),
        ty: field.ty.clone(),
        reference: parse_annotation(attr, REFERENCE_KEYS, None)?,
    }))
}

fn parse_setter(attr: &Attribute) -> Result<SetterDef> {
    let mut name = None;
    let mut site = None;
    let reference = parse_annotation(
        attr,
        REFERENCE_KEYS,
        Some(&mut |meta: &Meta| match meta {
            Meta::NameValue(nv) if nv.path.is_ident("name") => {
                let lit = expect_str(&nv.value)?;
                name = Some(lit.parse::<Ident>()?);
                Ok(true)
            }
            Meta::NameValue(nv) if nv.path.is_ident("site") => {
                site = Some(expect_path(&nv.value)?);
                Ok(true)
            }
            _ => Ok(false),
        }),
    )?;
    let Some(name) = name else {
        return Err(Error::new_spanned(attr, "`reference_setter` requires `name`"));
    };
    let Some(site) = site else {
        return Err(Error::new_spanned(
            attr,
            "`reference_setter` requires `site = Trait`",
        ));
    };
    Ok(SetterDef {
        name,
        site,
        reference,
    })
}

type ExtraKey<'a> = &'a mut dyn FnMut(&Meta) -> Result<bool>;

fn parse_annotation(
    attr: &Attribute,
    keys: &[(&str, &str, FieldKind)],
    mut extra: Option<ExtraKey<'_>>,
) -> Result<AnnotationDef> {
    let mut def = AnnotationDef::default();
    // A bare `#[reference]` carries no arguments.
    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(def);
    }
    for meta in nested_metas(attr)? {
        if let Some(extra) = extra.as_mut() {
            if extra(&meta)? {
                continue;
            }
        }
        let Meta::NameValue(nv) = &meta else {
            return Err(Error::new_spanned(&meta, "expected `key = value`"));
        };
        if nv.path.is_ident("interface") {
            def.interface = Some(expect_path(&nv.value)?);
            continue;
        }
        let Some(key) = nv.path.get_ident().map(Ident::to_string) else {
            return Err(Error::new_spanned(&nv.path, "expected an attribute name"));
        };
        let Some((_, field, kind)) = keys.iter().find(|(name, _, _)| *name == key) else {
            return Err(Error::new_spanned(
                &nv.path,
                format!("unknown attribute `{}`", key),
            ));
        };
        def.values.push(AnnotationValue {
            field: Ident::new(field, nv.path.span()),
            kind: *kind,
            value: expect_kind(&nv.value, *kind)?,
        });
    }
    Ok(def)
}

fn nested_metas(attr: &Attribute) -> Result<Punctuated<Meta, Token![,]>> {
    attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
}

fn expect_str(expr: &Expr) -> Result<LitStr> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.clone()),
        other => Err(Error::new_spanned(other, "expected a string literal")),
    }
}

fn expect_path(expr: &Expr) -> Result<Path> {
    match expr {
        Expr::Path(path) if path.qself.is_none() => Ok(path.path.clone()),
        other => Err(Error::new_spanned(other, "expected a trait path")),
    }
}

fn expect_kind(expr: &Expr, kind: FieldKind) -> Result<Lit> {
    let Expr::Lit(ExprLit { lit, .. }) = expr else {
        return Err(Error::new_spanned(expr, "expected a literal"));
    };
    match (kind, lit) {
        (FieldKind::Text | FieldKind::OptionalText | FieldKind::List, Lit::Str(_))
        | (FieldKind::Flag, Lit::Bool(_)) => Ok(lit.clone()),
        (FieldKind::Number, Lit::Int(int)) => {
            int.base10_parse::<u64>()?;
            Ok(lit.clone())
        }
        (FieldKind::Flag, _) => Err(Error::new_spanned(lit, "expected `true` or `false`")),
        (FieldKind::Number, _) => Err(Error::new_spanned(lit, "expected an integer")),
        _ => Err(Error::new_spanned(lit, "expected a string literal")),
    }
}

/// Shape of a reference field type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    /// `Option<Arc<dyn Trait>>`, carrying `dyn Trait`
    Interface(Type),
    /// `InterfaceObject` or `Option<InterfaceObject>`
    Erased,
    /// Anything else
    Concrete,
}

/// Classifies a reference field type.
pub fn field_shape(ty: &Type) -> FieldShape {
    if last_ident(ty).is_some_and(|ident| ident == "InterfaceObject") {
        return FieldShape::Erased;
    }
    let Some(inner) = single_generic(ty, "Option") else {
        return FieldShape::Concrete;
    };
    if last_ident(inner).is_some_and(|ident| ident == "InterfaceObject") {
        return FieldShape::Erased;
    }
    match single_generic(inner, "Arc") {
        Some(site) if matches!(site, Type::TraitObject(_)) => FieldShape::Interface(site.clone()),
        _ => FieldShape::Concrete,
    }
}

fn last_ident(ty: &Type) -> Option<&Ident> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|segment| &segment.ident),
        _ => None,
    }
}

fn single_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_interface_name_defaults_to_trait() {
        let item: ItemTrait = parse_quote! {
            trait Greeter {
                async fn greet(&self, name: String) -> Result<String, RpcError>;
            }
        };
        let def = parse_interface(&item, &[]).unwrap();
        assert_eq!(def.name, "Greeter");
        assert_eq!(def.methods.len(), 1);
        assert_eq!(def.methods[0].params[0].type_token(), "String");
    }

    #[test]
    fn test_interface_name_attribute() {
        let item: ItemTrait = parse_quote! {
            trait Calculator {
                async fn add(&self, a: i32, b: Vec<i32>) -> Result<i32, RpcError>;
            }
        };
        let args: Meta = parse_quote!(name = "com.acme.Calculator");
        let def = parse_interface(&item, &[args]).unwrap();
        assert_eq!(def.name, "com.acme.Calculator");
        let tokens: Vec<_> = def.methods[0].params.iter().map(ParamDef::type_token).collect();
        assert_eq!(tokens, ["i32", "Vec<i32>"]);
    }

    #[test]
    fn test_sync_method_rejected() {
        let item: ItemTrait = parse_quote! {
            trait Clock {
                fn now(&self) -> Result<u64, RpcError>;
            }
        };
        assert!(parse_interface(&item, &[]).is_err());
    }

    #[test]
    fn test_mutable_receiver_rejected() {
        let item: ItemTrait = parse_quote! {
            trait Counter {
                async fn bump(&mut self) -> Result<u64, RpcError>;
            }
        };
        assert!(parse_interface(&item, &[]).is_err());
    }

    #[test]
    fn test_missing_return_type_rejected() {
        let item: ItemTrait = parse_quote! {
            trait Sink {
                async fn push(&self, value: u32);
            }
        };
        assert!(parse_interface(&item, &[]).is_err());
    }

    #[test]
    fn test_component_defaults() {
        let input: DeriveInput = parse_quote! {
            struct Plain {
                other: u32,
            }
        };
        let def = parse_component(&input).unwrap();
        assert_eq!(def.class_name, "Plain");
        assert!(def.implements.is_empty());
        assert!(def.service.is_none());
        assert!(def.fields.is_empty());
    }

    #[test]
    fn test_component_service_and_references() {
        let input: DeriveInput = parse_quote! {
            #[component(class = "com.acme.Desk", implements(Greeter, api::Clock))]
            #[service(version = "1", registry = "east, west")]
            #[reference_setter(name = "set_clock", site = Clock, group = "g")]
            struct Desk {
                #[reference(version = "2", check = true, timeout = 500)]
                greeter: Option<Arc<dyn Greeter>>,
                other: u32,
            }
        };
        let def = parse_component(&input).unwrap();
        assert_eq!(def.class_name, "com.acme.Desk");
        assert_eq!(def.implements.len(), 2);

        let service = def.service.unwrap();
        assert_eq!(service.values.len(), 2);
        assert_eq!(service.values[1].field, "registries");
        assert_eq!(service.values[1].kind, FieldKind::List);

        assert_eq!(def.fields.len(), 1);
        assert_eq!(def.fields[0].name, "greeter");
        assert_eq!(def.fields[0].reference.values.len(), 3);

        assert_eq!(def.setters.len(), 1);
        assert_eq!(def.setters[0].name, "set_clock");
        assert_eq!(def.setters[0].reference.values[0].field, "group");
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let input: DeriveInput = parse_quote! {
            #[service(colour = "blue")]
            struct Svc;
        };
        assert!(parse_component(&input).is_err());
    }

    #[test]
    fn test_wrong_literal_kind_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Site {
                #[reference(check = "yes")]
                greeter: Option<Arc<dyn Greeter>>,
            }
        };
        assert!(parse_component(&input).is_err());
    }

    #[test]
    fn test_field_shapes() {
        let interface: Type = parse_quote!(Option<Arc<dyn Greeter>>);
        let qualified: Type = parse_quote!(Option<std::sync::Arc<dyn api::Greeter>>);
        let erased: Type = parse_quote!(Option<InterfaceObject>);
        let concrete: Type = parse_quote!(Option<Arc<GreeterImpl>>);

        assert_eq!(field_shape(&interface), FieldShape::Interface(parse_quote!(dyn Greeter)));
        assert!(matches!(field_shape(&qualified), FieldShape::Interface(_)));
        assert_eq!(field_shape(&erased), FieldShape::Erased);
        assert_eq!(field_shape(&concrete), FieldShape::Concrete);
    }
}
