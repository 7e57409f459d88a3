////////////////////////////////////////////////////////////////////////////////
// This file is part of "Ad Astra", an embeddable scripting programming       //
// language platform.                                                         //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/ad-astra/blob/master/EULA.md               //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2024 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

use std::{
    any::{type_name, Any, TypeId},
    collections::VecDeque,
    error::Error as StdError,
    fmt::{Debug, Display, Formatter},
    marker::PhantomData,
    sync::Arc,
};

use ahash::{AHashMap, AHashSet};
use compact_str::CompactString;

use crate::runtime::{
    builtins,
    member::{host_fn, Invoker, Projection, Upcast},
    Args,
    InvokeResult,
    MemberBuilder,
    MemberKind,
    MemberMeta,
    RuntimeCause,
    Symbol,
    Value,
};

/// A name of a builtin or a registered host type.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TypeName(CompactString);

impl Display for TypeName {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<&str> for TypeName {
    #[inline(always)]
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&TypeName> for TypeName {
    #[inline(always)]
    fn from(value: &TypeName) -> Self {
        value.clone()
    }
}

impl TypeName {
    #[inline(always)]
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self(name.into())
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The type of expressions that produce no value.
    #[inline(always)]
    pub fn void() -> Self {
        Self::new("void")
    }

    #[inline(always)]
    pub fn bool() -> Self {
        Self::new("bool")
    }

    #[inline(always)]
    pub fn int() -> Self {
        Self::new("int")
    }

    #[inline(always)]
    pub fn double() -> Self {
        Self::new("double")
    }

    #[inline(always)]
    pub fn string() -> Self {
        Self::new("string")
    }

    #[inline(always)]
    pub fn is_void(&self) -> bool {
        self.as_str() == "void"
    }

    #[inline(always)]
    pub fn is_numeric(&self) -> bool {
        match self.as_str() {
            "int" | "double" => true,
            _ => false,
        }
    }
}

/// An error that occurs when registering host types and library globals.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// A type with this name is already registered.
    DuplicateType(TypeName),

    /// The Rust type is already registered under another name.
    DuplicateRustType(&'static str),

    /// The Rust type is not registered.
    UnknownRustType(&'static str),

    /// A member signature refers to a type that is not registered.
    UnknownType {
        /// The signature of the member.
        member: String,

        /// The unknown type name.
        ty: TypeName,
    },

    /// A library global with this name is already registered.
    DuplicateGlobal(CompactString),
}

impl Display for RegistryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateType(name) => {
                formatter.write_fmt(format_args!("type '{name}' is already registered"))
            }

            Self::DuplicateRustType(name) => {
                formatter.write_fmt(format_args!("Rust type '{name}' is already registered"))
            }

            Self::UnknownRustType(name) => {
                formatter.write_fmt(format_args!("Rust type '{name}' is not registered"))
            }

            Self::UnknownType { member, ty } => {
                formatter.write_fmt(format_args!("member '{member}' refers to unknown type '{ty}'"))
            }

            Self::DuplicateGlobal(name) => {
                formatter.write_fmt(format_args!("global '{name}' is already registered"))
            }
        }
    }
}

impl StdError for RegistryError {}

pub(crate) type DisplayFn = Arc<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;

pub(crate) struct TypeMeta {
    pub(crate) name: TypeName,
    pub(crate) doc: Option<CompactString>,
    pub(crate) supers: Vec<SuperMeta>,
    pub(crate) members: Vec<Arc<MemberMeta>>,
    pub(crate) display: Option<DisplayFn>,
}

pub(crate) struct SuperMeta {
    pub(crate) name: TypeName,
    pub(crate) projection: Arc<dyn Projection>,
}

/// A library global object accessible by name from every expression.
#[derive(Clone, Debug)]
pub struct Global {
    name: CompactString,
    value: Value,
}

impl Global {
    #[inline(always)]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[inline(always)]
    pub fn ty(&self) -> TypeName {
        self.value.type_name()
    }

    #[inline(always)]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// The symbol table of the expression language.
///
/// The registry holds the builtin types (`void`, `bool`, `int`, `double`,
/// `string`) with their members, the host types registered explicitly
/// through the [register](Self::register) function, and the library globals
/// registered through the [library](Self::library) function.
///
/// The registry is populated once and then shared between the
/// [ExpressionEngine](crate::engine::ExpressionEngine) and the compiled
/// expressions behind an [Arc].
///
/// ```rust
/// use ad_astra_expr::runtime::{TypeName, TypeRegistry, Value};
///
/// struct Account {
///     owner: String,
///     balance: f64,
/// }
///
/// let mut registry = TypeRegistry::new();
///
/// registry
///     .register::<Account>("Account", |ty| {
///         ty.doc("A bank account.");
///
///         ty.field("balance", TypeName::double(), |account| {
///             Value::from(account.balance)
///         });
///
///         ty.method("getOwner", TypeName::string(), |account, _| {
///             Ok(Value::from(account.owner.as_str()))
///         })
///         .doc("Returns the account owner's name.");
///     })
///     .unwrap();
///
/// let members = registry.members_of(&TypeName::new("Account"));
///
/// assert_eq!(members.len(), 2);
/// assert_eq!(members[1].member().signature(), "getOwner()");
/// ```
pub struct TypeRegistry {
    types: AHashMap<TypeName, TypeMeta>,
    rust_types: AHashMap<TypeId, TypeName>,
    globals: AHashMap<CompactString, Global>,
}

impl Default for TypeRegistry {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for TypeRegistry {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let mut types = self.types.keys().collect::<Vec<_>>();

        types.sort();

        formatter
            .debug_struct("TypeRegistry")
            .field("types", &types)
            .finish_non_exhaustive()
    }
}

impl TypeRegistry {
    /// Creates a registry with the builtin types only.
    pub fn new() -> Self {
        let mut registry = Self {
            types: AHashMap::new(),
            rust_types: AHashMap::new(),
            globals: AHashMap::new(),
        };

        for meta in builtins::builtin_types() {
            let _ = registry.types.insert(meta.name.clone(), meta);
        }

        let _ = registry.rust_types.insert(TypeId::of::<()>(), TypeName::void());
        let _ = registry.rust_types.insert(TypeId::of::<bool>(), TypeName::bool());
        let _ = registry.rust_types.insert(TypeId::of::<i64>(), TypeName::int());
        let _ = registry.rust_types.insert(TypeId::of::<f64>(), TypeName::double());
        let _ = registry.rust_types.insert(TypeId::of::<String>(), TypeName::string());

        registry
    }

    /// Registers the Rust type `T` under the `name`.
    ///
    /// The `build` function declares the type's members, supertypes,
    /// documentation, and the display hook. The types referred to by the
    /// member signatures must be registered before this type (or be the type
    /// itself).
    pub fn register<T: Any + Send + Sync>(
        &mut self,
        name: &str,
        build: impl FnOnce(&mut TypeBuilder<T>),
    ) -> Result<(), RegistryError> {
        let name = TypeName::new(name);

        if self.types.contains_key(&name) {
            return Err(RegistryError::DuplicateType(name));
        }

        if self.rust_types.contains_key(&TypeId::of::<T>()) {
            return Err(RegistryError::DuplicateRustType(type_name::<T>()));
        }

        let mut builder = TypeBuilder::<T> {
            name: name.clone(),
            doc: None,
            supers: Vec::new(),
            members: Vec::new(),
            display: None,
            _marker: PhantomData,
        };

        build(&mut builder);

        let mut supers = Vec::with_capacity(builder.supers.len());

        for pending in builder.supers {
            let Some(super_name) = self.rust_types.get(&pending.id) else {
                return Err(RegistryError::UnknownRustType(pending.rust_name));
            };

            supers.push(SuperMeta {
                name: super_name.clone(),
                projection: pending.projection,
            });
        }

        for member in &builder.members {
            for ty in member.params.iter().chain(Some(&member.ret)) {
                if ty != &name && !self.types.contains_key(ty) {
                    return Err(RegistryError::UnknownType {
                        member: member.signature(),
                        ty: ty.clone(),
                    });
                }
            }
        }

        let meta = TypeMeta {
            name: name.clone(),
            doc: builder.doc,
            supers,
            members: builder.members.into_iter().map(Arc::new).collect(),
            display: builder.display,
        };

        let _ = self.types.insert(name.clone(), meta);
        let _ = self.rust_types.insert(TypeId::of::<T>(), name);

        Ok(())
    }

    /// Registers a global object accessible by `name` from every expression.
    ///
    /// The Rust type of the `instance` must be registered already.
    pub fn library<T: Any + Send + Sync>(
        &mut self,
        name: &str,
        instance: T,
    ) -> Result<(), RegistryError> {
        let name = CompactString::from(name);

        if self.globals.contains_key(&name) {
            return Err(RegistryError::DuplicateGlobal(name));
        }

        let Some(ty) = self.type_of::<T>() else {
            return Err(RegistryError::UnknownRustType(type_name::<T>()));
        };

        let value = Value::from_rust(instance, &ty);

        let _ = self.globals.insert(name.clone(), Global { name, value });

        Ok(())
    }

    /// Returns the name under which the Rust type `T` is known.
    #[inline]
    pub fn type_of<T: Any>(&self) -> Option<TypeName> {
        self.rust_types.get(&TypeId::of::<T>()).cloned()
    }

    #[inline(always)]
    pub fn contains(&self, ty: &TypeName) -> bool {
        self.types.contains_key(ty)
    }

    /// Returns the type's documentation.
    #[inline]
    pub fn doc(&self, ty: &TypeName) -> Option<&str> {
        self.types.get(ty)?.doc.as_deref()
    }

    /// Returns the direct supertypes of the type.
    pub fn supertypes(&self, ty: &TypeName) -> Vec<TypeName> {
        match self.types.get(ty) {
            Some(meta) => meta.supers.iter().map(|sup| sup.name.clone()).collect(),
            None => Vec::new(),
        }
    }

    /// Returns the global registered under the `name`.
    #[inline]
    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.get(name)
    }

    /// Lists all members available on the receiver type `ty`.
    ///
    /// The members declared by the type come first in declaration order,
    /// followed by the members inherited from the supertypes in the
    /// breadth-first order of the hierarchy. An inherited member with the
    /// same name, kind, and parameters as an already listed member is hidden.
    /// Overloads with distinct parameters are listed separately.
    ///
    /// Returns an empty list for unknown types.
    pub fn members_of(&self, ty: &TypeName) -> Vec<Symbol> {
        let mut result = Vec::<Symbol>::new();
        let mut visited = AHashSet::new();
        let mut queue = VecDeque::new();

        queue.push_back((ty.clone(), Vec::<Arc<dyn Projection>>::new()));

        while let Some((current, path)) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }

            let Some(meta) = self.types.get(&current) else {
                continue;
            };

            let shared_path = Arc::<[Arc<dyn Projection>]>::from(path.as_slice());

            for member in &meta.members {
                let hidden = result
                    .iter()
                    .any(|symbol| symbol.member.same_signature(member));

                if hidden {
                    continue;
                }

                result.push(Symbol {
                    receiver: ty.clone(),
                    member: member.clone(),
                    path: shared_path.clone(),
                });
            }

            for sup in &meta.supers {
                let mut next = path.clone();

                next.push(sup.projection.clone());

                queue.push_back((sup.name.clone(), next));
            }
        }

        result
    }

    /// Returns the number of inheritance steps from `sub` to `sup`.
    ///
    /// Returns `Some(0)` if the types are equal, and None if `sup` is not a
    /// supertype of `sub`.
    pub fn distance(&self, sub: &TypeName, sup: &TypeName) -> Option<usize> {
        let mut visited = AHashSet::new();
        let mut queue = VecDeque::new();

        queue.push_back((sub, 0));

        while let Some((current, distance)) = queue.pop_front() {
            if current == sup {
                return Some(distance);
            }

            if !visited.insert(current) {
                continue;
            }

            let Some(meta) = self.types.get(current) else {
                continue;
            };

            for super_meta in &meta.supers {
                queue.push_back((&super_meta.name, distance + 1));
            }
        }

        None
    }

    #[inline(always)]
    pub fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool {
        self.distance(sub, sup).is_some()
    }

    // The shortest chain of projections from the data of `sub` into the data
    // of `sup`. Empty if the types are equal.
    pub(crate) fn projection_path(
        &self,
        sub: &TypeName,
        sup: &TypeName,
    ) -> Option<Vec<Arc<dyn Projection>>> {
        let mut visited = AHashSet::new();
        let mut queue = VecDeque::new();

        queue.push_back((sub, Vec::<Arc<dyn Projection>>::new()));

        while let Some((current, path)) = queue.pop_front() {
            if current == sup {
                return Some(path);
            }

            if !visited.insert(current) {
                continue;
            }

            let Some(meta) = self.types.get(current) else {
                continue;
            };

            for super_meta in &meta.supers {
                let mut next = path.clone();

                next.push(super_meta.projection.clone());

                queue.push_back((&super_meta.name, next));
            }
        }

        None
    }

    /// Returns true if the values of the type can be concatenated to strings.
    pub fn implements_display(&self, ty: &TypeName) -> bool {
        match ty.as_str() {
            "bool" | "int" | "double" | "string" => true,
            _ => self.display_hook(ty).is_some(),
        }
    }

    pub(crate) fn stringify(&self, value: &Value) -> InvokeResult<CompactString> {
        match value {
            Value::Void => Ok(CompactString::default()),
            Value::Bool(value) => Ok(CompactString::from(value.to_string())),
            Value::Int(value) => Ok(CompactString::from(value.to_string())),
            Value::Double(value) => Ok(builtins::format_double(*value)),
            Value::String(value) => Ok(value.clone()),

            Value::Object(object) => {
                let display = self.display_hook(object.ty()).and_then(|hook| hook(object.data()));

                match display {
                    Some(string) => Ok(CompactString::from(string)),
                    None => Err(RuntimeCause::Host(format!(
                        "'{}' values cannot be displayed",
                        object.ty(),
                    ))),
                }
            }
        }
    }

    // The type's own hook, or the closest inherited one.
    fn display_hook(&self, ty: &TypeName) -> Option<DisplayFn> {
        let mut queue = VecDeque::from([ty]);
        let mut visited = AHashSet::new();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }

            let Some(meta) = self.types.get(current) else {
                continue;
            };

            if let Some(display) = &meta.display {
                return Some(display.clone());
            }

            for sup in &meta.supers {
                queue.push_back(&sup.name);
            }
        }

        None
    }
}

struct PendingSuper {
    id: TypeId,
    rust_name: &'static str,
    projection: Arc<dyn Projection>,
}

/// Declares a host type's members, supertypes, and documentation.
///
/// See [TypeRegistry::register].
pub struct TypeBuilder<T> {
    name: TypeName,
    doc: Option<CompactString>,
    supers: Vec<PendingSuper>,
    members: Vec<MemberMeta>,
    display: Option<DisplayFn>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> TypeBuilder<T> {
    /// The name of the type being registered.
    #[inline(always)]
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// Sets the type's documentation.
    pub fn doc(&mut self, text: &str) -> &mut Self {
        self.doc = Some(CompactString::from(text));

        self
    }

    /// Declares that this type is a subtype of the registered Rust type `B`.
    ///
    /// The `upcast` function projects the data of this type into the data of
    /// the supertype, and is used when the supertype's members are invoked
    /// on instances of this type.
    pub fn extends<B: Any + Send + Sync>(&mut self, upcast: fn(&T) -> &B) -> &mut Self {
        self.supers.push(PendingSuper {
            id: TypeId::of::<B>(),
            rust_name: type_name::<B>(),
            projection: Arc::new(Upcast { function: upcast }),
        });

        self
    }

    /// Sets the function that renders the values of this type in string
    /// concatenations and templates.
    ///
    /// The hook is trusted host code. It is not a type member, so the
    /// Profile's [SymbolValidator](crate::validation::SymbolValidator) does
    /// not restrict it: any expression allowed to concatenate a value of this
    /// type runs the hook, whether or not a `toString` member is allowed.
    /// Do not expose data through the hook that the expressions must not
    /// see. The subtypes inherit the hook unless they set their own.
    pub fn display(&mut self, hook: impl Fn(&T) -> String + Send + Sync + 'static) -> &mut Self {
        self.display = Some(Arc::new(move |data: &dyn Any| {
            data.downcast_ref::<T>().map(|data| hook(data))
        }));

        self
    }

    /// Declares a method returning a value of type `ret`.
    ///
    /// The parameters are declared through the returned [MemberBuilder].
    pub fn method(
        &mut self,
        name: &str,
        ret: impl Into<TypeName>,
        body: impl Fn(&T, Args) -> InvokeResult<Value> + Send + Sync + 'static,
    ) -> MemberBuilder<'_> {
        let invoker = Invoker::Host(host_fn::<T>(self.name.clone(), body));

        self.push_member(name, MemberKind::Method, ret.into(), invoker)
    }

    /// Declares a field of type `ty`.
    pub fn field(
        &mut self,
        name: &str,
        ty: impl Into<TypeName>,
        getter: impl Fn(&T) -> Value + Send + Sync + 'static,
    ) -> MemberBuilder<'_> {
        let invoker = Invoker::Host(host_fn::<T>(self.name.clone(), move |data, _| {
            Ok(getter(data))
        }));

        self.push_member(name, MemberKind::Field, ty.into(), invoker)
    }

    fn push_member(
        &mut self,
        name: &str,
        kind: MemberKind,
        ret: TypeName,
        invoker: Invoker,
    ) -> MemberBuilder<'_> {
        self.members.push(MemberMeta {
            owner: self.name.clone(),
            name: CompactString::from(name),
            kind,
            params: Vec::new(),
            param_names: Vec::new(),
            ret,
            doc: None,
            invoker,
        });

        let index = self.members.len() - 1;

        MemberBuilder {
            draft: &mut self.members[index],
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{MemberKind, RegistryError, RuntimeCause, TypeName, TypeRegistry, Value};

    struct Base {
        id: i64,
    }

    struct Derived {
        base: Base,
        label: String,
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();

        registry
            .register::<Base>("Base", |ty| {
                ty.field("id", TypeName::int(), |base| Value::from(base.id));

                ty.method("describe", TypeName::string(), |base, _| {
                    Ok(Value::from(format!("base #{}", base.id)))
                });

                ty.method("scale", TypeName::int(), |base, args| {
                    Ok(Value::from(base.id * args.int(0)?))
                })
                .param("factor", TypeName::int());
            })
            .unwrap();

        registry
            .register::<Derived>("Derived", |ty| {
                ty.extends::<Base>(|derived| &derived.base);

                ty.method("describe", TypeName::string(), |derived, _| {
                    Ok(Value::from(derived.label.as_str()))
                });

                ty.display(|derived| derived.label.clone());
            })
            .unwrap();

        registry
    }

    #[test]
    fn test_members_of() {
        let registry = registry();

        let members = registry
            .members_of(&TypeName::new("Derived"))
            .into_iter()
            .map(|symbol| {
                (
                    symbol.member().owner().to_string(),
                    symbol.member().signature(),
                )
            })
            .collect::<Vec<_>>();

        assert_eq!(
            members,
            vec![
                (String::from("Derived"), String::from("describe()")),
                (String::from("Base"), String::from("id")),
                (String::from("Base"), String::from("scale(int)")),
            ],
        );

        assert!(registry.members_of(&TypeName::new("Unknown")).is_empty());

        let string_members = registry.members_of(&TypeName::string());

        assert!(string_members
            .iter()
            .any(|symbol| symbol.member().name() == "length"
                && symbol.member().kind() == MemberKind::Method));
    }

    #[test]
    fn test_inherited_invocation() {
        let registry = registry();

        let derived = Value::object(
            "Derived",
            Derived {
                base: Base { id: 7 },
                label: String::from("derived"),
            },
        );

        let members = registry.members_of(&TypeName::new("Derived"));

        let scale = members
            .iter()
            .find(|symbol| symbol.member().name() == "scale")
            .unwrap();

        assert!(scale.is_inherited());
        assert_eq!(
            scale.invoke(&registry, &derived, &[Value::Int(3)]),
            Ok(Value::Int(21)),
        );

        let describe = &members[0];

        assert_eq!(
            describe.invoke(&registry, &derived, &[]),
            Ok(Value::from("derived")),
        );

        let base_scale = registry
            .members_of(&TypeName::new("Base"))
            .into_iter()
            .find(|symbol| symbol.member().name() == "scale")
            .unwrap();

        assert!(!base_scale.is_inherited());
        assert_eq!(
            base_scale.invoke(&registry, &derived, &[Value::Int(2)]),
            Ok(Value::Int(14)),
        );

        assert_eq!(
            base_scale.invoke(&registry, &Value::object("Derived", 7i64), &[Value::Int(2)]),
            Err(RuntimeCause::Receiver {
                expected: TypeName::new("Base"),
            }),
        );
        assert_eq!(registry.stringify(&derived).unwrap(), "derived");
    }

    #[test]
    fn test_hierarchy_distance() {
        let registry = registry();

        let base = TypeName::new("Base");
        let derived = TypeName::new("Derived");

        assert_eq!(registry.distance(&derived, &derived), Some(0));
        assert_eq!(registry.distance(&derived, &base), Some(1));
        assert_eq!(registry.distance(&base, &derived), None);
        assert!(registry.is_subtype(&derived, &base));
        assert!(registry.implements_display(&derived));
        assert!(!registry.implements_display(&base));
    }

    #[test]
    fn test_registration_errors() {
        let mut registry = registry();

        assert_eq!(
            registry.register::<u8>("Base", |_| ()),
            Err(RegistryError::DuplicateType(TypeName::new("Base"))),
        );

        assert!(matches!(
            registry.register::<u16>("Broken", |ty| {
                ty.method("next", "Missing", |_, _| Ok(Value::Void));
            }),
            Err(RegistryError::UnknownType { .. }),
        ));

        assert!(matches!(
            registry.library("counter", 5u32),
            Err(RegistryError::UnknownRustType(_)),
        ));

        registry
            .library(
                "base",
                Base { id: 1 },
            )
            .unwrap();

        assert_eq!(registry.global("base").unwrap().ty(), TypeName::new("Base"));

        assert!(matches!(
            registry.library("base", Base { id: 2 }),
            Err(RegistryError::DuplicateGlobal(_)),
        ));
    }
}
