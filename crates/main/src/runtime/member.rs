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
    any::Any,
    fmt::{Debug, Display, Formatter},
    sync::Arc,
};

use compact_str::CompactString;

use crate::runtime::{Args, InvokeResult, RuntimeCause, TypeName, TypeRegistry, Value};

/// A kind of type member.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum MemberKind {
    /// A method invoked with an argument list: `receiver.method(args)`.
    Method,

    /// A field read without arguments: `receiver.field`.
    Field,
}

impl Display for MemberKind {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Method => formatter.write_str("method"),
            Self::Field => formatter.write_str("field"),
        }
    }
}

/// Metadata of a method or a field declared by a type.
pub struct MemberMeta {
    pub(crate) owner: TypeName,
    pub(crate) name: CompactString,
    pub(crate) kind: MemberKind,
    pub(crate) params: Vec<TypeName>,
    pub(crate) param_names: Vec<CompactString>,
    pub(crate) ret: TypeName,
    pub(crate) doc: Option<CompactString>,
    pub(crate) invoker: Invoker,
}

impl Debug for MemberMeta {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MemberMeta")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("ret", &self.ret)
            .finish_non_exhaustive()
    }
}

impl MemberMeta {
    /// The type that declares this member.
    #[inline(always)]
    pub fn owner(&self) -> &TypeName {
        &self.owner
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[inline(always)]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// The declared parameter types. Fields have no parameters.
    #[inline(always)]
    pub fn params(&self) -> &[TypeName] {
        &self.params
    }

    /// Parameter names declared at registration time.
    ///
    /// The list is either empty or as long as [params](Self::params).
    #[inline(always)]
    pub fn param_names(&self) -> &[CompactString] {
        &self.param_names
    }

    /// The declared return type.
    #[inline(always)]
    pub fn ret(&self) -> &TypeName {
        &self.ret
    }

    /// Documentation declared at registration time.
    #[inline(always)]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Returns `name(type, type)` for methods, and `name` for fields.
    pub fn signature(&self) -> String {
        match self.kind {
            MemberKind::Field => self.name.to_string(),

            MemberKind::Method => {
                let params = self
                    .params
                    .iter()
                    .map(TypeName::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");

                format!("{}({params})", self.name)
            }
        }
    }

    #[inline(always)]
    pub(crate) fn same_signature(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name && self.params == other.params
    }
}

pub(crate) type HostFn = Arc<dyn Fn(&dyn Any, &[Value]) -> InvokeResult<Value> + Send + Sync>;

pub(crate) enum Invoker {
    Builtin(fn(&Value, &[Value]) -> InvokeResult<Value>),
    Host(HostFn),
}

/// A projection of a subtype's data into its supertype's data.
pub(crate) trait Projection: Send + Sync + 'static {
    fn project<'a>(&self, data: &'a dyn Any) -> Option<&'a dyn Any>;
}

pub(crate) struct Upcast<T: 'static, B: 'static> {
    pub(crate) function: fn(&T) -> &B,
}

impl<T: Any, B: Any> Projection for Upcast<T, B> {
    #[inline]
    fn project<'a>(&self, data: &'a dyn Any) -> Option<&'a dyn Any> {
        let data = data.downcast_ref::<T>()?;

        Some((self.function)(data))
    }
}

/// A member resolved for a particular receiver type.
///
/// A symbol refers to a member declared either by the receiver type itself,
/// or by one of its supertypes.
#[derive(Clone)]
pub struct Symbol {
    pub(crate) receiver: TypeName,
    pub(crate) member: Arc<MemberMeta>,
    pub(crate) path: Arc<[Arc<dyn Projection>]>,
}

impl Debug for Symbol {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Symbol")
            .field("receiver", &self.receiver)
            .field("member", &self.member)
            .finish()
    }
}

impl PartialEq for Symbol {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.receiver == other.receiver && Arc::ptr_eq(&self.member, &other.member)
    }
}

impl Eq for Symbol {}

impl Symbol {
    /// The type through which the member is accessed.
    #[inline(always)]
    pub fn receiver(&self) -> &TypeName {
        &self.receiver
    }

    /// The member's declaration.
    #[inline(always)]
    pub fn member(&self) -> &MemberMeta {
        &self.member
    }

    /// Returns true if the member is declared by a supertype of the receiver.
    #[inline(always)]
    pub fn is_inherited(&self) -> bool {
        !self.path.is_empty()
    }

    /// Calls the member on the `receiver` value.
    ///
    /// A host object whose runtime type differs from the symbol's receiver
    /// type (a subtype value behind an upcast) is projected into the
    /// member's owner type through the `registry` hierarchy.
    pub(crate) fn invoke(
        &self,
        registry: &TypeRegistry,
        receiver: &Value,
        args: &[Value],
    ) -> InvokeResult<Value> {
        match &self.member.invoker {
            Invoker::Builtin(function) => function(receiver, args),

            Invoker::Host(function) => {
                let receiver_error = || RuntimeCause::Receiver {
                    expected: self.member.owner.clone(),
                };

                let Some(object) = receiver.as_object() else {
                    return Err(receiver_error());
                };

                let mut data = object.data();

                if object.ty() == &self.receiver {
                    for projection in self.path.iter() {
                        data = projection.project(data).ok_or_else(receiver_error)?;
                    }

                    return function(data, args);
                }

                let path = registry
                    .projection_path(object.ty(), &self.member.owner)
                    .ok_or_else(receiver_error)?;

                for projection in &path {
                    data = projection.project(data).ok_or_else(receiver_error)?;
                }

                function(data, args)
            }
        }
    }
}

/// Builds metadata of a host type member.
///
/// Returned by the [TypeBuilder](crate::runtime::TypeBuilder) member
/// registration functions.
pub struct MemberBuilder<'a> {
    pub(crate) draft: &'a mut MemberMeta,
}

impl<'a> MemberBuilder<'a> {
    /// Declares the next method parameter.
    pub fn param(self, name: &str, ty: impl Into<TypeName>) -> Self {
        self.draft.params.push(ty.into());
        self.draft.param_names.push(CompactString::from(name));

        self
    }

    /// Sets the member's documentation.
    pub fn doc(self, text: &str) -> Self {
        self.draft.doc = Some(CompactString::from(text));

        self
    }
}

// Reads the host receiver of a member declared by `T`.
#[inline]
pub(crate) fn host_fn<T: Any>(
    owner: TypeName,
    body: impl Fn(&T, Args) -> InvokeResult<Value> + Send + Sync + 'static,
) -> HostFn {
    Arc::new(move |data: &dyn Any, args: &[Value]| {
        let Some(receiver) = data.downcast_ref::<T>() else {
            return Err(RuntimeCause::Receiver {
                expected: owner.clone(),
            });
        };

        body(receiver, Args::new(args))
    })
}
