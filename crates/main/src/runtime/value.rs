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
    fmt::{Debug, Formatter},
    sync::Arc,
};

use compact_str::CompactString;

use crate::runtime::{InvokeResult, RuntimeCause, TypeName};

/// A runtime value of an expression.
///
/// The builtin types are represented by the dedicated variants. Instances of
/// the host types registered in the
/// [TypeRegistry](crate::runtime::TypeRegistry) are [HostObject]s.
#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(CompactString),
    Object(HostObject),
}

impl Default for Value {
    #[inline(always)]
    fn default() -> Self {
        Self::Void
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Void, Self::Void) => true,
            (Self::Bool(this), Self::Bool(other)) => this == other,
            (Self::Int(this), Self::Int(other)) => this == other,
            (Self::Double(this), Self::Double(other)) => this == other,
            (Self::String(this), Self::String(other)) => this == other,
            (Self::Object(this), Self::Object(other)) => Arc::ptr_eq(&this.data, &other.data),
            _ => false,
        }
    }
}

impl From<()> for Value {
    #[inline(always)]
    fn from(_: ()) -> Self {
        Self::Void
    }
}

impl From<bool> for Value {
    #[inline(always)]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    #[inline(always)]
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    #[inline(always)]
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    #[inline(always)]
    fn from(value: &str) -> Self {
        Self::String(CompactString::from(value))
    }
}

impl From<String> for Value {
    #[inline(always)]
    fn from(value: String) -> Self {
        Self::String(CompactString::from(value))
    }
}

impl From<CompactString> for Value {
    #[inline(always)]
    fn from(value: CompactString) -> Self {
        Self::String(value)
    }
}

impl Value {
    /// Creates an instance of a host type.
    ///
    /// The `ty` must be the name under which the Rust type `T` is registered.
    #[inline(always)]
    pub fn object<T: Any + Send + Sync>(ty: impl Into<TypeName>, data: T) -> Self {
        Self::Object(HostObject {
            ty: ty.into(),
            data: Arc::new(data),
        })
    }

    /// Returns the runtime type of this value.
    pub fn type_name(&self) -> TypeName {
        match self {
            Self::Void => TypeName::void(),
            Self::Bool(_) => TypeName::bool(),
            Self::Int(_) => TypeName::int(),
            Self::Double(_) => TypeName::double(),
            Self::String(_) => TypeName::string(),
            Self::Object(object) => object.ty.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the numeric value, widening `int` to `double`.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    // Builtin Rust values become builtin variants, everything else is boxed
    // into a HostObject of type `ty`.
    pub(crate) fn from_rust<T: Any + Send + Sync>(value: T, ty: &TypeName) -> Self {
        let boxed: Box<dyn Any + Send + Sync> = Box::new(value);

        let boxed = match boxed.downcast::<i64>() {
            Ok(value) => return Self::Int(*value),
            Err(boxed) => boxed,
        };

        let boxed = match boxed.downcast::<f64>() {
            Ok(value) => return Self::Double(*value),
            Err(boxed) => boxed,
        };

        let boxed = match boxed.downcast::<bool>() {
            Ok(value) => return Self::Bool(*value),
            Err(boxed) => boxed,
        };

        let boxed = match boxed.downcast::<String>() {
            Ok(value) => return Self::String(CompactString::from(*value)),
            Err(boxed) => boxed,
        };

        let boxed = match boxed.downcast::<()>() {
            Ok(_) => return Self::Void,
            Err(boxed) => boxed,
        };

        Self::Object(HostObject {
            ty: ty.clone(),
            data: Arc::from(boxed),
        })
    }

    pub(crate) fn into_rust<T: Any + Clone>(self) -> Option<T> {
        fn cast<T: Any + Clone>(value: &dyn Any) -> Option<T> {
            value.downcast_ref::<T>().cloned()
        }

        match self {
            Self::Void => cast(&()),
            Self::Bool(value) => cast(&value),
            Self::Int(value) => cast(&value),
            Self::Double(value) => cast(&value),
            Self::String(value) => cast(&value.to_string()),
            Self::Object(object) => object.downcast_ref::<T>().cloned(),
        }
    }

    #[inline]
    pub(crate) fn expect_bool(&self, index: usize) -> InvokeResult<bool> {
        self.as_bool().ok_or_else(|| RuntimeCause::Argument {
            index,
            expected: TypeName::bool(),
        })
    }

    #[inline]
    pub(crate) fn expect_int(&self, index: usize) -> InvokeResult<i64> {
        self.as_int().ok_or_else(|| RuntimeCause::Argument {
            index,
            expected: TypeName::int(),
        })
    }

    #[inline]
    pub(crate) fn expect_double(&self, index: usize) -> InvokeResult<f64> {
        self.as_double().ok_or_else(|| RuntimeCause::Argument {
            index,
            expected: TypeName::double(),
        })
    }

    #[inline]
    pub(crate) fn expect_str(&self, index: usize) -> InvokeResult<&str> {
        self.as_str().ok_or_else(|| RuntimeCause::Argument {
            index,
            expected: TypeName::string(),
        })
    }
}

/// An instance of a host type.
///
/// The object is a shared reference to the Rust data. Cloning the object
/// does not clone the data.
#[derive(Clone)]
pub struct HostObject {
    ty: TypeName,
    data: Arc<dyn Any + Send + Sync>,
}

impl Debug for HostObject {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HostObject")
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

impl HostObject {
    /// The registered type of the object.
    #[inline(always)]
    pub fn ty(&self) -> &TypeName {
        &self.ty
    }

    /// Returns the object's data if it is an instance of `T`.
    #[inline(always)]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data().downcast_ref::<T>()
    }

    #[inline(always)]
    pub(crate) fn data(&self) -> &dyn Any {
        let data: &(dyn Any + Send + Sync) = &*self.data;

        data
    }
}

/// Arguments of a host member invocation.
///
/// The types of the arguments are checked at compile time against the
/// member's declared parameters. The accessor functions fail only if the
/// host function reads the arguments inconsistently with its declaration.
#[derive(Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    #[inline(always)]
    pub(crate) fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the argument at `index`.
    pub fn value(&self, index: usize) -> InvokeResult<&'a Value> {
        self.values.get(index).ok_or(RuntimeCause::Argument {
            index,
            expected: TypeName::void(),
        })
    }

    #[inline]
    pub fn bool(&self, index: usize) -> InvokeResult<bool> {
        self.value(index)?.expect_bool(index)
    }

    #[inline]
    pub fn int(&self, index: usize) -> InvokeResult<i64> {
        self.value(index)?.expect_int(index)
    }

    #[inline]
    pub fn double(&self, index: usize) -> InvokeResult<f64> {
        self.value(index)?.expect_double(index)
    }

    #[inline]
    pub fn str(&self, index: usize) -> InvokeResult<&'a str> {
        self.value(index)?.expect_str(index)
    }

    /// Returns the data of a host object argument.
    pub fn object<T: Any>(&self, index: usize) -> InvokeResult<&'a T> {
        let value = self.value(index)?;

        match value.as_object().and_then(HostObject::downcast_ref::<T>) {
            Some(data) => Ok(data),
            None => Err(RuntimeCause::Argument {
                index,
                expected: value.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{Args, RuntimeCause, TypeName, Value};

    #[derive(Clone, Debug, PartialEq)]
    struct Point(i64, i64);

    #[test]
    fn test_rust_conversions() {
        assert_eq!(Value::from_rust(5i64, &TypeName::int()), Value::Int(5));

        assert_eq!(
            Value::from_rust(String::from("foo"), &TypeName::string()),
            Value::from("foo"),
        );

        let point = Value::from_rust(Point(1, 2), &TypeName::new("Point"));

        assert_eq!(point.type_name(), TypeName::new("Point"));
        assert_eq!(point.clone().into_rust::<Point>(), Some(Point(1, 2)));
        assert_eq!(point.into_rust::<i64>(), None);

        assert_eq!(Value::Int(3).into_rust::<i64>(), Some(3));
        assert_eq!(Value::from("bar").into_rust::<String>(), Some(String::from("bar")));
        assert_eq!(Value::Void.into_rust::<()>(), Some(()));
    }

    #[test]
    fn test_args() {
        let values = [Value::Int(1), Value::from("x"), Value::object("Point", Point(0, 0))];
        let args = Args::new(&values);

        assert_eq!(args.int(0), Ok(1));
        assert_eq!(args.double(0), Ok(1.0));
        assert_eq!(args.str(1), Ok("x"));
        assert_eq!(args.object::<Point>(2), Ok(&Point(0, 0)));

        assert_eq!(
            args.bool(1),
            Err(RuntimeCause::Argument {
                index: 1,
                expected: TypeName::bool(),
            }),
        );
    }
}
