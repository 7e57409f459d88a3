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

use std::sync::Arc;

use compact_str::{format_compact, CompactString};

use crate::runtime::{
    member::Invoker,
    ty::TypeMeta,
    InvokeResult,
    MemberKind,
    MemberMeta,
    RuntimeCause,
    TypeName,
    Value,
};

type BuiltinFn = fn(&Value, &[Value]) -> InvokeResult<Value>;

pub(crate) fn builtin_types() -> Vec<TypeMeta> {
    vec![
        builtin_type(TypeName::void(), "The type of expressions without value.", Vec::new()),
        builtin_type(TypeName::bool(), "A boolean value.", bool_members()),
        builtin_type(TypeName::int(), "A 64-bit signed integer.", int_members()),
        builtin_type(
            TypeName::double(),
            "A 64-bit floating-point number.",
            double_members(),
        ),
        builtin_type(TypeName::string(), "A Unicode string.", string_members()),
    ]
}

/// Formats a `double` so that integral values keep the fraction part: `1.0`.
pub(crate) fn format_double(value: f64) -> CompactString {
    format_compact!("{value:?}")
}

fn builtin_type(name: TypeName, doc: &str, members: Vec<Arc<MemberMeta>>) -> TypeMeta {
    TypeMeta {
        name,
        doc: Some(CompactString::from(doc)),
        supers: Vec::new(),
        members,
        display: None,
    }
}

fn method(
    owner: TypeName,
    name: &str,
    params: &[(&str, TypeName)],
    ret: TypeName,
    doc: &str,
    function: BuiltinFn,
) -> Arc<MemberMeta> {
    Arc::new(MemberMeta {
        owner,
        name: CompactString::from(name),
        kind: MemberKind::Method,
        params: params.iter().map(|(_, ty)| ty.clone()).collect(),
        param_names: params.iter().map(|(name, _)| CompactString::from(*name)).collect(),
        ret,
        doc: Some(CompactString::from(doc)),
        invoker: Invoker::Builtin(function),
    })
}

fn bool_members() -> Vec<Arc<MemberMeta>> {
    vec![method(
        TypeName::bool(),
        "toString",
        &[],
        TypeName::string(),
        "Returns \"true\" or \"false\".",
        |receiver, _| Ok(Value::from(receiver.expect_bool(0)?.to_string())),
    )]
}

fn int_members() -> Vec<Arc<MemberMeta>> {
    let int = TypeName::int;

    vec![
        method(
            int(),
            "toString",
            &[],
            TypeName::string(),
            "Returns the decimal representation of the number.",
            |receiver, _| Ok(Value::from(receiver.expect_int(0)?.to_string())),
        ),
        method(
            int(),
            "abs",
            &[],
            int(),
            "Returns the absolute value of the number.",
            |receiver, _| {
                let value = receiver.expect_int(0)?;

                match value.checked_abs() {
                    Some(value) => Ok(Value::Int(value)),
                    None => Err(RuntimeCause::Overflow { operation: "abs" }),
                }
            },
        ),
        method(
            int(),
            "toDouble",
            &[],
            TypeName::double(),
            "Converts the number to double.",
            |receiver, _| Ok(Value::Double(receiver.expect_double(0)?)),
        ),
    ]
}

fn double_members() -> Vec<Arc<MemberMeta>> {
    let double = TypeName::double;

    vec![
        method(
            double(),
            "toString",
            &[],
            TypeName::string(),
            "Returns the decimal representation of the number.",
            |receiver, _| Ok(Value::String(format_double(receiver.expect_double(0)?))),
        ),
        method(
            double(),
            "abs",
            &[],
            double(),
            "Returns the absolute value of the number.",
            |receiver, _| Ok(Value::Double(receiver.expect_double(0)?.abs())),
        ),
        method(
            double(),
            "round",
            &[],
            TypeName::int(),
            "Rounds the number to the closest integer.",
            |receiver, _| match cast::i64(receiver.expect_double(0)?.round()) {
                Ok(value) => Ok(Value::Int(value)),
                Err(_) => Err(RuntimeCause::Overflow { operation: "round" }),
            },
        ),
    ]
}

fn string_members() -> Vec<Arc<MemberMeta>> {
    let string = TypeName::string;

    vec![
        method(
            string(),
            "length",
            &[],
            TypeName::int(),
            "Returns the number of characters in the string.",
            |receiver, _| {
                let length = receiver.expect_str(0)?.chars().count();

                match cast::i64(length) {
                    Ok(length) => Ok(Value::Int(length)),
                    Err(_) => Err(RuntimeCause::Overflow { operation: "length" }),
                }
            },
        ),
        method(
            string(),
            "isEmpty",
            &[],
            TypeName::bool(),
            "Returns true if the string has no characters.",
            |receiver, _| Ok(Value::Bool(receiver.expect_str(0)?.is_empty())),
        ),
        method(
            string(),
            "toUpperCase",
            &[],
            string(),
            "Returns the string with all characters in upper case.",
            |receiver, _| Ok(Value::from(receiver.expect_str(0)?.to_uppercase())),
        ),
        method(
            string(),
            "toLowerCase",
            &[],
            string(),
            "Returns the string with all characters in lower case.",
            |receiver, _| Ok(Value::from(receiver.expect_str(0)?.to_lowercase())),
        ),
        method(
            string(),
            "trim",
            &[],
            string(),
            "Returns the string without leading and trailing whitespaces.",
            |receiver, _| Ok(Value::from(receiver.expect_str(0)?.trim())),
        ),
        method(
            string(),
            "contains",
            &[("part", string())],
            TypeName::bool(),
            "Returns true if the string contains the part.",
            |receiver, args| {
                let part = args_str(args, 0)?;

                Ok(Value::Bool(receiver.expect_str(0)?.contains(part)))
            },
        ),
        method(
            string(),
            "startsWith",
            &[("prefix", string())],
            TypeName::bool(),
            "Returns true if the string starts with the prefix.",
            |receiver, args| {
                let prefix = args_str(args, 0)?;

                Ok(Value::Bool(receiver.expect_str(0)?.starts_with(prefix)))
            },
        ),
        method(
            string(),
            "endsWith",
            &[("suffix", string())],
            TypeName::bool(),
            "Returns true if the string ends with the suffix.",
            |receiver, args| {
                let suffix = args_str(args, 0)?;

                Ok(Value::Bool(receiver.expect_str(0)?.ends_with(suffix)))
            },
        ),
        method(
            string(),
            "substring",
            &[("begin", TypeName::int()), ("end", TypeName::int())],
            string(),
            "Returns the characters from the begin index inclusive to the end \
            index exclusive.",
            substring,
        ),
        method(
            string(),
            "toString",
            &[],
            string(),
            "Returns the string itself.",
            |receiver, _| Ok(Value::from(receiver.expect_str(0)?)),
        ),
    ]
}

#[inline]
fn args_str(args: &[Value], index: usize) -> InvokeResult<&str> {
    match args.get(index) {
        Some(value) => value.expect_str(index),
        None => Err(RuntimeCause::Argument {
            index,
            expected: TypeName::string(),
        }),
    }
}

fn substring(receiver: &Value, args: &[Value]) -> InvokeResult<Value> {
    let string = receiver.expect_str(0)?;
    let length = string.chars().count();

    let index = |position: usize| -> InvokeResult<usize> {
        let value = match args.get(position) {
            Some(value) => value.expect_int(position)?,
            None => {
                return Err(RuntimeCause::Argument {
                    index: position,
                    expected: TypeName::int(),
                })
            }
        };

        match cast::usize(value) {
            Ok(index) if index <= length => Ok(index),
            _ => Err(RuntimeCause::OutOfBounds {
                index: value,
                length,
            }),
        }
    };

    let begin = index(0)?;
    let end = index(1)?;

    if begin > end {
        return Err(RuntimeCause::OutOfBounds {
            index: begin as i64,
            length: end,
        });
    }

    Ok(Value::from(
        string
            .chars()
            .skip(begin)
            .take(end - begin)
            .collect::<String>(),
    ))
}

#[cfg(test)]
mod tests {
    use crate::runtime::{builtins::format_double, RuntimeCause, TypeName, TypeRegistry, Value};

    fn invoke(ty: TypeName, name: &str, receiver: Value, args: &[Value]) -> Result<Value, RuntimeCause> {
        let registry = TypeRegistry::new();

        let symbol = registry
            .members_of(&ty)
            .into_iter()
            .find(|symbol| symbol.member().name() == name)
            .unwrap();

        symbol.invoke(&registry, &receiver, args)
    }

    #[test]
    fn test_string_members() {
        assert_eq!(
            invoke(TypeName::string(), "length", Value::from("héllo"), &[]),
            Ok(Value::Int(5)),
        );

        assert_eq!(
            invoke(
                TypeName::string(),
                "substring",
                Value::from("property"),
                &[Value::Int(0), Value::Int(4)],
            ),
            Ok(Value::from("prop")),
        );

        assert_eq!(
            invoke(
                TypeName::string(),
                "substring",
                Value::from("abc"),
                &[Value::Int(1), Value::Int(9)],
            ),
            Err(RuntimeCause::OutOfBounds {
                index: 9,
                length: 3,
            }),
        );

        assert_eq!(
            invoke(
                TypeName::string(),
                "startsWith",
                Value::from("property"),
                &[Value::from("prop")],
            ),
            Ok(Value::Bool(true)),
        );
    }

    #[test]
    fn test_numeric_members() {
        assert_eq!(
            invoke(TypeName::double(), "round", Value::Double(42.42), &[]),
            Ok(Value::Int(42)),
        );

        assert_eq!(
            invoke(TypeName::int(), "abs", Value::Int(i64::MIN), &[]),
            Err(RuntimeCause::Overflow { operation: "abs" }),
        );

        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(42.42), "42.42");
    }
}
