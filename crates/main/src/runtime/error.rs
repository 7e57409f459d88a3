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
    error::Error as StdError,
    fmt::{Display, Formatter},
    result::Result as StdResult,
};

use lady_deirdre::lexis::SiteSpan;

use crate::{profile::NamedSource, runtime::TypeName};

/// A result of an expression's evaluation, which can either be a normal
/// value or a [RuntimeError].
pub type RuntimeResult<T> = StdResult<T, RuntimeError>;

/// A result of a single member invocation or operator.
///
/// The host functions registered through the
/// [TypeRegistry](crate::runtime::TypeRegistry) return this type. The
/// interpreter attaches the location of the failing call to the cause.
pub type InvokeResult<T> = StdResult<T, RuntimeCause>;

/// The reason of a failure during an expression's evaluation.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum RuntimeCause {
    /// An integer division or remainder by zero.
    DivisionByZero,

    /// The result of an integer operation does not fit into `int`.
    Overflow {
        /// The operation that overflowed.
        operation: &'static str,
    },

    /// The index is out of the string bounds.
    OutOfBounds {
        /// The requested index.
        index: i64,

        /// The length of the string in characters.
        length: usize,
    },

    /// The receiver object has an unexpected Rust type.
    Receiver {
        /// The declaring type of the invoked member.
        expected: TypeName,
    },

    /// The invocation argument has an unexpected type.
    Argument {
        /// The index of the argument.
        index: usize,

        /// The expected argument type.
        expected: TypeName,
    },

    /// The expression's result cannot be represented as the requested Rust
    /// type.
    Result {
        /// The type of the produced value.
        actual: TypeName,
    },

    /// A host member returned a value that is not an instance of its
    /// declared return type.
    ReturnType {
        /// The signature of the invoked member.
        member: String,

        /// The declared return type.
        expected: TypeName,

        /// The type of the returned value.
        actual: TypeName,
    },

    /// The context value cannot be represented in the expression's context
    /// type.
    Context {
        /// The context type of the compiled expression.
        expected: TypeName,
    },

    /// A host function reported an error.
    Host(String),
}

impl Display for RuntimeCause {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DivisionByZero => formatter.write_str("division by zero"),

            Self::Overflow { operation } => {
                formatter.write_fmt(format_args!("integer overflow in '{operation}' operation"))
            }

            Self::OutOfBounds { index, length } => {
                formatter.write_fmt(format_args!("index {index} out of 0..{length} bounds"))
            }

            Self::Receiver { expected } => {
                formatter.write_fmt(format_args!("receiver is not an instance of '{expected}'"))
            }

            Self::Argument { index, expected } => formatter.write_fmt(format_args!(
                "argument #{} is not an instance of '{expected}'",
                index + 1,
            )),

            Self::Result { actual } => formatter.write_fmt(format_args!(
                "'{actual}' value cannot be converted to the requested result type"
            )),

            Self::ReturnType {
                member,
                expected,
                actual,
            } => formatter.write_fmt(format_args!(
                "'{member}' returned '{actual}' instead of '{expected}'"
            )),

            Self::Context { expected } => {
                formatter.write_fmt(format_args!("context value is not an instance of '{expected}'"))
            }

            Self::Host(message) => formatter.write_str(message),
        }
    }
}

/// Represents any error that may occur during the evaluation of a compiled
/// expression.
///
/// The error refers to the expression's [NamedSource] and the range in its
/// source code where the failing operation is located.
#[derive(Clone, Debug)]
pub struct RuntimeError {
    /// The source code of the failed expression.
    pub expression: NamedSource,

    /// The source code range of the failing operation, in Unicode characters.
    pub span: SiteSpan,

    /// The reason of the failure.
    pub cause: RuntimeCause,
}

impl Display for RuntimeError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let fragment = self
            .expression
            .code
            .chars()
            .skip(self.span.start)
            .take(self.span.end.saturating_sub(self.span.start))
            .collect::<String>();

        formatter.write_fmt(format_args!(
            "{} [{}..{}] '{fragment}': {}",
            self.expression.name, self.span.start, self.span.end, self.cause,
        ))
    }
}

impl StdError for RuntimeError {}

#[cfg(test)]
mod tests {
    use crate::{
        profile::NamedSource,
        runtime::{RuntimeCause, RuntimeError},
    };

    #[test]
    fn test_runtime_error_display() {
        let error = RuntimeError {
            expression: NamedSource::new("ratio", "10 / context"),
            span: 0..12,
            cause: RuntimeCause::DivisionByZero,
        };

        assert_eq!(
            error.to_string(),
            "ratio [0..12] '10 / context': division by zero",
        );
    }
}
