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

use std::fmt::{Display, Formatter};

use lady_deirdre::lexis::SiteSpan;

/// A classification of compile-time diagnostic issues.
///
/// Each [Diagnostic] object belongs to a specific class described by this
/// enum type. The Display implementation of IssueCode provides a short
/// description of the class.
///
/// The numeric representation is in the XYY decimal digits format, where X
/// represents the compilation stage that detected the issue, and YY
/// represents the issue's "sub-code" within that stage:
///
///  - 1YY: lexis, syntax, and syntax rules.
///  - 2YY: name and member resolution.
///  - 3YY: types.
///  - 4YY: symbol access rules.
///  - 5YY: internal and resource issues.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u16)]
#[non_exhaustive]
pub enum IssueCode {
    /// Syntax Error.
    ///
    /// The source code is not well-formed from a syntactical point of view.
    Parse = 101,
    /// Syntax Error.
    ///
    /// The syntax construct is not allowed by the Profile's syntax rules.
    ForbiddenSyntax = 102,
    /// Syntax Error.
    ///
    /// The syntax tree is nested deeper than the Profile's syntax rules or
    /// the engine's [max_depth](crate::engine::EngineConfig::max_depth)
    /// allow.
    DepthLimit = 103,
    /// Syntax Error.
    ///
    /// A template fragment is opened but never closed.
    UnterminatedFragment = 104,
    /// Syntax Error.
    ///
    /// Invalid integer literal format, or the value does not fit into `int`.
    IntParse = 105,
    /// Syntax Error.
    ///
    /// Invalid floating-point literal format.
    FloatParse = 106,

    /// Resolution Error.
    ///
    /// An identifier that does not correspond to any local variable, library
    /// global, or context member.
    UnresolvedIdent = 201,
    /// Resolution Error.
    ///
    /// The receiver type does not have a member with this name.
    UnknownMember = 202,
    /// Resolution Error.
    ///
    /// The type name is not known to the type registry.
    UnknownType = 203,
    /// Resolution Error.
    ///
    /// An attempt to assign to a `val` variable.
    ImmutableAssignment = 204,

    /// Type Error.
    ///
    /// The provided type is not assignable to the expected type.
    TypeMismatch = 301,
    /// Type Error.
    ///
    /// The operand types are not supported by the operator.
    UndefinedOperator = 302,
    /// Type Error.
    ///
    /// None of the method overloads accepts the provided arguments.
    NoMatchingOverload = 303,
    /// Type Error.
    ///
    /// The expression's type is not assignable to the requested result type.
    ResultMismatch = 304,

    /// Access Error.
    ///
    /// The member is denied by the Profile's symbol rules.
    DeniedSymbol = 401,

    /// Internal Error.
    ///
    /// The compiler failed to produce the expression's assembly.
    Internal = 501,
    /// Internal Error.
    ///
    /// The compilation did not finish within the deadline.
    Timeout = 502,
}

impl Display for IssueCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::Parse => "Parse error.",
            Self::ForbiddenSyntax => "Forbidden syntax.",
            Self::DepthLimit => "Expression is nested too deeply.",
            Self::UnterminatedFragment => "Unterminated template fragment.",
            Self::IntParse => "Invalid integer literal.",
            Self::FloatParse => "Invalid float literal.",

            Self::UnresolvedIdent => "Unresolved reference.",
            Self::UnknownMember => "Unknown member.",
            Self::UnknownType => "Unknown type.",
            Self::ImmutableAssignment => "Assignment to immutable variable.",

            Self::TypeMismatch => "Type mismatch.",
            Self::UndefinedOperator => "Undefined operator.",
            Self::NoMatchingOverload => "No matching overload.",
            Self::ResultMismatch => "Result type mismatch.",

            Self::DeniedSymbol => "Access denied.",

            Self::Internal => "Internal compiler error.",
            Self::Timeout => "Compilation timed out.",
        };

        formatter.write_str(message)
    }
}

impl IssueCode {
    /// Returns the numeric representation of this issue code.
    #[inline(always)]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Returns the compilation stage digit: the X in the XYY code.
    #[inline(always)]
    pub fn stage(self) -> u16 {
        self.code() / 100
    }
}

/// A single compile-time issue with its location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// The class of the issue.
    pub code: IssueCode,

    /// The source code range of the issue, in Unicode characters.
    pub span: SiteSpan,

    /// A human-readable description of the issue.
    pub message: String,
}

impl Display for Diagnostic {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "[{}] {}..{}: {}",
            self.code.code(),
            self.span.start,
            self.span.end,
            self.message,
        )
    }
}

impl Diagnostic {
    #[inline(always)]
    pub(crate) fn new(code: IssueCode, span: SiteSpan, message: impl Into<String>) -> Self {
        Self {
            code,
            span,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::{Diagnostic, IssueCode};

    #[test]
    fn test_issue_code_stages() {
        assert_eq!(IssueCode::Parse.code(), 101);
        assert_eq!(IssueCode::Parse.stage(), 1);
        assert_eq!(IssueCode::NoMatchingOverload.stage(), 3);
        assert_eq!(IssueCode::DeniedSymbol.stage(), 4);
        assert_eq!(IssueCode::Timeout.stage(), 5);
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::new(IssueCode::UnknownMember, 3..7, "Unknown member 'foo'.");

        assert_eq!(diagnostic.to_string(), "[202] 3..7: Unknown member 'foo'.");
    }
}
