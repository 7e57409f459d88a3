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
    error::Error,
    fmt::{Display, Formatter},
};

use compact_str::CompactString;
use lady_deirdre::lexis::{Site, SiteSpan};

use crate::{
    analysis::{Diagnostic, IssueCode},
    profile::NamedSource,
    runtime::TypeName,
};

/// An alias type for compilation results.
pub type CompileResult<T> = Result<T, CompileError>;

/// An error type of the expression compilation.
///
/// Each variant except [Timeout](CompileError::Timeout) aggregates all issues
/// of its compilation stage. The [diagnostics](CompileError::diagnostics)
/// function presents the issues of any variant uniformly.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum CompileError {
    /// The source code is not well-formed, or it violates the Profile's
    /// syntax rules.
    Syntax {
        source: NamedSource,
        issues: Vec<Diagnostic>,
    },

    /// Name resolution or type checking failed.
    Type {
        source: NamedSource,
        issues: Vec<TypeIssue>,
    },

    /// The expression refers to members denied by the Profile's symbol rules.
    SymbolValidation {
        source: NamedSource,
        denied: Vec<DeniedSymbol>,
    },

    /// The compiler failed for a reason unrelated to the expression's code.
    Compilation { source: NamedSource, message: String },

    /// The compilation did not finish within the deadline.
    ///
    /// Timed out compilations are not cached, so a later request with the
    /// same key starts a new compilation.
    Timeout { source: NamedSource },
}

impl Error for CompileError {}

impl Display for CompileError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let (title, source) = match self {
            Self::Syntax { source, .. } => ("Syntax error", source),
            Self::Type { source, .. } => ("Type error", source),
            Self::SymbolValidation { source, .. } => ("Access error", source),
            Self::Compilation { source, .. } => ("Compilation error", source),
            Self::Timeout { source } => ("Compilation timeout", source),
        };

        formatter.write_fmt(format_args!("{title} in '{}'.", source.name))?;

        for diagnostic in self.diagnostics() {
            formatter.write_fmt(format_args!("\n{diagnostic}"))?;
        }

        Ok(())
    }
}

impl CompileError {
    /// The source code of the failed expression.
    pub fn named_source(&self) -> &NamedSource {
        match self {
            Self::Syntax { source, .. } => source,
            Self::Type { source, .. } => source,
            Self::SymbolValidation { source, .. } => source,
            Self::Compilation { source, .. } => source,
            Self::Timeout { source } => source,
        }
    }

    /// Returns all issues of this error as uniform diagnostic records.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Syntax { issues, .. } => issues.clone(),

            Self::Type { issues, .. } => issues.iter().map(|issue| issue.diagnostic.clone()).collect(),

            Self::SymbolValidation { denied, .. } => {
                denied.iter().map(DeniedSymbol::to_diagnostic).collect()
            }

            Self::Compilation { message, .. } => {
                vec![Diagnostic::new(IssueCode::Internal, 0..0, message.clone())]
            }

            Self::Timeout { source } => {
                let end: Site = source.code.chars().count();

                vec![Diagnostic::new(
                    IssueCode::Timeout,
                    0..end,
                    "Compilation did not finish in time.",
                )]
            }
        }
    }
}

/// A name resolution or type checking issue.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeIssue {
    /// The issue's location and description.
    pub diagnostic: Diagnostic,

    /// The type required in this location, if the issue is a type mismatch.
    pub expected: Option<TypeName>,

    /// The type provided in this location, if known.
    pub actual: Option<TypeName>,
}

/// A reference to a type member denied by the Profile's symbol rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeniedSymbol {
    /// The static type of the receiver through which the member is accessed.
    pub receiver: TypeName,

    /// The type that declares the member.
    pub owner: TypeName,

    /// The member's name.
    pub member: CompactString,

    /// The member's signature: `name(type, ...)` for methods.
    pub signature: String,

    /// The source code range of the member access.
    pub span: SiteSpan,
}

impl DeniedSymbol {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(
            IssueCode::DeniedSymbol,
            self.span.clone(),
            format!(
                "Access to '{}.{}' is denied.",
                self.receiver, self.signature,
            ),
        )
    }
}

/// An error type of the code completion requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CompletionError {
    /// The cursor offset is outside of the source code text.
    Cursor(Site),

    /// The completion request could not be completed within the deadline.
    Timeout,

    /// The engine's worker serving the request has stopped.
    Disconnected,
}

impl Error for CompletionError {}

impl Display for CompletionError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cursor(site) => formatter.write_fmt(format_args!(
                "Cursor offset {site} is outside of the source code text.",
            )),

            Self::Timeout => formatter.write_str("Completion request timed out."),

            Self::Disconnected => formatter.write_str("Completion worker is not available."),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::{CompileError, DeniedSymbol, IssueCode},
        profile::NamedSource,
        runtime::TypeName,
    };

    #[test]
    fn test_denied_symbol_diagnostics() {
        let error = CompileError::SymbolValidation {
            source: NamedSource::new("rule", "context.overriddenMethod()"),
            denied: vec![DeniedSymbol {
                receiver: TypeName::new("Root"),
                owner: TypeName::new("Root"),
                member: "overriddenMethod".into(),
                signature: String::from("overriddenMethod()"),
                span: 0..26,
            }],
        };

        let diagnostics = error.diagnostics();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, IssueCode::DeniedSymbol);

        assert_eq!(
            error.to_string(),
            "Access error in 'rule'.\n[401] 0..26: Access to 'Root.overriddenMethod()' is denied.",
        );
    }
}
