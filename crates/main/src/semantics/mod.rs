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

//! Name resolution, type checking and symbol gating of the parsed
//! expressions.

mod symbols;
mod tree;
mod typing;

use compact_str::CompactString;
use lady_deirdre::lexis::{Site, SiteSpan};

pub(crate) use crate::semantics::{
    symbols::gate,
    tree::{Typed, TypedKind},
    typing::{is_assignable, Checker},
};
use crate::{
    analysis::{CompileError, CompileResult, Diagnostic, IssueCode, TypeIssue},
    profile::{NamedSource, Profile},
    runtime::{TypeName, TypeRegistry},
    syntax::{
        parse_expression_within,
        split_template,
        Expr,
        ExpressionMode,
        TemplatePart,
        TemplateSyntax,
    },
};

/// The inputs of a single compilation.
pub(crate) struct Request<'a> {
    pub(crate) registry: &'a TypeRegistry,
    pub(crate) profile: &'a Profile,
    pub(crate) source: &'a NamedSource,
    pub(crate) context: &'a TypeName,
    pub(crate) result: &'a TypeName,
    pub(crate) mode: ExpressionMode,
    pub(crate) template: &'a TemplateSyntax,
    pub(crate) max_depth: usize,
}

/// A fully checked expression ready for code generation.
#[derive(Debug)]
pub(crate) struct Analysis {
    /// The Profile's header definitions, in declaration order.
    pub(crate) header: Vec<Typed>,

    /// The expression converted to the requested result type.
    pub(crate) body: Typed,

    /// The number of local variable slots, header locals included.
    pub(crate) frame: usize,
}

enum Parsed {
    Plain(Expr),
    Template(Vec<Piece>),
}

enum Piece {
    Literal { text: CompactString, span: SiteSpan },
    Fragment(Expr),
}

/// Runs every compilation stage up to code generation.
///
/// Each stage aggregates all of its issues before failing.
pub(crate) fn analyze(request: &Request) -> CompileResult<Analysis> {
    let source = request.source;

    for ty in [request.context, request.result] {
        if request.registry.contains(ty) {
            continue;
        }

        return Err(CompileError::Type {
            source: source.clone(),
            issues: vec![TypeIssue {
                diagnostic: Diagnostic::new(
                    IssueCode::UnknownType,
                    0..0,
                    format!("Type '{ty}' is not registered."),
                ),
                expected: None,
                actual: Some(ty.clone()),
            }],
        });
    }

    let parsed = parse(source, request.mode, request.template, request.max_depth)?;

    let mut issues = Vec::new();

    parsed.for_each_expr(|expr| issues.extend(request.profile.syntax().validate(expr)));

    if !issues.is_empty() {
        return Err(CompileError::Syntax {
            source: source.clone(),
            issues,
        });
    }

    let mut checker = Checker::new(request.registry, request.context.clone());

    let header = match request.profile.header() {
        Some(header) => {
            let typed = checker.check_definitions(&header.definitions);

            if checker.has_issues() {
                return Err(CompileError::Type {
                    source: header.source.clone(),
                    issues: checker.into_issues(),
                });
            }

            typed
        }

        None => Vec::new(),
    };

    let body = check_body(&mut checker, parsed, request.result, char_count(&source.code));

    let frame = checker.frame();

    let body = match body {
        Some(body) if !checker.has_issues() => body,

        _ => {
            return Err(CompileError::Type {
                source: source.clone(),
                issues: checker.into_issues(),
            });
        }
    };

    if let Some(header_source) = request.profile.header_source() {
        let denied = gate(request.registry, request.profile.symbols(), &header);

        if !denied.is_empty() {
            return Err(CompileError::SymbolValidation {
                source: header_source.clone(),
                denied,
            });
        }
    }

    let denied = gate(request.registry, request.profile.symbols(), [&body]);

    if !denied.is_empty() {
        return Err(CompileError::SymbolValidation {
            source: source.clone(),
            denied,
        });
    }

    Ok(Analysis {
        header,
        body,
        frame,
    })
}

/// Checks a stand-alone expression in the scope of the Profile's header,
/// ignoring the issues of both.
///
/// Returns None if the expression cannot be typed.
pub(crate) fn infer(
    registry: &TypeRegistry,
    profile: &Profile,
    context: &TypeName,
    expr: &Expr,
) -> Option<Typed> {
    let mut checker = Checker::new(registry, context.clone());

    if let Some(header) = profile.header() {
        let _ = checker.check_definitions(&header.definitions);
    }

    checker.check(expr)
}

impl Parsed {
    fn for_each_expr<'a>(&'a self, mut visit: impl FnMut(&'a Expr)) {
        match self {
            Self::Plain(expr) => visit(expr),

            Self::Template(pieces) => {
                for piece in pieces {
                    if let Piece::Fragment(expr) = piece {
                        visit(expr);
                    }
                }
            }
        }
    }
}

fn parse(
    source: &NamedSource,
    mode: ExpressionMode,
    syntax: &TemplateSyntax,
    max_depth: usize,
) -> CompileResult<Parsed> {
    let syntax_error = |issues| CompileError::Syntax {
        source: source.clone(),
        issues,
    };

    match mode {
        ExpressionMode::Plain => match parse_expression_within(&source.code, 0, max_depth) {
            Ok(expr) => Ok(Parsed::Plain(expr)),
            Err(diagnostic) => Err(syntax_error(vec![diagnostic])),
        },

        ExpressionMode::Template => {
            let parts = split_template(&source.code, syntax)
                .map_err(|diagnostic| syntax_error(vec![diagnostic]))?;

            let mut pieces = Vec::with_capacity(parts.len());
            let mut issues = Vec::new();

            for part in parts {
                match part {
                    TemplatePart::Literal { text, span } => {
                        pieces.push(Piece::Literal { text, span })
                    }

                    TemplatePart::Fragment { code, span } => {
                        match parse_expression_within(&code, span.start, max_depth) {
                            Ok(expr) => pieces.push(Piece::Fragment(expr)),
                            Err(diagnostic) => issues.push(diagnostic),
                        }
                    }
                }
            }

            if !issues.is_empty() {
                return Err(syntax_error(issues));
            }

            Ok(Parsed::Template(pieces))
        }
    }
}

fn check_body(
    checker: &mut Checker<'_>,
    parsed: Parsed,
    result: &TypeName,
    length: usize,
) -> Option<Typed> {
    let mut pieces = match parsed {
        Parsed::Plain(expr) => {
            let typed = checker.check(&expr)?;

            return checker.coerce(typed, result, IssueCode::ResultMismatch);
        }

        Parsed::Template(pieces) => pieces,
    };

    if let [Piece::Fragment(_)] = pieces.as_slice() {
        let Some(Piece::Fragment(expr)) = pieces.pop() else {
            return None;
        };

        let typed = checker.check(&expr)?;

        return checker.coerce(typed, result, IssueCode::ResultMismatch);
    }

    if pieces
        .iter()
        .all(|piece| matches!(piece, Piece::Literal { .. }))
    {
        let mut text = CompactString::default();

        for piece in &pieces {
            if let Piece::Literal { text: literal, .. } = piece {
                text.push_str(literal);
            }
        }

        return literal_constant(checker, text, result, 0..length);
    }

    let mut parts = Vec::with_capacity(pieces.len());
    let mut failed = false;

    for piece in pieces {
        match piece {
            Piece::Literal { text, span } => parts.push(Typed::new(
                span,
                TypeName::string(),
                TypedKind::String(text),
            )),

            Piece::Fragment(expr) => {
                let Some(typed) = checker.check(&expr) else {
                    failed = true;
                    continue;
                };

                match checker.require_display(&typed) {
                    true => parts.push(typed),
                    false => failed = true,
                }
            }
        }
    }

    if failed {
        return None;
    }

    let concat = Typed::new(0..length, TypeName::string(), TypedKind::Concat(parts));

    checker.coerce(concat, result, IssueCode::ResultMismatch)
}

// Literal-only templates are converted to the result type at compile time.
fn literal_constant(
    checker: &mut Checker<'_>,
    text: CompactString,
    result: &TypeName,
    span: SiteSpan,
) -> Option<Typed> {
    let trimmed = text.trim();

    let parsed = match result.as_str() {
        "int" => trimmed
            .parse::<i64>()
            .ok()
            .map(TypedKind::Int),

        "double" => trimmed
            .parse::<f64>()
            .ok()
            .map(TypedKind::Double),

        "bool" => match trimmed {
            "true" => Some(TypedKind::Bool(true)),
            "false" => Some(TypedKind::Bool(false)),
            _ => None,
        },

        _ => {
            let typed = Typed::new(span, TypeName::string(), TypedKind::String(text));

            return checker.coerce(typed, result, IssueCode::ResultMismatch);
        }
    };

    let Some(kind) = parsed else {
        let code = match result.as_str() {
            "int" => IssueCode::IntParse,
            "double" => IssueCode::FloatParse,
            _ => IssueCode::TypeMismatch,
        };

        checker.issue(
            code,
            span,
            format!("Template text '{trimmed}' is not a valid '{result}' value."),
            Some(result.clone()),
            Some(TypeName::string()),
        );

        return None;
    };

    Some(Typed::new(span, result.clone(), kind))
}

#[inline(always)]
fn char_count(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::{CompileError, IssueCode},
        profile::{NamedSource, Profile},
        runtime::{TypeName, TypeRegistry},
        semantics::{analyze, Request, TypedKind},
        syntax::{ExpressionMode, TemplateSyntax, MAX_DEPTH},
    };

    fn build_profile(symbols: &str, header: Option<&str>) -> Profile {
        let empty = NamedSource::new("empty", "");

        Profile::build(
            "test",
            &NamedSource::new("syntax", "default allow;"),
            &NamedSource::new("symbols", symbols),
            &empty,
            header.map(|code| NamedSource::new("header", code)),
        )
        .unwrap()
    }

    fn run(
        profile: &Profile,
        code: &str,
        result: &str,
        mode: ExpressionMode,
    ) -> Result<super::Analysis, CompileError> {
        let registry = TypeRegistry::new();
        let source = NamedSource::new("test", code);
        let context = TypeName::void();
        let result = TypeName::new(result);
        let template = TemplateSyntax::new();

        analyze(&Request {
            registry: &registry,
            profile,
            source: &source,
            context: &context,
            result: &result,
            mode,
            template: &template,
            max_depth: MAX_DEPTH,
        })
    }

    fn codes(error: &CompileError) -> Vec<u16> {
        error
            .diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.code.code())
            .collect()
    }

    #[test]
    fn test_typing() {
        let profile = build_profile("allow *.*;", None);

        let analysis = run(&profile, "1 + 2.5", "double", ExpressionMode::Plain).unwrap();
        assert_eq!(analysis.body.ty, TypeName::double());

        let analysis = run(&profile, "1 + 2", "double", ExpressionMode::Plain).unwrap();
        assert!(matches!(analysis.body.kind, TypedKind::Widen(_)));

        let analysis = run(&profile, "{ var x = 1; x = x + 1; x }", "int", ExpressionMode::Plain)
            .unwrap();
        assert_eq!(analysis.frame, 1);

        let error = run(&profile, "{ 1 + true; foo; \"a\" < 1 }", "void", ExpressionMode::Plain)
            .unwrap_err();
        assert_eq!(codes(&error), [302, 201, 302]);

        let error = run(&profile, "{ val x = 1; x = 2 }", "void", ExpressionMode::Plain)
            .unwrap_err();
        assert_eq!(codes(&error), [204]);

        let error = run(&profile, "\"a\".lenght", "int", ExpressionMode::Plain).unwrap_err();
        assert_eq!(codes(&error), [202]);
        assert!(error.to_string().contains("Did you mean 'length'?"));

        let error = run(&profile, "1.5", "int", ExpressionMode::Plain).unwrap_err();
        assert_eq!(codes(&error), [IssueCode::ResultMismatch.code()]);
    }

    #[test]
    fn test_templates() {
        let profile = build_profile("allow *.*;", None);

        let analysis = run(&profile, "${1 + 2}", "int", ExpressionMode::Template).unwrap();
        assert_eq!(analysis.body.ty, TypeName::int());

        let analysis = run(&profile, " 42 ", "int", ExpressionMode::Template).unwrap();
        assert!(matches!(analysis.body.kind, TypedKind::Int(42)));

        let analysis = run(&profile, "n = ${1}", "string", ExpressionMode::Template).unwrap();
        assert!(matches!(analysis.body.kind, TypedKind::Concat(ref parts) if parts.len() == 2));

        let error = run(&profile, "n = ${1}", "int", ExpressionMode::Template).unwrap_err();
        assert_eq!(codes(&error), [IssueCode::ResultMismatch.code()]);

        let error = run(&profile, "abc", "int", ExpressionMode::Template).unwrap_err();
        assert_eq!(codes(&error), [IssueCode::IntParse.code()]);

        let error = run(&profile, "${1 +} and ${)}", "string", ExpressionMode::Template)
            .unwrap_err();
        assert_eq!(codes(&error), [101, 101]);
    }

    #[test]
    fn test_header() {
        let header = "val base = 10; val text = \" x \".trim();";
        let profile = build_profile("allow *.*; deny string.trim;", Some(header));

        let error = run(&profile, "base + 1", "int", ExpressionMode::Plain).unwrap_err();

        let CompileError::SymbolValidation { source, denied } = error else {
            panic!("Unexpected error.");
        };

        assert_eq!(source.name, "header");
        assert_eq!(denied.len(), 1);

        let profile = build_profile("allow *.*;", Some(header));

        let analysis = run(&profile, "base + text.length", "int", ExpressionMode::Plain).unwrap();
        assert_eq!(analysis.header.len(), 2);
        assert_eq!(analysis.frame, 2);
    }
}
