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

use compact_str::CompactString;
use lady_deirdre::lexis::{Site, SiteSpan};

use crate::{
    analysis::{Closeness, CompletionError, StringEstimation},
    profile::Profile,
    runtime::{MemberKind, TypeName, TypeRegistry},
    semantics::{gate, infer, is_assignable},
    syntax::{completion_site, split, ExpressionMode, TemplatePart, TemplateSyntax},
};

/// A set of completion candidates for a cursor position.
///
/// Returned by the [Completer::complete](crate::engine::Completer::complete)
/// function.
#[derive(Clone, Debug, PartialEq)]
pub struct Completions {
    /// The cursor position the candidates were computed for, in Unicode
    /// characters.
    pub site: Site,

    /// The source code range that a selected candidate replaces.
    pub place: SiteSpan,

    /// The partially typed identifier in front of the cursor. Empty if the
    /// cursor is not adjacent to an identifier.
    pub pattern: String,

    /// The type whose members are suggested.
    pub receiver: TypeName,

    /// The result type of the expression being edited.
    pub result: TypeName,

    /// The accessible members of the receiver type, ordered by name and then
    /// by signature.
    pub items: Vec<SymbolInfo>,
}

impl Completions {
    /// Returns the [items](Self::items) ordered by their relevance, most
    /// relevant first.
    ///
    /// The candidates starting with the [pattern](Self::pattern) precede all
    /// others. Within each group, the candidates whose return type is
    /// [assignable](SymbolInfo::assignable) to the [result](Self::result)
    /// type go first, and the rest is ordered by the similarity to the
    /// pattern.
    pub fn ranked(&self) -> Vec<&SymbolInfo> {
        let mut ranked = self
            .items
            .iter()
            .map(|item| {
                let prefixed = item.name.starts_with(self.pattern.as_str());
                let closeness = match self.pattern.is_empty() {
                    true => Closeness::one(),
                    false => item.name.estimate(&self.pattern),
                };

                (prefixed, closeness, item)
            })
            .collect::<Vec<_>>();

        ranked.sort_by(|(a_prefixed, a_closeness, a), (b_prefixed, b_closeness, b)| {
            b_prefixed
                .cmp(a_prefixed)
                .then_with(|| b.assignable.cmp(&a.assignable))
                .then_with(|| b_closeness.cmp(a_closeness))
        });

        ranked.into_iter().map(|(_, _, item)| item).collect()
    }

    fn empty(
        site: Site,
        place: SiteSpan,
        pattern: String,
        receiver: TypeName,
        result: TypeName,
    ) -> Self {
        Self {
            site,
            place,
            pattern,
            receiver,
            result,
            items: Vec::new(),
        }
    }
}

/// A description of a member that the expression is allowed to access.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolInfo {
    pub name: CompactString,

    /// The member's name followed by its parameter types, such as
    /// `substring(int, int)`.
    pub signature: String,

    /// The type that declares the member.
    pub owner: TypeName,

    /// The type the member is accessed through.
    pub receiver: TypeName,

    pub return_type: TypeName,

    /// True if the [return_type](Self::return_type) is implicitly
    /// convertible to the result type of the expression being edited.
    pub assignable: bool,

    pub kind: MemberKind,

    /// The Profile's documentation of the member, or the documentation
    /// provided at the member's registration.
    pub documentation: Option<CompactString>,

    pub parameter_names: Vec<CompactString>,
}

/// Lists the members of the `receiver` type that the `profile` allows to
/// access, ordered by name and then by signature.
///
/// The [assignable](SymbolInfo::assignable) flags are unset.
pub(crate) fn member_infos(
    registry: &TypeRegistry,
    profile: &Profile,
    receiver: &TypeName,
) -> Vec<SymbolInfo> {
    let mut infos = registry
        .members_of(receiver)
        .into_iter()
        .filter(|symbol| {
            profile
                .symbols()
                .decide(registry, receiver, symbol.member())
                .is_allowed()
        })
        .map(|symbol| {
            let member = symbol.member();

            SymbolInfo {
                name: member.name().into(),
                signature: member.signature(),
                owner: member.owner().clone(),
                receiver: receiver.clone(),
                return_type: member.ret().clone(),
                assignable: false,
                kind: member.kind(),
                documentation: profile.attributes().documentation(receiver, member),
                parameter_names: profile.attributes().parameter_names(receiver, member),
            }
        })
        .collect::<Vec<_>>();

    infos.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.signature.cmp(&b.signature))
    });

    infos
}

pub(crate) struct CompletionRequest<'a> {
    pub(crate) registry: &'a TypeRegistry,
    pub(crate) profile: &'a Profile,
    pub(crate) context: &'a TypeName,
    pub(crate) result: &'a TypeName,
    pub(crate) mode: ExpressionMode,
    pub(crate) template: &'a TemplateSyntax,
    pub(crate) code: &'a str,
    pub(crate) site: Site,
}

/// Computes the completion candidates for the cursor `site` of a possibly
/// incomplete source code.
///
/// The `members` function provides the [member_infos] of a type, possibly
/// from a cache.
pub(crate) fn complete(
    request: &CompletionRequest,
    mut members: impl FnMut(&TypeName) -> Arc<[SymbolInfo]>,
) -> Result<Completions, CompletionError> {
    let site = request.site;

    if site > request.code.chars().count() {
        return Err(CompletionError::Cursor(site));
    }

    let fragment = match request.mode {
        ExpressionMode::Plain => Some((CompactString::from(request.code), 0)),

        ExpressionMode::Template => split(request.code, request.template, true)
            .ok()
            .and_then(|parts| {
                parts.into_iter().find_map(|part| match part {
                    TemplatePart::Fragment { code, span }
                        if span.start <= site && site <= span.end =>
                    {
                        Some((code, span.start))
                    }

                    _ => None,
                })
            }),
    };

    let Some((code, offset)) = fragment else {
        return Ok(Completions::empty(
            site,
            site..site,
            String::new(),
            request.context.clone(),
            request.result.clone(),
        ));
    };

    let completion = completion_site(&code, offset, site);
    let pattern = completion.pattern.to_string();
    let place = completion.place;

    let receiver = match &completion.receiver {
        Some(expr) if completion.access => {
            match infer(request.registry, request.profile, request.context, expr) {
                None => request.context.clone(),

                Some(typed) => {
                    let denied = gate(request.registry, request.profile.symbols(), [&typed]);

                    if !denied.is_empty() {
                        return Ok(Completions::empty(
                            site,
                            place,
                            pattern,
                            typed.ty,
                            request.result.clone(),
                        ));
                    }

                    typed.ty
                }
            }
        }

        _ => request.context.clone(),
    };

    let items = members(&receiver)
        .iter()
        .map(|info| {
            let mut info = info.clone();

            info.assignable = is_assignable(request.registry, &info.return_type, request.result);

            info
        })
        .collect();

    Ok(Completions {
        site,
        place,
        pattern,
        receiver,
        result: request.result.clone(),
        items,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        analysis::{
            completions::{complete, member_infos, CompletionRequest},
            CompletionError,
            Completions,
        },
        profile::{NamedSource, Profile},
        runtime::{TypeName, TypeRegistry},
        syntax::{ExpressionMode, TemplateSyntax},
    };

    fn run_with(
        code: &str,
        site: usize,
        mode: ExpressionMode,
        result: TypeName,
    ) -> Result<Completions, CompletionError> {
        let registry = TypeRegistry::new();

        let profile = Profile::build(
            "test",
            &NamedSource::new("syntax", ""),
            &NamedSource::new(
                "symbols",
                "allow string.*; deny string.substring; allow int.{abs, toString};",
            ),
            &NamedSource::new("attributes", "string.trim { doc \"Removes whitespace.\"; }"),
            None,
        )
        .unwrap();

        complete(
            &CompletionRequest {
                registry: &registry,
                profile: &profile,
                context: &TypeName::string(),
                result: &result,
                mode,
                template: &TemplateSyntax::new(),
                code,
                site,
            },
            |ty| Arc::from(member_infos(&registry, &profile, ty)),
        )
    }

    fn run(code: &str, site: usize, mode: ExpressionMode) -> Result<Completions, CompletionError> {
        run_with(code, site, mode, TypeName::string())
    }

    fn names(completions: &Completions) -> Vec<&str> {
        completions
            .items
            .iter()
            .map(|item| item.name.as_str())
            .collect()
    }

    #[test]
    fn test_completions() {
        let completions = run("context.length.", 15, ExpressionMode::Plain).unwrap();

        assert_eq!(completions.receiver, TypeName::int());
        assert_eq!(names(&completions), ["abs", "toString"]);

        let completions = run("context.tr", 10, ExpressionMode::Plain).unwrap();

        assert_eq!(completions.receiver, TypeName::string());
        assert_eq!(completions.pattern, "tr");
        assert_eq!(completions.place, 8..10);
        assert!(!names(&completions).contains(&"substring"));
        assert_eq!(completions.ranked()[0].name, "trim");

        let trim = completions
            .items
            .iter()
            .find(|item| item.name == "trim")
            .unwrap();

        assert_eq!(trim.documentation.as_deref(), Some("Removes whitespace."));

        let completions = run("context.substring(0, 1).", 24, ExpressionMode::Plain).unwrap();

        assert!(completions.items.is_empty());

        assert_eq!(
            run("context", 8, ExpressionMode::Plain),
            Err(CompletionError::Cursor(8)),
        );
    }

    #[test]
    fn test_escaped_quote_receiver() {
        let code = "\"a\\\"b\".";
        let completions = run(code, code.chars().count(), ExpressionMode::Plain).unwrap();

        assert_eq!(completions.receiver, TypeName::string());
        assert!(names(&completions).contains(&"length"));

        let code = "(\"a.b\".trim()).le";
        let completions = run(code, code.chars().count(), ExpressionMode::Plain).unwrap();

        assert_eq!(completions.receiver, TypeName::string());
        assert_eq!(completions.pattern, "le");
        assert_eq!(completions.ranked()[0].name, "length");
    }

    #[test]
    fn test_result_type_ranking() {
        let completions = run_with("context.", 8, ExpressionMode::Plain, TypeName::int()).unwrap();

        assert_eq!(completions.result, TypeName::int());

        let length = completions
            .items
            .iter()
            .find(|item| item.name == "length")
            .unwrap();

        let trim = completions
            .items
            .iter()
            .find(|item| item.name == "trim")
            .unwrap();

        assert!(length.assignable);
        assert!(!trim.assignable);

        let ranked = completions.ranked();
        let first_unassignable = ranked.iter().position(|item| !item.assignable).unwrap();

        assert!(ranked[..first_unassignable]
            .iter()
            .any(|item| item.name == "length"));
        assert!(ranked[first_unassignable..].iter().all(|item| !item.assignable));

        let completions =
            run_with("context.", 8, ExpressionMode::Plain, TypeName::string()).unwrap();

        assert_eq!(completions.ranked()[0].return_type, TypeName::string());
    }

    #[test]
    fn test_template_completions() {
        let completions = run("a ${context.", 12, ExpressionMode::Template).unwrap();

        assert_eq!(completions.receiver, TypeName::string());
        assert!(names(&completions).contains(&"length"));

        let completions = run("a ${context.length} b", 20, ExpressionMode::Template).unwrap();

        assert!(completions.items.is_empty());
    }
}
