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

use crate::{
    runtime::{MemberMeta, TypeName, TypeRegistry},
    syntax::ExprToken,
    validation::{
        rules::{Glob, RuleReader},
        RuleError,
        Verdict,
    },
};

/// A set of rules restricting the type members accessible from
/// expressions.
///
/// ```text
/// // Allows all members of the `Root` type and its subtypes.
/// allow Root.*;
///
/// // Denies a single member of the exact `Root` type only.
/// deny =Root.overriddenMethod;
///
/// // Allows a group of members of any type. A signature selects a single
/// // overload.
/// allow *.{toString, length, substring(int, int)};
///
/// // `*` inside a member name matches any sequence of characters.
/// allow string.is*;
/// ```
///
/// The owner pattern `TypeName` matches the receiver type and all its
/// subtypes, `=TypeName` matches the receiver type exactly, and `*` matches
/// any receiver type.
///
/// When several rules match a member access, the rule whose owner is closest
/// to the receiver type in the type hierarchy wins: the exact type is closer
/// than its direct supertype, and `*` is the least specific owner. Among
/// equally specific rules, the last one wins. If no rule matches, the access
/// is denied.
///
/// The validator is immutable and stateless. The same validator decides
/// both for the compiler and for the code completion.
///
/// The rules cover type members only. The string rendering of values in
/// concatenations and templates (the built-in formatting and the
/// [display](crate::runtime::TypeBuilder::display) hooks) is not a member
/// access and is not restricted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolValidator {
    rules: Vec<SymbolRule>,
}

#[derive(Clone, Debug, PartialEq)]
struct SymbolRule {
    verdict: Verdict,
    owner: OwnerPattern,
    member: Glob,
    params: Option<Vec<TypeName>>,
}

#[derive(Clone, Debug, PartialEq)]
enum OwnerPattern {
    Any,
    Hierarchy(TypeName),
    Exact(TypeName),
}

impl OwnerPattern {
    // The lower the value, the more specific the match.
    #[inline]
    fn specificity(&self, registry: &TypeRegistry, receiver: &TypeName) -> Option<usize> {
        match self {
            Self::Any => Some(usize::MAX),
            Self::Exact(name) if name == receiver => Some(0),
            Self::Exact(_) => None,
            Self::Hierarchy(name) => registry.distance(receiver, name),
        }
    }
}

impl SymbolRule {
    #[inline]
    fn matches_member(&self, member: &MemberMeta) -> bool {
        if !self.member.matches(member.name()) {
            return false;
        }

        match &self.params {
            None => true,
            Some(params) => params.as_slice() == member.params(),
        }
    }
}

impl SymbolValidator {
    /// A validator that allows access to every member.
    pub fn allow_all() -> Self {
        Self {
            rules: vec![SymbolRule {
                verdict: Verdict::Allow,
                owner: OwnerPattern::Any,
                member: Glob::any(),
                params: None,
            }],
        }
    }

    /// Parses the rule set source code.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let mut rules = Vec::new();
        let mut reader = RuleReader::new(text);

        while !reader.is_end() {
            if reader.eat(ExprToken::Semicolon) {
                continue;
            }

            let verdict = reader.verdict()?;

            let owner = match reader.peek_token() {
                Some(ExprToken::Mul) => {
                    let _ = reader.next();

                    OwnerPattern::Any
                }

                Some(ExprToken::Assign) => {
                    let _ = reader.next();

                    OwnerPattern::Exact(reader.type_name()?)
                }

                _ => OwnerPattern::Hierarchy(reader.type_name()?),
            };

            reader.expect(ExprToken::Dot, "'.'")?;

            match reader.eat(ExprToken::BraceOpen) {
                false => {
                    let (member, params) = Self::parse_member(&mut reader)?;

                    rules.push(SymbolRule {
                        verdict,
                        owner,
                        member,
                        params,
                    });
                }

                true => loop {
                    let (member, params) = Self::parse_member(&mut reader)?;

                    rules.push(SymbolRule {
                        verdict,
                        owner: owner.clone(),
                        member,
                        params,
                    });

                    if reader.eat(ExprToken::Comma) {
                        continue;
                    }

                    reader.expect(ExprToken::BraceClose, "',' or '}'")?;

                    break;
                },
            }

            reader.expect(ExprToken::Semicolon, "';'")?;
        }

        Ok(Self { rules })
    }

    fn parse_member(reader: &mut RuleReader) -> Result<(Glob, Option<Vec<TypeName>>), RuleError> {
        let member = reader.glob()?;
        let params = reader.signature()?;

        Ok((member, params))
    }

    /// Decides whether the `member` is accessible through a receiver of type
    /// `receiver`.
    pub fn decide(
        &self,
        registry: &TypeRegistry,
        receiver: &TypeName,
        member: &MemberMeta,
    ) -> Verdict {
        let mut best: Option<(usize, Verdict)> = None;

        for rule in &self.rules {
            if !rule.matches_member(member) {
                continue;
            }

            let Some(specificity) = rule.owner.specificity(registry, receiver) else {
                continue;
            };

            match best {
                Some((best_specificity, _)) if best_specificity < specificity => (),
                _ => best = Some((specificity, rule.verdict)),
            }
        }

        match best {
            Some((_, verdict)) => verdict,
            None => Verdict::Deny,
        }
    }

    /// Returns the number of rules in this set.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        runtime::{Symbol, TypeName, TypeRegistry, Value},
        validation::{SymbolValidator, Verdict},
    };

    struct Base;

    struct Derived {
        base: Base,
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();

        registry
            .register::<Base>("Base", |ty| {
                ty.method("foo", TypeName::int(), |_, _| Ok(Value::Int(1)));
                ty.method("bar", TypeName::int(), |_, _| Ok(Value::Int(2)));

                ty.method("bar", TypeName::int(), |_, args| Ok(Value::Int(args.int(0)?)))
                    .param("value", TypeName::int());
            })
            .unwrap();

        registry
            .register::<Derived>("Derived", |ty| {
                ty.extends::<Base>(|derived| &derived.base);
            })
            .unwrap();

        registry
    }

    fn find<'a>(symbols: &'a [Symbol], signature: &str) -> &'a Symbol {
        symbols
            .iter()
            .find(|symbol| symbol.member().signature() == signature)
            .unwrap()
    }

    #[test]
    fn test_no_match_denies() {
        let registry = registry();
        let validator = SymbolValidator::parse("").unwrap();
        let symbols = registry.members_of(&TypeName::new("Base"));

        assert_eq!(
            validator.decide(&registry, &TypeName::new("Base"), find(&symbols, "foo()").member()),
            Verdict::Deny,
        );
    }

    #[test]
    fn test_hierarchy_specificity() {
        let registry = registry();
        let derived = TypeName::new("Derived");
        let symbols = registry.members_of(&derived);

        let validator = SymbolValidator::parse(
            "allow Derived.*;
             deny Base.*;
             deny *.foo;",
        )
        .unwrap();

        // The closest owner wins regardless of the declaration order.
        assert_eq!(
            validator.decide(&registry, &derived, find(&symbols, "foo()").member()),
            Verdict::Allow,
        );

        let base = TypeName::new("Base");
        let base_symbols = registry.members_of(&base);

        assert_eq!(
            validator.decide(&registry, &base, find(&base_symbols, "bar()").member()),
            Verdict::Deny,
        );
    }

    #[test]
    fn test_exact_owner_and_signatures() {
        let registry = registry();
        let base = TypeName::new("Base");
        let derived = TypeName::new("Derived");
        let symbols = registry.members_of(&derived);

        let validator = SymbolValidator::parse(
            "allow =Base.{foo, bar(int)};
             allow Derived.bar();",
        )
        .unwrap();

        assert_eq!(
            validator.decide(&registry, &base, find(&symbols, "foo()").member()),
            Verdict::Allow,
        );

        assert_eq!(
            validator.decide(&registry, &derived, find(&symbols, "foo()").member()),
            Verdict::Deny,
        );

        assert_eq!(
            validator.decide(&registry, &derived, find(&symbols, "bar()").member()),
            Verdict::Allow,
        );

        assert_eq!(
            validator.decide(&registry, &derived, find(&symbols, "bar(int)").member()),
            Verdict::Deny,
        );
    }

    #[test]
    fn test_later_rule_wins_on_tie() {
        let registry = registry();
        let base = TypeName::new("Base");
        let symbols = registry.members_of(&base);
        let foo = find(&symbols, "foo()").member();

        let validator = SymbolValidator::parse("allow Base.foo; deny Base.f*;").unwrap();

        assert_eq!(validator.decide(&registry, &base, foo), Verdict::Deny);

        let validator = SymbolValidator::parse("deny Base.f*; allow Base.foo;").unwrap();

        assert_eq!(validator.decide(&registry, &base, foo), Verdict::Allow);
    }

    #[test]
    fn test_allow_all() {
        let registry = registry();
        let string = TypeName::string();
        let symbols = registry.members_of(&string);

        assert_eq!(
            SymbolValidator::allow_all().decide(&registry, &string, symbols[0].member()),
            Verdict::Allow,
        );
    }

    #[test]
    fn test_rule_errors() {
        assert!(SymbolValidator::parse("allow Base;").is_err());
        assert!(SymbolValidator::parse("permit Base.foo;").is_err());
        assert!(SymbolValidator::parse("allow Base.{foo, bar").is_err());

        let error = SymbolValidator::parse("allow Base.;").unwrap_err();

        assert_eq!(error.span, 11..12);
    }
}
