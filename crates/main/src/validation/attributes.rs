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

use ahash::AHashMap;
use compact_str::CompactString;

use crate::{
    runtime::{MemberMeta, TypeName},
    syntax::{ExprToken, Lexeme},
    validation::{rules::RuleReader, RuleError},
};

/// Documentation and parameter names of a member.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    /// The member's documentation.
    pub doc: Option<CompactString>,

    /// The names of the member's parameters.
    pub params: Option<Vec<CompactString>>,
}

/// Documentation and parameter names attached to type members for the code
/// completion.
///
/// ```text
/// Root.getProperty { doc "Returns the property."; }
/// Root.twice(int) { doc "Doubles the number."; params value; }
/// ```
///
/// An entry with a signature applies to that overload only and wins over an
/// entry without a signature. A missing entry is not an error: the
/// documentation and the parameter names declared at registration time are
/// used instead.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolAttributes {
    entries: AHashMap<(TypeName, CompactString), Vec<AttributeEntry>>,
}

#[derive(Clone, Debug, PartialEq)]
struct AttributeEntry {
    params: Option<Vec<TypeName>>,
    attributes: Attributes,
}

impl SymbolAttributes {
    /// Parses the attributes source code.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let mut result = Self::default();
        let mut reader = RuleReader::new(text);

        while !reader.is_end() {
            if reader.eat(ExprToken::Semicolon) {
                continue;
            }

            let owner = reader.type_name()?;

            reader.expect(ExprToken::Dot, "'.'")?;

            let member = reader.word("member name")?;
            let params = reader.signature()?;

            reader.expect(ExprToken::BraceOpen, "'{'")?;

            let mut attributes = Attributes::default();

            loop {
                if reader.eat(ExprToken::BraceClose) {
                    break;
                }

                if reader.eat(ExprToken::Semicolon) {
                    continue;
                }

                let key = reader.word("'doc' or 'params'")?;

                match key.string.as_str() {
                    "doc" => {
                        attributes.doc = Some(Self::parse_doc(&mut reader)?);
                    }

                    "params" => {
                        let mut names = Vec::new();

                        loop {
                            names.push(reader.word("parameter name")?.string);

                            if !reader.eat(ExprToken::Comma) {
                                break;
                            }
                        }

                        attributes.params = Some(names);
                    }

                    _ => {
                        return Err(RuleError {
                            span: key.span,
                            message: format!(
                                "Unknown attribute '{}', expected 'doc' or 'params'.",
                                key.string,
                            ),
                        });
                    }
                }

                if reader.eat(ExprToken::BraceClose) {
                    break;
                }

                reader.expect(ExprToken::Semicolon, "';' or '}'")?;
            }

            let entries = result
                .entries
                .entry((owner, member.string))
                .or_default();

            match entries.iter_mut().find(|entry| entry.params == params) {
                Some(entry) => entry.attributes = attributes,
                None => entries.push(AttributeEntry { params, attributes }),
            }
        }

        Ok(result)
    }

    fn parse_doc(reader: &mut RuleReader) -> Result<CompactString, RuleError> {
        let Some(Lexeme {
            token: ExprToken::String,
            string,
            ..
        }) = reader.peek().cloned()
        else {
            return Err(reader.error("documentation string"));
        };

        let _ = reader.next();

        Ok(crate::syntax::unescape(string.as_str()))
    }

    /// Returns the attributes declared for the `member` accessed through the
    /// `receiver` type.
    ///
    /// The entries of the receiver type are looked up first, and then the
    /// entries of the member's declaring type.
    pub fn lookup(&self, receiver: &TypeName, member: &MemberMeta) -> Option<&Attributes> {
        self.lookup_in(receiver, member)
            .or_else(|| self.lookup_in(member.owner(), member))
    }

    fn lookup_in(&self, owner: &TypeName, member: &MemberMeta) -> Option<&Attributes> {
        let entries = self
            .entries
            .get(&(owner.clone(), CompactString::from(member.name())))?;

        let qualified = entries.iter().find(|entry| match &entry.params {
            Some(params) => params.as_slice() == member.params(),
            None => false,
        });

        qualified
            .or_else(|| entries.iter().find(|entry| entry.params.is_none()))
            .map(|entry| &entry.attributes)
    }

    /// Returns the documentation of the member: the declared attribute, or
    /// the registration-time documentation.
    pub fn documentation(&self, receiver: &TypeName, member: &MemberMeta) -> Option<CompactString> {
        if let Some(doc) = self
            .lookup(receiver, member)
            .and_then(|attributes| attributes.doc.clone())
        {
            return Some(doc);
        }

        member.doc().map(CompactString::from)
    }

    /// Returns the parameter names of the member: the declared attribute, or
    /// the registration-time names.
    pub fn parameter_names(&self, receiver: &TypeName, member: &MemberMeta) -> Vec<CompactString> {
        if let Some(params) = self
            .lookup(receiver, member)
            .and_then(|attributes| attributes.params.clone())
        {
            return params;
        }

        member.param_names().to_vec()
    }

    /// Returns true if no attributes are declared.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use compact_str::CompactString;

    use crate::{
        runtime::{TypeName, TypeRegistry, Value},
        validation::SymbolAttributes,
    };

    struct Calc;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();

        registry
            .register::<Calc>("Calc", |ty| {
                ty.method("twice", TypeName::int(), |_, args| Ok(Value::Int(args.int(0)? * 2)))
                    .param("x", TypeName::int())
                    .doc("Registered doc.");

                ty.method("twice", TypeName::double(), |_, args| {
                    Ok(Value::Double(args.double(0)? * 2.0))
                })
                .param("x", TypeName::double());
            })
            .unwrap();

        registry
    }

    #[test]
    fn test_qualified_entries_win() {
        let registry = registry();
        let calc = TypeName::new("Calc");
        let members = registry.members_of(&calc);

        let attributes = SymbolAttributes::parse(
            r#"
            Calc.twice(double) { doc "Doubles a double."; params value }
            Calc.twice { doc "Doubles a number."; }
            "#,
        )
        .unwrap();

        assert_eq!(
            attributes.documentation(&calc, members[0].member()).as_deref(),
            Some("Doubles a number."),
        );

        assert_eq!(
            attributes.documentation(&calc, members[1].member()).as_deref(),
            Some("Doubles a double."),
        );

        assert_eq!(
            attributes.parameter_names(&calc, members[1].member()),
            vec![CompactString::from("value")],
        );

        assert_eq!(
            attributes.parameter_names(&calc, members[0].member()),
            vec![CompactString::from("x")],
        );
    }

    #[test]
    fn test_registration_fallback() {
        let registry = registry();
        let calc = TypeName::new("Calc");
        let members = registry.members_of(&calc);
        let attributes = SymbolAttributes::parse("").unwrap();

        assert!(attributes.is_empty());

        assert_eq!(
            attributes.documentation(&calc, members[0].member()).as_deref(),
            Some("Registered doc."),
        );

        assert_eq!(attributes.documentation(&calc, members[1].member()), None);
    }

    #[test]
    fn test_attribute_errors() {
        assert!(SymbolAttributes::parse("Calc.twice { doc 1; }").is_err());
        assert!(SymbolAttributes::parse("Calc.twice { author \"me\"; }").is_err());
        assert!(SymbolAttributes::parse("Calc.twice { doc \"x\";").is_err());
    }
}
