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
    analysis::DeniedSymbol,
    runtime::TypeRegistry,
    semantics::tree::{Typed, TypedKind},
    validation::SymbolValidator,
};

/// Collects every member reference in the `roots` that the `validator`
/// denies, in source order.
pub(crate) fn gate<'a>(
    registry: &TypeRegistry,
    validator: &SymbolValidator,
    roots: impl IntoIterator<Item = &'a Typed>,
) -> Vec<DeniedSymbol> {
    let mut denied = Vec::new();
    let mut stack = roots.into_iter().collect::<Vec<_>>();

    stack.reverse();

    while let Some(node) = stack.pop() {
        if let TypedKind::Member { symbol, .. } = &node.kind {
            let member = symbol.member();

            if !validator
                .decide(registry, symbol.receiver(), member)
                .is_allowed()
            {
                denied.push(DeniedSymbol {
                    receiver: symbol.receiver().clone(),
                    owner: member.owner().clone(),
                    member: member.name().into(),
                    signature: member.signature(),
                    span: node.span.clone(),
                });
            }
        }

        let mut children = Vec::new();

        node.for_each_child(|child| children.push(child));

        stack.extend(children.into_iter().rev());
    }

    denied
}

#[cfg(test)]
mod tests {
    use crate::{
        runtime::{TypeName, TypeRegistry},
        semantics::{symbols::gate, typing::Checker},
        syntax::parse_expression,
        validation::SymbolValidator,
    };

    #[test]
    fn test_gate_order() {
        let registry = TypeRegistry::new();

        let validator = SymbolValidator::parse(
            "allow string.*; allow bool.*; deny string.length; deny string.trim;",
        )
        .unwrap();

        let expr = parse_expression(r#""a".trim().length + "b".isEmpty().toString().length"#, 0)
            .unwrap();

        let mut checker = Checker::new(&registry, TypeName::void());
        let typed = checker.check(&expr).unwrap();

        let denied = gate(&registry, &validator, [&typed]);

        let names = denied
            .iter()
            .map(|symbol| symbol.member.as_str())
            .collect::<Vec<_>>();

        assert_eq!(names, ["length", "trim", "length"]);
        assert_eq!(denied[1].span, 0..10);
        assert_eq!(denied[0].signature, "length");
    }
}
