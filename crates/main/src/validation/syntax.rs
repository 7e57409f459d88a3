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

use compact_str::CompactString;

use crate::{
    analysis::{Diagnostic, IssueCode},
    syntax::{BinaryOp, Expr, ExprToken, SyntaxKind, UnaryOp},
    validation::{rules::RuleReader, RuleError, Verdict},
};

/// A set of rules restricting the shape of the expression's syntax tree.
///
/// The rules are written in a small declarative language:
///
/// ```text
/// // The verdict for the nodes that no rule matches. Deny when omitted.
/// default deny;
///
/// // Allows literals, identifiers, and member access.
/// allow literal, ident, context, select, call;
///
/// // Allows binary nodes with the listed operators only.
/// allow binary(+, -, *, /, ==, !=);
///
/// // `*` matches any syntax kind.
/// deny *(%);
///
/// // Limits the nesting depth of the syntax tree.
/// limit depth 16;
/// ```
///
/// The available syntax kinds are `literal`, `ident`, `context`, `select`,
/// `call`, `unary`, `binary`, `if`, `block`, `val` (both `val` and `var`
/// definitions), `assign`, and `while`.
///
/// When several rules match a node, the last one wins.
///
/// The validator is immutable and stateless.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxValidator {
    default: Verdict,
    rules: Vec<SyntaxRule>,
    depth: Option<usize>,
}

impl Default for SyntaxValidator {
    #[inline(always)]
    fn default() -> Self {
        Self::deny_all()
    }
}

#[derive(Clone, Debug, PartialEq)]
struct SyntaxRule {
    verdict: Verdict,
    kind: Option<SyntaxKind>,
    ops: Option<Vec<CompactString>>,
}

impl SyntaxRule {
    #[inline]
    fn matches(&self, expr: &Expr) -> bool {
        if let Some(kind) = self.kind {
            if kind != expr.syntax_kind() {
                return false;
            }
        }

        let Some(ops) = &self.ops else {
            return true;
        };

        match expr.operator() {
            Some(operator) => ops.iter().any(|op| *op == operator),
            None => false,
        }
    }
}

impl SyntaxValidator {
    /// A validator that allows every syntax construct.
    #[inline(always)]
    pub fn allow_all() -> Self {
        Self {
            default: Verdict::Allow,
            rules: Vec::new(),
            depth: None,
        }
    }

    /// A validator that denies every syntax construct.
    #[inline(always)]
    pub fn deny_all() -> Self {
        Self {
            default: Verdict::Deny,
            rules: Vec::new(),
            depth: None,
        }
    }

    /// Parses the rule set source code.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let mut validator = Self::deny_all();
        let mut reader = RuleReader::new(text);

        while !reader.is_end() {
            if reader.eat(ExprToken::Semicolon) {
                continue;
            }

            let head = reader.word("rule")?;

            match head.string.as_str() {
                "default" => {
                    validator.default = reader.verdict()?;
                }

                "limit" => {
                    let what = reader.word("'depth'")?;

                    if what.string != "depth" {
                        return Err(RuleError {
                            span: what.span,
                            message: format!("Unknown limit '{}'.", what.string),
                        });
                    }

                    let Some(value) = reader.next() else {
                        return Err(reader.error("depth value"));
                    };

                    let depth = match value.token {
                        ExprToken::Int => value.string.parse::<usize>().ok(),
                        _ => None,
                    };

                    match depth {
                        Some(depth) if depth > 0 => validator.depth = Some(depth),

                        _ => {
                            return Err(RuleError {
                                span: value.span,
                                message: String::from("Expected a positive integer depth."),
                            });
                        }
                    }
                }

                "allow" | "deny" => {
                    let verdict = match head.string.as_str() {
                        "allow" => Verdict::Allow,
                        _ => Verdict::Deny,
                    };

                    loop {
                        validator.rules.push(Self::parse_rule(&mut reader, verdict)?);

                        if !reader.eat(ExprToken::Comma) {
                            break;
                        }
                    }
                }

                _ => {
                    return Err(RuleError {
                        span: head.span,
                        message: format!(
                            "Unexpected '{}', expected 'default', 'allow', 'deny', or 'limit'.",
                            head.string,
                        ),
                    });
                }
            }

            reader.expect(ExprToken::Semicolon, "';'")?;
        }

        Ok(validator)
    }

    fn parse_rule(reader: &mut RuleReader, verdict: Verdict) -> Result<SyntaxRule, RuleError> {
        let kind = match reader.eat(ExprToken::Mul) {
            true => None,

            false => {
                let word = reader.word("syntax kind")?;

                match SyntaxKind::from_name(word.string.as_str()) {
                    Some(kind) => Some(kind),

                    None => {
                        return Err(RuleError {
                            span: word.span,
                            message: format!("Unknown syntax kind '{}'.", word.string),
                        });
                    }
                }
            }
        };

        if !reader.eat(ExprToken::ParenOpen) {
            return Ok(SyntaxRule {
                verdict,
                kind,
                ops: None,
            });
        }

        match kind {
            None | Some(SyntaxKind::Unary) | Some(SyntaxKind::Binary) => (),

            Some(kind) => {
                return Err(reader.error(&format!("';' or ',' since '{kind}' has no operators")));
            }
        }

        let mut ops = Vec::new();

        loop {
            let Some(op) = reader.next() else {
                return Err(reader.error("operator"));
            };

            let known = BinaryOp::ALL
                .iter()
                .any(|known| known.as_str() == op.string)
                || [UnaryOp::Neg, UnaryOp::Not]
                    .iter()
                    .any(|known| known.as_str() == op.string);

            if !known {
                return Err(RuleError {
                    span: op.span,
                    message: format!("Unknown operator '{}'.", op.string),
                });
            }

            ops.push(op.string);

            if reader.eat(ExprToken::Comma) {
                continue;
            }

            reader.expect(ExprToken::ParenClose, "',' or ')'")?;

            break;
        }

        Ok(SyntaxRule {
            verdict,
            kind,
            ops: Some(ops),
        })
    }

    /// Returns the verdict for a single syntax node, ignoring its children.
    pub fn verdict(&self, expr: &Expr) -> Verdict {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(expr))
            .map(|rule| rule.verdict)
            .unwrap_or(self.default)
    }

    /// Checks every node of the syntax tree.
    ///
    /// Returns a diagnostic for each denied node in source order, and at most
    /// one diagnostic for the depth limit violation. An empty result means the
    /// tree is allowed.
    pub fn validate(&self, root: &Expr) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut depth_reported = false;
        let mut stack = vec![(root, 1usize)];

        while let Some((expr, depth)) = stack.pop() {
            if let Some(limit) = self.depth {
                if depth > limit && !depth_reported {
                    depth_reported = true;

                    diagnostics.push(Diagnostic::new(
                        IssueCode::DepthLimit,
                        expr.span.clone(),
                        format!("Expression nesting exceeds the depth limit of {limit}."),
                    ));
                }
            }

            if !self.verdict(expr).is_allowed() {
                let message = match expr.operator() {
                    Some(op) => format!(
                        "'{}' syntax with '{op}' operator is not allowed.",
                        expr.syntax_kind(),
                    ),

                    None => format!("'{}' syntax is not allowed.", expr.syntax_kind()),
                };

                diagnostics.push(Diagnostic::new(
                    IssueCode::ForbiddenSyntax,
                    expr.span.clone(),
                    message,
                ));
            }

            let mut children = Vec::new();

            expr.for_each_child(|child| children.push(child));

            for child in children.into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::IssueCode,
        syntax::parse_expression,
        validation::{SyntaxValidator, Verdict},
    };

    #[test]
    fn test_default_deny() {
        let validator = SyntaxValidator::parse("allow literal;").unwrap();

        let expr = parse_expression("1 + 2", 0).unwrap();

        let diagnostics = validator.validate(&expr);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, IssueCode::ForbiddenSyntax);
        assert_eq!(diagnostics[0].span, 0..5);
        assert!(validator.validate(&parse_expression("1", 0).unwrap()).is_empty());
    }

    #[test]
    fn test_operator_rules() {
        let validator = SyntaxValidator::parse(
            "default allow;
             deny binary;
             allow binary(+, -);",
        )
        .unwrap();

        let expr = parse_expression("1 + 2 * 3 - 4 % 2", 0).unwrap();

        let spans = validator
            .validate(&expr)
            .into_iter()
            .map(|diagnostic| diagnostic.span)
            .collect::<Vec<_>>();

        assert_eq!(spans, vec![4..9, 12..17]);
    }

    #[test]
    fn test_last_rule_wins() {
        let expr = parse_expression("context.foo", 0).unwrap();

        let validator = SyntaxValidator::parse("allow *; deny select;").unwrap();

        assert_eq!(validator.verdict(&expr), Verdict::Deny);

        let validator = SyntaxValidator::parse("deny select; allow *;").unwrap();

        assert_eq!(validator.verdict(&expr), Verdict::Allow);
    }

    #[test]
    fn test_keyword_kinds() {
        let validator = SyntaxValidator::parse("default allow; deny if, while, val;").unwrap();

        let expr = parse_expression("{ val x = 1; if (true) x else 2 }", 0).unwrap();

        assert_eq!(validator.validate(&expr).len(), 2);
    }

    #[test]
    fn test_depth_limit() {
        let validator = SyntaxValidator::parse("default allow; limit depth 2;").unwrap();

        assert!(validator.validate(&parse_expression("1 + 2", 0).unwrap()).is_empty());

        let diagnostics = validator.validate(&parse_expression("1 + 2 * 3", 0).unwrap());

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, IssueCode::DepthLimit);
    }

    #[test]
    fn test_rule_errors() {
        let error = SyntaxValidator::parse("allow lambda;").unwrap_err();

        assert_eq!(error.span, 6..12);

        assert!(SyntaxValidator::parse("allow literal").is_err());
        assert!(SyntaxValidator::parse("allow call(+);").is_err());
        assert!(SyntaxValidator::parse("allow binary(<<);").is_err());
        assert!(SyntaxValidator::parse("limit depth 0;").is_err());
    }
}
