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
use lady_deirdre::{
    lexis::{Site, SiteSpan, SourceCode, ToSite, TokenCursor, TokenRef},
    syntax::{NodeRef, PolyRef, SyntaxError, SyntaxTree},
    units::ImmutableUnit,
};

use crate::{
    analysis::{Diagnostic, IssueCode},
    report::system_panic,
    syntax::{
        ast::{BinaryOp, Expr, ExprKind, Name, UnaryOp},
        expr::PARSER_DEPTH,
        node::ExprNode,
        token::ExprToken,
    },
};

pub(crate) type ExprUnit = ImmutableUnit<ExprNode>;

/// The default nesting limit of the expression syntax tree.
///
/// See [EngineConfig::max_depth](crate::engine::EngineConfig::max_depth).
pub const MAX_DEPTH: usize = 128;

/// A `val` or `var` definition of a Profile header.
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub mutable: bool,
    pub name: Name,
    pub value: Expr,
    pub span: SiteSpan,
}

/// Parses `text` as a single expression.
///
/// The `offset` is added to every span, so that the spans of template
/// fragments refer to the full template text.
///
/// Returns the leftmost syntax error if the text is not well-formed, or an
/// [IssueCode::DepthLimit] diagnostic if the expression is nested deeper
/// than [MAX_DEPTH].
#[inline(always)]
pub fn parse_expression(text: &str, offset: Site) -> Result<Expr, Diagnostic> {
    parse_expression_within(text, offset, MAX_DEPTH)
}

/// Parses `text` as a single expression nested no deeper than `max_depth`.
///
/// Values of `max_depth` above the parser's own nesting ceiling are
/// clamped.
pub fn parse_expression_within(
    text: &str,
    offset: Site,
    max_depth: usize,
) -> Result<Expr, Diagnostic> {
    let unit = ExprUnit::from(text);
    let mut lowering = Lowering::new(&unit, offset, max_depth);

    lowering.check_errors()?;

    let statements = lowering.root_statements();

    let Some(first) = statements.first() else {
        return Err(lowering.eoi("Unexpected end of input, expected expression."));
    };

    let (expr, end) = lowering.clause(first)?;

    if let Some(end) = end {
        return Err(Diagnostic::new(
            IssueCode::Parse,
            end,
            "Unexpected ';', expected end of input.",
        ));
    }

    if let Some(second) = statements.get(1) {
        let (next, _) = lowering.clause(second)?;

        return Err(Diagnostic::new(
            IssueCode::Parse,
            next.span,
            "Unexpected statement, expected end of input.",
        ));
    }

    Ok(expr)
}

/// Parses `text` as a sequence of `val name = expr;` and `var name = expr;`
/// definitions.
pub fn parse_definitions(text: &str, offset: Site) -> Result<Vec<Definition>, Diagnostic> {
    let unit = ExprUnit::from(text);
    let mut lowering = Lowering::new(&unit, offset, MAX_DEPTH);

    lowering.check_errors()?;

    let statements = lowering.root_statements();
    let mut definitions = Vec::with_capacity(statements.len());

    for statement in &statements {
        let (expr, end) = lowering.clause(statement)?;

        let ExprKind::Define {
            mutable,
            name,
            value,
        } = expr.kind
        else {
            return Err(Diagnostic::new(
                IssueCode::Parse,
                expr.span,
                "Expected a 'val' or 'var' definition.",
            ));
        };

        if end.is_none() {
            return Err(Diagnostic::new(
                IssueCode::Parse,
                expr.span.end..expr.span.end,
                "Missing ';' after the definition.",
            ));
        }

        definitions.push(Definition {
            mutable,
            name,
            value: *value,
            span: expr.span,
        });
    }

    Ok(definitions)
}

/// The syntactic surrounding of a code completion cursor.
pub(crate) struct CompletionSite {
    /// The identifier (or keyword) directly in front of the cursor.
    pub(crate) pattern: CompactString,

    /// The source code range that a selected candidate replaces.
    pub(crate) place: SiteSpan,

    /// The cursor follows a member access dot.
    pub(crate) access: bool,

    /// The well-formed receiver of the member access, if any.
    pub(crate) receiver: Option<Expr>,
}

/// Finds the completion surrounding of the `cursor` site within `text`.
///
/// Only the text in front of the cursor is parsed. The receiver of an
/// incomplete member access is taken from the recovered syntax tree.
pub(crate) fn completion_site(text: &str, offset: Site, cursor: Site) -> CompletionSite {
    let prefix = text
        .chars()
        .take(cursor.saturating_sub(offset))
        .collect::<String>();

    let unit = ExprUnit::from(prefix.as_str());
    let mut lowering = Lowering::new(&unit, offset, MAX_DEPTH);

    let mut last = TokenRef::nil();
    let mut previous = TokenRef::nil();

    let mut tokens = unit.cursor(..);

    loop {
        let token = tokens.token(0);

        if token == ExprToken::EOI {
            break;
        }

        if !token.is_trivia() {
            previous = last;
            last = tokens.token_ref(0);
        }

        if !tokens.advance() {
            break;
        }
    }

    let mut site = CompletionSite {
        pattern: CompactString::default(),
        place: cursor..cursor,
        access: false,
        receiver: None,
    };

    let mut anchor = last;

    if let (Some(token), Some(span)) = (last.deref(&unit), lowering.token_span(&last)) {
        if token.is_word() && span.end == cursor {
            site.pattern = last.string(&unit).unwrap_or_default().into();
            site.place = span;
            anchor = previous;
        }
    }

    if anchor.deref(&unit) != Some(ExprToken::Dot) {
        return site;
    }

    site.access = true;

    let left = unit.nodes().find_map(|node| match node {
        ExprNode::Access { dot, left, .. } if *dot == anchor => Some(*left),
        _ => None,
    });

    if let Some(left) = left {
        site.receiver = lowering.lower(&left).ok();
    }

    site
}

struct Lowering<'unit> {
    unit: &'unit ExprUnit,
    offset: Site,
    max_depth: usize,
    depth: usize,
}

impl<'unit> Lowering<'unit> {
    fn new(unit: &'unit ExprUnit, offset: Site, max_depth: usize) -> Self {
        Self {
            unit,
            offset,
            max_depth: max_depth.min(PARSER_DEPTH),
            depth: 0,
        }
    }

    // The nesting overflow takes priority, then the leftmost syntax error.
    fn check_errors(&self) -> Result<(), Diagnostic> {
        let mut leftmost: Option<(Site, &SyntaxError)> = None;

        for error in self.unit.errors() {
            let span = error.aligned_span(self.unit);
            let start = span.start.to_site(self.unit).unwrap_or_default();

            if error.context == ExprNode::OVERFLOW {
                return Err(self.depth_limit(start + self.offset, PARSER_DEPTH));
            }

            let replace = match &leftmost {
                Some((site, _)) => start < *site,
                None => true,
            };

            if replace {
                leftmost = Some((start, error));
            }
        }

        let overflow = self
            .unit
            .nodes()
            .find_map(|node| match node {
                ExprNode::Overflow { start, .. } => Some(*start),
                _ => None,
            });

        if let Some(start) = overflow {
            let site = self
                .token_span(&start)
                .map(|span| span.start)
                .unwrap_or(self.offset);

            return Err(self.depth_limit(site, PARSER_DEPTH));
        }

        let Some((_, error)) = leftmost else {
            return Ok(());
        };

        let span = error.aligned_span(self.unit);
        let start = span.start.to_site(self.unit).unwrap_or_default();
        let end = span.end.to_site(self.unit).unwrap_or(start);

        Err(Diagnostic::new(
            IssueCode::Parse,
            (start + self.offset)..(end + self.offset),
            error.message::<ExprNode>(self.unit).to_string(),
        ))
    }

    fn root_statements(&self) -> Vec<NodeRef> {
        match self.unit.root_node_ref().deref(self.unit) {
            Some(ExprNode::Root { statements, .. }) => statements.clone(),
            _ => system_panic!("Missing expression syntax tree root."),
        }
    }

    // Returns the statement's expression and the span of its terminating
    // semicolon.
    fn clause(&mut self, node_ref: &NodeRef) -> Result<(Expr, Option<SiteSpan>), Diagnostic> {
        let Some(ExprNode::Clause { expr, end, .. }) = node_ref.deref(self.unit) else {
            return Err(self.eoi("Unexpected end of input, expected statement."));
        };

        let expr = self.lower(expr)?;

        Ok((expr, self.token_span(end)))
    }

    fn lower(&mut self, node_ref: &NodeRef) -> Result<Expr, Diagnostic> {
        let Some(node) = node_ref.deref(self.unit) else {
            return Err(self.eoi("Unexpected end of input, expected expression."));
        };

        if self.depth >= self.max_depth {
            let site = self
                .token_span(&self.anchor(node))
                .map(|span| span.start)
                .unwrap_or(self.offset);

            return Err(self.depth_limit(site, self.max_depth));
        }

        self.depth += 1;

        let result = self.lower_node(node);

        self.depth -= 1;

        result
    }

    fn lower_node(&mut self, node: &ExprNode) -> Result<Expr, Diagnostic> {
        match node {
            ExprNode::Number { token, .. } => self.lower_number(token),

            ExprNode::String { token, .. } => {
                let span = self.expect_span(token)?;
                let literal = token.string(self.unit).unwrap_or_default();

                Ok(Expr::new(span, ExprKind::String(unescape(literal))))
            }

            ExprNode::Bool { token, .. } => {
                let span = self.expect_span(token)?;
                let value = token.deref(self.unit) == Some(ExprToken::True);

                Ok(Expr::new(span, ExprKind::Bool(value)))
            }

            ExprNode::Context { token, .. } => {
                Ok(Expr::new(self.expect_span(token)?, ExprKind::Context))
            }

            ExprNode::Ident { token, .. } => {
                let name = self.name(token)?;

                Ok(Expr::new(name.span.clone(), ExprKind::Ident(name)))
            }

            ExprNode::Group {
                start, inner, end, ..
            } => {
                let start = self.expect_span(start)?.start;
                let end = self.expect_span(end)?.end;
                let inner = self.lower(inner)?;

                Ok(Expr::new(start..end, inner.kind))
            }

            ExprNode::Unary { op, right, .. } => {
                let start = self.expect_span(op)?.start;

                let op = match op.deref(self.unit) {
                    Some(ExprToken::Not) => UnaryOp::Not,
                    _ => UnaryOp::Neg,
                };

                let operand = self.lower(right)?;

                Ok(Expr::new(
                    start..operand.span.end,
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                ))
            }

            ExprNode::Binary {
                left, op, right, ..
            } => self.lower_binary(left, op, right),

            ExprNode::Access { left, member, .. } => {
                let receiver = self.lower(left)?;
                let member = self.name(member)?;

                Ok(Expr::new(
                    receiver.span.start..member.span.end,
                    ExprKind::Select {
                        receiver: Box::new(receiver),
                        member,
                    },
                ))
            }

            ExprNode::Call { left, args, .. } => self.lower_call(left, args),

            ExprNode::If {
                keyword,
                condition,
                then,
                otherwise,
                ..
            } => {
                let start = self.expect_span(keyword)?.start;
                let condition = self.lower_condition(condition)?;
                let then = self.lower(then)?;

                let otherwise = match otherwise.is_nil() {
                    true => None,
                    false => Some(Box::new(self.lower(otherwise)?)),
                };

                let end = match &otherwise {
                    Some(otherwise) => otherwise.span.end,
                    None => then.span.end,
                };

                Ok(Expr::new(
                    start..end,
                    ExprKind::If {
                        condition: Box::new(condition),
                        then: Box::new(then),
                        otherwise,
                    },
                ))
            }

            ExprNode::While {
                keyword,
                condition,
                body,
                ..
            } => {
                let start = self.expect_span(keyword)?.start;
                let condition = self.lower_condition(condition)?;
                let body = self.lower(body)?;

                Ok(Expr::new(
                    start..body.span.end,
                    ExprKind::While {
                        condition: Box::new(condition),
                        body: Box::new(body),
                    },
                ))
            }

            ExprNode::Define {
                keyword,
                name,
                value,
                ..
            } => {
                let start = self.expect_span(keyword)?.start;
                let mutable = keyword.deref(self.unit) == Some(ExprToken::Var);
                let name = self.name(name)?;
                let value = self.lower(value)?;

                Ok(Expr::new(
                    start..value.span.end,
                    ExprKind::Define {
                        mutable,
                        name,
                        value: Box::new(value),
                    },
                ))
            }

            ExprNode::Block {
                start,
                statements,
                end,
                ..
            } => {
                let start = self.expect_span(start)?.start;
                let end = self.expect_span(end)?.end;

                let mut lowered = Vec::with_capacity(statements.len());

                for statement in statements {
                    let (expr, _) = self.clause(statement)?;

                    lowered.push(expr);
                }

                Ok(Expr::new(
                    start..end,
                    ExprKind::Block {
                        statements: lowered,
                    },
                ))
            }

            ExprNode::Overflow { start, .. } => {
                let site = self
                    .token_span(start)
                    .map(|span| span.start)
                    .unwrap_or(self.offset);

                Err(self.depth_limit(site, PARSER_DEPTH))
            }

            ExprNode::Root { .. } | ExprNode::Clause { .. } | ExprNode::CallArgs { .. } => {
                Err(self.eoi("Unexpected end of input, expected expression."))
            }
        }
    }

    fn lower_number(&self, token: &TokenRef) -> Result<Expr, Diagnostic> {
        let span = self.expect_span(token)?;
        let literal = token.string(self.unit).unwrap_or_default();

        if token.deref(self.unit) == Some(ExprToken::Float) {
            return match literal.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Expr::new(span, ExprKind::Float(value))),

                _ => Err(Diagnostic::new(
                    IssueCode::FloatParse,
                    span,
                    "Invalid float literal.",
                )),
            };
        }

        match literal.parse::<i64>() {
            Ok(value) => Ok(Expr::new(span, ExprKind::Int(value))),

            Err(_) => Err(Diagnostic::new(
                IssueCode::IntParse,
                span,
                "Integer literal does not fit into 'int'.",
            )),
        }
    }

    fn lower_binary(
        &mut self,
        left: &NodeRef,
        op: &TokenRef,
        right: &NodeRef,
    ) -> Result<Expr, Diagnostic> {
        let token = op.deref(self.unit);

        if token == Some(ExprToken::Assign) {
            let target = match left.deref(self.unit) {
                Some(ExprNode::Ident { token, .. }) => self.name(token)?,

                _ => {
                    let target = self.lower(left)?;

                    return Err(Diagnostic::new(
                        IssueCode::Parse,
                        target.span,
                        "Invalid assignment target, expected variable name.",
                    ));
                }
            };

            let value = self.lower(right)?;

            return Ok(Expr::new(
                target.span.start..value.span.end,
                ExprKind::Assign {
                    target,
                    value: Box::new(value),
                },
            ));
        }

        let Some(op) = token.and_then(BinaryOp::from_token) else {
            return Err(Diagnostic::new(
                IssueCode::Parse,
                self.expect_span(op)?,
                "Unknown binary operator.",
            ));
        };

        let left = self.lower(left)?;
        let right = self.lower(right)?;

        Ok(Expr::new(
            left.span.start..right.span.end,
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        ))
    }

    fn lower_call(&mut self, left: &NodeRef, args: &NodeRef) -> Result<Expr, Diagnostic> {
        let (receiver, method) = match left.deref(self.unit) {
            Some(ExprNode::Ident { token, .. }) => (None, self.name(token)?),

            Some(ExprNode::Access { left, member, .. }) => {
                (Some(Box::new(self.lower(left)?)), self.name(member)?)
            }

            _ => {
                let target = self.lower(left)?;

                return Err(Diagnostic::new(
                    IssueCode::Parse,
                    target.span,
                    "Invalid call target, expected method name.",
                ));
            }
        };

        let Some(ExprNode::CallArgs {
            args, end, ..
        }) = args.deref(self.unit)
        else {
            return Err(self.eoi("Unexpected end of input, expected ')'."));
        };

        let end = self.expect_span(end)?.end;

        let mut lowered = Vec::with_capacity(args.len());

        for arg in args {
            lowered.push(self.lower(arg)?);
        }

        let start = match &receiver {
            Some(receiver) => receiver.span.start,
            None => method.span.start,
        };

        Ok(Expr::new(
            start..end,
            ExprKind::Call {
                receiver,
                method,
                args: lowered,
            },
        ))
    }

    // The condition's parentheses do not contribute to the condition's span.
    fn lower_condition(&mut self, node_ref: &NodeRef) -> Result<Expr, Diagnostic> {
        match node_ref.deref(self.unit) {
            Some(ExprNode::Group { inner, .. }) => self.lower(inner),
            _ => self.lower(node_ref),
        }
    }

    fn name(&self, token: &TokenRef) -> Result<Name, Diagnostic> {
        let span = self.expect_span(token)?;

        Ok(Name {
            string: token.string(self.unit).unwrap_or_default().into(),
            span,
        })
    }

    // A token that locates the node without descending into its children.
    fn anchor(&self, node: &ExprNode) -> TokenRef {
        match node {
            ExprNode::Number { token, .. }
            | ExprNode::String { token, .. }
            | ExprNode::Bool { token, .. }
            | ExprNode::Context { token, .. }
            | ExprNode::Ident { token, .. } => *token,

            ExprNode::Group { start, .. }
            | ExprNode::Block { start, .. }
            | ExprNode::Overflow { start, .. } => *start,

            ExprNode::Unary { op, .. } | ExprNode::Binary { op, .. } => *op,

            ExprNode::Access { dot, .. } => *dot,

            ExprNode::If { keyword, .. }
            | ExprNode::While { keyword, .. }
            | ExprNode::Define { keyword, .. } => *keyword,

            ExprNode::Call { args, .. } => match args.deref(self.unit) {
                Some(ExprNode::CallArgs { start, .. }) => *start,
                _ => TokenRef::nil(),
            },

            ExprNode::Clause { end, .. } => *end,

            ExprNode::Root { .. } | ExprNode::CallArgs { .. } => TokenRef::nil(),
        }
    }

    fn token_span(&self, token: &TokenRef) -> Option<SiteSpan> {
        let start = token.site(self.unit)?;
        let length = token.length(self.unit)?;

        Some((start + self.offset)..(start + length + self.offset))
    }

    #[inline(always)]
    fn expect_span(&self, token: &TokenRef) -> Result<SiteSpan, Diagnostic> {
        match self.token_span(token) {
            Some(span) => Ok(span),
            None => Err(self.eoi("Unexpected end of input.")),
        }
    }

    fn eoi(&self, message: &str) -> Diagnostic {
        let end = self.unit.length() + self.offset;

        Diagnostic::new(IssueCode::Parse, end..end, message)
    }

    fn depth_limit(&self, site: Site, limit: usize) -> Diagnostic {
        Diagnostic::new(
            IssueCode::DepthLimit,
            site..site,
            format!("Expression is nested deeper than {limit} levels."),
        )
    }
}

impl BinaryOp {
    #[inline(always)]
    fn from_token(token: ExprToken) -> Option<Self> {
        Some(match token {
            ExprToken::Or => Self::Or,
            ExprToken::And => Self::And,
            ExprToken::Equal => Self::Equal,
            ExprToken::NotEqual => Self::NotEqual,
            ExprToken::Lesser => Self::Lesser,
            ExprToken::LesserOrEqual => Self::LesserOrEqual,
            ExprToken::Greater => Self::Greater,
            ExprToken::GreaterOrEqual => Self::GreaterOrEqual,
            ExprToken::Plus => Self::Add,
            ExprToken::Minus => Self::Sub,
            ExprToken::Mul => Self::Mul,
            ExprToken::Div => Self::Div,
            ExprToken::Rem => Self::Rem,
            _ => return None,
        })
    }
}

/// Strips the quotes of a string literal and resolves its escape sequences.
pub(crate) fn unescape(literal: &str) -> CompactString {
    let inner = literal
        .strip_prefix('"')
        .and_then(|literal| literal.strip_suffix('"'))
        .unwrap_or(literal);

    let mut result = CompactString::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }

        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::IssueCode,
        syntax::{
            ast::{BinaryOp, ExprKind, SyntaxKind},
            lower::{
                completion_site,
                parse_definitions,
                parse_expression,
                parse_expression_within,
                unescape,
            },
        },
    };

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3 == 7 && true", 0).unwrap();

        let ExprKind::Binary { op, left, .. } = &expr.kind else {
            panic!("Binary expected.");
        };

        assert_eq!(*op, BinaryOp::And);

        let ExprKind::Binary { op, left, .. } = &left.kind else {
            panic!("Binary expected.");
        };

        assert_eq!(*op, BinaryOp::Equal);

        let ExprKind::Binary { op, right, .. } = &left.kind else {
            panic!("Binary expected.");
        };

        assert_eq!(*op, BinaryOp::Add);
        assert_eq!(right.syntax_kind(), SyntaxKind::Binary);
        assert_eq!(right.operator(), Some("*"));
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse_expression("10 - 4 - 3", 0).unwrap();

        let ExprKind::Binary { left, right, .. } = &expr.kind else {
            panic!("Binary expected.");
        };

        assert_eq!(left.operator(), Some("-"));
        assert!(matches!(right.kind, ExprKind::Int(3)));
    }

    #[test]
    fn test_unary_binds_tighter_than_binary() {
        let expr = parse_expression("-a.length + 1", 0).unwrap();

        let ExprKind::Binary { left, .. } = &expr.kind else {
            panic!("Binary expected.");
        };

        let ExprKind::Unary { operand, .. } = &left.kind else {
            panic!("Unary expected.");
        };

        assert_eq!(operand.syntax_kind(), SyntaxKind::Select);
        assert_eq!(left.span, 0..9);
    }

    #[test]
    fn test_member_chain() {
        let expr = parse_expression("context.getProperty().length()", 0).unwrap();

        assert_eq!(expr.span, 0..30);

        let ExprKind::Call {
            receiver, method, ..
        } = &expr.kind
        else {
            panic!("Call expected.");
        };

        assert_eq!(method.string, "length");

        let receiver = receiver.as_ref().unwrap();

        assert_eq!(receiver.syntax_kind(), SyntaxKind::Call);
        assert_eq!(receiver.span, 0..21);
    }

    #[test]
    fn test_block_and_definitions() {
        let expr = parse_expression("{ var x = 1; x = x + 1; if (x > 1) x else 0 }", 0).unwrap();

        let ExprKind::Block { statements } = &expr.kind else {
            panic!("Block expected.");
        };

        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].syntax_kind(), SyntaxKind::Val);
        assert_eq!(statements[1].syntax_kind(), SyntaxKind::Assign);
        assert_eq!(statements[2].syntax_kind(), SyntaxKind::If);

        let ExprKind::If { condition, .. } = &statements[2].kind else {
            panic!("If expected.");
        };

        assert_eq!(condition.span, 28..33);
    }

    #[test]
    fn test_offset_spans() {
        let expr = parse_expression("a + b", 10).unwrap();

        assert_eq!(expr.span, 10..15);

        let expr = parse_expression("(a + b)", 10).unwrap();

        assert_eq!(expr.span, 10..17);
    }

    #[test]
    fn test_parse_errors() {
        let error = parse_expression("1 +", 0).unwrap_err();

        assert_eq!(error.code, IssueCode::Parse);
        assert_eq!(error.span, 3..3);

        let error = parse_expression("foo(1, 2", 0).unwrap_err();

        assert_eq!(error.code, IssueCode::Parse);

        let error = parse_expression("1 2", 0).unwrap_err();

        assert_eq!(error.span, 2..3);

        let error = parse_expression("1; 2", 0).unwrap_err();

        assert_eq!(error.code, IssueCode::Parse);

        let error = parse_expression("a + b = 1", 0).unwrap_err();

        assert_eq!(error.code, IssueCode::Parse);
        assert_eq!(error.span, 0..5);

        let error = parse_expression("99999999999999999999", 0).unwrap_err();

        assert_eq!(error.code, IssueCode::IntParse);
    }

    #[test]
    fn test_nesting_limit() {
        let nested = format!("{}1{}", "(".repeat(2000), ")".repeat(2000));

        let error = parse_expression(&nested, 0).unwrap_err();

        assert_eq!(error.code, IssueCode::DepthLimit);

        let negated = format!("{}1", "-".repeat(2000));

        let error = parse_expression(&negated, 0).unwrap_err();

        assert_eq!(error.code, IssueCode::DepthLimit);

        let chain = vec!["1"; 2000].join(" + ");

        let error = parse_expression(&chain, 0).unwrap_err();

        assert_eq!(error.code, IssueCode::DepthLimit);

        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));

        assert!(parse_expression(&shallow, 0).is_ok());

        let error = parse_expression_within("1 + 2 + 3", 0, 2).unwrap_err();

        assert_eq!(error.code, IssueCode::DepthLimit);
        assert!(parse_expression_within("1 + 2 + 3", 0, 3).is_ok());
    }

    #[test]
    fn test_header_definitions() {
        let definitions = parse_definitions("val a = 1; var b = a + 1;", 0).unwrap();

        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].name.string, "a");
        assert_eq!(definitions[0].span, 0..9);
        assert!(!definitions[0].mutable);
        assert!(definitions[1].mutable);

        assert!(parse_definitions("val a = 1", 0).is_err());
        assert!(parse_definitions("1 + 2;", 0).is_err());
    }

    #[test]
    fn test_completion_site() {
        let site = completion_site(r#""a\"b"."#, 0, 7);

        assert!(site.access);
        assert_eq!(site.pattern, "");
        assert_eq!(site.receiver.unwrap().kind, ExprKind::String("a\"b".into()));

        let site = completion_site("1 + foo.bar(x, (y)).ba", 0, 22);

        assert_eq!(site.pattern, "ba");
        assert_eq!(site.place, 20..22);
        assert_eq!(site.receiver.unwrap().span, 4..19);

        let site = completion_site("(\"a.b\".trim()).", 0, 15);

        assert_eq!(site.receiver.unwrap().syntax_kind(), SyntaxKind::Call);

        let site = completion_site("x + co", 0, 6);

        assert!(!site.access);
        assert_eq!(site.pattern, "co");
        assert!(site.receiver.is_none());

        let site = completion_site(" context.len", 5, 17);

        assert_eq!(site.pattern, "len");
        assert_eq!(site.place, 14..17);
        assert_eq!(site.receiver.unwrap().kind, ExprKind::Context);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#""a\"b\\c\n""#), "a\"b\\c\n");
    }
}
