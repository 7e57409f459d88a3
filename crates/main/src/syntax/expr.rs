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

use std::marker::PhantomData;

use lady_deirdre::{
    lexis::{SiteRef, TokenRef, TokenSet},
    syntax::{
        NodeRef,
        PolyRef,
        NodeRule,
        NodeSet,
        Recovery,
        RecoveryResult,
        SyntaxError,
        SyntaxSession,
        EMPTY_NODE_SET,
        ROOT_RULE,
    },
};

use crate::syntax::{node::ExprNode, token::ExprToken};

/// The maximum number of nested expression frames the parser descends into.
///
/// Deeper input is consumed by a single [ExprNode::Overflow] node, and the
/// parser reports a syntax error with the [ExprNode::OVERFLOW] context.
pub(crate) const PARSER_DEPTH: usize = 256;

const BINARY_OP: TokenSet = {
    use ExprToken::*;

    TokenSet::inclusive(&[
        Assign as u8,
        Or as u8,
        And as u8,
        Equal as u8,
        NotEqual as u8,
        Greater as u8,
        GreaterOrEqual as u8,
        Lesser as u8,
        LesserOrEqual as u8,
        Plus as u8,
        Minus as u8,
        Mul as u8,
        Div as u8,
        Rem as u8,
        Dot as u8,
    ])
};

const OUTER_TERMINALS: TokenSet = {
    use ExprToken::*;

    TokenSet::inclusive(&[
        Val as u8,
        Var as u8,
        Else as u8,
        Comma as u8,
        BraceClose as u8,
        ParenClose as u8,
        Semicolon as u8,
    ])
};

static OPERAND_TOKENS: TokenSet = {
    use ExprToken::*;

    TokenSet::inclusive(&[
        Context as u8,
        If as u8,
        While as u8,
        Val as u8,
        Var as u8,
        True as u8,
        False as u8,
        ParenOpen as u8,
        BraceOpen as u8,
        Minus as u8,
        Not as u8,
        String as u8,
        Ident as u8,
        Int as u8,
        Float as u8,
    ])
};

static OPERANDS: NodeSet = NodeSet::new(&[
    ExprNode::IDENT,
    ExprNode::CONTEXT,
    ExprNode::NUMBER,
    ExprNode::STRING,
    ExprNode::BOOL,
    ExprNode::GROUP,
    ExprNode::BLOCK,
    ExprNode::IF,
    ExprNode::WHILE,
    ExprNode::DEFINE,
]);

static RECOVERY_LEFT: Recovery = {
    use ExprToken::*;

    Recovery::unlimited()
        .unexpected_set(OUTER_TERMINALS)
        .group(BraceOpen as u8, BraceClose as u8)
        .group(ParenOpen as u8, ParenClose as u8)
};

static RECOVERY_RIGHT: Recovery = {
    use ExprToken::*;

    Recovery::unlimited()
        .unexpected_set(OUTER_TERMINALS)
        .unexpected_set(BINARY_OP)
        .group(BraceOpen as u8, BraceClose as u8)
        .group(ParenOpen as u8, ParenClose as u8)
};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub(crate) enum Precedence {
    Outer = 0,
    Assign = 2,
    Or = 4,
    And = 6,
    Equality = 8,
    Compare = 10,
    AddSub = 20,
    MulDivRem = 22,
    UnaryLeft = 24,
    UnaryRight = 26,
}

impl Precedence {
    #[inline(always)]
    fn assoc(self) -> Assoc {
        match self {
            Self::Assign | Self::UnaryLeft => Assoc::Right,
            _ => Assoc::Left,
        }
    }

    // Returns true if the operand parsed at this level leaves the operator to
    // the enclosing expression.
    #[inline(always)]
    fn outranks(self, operator: Precedence) -> bool {
        match operator.assoc() {
            Assoc::Left => self >= operator,
            Assoc::Right => self > operator,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

impl ExprToken {
    pub(crate) fn bin_precedence(self) -> Precedence {
        match self {
            Self::Assign => Precedence::Assign,

            Self::Or => Precedence::Or,

            Self::And => Precedence::And,

            Self::Equal | Self::NotEqual => Precedence::Equality,

            Self::Greater | Self::GreaterOrEqual | Self::Lesser | Self::LesserOrEqual => {
                Precedence::Compare
            }

            Self::Plus | Self::Minus => Precedence::AddSub,

            Self::Mul | Self::Div | Self::Rem => Precedence::MulDivRem,

            Self::Dot | Self::ParenOpen => Precedence::UnaryRight,

            _ => Precedence::Outer,
        }
    }
}

pub(super) struct ExprParser<'session, 'code, S: SyntaxSession<'code, Node = ExprNode>> {
    session: &'session mut S,
    step_start_ref: SiteRef,
    depth: usize,
    overflow: bool,
    _code: PhantomData<&'code ()>,
}

impl<'session, 'code, S> ExprParser<'session, 'code, S>
where
    S: SyntaxSession<'code, Node = ExprNode>,
{
    pub(super) fn parse_root(session: &'session mut S) -> ExprNode {
        let node = session.node_ref();
        let parent = session.parent_ref();
        let step_start_ref = session.site_ref(0);

        let mut parser = Self {
            session,
            step_start_ref,
            depth: 0,
            overflow: false,
            _code: PhantomData,
        };

        let statements = parser.parse_statements(ROOT_RULE, false);

        ExprNode::Root {
            node,
            parent,
            statements,
        }
    }

    fn parse_statements(&mut self, context: NodeRule, nested: bool) -> Vec<NodeRef> {
        let mut statements = Vec::new();

        loop {
            self.skip_trivia();

            let token = self.session.token(0);

            match token {
                ExprToken::EOI => break,

                ExprToken::BraceClose if nested => break,

                ExprToken::Semicolon => {
                    let _ = self.session.advance();
                }

                _ if OPERAND_TOKENS.contains(token as u8) => {
                    statements.push(self.parse_clause(nested));
                }

                _ => self.skip_unexpected(context),
            }
        }

        statements
    }

    fn parse_clause(&mut self, nested: bool) -> NodeRef {
        static EXPECTATIONS: TokenSet = TokenSet::empty().include(ExprToken::Semicolon as u8);

        let node = self.session.enter(ExprNode::CLAUSE);
        let parent = self.session.parent_ref();

        let expr = self.parse_expr(ExprNode::CLAUSE, Precedence::Outer);

        let end = loop {
            self.skip_trivia();

            match self.session.token(0) {
                ExprToken::Semicolon => break self.read_token(),

                ExprToken::EOI => break TokenRef::nil(),

                ExprToken::BraceClose if nested => break TokenRef::nil(),

                _ => {
                    if !self.recover(
                        Assoc::Left,
                        &EXPECTATIONS,
                        ExprNode::CLAUSE,
                        &EXPECTATIONS,
                        &EMPTY_NODE_SET,
                    ) {
                        break TokenRef::nil();
                    }
                }
            }
        };

        self.session.leave(ExprNode::Clause {
            node,
            parent,
            expr,
            end,
        })
    }

    fn parse_expr(&mut self, context: NodeRule, parent_op: Precedence) -> NodeRef {
        if self.depth >= PARSER_DEPTH {
            return self.parse_overflow();
        }

        self.depth += 1;

        let assoc = match parent_op == Precedence::Outer {
            true => Assoc::Left,
            false => Assoc::Right,
        };

        let (mut accumulator, mut callable) = self.parse_operand(assoc, context);

        loop {
            if self.overflow {
                break;
            }

            self.skip_trivia();

            let token = self.session.token(0);

            match token {
                ExprToken::Dot => {
                    if !self.reduce_access(&mut accumulator, parent_op) {
                        break;
                    }

                    callable = true;
                }

                ExprToken::ParenOpen if callable => {
                    if !self.reduce_call(&mut accumulator, parent_op) {
                        break;
                    }

                    callable = false;
                }

                ExprToken::EOI => break,

                _ => {
                    if OUTER_TERMINALS.contains(token as u8) {
                        break;
                    }

                    match token.bin_precedence() {
                        Precedence::Outer | Precedence::UnaryRight => {
                            if !self.recover(
                                assoc,
                                &BINARY_OP,
                                context,
                                &BINARY_OP,
                                &EMPTY_NODE_SET,
                            ) {
                                break;
                            }
                        }

                        precedence => {
                            if !self.reduce_binary(&mut accumulator, parent_op, precedence) {
                                break;
                            }

                            callable = false;
                        }
                    }
                }
            }
        }

        self.depth -= 1;

        accumulator
    }

    fn reduce_binary(
        &mut self,
        accumulator: &mut NodeRef,
        parent_op: Precedence,
        precedence: Precedence,
    ) -> bool {
        if parent_op.outranks(precedence) {
            return false;
        }

        let left = *accumulator;

        let node = self.session.enter(ExprNode::BINARY);

        if !left.is_nil() {
            self.session.lift(&left);
        }

        let parent = self.session.parent_ref();

        let op = self.read_token();

        self.skip_trivia();

        let right = self.parse_expr(ExprNode::BINARY, precedence);

        *accumulator = self.session.leave(ExprNode::Binary {
            node,
            parent,
            left,
            op,
            right,
        });

        true
    }

    fn reduce_access(&mut self, accumulator: &mut NodeRef, parent_op: Precedence) -> bool {
        static EXPECTATIONS: TokenSet = TokenSet::empty().include(ExprToken::Ident as u8);

        if parent_op.outranks(Precedence::UnaryRight) {
            return false;
        }

        let left = *accumulator;

        let node = self.session.enter(ExprNode::ACCESS);

        if !left.is_nil() {
            self.session.lift(&left);
        }

        let parent = self.session.parent_ref();

        let dot = self.read_token();

        let member = loop {
            self.skip_trivia();

            if self.session.token(0) == ExprToken::Ident {
                break self.read_token();
            }

            if !self.recover(
                Assoc::Right,
                &EXPECTATIONS,
                ExprNode::ACCESS,
                &EXPECTATIONS,
                &EMPTY_NODE_SET,
            ) {
                break TokenRef::nil();
            }
        };

        *accumulator = self.session.leave(ExprNode::Access {
            node,
            parent,
            left,
            dot,
            member,
        });

        true
    }

    fn reduce_call(&mut self, accumulator: &mut NodeRef, parent_op: Precedence) -> bool {
        if parent_op.outranks(Precedence::UnaryRight) {
            return false;
        }

        let left = *accumulator;

        let node = self.session.enter(ExprNode::CALL);

        if !left.is_nil() {
            self.session.lift(&left);
        }

        let parent = self.session.parent_ref();

        let args = self.parse_call_args();

        *accumulator = self.session.leave(ExprNode::Call {
            node,
            parent,
            left,
            args,
        });

        true
    }

    fn parse_call_args(&mut self) -> NodeRef {
        static EXPECTATIONS: TokenSet = TokenSet::empty().include(ExprToken::ParenClose as u8);

        let node = self.session.enter(ExprNode::CALL_ARGS);
        let parent = self.session.parent_ref();

        let start = self.read_token();

        let mut args = Vec::new();

        self.skip_trivia();

        if self.session.token(0) != ExprToken::ParenClose {
            loop {
                args.push(self.parse_expr(ExprNode::CALL_ARGS, Precedence::Outer));

                self.skip_trivia();

                if self.overflow || self.session.token(0) != ExprToken::Comma {
                    break;
                }

                let _ = self.read_token();

                self.skip_trivia();
            }
        }

        let end = self.parse_closing(ExprNode::CALL_ARGS, &EXPECTATIONS);

        self.session.leave(ExprNode::CallArgs {
            node,
            parent,
            start,
            args,
            end,
        })
    }

    fn parse_operand(&mut self, assoc: Assoc, context: NodeRule) -> (NodeRef, bool) {
        loop {
            let token = self.session.token(0);

            match token {
                ExprToken::Ident => {
                    return (
                        self.parse_leaf(ExprNode::IDENT, |node, parent, token| {
                            ExprNode::Ident {
                                node,
                                parent,
                                token,
                            }
                        }),
                        true,
                    );
                }

                ExprToken::Context => {
                    return (
                        self.parse_leaf(ExprNode::CONTEXT, |node, parent, token| {
                            ExprNode::Context {
                                node,
                                parent,
                                token,
                            }
                        }),
                        false,
                    );
                }

                ExprToken::Int | ExprToken::Float => {
                    return (
                        self.parse_leaf(ExprNode::NUMBER, |node, parent, token| {
                            ExprNode::Number {
                                node,
                                parent,
                                token,
                            }
                        }),
                        false,
                    );
                }

                ExprToken::String => {
                    return (
                        self.parse_leaf(ExprNode::STRING, |node, parent, token| {
                            ExprNode::String {
                                node,
                                parent,
                                token,
                            }
                        }),
                        false,
                    );
                }

                ExprToken::True | ExprToken::False => {
                    return (
                        self.parse_leaf(ExprNode::BOOL, |node, parent, token| ExprNode::Bool {
                            node,
                            parent,
                            token,
                        }),
                        false,
                    );
                }

                ExprToken::ParenOpen => return (self.parse_group(), false),

                ExprToken::BraceOpen => return (self.parse_block(), false),

                ExprToken::Minus | ExprToken::Not => return (self.parse_unary(), false),

                ExprToken::If => return (self.parse_if(), false),

                ExprToken::While => return (self.parse_while(), false),

                ExprToken::Val | ExprToken::Var => return (self.parse_define(), false),

                _ => {
                    if !self.recover(assoc, &OPERAND_TOKENS, context, &OPERAND_TOKENS, &OPERANDS)
                    {
                        return (NodeRef::nil(), false);
                    }
                }
            }
        }
    }

    fn parse_leaf(
        &mut self,
        rule: NodeRule,
        constructor: fn(NodeRef, NodeRef, TokenRef) -> ExprNode,
    ) -> NodeRef {
        let node = self.session.enter(rule);

        let parent = self.session.parent_ref();
        let token = self.read_token();

        self.session.leave(constructor(node, parent, token))
    }

    fn parse_group(&mut self) -> NodeRef {
        static EXPECTATIONS: TokenSet = TokenSet::empty().include(ExprToken::ParenClose as u8);

        let node = self.session.enter(ExprNode::GROUP);
        let parent = self.session.parent_ref();

        let start = self.read_token();

        self.skip_trivia();

        let inner = self.parse_expr(ExprNode::GROUP, Precedence::Outer);

        let end = self.parse_closing(ExprNode::GROUP, &EXPECTATIONS);

        self.session.leave(ExprNode::Group {
            node,
            parent,
            start,
            inner,
            end,
        })
    }

    fn parse_block(&mut self) -> NodeRef {
        static EXPECTATIONS: TokenSet = TokenSet::empty().include(ExprToken::BraceClose as u8);

        let node = self.session.enter(ExprNode::BLOCK);
        let parent = self.session.parent_ref();

        let start = self.read_token();

        let statements = self.parse_statements(ExprNode::BLOCK, true);

        let end = self.parse_closing(ExprNode::BLOCK, &EXPECTATIONS);

        self.session.leave(ExprNode::Block {
            node,
            parent,
            start,
            statements,
            end,
        })
    }

    fn parse_unary(&mut self) -> NodeRef {
        let node = self.session.enter(ExprNode::UNARY);

        let parent = self.session.parent_ref();
        let op = self.read_token();

        self.skip_trivia();

        let right = self.parse_expr(ExprNode::UNARY, Precedence::UnaryLeft);

        self.session.leave(ExprNode::Unary {
            node,
            parent,
            op,
            right,
        })
    }

    fn parse_if(&mut self) -> NodeRef {
        let node = self.session.enter(ExprNode::IF);
        let parent = self.session.parent_ref();

        let keyword = self.read_token();

        let condition = self.parse_condition(ExprNode::IF);

        self.skip_trivia();

        let then = self.parse_expr(ExprNode::IF, Precedence::Outer);

        self.skip_trivia();

        let otherwise = match !self.overflow && self.session.token(0) == ExprToken::Else {
            true => {
                let _ = self.read_token();

                self.skip_trivia();

                self.parse_expr(ExprNode::IF, Precedence::Outer)
            }

            false => NodeRef::nil(),
        };

        self.session.leave(ExprNode::If {
            node,
            parent,
            keyword,
            condition,
            then,
            otherwise,
        })
    }

    fn parse_while(&mut self) -> NodeRef {
        let node = self.session.enter(ExprNode::WHILE);
        let parent = self.session.parent_ref();

        let keyword = self.read_token();

        let condition = self.parse_condition(ExprNode::WHILE);

        self.skip_trivia();

        let body = self.parse_expr(ExprNode::WHILE, Precedence::Outer);

        self.session.leave(ExprNode::While {
            node,
            parent,
            keyword,
            condition,
            body,
        })
    }

    fn parse_condition(&mut self, context: NodeRule) -> NodeRef {
        static EXPECTATIONS: TokenSet = TokenSet::empty().include(ExprToken::ParenOpen as u8);

        loop {
            self.skip_trivia();

            if self.session.token(0) == ExprToken::ParenOpen {
                return self.parse_group();
            }

            if !self.recover(
                Assoc::Left,
                &EXPECTATIONS,
                context,
                &EXPECTATIONS,
                &EMPTY_NODE_SET,
            ) {
                return NodeRef::nil();
            }
        }
    }

    fn parse_define(&mut self) -> NodeRef {
        static NAME: TokenSet = TokenSet::empty().include(ExprToken::Ident as u8);
        static ASSIGN: TokenSet = TokenSet::empty().include(ExprToken::Assign as u8);

        let node = self.session.enter(ExprNode::DEFINE);
        let parent = self.session.parent_ref();

        let keyword = self.read_token();

        let name = loop {
            self.skip_trivia();

            if self.session.token(0) == ExprToken::Ident {
                break self.read_token();
            }

            if !self.recover(Assoc::Left, &NAME, ExprNode::DEFINE, &NAME, &EMPTY_NODE_SET) {
                break TokenRef::nil();
            }
        };

        let assigned = loop {
            self.skip_trivia();

            if self.session.token(0) == ExprToken::Assign {
                let _ = self.read_token();
                break true;
            }

            if !self.recover(Assoc::Left, &ASSIGN, ExprNode::DEFINE, &ASSIGN, &EMPTY_NODE_SET) {
                break false;
            }
        };

        let value = match assigned {
            true => {
                self.skip_trivia();

                self.parse_expr(ExprNode::DEFINE, Precedence::Outer)
            }

            false => NodeRef::nil(),
        };

        self.session.leave(ExprNode::Define {
            node,
            parent,
            keyword,
            name,
            value,
        })
    }

    fn parse_closing(&mut self, context: NodeRule, expectations: &'static TokenSet) -> TokenRef {
        loop {
            self.skip_trivia();

            let token = self.session.token(0);

            if expectations.contains(token as u8) {
                return self.read_token();
            }

            if !self.recover(
                Assoc::Left,
                expectations,
                context,
                expectations,
                &EMPTY_NODE_SET,
            ) {
                return TokenRef::nil();
            }
        }
    }

    // Consumes the rest of the input without descending.
    fn parse_overflow(&mut self) -> NodeRef {
        static EXPECTATIONS: TokenSet = TokenSet::empty();

        self.skip_trivia();

        let _ = self.session.failure(SyntaxError {
            span: self.step_start_ref..self.step_start_ref,
            context: ExprNode::OVERFLOW,
            recovery: RecoveryResult::UnexpectedToken,
            expected_tokens: &EXPECTATIONS,
            expected_nodes: &EMPTY_NODE_SET,
        });

        self.overflow = true;

        if self.session.token(0) == ExprToken::EOI {
            return NodeRef::nil();
        }

        let node = self.session.enter(ExprNode::OVERFLOW);
        let parent = self.session.parent_ref();

        let start = self.session.token_ref(0);

        while self.session.advance() {}

        self.session.leave(ExprNode::Overflow {
            node,
            parent,
            start,
        })
    }

    fn skip_unexpected(&mut self, context: NodeRule) {
        let start = self.session.site_ref(0);

        let _ = self.session.advance();

        let end = self.session.site_ref(0);

        let _ = self.session.failure(SyntaxError {
            span: start..end,
            context,
            recovery: RecoveryResult::UnexpectedToken,
            expected_tokens: &OPERAND_TOKENS,
            expected_nodes: &OPERANDS,
        });
    }

    fn read_token(&mut self) -> TokenRef {
        let token_ref = self.session.token_ref(0);

        let _ = self.session.advance();

        token_ref
    }

    fn recover(
        &mut self,
        assoc: Assoc,
        until: &TokenSet,
        context: NodeRule,
        expected_tokens: &'static TokenSet,
        expected_nodes: &'static NodeSet,
    ) -> bool {
        if self.overflow {
            return false;
        }

        let step_end_ref;

        if self.session.token(0) == ExprToken::EOI {
            step_end_ref = self.session.site_ref(0);

            let _ = self.session.failure(SyntaxError {
                span: self.step_start_ref..step_end_ref,
                context,
                recovery: RecoveryResult::UnexpectedEOI,
                expected_tokens,
                expected_nodes,
            });

            return false;
        }

        let recovery = match assoc {
            Assoc::Left => RECOVERY_LEFT.recover(self.session, until),
            Assoc::Right => RECOVERY_RIGHT.recover(self.session, until),
        };

        step_end_ref = self.session.site_ref(0);

        let _ = self.session.failure(SyntaxError {
            span: self.step_start_ref..step_end_ref,
            context,
            recovery,
            expected_tokens,
            expected_nodes,
        });

        recovery.recovered()
    }

    fn skip_trivia(&mut self) {
        loop {
            let token = self.session.token(0);

            if !token.is_trivia() {
                break;
            }

            let _ = self.session.advance();
        }

        self.step_start_ref = self.session.site_ref(0);
    }
}
