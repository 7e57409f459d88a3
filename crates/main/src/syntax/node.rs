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

use lady_deirdre::{
    lexis::TokenRef,
    syntax::{Node, NodeRef},
};

use crate::syntax::{expr::ExprParser, token::ExprToken};

/// A node of the concrete syntax tree produced by the error-tolerant parser.
///
/// The tree keeps the token references of every construct, including the
/// incomplete ones, which is what the code completion relies on. The
/// [Expr](crate::syntax::Expr) tree is lowered from this one.
#[derive(Node)]
#[token(ExprToken)]
#[trivia($Whitespace | $Linebreak | $Comment)]
#[recovery(
    $Semicolon,
    [$BraceOpen..$BraceClose],
    [$ParenOpen..$ParenClose],
)]
#[define(Operand =
    | $Context
    | $If
    | $While
    | $Val
    | $Var
    | $True
    | $False
    | $ParenOpen
    | $BraceOpen
    | $Minus
    | $Not
    | $String
    | $Ident
    | $Int
    | $Float
)]
pub(crate) enum ExprNode {
    #[root]
    #[rule(($Semicolon | Operand)*)]
    #[parser(ExprParser::parse_root(session))]
    #[describe("source", "source code")]
    Root {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        statements: Vec<NodeRef>,
    },

    #[describe("statement", "'<expr>;'")]
    #[denote(CLAUSE)]
    Clause {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        expr: NodeRef,
        #[child]
        end: TokenRef,
    },

    #[describe("block", "'{<statements>}'")]
    #[denote(BLOCK)]
    Block {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        start: TokenRef,
        #[child]
        statements: Vec<NodeRef>,
        #[child]
        end: TokenRef,
    },

    #[describe("expression", "'(<expr>)'")]
    #[denote(GROUP)]
    Group {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        start: TokenRef,
        #[child]
        inner: NodeRef,
        #[child]
        end: TokenRef,
    },

    #[describe("literal", "'<number>'")]
    #[denote(NUMBER)]
    Number {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        token: TokenRef,
    },

    #[describe("literal", "'<string>'")]
    #[denote(STRING)]
    String {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        token: TokenRef,
    },

    #[describe("literal", "'<bool>'")]
    #[denote(BOOL)]
    Bool {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        token: TokenRef,
    },

    #[describe("context", "'context'")]
    #[denote(CONTEXT)]
    Context {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        token: TokenRef,
    },

    #[describe("ident", "'<ident>'")]
    #[denote(IDENT)]
    Ident {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        token: TokenRef,
    },

    #[describe("operator")]
    #[denote(UNARY)]
    Unary {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        op: TokenRef,
        #[child]
        right: NodeRef,
    },

    #[describe("operator")]
    #[denote(BINARY)]
    Binary {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        left: NodeRef,
        #[child]
        op: TokenRef,
        #[child]
        right: NodeRef,
    },

    #[describe("member access", "'<expr>.<member>'")]
    #[denote(ACCESS)]
    Access {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        left: NodeRef,
        #[child]
        dot: TokenRef,
        #[child]
        member: TokenRef,
    },

    #[describe("call", "'<method>(<args>)'")]
    #[denote(CALL)]
    Call {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        left: NodeRef,
        #[child]
        args: NodeRef,
    },

    #[describe("call arguments", "'(<arg>, <arg>, ...)'")]
    #[denote(CALL_ARGS)]
    CallArgs {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        start: TokenRef,
        #[child]
        args: Vec<NodeRef>,
        #[child]
        end: TokenRef,
    },

    #[describe("if", "'if (<condition>) <expr> else <expr>'")]
    #[denote(IF)]
    If {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        keyword: TokenRef,
        #[child]
        condition: NodeRef,
        #[child]
        then: NodeRef,
        #[child]
        otherwise: NodeRef,
    },

    #[describe("while", "'while (<condition>) <expr>'")]
    #[denote(WHILE)]
    While {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        keyword: TokenRef,
        #[child]
        condition: NodeRef,
        #[child]
        body: NodeRef,
    },

    #[describe("definition", "'val <name> = <expr>'")]
    #[denote(DEFINE)]
    Define {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        keyword: TokenRef,
        #[child]
        name: TokenRef,
        #[child]
        value: NodeRef,
    },

    #[describe("expression", "'<expr>'")]
    #[denote(OVERFLOW)]
    Overflow {
        #[node]
        node: NodeRef,
        #[parent]
        parent: NodeRef,
        #[child]
        start: TokenRef,
    },
}
