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

mod ast;
mod expr;
mod lower;
mod node;
mod template;
mod token;

pub use crate::syntax::{
    ast::{BinaryOp, Expr, ExprKind, Name, SyntaxKind, UnaryOp},
    lower::{parse_definitions, parse_expression, parse_expression_within, Definition, MAX_DEPTH},
    template::{split_template, TemplatePart, TemplateSyntax},
    token::ExprToken,
};
pub(crate) use crate::syntax::{
    lower::{completion_site, unescape, CompletionSite},
    template::split,
    token::{lex, Lexeme},
};

/// The interpretation of an expression's source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ExpressionMode {
    /// The whole text is a single expression.
    #[default]
    Plain,

    /// The text is a string template with embedded expression fragments.
    ///
    /// The fragment markers are configured through
    /// [TemplateSyntax](crate::syntax::TemplateSyntax).
    Template,
}
