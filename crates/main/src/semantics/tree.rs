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
use lady_deirdre::lexis::SiteSpan;

use crate::{
    runtime::{Symbol, TypeName},
    syntax::{BinaryOp, UnaryOp},
};

/// A type-checked expression node.
///
/// Every node evaluates to exactly one runtime value. Nodes of type `void`
/// evaluate to the void value.
#[derive(Clone, Debug)]
pub(crate) struct Typed {
    pub(crate) span: SiteSpan,
    pub(crate) ty: TypeName,
    pub(crate) kind: TypedKind,
}

#[derive(Clone, Debug)]
pub(crate) enum TypedKind {
    Void,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(CompactString),
    Context,
    Global(CompactString),
    Local(usize),

    Member {
        receiver: Box<Typed>,
        symbol: Symbol,
        args: Vec<Typed>,
    },

    /// Converts `int` to `double`.
    Widen(Box<Typed>),

    /// Evaluates the operand and replaces its value with void.
    Discard(Box<Typed>),

    Unary {
        op: UnaryOp,
        operand: Box<Typed>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Typed>,
        right: Box<Typed>,
    },

    /// Renders each part to a string and joins them.
    Concat(Vec<Typed>),

    If {
        condition: Box<Typed>,
        then: Box<Typed>,
        otherwise: Option<Box<Typed>>,
    },

    Block(Vec<Typed>),

    Define {
        slot: usize,
        value: Box<Typed>,
    },

    Assign {
        slot: usize,
        value: Box<Typed>,
    },

    While {
        condition: Box<Typed>,
        body: Box<Typed>,
    },
}

impl Typed {
    #[inline(always)]
    pub(crate) fn new(span: SiteSpan, ty: TypeName, kind: TypedKind) -> Self {
        Self { span, ty, kind }
    }

    #[inline(always)]
    pub(crate) fn void(span: SiteSpan) -> Self {
        Self::new(span, TypeName::void(), TypedKind::Void)
    }

    #[inline(always)]
    pub(crate) fn widen(self) -> Self {
        Self::new(
            self.span.clone(),
            TypeName::double(),
            TypedKind::Widen(Box::new(self)),
        )
    }

    #[inline(always)]
    pub(crate) fn discard(self) -> Self {
        Self::new(
            self.span.clone(),
            TypeName::void(),
            TypedKind::Discard(Box::new(self)),
        )
    }

    /// Calls `visit` for each direct child node in evaluation order.
    pub(crate) fn for_each_child<'a>(&'a self, mut visit: impl FnMut(&'a Typed)) {
        match &self.kind {
            TypedKind::Void
            | TypedKind::Bool(_)
            | TypedKind::Int(_)
            | TypedKind::Double(_)
            | TypedKind::String(_)
            | TypedKind::Context
            | TypedKind::Global(_)
            | TypedKind::Local(_) => (),

            TypedKind::Member { receiver, args, .. } => {
                visit(receiver);

                for arg in args {
                    visit(arg);
                }
            }

            TypedKind::Widen(operand) | TypedKind::Discard(operand) => visit(operand),

            TypedKind::Unary { operand, .. } => visit(operand),

            TypedKind::Binary { left, right, .. } => {
                visit(left);
                visit(right);
            }

            TypedKind::Concat(parts) | TypedKind::Block(parts) => {
                for part in parts {
                    visit(part);
                }
            }

            TypedKind::If {
                condition,
                then,
                otherwise,
            } => {
                visit(condition);
                visit(then);

                if let Some(otherwise) = otherwise {
                    visit(otherwise);
                }
            }

            TypedKind::Define { value, .. } | TypedKind::Assign { value, .. } => visit(value),

            TypedKind::While { condition, body } => {
                visit(condition);
                visit(body);
            }
        }
    }
}
