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

use std::fmt::{Display, Formatter};

use compact_str::CompactString;
use lady_deirdre::lexis::SiteSpan;

/// A node of the expression syntax tree.
///
/// The [span](Expr::span) is measured in Unicode characters of the full
/// source text. For template fragments, the spans are relative to the
/// beginning of the template, not the fragment.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    /// The source code range covered by this expression.
    pub span: SiteSpan,

    /// The kind of this expression and its child nodes.
    pub kind: ExprKind,
}

/// An identifier with its source code range.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Name {
    /// The identifier string.
    pub string: CompactString,

    /// The source code range of the identifier.
    pub span: SiteSpan,
}

impl Display for Name {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.string.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// An integer literal: `10`.
    Int(i64),

    /// A floating-point literal: `1.5`.
    Float(f64),

    /// A string literal with resolved escape sequences: `"foo"`.
    String(CompactString),

    /// `true` or `false`.
    Bool(bool),

    /// A bare identifier: a local variable, a library global, or a member of
    /// the implicit context receiver.
    Ident(Name),

    /// The `context` keyword.
    Context,

    /// A field access or a parameterless member access: `receiver.member`.
    Select {
        receiver: Box<Expr>,
        member: Name,
    },

    /// A method invocation: `receiver.method(args)` or `method(args)`.
    ///
    /// When the receiver is omitted, the method is resolved on the context
    /// object.
    Call {
        receiver: Option<Box<Expr>>,
        method: Name,
        args: Vec<Expr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `if (condition) then else otherwise`.
    If {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },

    /// `{ statement; statement; result }`.
    Block { statements: Vec<Expr> },

    /// `val name = value` or `var name = value`.
    Define {
        mutable: bool,
        name: Name,
        value: Box<Expr>,
    },

    /// `name = value`.
    Assign { target: Name, value: Box<Expr> },

    /// `while (condition) body`.
    While {
        condition: Box<Expr>,
        body: Box<Expr>,
    },
}

impl Expr {
    #[inline(always)]
    pub(crate) fn new(span: SiteSpan, kind: ExprKind) -> Self {
        Self { span, kind }
    }

    /// Returns the syntactic class of this node as seen by the
    /// [SyntaxValidator](crate::validation::SyntaxValidator).
    pub fn syntax_kind(&self) -> SyntaxKind {
        match &self.kind {
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::String(_) | ExprKind::Bool(_) => {
                SyntaxKind::Literal
            }
            ExprKind::Ident(_) => SyntaxKind::Ident,
            ExprKind::Context => SyntaxKind::Context,
            ExprKind::Select { .. } => SyntaxKind::Select,
            ExprKind::Call { .. } => SyntaxKind::Call,
            ExprKind::Unary { .. } => SyntaxKind::Unary,
            ExprKind::Binary { .. } => SyntaxKind::Binary,
            ExprKind::If { .. } => SyntaxKind::If,
            ExprKind::Block { .. } => SyntaxKind::Block,
            ExprKind::Define { .. } => SyntaxKind::Val,
            ExprKind::Assign { .. } => SyntaxKind::Assign,
            ExprKind::While { .. } => SyntaxKind::While,
        }
    }

    /// Returns the operator string of the unary and binary nodes.
    pub fn operator(&self) -> Option<&'static str> {
        match &self.kind {
            ExprKind::Unary { op, .. } => Some(op.as_str()),
            ExprKind::Binary { op, .. } => Some(op.as_str()),
            _ => None,
        }
    }

    /// Calls `visit` for each direct child node in source order.
    pub fn for_each_child<'a>(&'a self, mut visit: impl FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::String(_)
            | ExprKind::Bool(_)
            | ExprKind::Ident(_)
            | ExprKind::Context => (),

            ExprKind::Select { receiver, .. } => visit(receiver),

            ExprKind::Call { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    visit(receiver);
                }

                for arg in args {
                    visit(arg);
                }
            }

            ExprKind::Unary { operand, .. } => visit(operand),

            ExprKind::Binary { left, right, .. } => {
                visit(left);
                visit(right);
            }

            ExprKind::If {
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

            ExprKind::Block { statements } => {
                for statement in statements {
                    visit(statement);
                }
            }

            ExprKind::Define { value, .. } => visit(value),
            ExprKind::Assign { value, .. } => visit(value),

            ExprKind::While { condition, body } => {
                visit(condition);
                visit(body);
            }
        }
    }
}

/// A syntactic class of the [Expr] nodes.
///
/// The syntax rules refer to these classes by their
/// [names](SyntaxKind::name).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum SyntaxKind {
    Literal,
    Ident,
    Context,
    Select,
    Call,
    Unary,
    Binary,
    If,
    Block,
    Val,
    Assign,
    While,
}

impl Display for SyntaxKind {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name())
    }
}

impl SyntaxKind {
    /// All syntactic classes.
    pub const ALL: [Self; 12] = [
        Self::Literal,
        Self::Ident,
        Self::Context,
        Self::Select,
        Self::Call,
        Self::Unary,
        Self::Binary,
        Self::If,
        Self::Block,
        Self::Val,
        Self::Assign,
        Self::While,
    ];

    /// The name of the class used in the syntax rules.
    pub fn name(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Ident => "ident",
            Self::Context => "context",
            Self::Select => "select",
            Self::Call => "call",
            Self::Unary => "unary",
            Self::Binary => "binary",
            Self::If => "if",
            Self::Block => "block",
            Self::Val => "val",
            Self::Assign => "assign",
            Self::While => "while",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    #[inline(always)]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Lesser,
    LesserOrEqual,
    Greater,
    GreaterOrEqual,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub const ALL: [Self; 13] = [
        Self::Or,
        Self::And,
        Self::Equal,
        Self::NotEqual,
        Self::Lesser,
        Self::LesserOrEqual,
        Self::Greater,
        Self::GreaterOrEqual,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Rem,
    ];

    #[inline(always)]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Lesser => "<",
            Self::LesserOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }

    #[inline(always)]
    pub(crate) fn is_comparison(self) -> bool {
        match self {
            Self::Lesser | Self::LesserOrEqual | Self::Greater | Self::GreaterOrEqual => true,
            _ => false,
        }
    }

    #[inline(always)]
    pub(crate) fn is_equality(self) -> bool {
        match self {
            Self::Equal | Self::NotEqual => true,
            _ => false,
        }
    }

    #[inline(always)]
    pub(crate) fn is_logical(self) -> bool {
        match self {
            Self::Or | Self::And => true,
            _ => false,
        }
    }
}
