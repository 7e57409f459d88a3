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

use std::fmt::{Arguments, Debug, Display, Formatter};

use compact_str::CompactString;
use lady_deirdre::lexis::SiteSpan;

use crate::{
    runtime::{Symbol, Value},
    syntax::{BinaryOp, UnaryOp},
};

pub(crate) type StringIndex = usize;
pub(crate) type ConstantIndex = usize;
pub(crate) type SymbolIndex = usize;
pub(crate) type SlotIndex = usize;
pub(crate) type CmdIndex = usize;

/// A linear program of a stack machine.
///
/// Each command has a matching entry in `spans` that points to the source
/// code of the expression (or of the Profile's header, for the commands
/// before `header_end`) that the command was generated from.
#[derive(Clone, Default)]
pub(crate) struct Assembly {
    pub(crate) frame: usize,
    pub(crate) header_end: CmdIndex,
    pub(crate) strings: Vec<CompactString>,
    pub(crate) constants: Vec<Value>,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) commands: Vec<Cmd>,
    pub(crate) spans: Vec<SiteSpan>,
}

impl Debug for Assembly {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("Assembly {\n")?;

        let mut indent = 1;

        println(formatter, indent, format_args!("frame: {}", self.frame))?;

        if !self.commands.is_empty() {
            println(formatter, indent, format_args!("commands:"))?;

            indent += 1;

            for (index, cmd) in self.commands.iter().enumerate() {
                if index == self.header_end && index > 0 {
                    println(formatter, indent, format_args!("-- header end --"))?;
                }

                cmd.debug(formatter, indent, index, self)?;
            }

            indent -= 1;
        }

        if !self.strings.is_empty() {
            println(formatter, indent, format_args!("strings:"))?;

            indent += 1;

            for (index, string) in self.strings.iter().enumerate() {
                println(formatter, indent, format_args!("string{index}: {string:?}"))?;
            }

            indent -= 1;
        }

        println(formatter, indent - 1, format_args!("}}"))
    }
}

impl Assembly {
    #[inline(always)]
    pub(crate) fn span(&self, cmd: CmdIndex) -> SiteSpan {
        match self.spans.get(cmd) {
            Some(span) => span.clone(),
            None => 0..0,
        }
    }

    #[inline(always)]
    pub(crate) fn is_header(&self, cmd: CmdIndex) -> bool {
        cmd < self.header_end
    }
}

#[derive(Clone, PartialEq)]
pub(crate) enum Cmd {
    IfFalse(IfFalseCmd),
    Jump(JumpCmd),
    Pop(PopCmd),
    PushVoid(PushVoidCmd),
    PushBool(PushBoolCmd),
    PushInt(PushIntCmd),
    PushDouble(PushDoubleCmd),
    PushString(PushStringCmd),
    PushConstant(PushConstantCmd),
    PushContext(PushContextCmd),
    Load(LoadCmd),
    Store(StoreCmd),
    Widen(WidenCmd),
    Concat(ConcatCmd),
    Invoke(InvokeCmd),
    Op(OpCmd),
}

impl Cmd {
    fn debug(
        &self,
        formatter: &mut Formatter<'_>,
        indent: usize,
        cmd: CmdIndex,
        assembly: &Assembly,
    ) -> std::fmt::Result {
        match self {
            Self::IfFalse(IfFalseCmd { otherwise }) => println(
                formatter,
                indent,
                format_args!("{cmd}: if-false {otherwise}"),
            ),

            Self::Jump(JumpCmd { command }) => {
                println(formatter, indent, format_args!("{cmd}: jump {command}"))
            }

            Self::Pop(..) => println(formatter, indent, format_args!("{cmd}: pop")),

            Self::PushVoid(..) => println(formatter, indent, format_args!("{cmd}: push void")),

            Self::PushBool(PushBoolCmd { value }) => {
                println(formatter, indent, format_args!("{cmd}: push {value}"))
            }

            Self::PushInt(PushIntCmd { value }) => {
                println(formatter, indent, format_args!("{cmd}: push {value}int"))
            }

            Self::PushDouble(PushDoubleCmd { value }) => {
                println(formatter, indent, format_args!("{cmd}: push {value:?}double"))
            }

            Self::PushString(PushStringCmd { string_index }) => {
                match assembly.strings.get(*string_index) {
                    Some(string) => println(
                        formatter,
                        indent,
                        format_args!("{cmd}: push string{string_index}({string:?})"),
                    ),

                    None => println(
                        formatter,
                        indent,
                        format_args!("{cmd}: push string{string_index}(?)"),
                    ),
                }
            }

            Self::PushConstant(PushConstantCmd { constant_index }) => println(
                formatter,
                indent,
                format_args!("{cmd}: push const{constant_index}"),
            ),

            Self::PushContext(..) => {
                println(formatter, indent, format_args!("{cmd}: push context"))
            }

            Self::Load(LoadCmd { slot }) => {
                println(formatter, indent, format_args!("{cmd}: load l{slot}"))
            }

            Self::Store(StoreCmd { slot }) => {
                println(formatter, indent, format_args!("{cmd}: store l{slot}"))
            }

            Self::Widen(..) => println(formatter, indent, format_args!("{cmd}: widen")),

            Self::Concat(ConcatCmd { items }) => {
                println(formatter, indent, format_args!("{cmd}: concat {items}"))
            }

            Self::Invoke(InvokeCmd {
                symbol_index,
                arity,
            }) => match assembly.symbols.get(*symbol_index) {
                Some(symbol) => println(
                    formatter,
                    indent,
                    format_args!(
                        "{cmd}: invoke {}.{} {arity}",
                        symbol.receiver(),
                        symbol.member().name(),
                    ),
                ),

                None => println(formatter, indent, format_args!("{cmd}: invoke ? {arity}")),
            },

            Self::Op(op) => println(formatter, indent, format_args!("{cmd}: {op}")),
        }
    }
}

// Stack: (condition) -> ()
#[derive(Clone, PartialEq)]
pub(crate) struct IfFalseCmd {
    pub(crate) otherwise: CmdIndex,
}

// Stack: () -> ()
#[derive(Clone, PartialEq)]
pub(crate) struct JumpCmd {
    pub(crate) command: CmdIndex,
}

// Stack: (value) -> ()
#[derive(Clone, PartialEq)]
pub(crate) struct PopCmd;

// Stack: () -> (void)
#[derive(Clone, PartialEq)]
pub(crate) struct PushVoidCmd;

// Stack: () -> (bool)
#[derive(Clone, PartialEq)]
pub(crate) struct PushBoolCmd {
    pub(crate) value: bool,
}

// Stack: () -> (int)
#[derive(Clone, PartialEq)]
pub(crate) struct PushIntCmd {
    pub(crate) value: i64,
}

// Stack: () -> (double)
#[derive(Clone, PartialEq)]
pub(crate) struct PushDoubleCmd {
    pub(crate) value: f64,
}

// Stack: () -> (string)
#[derive(Clone, PartialEq)]
pub(crate) struct PushStringCmd {
    pub(crate) string_index: StringIndex,
}

// Stack: () -> (global)
#[derive(Clone, PartialEq)]
pub(crate) struct PushConstantCmd {
    pub(crate) constant_index: ConstantIndex,
}

// Stack: () -> (context)
#[derive(Clone, PartialEq)]
pub(crate) struct PushContextCmd;

// Stack: () -> (local)
#[derive(Clone, PartialEq)]
pub(crate) struct LoadCmd {
    pub(crate) slot: SlotIndex,
}

// Stack: (value) -> () /* moves the value into the local slot */
#[derive(Clone, PartialEq)]
pub(crate) struct StoreCmd {
    pub(crate) slot: SlotIndex,
}

// Stack: (int) -> (double)
#[derive(Clone, PartialEq)]
pub(crate) struct WidenCmd;

// Stack: (items..) -> (string) /* pops items, pushes result */
#[derive(Clone, PartialEq)]
pub(crate) struct ConcatCmd {
    pub(crate) items: usize,
}

// Stack: (receiver, args..) -> (result)
#[derive(Clone, PartialEq)]
pub(crate) struct InvokeCmd {
    pub(crate) symbol_index: SymbolIndex,
    pub(crate) arity: usize,
}

// Unary operators:
//     Stack: (operand) -> (result)
//
// Binary operators:
//     Stack: (lhs, rhs) -> (result)
//
// The logical operators are compiled into jumps.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpCmd {
    Neg,
    Not,
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Lesser,
    LesserOrEqual,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Display for OpCmd {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neg => formatter.write_str("neg"),
            Self::Not => formatter.write_str("not"),
            Self::Equal => formatter.write_str("eq"),
            Self::NotEqual => formatter.write_str("ne"),
            Self::Greater => formatter.write_str("gt"),
            Self::GreaterOrEqual => formatter.write_str("ge"),
            Self::Lesser => formatter.write_str("lt"),
            Self::LesserOrEqual => formatter.write_str("le"),
            Self::Add => formatter.write_str("add"),
            Self::Sub => formatter.write_str("sub"),
            Self::Mul => formatter.write_str("mul"),
            Self::Div => formatter.write_str("div"),
            Self::Rem => formatter.write_str("rem"),
        }
    }
}

impl From<UnaryOp> for OpCmd {
    #[inline(always)]
    fn from(op: UnaryOp) -> Self {
        match op {
            UnaryOp::Neg => Self::Neg,
            UnaryOp::Not => Self::Not,
        }
    }
}

impl OpCmd {
    // Returns None for the logical operators.
    #[inline(always)]
    pub(crate) fn from_binary(op: BinaryOp) -> Option<Self> {
        Some(match op {
            BinaryOp::Or | BinaryOp::And => return None,
            BinaryOp::Equal => Self::Equal,
            BinaryOp::NotEqual => Self::NotEqual,
            BinaryOp::Greater => Self::Greater,
            BinaryOp::GreaterOrEqual => Self::GreaterOrEqual,
            BinaryOp::Lesser => Self::Lesser,
            BinaryOp::LesserOrEqual => Self::LesserOrEqual,
            BinaryOp::Add => Self::Add,
            BinaryOp::Sub => Self::Sub,
            BinaryOp::Mul => Self::Mul,
            BinaryOp::Div => Self::Div,
            BinaryOp::Rem => Self::Rem,
        })
    }
}

#[inline(always)]
fn println(formatter: &mut Formatter<'_>, indent: usize, fmt: Arguments) -> std::fmt::Result {
    formatter.write_str(&"    ".repeat(indent))?;
    formatter.write_fmt(fmt)?;
    formatter.write_str("\n")?;

    Ok(())
}
